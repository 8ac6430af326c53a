//! Network Lock Manager version 4 (NLMv4) codec and client.
//!
//! Only LOCK and UNLOCK are implemented.  Blocking requests are sent as
//! asked, but the GRANTED callback is never served, so a blocked lock is
//! only reported as `NLM4_BLOCKED`.
pub mod client;
mod types;

pub use client::{LockRange, NlmClient};
pub use types::*;

/// RPC program number for NLM
pub const PROG_NLM: u32 = 100021;
pub const VERSION: u32 = 4;

pub const NLMPROC4_NULL: u32 = 0;
pub const NLMPROC4_TEST: u32 = 1;
pub const NLMPROC4_LOCK: u32 = 2;
pub const NLMPROC4_CANCEL: u32 = 3;
pub const NLMPROC4_UNLOCK: u32 = 4;
