//! An ONC RPC client library speaking the NFSv3, MOUNT and NLMv4
//! protocols.
//!
//! Layers, bottom up: [`xdr`] encoding, [`record`] marking and
//! [`transport`]s, the [`rpc`] call engine with the [`portmap`] resolver,
//! then the protocol clients ([`mount`], [`nfs3`], [`nlm4`]) and the
//! file-level [`session`].

pub mod config;
pub mod mount;
pub mod nfs3;
pub mod nlm4;
pub mod portmap;
pub mod record;
pub mod result;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod xdr;

pub use config::ClientConfig;
pub use result::{Error, Result};
pub use session::{LockOptions, Session};
