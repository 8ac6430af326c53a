use crate::{nfs3::NfsFh3, xdr};
use bytes::Bytes;
use lockfish_macros::{PackTo, UnpackFrom};

/// nlm4_stats
#[allow(non_camel_case_types)]
#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nlm4Stat {
    NLM4_GRANTED = 0,
    NLM4_DENIED = 1,
    NLM4_DENIED_NOLOCKS = 2,
    NLM4_BLOCKED = 3,
    NLM4_DENIED_GRACE_PERIOD = 4,
    NLM4_DEADLCK = 5,
    NLM4_ROFS = 6,
    NLM4_STALE_FH = 7,
    NLM4_FBIG = 8,
    NLM4_FAILED = 9,
}

impl From<Nlm4Stat> for u32 {
    fn from(stat: Nlm4Stat) -> u32 {
        stat as u32
    }
}

/// nlm4_lock: the range being locked and who locks it
#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Nlm4Lock {
    pub caller_name: String,
    pub fh: NfsFh3,
    /// Opaque owner handle, sent with its length prefix
    pub owner: Bytes,
    pub svid: i32,
    pub offset: u64,
    /// 0 locks to the end of the file
    pub length: u64,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Nlm4LockArgs {
    pub cookie: Bytes,
    pub block: bool,
    pub exclusive: bool,
    pub lock: Nlm4Lock,
    pub reclaim: bool,
    pub state: i32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Nlm4UnlockArgs {
    pub cookie: Bytes,
    pub lock: Nlm4Lock,
}

/// nlm4_res.  The cookie is echoed by the server and not checked.
#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Nlm4Res {
    pub cookie: Bytes,
    pub stat: Nlm4Stat,
}
