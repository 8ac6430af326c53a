use crate::{
    config::LockDefaults,
    nfs3::NfsFh3,
    nlm4::{
        Nlm4Lock, Nlm4LockArgs, Nlm4Res, Nlm4Stat, Nlm4UnlockArgs, NLMPROC4_LOCK, NLMPROC4_UNLOCK,
    },
    result::Result,
    rpc::RpcClient,
};
use bytes::Bytes;
use tracing::debug;

/// Cookie sent with every request, callbacks are not served so it is never
/// matched against anything
const COOKIE: [u8; 4] = [0; 4];

/// Byte range of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockRange {
    pub offset: u64,
    /// 0 extends the range to the end of the file
    pub length: u64,
}

impl LockRange {
    pub const WHOLE_FILE: LockRange = LockRange {
        offset: 0,
        length: 0,
    };
}

/// NLMv4 client over a single RPC connection
pub struct NlmClient {
    rpc: RpcClient,
    defaults: LockDefaults,
}

impl NlmClient {
    pub fn new(rpc: RpcClient, defaults: LockDefaults) -> NlmClient {
        NlmClient { rpc, defaults }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn null(&mut self) -> Result<()> {
        self.rpc.null().await
    }

    fn lock_descriptor(
        &self,
        caller_name: &str,
        fh: &NfsFh3,
        owner: &[u8],
        range: LockRange,
    ) -> Nlm4Lock {
        Nlm4Lock {
            caller_name: caller_name.to_string(),
            fh: fh.clone(),
            owner: Bytes::copy_from_slice(owner),
            svid: self.defaults.svid,
            offset: range.offset,
            length: range.length,
        }
    }

    /// Sends a fully specified LOCK request
    pub async fn send_lock(&mut self, args: &Nlm4LockArgs) -> Result<Nlm4Res> {
        self.rpc.call_decode(NLMPROC4_LOCK, args).await
    }

    /// Sends a fully specified UNLOCK request
    pub async fn send_unlock(&mut self, args: &Nlm4UnlockArgs) -> Result<Nlm4Res> {
        self.rpc.call_decode(NLMPROC4_UNLOCK, args).await
    }

    /// Locks the whole file
    pub async fn lock(
        &mut self,
        caller_name: &str,
        fh: &NfsFh3,
        owner: &[u8],
        exclusive: bool,
        block: bool,
    ) -> Result<Nlm4Stat> {
        self.lock_range(caller_name, fh, owner, exclusive, block, LockRange::WHOLE_FILE)
            .await
    }

    pub async fn lock_range(
        &mut self,
        caller_name: &str,
        fh: &NfsFh3,
        owner: &[u8],
        exclusive: bool,
        block: bool,
        range: LockRange,
    ) -> Result<Nlm4Stat> {
        let args = Nlm4LockArgs {
            cookie: Bytes::from_static(&COOKIE),
            block,
            exclusive,
            lock: self.lock_descriptor(caller_name, fh, owner, range),
            reclaim: false,
            state: self.defaults.state,
        };
        let res = self.send_lock(&args).await?;
        debug!("lock {:?} for {}: {:?}", range, caller_name, res.stat);
        Ok(res.stat)
    }

    /// Unlocks the whole file
    pub async fn unlock(&mut self, caller_name: &str, fh: &NfsFh3, owner: &[u8]) -> Result<Nlm4Stat> {
        self.unlock_range(caller_name, fh, owner, LockRange::WHOLE_FILE)
            .await
    }

    pub async fn unlock_range(
        &mut self,
        caller_name: &str,
        fh: &NfsFh3,
        owner: &[u8],
        range: LockRange,
    ) -> Result<Nlm4Stat> {
        let args = Nlm4UnlockArgs {
            cookie: Bytes::from_static(&COOKIE),
            lock: self.lock_descriptor(caller_name, fh, owner, range),
        };
        let res = self.send_unlock(&args).await?;
        debug!("unlock {:?} for {}: {:?}", range, caller_name, res.stat);
        Ok(res.stat)
    }
}
