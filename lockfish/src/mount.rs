//! This modules defines the constants and structures for encoding and
//! decoding NFS MOUNT protocol, and a client for its MNT procedure.
use crate::{nfs3::NfsFh3, result::Result, rpc::RpcClient, xdr};
use bytes::Bytes;
use lockfish_macros::{PackTo, UnpackFrom};
use tracing::debug;

pub const PROGRAM: u32 = 100005;
pub const VERSION: u32 = 3;

pub const MOUNTPROC3_NULL: u32 = 0;
pub const MOUNTPROC3_MNT: u32 = 1;
pub const MOUNTPROC3_DUMP: u32 = 2;
pub const MOUNTPROC3_UMNT: u32 = 3;
pub const MOUNTPROC3_UMNTALL: u32 = 4;
pub const MOUNTPROC3_EXPORT: u32 = 5;

#[allow(non_camel_case_types)]
#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStat3 {
    MNT3_OK = 0,
    MNT3ERR_PERM = 1,
    MNT3ERR_NOENT = 2,
    MNT3ERR_IO = 5,
    MNT3ERR_ACCES = 13,
    MNT3ERR_NOTDIR = 20,
    MNT3ERR_INVAL = 22,
    MNT3ERR_NAMETOOLONG = 63,
    MNT3ERR_NOTSUPP = 10004,
    MNT3ERR_SERVERFAULT = 10006,
}

impl From<MountStat3> for u32 {
    fn from(stat: MountStat3) -> u32 {
        stat as u32
    }
}

#[derive(PackTo, UnpackFrom, Debug)]
pub struct MountRes3Ok {
    pub handle: NfsFh3,
    pub auth_flavors: Vec<u32>,
}

/// Decodes `mountres3`: the status, then on MNT3_OK the root handle and
/// the accepted auth flavors.
fn unpack_mount_result(buf: &mut Bytes) -> Result<(MountStat3, Option<MountRes3Ok>)> {
    use xdr::UnpackFrom;

    let stat = MountStat3::unpack_from(buf)?;
    let ok = match stat {
        MountStat3::MNT3_OK => Some(MountRes3Ok::unpack_from(buf)?),
        _ => None,
    };
    Ok((stat, ok))
}

pub struct MountClient {
    rpc: RpcClient,
}

impl MountClient {
    pub fn new(rpc: RpcClient) -> MountClient {
        MountClient { rpc }
    }

    pub async fn null(&mut self) -> Result<()> {
        self.rpc.null().await
    }

    /// Mounts `export`, returning the status and, on success, the root file
    /// handle of the export.  A failure status is a value, not an error.
    pub async fn mount(&mut self, export: &str) -> Result<(MountStat3, Option<NfsFh3>)> {
        let (stat, ok) = self
            .rpc
            .call(MOUNTPROC3_MNT, &export, unpack_mount_result)
            .await?;
        debug!("mount {}: {:?}", export, stat);
        Ok((stat, ok.map(|ok| ok.handle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::{PackTo, Packer};
    use bytes::BytesMut;

    #[test]
    fn test_unpack_ok() {
        let mut buf = BytesMut::new();
        MountStat3::MNT3_OK.pack_to(&mut buf);
        buf.pack_opaque(&[1, 2, 3, 4, 5]);
        vec![1u32, 0].pack_to(&mut buf);

        let (stat, ok) = unpack_mount_result(&mut buf.freeze()).unwrap();
        assert_eq!(stat, MountStat3::MNT3_OK);
        let ok = ok.unwrap();
        assert_eq!(ok.handle.data, vec![1, 2, 3, 4, 5]);
        assert_eq!(ok.auth_flavors, vec![1, 0]);
    }

    #[test]
    fn test_unpack_failure() {
        let mut buf = BytesMut::new();
        buf.pack_uint(13);
        let (stat, ok) = unpack_mount_result(&mut buf.freeze()).unwrap();
        assert_eq!(stat, MountStat3::MNT3ERR_ACCES);
        assert!(ok.is_none());
    }

    #[test]
    fn test_unknown_status() {
        let mut buf = BytesMut::new();
        buf.pack_uint(99);
        assert!(unpack_mount_result(&mut buf.freeze()).is_err());
    }
}
