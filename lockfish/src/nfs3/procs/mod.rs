//! Arguments and results of the NFSv3 procedures, in RFC 1813 field order.
use crate::{
    nfs3::NfsStat3,
    result::{Error, Result},
    xdr::{UnpackFrom, Unpacker},
};

macro_rules! pub_use{
    ($($name:ident),+) => { $(mod $name; pub use $name::*;)+ }
}

pub_use!(getattr, setattr, lookup, write, create, commit);
pub_use!(readdir, readdirplus, fsinfo);

/// Result of a procedure: the success payload, or a status the caller
/// allowed for along with the failure payload.
pub type NfsResult<T, E> = core::result::Result<T, (NfsStat3, E)>;

/// Statuses other than NFS3_OK accepted by procedures that do not list any
pub const OK_ONLY: &[NfsStat3] = &[];

/// Decodes a status-discriminated result.  NFS3_OK decodes `T`; a status in
/// `allowed` decodes `E` and is returned as a value; any other status is
/// [`Error::UnexpectedStatus`] and the failure payload is left undecoded.
pub fn unpack_result<T, E, B>(buf: &mut B, allowed: &[NfsStat3]) -> Result<NfsResult<T, E>>
where
    T: UnpackFrom<B>,
    E: UnpackFrom<B>,
    B: Unpacker,
{
    match NfsStat3::unpack_from(buf)? {
        NfsStat3::NFS3_OK => Ok(Ok(T::unpack_from(buf)?)),
        status if allowed.contains(&status) => Ok(Err((status, E::unpack_from(buf)?))),
        status => Err(Error::unexpected_status(status)),
    }
}

/// Unwraps the success payload, turning any failure status into
/// [`Error::UnexpectedStatus`]
pub fn into_ok<T, E>(result: NfsResult<T, E>) -> Result<T> {
    result.map_err(|(status, _)| Error::unexpected_status(status))
}
