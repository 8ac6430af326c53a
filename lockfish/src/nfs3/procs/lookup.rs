use crate::{
    nfs3::{DirOpArgs3, NfsFh3, NfsStat3, PostOpAttributes},
    xdr,
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

/// A missing name is an answer, not a failure
pub const LOOKUP_ALLOWED: &[NfsStat3] = &[NfsStat3::NFS3ERR_NOENT];

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Lookup3Args {
    pub what: DirOpArgs3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Lookup3ResOk {
    pub object: NfsFh3,
    pub obj_attributes: PostOpAttributes,
    pub dir_attributes: PostOpAttributes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Lookup3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pub type LookupResult = NfsResult<Lookup3ResOk, Lookup3ResFail>;
