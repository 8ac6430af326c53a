use crate::{
    nfs3::{NfsFh3, NfsTime3, PostOpAttributes, Size3},
    xdr,
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Fsinfo3Args {
    pub root: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Fsinfo3ResOk {
    pub obj_attributes: PostOpAttributes,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub maxfilesize: Size3,
    pub time_delta: NfsTime3,
    pub properties: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Fsinfo3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pub type FsinfoResult = NfsResult<Fsinfo3ResOk, Fsinfo3ResFail>;
