use crate::{
    nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData},
    xdr,
};
use bytes::Bytes;
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableHow {
    Unstable,
    DataSync,
    FileSync,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Write3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
    pub stable: StableHow,
    pub data: Bytes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Write3ResOk {
    pub file_wcc: WccData,
    pub count: Count3,
    pub committed: StableHow,
    pub verifier: Verifier3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Write3ResFail {
    pub file_wcc: WccData,
}

pub type WriteResult = NfsResult<Write3ResOk, Write3ResFail>;
