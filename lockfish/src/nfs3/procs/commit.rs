use crate::{
    nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData},
    xdr,
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Commit3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    /// 0 commits everything from `offset` to the end of the file
    pub count: Count3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Commit3ResOk {
    pub file_wcc: WccData,
    pub verifier: Verifier3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Commit3ResFail {
    pub file_wcc: WccData,
}

pub type CommitResult = NfsResult<Commit3ResOk, Commit3ResFail>;
