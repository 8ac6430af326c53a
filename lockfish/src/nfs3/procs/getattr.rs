use crate::{
    nfs3::{FileAttributes, NfsFh3},
    xdr,
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct GetAttr3Args {
    pub object: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct GetAttr3ResOk {
    pub attributes: FileAttributes,
}

pub type GetAttrResult = NfsResult<GetAttr3ResOk, ()>;
