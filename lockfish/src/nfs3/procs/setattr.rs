use crate::{
    nfs3::{NfsFh3, NfsTime3, SetAttributes, WccData},
    xdr,
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SetAttr3Args {
    pub object: NfsFh3,
    pub new_attributes: SetAttributes,
    /// Guard, if present is compared to object ctime
    pub guard: Option<NfsTime3>,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SetAttr3ResOk {
    pub obj_wcc: WccData,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SetAttr3ResFail {
    pub obj_wcc: WccData,
}

pub type SetAttrResult = NfsResult<SetAttr3ResOk, SetAttr3ResFail>;
