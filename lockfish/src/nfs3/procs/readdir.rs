use crate::{
    nfs3::{Cookie3, Count3, FileId3, Filename3, NfsFh3, PostOpAttributes, Verifier3},
    result::Result,
    xdr::{self, PackTo, Packer, UnpackFrom, Unpacker},
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Readdir3Args {
    pub dir: NfsFh3,
    pub cookie: Cookie3,
    pub verifier: Verifier3,
    pub count: Count3,
}

#[derive(UnpackFrom, PackTo, Debug, Clone, PartialEq, Eq)]
pub struct Entry3 {
    pub fileid: FileId3,
    pub name: Filename3,
    pub cookie: Cookie3,
}

/// One page of directory entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirList3 {
    pub entries: Vec<Entry3>,
    pub eof: bool,
}

impl<B: Packer> PackTo<B> for DirList3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_list(&self.entries, |buf, entry| entry.pack_to(buf));
        buf.pack_bool(self.eof);
    }
}

impl<B: Unpacker> UnpackFrom<B> for DirList3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let entries = buf.unpack_list_iter::<Entry3>().collect::<Result<_>>()?;
        Ok(DirList3 {
            entries,
            eof: buf.unpack_bool()?,
        })
    }
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Readdir3ResOk {
    pub dir_attributes: PostOpAttributes,
    pub verifier: Verifier3,
    pub reply: DirList3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Readdir3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pub type ReaddirResult = NfsResult<Readdir3ResOk, Readdir3ResFail>;
