use crate::{
    nfs3::{
        Cookie3, Count3, FileId3, Filename3, NfsFh3, PostOpAttributes, PostOpFh3, Verifier3,
    },
    result::Result,
    xdr::{self, PackTo, Packer, UnpackFrom, Unpacker},
};
use lockfish_macros::{PackTo, UnpackFrom};

use super::NfsResult;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReaddirPlus3Args {
    pub dir: NfsFh3,
    pub cookie: Cookie3,
    pub verifier: Verifier3,
    /// Number of READDIR bytes the client really wants
    pub dircount: Count3,
    /// Maximum size of response, including attributes
    pub maxcount: Count3,
}

#[derive(UnpackFrom, PackTo, Debug, Clone, PartialEq, Eq)]
pub struct EntryPlus3 {
    pub fileid: FileId3,
    pub name: Filename3,
    pub cookie: Cookie3,
    pub name_attributes: PostOpAttributes,
    pub name_handle: PostOpFh3,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListPlus3 {
    pub entries: Vec<EntryPlus3>,
    pub eof: bool,
}

impl<B: Packer> PackTo<B> for DirListPlus3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_list(&self.entries, |buf, entry| entry.pack_to(buf));
        buf.pack_bool(self.eof);
    }
}

impl<B: Unpacker> UnpackFrom<B> for DirListPlus3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let entries = buf.unpack_list_iter::<EntryPlus3>().collect::<Result<_>>()?;
        Ok(DirListPlus3 {
            entries,
            eof: buf.unpack_bool()?,
        })
    }
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReaddirPlus3ResOk {
    pub dir_attributes: PostOpAttributes,
    pub verifier: Verifier3,
    pub reply: DirListPlus3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReaddirPlus3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pub type ReaddirPlusResult = NfsResult<ReaddirPlus3ResOk, ReaddirPlus3ResFail>;
