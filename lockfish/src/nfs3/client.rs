use crate::{
    config::ClientConfig,
    nfs3::{
        procs::{self, CreateHow3, Entry3, EntryPlus3, NfsResult, StableHow, OK_ONLY},
        Cookie3, Count3, DirOpArgs3, NfsFh3, NfsStat3, NfsTime3, Offset3, SetAttributes,
        Verifier3,
    },
    result::Result,
    rpc::RpcClient,
    xdr::{PackTo, UnpackFrom},
};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use super::consts::*;

/// NFSv3 client over a single RPC connection
pub struct NfsClient {
    rpc: RpcClient,
    readdir_count: Count3,
    readdirplus_maxcount: Count3,
}

impl NfsClient {
    pub fn new(rpc: RpcClient, config: &ClientConfig) -> NfsClient {
        NfsClient {
            rpc,
            readdir_count: config.readdir_count,
            readdirplus_maxcount: config.readdirplus_maxcount,
        }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn call<A, T, E>(
        &mut self,
        proc: u32,
        args: &A,
        allowed: &'static [NfsStat3],
    ) -> Result<NfsResult<T, E>>
    where
        A: PackTo<BytesMut>,
        T: UnpackFrom<Bytes>,
        E: UnpackFrom<Bytes>,
    {
        self.rpc
            .call(proc, args, |buf| procs::unpack_result(buf, allowed))
            .await
    }

    pub async fn null(&mut self) -> Result<()> {
        self.rpc.null().await
    }

    pub async fn getattr(&mut self, object: &NfsFh3) -> Result<procs::GetAttrResult> {
        let args = procs::GetAttr3Args {
            object: object.clone(),
        };
        self.call(NFSPROC3_GETATTR, &args, OK_ONLY).await
    }

    pub async fn setattr(
        &mut self,
        object: &NfsFh3,
        new_attributes: SetAttributes,
        guard: Option<NfsTime3>,
    ) -> Result<procs::SetAttrResult> {
        let args = procs::SetAttr3Args {
            object: object.clone(),
            new_attributes,
            guard,
        };
        self.call(NFSPROC3_SETATTR, &args, OK_ONLY).await
    }

    /// Looks `name` up in `dir`.  NFS3ERR_NOENT is returned as a value.
    pub async fn lookup(&mut self, dir: &NfsFh3, name: &str) -> Result<procs::LookupResult> {
        let args = procs::Lookup3Args {
            what: DirOpArgs3 {
                dir: dir.clone(),
                name: name.to_string(),
            },
        };
        let result = self
            .call(NFSPROC3_LOOKUP, &args, procs::LOOKUP_ALLOWED)
            .await?;
        debug!("lookup {}: {}", name, if result.is_ok() { "found" } else { "not found" });
        Ok(result)
    }

    pub async fn create(
        &mut self,
        dir: &NfsFh3,
        name: &str,
        how: CreateHow3,
    ) -> Result<procs::CreateResult> {
        let args = procs::Create3Args {
            create_where: DirOpArgs3 {
                dir: dir.clone(),
                name: name.to_string(),
            },
            how,
        };
        self.call(NFSPROC3_CREATE, &args, OK_ONLY).await
    }

    /// UNCHECKED create with no attributes set
    pub async fn create_file(&mut self, dir: &NfsFh3, name: &str) -> Result<procs::CreateResult> {
        self.create(dir, name, CreateHow3::Unchecked(SetAttributes::default()))
            .await
    }

    /// Writes `data` at `offset` with FILE_SYNC stability
    pub async fn write(
        &mut self,
        file: &NfsFh3,
        offset: Offset3,
        data: Bytes,
    ) -> Result<procs::WriteResult> {
        let args = procs::Write3Args {
            file: file.clone(),
            offset,
            count: data.len() as Count3,
            stable: StableHow::FileSync,
            data,
        };
        self.call(NFSPROC3_WRITE, &args, OK_ONLY).await
    }

    pub async fn commit(
        &mut self,
        file: &NfsFh3,
        offset: Offset3,
        count: Count3,
    ) -> Result<procs::CommitResult> {
        let args = procs::Commit3Args {
            file: file.clone(),
            offset,
            count,
        };
        self.call(NFSPROC3_COMMIT, &args, OK_ONLY).await
    }

    pub async fn fsinfo(&mut self, root: &NfsFh3) -> Result<procs::FsinfoResult> {
        let args = procs::Fsinfo3Args { root: root.clone() };
        self.call(NFSPROC3_FSINFO, &args, OK_ONLY).await
    }

    /// Reads a single page of `dir`
    pub async fn readdir(
        &mut self,
        dir: &NfsFh3,
        cookie: Cookie3,
        verifier: Verifier3,
    ) -> Result<procs::ReaddirResult> {
        let args = procs::Readdir3Args {
            dir: dir.clone(),
            cookie,
            verifier,
            count: self.readdir_count,
        };
        self.call(NFSPROC3_READDIR, &args, OK_ONLY).await
    }

    /// Reads a single page of `dir`, with attributes and handles
    pub async fn readdirplus(
        &mut self,
        dir: &NfsFh3,
        cookie: Cookie3,
        verifier: Verifier3,
    ) -> Result<procs::ReaddirPlusResult> {
        let args = procs::ReaddirPlus3Args {
            dir: dir.clone(),
            cookie,
            verifier,
            dircount: self.readdirplus_maxcount,
            maxcount: self.readdirplus_maxcount,
        };
        self.call(NFSPROC3_READDIRPLUS, &args, OK_ONLY).await
    }

    /// Reads the whole of `dir`, following cookies until the server reports
    /// eof or returns an empty page.
    pub async fn read_directory(&mut self, dir: &NfsFh3) -> Result<Vec<Entry3>> {
        let mut entries = Vec::new();
        let mut cookie = 0;
        let mut verifier = 0;

        loop {
            let page = procs::into_ok(self.readdir(dir, cookie, verifier).await?)?;
            let reply = page.reply;
            trace!(
                "readdir page: {} entries, eof:{}",
                reply.entries.len(),
                reply.eof
            );

            verifier = page.verifier;
            match reply.entries.last() {
                Some(last) => cookie = last.cookie,
                None => break,
            }
            entries.extend(reply.entries);
            if reply.eof {
                break;
            }
        }

        Ok(entries)
    }

    /// Same as [`NfsClient::read_directory`] over READDIRPLUS
    pub async fn read_directory_plus(&mut self, dir: &NfsFh3) -> Result<Vec<EntryPlus3>> {
        let mut entries = Vec::new();
        let mut cookie = 0;
        let mut verifier = 0;

        loop {
            let page = procs::into_ok(self.readdirplus(dir, cookie, verifier).await?)?;
            let reply = page.reply;
            trace!(
                "readdirplus page: {} entries, eof:{}",
                reply.entries.len(),
                reply.eof
            );

            verifier = page.verifier;
            match reply.entries.last() {
                Some(last) => cookie = last.cookie,
                None => break,
            }
            entries.extend(reply.entries);
            if reply.eof {
                break;
            }
        }

        Ok(entries)
    }
}
