//! File-level operations on one mounted export.
//!
//! A [`Session`] mounts an export once and keeps an NFS and an NLM client
//! open against it.  Writing to a missing file creates it first; locking a
//! missing file is an error, the file is never created for a lock.
use crate::{
    config::{local_hostname, AuthConfig, ClientConfig},
    mount::{self, MountClient},
    nfs3::{
        self,
        procs::{self, Entry3, EntryPlus3, Write3ResOk},
        NfsClient, NfsFh3, Offset3,
    },
    nlm4::{self, LockRange, Nlm4Stat, NlmClient},
    result::{Error, Result},
    rpc::Connector,
};
use bytes::Bytes;
use tracing::debug;

/// How to lock or unlock a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    pub exclusive: bool,
    pub block: bool,
    pub range: LockRange,
    /// Skips the lookup of the file name when set
    pub file_handle: Option<NfsFh3>,
    /// Name presented to the lock manager instead of the session's
    pub caller_name: Option<String>,
}

impl Default for LockOptions {
    fn default() -> Self {
        LockOptions {
            exclusive: true,
            block: false,
            range: LockRange::WHOLE_FILE,
            file_handle: None,
            caller_name: None,
        }
    }
}

pub struct Session {
    root: NfsFh3,
    nfs: NfsClient,
    nlm: NlmClient,
    /// Name this host presents to the lock manager
    caller_name: String,
}

impl Session {
    /// Mounts `export` and connects the NFS and NLM clients, resolving every
    /// program through the port mapper.
    pub async fn open(config: ClientConfig, export: &str) -> Result<Session> {
        let mut connector = Connector::new(config);

        let mut mount_client =
            MountClient::new(connector.connect(mount::PROGRAM, mount::VERSION).await?);
        let (stat, root) = mount_client.mount(export).await?;
        let root = root.ok_or_else(|| Error::unexpected_status(stat))?;
        drop(mount_client);

        let nfs = NfsClient::new(
            connector.connect(nfs3::PROG_NFS, nfs3::VERSION).await?,
            connector.config(),
        );
        let nlm = NlmClient::new(
            connector.connect(nlm4::PROG_NLM, nlm4::VERSION).await?,
            connector.config().lock,
        );

        let caller_name = match &connector.config().auth {
            AuthConfig::Sys { machine_name, .. } => machine_name.clone(),
            AuthConfig::None => local_hostname().unwrap_or_else(|_| "localhost".to_string()),
        };

        debug!("mounted {} on {}", export, connector.config().host);
        Ok(Session::from_parts(root, nfs, nlm, caller_name))
    }

    /// Builds a session from already connected clients
    pub fn from_parts(
        root: NfsFh3,
        nfs: NfsClient,
        nlm: NlmClient,
        caller_name: impl Into<String>,
    ) -> Session {
        Session {
            root,
            nfs,
            nlm,
            caller_name: caller_name.into(),
        }
    }

    /// Root handle of the mounted export
    pub fn root(&self) -> &NfsFh3 {
        &self.root
    }

    pub fn nfs(&mut self) -> &mut NfsClient {
        &mut self.nfs
    }

    pub fn nlm(&mut self) -> &mut NlmClient {
        &mut self.nlm
    }

    /// Looks `name` up in the export root, `None` if it does not exist
    pub async fn lookup_file(&mut self, name: &str) -> Result<Option<NfsFh3>> {
        Ok(self.nfs.lookup(&self.root, name).await?.ok().map(|ok| ok.object))
    }

    /// Creates `name` in the export root (UNCHECKED) and returns its handle
    pub async fn create_file(&mut self, name: &str) -> Result<NfsFh3> {
        let created = procs::into_ok(self.nfs.create_file(&self.root, name).await?)?;
        match created.obj {
            Some(fh) => Ok(fh),
            // The server may omit the handle, in which case ask for it
            None => self
                .lookup_file(name)
                .await?
                .ok_or_else(|| Error::FileNotFound(name.to_string())),
        }
    }

    /// Writes `data` at `offset` of `name`, creating the file if it does not
    /// exist yet
    pub async fn write_file(
        &mut self,
        name: &str,
        offset: Offset3,
        data: Bytes,
    ) -> Result<Write3ResOk> {
        let fh = match self.lookup_file(name).await? {
            Some(fh) => fh,
            None => {
                debug!("{} does not exist, creating it", name);
                self.create_file(name).await?
            }
        };

        procs::into_ok(self.nfs.write(&fh, offset, data).await?)
    }

    /// Handle to lock: the explicit one, or the looked up one.  Missing
    /// files are not created.
    async fn lock_target(&mut self, name: &str, options: &LockOptions) -> Result<NfsFh3> {
        if let Some(fh) = &options.file_handle {
            return Ok(fh.clone());
        }

        self.lookup_file(name)
            .await?
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    /// Locks `name` on behalf of `owner`.  A denial is a status, not an error.
    pub async fn lock_file(
        &mut self,
        name: &str,
        owner: &[u8],
        options: &LockOptions,
    ) -> Result<Nlm4Stat> {
        let fh = self.lock_target(name, options).await?;
        let caller_name = options.caller_name.as_deref().unwrap_or(&self.caller_name);
        self.nlm
            .lock_range(
                caller_name,
                &fh,
                owner,
                options.exclusive,
                options.block,
                options.range,
            )
            .await
    }

    pub async fn unlock_file(
        &mut self,
        name: &str,
        owner: &[u8],
        options: &LockOptions,
    ) -> Result<Nlm4Stat> {
        let fh = self.lock_target(name, options).await?;
        let caller_name = options.caller_name.as_deref().unwrap_or(&self.caller_name);
        self.nlm
            .unlock_range(caller_name, &fh, owner, options.range)
            .await
    }

    /// All entries of the export root
    pub async fn list(&mut self) -> Result<Vec<Entry3>> {
        self.nfs.read_directory(&self.root).await
    }

    /// All entries of the export root, with attributes and handles
    pub async fn list_plus(&mut self) -> Result<Vec<EntryPlus3>> {
        self.nfs.read_directory_plus(&self.root).await
    }
}
