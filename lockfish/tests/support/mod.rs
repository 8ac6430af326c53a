#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lockfish::config::{AuthConfig, ClientConfig};
use lockfish::nfs3::procs::{self, StableHow};
use lockfish::nfs3::{
    self, FileAttributes, FileType3, NfsClient, NfsFh3, NfsStat3, NfsTime3, SpecData3, WccData,
};
use lockfish::nlm4::{self, Nlm4LockArgs, Nlm4Res, Nlm4Stat, Nlm4UnlockArgs, NlmClient};
use lockfish::record;
use lockfish::rpc::{
    AcceptedReply, AcceptedReplyStat, CallHeader, OpaqueAuth, ReplyHeader, RpcClient, REPLY,
};
use lockfish::transport::StreamTransport;
use lockfish::xdr::{PackTo, Packer, UnpackFrom, Unpacker};
use lockfish::Session;

/// A call as seen by a fake server
#[derive(Debug, Clone)]
pub struct Call {
    pub xid: u32,
    pub header: CallHeader,
    pub args: Bytes,
}

impl Call {
    pub fn parse(mut message: Bytes) -> Call {
        let xid = message.unpack_uint().expect("xid");
        let header = CallHeader::unpack_from(&mut message).expect("call header");
        Call {
            xid,
            header,
            args: message,
        }
    }

    /// Decodes the procedure arguments
    pub fn decode<T: UnpackFrom<Bytes>>(&self) -> T {
        T::unpack_from(&mut self.args.clone()).expect("decode arguments")
    }
}

/// What a fake server answers to a call
pub enum Reply {
    /// Accepted, SUCCESS, followed by this result
    Body(Bytes),
    /// Any reply header, no result
    Rpc(ReplyHeader),
    /// Sent as is, xid included
    Raw(Bytes),
}

impl Reply {
    pub fn with<T: PackTo<BytesMut>>(value: &T) -> Reply {
        let mut buf = BytesMut::new();
        value.pack_to(&mut buf);
        Reply::Body(buf.freeze())
    }

    /// NFS result: status, then the matching payload
    pub fn nfs<T: PackTo<BytesMut>>(status: NfsStat3, payload: &T) -> Reply {
        let mut buf = BytesMut::new();
        status.pack_to(&mut buf);
        payload.pack_to(&mut buf);
        Reply::Body(buf.freeze())
    }

    pub fn accepted(stat: AcceptedReplyStat) -> Reply {
        Reply::Rpc(ReplyHeader::Accepted(AcceptedReply {
            verf: OpaqueAuth::None,
            stat,
        }))
    }

    pub fn encode(self, xid: u32) -> Bytes {
        let mut buf = BytesMut::new();
        let header = match self {
            Reply::Raw(raw) => return raw,
            Reply::Body(body) => {
                buf.pack_uint(xid);
                buf.pack_uint(REPLY);
                ReplyHeader::Accepted(AcceptedReply {
                    verf: OpaqueAuth::None,
                    stat: AcceptedReplyStat::Success,
                })
                .pack_to(&mut buf);
                buf.extend_from_slice(&body);
                return buf.freeze();
            }
            Reply::Rpc(header) => header,
        };

        buf.pack_uint(xid);
        buf.pack_uint(REPLY);
        header.pack_to(&mut buf);
        buf.freeze()
    }
}

/// Answers every call arriving on `stream` until the client goes away,
/// returning the calls in order.
pub async fn serve_stream<S, F>(mut stream: S, mut handler: F) -> Vec<Call>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnMut(&Call) -> Reply,
{
    let mut calls = Vec::new();
    while let Ok(message) = record::read_record(&mut stream, record::MAX_RECORD_SIZE).await {
        let call = Call::parse(message);
        let reply = handler(&call).encode(call.xid);
        calls.push(call);
        if record::write_record(&mut stream, &reply).await.is_err() {
            break;
        }
    }
    calls
}

/// Spawns a fake server behind an in-memory pipe
pub fn serve<F>(handler: F) -> (StreamTransport<DuplexStream>, JoinHandle<Vec<Call>>)
where
    F: FnMut(&Call) -> Reply + Send + 'static,
{
    let (client, server) = tokio::io::duplex(64 * 1024);
    let task = tokio::spawn(serve_stream(server, handler));
    (StreamTransport::new(client, record::MAX_RECORD_SIZE), task)
}

/// Accepts TCP connections on a local port forever, answering each with
/// a copy of `handler`
pub async fn listen<F>(handler: F) -> u16
where
    F: FnMut(&Call) -> Reply + Clone + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_stream(stream, handler.clone()));
        }
    });
    port
}

pub fn test_auth() -> AuthConfig {
    AuthConfig::Sys {
        machine_name: "tester".into(),
        uid: 1000,
        gid: 1000,
        gids: vec![],
    }
}

/// RPC client talking to a fake server
pub fn client<F>(program: u32, version: u32, handler: F) -> (RpcClient, JoinHandle<Vec<Call>>)
where
    F: FnMut(&Call) -> Reply + Send + 'static,
{
    let (transport, task) = serve(handler);
    (
        RpcClient::new(program, version, Box::new(transport), test_auth()),
        task,
    )
}

pub fn attributes(file_id: u64, file_type: FileType3, size: u64) -> FileAttributes {
    FileAttributes {
        file_type,
        mode: 0o644,
        num_links: 1,
        uid: 1000,
        gid: 1000,
        size,
        used: size,
        rdev: SpecData3 { data1: 0, data2: 0 },
        fsid: 1,
        file_id,
        atime: NfsTime3::default(),
        mtime: NfsTime3::default(),
        ctime: NfsTime3::default(),
    }
}

pub const ROOT: &[u8] = b"root-handle";

pub struct FakeFile {
    pub file_id: u64,
    pub fh: NfsFh3,
    pub data: Vec<u8>,
}

/// In-memory export with a flat root directory and whole-file locks
#[derive(Default)]
pub struct FakeFs {
    pub files: HashMap<String, FakeFile>,
    next_id: u64,
    /// Lock holder per file handle
    pub locks: HashMap<NfsFh3, Bytes>,
}

pub type SharedFs = Arc<Mutex<FakeFs>>;

impl FakeFs {
    pub fn shared() -> SharedFs {
        Arc::new(Mutex::new(FakeFs::default()))
    }

    pub fn add(&mut self, name: &str) -> NfsFh3 {
        self.next_id += 1;
        let fh = NfsFh3::from(format!("fh-{}", self.next_id).into_bytes());
        self.files.insert(
            name.to_string(),
            FakeFile {
                file_id: self.next_id,
                fh: fh.clone(),
                data: Vec::new(),
            },
        );
        fh
    }

    fn by_handle(&mut self, fh: &NfsFh3) -> Option<&mut FakeFile> {
        self.files.values_mut().find(|file| &file.fh == fh)
    }
}

pub fn nfs_handler(fs: SharedFs) -> impl FnMut(&Call) -> Reply + Clone + Send + 'static {
    move |call| {
        let mut fs = fs.lock().unwrap();
        match call.header.proc {
            nfs3::NFSPROC3_LOOKUP => {
                let args: procs::Lookup3Args = call.decode();
                match fs.files.get(&args.what.name) {
                    Some(file) => Reply::nfs(
                        NfsStat3::NFS3_OK,
                        &procs::Lookup3ResOk {
                            object: file.fh.clone(),
                            obj_attributes: Some(attributes(
                                file.file_id,
                                FileType3::Reg,
                                file.data.len() as u64,
                            )),
                            dir_attributes: None,
                        },
                    ),
                    None => Reply::nfs(
                        NfsStat3::NFS3ERR_NOENT,
                        &procs::Lookup3ResFail {
                            dir_attributes: None,
                        },
                    ),
                }
            }
            nfs3::NFSPROC3_CREATE => {
                let args: procs::Create3Args = call.decode();
                let name = args.create_where.name;
                let existing = fs.files.get(&name).map(|file| file.fh.clone());
                let fh = match existing {
                    Some(fh) => fh,
                    None => fs.add(&name),
                };
                Reply::nfs(
                    NfsStat3::NFS3_OK,
                    &procs::Create3ResOk {
                        obj: Some(fh),
                        attributes: None,
                        dir_wcc: WccData::default(),
                    },
                )
            }
            nfs3::NFSPROC3_WRITE => {
                let args: procs::Write3Args = call.decode();
                match fs.by_handle(&args.file) {
                    Some(file) => {
                        let start = args.offset as usize;
                        let end = start + args.data.len();
                        if file.data.len() < end {
                            file.data.resize(end, 0);
                        }
                        file.data[start..end].copy_from_slice(&args.data);
                        Reply::nfs(
                            NfsStat3::NFS3_OK,
                            &procs::Write3ResOk {
                                file_wcc: WccData::default(),
                                count: args.count,
                                committed: StableHow::FileSync,
                                verifier: 0x5eed,
                            },
                        )
                    }
                    None => Reply::nfs(
                        NfsStat3::NFS3ERR_STALE,
                        &procs::Write3ResFail {
                            file_wcc: WccData::default(),
                        },
                    ),
                }
            }
            nfs3::NFSPROC3_READDIR => {
                let mut entries: Vec<procs::Entry3> = fs
                    .files
                    .iter()
                    .map(|(name, file)| procs::Entry3 {
                        fileid: file.file_id,
                        name: name.clone(),
                        cookie: file.file_id,
                    })
                    .collect();
                entries.sort_by_key(|entry| entry.cookie);
                Reply::nfs(
                    NfsStat3::NFS3_OK,
                    &procs::Readdir3ResOk {
                        dir_attributes: None,
                        verifier: 1,
                        reply: procs::DirList3 { entries, eof: true },
                    },
                )
            }
            _ => Reply::accepted(AcceptedReplyStat::ProcUnavail),
        }
    }
}

pub fn nlm_handler(fs: SharedFs) -> impl FnMut(&Call) -> Reply + Clone + Send + 'static {
    move |call| {
        let mut fs = fs.lock().unwrap();
        match call.header.proc {
            nlm4::NLMPROC4_LOCK => {
                let args: Nlm4LockArgs = call.decode();
                let held_by_other = matches!(
                    fs.locks.get(&args.lock.fh),
                    Some(holder) if *holder != args.lock.owner
                );
                let stat = if held_by_other {
                    Nlm4Stat::NLM4_DENIED
                } else {
                    fs.locks.insert(args.lock.fh.clone(), args.lock.owner.clone());
                    Nlm4Stat::NLM4_GRANTED
                };
                Reply::with(&Nlm4Res {
                    cookie: args.cookie,
                    stat,
                })
            }
            nlm4::NLMPROC4_UNLOCK => {
                let args: Nlm4UnlockArgs = call.decode();
                if fs.locks.get(&args.lock.fh) == Some(&args.lock.owner) {
                    fs.locks.remove(&args.lock.fh);
                }
                Reply::with(&Nlm4Res {
                    cookie: args.cookie,
                    stat: Nlm4Stat::NLM4_GRANTED,
                })
            }
            _ => Reply::accepted(AcceptedReplyStat::ProcUnavail),
        }
    }
}

/// Session over fake NFS and NLM servers sharing `fs`
pub fn session(fs: &SharedFs) -> (Session, JoinHandle<Vec<Call>>, JoinHandle<Vec<Call>>) {
    let config = ClientConfig::new("fake");
    let (nfs_rpc, nfs_calls) = client(nfs3::PROG_NFS, nfs3::VERSION, nfs_handler(fs.clone()));
    let (nlm_rpc, nlm_calls) = client(nlm4::PROG_NLM, nlm4::VERSION, nlm_handler(fs.clone()));
    let session = Session::from_parts(
        NfsFh3::from(ROOT.to_vec()),
        NfsClient::new(nfs_rpc, &config),
        NlmClient::new(nlm_rpc, config.lock),
        "tester",
    );
    (session, nfs_calls, nlm_calls)
}
