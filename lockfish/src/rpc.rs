//! ONC RPC v2 (RFC 5531) message headers and the generic call engine.
use crate::{
    config::{AuthConfig, ClientConfig, Protocol, ReservedPorts},
    portmap,
    result::{AcceptError, DenyError, Error, Result},
    transport::{DatagramTransport, StreamTransport, Transport},
    xdr::{self, PackTo, Packer as _, UnpackFrom, Unpacker as _},
};
use bytes::{Buf, Bytes, BytesMut};
use lockfish_macros::{PackTo, UnpackFrom};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::{debug, trace, warn};

pub const CALL: u32 = 0;
pub const REPLY: u32 = 1;

/// The only RPC protocol version
pub const RPC_VERSION: u32 = 2;

pub const AUTH_NONE: u32 = 0;
pub const AUTH_SYS: u32 = 1;
pub const AUTH_SHORT: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSys {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

/// RFC5531 opaque_auth
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpaqueAuth {
    None,
    Sys(AuthSys),
    /// Any other flavor, body kept undecoded
    Other { flavor: u32, body: Bytes },
}

impl OpaqueAuth {
    /// Builds a credential from the configured authentication
    pub fn from_config(auth: &AuthConfig) -> OpaqueAuth {
        match auth {
            AuthConfig::None => OpaqueAuth::None,
            AuthConfig::Sys {
                machine_name,
                uid,
                gid,
                gids,
            } => OpaqueAuth::Sys(AuthSys {
                stamp: AuthConfig::stamp(),
                machine_name: machine_name.clone(),
                uid: *uid,
                gid: *gid,
                gids: gids.clone(),
            }),
        }
    }
}

impl<B: xdr::Packer> xdr::PackTo<B> for OpaqueAuth {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_auth(self);
    }
}

impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for OpaqueAuth {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        buf.unpack_auth()
    }
}

/// Corresponds to RFC5531 call_body, preceded by the message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    // rpcvers is hardcoded 2
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

impl<B: xdr::Packer> xdr::PackTo<B> for CallHeader {
    #[inline]
    fn pack_to(&self, buf: &mut B) {
        buf.pack_call_header(self);
    }
}

impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for CallHeader {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        buf.unpack_call_header()
    }
}

/// Corresponds to RFC5531 reply_body
#[derive(UnpackFrom, PackTo, Debug)]
pub enum ReplyHeader {
    Accepted(AcceptedReply),
    Denied(RejectedReply),
}

#[derive(UnpackFrom, PackTo, Debug)]
pub struct AcceptedReply {
    pub verf: OpaqueAuth,
    pub stat: AcceptedReplyStat,
}

#[derive(UnpackFrom, PackTo, Debug)]
pub enum AcceptedReplyStat {
    Success,
    ProgUnavail,
    ProgMismatch(MismatchInfo),
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchInfo {
    pub low: u32,
    pub high: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStat {
    Ok,
    BadCred,
    RejectedCred,
    BadVerf,
    RejectedVerf,
    TooWeak,
    InvalidResp,
    Failed,
    KerbGeneric,
    TimeExpire,
    TktFile,
    Decode,
    NetAddr,
    CredProblem,
    CtxProblem,
}

#[derive(PackTo, UnpackFrom, Debug)]
pub enum RejectedReply {
    RpcMismatch(MismatchInfo),
    AuthError(AuthStat),
}

impl AcceptedReplyStat {
    /// Maps every status but SUCCESS to an error
    pub fn into_result(self) -> Result<()> {
        let err = match self {
            AcceptedReplyStat::Success => return Ok(()),
            AcceptedReplyStat::ProgUnavail => AcceptError::ProgUnavail,
            AcceptedReplyStat::ProgMismatch(MismatchInfo { low, high }) => {
                AcceptError::ProgMismatch { low, high }
            }
            AcceptedReplyStat::ProcUnavail => AcceptError::ProcUnavail,
            AcceptedReplyStat::GarbageArgs => AcceptError::GarbageArgs,
            AcceptedReplyStat::SystemErr => AcceptError::SystemErr,
        };
        Err(err.into())
    }
}

impl From<RejectedReply> for DenyError {
    fn from(rejected: RejectedReply) -> Self {
        match rejected {
            RejectedReply::RpcMismatch(MismatchInfo { low, high }) => {
                DenyError::RpcMismatch { low, high }
            }
            RejectedReply::AuthError(stat) => DenyError::AuthError(stat),
        }
    }
}

/// Trait for packing RPC header
pub trait Packer {
    fn pack_call_header(&mut self, header: &CallHeader);
    fn pack_auth(&mut self, auth: &OpaqueAuth);
    fn pack_auth_sys(&mut self, auth: &AuthSys);
}

/// Trait for unpacking RPC header
pub trait Unpacker {
    fn unpack_call_header(&mut self) -> Result<CallHeader>;
    fn unpack_auth(&mut self) -> Result<OpaqueAuth>;
    fn unpack_auth_sys(&mut self) -> Result<AuthSys>;
}

impl<T: xdr::Packer> Packer for T {
    fn pack_call_header(&mut self, header: &CallHeader) {
        self.pack_uint(CALL);
        self.pack_uint(RPC_VERSION);
        self.pack_uint(header.prog);
        self.pack_uint(header.vers);
        self.pack_uint(header.proc);
        self.pack_auth(&header.cred);
        self.pack_auth(&header.verf);
    }

    fn pack_auth(&mut self, auth: &OpaqueAuth) {
        match auth {
            OpaqueAuth::None => {
                self.pack_uint(AUTH_NONE);
                self.pack_uint(0)
            }
            OpaqueAuth::Sys(auth_sys) => {
                self.pack_uint(AUTH_SYS);
                self.pack_auth_sys(auth_sys)
            }
            OpaqueAuth::Other { flavor, body } => {
                self.pack_uint(*flavor);
                self.pack_opaque(body)
            }
        }
    }

    fn pack_auth_sys(&mut self, auth: &AuthSys) {
        let mut body = BytesMut::new();
        body.pack_uint(auth.stamp);
        body.pack_string(&auth.machine_name);
        body.pack_uint(auth.uid);
        body.pack_uint(auth.gid);
        body.pack_array(&auth.gids, |packer, item| packer.pack_uint(*item));
        self.pack_opaque(&body);
    }
}

impl<T: xdr::Unpacker> Unpacker for T {
    fn unpack_call_header(&mut self) -> Result<CallHeader> {
        let msg_type = self.unpack_uint()?;
        if msg_type != CALL {
            return Err(xdr::unknown_variant("msg_type", msg_type));
        }

        let rpcvers = self.unpack_uint()?;
        if rpcvers != RPC_VERSION {
            return Err(DenyError::RpcMismatch {
                low: RPC_VERSION,
                high: RPC_VERSION,
            }
            .into());
        }

        Ok(CallHeader {
            prog: self.unpack_uint()?,
            vers: self.unpack_uint()?,
            proc: self.unpack_uint()?,
            cred: self.unpack_auth()?,
            verf: self.unpack_auth()?,
        })
    }

    fn unpack_auth(&mut self) -> Result<OpaqueAuth> {
        let flavor = self.unpack_uint()?;
        match flavor {
            AUTH_NONE => {
                // Body is "recommended" to be empty, contents are ignored
                self.unpack_opaque()?;
                Ok(OpaqueAuth::None)
            }
            AUTH_SYS => Ok(OpaqueAuth::Sys(self.unpack_auth_sys()?)),
            _ => Ok(OpaqueAuth::Other {
                flavor,
                body: self.unpack_opaque()?,
            }),
        }
    }

    fn unpack_auth_sys(&mut self) -> Result<AuthSys> {
        let mut opaque: Bytes = self.unpack_opaque()?;
        Ok(AuthSys {
            stamp: opaque.unpack_uint()?,
            machine_name: opaque.unpack_string()?,
            uid: opaque.unpack_uint()?,
            gid: opaque.unpack_uint()?,
            gids: opaque.unpack_vec(|unpacker| unpacker.unpack_uint())?,
        })
    }
}

/// Client for a single program/version over a single transport.
///
/// Calls are strictly sequential: `call` takes `&mut self` and waits for
/// the matching reply before returning.
pub struct RpcClient {
    program: u32,
    version: u32,
    transport: Box<dyn Transport>,
    auth: AuthConfig,
    /// Built on first call, then reused for the lifetime of the client
    cred: Option<OpaqueAuth>,
    last_xid: u32,
}

impl RpcClient {
    pub fn new(
        program: u32,
        version: u32,
        transport: Box<dyn Transport>,
        auth: AuthConfig,
    ) -> RpcClient {
        RpcClient {
            program,
            version,
            transport,
            auth,
            cred: None,
            last_xid: 0,
        }
    }

    pub fn program(&self) -> u32 {
        self.program
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// xid of the most recent call, 0 before the first one
    pub fn last_xid(&self) -> u32 {
        self.last_xid
    }

    /// Returns a new xid (RPC transaction ID).
    ///
    /// According to the RFC:
    /// "The "xid" field is only used for clients matching reply
    /// messages with call messages or for servers detecting
    /// retransmissions; the service side cannot treat this id as any
    /// type of sequence number."
    fn next_xid(&mut self) -> u32 {
        self.last_xid = self.last_xid.wrapping_add(1);
        self.last_xid
    }

    fn call_header(&mut self, proc: u32) -> CallHeader {
        let auth = &self.auth;
        let cred = self
            .cred
            .get_or_insert_with(|| OpaqueAuth::from_config(auth))
            .clone();
        CallHeader {
            prog: self.program,
            vers: self.version,
            proc,
            cred,
            verf: OpaqueAuth::None,
        }
    }

    /// Calls `proc` with `args` and decodes the result with `unpack`.
    ///
    /// RPC level failures (denied, or accepted with a status other than
    /// SUCCESS) are returned as errors, the procedure result is left
    /// entirely to `unpack`.
    pub async fn call<A, R, F>(&mut self, proc: u32, args: &A, unpack: F) -> Result<R>
    where
        A: PackTo<BytesMut> + ?Sized,
        F: FnOnce(&mut Bytes) -> Result<R>,
    {
        let xid = self.next_xid();
        let header = self.call_header(proc);
        trace!(
            "call xid:{:#x} prog:{} vers:{} proc:{}",
            xid,
            header.prog,
            header.vers,
            header.proc
        );

        let mut buf = BytesMut::new();
        buf.pack_uint(xid);
        header.pack_to(&mut buf);
        args.pack_to(&mut buf);

        let mut reply = self.transport.exchange(xid, buf.freeze()).await?;
        check_reply(xid, &mut reply)?;

        let result = unpack(&mut reply)?;
        if reply.has_remaining() {
            warn!(
                "xid {:#x}: {} trailing bytes after proc {} result",
                xid,
                reply.remaining(),
                proc
            );
        }

        Ok(result)
    }

    /// Calls `proc` and decodes the result as `R`
    pub async fn call_decode<A, R>(&mut self, proc: u32, args: &A) -> Result<R>
    where
        A: PackTo<BytesMut> + ?Sized,
        R: UnpackFrom<Bytes>,
    {
        self.call(proc, args, |buf| R::unpack_from(buf)).await
    }

    /// Procedure 0, which takes and returns nothing
    pub async fn null(&mut self) -> Result<()> {
        self.call(0, &(), |_| Ok(())).await
    }
}

/// Validates the reply header for call `xid`, leaving `reply` positioned at
/// the procedure result.
fn check_reply(xid: u32, reply: &mut Bytes) -> Result<()> {
    let got = reply.unpack_uint()?;
    if got != xid {
        return Err(Error::XidMismatch { expected: xid, got });
    }

    let msg_type = reply.unpack_uint()?;
    if msg_type != REPLY {
        return Err(Error::NotAReply(msg_type));
    }

    match ReplyHeader::unpack_from(reply)? {
        ReplyHeader::Accepted(AcceptedReply { stat, .. }) => stat.into_result(),
        ReplyHeader::Denied(denied) => Err(DenyError::from(denied).into()),
    }
}

/// Opens connections to the configured host and wraps them in
/// [`RpcClient`]s.
///
/// Owns the reserved port walk so that consecutive connections do not retry
/// the same busy ports.
pub struct Connector {
    config: ClientConfig,
    reserved: ReservedPorts,
}

impl Connector {
    pub fn new(config: ClientConfig) -> Connector {
        Connector {
            config,
            reserved: ReservedPorts::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to `program`/`version`, asking the port mapper for its port
    /// over the configured protocol.
    pub async fn connect(&mut self, program: u32, version: u32) -> Result<RpcClient> {
        let protocol = self.config.protocol;
        let port = portmap::get_port(self, program, version, protocol).await?;
        self.connect_port(program, version, protocol, port).await
    }

    /// Connects to `program`/`version` at a known port
    pub async fn connect_port(
        &mut self,
        program: u32,
        version: u32,
        protocol: Protocol,
        port: u16,
    ) -> Result<RpcClient> {
        let addr = self.resolve(port).await?;
        debug!(
            "connecting to {} over {:?} for program {} version {}",
            addr, protocol, program, version
        );

        let transport: Box<dyn Transport> = match protocol {
            Protocol::Tcp => Box::new(StreamTransport::new(
                self.connect_stream(addr).await?,
                self.config.max_record_size,
            )),
            Protocol::Udp => Box::new(DatagramTransport::new(
                self.connect_datagram(addr).await?,
                self.config.retry,
            )),
        };

        Ok(RpcClient::new(
            program,
            version,
            transport,
            self.config.auth.clone(),
        ))
    }

    async fn resolve(&self, port: u16) -> Result<SocketAddr> {
        let host = self.config.host.as_str();
        tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve {}", host)).into()
            })
    }

    async fn connect_stream(&mut self, addr: SocketAddr) -> Result<TcpStream> {
        if !self.config.use_reserved_port {
            return Ok(TcpStream::connect(addr).await?);
        }

        let socket = self.reserved.bind(|port| {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.bind(SocketAddr::new(unspecified(&addr), port))?;
            Ok(socket)
        })?;

        Ok(socket.connect(addr).await?)
    }

    async fn connect_datagram(&mut self, addr: SocketAddr) -> Result<UdpSocket> {
        let socket = if self.config.use_reserved_port {
            let socket = self.reserved.bind(|port| {
                let socket = std::net::UdpSocket::bind(SocketAddr::new(unspecified(&addr), port))?;
                socket.set_nonblocking(true)?;
                Ok(socket)
            })?;
            UdpSocket::from_std(socket)?
        } else {
            UdpSocket::bind(SocketAddr::new(unspecified(&addr), 0)).await?
        };

        socket.connect(addr).await?;
        Ok(socket)
    }
}

/// Wildcard address of the same family as `addr`
fn unspecified(addr: &SocketAddr) -> IpAddr {
    match addr {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}
