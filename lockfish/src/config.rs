//! Client configuration.
//!
//! [`ClientConfig`] carries everything needed to reach a server and build
//! protocol clients: host, transport protocol, credentials, datagram retry
//! policy and protocol defaults.  Every field has a default matching the
//! usual behaviour of NFS clients, so most callers only set `host`.
use crate::result::{Error, Result};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Transport protocol used to reach a program.  The discriminants are the
/// IP protocol numbers used by the port mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp = 6,
    Udp = 17,
}

impl Protocol {
    /// IP protocol number, as sent in a port mapper query
    pub const fn number(self) -> u32 {
        self as u32
    }
}

/// Credentials sent with every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// AUTH_NONE
    None,
    /// AUTH_SYS (a.k.a. AUTH_UNIX)
    Sys {
        machine_name: String,
        uid: u32,
        gid: u32,
        gids: Vec<u32>,
    },
}

impl AuthConfig {
    /// AUTH_SYS credentials of the calling process: local host name,
    /// effective uid and gid, no supplementary groups.
    pub fn local() -> AuthConfig {
        // SAFETY: getuid/getgid cannot fail and have no preconditions
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        AuthConfig::Sys {
            machine_name: local_hostname().unwrap_or_else(|_| "localhost".to_string()),
            uid,
            gid,
            gids: Vec::new(),
        }
    }

    /// Stamp for a fresh AUTH_SYS credential: seconds since the epoch
    pub(crate) fn stamp() -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::local()
    }
}

pub(crate) fn local_hostname() -> io::Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Retransmission policy for datagram transports.  Each retransmission
/// doubles the wait, up to `max_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_timeout: Duration,
    pub max_timeout: Duration,
    /// Number of retransmissions after the first send
    pub retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_timeout: Duration::from_secs(1),
            max_timeout: Duration::from_secs(25),
            retries: 5,
        }
    }
}

impl RetryPolicy {
    /// Timeout to use after `timeout` expired
    pub fn backoff(&self, timeout: Duration) -> Duration {
        (timeout * 2).min(self.max_timeout)
    }
}

/// Fields of a lock request that are not chosen per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockDefaults {
    /// Unique per-process lock owner id
    pub svid: i32,
    /// NSM state of the client
    pub state: i32,
}

impl Default for LockDefaults {
    fn default() -> Self {
        LockDefaults { svid: 4, state: 3 }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub protocol: Protocol,
    pub portmap_port: u16,
    pub auth: AuthConfig,
    pub retry: RetryPolicy,
    /// Limit on the size of a reassembled stream record
    pub max_record_size: usize,
    /// READDIR `count`
    pub readdir_count: u32,
    /// READDIRPLUS `dircount` and `maxcount`
    pub readdirplus_maxcount: u32,
    /// Bind the local end of every socket to a port below 1024
    pub use_reserved_port: bool,
    pub lock: LockDefaults,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "localhost".to_string(),
            protocol: Protocol::Tcp,
            portmap_port: crate::portmap::PORT,
            auth: AuthConfig::default(),
            retry: RetryPolicy::default(),
            max_record_size: crate::record::MAX_RECORD_SIZE,
            readdir_count: 2000,
            readdirplus_maxcount: 2000,
            use_reserved_port: false,
            lock: LockDefaults::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> ClientConfig {
        ClientConfig {
            host: host.into(),
            ..Default::default()
        }
    }
}

const FIRST_RESERVED: u16 = 600;
const LAST_RESERVED: u16 = 1024;

/// Walks the reserved port range looking for a free local port.
///
/// The walk starts where the previous successful bind left off, so
/// consecutive sockets do not keep retrying the same busy ports.
#[derive(Debug, Clone)]
pub struct ReservedPorts {
    last_tried: u16,
}

impl Default for ReservedPorts {
    fn default() -> Self {
        let span = (LAST_RESERVED - FIRST_RESERVED) as u32;
        ReservedPorts::starting_at(FIRST_RESERVED + (std::process::id() % span) as u16)
    }
}

impl ReservedPorts {
    pub fn starting_at(port: u16) -> ReservedPorts {
        ReservedPorts {
            last_tried: port.clamp(FIRST_RESERVED, LAST_RESERVED - 1),
        }
    }

    /// Order in which ports are tried: from the last tried port to the top
    /// of the range, then wrapping around to the bottom.
    pub fn candidates(&self) -> impl Iterator<Item = u16> {
        (self.last_tried..LAST_RESERVED).chain(FIRST_RESERVED..self.last_tried)
    }

    /// Calls `bind` with every candidate port until it succeeds.  Ports
    /// that are in use (or not permitted) are skipped, any other error is
    /// returned immediately.
    pub fn bind<T, F>(&mut self, mut bind: F) -> Result<T>
    where
        F: FnMut(u16) -> io::Result<T>,
    {
        let candidates: Vec<u16> = self.candidates().collect();
        for port in candidates {
            self.last_tried = port;
            match bind(port) {
                Ok(socket) => return Ok(socket),
                Err(err)
                    if err.kind() == io::ErrorKind::AddrInUse
                        || err.kind() == io::ErrorKind::PermissionDenied =>
                {
                    continue
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::NoReservedPort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("filer");
        assert_eq!(config.host, "filer");
        assert_eq!(config.protocol, Protocol::Tcp);
        assert_eq!(config.portmap_port, 111);
        assert_eq!(config.max_record_size, 1024 * 1024);
        assert_eq!(config.lock, LockDefaults { svid: 4, state: 3 });
        assert!(!config.use_reserved_port);
        assert!(matches!(config.auth, AuthConfig::Sys { .. }));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        let mut timeout = policy.initial_timeout;
        let mut waits = Vec::new();
        for _ in 0..policy.retries {
            waits.push(timeout.as_secs());
            timeout = policy.backoff(timeout);
        }
        assert_eq!(waits, vec![1, 2, 4, 8, 16]);
        assert_eq!(timeout, Duration::from_secs(25));
        assert_eq!(policy.backoff(timeout), Duration::from_secs(25));
    }

    #[test]
    fn test_reserved_port_order() {
        let ports = ReservedPorts::starting_at(1020);
        let candidates: Vec<u16> = ports.candidates().collect();
        assert_eq!(candidates.len(), 424);
        assert_eq!(&candidates[..5], &[1020, 1021, 1022, 1023, 600]);
        assert_eq!(candidates.last(), Some(&1019));
    }

    #[test]
    fn test_reserved_port_skips_busy() {
        let mut ports = ReservedPorts::starting_at(700);
        let port = ports
            .bind(|port| {
                if port < 703 {
                    Err(io::ErrorKind::AddrInUse.into())
                } else {
                    Ok(port)
                }
            })
            .unwrap();
        assert_eq!(port, 703);
        // The next walk resumes from the last bound port
        assert_eq!(ports.candidates().next(), Some(703));
    }

    #[test]
    fn test_reserved_port_exhausted() {
        let mut ports = ReservedPorts::default();
        let result: Result<()> = ports.bind(|_| Err(io::ErrorKind::AddrInUse.into()));
        assert!(matches!(result, Err(Error::NoReservedPort)));
    }

    #[test]
    fn test_reserved_port_other_error() {
        let mut ports = ReservedPorts::default();
        let result: Result<()> = ports.bind(|_| Err(io::ErrorKind::Other.into()));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
