//! Port mapper (RFC 1833, version 2) client, used to find the port of the
//! mount, NFS and NLM programs.
use crate::{
    config::Protocol,
    result::{DecodeError, Error, Result},
    rpc::{Connector, RpcClient},
    xdr::{self, Unpacker as _},
};
use lockfish_macros::{PackTo, UnpackFrom};
use tracing::debug;

/// TCP/UDP Port number for the RPC Port Mapper service and RPC bind
pub const PORT: u16 = 111;

pub const PMAP_VERS: u32 = 2;
pub const PMAP_PROG: u32 = 100000;

#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
    pub port: u32,
}

pub const IPPROTO_TCP: u32 = 6; /* protocol number for TCP/IP */
pub const IPPROTO_UDP: u32 = 17; /* protocol number for UDP/IP */

pub const PMAPPROC_NULL: u32 = 0;
pub const PMAPPROC_SET: u32 = 1;
pub const PMAPPROC_UNSET: u32 = 2;
pub const PMAPPROC_GETPORT: u32 = 3;
pub const PMAPPROC_DUMP: u32 = 4;
pub const PMAPPROC_CALLIT: u32 = 5;

pub struct PortmapClient {
    rpc: RpcClient,
}

impl PortmapClient {
    pub fn new(rpc: RpcClient) -> PortmapClient {
        PortmapClient { rpc }
    }

    pub async fn null(&mut self) -> Result<()> {
        self.rpc.null().await
    }

    /// Raw GETPORT, 0 means the program is not registered
    pub async fn getport(&mut self, program: u32, version: u32, protocol: Protocol) -> Result<u32> {
        let mapping = Mapping {
            prog: program,
            vers: version,
            prot: protocol.number(),
            port: 0,
        };
        self.rpc
            .call(PMAPPROC_GETPORT, &mapping, |buf| buf.unpack_uint())
            .await
    }

    /// All registered mappings
    pub async fn dump(&mut self) -> Result<Vec<Mapping>> {
        self.rpc
            .call(PMAPPROC_DUMP, &(), |buf| buf.unpack_list::<Mapping>())
            .await
    }
}

/// Validates a GETPORT answer
fn to_port(port: u32, program: u32, version: u32) -> Result<u16> {
    match port {
        0 => Err(Error::ProgramNotRegistered { program, version }),
        port => u16::try_from(port).map_err(|_| DecodeError::OutOfRange(port as u64).into()),
    }
}

/// Looks up the port of `program`/`version` over a short-lived connection
/// to the port mapper, closed before returning.
pub async fn get_port(
    connector: &mut Connector,
    program: u32,
    version: u32,
    protocol: Protocol,
) -> Result<u16> {
    let portmap_port = connector.config().portmap_port;
    let rpc = connector
        .connect_port(PMAP_PROG, PMAP_VERS, protocol, portmap_port)
        .await?;
    let port = PortmapClient::new(rpc)
        .getport(program, version, protocol)
        .await?;

    debug!(
        "program {} version {} over {:?} is at port {}",
        program, version, protocol, port
    );
    to_port(port, program, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_port() {
        assert_eq!(to_port(2049, 100003, 3).unwrap(), 2049);
        assert!(matches!(
            to_port(0, 100021, 4),
            Err(Error::ProgramNotRegistered {
                program: 100021,
                version: 4
            })
        ));
        assert!(matches!(
            to_port(70000, 100003, 3),
            Err(Error::Decode(DecodeError::OutOfRange(70000)))
        ));
    }
}
