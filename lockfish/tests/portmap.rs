mod support;

use bytes::{Bytes, BytesMut};
use lockfish::config::{ClientConfig, Protocol};
use lockfish::portmap::{self, Mapping, PortmapClient, PMAPPROC_DUMP, PMAPPROC_GETPORT};
use lockfish::result::Error;
use lockfish::rpc::{AcceptedReplyStat, Connector};
use lockfish::xdr::{PackTo, Packer};
use support::{listen, test_auth, Call, Reply};

const PROGRAM: u32 = 300000;
const MISSING: u32 = 300001;

fn mappings(service_port: u16) -> Vec<Mapping> {
    vec![
        Mapping {
            prog: portmap::PMAP_PROG,
            vers: portmap::PMAP_VERS,
            prot: portmap::IPPROTO_TCP,
            port: portmap::PORT as u32,
        },
        Mapping {
            prog: PROGRAM,
            vers: 1,
            prot: portmap::IPPROTO_TCP,
            port: service_port as u32,
        },
    ]
}

fn portmapper(service_port: u16) -> impl Fn(&Call) -> Reply + Clone + Send + 'static {
    move |call| match call.header.proc {
        PMAPPROC_GETPORT => {
            let wanted: Mapping = call.decode();
            let port = mappings(service_port)
                .into_iter()
                .find(|m| m.prog == wanted.prog && m.vers == wanted.vers && m.prot == wanted.prot)
                .map_or(0, |m| m.port);
            Reply::with(&port)
        }
        PMAPPROC_DUMP => {
            let mut body = BytesMut::new();
            body.pack_list(&mappings(service_port), |buf, m| m.pack_to(buf));
            Reply::Body(body.freeze())
        }
        0 => Reply::Body(Bytes::new()),
        _ => Reply::accepted(AcceptedReplyStat::ProcUnavail),
    }
}

async fn setup() -> Connector {
    let service_port = listen(|_: &Call| Reply::Body(Bytes::new())).await;
    let portmap_port = listen(portmapper(service_port)).await;

    let mut config = ClientConfig::new("127.0.0.1");
    config.portmap_port = portmap_port;
    config.auth = test_auth();
    Connector::new(config)
}

#[tokio::test]
async fn test_connect_through_portmapper() {
    let mut connector = setup().await;

    let mut rpc = connector.connect(PROGRAM, 1).await.expect("connect");
    assert_eq!(rpc.program(), PROGRAM);
    rpc.null().await.expect("null call");
}

#[tokio::test]
async fn test_not_registered() {
    let mut connector = setup().await;

    match portmap::get_port(&mut connector, MISSING, 1, Protocol::Tcp).await {
        Err(Error::ProgramNotRegistered {
            program: MISSING,
            version: 1,
        }) => {}
        other => panic!("unexpected {:?}", other),
    }

    // Wrong version or protocol is not registered either
    assert!(connector.connect(PROGRAM, 2).await.is_err());
    assert!(portmap::get_port(&mut connector, PROGRAM, 1, Protocol::Udp)
        .await
        .is_err());
}

#[tokio::test]
async fn test_getport_and_dump() {
    let mut connector = setup().await;
    let portmap_port = connector.config().portmap_port;
    let rpc = connector
        .connect_port(portmap::PMAP_PROG, portmap::PMAP_VERS, Protocol::Tcp, portmap_port)
        .await
        .unwrap();
    let mut client = PortmapClient::new(rpc);

    client.null().await.unwrap();
    assert_eq!(client.getport(MISSING, 1, Protocol::Tcp).await.unwrap(), 0);

    let dump = client.dump().await.unwrap();
    assert_eq!(dump.len(), 2);
    assert_eq!(dump[1].prog, PROGRAM);
    assert_eq!(
        client.getport(PROGRAM, 1, Protocol::Tcp).await.unwrap(),
        dump[1].port
    );
}
