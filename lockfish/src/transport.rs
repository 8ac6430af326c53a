//! Transports carry one encoded call to the server and bring back the
//! matching reply.
use crate::{
    config::RetryPolicy,
    record,
    result::{Error, Result},
};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// Largest datagram accepted as a reply
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// Sends a single call and waits for its reply.
///
/// Only one call is ever outstanding on a transport; `exchange` takes
/// `&mut self` so the compiler enforces it.
#[async_trait]
pub trait Transport: Send {
    /// Sends `call` (a complete RPC message starting with `xid`) and returns
    /// the reply message.  Matching the reply xid is left to the caller,
    /// except where the transport has to discard stale datagrams itself.
    async fn exchange(&mut self, xid: u32, call: Bytes) -> Result<Bytes>;
}

/// Record-marked transport over a byte stream (TCP, or an in-memory pipe)
pub struct StreamTransport<S> {
    stream: S,
    max_record_size: usize,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S, max_record_size: usize) -> StreamTransport<S> {
        StreamTransport {
            stream,
            max_record_size,
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for StreamTransport<S> {
    async fn exchange(&mut self, xid: u32, call: Bytes) -> Result<Bytes> {
        trace!("xid {:#x}: sending {} bytes", xid, call.len());
        record::write_record(&mut self.stream, &call).await?;
        record::read_record(&mut self.stream, self.max_record_size).await
    }
}

/// One message per datagram over a connected UDP socket, retransmitting
/// on timeout.
pub struct DatagramTransport {
    socket: UdpSocket,
    retry: RetryPolicy,
}

impl DatagramTransport {
    /// `socket` must already be connected to the server
    pub fn new(socket: UdpSocket, retry: RetryPolicy) -> DatagramTransport {
        DatagramTransport { socket, retry }
    }
}

/// Reads the xid at the start of a datagram, if there is one
fn peek_xid(datagram: &[u8]) -> Option<u32> {
    let head: [u8; 4] = datagram.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(head))
}

#[async_trait]
impl Transport for DatagramTransport {
    async fn exchange(&mut self, xid: u32, call: Bytes) -> Result<Bytes> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut timeout = self.retry.initial_timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;
            trace!("xid {:#x}: sending datagram, attempt {}", xid, attempts);
            self.socket.send(&call).await?;

            let deadline = Instant::now() + timeout;
            loop {
                let len = match timeout_at(deadline, self.socket.recv(&mut buf)).await {
                    Ok(received) => received?,
                    Err(_) => break,
                };

                match peek_xid(&buf[..len]) {
                    Some(got) if got == xid => return Ok(Bytes::copy_from_slice(&buf[..len])),
                    got => debug!("xid {:#x}: discarding datagram with xid {:?}", xid, got),
                }
            }

            if attempts > self.retry.retries {
                return Err(Error::Timeout { attempts });
            }

            timeout = self.retry.backoff(timeout);
            debug!(
                "xid {:#x}: no reply, retransmitting with timeout {:?}",
                xid, timeout
            );
        }
    }
}
