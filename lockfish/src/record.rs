//! Record Marking Standard (RFC 5531 section 11) for byte-stream
//! transports.
//!
//! Every fragment is preceded by a 4-byte big-endian header: bit 31 flags
//! the last fragment of a record, bits 0-30 hold the fragment length.
use crate::result::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

pub const LAST_FRAGMENT: u32 = 0x80000000;

/// Largest fragment the 31-bit length field can describe
pub const MAX_FRAGMENT_SIZE: usize = (LAST_FRAGMENT - 1) as usize;

/// Default limit on the size of a reassembled record
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Builds a fragment header
#[inline]
pub fn fragment_header(len: usize, last: bool) -> [u8; 4] {
    let mut header = len as u32 & !LAST_FRAGMENT;
    if last {
        header |= LAST_FRAGMENT;
    }
    header.to_be_bytes()
}

/// Writes `message` as a single record.  The whole message is sent as one
/// last fragment unless it exceeds [`MAX_FRAGMENT_SIZE`].
pub async fn write_record<S: AsyncWrite + Unpin>(stream: &mut S, message: &[u8]) -> Result<()> {
    let mut out = BytesMut::with_capacity(message.len() + 4);
    let mut chunks = message.chunks(MAX_FRAGMENT_SIZE).peekable();
    if chunks.peek().is_none() {
        out.put_slice(&fragment_header(0, true));
    }
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        trace!("writing fragment length:{}, last:{}", chunk.len(), last);
        out.put_slice(&fragment_header(chunk.len(), last));
        out.put_slice(chunk);
    }

    stream.write_all(&out).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one record, reassembling its fragments, allowing at most
/// `max_size` bytes in total.
///
/// A peer closing the stream before the last fragment is complete results
/// in [`Error::EndOfStream`].
pub async fn read_record<S: AsyncRead + Unpin>(stream: &mut S, max_size: usize) -> Result<Bytes> {
    let mut record = BytesMut::new();
    let mut read_last = false;

    while !read_last {
        let mut header = [0u8; 4];
        read_full(stream, &mut header).await?;
        let mark = u32::from_be_bytes(header);
        read_last = (mark & LAST_FRAGMENT) != 0;
        let fragment_size = (mark & !LAST_FRAGMENT) as usize;
        trace!("reading fragment length:{}, last:{}", fragment_size, read_last);

        let size = record.len().saturating_add(fragment_size);
        if size > max_size {
            return Err(Error::RecordTooLarge {
                size,
                limit: max_size,
            });
        }

        let start = record.len();
        record.resize(size, 0);
        read_full(stream, &mut record[start..]).await?;
    }

    Ok(record.freeze())
}

/// `read_exact` that reports a closed stream as [`Error::EndOfStream`]
async fn read_full<S: AsyncRead + Unpin>(stream: &mut S, buf: &mut [u8]) -> Result<()> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::EndOfStream),
        Err(err) => Err(err.into()),
    }
}
