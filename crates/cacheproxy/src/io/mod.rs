use std::io;

use smol::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest line the proxy will read from a peer. HTTP Semantics (RFC 9110)
/// recommends supporting at least 8000 octets.
pub const MAX_LINE: usize = 8192;

/// Reads one line from `reader` into `line`, terminator included.
///
/// Returns the number of bytes read. Returns `Ok(0)` when the peer closes
/// before a terminator arrives, or when [`MAX_LINE`] bytes arrive without
/// one; callers treat both as an unusable line.
pub async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    line.clear();
    let mut byte = [0u8; 1];
    while line.len() < MAX_LINE {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Ok(0);
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            return Ok(line.len());
        }
    }
    Ok(0)
}

/// Writes the whole of `buf` to `writer`, retrying zero-progress
/// interruptions until every byte has been handed to the kernel.
pub async fn write_all<W>(writer: &mut W, mut buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while !buf.is_empty() {
        match writer.write(buf).await {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
