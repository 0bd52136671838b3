use anyhow::{Context, Result, bail};
use smol::io::AsyncRead;

use crate::http::RequestTarget;
use crate::io::{self, MAX_LINE};

/// The User-Agent the proxy presents upstream, replacing the client's.
const USER_AGENT_FLD: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";
const CONNECTION_FLD: &str = "Connection: close\r\n";
const PROXY_CONNECTION_FLD: &str = "Proxy-Connection: close\r\n";
const BLANK_LINE: &[u8] = b"\r\n";

/// Consumes the client's remaining header lines and assembles the header
/// block sent to the origin: an origin-form HTTP/1.0 request line, the
/// client's `Host` (or one synthesized from `target`), the proxy's own
/// identity fields, and every other client line verbatim. Fails if the
/// client's header block does not end in a blank line.
pub async fn build_request_header<R>(reader: &mut R, target: &RequestTarget) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let request_line = format!("GET {} HTTP/1.0\r\n", target.path);
    let mut host_fld = format!("Host: {}:{}\r\n", target.host, target.port).into_bytes();
    let mut passthrough: Vec<u8> = Vec::new();

    let mut line = Vec::with_capacity(MAX_LINE);
    loop {
        let n = io::read_line(reader, &mut line)
            .await
            .context("read header line from client")?;
        if n == 0 {
            bail!("client header block ended before the blank line");
        }
        if line == BLANK_LINE {
            break;
        }
        if starts_with_ignore_case(&line, b"Host:") {
            host_fld = line.clone();
            continue;
        }
        if starts_with_ignore_case(&line, b"User-Agent:")
            || starts_with_ignore_case(&line, b"Connection:")
            || starts_with_ignore_case(&line, b"Proxy-Connection:")
        {
            continue;
        }
        passthrough.extend_from_slice(&line);
    }

    let mut header = Vec::with_capacity(MAX_LINE);
    header.extend_from_slice(request_line.as_bytes());
    header.extend_from_slice(&host_fld);
    header.extend_from_slice(USER_AGENT_FLD.as_bytes());
    header.extend_from_slice(&passthrough);
    header.extend_from_slice(CONNECTION_FLD.as_bytes());
    header.extend_from_slice(PROXY_CONNECTION_FLD.as_bytes());
    header.extend_from_slice(BLANK_LINE);
    Ok(header)
}

fn starts_with_ignore_case(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix)
}
