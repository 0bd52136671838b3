use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::{Context, Result, bail};
use smol::net::TcpStream;

/// Connects to the first resolved address for `host:port` that accepts a
/// TCP connection. Candidates are tried strictly in resolver order; no
/// racing, no retries.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in resolve(host, port).await? {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                log::debug!("connected to origin {addr}");
                return Ok(stream);
            }
            Err(err) => {
                log::debug!("origin candidate {addr} failed: {err}");
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(err) => Err(err).with_context(|| format!("connect to {host}:{port}")),
        None => bail!("no addresses resolved for {host}:{port}"),
    }
}

/// Resolves `host:port` into candidate addresses on the blocking pool; the
/// system resolver is not async-aware.
async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let owned = host.to_owned();
    let addrs = smol::unblock(move || (owned.as_str(), port).to_socket_addrs())
        .await
        .with_context(|| format!("resolve {host}:{port}"))?;
    Ok(addrs.collect())
}
