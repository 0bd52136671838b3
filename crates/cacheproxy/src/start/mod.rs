use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use mea::waitgroup::WaitGroup;
use smol::{
    future,
    io::{AsyncReadExt, BufReader},
    net::{TcpListener, TcpStream},
};
use socket2::{Domain, Protocol, Socket, Type};

use crate::cache::{MAX_OBJECT_SIZE, ObjectCache};
use crate::http::{RequestLine, RequestTarget, build_request_header};
use crate::init::shutdown::GracefulShutdown;
use crate::io::{self, MAX_LINE};
use crate::upstream;

const LISTEN_BACKLOG: i32 = 1024;

/// Binds the client-facing listener on `INADDR_ANY:port`.
pub fn bind_listener(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(TcpListener::try_from(std::net::TcpListener::from(socket))?)
}

/// Accept loop. Spawns one detached worker per accepted connection; the
/// worker owns its client stream from accept to close and shares nothing
/// with its siblings but the cache.
pub async fn serve(
    listener: TcpListener,
    cache: Arc<ObjectCache>,
    shutdown: &GracefulShutdown,
) -> Result<()> {
    let workers = WaitGroup::new();
    loop {
        match accept_or_shutdown(&listener, shutdown).await {
            Ok(Some((stream, peer))) => {
                log::debug!("accepted connection from {peer}");
                let cache = cache.clone();
                let guard = workers.clone();
                smol::spawn(async move {
                    let _guard = guard;
                    if let Err(err) = handle_client(stream, peer, &cache).await {
                        log::warn!("peer={peer} request dropped: {err:#}");
                    }
                })
                .detach();
            }
            Ok(None) => break,
            Err(err) if is_transient_accept_error(&err) => {
                log::warn!("accept failed, retrying: {err}");
            }
            Err(err) => return Err(err).context("accept failed"),
        }
    }
    workers.await;
    Ok(())
}

async fn accept_or_shutdown(
    listener: &TcpListener,
    shutdown: &GracefulShutdown,
) -> std::io::Result<Option<(TcpStream, SocketAddr)>> {
    let accept = async { listener.accept().await.map(Some) };
    let stop = async {
        shutdown.wait_shutting_down().await;
        Ok(None)
    };
    future::or(accept, stop).await
}

/// Accept errors that reflect a transient network condition rather than a
/// broken listener; the dispatcher logs these and keeps accepting.
fn is_transient_accept_error(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::NetworkDown
            | ErrorKind::NetworkUnreachable
            | ErrorKind::HostUnreachable
            | ErrorKind::Unsupported
    )
}

/// Runs the request pipeline for one client connection. Any failure drops
/// the request: every descriptor owned here closes on return and nothing
/// is written back to the client.
async fn handle_client(mut stream: TcpStream, peer: SocketAddr, cache: &ObjectCache) -> Result<()> {
    let mut reader = BufReader::new(stream.clone());

    let mut line = Vec::with_capacity(MAX_LINE);
    let n = io::read_line(&mut reader, &mut line)
        .await
        .context("read request line")?;
    if n == 0 {
        bail!("no usable request line");
    }
    let request: RequestLine = std::str::from_utf8(&line)
        .context("request line is not valid UTF-8")?
        .parse()?;
    log::info!("peer={peer} {} {}", request.method, request.uri);
    if !request.is_get() {
        bail!("method {:?} is not supported", request.method);
    }

    if let Some(cached) = cache.lookup(&request.uri).await {
        log::debug!("peer={peer} cache hit ({} bytes)", cached.len());
        io::write_all(&mut stream, &cached)
            .await
            .context("write cached response to client")?;
        return Ok(());
    }
    log::debug!("peer={peer} cache miss");

    let target: RequestTarget = request.uri.parse()?;
    let header = build_request_header(&mut reader, &target)
        .await
        .context("rewrite request header")?;
    let mut origin = upstream::connect(&target.host, target.port)
        .await
        .context("open origin connection")?;
    io::write_all(&mut origin, &header)
        .await
        .context("write request header to origin")?;

    relay(&mut origin, &mut stream, &request.uri, cache, peer).await
}

/// Streams the origin response to the client, staging up to
/// [`MAX_OBJECT_SIZE`] bytes for admission once the origin closes cleanly.
async fn relay(
    origin: &mut TcpStream,
    client: &mut TcpStream,
    uri: &str,
    cache: &ObjectCache,
    peer: SocketAddr,
) -> Result<()> {
    let mut buf = vec![0u8; MAX_LINE];
    let mut staging = Vec::new();
    let mut received = 0usize;
    loop {
        let n = origin.read(&mut buf).await.context("read origin response")?;
        if n == 0 {
            break;
        }
        io::write_all(client, &buf[..n])
            .await
            .context("write response to client")?;
        if received + n <= MAX_OBJECT_SIZE {
            staging.extend_from_slice(&buf[..n]);
        } else if !staging.is_empty() {
            // Capture overran the object limit; the prefix is of no use.
            staging = Vec::new();
        }
        received += n;
    }
    if received > 0 && received <= MAX_OBJECT_SIZE {
        log::debug!("peer={peer} admitting {received} bytes for {uri}");
        cache.admit(uri, Bytes::from(staging)).await;
    } else if received > MAX_OBJECT_SIZE {
        log::debug!("peer={peer} response of {received} bytes exceeds the object limit, not cached");
    }
    Ok(())
}
