use std::str::FromStr;

use anyhow::{Context, anyhow};

/// Host, port and path decomposed from an absolute-form request URI,
/// `scheme://host[:port][/path]`.
///
/// The scheme is not validated, nothing is percent-decoded, and the port
/// defaults to 80 when the authority carries none.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestTarget {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl FromStr for RequestTarget {
    type Err = anyhow::Error;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let (_, rest) = uri
            .split_once("//")
            .ok_or_else(|| anyhow!("not an absolute-form URI: {uri:?}"))?;
        let (authority, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], rest[slash..].to_owned()),
            None => (rest, "/".to_owned()),
        };
        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>()
                    .with_context(|| format!("bad port in URI: {uri:?}"))?,
            ),
            None => (authority, 80),
        };
        Ok(Self {
            host: host.to_owned(),
            port,
            path,
        })
    }
}
