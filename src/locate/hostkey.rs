//! Identity of a cluster entry point.

use crate::base::locateerror::LocateError;
use std::fmt;
use url::Url;

/// Normalized `host:port` of a cluster entry point.
///
/// Accepts `host`, `host:port`, `[v6]:port` and `root://host[:port]`
/// spellings; hosts are lower-cased so every spelling of one entry point
/// shares a registry slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    host: String,
    port: u16,
}

impl HostKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// Parse an entry point, filling in `default_port` when none is given.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, LocateError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LocateError::InvalidHost(input.to_string()));
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("root://{}", input)
        };
        let url = Url::parse(&with_scheme).map_err(|_| LocateError::InvalidHost(input.to_string()))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| LocateError::InvalidHost(input.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok(Self::new(host, url.port().unwrap_or(default_port)))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form usable with `tokio::net::lookup_host`.
    pub fn authority(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
