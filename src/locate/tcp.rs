//! Line-oriented TCP transport.
//!
//! A minimal text protocol for clusters fronted by a locate gateway:
//!
//! ```text
//! C: HELLO                      S: OK <server-type> | DENIED <msg> | ERR <msg>
//! C: LOCATE <path>              S: LOC <tokens...> | NOTFOUND | ERR <msg>
//! ```
//!
//! A server type of `none` means the peer is not a storage server.

use crate::base::context::IoResultExt;
use crate::base::locateerror::LocateError;
use crate::locate::hostkey::HostKey;
use crate::locate::transport::{Connecting, Connector, Locating, Session};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Opens line-protocol sessions over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TcpConnector {
    fn connect(&self, host: &HostKey) -> Connecting {
        let authority = host.authority();
        Box::pin(async move {
            // 1. DNS Resolution
            let addrs = tokio::net::lookup_host(&authority)
                .await
                .connection_context(&authority)?;

            // 2. TCP Connect
            let mut stream = None;
            let mut last_error = None;
            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(s) => {
                        stream = Some(s);
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(host = %authority, addr = %addr, error = %e, "TCP connect failed");
                        last_error = Some(e);
                    }
                }
            }

            let stream = match (stream, last_error) {
                (Some(stream), _) => stream,
                (None, Some(e)) => return Err(LocateError::connection_failed_to(&authority, e)),
                (None, None) => {
                    return Err(LocateError::ConnectionFailed {
                        host: authority,
                        reason: "no addresses resolved".to_string(),
                    })
                }
            };

            // 3. Handshake
            let mut session = TcpSession::new(authority, stream);
            session.handshake().await?;
            Ok(Box::new(session) as Box<dyn Session>)
        })
    }
}

/// An open line-protocol session.
#[derive(Debug)]
pub struct TcpSession {
    authority: String,
    stream: BufReader<TcpStream>,
    server_type: Option<String>,
}

impl TcpSession {
    fn new(authority: String, stream: TcpStream) -> Self {
        Self {
            authority,
            stream: BufReader::new(stream),
            server_type: None,
        }
    }

    /// Server type reported during the handshake.
    pub fn server_type(&self) -> Option<&str> {
        self.server_type.as_deref()
    }

    async fn request(&mut self, line: &str) -> Result<String, LocateError> {
        let mut message = String::with_capacity(line.len() + 1);
        message.push_str(line);
        message.push('\n');

        self.stream
            .write_all(message.as_bytes())
            .await
            .connection_context(&self.authority)?;
        self.stream.flush().await.connection_context(&self.authority)?;

        let mut reply = String::new();
        let n = self
            .stream
            .read_line(&mut reply)
            .await
            .connection_context(&self.authority)?;
        if n == 0 {
            return Err(LocateError::ConnectionClosed {
                host: self.authority.clone(),
            });
        }
        Ok(reply.trim_end().to_string())
    }

    async fn handshake(&mut self) -> Result<(), LocateError> {
        let reply = self.request("HELLO").await?;
        let (verb, rest) = split_reply(&reply);

        match verb {
            "OK" if rest.is_empty() || rest.eq_ignore_ascii_case("none") => {
                Err(LocateError::UnknownServerType {
                    host: self.authority.clone(),
                })
            }
            "OK" => {
                tracing::debug!(host = %self.authority, server_type = rest, "access to server granted");
                self.server_type = Some(rest.to_string());
                Ok(())
            }
            "DENIED" => Err(LocateError::NotAuthorized {
                host: self.authority.clone(),
                message: rest.to_string(),
            }),
            _ => Err(LocateError::ConnectionFailed {
                host: self.authority.clone(),
                reason: reply.clone(),
            }),
        }
    }
}

impl Session for TcpSession {
    fn locate(&mut self, path: &str) -> Locating<'_> {
        let path = path.to_string();
        Box::pin(async move {
            if path.contains(['\n', '\r']) {
                return Err(LocateError::Rejected {
                    host: self.authority.clone(),
                    path,
                    message: "path contains a line break".to_string(),
                });
            }

            let reply = self.request(&format!("LOCATE {}", path)).await?;
            let (verb, rest) = split_reply(&reply);

            match verb {
                "LOC" => Ok(rest.to_string()),
                "NOTFOUND" => Ok(String::new()),
                "ERR" => Err(LocateError::Rejected {
                    host: self.authority.clone(),
                    path,
                    message: rest.to_string(),
                }),
                _ => Err(LocateError::Rejected {
                    host: self.authority.clone(),
                    path,
                    message: format!("unexpected reply: {}", reply),
                }),
            }
        })
    }
}

fn split_reply(reply: &str) -> (&str, &str) {
    match reply.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (reply, ""),
    }
}
