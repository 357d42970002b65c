// src/core/client.rs

//! The blocking-style client used to drive administrative commands against a
//! single Redis node: one TCP connection, one outstanding request at a time.

use crate::core::TribError;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

/// How long a dial may take before the node is declared unreachable.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// A client owning a single connection to a single Redis node.
///
/// The connection is opened lazily on the first call. There is no
/// multiplexing and no pipelining: every `call` writes one command frame and
/// reads exactly one reply frame before returning.
#[derive(Debug)]
pub struct NodeClient {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    codec: RespFrameCodec,
}

impl NodeClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            stream: None,
            codec: RespFrameCodec,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Creates the TCP connection to the node, with a timeout, and verifies
    /// the peer speaks RESP with a PING. A no-op when already connected.
    pub async fn connect(&mut self) -> Result<(), TribError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = format!("{}:{}", self.host, self.port);
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| TribError::ConnectTimeout {
                addr: addr.clone(),
                timeout: CONNECT_TIMEOUT,
            })??;
        self.stream = Some(stream);

        let reply = match self.roundtrip(vec![Bytes::from_static(b"PING")]).await {
            Ok(reply) => reply,
            Err(e) => {
                self.stream = None;
                return Err(e);
            }
        };
        match &reply {
            RespFrame::SimpleString(s) if s.eq_ignore_ascii_case("PONG") => Ok(()),
            _ => {
                self.stream = None;
                Err(TribError::UnexpectedReply {
                    command: "PING".to_string(),
                    reply: reply.render(),
                })
            }
        }
    }

    /// Tears the connection down; a later call will reconnect.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Sends one command (an array of bulk strings) and reads one reply,
    /// connecting first if needed.
    ///
    /// A Redis error reply (`-...`) surfaces as `TribError::Redis` so callers
    /// can match on the error code (`BUSYKEY`, `MOVED`, ...).
    pub async fn call(&mut self, args: Vec<Bytes>) -> Result<RespFrame, TribError> {
        self.connect().await?;
        self.roundtrip(args).await
    }

    /// Like `call`, but with arguments given as plain strings.
    pub async fn call_str(&mut self, args: &[&str]) -> Result<RespFrame, TribError> {
        self.call(to_bulk_args(args)).await
    }

    async fn roundtrip(&mut self, args: Vec<Bytes>) -> Result<RespFrame, TribError> {
        let mut write_buf = BytesMut::new();
        self.codec.encode(RespFrame::command(args), &mut write_buf)?;

        let Some(stream) = self.stream.as_mut() else {
            return Err(TribError::ConnectionClosed);
        };
        if let Err(e) = stream.write_all(&write_buf).await {
            self.close();
            return Err(e.into());
        }

        let mut read_buf = BytesMut::with_capacity(4096);
        loop {
            if let Some(reply) = self.codec.decode(&mut read_buf)? {
                return match reply {
                    RespFrame::Error(msg) => Err(TribError::Redis(msg)),
                    other => Ok(other),
                };
            }
            let Some(stream) = self.stream.as_mut() else {
                return Err(TribError::ConnectionClosed);
            };
            match stream.read_buf(&mut read_buf).await {
                Ok(0) => {
                    self.close();
                    return Err(TribError::ConnectionClosed);
                }
                Ok(_) => {}
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            }
        }
    }
}

/// Converts string command parts into the owned argument vector `call` takes.
pub fn to_bulk_args(args: &[&str]) -> Vec<Bytes> {
    args.iter()
        .map(|s| Bytes::copy_from_slice(s.as_bytes()))
        .collect()
}
