//! Inbound framing and outbound writes for a single connection.
//!
//! Each accepted read is treated as one logical command: the decoder never
//! waits for a delimiter, it hands back whatever is currently buffered (up to
//! `buffer_size` bytes), UTF-8 decoded and whitespace-trimmed. Commands longer
//! than the buffer, or multiple commands arriving in one read, are not
//! reassembled or split -- this mirrors the behavior of a single
//! `reader.read(BYTES)` call per command and is accepted behavior, not a bug.

use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Framed};

pub struct CommandCodec {
    max_len: usize,
}

impl CommandCodec {
    pub fn new(max_len: usize) -> Self {
        CommandCodec { max_len }
    }
}

impl Decoder for CommandCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let take = src.len().min(self.max_len);
        let chunk = src.split_to(take);

        match std::str::from_utf8(&chunk) {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

/// The line-oriented wire protocol for one connection: read one command per
/// poll, write a text payload with an optional trailing `\n`, always flushed
/// before the session proceeds.
pub struct Wire {
    framed: Framed<TcpStream, CommandCodec>,
}

impl Wire {
    pub fn new(stream: TcpStream, buffer_size: usize) -> Self {
        Wire {
            framed: Framed::with_capacity(stream, CommandCodec::new(buffer_size), buffer_size),
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.framed.get_ref().peer_addr()
    }

    /// Returns `None` only when the peer actually closed the socket (the
    /// underlying stream ended). A peer that sends a blank line decodes to
    /// `Some(String::new())` -- distinct from a closed connection, since the
    /// handshake sub-dialogs and the authenticated command loop treat the
    /// two differently.
    pub async fn read_command(&mut self) -> io::Result<Option<String>> {
        match self.framed.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    pub async fn write(&mut self, text: impl AsRef<str>, line_break: bool) -> io::Result<()> {
        let io = self.framed.get_mut();
        io.write_all(text.as_ref().as_bytes()).await?;
        if line_break {
            io.write_all(b"\n").await?;
        }
        io.flush().await
    }
}
