//! The `Connection` entity: a buffered, non-blocking byte stream plus the
//! message-level read/dispatch/flush operations the object-dispatch layer
//! drives it through.

use std::io::{ErrorKind, Read, Result, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};

use crate::wire::{self, Message, OutBuffer, Signature};

/// A bidirectional byte stream with an inbound and outbound buffer.
///
/// Read/flush here are purely I/O plumbing; message decoding is delegated to
/// `wire::try_decode` so this type stays agnostic of any particular
/// interface's signature table.
pub struct Connection {
    stream: TcpStream,
    inbound: Vec<u8>,
    outbound: OutBuffer,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Connection {
            stream,
            inbound: Vec::with_capacity(4096),
            outbound: OutBuffer::default(),
        })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbound.is_empty()
    }

    pub fn queue_event(&mut self, msg: &Message) {
        self.outbound.push_message(msg);
    }

    /// Non-blocking read into the inbound buffer.
    ///
    /// Returns `Ok(0)` when the peer has performed an orderly shutdown
    /// (caller must destroy the client), `Err(WouldBlock)` when there is
    /// nothing more to read this pass, or the number of bytes appended.
    pub fn read_more(&mut self) -> Result<usize> {
        let mut chunk = [0u8; 4096];
        match self.stream.read(&mut chunk) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.inbound.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) => Err(e),
        }
    }

    /// Drains as many complete messages as are currently buffered, calling
    /// `on_message` for each. Stops (without error) on the first incomplete
    /// message, leaving its bytes in the buffer for the next read.
    pub fn dispatch_ready(
        &mut self,
        signature_of: impl Fn(u32, u16) -> Option<Signature>,
        mut on_message: impl FnMut(Message),
    ) -> std::result::Result<(), wire::DecodeError> {
        loop {
            match wire::try_decode(&self.inbound, &signature_of)? {
                Some((consumed, msg)) => {
                    self.inbound.drain(..consumed);
                    on_message(msg);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Attempts a non-blocking flush of the outbound buffer.
    ///
    /// Returns `Ok(true)` when the buffer is fully drained, `Ok(false)` when
    /// a `WouldBlock` interrupted the flush (the watch should stay/become
    /// EPOLLIN|EPOLLOUT), or an error for anything else (caller destroys the
    /// client).
    pub fn flush(&mut self) -> Result<bool> {
        loop {
            let chunk = self.outbound.front_chunk();
            if chunk.is_empty() {
                return Ok(true);
            }
            match self.stream.write(chunk) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::BrokenPipe,
                        "connection closed mid-write",
                    ));
                }
                Ok(n) => self.outbound.consume(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
    }
}
