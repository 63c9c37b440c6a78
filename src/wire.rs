//! Minimal Wayland-style wire codec.
//!
//! Stands in for the protocol-codec library the core is specified to depend
//! on: message framing, argument (de)serialization, and the per-connection
//! in/out byte buffers. Nothing here tries to be a general Wayland
//! implementation; it only supports the argument shapes the interfaces in
//! `crate::protocol` actually use.

use std::collections::VecDeque;

/// A decoded request/event argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Int(i32),
    Uint(u32),
    /// 24.8 fixed-point.
    Fixed(i32),
    Object(u32),
    NewId(u32),
    String(String),
    Array(Vec<u8>),
}

impl Argument {
    fn wire_len(&self) -> usize {
        match self {
            Argument::Int(_) | Argument::Uint(_) | Argument::Fixed(_) => 4,
            Argument::Object(_) | Argument::NewId(_) => 4,
            Argument::String(s) => 4 + pad4(s.len() + 1),
            Argument::Array(a) => 4 + pad4(a.len()),
        }
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// A fully framed message: target object, opcode, and decoded arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub object_id: u32,
    pub opcode: u16,
    pub args: Vec<Argument>,
}

impl Message {
    pub fn new(object_id: u32, opcode: u16, args: Vec<Argument>) -> Self {
        Message {
            object_id,
            opcode,
            args,
        }
    }

    fn body_len(&self) -> usize {
        self.args.iter().map(Argument::wire_len).sum()
    }

    /// Serializes this message into `out`, appending the bytes.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let size = 8 + self.body_len();
        out.extend_from_slice(&self.object_id.to_ne_bytes());
        let size_opcode = ((size as u32) << 16) | (self.opcode as u32 & 0xffff);
        out.extend_from_slice(&size_opcode.to_ne_bytes());
        for arg in &self.args {
            match arg {
                Argument::Int(v) => out.extend_from_slice(&v.to_ne_bytes()),
                Argument::Uint(v) => out.extend_from_slice(&v.to_ne_bytes()),
                Argument::Fixed(v) => out.extend_from_slice(&v.to_ne_bytes()),
                Argument::Object(v) => out.extend_from_slice(&v.to_ne_bytes()),
                Argument::NewId(v) => out.extend_from_slice(&v.to_ne_bytes()),
                Argument::String(s) => {
                    let len = (s.len() + 1) as u32;
                    out.extend_from_slice(&len.to_ne_bytes());
                    out.extend_from_slice(s.as_bytes());
                    out.push(0);
                    let padded = pad4(s.len() + 1);
                    out.resize(out.len() + (padded - (s.len() + 1)), 0);
                }
                Argument::Array(a) => {
                    out.extend_from_slice(&(a.len() as u32).to_ne_bytes());
                    out.extend_from_slice(a);
                    let padded = pad4(a.len());
                    out.resize(out.len() + (padded - a.len()), 0);
                }
            }
        }
    }
}

/// Argument types expected for a given opcode, used to decode a raw message
/// body once its header announces how many bytes are available.
pub type Signature = &'static [ArgKind];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Uint,
    Fixed,
    Object,
    NewId,
    String,
    Array,
}

/// Errors while decoding a message body against a signature.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("message body truncated")]
    Truncated,
    #[error("string argument is not valid utf8")]
    BadString,
}

/// Attempts to pull one complete message out of `buf`, given a signature
/// lookup function for (object_id, opcode). Returns `Ok(None)` if the buffer
/// does not yet contain a full header+body.
pub fn try_decode(
    buf: &[u8],
    signature_of: impl Fn(u32, u16) -> Option<Signature>,
) -> Result<Option<(usize, Message)>, DecodeError> {
    if buf.len() < 8 {
        return Ok(None);
    }
    let object_id = u32::from_ne_bytes(buf[0..4].try_into().unwrap());
    let size_opcode = u32::from_ne_bytes(buf[4..8].try_into().unwrap());
    let size = (size_opcode >> 16) as usize;
    let opcode = (size_opcode & 0xffff) as u16;
    if buf.len() < size {
        return Ok(None);
    }
    let sig = signature_of(object_id, opcode).unwrap_or(&[]);
    let mut args = Vec::with_capacity(sig.len());
    let mut off = 8usize;
    for kind in sig {
        match kind {
            ArgKind::Int | ArgKind::Uint | ArgKind::Fixed | ArgKind::Object | ArgKind::NewId => {
                if off + 4 > size {
                    return Err(DecodeError::Truncated);
                }
                let raw = u32::from_ne_bytes(buf[off..off + 4].try_into().unwrap());
                args.push(match kind {
                    ArgKind::Int => Argument::Int(raw as i32),
                    ArgKind::Uint => Argument::Uint(raw),
                    ArgKind::Fixed => Argument::Fixed(raw as i32),
                    ArgKind::Object => Argument::Object(raw),
                    ArgKind::NewId => Argument::NewId(raw),
                    _ => unreachable!(),
                });
                off += 4;
            }
            ArgKind::String => {
                if off + 4 > size {
                    return Err(DecodeError::Truncated);
                }
                let len = u32::from_ne_bytes(buf[off..off + 4].try_into().unwrap()) as usize;
                off += 4;
                if off + len > size || len == 0 {
                    return Err(DecodeError::Truncated);
                }
                let bytes = &buf[off..off + len - 1];
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::BadString)?
                    .to_string();
                args.push(Argument::String(s));
                off += pad4(len);
            }
            ArgKind::Array => {
                if off + 4 > size {
                    return Err(DecodeError::Truncated);
                }
                let len = u32::from_ne_bytes(buf[off..off + 4].try_into().unwrap()) as usize;
                off += 4;
                if off + len > size {
                    return Err(DecodeError::Truncated);
                }
                args.push(Argument::Array(buf[off..off + len].to_vec()));
                off += pad4(len);
            }
        }
    }
    Ok(Some((size, Message::new(object_id, opcode, args))))
}

/// Buffered outbound byte queue, drained with non-blocking writes.
#[derive(Default)]
pub struct OutBuffer {
    pending: VecDeque<u8>,
}

impl OutBuffer {
    pub fn push_message(&mut self, msg: &Message) {
        let mut bytes = Vec::new();
        msg.encode(&mut bytes);
        self.pending.extend(bytes);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Makes the front of the queue available as a contiguous slice for a
    /// single `write`/`send` call.
    pub fn front_chunk(&mut self) -> &[u8] {
        self.pending.make_contiguous()
    }

    pub fn consume(&mut self, n: usize) {
        self.pending.drain(..n);
    }
}
