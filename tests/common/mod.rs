//! Test-only wire encode/decode helpers plus a harness for standing up a
//! real `Server` and talking to it exactly as an external transmitter
//! would: raw bytes over a `TcpStream`, nothing from the crate's internals.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use waltham_receiver::Server;

/// The implicit display object is always wire id 1 (§3: "implicit at
/// connection accept"). This is an observable part of the wire contract,
/// not an internal detail, so tests are entitled to hardcode it.
pub const DISPLAY_ID: u32 = 1;

pub enum Arg {
    Int(i32),
    Uint(u32),
    Fixed(i32),
    Object(u32),
    NewId(u32),
    Str(&'static str),
    Arr(Vec<u8>),
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// Encodes one request exactly as the wire format in SPEC_FULL.md §6.2
/// describes it: object id, then `size << 16 | opcode`, then arguments.
pub fn encode(object_id: u32, opcode: u16, args: &[Arg]) -> Vec<u8> {
    let mut body = Vec::new();
    for arg in args {
        match arg {
            Arg::Int(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Arg::Uint(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Arg::Fixed(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Arg::Object(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Arg::NewId(v) => body.extend_from_slice(&v.to_ne_bytes()),
            Arg::Str(s) => {
                let len = (s.len() + 1) as u32;
                body.extend_from_slice(&len.to_ne_bytes());
                body.extend_from_slice(s.as_bytes());
                body.push(0);
                body.resize(body.len() + (pad4(s.len() + 1) - (s.len() + 1)), 0);
            }
            Arg::Arr(a) => {
                body.extend_from_slice(&(a.len() as u32).to_ne_bytes());
                body.extend_from_slice(a);
                body.resize(body.len() + (pad4(a.len()) - a.len()), 0);
            }
        }
    }
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&object_id.to_ne_bytes());
    let size_opcode = ((8 + body.len()) as u32) << 16 | (opcode as u32);
    out.extend_from_slice(&size_opcode.to_ne_bytes());
    out.extend_from_slice(&body);
    out
}

/// A decoded event: target object, opcode, and the raw, untyped body bytes
/// (sequential `parse_*` calls below walk the body).
pub struct Event {
    pub object_id: u32,
    pub opcode: u16,
    pub body: Vec<u8>,
}

/// Blocking read of exactly one framed event off the stream.
pub fn read_event(stream: &mut TcpStream) -> Event {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).expect("event header");
    let object_id = u32::from_ne_bytes(header[0..4].try_into().unwrap());
    let size_opcode = u32::from_ne_bytes(header[4..8].try_into().unwrap());
    let size = (size_opcode >> 16) as usize;
    let opcode = (size_opcode & 0xffff) as u16;
    let mut body = vec![0u8; size - 8];
    stream.read_exact(&mut body).expect("event body");
    Event { object_id, opcode, body }
}

pub fn parse_u32(body: &[u8], off: usize) -> (u32, usize) {
    (u32::from_ne_bytes(body[off..off + 4].try_into().unwrap()), off + 4)
}

pub fn parse_string(body: &[u8], off: usize) -> (String, usize) {
    let (len, off) = parse_u32(body, off);
    let len = len as usize;
    let s = std::str::from_utf8(&body[off..off + len - 1]).unwrap().to_string();
    (s, off + pad4(len))
}

/// Spawns a `Server` bound to an ephemeral loopback port on a background
/// thread and returns its address once accept() is ready to be called.
pub fn spawn_server(app_id_override: Option<String>) -> SocketAddr {
    let mut server = Server::new("127.0.0.1:0", 0, app_id_override).expect("bind");
    let addr = server.local_addr().expect("local_addr");
    thread::spawn(move || {
        let _ = server.run();
    });
    // Give the background thread a chance to enter epoll_wait before the
    // first connect; accept() on the listener fd is already valid the
    // instant bind+listen happened, so this is a test-flakiness margin,
    // not a correctness requirement.
    thread::sleep(Duration::from_millis(20));
    addr
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream.set_nonblocking(false).unwrap();
    stream
}

pub fn send(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).expect("write request");
}
