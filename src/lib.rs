//! Protocol-termination core for waltham-receiver: a multi-client TCP server
//! that runs a Wayland-style object protocol over a single epoll loop and
//! spawns a worker process per remote surface.
//!
//! Module map:
//! - [`epoll`]: thin `libc::epoll_*` wrapper (the event-loop driver's
//!   readiness primitive).
//! - [`wire`]: minimal message framing/argument codec standing in for the
//!   out-of-scope protocol-codec library.
//! - [`connection`]: per-fd buffered read/dispatch/flush state built on
//!   [`wire`].
//! - [`client`]: per-connection session owning a [`connection::Connection`]
//!   and every protocol object bound on it.
//! - [`protocol`]: the object graph and request/event dispatch for every
//!   interface the core terminates.
//! - [`worker`]: fork/signal/reap lifecycle for the per-surface rendering
//!   worker process.
//! - [`error`]: crate-wide error types.
//! - [`cli`]: command-line surface.
//! - [`epoll_server`]: the server that ties all of the above into the
//!   single-threaded readiness loop.

mod client;
mod connection;
pub mod error;
mod worker;
mod wire;

pub mod cli;
pub mod epoll_server;
mod epoll;
mod protocol;

pub use epoll_server::Server;
