//! Crate-wide error types.

use thiserror::Error;

/// Errors that can terminate the server itself (not a single client).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn worker process: {0}")]
    WorkerSpawn(#[source] nix::Error),
}

/// Errors a single client connection can raise without bringing down the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the connection")]
    PeerShutdown,

    #[error("malformed message: {0}")]
    Protocol(String),

    /// Escalates to a server-fatal condition: a failed worker fork is
    /// fatal to the whole server, not just this client. Carried as a
    /// `ClientError` rather than a separate `Result` path so
    /// `protocol::dispatch`'s single return type still covers it; the
    /// server's dispatch loop translates
    /// this variant into a `CoreError::WorkerSpawn` and aborts the loop
    /// instead of merely destroying the client that raised it.
    #[error("fatal: worker spawn failed: {0}")]
    Fatal(#[from] nix::Error),
}

/// Object-scoped protocol error codes posted back to the peer on the wire.
///
/// The distilled requirements leave these unassigned; the values below are
/// pinned to what the original implementation actually sends so existing
/// peers observe the same codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProtocolErrorCode {
    Unimplemented = 0,
    OutOfMemory = 1,
}
