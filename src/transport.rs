//! The byte-pipe abstraction each [`crate::RpcSession`] is built on.
//!
//! Establishing the underlying socket, and pumping bytes to/from it, is
//! delegated entirely to the embedder — this crate only needs to be told
//! when a send would block and when previously-blocked sends may be
//! retried.

use crate::Error;

/// The outcome of a single [`Transport::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The bytes were handed off to the transport.
    Ready,

    /// The transport's send window is currently closed; the caller must
    /// retry the same bytes once [`Transport::send`] is next given the
    /// chance (i.e. after a window-open notification).
    WouldBlock,
}

/// A single framed byte-pipe, owned by one [`crate::RpcSession`].
///
/// Implementations are expected to be thin adapters over a real socket (or,
/// in tests, an in-memory buffer). This crate never reads or writes a
/// socket directly — every byte that crosses the wire passes through this
/// trait.
pub trait Transport {
    /// Attempt to send `bytes` as a single unit.
    ///
    /// Returning [`SendStatus::WouldBlock`] tells the session to queue
    /// `bytes` and retry later; the transport must not partially consume
    /// `bytes` in that case.
    fn send(&mut self, bytes: &[u8]) -> Result<SendStatus, Error>;

    /// Shut down the transport. Called at most once per transport, and
    /// never followed by another [`Transport::send`] call.
    ///
    /// `status` carries the reason the owning session is closing — `Ok`
    /// for a clean completion, the first error encountered otherwise.
    fn close(&mut self, status: Result<(), Error>);
}
