//! A single ONC RPC conversation over one [`Transport`](crate::Transport).
//!
//! [`RpcSession`] owns the transaction-id counter, the FIFO of calls queued
//! behind a closed send window, and the map correlating outstanding calls
//! to their replies. It knows nothing about Portmap, MOUNT or NFS — the
//! `protocol` module builds the procedure-specific argument/result shapes
//! on top of it.

use std::collections::{HashMap, VecDeque};

use crate::auth::AuthFlavor;
use crate::{AcceptedStatus, CallBody, Error, MessageType, ReplyBody, RpcMessage, SendStatus};
use crate::Transport;

/// A reply successfully correlated to one of this session's outstanding
/// calls.
///
/// `context` is whatever value the caller passed to [`RpcSession::call`]
/// when the call was issued; `payload` is the procedure-specific result
/// body, positioned just past the RPC reply header.
#[derive(Debug)]
pub struct DeliveredReply<'a, C> {
    /// The caller-supplied value that was associated with the call this
    /// reply answers.
    pub context: C,

    /// The undecoded procedure-specific reply body.
    pub payload: &'a [u8],
}

/// One conversation with a single ONC RPC program/version over one
/// [`Transport`].
///
/// `C` is an opaque context value the caller attaches to each outstanding
/// call and gets back, unmodified, from [`on_delivery`](Self::on_delivery)
/// — it carries no meaning to the session itself.
pub struct RpcSession<'a, T, C> {
    transport: T,
    program: u32,
    version: u32,
    credential: AuthFlavor<'a>,
    verifier: AuthFlavor<'a>,
    next_xid: u32,
    pending_calls: VecDeque<Vec<u8>>,
    pending_replies: HashMap<u32, C>,
}

impl<'a, T, C> std::fmt::Debug for RpcSession<'a, T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("RpcSession")
            .field("program", &self.program)
            .field("version", &self.version)
            .field("next_xid", &self.next_xid)
            .field("pending_calls", &self.pending_calls.len())
            .field("pending_replies", &self.pending_replies.len())
            .finish()
    }
}

impl<'a, T, C> RpcSession<'a, T, C>
where
    T: Transport,
{
    /// Construct a new session targeting `program`/`version`, using
    /// `credential`/`verifier` on every call.
    ///
    /// `initial_xid` seeds the monotonic transaction-id counter; callers
    /// juggling multiple sessions on one server should pick disjoint
    /// ranges so that a stray cross-session reply can never collide with a
    /// live xid (the session itself does not require this — every xid is
    /// only ever meaningful within the session it was issued on).
    pub fn init(
        transport: T,
        program: u32,
        version: u32,
        credential: AuthFlavor<'a>,
        verifier: AuthFlavor<'a>,
        initial_xid: u32,
    ) -> Self {
        Self {
            transport,
            program,
            version,
            credential,
            verifier,
            next_xid: initial_xid,
            pending_calls: VecDeque::new(),
            pending_replies: HashMap::new(),
        }
    }

    /// Build and dispatch a call invoking `procedure` with the
    /// already-XDR-encoded `args`.
    ///
    /// Returns the assigned `xid` once the frame has been accepted for
    /// transmission (queued or sent) — not once a reply has arrived.
    /// `context` is stashed and returned verbatim by
    /// [`on_delivery`](Self::on_delivery) once the matching reply shows up.
    pub fn call(&mut self, procedure: u32, args: &[u8], context: C) -> Result<u32, Error> {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);

        let call = CallBody::new(
            self.program,
            self.version,
            procedure,
            self.credential.clone(),
            self.verifier.clone(),
            args,
        );
        let msg = RpcMessage::new(xid, MessageType::Call(call));
        let frame = msg.serialise().map_err(|_| Error::NoBuffer)?;

        self.pending_replies.insert(xid, context);

        match self.transport.send(&frame)? {
            SendStatus::Ready => {}
            SendStatus::WouldBlock => self.pending_calls.push_back(frame),
        }

        Ok(xid)
    }

    /// Drain the queue of calls that were blocked on a closed send window,
    /// in FIFO order, stopping as soon as the transport blocks again.
    pub fn on_window_open(&mut self) -> Result<(), Error> {
        while let Some(frame) = self.pending_calls.pop_front() {
            match self.transport.send(&frame)? {
                SendStatus::Ready => continue,
                SendStatus::WouldBlock => {
                    self.pending_calls.push_front(frame);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Parse one complete record-marked RPC message and correlate it to an
    /// outstanding call.
    ///
    /// Returns `Ok(None)` for a reply whose xid matches no outstanding
    /// call — a spurious reply is discarded rather than treated as an
    /// error, per standard RPC practice. A reply whose direction is not
    /// `REPLY`, or that was rejected/not executed by the server, is
    /// surfaced as an error; the associated context (if any) is dropped
    /// along with it.
    pub fn on_delivery<'b>(&mut self, record: &'b [u8]) -> Result<Option<DeliveredReply<'b, C>>, Error> {
        let msg = RpcMessage::from_bytes(record)?;
        let xid = msg.xid();

        let reply = match msg.message() {
            MessageType::Reply(r) => r,
            MessageType::Call(_) => return Err(Error::Unsupported("expected a reply, got a call")),
        };

        let context = match self.pending_replies.remove(&xid) {
            Some(c) => c,
            None => return Ok(None),
        };

        match reply {
            ReplyBody::Denied(_) => Err(Error::RpcRejected),
            ReplyBody::Accepted(accepted) => match accepted.status() {
                // `status()` borrows from `accepted`, which only lives for
                // this function, so `payload` here is `&&'b [u8]` — copy the
                // inner (`Copy`) slice reference out so it carries the
                // record's own lifetime instead of `accepted`'s.
                AcceptedStatus::Success(payload) => {
                    let payload: &[u8] = *payload;
                    Ok(Some(DeliveredReply { context, payload }))
                }
                _ => Err(Error::RpcAcceptedError),
            },
        }
    }

    /// Drop all pending-call and pending-reply state and shut down the
    /// transport with `status` as the reason.
    pub fn close(mut self, status: Result<(), Error>) {
        self.pending_calls.clear();
        self.pending_replies.clear();
        self.transport.close(status);
    }
}
