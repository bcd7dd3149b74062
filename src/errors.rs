use thiserror::Error;

/// Error types returned by this crate.
///
/// Every fallible operation in `nfs-open` — XDR decoding, RPC framing,
/// session bookkeeping, and the driver state machine itself — funnels its
/// failure through this single enum. A fetch is always terminated by the
/// first error encountered; there is no internal retry.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Clone)]
pub enum Error {
    /// The caller-provided URI or collaborator interface was malformed or
    /// null (empty host, empty path, missing scheme).
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),

    /// A buffer or other allocation could not be obtained.
    #[error("no buffer available")]
    NoBuffer,

    /// The reply direction was not `REPLY`, or the auth flavor encountered
    /// is outside the set this client supports.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// The message header indicates the RPC message is longer than the amount
    /// of data in the buffer, or the buffer contains more than one message.
    ///
    /// This error may also be returned if the RPC message parsed from the
    /// buffer is unexpectedly shorter than the header length indicates - in
    /// this case, `buffer_len` will be more than `expected` and may indicate a
    /// parsing error.
    #[error("incomplete rpc message (got {buffer_len} bytes, expected {expected})")]
    IncompleteMessage {
        /// The length of the buffer provided.
        buffer_len: usize,

        /// The length expected for this message type.
        expected: usize,
    },

    /// The buffer is too small to contain the RPC record-marking header.
    #[error("incomplete fragment header")]
    IncompleteHeader,

    /// The RPC message is fragmented and needs to be reassembled.
    ///
    /// This client doesn't reassemble fragmented messages and this error
    /// will be returned when parsing any message with the "last fragment"
    /// bit unset in the header.
    #[error("RPC message is fragmented")]
    Fragmented,

    /// The message type in the RPC request is neither `Call` or `Reply`.
    #[error("invalid rpc message type {0}")]
    InvalidMessageType(u32),

    /// The reply type is neither `Accepted` or `Denied`.
    #[error("invalid rpc reply type {0}")]
    InvalidReplyType(u32),

    /// The accepted-reply status code is not one of the specified values.
    #[error("invalid rpc reply status {0}")]
    InvalidReplyStatus(u32),

    /// The auth or verifier is invalid or malformed.
    #[error("invalid rpc auth data")]
    InvalidAuthData,

    /// The auth error code is not one of the specified values.
    #[error("invalid rpc auth error status {0}")]
    InvalidAuthError(u32),

    /// The rejected reply discriminator is not one of the specified values.
    #[error("invalid rpc rejected reply type {0}")]
    InvalidRejectedReplyType(u32),

    /// A variable length type has a malformed length value which would exceed
    /// the length of the buffer, or a protocol-defined maximum.
    #[error("invalid length in rpc message")]
    InvalidLength,

    /// The message contains an rpc protocol identifier that is not 2.
    #[error("invalid rpc version {0}")]
    InvalidRpcVersion(u32),

    /// The machine name in an `AUTH_SYS` credential contains non-UTF8
    /// characters.
    #[error("invalid machine name: {0}")]
    InvalidMachineName(#[from] std::str::Utf8Error),

    /// The server rejected the RPC call (`MSG_DENIED`).
    ///
    /// The denial reason is not interpreted further by this client.
    #[error("rpc call rejected by server")]
    RpcRejected,

    /// The server accepted the call's credentials but could not execute it
    /// (program mismatch, unavailable procedure, garbage arguments).
    #[error("rpc call accepted but not executed")]
    RpcAcceptedError,

    /// A protocol-level status code reported by Portmap, MOUNT or NFS was
    /// non-zero; the original code is preserved for diagnostics.
    #[error("remote error, status code {0}")]
    Remote(u32),

    /// Portmap reported port 0 for the requested (program, version).
    #[error("service not registered with portmap")]
    NotFound,

    /// A transport-level failure occurred (connect failed, connection
    /// reset, send failed).
    #[error("network error: {0}")]
    Network(&'static str),

    /// The downstream data sink was closed before the fetch reached EOF.
    #[error("fetch cancelled")]
    Cancelled,

    /// An I/O error occurred when trying to parse or write a buffer.
    #[error("i/o error ({0:?}): {1}")]
    IOError(std::io::ErrorKind, String),
}

impl From<std::io::Error> for Error {
    fn from(v: std::io::Error) -> Self {
        Self::IOError(v.kind(), v.to_string())
    }
}
