//! The response side of an ONC RPC exchange: accepted/denied replies and the
//! status codes each can carry.

mod accepted_reply;
mod rejected_reply;
mod reply_body;

pub use accepted_reply::*;
pub use rejected_reply::*;
pub use reply_body::*;
