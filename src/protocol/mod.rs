//! Thin, I/O-free bindings for the three ONC RPC programs this client
//! speaks: Portmap, MOUNT v3 and NFS v3.
//!
//! Each submodule owns its program/version constants and a handful of
//! `encode_*`/`decode_*` free functions operating on plain byte slices —
//! none of them touch a [`crate::RpcSession`] or [`crate::Transport`]
//! directly. The driver is the only thing that ties a program's procedure
//! number to a call on the right session.

pub mod mount;
pub mod nfs;
pub mod portmap;
