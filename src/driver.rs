//! The top-level state machine: given a `nfs://host/export/path` URI, walks
//! Portmap, MOUNT and NFS to completion and streams the target file's
//! bytes to a [`DataSink`].
//!
//! Progress is driven entirely by the embedder calling [`NfsOpenRequest`]'s
//! event methods ([`on_connect`](NfsOpenRequest::on_connect),
//! [`on_recv`](NfsOpenRequest::on_recv),
//! [`on_window_open`](NfsOpenRequest::on_window_open),
//! [`on_close`](NfsOpenRequest::on_close)) as the three underlying
//! transports make progress — there is no internal thread, timer, or
//! blocking wait for a reply anywhere in this module.

use smallvec::SmallVec;

use crate::auth::{AuthFlavor, AuthUnixParams};
use crate::protocol::{mount, nfs, portmap};
use crate::{Error, RpcSession, Transport, Uri};

/// Bytes requested per `READ` call.
///
/// Chosen to fit comfortably within typical MTUs after TCP/IP/RPC
/// overhead. This client never invokes `FSINFO`, so it never learns the
/// server's preferred size and sticks to this conservative default.
pub const RSIZE: u32 = 1300;

/// The machine name fallback used when the embedder doesn't supply one.
const DEFAULT_MACHINE_NAME: &str = "client";

/// A collaborator capable of establishing a TCP connection to the server.
///
/// `connect` is a synchronous handle acquisition: it returns a
/// [`Transport`] immediately, but the connection is not necessarily
/// usable yet — actual readiness is signalled later via
/// [`NfsOpenRequest::on_connect`].
pub trait Connector {
    /// The transport type this connector hands out.
    type Transport: Transport;

    /// Establish a connection to `host:port`.
    ///
    /// `privileged_source_port` requests that the connection be made from
    /// a local TCP port in the range 1-1023, satisfying the `secure`
    /// export option most `nfs-utils` configurations default to. Only the
    /// MOUNT and NFS connections request this; the portmap connection does
    /// not need it.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        privileged_source_port: bool,
    ) -> Result<Self::Transport, Error>;
}

/// The downstream consumer of the fetched file's bytes.
pub trait DataSink {
    /// Sets the logical position for the next [`deliver`](Self::deliver)
    /// call.
    fn seek(&mut self, offset: u64);

    /// Appends `bytes` at the current position.
    fn deliver(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Called exactly once, when the fetch reaches a terminal state.
    fn close(&mut self, status: Result<(), Error>);
}

/// Identifies which of the driver's three TCP connections an event
/// pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The Portmap connection.
    Portmap,
    /// The MOUNT connection.
    Mount,
    /// The NFS connection.
    Nfs,
}

/// The driver's state, mirroring the fetch's phases one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not yet started.
    Init,
    /// Waiting for the portmap TCP connection to come up.
    PmConnecting,
    /// `GETPORT(MOUNT)` outstanding.
    PmGetportMount,
    /// Waiting for the MOUNT TCP connection to come up.
    MountConnecting,
    /// `MNT` outstanding.
    Mnt,
    /// `GETPORT(NFS)` outstanding.
    PmGetportNfs,
    /// Waiting for the NFS TCP connection to come up.
    NfsConnecting,
    /// `LOOKUP` outstanding.
    Lookup,
    /// A `READ` outstanding.
    Read,
    /// `UMNT` outstanding.
    Umnt,
    /// The fetch completed successfully.
    Done,
    /// The fetch failed or was cancelled; terminal.
    Failed,
}

/// Distinguishes the two calls this client can have outstanding on the
/// portmap session (one per downstream program it needs resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortmapCtx {
    ForMount,
    ForNfs,
}

/// Distinguishes the two calls this client can have outstanding on the
/// mount session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountCtx {
    Mnt,
    Umnt,
}

/// The single call type ever outstanding on the nfs session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NfsCtx {
    Lookup,
    Read,
}

/// Initial transaction ids for each session, chosen to be disjoint so a
/// mis-routed reply can never collide with a live xid on another session.
const PORTMAP_XID_BASE: u32 = 0x1000_0000;
const MOUNT_XID_BASE: u32 = 0x2000_0000;
const NFS_XID_BASE: u32 = 0x3000_0000;

/// The NFS-open driver: a state machine that fetches one file's contents
/// over Portmap, MOUNT and NFS, and streams them to a [`DataSink`].
///
/// `'a` is the lifetime of the machine-name string backing this request's
/// `AUTH_SYS` credential — it's supplied by the embedder (e.g. sourced
/// from a boot configuration) and must outlive the request.
pub struct NfsOpenRequest<'a, Conn, Sink>
where
    Conn: Connector,
{
    connector: Conn,
    sink: Sink,

    host: String,
    export: String,
    file_name: String,
    credential: AuthFlavor<'a>,

    portmap: Option<RpcSession<'a, Conn::Transport, PortmapCtx>>,
    mount: Option<RpcSession<'a, Conn::Transport, MountCtx>>,
    nfs: Option<RpcSession<'a, Conn::Transport, NfsCtx>>,

    mount_port: u16,
    nfs_port: u16,

    file_handle: Vec<u8>,
    offset: u64,
    size_signalled: bool,
    mounted: bool,

    state: DriverState,
}

impl<'a, Conn, Sink> std::fmt::Debug for NfsOpenRequest<'a, Conn, Sink>
where
    Conn: Connector,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("NfsOpenRequest")
            .field("host", &self.host)
            .field("export", &self.export)
            .field("file_name", &self.file_name)
            .field("state", &self.state)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, Conn, Sink> NfsOpenRequest<'a, Conn, Sink>
where
    Conn: Connector,
    Sink: DataSink,
{
    /// Parses `uri`, constructs an `AUTH_SYS` credential from
    /// `machine_name` (falling back to a fixed string if empty), and
    /// begins the fetch by connecting to portmap.
    pub fn open(uri: &str, machine_name: &'a str, mut connector: Conn, sink: Sink) -> Result<Self, Error> {
        let uri = Uri::parse(uri)?;

        let machine_name = if machine_name.is_empty() {
            DEFAULT_MACHINE_NAME
        } else {
            machine_name
        };
        let credential = AuthFlavor::AuthUnix(AuthUnixParams::new(
            0,
            machine_name.as_bytes(),
            0,
            0,
            SmallVec::new(),
        ));

        let transport = connector.connect(uri.host(), uri.port(), false)?;

        let portmap_session = RpcSession::init(
            transport,
            portmap::PROGRAM,
            portmap::VERSION,
            credential.clone(),
            AuthFlavor::AuthNone(None),
            PORTMAP_XID_BASE,
        );

        Ok(Self {
            connector,
            sink,
            host: uri.host().to_owned(),
            export: uri.export().to_owned(),
            file_name: uri.file_name().to_owned(),
            credential,
            portmap: Some(portmap_session),
            mount: None,
            nfs: None,
            mount_port: 0,
            nfs_port: 0,
            file_handle: Vec::new(),
            offset: 0,
            size_signalled: false,
            mounted: false,
            state: DriverState::PmConnecting,
        })
    }

    /// The driver's current state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Notifies the driver that `channel`'s TCP connection has completed.
    ///
    /// A connect notification for a channel the driver isn't currently
    /// waiting on is a no-op.
    pub fn on_connect(&mut self, channel: Channel) {
        let result = match (self.state, channel) {
            (DriverState::PmConnecting, Channel::Portmap) => self
                .issue_getport_mount()
                .map(|_| self.state = DriverState::PmGetportMount),
            (DriverState::MountConnecting, Channel::Mount) => {
                self.issue_mnt().map(|_| self.state = DriverState::Mnt)
            }
            (DriverState::NfsConnecting, Channel::Nfs) => self
                .issue_lookup()
                .map(|_| self.state = DriverState::Lookup),
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    /// Notifies the driver that `channel`'s transport delivered one
    /// complete, record-marked RPC message.
    pub fn on_recv(&mut self, channel: Channel, record: &[u8]) {
        if let Err(e) = self.handle_recv(channel, record) {
            self.fail(e);
        }
    }

    /// Notifies the driver that `channel`'s send window has opened,
    /// giving any calls queued behind a previous `would_block` a chance
    /// to go out.
    pub fn on_window_open(&mut self, channel: Channel) {
        let result = match channel {
            Channel::Portmap => self.portmap.as_mut().map(|s| s.on_window_open()),
            Channel::Mount => self.mount.as_mut().map(|s| s.on_window_open()),
            Channel::Nfs => self.nfs.as_mut().map(|s| s.on_window_open()),
        };
        if let Some(Err(e)) = result {
            self.fail(e);
        }
    }

    /// Notifies the driver that `channel`'s transport closed.
    ///
    /// Unlike the other events, this is always fatal for the whole fetch,
    /// regardless of which channel closed and regardless of the driver's
    /// current state — a lost socket aborts the mount.
    pub fn on_close(&mut self, _channel: Channel) {
        self.fail(Error::Network("transport closed"));
    }

    /// Cancels the fetch in response to the downstream sink closing early.
    ///
    /// No `UMNT` is attempted — the server will garbage-collect the
    /// mount.
    pub fn cancel(&mut self) {
        self.fail(Error::Cancelled);
    }

    fn handle_recv(&mut self, channel: Channel, record: &[u8]) -> Result<(), Error> {
        match channel {
            Channel::Portmap => self.handle_portmap_recv(record),
            Channel::Mount => self.handle_mount_recv(record),
            Channel::Nfs => self.handle_nfs_recv(record),
        }
    }

    fn handle_portmap_recv(&mut self, record: &[u8]) -> Result<(), Error> {
        let session = match self.portmap.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        let delivered = match session.on_delivery(record)? {
            Some(d) => d,
            None => return Ok(()), // spurious reply
        };

        match delivered.context {
            PortmapCtx::ForMount => {
                if self.state != DriverState::PmGetportMount {
                    return Ok(());
                }
                let port = portmap::decode_getport_reply(delivered.payload)?;
                self.mount_port = port;

                let transport = self.connector.connect(&self.host, port, true)?;
                self.mount = Some(RpcSession::init(
                    transport,
                    mount::PROGRAM,
                    mount::VERSION,
                    self.credential.clone(),
                    AuthFlavor::AuthNone(None),
                    MOUNT_XID_BASE,
                ));
                self.state = DriverState::MountConnecting;
            }
            PortmapCtx::ForNfs => {
                if self.state != DriverState::PmGetportNfs {
                    return Ok(());
                }
                let port = portmap::decode_getport_reply(delivered.payload)?;
                self.nfs_port = port;

                let transport = self.connector.connect(&self.host, port, true)?;
                self.nfs = Some(RpcSession::init(
                    transport,
                    nfs::PROGRAM,
                    nfs::VERSION,
                    self.credential.clone(),
                    AuthFlavor::AuthNone(None),
                    NFS_XID_BASE,
                ));

                if let Some(pm) = self.portmap.take() {
                    pm.close(Ok(()));
                }
                self.state = DriverState::NfsConnecting;
            }
        }

        Ok(())
    }

    fn handle_mount_recv(&mut self, record: &[u8]) -> Result<(), Error> {
        let session = match self.mount.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        let delivered = match session.on_delivery(record)? {
            Some(d) => d,
            None => return Ok(()),
        };

        match delivered.context {
            MountCtx::Mnt => {
                if self.state != DriverState::Mnt {
                    return Ok(());
                }
                let reply = mount::decode_mnt_reply(delivered.payload)?;
                self.file_handle = reply.file_handle;
                self.mounted = true;
                self.issue_getport_nfs()?;
                self.state = DriverState::PmGetportNfs;
            }
            MountCtx::Umnt => {
                if self.state != DriverState::Umnt {
                    return Ok(());
                }
                self.finish();
            }
        }

        Ok(())
    }

    fn handle_nfs_recv(&mut self, record: &[u8]) -> Result<(), Error> {
        let session = match self.nfs.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        let delivered = match session.on_delivery(record)? {
            Some(d) => d,
            None => return Ok(()),
        };

        match delivered.context {
            NfsCtx::Lookup => {
                if self.state != DriverState::Lookup {
                    return Ok(());
                }
                self.file_handle = nfs::decode_lookup_reply(delivered.payload)?;
                self.issue_read()?;
                self.state = DriverState::Read;
            }
            NfsCtx::Read => {
                if self.state != DriverState::Read {
                    return Ok(());
                }
                let reply = nfs::decode_read_reply(delivered.payload)?;

                if !self.size_signalled {
                    if let Some(size) = reply.size {
                        self.sink.seek(size);
                    }
                    self.sink.seek(0);
                    self.size_signalled = true;
                }

                self.sink.deliver(reply.data)?;
                self.offset += reply.count as u64;

                if reply.eof {
                    self.issue_umnt()?;
                    self.state = DriverState::Umnt;
                } else {
                    self.issue_read()?;
                }
            }
        }

        Ok(())
    }

    fn issue_getport_mount(&mut self) -> Result<(), Error> {
        let session = self.portmap.as_mut().ok_or(Error::InvalidArg("no portmap session"))?;
        let args = portmap::encode_getport(mount::PROGRAM, mount::VERSION);
        session.call(portmap::PROC_GETPORT, &args, PortmapCtx::ForMount)?;
        Ok(())
    }

    fn issue_getport_nfs(&mut self) -> Result<(), Error> {
        let session = self.portmap.as_mut().ok_or(Error::InvalidArg("no portmap session"))?;
        let args = portmap::encode_getport(nfs::PROGRAM, nfs::VERSION);
        session.call(portmap::PROC_GETPORT, &args, PortmapCtx::ForNfs)?;
        Ok(())
    }

    fn issue_mnt(&mut self) -> Result<(), Error> {
        let session = self.mount.as_mut().ok_or(Error::InvalidArg("no mount session"))?;
        let args = mount::encode_dirpath(&self.export);
        session.call(mount::PROC_MNT, &args, MountCtx::Mnt)?;
        Ok(())
    }

    fn issue_lookup(&mut self) -> Result<(), Error> {
        let session = self.nfs.as_mut().ok_or(Error::InvalidArg("no nfs session"))?;
        let args = nfs::encode_lookup(&self.file_handle, &self.file_name);
        session.call(nfs::PROC_LOOKUP, &args, NfsCtx::Lookup)?;
        Ok(())
    }

    fn issue_read(&mut self) -> Result<(), Error> {
        let session = self.nfs.as_mut().ok_or(Error::InvalidArg("no nfs session"))?;
        let args = nfs::encode_read(&self.file_handle, self.offset, RSIZE);
        session.call(nfs::PROC_READ, &args, NfsCtx::Read)?;
        Ok(())
    }

    fn issue_umnt(&mut self) -> Result<(), Error> {
        if let Some(nfs) = self.nfs.take() {
            nfs.close(Ok(()));
        }
        let session = self.mount.as_mut().ok_or(Error::InvalidArg("no mount session"))?;
        let args = mount::encode_dirpath(&self.export);
        session.call(mount::PROC_UMNT, &args, MountCtx::Umnt)?;
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(mount) = self.mount.take() {
            mount.close(Ok(()));
        }
        self.state = DriverState::Done;
        self.sink.close(Ok(()));
    }

    /// Terminates the fetch with `err`, closing every still-open session.
    ///
    /// A best-effort `UMNT` is sent first if the mount had already
    /// succeeded and the failure isn't a cancellation (the server will
    /// garbage-collect an un-unmounted export on cancellation, so there's
    /// no point). Idempotent: calling this once the driver is already
    /// `Done`/`Failed` does nothing.
    fn fail(&mut self, err: Error) {
        if matches!(self.state, DriverState::Done | DriverState::Failed) {
            return;
        }

        let attempt_umnt = self.mounted && !matches!(err, Error::Cancelled);
        if attempt_umnt {
            if let Some(mount) = self.mount.as_mut() {
                let args = mount::encode_dirpath(&self.export);
                let _ = mount.call(mount::PROC_UMNT, &args, MountCtx::Umnt);
            }
        }

        if let Some(s) = self.portmap.take() {
            s.close(Err(err.clone()));
        }
        if let Some(s) = self.mount.take() {
            s.close(Err(err.clone()));
        }
        if let Some(s) = self.nfs.take() {
            s.close(Err(err.clone()));
        }

        self.state = DriverState::Failed;
        self.sink.close(Err(err));
    }
}
