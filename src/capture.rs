//! Live-capture collaborator interface.
//!
//! The core performs no live capture itself; a backend implements this
//! trait over the host packet-capture facility. Packets obtained from
//! [`Capture::next`] are fed to
//! [`Packet::parse_link`](crate::packet::Packet::parse_link) with the
//! interface's declared link-type.

use std::time::Duration;

use crate::errors::Result;

/// Outcome of waiting for the next captured packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Captured {
    /// Raw packet bytes, link-layer framing included.
    Packet(Vec<u8>),
    /// The timeout elapsed with no packet.
    Timeout,
}

/// A packet-capture backend.
pub trait Capture {
    /// Handle of an open capture session.
    type Session;

    /// Opens a capture session on an interface.
    fn open(
        &self,
        iface: &str,
        snaplen: usize,
        promisc: bool,
        filter: Option<&str>,
    ) -> Result<Self::Session>;

    /// Waits up to `timeout` for the next packet.
    fn next(&self, session: &mut Self::Session, timeout: Duration) -> Result<Captured>;

    /// Injects raw bytes on the session's interface.
    fn inject(&self, session: &mut Self::Session, bytes: &[u8]) -> Result<()>;

    /// Closes the session.
    fn close(&self, session: Self::Session) -> Result<()>;

    /// Name of the default capture interface.
    fn default_iface(&self) -> Result<String>;
}
