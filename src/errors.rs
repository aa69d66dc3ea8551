//! Crate-wide error type.

use thiserror::Error;

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A read would go past the end of the input buffer.
    #[error("Read attempt past the end of the input buffer")]
    Truncated,

    /// A PcapNg block violates the block framing rules.
    #[error("Malformed block: {0}")]
    MalformedBlock(&'static str),

    /// A value assigned to a field is out of range or cannot be parsed.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// `Packet::add` was called with no binding from the current top header.
    #[error("No binding from {lower} to {upper}")]
    UnboundStack {
        /// Kind of the header currently on top of the stack.
        lower: &'static str,
        /// Kind that was to be pushed.
        upper: &'static str,
    },

    /// Two bindings of equal specificity matched during parse.
    #[error("Ambiguous bindings from {lower}: both {first} and {second} match")]
    AmbiguousBinding {
        /// Kind of the header whose upper layer was being resolved.
        lower: &'static str,
        /// First matching upper kind, in registration order.
        first: &'static str,
        /// Second matching upper kind.
        second: &'static str,
    },

    /// The link-type is unknown and no fallback header consumed the buffer.
    #[error("No known header kind consumed the packet bytes")]
    UnparseablePacket,

    /// A PcapNg stream does not start with a Section Header Block.
    #[error("Stream does not start with a Section Header Block")]
    InvalidFile,

    /// A packet block references an interface with no matching
    /// Interface Description Block in its section.
    #[error("Packet block references unknown interface {0}")]
    InvalidInterfaceId(u32),

    /// Underlying file or socket failure.
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::InvalidValue(format!("invalid UTF-8: {err}"))
    }
}
