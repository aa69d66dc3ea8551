//! Build, dissect and generate network packets, and read and write PcapNg
//! captures.
//!
//! The crate has three layers:
//!
//! - [`field`] and [`header`]: a declarative model binding named, typed
//!   fields to a binary layout, with bit-field packing, builder-driven
//!   variable-length fields and enumerated values. Header kinds live in a
//!   write-once [`Registry`]; [`Registry::builtin`] carries the built-in
//!   catalog (Ethernet, IPv4, IPv6, UDP, TFTP, ICMPv6/MLD).
//! - [`packet`]: layered stacking of headers over a payload, upper-layer
//!   dispatch through binding tables, and automatic recalculation of
//!   length, checksum and counter fields on serialization.
//! - [`pcapng`]: the PcapNg capture-file format, endian-agnostic, with a
//!   block-level parser/reader/writer and an in-memory file model.
//!
//! # Example
//! ```rust
//! use packetgen::Packet;
//!
//! let mut packet = Packet::gen();
//! packet.add("IP").unwrap().set("dst", "10.0.0.1").unwrap();
//! packet.add("UDP").unwrap().set("dport", 4433u16).unwrap();
//!
//! let bytes = packet.to_bytes();
//! assert_eq!(packet.header("IP", 0).unwrap().uint("protocol").unwrap(), 17);
//! assert_eq!(bytes.len(), 28);
//! ```

pub mod capture;
mod common;
mod errors;
pub mod field;
pub mod header;
mod headers;
pub mod link_type;
pub mod packet;
pub mod pcapng;

pub use common::Endianness;
pub use errors::{Error, Result};
pub use header::{Header, HeaderId, Registry};
pub use link_type::LinkType;
pub use packet::Packet;
