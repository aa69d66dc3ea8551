//! Link-layer framing identifiers.
//!
//! The values come from the tcpdump.org link-layer header types registry;
//! only the kinds the dissector knows an outermost header for are mapped,
//! the rest fall back to the registry's guess list.

use std::fmt;

/// A value that defines the link layer type of an interface.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LinkType(pub u16);

impl LinkType {
    /// No link layer information.
    pub const NULL: LinkType = LinkType(0);
    /// D/I/X and 802.3 Ethernet.
    pub const ETHERNET: LinkType = LinkType(1);
    /// Point-to-point Protocol.
    pub const PPP: LinkType = LinkType(9);
    /// Raw IP, version sniffed from the first nibble.
    pub const RAW: LinkType = LinkType(101);
    /// IEEE 802.11 wireless.
    pub const IEEE802_11: LinkType = LinkType(105);
    /// Linux cooked socket capture.
    pub const LINUX_SLL: LinkType = LinkType(113);
    /// 802.11 plus radiotap header.
    pub const RADIOTAP: LinkType = LinkType(127);
    /// Per-Packet Information framing.
    pub const PPI: LinkType = LinkType(192);
    /// Raw IPv4.
    pub const IPV4: LinkType = LinkType(228);
    /// Raw IPv6.
    pub const IPV6: LinkType = LinkType(229);

    /// Protocol name of the outermost header for this link-type, when one
    /// is defined.
    pub fn header_kind(self) -> Option<&'static str> {
        match self {
            LinkType::ETHERNET => Some("Eth"),
            LinkType::IEEE802_11 => Some("Dot11"),
            LinkType::RADIOTAP => Some("RadioTap"),
            LinkType::PPI => Some("PPI"),
            LinkType::IPV4 => Some("IP"),
            LinkType::IPV6 => Some("IPv6"),
            _ => None,
        }
    }
}

impl From<u16> for LinkType {
    fn from(value: u16) -> Self {
        LinkType(value)
    }
}

impl From<LinkType> for u16 {
    fn from(value: LinkType) -> Self {
        value.0
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
