//! In-memory PcapNg files.
//!
//! A [`PcapNgFile`] is an ordered list of [`Section`]s; a section owns its
//! interface list, its packet blocks in insertion order, and the unknown
//! blocks it carried. Serializing every section in order yields a valid
//! PcapNg byte stream.

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, trace};

use super::blocks::block_common::{Block, SECTION_HEADER_BLOCK};
use super::blocks::enhanced_packet::EnhancedPacketBlock;
use super::blocks::interface_description::InterfaceDescriptionBlock;
use super::blocks::section_header::SectionHeaderBlock;
use super::blocks::simple_packet::SimplePacketBlock;
use super::blocks::unknown::UnknownBlock;
use crate::common::Endianness;
use crate::errors::{Error, Result};
use crate::header::Registry;
use crate::link_type::LinkType;
use crate::packet::Packet;

/// A packet block of a section, in file order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SectionPacket {
    /// Enhanced Packet Block
    Enhanced(EnhancedPacketBlock<'static>),
    /// Simple Packet Block, implicitly on interface 0
    Simple(SimplePacketBlock<'static>),
}

impl SectionPacket {
    /// Interface the packet was captured on.
    pub fn interface_id(&self) -> u32 {
        match self {
            SectionPacket::Enhanced(epb) => epb.interface_id,
            SectionPacket::Simple(_) => 0,
        }
    }

    /// Captured packet bytes.
    pub fn data(&self) -> &[u8] {
        match self {
            SectionPacket::Enhanced(epb) => &epb.data,
            SectionPacket::Simple(spb) => spb.captured(),
        }
    }
}

/// One PcapNg section: a section header and the blocks that followed it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Section {
    /// The section header block.
    pub header: SectionHeaderBlock<'static>,
    /// Interface descriptions, in file order; packet blocks reference them
    /// by index.
    pub interfaces: Vec<InterfaceDescriptionBlock<'static>>,
    /// Packet blocks, in insertion order.
    pub packets: Vec<SectionPacket>,
    /// Blocks of unrecognised types, preserved verbatim.
    pub unknown_blocks: Vec<UnknownBlock<'static>>,
}

impl Section {
    /// An empty section under the given header.
    pub fn new(header: SectionHeaderBlock<'static>) -> Self {
        Section { header, interfaces: vec![], packets: vec![], unknown_blocks: vec![] }
    }

    /// Link-type of the interface a packet was captured on.
    pub fn link_of(&self, packet: &SectionPacket) -> Result<LinkType> {
        self.interfaces
            .get(packet.interface_id() as usize)
            .map(|iface| iface.linktype)
            .ok_or(Error::InvalidInterfaceId(packet.interface_id()))
    }

    /// Timestamp of an enhanced packet in seconds, scaled by its
    /// interface's resolution. `None` for simple packets, which carry none.
    pub fn packet_timestamp_secs(&self, packet: &SectionPacket) -> Option<f64> {
        match packet {
            SectionPacket::Enhanced(epb) => {
                let iface = self.interfaces.get(epb.interface_id as usize)?;
                Some(epb.timestamp as f64 / iface.ts_units_per_sec() as f64)
            },
            SectionPacket::Simple(_) => None,
        }
    }

    fn push_block(&mut self, block: Block<'_>) -> Result<()> {
        match block {
            Block::SectionHeader(_) => {
                Err(Error::MalformedBlock("Section: unexpected section header inside a section"))
            },
            Block::InterfaceDescription(idb) => {
                self.interfaces.push(idb.into_owned());
                Ok(())
            },
            Block::EnhancedPacket(epb) => {
                if epb.interface_id as usize >= self.interfaces.len() {
                    return Err(Error::InvalidInterfaceId(epb.interface_id));
                }
                trace!(interface = epb.interface_id, len = epb.data.len(), "enhanced packet block");
                self.packets.push(SectionPacket::Enhanced(epb.into_owned()));
                Ok(())
            },
            Block::SimplePacket(spb) => {
                if self.interfaces.is_empty() {
                    return Err(Error::InvalidInterfaceId(0));
                }
                self.packets.push(SectionPacket::Simple(spb.into_owned()));
                Ok(())
            },
            Block::Unknown(block) => {
                debug!(block_type = block.type_, "preserving unknown block");
                self.unknown_blocks.push(block.into_owned());
                Ok(())
            },
        }
    }

    /// Serializes the section: the section header, then the interfaces,
    /// then the packet blocks in insertion order, then the unknown blocks.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        match self.header.endianness {
            Endianness::Big => self.write_inner::<BigEndian, W>(writer),
            Endianness::Little => self.write_inner::<LittleEndian, W>(writer),
        }
    }

    fn write_inner<B: ByteOrder, W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = Block::SectionHeader(self.header.clone())
            .write_to::<B, W>(writer)
            .map_err(Error::Io)?;

        for interface in &self.interfaces {
            written += Block::InterfaceDescription(interface.clone())
                .write_to::<B, W>(writer)
                .map_err(Error::Io)?;
        }
        for packet in &self.packets {
            let block = match packet {
                SectionPacket::Enhanced(epb) => Block::EnhancedPacket(epb.clone()),
                SectionPacket::Simple(spb) => Block::SimplePacket(spb.clone()),
            };
            written += block.write_to::<B, W>(writer).map_err(Error::Io)?;
        }
        for block in &self.unknown_blocks {
            written += Block::Unknown(block.clone()).write_to::<B, W>(writer).map_err(Error::Io)?;
        }

        Ok(written)
    }
}

/// One element of [`PcapNgFile::from_packet_bytes`]: packet bytes, with an
/// optional explicit timestamp in seconds.
#[derive(Clone, Copy, Debug)]
pub enum TimedBytes<'a> {
    /// Bytes stamped with the running timestamp.
    Bytes(&'a [u8]),
    /// Bytes with an explicit timestamp in seconds.
    At(f64, &'a [u8]),
}

/// An in-memory PcapNg file: an ordered list of sections.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PcapNgFile {
    /// The sections, in file order.
    pub sections: Vec<Section>,
}

impl PcapNgFile {
    /// An empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the sections parsed from `src`. Does not clear previously
    /// read sections.
    ///
    /// Fails [`Error::InvalidFile`] when the stream does not start with a
    /// section header block.
    pub fn read(&mut self, src: &[u8]) -> Result<()> {
        let mut pos = 0;
        while pos < src.len() {
            pos += self.read_section(&src[pos..])?;
        }
        Ok(())
    }

    /// Clears the file, then [`read`](Self::read)s.
    pub fn read_clear(&mut self, src: &[u8]) -> Result<()> {
        self.sections.clear();
        self.read(src)
    }

    /// Appends the sections read from a file on disk.
    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.read(&bytes)
    }

    fn read_section(&mut self, src: &[u8]) -> Result<usize> {
        // The section header block type is a byte-order palindrome, so this
        // check holds under either endianness
        if src.len() < 4 || BigEndian::read_u32(&src[..4]) != SECTION_HEADER_BLOCK {
            return Err(Error::InvalidFile);
        }

        let (rem, block) = Block::from_slice::<BigEndian>(src)?;
        let header = match block {
            Block::SectionHeader(header) => header.into_owned(),
            _ => return Err(Error::InvalidFile),
        };
        let endianness = header.endianness;
        let mut consumed = src.len() - rem.len();

        // A defined section_length bounds the section body; otherwise parse
        // until the end of input or the next section header
        let limit = match usize::try_from(header.section_length) {
            Ok(len) => usize::min(consumed.saturating_add(len), src.len()),
            Err(_) => src.len(),
        };

        let mut section = Section::new(header);
        while consumed < limit {
            let window = &src[consumed..limit];
            if window.len() >= 4 && BigEndian::read_u32(&window[..4]) == SECTION_HEADER_BLOCK {
                break;
            }
            let (rem, block) = match endianness {
                Endianness::Big => Block::from_slice::<BigEndian>(window)?,
                Endianness::Little => Block::from_slice::<LittleEndian>(window)?,
            };
            section.push_block(block)?;
            consumed += window.len() - rem.len();
        }

        trace!(
            interfaces = section.interfaces.len(),
            packets = section.packets.len(),
            unknown = section.unknown_blocks.len(),
            "read section"
        );
        self.sections.push(section);
        Ok(consumed)
    }

    /// Serialized byte stream of every section, in order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for section in &self.sections {
            section.write_to(&mut out)?;
        }
        Ok(out)
    }

    /// Writes the file to disk.
    ///
    /// `append` is a strict boolean; appending to an existing PcapNg file
    /// is valid because sections are self-contained. (The historic behavior
    /// of coercing any non-nil `append` to true is not reproduced.)
    pub fn write<P: AsRef<Path>>(&self, path: P, append: bool) -> Result<()> {
        let mut file = if append {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };
        file.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Captured packet bytes of every packet block, in file order.
    pub fn packet_bytes(&self) -> Vec<&[u8]> {
        self.sections
            .iter()
            .flat_map(|section| section.packets.iter().map(SectionPacket::data))
            .collect()
    }

    /// Reads a file from disk and returns its raw packet payloads in file
    /// order.
    pub fn read_packet_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
        let mut file = PcapNgFile::new();
        file.read_file(path)?;
        Ok(file.packet_bytes().into_iter().map(<[u8]>::to_vec).collect())
    }

    /// Dissects every packet block, selecting the outermost header from the
    /// capturing interface's link-type.
    ///
    /// The first failing packet surfaces its error; use
    /// [`each_packet`](Self::each_packet) for per-packet tolerance.
    pub fn parse_packets<'r>(&self, registry: &'r Registry) -> Result<Vec<Packet<'r>>> {
        let mut packets = Vec::new();
        for section in &self.sections {
            for packet in &section.packets {
                let link = section.link_of(packet)?;
                packets.push(Packet::parse_link(registry, link, packet.data())?);
            }
        }
        Ok(packets)
    }

    /// Reads a file from disk and dissects every packet, as
    /// [`parse_packets`](Self::parse_packets).
    pub fn read_packets<'r, P: AsRef<Path>>(
        registry: &'r Registry,
        path: P,
    ) -> Result<Vec<Packet<'r>>> {
        let mut file = PcapNgFile::new();
        file.read_file(path)?;
        file.parse_packets(registry)
    }

    /// Reads a file from disk, invoking `callback` once per packet block
    /// with the dissection outcome. Per-packet parse failures are handed to
    /// the callback instead of aborting the read.
    pub fn each_packet<'r, P, F>(registry: &'r Registry, path: P, mut callback: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnMut(Result<Packet<'r>>),
    {
        let mut file = PcapNgFile::new();
        file.read_file(path)?;
        for section in &file.sections {
            for packet in &section.packets {
                let parsed = section
                    .link_of(packet)
                    .and_then(|link| Packet::parse_link(registry, link, packet.data()));
                callback(parsed);
            }
        }
        Ok(())
    }

    /// Synthesizes a file from raw packet bytes: one section, one Ethernet
    /// interface with the default microsecond resolution, and one enhanced
    /// packet block per element.
    ///
    /// `timestamp` (seconds) stamps the first packet; elements without an
    /// explicit timestamp advance the running clock by `ts_inc` seconds
    /// (pass 1.0 for the conventional one-second spacing).
    pub fn from_packet_bytes(packets: &[TimedBytes<'_>], timestamp: f64, ts_inc: f64) -> Self {
        const TS_UNITS_PER_SEC: f64 = 1_000_000.0;

        let mut section = Section::new(SectionHeaderBlock::default());
        section.interfaces.push(InterfaceDescriptionBlock::new(LinkType::ETHERNET, 0xFFFF));

        let mut clock = timestamp;
        for packet in packets {
            let (ts, data) = match packet {
                TimedBytes::Bytes(data) => {
                    let ts = clock;
                    clock += ts_inc;
                    (ts, *data)
                },
                TimedBytes::At(ts, data) => (*ts, *data),
            };
            section.packets.push(SectionPacket::Enhanced(EnhancedPacketBlock {
                interface_id: 0,
                timestamp: (ts * TS_UNITS_PER_SEC).round() as u64,
                original_len: data.len() as u32,
                data: Cow::Owned(data.to_vec()),
                options: vec![],
            }));
        }

        PcapNgFile { sections: vec![section] }
    }

    /// Synthesizes a file from raw packet bytes and writes it to disk, as
    /// [`from_packet_bytes`](Self::from_packet_bytes) followed by
    /// [`write`](Self::write).
    pub fn packets_to_file<P: AsRef<Path>>(
        packets: &[TimedBytes<'_>],
        timestamp: f64,
        ts_inc: f64,
        path: P,
        append: bool,
    ) -> Result<()> {
        Self::from_packet_bytes(packets, timestamp, ts_inc).write(path, append)
    }
}
