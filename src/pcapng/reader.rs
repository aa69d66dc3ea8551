use std::io::Read;

use byteorder::{BigEndian, LittleEndian};

use super::blocks::block_common::{Block, RawBlock};
use super::blocks::enhanced_packet::EnhancedPacketBlock;
use super::blocks::interface_description::InterfaceDescriptionBlock;
use super::blocks::section_header::SectionHeaderBlock;
use super::blocks::{INTERFACE_DESCRIPTION_BLOCK, SECTION_HEADER_BLOCK};
use crate::common::Endianness;
use crate::errors::{Error, Result};

/// Reads a PcapNg from a reader.
///
/// # Example
/// ```rust,no_run
/// use std::fs::File;
///
/// use packetgen::pcapng::PcapNgReader;
///
/// let file_in = File::open("test.pcapng").expect("Error opening file");
/// let mut pcapng_reader = PcapNgReader::new(file_in).unwrap();
///
/// // Read test.pcapng
/// while let Some(block) = pcapng_reader.next_block() {
///     // Check if there is no error
///     let block = block.unwrap();
///
///     // Do something
/// }
/// ```
pub struct PcapNgReader<R: Read> {
    reader: R,
    section: SectionHeaderBlock<'static>,
    interfaces: Vec<InterfaceDescriptionBlock<'static>>,
}

impl<R: Read> PcapNgReader<R> {
    /// Creates a new [`PcapNgReader`] from a reader.
    ///
    /// Parses the first block which must be a valid SectionHeaderBlock.
    pub fn new(mut reader: R) -> Result<PcapNgReader<R>> {
        // The endianness argument is irrelevant here, the section header
        // carries its own byte-order magic
        let (raw, endianness) = RawBlock::from_reader(&mut reader, Endianness::Big)?
            .ok_or(Error::InvalidFile)?;
        if raw.type_ != SECTION_HEADER_BLOCK {
            return Err(Error::InvalidFile);
        }

        let section = match endianness {
            Endianness::Big => raw.as_block::<BigEndian>()?,
            Endianness::Little => raw.as_block::<LittleEndian>()?,
        }
        .into_owned()
        .into_section_header()
        .ok_or(Error::InvalidFile)?;

        Ok(Self { reader, section, interfaces: vec![] })
    }

    /// Returns the next [`Block`].
    pub fn next_block(&mut self) -> Option<Result<Block<'static>>> {
        match self.next_block_inner() {
            Ok(block) => block.map(Ok),
            Err(err) => Some(Err(err)),
        }
    }

    fn next_block_inner(&mut self) -> Result<Option<Block<'static>>> {
        let read = RawBlock::from_reader(&mut self.reader, self.section.endianness)?;
        let (raw, endianness) = match read {
            Some(read) => read,
            None => return Ok(None),
        };

        let block = match endianness {
            Endianness::Big => raw.as_block::<BigEndian>()?,
            Endianness::Little => raw.as_block::<LittleEndian>()?,
        }
        .into_owned();

        match raw.type_ {
            SECTION_HEADER_BLOCK => {
                self.section = match &block {
                    Block::SectionHeader(section) => section.clone(),
                    _ => return Err(Error::InvalidFile),
                };
                self.interfaces.clear();
            },
            INTERFACE_DESCRIPTION_BLOCK => {
                if let Block::InterfaceDescription(interface) = &block {
                    self.interfaces.push(interface.clone());
                }
            },
            _ => {},
        }

        Ok(Some(block))
    }

    /// Returns the current [`SectionHeaderBlock`].
    pub fn section(&self) -> &SectionHeaderBlock<'static> {
        &self.section
    }

    /// Returns all the current [`InterfaceDescriptionBlock`].
    pub fn interfaces(&self) -> &[InterfaceDescriptionBlock<'static>] {
        &self.interfaces
    }

    /// Returns the [`InterfaceDescriptionBlock`] corresponding to the given packet.
    pub fn packet_interface(&self, packet: &EnhancedPacketBlock) -> Option<&InterfaceDescriptionBlock> {
        self.interfaces.get(packet.interface_id as usize)
    }

    /// Consumes [`Self`], returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Gets a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }
}
