//! Common block types.

use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::enhanced_packet::EnhancedPacketBlock;
use super::interface_description::InterfaceDescriptionBlock;
use super::section_header::SectionHeaderBlock;
use super::simple_packet::SimplePacketBlock;
use super::unknown::UnknownBlock;
use crate::common::Endianness;
use crate::errors::{Error, Result};

/// Section header block type
pub const SECTION_HEADER_BLOCK: u32 = 0x0A0D0D0A;
/// Interface description block type
pub const INTERFACE_DESCRIPTION_BLOCK: u32 = 0x00000001;
/// Simple packet block type
pub const SIMPLE_PACKET_BLOCK: u32 = 0x00000003;
/// Enhanced packet block type
pub const ENHANCED_PACKET_BLOCK: u32 = 0x00000006;

//   0               1               2               3
//   0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                          Block Type                           |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                      Block Total Length                       |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  /                          Block Body                           /
//  /          /* variable length, aligned to 32 bits */            /
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                      Block Total Length                       |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// PcapNg Block
#[derive(Clone, Debug)]
pub struct RawBlock<'a> {
    /// Type field
    pub type_: u32,
    /// Initial length field
    pub initial_len: u32,
    /// Body of the block
    pub body: Cow<'a, [u8]>,
    /// Trailer length field
    pub trailer_len: u32,
}

impl<'a> RawBlock<'a> {
    /// Parses a borrowed [`RawBlock`] from a slice.
    pub fn from_slice<B: ByteOrder>(mut slice: &'a [u8]) -> Result<(&'a [u8], RawBlock<'a>)> {
        if slice.len() < 12 {
            return Err(Error::Truncated);
        }

        let type_ = slice.read_u32::<B>().map_err(|_| Error::Truncated)?;

        // Special case for the section header because we don't know the endianness yet
        if type_ == SECTION_HEADER_BLOCK {
            let initial_len = slice.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;

            // Check the first field of the Section header to find the endianness
            let mut tmp_slice = slice;
            let magic = tmp_slice.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;
            match magic {
                0x1A2B3C4D => inner_parse::<BigEndian>(slice, type_, initial_len),
                0x4D3C2B1A => inner_parse::<LittleEndian>(slice, type_, initial_len.swap_bytes()),
                _ => Err(Error::MalformedBlock("SectionHeaderBlock: invalid magic number")),
            }
        }
        else {
            let initial_len = slice.read_u32::<B>().map_err(|_| Error::Truncated)?;
            inner_parse::<B>(slice, type_, initial_len)
        }
    }

    /// Reads an owned [`RawBlock`] from a reader, returning the section
    /// endianness in effect after the block (a section header switches it).
    ///
    /// `Ok(None)` on a clean end of stream.
    pub fn from_reader<R: std::io::Read>(
        reader: &mut R,
        endianness: Endianness,
    ) -> Result<Option<(RawBlock<'static>, Endianness)>> {
        let mut head = [0_u8; 4];
        if !read_all_or_eof(reader, &mut head)? {
            return Ok(None);
        }
        // The section header type is a byte-order palindrome, so this test
        // holds under either endianness.
        let type_ = BigEndian::read_u32(&head);

        if type_ == SECTION_HEADER_BLOCK {
            let mut initial_len = reader.read_u32::<BigEndian>()?;
            let magic = reader.read_u32::<BigEndian>()?;

            let endianness = match magic {
                0x1A2B3C4D => Endianness::Big,
                0x4D3C2B1A => Endianness::Little,
                _ => return Err(Error::MalformedBlock("SectionHeaderBlock: invalid magic number")),
            };

            if endianness.is_little() {
                initial_len = initial_len.swap_bytes();
            }
            check_len(initial_len)?;
            if initial_len < 28 {
                return Err(Error::MalformedBlock("SectionHeaderBlock: block length < 28"));
            }

            let mut body = vec![0_u8; initial_len as usize - 12];
            // Put the magic back at the front of the body
            BigEndian::write_u32(&mut body[..4], magic);
            reader.read_exact(&mut body[4..])?;

            let trailer_len = match endianness {
                Endianness::Big => reader.read_u32::<BigEndian>()?,
                Endianness::Little => reader.read_u32::<LittleEndian>()?,
            };
            if initial_len != trailer_len {
                return Err(Error::MalformedBlock("Block: initial_length != trailer_length"));
            }

            let block = RawBlock { type_, initial_len, body: Cow::Owned(body), trailer_len };
            Ok(Some((block, endianness)))
        }
        else {
            let initial_len = match endianness {
                Endianness::Big => reader.read_u32::<BigEndian>()?,
                Endianness::Little => reader.read_u32::<LittleEndian>()?,
            };
            check_len(initial_len)?;

            let mut body = vec![0_u8; initial_len as usize - 12];
            reader.read_exact(&mut body)?;

            let trailer_len = match endianness {
                Endianness::Big => reader.read_u32::<BigEndian>()?,
                Endianness::Little => reader.read_u32::<LittleEndian>()?,
            };
            if initial_len != trailer_len {
                return Err(Error::MalformedBlock("Block: initial_length != trailer_length"));
            }

            let block = RawBlock { type_, initial_len, body: Cow::Owned(body), trailer_len };
            Ok(Some((block, endianness)))
        }
    }

    /// Parses the body into a typed [`Block`] borrowing from this block.
    pub fn as_block<B: ByteOrder>(&self) -> Result<Block<'_>> {
        parse_body::<B>(self.type_, self.initial_len, &self.body)
    }

    /// Tries to convert a [`RawBlock`] into a [`Block`].
    ///
    /// The RawBlock must be borrowed.
    pub fn try_into_block<B: ByteOrder>(self) -> Result<Block<'a>> {
        let body = match self.body {
            Cow::Borrowed(b) => b,
            _ => panic!("The raw block is not borrowed"),
        };
        parse_body::<B>(self.type_, self.initial_len, body)
    }
}

fn check_len(initial_len: u32) -> Result<()> {
    if (initial_len % 4) != 0 {
        return Err(Error::MalformedBlock("Block: (initial_len % 4) != 0"));
    }
    if initial_len < 12 {
        return Err(Error::MalformedBlock("Block: initial_len < 12"));
    }
    Ok(())
}

fn inner_parse<B: ByteOrder>(
    slice: &[u8],
    type_: u32,
    initial_len: u32,
) -> Result<(&[u8], RawBlock<'_>)> {
    check_len(initial_len)?;

    // Check if there is enough data for the body and the trailer_len
    if slice.len() < initial_len as usize - 8 {
        return Err(Error::Truncated);
    }

    let body_len = initial_len - 12;
    let body = &slice[..body_len as usize];

    let mut rem = &slice[body_len as usize..];
    let trailer_len = rem.read_u32::<B>().map_err(|_| Error::Truncated)?;

    if initial_len != trailer_len {
        return Err(Error::MalformedBlock("Block: initial_length != trailer_length"));
    }

    let block = RawBlock { type_, initial_len, body: Cow::Borrowed(body), trailer_len };

    Ok((rem, block))
}

fn parse_body<B: ByteOrder>(type_: u32, initial_len: u32, body: &[u8]) -> Result<Block<'_>> {
    match type_ {
        SECTION_HEADER_BLOCK => {
            let (_, block) = SectionHeaderBlock::from_slice::<BigEndian>(body)?;
            Ok(Block::SectionHeader(block))
        },
        INTERFACE_DESCRIPTION_BLOCK => {
            let (_, block) = InterfaceDescriptionBlock::from_slice::<B>(body)?;
            Ok(Block::InterfaceDescription(block))
        },
        SIMPLE_PACKET_BLOCK => {
            let (_, block) = SimplePacketBlock::from_slice::<B>(body)?;
            Ok(Block::SimplePacket(block))
        },
        ENHANCED_PACKET_BLOCK => {
            let (_, block) = EnhancedPacketBlock::from_slice::<B>(body)?;
            Ok(Block::EnhancedPacket(block))
        },
        type_ => Ok(Block::Unknown(UnknownBlock::new(type_, initial_len, body))),
    }
}

/// PcapNg parsed blocks
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub enum Block<'a> {
    /// Section Header block
    SectionHeader(SectionHeaderBlock<'a>),
    /// Interface Description block
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    /// Simple packet block
    SimplePacket(SimplePacketBlock<'a>),
    /// Enhanced packet block
    EnhancedPacket(EnhancedPacketBlock<'a>),
    /// Unknown block
    Unknown(UnknownBlock<'a>),
}

impl<'a> Block<'a> {
    /// Parses a [`Block`] from a slice
    pub fn from_slice<B: ByteOrder>(slice: &'a [u8]) -> Result<(&'a [u8], Block<'a>)> {
        let (rem, raw_block) = RawBlock::from_slice::<B>(slice)?;
        let block = raw_block.try_into_block::<B>()?;

        Ok((rem, block))
    }

    /// Writes a [`Block`] to a writer, framing the body with the type and
    /// length fields and padding it to a 32-bit boundary.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        return match self {
            Self::SectionHeader(b) => inner_write_to::<B, _, W>(b, SECTION_HEADER_BLOCK, writer),
            Self::InterfaceDescription(b) => {
                inner_write_to::<B, _, W>(b, INTERFACE_DESCRIPTION_BLOCK, writer)
            },
            Self::SimplePacket(b) => inner_write_to::<B, _, W>(b, SIMPLE_PACKET_BLOCK, writer),
            Self::EnhancedPacket(b) => inner_write_to::<B, _, W>(b, ENHANCED_PACKET_BLOCK, writer),
            Self::Unknown(b) => inner_write_to::<B, _, W>(b, b.type_, writer),
        };

        fn inner_write_to<'a, B: ByteOrder, BL: PcapNgBlock<'a>, W: Write>(
            block: &BL,
            block_code: u32,
            writer: &mut W,
        ) -> IoResult<usize> {
            // Fake write to compute the data length
            let data_len = block.write_to::<B, _>(&mut std::io::sink())?;
            let pad_len = (4 - (data_len % 4)) % 4;

            let block_len = data_len + pad_len + 12;

            writer.write_u32::<B>(block_code)?;
            writer.write_u32::<B>(block_len as u32)?;
            block.write_to::<B, _>(writer)?;
            writer.write_all(&[0_u8; 3][..pad_len])?;
            writer.write_u32::<B>(block_len as u32)?;

            Ok(block_len)
        }
    }

    /// Tries to downcast the current block into an [`EnhancedPacketBlock`], if possible
    pub fn into_enhanced_packet(self) -> Option<EnhancedPacketBlock<'a>> {
        match self {
            Block::EnhancedPacket(a) => Some(a),
            _ => None,
        }
    }

    /// Tries to downcast the current block into an [`InterfaceDescriptionBlock`], if possible
    pub fn into_interface_description(self) -> Option<InterfaceDescriptionBlock<'a>> {
        match self {
            Block::InterfaceDescription(a) => Some(a),
            _ => None,
        }
    }

    /// Tries to downcast the current block into an [`SectionHeaderBlock`], if possible
    pub fn into_section_header(self) -> Option<SectionHeaderBlock<'a>> {
        match self {
            Block::SectionHeader(a) => Some(a),
            _ => None,
        }
    }

    /// Tries to downcast the current block into an [`SimplePacketBlock`], if possible
    pub fn into_simple_packet(self) -> Option<SimplePacketBlock<'a>> {
        match self {
            Block::SimplePacket(a) => Some(a),
            _ => None,
        }
    }
}

fn read_all_or_eof<R: std::io::Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..])?;
        if read == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(Error::Truncated);
        }
        filled += read;
    }
    Ok(true)
}

/// Common interface for the PcapNg blocks
pub trait PcapNgBlock<'a> {
    /// Parse a new block from a slice
    fn from_slice<B: ByteOrder>(slice: &'a [u8]) -> Result<(&'a [u8], Self)>
    where
        Self: std::marker::Sized;

    /// Write the content of a block into a writer
    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize>;

    /// Convert a block into the [`Block`] enumeration
    fn into_block(self) -> Block<'a>;
}
