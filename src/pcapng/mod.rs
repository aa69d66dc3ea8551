//! PcapNg file format: blocks, push parser, reader, writer and the
//! in-memory file model.

pub mod blocks;
mod file;
mod parser;
mod reader;
mod writer;

pub use blocks::block_common::{Block, PcapNgBlock, RawBlock};
pub use file::{PcapNgFile, Section, SectionPacket, TimedBytes};
pub use parser::PcapNgParser;
pub use reader::PcapNgReader;
pub use writer::PcapNgWriter;
