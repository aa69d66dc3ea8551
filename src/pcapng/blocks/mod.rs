//! PcapNg blocks.

pub mod block_common;
pub mod enhanced_packet;
pub mod interface_description;
pub(crate) mod opt_common;
pub mod section_header;
pub mod simple_packet;
pub mod unknown;

pub use block_common::{
    ENHANCED_PACKET_BLOCK, INTERFACE_DESCRIPTION_BLOCK, SECTION_HEADER_BLOCK, SIMPLE_PACKET_BLOCK,
};
