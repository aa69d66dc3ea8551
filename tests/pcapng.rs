use std::borrow::Cow;

use packetgen::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use packetgen::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
use packetgen::pcapng::blocks::section_header::SectionHeaderBlock;
use packetgen::pcapng::{PcapNgFile, PcapNgReader, PcapNgWriter, Section, SectionPacket, TimedBytes};
use packetgen::{Endianness, Error, LinkType, Registry};

fn single_packet_file(endianness: Endianness, linktype: LinkType, data: &[u8]) -> PcapNgFile {
    let mut section = Section::new(SectionHeaderBlock { endianness, ..Default::default() });
    section.interfaces.push(InterfaceDescriptionBlock::new(linktype, 0xFFFF));
    section.packets.push(SectionPacket::Enhanced(EnhancedPacketBlock {
        interface_id: 0,
        timestamp: (5 << 32) | 0xB8D8_A000,
        original_len: data.len() as u32,
        data: Cow::Owned(data.to_vec()),
        options: vec![],
    }));
    PcapNgFile { sections: vec![section] }
}

#[test]
fn synthesized_file_is_byte_exact() {
    let file = single_packet_file(Endianness::Big, LinkType::ETHERNET, &[0xAA, 0xBB]);
    let bytes = file.to_bytes().unwrap();

    let expected = hex::decode(concat!(
        // SHB: magic, version 1.0, unspecified section length
        "0a0d0d0a0000001c1a2b3c4d00010000ffffffffffffffff0000001c",
        // IDB: ethernet, snaplen 0xFFFF
        "0000000100000014000100000000ffff00000014",
        // EPB: interface 0, tsh/tsl, cap_len = orig_len = 2, 2 pad bytes
        "000000060000002400000000" , "00000005b8d8a000", "0000000200000002", "aabb0000", "00000024",
    ))
    .unwrap();
    assert_eq!(bytes, expected);

    // exactly one of each block type
    let shb_count = bytes.windows(4).filter(|w| *w == [0x0A, 0x0D, 0x0D, 0x0A]).count();
    assert_eq!(shb_count, 1);
}

#[test]
fn file_round_trips_through_bytes() {
    let file = single_packet_file(Endianness::Big, LinkType::ETHERNET, b"data");
    let bytes = file.to_bytes().unwrap();

    let mut reread = PcapNgFile::new();
    reread.read(&bytes).unwrap();

    assert_eq!(reread, file);
    assert_eq!(reread.to_bytes().unwrap(), bytes);
}

#[test]
fn endianness_is_preserved_and_contents_agree() {
    let big = single_packet_file(Endianness::Big, LinkType::ETHERNET, &[1, 2, 3]);
    let little = single_packet_file(Endianness::Little, LinkType::ETHERNET, &[1, 2, 3]);

    let big_bytes = big.to_bytes().unwrap();
    let little_bytes = little.to_bytes().unwrap();
    assert_ne!(big_bytes, little_bytes);

    let mut reread_little = PcapNgFile::new();
    reread_little.read(&little_bytes).unwrap();
    let section = &reread_little.sections[0];

    assert_eq!(section.header.endianness, Endianness::Little);
    assert_eq!(section.interfaces, big.sections[0].interfaces);
    assert_eq!(section.packets, big.sections[0].packets);
    assert_eq!(reread_little.to_bytes().unwrap(), little_bytes);
}

#[test]
fn unknown_blocks_are_preserved_verbatim() {
    let mut bytes = single_packet_file(Endianness::Big, LinkType::ETHERNET, b"xy")
        .to_bytes()
        .unwrap();
    // a block of unassigned type 0x00000BAD carrying 4 opaque bytes
    bytes.extend_from_slice(&hex::decode("00000bad00000010deadbeef00000010").unwrap());

    let mut file = PcapNgFile::new();
    file.read(&bytes).unwrap();

    let unknown = &file.sections[0].unknown_blocks;
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].type_, 0x0BAD);
    assert_eq!(&unknown[0].value[..], hex::decode("deadbeef").unwrap());

    assert_eq!(file.to_bytes().unwrap(), bytes);
}

#[test]
fn simple_packet_blocks_attach_to_interface_zero() {
    let mut section = Section::new(SectionHeaderBlock::default());
    section.interfaces.push(InterfaceDescriptionBlock::new(LinkType::ETHERNET, 0));
    let mut bytes = PcapNgFile { sections: vec![section] }.to_bytes().unwrap();
    // SPB: original_len 4, data "ABCD"
    bytes.extend_from_slice(&hex::decode("0000000300000014000000044142434400000014").unwrap());

    let mut file = PcapNgFile::new();
    let err = file.read(&bytes);
    assert!(err.is_ok(), "{err:?}");

    let packet = &file.sections[0].packets[0];
    assert_eq!(packet.interface_id(), 0);
    assert_eq!(packet.data(), b"ABCD");
}

#[test]
fn packet_block_without_interface_is_rejected() {
    let mut bytes = PcapNgFile {
        sections: vec![Section::new(SectionHeaderBlock::default())],
    }
    .to_bytes()
    .unwrap();
    bytes.extend_from_slice(&hex::decode("0000000300000014000000044142434400000014").unwrap());

    let err = PcapNgFile::new().read(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidInterfaceId(0)));
}

#[test]
fn stream_must_start_with_a_section_header() {
    let bytes = hex::decode("0000000100000014000100000000ffff00000014").unwrap();
    let err = PcapNgFile::new().read(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidFile));
}

#[test]
fn trailer_length_mismatch_is_malformed() {
    let mut bytes = PcapNgFile {
        sections: vec![Section::new(SectionHeaderBlock::default())],
    }
    .to_bytes()
    .unwrap();
    // IDB whose trailing length disagrees with the leading one
    bytes.extend_from_slice(&hex::decode("0000000100000014000100000000ffff00000018").unwrap());

    let err = PcapNgFile::new().read(&bytes).unwrap_err();
    assert!(matches!(err, Error::MalformedBlock(_)));
}

#[test]
fn defined_section_length_bounds_the_section() {
    let mut first = Section::new(SectionHeaderBlock {
        // exactly one 20-byte IDB follows
        section_length: 20,
        ..Default::default()
    });
    first.interfaces.push(InterfaceDescriptionBlock::new(LinkType::ETHERNET, 0));
    let second = Section::new(SectionHeaderBlock::default());

    let bytes = PcapNgFile { sections: vec![first, second] }.to_bytes().unwrap();

    let mut file = PcapNgFile::new();
    file.read(&bytes).unwrap();
    assert_eq!(file.sections.len(), 2);
    assert_eq!(file.sections[0].interfaces.len(), 1);
    assert!(file.sections[1].interfaces.is_empty());
}

#[test]
fn timestamps_scale_with_the_interface_resolution() {
    let file = PcapNgFile::from_packet_bytes(&[TimedBytes::Bytes(b"ab"), TimedBytes::Bytes(b"cd")], 1.5, 1.0);
    let section = &file.sections[0];

    let ts: Vec<u64> = section
        .packets
        .iter()
        .map(|p| match p {
            SectionPacket::Enhanced(epb) => epb.timestamp,
            SectionPacket::Simple(_) => unreachable!(),
        })
        .collect();
    // microsecond default resolution
    assert_eq!(ts, [1_500_000, 2_500_000]);
    assert_eq!(section.packet_timestamp_secs(&section.packets[0]), Some(1.5));

    let explicit = PcapNgFile::from_packet_bytes(&[TimedBytes::At(2.0, b"ab")], 0.0, 1.0);
    match &explicit.sections[0].packets[0] {
        SectionPacket::Enhanced(epb) => assert_eq!(epb.timestamp, 2_000_000),
        SectionPacket::Simple(_) => unreachable!(),
    }
}

#[test]
fn read_packets_uses_the_interface_link_type() {
    let mut eth = packetgen::Packet::gen();
    eth.add("Eth").unwrap();
    let frame = eth.to_bytes();

    let file = single_packet_file(Endianness::Big, LinkType::ETHERNET, &frame);
    let packets = file.parse_packets(Registry::builtin()).unwrap();
    assert_eq!(packets.len(), 1);
    assert!(packets[0].is("Eth"));
}

#[test]
fn unknown_link_type_falls_back_to_guessing() {
    let mut eth = packetgen::Packet::gen();
    eth.add("Eth").unwrap();
    eth.set_payload(b"tail".to_vec()).unwrap();
    let frame = eth.to_bytes();

    // link-type 147 is reserved for private use
    let file = single_packet_file(Endianness::Big, LinkType(147), &frame);
    let packets = file.parse_packets(Registry::builtin()).unwrap();
    assert!(packets[0].is("Eth"));

    // a registered link-type whose header kind is absent guesses as well
    let file = single_packet_file(Endianness::Big, LinkType::RADIOTAP, &frame);
    let packets = file.parse_packets(Registry::builtin()).unwrap();
    assert!(packets[0].is("Eth"));

    // nothing can frame 5 bytes
    let file = single_packet_file(Endianness::Big, LinkType(147), &[0u8; 5]);
    let err = file.parse_packets(Registry::builtin()).unwrap_err();
    assert!(matches!(err, Error::UnparseablePacket));
}

#[test]
fn reader_and_writer_round_trip() {
    let bytes = single_packet_file(Endianness::Little, LinkType::ETHERNET, b"packet")
        .to_bytes()
        .unwrap();

    let mut reader = PcapNgReader::new(&bytes[..]).unwrap();
    let mut writer = PcapNgWriter::with_section_header(Vec::new(), reader.section().clone()).unwrap();

    while let Some(block) = reader.next_block() {
        let block = block.unwrap();
        writer.write_block(&block).unwrap();
    }

    assert_eq!(writer.get_ref(), &bytes);
}

#[test]
fn write_and_read_files_on_disk() {
    let path = std::env::temp_dir().join("packetgen_pcapng_disk_test.pcapng");

    let file = single_packet_file(Endianness::Big, LinkType::ETHERNET, &[0x11, 0x22, 0x33]);
    file.write(&path, false).unwrap();

    let mut reread = PcapNgFile::new();
    reread.read_file(&path).unwrap();
    assert_eq!(reread, file);

    assert_eq!(PcapNgFile::read_packet_bytes(&path).unwrap(), vec![vec![0x11, 0x22, 0x33]]);

    // appended sections stay readable, the file just grows a section
    file.write(&path, true).unwrap();
    let mut appended = PcapNgFile::new();
    appended.read_file(&path).unwrap();
    assert_eq!(appended.sections.len(), 2);

    std::fs::remove_file(&path).ok();
}

#[test]
fn packets_to_file_synthesizes_on_disk() {
    let path = std::env::temp_dir().join("packetgen_pcapng_synth_test.pcapng");

    PcapNgFile::packets_to_file(&[TimedBytes::Bytes(&[0xAA, 0xBB])], 0.0, 1.0, &path, false)
        .unwrap();

    assert_eq!(PcapNgFile::read_packet_bytes(&path).unwrap(), vec![vec![0xAA, 0xBB]]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn each_packet_reports_per_packet_failures() {
    let path = std::env::temp_dir().join("packetgen_pcapng_callback_test.pcapng");

    let mut eth = packetgen::Packet::gen();
    eth.add("Eth").unwrap();
    let frame = eth.to_bytes();

    let mut section = Section::new(SectionHeaderBlock::default());
    section.interfaces.push(InterfaceDescriptionBlock::new(LinkType(147), 0xFFFF));
    for data in [&frame[..], &[0u8; 5][..]] {
        section.packets.push(SectionPacket::Enhanced(EnhancedPacketBlock {
            interface_id: 0,
            timestamp: 0,
            original_len: data.len() as u32,
            data: Cow::Owned(data.to_vec()),
            options: vec![],
        }));
    }
    PcapNgFile { sections: vec![section] }.write(&path, false).unwrap();

    let mut outcomes = Vec::new();
    PcapNgFile::each_packet(Registry::builtin(), &path, |packet| {
        outcomes.push(packet.is_ok());
    })
    .unwrap();
    assert_eq!(outcomes, [true, false]);

    std::fs::remove_file(&path).ok();
}
