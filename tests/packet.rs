use packetgen::field::{FieldKind, FieldValue};
use packetgen::header::{FieldDef, Registry};
use packetgen::packet::{BindOp, Clause};
use packetgen::{Endianness, Error, Packet};

/// True if the 16-bit one's-complement sum over `bytes` (checksum field
/// included) folds to all ones, i.e. the embedded checksum is valid.
fn checksum_valid(bytes: &[u8]) -> bool {
    let mut sum = 0u32;
    let mut chunks = bytes.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum == 0xFFFF
}

#[test]
fn tftp_rrq_round_trip() {
    let bytes = hex::decode("000166696c65006f6374657400").unwrap();

    let mut packet = Packet::parse(Registry::builtin(), &bytes, "TFTP").unwrap();

    assert!(packet.is("TFTP"));
    let tftp = packet.header("TFTP", 0).unwrap();
    assert_eq!(tftp.protocol_name(), "TFTP::RRQ");
    assert_eq!(tftp.uint("opcode").unwrap(), 1);
    assert_eq!(tftp.display("opcode").unwrap(), "rrq");
    assert_eq!(tftp.get("filename").unwrap(), &FieldValue::Str("file".into()));
    assert_eq!(tftp.get("mode").unwrap(), &FieldValue::Str("octet".into()));

    assert_eq!(packet.to_bytes(), bytes);
}

#[test]
fn build_ip_udp_tftp_ack() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap();
    packet.add("UDP").unwrap();
    packet.add("TFTP::ACK").unwrap().set("block_num", 3u16).unwrap();

    let bytes = packet.to_bytes();

    assert_eq!(packet.header("IP", 0).unwrap().uint("protocol").unwrap(), 17);
    assert_eq!(packet.header("UDP", 0).unwrap().uint("dport").unwrap(), 69);
    assert_eq!(packet.header("TFTP", 0).unwrap().uint("opcode").unwrap(), 4);
    assert!(bytes.ends_with(&[0x00, 0x04, 0x00, 0x03]));

    // reconciled lengths: IP covers the whole stack, UDP its own segment
    assert_eq!(packet.header("IP", 0).unwrap().uint("length").unwrap(), 32);
    assert_eq!(packet.header("UDP", 0).unwrap().uint("length").unwrap(), 12);

    // the IPv4 header checksum verifies
    assert!(checksum_valid(&bytes[..20]));
}

#[test]
fn build_parse_duality() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap().set("dst", "192.168.1.1").unwrap();
    packet.add("UDP").unwrap();
    packet.add("TFTP::ACK").unwrap().set("block_num", 7u16).unwrap();

    let bytes = packet.to_bytes();
    let reparsed = Packet::parse(Registry::builtin(), &bytes, "IP").unwrap();

    assert_eq!(reparsed, packet);
}

#[test]
fn calc_is_idempotent() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap();
    packet.add("UDP").unwrap().set("dport", 53u16).unwrap();
    packet.set_payload(b"query".to_vec()).unwrap();

    packet.recalc();
    let a = packet.to_bytes();
    packet.recalc();
    let b = packet.to_bytes();
    assert_eq!(a, b);
}

#[test]
fn undissected_payload_is_preserved() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap();
    packet.add("UDP").unwrap().set("dport", 9999u16).unwrap();
    packet.set_payload(b"opaque".to_vec()).unwrap();

    let bytes = packet.to_bytes();
    let reparsed = Packet::parse(Registry::builtin(), &bytes, "IP").unwrap();

    assert_eq!(reparsed.payload(), b"opaque");
    assert_eq!(reparsed, packet);
}

#[test]
fn ethernet_chain_dispatch() {
    let mut packet = Packet::gen();
    packet.add("Eth").unwrap().set("src", "02:00:00:00:00:01").unwrap();
    packet.add("IP").unwrap();
    packet.add("UDP").unwrap().set("sport", 69u16).unwrap();

    assert_eq!(packet.header("Eth", 0).unwrap().uint("ethertype").unwrap(), 0x0800);

    let bytes = packet.to_bytes();
    let reparsed = Packet::parse(Registry::builtin(), &bytes, "Eth").unwrap();

    // sport 69 binds UDP to TFTP; the empty segment leaves nothing to parse
    assert!(reparsed.is("UDP"));
    assert_eq!(reparsed, packet);
}

#[test]
fn unbound_stack_is_rejected() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap();
    let err = packet.add("TFTP").unwrap_err();
    assert!(matches!(err, Error::UnboundStack { lower: "IP", upper: "TFTP" }));
}

#[test]
fn mld_mlq_disambiguation() {
    // ICMPv6 type 130, code 0, zero checksum, then the message body:
    // a 20-byte body is an MLDv1 query, a 24-byte body is an MLDv2 query
    let mut mldv1 = vec![130u8, 0, 0, 0];
    mldv1.extend_from_slice(&[0; 20]);
    let packet = Packet::parse(Registry::builtin(), &mldv1, "ICMPv6").unwrap();
    assert_eq!(packet.header("MLD", 0).unwrap().protocol_name(), "MLD");

    let mut mldv2 = vec![130u8, 0, 0, 0];
    mldv2.extend_from_slice(&[0; 24]);
    let packet = Packet::parse(Registry::builtin(), &mldv2, "ICMPv6").unwrap();
    assert_eq!(packet.header("MLD", 0).unwrap().protocol_name(), "MLQ");
    assert!(packet.is("MLQ"));
    // an MLQ still counts as an MLD
    assert!(packet.is("MLD"));
}

#[test]
fn mlq_source_list_and_counter() {
    let mut body = vec![0u8; 20];
    body.extend_from_slice(&[0, 0]); // flags, qqic
    body.extend_from_slice(&[0, 1]); // number_of_sources
    body.extend_from_slice(&std::net::Ipv6Addr::LOCALHOST.octets());

    let mut bytes = vec![130u8, 0, 0, 0];
    bytes.extend_from_slice(&body);

    let packet = Packet::parse(Registry::builtin(), &bytes, "ICMPv6").unwrap();
    let mlq = packet.header("MLQ", 0).unwrap();
    assert_eq!(mlq.uint("number_of_sources").unwrap(), 1);
    assert_eq!(
        mlq.get("source_addr").unwrap(),
        &FieldValue::Array(vec![FieldValue::Ipv6(std::net::Ipv6Addr::LOCALHOST)])
    );

    // byte-exact round trip of the parsed stack, calculable fields untouched
    let image: Vec<u8> = packet.headers().iter().flat_map(|h| h.to_bytes()).collect();
    assert_eq!(image, bytes);
}

#[test]
fn full_ipv6_mld_chain() {
    let mut packet = Packet::gen();
    packet.add("Eth").unwrap();
    packet.add("IPv6").unwrap().set("src", "fe80::1").unwrap();
    packet.add("ICMPv6").unwrap().set("type", "mld_query").unwrap();
    packet.set_payload(vec![0; 20]).unwrap();

    assert_eq!(packet.header("Eth", 0).unwrap().uint("ethertype").unwrap(), 0x86DD);
    assert_eq!(packet.header("IPv6", 0).unwrap().uint("next").unwrap(), 58);

    let bytes = packet.to_bytes();
    assert_eq!(packet.header("IPv6", 0).unwrap().uint("length").unwrap(), 24);

    let reparsed = Packet::parse(Registry::builtin(), &bytes, "Eth").unwrap();
    assert!(reparsed.is("MLD"));
}

#[test]
fn ambiguous_stack_is_rejected() {
    let mut registry = Registry::new();
    let udp = registry.define("UDP", Endianness::Big, |s| {
        s.field(FieldDef::new("sport", FieldKind::u16()))
            .field(FieldDef::new("dport", FieldKind::u16()))
            .field(FieldDef::new("body", FieldKind::Body));
    });
    let x = registry.define("X", Endianness::Big, |s| {
        s.field(FieldDef::new("body", FieldKind::Body));
    });
    let y = registry.define("Y", Endianness::Big, |s| {
        s.field(FieldDef::new("body", FieldKind::Body));
    });
    registry.bind(udp, x, BindOp::All, vec![Clause::eq("dport", 69)]);
    registry.bind(udp, y, BindOp::All, vec![Clause::eq("dport", 69)]);

    let mut bytes = vec![0x30, 0x39, 0x00, 0x45]; // sport 12345, dport 69
    bytes.extend_from_slice(b"payload");

    let err = Packet::parse(&registry, &bytes, "UDP").unwrap_err();
    assert!(matches!(err, Error::AmbiguousBinding { lower: "UDP", first: "X", second: "Y" }));

    // suppressed: registration order decides
    let packet = Packet::parse_lenient(&registry, &bytes, "UDP").unwrap();
    assert!(packet.is("X"));
    assert!(!packet.is("Y"));
}

#[test]
fn binding_determinism() {
    let mut packet = Packet::gen();
    packet.add("IP").unwrap();
    packet.add("UDP").unwrap();
    packet.add("TFTP::DATA").unwrap().set("block_num", 1u16).unwrap();
    packet.set_payload(vec![0xAB; 100]).unwrap();

    let bytes = packet.to_bytes();
    let first = Packet::parse(Registry::builtin(), &bytes, "IP").unwrap();
    let second = Packet::parse(Registry::builtin(), &bytes, "IP").unwrap();
    assert_eq!(first, second);
}

#[test]
fn truncated_parse_surfaces() {
    // 10 bytes cannot hold an IPv4 header
    let err = Packet::parse(Registry::builtin(), &[0u8; 10], "IP").unwrap_err();
    assert!(matches!(err, Error::Truncated));
}
