//! IPv4.

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, IntWidth};
use crate::header::{CalcRule, ChecksumKind, FieldDef, Registry};
use crate::packet::{BindOp, Clause};

static PROTOCOLS: EnumMap = EnumMap::new(&[
    ("icmp", 1),
    ("tcp", 6),
    ("udp", 17),
    ("ipv6", 41),
    ("icmpv6", 58),
]);

pub(crate) fn register(registry: &mut Registry) {
    let ip = registry.define("IP", Endianness::Big, |s| {
        s.field(FieldDef::new("vhl", FieldKind::u8()).default_uint(0x45))
            .bits_on("vhl", &[("version", 4), ("ihl", 4)])
            .field(FieldDef::new("tos", FieldKind::u8()))
            .bits_on("tos", &[("dscp", 6), ("ecn", 2)])
            .field(FieldDef::new("length", FieldKind::u16()).calc(CalcRule::TotalLength { bias: 0 }))
            .field(FieldDef::new("id", FieldKind::u16()))
            .field(FieldDef::new("frag", FieldKind::u16()))
            .bits_on(
                "frag",
                &[("flag_rsv", 1), ("flag_df", 1), ("flag_mf", 1), ("fragment_offset", 13)],
            )
            .field(FieldDef::new("ttl", FieldKind::u8()).default_uint(64))
            .field(FieldDef::new("protocol", FieldKind::enumerated(IntWidth::W8, PROTOCOLS)))
            .field(
                FieldDef::new("checksum", FieldKind::u16())
                    .calc(CalcRule::Checksum(ChecksumKind::HeaderInternet)),
            )
            .field(FieldDef::new("src", FieldKind::Ipv4))
            .field(FieldDef::new("dst", FieldKind::Ipv4))
            .field(FieldDef::new("body", FieldKind::Body));
    });

    let eth = registry.lookup("Eth").expect("Eth registered before IP");
    registry.bind(eth, ip, BindOp::All, vec![Clause::eq("ethertype", 0x0800)]);
}
