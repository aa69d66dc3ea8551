//! IPv6.

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, IntWidth};
use crate::header::{CalcRule, FieldDef, Registry};
use crate::packet::{BindOp, Clause};

static NEXT_HEADERS: EnumMap = EnumMap::new(&[
    ("tcp", 6),
    ("udp", 17),
    ("icmpv6", 58),
    ("no_next", 59),
]);

pub(crate) fn register(registry: &mut Registry) {
    let ipv6 = registry.define("IPv6", Endianness::Big, |s| {
        // version / traffic class / flow label share the first 32-bit word
        s.field(FieldDef::new("vtcfl", FieldKind::u32()).default_uint(6 << 28))
            .bits_on("vtcfl", &[("version", 4), ("traffic_class", 8), ("flow_label", 20)])
            .field(
                FieldDef::new("length", FieldKind::u16()).calc(CalcRule::PayloadLength { bias: 0 }),
            )
            .field(FieldDef::new("next", FieldKind::enumerated(IntWidth::W8, NEXT_HEADERS)))
            .field(FieldDef::new("hop", FieldKind::u8()).default_uint(64))
            .field(FieldDef::new("src", FieldKind::Ipv6))
            .field(FieldDef::new("dst", FieldKind::Ipv6))
            .field(FieldDef::new("body", FieldKind::Body));
    });

    let eth = registry.lookup("Eth").expect("Eth registered before IPv6");
    let ip = registry.lookup("IP").expect("IP registered before IPv6");
    registry.bind(eth, ipv6, BindOp::All, vec![Clause::eq("ethertype", 0x86DD)]);
    // 6in4 encapsulation
    registry.bind(ip, ipv6, BindOp::All, vec![Clause::eq("protocol", 41)]);
}
