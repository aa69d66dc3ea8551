//! UDP.

use crate::common::Endianness;
use crate::field::FieldKind;
use crate::header::{CalcRule, ChecksumKind, FieldDef, Registry};
use crate::packet::{BindOp, Clause};

pub(crate) fn register(registry: &mut Registry) {
    let udp = registry.define("UDP", Endianness::Big, |s| {
        s.field(FieldDef::new("sport", FieldKind::u16()))
            .field(FieldDef::new("dport", FieldKind::u16()))
            .field(FieldDef::new("length", FieldKind::u16()).calc(CalcRule::TotalLength { bias: 0 }))
            .field(
                FieldDef::new("checksum", FieldKind::u16())
                    .calc(CalcRule::Checksum(ChecksumKind::PseudoHeaderInternet { protocol: 17 })),
            )
            .field(FieldDef::new("body", FieldKind::Body));
    });

    let ip = registry.lookup("IP").expect("IP registered before UDP");
    let ipv6 = registry.lookup("IPv6").expect("IPv6 registered before UDP");
    registry.bind(ip, udp, BindOp::All, vec![Clause::eq("protocol", 17)]);
    registry.bind(ipv6, udp, BindOp::All, vec![Clause::eq("next", 17)]);
}
