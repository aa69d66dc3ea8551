//! ICMPv6 and the Multicast Listener Discovery messages.
//!
//! MLD and the MLDv2 query share ICMPv6 type 130; they are told apart by
//! the message body length, which is what the lambda clause of the MLQ
//! binding checks.

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, IntWidth};
use crate::header::{Builder, CalcRule, ChecksumKind, FieldDef, Registry};
use crate::packet::{BindOp, Clause};

static TYPES: EnumMap = EnumMap::new(&[
    ("mld_query", 130),
    ("mld_report", 131),
    ("mld_done", 132),
    ("echo_request", 128),
    ("echo_reply", 129),
]);

pub(crate) fn register(registry: &mut Registry) {
    let icmpv6 = registry.define("ICMPv6", Endianness::Big, |s| {
        s.field(FieldDef::new("type", FieldKind::enumerated(IntWidth::W8, TYPES)))
            .field(FieldDef::new("code", FieldKind::u8()))
            .field(
                FieldDef::new("checksum", FieldKind::u16())
                    .calc(CalcRule::Checksum(ChecksumKind::PseudoHeaderInternet { protocol: 58 })),
            )
            .field(FieldDef::new("body", FieldKind::Body));
    });

    let mld = registry.define("MLD", Endianness::Big, |s| {
        s.field(FieldDef::new("max_resp_delay", FieldKind::u16()))
            .field(FieldDef::new("reserved", FieldKind::u16()))
            .field(FieldDef::new("mcast_addr", FieldKind::Ipv6))
            .field(FieldDef::new("body", FieldKind::Body));
    });

    // MLDv2 query: MLD plus querier fields and a counted source list
    let mlq = registry.define_subkind("MLQ", mld, |s| {
        s.delete_field("body")
            .field(FieldDef::new("flags", FieldKind::u8()))
            .bits_on("flags", &[("resv", 4), ("suppress", 1), ("qrv", 3)])
            .field(FieldDef::new("qqic", FieldKind::u8()))
            .field(
                FieldDef::new("number_of_sources", FieldKind::u16())
                    .calc(CalcRule::ElementCount { array: "source_addr" }),
            )
            .field(
                FieldDef::new("source_addr", FieldKind::Array { elem: Box::new(FieldKind::Ipv6) })
                    .builder(Builder::Field("number_of_sources")),
            )
            .field(FieldDef::new("body", FieldKind::Body));
    });

    let ipv6 = registry.lookup("IPv6").expect("IPv6 registered before ICMPv6");
    registry.bind(ipv6, icmpv6, BindOp::All, vec![Clause::eq("next", 58)]);

    registry.bind(icmpv6, mld, BindOp::All, vec![Clause::one_of("type", &[130, 131, 132])]);
    registry.bind(
        icmpv6,
        mlq,
        BindOp::All,
        vec![Clause::eq("type", 130), Clause::with("body", |h| h.body().len() > 23)],
    );
}
