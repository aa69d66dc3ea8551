//! Ethernet II.

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, IntWidth};
use crate::header::{FieldDef, Registry};

static ETHERTYPES: EnumMap = EnumMap::new(&[
    ("ipv4", 0x0800),
    ("arp", 0x0806),
    ("ipv6", 0x86DD),
    ("vlan", 0x8100),
]);

pub(crate) fn register(registry: &mut Registry) {
    registry.define("Eth", Endianness::Big, |s| {
        s.field(FieldDef::new("dst", FieldKind::Mac))
            .field(FieldDef::new("src", FieldKind::Mac))
            .field(
                FieldDef::new("ethertype", FieldKind::enumerated(IntWidth::W16, ETHERTYPES))
                    .default_uint(0x0800),
            )
            .field(FieldDef::new("body", FieldKind::Body));
    });
}
