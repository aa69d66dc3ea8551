//! TFTP (RFC 1350).
//!
//! The trailing layout depends on the opcode, so the base kind carries an
//! opaque body and a dispatch hook that re-parses the message as the
//! matching subkind.

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, FieldValue, IntWidth};
use crate::header::{Header, FieldDef, Registry};
use crate::packet::{BindOp, Clause};

static OPCODES: EnumMap = EnumMap::new(&[
    ("rrq", 1),
    ("wrq", 2),
    ("data", 3),
    ("ack", 4),
    ("error", 5),
]);

fn subkind_of(header: &Header) -> Option<&'static str> {
    match header.uint("opcode").ok()? {
        1 => Some("TFTP::RRQ"),
        2 => Some("TFTP::WRQ"),
        3 => Some("TFTP::DATA"),
        4 => Some("TFTP::ACK"),
        5 => Some("TFTP::ERROR"),
        _ => None,
    }
}

pub(crate) fn register(registry: &mut Registry) {
    let tftp = registry.define("TFTP", Endianness::Big, |s| {
        s.field(FieldDef::new("opcode", FieldKind::enumerated(IntWidth::W16, OPCODES)))
            .field(FieldDef::new("body", FieldKind::Body))
            .dispatch(subkind_of);
    });

    registry.define_subkind("TFTP::RRQ", tftp, |s| {
        s.update_default("opcode", FieldValue::UInt(1))
            .delete_field("body")
            .field(FieldDef::new("filename", FieldKind::CString))
            .field(FieldDef::new("mode", FieldKind::CString).with_default(FieldValue::Str("octet".into())));
    });

    registry.define_subkind("TFTP::WRQ", tftp, |s| {
        s.update_default("opcode", FieldValue::UInt(2))
            .delete_field("body")
            .field(FieldDef::new("filename", FieldKind::CString))
            .field(FieldDef::new("mode", FieldKind::CString).with_default(FieldValue::Str("octet".into())));
    });

    registry.define_subkind("TFTP::DATA", tftp, |s| {
        s.update_default("opcode", FieldValue::UInt(3))
            .delete_field("body")
            .field(FieldDef::new("block_num", FieldKind::u16()))
            .field(FieldDef::new("data", FieldKind::Body));
    });

    registry.define_subkind("TFTP::ACK", tftp, |s| {
        s.update_default("opcode", FieldValue::UInt(4))
            .delete_field("body")
            .field(FieldDef::new("block_num", FieldKind::u16()));
    });

    registry.define_subkind("TFTP::ERROR", tftp, |s| {
        s.update_default("opcode", FieldValue::UInt(5))
            .delete_field("body")
            .field(FieldDef::new("error_code", FieldKind::u16()))
            .field(FieldDef::new("error_msg", FieldKind::CString));
    });

    let udp = registry.lookup("UDP").expect("UDP registered before TFTP");
    registry.bind(udp, tftp, BindOp::All, vec![Clause::eq("dport", 69)]);
    registry.bind(udp, tftp, BindOp::All, vec![Clause::eq("sport", 69)]);
}
