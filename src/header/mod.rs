//! Header instances and their schema-driven read/serialize machinery.

pub mod schema;

pub use schema::{
    BitGroup, Builder, CalcRule, ChecksumKind, FieldDef, HeaderId, Registry, Schema, SchemaBuilder,
    SubField,
};

use tracing::trace;

use crate::errors::{Error, Result};
use crate::field::{FieldKind, FieldValue, SetVal};

/// One header of a packet: a schema reference plus one value per field.
///
/// Field order is wire order; reading proceeds field by field in declared
/// order, evaluating each field's builder against the fields already
/// materialised.
#[derive(Clone, Debug)]
pub struct Header<'r> {
    schema: &'r Schema,
    values: Vec<FieldValue>,
}

impl<'r> PartialEq for Header<'r> {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id == other.schema.id && self.values == other.values
    }
}

impl<'r> Header<'r> {
    /// A header of the given kind with every field at its declared (or
    /// kind-level) default.
    pub fn new(schema: &'r Schema) -> Self {
        let values = schema
            .fields
            .iter()
            .map(|def| def.default.clone().unwrap_or_else(|| def.kind.default_value()))
            .collect();
        Header { schema, values }
    }

    /// Protocol name of this header's kind.
    pub fn protocol_name(&self) -> &'static str {
        self.schema.name
    }

    /// Stable identifier of this header's kind.
    pub fn header_id(&self) -> HeaderId {
        self.schema.id
    }

    /// Schema of this header's kind.
    pub fn schema(&self) -> &'r Schema {
        self.schema
    }

    /// Reads the header from `bytes`, returning the consumed byte count.
    ///
    /// If the kind declares a subkind dispatch hook and the hook names a
    /// registered subkind, the bytes are re-parsed under the subkind's
    /// schema and `self` becomes an instance of that kind.
    pub fn read(&mut self, registry: &'r Registry, bytes: &[u8]) -> Result<usize> {
        let mut cursor = 0;
        for idx in 0..self.schema.fields.len() {
            let def = &self.schema.fields[idx];
            let len_param = match def.builder {
                Some(Builder::Field(name)) => Some(self.uint(name)? as usize),
                Some(Builder::Remaining) => Some(bytes.len().saturating_sub(cursor)),
                Some(Builder::With(f)) => Some(f(self)),
                None => None,
            };
            let endian = def.kind.endian_or(self.schema.endian);
            let (value, next) = def.kind.read(bytes, cursor, endian, len_param)?;
            self.values[idx] = value;
            cursor = next;
        }

        if let Some(hook) = self.schema.dispatch {
            if let Some(subkind) = hook(self) {
                if let Some(id) = registry.lookup(subkind) {
                    if id != self.schema.id {
                        trace!(kind = self.schema.name, subkind, "re-parsing as subkind");
                        let mut sub = Header::new(registry.schema(id));
                        let consumed = sub.read(registry, bytes)?;
                        *self = sub;
                        return Ok(consumed);
                    }
                }
            }
        }

        Ok(cursor)
    }

    /// Byte image of the header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (def, value) in self.schema.fields.iter().zip(&self.values) {
            def.kind.write(value, def.kind.endian_or(self.schema.endian), &mut out);
        }
        out
    }

    /// Byte image of the header without its body field. This is what
    /// header-only checksums cover.
    pub(crate) fn to_bytes_no_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (def, value) in self.schema.fields.iter().zip(&self.values) {
            if matches!(def.kind, FieldKind::Body) {
                continue;
            }
            def.kind.write(value, def.kind.endian_or(self.schema.endian), &mut out);
        }
        out
    }

    /// Current wire length of the header.
    pub fn wire_len(&self) -> usize {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .map(|(def, value)| def.kind.size(value))
            .sum()
    }

    /// Value of a field.
    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        let idx = self.index(name)?;
        Ok(&self.values[idx])
    }

    /// Unsigned-integer value of a field.
    pub fn uint(&self, name: &str) -> Result<u64> {
        self.get(name)?
            .as_uint()
            .ok_or_else(|| Error::InvalidValue(format!("{}.{name} is not an integer", self.schema.name)))
    }

    /// Sets a field from any accepted input form (integer, enum variant
    /// name, address string, bytes).
    pub fn set<'v>(&mut self, name: &str, value: impl Into<SetVal<'v>>) -> Result<()> {
        let idx = self.index(name)?;
        let def = &self.schema.fields[idx];
        self.values[idx] = def.kind.coerce(name, value.into())?;
        Ok(())
    }

    /// Sets a field to an already-typed value.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let idx = self.index(name)?;
        self.values[idx] = value;
        Ok(())
    }

    pub(crate) fn set_uint_masked(&mut self, name: &str, value: u64) {
        if let Ok(idx) = self.index(name) {
            let masked = match &self.schema.fields[idx].kind {
                FieldKind::UInt { width, .. } | FieldKind::Enum { width, .. } => {
                    value & width.max_unsigned()
                },
                _ => return,
            };
            self.values[idx] = FieldValue::UInt(masked);
        }
    }

    /// Textual rendering of a field: the variant name of an enumerated
    /// value when known, the plain value otherwise.
    pub fn display(&self, name: &str) -> Result<String> {
        let idx = self.index(name)?;
        let value = &self.values[idx];
        if let (FieldKind::Enum { map, .. }, FieldValue::UInt(v)) =
            (&self.schema.fields[idx].kind, value)
        {
            if let Some(variant) = map.name(*v) {
                return Ok(variant.to_owned());
            }
        }
        Ok(match value {
            FieldValue::UInt(v) => v.to_string(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::Ipv4(addr) => addr.to_string(),
            FieldValue::Ipv6(addr) => addr.to_string(),
            FieldValue::Mac(mac) => mac.to_string(),
            FieldValue::Bytes(b) => hex_string(b),
            FieldValue::Array(items) => format!("[{} elements]", items.len()),
        })
    }

    /// Value of a bit-range sub-field of its host integer.
    pub fn bits(&self, name: &str) -> Result<u64> {
        let (host, sub) = self.sub_field(name)?;
        let value = self.uint(host)?;
        Ok((value >> sub.shift) & mask(sub.width))
    }

    /// Sets a bit-range sub-field, preserving the other bits of the host.
    pub fn set_bits(&mut self, name: &str, value: u64) -> Result<()> {
        let (host, sub) = self.sub_field(name)?;
        if value > mask(sub.width) {
            return Err(Error::InvalidValue(format!(
                "{}.{name}: {value} does not fit {} bits",
                self.schema.name, sub.width
            )));
        }
        let shift = sub.shift;
        let width = sub.width;
        let host_value = self.uint(host)?;
        let cleared = host_value & !(mask(width) << shift);
        self.set_uint_masked(host, cleared | (value << shift));
        Ok(())
    }

    /// Boolean value of a single-bit sub-field.
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.bits(name)? != 0)
    }

    /// Sets a single-bit sub-field.
    pub fn set_flag(&mut self, name: &str, value: bool) -> Result<()> {
        self.set_bits(name, value as u64)
    }

    /// Bytes of the trailing body field; empty if the kind has none.
    pub fn body(&self) -> &[u8] {
        self.schema
            .body_index()
            .and_then(|idx| self.values[idx].as_bytes())
            .unwrap_or(&[])
    }

    /// Replaces the trailing body field.
    pub fn set_body(&mut self, bytes: Vec<u8>) -> Result<()> {
        let idx = self.schema.body_index().ok_or_else(|| {
            Error::InvalidValue(format!("{} has no body field", self.schema.name))
        })?;
        self.values[idx] = FieldValue::Bytes(bytes);
        Ok(())
    }

    pub(crate) fn take_body(&mut self) -> Vec<u8> {
        match self.schema.body_index() {
            Some(idx) => match std::mem::replace(&mut self.values[idx], FieldValue::Bytes(vec![])) {
                FieldValue::Bytes(b) => b,
                other => {
                    self.values[idx] = other;
                    vec![]
                },
            },
            None => vec![],
        }
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.schema
            .field_index(name)
            .ok_or_else(|| Error::InvalidValue(format!("{} has no field {name}", self.schema.name)))
    }

    fn sub_field(&self, name: &str) -> Result<(&'static str, &SubField)> {
        self.schema
            .sub_field(name)
            .ok_or_else(|| Error::InvalidValue(format!("{} has no bit field {name}", self.schema.name)))
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Endianness;
    use crate::field::IntWidth;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define("Demo", Endianness::Big, |s| {
            s.field(FieldDef::new("vhl", FieldKind::u8()).default_uint(0x45))
                .bits_on("vhl", &[("version", 4), ("ihl", 4)])
                .field(FieldDef::new("len", FieldKind::u16()))
                .field(FieldDef::new("name", FieldKind::CString))
                .field(FieldDef::new("body", FieldKind::Body));
        });
        registry
    }

    #[test]
    fn read_then_serialize_round_trips() {
        let registry = registry();
        let schema = registry.schema(registry.lookup("Demo").unwrap());

        let bytes = b"\x45\x00\x10ab\0rest";
        let mut header = Header::new(schema);
        let consumed = header.read(&registry, bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(header.uint("len").unwrap(), 0x10);
        assert_eq!(header.get("name").unwrap(), &FieldValue::Str("ab".into()));
        assert_eq!(header.body(), b"rest");
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn bit_fields_read_and_write_host() {
        let registry = registry();
        let schema = registry.schema(registry.lookup("Demo").unwrap());

        let mut header = Header::new(schema);
        assert_eq!(header.bits("version").unwrap(), 4);
        assert_eq!(header.bits("ihl").unwrap(), 5);

        header.set_bits("ihl", 6).unwrap();
        assert_eq!(header.uint("vhl").unwrap(), 0x46);
        // bits outside the assigned range are preserved
        assert_eq!(header.bits("version").unwrap(), 4);

        assert!(header.set_bits("version", 16).is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let registry = registry();
        let schema = registry.schema(registry.lookup("Demo").unwrap());
        let header = Header::new(schema);
        assert!(header.get("nope").is_err());
    }

    #[test]
    fn prefixed_string_uses_builder() {
        let mut registry = Registry::new();
        registry.define("Pfx", Endianness::Big, |s| {
            s.field(FieldDef::new("len", FieldKind::u8()))
                .field(
                    FieldDef::new("text", FieldKind::PrefixedString)
                        .builder(Builder::Field("len")),
                );
        });
        let schema = registry.schema(registry.lookup("Pfx").unwrap());

        let mut header = Header::new(schema);
        let consumed = header.read(&registry, b"\x03abcdef").unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(header.get("text").unwrap(), &FieldValue::Str("abc".into()));
    }

    #[test]
    fn int_width_display_of_enum() {
        use crate::field::EnumMap;
        static OPS: EnumMap = EnumMap::new(&[("read", 1)]);

        let mut registry = Registry::new();
        registry.define("Op", Endianness::Big, |s| {
            s.field(FieldDef::new("op", FieldKind::enumerated(IntWidth::W16, OPS)));
        });
        let schema = registry.schema(registry.lookup("Op").unwrap());

        let mut header = Header::new(schema);
        header.set("op", "read").unwrap();
        assert_eq!(header.display("op").unwrap(), "read");
        header.set("op", 9u64).unwrap();
        assert_eq!(header.display("op").unwrap(), "9");
    }
}
