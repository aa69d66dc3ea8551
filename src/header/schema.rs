//! Header-kind descriptors and the process-wide registry.
//!
//! A header kind is declared once as a [`Schema`]: an ordered list of
//! [`FieldDef`]s plus its protocol name, default endianness, bit groups and
//! an optional subkind dispatch hook. The schema is the single source of
//! truth for both the parse and the serialization loop; instances
//! ([`super::Header`]) only hold values.
//!
//! Schemas and bindings live in a [`Registry`] that is populated during
//! initialization and read-only afterwards. Misdeclared schemas (duplicate
//! field names, bit widths that do not sum to the host width, unknown
//! insertion targets) panic at declaration time: declarations are program
//! text, not input.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::common::Endianness;
use crate::field::{EnumMap, FieldKind, FieldValue};
use crate::header::Header;
use crate::packet::binding::{BindOp, Binding, Clause};

/// Stable identifier of a header kind, usable in binding tables.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HeaderId(pub(crate) u16);

/// How a variable-length field learns its length (or element count) at
/// read time.
#[derive(Clone, Copy, Debug)]
pub enum Builder {
    /// The value of an earlier integer field.
    Field(&'static str),
    /// Whatever is left of the input buffer.
    Remaining,
    /// An arbitrary function of the already-read fields.
    With(fn(&Header) -> usize),
}

/// Reconciliation rule of a calculable field, applied by
/// [`crate::packet::Packet::recalc`].
#[derive(Clone, Copy, Debug)]
pub enum CalcRule {
    /// This header's wire length plus the length of all inner headers and
    /// payload, plus `bias`.
    TotalLength {
        /// Constant added to the computed length
        bias: i64,
    },
    /// Length of all inner headers and payload, plus `bias`.
    PayloadLength {
        /// Constant added to the computed length
        bias: i64,
    },
    /// Element count of the named array field of the same header.
    ElementCount {
        /// Array field whose length is mirrored
        array: &'static str,
    },
    /// Checksum over this header and, depending on the kind, a
    /// pseudo-header and the inner bytes.
    Checksum(ChecksumKind),
}

/// Checksum algorithms known to the engine.
#[derive(Clone, Copy, Debug)]
pub enum ChecksumKind {
    /// Internet checksum over this header's fields only (body excluded),
    /// with the checksum field zeroed. Used by IPv4.
    HeaderInternet,
    /// Internet checksum over an IPv4/IPv6 pseudo-header (taken from the
    /// nearest lower header carrying `src`/`dst` addresses), this header and
    /// the inner bytes. Used by UDP and ICMPv6.
    PseudoHeaderInternet {
        /// Protocol number placed in the pseudo-header
        protocol: u8,
    },
}

/// Declaration of one header field.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) default: Option<FieldValue>,
    pub(crate) builder: Option<Builder>,
    pub(crate) calc: Option<CalcRule>,
}

impl FieldDef {
    /// A field of the given name and kind, with the kind's default value.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef { name, kind, default: None, builder: None, calc: None }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets an unsigned-integer default value.
    pub fn default_uint(self, value: u64) -> Self {
        self.with_default(FieldValue::UInt(value))
    }

    /// Sets the length builder of a variable-length kind.
    pub fn builder(mut self, builder: Builder) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Marks the field calculable under the given rule.
    pub fn calc(mut self, rule: CalcRule) -> Self {
        self.calc = Some(rule);
        self
    }
}

/// One sub-field of a bit group.
#[derive(Clone, Debug)]
pub struct SubField {
    pub(crate) name: &'static str,
    pub(crate) width: u32,
    pub(crate) shift: u32,
}

/// Decomposition of one integer field into named bit ranges,
/// most-significant-first.
#[derive(Clone, Debug)]
pub struct BitGroup {
    pub(crate) host: &'static str,
    pub(crate) subs: Vec<SubField>,
}

/// Declared layout of a header kind.
#[derive(Clone, Debug)]
pub struct Schema {
    pub(crate) id: HeaderId,
    pub(crate) name: &'static str,
    pub(crate) parent: Option<HeaderId>,
    pub(crate) endian: Endianness,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) bit_groups: Vec<BitGroup>,
    pub(crate) dispatch: Option<fn(&Header) -> Option<&'static str>>,
}

impl Schema {
    /// Protocol name of this kind.
    pub fn protocol_name(&self) -> &'static str {
        self.name
    }

    /// Stable identifier of this kind.
    pub fn header_id(&self) -> HeaderId {
        self.id
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub(crate) fn body_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| matches!(f.kind, FieldKind::Body))
    }

    pub(crate) fn sub_field(&self, name: &str) -> Option<(&'static str, &SubField)> {
        self.bit_groups
            .iter()
            .find_map(|g| g.subs.iter().find(|s| s.name == name).map(|s| (g.host, s)))
    }
}

/// Mutable view of a [`Schema`] during declaration.
pub struct SchemaBuilder<'s> {
    schema: &'s mut Schema,
}

impl<'s> SchemaBuilder<'s> {
    /// Appends a field.
    pub fn field(&mut self, def: FieldDef) -> &mut Self {
        self.insert(self.schema.fields.len(), def)
    }

    /// Inserts a field immediately before `target`.
    pub fn field_before(&mut self, target: &str, def: FieldDef) -> &mut Self {
        let idx = self.index_of(target);
        self.insert(idx, def)
    }

    /// Inserts a field immediately after `target`.
    pub fn field_after(&mut self, target: &str, def: FieldDef) -> &mut Self {
        let idx = self.index_of(target);
        self.insert(idx + 1, def)
    }

    /// Removes a field. Used by subkinds that replace the trailing body
    /// with their own fields.
    pub fn delete_field(&mut self, name: &str) -> &mut Self {
        let idx = self.index_of(name);
        self.schema.fields.remove(idx);
        self
    }

    /// Replaces a field's default value.
    pub fn update_default(&mut self, name: &str, value: FieldValue) -> &mut Self {
        let idx = self.index_of(name);
        self.schema.fields[idx].default = Some(value);
        self
    }

    /// Replaces the variant map of an enumerated field.
    pub fn update_enum(&mut self, name: &str, map: EnumMap) -> &mut Self {
        let idx = self.index_of(name);
        match &mut self.schema.fields[idx].kind {
            FieldKind::Enum { map: m, .. } => *m = map,
            kind => panic!("{}.{name} is not an enumerated field: {kind:?}", self.schema.name),
        }
        self
    }

    /// Declares bit-range accessors on an integer host field,
    /// most-significant-first. Widths must sum to the host's bit width.
    pub fn bits_on(&mut self, host: &'static str, subs: &[(&'static str, u32)]) -> &mut Self {
        let idx = self.index_of(host);
        let host_bits = match &self.schema.fields[idx].kind {
            FieldKind::UInt { width, .. } | FieldKind::Enum { width, .. } => width.bits(),
            kind => panic!("{}.{host} cannot host bit fields: {kind:?}", self.schema.name),
        };

        let total: u32 = subs.iter().map(|(_, w)| *w).sum();
        assert!(
            total == host_bits,
            "{}.{host}: bit widths sum to {total}, host has {host_bits} bits",
            self.schema.name
        );

        let mut shift = host_bits;
        let subs = subs
            .iter()
            .map(|&(name, width)| {
                assert!(width > 0, "{}.{host}.{name}: zero-width bit field", self.schema.name);
                shift -= width;
                SubField { name, width, shift }
            })
            .collect();

        self.schema.bit_groups.push(BitGroup { host, subs });
        self
    }

    /// Installs the subkind dispatch hook: after a generic read, the hook
    /// inspects the discriminator field(s) and names the subkind to re-parse
    /// the bytes as.
    pub fn dispatch(&mut self, hook: fn(&Header) -> Option<&'static str>) -> &mut Self {
        self.schema.dispatch = Some(hook);
        self
    }

    fn insert(&mut self, idx: usize, def: FieldDef) -> &mut Self {
        assert!(
            self.schema.field_index(def.name).is_none(),
            "{}: duplicate field {}",
            self.schema.name,
            def.name
        );
        self.schema.fields.insert(idx, def);
        self
    }

    fn index_of(&self, name: &str) -> usize {
        match self.schema.field_index(name) {
            Some(idx) => idx,
            None => panic!("{}: no field named {name}", self.schema.name),
        }
    }
}

/// Process-wide table of header kinds and bindings.
///
/// A registry is populated by declaration code, then only read; the
/// built-in catalog is finalized inside a `OnceLock` so registration
/// happens-before every use. Tests may build their own registries.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: Vec<Schema>,
    by_name: HashMap<&'static str, HeaderId>,
    pub(crate) bindings: Vec<Binding>,
    link_guesses: Vec<HeaderId>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry holding the built-in header catalog.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut registry = Registry::new();
            crate::headers::register_all(&mut registry);
            registry
        })
    }

    /// Declares a header kind. `declare` receives the schema under
    /// construction.
    pub fn define(
        &mut self,
        name: &'static str,
        endian: Endianness,
        declare: impl FnOnce(&mut SchemaBuilder<'_>),
    ) -> HeaderId {
        self.define_inner(name, None, endian, vec![], vec![], declare)
    }

    /// Declares a subkind: the parent's field list is cloned, then edited by
    /// `declare`.
    pub fn define_subkind(
        &mut self,
        name: &'static str,
        parent: HeaderId,
        declare: impl FnOnce(&mut SchemaBuilder<'_>),
    ) -> HeaderId {
        let base = self.schema(parent);
        let endian = base.endian;
        let fields = base.fields.clone();
        let bit_groups = base.bit_groups.clone();
        self.define_inner(name, Some(parent), endian, fields, bit_groups, declare)
    }

    fn define_inner(
        &mut self,
        name: &'static str,
        parent: Option<HeaderId>,
        endian: Endianness,
        fields: Vec<FieldDef>,
        bit_groups: Vec<BitGroup>,
        declare: impl FnOnce(&mut SchemaBuilder<'_>),
    ) -> HeaderId {
        assert!(!self.by_name.contains_key(name), "duplicate header kind {name}");
        let id = HeaderId(self.schemas.len() as u16);
        let mut schema = Schema { id, name, parent, endian, fields, bit_groups, dispatch: None };
        declare(&mut SchemaBuilder { schema: &mut schema });
        self.schemas.push(schema);
        self.by_name.insert(name, id);
        id
    }

    /// Registers a binding: `upper` may follow `lower` when the clauses
    /// hold on the lower header (`All` of them, or `Any`).
    pub fn bind(&mut self, lower: HeaderId, upper: HeaderId, op: BindOp, clauses: Vec<Clause>) {
        self.bindings.push(Binding { lower, upper, op, clauses });
    }

    /// Appends a kind to the link-layer guess list used when a capture's
    /// link-type is unknown. Declaration order is the try order.
    pub fn push_guess(&mut self, id: HeaderId) {
        self.link_guesses.push(id);
    }

    /// Kinds tried, in order, for packets with an unknown link-type.
    pub fn link_guesses(&self) -> &[HeaderId] {
        &self.link_guesses
    }

    /// Identifier of a kind by protocol name.
    pub fn lookup(&self, name: &str) -> Option<HeaderId> {
        self.by_name.get(name).copied()
    }

    /// Schema of a kind.
    pub fn schema(&self, id: HeaderId) -> &Schema {
        &self.schemas[id.0 as usize]
    }

    /// True if `id` is the named kind or one of its subkinds.
    pub fn is_kind_of(&self, id: HeaderId, name: &str) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let schema = self.schema(id);
            if schema.name == name {
                return true;
            }
            current = schema.parent;
        }
        false
    }

    /// Field assignments applied to a `lower` header when an `upper` header
    /// is pushed on top of it, from the first registered binding between the
    /// two kinds (or between `lower` and an ancestor kind of `upper`).
    ///
    /// `None` means the stacking is unbound.
    pub fn defaults_for(&self, lower: HeaderId, upper: HeaderId) -> Option<Vec<(&'static str, u64)>> {
        let mut target = Some(upper);
        while let Some(upper) = target {
            if let Some(binding) =
                self.bindings.iter().find(|b| b.lower == lower && b.upper == upper)
            {
                return Some(binding.setters());
            }
            target = self.schema(upper).parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::IntWidth;

    fn minimal(registry: &mut Registry) -> HeaderId {
        registry.define("Fake", Endianness::Big, |s| {
            s.field(FieldDef::new("a", FieldKind::u8()))
                .field(FieldDef::new("c", FieldKind::u8()));
        })
    }

    #[test]
    fn field_insertion_order() {
        let mut registry = Registry::new();
        let id = registry.define("Fake", Endianness::Big, |s| {
            s.field(FieldDef::new("a", FieldKind::u8()))
                .field(FieldDef::new("c", FieldKind::u8()))
                .field_after("a", FieldDef::new("b", FieldKind::u8()))
                .field_before("a", FieldDef::new("zero", FieldKind::u8()));
        });
        let names: Vec<_> = registry.schema(id).fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["zero", "a", "b", "c"]);
    }

    #[test]
    fn delete_field_removes() {
        let mut registry = Registry::new();
        let id = minimal(&mut registry);
        let sub = registry.define_subkind("Fake::Sub", id, |s| {
            s.delete_field("c").field(FieldDef::new("d", FieldKind::u16()));
        });
        let names: Vec<_> = registry.schema(sub).fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["a", "d"]);
        // the parent is untouched
        assert_eq!(registry.schema(id).fields.len(), 2);
        assert!(registry.is_kind_of(sub, "Fake"));
        assert!(!registry.is_kind_of(id, "Fake::Sub"));
    }

    #[test]
    #[should_panic(expected = "duplicate field")]
    fn duplicate_field_panics() {
        let mut registry = Registry::new();
        registry.define("Fake", Endianness::Big, |s| {
            s.field(FieldDef::new("a", FieldKind::u8())).field(FieldDef::new("a", FieldKind::u8()));
        });
    }

    #[test]
    #[should_panic(expected = "bit widths sum")]
    fn bit_widths_must_fill_host() {
        let mut registry = Registry::new();
        registry.define("Fake", Endianness::Big, |s| {
            s.field(FieldDef::new("flags", FieldKind::uint(IntWidth::W16)))
                .bits_on("flags", &[("a", 4), ("b", 4)]);
        });
    }
}
