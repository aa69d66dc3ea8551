//! Upper-layer dispatch rules.
//!
//! A binding states that header kind *U* may follow header kind *L* when
//! certain fields of *L* hold certain values. Bindings are plain data: the
//! matchers are a small tagged DSL with a function escape hatch, evaluated
//! at parse time by [`crate::header::Registry`].

use crate::errors::{Error, Result};
use crate::header::{Header, HeaderId, Registry};

/// How a clause matches the value of a lower-header field.
#[derive(Clone, Copy, Debug)]
pub enum Matcher {
    /// The field equals this constant.
    Value(u64),
    /// The field equals one of these constants.
    OneOf(&'static [u64]),
    /// Arbitrary predicate on the lower header.
    With(fn(&Header) -> bool),
}

/// One field equality of a binding predicate.
#[derive(Clone, Copy, Debug)]
pub struct Clause {
    /// Field of the lower header the clause inspects.
    pub field: &'static str,
    /// The matcher applied to it.
    pub matcher: Matcher,
}

impl Clause {
    /// `field == value`
    pub fn eq(field: &'static str, value: u64) -> Self {
        Clause { field, matcher: Matcher::Value(value) }
    }

    /// `field in values`
    pub fn one_of(field: &'static str, values: &'static [u64]) -> Self {
        Clause { field, matcher: Matcher::OneOf(values) }
    }

    /// Predicate over the lower header. `field` names the field the
    /// predicate inspects, for specificity accounting.
    pub fn with(field: &'static str, predicate: fn(&Header) -> bool) -> Self {
        Clause { field, matcher: Matcher::With(predicate) }
    }

    fn matches(&self, header: &Header) -> bool {
        match self.matcher {
            Matcher::Value(v) => header.uint(self.field).map(|got| got == v).unwrap_or(false),
            Matcher::OneOf(vs) => {
                header.uint(self.field).map(|got| vs.contains(&got)).unwrap_or(false)
            },
            Matcher::With(f) => f(header),
        }
    }
}

/// Combinator of a binding's clauses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BindOp {
    /// Every clause must hold.
    #[default]
    All,
    /// At least one clause must hold.
    Any,
}

/// A registered `lower -> upper` dispatch rule.
#[derive(Clone, Debug)]
pub struct Binding {
    pub(crate) lower: HeaderId,
    pub(crate) upper: HeaderId,
    pub(crate) op: BindOp,
    pub(crate) clauses: Vec<Clause>,
}

impl Binding {
    pub(crate) fn matches(&self, header: &Header) -> bool {
        match self.op {
            BindOp::All => self.clauses.iter().all(|c| c.matches(header)),
            BindOp::Any => self.clauses.iter().any(|c| c.matches(header)),
        }
    }

    /// Count of distinct field equalities; higher wins ties during parse.
    pub(crate) fn specificity(&self) -> usize {
        let mut fields: Vec<&str> = self.clauses.iter().map(|c| c.field).collect();
        fields.sort_unstable();
        fields.dedup();
        fields.len()
    }

    /// Assignments applied to the lower header when the upper is pushed:
    /// the constant equalities of the predicate.
    pub(crate) fn setters(&self) -> Vec<(&'static str, u64)> {
        self.clauses
            .iter()
            .filter_map(|c| match c.matcher {
                Matcher::Value(v) => Some((c.field, v)),
                _ => None,
            })
            .collect()
    }
}

impl Registry {
    /// Resolves the upper-layer kind of a just-read `lower` header.
    ///
    /// Among the matching bindings the most specific wins; a tie between
    /// two distinct upper kinds fails [`Error::AmbiguousBinding`] unless
    /// `allow_ambiguous`, in which case registration order decides.
    pub fn resolve_upper(&self, lower: &Header, allow_ambiguous: bool) -> Result<Option<HeaderId>> {
        let mut best: Option<&Binding> = None;
        let mut tied: Option<&Binding> = None;

        for binding in self.bindings.iter().filter(|b| b.lower == lower.header_id()) {
            if !binding.matches(lower) {
                continue;
            }
            match best {
                None => best = Some(binding),
                Some(current) => {
                    if binding.specificity() > current.specificity() {
                        best = Some(binding);
                        tied = None;
                    } else if binding.specificity() == current.specificity()
                        && binding.upper != current.upper
                    {
                        tied = Some(binding);
                    }
                },
            }
        }

        match (best, tied) {
            (Some(best), Some(tied)) if !allow_ambiguous => Err(Error::AmbiguousBinding {
                lower: self.schema(lower.header_id()).protocol_name(),
                first: self.schema(best.upper).protocol_name(),
                second: self.schema(tied.upper).protocol_name(),
            }),
            (best, _) => Ok(best.map(|b| b.upper)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Endianness;
    use crate::header::{FieldDef, Registry};
    use crate::field::FieldKind;

    fn registry() -> (Registry, HeaderId, HeaderId, HeaderId) {
        let mut registry = Registry::new();
        let low = registry.define("Low", Endianness::Big, |s| {
            s.field(FieldDef::new("proto", FieldKind::u8()))
                .field(FieldDef::new("port", FieldKind::u16()))
                .field(FieldDef::new("body", FieldKind::Body));
        });
        let up_a = registry.define("UpA", Endianness::Big, |s| {
            s.field(FieldDef::new("x", FieldKind::u8()));
        });
        let up_b = registry.define("UpB", Endianness::Big, |s| {
            s.field(FieldDef::new("y", FieldKind::u8()));
        });
        (registry, low, up_a, up_b)
    }

    fn low_header<'r>(registry: &'r Registry, low: HeaderId, proto: u64, port: u64) -> Header<'r> {
        let mut header = Header::new(registry.schema(low));
        header.set("proto", proto).unwrap();
        header.set("port", port).unwrap();
        header
    }

    #[test]
    fn more_specific_binding_wins() {
        let (mut registry, low, up_a, up_b) = registry();
        registry.bind(low, up_a, BindOp::All, vec![Clause::eq("proto", 6)]);
        registry.bind(low, up_b, BindOp::All, vec![Clause::eq("proto", 6), Clause::eq("port", 80)]);

        let header = low_header(&registry, low, 6, 80);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_b));

        let header = low_header(&registry, low, 6, 22);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_a));
    }

    #[test]
    fn equal_specificity_is_ambiguous() {
        let (mut registry, low, up_a, up_b) = registry();
        registry.bind(low, up_a, BindOp::All, vec![Clause::eq("port", 69)]);
        registry.bind(low, up_b, BindOp::All, vec![Clause::eq("port", 69)]);

        let header = low_header(&registry, low, 17, 69);
        assert!(matches!(
            registry.resolve_upper(&header, false),
            Err(Error::AmbiguousBinding { .. })
        ));
        // suppressed: registration order decides
        assert_eq!(registry.resolve_upper(&header, true).unwrap(), Some(up_a));
    }

    #[test]
    fn same_upper_twice_is_not_ambiguous() {
        let (mut registry, low, up_a, _) = registry();
        registry.bind(low, up_a, BindOp::All, vec![Clause::eq("port", 69)]);
        registry.bind(low, up_a, BindOp::All, vec![Clause::eq("proto", 17)]);

        let header = low_header(&registry, low, 17, 69);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_a));
    }

    #[test]
    fn any_op_matches_either_clause() {
        let (mut registry, low, up_a, _) = registry();
        registry.bind(
            low,
            up_a,
            BindOp::Any,
            vec![Clause::eq("port", 69), Clause::eq("proto", 99)],
        );

        let header = low_header(&registry, low, 0, 69);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_a));

        let header = low_header(&registry, low, 99, 0);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_a));

        let header = low_header(&registry, low, 0, 0);
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), None);
    }

    #[test]
    fn lambda_clause_sees_the_header() {
        let (mut registry, low, up_a, _) = registry();
        registry.bind(
            low,
            up_a,
            BindOp::All,
            vec![Clause::with("body", |h| h.body().len() > 23)],
        );

        let mut header = low_header(&registry, low, 0, 0);
        header.set_body(vec![0; 24]).unwrap();
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), Some(up_a));

        header.set_body(vec![0; 20]).unwrap();
        assert_eq!(registry.resolve_upper(&header, false).unwrap(), None);
    }

    #[test]
    fn defaults_come_from_constant_clauses() {
        let (mut registry, low, up_a, _) = registry();
        registry.bind(low, up_a, BindOp::All, vec![Clause::eq("port", 69)]);

        assert_eq!(registry.defaults_for(low, up_a), Some(vec![("port", 69)]));
        assert_eq!(registry.defaults_for(up_a, low), None);
    }
}
