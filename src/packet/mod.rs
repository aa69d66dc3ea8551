//! Packet composition: an ordered stack of headers over a payload.

pub mod binding;

pub use binding::{BindOp, Binding, Clause, Matcher};

use tracing::{debug, trace};

use crate::errors::{Error, Result};
use crate::field::FieldValue;
use crate::header::{CalcRule, ChecksumKind, Header, HeaderId, Registry};
use crate::link_type::LinkType;

/// An ordered stack of header instances plus a trailing opaque payload.
///
/// The payload lives in the innermost header's body field. Serialization
/// reconciles every calculable field (lengths, checksums, array counters)
/// from the innermost header outwards, then concatenates the byte images.
#[derive(Clone, Debug)]
pub struct Packet<'r> {
    registry: &'r Registry,
    headers: Vec<Header<'r>>,
    allow_ambiguous: bool,
}

impl<'r> PartialEq for Packet<'r> {
    fn eq(&self, other: &Self) -> bool {
        self.headers == other.headers
    }
}

impl<'r> Packet<'r> {
    /// An empty packet over the given registry.
    pub fn new(registry: &'r Registry) -> Self {
        Packet { registry, headers: vec![], allow_ambiguous: false }
    }

    /// An empty packet over the built-in catalog.
    pub fn gen() -> Packet<'static> {
        Packet::new(Registry::builtin())
    }

    /// Suppresses [`Error::AmbiguousBinding`]: when two bindings of equal
    /// specificity match, registration order decides instead.
    pub fn allow_ambiguous(&mut self, allow: bool) -> &mut Self {
        self.allow_ambiguous = allow;
        self
    }

    /// Pushes a header of `kind` onto the stack.
    ///
    /// The binding registry is consulted: the previous top's fields are
    /// updated per the matching binding's setters, so that on serialization
    /// the lower header advertises the correct next protocol. Fails
    /// [`Error::UnboundStack`] if no binding links the previous top to
    /// `kind`.
    pub fn add(&mut self, kind: &str) -> Result<&mut Header<'r>> {
        let id = self.lookup(kind)?;
        if let Some(top) = self.headers.last_mut() {
            let setters = self.registry.defaults_for(top.header_id(), id).ok_or_else(|| {
                Error::UnboundStack {
                    lower: top.protocol_name(),
                    upper: self.registry.schema(id).protocol_name(),
                }
            })?;
            for (field, value) in setters {
                top.set_uint_masked(field, value);
            }
        }
        self.headers.push(Header::new(self.registry.schema(id)));
        Ok(self.headers.last_mut().unwrap())
    }

    /// True if the stack contains a header of `kind` (or a subkind of it).
    pub fn is(&self, kind: &str) -> bool {
        self.headers.iter().any(|h| self.registry.is_kind_of(h.header_id(), kind))
    }

    /// The `index`-th header of `kind`, counting subkinds.
    pub fn header(&self, kind: &str, index: usize) -> Option<&Header<'r>> {
        self.headers
            .iter()
            .filter(|h| self.registry.is_kind_of(h.header_id(), kind))
            .nth(index)
    }

    /// Mutable access to the `index`-th header of `kind`.
    pub fn header_mut(&mut self, kind: &str, index: usize) -> Option<&mut Header<'r>> {
        let registry = self.registry;
        self.headers
            .iter_mut()
            .filter(|h| registry.is_kind_of(h.header_id(), kind))
            .nth(index)
    }

    /// All headers, outermost first.
    pub fn headers(&self) -> &[Header<'r>] {
        &self.headers
    }

    /// The trailing opaque payload (the innermost header's body).
    pub fn payload(&self) -> &[u8] {
        self.headers.last().map(|h| h.body()).unwrap_or(&[])
    }

    /// Replaces the trailing payload.
    pub fn set_payload(&mut self, bytes: Vec<u8>) -> Result<()> {
        let innermost = self
            .headers
            .last_mut()
            .ok_or_else(|| Error::InvalidValue("empty packet has no payload".into()))?;
        innermost.set_body(bytes)
    }

    /// Parses `bytes` into a stack, starting from the named header kind.
    ///
    /// After each header is read, the binding registry resolves the next
    /// kind from the just-read fields; dissection stops when no binding
    /// matches or the bytes are exhausted. Remaining bytes become the
    /// innermost header's payload.
    pub fn parse(registry: &'r Registry, bytes: &[u8], first_header: &str) -> Result<Self> {
        let id = registry
            .lookup(first_header)
            .ok_or_else(|| Error::InvalidValue(format!("unknown header kind {first_header}")))?;
        Self::parse_id(registry, id, bytes, false)
    }

    /// As [`Packet::parse`], but ambiguous bindings fall back to
    /// registration order instead of failing.
    pub fn parse_lenient(registry: &'r Registry, bytes: &[u8], first_header: &str) -> Result<Self> {
        let id = registry
            .lookup(first_header)
            .ok_or_else(|| Error::InvalidValue(format!("unknown header kind {first_header}")))?;
        Self::parse_id(registry, id, bytes, true)
    }

    /// Parses captured bytes whose framing is described by a link-type.
    ///
    /// Unknown (or known but unregistered) link-types fall back to the
    /// registry's guess list in declared order; the first kind that consumes
    /// the whole buffer wins. Fails [`Error::UnparseablePacket`] when none
    /// does.
    pub fn parse_link(registry: &'r Registry, link: LinkType, bytes: &[u8]) -> Result<Self> {
        if let Some(name) = link.header_kind() {
            if let Some(id) = registry.lookup(name) {
                return Self::parse_id(registry, id, bytes, false);
            }
            debug!(link = %link, kind = name, "link-type kind not registered, guessing");
        } else {
            debug!(link = %link, "unknown link-type, guessing");
        }

        for &id in registry.link_guesses() {
            match Self::parse_id(registry, id, bytes, false) {
                Ok(packet) => {
                    debug!(kind = registry.schema(id).protocol_name(), "fallback parse succeeded");
                    return Ok(packet);
                },
                Err(err) => {
                    trace!(kind = registry.schema(id).protocol_name(), error = %err, "fallback parse failed");
                },
            }
        }
        Err(Error::UnparseablePacket)
    }

    pub(crate) fn parse_id(
        registry: &'r Registry,
        first: HeaderId,
        bytes: &[u8],
        allow_ambiguous: bool,
    ) -> Result<Self> {
        let mut packet = Packet::new(registry);
        packet.allow_ambiguous = allow_ambiguous;

        let mut id = first;
        let mut buf: Vec<u8> = bytes.to_vec();
        loop {
            let mut header = Header::new(registry.schema(id));
            let read = header.read(registry, &buf).and_then(|consumed| {
                if consumed == buf.len() {
                    Ok(())
                } else {
                    // no body field caught the tail; the kind does not fit
                    Err(Error::UnparseablePacket)
                }
            });
            match read {
                Ok(()) => {
                    trace!(kind = header.protocol_name(), len = buf.len(), "parsed header")
                },
                Err(err) if packet.headers.is_empty() => return Err(err),
                Err(err) => {
                    trace!(error = %err, "inner dissection failed, keeping bytes as payload");
                    let prev = packet.headers.last_mut().unwrap();
                    prev.set_body(buf)?;
                    break;
                },
            }

            let upper = registry.resolve_upper(&header, packet.allow_ambiguous)?;
            match upper {
                Some(up) if !header.body().is_empty() => {
                    buf = header.take_body();
                    packet.headers.push(header);
                    id = up;
                },
                _ => {
                    packet.headers.push(header);
                    break;
                },
            }
        }

        Ok(packet)
    }

    /// Updates every calculable field: length fields, checksum fields and
    /// array counters, reconciled from the innermost header outwards.
    pub fn recalc(&mut self) {
        let mut inner: Vec<u8> = Vec::new();

        for i in (0..self.headers.len()).rev() {
            let rules: Vec<(&'static str, CalcRule)> = self.headers[i]
                .schema()
                .fields
                .iter()
                .filter_map(|f| f.calc.map(|c| (f.name, c)))
                .collect();

            // lengths and counters first, checksums need them in place
            for &(name, rule) in &rules {
                match rule {
                    CalcRule::TotalLength { bias } => {
                        let len = self.headers[i].wire_len() as i64 + inner.len() as i64 + bias;
                        self.headers[i].set_uint_masked(name, len.max(0) as u64);
                    },
                    CalcRule::PayloadLength { bias } => {
                        let len = inner.len() as i64 + bias;
                        self.headers[i].set_uint_masked(name, len.max(0) as u64);
                    },
                    CalcRule::ElementCount { array } => {
                        let count = match self.headers[i].get(array) {
                            Ok(FieldValue::Array(items)) => items.len() as u64,
                            _ => continue,
                        };
                        self.headers[i].set_uint_masked(name, count);
                    },
                    CalcRule::Checksum(_) => {},
                }
            }

            for &(name, rule) in &rules {
                if let CalcRule::Checksum(kind) = rule {
                    self.headers[i].set_uint_masked(name, 0);
                    let checksum = match kind {
                        ChecksumKind::HeaderInternet => {
                            let mut sum = 0u32;
                            internet_sum(&self.headers[i].to_bytes_no_body(), &mut sum);
                            fold(sum)
                        },
                        ChecksumKind::PseudoHeaderInternet { protocol } => {
                            let own = self.headers[i].to_bytes();
                            let data_len = own.len() + inner.len();
                            let mut sum =
                                pseudo_header_sum(&self.headers[..i], protocol, data_len);
                            internet_sum(&own, &mut sum);
                            internet_sum(&inner, &mut sum);
                            match fold(sum) {
                                0 => 0xFFFF,
                                c => c,
                            }
                        },
                    };
                    self.headers[i].set_uint_masked(name, checksum as u64);
                }
            }

            let mut image = self.headers[i].to_bytes();
            image.extend_from_slice(&inner);
            inner = image;
        }
    }

    /// Serialized byte image: calculable fields are reconciled, then the
    /// headers' images are concatenated, outermost first.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        self.recalc();
        let mut out = Vec::new();
        for header in &self.headers {
            out.extend_from_slice(&header.to_bytes());
        }
        out
    }

    fn lookup(&self, kind: &str) -> Result<HeaderId> {
        self.registry
            .lookup(kind)
            .ok_or_else(|| Error::InvalidValue(format!("unknown header kind {kind}")))
    }
}

/// Accumulates 16-bit big-endian words of `data` into `sum`, padding a
/// trailing odd byte with zero.
fn internet_sum(data: &[u8], sum: &mut u32) {
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        *sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    if let [last] = chunks.remainder() {
        *sum = sum.wrapping_add((*last as u32) << 8);
    }
}

/// Folds the carries and complements, yielding the final checksum.
fn fold(mut sum: u32) -> u16 {
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Pseudo-header contribution of the nearest lower header carrying
/// `src`/`dst` addresses. Zero when there is none.
fn pseudo_header_sum(lower: &[Header<'_>], protocol: u8, data_len: usize) -> u32 {
    for header in lower.iter().rev() {
        let pair = (header.get("src").ok(), header.get("dst").ok());
        match pair {
            (Some(FieldValue::Ipv4(src)), Some(FieldValue::Ipv4(dst))) => {
                let mut sum = 0u32;
                internet_sum(&src.octets(), &mut sum);
                internet_sum(&dst.octets(), &mut sum);
                sum = sum.wrapping_add(protocol as u32);
                sum = sum.wrapping_add(data_len as u32 & 0xFFFF);
                return sum;
            },
            (Some(FieldValue::Ipv6(src)), Some(FieldValue::Ipv6(dst))) => {
                let mut sum = 0u32;
                internet_sum(&src.octets(), &mut sum);
                internet_sum(&dst.octets(), &mut sum);
                sum = sum.wrapping_add((data_len as u32) >> 16);
                sum = sum.wrapping_add(data_len as u32 & 0xFFFF);
                sum = sum.wrapping_add(protocol as u32);
                return sum;
            },
            _ => continue,
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_all_zeros_is_all_ones() {
        let mut sum = 0;
        internet_sum(&[0, 0, 0, 0], &mut sum);
        assert_eq!(fold(sum), 0xFFFF);
    }

    #[test]
    fn odd_trailing_byte_is_high_padded() {
        let mut even = 0;
        internet_sum(&[0x12, 0x34, 0xAB, 0x00], &mut even);
        let mut odd = 0;
        internet_sum(&[0x12, 0x34, 0xAB], &mut odd);
        assert_eq!(fold(even), fold(odd));
    }

    #[test]
    fn fold_wraps_carries() {
        // 0xFFFF + 0x0001 -> carry folds back in
        assert_eq!(fold(0x1_0000), !(0x0001u16));
    }
}
