//! Primitive field types.
//!
//! Every header field is backed by one of the [`FieldKind`] primitives. A
//! kind knows how to read itself from a byte buffer, write itself back, and
//! report its wire size; the values themselves are held in the untyped
//! [`FieldValue`] union so that header schemas can drive parse and
//! serialization loops generically.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::common::Endianness;
use crate::errors::{Error, Result};

/// Width of a fixed-size integer field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntWidth {
    /// 8-bit
    W8,
    /// 16-bit
    W16,
    /// 24-bit
    W24,
    /// 32-bit
    W32,
    /// 64-bit
    W64,
}

impl IntWidth {
    /// Number of octets of an integer of this width.
    pub fn octets(self) -> usize {
        match self {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W24 => 3,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }

    /// Number of bits of an integer of this width.
    pub fn bits(self) -> u32 {
        self.octets() as u32 * 8
    }

    /// Largest unsigned value representable at this width.
    pub fn max_unsigned(self) -> u64 {
        match self {
            IntWidth::W64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }
}

/// Bidirectional name <-> value map of an enumerated integer field.
#[derive(Copy, Clone, Debug)]
pub struct EnumMap {
    variants: &'static [(&'static str, u64)],
}

impl EnumMap {
    /// Creates a map over a static variant table.
    pub const fn new(variants: &'static [(&'static str, u64)]) -> Self {
        EnumMap { variants }
    }

    /// Value of a variant name.
    pub fn value(&self, name: &str) -> Option<u64> {
        self.variants.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Name of a value, if it is a known variant.
    pub fn name(&self, value: u64) -> Option<&'static str> {
        self.variants.iter().find(|(_, v)| *v == value).map(|(n, _)| *n)
    }
}

/// An Ethernet MAC address.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::InvalidValue(format!("bad MAC address: {s}")))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidValue(format!("bad MAC address: {s}")))?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidValue(format!("bad MAC address: {s}")));
        }
        Ok(MacAddr(bytes))
    }
}

/// Type of a header field.
///
/// Variable-length kinds (`PrefixedString`, `Array`, bounded `Body`) take
/// their length or element count from the field's builder, evaluated against
/// the fields already read.
#[derive(Clone, Debug)]
pub enum FieldKind {
    /// Fixed-width unsigned integer. `endian: None` inherits the header's.
    UInt {
        /// Integer width
        width: IntWidth,
        /// Explicit endianness, if any
        endian: Option<Endianness>,
    },
    /// Fixed-width signed integer.
    Int {
        /// Integer width
        width: IntWidth,
        /// Explicit endianness, if any
        endian: Option<Endianness>,
    },
    /// Unsigned integer with a name <-> value map.
    Enum {
        /// Integer width
        width: IntWidth,
        /// Explicit endianness, if any
        endian: Option<Endianness>,
        /// Variant map
        map: EnumMap,
    },
    /// Fixed-size byte string.
    Bytes {
        /// Wire size in octets
        len: usize,
    },
    /// Null-terminated string. Reading consumes up to and including the
    /// first zero byte; writing appends a trailing zero.
    CString,
    /// String whose byte length is supplied by the builder.
    PrefixedString,
    /// IPv4 address (4 octets).
    Ipv4,
    /// IPv6 address (16 octets).
    Ipv6,
    /// Ethernet MAC address (6 octets).
    Mac,
    /// `N` elements of an inner kind, `N` supplied by the builder.
    Array {
        /// Element kind
        elem: Box<FieldKind>,
    },
    /// Opaque trailing bytes: the rest of the buffer, or the builder-supplied
    /// byte count.
    Body,
}

impl FieldKind {
    /// Unsigned integer with no explicit endianness.
    pub fn uint(width: IntWidth) -> Self {
        FieldKind::UInt { width, endian: None }
    }

    /// 8-bit unsigned integer.
    pub fn u8() -> Self {
        Self::uint(IntWidth::W8)
    }

    /// 16-bit unsigned integer.
    pub fn u16() -> Self {
        Self::uint(IntWidth::W16)
    }

    /// 32-bit unsigned integer.
    pub fn u32() -> Self {
        Self::uint(IntWidth::W32)
    }

    /// 64-bit unsigned integer.
    pub fn u64() -> Self {
        Self::uint(IntWidth::W64)
    }

    /// Enumerated integer with no explicit endianness.
    pub fn enumerated(width: IntWidth, map: EnumMap) -> Self {
        FieldKind::Enum { width, endian: None, map }
    }

    /// Endianness of this kind, falling back to the header's.
    pub fn endian_or(&self, fallback: Endianness) -> Endianness {
        match self {
            FieldKind::UInt { endian, .. }
            | FieldKind::Int { endian, .. }
            | FieldKind::Enum { endian, .. } => endian.unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// Default value of this kind.
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldKind::UInt { .. } | FieldKind::Enum { .. } => FieldValue::UInt(0),
            FieldKind::Int { .. } => FieldValue::Int(0),
            FieldKind::Bytes { len } => FieldValue::Bytes(vec![0; *len]),
            FieldKind::CString | FieldKind::PrefixedString => FieldValue::Str(String::new()),
            FieldKind::Ipv4 => FieldValue::Ipv4(Ipv4Addr::UNSPECIFIED),
            FieldKind::Ipv6 => FieldValue::Ipv6(Ipv6Addr::UNSPECIFIED),
            FieldKind::Mac => FieldValue::Mac(MacAddr::default()),
            FieldKind::Array { .. } => FieldValue::Array(vec![]),
            FieldKind::Body => FieldValue::Bytes(vec![]),
        }
    }

    /// Wire size of `value` under this kind.
    pub fn size(&self, value: &FieldValue) -> usize {
        match (self, value) {
            (FieldKind::UInt { width, .. }, _)
            | (FieldKind::Int { width, .. }, _)
            | (FieldKind::Enum { width, .. }, _) => width.octets(),
            (FieldKind::Bytes { len }, _) => *len,
            (FieldKind::CString, FieldValue::Str(s)) => s.len() + 1,
            (FieldKind::PrefixedString, FieldValue::Str(s)) => s.len(),
            (FieldKind::Ipv4, _) => 4,
            (FieldKind::Ipv6, _) => 16,
            (FieldKind::Mac, _) => 6,
            (FieldKind::Array { elem }, FieldValue::Array(items)) => {
                items.iter().map(|item| elem.size(item)).sum()
            },
            (FieldKind::Body, FieldValue::Bytes(b)) => b.len(),
            _ => 0,
        }
    }

    /// Reads a value of this kind at `cursor`, returning it with the new
    /// cursor position.
    ///
    /// `len_param` carries the builder-computed length (octets for strings
    /// and bodies, element count for arrays).
    pub fn read(
        &self,
        bytes: &[u8],
        cursor: usize,
        endian: Endianness,
        len_param: Option<usize>,
    ) -> Result<(FieldValue, usize)> {
        match self {
            FieldKind::UInt { width, .. } | FieldKind::Enum { width, .. } => {
                let buf = take(bytes, cursor, width.octets())?;
                Ok((FieldValue::UInt(read_uint(buf, endian)), cursor + width.octets()))
            },
            FieldKind::Int { width, .. } => {
                let buf = take(bytes, cursor, width.octets())?;
                Ok((FieldValue::Int(read_int(buf, endian)), cursor + width.octets()))
            },
            FieldKind::Bytes { len } => {
                let buf = take(bytes, cursor, *len)?;
                Ok((FieldValue::Bytes(buf.to_vec()), cursor + len))
            },
            FieldKind::CString => {
                let rest = bytes.get(cursor..).ok_or(Error::Truncated)?;
                let nul = rest.iter().position(|&b| b == 0).ok_or(Error::Truncated)?;
                let s = std::str::from_utf8(&rest[..nul])?;
                Ok((FieldValue::Str(s.to_owned()), cursor + nul + 1))
            },
            FieldKind::PrefixedString => {
                let len = builder_len(len_param)?;
                let buf = take(bytes, cursor, len)?;
                let s = std::str::from_utf8(buf)?;
                Ok((FieldValue::Str(s.to_owned()), cursor + len))
            },
            FieldKind::Ipv4 => {
                let buf = take(bytes, cursor, 4)?;
                let octets: [u8; 4] = buf.try_into().unwrap();
                Ok((FieldValue::Ipv4(Ipv4Addr::from(octets)), cursor + 4))
            },
            FieldKind::Ipv6 => {
                let buf = take(bytes, cursor, 16)?;
                let octets: [u8; 16] = buf.try_into().unwrap();
                Ok((FieldValue::Ipv6(Ipv6Addr::from(octets)), cursor + 16))
            },
            FieldKind::Mac => {
                let buf = take(bytes, cursor, 6)?;
                let octets: [u8; 6] = buf.try_into().unwrap();
                Ok((FieldValue::Mac(MacAddr(octets)), cursor + 6))
            },
            FieldKind::Array { elem } => {
                let count = builder_len(len_param)?;
                let mut items = Vec::with_capacity(count);
                let mut cursor = cursor;
                for _ in 0..count {
                    let (item, next) = elem.read(bytes, cursor, endian, None)?;
                    items.push(item);
                    cursor = next;
                }
                Ok((FieldValue::Array(items), cursor))
            },
            FieldKind::Body => {
                let rest = bytes.get(cursor..).ok_or(Error::Truncated)?;
                let len = match len_param {
                    Some(len) if len <= rest.len() => len,
                    Some(_) => return Err(Error::Truncated),
                    None => rest.len(),
                };
                Ok((FieldValue::Bytes(rest[..len].to_vec()), cursor + len))
            },
        }
    }

    /// Appends the wire form of `value` to `out`.
    pub fn write(&self, value: &FieldValue, endian: Endianness, out: &mut Vec<u8>) {
        match (self, value) {
            (FieldKind::UInt { width, .. }, FieldValue::UInt(v))
            | (FieldKind::Enum { width, .. }, FieldValue::UInt(v)) => {
                write_uint(*v & width.max_unsigned(), *width, endian, out);
            },
            (FieldKind::Int { width, .. }, FieldValue::Int(v)) => {
                write_uint(*v as u64 & width.max_unsigned(), *width, endian, out);
            },
            (FieldKind::Bytes { len }, FieldValue::Bytes(b)) => {
                out.extend_from_slice(b);
                if b.len() < *len {
                    out.resize(out.len() + len - b.len(), 0);
                }
            },
            (FieldKind::CString, FieldValue::Str(s)) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            },
            (FieldKind::PrefixedString, FieldValue::Str(s)) => out.extend_from_slice(s.as_bytes()),
            (FieldKind::Ipv4, FieldValue::Ipv4(addr)) => out.extend_from_slice(&addr.octets()),
            (FieldKind::Ipv6, FieldValue::Ipv6(addr)) => out.extend_from_slice(&addr.octets()),
            (FieldKind::Mac, FieldValue::Mac(mac)) => out.extend_from_slice(&mac.0),
            (FieldKind::Array { elem }, FieldValue::Array(items)) => {
                for item in items {
                    elem.write(item, endian, out);
                }
            },
            (FieldKind::Body, FieldValue::Bytes(b)) => out.extend_from_slice(b),
            _ => {},
        }
    }

    /// Coerces a user-supplied value into a [`FieldValue`] of this kind.
    ///
    /// Accepts the small union of input forms the kind understands: integers
    /// in range, enum variant names, address strings, raw bytes. Anything
    /// else fails `InvalidValue`.
    pub fn coerce(&self, name: &str, input: SetVal<'_>) -> Result<FieldValue> {
        match (self, input) {
            (FieldKind::UInt { width, .. }, SetVal::U64(v)) => {
                if v > width.max_unsigned() {
                    return Err(Error::InvalidValue(format!("{name}: {v} does not fit {} bits", width.bits())));
                }
                Ok(FieldValue::UInt(v))
            },
            (FieldKind::Int { width, .. }, SetVal::I64(v)) => {
                let bits = width.bits();
                if bits < 64 && (v >= 1 << (bits - 1) || v < -(1 << (bits - 1))) {
                    return Err(Error::InvalidValue(format!("{name}: {v} does not fit {bits} bits")));
                }
                Ok(FieldValue::Int(v))
            },
            (FieldKind::Int { .. }, SetVal::U64(v)) => {
                self.coerce(name, SetVal::I64(i64::try_from(v).map_err(|_| {
                    Error::InvalidValue(format!("{name}: {v} does not fit a signed field"))
                })?))
            },
            (FieldKind::Enum { width, .. }, SetVal::U64(v)) => {
                if v > width.max_unsigned() {
                    return Err(Error::InvalidValue(format!("{name}: {v} does not fit {} bits", width.bits())));
                }
                Ok(FieldValue::UInt(v))
            },
            (FieldKind::Enum { map, .. }, SetVal::Str(s)) => match map.value(s) {
                Some(v) => Ok(FieldValue::UInt(v)),
                None => Err(Error::InvalidValue(format!("{name}: unknown variant {s:?}"))),
            },
            (FieldKind::Bytes { len }, SetVal::Bytes(b)) => {
                if b.len() != *len {
                    return Err(Error::InvalidValue(format!("{name}: expected {len} bytes, got {}", b.len())));
                }
                Ok(FieldValue::Bytes(b.to_vec()))
            },
            (FieldKind::CString, SetVal::Str(s)) => {
                if s.as_bytes().contains(&0) {
                    return Err(Error::InvalidValue(format!("{name}: embedded NUL byte")));
                }
                Ok(FieldValue::Str(s.to_owned()))
            },
            (FieldKind::PrefixedString, SetVal::Str(s)) => Ok(FieldValue::Str(s.to_owned())),
            (FieldKind::Ipv4, SetVal::Ipv4(addr)) => Ok(FieldValue::Ipv4(addr)),
            (FieldKind::Ipv4, SetVal::Str(s)) => s
                .parse()
                .map(FieldValue::Ipv4)
                .map_err(|_| Error::InvalidValue(format!("{name}: bad IPv4 address {s:?}"))),
            (FieldKind::Ipv6, SetVal::Ipv6(addr)) => Ok(FieldValue::Ipv6(addr)),
            (FieldKind::Ipv6, SetVal::Str(s)) => s
                .parse()
                .map(FieldValue::Ipv6)
                .map_err(|_| Error::InvalidValue(format!("{name}: bad IPv6 address {s:?}"))),
            (FieldKind::Mac, SetVal::Mac(mac)) => Ok(FieldValue::Mac(mac)),
            (FieldKind::Mac, SetVal::Str(s)) => s.parse().map(FieldValue::Mac),
            (FieldKind::Body, SetVal::Bytes(b)) => Ok(FieldValue::Bytes(b.to_vec())),
            (_, input) => Err(Error::InvalidValue(format!("{name}: unsupported input {input:?}"))),
        }
    }
}

/// Value held by a header field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    /// Unsigned integer (also enumerated integers)
    UInt(u64),
    /// Signed integer
    Int(i64),
    /// Raw bytes (fixed byte strings and bodies)
    Bytes(Vec<u8>),
    /// UTF-8 string
    Str(String),
    /// IPv4 address
    Ipv4(Ipv4Addr),
    /// IPv6 address
    Ipv6(Ipv6Addr),
    /// MAC address
    Mac(MacAddr),
    /// Array elements
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// The value as an unsigned integer, if it is one.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(v) => Some(*v),
            FieldValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// The value as raw bytes, if it is a byte string or body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Assignable input forms accepted by [`crate::header::Header::set`].
#[derive(Clone, Copy, Debug)]
pub enum SetVal<'v> {
    /// Unsigned integer
    U64(u64),
    /// Signed integer
    I64(i64),
    /// Human-readable string: enum variant name, address notation, text
    Str(&'v str),
    /// Raw bytes
    Bytes(&'v [u8]),
    /// IPv4 address
    Ipv4(Ipv4Addr),
    /// IPv6 address
    Ipv6(Ipv6Addr),
    /// MAC address
    Mac(MacAddr),
}

macro_rules! setval_from_uint {
    ($($ty:ty),*) => {
        $(impl From<$ty> for SetVal<'static> {
            fn from(v: $ty) -> Self {
                SetVal::U64(v as u64)
            }
        })*
    };
}

setval_from_uint!(u8, u16, u32, u64);

impl From<i64> for SetVal<'static> {
    fn from(v: i64) -> Self {
        SetVal::I64(v)
    }
}

impl<'v> From<&'v str> for SetVal<'v> {
    fn from(v: &'v str) -> Self {
        SetVal::Str(v)
    }
}

impl<'v> From<&'v [u8]> for SetVal<'v> {
    fn from(v: &'v [u8]) -> Self {
        SetVal::Bytes(v)
    }
}

impl From<Ipv4Addr> for SetVal<'static> {
    fn from(v: Ipv4Addr) -> Self {
        SetVal::Ipv4(v)
    }
}

impl From<Ipv6Addr> for SetVal<'static> {
    fn from(v: Ipv6Addr) -> Self {
        SetVal::Ipv6(v)
    }
}

impl From<MacAddr> for SetVal<'static> {
    fn from(v: MacAddr) -> Self {
        SetVal::Mac(v)
    }
}

fn take(bytes: &[u8], cursor: usize, len: usize) -> Result<&[u8]> {
    let end = cursor.checked_add(len).ok_or(Error::Truncated)?;
    bytes.get(cursor..end).ok_or(Error::Truncated)
}

fn builder_len(len_param: Option<usize>) -> Result<usize> {
    len_param.ok_or_else(|| Error::InvalidValue("variable-length field without a builder".into()))
}

fn read_uint(buf: &[u8], endian: Endianness) -> u64 {
    match endian {
        Endianness::Big => BigEndian::read_uint(buf, buf.len()),
        Endianness::Little => LittleEndian::read_uint(buf, buf.len()),
    }
}

fn read_int(buf: &[u8], endian: Endianness) -> i64 {
    match endian {
        Endianness::Big => BigEndian::read_int(buf, buf.len()),
        Endianness::Little => LittleEndian::read_int(buf, buf.len()),
    }
}

fn write_uint(v: u64, width: IntWidth, endian: Endianness, out: &mut Vec<u8>) {
    let mut buf = [0u8; 8];
    let n = width.octets();
    match endian {
        Endianness::Big => BigEndian::write_uint(&mut buf[..n], v, n),
        Endianness::Little => LittleEndian::write_uint(&mut buf[..n], v, n),
    }
    out.extend_from_slice(&buf[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_endianness() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let kind = FieldKind::u16();

        let (v, next) = kind.read(&bytes, 0, Endianness::Big, None).unwrap();
        assert_eq!(v, FieldValue::UInt(0x1234));
        assert_eq!(next, 2);

        let (v, _) = kind.read(&bytes, 0, Endianness::Little, None).unwrap();
        assert_eq!(v, FieldValue::UInt(0x3412));

        let mut out = vec![];
        kind.write(&FieldValue::UInt(0x1234), Endianness::Big, &mut out);
        assert_eq!(out, [0x12, 0x34]);
    }

    #[test]
    fn u24_round_trip() {
        let kind = FieldKind::uint(IntWidth::W24);
        let mut out = vec![];
        kind.write(&FieldValue::UInt(0xABCDEF), Endianness::Big, &mut out);
        assert_eq!(out, [0xAB, 0xCD, 0xEF]);

        let (v, next) = kind.read(&out, 0, Endianness::Big, None).unwrap();
        assert_eq!(v, FieldValue::UInt(0xABCDEF));
        assert_eq!(next, 3);
    }

    #[test]
    fn signed_int_round_trip() {
        let kind = FieldKind::Int { width: IntWidth::W16, endian: None };
        let mut out = vec![];
        kind.write(&FieldValue::Int(-2), Endianness::Big, &mut out);
        assert_eq!(out, [0xFF, 0xFE]);

        let (v, _) = kind.read(&out, 0, Endianness::Big, None).unwrap();
        assert_eq!(v, FieldValue::Int(-2));

        assert!(kind.coerce("delta", SetVal::I64(40_000)).is_err());
        assert_eq!(kind.coerce("delta", SetVal::I64(-40)).unwrap(), FieldValue::Int(-40));
    }

    #[test]
    fn truncated_read() {
        let kind = FieldKind::u32();
        assert!(matches!(kind.read(&[1, 2], 0, Endianness::Big, None), Err(Error::Truncated)));
    }

    #[test]
    fn cstring_reads_to_nul() {
        let bytes = b"octet\0tail";
        let (v, next) = FieldKind::CString.read(bytes, 0, Endianness::Big, None).unwrap();
        assert_eq!(v, FieldValue::Str("octet".into()));
        assert_eq!(next, 6);

        // missing terminator
        assert!(matches!(
            FieldKind::CString.read(b"oops", 0, Endianness::Big, None),
            Err(Error::Truncated)
        ));
    }

    #[test]
    fn cstring_rejects_embedded_nul() {
        let err = FieldKind::CString.coerce("mode", SetVal::Str("oc\0tet")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn enum_accepts_names() {
        static MAP: EnumMap = EnumMap::new(&[("rrq", 1), ("ack", 4)]);
        let kind = FieldKind::enumerated(IntWidth::W16, MAP);

        assert_eq!(kind.coerce("opcode", SetVal::Str("ack")).unwrap(), FieldValue::UInt(4));
        assert!(kind.coerce("opcode", SetVal::Str("nak")).is_err());
        assert_eq!(MAP.name(1), Some("rrq"));
        assert_eq!(MAP.name(9), None);
    }

    #[test]
    fn mac_from_string() {
        let mac: MacAddr = "00:11:22:aa:bb:cc".parse().unwrap();
        assert_eq!(mac.0, [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
        assert!("00:11:22:aa:bb".parse::<MacAddr>().is_err());
        assert!("00:11:22:aa:bb:cc:dd".parse::<MacAddr>().is_err());
    }

    #[test]
    fn uint_range_checked_on_assignment() {
        let kind = FieldKind::u8();
        assert!(kind.coerce("ttl", SetVal::U64(256)).is_err());
        assert_eq!(kind.coerce("ttl", SetVal::U64(255)).unwrap(), FieldValue::UInt(255));
    }

    #[test]
    fn array_reads_counted_elements() {
        let kind = FieldKind::Array { elem: Box::new(FieldKind::u16()) };
        let bytes = [0x00, 0x01, 0x00, 0x02, 0xFF];
        let (v, next) = kind.read(&bytes, 0, Endianness::Big, Some(2)).unwrap();
        assert_eq!(v, FieldValue::Array(vec![FieldValue::UInt(1), FieldValue::UInt(2)]));
        assert_eq!(next, 4);

        assert!(matches!(kind.read(&bytes, 0, Endianness::Big, Some(3)), Err(Error::Truncated)));
    }

    #[test]
    fn body_takes_rest_or_bound() {
        let bytes = [1, 2, 3, 4];
        let (v, next) = FieldKind::Body.read(&bytes, 1, Endianness::Big, None).unwrap();
        assert_eq!(v, FieldValue::Bytes(vec![2, 3, 4]));
        assert_eq!(next, 4);

        let (v, _) = FieldKind::Body.read(&bytes, 1, Endianness::Big, Some(2)).unwrap();
        assert_eq!(v, FieldValue::Bytes(vec![2, 3]));
    }
}
