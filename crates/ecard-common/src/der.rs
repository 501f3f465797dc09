//! DER/BER tag-length-value decoding
//!
//! Every function here is pure: it takes an immutable buffer and a cursor
//! and hands back a new cursor, so the parser can be exercised without any
//! card hardware.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::tags;

/// Longest long-form length field accepted, in octets.
pub const MAX_LENGTH_OCTETS: usize = 4;

/// Errors raised while walking a DER/BER buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended before the element at `offset` was complete
    #[error("truncated TLV at offset {offset}")]
    Truncated { offset: usize },

    /// A long-form length used more octets than we support
    #[error("length field uses {octets} octets (at most 4 supported)")]
    LengthTooLong { octets: usize },

    /// Indefinite-form length (0x80), not valid in DER
    #[error("indefinite length at offset {offset}")]
    IndefiniteLength { offset: usize },
}

/// A single decoded tag-length-value element borrowing from its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvNode<'a> {
    /// Single-octet tag
    pub tag: u8,
    /// Declared value length
    pub length: usize,
    /// Value bytes
    pub value: &'a [u8],
    /// Cursor just past this element
    pub next_offset: usize,
}

/// Read a DER/BER length field starting at `pos`.
///
/// Returns the decoded length and the cursor just past the length octets.
pub fn read_length(buf: &[u8], pos: usize) -> Result<(usize, usize), DecodeError> {
    let first = *buf.get(pos).ok_or(DecodeError::Truncated { offset: pos })?;

    if first & 0x80 == 0 {
        return Ok((first as usize, pos + 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets == 0 {
        return Err(DecodeError::IndefiniteLength { offset: pos });
    }
    if octets > MAX_LENGTH_OCTETS {
        return Err(DecodeError::LengthTooLong { octets });
    }

    let start = pos + 1;
    let bytes = buf
        .get(start..start + octets)
        .ok_or(DecodeError::Truncated { offset: pos })?;

    let length = bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    Ok((length, start + octets))
}

/// Read one TLV element starting at `pos`.
pub fn read_tlv(buf: &[u8], pos: usize) -> Result<TlvNode<'_>, DecodeError> {
    let tag = *buf.get(pos).ok_or(DecodeError::Truncated { offset: pos })?;
    let (length, value_start) = read_length(buf, pos + 1)?;

    let end = value_start
        .checked_add(length)
        .ok_or(DecodeError::Truncated { offset: pos })?;
    let value = buf
        .get(value_start..end)
        .ok_or(DecodeError::Truncated { offset: pos })?;

    Ok(TlvNode {
        tag,
        length,
        value,
        next_offset: end,
    })
}

/// Iterate over consecutive TLV elements in `buf`.
///
/// Iteration ends at the end of the buffer or at the first malformed
/// element; the error is yielded once and then the iterator is exhausted.
pub fn iter_tlvs(buf: &[u8]) -> TlvIter<'_> {
    TlvIter { buf, pos: 0 }
}

/// Iterator returned by [`iter_tlvs`]
pub struct TlvIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<TlvNode<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }

        match read_tlv(self.buf, self.pos) {
            Ok(node) => {
                self.pos = node.next_offset;
                Some(Ok(node))
            }
            Err(e) => {
                self.pos = self.buf.len();
                Some(Err(e))
            }
        }
    }
}

/// One OID arc of any width, as little-endian base 10^9 limbs
#[derive(Debug, Default)]
struct OidArc(Vec<u32>);

const LIMB_BASE: u64 = 1_000_000_000;

impl OidArc {
    /// Shift in one base-128 group
    fn push_group(&mut self, group: u8) {
        let mut carry = u64::from(group);
        for limb in &mut self.0 {
            let v = u64::from(*limb) * 128 + carry;
            *limb = (v % LIMB_BASE) as u32;
            carry = v / LIMB_BASE;
        }
        if carry > 0 {
            self.0.push(carry as u32);
        }
    }

    /// The value if it fits in a single limb
    fn small(&self) -> Option<u32> {
        match self.0.as_slice() {
            [] => Some(0),
            [v] => Some(*v),
            _ => None,
        }
    }

    /// Subtract `n`; the caller guarantees `self >= n`
    fn sub_small(&mut self, n: u32) {
        let mut borrow = u64::from(n);
        for limb in &mut self.0 {
            if borrow == 0 {
                break;
            }
            let cur = u64::from(*limb);
            if cur >= borrow {
                *limb = (cur - borrow) as u32;
                borrow = 0;
            } else {
                *limb = (cur + LIMB_BASE - borrow) as u32;
                borrow = 1;
            }
        }
        while self.0.last() == Some(&0) {
            self.0.pop();
        }
    }
}

impl fmt::Display for OidArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut limbs = self.0.iter().rev();
        match limbs.next() {
            Some(top) => write!(f, "{}", top)?,
            None => return f.write_str("0"),
        }
        for limb in limbs {
            write!(f, "{:09}", limb)?;
        }
        Ok(())
    }
}

/// Decode the content octets of an OBJECT IDENTIFIER into dotted form.
///
/// The first subidentifier carries the first two arcs (X.690 §8.19.4).
/// Arcs are not bounded in width. A trailing group with its continuation
/// bit still set is dropped.
pub fn decode_oid(bytes: &[u8]) -> String {
    let mut arcs: Vec<String> = Vec::new();
    let mut acc = OidArc::default();

    for &b in bytes {
        acc.push_group(b & 0x7F);
        if b & 0x80 != 0 {
            continue;
        }

        let mut arc = std::mem::take(&mut acc);
        if arcs.is_empty() {
            match arc.small() {
                Some(v) if v < 80 => {
                    arcs.push((v / 40).to_string());
                    arcs.push((v % 40).to_string());
                }
                _ => {
                    arc.sub_small(80);
                    arcs.push("2".to_string());
                    arcs.push(arc.to_string());
                }
            }
        } else {
            arcs.push(arc.to_string());
        }
    }

    arcs.join(".")
}

/// A primitive value decoded according to its universal tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Utf8String(String),
    PrintableString(String),
    Ia5String(String),
    GeneralizedTime(String),
    Integer(u64),
    Bytes(Vec<u8>),
}

impl DecodedValue {
    /// Text view of the value.
    ///
    /// Byte strings are decoded permissively (invalid sequences replaced),
    /// integers are rendered in decimal.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            DecodedValue::Utf8String(s)
            | DecodedValue::PrintableString(s)
            | DecodedValue::Ia5String(s)
            | DecodedValue::GeneralizedTime(s) => Cow::Borrowed(s.as_str()),
            DecodedValue::Integer(i) => Cow::Owned(i.to_string()),
            DecodedValue::Bytes(b) => String::from_utf8_lossy(b),
        }
    }

    /// Short name of the variant, for dumps
    pub fn type_name(&self) -> &'static str {
        match self {
            DecodedValue::Utf8String(_) => "UTF8String",
            DecodedValue::PrintableString(_) => "PrintableString",
            DecodedValue::Ia5String(_) => "IA5String",
            DecodedValue::GeneralizedTime(_) => "GeneralizedTime",
            DecodedValue::Integer(_) => "INTEGER",
            DecodedValue::Bytes(_) => "OCTETS",
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            other => f.write_str(&other.as_text()),
        }
    }
}

/// Decode a primitive value by its tag. Unknown tags are kept as raw bytes.
pub fn decode_primitive(tag: u8, value: &[u8]) -> DecodedValue {
    match tag {
        tags::UTF8_STRING => DecodedValue::Utf8String(String::from_utf8_lossy(value).into_owned()),
        tags::PRINTABLE_STRING | tags::IA5_STRING | tags::GENERALIZED_TIME if value.is_ascii() => {
            // is_ascii() guarantees valid UTF-8
            let text = String::from_utf8_lossy(value).into_owned();
            match tag {
                tags::PRINTABLE_STRING => DecodedValue::PrintableString(text),
                tags::IA5_STRING => DecodedValue::Ia5String(text),
                _ => DecodedValue::GeneralizedTime(text),
            }
        }
        tags::INTEGER => decode_unsigned(value),
        _ => DecodedValue::Bytes(value.to_vec()),
    }
}

fn decode_unsigned(value: &[u8]) -> DecodedValue {
    let significant = match value.iter().position(|&b| b != 0) {
        Some(i) => &value[i..],
        None => &[][..],
    };

    if significant.len() > 8 {
        return DecodedValue::Bytes(value.to_vec());
    }

    let n = significant
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    DecodedValue::Integer(n)
}
