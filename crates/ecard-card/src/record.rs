//! Identity record mapping and field normalization

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ecard_common::{decode_oid, decode_primitive, iter_tlvs, oids, read_tlv, tags, DecodedValue};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Identity data decoded from the base-data file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRecord {
    svnr: Option<String>,
    given_name: Option<String>,
    surname: Option<String>,
    birthdate_iso: Option<String>,
    gender_raw: Option<DecodedValue>,
    raw_oids: BTreeMap<String, DecodedValue>,
}

impl IdentityRecord {
    /// Unformatted 10-digit insurance number, if one was found
    pub fn svnr(&self) -> Option<&str> {
        self.svnr.as_deref()
    }

    pub fn given_name(&self) -> Option<&str> {
        self.given_name.as_deref()
    }

    pub fn surname(&self) -> Option<&str> {
        self.surname.as_deref()
    }

    /// Birthdate as `YYYY-MM-DD`
    pub fn birthdate_iso(&self) -> Option<&str> {
        self.birthdate_iso.as_deref()
    }

    pub fn gender_raw(&self) -> Option<&DecodedValue> {
        self.gender_raw.as_ref()
    }

    /// Canonical sex: "Male", "Female" or ""
    pub fn sex(&self) -> &'static str {
        self.gender_raw
            .as_ref()
            .map_or("", |value| normalize_sex(&value.as_text()))
    }

    /// Every OID seen on the card with its decoded value
    pub fn raw_oids(&self) -> &BTreeMap<String, DecodedValue> {
        &self.raw_oids
    }

    /// Project to the five public string fields
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            lastname: self.surname.clone().unwrap_or_default(),
            firstname: self.given_name.clone().unwrap_or_default(),
            birthday: self.birthdate_iso.clone().unwrap_or_default(),
            insurance: self.svnr.as_deref().map(format_svnr).unwrap_or_default(),
            sex: self.sex().to_string(),
        }
    }

    fn insert(&mut self, oid: String, value: DecodedValue) {
        let text = value.as_text();

        if self.svnr.is_none() {
            self.svnr = find_svnr(&text).map(str::to_string);
        }

        match oid.as_str() {
            oids::GIVEN_NAME => self.given_name = Some(text.trim().to_string()),
            oids::SURNAME => self.surname = Some(text.trim().to_string()),
            oids::DATE_OF_BIRTH => {
                self.birthdate_iso = normalize_birthdate(&text);
                if self.birthdate_iso.is_none() {
                    warn!(value = %text, "Unrecognised birthdate, leaving empty");
                }
            }
            oids::GENDER => self.gender_raw = Some(value.clone()),
            _ => {}
        }

        debug!(oid = %oid, kind = value.type_name(), "Record entry");
        self.raw_oids.insert(oid, value);
    }
}

/// The identity fields handed to callers; empty means unknown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicIdentity {
    pub lastname: String,
    pub firstname: String,
    /// `YYYY-MM-DD`
    pub birthday: String,
    /// `NNNN/NNNNNN`
    pub insurance: String,
    /// "Male", "Female" or ""
    pub sex: String,
}

impl PublicIdentity {
    /// `(lastname, firstname, birthday, insurance, sex)`
    pub fn into_tuple(self) -> (String, String, String, String, String) {
        (
            self.lastname,
            self.firstname,
            self.birthday,
            self.insurance,
            self.sex,
        )
    }
}

/// Decode the base-data file.
///
/// The outer element must be a SEQUENCE of `SEQUENCE { OID, SET { value } }`
/// entries. Entries of any other shape are skipped.
pub fn parse_record(data: &[u8]) -> Result<IdentityRecord> {
    let outer = read_tlv(data, 0)?;
    if outer.tag != tags::SEQUENCE {
        return Err(Error::Structure("outer element is not a SEQUENCE"));
    }

    let mut record = IdentityRecord::default();

    for element in iter_tlvs(outer.value) {
        let element = match element {
            Ok(element) => element,
            Err(e) => {
                warn!(error = %e, "Malformed record entry, ignoring the rest");
                break;
            }
        };

        match parse_entry(element.tag, element.value) {
            Some((oid, value)) => record.insert(oid, value),
            None => debug!(tag = element.tag, "Skipping non-conforming entry"),
        }
    }

    Ok(record)
}

fn parse_entry(tag: u8, body: &[u8]) -> Option<(String, DecodedValue)> {
    if tag != tags::SEQUENCE {
        return None;
    }

    let oid = read_tlv(body, 0).ok()?;
    if oid.tag != tags::OBJECT_IDENTIFIER {
        return None;
    }

    let set = read_tlv(body, oid.next_offset).ok()?;
    if set.tag != tags::SET {
        return None;
    }

    let inner = read_tlv(set.value, 0).ok()?;
    Some((decode_oid(oid.value), decode_primitive(inner.tag, inner.value)))
}

/// Find the first standalone run of exactly ten digits
pub fn find_svnr(text: &str) -> Option<&str> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|run| run.len() == 10)
}

/// Render a 10-digit insurance number as `NNNN/NNNNNN`
pub fn format_svnr(svnr: &str) -> String {
    if svnr.len() == 10 && svnr.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/{}", &svnr[..4], &svnr[4..])
    } else {
        svnr.to_string()
    }
}

/// Normalize a birthdate to `YYYY-MM-DD`.
///
/// Accepts a `YYYYMMDD` prefix (GeneralizedTime), an ISO date, or
/// `DD.MM.YYYY` with optional spaces.
pub fn normalize_birthdate(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let b = raw.as_bytes();
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);

    if b.len() >= 8 && digits(0..8) {
        return Some(format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8]));
    }

    if b.len() == 10 && b[4] == b'-' && b[7] == b'-' && digits(0..4) && digits(5..7) && digits(8..10)
    {
        return Some(raw.to_string());
    }

    let compact: String = raw.chars().filter(|c| *c != ' ').collect();
    let c = compact.as_bytes();
    if c.len() == 10
        && c[2] == b'.'
        && c[5] == b'.'
        && c[..2].iter().chain(&c[3..5]).chain(&c[6..]).all(u8::is_ascii_digit)
    {
        return Some(format!("{}-{}-{}", &compact[6..], &compact[3..5], &compact[..2]));
    }

    None
}

/// Canonicalize a sex/gender code to "Male", "Female" or "".
///
/// Understands ISO/IEC 5218 digits, single letters and English or German
/// words. Anything else maps to "".
pub fn normalize_sex(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "1" | "m" | "male" | "man" | "mann" | "männlich" | "maennlich" => "Male",
        "2" | "f" | "w" | "female" | "woman" | "frau" | "weiblich" => "Female",
        // 0, 9, X, D, U, diverse and unrecognized values
        _ => "",
    }
}
