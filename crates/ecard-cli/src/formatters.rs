//! Field formatters for human-readable output

use clap::ValueEnum;
use ecard_card::PublicIdentity;
use ecard_common::DecodedValue;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw output: tab-separated fields, hex dumps
    Raw,
    /// Human-readable formatted output
    Human,
}

impl FormatMode {
    pub fn description(&self) -> &'static str {
        match self {
            FormatMode::Raw => "Raw",
            FormatMode::Human => "Human-Readable",
        }
    }
}

/// Format the public identity fields
pub fn format_identity(identity: &PublicIdentity, mode: FormatMode) -> String {
    match mode {
        FormatMode::Raw => [
            identity.lastname.as_str(),
            identity.firstname.as_str(),
            identity.birthday.as_str(),
            identity.insurance.as_str(),
            identity.sex.as_str(),
        ]
        .join("\t"),
        FormatMode::Human => {
            let field = |value: &str| -> String {
                if value.is_empty() {
                    "(unknown)".to_string()
                } else {
                    value.to_string()
                }
            };
            format!(
                "Last name:  {}\nFirst name: {}\nBirthday:   {}\nSVNR:       {}\nSex:        {}",
                field(&identity.lastname),
                field(&identity.firstname),
                field(&identity.birthday),
                field(&identity.insurance),
                field(&identity.sex),
            )
        }
    }
}

/// Format a decoded record value
pub fn format_value(value: &DecodedValue, mode: FormatMode) -> String {
    match (mode, value) {
        (FormatMode::Raw, DecodedValue::Bytes(bytes)) => hex::encode_upper(bytes),
        (FormatMode::Raw, other) => other.as_text().into_owned(),

        // Large binary fields
        (FormatMode::Human, DecodedValue::Bytes(bytes)) if bytes.len() > 32 => format!(
            "{} ... ({} bytes total)",
            hex::encode_upper(&bytes[..32]),
            bytes.len()
        ),
        (FormatMode::Human, DecodedValue::Bytes(bytes)) => hex::encode_upper(bytes),
        (FormatMode::Human, other) => format!("{} ({})", other.as_text(), other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PublicIdentity {
        PublicIdentity {
            lastname: "Mustermann".into(),
            firstname: "Max".into(),
            birthday: "1990-01-01".into(),
            insurance: String::new(),
            sex: "Male".into(),
        }
    }

    #[test]
    fn test_raw_identity_keeps_empty_fields() {
        assert_eq!(
            format_identity(&identity(), FormatMode::Raw),
            "Mustermann\tMax\t1990-01-01\t\tMale"
        );
    }

    #[test]
    fn test_human_identity_marks_unknown() {
        let text = format_identity(&identity(), FormatMode::Human);
        assert!(text.contains("SVNR:       (unknown)"));
        assert!(text.contains("Birthday:   1990-01-01"));
    }

    #[test]
    fn test_format_value() {
        let bytes = DecodedValue::Bytes(vec![0xAB; 40]);
        assert!(format_value(&bytes, FormatMode::Human).ends_with("(40 bytes total)"));
        assert_eq!(format_value(&bytes, FormatMode::Raw).len(), 80);
        assert_eq!(
            format_value(&DecodedValue::Integer(1), FormatMode::Human),
            "1 (INTEGER)"
        );
    }
}
