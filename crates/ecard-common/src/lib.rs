//! e-card Common - Shared decoding utilities for e-card records
//!
//! Hardware-free building blocks: a DER/BER tag-length-value reader, OID
//! decoding, primitive value decoding and the FCP file-size extractor.

pub mod der;
pub mod fcp;

pub use der::{
    decode_oid, decode_primitive, iter_tlvs, read_length, read_tlv, DecodeError, DecodedValue,
    TlvNode,
};
pub use fcp::file_length;

/// Single-octet tags used on the card
pub mod tags {
    // Universal class
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const UTF8_STRING: u8 = 0x0C;
    pub const PRINTABLE_STRING: u8 = 0x13;
    pub const IA5_STRING: u8 = 0x16;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;

    // ISO 7816-4 file control parameters
    pub const FCP_TEMPLATE: u8 = 0x62;
    pub const FCP_FILE_SIZE: u8 = 0x80;
    pub const FCP_TOTAL_FILE_SIZE: u8 = 0x81;
    pub const FCP_FILE_DESCRIPTOR: u8 = 0x82;
}

/// Object identifiers found in the base-data record
pub mod oids {
    pub const GIVEN_NAME: &str = "2.5.4.42";
    pub const SURNAME: &str = "2.5.4.4";
    pub const TITLE: &str = "2.5.4.12";
    pub const SERIAL_NUMBER: &str = "2.5.4.5";
    pub const DATE_OF_BIRTH: &str = "1.3.6.1.5.5.7.9.1";
    pub const PLACE_OF_BIRTH: &str = "1.3.6.1.5.5.7.9.2";
    pub const GENDER: &str = "1.3.6.1.5.5.7.9.3";
    pub const COUNTRY_OF_CITIZENSHIP: &str = "1.3.6.1.5.5.7.9.4";
    pub const COUNTRY_OF_RESIDENCE: &str = "1.3.6.1.5.5.7.9.5";
}

/// Get a human-readable name for an OID
pub fn get_oid_name(oid: &str) -> &'static str {
    match oid {
        oids::GIVEN_NAME => "Given Name",
        oids::SURNAME => "Surname",
        oids::TITLE => "Title",
        oids::SERIAL_NUMBER => "Serial Number",
        oids::DATE_OF_BIRTH => "Date of Birth",
        oids::PLACE_OF_BIRTH => "Place of Birth",
        oids::GENDER => "Gender",
        oids::COUNTRY_OF_CITIZENSHIP => "Country of Citizenship",
        oids::COUNTRY_OF_RESIDENCE => "Country of Residence",
        _ => "Unknown OID",
    }
}
