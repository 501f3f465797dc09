//! Dump every entry of the base-data record, including unknown OIDs.
//!
//! Entries are listed sorted by OID string, not in card order.

use ecard_card::record::parse_record;
use ecard_card::{read_base_data, CardReader, ReaderConfig, Result};
use ecard_common::get_oid_name;

use crate::formatters::{self, FormatMode};

pub fn cmd_dump(config: &ReaderConfig, format_mode: FormatMode) -> Result<()> {
    let reader = CardReader::new(config.clone())?;
    let data = read_base_data(&reader)?;

    println!("=== BASE-DATA FILE ({} bytes) ===\n", data.len());

    if format_mode == FormatMode::Raw {
        println!("{}", hex::encode_upper(&data));
        return Ok(());
    }

    let record = parse_record(&data)?;
    for (oid, value) in record.raw_oids() {
        println!(
            "  [{}] {}: {}",
            oid,
            get_oid_name(oid),
            formatters::format_value(value, format_mode)
        );
    }

    println!("\n=== Dump Complete ===");
    Ok(())
}
