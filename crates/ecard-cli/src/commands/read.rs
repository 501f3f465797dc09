use ecard_card::{read_identity_with, ReaderConfig, Result};

use crate::formatters::{format_identity, FormatMode};

pub fn cmd_read(config: &ReaderConfig, format_mode: FormatMode) -> Result<()> {
    let identity = read_identity_with(config)?;

    if format_mode == FormatMode::Human {
        println!("e-card Reader - {} Mode\n", format_mode.description());
    }
    println!("{}", format_identity(&identity, format_mode));

    Ok(())
}
