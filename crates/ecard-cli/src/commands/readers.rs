use ecard_card::{CardReader, ReaderConfig, Result};

pub fn cmd_readers(config: &ReaderConfig) -> Result<()> {
    let reader = CardReader::new(config.clone())?;
    let states = reader.reader_states()?;

    if states.is_empty() {
        println!("No card readers found");
        return Ok(());
    }

    for (i, state) in states.iter().enumerate() {
        let card = if state.card_present { "card present" } else { "empty" };
        println!("{}: {} ({})", i + 1, state.name, card);
    }

    Ok(())
}
