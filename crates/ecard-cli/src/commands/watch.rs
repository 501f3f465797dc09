use ecard_card::{ReaderConfig, Result};

use crate::formatters::{format_identity, FormatMode};
use crate::worker::{CardCommand, CardEvent, CardWorker};

pub fn cmd_watch(config: ReaderConfig, format_mode: FormatMode, once: bool) -> Result<()> {
    let (events, commands) = CardWorker::spawn(config);
    let mut reader_missing_reported = false;

    println!("Waiting for e-card (Ctrl-C to quit)...\n");

    for event in events {
        match event {
            CardEvent::ReaderAvailable => {
                reader_missing_reported = false;
                println!("Reader available");
            }
            CardEvent::ReaderUnavailable { error } => {
                if !reader_missing_reported {
                    eprintln!("Reader unavailable: {}", error);
                    reader_missing_reported = true;
                }
            }
            CardEvent::CardDetected => println!("Card inserted, reading..."),
            CardEvent::CardRemoved => println!("Card removed\n"),
            CardEvent::IdentityRead(identity) => {
                println!("{}\n", format_identity(&identity, format_mode));
                if once {
                    let _ = commands.send(CardCommand::Stop);
                    break;
                }
            }
            CardEvent::Error { message } => eprintln!("{}", message),
        }
    }

    Ok(())
}
