use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use ecard_card::{read_identity_record, CardReader, PublicIdentity, ReaderConfig};
use tracing::{debug, info, warn};

/// How often card presence is polled
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// How often a missing PC/SC context is re-established
const READER_RETRY: Duration = Duration::from_secs(2);

/// Messages sent from the card worker to the caller
#[derive(Debug, Clone)]
pub enum CardEvent {
    /// Card was detected
    CardDetected,
    /// Card was removed
    CardRemoved,
    /// Identity was read from the inserted card
    IdentityRead(PublicIdentity),
    /// Reading the inserted card failed
    Error { message: String },
    /// Reader is unavailable
    ReaderUnavailable { error: String },
    /// Reader became available
    ReaderAvailable,
}

/// Commands sent from the caller to the card worker
#[derive(Debug)]
pub enum CardCommand {
    /// Stop the worker thread
    Stop,
}

/// Background worker watching for card insertion
pub struct CardWorker {
    config: ReaderConfig,
    event_tx: Sender<CardEvent>,
    command_rx: Receiver<CardCommand>,
}

impl CardWorker {
    /// Spawn a new card worker thread
    pub fn spawn(config: ReaderConfig) -> (Receiver<CardEvent>, Sender<CardCommand>) {
        let (event_tx, event_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        thread::spawn(move || {
            let worker = CardWorker {
                config,
                event_tx,
                command_rx,
            };
            worker.run();
        });

        (event_rx, command_tx)
    }

    fn run(self) {
        info!("Card worker thread started");

        let mut reader: Option<CardReader> = None;
        let mut card_present = false;
        let mut last_reader_check: Option<Instant> = None;

        loop {
            // Check for stop command (non-blocking)
            if let Ok(CardCommand::Stop) = self.command_rx.try_recv() {
                info!("Card worker stopping");
                break;
            }

            if reader.is_none() && last_reader_check.map_or(true, |t| t.elapsed() > READER_RETRY) {
                match CardReader::new(self.config.clone()) {
                    Ok(r) => {
                        info!("Card reader initialized");
                        reader = Some(r);
                        let _ = self.event_tx.send(CardEvent::ReaderAvailable);
                    }
                    Err(e) => {
                        debug!("Card reader unavailable: {}", e);
                        let _ = self.event_tx.send(CardEvent::ReaderUnavailable {
                            error: e.to_string(),
                        });
                    }
                }
                last_reader_check = Some(Instant::now());
            }

            if let Some(ref r) = reader {
                match r.is_card_present() {
                    Ok(true) if !card_present => {
                        info!("Card detected");
                        card_present = true;
                        let _ = self.event_tx.send(CardEvent::CardDetected);
                        self.read_card(r);
                    }
                    Ok(false) if card_present => {
                        info!("Card removed");
                        card_present = false;
                        let _ = self.event_tx.send(CardEvent::CardRemoved);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Lost card reader");
                        reader = None;
                        card_present = false;
                        let _ = self.event_tx.send(CardEvent::ReaderUnavailable {
                            error: e.to_string(),
                        });
                    }
                }
            }

            // Sleep briefly to avoid busy loop
            thread::sleep(POLL_INTERVAL);
        }

        info!("Card worker thread stopped");
    }

    fn read_card(&self, reader: &CardReader) {
        let event = match read_identity_record(reader) {
            Ok(record) => CardEvent::IdentityRead(record.to_public()),
            Err(e) => {
                warn!(error = %e, "Failed to read card data");
                CardEvent::Error {
                    message: format!("Failed to read card: {}", e),
                }
            }
        };
        let _ = self.event_tx.send(event);
    }
}
