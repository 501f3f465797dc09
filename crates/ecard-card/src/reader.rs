//! PC/SC card reader management

use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::MAX_CHUNK;

/// How to pick and open a reader
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Use the first reader whose name contains this; first reader if unset
    pub reader: Option<String>,
    /// Open the card exclusively instead of shared
    pub exclusive: bool,
    /// Upper bound for a single READ BINARY
    pub chunk_size: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            reader: None,
            exclusive: false,
            chunk_size: MAX_CHUNK,
        }
    }
}

/// A reader name together with whether a card sits in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderStatus {
    pub name: String,
    pub card_present: bool,
}

/// First reader whose name contains `wanted`, or the first reader at all
fn pick_reader(readers: Vec<CString>, wanted: Option<&str>) -> Result<CString> {
    readers
        .into_iter()
        .find(|r| match wanted {
            Some(wanted) => r.to_string_lossy().contains(wanted),
            None => true,
        })
        .ok_or(Error::NoReader)
}

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
    config: ReaderConfig,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new(config: ReaderConfig) -> Result<Self> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context, config })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<CString>> {
        match self.context.list_readers_owned() {
            Ok(readers) => Ok(readers),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// The reader selected by the configuration
    fn select_reader(&self) -> Result<CString> {
        let readers = self.list_readers()?;
        pick_reader(readers, self.config.reader.as_deref())
    }

    /// Connect to the configured reader's card
    pub fn connect(&self) -> Result<(Card, String)> {
        let reader = self.select_reader()?;
        let reader_name = reader.to_string_lossy().into_owned();

        let share_mode = if self.config.exclusive {
            ShareMode::Exclusive
        } else {
            ShareMode::Shared
        };

        let card = self.context.connect(&reader, share_mode, Protocols::ANY)?;
        info!(reader = %reader_name, "Connected to card");
        Ok((card, reader_name))
    }

    /// Presence state of every reader
    pub fn reader_states(&self) -> Result<Vec<ReaderStatus>> {
        let readers = self.list_readers()?;
        if readers.is_empty() {
            return Ok(Vec::new());
        }

        let mut states: Vec<ReaderState> = readers
            .into_iter()
            .map(|name| ReaderState::new(name, State::UNAWARE))
            .collect();

        match self.context.get_status_change(Duration::ZERO, &mut states) {
            Ok(()) | Err(pcsc::Error::Timeout) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(states
            .iter()
            .map(|s| ReaderStatus {
                name: s.name().to_string_lossy().into_owned(),
                card_present: s.event_state().contains(State::PRESENT),
            })
            .collect())
    }

    /// Whether the configured reader currently holds a card.
    ///
    /// Advisory only: a read still reports `NoCard` on its own.
    pub fn is_card_present(&self) -> Result<bool> {
        let reader = match self.select_reader() {
            Ok(r) => r,
            Err(Error::NoReader) => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut states = [ReaderState::new(reader, State::UNAWARE)];
        match self.context.get_status_change(Duration::ZERO, &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let present = states[0].event_state().contains(State::PRESENT);
        debug!(present, "Card presence checked");
        Ok(present)
    }
}
