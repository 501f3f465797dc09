//! e-card Card - Identity-card reading over PC/SC
//!
//! This crate talks to the e-card through a PC/SC reader: it selects the
//! identity application, reads the base-data file with driver-tolerant
//! APDU handling and maps the DER record to a handful of identity fields.

pub mod apdu;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod record;

use tracing::info;

pub use apdu::{ApduCommand, ApduResponse, CardTransport};
pub use error::{Error, Result};
pub use protocol::EcardSession;
pub use reader::{CardReader, ReaderConfig, ReaderStatus};
pub use record::{IdentityRecord, PublicIdentity};

/// Re-export commonly used types
pub use pcsc::{Card, Error as PcscError};

/// Read the identity record from the card in the first available reader.
///
/// Returns the five public fields; any field that could not be decoded is
/// left empty.
pub fn read_identity() -> Result<PublicIdentity> {
    read_identity_with(&ReaderConfig::default())
}

/// [`read_identity`] with an explicit reader configuration
pub fn read_identity_with(config: &ReaderConfig) -> Result<PublicIdentity> {
    let reader = CardReader::new(config.clone())?;
    let record = read_identity_record(&reader)?;
    Ok(record.to_public())
}

/// Connect through `reader` and decode the full identity record.
///
/// The card connection is released when this returns, on every path.
pub fn read_identity_record(reader: &CardReader) -> Result<IdentityRecord> {
    let (mut card, reader_name) = reader.connect()?;

    let record = EcardSession::new(&mut card)
        .with_chunk_size(reader.config().chunk_size)
        .read_identity_record()?;

    info!(reader = %reader_name, oids = record.raw_oids().len(), "Identity record read");
    Ok(record)
}

/// Connect through `reader` and return the undecoded base-data file
pub fn read_base_data(reader: &CardReader) -> Result<Vec<u8>> {
    let (mut card, _reader_name) = reader.connect()?;

    EcardSession::new(&mut card)
        .with_chunk_size(reader.config().chunk_size)
        .read_base_data()
}
