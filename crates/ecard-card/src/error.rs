use thiserror::Error;

/// Result type for e-card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for e-card operations
#[derive(Debug, Error)]
pub enum Error {
    /// No PC/SC reader is connected
    #[error("No card reader available")]
    NoReader,

    /// A reader is present but holds no card
    #[error("No card present in reader")]
    NoCard,

    /// SELECT failed for every Le variant
    #[error("SELECT failed with status {status_word:04X}")]
    Select { status_word: u16 },

    /// READ BINARY returned a non-success status
    #[error("READ BINARY at offset {offset} failed with status {status_word:04X}")]
    Read { offset: usize, status_word: u16 },

    /// The file is larger than READ BINARY offsets can address
    #[error("Offset {0} is out of READ BINARY range")]
    OffsetOutOfRange(usize),

    /// The record is not a DER SEQUENCE
    #[error("Invalid record structure: {0}")]
    Structure(&'static str),

    /// The outer record could not be decoded
    #[error(transparent)]
    Decode(#[from] ecard_common::DecodeError),

    /// The reader returned fewer than two status bytes
    #[error("Response too short to carry a status word")]
    ShortResponse,

    /// Any other PC/SC failure
    #[error(transparent)]
    Pcsc(pcsc::Error),
}

impl From<pcsc::Error> for Error {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader | pcsc::Error::NoService => {
                Error::NoReader
            }
            pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard => Error::NoCard,
            other => Error::Pcsc(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reader_maps_to_no_reader() {
        for err in [
            pcsc::Error::NoReadersAvailable,
            pcsc::Error::UnknownReader,
            pcsc::Error::NoService,
        ] {
            assert!(matches!(Error::from(err), Error::NoReader), "{err:?}");
        }
    }

    #[test]
    fn test_missing_card_maps_to_no_card() {
        for err in [pcsc::Error::NoSmartcard, pcsc::Error::RemovedCard] {
            assert!(matches!(Error::from(err), Error::NoCard), "{err:?}");
        }
    }

    #[test]
    fn test_other_pcsc_errors_pass_through() {
        for err in [
            pcsc::Error::Timeout,
            pcsc::Error::SharingViolation,
            pcsc::Error::UnpoweredCard,
        ] {
            match Error::from(err) {
                Error::Pcsc(inner) => assert_eq!(inner, err),
                other => panic!("{err:?} mapped to {other:?}"),
            }
        }
    }

    #[test]
    fn test_pcsc_error_via_question_mark() {
        fn connect() -> Result<()> {
            Err(pcsc::Error::NoSmartcard)?
        }
        assert!(matches!(connect(), Err(Error::NoCard)));
    }
}
