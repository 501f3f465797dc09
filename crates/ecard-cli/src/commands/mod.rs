pub mod dump;
pub mod read;
pub mod readers;
pub mod watch;

use ecard_card::Error;

/// A follow-up line for errors the user can fix at the reader
pub(crate) fn hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::NoReader => Some("Please connect a card reader (is pcscd running?)"),
        Error::NoCard => Some("Please ensure a card is present on the reader"),
        Error::Select { .. } => Some("The inserted card does not look like an e-card"),
        _ => None,
    }
}
