//! e-card protocol implementation

use ecard_common::file_length;
use tracing::{debug, info, trace};

use crate::apdu::{commands, ApduCommand, ApduResponse, CardTransport, SW_WRONG_P1P2};
use crate::error::{Error, Result};
use crate::record::{parse_record, IdentityRecord};

/// Application and file identifiers on the e-card
pub mod ids {
    /// Identity-data application
    pub const AID_IDENTITY: &[u8] = &[0xD0, 0x40, 0x00, 0x00, 0x17, 0x01, 0x01, 0x01];

    /// Base-data file inside the identity application
    pub const FID_BASE_DATA: &[u8] = &[0xEF, 0x01];

    /// P1/P2 for "select EF under current DF"
    pub const SELECT_EF_P1: u8 = 0x02;
    pub const SELECT_EF_P2: u8 = 0x04;
}

/// Largest Le a short READ BINARY can request without meaning 256
pub const MAX_CHUNK: u8 = 0xFF;

/// Highest offset READ BINARY can address (P1 bit 8 selects SFI mode)
const MAX_OFFSET: usize = 0x7FFF;

/// Le variants tried for SELECT, in order: none (case 3), 00 (case 4), FF
const SELECT_LE_VARIANTS: [Option<u8>; 3] = [None, Some(0x00), Some(0xFF)];

/// An open session with an e-card
pub struct EcardSession<T: CardTransport> {
    transport: T,
    chunk_size: u8,
}

impl<T: CardTransport> EcardSession<T> {
    /// Create a new session over a transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_size: MAX_CHUNK,
        }
    }

    /// Cap each READ BINARY request at `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: u8) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Give back the underlying transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send a command once, retrying with the card's Le on 6Cxx
    fn send_with_le_retry(&mut self, command: &ApduCommand) -> Result<ApduResponse> {
        let response = command.send(&mut self.transport)?;

        match response.corrected_le() {
            Some(le) => {
                debug!(le, "Card reported wrong Le, retrying");
                command.with_le(Some(le)).send(&mut self.transport)
            }
            None => Ok(response),
        }
    }

    /// Try each SELECT Le variant until one succeeds
    fn select_with_fallback(&mut self, command: ApduCommand) -> Result<ApduResponse> {
        let mut last_status = 0;

        for le in SELECT_LE_VARIANTS {
            let response = self.send_with_le_retry(&command.with_le(le))?;
            if response.is_success() {
                return Ok(response);
            }

            debug!(le = ?le, status = %response.status_string(), "SELECT variant rejected");
            last_status = response.status_word();
        }

        Err(Error::Select {
            status_word: last_status,
        })
    }

    /// Select an application by AID
    pub fn select_by_aid(&mut self, aid: &[u8]) -> Result<ApduResponse> {
        self.select_with_fallback(commands::select_aid(aid))
    }

    /// Select an elementary file by FID; the response data is the FCP
    pub fn select_by_fid(&mut self, fid: &[u8], p1: u8, p2: u8) -> Result<ApduResponse> {
        self.select_with_fallback(commands::select_file(fid, p1, p2))
    }

    /// Issue a single READ BINARY
    pub fn read_binary(&mut self, offset: usize, length: u8) -> Result<ApduResponse> {
        if offset > MAX_OFFSET {
            return Err(Error::OffsetOutOfRange(offset));
        }

        self.send_with_le_retry(&commands::read_binary(offset as u16, length))
    }

    /// Read the currently selected file in chunks.
    ///
    /// With a known length, stops once that many bytes have arrived and
    /// drops any overshoot. Otherwise reads until an empty body. In both
    /// cases 6B00 marks end of file.
    pub fn read_binary_all(&mut self, expected_length: Option<usize>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(expected_length.unwrap_or(0));

        loop {
            let le = match expected_length {
                Some(total) if out.len() >= total => {
                    out.truncate(total);
                    break;
                }
                Some(total) => (total - out.len()).min(self.chunk_size as usize) as u8,
                None => self.chunk_size,
            };

            let offset = out.len();
            let response = self.read_binary(offset, le)?;

            if response.status_word() == SW_WRONG_P1P2 {
                trace!(offset, "End of file reached");
                break;
            }
            if !response.is_success() {
                return Err(Error::Read {
                    offset,
                    status_word: response.status_word(),
                });
            }
            if response.data.is_empty() {
                break;
            }

            trace!(offset, len = response.data.len(), "Read chunk");
            out.extend_from_slice(&response.data);
        }

        Ok(out)
    }

    /// Select the identity application and read its base-data file
    pub fn read_base_data(&mut self) -> Result<Vec<u8>> {
        self.select_by_aid(ids::AID_IDENTITY)?;

        let fcp = self.select_by_fid(ids::FID_BASE_DATA, ids::SELECT_EF_P1, ids::SELECT_EF_P2)?;
        let expected = file_length(&fcp.data);
        debug!(expected = ?expected, "Base-data file selected");

        let data = self.read_binary_all(expected)?;
        info!(len = data.len(), "Base-data file read");
        Ok(data)
    }

    /// Read and decode the identity record
    pub fn read_identity_record(&mut self) -> Result<IdentityRecord> {
        let data = self.read_base_data()?;
        parse_record(&data)
    }
}
