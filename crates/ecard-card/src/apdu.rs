//! APDU (Application Protocol Data Unit) command handling

use pcsc::{Card, MAX_BUFFER_SIZE};
use tracing::debug;

use crate::error::{Error, Result};

/// Status word for a successful command
pub const SW_OK: u16 = 0x9000;
/// SW1 meaning "wrong Le, SW2 holds the right one"
pub const SW1_WRONG_LE: u8 = 0x6C;
/// Offset beyond end of file
pub const SW_WRONG_P1P2: u16 = 0x6B00;

/// APDU response containing data and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl ApduResponse {
    /// Split a raw response into data and status word
    pub fn from_bytes(rapdu: &[u8]) -> Result<Self> {
        if rapdu.len() < 2 {
            return Err(Error::ShortResponse);
        }

        let (data, sw) = rapdu.split_at(rapdu.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            sw1: sw[0],
            sw2: sw[1],
        })
    }

    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.status_word() == SW_OK
    }

    /// Get the full status word as a 16-bit value
    pub fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Get status word as hex string (e.g., "9000")
    pub fn status_string(&self) -> String {
        format!("{:02X}{:02X}", self.sw1, self.sw2)
    }

    /// The corrected Le when the card answered 6Cxx
    pub fn corrected_le(&self) -> Option<u8> {
        (self.sw1 == SW1_WRONG_LE).then_some(self.sw2)
    }
}

/// Anything that can exchange APDUs with a card.
///
/// Exchanges are blocking and must not overlap on one session.
pub trait CardTransport {
    /// Send one command APDU and return the parsed response
    fn transmit(&mut self, apdu: &[u8]) -> Result<ApduResponse>;
}

impl CardTransport for Card {
    fn transmit(&mut self, apdu: &[u8]) -> Result<ApduResponse> {
        send_apdu(self, apdu)
    }
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit(&mut self, apdu: &[u8]) -> Result<ApduResponse> {
        (**self).transmit(apdu)
    }
}

/// Send an APDU command to the card and return the response
pub fn send_apdu(card: &Card, apdu: &[u8]) -> Result<ApduResponse> {
    let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
    let rapdu = card.transmit(apdu, &mut rapdu_buf)?;
    let response = ApduResponse::from_bytes(rapdu)?;

    debug!(
        command = %hex::encode_upper(apdu),
        status = %response.status_string(),
        len = response.data.len(),
        "APDU exchange"
    );

    Ok(response)
}

/// APDU command builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Same command with a different (or no) Le
    pub fn with_le(&self, le: Option<u8>) -> Self {
        Self {
            le,
            ..self.clone()
        }
    }

    /// Build the APDU command bytes
    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }

    /// Send this command over a transport
    pub fn send<T: CardTransport + ?Sized>(&self, transport: &mut T) -> Result<ApduResponse> {
        transport.transmit(&self.build())
    }
}

/// ISO 7816-4 commands used by the e-card
pub mod commands {
    use super::ApduCommand;

    /// SELECT command by DF name (AID), no Le
    pub fn select_aid(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x00).data(aid.to_vec())
    }

    /// SELECT command by file identifier, no Le
    pub fn select_file(fid: &[u8], p1: u8, p2: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, p1, p2).data(fid.to_vec())
    }

    /// READ BINARY command at a 15-bit offset
    pub fn read_binary(offset: u16, le: u8) -> ApduCommand {
        let [p1, p2] = offset.to_be_bytes();
        ApduCommand::new(0x00, 0xB0, p1, p2).le(le)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status() {
        let response = ApduResponse::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(response.data, vec![0x01, 0x02]);
        assert!(response.is_success());
        assert_eq!(response.status_word(), 0x9000);
        assert_eq!(response.status_string(), "9000");
        assert_eq!(response.corrected_le(), None);

        let wrong_le = ApduResponse::from_bytes(&[0x6C, 0x2A]).unwrap();
        assert!(!wrong_le.is_success());
        assert_eq!(wrong_le.corrected_le(), Some(0x2A));
    }

    #[test]
    fn test_short_response() {
        assert!(matches!(
            ApduResponse::from_bytes(&[0x90]),
            Err(Error::ShortResponse)
        ));
    }

    #[test]
    fn test_select_aid_shapes() {
        let aid = [0xD0, 0x40, 0x00, 0x00, 0x17, 0x01, 0x01, 0x01];
        let cmd = commands::select_aid(&aid);
        assert_eq!(hex::encode_upper(cmd.build()), "00A4040008D040000017010101");
        assert_eq!(
            hex::encode_upper(cmd.with_le(Some(0x00)).build()),
            "00A4040008D04000001701010100"
        );
        assert_eq!(
            hex::encode_upper(cmd.with_le(Some(0xFF)).build()),
            "00A4040008D040000017010101FF"
        );
    }

    #[test]
    fn test_select_file_shape() {
        let cmd = commands::select_file(&[0xEF, 0x01], 0x02, 0x04);
        assert_eq!(hex::encode_upper(cmd.build()), "00A4020402EF01");
    }

    #[test]
    fn test_read_binary_shape() {
        let cmd = commands::read_binary(0x01FE, 0xFF);
        assert_eq!(hex::encode_upper(cmd.build()), "00B001FEFF");
    }
}
