//! File Control Parameters (FCP) returned by SELECT EF

use crate::der::{iter_tlvs, read_length};
use crate::tags;

/// Extract the declared file size from an FCP blob.
///
/// The blob must start with an FCP template (tag 62). Inside it, the first
/// size-bearing tag (80, 81 or 82) with a 1-4 byte value is read as a
/// big-endian integer. `None` means the size is unknown and the file should
/// be read until the card signals end of file.
pub fn file_length(fcp: &[u8]) -> Option<usize> {
    if fcp.first() != Some(&tags::FCP_TEMPLATE) {
        return None;
    }

    let (length, body_start) = read_length(fcp, 1).ok()?;
    // Some cards under-report the template length; never read past the blob.
    let body_end = body_start.saturating_add(length).min(fcp.len());
    let body = &fcp[body_start..body_end];

    for node in iter_tlvs(body) {
        let node = node.ok()?;
        if matches!(
            node.tag,
            tags::FCP_FILE_SIZE | tags::FCP_TOTAL_FILE_SIZE | tags::FCP_FILE_DESCRIPTOR
        ) && (1..=4).contains(&node.value.len())
        {
            let size = node
                .value
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            return Some(size);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size_tag() {
        let fcp = hex::decode("620C8202010183020EF1800200F5").unwrap();
        // 82 has a 2-byte value and comes first
        assert_eq!(file_length(&fcp), Some(0x0101));
    }

    #[test]
    fn test_first_matching_tag_wins() {
        let fcp = hex::decode("6208800201F5810203E8").unwrap();
        assert_eq!(file_length(&fcp), Some(0x01F5));
    }

    #[test]
    fn test_skips_oversized_values() {
        let fcp = hex::decode("620A80050000000100810180").unwrap();
        assert_eq!(file_length(&fcp), Some(0x80));
    }

    #[test]
    fn test_long_form_template_length() {
        let mut fcp = vec![0x62, 0x81, 0x84];
        fcp.extend_from_slice(&[0x83, 0x02, 0xEF, 0x01]);
        fcp.extend_from_slice(&[0xA5, 0x7A]);
        fcp.extend(std::iter::repeat(0u8).take(0x7A));
        fcp.extend_from_slice(&[0x80, 0x02, 0x04, 0x00]);
        assert_eq!(file_length(&fcp), Some(0x0400));
    }

    #[test]
    fn test_no_template() {
        let fcp = hex::decode("6F0480020100").unwrap();
        assert_eq!(file_length(&fcp), None);
        assert_eq!(file_length(&[]), None);
    }

    #[test]
    fn test_no_size_tag() {
        let fcp = hex::decode("62048302EF01").unwrap();
        assert_eq!(file_length(&fcp), None);
    }
}
