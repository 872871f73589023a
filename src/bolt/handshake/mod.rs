//! Bolt protocol handshake.
//!
//! The client opens a connection by sending the 4-byte magic preamble
//! followed by four 4-byte version proposals, highest preference first.
//! The server answers with the single version it picked, or four zero
//! bytes when none of the proposals is acceptable.

mod version;

pub use version::BoltVersion;

pub use super::error::HandshakeError;

/// Bolt magic preamble: 0x60 0x60 0xB0 0x17.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Total size of the client handshake (magic + 4 proposals).
pub const HANDSHAKE_SIZE: usize = 20;

/// Size of the server's response (the chosen version).
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// Build the 20-byte client handshake for the given proposals.
///
/// At most four proposals are used; unused slots stay zero.
pub fn build_handshake(proposals: &[BoltVersion]) -> [u8; HANDSHAKE_SIZE] {
    let mut data = [0u8; HANDSHAKE_SIZE];
    data[0..4].copy_from_slice(&BOLT_MAGIC);
    for (i, version) in proposals.iter().take(4).enumerate() {
        let offset = 4 + i * 4;
        data[offset..offset + 4].copy_from_slice(&version.to_bytes());
    }
    data
}

/// Interpret the server's 4-byte handshake response.
///
/// All zeros means the server rejected every proposal; an unknown
/// version word is a protocol violation.
pub fn parse_response(response: [u8; HANDSHAKE_RESPONSE_SIZE]) -> Result<BoltVersion, HandshakeError> {
    if response == [0, 0, 0, 0] {
        return Err(HandshakeError::NoCompatibleVersion);
    }
    BoltVersion::from_bytes(response).ok_or_else(|| {
        HandshakeError::InvalidData(format!(
            "server answered with unknown version bytes {response:02X?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_constant() {
        assert_eq!(BOLT_MAGIC, [0x60, 0x60, 0xB0, 0x17]);
    }

    #[test]
    fn handshake_layout() {
        let data = build_handshake(&[BoltVersion::V5_0, BoltVersion::V4_4, BoltVersion::V4_3]);

        assert_eq!(&data[0..4], &BOLT_MAGIC);
        assert_eq!(&data[4..8], &[0x00, 0x00, 0x05, 0x00]);
        assert_eq!(&data[8..12], &[0x00, 0x00, 0x04, 0x04]);
        assert_eq!(&data[12..16], &[0x00, 0x00, 0x04, 0x03]);
        assert_eq!(&data[16..20], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn more_than_four_proposals_are_truncated() {
        let data = build_handshake(&BoltVersion::ALL);
        // Only the first four fit; the frame is still 20 bytes.
        assert_eq!(data.len(), HANDSHAKE_SIZE);
        assert_eq!(&data[16..20], &[0x00, 0x00, 0x04, 0x02]);
    }

    #[test]
    fn parse_accepted_version() {
        assert_eq!(
            parse_response([0x00, 0x00, 0x05, 0x00]).unwrap(),
            BoltVersion::V5_0
        );
    }

    #[test]
    fn parse_rejection() {
        assert!(matches!(
            parse_response([0, 0, 0, 0]).unwrap_err(),
            HandshakeError::NoCompatibleVersion
        ));
    }

    #[test]
    fn parse_unknown_version() {
        assert!(matches!(
            parse_response([0x00, 0x00, 0x03, 0x00]).unwrap_err(),
            HandshakeError::InvalidData(_)
        ));
    }
}
