//! On-disk framing of the settings file.
//!
//! ```text
//! byte 0        version (0x00 plaintext, 0x01 ChaCha20-Poly1305 v1)
//! -- 0x00 --
//! bytes 1..N    compact UTF-8 JSON object
//! -- 0x01 --
//! bytes 1..13   nonce (counter u64 little-endian in 0..8, then 4 zero bytes)
//! bytes 13..29  Poly1305 tag
//! bytes 29..N   ciphertext of the JSON object, AAD = version byte
//! ```

use crate::error::SettingsError;

pub const VERSION_SIZE: usize = 1;
pub const NONCE_SIZE: usize = 12;
pub const MAC_SIZE: usize = 16;

/// Offset of the tag in an encrypted v1 file.
pub const MAC_OFFSET: usize = VERSION_SIZE + NONCE_SIZE;

/// Offset of the ciphertext in an encrypted v1 file.
pub const CIPHERTEXT_OFFSET: usize = MAC_OFFSET + MAC_SIZE;

const COUNTER_SIZE: usize = 8;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    NoEncryption = 0x00,
    EncryptionChachaPolyV1 = 0x01,
}

impl Version {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn is_encrypted(self) -> bool {
        matches!(self, Version::EncryptionChachaPolyV1)
    }
}

impl TryFrom<u8> for Version {
    type Error = SettingsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Version::NoEncryption),
            0x01 => Ok(Version::EncryptionChachaPolyV1),
            other => Err(SettingsError::InvalidFormat(format!(
                "unsupported version byte 0x{other:02x}"
            ))),
        }
    }
}

/// Build the 12-byte nonce for `counter`.
///
/// The byte order is fixed (little-endian) so files stay readable
/// regardless of the host's endianness.
pub fn encode_nonce(counter: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..COUNTER_SIZE].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// Recover the counter from the first 8 nonce bytes.
pub fn decode_counter(nonce: &[u8; NONCE_SIZE]) -> u64 {
    let mut counter = [0u8; COUNTER_SIZE];
    counter.copy_from_slice(&nonce[..COUNTER_SIZE]);
    u64::from_le_bytes(counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn nonce_layout_is_little_endian_with_zero_tail() {
        let nonce = encode_nonce(0x0102_0304_0506_0708);
        assert_eq!(
            nonce,
            [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0]
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(12345)]
    #[case(u64::MAX)]
    fn counter_survives_nonce(#[case] counter: u64) {
        assert_eq!(decode_counter(&encode_nonce(counter)), counter);
    }

    #[test]
    fn tail_bytes_do_not_affect_counter() {
        let mut nonce = encode_nonce(42);
        nonce[NONCE_SIZE - 1] = 0xff;
        assert_eq!(decode_counter(&nonce), 42);
    }

    #[rstest]
    #[case(0x00, Some(Version::NoEncryption))]
    #[case(0x01, Some(Version::EncryptionChachaPolyV1))]
    #[case(0x02, None)]
    #[case(0xff, None)]
    fn version_from_byte(#[case] byte: u8, #[case] expected: Option<Version>) {
        match (Version::try_from(byte), expected) {
            (Ok(v), Some(e)) => assert_eq!(v, e),
            (Err(SettingsError::InvalidFormat(_)), None) => {}
            (other, _) => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn offsets_match_layout() {
        assert_eq!(MAC_OFFSET, 13);
        assert_eq!(CIPHERTEXT_OFFSET, 29);
    }
}
