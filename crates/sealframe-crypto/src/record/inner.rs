//! `TLSInnerPlaintext` encoding and the record header used as associated data
//!
//! ```text
//! struct {
//!     opaque content[TLSPlaintext.length];
//!     ContentType type;
//!     uint8 zeros[length_of_padding];
//! } TLSInnerPlaintext;
//! ```
//!
//! The outer header of a protected record is always `application_data`,
//! legacy version `0x0303`, and the ciphertext length. Those five bytes are
//! the AEAD associated data.

use super::error::RecordError;

/// Size of the outer record header
pub const RECORD_HEADER_LEN: usize = 5;

/// Maximum plaintext fragment (2^14)
pub const MAX_PLAINTEXT_LEN: usize = 1 << 14;

/// Maximum `TLSCiphertext.length` (2^14 + 256)
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 256;

/// Legacy record version carried in every TLS 1.3 record header
const LEGACY_RECORD_VERSION: [u8; 2] = [0x03, 0x03];

/// Record content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// `change_cipher_spec` (20)
    ChangeCipherSpec,
    /// `alert` (21)
    Alert,
    /// `handshake` (22)
    Handshake,
    /// `application_data` (23)
    ApplicationData,
    /// Any other value
    Unknown(u8),
}

impl From<u8> for ContentType {
    fn from(value: u8) -> Self {
        match value {
            20 => Self::ChangeCipherSpec,
            21 => Self::Alert,
            22 => Self::Handshake,
            23 => Self::ApplicationData,
            other => Self::Unknown(other),
        }
    }
}

impl From<ContentType> for u8 {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Unknown(other) => other,
        }
    }
}

/// Outer header for a protected record of `ciphertext_len` bytes.
pub fn record_header(ciphertext_len: usize) -> Result<[u8; RECORD_HEADER_LEN], RecordError> {
    if ciphertext_len > MAX_CIPHERTEXT_LEN {
        return Err(RecordError::RecordOverflow {
            length: ciphertext_len,
            max: MAX_CIPHERTEXT_LEN,
        });
    }

    let length = (ciphertext_len as u16).to_be_bytes();
    Ok([
        u8::from(ContentType::ApplicationData),
        LEGACY_RECORD_VERSION[0],
        LEGACY_RECORD_VERSION[1],
        length[0],
        length[1],
    ])
}

/// Build `content || content_type || zeros[padding]`.
pub fn encode_inner_plaintext(
    content: &[u8],
    content_type: ContentType,
    padding: usize,
) -> Result<Vec<u8>, RecordError> {
    if u8::from(content_type) == 0 {
        return Err(RecordError::MalformedRecord {
            reason: "content type 0 cannot be encoded".to_string(),
        });
    }

    let padded_len = content.len().saturating_add(padding);
    if padded_len > MAX_PLAINTEXT_LEN {
        return Err(RecordError::RecordOverflow { length: padded_len, max: MAX_PLAINTEXT_LEN });
    }

    let mut inner = Vec::with_capacity(padded_len + 1);
    inner.extend_from_slice(content);
    inner.push(u8::from(content_type));
    inner.resize(padded_len + 1, 0);

    Ok(inner)
}

/// Strip padding and split off the content type.
///
/// The content type is the last non-zero byte. A plaintext with no non-zero
/// byte is malformed (`unexpected_message` in TLS terms).
pub fn decode_inner_plaintext(
    mut inner: Vec<u8>,
) -> Result<(ContentType, Vec<u8>), RecordError> {
    if inner.len() > MAX_PLAINTEXT_LEN + 1 {
        return Err(RecordError::RecordOverflow { length: inner.len(), max: MAX_PLAINTEXT_LEN + 1 });
    }

    let Some(type_index) = inner.iter().rposition(|&byte| byte != 0) else {
        return Err(RecordError::MalformedRecord {
            reason: "inner plaintext has no content type".to_string(),
        });
    };

    let content_type = ContentType::from(inner[type_index]);
    inner.truncate(type_index);

    Ok((content_type, inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_byte_mapping() {
        for (byte, expected) in [
            (20, ContentType::ChangeCipherSpec),
            (21, ContentType::Alert),
            (22, ContentType::Handshake),
            (23, ContentType::ApplicationData),
            (99, ContentType::Unknown(99)),
        ] {
            assert_eq!(ContentType::from(byte), expected);
            assert_eq!(u8::from(expected), byte);
        }
    }

    #[test]
    fn header_layout() {
        let header = record_header(0x02a2).unwrap();
        assert_eq!(header, [0x17, 0x03, 0x03, 0x02, 0xa2]);
    }

    #[test]
    fn header_rejects_oversized_ciphertext() {
        assert!(record_header(MAX_CIPHERTEXT_LEN).is_ok());
        assert_eq!(
            record_header(MAX_CIPHERTEXT_LEN + 1),
            Err(RecordError::RecordOverflow {
                length: MAX_CIPHERTEXT_LEN + 1,
                max: MAX_CIPHERTEXT_LEN
            })
        );
    }

    #[test]
    fn encode_appends_type_and_padding() {
        let inner = encode_inner_plaintext(b"hi", ContentType::Handshake, 3).unwrap();
        assert_eq!(inner, vec![b'h', b'i', 22, 0, 0, 0]);
    }

    #[test]
    fn decode_strips_padding() {
        let inner = vec![b'o', b'k', 23, 0, 0, 0, 0];
        let (content_type, content) = decode_inner_plaintext(inner).unwrap();

        assert_eq!(content_type, ContentType::ApplicationData);
        assert_eq!(content, b"ok");
    }

    #[test]
    fn decode_keeps_zero_bytes_inside_content() {
        let inner = encode_inner_plaintext(&[0, 1, 0, 0], ContentType::ApplicationData, 2).unwrap();
        let (_, content) = decode_inner_plaintext(inner).unwrap();
        assert_eq!(content, vec![0, 1, 0, 0]);
    }

    #[test]
    fn decode_empty_content() {
        let (content_type, content) = decode_inner_plaintext(vec![21]).unwrap();
        assert_eq!(content_type, ContentType::Alert);
        assert!(content.is_empty());
    }

    #[test]
    fn decode_rejects_all_zero() {
        assert!(matches!(
            decode_inner_plaintext(vec![0; 8]),
            Err(RecordError::MalformedRecord { .. })
        ));
        assert!(matches!(
            decode_inner_plaintext(Vec::new()),
            Err(RecordError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn encode_rejects_oversized_content() {
        let content = vec![0x41; MAX_PLAINTEXT_LEN];
        assert!(encode_inner_plaintext(&content, ContentType::ApplicationData, 0).is_ok());
        assert!(matches!(
            encode_inner_plaintext(&content, ContentType::ApplicationData, 1),
            Err(RecordError::RecordOverflow { .. })
        ));
    }

    #[test]
    fn encode_rejects_zero_content_type() {
        assert!(matches!(
            encode_inner_plaintext(b"x", ContentType::Unknown(0), 0),
            Err(RecordError::MalformedRecord { .. })
        ));
    }
}
