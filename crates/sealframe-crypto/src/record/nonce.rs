//! Per-record nonce construction (RFC 8446 Section 5.3)

/// AEAD nonce and implicit IV size (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Build the nonce for one record.
///
/// The 64-bit sequence number is encoded big-endian, left-padded with four
/// zero bytes to 12 bytes, and XORed with the implicit IV:
///
/// ```text
/// bytes 0-3:  iv[0..4]
/// bytes 4-11: iv[4..12] ^ sequence_number (big-endian)
/// ```
///
/// Distinct sequence numbers always give distinct nonces under one IV.
/// Keeping the sequence number unique is the caller's job.
pub fn nonce_for(implicit_iv: &[u8; NONCE_LEN], sequence_number: u64) -> [u8; NONCE_LEN] {
    let mut padded = [0u8; NONCE_LEN];
    padded[4..].copy_from_slice(&sequence_number.to_be_bytes());

    let mut nonce = *implicit_iv;
    for (byte, pad) in nonce.iter_mut().zip(padded) {
        *byte ^= pad;
    }

    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_zero_returns_iv() {
        let iv = [0x5Au8; NONCE_LEN];
        assert_eq!(nonce_for(&iv, 0), iv);
    }

    #[test]
    fn zero_iv_exposes_padded_sequence() {
        let nonce = nonce_for(&[0u8; NONCE_LEN], 0x0102_0304_0506_0708);

        // Check padding (bytes 0-3)
        assert_eq!(&nonce[0..4], &[0x00; 4]);

        // Check sequence number (bytes 4-11)
        assert_eq!(&nonce[4..12], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn leading_iv_bytes_are_untouched() {
        let iv = [0xFFu8; NONCE_LEN];
        let nonce = nonce_for(&iv, u64::MAX);

        assert_eq!(&nonce[0..4], &[0xFF; 4]);
        assert_eq!(&nonce[4..12], &[0x00; 8]);
    }

    #[test]
    fn consecutive_sequence_numbers_differ() {
        let iv = [0x11u8; NONCE_LEN];
        let nonces: Vec<_> = (0..64).map(|seq| nonce_for(&iv, seq)).collect();

        for i in 0..nonces.len() {
            for j in (i + 1)..nonces.len() {
                assert_ne!(nonces[i], nonces[j], "nonces {i} and {j} collide");
            }
        }
    }

    #[test]
    fn xor_is_self_inverse() {
        let iv = [0x3Cu8; NONCE_LEN];
        let nonce = nonce_for(&iv, 12345);
        assert_eq!(nonce_for(&nonce, 12345), iv);
    }
}
