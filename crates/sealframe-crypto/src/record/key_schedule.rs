//! TLS 1.3 key schedule: HKDF-Expand-Label and traffic key derivation
//!
//! Only the expansion half of the schedule lives here. Traffic secrets are
//! produced by the handshake and handed in from outside.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{error::RecordError, nonce::NONCE_LEN};

/// SHA-256 output size, which is also the traffic secret size
pub const HASH_LEN: usize = 32;

/// Largest output HKDF-Expand can produce (`255 * HashLen`)
pub const MAX_EXPAND_LEN: usize = 255 * HASH_LEN;

/// Prefix prepended to every label
const LABEL_PREFIX: &[u8] = b"tls13 ";

/// Label for the AEAD key
const KEY_LABEL: &[u8] = b"key";

/// Label for the implicit IV
const IV_LABEL: &[u8] = b"iv";

/// Label for the next-generation traffic secret (key update)
const TRAFFIC_UPDATE_LABEL: &[u8] = b"traffic upd";

/// A 32-byte traffic secret for one direction of one epoch.
///
/// Deliberately not `Clone`: a secret is moved into the protector that
/// derives keys from it and is zeroized when that protector goes away.
pub struct TrafficSecret([u8; HASH_LEN]);

impl TrafficSecret {
    /// Wrap raw secret bytes.
    pub fn new(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a secret out of a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let array: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            RecordError::InvalidSecretLength { expected: HASH_LEN, actual: bytes.len() }
        })?;
        Ok(Self(array))
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for TrafficSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrafficSecret([redacted])")
    }
}

impl Drop for TrafficSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// AEAD key and implicit IV derived from a traffic secret.
pub struct DerivedKeyMaterial {
    key: Vec<u8>,
    implicit_iv: [u8; NONCE_LEN],
}

impl DerivedKeyMaterial {
    /// Derive `key_len` bytes of key and a 12-byte implicit IV.
    pub fn derive(secret: &TrafficSecret, key_len: usize) -> Result<Self, RecordError> {
        let key = derive_key(secret.as_bytes(), key_len)?;
        let implicit_iv = derive_implicit_iv(secret.as_bytes())?;
        Ok(Self { key, implicit_iv })
    }

    /// AEAD key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Implicit IV (`client/server_write_iv`).
    pub fn implicit_iv(&self) -> &[u8; NONCE_LEN] {
        &self.implicit_iv
    }
}

impl fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("key_len", &self.key.len())
            .finish_non_exhaustive()
    }
}

impl Drop for DerivedKeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.implicit_iv.zeroize();
    }
}

/// TLS 1.3 HKDF-Expand-Label (RFC 8446 Section 7.1).
///
/// `secret` is used directly as the HKDF pseudorandom key, so it must be at
/// least [`HASH_LEN`] bytes. `label` is given without the `"tls13 "` prefix.
///
/// ```text
/// struct {
///     uint16 length = output_len;
///     opaque label<7..255> = "tls13 " + label;
///     opaque context<0..255> = context;
/// } HkdfLabel;
/// ```
pub fn expand_label(
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, RecordError> {
    if output_len == 0 || output_len > MAX_EXPAND_LEN {
        return Err(RecordError::InvalidLength { requested: output_len, max: MAX_EXPAND_LEN });
    }

    let full_label_len = LABEL_PREFIX.len() + label.len();
    if full_label_len > usize::from(u8::MAX) {
        return Err(RecordError::InvalidLabel { length: full_label_len });
    }
    if context.len() > usize::from(u8::MAX) {
        return Err(RecordError::InvalidLabel { length: context.len() });
    }

    let hkdf = Hkdf::<Sha256>::from_prk(secret).map_err(|_| RecordError::InvalidSecretLength {
        expected: HASH_LEN,
        actual: secret.len(),
    })?;

    // Capacity: 2 (length) + 1 + label + 1 + context
    let mut info = Vec::with_capacity(4 + full_label_len + context.len());
    info.extend_from_slice(&(output_len as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    let mut output = vec![0u8; output_len];
    hkdf.expand(&info, &mut output)
        .map_err(|_| RecordError::InvalidLength { requested: output_len, max: MAX_EXPAND_LEN })?;

    Ok(output)
}

/// Derive the 12-byte implicit IV: `HKDF-Expand-Label(secret, "iv", "", 12)`.
pub fn derive_implicit_iv(secret: &[u8]) -> Result<[u8; NONCE_LEN], RecordError> {
    let mut expanded = expand_label(secret, IV_LABEL, &[], NONCE_LEN)?;

    let mut iv = [0u8; NONCE_LEN];
    iv.copy_from_slice(&expanded);
    expanded.zeroize();

    Ok(iv)
}

/// Derive the AEAD key: `HKDF-Expand-Label(secret, "key", "", key_len)`.
pub fn derive_key(secret: &[u8], key_len: usize) -> Result<Vec<u8>, RecordError> {
    expand_label(secret, KEY_LABEL, &[], key_len)
}

/// Derive the next-generation secret for a key update (RFC 8446 Section 7.2).
///
/// `secret_N+1 = HKDF-Expand-Label(secret_N, "traffic upd", "", HashLen)`
pub fn derive_next_secret(secret: &TrafficSecret) -> Result<TrafficSecret, RecordError> {
    let mut expanded = expand_label(secret.as_bytes(), TRAFFIC_UPDATE_LABEL, &[], HASH_LEN)?;
    let next = TrafficSecret::from_slice(&expanded);
    expanded.zeroize();
    next
}
