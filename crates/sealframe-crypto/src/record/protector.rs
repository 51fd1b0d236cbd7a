//! One direction of record protection
//!
//! A [`RecordProtector`] owns a traffic secret, the key and implicit IV
//! derived from it, and the sequence counter. `seal` and `open` are the only
//! operations that move the counter, and each moves it by exactly one on
//! success.
//!
//! # State Machine
//!
//! ```text
//!         seal/open ok
//!          ┌──────┐
//!          ↓      │
//!       ┌────────┐  counter at u64::MAX  ┌───────────┐
//! new ─>│ Active │──────────────────────>│ Exhausted │
//!       └────────┘                       └───────────┘
//!           │                                  │
//!           │ close / update_keys              │ close / update_keys
//!           │          ┌────────┐              │
//!           └─────────>│ Closed │<─────────────┘
//!                      └────────┘
//! ```

use aes_gcm::{
    Aes128Gcm, Aes256Gcm,
    aead::{
        AeadCore, AeadInPlace, KeyInit, Nonce, Tag,
        consts::{U12, U16},
    },
};
use zeroize::Zeroize;

use super::{
    error::RecordError,
    inner::{
        ContentType, MAX_CIPHERTEXT_LEN, RECORD_HEADER_LEN, decode_inner_plaintext,
        encode_inner_plaintext, record_header,
    },
    key_schedule::{DerivedKeyMaterial, TrafficSecret, derive_next_secret},
    nonce::{NONCE_LEN, nonce_for},
};

/// AES-GCM authentication tag size (16 bytes)
pub const TAG_LEN: usize = 16;

/// Largest plaintext AES-GCM accepts under one nonce (2^36 bytes)
const AES_GCM_MAX_PLAINTEXT: usize = 1 << 36;

/// AEAD used for record protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AeadAlgorithm {
    /// AES-128-GCM (`TLS_AES_128_GCM_SHA256`)
    #[default]
    Aes128Gcm,
    /// AES-256-GCM with a SHA-256 schedule
    Aes256Gcm,
}

impl AeadAlgorithm {
    /// AEAD key length in bytes.
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }
}

impl TryFrom<usize> for AeadAlgorithm {
    type Error = RecordError;

    fn try_from(key_len: usize) -> Result<Self, Self::Error> {
        match key_len {
            16 => Ok(Self::Aes128Gcm),
            32 => Ok(Self::Aes256Gcm),
            other => Err(RecordError::UnsupportedKeyLength(other)),
        }
    }
}

/// Construction parameters for a [`RecordProtector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtectorConfig {
    /// AEAD and key size
    pub algorithm: AeadAlgorithm,
    /// Sequence number of the first record (usually 0)
    pub initial_sequence_number: u64,
}

impl ProtectorConfig {
    /// Build a config from a raw AEAD key length (16 or 32).
    pub fn with_key_length(
        aead_key_length: usize,
        initial_sequence_number: u64,
    ) -> Result<Self, RecordError> {
        Ok(Self { algorithm: AeadAlgorithm::try_from(aead_key_length)?, initial_sequence_number })
    }
}

/// Protector lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectorState {
    /// Accepting seal/open operations
    Active,
    /// Sequence space used up; only close or key update remain
    Exhausted,
    /// Key material discarded
    Closed,
}

/// Record protection for one direction of one epoch.
///
/// Every mutator takes `&mut self`, so a protector can never have two
/// operations in flight. Share one across tasks only behind a mutex.
pub struct RecordProtector {
    /// Traffic secret, kept for key update. `None` once closed.
    secret: Option<TrafficSecret>,
    /// Key and implicit IV. `None` once closed.
    keys: Option<DerivedKeyMaterial>,
    algorithm: AeadAlgorithm,
    /// Sequence number of the next record
    sequence_number: u64,
    state: ProtectorState,
}

impl RecordProtector {
    /// Derive key material from `secret` and start at the configured
    /// sequence number.
    pub fn new(secret: TrafficSecret, config: ProtectorConfig) -> Result<Self, RecordError> {
        let keys = DerivedKeyMaterial::derive(&secret, config.algorithm.key_len())?;

        tracing::debug!(
            algorithm = ?config.algorithm,
            initial_sequence_number = config.initial_sequence_number,
            "Created record protector"
        );

        Ok(Self {
            secret: Some(secret),
            keys: Some(keys),
            algorithm: config.algorithm,
            sequence_number: config.initial_sequence_number,
            state: ProtectorState::Active,
        })
    }

    /// Sequence number the next record will use.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProtectorState {
        self.state
    }

    /// AEAD this protector was built for.
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    /// Decrypt and authenticate `record` (`ciphertext || tag`).
    ///
    /// # Errors
    ///
    /// - `Closed` / `Exhausted`: protector no longer usable
    /// - `MalformedRecord`: record shorter than the tag, nothing changes
    /// - `Exhausted`: counter reached `u64::MAX`, protector becomes Exhausted
    /// - `AuthenticationFailed`: tag mismatch, counter does not move; the
    ///   connection must be torn down
    pub fn open(
        &mut self,
        associated_data: &[u8],
        record: &[u8],
    ) -> Result<Vec<u8>, RecordError> {
        self.ensure_active()?;

        if record.len() < TAG_LEN {
            return Err(RecordError::MalformedRecord {
                reason: format!(
                    "record is {} bytes, shorter than the {TAG_LEN}-byte tag",
                    record.len()
                ),
            });
        }

        let sequence_number = self.reserve_sequence_number()?;
        let keys = self.keys.as_ref().ok_or(RecordError::Closed)?;

        let (ciphertext, tag) = record.split_at(record.len() - TAG_LEN);
        let nonce = nonce_for(keys.implicit_iv(), sequence_number);

        let result = match self.algorithm {
            AeadAlgorithm::Aes128Gcm => {
                open_detached::<Aes128Gcm>(keys.key(), &nonce, associated_data, ciphertext, tag)
            },
            AeadAlgorithm::Aes256Gcm => {
                open_detached::<Aes256Gcm>(keys.key(), &nonce, associated_data, ciphertext, tag)
            },
        };

        let Some(plaintext) = result? else {
            tracing::warn!(
                sequence_number,
                record_len = record.len(),
                "Record authentication failed"
            );
            return Err(RecordError::AuthenticationFailed { sequence_number });
        };

        self.advance(sequence_number);
        tracing::trace!(sequence_number, plaintext_len = plaintext.len(), "Opened record");

        Ok(plaintext)
    }

    /// Encrypt `plaintext`, returning `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// - `Closed` / `Exhausted`: protector no longer usable
    /// - `Exhausted`: counter reached `u64::MAX`, protector becomes Exhausted
    /// - `RecordOverflow`: plaintext larger than AES-GCM allows
    pub fn seal(
        &mut self,
        associated_data: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, RecordError> {
        self.ensure_active()?;

        let sequence_number = self.reserve_sequence_number()?;
        let keys = self.keys.as_ref().ok_or(RecordError::Closed)?;
        let nonce = nonce_for(keys.implicit_iv(), sequence_number);

        let record = match self.algorithm {
            AeadAlgorithm::Aes128Gcm => {
                seal_detached::<Aes128Gcm>(keys.key(), &nonce, associated_data, plaintext)
            },
            AeadAlgorithm::Aes256Gcm => {
                seal_detached::<Aes256Gcm>(keys.key(), &nonce, associated_data, plaintext)
            },
        }?;

        self.advance(sequence_number);
        tracing::trace!(sequence_number, record_len = record.len(), "Sealed record");

        Ok(record)
    }

    /// Seal `content` as a complete TLS 1.3 record.
    ///
    /// Builds the inner plaintext (content, type, `padding` zero bytes),
    /// authenticates the outer header as associated data, and returns
    /// `header || ciphertext || tag`.
    pub fn seal_content(
        &mut self,
        content_type: ContentType,
        content: &[u8],
        padding: usize,
    ) -> Result<Vec<u8>, RecordError> {
        let mut inner = encode_inner_plaintext(content, content_type, padding)?;
        let header = record_header(inner.len() + TAG_LEN)?;

        let sealed = self.seal(&header, &inner);
        inner.zeroize();
        let sealed = sealed?;

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + sealed.len());
        record.extend_from_slice(&header);
        record.extend_from_slice(&sealed);
        Ok(record)
    }

    /// Open a TLS 1.3 record given its outer header and body.
    ///
    /// The header must announce `application_data` with a length equal to
    /// `record.len()`. Header problems are reported before any state change.
    ///
    /// # Errors
    ///
    /// - `MalformedRecord` / `RecordOverflow`: bad header or oversized
    ///   record, nothing changes
    /// - any error of [`open`](Self::open)
    /// - `UnexpectedMessage`: the record authenticated (and consumed its
    ///   sequence number) but its inner plaintext is invalid; connection-fatal
    pub fn open_content(
        &mut self,
        header: &[u8; RECORD_HEADER_LEN],
        record: &[u8],
    ) -> Result<(ContentType, Vec<u8>), RecordError> {
        if ContentType::from(header[0]) != ContentType::ApplicationData {
            return Err(RecordError::MalformedRecord {
                reason: format!("outer content type {} is not application_data", header[0]),
            });
        }

        let announced = usize::from(u16::from_be_bytes([header[3], header[4]]));
        if announced != record.len() {
            return Err(RecordError::MalformedRecord {
                reason: format!("header announces {announced} bytes, record has {}", record.len()),
            });
        }

        if record.len() > MAX_CIPHERTEXT_LEN {
            return Err(RecordError::RecordOverflow {
                length: record.len(),
                max: MAX_CIPHERTEXT_LEN,
            });
        }

        let sequence_number = self.sequence_number;
        let inner = self.open(header, record)?;

        decode_inner_plaintext(inner).map_err(|e| {
            tracing::warn!(
                sequence_number,
                error = %e,
                "Authenticated record has invalid inner plaintext"
            );
            RecordError::UnexpectedMessage { sequence_number }
        })
    }

    /// Replace this protector with one keyed from the next-generation secret.
    ///
    /// `self` is closed; the returned protector starts at sequence number 0
    /// with the same AEAD.
    pub fn update_keys(&mut self) -> Result<RecordProtector, RecordError> {
        let secret = self.secret.as_ref().ok_or(RecordError::Closed)?;
        let next_secret = derive_next_secret(secret)?;

        let next = RecordProtector::new(
            next_secret,
            ProtectorConfig { algorithm: self.algorithm, initial_sequence_number: 0 },
        )?;

        tracing::info!(
            retired_sequence_number = self.sequence_number,
            "Updated traffic keys"
        );
        self.close();

        Ok(next)
    }

    /// Discard all key material. Every later operation fails with `Closed`.
    pub fn close(&mut self) {
        if self.state == ProtectorState::Closed {
            return;
        }

        self.secret = None;
        self.keys = None;
        self.state = ProtectorState::Closed;

        tracing::info!(sequence_number = self.sequence_number, "Closed record protector");
    }

    fn ensure_active(&self) -> Result<(), RecordError> {
        match self.state {
            ProtectorState::Active => Ok(()),
            ProtectorState::Exhausted => Err(RecordError::Exhausted),
            ProtectorState::Closed => Err(RecordError::Closed),
        }
    }

    /// Sequence number for the next record, or transition to Exhausted if
    /// using it would leave no room to increment.
    fn reserve_sequence_number(&mut self) -> Result<u64, RecordError> {
        if self.sequence_number == u64::MAX {
            self.state = ProtectorState::Exhausted;
            tracing::error!(
                sequence_number = self.sequence_number,
                "Sequence number space exhausted, rekey required"
            );
            return Err(RecordError::Exhausted);
        }

        Ok(self.sequence_number)
    }

    fn advance(&mut self, used: u64) {
        debug_assert_eq!(used, self.sequence_number);
        debug_assert!(used < u64::MAX);

        self.sequence_number = used + 1;
    }
}

impl std::fmt::Debug for RecordProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordProtector")
            .field("algorithm", &self.algorithm)
            .field("sequence_number", &self.sequence_number)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Encrypt with a detached tag and append it to the ciphertext.
fn seal_detached<C>(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    associated_data: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, RecordError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| RecordError::UnsupportedKeyLength(key.len()))?;
    let nonce = Nonce::<C>::from(*nonce);

    let mut record = Vec::with_capacity(plaintext.len() + TAG_LEN);
    record.extend_from_slice(plaintext);

    let tag = cipher.encrypt_in_place_detached(&nonce, associated_data, &mut record).map_err(|_| {
        record.zeroize();
        RecordError::RecordOverflow { length: plaintext.len(), max: AES_GCM_MAX_PLAINTEXT }
    })?;

    record.extend_from_slice(&tag);
    Ok(record)
}

/// Verify `tag` and decrypt `ciphertext`.
///
/// Returns `Ok(None)` when the tag does not verify.
fn open_detached<C>(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Option<Vec<u8>>, RecordError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| RecordError::UnsupportedKeyLength(key.len()))?;
    let nonce = Nonce::<C>::from(*nonce);

    let tag: [u8; TAG_LEN] = tag.try_into().map_err(|_| RecordError::MalformedRecord {
        reason: format!("tag is {} bytes, expected {TAG_LEN}", tag.len()),
    })?;
    let tag = Tag::<C>::from(tag);

    let mut plaintext = ciphertext.to_vec();
    if cipher.decrypt_in_place_detached(&nonce, associated_data, &mut plaintext, &tag).is_err() {
        // Buffer may hold unauthenticated keystream output
        plaintext.zeroize();
        return Ok(None);
    }

    Ok(Some(plaintext))
}
