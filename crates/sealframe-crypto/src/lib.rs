//! Sealframe Record Protection
//!
//! The record layer of TLS 1.3 without the handshake or the socket: derive
//! traffic keys from a secret, then seal and open records under a strict
//! one-nonce-per-record discipline. Pure, synchronous, no I/O.
//!
//! # Key Lifecycle
//!
//! ```text
//! Traffic Secret (per direction, per epoch)
//!        │
//!        ├── HKDF-Expand-Label "key" → AEAD key
//!        ├── HKDF-Expand-Label "iv"  → implicit IV
//!        │                               │
//!        │            sequence number ── XOR → per-record nonce
//!        │                                        │
//!        │                               AES-GCM seal/open
//!        │
//!        └── HKDF-Expand-Label "traffic upd" → next Traffic Secret
//! ```
//!
//! A protector holds one direction's secret, key, IV and counter. It is
//! closed, and its key material zeroized, on key update or teardown.
//!
//! # Security
//!
//! Nonce uniqueness:
//! - The sequence number advances by exactly one per successful record
//! - It never wraps; reaching `u64::MAX` makes the protector Exhausted
//! - Only `seal` and `open` move it
//!
//! Authenticity:
//! - AES-GCM tag covers the ciphertext and the associated data (record header)
//! - Failed tag → `AuthenticationFailed`, which is connection-fatal
//!
//! Key hygiene:
//! - Secrets are never used as AEAD keys directly
//! - Secrets and derived keys are zeroized on drop and on close
//! - `Debug` output never contains key material

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod record;

pub use record::{
    AeadAlgorithm, ConnectionProtection, ConnectionSecrets, ContentType, DerivedKeyMaterial,
    DirectionSecret, NONCE_LEN, ProtectorConfig, ProtectorState, RecordError, RecordProtector,
    TAG_LEN, TrafficSecret, derive_implicit_iv, derive_key, derive_next_secret, expand_label,
    nonce_for,
};
