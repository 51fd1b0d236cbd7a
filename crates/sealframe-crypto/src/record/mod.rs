//! TLS 1.3 record protection.
//!
//! A traffic secret comes in from the handshake. The key schedule expands it
//! into an AEAD key and an implicit IV, the nonce sequencer turns the IV and
//! a per-direction sequence number into a fresh nonce for every record, and
//! the protector runs AES-GCM over the record.
//!
//! # Security
//!
//! Nonce uniqueness is the whole game: the counter only moves forward, only
//! on success, and never wraps. Authentication failures and counter
//! exhaustion are connection-fatal and are never retried internally.

pub mod connection;
pub mod error;
pub mod inner;
pub mod key_schedule;
pub mod nonce;
pub mod protector;

pub use connection::{ConnectionProtection, ConnectionSecrets, DirectionSecret};
pub use error::RecordError;
pub use inner::{ContentType, decode_inner_plaintext, encode_inner_plaintext, record_header};
pub use key_schedule::{
    DerivedKeyMaterial, TrafficSecret, derive_implicit_iv, derive_key, derive_next_secret,
    expand_label,
};
pub use nonce::{NONCE_LEN, nonce_for};
pub use protector::{AeadAlgorithm, ProtectorConfig, ProtectorState, RecordProtector, TAG_LEN};
