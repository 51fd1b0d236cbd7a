//! Fuzz target for record protection
//!
//! Drives a writer/reader protector pair through arbitrary operation
//! sequences and feeds the reader adversarial records.
//!
//! # Strategy
//!
//! - Arbitrary secrets, AEAD sizes and starting sequence numbers
//!   (including the last few values before u64::MAX)
//! - Seal/open of arbitrary payloads and associated data
//! - Truncated, bit-flipped and random records
//! - Content-typed records with arbitrary padding
//! - Key updates on either side
//!
//! # Invariants
//!
//! - No operation panics
//! - Synchronized seal/open round-trips exactly
//! - Corrupted records fail with AuthenticationFailed or MalformedRecord
//! - Rejected input (bad header, short record, failed tag) never moves the
//!   sequence number
//! - An authenticated record with an invalid inner plaintext is a fatal
//!   UnexpectedMessage that consumes its sequence number
//! - Successful operations move it by exactly one
//! - The counter never wraps

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealframe_crypto::{
    AeadAlgorithm, ContentType, ProtectorConfig, ProtectorState, RecordError, RecordProtector,
    TrafficSecret, expand_label,
};

#[derive(Debug, Clone, Arbitrary)]
struct RecordScenario {
    secret: [u8; 32],
    wide_key: bool,
    start: StartSequence,
    operations: Vec<RecordOperation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum StartSequence {
    Zero,
    NearMax(u8),
    Arbitrary(u64),
}

impl StartSequence {
    fn value(&self) -> u64 {
        match self {
            StartSequence::Zero => 0,
            StartSequence::NearMax(back) => u64::MAX - u64::from(*back % 4),
            StartSequence::Arbitrary(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum RecordOperation {
    /// Seal on the writer, open on the reader
    RoundTrip { aad: Vec<u8>, plaintext: Vec<u8> },
    /// Seal, flip one bit, open
    Corrupt { plaintext: Vec<u8>, position: u16, mask: u8 },
    /// Open attacker-chosen bytes
    Garbage { record: Vec<u8> },
    /// Seal and open a content-typed record
    Content { content_type: u8, content: Vec<u8>, padding: u8 },
    /// Rekey both sides
    UpdateKeys,
    /// Expand an arbitrary label
    Expand { label: Vec<u8>, context: Vec<u8>, len: u16 },
}

fuzz_target!(|scenario: RecordScenario| {
    let algorithm =
        if scenario.wide_key { AeadAlgorithm::Aes256Gcm } else { AeadAlgorithm::Aes128Gcm };
    let config = ProtectorConfig { algorithm, initial_sequence_number: scenario.start.value() };

    let Ok(mut writer) = RecordProtector::new(TrafficSecret::new(scenario.secret), config) else {
        return;
    };
    let Ok(mut reader) = RecordProtector::new(TrafficSecret::new(scenario.secret), config) else {
        return;
    };

    for op in scenario.operations {
        let reader_before = reader.sequence_number();

        match op {
            RecordOperation::RoundTrip { aad, plaintext } => {
                let writer_before = writer.sequence_number();
                match writer.seal(&aad, &plaintext) {
                    Ok(record) => {
                        // INVARIANT: success moves the counter by one
                        assert_eq!(writer.sequence_number(), writer_before + 1);

                        // INVARIANT: synchronized round-trip
                        let opened = reader.open(&aad, &record);
                        assert_eq!(opened, Ok(plaintext), "round-trip must succeed");
                        assert_eq!(reader.sequence_number(), reader_before + 1);
                    },
                    Err(RecordError::Exhausted) => {
                        // INVARIANT: never wraps
                        assert_eq!(writer.sequence_number(), u64::MAX);
                        assert_eq!(writer.state(), ProtectorState::Exhausted);
                        return;
                    },
                    Err(RecordError::Closed) => return,
                    Err(e) => unreachable!("unexpected seal error: {e}"),
                }
            },

            RecordOperation::Corrupt { plaintext, position, mask } => {
                if mask == 0 {
                    continue;
                }
                let Ok(mut record) = writer.seal(&[], &plaintext) else {
                    return;
                };
                let index = usize::from(position) % record.len();
                record[index] ^= mask;

                // INVARIANT: tampering is detected and costs nothing
                let result = reader.open(&[], &record);
                assert!(
                    matches!(result, Err(RecordError::AuthenticationFailed { .. })),
                    "corrupted record must fail authentication"
                );
                assert_eq!(reader.sequence_number(), reader_before);
                assert_eq!(reader.state(), ProtectorState::Active);

                // Authentication failure is connection-fatal
                return;
            },

            RecordOperation::Garbage { record } => match reader.open(&[], &record) {
                Ok(_) => {
                    assert_eq!(reader.sequence_number(), reader_before + 1);
                    return;
                },
                Err(RecordError::MalformedRecord { .. })
                | Err(RecordError::AuthenticationFailed { .. }) => {
                    // INVARIANT: rejected input never moves the counter
                    assert_eq!(reader.sequence_number(), reader_before);
                },
                Err(RecordError::Exhausted) | Err(RecordError::Closed) => return,
                Err(e) => unreachable!("unexpected open error: {e}"),
            },

            RecordOperation::Content { content_type, content, padding } => {
                let content_type = ContentType::from(content_type);
                let Ok(wire) = writer.seal_content(content_type, &content, usize::from(padding))
                else {
                    if writer.state() != ProtectorState::Active {
                        return;
                    }
                    continue;
                };

                let mut header = [0u8; 5];
                header.copy_from_slice(&wire[..5]);
                match reader.open_content(&header, &wire[5..]) {
                    Ok((opened_type, opened)) => {
                        assert_eq!(opened_type, content_type);
                        assert_eq!(opened, content);
                    },
                    Err(RecordError::Exhausted) => return,
                    Err(e) => unreachable!("content round-trip failed: {e}"),
                }
            },

            RecordOperation::UpdateKeys => {
                let (Ok(next_writer), Ok(next_reader)) =
                    (writer.update_keys(), reader.update_keys())
                else {
                    return;
                };
                assert_eq!(writer.state(), ProtectorState::Closed);
                assert_eq!(reader.state(), ProtectorState::Closed);
                writer = next_writer;
                reader = next_reader;
                assert_eq!(writer.sequence_number(), 0);
            },

            RecordOperation::Expand { label, context, len } => {
                // INVARIANT: expansion is deterministic and never panics
                let first = expand_label(&scenario.secret, &label, &context, usize::from(len));
                let second = expand_label(&scenario.secret, &label, &context, usize::from(len));
                assert_eq!(first, second);
                if let Ok(output) = first {
                    assert_eq!(output.len(), usize::from(len));
                }
            },
        }
    }
});
