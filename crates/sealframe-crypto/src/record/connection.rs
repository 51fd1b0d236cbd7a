//! Read/write protector pair for one connection
//!
//! Each direction has its own secret and its own sequence counter; nothing is
//! shared between them. A connection that was handed over mid-stream starts
//! each direction at the sequence number the previous owner stopped at.

use super::{
    error::RecordError,
    key_schedule::TrafficSecret,
    protector::{AeadAlgorithm, ProtectorConfig, RecordProtector},
};

/// Secret and starting sequence number for one direction.
#[derive(Debug)]
pub struct DirectionSecret {
    /// Traffic secret for this direction
    pub secret: TrafficSecret,
    /// Sequence number of the next record in this direction
    pub sequence_number: u64,
}

/// Everything needed to protect both directions of a connection.
#[derive(Debug)]
pub struct ConnectionSecrets {
    /// AEAD shared by both directions
    pub algorithm: AeadAlgorithm,
    /// Secret for records we receive
    pub read: DirectionSecret,
    /// Secret for records we send
    pub write: DirectionSecret,
}

/// The two independent protectors owned by a connection.
#[derive(Debug)]
pub struct ConnectionProtection {
    read: RecordProtector,
    write: RecordProtector,
}

impl ConnectionProtection {
    /// Build both directions from their secrets.
    pub fn new(secrets: ConnectionSecrets) -> Result<Self, RecordError> {
        let ConnectionSecrets { algorithm, read, write } = secrets;

        let read = RecordProtector::new(
            read.secret,
            ProtectorConfig { algorithm, initial_sequence_number: read.sequence_number },
        )?;
        let write = RecordProtector::new(
            write.secret,
            ProtectorConfig { algorithm, initial_sequence_number: write.sequence_number },
        )?;

        Ok(Self { read, write })
    }

    /// Protector for incoming records.
    pub fn read(&self) -> &RecordProtector {
        &self.read
    }

    /// Protector for outgoing records.
    pub fn write(&self) -> &RecordProtector {
        &self.write
    }

    /// Seal an outgoing record.
    pub fn seal(
        &mut self,
        associated_data: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, RecordError> {
        self.write.seal(associated_data, plaintext)
    }

    /// Open an incoming record.
    pub fn open(
        &mut self,
        associated_data: &[u8],
        record: &[u8],
    ) -> Result<Vec<u8>, RecordError> {
        self.read.open(associated_data, record)
    }

    /// Rekey the receive direction after the peer's `KeyUpdate`.
    pub fn update_read_keys(&mut self) -> Result<(), RecordError> {
        self.read = self.read.update_keys()?;
        Ok(())
    }

    /// Rekey the send direction after sending our own `KeyUpdate`.
    pub fn update_write_keys(&mut self) -> Result<(), RecordError> {
        self.write = self.write.update_keys()?;
        Ok(())
    }

    /// Close both directions.
    pub fn close(&mut self) {
        self.read.close();
        self.write.close();
    }
}
