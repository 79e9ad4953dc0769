//! Persisted PID gains
//!
//! Gains tuned by the operator can be saved to non-volatile storage and
//! applied over the loaded configuration on the next boot. The record
//! carries a magic number, a version and a CRC32 so stale or corrupted
//! storage is rejected instead of driving the heaters with garbage.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::ThermalConfig;
use crate::channel::{ChannelId, CHANNEL_COUNT};
use crate::control::PidGains;

/// Magic number to identify a gains record
pub const GAINS_MAGIC: u32 = 0x5448_4d47; // "THMG"

/// Current gains record version
pub const GAINS_VERSION: u8 = 1;

/// Upper bound of an encoded record
pub const MAX_ENCODED_LEN: usize = 96;

/// Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Magic or version does not match
    InvalidHeader,
    /// Checksum mismatch
    CrcMismatch,
    /// Record could not be encoded
    Serialize,
    /// Record could not be decoded
    Deserialize,
}

/// Saved gains for one channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredChannelGains {
    /// Whether this slot holds saved gains
    pub valid: bool,
    /// Saved gains
    pub gains: PidGains,
}

/// Gains record for every channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredGains {
    /// Magic number for validation
    pub magic: u32,
    /// Record format version
    pub version: u8,
    /// Per-channel slots, indexed by [`ChannelId::index`]
    pub channels: [StoredChannelGains; CHANNEL_COUNT],
    /// CRC32 over magic, version and channels
    pub crc: u32,
}

impl Default for StoredGains {
    fn default() -> Self {
        Self::new()
    }
}

impl StoredGains {
    /// Create an empty record
    pub fn new() -> Self {
        let mut record = Self {
            magic: GAINS_MAGIC,
            version: GAINS_VERSION,
            channels: [StoredChannelGains::default(); CHANNEL_COUNT],
            crc: 0,
        };
        record.update_crc();
        record
    }

    /// Check if the header matches this firmware
    pub fn is_valid(&self) -> bool {
        self.magic == GAINS_MAGIC && self.version == GAINS_VERSION
    }

    /// Saved gains for a channel
    pub fn get(&self, id: ChannelId) -> Option<&PidGains> {
        let slot = &self.channels[id.index()];
        slot.valid.then_some(&slot.gains)
    }

    /// Save gains for a channel
    pub fn set(&mut self, id: ChannelId, gains: PidGains) {
        self.channels[id.index()] = StoredChannelGains { valid: true, gains };
        self.update_crc();
    }

    /// Forget saved gains for a channel
    pub fn clear(&mut self, id: ChannelId) {
        self.channels[id.index()] = StoredChannelGains::default();
        self.update_crc();
    }

    /// Calculate CRC32 for the record (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFF_FFFF;

        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);

        for slot in &self.channels {
            crc = crc32_update(crc, &[slot.valid as u8]);
            for gain in [slot.gains.kp, slot.gains.ki, slot.gains.kd, slot.gains.kc] {
                crc = crc32_update(crc, &gain.to_bits().to_le_bytes());
            }
        }

        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    /// Check header and checksum
    pub fn check(&self) -> Result<(), StoreError> {
        if !self.is_valid() {
            return Err(StoreError::InvalidHeader);
        }
        if !self.verify_crc() {
            return Err(StoreError::CrcMismatch);
        }
        Ok(())
    }

    /// Encode into `buf`, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], StoreError> {
        postcard::to_slice(self, buf).map_err(|_| StoreError::Serialize)
    }

    /// Decode and verify a stored record
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let record: Self = postcard::from_bytes(bytes).map_err(|_| StoreError::Deserialize)?;
        record.check()?;
        Ok(record)
    }
}

impl ThermalConfig {
    /// Overlay saved gains onto the configuration
    ///
    /// Slots that are empty or hold invalid gains are skipped. Returns the
    /// number of channels updated.
    pub fn apply_stored_gains(&mut self, stored: &StoredGains) -> Result<usize, StoreError> {
        stored.check()?;

        let mut applied = 0;
        for id in ChannelId::ALL {
            if let Some(gains) = stored.get(id).filter(|g| g.is_valid()) {
                self.channel_mut(id).gains = *gains;
                applied += 1;
            }
        }
        Ok(applied)
    }
}

/// Simple CRC32 update function (IEEE 802.3 polynomial)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        // Standard CRC-32 check value for "123456789"
        assert_eq!(!crc32_update(0xFFFF_FFFF, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_record() {
        let record = StoredGains::default();
        assert_eq!(record.check(), Ok(()));
        for id in ChannelId::ALL {
            assert!(record.get(id).is_none());
        }
    }

    #[test]
    fn test_set_get_clear() {
        let mut record = StoredGains::new();
        let gains = PidGains::new(15.0, 0.8, 90.0);
        record.set(ChannelId::Hotend1, gains);
        assert_eq!(record.get(ChannelId::Hotend1), Some(&gains));
        assert!(record.verify_crc());

        record.clear(ChannelId::Hotend1);
        assert!(record.get(ChannelId::Hotend1).is_none());
        assert!(record.verify_crc());
    }

    #[test]
    fn test_corruption_detected() {
        let mut record = StoredGains::new();
        record.set(ChannelId::Hotend0, PidGains::new(15.0, 0.8, 90.0));

        let mut corrupted = record;
        corrupted.channels[0].gains.kp = 150.0;
        assert_eq!(corrupted.check(), Err(StoreError::CrcMismatch));

        let mut wrong_version = record;
        wrong_version.version = GAINS_VERSION + 1;
        assert_eq!(wrong_version.check(), Err(StoreError::InvalidHeader));
    }

    #[test]
    fn test_apply_to_config() {
        let mut record = StoredGains::new();
        let gains = PidGains::new(15.0, 0.8, 90.0).with_kc(0.5);
        record.set(ChannelId::Hotend0, gains);
        record.set(ChannelId::Bed, PidGains::new(-1.0, 0.0, 0.0));

        let mut config = ThermalConfig::default();
        assert_eq!(config.apply_stored_gains(&record), Ok(1));
        assert_eq!(config.channel(ChannelId::Hotend0).gains, gains);
        assert_eq!(
            config.channel(ChannelId::Bed).gains,
            ThermalConfig::default().channel(ChannelId::Bed).gains
        );

        record.crc ^= 1;
        assert_eq!(
            config.apply_stored_gains(&record),
            Err(StoreError::CrcMismatch)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_storage_bytes_are_verified() {
        let mut record = StoredGains::new();
        record.set(ChannelId::Hotend0, PidGains::new(15.0, 0.8, 90.0));

        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = record.encode(&mut buf).unwrap().len();
        assert_eq!(StoredGains::decode(&buf[..len]), Ok(record));

        // Flip a bit inside the kp bytes
        buf[10] ^= 0x01;
        assert!(StoredGains::decode(&buf[..len]).is_err());
    }
}
