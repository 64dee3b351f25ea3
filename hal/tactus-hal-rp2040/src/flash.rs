//! Flash storage driver for RP2040
//!
//! The top of flash is split into two partitions:
//!
//! ```text
//! ... program | image partition (256 KiB) | config partition (64 KiB) |
//! ```
//!
//! The config partition holds wear-leveled key-value records through
//! sequential-storage. The image partition holds a raw controller firmware
//! image, staged by the host, whose length and checksum are recorded under
//! [`StorageKey::ImageManifest`].

use core::cell::RefCell;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use sequential_storage::cache::NoCache;
use sequential_storage::map;
use tactus_core::capability::FirmwareSource;

// Re-export shared types from tactus-hal
pub use tactus_hal::flash::{FlashError, StorageKey};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024;
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;
pub const IMAGE_PARTITION_SIZE: usize = 256 * 1024;
pub const IMAGE_PARTITION_START: usize = CONFIG_PARTITION_START - IMAGE_PARTITION_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Largest record stored in the config partition
const RECORD_BUFFER: usize = 2048;

type RpFlash<'d> = Flash<'d, FLASH, Async, FLASH_SIZE>;

/// RP2040 Flash storage implementation
///
/// Provides wear-leveled key-value storage for configuration data.
pub struct Rp2040FlashStorage<'d> {
    flash: RpFlash<'d>,
}

impl<'d> Rp2040FlashStorage<'d> {
    /// Create a new flash storage instance
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }

    /// Give up the key-value view and hand the flash to the image partition
    pub fn into_image(self, manifest: ImageManifest) -> ImagePartition<'d> {
        ImagePartition {
            flash: Mutex::new(RefCell::new(self.flash)),
            manifest,
        }
    }
}

impl tactus_hal::FlashStorage for Rp2040FlashStorage<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut data_buffer = [0u8; RECORD_BUFFER];

        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(FlashError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(FlashError::NotFound),
            Err(_) => Err(FlashError::Storage),
        }
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut data_buffer = [0u8; RECORD_BUFFER];

        map::store_item(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|_| FlashError::Storage)
    }
}

/// Length and checksum of the staged image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageManifest {
    pub len: u32,
    /// Wrapping byte sum of the image
    pub checksum: u32,
}

impl ImageManifest {
    /// Encoded size in the config partition
    pub const ENCODED_LEN: usize = 8;

    /// Decode a stored manifest; `None` if malformed or out of range
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        let raw: &[u8; Self::ENCODED_LEN] = raw.try_into().ok()?;
        let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let checksum = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if len as usize > IMAGE_PARTITION_SIZE {
            return None;
        }
        Some(Self { len, checksum })
    }

    pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut raw = [0u8; Self::ENCODED_LEN];
        raw[..4].copy_from_slice(&self.len.to_le_bytes());
        raw[4..].copy_from_slice(&self.checksum.to_le_bytes());
        raw
    }
}

/// Staged controller firmware, read straight from flash
///
/// Reads are blocking; the runtime pulls the image chunk by chunk while it
/// holds the device lock.
pub struct ImagePartition<'d> {
    flash: Mutex<CriticalSectionRawMutex, RefCell<RpFlash<'d>>>,
    manifest: ImageManifest,
}

impl ImagePartition<'_> {
    pub fn manifest(&self) -> ImageManifest {
        self.manifest
    }

    /// Recompute the image checksum and compare it with the manifest
    pub fn verify(&self) -> bool {
        let mut chunk = [0u8; 256];
        let mut sum = 0u32;
        let mut offset = 0;
        while offset < self.size() {
            match self.read(offset, &mut chunk) {
                Ok(0) | Err(_) => return false,
                Ok(count) => {
                    sum = chunk[..count]
                        .iter()
                        .fold(sum, |acc, &byte| acc.wrapping_add(byte as u32));
                    offset += count;
                }
            }
        }
        sum == self.manifest.checksum
    }
}

impl FirmwareSource for ImagePartition<'_> {
    fn size(&self) -> usize {
        self.manifest.len as usize
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> tactus_core::Result<usize> {
        let count = self.size().saturating_sub(offset).min(buf.len());
        if count == 0 {
            return Ok(0);
        }
        let address = (IMAGE_PARTITION_START + offset) as u32;
        self.flash.lock(|flash| {
            flash
                .borrow_mut()
                .blocking_read(address, &mut buf[..count])
                .map_err(|_| tactus_core::Error::BusError)
        })?;
        Ok(count)
    }
}
