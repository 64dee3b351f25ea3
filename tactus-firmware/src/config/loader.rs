//! Configuration persistence
//!
//! Loads the touch configuration and the staged image manifest from flash
//! storage. Callers fall back to the embedded defaults if flash is empty.

extern crate alloc;

use alloc::vec;
use core::str;
use defmt::*;

use tactus_core::config::CONFIG_VERSION;
use tactus_hal_rp2040::flash::{FlashError, ImageManifest, Rp2040FlashStorage, StorageKey};
// Import the FlashStorage trait to bring methods into scope
use tactus_hal_rp2040::FlashStorageTrait;

use super::toml::parse_config;
use super::TouchConfig;

/// Maximum serialized config size (binary)
const MAX_CONFIG_SIZE: usize = 512;

/// Maximum TOML config size
const MAX_TOML_SIZE: usize = 2048;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Flash operation failed
    Flash(FlashError),
    /// Deserialization failed
    Deserialize,
    /// TOML parsing failed
    TomlParse,
    /// Invalid UTF-8 in TOML data
    InvalidUtf8,
    /// Config version mismatch
    VersionMismatch,
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}

/// Configuration persistence manager
pub struct ConfigPersistence<'d> {
    storage: Rp2040FlashStorage<'d>,
}

impl<'d> ConfigPersistence<'d> {
    pub fn new(storage: Rp2040FlashStorage<'d>) -> Self {
        Self { storage }
    }

    /// Consume this persistence manager and return the underlying storage
    ///
    /// The storage is handed on to the image partition once loading is done.
    pub fn into_storage(self) -> Rp2040FlashStorage<'d> {
        self.storage
    }

    /// Load configuration from flash
    ///
    /// Tries to load TOML config first, falls back to binary postcard format.
    pub async fn load(&mut self) -> Result<TouchConfig, ConfigError> {
        info!("Loading configuration from flash...");

        match self.load_toml().await {
            Ok(config) => {
                info!("Loaded configuration from TOML");
                return Ok(config);
            }
            Err(ConfigError::Flash(FlashError::NotFound)) => {
                debug!("No TOML config found, trying binary format");
            }
            Err(e) => {
                warn!("Failed to load TOML config: {:?}, trying binary", e);
            }
        }

        self.load_binary().await
    }

    /// Manifest of the staged controller image, if one was recorded
    pub async fn load_manifest(&mut self) -> Option<ImageManifest> {
        let mut buffer = [0u8; ImageManifest::ENCODED_LEN];
        match self.storage.read(StorageKey::ImageManifest, &mut buffer).await {
            Ok(len) => {
                let manifest = ImageManifest::from_bytes(&buffer[..len]);
                if manifest.is_none() {
                    warn!("Ignoring malformed image manifest");
                }
                manifest
            }
            Err(FlashError::NotFound) => None,
            Err(e) => {
                warn!("Failed to read image manifest: {:?}", e);
                None
            }
        }
    }

    async fn load_toml(&mut self) -> Result<TouchConfig, ConfigError> {
        // Heap buffer keeps the main task's future small
        let mut buffer = vec![0u8; MAX_TOML_SIZE];
        let len = self
            .storage
            .read(StorageKey::DeviceConfigToml, &mut buffer)
            .await?;

        debug!("Read {} bytes of TOML from flash", len);

        let toml_str = str::from_utf8(&buffer[..len]).map_err(|_| ConfigError::InvalidUtf8)?;
        let config = parse_config(toml_str).map_err(|e| {
            warn!("TOML parse error: {:?}", e);
            ConfigError::TomlParse
        })?;

        check_version(&config)?;
        log_config_summary(&config);
        Ok(config)
    }

    async fn load_binary(&mut self) -> Result<TouchConfig, ConfigError> {
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let len = self
            .storage
            .read(StorageKey::DeviceConfig, &mut buffer)
            .await?;

        debug!("Read {} bytes of binary config from flash", len);

        let config: TouchConfig =
            postcard::from_bytes(&buffer[..len]).map_err(|_| ConfigError::Deserialize)?;

        check_version(&config)?;
        log_config_summary(&config);
        Ok(config)
    }
}

fn check_version(config: &TouchConfig) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        warn!(
            "Config version mismatch: found {}, expected {}",
            config.version, CONFIG_VERSION
        );
        return Err(ConfigError::VersionMismatch);
    }
    Ok(())
}

/// Log a summary of the loaded configuration
pub fn log_config_summary(config: &TouchConfig) {
    info!("Configuration loaded successfully");
    debug!("  chip {:?} id {=u32:#x}", config.chip.kind, config.chip.chip_id);
    debug!("  bus {:?} at {} Hz", config.device.bus.style, config.device.bus.frequency_hz);
    debug!("  boot mode {:?}", config.system.boot_mode);
    debug!("  quirks {:?}", config.device.quirks);
}
