//! Configuration loading and parsing
//!
//! Loads the touch configuration from flash or embedded defaults.
//! Uses TOML format parsed by a custom no_std parser, with a postcard
//! binary record as the fallback.

pub mod loader;
pub mod toml;

pub use loader::ConfigPersistence;
pub use toml::parse_config;

use serde::{Deserialize, Serialize};

use tactus_core::config::{DeviceConfig, PinConfig, SystemConfig, CONFIG_VERSION};
use tactus_drivers::profile::{Basic, GestureConfig};

/// Which chip profile drives the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipKind {
    #[default]
    Basic,
    Gesture,
}

/// Chip profile selection and its tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipConfig {
    pub kind: ChipKind,
    /// Expected chip id
    pub chip_id: u32,
    // Gesture profile only
    pub report_rate_hz: u8,
    pub knock_taps: u8,
    pub knock_window_ms: u16,
    pub flash_chunk: u16,
}

impl Default for ChipConfig {
    fn default() -> Self {
        let gesture = GestureConfig::default();
        Self {
            kind: ChipKind::Basic,
            chip_id: Basic::DEFAULT_CHIP_ID,
            report_rate_hz: gesture.report_rate_hz,
            knock_taps: gesture.knock_taps,
            knock_window_ms: gesture.knock_window_ms,
            flash_chunk: gesture.flash_chunk as u16,
        }
    }
}

impl ChipConfig {
    /// Gesture profile parameters
    pub fn gesture(&self) -> GestureConfig {
        GestureConfig {
            chip_id: self.chip_id,
            report_rate_hz: self.report_rate_hz,
            knock_taps: self.knock_taps,
            knock_window_ms: self.knock_window_ms,
            flash_chunk: self.flash_chunk as usize,
        }
    }
}

/// Board wiring outside the controller itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// Panel power sense input; high while the panel is on
    pub display_pin: Option<PinConfig>,
    /// Forward USB VBUS presence as charger connection events
    pub vbus_sense: bool,
    /// Flash the staged controller image after the first probe
    pub upgrade_on_boot: bool,
}

/// Complete firmware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchConfig {
    /// Configuration version for compatibility checks
    pub version: u8,
    pub system: SystemConfig,
    pub device: DeviceConfig,
    pub chip: ChipConfig,
    pub board: BoardConfig,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            system: SystemConfig::default(),
            device: DeviceConfig::default(),
            chip: ChipConfig::default(),
            board: BoardConfig::default(),
        }
    }
}
