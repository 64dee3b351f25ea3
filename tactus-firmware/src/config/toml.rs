//! Simple TOML parser for the touch configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the Tactus configuration. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - Decimal and `0x` hex integers, with `_` separators
//! - [section] and [section.subsection] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys outside section headers
//!
//! Unknown keys are skipped so older firmware accepts newer files.

use tactus_core::config::{Addressing, BootMode, BusStyle, IrqTrigger, PinConfig};
use tactus_hal_rp2040::gpio::parse_pin_string;

use super::{ChipKind, TouchConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// Line is neither a header, a comment nor a key-value pair
    InvalidLine,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    System,
    Touch,
    TouchBus,
    TouchGesture,
    Board,
}

/// Bus settings resolved after the whole document is read, so `style`
/// and `addressing` may appear in either order
#[derive(Default)]
struct BusDraft {
    four_wire: bool,
    addressing: Addressing,
}

/// Parse TOML configuration into TouchConfig
pub fn parse_config(input: &str) -> Result<TouchConfig, ParseError> {
    let mut config = TouchConfig::default();
    let mut section = Section::Root;
    let mut bus = BusDraft::default();

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = parse_section_header(header)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config, &mut bus)?;
    }

    config.device.bus.style = if bus.four_wire {
        BusStyle::FourWire(bus.addressing)
    } else {
        BusStyle::TwoWire
    };

    Ok(config)
}

/// Parse section header like "touch" or "touch.bus"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "system" => Ok(Section::System),
        "touch" => Ok(Section::Touch),
        "touch.bus" => Ok(Section::TouchBus),
        "touch.gesture" => Ok(Section::TouchGesture),
        "board" => Ok(Section::Board),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut TouchConfig,
    bus: &mut BusDraft,
) -> Result<(), ParseError> {
    let device = &mut config.device;
    match (section, key) {
        (Section::Root, "version") => config.version = parse_int(value)?,

        (Section::System, "boot_mode") => {
            config.system.boot_mode = match parse_string(value)? {
                "normal" => BootMode::Normal,
                "charger_logo" => BootMode::ChargerLogo,
                "mfts" => BootMode::Mfts,
                _ => return Err(ParseError::InvalidValue),
            }
        }

        (Section::Touch, "chip") => {
            config.chip.kind = match parse_string(value)? {
                "basic" => ChipKind::Basic,
                "gesture" => ChipKind::Gesture,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        (Section::Touch, "chip_id") => config.chip.chip_id = parse_int(value)?,
        (Section::Touch, "reset_pin") => device.reset_pin = parse_pin(value)?,
        (Section::Touch, "irq_pin") => device.irq.pin = parse_pin(value)?,
        (Section::Touch, "irq_trigger") => {
            device.irq.trigger = match parse_string(value)? {
                "falling" => IrqTrigger::FallingEdge,
                "rising" => IrqTrigger::RisingEdge,
                "low" => IrqTrigger::LevelLow,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        (Section::Touch, "deferred_init") => device.quirks.deferred_init = parse_bool(value)?,
        (Section::Touch, "lpwg") => device.quirks.lpwg = parse_bool(value)?,
        (Section::Touch, "init_delay_ms") => device.timing.init_delay_ms = parse_int(value)?,
        (Section::Touch, "monitor_period_ms") => {
            device.timing.monitor_period_ms = parse_int(value)?
        }

        (Section::TouchBus, "style") => {
            bus.four_wire = match parse_string(value)? {
                "i2c" => false,
                "spi" => true,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        (Section::TouchBus, "addressing") => {
            bus.addressing = match parse_string(value)? {
                "standard" => Addressing::Standard,
                "wide" => Addressing::Wide,
                "block" => Addressing::Block,
                _ => return Err(ParseError::InvalidValue),
            }
        }
        (Section::TouchBus, "address") => device.bus.address = parse_int(value)?,
        (Section::TouchBus, "frequency_hz") => device.bus.frequency_hz = parse_int(value)?,
        (Section::TouchBus, "max_transfer") => device.bus.max_transfer = parse_int(value)?,
        (Section::TouchBus, "max_segments") => device.bus.max_segments = parse_int(value)?,

        (Section::TouchGesture, "report_rate_hz") => config.chip.report_rate_hz = parse_int(value)?,
        (Section::TouchGesture, "knock_taps") => config.chip.knock_taps = parse_int(value)?,
        (Section::TouchGesture, "knock_window_ms") => {
            config.chip.knock_window_ms = parse_int(value)?
        }
        (Section::TouchGesture, "flash_chunk") => config.chip.flash_chunk = parse_int(value)?,

        (Section::Board, "display_pin") => config.board.display_pin = Some(parse_pin(value)?),
        (Section::Board, "vbus_sense") => config.board.vbus_sense = parse_bool(value)?,
        (Section::Board, "upgrade_on_boot") => config.board.upgrade_on_boot = parse_bool(value)?,

        _ => {}
    }
    Ok(())
}

/// Split a `key = value` line, dropping any trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => Ok(inner),
        // Allow unquoted strings for simple values
        None => Ok(value),
    }
}

/// Parse an integer value, decimal or `0x` hex, `_` separators allowed
fn parse_int<T: TryFrom<u64>>(value: &str) -> Result<T, ParseError> {
    let (digits, radix) = match value.strip_prefix("0x") {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };
    if digits.is_empty() || digits.starts_with('_') {
        return Err(ParseError::InvalidValue);
    }

    let mut acc: u64 = 0;
    for c in digits.chars().filter(|&c| c != '_') {
        let digit = c.to_digit(radix).ok_or(ParseError::InvalidValue)?;
        acc = acc
            .checked_mul(radix as u64)
            .and_then(|a| a.checked_add(digit as u64))
            .ok_or(ParseError::InvalidValue)?;
    }
    T::try_from(acc).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a pin string like "gpio13", "!gpio13", "^gpio14"
fn parse_pin(value: &str) -> Result<PinConfig, ParseError> {
    parse_pin_string(parse_string(value)?).ok_or(ParseError::InvalidPin)
}
