//! Build script for tactus-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates touch.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate touch.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=touch.toml");

    let config_path = Path::new("touch.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("touch.toml could not be read", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in touch.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_touch(&config, &mut errors);
    validate_bus(&config, &mut errors);
    validate_board(&config, &mut errors);

    if !errors.is_empty() {
        fail("Invalid touch configuration", &errors);
    }

    println!("cargo:warning=touch.toml validated successfully");
}

/// Abort the build with a boxed error report
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<57}║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

fn check_choice(table: &toml::Table, section: &str, key: &str, choices: &[&str], errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::String(value)) if choices.contains(&value.as_str()) => {}
        Some(_) => errors.push(format!("[{}] {} must be one of {}", section, key, choices.join(", "))),
    }
}

fn check_pin(table: &toml::Table, section: &str, key: &str, errors: &mut Vec<String>) {
    let Some(value) = table.get(key) else { return };
    let valid = value
        .as_str()
        .map(|s| s.trim_start_matches(['!', '^']))
        .and_then(|s| s.strip_prefix("gpio"))
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| n < 30);
    if !valid {
        errors.push(format!("[{}] {} must look like \"gpio13\", \"!gpio13\" or \"^gpio13\"", section, key));
    }
}

fn check_range(table: &toml::Table, section: &str, key: &str, range: std::ops::RangeInclusive<i64>, errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(n)) if range.contains(n) => {}
        Some(_) => errors.push(format!(
            "[{}] {} must be {}-{}",
            section,
            key,
            range.start(),
            range.end()
        )),
    }
}

fn section<'a>(config: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Table> {
    path.iter()
        .try_fold(config, |value, key| value.get(key))
        .and_then(|value| value.as_table())
}

fn validate_touch(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(system) = section(config, &["system"]) {
        check_choice(system, "system", "boot_mode", &["normal", "charger_logo", "mfts"], errors);
    }

    let Some(touch) = section(config, &["touch"]) else {
        errors.push("Missing [touch] section".to_string());
        return;
    };
    check_choice(touch, "touch", "chip", &["basic", "gesture"], errors);
    check_choice(touch, "touch", "irq_trigger", &["falling", "rising", "low"], errors);
    check_pin(touch, "touch", "reset_pin", errors);
    check_pin(touch, "touch", "irq_pin", errors);
    check_range(touch, "touch", "chip_id", 0..=u32::MAX as i64, errors);
    check_range(touch, "touch", "init_delay_ms", 0..=u32::MAX as i64, errors);
    check_range(touch, "touch", "monitor_period_ms", 0..=u32::MAX as i64, errors);

    if touch.get("reset_pin").is_some() && touch.get("reset_pin") == touch.get("irq_pin") {
        errors.push("[touch] reset_pin and irq_pin must differ".to_string());
    }

    if let Some(gesture) = section(config, &["touch", "gesture"]) {
        check_range(gesture, "touch.gesture", "report_rate_hz", 1..=255, errors);
        check_range(gesture, "touch.gesture", "knock_taps", 1..=8, errors);
        check_range(gesture, "touch.gesture", "knock_window_ms", 1..=u16::MAX as i64, errors);
        // Gesture profile caps a flash chunk at 256 bytes
        check_range(gesture, "touch.gesture", "flash_chunk", 1..=256, errors);
    }
}

fn validate_bus(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bus) = section(config, &["touch", "bus"]) else { return };
    check_choice(bus, "touch.bus", "style", &["i2c", "spi"], errors);
    check_choice(bus, "touch.bus", "addressing", &["standard", "wide", "block"], errors);
    check_range(bus, "touch.bus", "address", 0x08..=0x77, errors);
    check_range(bus, "touch.bus", "frequency_hz", 1..=62_500_000, errors);
    // Transport scratch capacity
    check_range(bus, "touch.bus", "max_transfer", 1..=1024, errors);
    check_range(bus, "touch.bus", "max_segments", 1..=8, errors);
}

fn validate_board(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(board) = section(config, &["board"]) else { return };
    check_pin(board, "board", "display_pin", errors);
}
