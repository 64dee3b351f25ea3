//! Tactus - Touch Controller Firmware
//!
//! Main firmware binary for RP2040-based boards driving one touch
//! controller. Configuration-driven: the bus style, pins, chip profile and
//! quirks all come from `touch.toml` or its copy in flash.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{AnyPin, Input, Pull};
use embassy_rp::Peri;
use embassy_time::Timer;
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use tactus_core::bus::{FourWire, TwoWire};
use tactus_core::capability::ChipProfile;
use tactus_core::config::{BusStyle, SystemConfig};
use tactus_core::Device;
use tactus_drivers::profile::{Basic, Gesture};
use tactus_hal::i2c::TwoWireConfig;
use tactus_hal::spi::{FourWireConfig, Mode};
use tactus_hal_rp2040::flash::{ImagePartition, Rp2040FlashStorage};
use tactus_hal_rp2040::gpio::{IrqLine, ResetLine};
use tactus_hal_rp2040::i2c::TwoWireMaster;
use tactus_hal_rp2040::pin_bank;
use tactus_hal_rp2040::spi::FourWireMaster;

use crate::board::{BoardWire, RttTrace, TimerDelay, TouchDevice};
use crate::config::{parse_config, ChipKind, ConfigPersistence, TouchConfig};

mod board;
mod channels;
mod config;
mod tasks;

// Heap allocator for config loading
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 8KB
const HEAP_SIZE: usize = 8 * 1024;

/// Embedded default configuration (compiled into firmware)
/// Edit touch.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../touch.toml");

/// Pause between probe attempts
const PROBE_RETRY_MS: u64 = 500;

// Static cells (must live forever for task references)
static SYSTEM: StaticCell<SystemConfig> = StaticCell::new();
static BASIC: StaticCell<Basic> = StaticCell::new();
static GESTURE: StaticCell<Gesture> = StaticCell::new();
static IMAGE: StaticCell<ImagePartition<'static>> = StaticCell::new();
static DEVICE: StaticCell<TouchDevice> = StaticCell::new();
static TRACE: RttTrace = RttTrace;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tactus firmware starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Load configuration from flash (or use embedded defaults)
    let mut persistence = ConfigPersistence::new(Rp2040FlashStorage::new(p.FLASH, p.DMA_CH2));
    let config = match persistence.load().await {
        Ok(config) => config,
        Err(_) => {
            info!("No valid configuration in flash, using embedded defaults");
            create_default_config()
        }
    };

    // The flash moves to the image partition once loading is done
    let manifest = persistence.load_manifest().await;
    let image: &'static ImagePartition<'static> = IMAGE.init(
        persistence
            .into_storage()
            .into_image(manifest.unwrap_or_default()),
    );
    let image_ok = manifest.is_some() && image.verify();
    if manifest.is_some() && !image_ok {
        warn!("Staged controller image fails its checksum, upgrades disabled");
    }

    // Config-assignable GPIOs; bus pins are fixed by the board
    let mut bank = pin_bank!(
        p,
        PIN_2 = 2,
        PIN_3 = 3,
        PIN_6 = 6,
        PIN_7 = 7,
        PIN_10 = 10,
        PIN_11 = 11,
        PIN_12 = 12,
        PIN_13 = 13,
        PIN_14 = 14,
        PIN_15 = 15,
        PIN_20 = 20,
        PIN_21 = 21,
        PIN_22 = 22,
        PIN_26 = 26,
        PIN_27 = 27,
        PIN_28 = 28,
    );

    let device_config = &config.device;
    let (reset_pin, irq_pin) = match (
        bank.take(device_config.reset_pin.pin),
        bank.take(device_config.irq.pin.pin),
    ) {
        (Ok(reset), Ok(irq)) => (reset, irq),
        (reset, irq) => {
            error!(
                "Touch pins unavailable: reset {:?}, irq {:?}",
                reset.err(),
                irq.err()
            );
            return;
        }
    };
    let reset = ResetLine::new(reset_pin, &device_config.reset_pin);
    let irq_line = IrqLine::new(irq_pin, &device_config.irq);

    // Bus pins are board-specific (Pico: I2C0 on GPIO4/5, SPI0 on GPIO16-19)
    let wire = match device_config.bus.style {
        BusStyle::TwoWire => {
            let bus = TwoWireMaster::new(
                p.I2C0,
                p.PIN_5,
                p.PIN_4,
                TwoWireConfig {
                    frequency: device_config.bus.frequency_hz,
                },
            );
            BoardWire::TwoWire(TwoWire::new(bus, device_config.bus.address))
        }
        BusStyle::FourWire(addressing) => {
            let bus = FourWireMaster::new(
                p.SPI0,
                p.PIN_18,
                p.PIN_19,
                p.PIN_16,
                Peri::<AnyPin>::from(p.PIN_17),
                FourWireConfig {
                    frequency: device_config.bus.frequency_hz,
                    mode: Mode::Mode0,
                },
            );
            BoardWire::FourWire(FourWire::new(bus, addressing))
        }
    };
    info!("Touch bus initialized");

    let chip: &'static dyn ChipProfile = match config.chip.kind {
        ChipKind::Basic => BASIC.init(Basic::new(config.chip.chip_id)),
        ChipKind::Gesture => GESTURE.init(Gesture::new(config.chip.gesture())),
    };
    let system = SYSTEM.init(config.system);

    let device = match Device::new(config.device, system, chip, wire, reset, TimerDelay) {
        Ok(device) => device.with_trace(&TRACE),
        Err(e) => {
            error!("Touch device rejected its configuration: {:?}", e);
            return;
        }
    };
    let device = if image_ok {
        device.with_firmware(image)
    } else {
        device
    };
    let device: &'static TouchDevice = DEVICE.init(device);

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::irq_edge_task(irq_line, device)));
    unwrap!(spawner.spawn(tasks::irq_service_task(device)));
    for id in 0..tasks::worker::WORKER_COUNT {
        unwrap!(spawner.spawn(tasks::worker_task(id, device)));
    }
    unwrap!(spawner.spawn(tasks::report_task()));
    unwrap!(spawner.spawn(tasks::display_notify_task(device)));

    if let Some(pin_config) = config.board.display_pin {
        match bank.take(pin_config.pin) {
            Ok(pin) => {
                let pull = if pin_config.pull_up { Pull::Up } else { Pull::None };
                let sense = Input::new(pin, pull);
                unwrap!(spawner.spawn(tasks::display_sense_task(sense, pin_config.inverted)));
            }
            Err(e) => warn!("Display sense pin unavailable: {:?}", e),
        }
    }
    if config.board.vbus_sense {
        let vbus = Input::new(p.PIN_24, Pull::None);
        unwrap!(spawner.spawn(tasks::vbus_task(vbus, device)));
    }

    info!("All tasks spawned, probing touch controller");
    probe_until_settled(device).await;

    if config.board.upgrade_on_boot && image_ok {
        match device.request_upgrade() {
            Ok(_) => info!("Controller upgrade scheduled"),
            Err(e) => warn!("Controller upgrade refused: {:?}", e),
        }
    }

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        Timer::after_secs(60).await;
        let stats = device.bus_stats().await;
        debug!(
            "Heartbeat: {:?}, {} transfers, {} failures, {} reports dropped",
            device.state(),
            stats.transfers,
            stats.failures,
            channels::dropped_reports()
        );
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

/// Probe until the controller is up or the retry cap is spent
async fn probe_until_settled(device: &TouchDevice) {
    loop {
        match device.probe().await {
            Ok(()) => {
                info!("Touch controller up: {:?}", device.state());
                if let Some(info) = device.ic_info().await {
                    info!(
                        "Controller firmware {}.{} rev {}",
                        info.version.major, info.version.minor, info.revision
                    );
                }
                return;
            }
            Err(e) if device.state().failed => {
                error!("Touch controller probe gave up: {:?}", e);
                return;
            }
            Err(e) => {
                warn!("Touch controller probe failed: {:?}, retrying", e);
                Timer::after_millis(PROBE_RETRY_MS).await;
            }
        }
    }
}

/// Create the embedded default configuration
///
/// Parses the touch.toml file that was embedded at compile time.
/// This is used as a fallback when no flash config exists.
fn create_default_config() -> TouchConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config::loader::log_config_summary(&config);
            config
        }
        Err(e) => {
            // build.rs validates touch.toml, so this means the subset
            // parser and the build-time check disagree
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using built-in defaults");
            TouchConfig::default()
        }
    }
}
