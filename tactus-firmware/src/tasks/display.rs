//! Display state input
//!
//! The panel's power sense line is turned into display modes, which the
//! notify task delivers to the device as blocking notifications.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use tactus_core::event::EventId;
use tactus_core::state::DisplayMode;

use crate::board::TouchDevice;
use crate::channels::DISPLAY_MODE;

/// Settle time after a sense line edge
const DEBOUNCE_MS: u64 = 20;

/// Display sense task - publishes panel on/off from the sense line
#[embassy_executor::task]
pub async fn display_sense_task(mut pin: Input<'static>, inverted: bool) {
    info!("Display sense task started");

    let mut last = None;
    loop {
        let on = pin.is_high() != inverted;
        if last != Some(on) {
            last = Some(on);
            DISPLAY_MODE.signal(if on { DisplayMode::U3 } else { DisplayMode::U0 });
        }
        pin.wait_for_any_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
    }
}

/// Display notify task - delivers published modes to the device
#[embassy_executor::task]
pub async fn display_notify_task(device: &'static TouchDevice) {
    info!("Display notify task started");

    loop {
        let mode = DISPLAY_MODE.wait().await;
        debug!("Display mode {:?}", mode);
        if let Err(e) = device.notify(EventId::DisplayMode, mode.raw()).await {
            warn!("Display mode notification failed: {:?}", e);
        }
    }
}
