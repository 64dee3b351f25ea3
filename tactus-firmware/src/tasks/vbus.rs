//! Charger detection
//!
//! The Pico senses USB VBUS on GPIO24. Changes are posted as connection
//! events through the device's atomic slot, which never waits for the
//! device lock.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use tactus_core::event::EventId;

use crate::board::TouchDevice;

/// Settle time after a VBUS edge
const DEBOUNCE_MS: u64 = 50;

#[embassy_executor::task]
pub async fn vbus_task(mut pin: Input<'static>, device: &'static TouchDevice) {
    info!("VBUS task started");

    let mut last = None;
    loop {
        let connected = pin.is_high();
        if last != Some(connected) {
            last = Some(connected);
            info!("Charger {}", if connected { "connected" } else { "disconnected" });
            if let Err(e) = device.notify_atomic(EventId::Connection, connected as u32) {
                warn!("Connection notification failed: {:?}", e);
            }
        }
        pin.wait_for_any_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
    }
}
