//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU32, Ordering};

use tactus_core::report::TouchReport;
use tactus_core::state::DisplayMode;

/// Channel capacity for touch reports
const REPORT_CHANNEL_SIZE: usize = 4;

/// Touch reports from the interrupt service task
pub static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, TouchReport, REPORT_CHANNEL_SIZE> =
    Channel::new();

/// Latest panel mode published by the display side
pub static DISPLAY_MODE: Signal<CriticalSectionRawMutex, DisplayMode> = Signal::new();

/// Reports dropped because the channel was full
static DROPPED_REPORTS: AtomicU32 = AtomicU32::new(0);

/// Queue a report, counting it if the consumer is behind
pub fn publish_report(report: TouchReport) {
    if REPORT_CHANNEL.try_send(report).is_err() {
        DROPPED_REPORTS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reports dropped so far
pub fn dropped_reports() -> u32 {
    DROPPED_REPORTS.load(Ordering::Relaxed)
}
