//! Touch report consumer
//!
//! Stands in for the host input stack: logs each report.

use defmt::*;

use crate::channels::REPORT_CHANNEL;

#[embassy_executor::task]
pub async fn report_task() {
    info!("Report task started");

    loop {
        let report = REPORT_CHANNEL.receive().await;
        if let Some(gesture) = report.gesture {
            info!("Wake gesture: {:?}", gesture);
        }
        for contact in report.contacts.iter() {
            debug!(
                "Contact {}: ({}, {}) p={}",
                contact.id, contact.x, contact.y, contact.pressure
            );
        }
        if report.is_empty() {
            trace!("All contacts lifted");
        }
    }
}
