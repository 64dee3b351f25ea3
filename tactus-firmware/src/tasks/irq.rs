//! Interrupt path
//!
//! The edge task only records the edge with the device and never takes the
//! device lock. The service task reads the report under the lock and hands
//! it to the report channel.

use defmt::*;

use tactus_core::irq::Edge;
use tactus_hal_rp2040::gpio::IrqLine;

use crate::board::TouchDevice;
use crate::channels::publish_report;

/// IRQ edge task - forwards line edges to the device
#[embassy_executor::task]
pub async fn irq_edge_task(mut line: IrqLine<'static>, device: &'static TouchDevice) {
    info!("IRQ edge task started");

    loop {
        line.wait().await;
        match device.on_edge() {
            Edge::Service => trace!("IRQ edge"),
            Edge::Latched => trace!("IRQ edge latched while masked"),
            Edge::Ignored => {}
        }
        // A level trigger stays asserted until the report is read
        line.wait_idle().await;
    }
}

/// IRQ service task - reads reports for signalled edges
#[embassy_executor::task]
pub async fn irq_service_task(device: &'static TouchDevice) {
    info!("IRQ service task started");

    loop {
        device.wait_irq().await;
        match device.service_irq().await {
            Ok(Some(report)) => publish_report(report),
            Ok(None) => {}
            Err(e) => warn!("IRQ service failed: {:?}", e),
        }
    }
}
