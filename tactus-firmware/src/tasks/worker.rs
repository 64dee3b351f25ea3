//! Deferred task workers

use defmt::*;

use crate::board::TouchDevice;

/// Number of workers draining the device's task queue
pub const WORKER_COUNT: usize = 2;

/// Worker task - runs queued device tasks until the device is removed
#[embassy_executor::task(pool_size = WORKER_COUNT)]
pub async fn worker_task(id: usize, device: &'static TouchDevice) {
    info!("Worker {} started", id);
    device.run_worker().await;
    info!("Worker {} stopped", id);
}
