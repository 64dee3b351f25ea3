//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals or
//! through the shared touch device.

pub mod display;
pub mod irq;
pub mod report;
pub mod vbus;
pub mod worker;

pub use display::{display_notify_task, display_sense_task};
pub use irq::{irq_edge_task, irq_service_task};
pub use report::report_task;
pub use vbus::vbus_task;
pub use worker::worker_task;
