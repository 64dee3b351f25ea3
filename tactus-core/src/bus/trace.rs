//! Diagnostic mirror
//!
//! A side channel receiving every bus transfer and every delivered event.
//! Nothing in the runtime reads it back.

use crate::error::Error;

/// What a trace record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceKind {
    /// Register read; `code` is the offset
    Read,
    /// Register write; `code` is the offset
    Write,
    /// Delivered notification; `code` is the event code
    Event,
}

/// One mirrored operation
#[derive(Debug, Clone, Copy)]
pub struct TraceRecord<'a> {
    pub kind: TraceKind,
    pub code: u32,
    pub payload: &'a [u8],
    pub result: Result<(), Error>,
}

/// Receiver for trace records
///
/// Called with the Device Context lock held; implementations must not block.
pub trait TraceSink: Sync {
    fn record(&self, record: &TraceRecord<'_>);
}

/// Mirror a record into an optional sink
#[inline]
pub(crate) fn mirror(sink: Option<&dyn TraceSink>, record: TraceRecord<'_>) {
    if let Some(sink) = sink {
        sink.record(&record);
    }
}
