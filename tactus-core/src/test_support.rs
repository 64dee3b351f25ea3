//! Host test doubles
//!
//! A register-file bus, a scriptable chip profile and recording sinks.
//! Everything is shared through `Arc` so a test can keep a handle after
//! moving the double into a device.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use tactus_hal::OutputPin;

use crate::bus::{RegisterIo, Scratch, TraceKind, TraceRecord, TraceSink, Wire, WireFault};
use crate::capability::{
    AscMode, ChipProfile, ChipTraits, FirmwareSource, Health, LpwgMode, PowerCommand, ResetKind,
    Slot,
};
use crate::config::BusStyle;
use crate::error::{Error, Result};
use crate::event::{Listener, Notification, Verdict};
use crate::report::{IcInfo, TouchReport, Version};

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// One operation seen by [`MockWire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Read { offset: u16, len: usize },
    Write { offset: u16, data: Vec<u8> },
}

struct MockBus {
    regs: Vec<u8>,
    ops: Vec<BusOp>,
    fail: bool,
    fail_after: Option<usize>,
}

/// Wire backed by a 64 KiB register file
#[derive(Clone)]
pub struct MockWire {
    style: BusStyle,
    bus: Arc<Mutex<MockBus>>,
}

impl MockWire {
    pub fn new(style: BusStyle) -> Self {
        Self {
            style,
            bus: Arc::new(Mutex::new(MockBus {
                regs: vec![0; 0x10000 + crate::bus::MAX_TRANSFER],
                ops: Vec::new(),
                fail: false,
                fail_after: None,
            })),
        }
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.bus.lock().unwrap().ops.clone()
    }

    pub fn op_count(&self) -> usize {
        self.bus.lock().unwrap().ops.len()
    }

    /// Fail every operation from now on
    pub fn set_fail(&self, fail: bool) {
        self.bus.lock().unwrap().fail = fail;
    }

    /// Fail every operation once `count` more have succeeded
    pub fn fail_after(&self, count: usize) {
        let mut bus = self.bus.lock().unwrap();
        bus.fail_after = Some(bus.ops.len() + count);
    }

    pub fn set_reg(&self, offset: u16, data: &[u8]) {
        let mut bus = self.bus.lock().unwrap();
        let start = offset as usize;
        bus.regs[start..start + data.len()].copy_from_slice(data);
    }

    pub fn reg(&self, offset: u16, len: usize) -> Vec<u8> {
        let bus = self.bus.lock().unwrap();
        let start = offset as usize;
        bus.regs[start..start + len].to_vec()
    }

    fn decode_offset(&self, header: &[u8]) -> u16 {
        let offset = u16::from_be_bytes([header[0], header[1]]);
        match self.style {
            BusStyle::TwoWire => offset,
            BusStyle::FourWire(_) => offset & 0x7FFF,
        }
    }

    fn record(&self, op: BusOp) -> core::result::Result<MutexGuardBus<'_>, WireFault> {
        let mut bus = self.bus.lock().unwrap();
        bus.ops.push(op);
        let failing = bus.fail || bus.fail_after.is_some_and(|limit| bus.ops.len() > limit);
        if failing {
            Err(WireFault)
        } else {
            Ok(bus)
        }
    }
}

type MutexGuardBus<'a> = std::sync::MutexGuard<'a, MockBus>;

impl Wire for MockWire {
    fn style(&self) -> BusStyle {
        self.style
    }

    fn write(&mut self, frame: &[u8]) -> core::result::Result<(), WireFault> {
        let framing = self.framing();
        let offset = self.decode_offset(frame);
        let data = &frame[framing.write_header + framing.write_dummy..];

        let mut bus = self.record(BusOp::Write {
            offset,
            data: data.to_vec(),
        })?;
        let start = offset as usize;
        bus.regs[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(
        &mut self,
        header: &[u8],
        dummy: usize,
        data: &mut [u8],
        _scratch: &mut Scratch,
    ) -> core::result::Result<(), WireFault> {
        let framing = self.framing();
        assert_eq!(header.len(), framing.read_header);
        assert_eq!(dummy, framing.read_dummy);
        if let BusStyle::FourWire(_) = self.style {
            assert_eq!(header[0] & 0x80, 0x80);
            assert_eq!(u16::from_be_bytes([header[2], header[3]]) as usize, data.len());
        }

        let offset = self.decode_offset(header);
        let bus = self.record(BusOp::Read {
            offset,
            len: data.len(),
        })?;
        let start = offset as usize;
        data.copy_from_slice(&bus.regs[start..start + data.len()]);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Owned copy of a [`TraceRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub kind: TraceKind,
    pub code: u32,
    pub payload: Vec<u8>,
    pub result: Result<()>,
}

/// Trace sink keeping every record
#[derive(Default)]
pub struct TraceLog {
    records: Mutex<Vec<Recorded>>,
}

impl TraceLog {
    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.records()
            .into_iter()
            .filter(|r| r.kind == TraceKind::Event)
            .collect()
    }
}

impl TraceSink for TraceLog {
    fn record(&self, record: &TraceRecord<'_>) {
        self.records.lock().unwrap().push(Recorded {
            kind: record.kind,
            code: record.code,
            payload: record.payload.to_vec(),
            result: record.result,
        });
    }
}

/// Listener that records what it sees and answers a fixed verdict
pub struct RecordingListener {
    verdict: Verdict,
    seen: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Listener for RecordingListener {
    fn on_event(&self, note: &Notification) -> Verdict {
        self.seen.lock().unwrap().push(*note);
        self.verdict
    }
}

// ---------------------------------------------------------------------------
// Timing and pins
// ---------------------------------------------------------------------------

/// Delay that returns at once and adds up what was asked for
#[derive(Clone, Default)]
pub struct CountingDelay {
    total_ns: Arc<AtomicU64>,
}

impl CountingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed) / 1_000_000
    }
}

impl DelayNs for CountingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns.fetch_add(ns as u64, Ordering::Relaxed);
    }
}

/// Reset line recording every level change
#[derive(Clone, Default)]
pub struct MockPin {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl MockPin {
    /// Number of times the line was driven low
    pub fn pulses(&self) -> usize {
        self.levels.lock().unwrap().iter().filter(|high| !**high).count()
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.levels.lock().unwrap().push(true);
    }

    fn set_low(&mut self) {
        self.levels.lock().unwrap().push(false);
    }

    fn is_set_high(&self) -> bool {
        self.levels.lock().unwrap().last().copied().unwrap_or(true)
    }
}

/// Firmware image held in memory
pub struct MockFirmware {
    image: Vec<u8>,
}

impl MockFirmware {
    pub fn new(image: &[u8]) -> Self {
        Self {
            image: image.to_vec(),
        }
    }
}

impl FirmwareSource for MockFirmware {
    fn size(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let rest = self.image.get(offset..).unwrap_or(&[]);
        let count = rest.len().min(buf.len());
        buf[..count].copy_from_slice(&rest[..count]);
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Chip
// ---------------------------------------------------------------------------

/// Registers the mock chip touches
pub mod reg {
    pub const ID: u16 = 0x0000;
    pub const POWER: u16 = 0x0010;
    pub const RESET: u16 = 0x0011;
    pub const INFO: u16 = 0x0020;
    pub const INIT: u16 = 0x0030;
    pub const REPORT: u16 = 0x0040;
    pub const NOTIFY: u16 = 0x0050;
    pub const LPWG: u16 = 0x0060;
    pub const ASC: u16 = 0x0070;
    pub const HEALTH: u16 = 0x0080;
    pub const TEST_ACK: u16 = 0x0090;
    pub const COMMAND: u16 = 0x0100;
    pub const IMAGE: u16 = 0x1000;
}

/// Call seen by [`MockChip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Probe,
    Reset(ResetKind),
    Power(PowerCommand),
    IcInfo,
    Init,
    ReadReport,
    Notify(Notification),
    Lpwg(LpwgMode),
    Asc(AscMode),
    Health,
    Upgrade(usize),
    TestModeAck,
    Set(u32),
    Get(u32),
}

/// Scriptable chip profile doing real register I/O
pub struct MockChip {
    traits: ChipTraits,
    mandatory: bool,
    advisory: bool,
    fail_probe: AtomicBool,
    abnormal_report: AtomicBool,
    gesture_report: AtomicBool,
    unhealthy: AtomicBool,
    ack_after: AtomicU32,
    calls: Mutex<Vec<Call>>,
}

impl MockChip {
    /// Every slot populated
    pub fn full() -> Self {
        Self {
            traits: ChipTraits::new("mock"),
            mandatory: true,
            advisory: true,
            fail_probe: AtomicBool::new(false),
            abnormal_report: AtomicBool::new(false),
            gesture_report: AtomicBool::new(false),
            unhealthy: AtomicBool::new(false),
            ack_after: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mandatory slots only
    pub fn mandatory_only() -> Self {
        Self {
            advisory: false,
            ..Self::full()
        }
    }

    /// Nothing populated
    pub fn bare() -> Self {
        Self {
            mandatory: false,
            advisory: false,
            ..Self::full()
        }
    }

    pub fn with_lpwg(mut self) -> Self {
        self.traits.lpwg = true;
        self
    }

    pub fn with_health_check(mut self) -> Self {
        self.traits.health_check = true;
        self
    }

    pub fn with_retry_cap(mut self, cap: u8) -> Self {
        self.traits.probe_retry_cap = cap;
        self
    }

    pub fn set_fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::Relaxed);
    }

    pub fn set_abnormal(&self, abnormal: bool) {
        self.abnormal_report.store(abnormal, Ordering::Relaxed);
    }

    pub fn set_gesture(&self, gesture: bool) {
        self.gesture_report.store(gesture, Ordering::Relaxed);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::Relaxed);
    }

    /// Acknowledge test mode on the `polls`-th check
    pub fn ack_after(&self, polls: u32) {
        self.ack_after.store(polls, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn mandatory<T>(&self, call: Call, f: impl FnOnce() -> Result<T>) -> Slot<T> {
        if !self.mandatory {
            return None;
        }
        self.log(call);
        Some(f())
    }

    fn advisory<T>(&self, call: Call, f: impl FnOnce() -> Result<T>) -> Slot<T> {
        if !self.advisory {
            return None;
        }
        self.log(call);
        Some(f())
    }
}

impl ChipProfile for MockChip {
    fn traits(&self) -> ChipTraits {
        self.traits
    }

    fn probe(&self, io: &mut dyn RegisterIo) -> Slot<()> {
        self.mandatory(Call::Probe, || {
            io.read_u32(reg::ID)?;
            if self.fail_probe.load(Ordering::Relaxed) {
                Err(Error::BusError)
            } else {
                Ok(())
            }
        })
    }

    fn reset(&self, io: &mut dyn RegisterIo, kind: ResetKind) -> Slot<()> {
        self.mandatory(Call::Reset(kind), || io.write(reg::RESET, &[kind as u8]))
    }

    fn power(&self, io: &mut dyn RegisterIo, command: PowerCommand) -> Slot<()> {
        self.mandatory(Call::Power(command), || io.write(reg::POWER, &[command as u8]))
    }

    fn ic_info(&self, io: &mut dyn RegisterIo) -> Slot<IcInfo> {
        self.mandatory(Call::IcInfo, || {
            let mut raw = [0u8; 3];
            io.read(reg::INFO, &mut raw)?;
            Ok(IcInfo {
                version: Version {
                    major: raw[0],
                    minor: raw[1],
                },
                product_id: *b"MOCK\0\0\0\0",
                revision: raw[2],
            })
        })
    }

    fn init(&self, io: &mut dyn RegisterIo) -> Slot<()> {
        self.advisory(Call::Init, || io.write(reg::INIT, &[1]))
    }

    fn read_report(&self, io: &mut dyn RegisterIo) -> Slot<TouchReport> {
        self.mandatory(Call::ReadReport, || {
            let mut raw = [0u8; 4];
            io.read(reg::REPORT, &mut raw)?;
            let mut report = if self.gesture_report.load(Ordering::Relaxed) {
                TouchReport::gesture(crate::report::Gesture::KnockOn)
            } else {
                TouchReport::default()
            };
            report.abnormal = self.abnormal_report.load(Ordering::Relaxed);
            Ok(report)
        })
    }

    fn notify(&self, io: &mut dyn RegisterIo, note: &Notification) -> Slot<()> {
        self.advisory(Call::Notify(*note), || {
            io.write(reg::NOTIFY, &note.event.code().to_le_bytes())
        })
    }

    fn lpwg_configure(&self, io: &mut dyn RegisterIo, mode: LpwgMode) -> Slot<()> {
        self.advisory(Call::Lpwg(mode), || io.write(reg::LPWG, &[mode as u8]))
    }

    fn asc(&self, io: &mut dyn RegisterIo, mode: AscMode) -> Slot<()> {
        self.advisory(Call::Asc(mode), || io.write(reg::ASC, &[mode as u8]))
    }

    fn health_check(&self, io: &mut dyn RegisterIo) -> Slot<Health> {
        self.advisory(Call::Health, || {
            io.read_u32(reg::HEALTH)?;
            Ok(if self.unhealthy.load(Ordering::Relaxed) {
                Health::Abnormal
            } else {
                Health::Healthy
            })
        })
    }

    fn upgrade(&self, io: &mut dyn RegisterIo, image: &dyn FirmwareSource) -> Slot<()> {
        self.mandatory(Call::Upgrade(image.size()), || {
            let mut chunk = [0u8; 64];
            let mut offset = 0;
            while offset < image.size() {
                let count = image.read(offset, &mut chunk)?;
                if count == 0 {
                    return Err(Error::BusError);
                }
                io.write(reg::IMAGE, &chunk[..count])?;
                offset += count;
            }
            Ok(())
        })
    }

    fn test_mode_ack(&self, io: &mut dyn RegisterIo) -> Slot<bool> {
        self.mandatory(Call::TestModeAck, || {
            io.read_u32(reg::TEST_ACK)?;
            let remaining = self.ack_after.load(Ordering::Relaxed);
            if remaining <= 1 {
                Ok(remaining == 1)
            } else {
                self.ack_after.store(remaining - 1, Ordering::Relaxed);
                Ok(false)
            }
        })
    }

    fn set(&self, io: &mut dyn RegisterIo, command: u32, data: &[u8]) -> Slot<()> {
        self.mandatory(Call::Set(command), || io.write(reg::COMMAND + command as u16, data))
    }

    fn get(&self, io: &mut dyn RegisterIo, command: u32, out: &mut [u8]) -> Slot<usize> {
        self.mandatory(Call::Get(command), || {
            io.read(reg::COMMAND + command as u16, out)?;
            Ok(out.len())
        })
    }
}
