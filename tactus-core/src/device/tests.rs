use super::*;
use crate::bus::TraceKind;
use crate::config::{Addressing, BusConfig, BusStyle};
use crate::state::DisplayMode;
use crate::test_support::{
    reg, Call, CountingDelay, MockChip, MockFirmware, MockPin, MockWire, RecordingListener, TraceLog,
};
use embassy_futures::block_on;
use embassy_futures::join::join;

static NORMAL: SystemConfig = SystemConfig::new(BootMode::Normal);
static CHARGER: SystemConfig = SystemConfig::new(BootMode::ChargerLogo);
static FACTORY: SystemConfig = SystemConfig::new(BootMode::Mfts);

type TestDevice<'a> = Device<'a, MockChip, MockWire, MockPin, CountingDelay>;

/// Handles kept by the test after the doubles move into the device
struct Rig {
    wire: MockWire,
    pin: MockPin,
    delay: CountingDelay,
}

impl Rig {
    fn new(style: BusStyle) -> Self {
        Self {
            wire: MockWire::new(style),
            pin: MockPin::default(),
            delay: CountingDelay::default(),
        }
    }

    fn device<'a>(
        &self,
        chip: &'a MockChip,
        system: &'a SystemConfig,
        config: DeviceConfig,
    ) -> TestDevice<'a> {
        Device::new(
            config,
            system,
            chip,
            self.wire.clone(),
            self.pin.clone(),
            self.delay.clone(),
        )
        .unwrap()
    }
}

fn probed<'a>(rig: &Rig, chip: &'a MockChip, config: DeviceConfig) -> TestDevice<'a> {
    let device = rig.device(chip, &NORMAL, config);
    block_on(device.probe()).unwrap();
    device
}

fn lpwg_config() -> DeviceConfig {
    let mut config = DeviceConfig::default();
    config.quirks.lpwg = true;
    config
}

// ---------------------------------------------------------------------------
// Construction and probe
// ---------------------------------------------------------------------------

#[test]
fn test_probe_full_chip_reaches_normal() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    rig.wire.set_reg(reg::INFO, &[2, 7, 3]);
    let device = probed(&rig, &chip, DeviceConfig::default());

    let state = device.state();
    assert_eq!(state.core, CorePhase::Normal);
    assert_eq!(state.power, PowerPhase::On);
    assert_eq!(state.probe_attempts, 1);

    let line = device.irq_state();
    assert!(line.registered);
    assert!(line.enabled);

    assert_eq!(
        chip.calls(),
        [
            Call::Power(PowerCommand::On),
            Call::Reset(ResetKind::Hardware),
            Call::Probe,
            Call::IcInfo,
            Call::Init,
        ]
    );
    assert_eq!(rig.pin.pulses(), 1);

    let info = block_on(device.ic_info()).unwrap();
    assert_eq!(info.version.major, 2);
    assert_eq!(info.version.minor, 7);
    assert_eq!(info.revision, 3);
}

#[test]
fn test_probe_waits_out_reset_timing() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    probed(&rig, &chip, DeviceConfig::default());

    let timing = chip.traits().timing;
    let expected = timing.power_settle_ms + timing.reset_low_ms + timing.reset_settle_ms;
    assert_eq!(rig.delay.total_ms(), expected as u64);
}

#[test]
fn test_profile_chosen_at_run_time() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let profile: &dyn ChipProfile = &chip;
    let device: Device<'_, dyn ChipProfile, _, _, _> = Device::new(
        DeviceConfig::default(),
        &NORMAL,
        profile,
        rig.wire.clone(),
        rig.pin.clone(),
        rig.delay.clone(),
    )
    .unwrap();

    block_on(device.probe()).unwrap();
    assert_eq!(device.state().core, CorePhase::Normal);
    assert!(chip.calls().contains(&Call::Init));
}

#[test]
fn test_mismatched_wire_rejected() {
    let rig = Rig::new(BusStyle::FourWire(Addressing::Standard));
    let chip = MockChip::full();
    let result = Device::new(
        DeviceConfig::default(),
        &NORMAL,
        &chip,
        rig.wire.clone(),
        rig.pin.clone(),
        rig.delay.clone(),
    );
    assert!(matches!(result, Err(Error::InvalidState)));
}

#[test]
fn test_bare_profile_probe_not_supported_without_io() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::bare();
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());

    assert_eq!(block_on(device.probe()), Err(Error::NotSupported));
    assert_eq!(rig.wire.op_count(), 0);
    assert_eq!(device.state().core, CorePhase::None);
    assert!(!device.irq_state().registered);
}

#[test]
fn test_mandatory_only_profile_probes() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::mandatory_only();
    let device = probed(&rig, &chip, DeviceConfig::default());

    assert_eq!(device.state().core, CorePhase::Normal);
    assert_eq!(chip.count(Call::Init), 0);
}

#[test]
fn test_probe_retry_cap() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full().with_retry_cap(2);
    chip.set_fail_probe(true);
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());

    assert_eq!(block_on(device.probe()), Err(Error::BusError));
    assert!(!device.state().failed);
    assert_eq!(block_on(device.probe()), Err(Error::BusError));
    assert!(device.state().failed);

    let stats = block_on(device.bus_stats());
    let ops = rig.wire.op_count();
    assert_eq!(block_on(device.probe()), Err(Error::InvalidState));
    assert_eq!(block_on(device.bus_stats()), stats);
    assert_eq!(rig.wire.op_count(), ops);

    let state = device.state();
    assert_eq!(state.core, CorePhase::None);
    assert_eq!(state.power, PowerPhase::Off);
    assert_eq!(state.probe_attempts, 2);
}

#[test]
fn test_failed_probe_rolls_back_and_retries() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    chip.set_fail_probe(true);
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());

    assert_eq!(block_on(device.probe()), Err(Error::BusError));
    assert_eq!(device.state().core, CorePhase::None);
    assert!(!device.irq_state().registered);
    assert_eq!(chip.count(Call::Power(PowerCommand::Off)), 1);

    chip.set_fail_probe(false);
    assert_eq!(block_on(device.probe()), Ok(()));
    assert_eq!(device.state().core, CorePhase::Normal);
    assert_eq!(device.state().probe_attempts, 2);
}

#[test]
fn test_probe_twice_rejected() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());
    assert_eq!(block_on(device.probe()), Err(Error::InvalidState));
}

#[test]
fn test_charger_boot_leaves_controller_off() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = rig.device(&chip, &CHARGER, DeviceConfig::default());
    block_on(device.probe()).unwrap();

    let state = device.state();
    assert_eq!(state.core, CorePhase::ChargerLogo);
    assert_eq!(state.power, PowerPhase::Off);
    assert_eq!(chip.count(Call::Init), 0);
    assert!(!device.irq_state().enabled);
    assert_eq!(block_on(device.service_irq()), Ok(None));
}

#[test]
fn test_factory_boot_services_reports_but_not_events() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let listener = RecordingListener::new(Verdict::Continue);
    let device = rig.device(&chip, &FACTORY, DeviceConfig::default());
    block_on(device.register_listener(&listener)).unwrap();
    block_on(device.probe()).unwrap();
    assert_eq!(device.state().core, CorePhase::Mfts);

    assert_eq!(device.on_edge(), Edge::Service);
    assert!(block_on(device.service_irq()).unwrap().is_some());

    block_on(device.notify(EventId::DisplayMode, 3)).unwrap();
    assert!(listener.seen().is_empty());
}

// ---------------------------------------------------------------------------
// Deferred init
// ---------------------------------------------------------------------------

#[test]
fn test_deferred_init_waits_for_display() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let mut config = DeviceConfig::default();
    config.quirks.deferred_init = true;
    let device = probed(&rig, &chip, config);

    assert_eq!(device.state().core, CorePhase::Probe);
    assert!(!device.irq_state().enabled);
    assert_eq!(chip.count(Call::Init), 0);

    let before = rig.delay.total_ms();
    block_on(device.notify(EventId::DeferredInitComplete, 0)).unwrap();
    assert_eq!(block_on(device.run_pending()), 2);

    assert_eq!(device.state().core, CorePhase::Normal);
    assert!(device.irq_state().enabled);
    assert_eq!(chip.count(Call::Init), 1);
    assert_eq!(rig.delay.total_ms() - before, config.timing.init_delay_ms as u64);
}

#[test]
fn test_deferred_init_failure_rolls_back_probe() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let mut config = DeviceConfig::default();
    config.quirks.deferred_init = true;
    let device = probed(&rig, &chip, config);

    block_on(device.notify(EventId::DeferredInitComplete, 0)).unwrap();
    rig.wire.set_fail(true);
    block_on(device.run_pending());

    let state = device.state();
    assert_eq!(state.core, CorePhase::None);
    assert_eq!(state.power, PowerPhase::Off);
    assert_eq!(state.probe_attempts, 1);
    assert!(!state.failed);
    assert!(!device.irq_state().registered);

    // The failed finisher counts as a probe attempt
    rig.wire.set_fail(false);
    block_on(device.probe()).unwrap();
    assert_eq!(device.state().core, CorePhase::Probe);
    assert_eq!(device.state().probe_attempts, 2);
}

#[test]
fn test_deferred_init_failures_reach_retry_cap() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let mut config = DeviceConfig::default();
    config.quirks.deferred_init = true;
    let device = rig.device(&chip, &NORMAL, config);
    let cap = device.traits().probe_retry_cap;

    for _ in 0..cap {
        rig.wire.set_fail(false);
        block_on(device.probe()).unwrap();
        block_on(device.notify(EventId::DeferredInitComplete, 0)).unwrap();
        rig.wire.set_fail(true);
        block_on(device.run_pending());
    }

    assert!(device.state().failed);
    rig.wire.set_fail(false);
    assert_eq!(block_on(device.probe()), Err(Error::InvalidState));
}

#[test]
fn test_failed_attempt_leaves_no_stale_events() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let mut config = DeviceConfig::default();
    config.quirks.deferred_init = true;
    let device = probed(&rig, &chip, config);

    device.tasks.schedule(Task::now(TaskKind::InitFinish));
    device.notify_atomic(EventId::DeferredInitComplete, 0).unwrap();
    device.kick.signal(());

    rig.wire.set_fail(true);
    let task = device
        .tasks
        .try_next_matching(|kind| kind == TaskKind::InitFinish)
        .unwrap();
    block_on(device.run_task(task));

    assert_eq!(device.state().core, CorePhase::None);
    assert!(device.slot.take().is_none());
    assert!(!device.kick.signaled());
    assert!(!device.task_pending(TaskKind::Notification));
}

#[test]
fn test_events_suppressed_before_normal() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let listener = RecordingListener::new(Verdict::Continue);
    let mut config = DeviceConfig::default();
    config.quirks.deferred_init = true;
    let device = rig.device(&chip, &NORMAL, config);
    block_on(device.register_listener(&listener)).unwrap();
    block_on(device.probe()).unwrap();

    block_on(device.notify(EventId::Earjack, 1)).unwrap();
    block_on(device.notify(EventId::DisplayMode, 3)).unwrap();

    assert!(listener.seen().is_empty());
    assert!(!device.task_pending(TaskKind::Notification));
    assert!(!device.task_pending(TaskKind::DisplaySync));
    assert_eq!(device.state().display, DisplayMode::Unknown);
}

// ---------------------------------------------------------------------------
// Power management
// ---------------------------------------------------------------------------

#[test]
fn test_resume_twice_is_noop() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.suspend()).unwrap();
    assert_eq!(device.state().power, PowerPhase::Off);
    assert!(!device.irq_state().enabled);

    block_on(device.resume()).unwrap();
    assert_eq!(device.state().power, PowerPhase::On);
    assert!(device.irq_state().enabled);

    let calls = chip.calls().len();
    let ops = rig.wire.op_count();
    assert_eq!(block_on(device.resume()), Ok(()));
    assert_eq!(chip.calls().len(), calls);
    assert_eq!(rig.wire.op_count(), ops);
}

#[test]
fn test_suspend_twice_is_noop() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.suspend()).unwrap();
    let calls = chip.calls().len();
    assert_eq!(block_on(device.suspend()), Ok(()));
    assert_eq!(chip.calls().len(), calls);
}

#[test]
fn test_suspend_before_probe_rejected() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());
    assert_eq!(block_on(device.suspend()), Err(Error::InvalidState));
    assert_eq!(block_on(device.resume()), Err(Error::InvalidState));
}

#[test]
fn test_lpwg_suspend_gesture_resume() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full().with_lpwg();
    let device = probed(&rig, &chip, lpwg_config());
    chip.clear_calls();

    block_on(device.suspend()).unwrap();
    assert_eq!(device.state().power, PowerPhase::Sleep);
    let line = device.irq_state();
    assert!(line.enabled);
    assert!(line.wake_armed);
    assert_eq!(
        chip.calls(),
        [Call::Lpwg(LpwgMode::KnockOn), Call::Power(PowerCommand::Sleep)]
    );

    chip.set_gesture(true);
    assert_eq!(device.on_edge(), Edge::Service);
    let report = block_on(device.service_irq()).unwrap().unwrap();
    assert!(report.gesture.is_some());
    assert_eq!(device.state().power, PowerPhase::Wake);

    block_on(device.resume()).unwrap();
    assert_eq!(device.state().power, PowerPhase::On);
    assert!(!device.irq_state().wake_armed);
    assert_eq!(chip.count(Call::Lpwg(LpwgMode::Off)), 1);
}

#[test]
fn test_lpwg_quirk_ignored_without_chip_support() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, lpwg_config());

    block_on(device.suspend()).unwrap();
    assert_eq!(device.state().power, PowerPhase::Off);
    assert!(!device.irq_state().wake_armed);
    assert_eq!(chip.count(Call::Lpwg(LpwgMode::KnockOn)), 0);
}

// ---------------------------------------------------------------------------
// Interrupt path
// ---------------------------------------------------------------------------

#[test]
fn test_edge_while_masked_replayed_on_resume() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.suspend()).unwrap();
    assert_eq!(device.on_edge(), Edge::Latched);
    assert!(device.irq_state().pending);

    block_on(device.resume()).unwrap();
    let line = device.irq_state();
    assert!(!line.pending);
    assert!(line.replay);
    assert_eq!(device.irq_replays(), 1);

    block_on(device.wait_irq());
    assert!(block_on(device.service_irq()).unwrap().is_some());
    assert!(!device.irq_state().replay);
}

#[test]
fn test_edge_before_probe_ignored() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());
    assert_eq!(device.on_edge(), Edge::Ignored);
    assert_eq!(block_on(device.service_irq()), Ok(None));
}

#[test]
fn test_abnormal_report_resets_controller() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    chip.set_abnormal(true);
    device.on_edge();
    let report = block_on(device.service_irq()).unwrap().unwrap();
    assert!(report.abnormal);
    assert!(device.task_pending(TaskKind::SystemReset));

    chip.set_abnormal(false);
    assert_eq!(block_on(device.run_pending()), 1);
    assert_eq!(rig.pin.pulses(), 2);
    assert_eq!(device.state().power, PowerPhase::On);
    assert!(device.irq_state().enabled);
}

// ---------------------------------------------------------------------------
// Event fabric
// ---------------------------------------------------------------------------

#[test]
fn test_atomic_notifications_coalesce() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let listener = RecordingListener::new(Verdict::Continue);
    let device = probed(&rig, &chip, DeviceConfig::default());
    block_on(device.register_listener(&listener)).unwrap();
    chip.clear_calls();

    device.notify_atomic(EventId::Wireless, 1).unwrap();
    device.notify_atomic(EventId::Wireless, 2).unwrap();
    assert_eq!(block_on(device.run_pending()), 1);

    let latest = Notification::new(EventId::Wireless, 2);
    assert_eq!(chip.calls(), [Call::Notify(latest)]);
    assert_eq!(listener.seen(), [latest]);
}

#[test]
fn test_blocking_kind_rejected_on_atomic_channel() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());
    assert_eq!(
        device.notify_atomic(EventId::HardwareReset, 0),
        Err(Error::InvalidState)
    );
}

#[test]
fn test_hardware_reset_stopped_by_listener() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let listener = RecordingListener::new(Verdict::Stop);
    let device = probed(&rig, &chip, DeviceConfig::default());
    block_on(device.register_listener(&listener)).unwrap();

    block_on(device.notify(EventId::HardwareReset, 0)).unwrap();
    assert_eq!(device.state().power, PowerPhase::HardwareReset);
    assert!(!device.irq_state().enabled);
    assert!(!device.task_pending(TaskKind::InitFinish));
}

#[test]
fn test_hardware_reset_recovered_by_init_finisher() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.notify(EventId::HardwareReset, 0)).unwrap();
    assert!(device.task_pending(TaskKind::InitFinish));
    assert_eq!(block_on(device.run_pending()), 1);

    assert_eq!(device.state().power, PowerPhase::On);
    assert!(device.irq_state().enabled);
    assert_eq!(rig.pin.pulses(), 2);
    assert_eq!(chip.count(Call::Init), 2);
}

#[test]
fn test_hardware_reset_ignored_while_off() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());
    block_on(device.notify(EventId::DisplayMode, DisplayMode::U0.raw())).unwrap();
    block_on(device.run_pending());
    assert_eq!(device.state().power, PowerPhase::Off);

    block_on(device.notify(EventId::HardwareReset, 0)).unwrap();
    assert_eq!(device.state().power, PowerPhase::Off);
    assert!(!device.task_pending(TaskKind::InitFinish));
}

#[test]
fn test_display_mode_drives_power() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.notify(EventId::DisplayMode, DisplayMode::U0.raw())).unwrap();
    assert_eq!(device.state().display, DisplayMode::U0);
    block_on(device.run_pending());
    assert_eq!(device.state().power, PowerPhase::Off);

    block_on(device.notify(EventId::DisplayMode, DisplayMode::U3.raw())).unwrap();
    block_on(device.run_pending());
    assert_eq!(device.state().power, PowerPhase::On);
    assert!(device.irq_state().enabled);
}

#[test]
fn test_connection_switches_charger_mode() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.notify(EventId::Connection, 1)).unwrap();
    block_on(device.run_pending());
    assert_eq!(chip.count(Call::Asc(AscMode::Charging)), 1);
    assert_eq!(rig.wire.reg(reg::ASC, 1), [AscMode::Charging as u8]);
}

#[test]
fn test_delivered_events_mirrored() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let log = TraceLog::default();
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default()).with_trace(&log);
    block_on(device.probe()).unwrap();

    block_on(device.notify(EventId::DisplayMode, 3)).unwrap();
    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].code, EventId::DisplayMode.code());
    assert_eq!(events[0].payload, [3, 0, 0, 0]);
    assert_eq!(events[0].result, Ok(()));
}

#[test]
fn test_chip_notify_failure_reported_after_listeners() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let listener = RecordingListener::new(Verdict::Continue);
    let device = probed(&rig, &chip, DeviceConfig::default());
    block_on(device.register_listener(&listener)).unwrap();

    rig.wire.set_fail(true);
    assert_eq!(
        block_on(device.notify(EventId::DebugTool, 7)),
        Err(Error::BusError)
    );
    assert_eq!(listener.seen().len(), 1);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn test_monitor_reschedules_and_resets_on_failure() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full().with_health_check();
    let mut config = DeviceConfig::default();
    config.timing.monitor_period_ms = 1000;
    let device = probed(&rig, &chip, config);
    assert!(device.task_pending(TaskKind::Monitor));

    assert_eq!(block_on(device.run_pending()), 1);
    assert_eq!(chip.count(Call::Health), 1);
    assert!(device.task_pending(TaskKind::Monitor));
    assert_eq!(rig.pin.pulses(), 1);

    chip.set_unhealthy(true);
    assert_eq!(block_on(device.run_pending()), 2);
    assert_eq!(rig.pin.pulses(), 2);
}

#[test]
fn test_monitor_off_by_default() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full().with_health_check();
    let device = probed(&rig, &chip, DeviceConfig::default());
    assert!(!device.task_pending(TaskKind::Monitor));
}

#[test]
fn test_upgrade_flashes_image() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let image: std::vec::Vec<u8> = (0..100u8).collect();
    let firmware = MockFirmware::new(&image);
    let device = rig
        .device(&chip, &NORMAL, DeviceConfig::default())
        .with_firmware(&firmware);
    block_on(device.probe()).unwrap();

    assert_eq!(device.request_upgrade(), Ok(Scheduled::Queued));
    assert_eq!(block_on(device.run_pending()), 1);

    assert_eq!(chip.count(Call::Upgrade(100)), 1);
    assert_eq!(rig.wire.reg(reg::IMAGE, 36), &image[64..]);
    assert_eq!(device.state().core, CorePhase::Normal);
    assert!(device.irq_state().enabled);
    assert_eq!(rig.pin.pulses(), 2);
}

#[test]
fn test_upgrade_failure_returns_to_normal() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let firmware = MockFirmware::new(&[0xAB; 10]);
    let device = rig
        .device(&chip, &NORMAL, DeviceConfig::default())
        .with_firmware(&firmware);
    block_on(device.probe()).unwrap();

    rig.wire.set_fail(true);
    device.request_upgrade().unwrap();
    block_on(device.run_pending());
    assert_eq!(device.state().core, CorePhase::Normal);
    assert!(device.irq_state().enabled);
}

#[test]
fn test_upgrade_while_display_off_stays_suspended() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let firmware = MockFirmware::new(&[0x5A; 80]);
    let device = rig
        .device(&chip, &NORMAL, DeviceConfig::default())
        .with_firmware(&firmware);
    block_on(device.probe()).unwrap();
    block_on(device.notify(EventId::DisplayMode, DisplayMode::U0.raw())).unwrap();
    block_on(device.run_pending());
    assert_eq!(device.state().power, PowerPhase::Off);

    device.request_upgrade().unwrap();
    block_on(device.run_pending());

    assert_eq!(chip.count(Call::Upgrade(80)), 1);
    let state = device.state();
    assert_eq!(state.core, CorePhase::Normal);
    assert_eq!(state.display, DisplayMode::U0);
    assert_eq!(state.power, PowerPhase::Off);
    assert!(!device.irq_state().enabled);
}

#[test]
fn test_upgrade_without_image_not_supported() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());
    assert_eq!(device.request_upgrade(), Err(Error::NotSupported));
}

#[test]
fn test_worker_exits_on_remove() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());
    device.request_system_reset().unwrap();

    let remover = async {
        embassy_futures::yield_now().await;
        device.remove().await
    };
    let ((), removed) = block_on(join(device.run_worker(), remover));
    assert_eq!(removed, Ok(()));
    assert_eq!(device.state().core, CorePhase::Teardown);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn test_remove_cancels_pending_work() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    device.request_system_reset().unwrap();
    device.notify_atomic(EventId::Earjack, 1).unwrap();
    block_on(device.remove()).unwrap();

    assert!(!device.task_pending(TaskKind::SystemReset));
    assert!(!device.task_pending(TaskKind::Notification));
    let ops = rig.wire.op_count();
    assert_eq!(block_on(device.run_pending()), 0);
    assert_eq!(device.notify_atomic(EventId::Earjack, 0), Ok(()));
    assert_eq!(rig.wire.op_count(), ops);

    let state = device.state();
    assert_eq!(state.core, CorePhase::Teardown);
    assert_eq!(state.power, PowerPhase::Off);
    assert!(!device.irq_state().registered);
}

#[test]
fn test_remove_is_idempotent_and_final() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.remove()).unwrap();
    assert_eq!(block_on(device.remove()), Ok(()));
    assert_eq!(chip.count(Call::Power(PowerCommand::Off)), 1);
    assert_eq!(block_on(device.probe()), Err(Error::InvalidState));
    assert_eq!(block_on(device.set(0, &[1])), Err(Error::InvalidState));
}

#[test]
fn test_remove_survives_bus_failure() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    rig.wire.set_fail(true);
    assert_eq!(block_on(device.remove()), Ok(()));
    assert_eq!(device.state().power, PowerPhase::Off);
}

// ---------------------------------------------------------------------------
// Pass-through
// ---------------------------------------------------------------------------

#[test]
fn test_set_and_get() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    block_on(device.set(2, &[0xA5, 0x5A])).unwrap();
    assert_eq!(rig.wire.reg(reg::COMMAND + 2, 2), [0xA5, 0x5A]);

    let mut out = [0u8; 2];
    assert_eq!(block_on(device.get(2, &mut out)), Ok(2));
    assert_eq!(out, [0xA5, 0x5A]);
}

#[test]
fn test_pass_through_before_probe_rejected() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = rig.device(&chip, &NORMAL, DeviceConfig::default());

    assert_eq!(block_on(device.set(0, &[1])), Err(Error::InvalidState));
    assert_eq!(
        block_on(device.with_bus(|io| io.write(0, &[1]))),
        Err(Error::InvalidState)
    );
    assert_eq!(rig.wire.op_count(), 0);
}

#[test]
fn test_wait_test_mode_acknowledged() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    chip.ack_after(3);
    assert_eq!(block_on(device.wait_test_mode(100)), Ok(()));
    assert_eq!(chip.count(Call::TestModeAck), 3);
}

#[test]
fn test_wait_test_mode_times_out() {
    let rig = Rig::new(BusStyle::TwoWire);
    let chip = MockChip::full();
    let device = probed(&rig, &chip, DeviceConfig::default());

    let interval = chip.traits().timing.poll_interval_ms;
    assert_eq!(
        block_on(device.wait_test_mode(interval * 5)),
        Err(Error::TimedOut)
    );
    assert_eq!(chip.count(Call::TestModeAck), 6);
}

#[test]
fn test_max_length_writes_mirrored_in_order() {
    let style = BusStyle::FourWire(Addressing::Standard);
    let rig = Rig::new(style);
    let chip = MockChip::full();
    let log = TraceLog::default();
    let config = DeviceConfig {
        bus: BusConfig {
            style,
            max_transfer: 1024,
            max_segments: 8,
            ..BusConfig::default()
        },
        ..DeviceConfig::default()
    };
    let device = rig.device(&chip, &NORMAL, config).with_trace(&log);
    block_on(device.probe()).unwrap();
    let before = log.records().len();

    let mut data = [0u8; 1024];
    for round in 0..1000u32 {
        data[0] = round as u8;
        data[1023] = (round >> 8) as u8;
        let offset = ((round % 16) * 1024) as u16;
        block_on(device.with_bus(|io| io.write(offset, &data))).unwrap();
    }

    let writes: std::vec::Vec<_> = log.records().split_off(before);
    assert_eq!(writes.len(), 1000);
    for (round, record) in writes.iter().enumerate() {
        assert_eq!(record.kind, TraceKind::Write);
        assert_eq!(record.code, ((round % 16) * 1024) as u32);
        assert_eq!(record.payload.len(), 1024);
        assert_eq!(record.payload[0], round as u8);
        assert_eq!(record.payload[1023], (round >> 8) as u8);
        assert_eq!(record.result, Ok(()));
    }

    let oversized = [0u8; 1025];
    let ops = rig.wire.op_count();
    assert_eq!(
        block_on(device.with_bus(|io| io.write(0, &oversized))),
        Err(Error::BusOverflow)
    );
    assert_eq!(rig.wire.op_count(), ops);
}
