//! Device context
//!
//! Ties one controller's transport, capability table, interrupt line,
//! lifecycle and event fabric together under a single lock.
//!
//! # Locking
//!
//! The Device Context lock (an async mutex) guards the transport, the reset
//! line and the listener chain, and serializes every lifecycle transition.
//! The interrupt line bookkeeping, the lifecycle snapshot, the atomic slot
//! and the task queue each sit behind their own critical-section lock, so
//! [`Device::on_edge`] and [`Device::notify_atomic`] never wait for the
//! Device Context lock.
//!
//! # Tasks
//!
//! Deferred work is queued on the device and executed by
//! [`Device::run_worker`]. Run a small pool of workers per device; the
//! queue never hands the same task kind to two workers at once.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use tactus_hal::OutputPin;

use crate::bus::{self, BusStats, RegisterIo, TraceKind, TraceRecord, TraceSink, Transport, Wire};
use crate::capability::{
    dispatch, AscMode, Capability, ChipProfile, ChipTraits, FirmwareSource, Health, LpwgMode,
    PowerCommand, ResetKind,
};
use crate::config::{BootMode, DeviceConfig, SystemConfig};
use crate::error::{Error, Result};
use crate::event::{self, AtomicSlot, Channel, EventId, Listener, ListenerChain, Notification, Verdict};
use crate::irq::{Edge, Enable, IrqController, LineState};
use crate::poll::{poll_until, PollBudget};
use crate::report::{IcInfo, TouchReport};
use crate::state::{CoreInput, CorePhase, DisplayMode, LifecycleState, PowerPhase, StateCell};
use crate::task::{DeferredQueue, Payload, Scheduled, Task, TaskKind};

/// State guarded by the Device Context lock
struct Inner<'a, W, R> {
    transport: Transport<'a, W>,
    reset: R,
    listeners: ListenerChain<'a>,
    ic_info: Option<IcInfo>,
}

/// One touch controller
///
/// `P` may be a trait object, so boards can pick the chip profile at run
/// time.
pub struct Device<'a, P: ?Sized, W, R, D> {
    config: DeviceConfig,
    system: &'a SystemConfig,
    profile: &'a P,
    traits: ChipTraits,
    irq: IrqController,
    lifecycle: StateCell,
    slot: AtomicSlot,
    tasks: DeferredQueue,
    firmware: Option<&'a dyn FirmwareSource>,
    trace: Option<&'a dyn TraceSink>,
    delay: D,
    kick: Signal<CriticalSectionRawMutex, ()>,
    inner: Mutex<CriticalSectionRawMutex, Inner<'a, W, R>>,
}

impl<'a, P, W, R, D> Device<'a, P, W, R, D>
where
    P: ChipProfile + ?Sized,
    W: Wire,
    R: OutputPin,
    D: DelayNs + Clone,
{
    /// Bind a chip profile to its bus and reset line
    ///
    /// Nothing touches the hardware until [`probe`](Self::probe).
    pub fn new(
        config: DeviceConfig,
        system: &'a SystemConfig,
        profile: &'a P,
        wire: W,
        reset: R,
        delay: D,
    ) -> Result<Self> {
        let traits = profile.traits();
        let transport = Transport::new(wire, &config.bus, None)?;
        if config.quirks.lpwg && !traits.lpwg {
            warn!("{} has no wake gestures, lpwg quirk ignored", traits.name);
        }

        Ok(Self {
            config,
            system,
            profile,
            traits,
            irq: IrqController::new(traits.lpwg),
            lifecycle: StateCell::new(),
            slot: AtomicSlot::new(),
            tasks: DeferredQueue::new(),
            firmware: None,
            trace: None,
            delay,
            kick: Signal::new(),
            inner: Mutex::new(Inner {
                transport,
                reset,
                listeners: ListenerChain::new(),
                ic_info: None,
            }),
        })
    }

    /// Mirror bus transfers and delivered events into `sink`
    pub fn with_trace(mut self, sink: &'a dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self.inner.get_mut().transport.set_trace(Some(sink));
        self
    }

    /// Source of firmware images for upgrades
    pub fn with_firmware(mut self, firmware: &'a dyn FirmwareSource) -> Self {
        self.firmware = Some(firmware);
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Lifecycle snapshot
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.snapshot()
    }

    /// Interrupt line snapshot
    pub fn irq_state(&self) -> LineState {
        self.irq.state()
    }

    /// Number of pending edges replayed on enable
    pub fn irq_replays(&self) -> u32 {
        self.irq.replays()
    }

    pub fn traits(&self) -> &ChipTraits {
        &self.traits
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Controller identity from the last probe or upgrade
    pub async fn ic_info(&self) -> Option<IcInfo> {
        self.inner.lock().await.ic_info
    }

    /// Transport activity counters
    pub async fn bus_stats(&self) -> BusStats {
        self.inner.lock().await.transport.stats()
    }

    /// Check whether a task kind is queued
    pub fn task_pending(&self, kind: TaskKind) -> bool {
        self.tasks.is_pending(kind)
    }

    fn delay(&self) -> D {
        self.delay.clone()
    }

    fn lpwg_enabled(&self) -> bool {
        self.traits.lpwg && self.config.quirks.lpwg
    }

    fn require_bus(&self) -> Result<LifecycleState> {
        let state = self.lifecycle.snapshot();
        if state.core.bus_ready() {
            Ok(state)
        } else {
            Err(Error::InvalidState)
        }
    }

    fn require_normal(&self) -> Result<LifecycleState> {
        let state = self.lifecycle.snapshot();
        if state.core == CorePhase::Normal {
            Ok(state)
        } else {
            Err(Error::InvalidState)
        }
    }

    // -----------------------------------------------------------------------
    // Attach and detach
    // -----------------------------------------------------------------------

    /// Find and initialize the controller
    ///
    /// All or nothing: on failure the interrupt line is released, queued
    /// work is dropped and the device returns to core phase `None` so it
    /// may be probed again, until the chip's retry cap is reached.
    pub async fn probe(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let state = self.lifecycle.snapshot();
        if state.failed || state.probe_attempts >= self.traits.probe_retry_cap {
            warn!("{} probe refused, retry cap reached", self.traits.name);
            return Err(Error::InvalidState);
        }
        if state.core != CorePhase::None {
            return Err(Error::InvalidState);
        }

        let attempt = self.lifecycle.commit(|state| {
            state.apply_core(CoreInput::Attach)?;
            state.probe_attempts += 1;
            Ok(state.probe_attempts)
        })?;
        info!("probing {} (attempt {})", self.traits.name, attempt);

        match self.bring_up(&mut inner).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort_probe(&mut inner, err);
                Err(err)
            }
        }
    }

    async fn bring_up(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        self.irq.register()?;
        self.power_on(inner).await?;
        dispatch(Capability::Probe, self.profile.probe(&mut inner.transport))?;
        self.lifecycle.commit(|state| state.apply_core(CoreInput::Probed))?;

        let ic = dispatch(Capability::IcInfo, self.profile.ic_info(&mut inner.transport))?;
        inner.ic_info = Some(ic);
        info!(
            "{} found: firmware {}.{} revision {}",
            self.traits.name,
            ic.version.major,
            ic.version.minor,
            ic.revision
        );

        match self.system.boot_mode {
            BootMode::ChargerLogo => {
                dispatch(
                    Capability::Power,
                    self.profile.power(&mut inner.transport, PowerCommand::Off),
                )?;
                self.lifecycle.commit(|state| {
                    state.apply_power(PowerPhase::Off)?;
                    state.apply_core(CoreInput::Initialized(BootMode::ChargerLogo))
                })?;
                info!("charger boot, controller left off");
                Ok(())
            }
            _ if self.config.quirks.deferred_init => {
                info!("waiting for display init");
                Ok(())
            }
            mode => self.finish_init(inner, mode).await,
        }
    }

    fn abort_probe(&self, inner: &mut Inner<'a, W, R>, err: Error) {
        warn!("probe failed: {}", err);
        self.irq.unregister();
        let dropped = self.tasks.clear();
        if dropped > 0 {
            debug!("dropped {} queued tasks", dropped);
        }
        self.slot.clear();
        self.kick.reset();

        if self.lifecycle.snapshot().power.is_powered() {
            if let Some(Err(err)) = self.profile.power(&mut inner.transport, PowerCommand::Off) {
                warn!("power off after failed probe: {}", err);
            }
        }

        let cap = self.traits.probe_retry_cap;
        let failed = self.lifecycle.commit(|state| {
            let _ = state.apply_core(CoreInput::Fail);
            let _ = state.apply_power(PowerPhase::Off);
            state.failed = state.probe_attempts >= cap;
            Ok(state.failed)
        });
        if let Ok(true) = failed {
            error!("{} failed {} probes, giving up", self.traits.name, cap);
        }
    }

    async fn finish_init(&self, inner: &mut Inner<'a, W, R>, mode: BootMode) -> Result<()> {
        dispatch(Capability::Init, self.profile.init(&mut inner.transport))?;
        self.lifecycle.commit(|state| state.apply_core(CoreInput::Initialized(mode)))?;
        self.enable_irq()?;

        if self.traits.health_check && self.config.monitor_enabled() {
            self.tasks
                .schedule(Task::after(TaskKind::Monitor, self.config.timing.monitor_period_ms));
        }
        info!("{} ready", self.traits.name);
        Ok(())
    }

    /// Detach the controller
    ///
    /// Pending tasks are cancelled first; tasks already waiting for the
    /// lock are dropped without touching the bus. Secondary failures are
    /// logged, not returned.
    pub async fn remove(&self) -> Result<()> {
        let cancelled = self.tasks.cancel_all();
        let mut inner = self.inner.lock().await;

        let state = self.lifecycle.snapshot();
        if state.core == CorePhase::Teardown {
            return Ok(());
        }
        self.lifecycle.commit(|state| state.apply_core(CoreInput::Detach))?;
        self.slot.clear();

        self.irq.disable();
        self.irq.unregister();

        if state.power.is_powered() {
            if let Some(Err(err)) = self.profile.power(&mut inner.transport, PowerCommand::Off) {
                warn!("power off during teardown failed: {}", err);
            }
        }
        let _ = self.lifecycle.commit(|state| {
            state.power = PowerPhase::Off;
            Ok(())
        });

        info!("{} removed, {} tasks cancelled", self.traits.name, cancelled);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Power management
    // -----------------------------------------------------------------------

    /// Put the controller to sleep
    ///
    /// With wake gestures the controller keeps scanning at low power and
    /// the line stays armed; otherwise the line is masked and the
    /// controller powered off. A no-op when already suspended.
    pub async fn suspend(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.suspend_locked(&mut inner)
    }

    fn suspend_locked(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let state = self.require_normal()?;
        if matches!(state.power, PowerPhase::Sleep | PowerPhase::Off) {
            debug!("already suspended");
            return Ok(());
        }

        let io = &mut inner.transport;
        if self.lpwg_enabled() && state.power != PowerPhase::HardwareReset {
            dispatch(
                Capability::LpwgConfigure,
                self.profile.lpwg_configure(io, LpwgMode::KnockOn),
            )?;
            dispatch(Capability::Power, self.profile.power(io, PowerCommand::Sleep))?;
            self.lifecycle.commit(|state| state.apply_power(PowerPhase::Sleep))?;
            self.irq.set_wake(true);
            info!("suspended with wake gestures");
        } else {
            self.irq.disable();
            dispatch(Capability::Power, self.profile.power(io, PowerCommand::Off))?;
            self.lifecycle.commit(|state| state.apply_power(PowerPhase::Off))?;
            info!("suspended");
        }
        Ok(())
    }

    /// Bring the controller back to full scanning
    ///
    /// A no-op when already on. Edges latched while suspended are replayed.
    pub async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.resume_locked(&mut inner).await
    }

    async fn resume_locked(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let state = self.require_normal()?;
        match state.power {
            PowerPhase::On => {
                debug!("already on");
                return Ok(());
            }
            PowerPhase::HardwareReset => return self.recover(inner).await,
            PowerPhase::Sleep | PowerPhase::Wake if self.lpwg_enabled() => {
                self.irq.set_wake(false);
                dispatch(
                    Capability::LpwgConfigure,
                    self.profile.lpwg_configure(&mut inner.transport, LpwgMode::Off),
                )?;
            }
            _ => {}
        }

        dispatch(
            Capability::Power,
            self.profile.power(&mut inner.transport, PowerCommand::On),
        )?;
        self.delay().delay_ms(self.traits.timing.power_settle_ms).await;
        dispatch(Capability::Init, self.profile.init(&mut inner.transport))?;
        self.lifecycle.commit(|state| state.apply_power(PowerPhase::On))?;
        self.enable_irq()?;
        info!("resumed");
        Ok(())
    }

    /// Power on, pulse reset, and let the chip complete its reset
    async fn power_on(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let timing = self.traits.timing;
        dispatch(
            Capability::Power,
            self.profile.power(&mut inner.transport, PowerCommand::On),
        )?;
        self.delay().delay_ms(timing.power_settle_ms).await;

        inner.reset.set_low();
        self.delay().delay_ms(timing.reset_low_ms).await;
        inner.reset.set_high();
        self.delay().delay_ms(timing.reset_settle_ms).await;

        dispatch(
            Capability::Reset,
            self.profile.reset(&mut inner.transport, ResetKind::Hardware),
        )?;
        self.lifecycle.commit(|state| state.apply_power(PowerPhase::On))
    }

    /// Hardware reset and reinitialize with the line masked
    async fn recover(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        info!("recovering {}", self.traits.name);
        self.irq.disable();
        self.irq.set_wake(false);
        self.power_on(inner).await?;
        dispatch(Capability::Init, self.profile.init(&mut inner.transport))?;
        self.enable_irq()
    }

    fn enable_irq(&self) -> Result<()> {
        if self.irq.enable()? == Enable::Replayed {
            debug!("replaying latched edge");
            self.kick.signal(());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Interrupt path
    // -----------------------------------------------------------------------

    /// Record a hardware edge
    ///
    /// Restricted context: never takes the Device Context lock. Wakes
    /// [`wait_irq`](Self::wait_irq) when the edge needs servicing.
    pub fn on_edge(&self) -> Edge {
        let edge = self.irq.on_edge();
        if edge == Edge::Service {
            self.kick.signal(());
        }
        edge
    }

    /// Wait until an edge (live or replayed) needs servicing
    pub async fn wait_irq(&self) {
        self.kick.wait().await
    }

    /// Threaded interrupt handler: read the pending report
    ///
    /// Returns `None` when the device is not in a phase that reads reports
    /// or the line was masked in the meantime. An abnormal report schedules
    /// a system reset; a wake gesture while asleep moves power to `Wake`.
    pub async fn service_irq(&self) -> Result<Option<TouchReport>> {
        let mut inner = self.inner.lock().await;
        let state = self.lifecycle.snapshot();
        if !state.core.services_reports() {
            return Ok(None);
        }
        if !self.irq.begin_service() {
            return Ok(None);
        }

        let report = dispatch(
            Capability::ReadReport,
            self.profile.read_report(&mut inner.transport),
        )?;
        if report.abnormal {
            warn!("controller reported abnormal state");
            self.tasks.schedule(Task::now(TaskKind::SystemReset));
        }
        if report.gesture.is_some() && state.power == PowerPhase::Sleep {
            info!("wake gesture");
            self.lifecycle.commit(|state| state.apply_power(PowerPhase::Wake))?;
        }
        Ok(Some(report))
    }

    // -----------------------------------------------------------------------
    // Event fabric
    // -----------------------------------------------------------------------

    /// Append a listener to the blocking chain
    pub async fn register_listener(&self, listener: &'a dyn Listener) -> Result<()> {
        self.inner.lock().await.listeners.register(listener)
    }

    /// Deliver a notification on its kind's channel
    pub async fn notify(&self, event: EventId, payload: u32) -> Result<()> {
        match event.channel() {
            Channel::Atomic => self.notify_atomic(event, payload),
            Channel::Blocking => {
                let mut inner = self.inner.lock().await;
                self.deliver(&mut inner, Notification::new(event, payload))
            }
        }
    }

    /// Store an atomic-channel notification for deferred delivery
    ///
    /// Never blocks. A notification not yet consumed is overwritten.
    /// Blocking-channel kinds are rejected.
    pub fn notify_atomic(&self, event: EventId, payload: u32) -> Result<()> {
        if event.channel() != Channel::Atomic {
            return Err(Error::InvalidState);
        }
        let core = self.lifecycle.snapshot().core;
        if !event::admits(event, core) {
            debug!("event {} suppressed", event.code());
            return Ok(());
        }

        let note = Notification::new(event, payload);
        if let Some(old) = self.slot.store(note) {
            debug!("event {} overwritten", old.event.code());
        }
        self.tasks.schedule(Task::now(TaskKind::Notification));
        Ok(())
    }

    /// Synchronous delivery under the Device Context lock
    fn deliver(&self, inner: &mut Inner<'a, W, R>, note: Notification) -> Result<()> {
        let state = self.lifecycle.snapshot();
        if !event::admits(note.event, state.core) {
            debug!("event {} suppressed", note.event.code());
            return Ok(());
        }

        let mut result = dispatch(
            Capability::Notify,
            self.profile.notify(&mut inner.transport, &note),
        );
        let verdict = inner.listeners.deliver(&note);

        match note.event {
            EventId::HardwareReset => {
                let committed = self
                    .lifecycle
                    .commit(|state| state.apply_power(PowerPhase::HardwareReset));
                if verdict == Verdict::Stop {
                    self.irq.disable();
                } else if committed.is_err() {
                    // Nothing to recover while the controller is off
                    debug!("hardware reset ignored at power {}", state.power);
                } else {
                    self.tasks.schedule(Task::after(
                        TaskKind::InitFinish,
                        self.config.timing.init_delay_ms,
                    ));
                }
            }
            EventId::DisplayMode => {
                let mode = DisplayMode::from_raw(note.payload);
                let _ = self.lifecycle.commit(|state| {
                    state.apply_display(mode);
                    Ok(())
                });
                self.tasks.schedule(Task::display(mode));
            }
            EventId::DeferredInitComplete => {
                self.tasks.schedule(Task::after(
                    TaskKind::InitFinish,
                    self.config.timing.init_delay_ms,
                ));
            }
            EventId::Connection => {
                let mode = if note.payload != 0 {
                    AscMode::Charging
                } else {
                    AscMode::Normal
                };
                let asc = dispatch(Capability::Asc, self.profile.asc(&mut inner.transport, mode));
                result = result.and(asc);
            }
            _ => {}
        }

        if let Err(err) = result {
            warn!("event {} delivery: {}", note.event.code(), err);
        }
        bus::mirror(
            self.trace,
            TraceRecord {
                kind: TraceKind::Event,
                code: note.event.code(),
                payload: &note.payload.to_le_bytes(),
                result,
            },
        );
        result
    }

    // -----------------------------------------------------------------------
    // Deferred work
    // -----------------------------------------------------------------------

    /// Queue a firmware upgrade
    pub fn request_upgrade(&self) -> Result<Scheduled> {
        self.require_normal()?;
        if self.firmware.is_none() {
            return Err(Error::NotSupported);
        }
        Ok(self.tasks.schedule(Task::now(TaskKind::Upgrade)))
    }

    /// Queue a hardware reset and reinitialization
    pub fn request_system_reset(&self) -> Result<Scheduled> {
        self.require_normal()?;
        Ok(self.tasks.schedule(Task::now(TaskKind::SystemReset)))
    }

    /// Worker loop; returns once the device is removed
    pub async fn run_worker(&self) {
        while let Some(task) = self.tasks.next().await {
            self.run_task(task).await;
        }
        debug!("worker exiting");
    }

    /// Run queued tasks until none is ready, each kind at most once
    ///
    /// For single-threaded hosts without a worker pool. Returns the number
    /// of tasks run.
    pub async fn run_pending(&self) -> usize {
        let mut ran = [false; TaskKind::COUNT];
        let mut count = 0;
        while let Some(task) = self.tasks.try_next_matching(|kind| !ran[kind as usize]) {
            ran[task.kind as usize] = true;
            self.run_task(task).await;
            count += 1;
        }
        count
    }

    async fn run_task(&self, task: Task) {
        if let Err(err) = self.execute(task).await {
            warn!("task {} failed: {}", task.kind, err);
        }
        self.tasks.complete(task.kind);
    }

    async fn execute(&self, task: Task) -> Result<()> {
        if task.delay_ms > 0 {
            self.delay().delay_ms(task.delay_ms).await;
        }
        let mut inner = self.inner.lock().await;
        if self.tasks.is_closed() {
            debug!("task {} dropped after teardown", task.kind);
            return Ok(());
        }

        match task.kind {
            TaskKind::InitFinish => self.init_finish(&mut inner).await,
            TaskKind::Upgrade => self.upgrade(&mut inner).await,
            TaskKind::Notification => match self.slot.take() {
                Some(note) => self.deliver(&mut inner, note),
                None => Ok(()),
            },
            TaskKind::DisplaySync => self.display_sync(&mut inner, task.payload).await,
            TaskKind::Monitor => self.monitor(&mut inner),
            TaskKind::SystemReset => self.system_reset(&mut inner).await,
        }
    }

    async fn init_finish(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let state = self.lifecycle.snapshot();
        match (state.core, state.power) {
            (CorePhase::Probe, _) => {
                let result = self.finish_init(inner, self.system.boot_mode).await;
                if let Err(err) = result {
                    self.abort_probe(inner, err);
                }
                result
            }
            (CorePhase::Normal, PowerPhase::HardwareReset) => {
                self.recover(inner).await?;
                if state.display.is_off() {
                    self.suspend_locked(inner)?;
                }
                Ok(())
            }
            _ => {
                debug!("init finisher has nothing to do");
                Ok(())
            }
        }
    }

    async fn display_sync(&self, inner: &mut Inner<'a, W, R>, payload: Payload) -> Result<()> {
        let Payload::Display(mode) = payload else {
            return Ok(());
        };
        if self.lifecycle.snapshot().core != CorePhase::Normal {
            return Ok(());
        }

        if mode.is_on() {
            self.resume_locked(inner).await
        } else if mode.is_off() {
            self.suspend_locked(inner)
        } else {
            Ok(())
        }
    }

    async fn upgrade(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let firmware = self.firmware.ok_or(Error::NotSupported)?;
        self.lifecycle
            .commit(|state| state.apply_core(CoreInput::BeginUpgrade))?;
        self.irq.disable();
        info!("upgrading {} with {} bytes", self.traits.name, firmware.size());

        let result = self.flash_image(inner, firmware).await;
        let _ = self
            .lifecycle
            .commit(|state| state.apply_core(CoreInput::EndUpgrade));
        self.enable_irq()?;

        // The panel may have gone dark before the upgrade started
        let result = match result {
            Ok(()) if self.lifecycle.snapshot().display.is_off() => self.suspend_locked(inner),
            other => other,
        };

        match result {
            Ok(()) => info!("upgrade complete"),
            Err(err) => error!("upgrade failed: {}", err),
        }
        result
    }

    async fn flash_image(
        &self,
        inner: &mut Inner<'a, W, R>,
        firmware: &dyn FirmwareSource,
    ) -> Result<()> {
        dispatch(
            Capability::Upgrade,
            self.profile.upgrade(&mut inner.transport, firmware),
        )?;
        self.power_on(inner).await?;
        let ic = dispatch(Capability::IcInfo, self.profile.ic_info(&mut inner.transport))?;
        inner.ic_info = Some(ic);
        dispatch(Capability::Init, self.profile.init(&mut inner.transport))
    }

    fn monitor(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let state = self.lifecycle.snapshot();
        if state.core != CorePhase::Normal
            || !self.traits.health_check
            || !self.config.monitor_enabled()
        {
            return Ok(());
        }
        self.tasks
            .schedule(Task::after(TaskKind::Monitor, self.config.timing.monitor_period_ms));
        if state.power != PowerPhase::On {
            return Ok(());
        }

        let health = dispatch(
            Capability::HealthCheck,
            self.profile.health_check(&mut inner.transport),
        )?;
        if health == Health::Abnormal {
            warn!("health check failed, scheduling reset");
            self.tasks.schedule(Task::now(TaskKind::SystemReset));
        }
        Ok(())
    }

    async fn system_reset(&self, inner: &mut Inner<'a, W, R>) -> Result<()> {
        let state = self.lifecycle.snapshot();
        if state.core != CorePhase::Normal {
            debug!("system reset skipped outside normal phase");
            return Ok(());
        }
        self.recover(inner).await?;
        if state.display.is_off() {
            self.suspend_locked(inner)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pass-through
    // -----------------------------------------------------------------------

    /// Generic write for diagnostic subsystems
    pub async fn set(&self, command: u32, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.require_bus()?;
        dispatch(
            Capability::Set,
            self.profile.set(&mut inner.transport, command, data),
        )
    }

    /// Generic read for diagnostic subsystems, returning the byte count
    pub async fn get(&self, command: u32, out: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        self.require_bus()?;
        dispatch(
            Capability::Get,
            self.profile.get(&mut inner.transport, command, out),
        )
    }

    /// Poll until the controller acknowledges test mode
    ///
    /// The lock is released between polls. Fails with `TimedOut` once
    /// `timeout_ms` has elapsed.
    pub async fn wait_test_mode(&self, timeout_ms: u32) -> Result<()> {
        let budget = PollBudget::new(timeout_ms, self.traits.timing.poll_interval_ms);
        let mut delay = self.delay();
        poll_until(budget, &mut delay, move || async move {
            let mut inner = self.inner.lock().await;
            self.require_bus()?;
            dispatch(
                Capability::TestModeAck,
                self.profile.test_mode_ack(&mut inner.transport),
            )
        })
        .await
    }

    /// Run `f` with exclusive register access
    pub async fn with_bus<T>(&self, f: impl FnOnce(&mut dyn RegisterIo) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.lock().await;
        self.require_bus()?;
        f(&mut inner.transport)
    }
}

#[cfg(test)]
mod tests;
