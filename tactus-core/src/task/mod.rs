//! Deferred task queue
//!
//! Work that cannot run on a restricted call stack is described by a
//! [`Task`] and queued here. Each kind has at most one outstanding
//! instance: rescheduling a coalescable kind replaces its payload,
//! rescheduling any other kind is a no-op. A kind is never handed out
//! again while a worker is still running it, so same-kind tasks complete
//! in the order they were queued.

mod queue;

pub use queue::{DeferredQueue, MAX_WORKERS};

use heapless::Vec;

use crate::state::DisplayMode;

/// Task kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskKind {
    /// Finish initialization after probe or a hardware reset
    InitFinish,
    /// Run a firmware upgrade
    Upgrade,
    /// Deliver the atomic slot through the blocking path
    Notification,
    /// Reconcile power with the display mode
    DisplaySync,
    /// Periodic health check
    Monitor,
    /// Hardware reset and reinitialize
    SystemReset,
}

/// What rescheduling a pending kind does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coalesce {
    /// Newer payload wins
    Replace,
    /// First request wins
    Keep,
}

impl TaskKind {
    pub const COUNT: usize = 6;

    const fn index(self) -> usize {
        self as usize
    }

    const fn coalesce(self) -> Coalesce {
        match self {
            TaskKind::Notification | TaskKind::DisplaySync => Coalesce::Replace,
            _ => Coalesce::Keep,
        }
    }
}

/// Task payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    #[default]
    Empty,
    /// Target display mode for `DisplaySync`
    Display(DisplayMode),
}

/// One unit of deferred work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Task {
    pub kind: TaskKind,
    pub payload: Payload,
    /// Delay before the task starts
    pub delay_ms: u32,
}

impl Task {
    /// Task with no payload that starts immediately
    pub const fn now(kind: TaskKind) -> Self {
        Self {
            kind,
            payload: Payload::Empty,
            delay_ms: 0,
        }
    }

    /// Task with no payload that starts after `delay_ms`
    pub const fn after(kind: TaskKind, delay_ms: u32) -> Self {
        Self {
            kind,
            payload: Payload::Empty,
            delay_ms,
        }
    }

    /// Display reconciliation toward `mode`
    pub const fn display(mode: DisplayMode) -> Self {
        Self {
            kind: TaskKind::DisplaySync,
            payload: Payload::Display(mode),
            delay_ms: 0,
        }
    }
}

/// Outcome of scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scheduled {
    /// New instance queued
    Queued,
    /// Pending instance's payload replaced
    Replaced,
    /// An instance is already pending; request dropped
    AlreadyPending,
    /// Queue closed by teardown
    Closed,
}

/// Bounded coalescing queue
#[derive(Debug)]
pub struct TaskQueue {
    pending: [Option<Task>; TaskKind::COUNT],
    order: Vec<TaskKind, { TaskKind::COUNT }>,
    running: [bool; TaskKind::COUNT],
    closed: bool,
}

impl TaskQueue {
    pub const fn new() -> Self {
        Self {
            pending: [None; TaskKind::COUNT],
            order: Vec::new(),
            running: [false; TaskKind::COUNT],
            closed: false,
        }
    }

    /// Queue a task, coalescing with a pending instance of its kind
    pub fn schedule(&mut self, task: Task) -> Scheduled {
        if self.closed {
            return Scheduled::Closed;
        }

        let slot = &mut self.pending[task.kind.index()];
        match slot {
            Some(pending) => match task.kind.coalesce() {
                Coalesce::Replace => {
                    pending.payload = task.payload;
                    Scheduled::Replaced
                }
                Coalesce::Keep => Scheduled::AlreadyPending,
            },
            None => {
                *slot = Some(task);
                // One entry per kind at most, so the order list cannot fill
                let _ = self.order.push(task.kind);
                Scheduled::Queued
            }
        }
    }

    /// Hand out the oldest pending task whose kind is not running
    pub fn next(&mut self) -> Option<Task> {
        self.next_matching(|_| true)
    }

    /// Like [`next`](Self::next), restricted to kinds accepted by `filter`
    pub fn next_matching(&mut self, filter: impl Fn(TaskKind) -> bool) -> Option<Task> {
        let position = self
            .order
            .iter()
            .position(|kind| !self.running[kind.index()] && filter(*kind))?;
        let kind = self.order.remove(position);
        self.running[kind.index()] = true;
        self.pending[kind.index()].take()
    }

    /// Mark a handed-out task finished
    pub fn complete(&mut self, kind: TaskKind) {
        self.running[kind.index()] = false;
    }

    /// Drop every pending task, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.order.len();
        self.pending = [None; TaskKind::COUNT];
        self.order.clear();
        dropped
    }

    /// Drop every pending task and refuse new ones
    pub fn cancel_all(&mut self) -> usize {
        self.closed = true;
        self.clear()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.pending[kind.index()].is_some()
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.running[kind.index()]
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check whether a worker could take a task now
    pub fn has_ready(&self) -> bool {
        self.order.iter().any(|kind| !self.running[kind.index()])
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
