//! Capability table
//!
//! A chip profile is a [`ChipProfile`] implementation bound to a device at
//! construction. Every operation returns a [`Slot`]: `None` means the chip
//! does not populate that operation. One helper, [`dispatch`], turns an
//! unpopulated slot into an outcome according to the per-operation policy
//! table, so call sites never test for missing operations themselves.

mod profile;

pub use profile::{
    AscMode, ChipProfile, ChipTiming, ChipTraits, FirmwareSource, Health, LpwgMode,
    PowerCommand, ResetKind,
};

use crate::error::{Error, Result};

/// Outcome of one capability slot; `None` when the chip leaves it empty
pub type Slot<T> = Option<Result<T>>;

/// Operations a chip profile may populate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Capability {
    Probe,
    Reset,
    Power,
    IcInfo,
    ReadReport,
    Upgrade,
    TestModeAck,
    Set,
    Get,
    Init,
    Notify,
    LpwgConfigure,
    Asc,
    HealthCheck,
}

/// How an unpopulated slot is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Policy {
    /// Unpopulated means `NotSupported`
    Mandatory,
    /// Unpopulated means success with no effect
    Advisory,
}

impl Capability {
    /// Number of capability slots
    pub const COUNT: usize = 14;

    /// Every slot, in table order
    pub const ALL: [Capability; Self::COUNT] = [
        Capability::Probe,
        Capability::Reset,
        Capability::Power,
        Capability::IcInfo,
        Capability::ReadReport,
        Capability::Upgrade,
        Capability::TestModeAck,
        Capability::Set,
        Capability::Get,
        Capability::Init,
        Capability::Notify,
        Capability::LpwgConfigure,
        Capability::Asc,
        Capability::HealthCheck,
    ];

    /// Policy for this slot
    pub const fn policy(self) -> Policy {
        POLICY[self as usize]
    }
}

/// Policy table, indexed by `Capability as usize`
const POLICY: [Policy; Capability::COUNT] = [
    Policy::Mandatory, // Probe
    Policy::Mandatory, // Reset
    Policy::Mandatory, // Power
    Policy::Mandatory, // IcInfo
    Policy::Mandatory, // ReadReport
    Policy::Mandatory, // Upgrade
    Policy::Mandatory, // TestModeAck
    Policy::Mandatory, // Set
    Policy::Mandatory, // Get
    Policy::Advisory,  // Init
    Policy::Advisory,  // Notify
    Policy::Advisory,  // LpwgConfigure
    Policy::Advisory,  // Asc
    Policy::Advisory,  // HealthCheck
];

/// Resolve a slot according to its capability's policy
pub fn dispatch<T: Default>(capability: Capability, slot: Slot<T>) -> Result<T> {
    match slot {
        Some(outcome) => outcome,
        None => match capability.policy() {
            Policy::Mandatory => {
                debug!("capability {} not populated", capability as u8);
                Err(Error::NotSupported)
            }
            Policy::Advisory => Ok(T::default()),
        },
    }
}
