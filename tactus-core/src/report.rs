//! Touch reports and controller identity

use heapless::Vec;

/// Most contacts one report carries
pub const MAX_CONTACTS: usize = 10;

/// One finger on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contact {
    /// Tracking id, stable while the finger stays down
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub pressure: u8,
    /// Major axis of the contact area
    pub width: u8,
}

/// Wake gesture recognized while the panel is off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    /// Double tap
    KnockOn,
    /// User-defined tap sequence
    KnockCode,
}

/// Result of servicing one interrupt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchReport {
    pub contacts: Vec<Contact, MAX_CONTACTS>,
    pub gesture: Option<Gesture>,
    /// The chip flagged an internal fault; the device schedules a reset
    pub abnormal: bool,
}

impl TouchReport {
    /// Report carrying only a gesture
    pub fn gesture(gesture: Gesture) -> Self {
        Self {
            gesture: Some(gesture),
            ..Self::default()
        }
    }

    /// Check whether the report carries anything for the input layer
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty() && self.gesture.is_none()
    }
}

/// Firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

/// Controller identity read after probe and after each upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IcInfo {
    pub version: Version,
    pub product_id: [u8; 8],
    pub revision: u8,
}

impl IcInfo {
    /// Product id as text, trimmed at the first NUL
    pub fn product(&self) -> &str {
        let end = self
            .product_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.product_id.len());
        core::str::from_utf8(&self.product_id[..end]).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_trimmed() {
        let info = IcInfo {
            product_id: *b"LW46\0\0\0\0",
            ..IcInfo::default()
        };
        assert_eq!(info.product(), "LW46");
    }

    #[test]
    fn test_empty_report() {
        assert!(TouchReport::default().is_empty());
        assert!(!TouchReport::gesture(Gesture::KnockOn).is_empty());
    }
}
