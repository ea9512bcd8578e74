//! Joypad button mask

use bitflags::bitflags;

bitflags! {
    /// Joypad button flags, bit positions matching the interface's
    /// input-state query ids
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JoypadButtons: u16 {
        const B      = 1 << 0;
        const Y      = 1 << 1;
        const SELECT = 1 << 2;
        const START  = 1 << 3;
        const UP     = 1 << 4;
        const DOWN   = 1 << 5;
        const LEFT   = 1 << 6;
        const RIGHT  = 1 << 7;
        const A      = 1 << 8;
        const X      = 1 << 9;
        const L      = 1 << 10;
        const R      = 1 << 11;
        const L2     = 1 << 12;
        const R2     = 1 << 13;
        const L3     = 1 << 14;
        const R3     = 1 << 15;
    }
}

impl JoypadButtons {
    /// The flag for an input-state query id, or `None` for ids outside the
    /// joypad range
    pub fn from_query_id(id: u32) -> Option<Self> {
        if id < 16 {
            JoypadButtons::from_bits(1 << id)
        } else {
            None
        }
    }
}

/// Synthetic input sources without a physical button.
///
/// These ride on otherwise-unused joypad bits: cores that care about them
/// read them as ordinary buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticButton {
    /// Audio-threshold-derived "blow into the microphone"
    Blow,
    /// Motion-derived "lid closed"
    LidClose,
}

impl SyntheticButton {
    /// The joypad bit this synthetic source drives
    pub fn joypad_bit(self) -> JoypadButtons {
        match self {
            SyntheticButton::Blow => JoypadButtons::L2,
            SyntheticButton::LidClose => JoypadButtons::L3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_id_mapping() {
        assert_eq!(JoypadButtons::from_query_id(0), Some(JoypadButtons::B));
        assert_eq!(JoypadButtons::from_query_id(8), Some(JoypadButtons::A));
        assert_eq!(JoypadButtons::from_query_id(15), Some(JoypadButtons::R3));
        assert_eq!(JoypadButtons::from_query_id(16), None);
        assert_eq!(JoypadButtons::from_query_id(u32::MAX), None);
    }

    #[test]
    fn test_synthetic_bits_are_distinct() {
        assert_ne!(
            SyntheticButton::Blow.joypad_bit(),
            SyntheticButton::LidClose.joypad_bit()
        );
    }
}
