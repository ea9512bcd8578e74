//! Physical-controller mapping
//!
//! Maps physical controller elements to joypad buttons. The table is
//! remappable at runtime; the default layout mirrors a standard extended
//! gamepad.

use crate::buttons::JoypadButtons;
use std::collections::HashMap;

/// A physical element on the connected controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostButton {
    /// Bottom face button
    South,
    /// Right face button
    East,
    /// Left face button
    West,
    /// Top face button
    North,
    ShoulderL,
    ShoulderR,
    TriggerL,
    TriggerR,
    ThumbL,
    ThumbR,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Start,
    Select,
}

/// Remappable physical-input to joypad-button table
pub struct ButtonMapping {
    mappings: HashMap<HostButton, JoypadButtons>,
}

impl ButtonMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Standard extended-gamepad layout
    pub fn default_layout() -> Self {
        let mut mapping = Self::new();

        mapping.map(HostButton::South, JoypadButtons::B);
        mapping.map(HostButton::East, JoypadButtons::A);
        mapping.map(HostButton::West, JoypadButtons::Y);
        mapping.map(HostButton::North, JoypadButtons::X);

        mapping.map(HostButton::ShoulderL, JoypadButtons::L);
        mapping.map(HostButton::ShoulderR, JoypadButtons::R);
        mapping.map(HostButton::TriggerL, JoypadButtons::L2);
        mapping.map(HostButton::TriggerR, JoypadButtons::R2);
        mapping.map(HostButton::ThumbL, JoypadButtons::L3);
        mapping.map(HostButton::ThumbR, JoypadButtons::R3);

        mapping.map(HostButton::DpadUp, JoypadButtons::UP);
        mapping.map(HostButton::DpadDown, JoypadButtons::DOWN);
        mapping.map(HostButton::DpadLeft, JoypadButtons::LEFT);
        mapping.map(HostButton::DpadRight, JoypadButtons::RIGHT);

        mapping.map(HostButton::Start, JoypadButtons::START);
        mapping.map(HostButton::Select, JoypadButtons::SELECT);

        mapping
    }

    /// Map a physical element to a joypad button, replacing any previous
    /// assignment for that element
    pub fn map(&mut self, host: HostButton, target: JoypadButtons) {
        self.mappings.insert(host, target);
    }

    /// Remove the assignment for a physical element
    pub fn unmap(&mut self, host: HostButton) {
        self.mappings.remove(&host);
    }

    /// The joypad button a physical element drives, if any
    pub fn target_for(&self, host: HostButton) -> Option<JoypadButtons> {
        self.mappings.get(&host).copied()
    }

    /// Fold a set of pressed physical elements into a joypad mask
    pub fn mask_for(&self, pressed: &[HostButton]) -> JoypadButtons {
        let mut mask = JoypadButtons::empty();
        for host in pressed {
            if let Some(target) = self.target_for(*host) {
                mask |= target;
            }
        }
        mask
    }
}

impl Default for ButtonMapping {
    fn default() -> Self {
        Self::default_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let mapping = ButtonMapping::default_layout();
        assert_eq!(mapping.target_for(HostButton::South), Some(JoypadButtons::B));
        assert_eq!(
            mapping.target_for(HostButton::DpadUp),
            Some(JoypadButtons::UP)
        );
    }

    #[test]
    fn test_remap_replaces_assignment() {
        let mut mapping = ButtonMapping::default_layout();
        // Swap the confirm button for players used to the other layout
        mapping.map(HostButton::South, JoypadButtons::A);
        assert_eq!(mapping.target_for(HostButton::South), Some(JoypadButtons::A));
    }

    #[test]
    fn test_mask_for_unions_pressed() {
        let mapping = ButtonMapping::default_layout();
        let mask = mapping.mask_for(&[
            HostButton::South,
            HostButton::DpadLeft,
            HostButton::Start,
        ]);
        assert_eq!(
            mask,
            JoypadButtons::B | JoypadButtons::LEFT | JoypadButtons::START
        );
    }

    #[test]
    fn test_unmapped_elements_ignored() {
        let mut mapping = ButtonMapping::new();
        mapping.map(HostButton::South, JoypadButtons::B);
        let mask = mapping.mask_for(&[HostButton::South, HostButton::North]);
        assert_eq!(mask, JoypadButtons::B);
    }
}
