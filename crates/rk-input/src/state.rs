//! Merged input state and the poll-time latch
//!
//! Three sources each own a button mask: the physical controller, the
//! on-screen controls, and synthetic inputs. The poll step computes their
//! union once and latches it together with the touch state, so every
//! input-state query within one run invocation observes the same values.

use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::Mutex;

use crate::buttons::{JoypadButtons, SyntheticButton};

/// Touch coordinates forwarded to the pointer device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchState {
    pub x: i16,
    pub y: i16,
    pub pressed: bool,
}

/// One consistent view of all inputs, taken at poll time
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    pub buttons: JoypadButtons,
    pub touch: TouchState,
}

/// Collects input sources and serves the core's input queries
pub struct InputAggregator {
    physical: AtomicU16,
    on_screen: AtomicU16,
    synthetic: AtomicU16,
    touch: Mutex<TouchState>,
    latched: Mutex<InputSnapshot>,
}

impl InputAggregator {
    pub fn new() -> Self {
        Self {
            physical: AtomicU16::new(0),
            on_screen: AtomicU16::new(0),
            synthetic: AtomicU16::new(0),
            touch: Mutex::new(TouchState::default()),
            latched: Mutex::new(InputSnapshot::default()),
        }
    }

    /// Replace the physical-controller mask (computed via `ButtonMapping`)
    pub fn set_physical(&self, mask: JoypadButtons) {
        self.physical.store(mask.bits(), Ordering::Relaxed);
    }

    /// Replace the whole on-screen mask
    pub fn set_on_screen(&self, mask: JoypadButtons) {
        self.on_screen.store(mask.bits(), Ordering::Relaxed);
    }

    /// Press or release a single on-screen button
    pub fn set_on_screen_button(&self, button: JoypadButtons, pressed: bool) {
        if pressed {
            self.on_screen.fetch_or(button.bits(), Ordering::Relaxed);
        } else {
            self.on_screen.fetch_and(!button.bits(), Ordering::Relaxed);
        }
    }

    /// Engage or release a synthetic source
    pub fn set_synthetic(&self, button: SyntheticButton, engaged: bool) {
        let bit = button.joypad_bit().bits();
        if engaged {
            self.synthetic.fetch_or(bit, Ordering::Relaxed);
        } else {
            self.synthetic.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    /// Update touch coordinates
    pub fn set_touch(&self, x: i16, y: i16, pressed: bool) {
        *self.touch.lock() = TouchState { x, y, pressed };
    }

    /// Latch the union of all sources.
    ///
    /// Called from the core's input-poll callback, once per run invocation.
    pub fn poll(&self) {
        let bits = self.physical.load(Ordering::Relaxed)
            | self.on_screen.load(Ordering::Relaxed)
            | self.synthetic.load(Ordering::Relaxed);
        let snapshot = InputSnapshot {
            buttons: JoypadButtons::from_bits_retain(bits),
            touch: *self.touch.lock(),
        };
        *self.latched.lock() = snapshot;
    }

    /// The snapshot taken by the last poll
    pub fn snapshot(&self) -> InputSnapshot {
        *self.latched.lock()
    }

    /// Answer an input-state query against the latched snapshot.
    ///
    /// Unknown port/device/id combinations return 0 rather than failing.
    pub fn state(&self, port: u32, device: u32, _index: u32, id: u32) -> i16 {
        if port != 0 {
            return 0;
        }

        let snapshot = self.snapshot();
        match device {
            rk_abi::DEVICE_JOYPAD => match JoypadButtons::from_query_id(id) {
                Some(button) if snapshot.buttons.contains(button) => 1,
                _ => 0,
            },
            rk_abi::DEVICE_POINTER => match id {
                rk_abi::pointer::X => snapshot.touch.x,
                rk_abi::pointer::Y => snapshot.touch.y,
                rk_abi::pointer::PRESSED => snapshot.touch.pressed as i16,
                _ => 0,
            },
            _ => 0,
        }
    }
}

impl Default for InputAggregator {
    fn default() -> Self {
        Self::new()
    }
}
