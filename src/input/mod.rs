//! Interrupt-driven input decoding - rotary encoder + press switch.
//!
//! Two ISR callbacks feed this module: one shared by the encoder's two
//! quadrature lines, one for the press switch. Both are restricted to
//! timestamp-checking a debounce window, updating the fixed-size atomic
//! state below, and setting a "changed" flag - they never allocate,
//! never log, and complete in microseconds.
//!
//! The main loop drains the switch-changed flag exactly once per tick
//! through [`InputShared::take_switch_changed`] (an atomic `swap`, so a
//! callback can never be interleaved into a split read-modify-write).

pub mod encoder;

#[cfg(test)]
mod tests;

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

use crate::config::{ENCODER_DEBOUNCE_MS, SWITCH_DEBOUNCE_MS};
use crate::timeutil::elapsed_ms;

/// Input state shared between the ISR callbacks and the main loop.
///
/// The raw position counter drifts monotonically with rotation and is
/// never reset after process start; consumers derive the coarse detent
/// via [`encoder::detent`].
pub struct InputShared {
    /// Raw quadrature count, written only by the encoder ISR.
    position: AtomicI32,
    /// Last accepted 2-bit gray code.
    last_code: AtomicU8,
    /// Monotonic stamp of the last accepted encoder transition.
    last_encoder_ms: AtomicU32,
    /// Debounced switch level (true = pressed).
    switch_pressed: AtomicBool,
    /// Level-change flag, drained once per main-loop tick.
    switch_changed: AtomicBool,
    /// Monotonic stamp of the last accepted switch edge.
    last_switch_ms: AtomicU32,
}

impl InputShared {
    pub const fn new() -> Self {
        Self {
            position: AtomicI32::new(0),
            last_code: AtomicU8::new(0b11), // both lines idle-high
            last_encoder_ms: AtomicU32::new(0),
            switch_pressed: AtomicBool::new(false),
            switch_changed: AtomicBool::new(false),
            last_switch_ms: AtomicU32::new(0),
        }
    }

    /// Encoder ISR entry: decode one raw transition of the two lines.
    ///
    /// Transitions closer than [`ENCODER_DEBOUNCE_MS`] to the last
    /// accepted one are discarded outright. Accepted transitions update
    /// the stored gray code even when the 4-bit transition code is
    /// invalid, so the decoder re-synchronizes after contact chatter.
    pub fn on_encoder_edge(&self, line_a: bool, line_b: bool, now_ms: u32) {
        let code = encoder::gray_code(line_a, line_b);
        let prev = self.last_code.load(Ordering::Relaxed);
        if code == prev {
            return;
        }
        if elapsed_ms(now_ms, self.last_encoder_ms.load(Ordering::Relaxed)) < ENCODER_DEBOUNCE_MS {
            return;
        }

        self.last_code.store(code, Ordering::Relaxed);
        self.last_encoder_ms.store(now_ms, Ordering::Relaxed);

        let delta = encoder::transition_delta(prev, code);
        if delta != 0 {
            self.position.fetch_add(i32::from(delta), Ordering::Relaxed);
        }
    }

    /// Switch ISR entry: accept one debounced level change.
    pub fn on_switch_edge(&self, pressed: bool, now_ms: u32) {
        if elapsed_ms(now_ms, self.last_switch_ms.load(Ordering::Relaxed)) < SWITCH_DEBOUNCE_MS {
            return;
        }
        self.last_switch_ms.store(now_ms, Ordering::Relaxed);
        self.switch_pressed.store(pressed, Ordering::Relaxed);
        self.switch_changed.store(true, Ordering::Relaxed);
    }

    /// Raw quadrature position.
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Relaxed)
    }

    /// Current coarse detent.
    pub fn detent(&self) -> i32 {
        encoder::detent(self.position())
    }

    /// Debounced switch level.
    pub fn is_pressed(&self) -> bool {
        self.switch_pressed.load(Ordering::Relaxed)
    }

    /// Consume the switch-changed flag (once per tick).
    pub fn take_switch_changed(&self) -> bool {
        self.switch_changed.swap(false, Ordering::Relaxed)
    }

    /// Peek at the switch-changed flag without consuming it. Busy-wait
    /// sub-sequences use this so a cancelling press is re-processed by
    /// the next regular tick.
    pub fn switch_change_pending(&self) -> bool {
        self.switch_changed.load(Ordering::Relaxed)
    }
}

impl Default for InputShared {
    fn default() -> Self {
        Self::new()
    }
}
