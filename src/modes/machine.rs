//! Blocking interaction sub-sequences.
//!
//! These are the only places the loop intentionally dwells: bounded
//! busy-wait loops that re-poll the shared input state every short
//! sub-interval so a user action cancels them promptly. A cancelling
//! input is deliberately left unconsumed - the next regular tick
//! re-processes it as if it had just occurred.

use crate::config::{CONFIRM_FLASHES, CONFIRM_HALF_MS, CONFIRM_POLL_MS};
use crate::input::InputShared;
use crate::platform::Platform;

/// How the confirmation flash sequence ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The full sequence ran with no input: proceed to submission.
    Confirmed,
    /// New input arrived mid-sequence: return to active Submit.
    Cancelled,
}

/// Flash the indicator [`CONFIRM_FLASHES`] times while watching for any
/// new input. Each flash is one on/off cycle of two half-periods.
pub fn run_confirm_flash<P: Platform>(input: &InputShared, platform: &mut P) -> ConfirmOutcome {
    let position_at_entry = input.position();

    for _ in 0..CONFIRM_FLASHES {
        for led_on in [true, false] {
            platform.set_led(led_on);

            let mut waited = 0;
            while waited < CONFIRM_HALF_MS {
                platform.delay_ms(CONFIRM_POLL_MS);
                waited += CONFIRM_POLL_MS;

                if input.position() != position_at_entry || input.switch_change_pending() {
                    platform.set_led(false);
                    return ConfirmOutcome::Cancelled;
                }
            }
        }
    }

    platform.set_led(false);
    ConfirmOutcome::Confirmed
}

/// Audible triple-beep pattern for a failed submission.
pub fn failure_beep<P: Platform>(platform: &mut P) {
    for _ in 0..3 {
        platform.set_buzzer(true);
        platform.delay_ms(100);
        platform.set_buzzer(false);
        platform.delay_ms(100);
    }
}
