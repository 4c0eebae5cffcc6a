//! The device's audio player, alert indicator and user button.
//!
//! None of these are driven by the modem; the runner only issues primitive
//! requests through [`Peripherals`].
use embassy_time::{Duration, Instant};
use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// How long the button must be held to request a location report.
pub const LONG_PRESS: Duration = Duration::from_secs(4);

pub trait Peripherals {
    /// Start playing the named track, replacing anything already playing.
    fn play_track(&mut self, track: &str);

    fn stop_track(&mut self);

    /// Drive the "alert active" indicator.
    fn set_indicator(&mut self, on: bool);

    fn is_user_button_pressed(&mut self) -> bool {
        false
    }

    /// `true` each time a continuous hold completes another [`LONG_PRESS`].
    fn is_long_press_detected(&mut self) -> bool {
        false
    }
}

/// Audio output used by [`PinPeripherals`].
pub trait AlertPlayer {
    fn play(&mut self, track: &str);
    fn stop(&mut self);
}

/// [`Peripherals`] built from a player, an indicator pin and an active-low
/// button pin.
pub struct PinPeripherals<P, L, B> {
    player: P,
    indicator: L,
    button: B,
    long_press: Duration,
    pressed_since: Option<Instant>,
}

impl<P, L, B> PinPeripherals<P, L, B>
where
    P: AlertPlayer,
    L: OutputPin,
    B: InputPin,
{
    pub fn new(player: P, indicator: L, button: B) -> Self {
        Self {
            player,
            indicator,
            button,
            long_press: LONG_PRESS,
            pressed_since: None,
        }
    }

    pub fn with_long_press(mut self, hold: Duration) -> Self {
        self.long_press = hold;
        self
    }

    pub fn release(self) -> (P, L, B) {
        (self.player, self.indicator, self.button)
    }

    fn button_low(&mut self) -> bool {
        match self.button.is_low() {
            Ok(low) => low,
            Err(_) => {
                warn!("Failed to read user button");
                false
            }
        }
    }
}

impl<P, L, B> Peripherals for PinPeripherals<P, L, B>
where
    P: AlertPlayer,
    L: OutputPin,
    B: InputPin,
{
    fn play_track(&mut self, track: &str) {
        self.player.play(track);
    }

    fn stop_track(&mut self) {
        self.player.stop();
    }

    fn set_indicator(&mut self, on: bool) {
        if self.indicator.set_state(PinState::from(on)).is_err() {
            warn!("Failed to drive alert indicator");
        }
    }

    fn is_user_button_pressed(&mut self) -> bool {
        self.button_low()
    }

    fn is_long_press_detected(&mut self) -> bool {
        if !self.button_low() {
            self.pressed_since = None;
            return false;
        }

        // the hold timer restarts after each report
        let now = Instant::now();
        let since = *self.pressed_since.get_or_insert(now);
        if now.duration_since(since) >= self.long_press {
            self.pressed_since = Some(now);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoPin;
    use crate::test_helpers::{MockInput, MockOutput, RecordingPlayer};
    use embassy_futures::block_on;
    use embassy_time::Timer;

    #[test]
    fn player_and_indicator_are_forwarded() {
        let player = RecordingPlayer::default();
        let led = MockOutput::default();
        let mut p = PinPeripherals::new(player.clone(), led.clone(), NoPin);

        p.play_track("FLOOD");
        p.set_indicator(true);
        assert!(led.is_high());
        p.stop_track();
        p.set_indicator(false);

        assert!(!led.is_high());
        assert_eq!(player.events(), ["play FLOOD", "stop"]);
    }

    #[test]
    fn button_is_active_low() {
        let button = MockInput::default();
        let mut p = PinPeripherals::new(RecordingPlayer::default(), NoPin, button.clone());

        assert!(!p.is_user_button_pressed());
        button.press();
        assert!(p.is_user_button_pressed());
        button.release();
        assert!(!p.is_user_button_pressed());
    }

    #[test]
    fn long_press_rearms_while_held() {
        let button = MockInput::default();
        let mut p = PinPeripherals::new(RecordingPlayer::default(), NoPin, button.clone())
            .with_long_press(Duration::from_millis(20));

        button.press();
        assert!(!p.is_long_press_detected());
        block_on(Timer::after(Duration::from_millis(30)));
        assert!(p.is_long_press_detected());
        assert!(!p.is_long_press_detected());

        // still held: another full hold reports again
        block_on(Timer::after(Duration::from_millis(30)));
        assert!(p.is_long_press_detected());
        assert!(!p.is_long_press_detected());

        // a short press after release does not count
        button.release();
        assert!(!p.is_long_press_detected());
        button.press();
        assert!(!p.is_long_press_detected());
    }

    #[test]
    fn unwired_button_never_presses() {
        let mut p = PinPeripherals::new(RecordingPlayer::default(), NoPin, NoPin);
        assert!(!p.is_user_button_pressed());
        assert!(!p.is_long_press_detected());
    }
}
