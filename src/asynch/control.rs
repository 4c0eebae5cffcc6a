use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use super::state::{self, SessionState};

/// User requests delivered to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlSignal {
    /// Stop the alert that is playing, then report the location.
    StopAlert,
    /// Report the location without touching the session.
    LongPress,
}

pub const CONTROL_CAPACITY: usize = 4;

pub(crate) type ControlChannel = Channel<NoopRawMutex, ControlSignal, CONTROL_CAPACITY>;
pub(crate) type ControlReceiver<'d> = Receiver<'d, NoopRawMutex, ControlSignal, CONTROL_CAPACITY>;

/// Handle for the application side. Signals are queued until the runner is
/// in a steady state.
#[derive(Clone)]
pub struct Control<'d> {
    state_ch: state::Runner<'d>,
    signals: Sender<'d, NoopRawMutex, ControlSignal, CONTROL_CAPACITY>,
}

impl<'d> Control<'d> {
    pub(crate) fn new(
        state_ch: state::Runner<'d>,
        signals: Sender<'d, NoopRawMutex, ControlSignal, CONTROL_CAPACITY>,
    ) -> Self {
        Self { state_ch, signals }
    }

    pub fn session_state(&self) -> SessionState {
        self.state_ch.session_state(None)
    }

    pub async fn wait_for_session_state(&self, state: SessionState) {
        self.state_ch.wait_for_session_state(state).await
    }

    pub async fn stop_alert(&self) {
        self.signals.send(ControlSignal::StopAlert).await
    }

    pub async fn request_location(&self) {
        self.signals.send(ControlSignal::LongPress).await
    }

    /// Queue `signal` without waiting, returning `false` if the queue is full.
    pub fn try_signal(&self, signal: ControlSignal) -> bool {
        self.signals.try_send(signal).is_ok()
    }
}
