use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;

use crate::error::Error;

/// Phase of the modem session.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Idle = 0,
    AttachingNetwork = 1,
    EnablingGps = 2,
    ConnectingBroker = 3,
    Subscribed = 4,
    PlayingAlert = 5,
}

impl SessionState {
    /// Setup only moves forward one stage at a time, an alert returns to
    /// `Subscribed` when stopped, and a restart may happen from anywhere.
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, to),
            (_, Idle)
                | (Idle, AttachingNetwork)
                | (AttachingNetwork, EnablingGps)
                | (EnablingGps, ConnectingBroker)
                | (ConnectingBroker, Subscribed)
                | (Subscribed, PlayingAlert)
                | (PlayingAlert, Subscribed)
        )
    }

    pub fn is_steady(self) -> bool {
        matches!(self, SessionState::Subscribed | SessionState::PlayingAlert)
    }
}

/// Session state together with the retry budget of the current stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    max_retry_attempts: u8,
    retry_count: u8,
    inner: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub const fn new() -> Self {
        Self {
            max_retry_attempts: 10,
            retry_count: 0,
            inner: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner
    }

    pub fn set_max_retry_attempts(&mut self, max_retry_attempts: u8) {
        self.max_retry_attempts = max_retry_attempts;
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Move to `new_state`, resetting the retry budget. Transitions not
    /// allowed by [`SessionState::can_transition`] are refused.
    pub fn set_state(&mut self, new_state: SessionState) -> bool {
        if new_state == self.inner {
            return true;
        }
        if !self.inner.can_transition(new_state) {
            error!(
                "Refusing session transition: {:?} -> {:?}",
                self.inner, new_state
            );
            return false;
        }

        debug!("Session transition: {:?} -> {:?}", self.inner, new_state);
        self.reset_retries();
        self.inner = new_state;
        true
    }

    /// Count one more retry, or fail with `exhausted` once the budget is
    /// spent. Returns the attempt number on success.
    pub fn retry_or_fail(&mut self, exhausted: Error) -> Result<u8, Error> {
        if self.retry_count >= self.max_retry_attempts {
            return Err(exhausted);
        }

        self.retry_count += 1;
        warn!(
            "[RETRY] attempt {} of {} in {:?}",
            self.retry_count, self.max_retry_attempts, self.inner
        );
        Ok(self.retry_count)
    }
}

pub struct State {
    shared: Mutex<NoopRawMutex, RefCell<Shared>>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                session: Session::new(),
                state_waker: WakerRegistration::new(),
            })),
        }
    }
}

struct Shared {
    session: Session,
    state_waker: WakerRegistration,
}

/// Handle on the shared session. The sequencer is its only writer.
#[derive(Clone)]
pub struct Runner<'d> {
    shared: &'d Mutex<NoopRawMutex, RefCell<Shared>>,
}

impl<'d> Runner<'d> {
    pub fn new(state: &'d State) -> Self {
        Self {
            shared: &state.shared,
        }
    }

    pub fn session_state(&self, cx: Option<&mut Context>) -> SessionState {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            if let Some(cx) = cx {
                s.state_waker.register(cx.waker());
            }
            s.session.state()
        })
    }

    pub(crate) fn set_session_state(&self, state: SessionState) -> bool {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            let changed = s.session.set_state(state);
            s.state_waker.wake();
            changed
        })
    }

    pub(crate) fn update_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut().session))
    }

    pub fn retry_count(&self) -> u8 {
        self.shared.lock(|s| s.borrow().session.retry_count())
    }

    pub async fn wait_for_session_state(&self, state: SessionState) {
        if self.session_state(None) == state {
            return;
        }

        poll_fn(|cx| {
            if self.session_state(Some(cx)) == state {
                return Poll::Ready(());
            }
            Poll::Pending
        })
        .await
    }
}
