use super::control::ControlChannel;
use super::state;

/// Statically allocatable storage shared by [`Control`](super::control::Control)
/// and [`Runner`](super::runner::Runner).
pub struct Resources {
    pub(crate) ch: state::State,
    pub(crate) signals: ControlChannel,
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

impl Resources {
    pub const fn new() -> Self {
        Self {
            ch: state::State::new(),
            signals: ControlChannel::new(),
        }
    }
}
