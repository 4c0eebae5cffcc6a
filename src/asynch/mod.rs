pub mod control;
mod resources;
pub mod runner;
pub mod state;

pub use resources::Resources;

use embedded_io_async::{Read, Write};

use crate::config::TrackerConfig;
use crate::peripherals::Peripherals;
use crate::transport::Transport;
use control::Control;
use runner::Runner;

/// Split the tracker into its application handle and the runner that owns
/// the modem link.
///
/// The runner must be driven by `.run()` in a task of its own.
pub fn new<'d, T, P, C>(
    resources: &'d mut Resources,
    io: T,
    peripherals: P,
    config: C,
) -> (Control<'d>, Runner<'d, T, P, C>)
where
    T: Read + Write,
    P: Peripherals,
    C: TrackerConfig,
{
    let resources: &'d Resources = resources;
    let state_ch = state::Runner::new(&resources.ch);

    let control = Control::new(state_ch.clone(), resources.signals.sender());
    let runner = Runner::new(
        state_ch,
        resources.signals.receiver(),
        Transport::new(io, C::IDLE_GAP),
        peripherals,
        config,
    );

    (control, runner)
}
