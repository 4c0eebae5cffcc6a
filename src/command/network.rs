//! Network registration and PDP context activation.
use heapless::Vec;

use super::{Command, ResponseMode};
use crate::config::TrackerConfig;
use crate::error::Error;

/// Modem ready check.
pub const AT: &str = "AT";
/// SIM status query, re-issued while the modem reports `NO SIM`.
pub const SIM_STATUS: &str = "AT+CPIN?";
/// Circuit switched registration status.
pub const CS_REGISTRATION: &str = "AT+CREG?";
/// Packet switched registration status.
pub const PS_REGISTRATION: &str = "AT+CGREG?";
pub const SIGNAL_QUALITY: &str = "AT+CSQ";
pub const OPERATOR: &str = "AT+COPS?";
pub const CONTEXT_STATE: &str = "AT+QIACT?";

pub const ATTACH_BATCH_LEN: usize = 10;

pub fn sim_status<C: TrackerConfig>() -> Result<Command, Error> {
    Command::new(SIM_STATUS, ResponseMode::NetConfig, C::COMMAND_WAIT)
}

/// The ordered batch issued while attaching to the network.
pub fn attach_batch<C: TrackerConfig>() -> Result<Vec<Command, ATTACH_BATCH_LEN>, Error> {
    let plain = |text: &str| Command::new(text, ResponseMode::NetConfig, C::COMMAND_WAIT);

    let mut batch = Vec::new();
    for cmd in [
        plain(AT)?,
        sim_status::<C>()?,
        plain(CS_REGISTRATION)?,
        plain(PS_REGISTRATION)?,
        plain(SIGNAL_QUALITY)?,
        plain(OPERATOR)?,
        plain(PS_REGISTRATION)?,
        Command::format(
            format_args!(
                "AT+QICSGP={},1,\"{}\",\"{}\",\"{}\",0",
                C::PDP_CONTEXT_ID,
                C::APN.name(),
                C::APN.username(),
                C::APN.password()
            ),
            ResponseMode::NetConfig,
            C::COMMAND_WAIT,
        )?,
        Command::format(
            format_args!("AT+QIACT={}", C::PDP_CONTEXT_ID),
            ResponseMode::NetConfig,
            C::COMMAND_WAIT,
        )?,
        plain(CONTEXT_STATE)?,
    ] {
        batch.push(cmd).map_err(|_| Error::Overflow)?;
    }
    Ok(batch)
}
