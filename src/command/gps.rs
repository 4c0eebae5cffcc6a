//! GNSS engine control and NMEA sentence queries.
use heapless::Vec;

use super::{Command, ResponseMode};
use crate::config::TrackerConfig;
use crate::error::Error;

pub const POWER_ON: &str = "AT+QGPSPOWER=1";
pub const START_SESSION: &str = "AT+QGPS=1";
/// Route NMEA sentences to the AT port.
pub const NMEA_SOURCE: &str = "AT+QGPSCFG=\"nmeasrc\",1";
/// Fetch the latest GGA sentence.
pub const QUERY_GGA: &str = "AT+QGPSGNMEA=\"GGA\"";

pub const ENABLE_BATCH_LEN: usize = 3;

pub fn enable_batch<C: TrackerConfig>() -> Result<Vec<Command, ENABLE_BATCH_LEN>, Error> {
    let mut batch = Vec::new();
    for text in [POWER_ON, START_SESSION, NMEA_SOURCE] {
        batch
            .push(Command::new(text, ResponseMode::NetConfig, C::COMMAND_WAIT)?)
            .map_err(|_| Error::Overflow)?;
    }
    Ok(batch)
}

pub fn location_query<C: TrackerConfig>() -> Result<Command, Error> {
    Command::new(QUERY_GGA, ResponseMode::LocationQuery, C::COMMAND_WAIT)
}
