//! AT commands understood by the Quectel EC200/EG9x family as used by the
//! tracker: network attach, GNSS and MQTT-over-TLS.
//!
//! Commands are plain text lines. Each one carries the [`ResponseMode`] the
//! sequencer applies to whatever the modem answers, and the response window
//! it waits for that answer.
pub mod gps;
pub mod mqtt;
pub mod network;

use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;

use crate::error::Error;

/// Maximum length of a single command line, without the line terminator.
pub const MAX_COMMAND_LEN: usize = 192;

/// How the sequencer interprets the response to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseMode {
    /// Plain status text; `NO SIM` triggers a bounded SIM-status retry.
    NetConfig,
    /// Plain status text; `ERROR` is fatal, the subscribe acknowledgement is
    /// success, anything else is a soft retry.
    MqttConfig,
    /// An embedded JSON alert message may be present.
    AlertListen,
    /// Comma separated NMEA fields carrying a GNSS fix.
    LocationQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String<MAX_COMMAND_LEN>,
    mode: ResponseMode,
    wait: Duration,
}

impl Command {
    pub fn new(text: &str, mode: ResponseMode, wait: Duration) -> Result<Self, Error> {
        Ok(Self {
            text: String::try_from(text).map_err(|_| Error::Overflow)?,
            mode,
            wait,
        })
    }

    /// Build a command from format arguments, e.g. `AT+QIACT=1`.
    pub fn format(
        args: core::fmt::Arguments<'_>,
        mode: ResponseMode,
        wait: Duration,
    ) -> Result<Self, Error> {
        let mut text = String::new();
        text.write_fmt(args).map_err(|_| Error::Overflow)?;
        Ok(Self { text, mode, wait })
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}
