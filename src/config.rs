use core::convert::Infallible;
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Placeholder for an indicator or button that is not wired up.
///
/// As a button it reads high, which is "released" for the active-low inputs
/// used by [`PinPeripherals`](crate::peripherals::PinPeripherals).
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Static configuration record of a tracker device.
///
/// Everything the command batches embed (identifiers, broker endpoint, topic
/// names, certificate references) plus the retry bounds and wait windows of
/// the sequencer. Only the device and broker identity have no default.
pub trait TrackerConfig {
    const DEVICE_ID: &'static str;
    const BROKER_HOST: &'static str;
    const CLIENT_ID: &'static str;
    const SUBSCRIBE_TOPIC: &'static str;

    const BROKER_PORT: u16 = 8883;
    /// Topic carrying liveness announcements.
    const STATUS_TOPIC: &'static str = "AWS/CIER/INFO/1";
    /// Topic carrying location reports.
    const INFO_TOPIC: &'static str = "AWS/CIER/INFO/1";

    const APN: Apn<'static> = Apn::None;
    const PDP_CONTEXT_ID: u8 = 1;
    const MQTT_CLIENT_INDEX: u8 = 0;
    const SSL_CONTEXT_ID: u8 = 2;

    const CA_CERT: &'static str = "UFS:cacert.pem";
    const CLIENT_CERT: &'static str = "UFS:client.pem";
    const CLIENT_KEY: &'static str = "UFS:user_key.pem";

    /// How many times `AT+CPIN?` is re-issued while the modem reports `NO SIM`.
    const MAX_SIM_RETRIES: u8 = 10;

    /// Response window of an ordinary configuration command.
    const COMMAND_WAIT: Duration = Duration::from_millis(1000);
    /// Response window of broker connect and subscribe.
    const BROKER_WAIT: Duration = Duration::from_secs(5);
    /// Silence on the link that terminates a response.
    const IDLE_GAP: Duration = Duration::from_millis(100);
    /// Pause between two commands of a batch.
    const INTER_COMMAND_DELAY: Duration = Duration::from_millis(500);
    /// Pause after a soft broker-stage retry.
    const RETRY_PAUSE: Duration = Duration::from_millis(1000);
    /// Wait for the `>` prompt after a publish announcement.
    const PUBLISH_PROMPT_WAIT: Duration = Duration::from_millis(500);
    /// Wait for the publish acknowledgement after the payload.
    const PUBLISH_ACK_WAIT: Duration = Duration::from_millis(2000);
    /// How long one steady-state cycle listens for an alert.
    const POLL_WINDOW: Duration = Duration::from_millis(1000);
    /// Overall bound on waiting for the subscribe acknowledgement.
    const SESSION_TIMEOUT: Duration = Duration::from_secs(60);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Apn<'a> {
    None,
    Given {
        name: &'a str,
        username: Option<&'a str>,
        password: Option<&'a str>,
    },
}

impl Default for Apn<'_> {
    fn default() -> Self {
        Self::None
    }
}

impl<'a> Apn<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Apn::None => "",
            Apn::Given { name, .. } => name,
        }
    }

    pub fn username(&self) -> &'a str {
        match self {
            Apn::Given {
                username: Some(u), ..
            } => u,
            _ => "",
        }
    }

    pub fn password(&self) -> &'a str {
        match self {
            Apn::Given {
                password: Some(p), ..
            } => p,
            _ => "",
        }
    }
}
