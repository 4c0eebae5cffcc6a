#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // Link errors
    /// No response arrived within the wait window.
    TransportTimeout,
    /// The underlying serial link reported an I/O failure.
    Transport(embedded_io::ErrorKind),
    /// A response, command or payload did not fit its fixed-capacity buffer.
    Overflow,

    // Modem sentinels
    /// The broker stage answered `ERROR`. The only error that ends a session.
    ProtocolError,
    /// A publish was answered with `ERROR`. The session carries on.
    PublishRejected,
    /// The modem answered `NO SIM`.
    SimNotReady,

    // Payload errors, always recovered locally
    MalformedPayload,
    InvalidCoordinate,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::TransportTimeout => defmt::write!(f, "TransportTimeout"),
            Self::Transport(e) => defmt::write!(f, "Transport({:?})", e),
            Self::Overflow => defmt::write!(f, "Overflow"),
            Self::ProtocolError => defmt::write!(f, "ProtocolError"),
            Self::PublishRejected => defmt::write!(f, "PublishRejected"),
            Self::SimNotReady => defmt::write!(f, "SimNotReady"),
            Self::MalformedPayload => defmt::write!(f, "MalformedPayload"),
            Self::InvalidCoordinate => defmt::write!(f, "InvalidCoordinate"),
        }
    }
}

impl From<serde_json_core::de::Error> for Error {
    fn from(_: serde_json_core::de::Error) -> Self {
        Self::MalformedPayload
    }
}

impl From<serde_json_core::ser::Error> for Error {
    fn from(_: serde_json_core::ser::Error) -> Self {
        Self::Overflow
    }
}

impl From<embassy_time::TimeoutError> for Error {
    fn from(_: embassy_time::TimeoutError) -> Self {
        Self::TransportTimeout
    }
}
