//! Decoding of the `{"message": "<code>"}` frames received on the subscribe
//! topic.
use serde::Deserialize;

use crate::error::Error;

/// Largest JSON frame accepted by [`decode`].
pub const MAX_ALERT_FRAME: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AlertCode {
    /// Nothing actionable this cycle.
    None = 0,
    Earthquake = 1,
    Flood = 2,
    Landslide = 3,
    LightningStrike = 4,
    Thunderstorm = 5,
    LocationRequest,
    StatusRequest,
}

impl AlertCode {
    pub fn from_message(message: &str) -> Self {
        match message {
            "1" => Self::Earthquake,
            "2" => Self::Flood,
            "3" => Self::Landslide,
            "4" => Self::LightningStrike,
            "5" => Self::Thunderstorm,
            "LOC" => Self::LocationRequest,
            "STATUS" => Self::StatusRequest,
            _ => Self::None,
        }
    }

    pub fn is_disaster(&self) -> bool {
        self.track().is_some()
    }

    /// Audio track played for a disaster code.
    pub fn track(&self) -> Option<&'static str> {
        match self {
            Self::Earthquake => Some("EARTHQUAKE"),
            Self::Flood => Some("FLOOD"),
            Self::Landslide => Some("LANDSLIDE"),
            Self::LightningStrike => Some("LIGHTENINGSTRIKE"),
            Self::Thunderstorm => Some("THUNDERSTORM"),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlertMessage<'a> {
    #[serde(borrow, default)]
    message: Option<&'a str>,
}

/// Decode one JSON frame.
///
/// A frame that is too large or not valid JSON is
/// [`Error::MalformedPayload`]. A well formed frame without a recognised
/// `message` decodes to [`AlertCode::None`].
pub fn decode(json: &str) -> Result<AlertCode, Error> {
    if json.len() > MAX_ALERT_FRAME {
        return Err(Error::MalformedPayload);
    }

    let (frame, _) = serde_json_core::from_str::<AlertMessage<'_>>(json)?;
    Ok(frame.message.map_or(AlertCode::None, AlertCode::from_message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disaster_codes_in_order() {
        let codes: heapless::Vec<AlertCode, 5> = ["1", "2", "3", "4", "5"]
            .into_iter()
            .map(AlertCode::from_message)
            .collect();

        assert_eq!(
            codes.as_slice(),
            &[
                AlertCode::Earthquake,
                AlertCode::Flood,
                AlertCode::Landslide,
                AlertCode::LightningStrike,
                AlertCode::Thunderstorm,
            ]
        );
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
        assert!(codes.iter().all(|c| c.is_disaster()));
    }

    #[test]
    fn directives() {
        assert_eq!(decode(r#"{"message":"LOC"}"#), Ok(AlertCode::LocationRequest));
        assert_eq!(decode(r#"{"message":"STATUS"}"#), Ok(AlertCode::StatusRequest));
        assert!(!AlertCode::LocationRequest.is_disaster());
        assert_eq!(AlertCode::StatusRequest.track(), None);
    }

    #[test]
    fn landslide_track() {
        let code = decode(r#"{"message":"3"}"#).unwrap();
        assert_eq!(code, AlertCode::Landslide);
        assert_eq!(code.track(), Some("LANDSLIDE"));
    }

    #[test]
    fn unknown_or_missing_message_is_none() {
        assert_eq!(decode(r#"{"message":"6"}"#), Ok(AlertCode::None));
        assert_eq!(decode(r#"{"message":"loc"}"#), Ok(AlertCode::None));
        assert_eq!(decode(r#"{"message":""}"#), Ok(AlertCode::None));
        assert_eq!(decode(r#"{}"#), Ok(AlertCode::None));
        assert_eq!(decode(r#"{"other":"1"}"#), Ok(AlertCode::None));
        assert_eq!(
            decode(r#"{"id":"7","message":"2"}"#),
            Ok(AlertCode::Flood)
        );
    }

    #[test]
    fn malformed_frames() {
        assert_eq!(decode(r#"{"message":"1""#), Err(Error::MalformedPayload));
        assert_eq!(decode(r#"{"message":1}"#), Err(Error::MalformedPayload));
        assert_eq!(decode("not json"), Err(Error::MalformedPayload));
        assert_eq!(decode(""), Err(Error::MalformedPayload));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut frame: heapless::String<512> = heapless::String::new();
        frame.push_str(r#"{"message":"1","pad":""#).unwrap();
        while frame.len() < MAX_ALERT_FRAME {
            frame.push('x').unwrap();
        }
        frame.push_str(r#""}"#).unwrap();

        assert_eq!(decode(&frame), Err(Error::MalformedPayload));
    }
}
