//! Conversion of NMEA degrees-minutes coordinates to signed decimal degrees.
use heapless::Vec;

use crate::error::Error;
use crate::payload::CsvFields;

/// Fields of a GGA sentence looked at when searching for the position.
const MAX_SCANNED_FIELDS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Number of leading characters holding whole degrees (`DDMM.MMMMM`
    /// versus `DDDMM.MMMMM`). NMEA has no separator between degree and minute
    /// digits, so the width is fixed per axis.
    pub const fn degree_width(self) -> usize {
        match self {
            Axis::Latitude => 2,
            Axis::Longitude => 3,
        }
    }

    pub const fn bound(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    /// Sign for a hemisphere letter, `None` if the letter does not belong to
    /// this axis.
    fn sign(self, hemisphere: &str) -> Option<f64> {
        match (self, hemisphere) {
            (Axis::Latitude, "N") | (Axis::Longitude, "E") => Some(1.0),
            (Axis::Latitude, "S") | (Axis::Longitude, "W") => Some(-1.0),
            _ => None,
        }
    }

    /// Convert `value` with its hemisphere letter to signed decimal degrees,
    /// south and west negative.
    pub fn to_decimal(self, value: &str, hemisphere: &str) -> Result<f64, Error> {
        let sign = self.sign(hemisphere).ok_or(Error::InvalidCoordinate)?;
        let magnitude = sexagesimal_to_decimal(value, self.degree_width())?;
        if magnitude > self.bound() {
            return Err(Error::InvalidCoordinate);
        }
        Ok(sign * magnitude)
    }
}

/// Convert an unsigned degrees-minutes string to decimal degrees.
///
/// The first `limit` characters are whole degrees. The rest are minutes:
/// exactly two integer digits, a mandatory decimal point, then the fraction.
pub fn sexagesimal_to_decimal(value: &str, limit: usize) -> Result<f64, Error> {
    let mut degrees = 0u32;
    let mut minutes = 0u32;
    let mut minute_digits = 0usize;
    let mut fraction = 0f64;
    let mut scale = 0.1f64;
    let mut seen_point = false;

    for (i, c) in value.chars().enumerate() {
        if i >= limit && c == '.' {
            if seen_point {
                return Err(Error::InvalidCoordinate);
            }
            seen_point = true;
            continue;
        }

        let digit = c.to_digit(10).ok_or(Error::InvalidCoordinate)?;
        if i < limit {
            degrees = degrees * 10 + digit;
        } else if !seen_point {
            minute_digits += 1;
            if minute_digits > 2 {
                return Err(Error::InvalidCoordinate);
            }
            minutes = minutes * 10 + digit;
        } else {
            fraction += f64::from(digit) * scale;
            scale /= 10.0;
        }
    }

    if !seen_point || minute_digits != 2 || minutes >= 60 {
        return Err(Error::InvalidCoordinate);
    }

    Ok(f64::from(degrees) + (f64::from(minutes) + fraction) / 60.0)
}

/// A position fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    /// Extract the position from the fields of a GGA sentence.
    ///
    /// The position is the first `lat,N|S,lon,E|W` run. Depending on whether
    /// the modem prefixes the sentence with its talker address, the UTC time
    /// either precedes the first comma or is the first field, so the run is
    /// located by its hemisphere letters rather than by a fixed index.
    pub fn from_fields(fields: &CsvFields<'_>) -> Result<Self, Error> {
        let fields: Vec<&str, MAX_SCANNED_FIELDS> = fields.iter().take(MAX_SCANNED_FIELDS).collect();

        let run = fields
            .windows(4)
            .find(|w| matches!(w[1], "N" | "S") && matches!(w[3], "E" | "W"))
            .ok_or(Error::InvalidCoordinate)?;

        Ok(Self {
            latitude: Axis::Latitude.to_decimal(run[0], run[1])?,
            longitude: Axis::Longitude.to_decimal(run[2], run[3])?,
        })
    }
}
