//! Stop detail responses.
//!
//! The info-window endpoint returns JSON in which non-ASCII characters are
//! written as JavaScript `\xNN` escapes. Those must become characters before
//! the document is valid JSON.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::domain::LatLng;

use super::error::MetadataError;

/// Coordinates and operator of a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopDetail {
    pub location: LatLng,
    pub agency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailDto {
    latlng: LatLng,
    info_window: Option<InfoWindowDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoWindowDto {
    transit_schedules: Option<TransitSchedulesDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitSchedulesDto {
    station_schedules: Option<StationSchedulesDto>,
}

#[derive(Debug, Deserialize)]
struct StationSchedulesDto {
    #[serde(default)]
    agencies: Vec<AgencyDto>,
}

#[derive(Debug, Deserialize)]
struct AgencyDto {
    agency_name: Option<String>,
}

/// Replace `\xNN` escapes with the characters they encode.
pub fn decode_hex_escapes(raw: &str) -> Result<String, MetadataError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\\x(\w{2})").unwrap());

    let mut failure = None;
    let decoded = pattern.replace_all(raw, |caps: &Captures<'_>| {
        match u8::from_str_radix(&caps[1], 16) {
            Ok(byte) => char::from(byte).to_string(),
            Err(_) => {
                failure.get_or_insert_with(|| caps[0].to_string());
                caps[0].to_string()
            }
        }
    });

    match failure {
        Some(escape) => Err(MetadataError::Decode {
            message: format!("invalid hex escape {escape}"),
        }),
        None => Ok(decoded.into_owned()),
    }
}

/// Decode a raw stop detail response.
pub fn decode_stop_detail(raw: &str) -> Result<StopDetail, MetadataError> {
    let text = decode_hex_escapes(raw)?;
    let dto: DetailDto = serde_json::from_str(&text).map_err(|e| MetadataError::Decode {
        message: e.to_string(),
    })?;

    let agency = dto
        .info_window
        .and_then(|w| w.transit_schedules)
        .and_then(|t| t.station_schedules)
        .and_then(|s| s.agencies.into_iter().next())
        .and_then(|a| a.agency_name);

    Ok(StopDetail {
        location: dto.latlng,
        agency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hex_escapes() {
        assert_eq!(decode_hex_escapes(r"Caf\xe9 \x26 Bar").unwrap(), "Café & Bar");
        assert_eq!(decode_hex_escapes("plain").unwrap(), "plain");
    }

    #[test]
    fn rejects_non_hex_escape() {
        let err = decode_hex_escapes(r"bad \xzz here").unwrap_err();
        assert!(err.to_string().contains(r"\xzz"));
    }

    #[test]
    fn reads_location_and_agency() {
        let raw = r#"{"latlng":{"lat":42.02891,"lng":-93.647096},
            "infoWindow":{"transitSchedules":{"stationSchedules":
            {"agencies":[{"agency_name":"CyRide"},{"agency_name":"Other"}]}}}}"#;
        let detail = decode_stop_detail(raw).unwrap();
        assert_eq!(detail.location.lat, 42.02891);
        assert_eq!(detail.location.lng, -93.647096);
        assert_eq!(detail.agency.as_deref(), Some("CyRide"));
    }

    #[test]
    fn agency_is_optional() {
        let detail = decode_stop_detail(r#"{"latlng":{"lat":1.0,"lng":2.0}}"#).unwrap();
        assert_eq!(detail.agency, None);

        let detail = decode_stop_detail(
            r#"{"latlng":{"lat":1.0,"lng":2.0},"infoWindow":{"title":"x"}}"#,
        )
        .unwrap();
        assert_eq!(detail.agency, None);
    }

    #[test]
    fn escaped_agency_name() {
        let raw = r#"{"latlng":{"lat":1.0,"lng":2.0},"infoWindow":{"transitSchedules":
            {"stationSchedules":{"agencies":[{"agency_name":"Soci\xe9t\xe9"}]}}}}"#;
        assert_eq!(
            decode_stop_detail(raw).unwrap().agency.as_deref(),
            Some("Société")
        );
    }

    #[test]
    fn missing_location_is_decode_error() {
        let err = decode_stop_detail(r#"{"infoWindow":{}}"#).unwrap_err();
        assert!(matches!(err, MetadataError::Decode { .. }));
    }
}
