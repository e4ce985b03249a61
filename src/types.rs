use crate::error::{Result, ScraperError};
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::{America::Los_Angeles, Tz};
use serde::{Deserialize, Serialize};

/// Canonical URL of one event detail page; the dedup key end to end.
pub type Link = String;

/// Fields pulled out of one detail page. Either all five are present or
/// the page produces no `RawEvent` at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: String,
    /// Calendar day in the source timezone (US Pacific)
    pub date: NaiveDate,
    pub venue: String,
    pub category: String,
    pub region: String,
}

impl RawEvent {
    /// Midnight of the event day in America/Los_Angeles.
    pub fn starts_at(&self) -> Result<DateTime<Tz>> {
        pacific_midnight(self.date)
    }

    /// Free-text query handed to the geocoder.
    pub fn location_query(&self, city_qualifier: &str) -> String {
        format!("{}, {}, {}", self.venue, self.region, city_qualifier)
    }
}

pub fn pacific_midnight(date: NaiveDate) -> Result<DateTime<Tz>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ScraperError::Extraction(format!("no midnight for {date}")))?;
    // US DST switches at 02:00, so midnight is never skipped; `earliest` covers ambiguity.
    Los_Angeles
        .from_local_datetime(&midnight)
        .earliest()
        .ok_or_else(|| ScraperError::Extraction(format!("{date} has no Pacific midnight")))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// First (soonest) forecast period for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub condition: String,
    /// As reported by the weather service, units untouched
    pub temperature: i64,
    /// Descriptor such as "5 to 10 mph"
    pub wind_speed: Option<String>,
}

/// Unit persisted by the store. Built once per successful item, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub url: Link,
    #[serde(flatten)]
    pub event: RawEvent,
    pub geolocation: Option<GeoPoint>,
    pub weather: Option<Forecast>,
}
