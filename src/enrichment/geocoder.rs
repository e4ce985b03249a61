use crate::app::ports::HttpClientPort;
use crate::config::{GeocodeFallback, GeocoderConfig};
use crate::error::{Result, ScraperError};
use crate::rate_limiter::RateLimiter;
use crate::types::GeoPoint;
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One search hit; the service sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct Candidate {
    lat: Value,
    lon: Value,
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoSource {
    Resolved,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    pub point: Option<GeoPoint>,
    pub source: GeoSource,
}

/// Free-text venue lookup against a Nominatim-style search endpoint.
#[derive(Clone)]
pub struct Geocoder {
    http: Arc<dyn HttpClientPort>,
    config: GeocoderConfig,
    limiter: RateLimiter,
}

impl Geocoder {
    pub fn new(http: Arc<dyn HttpClientPort>, config: GeocoderConfig) -> Self {
        let limiter = RateLimiter::per_minute(config.requests_per_min);
        Self {
            http,
            config,
            limiter,
        }
    }

    pub fn city_qualifier(&self) -> &str {
        &self.config.city_qualifier
    }

    pub fn search_url(&self, query: &str) -> Result<String> {
        reqwest::Url::parse_with_params(&self.config.base_url, &[("q", query), ("format", "json")])
            .map(|u| u.to_string())
            .map_err(|e| ScraperError::Geocoding(format!("bad geocoder URL: {e}")))
    }

    /// What a record gets when the lookup has nothing to offer. The same
    /// answer for every item in a run.
    pub fn fallback(&self) -> Located {
        let point = match self.config.fallback {
            GeocodeFallback::DefaultLocation => Some(GeoPoint::new(
                self.config.default_latitude,
                self.config.default_longitude,
            )),
            GeocodeFallback::Absent => None,
        };
        counter!("seattle_events_geocode_fallbacks_total").increment(1);
        Located {
            point,
            source: GeoSource::Fallback,
        }
    }

    /// First candidate's coordinates, or `None` when the service has no match.
    pub async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>> {
        let url = self.search_url(query)?;
        self.limiter.acquire().await;
        let resp = self
            .http
            .get(&url)
            .await
            .map_err(|e| ScraperError::Geocoding(e.to_string()))?;
        let candidates: Vec<Candidate> = resp
            .json()
            .map_err(|e| ScraperError::Geocoding(format!("unexpected response: {e}")))?;

        let Some(first) = candidates.first() else {
            return Ok(None);
        };
        let latitude = coordinate(&first.lat)
            .ok_or_else(|| ScraperError::Geocoding(format!("bad latitude {}", first.lat)))?;
        let longitude = coordinate(&first.lon)
            .ok_or_else(|| ScraperError::Geocoding(format!("bad longitude {}", first.lon)))?;
        Ok(Some(GeoPoint::new(latitude, longitude)))
    }

    /// Lookup with the no-match fallback applied. Transport and decode
    /// failures still surface as `ScraperError::Geocoding`.
    #[instrument(skip(self))]
    pub async fn locate(&self, query: &str) -> Result<Located> {
        match self.lookup(query).await? {
            Some(point) => {
                debug!(lat = point.latitude, lon = point.longitude, "Geocoded");
                Ok(Located {
                    point: Some(point),
                    source: GeoSource::Resolved,
                })
            }
            None => {
                debug!("No geocoding candidates, using fallback");
                Ok(self.fallback())
            }
        }
    }
}
