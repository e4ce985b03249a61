use crate::app::ports::HttpClientPort;
use crate::config::WeatherConfig;
use crate::error::{Result, ScraperError};
use crate::types::{Forecast, GeoPoint};
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

fn missing(what: &str) -> ScraperError {
    ScraperError::WeatherLookup(format!("{what} not found"))
}

/// Two-hop forecast lookup: point metadata gives the forecast URL, the
/// forecast gives the periods. Only the first (soonest) period is kept.
#[derive(Clone)]
pub struct WeatherEnricher {
    http: Arc<dyn HttpClientPort>,
    config: WeatherConfig,
}

impl WeatherEnricher {
    pub fn new(http: Arc<dyn HttpClientPort>, config: WeatherConfig) -> Self {
        Self { http, config }
    }

    pub fn points_url(&self, point: &GeoPoint) -> String {
        // The points endpoint accepts at most four decimal places
        format!(
            "{}/points/{:.4},{:.4}",
            self.config.base_url.trim_end_matches('/'),
            point.latitude,
            point.longitude
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .await
            .map_err(|e| ScraperError::WeatherLookup(e.to_string()))?;
        resp.json()
            .map_err(|e| ScraperError::WeatherLookup(format!("unexpected response: {e}")))
    }

    /// `None` coordinates mean no lookup at all and no forecast.
    #[instrument(skip(self))]
    pub async fn forecast(&self, point: Option<&GeoPoint>) -> Result<Option<Forecast>> {
        let Some(point) = point else {
            debug!("No coordinates, skipping weather lookup");
            counter!("seattle_events_weather_skipped_total").increment(1);
            return Ok(None);
        };

        let meta = self.get_json(&self.points_url(point)).await?;
        let forecast_url = meta["properties"]["forecast"]
            .as_str()
            .ok_or_else(|| missing("properties.forecast"))?;

        let forecast = self.get_json(forecast_url).await?;
        let today = forecast["properties"]["periods"]
            .as_array()
            .and_then(|periods| periods.first())
            .ok_or_else(|| missing("properties.periods[0]"))?;

        Ok(Some(parse_period(today)?))
    }
}

fn parse_period(period: &Value) -> Result<Forecast> {
    let condition = period["shortForecast"]
        .as_str()
        .ok_or_else(|| missing("shortForecast"))?
        .to_string();
    let temperature = period["temperature"]
        .as_i64()
        .or_else(|| period["temperature"].as_f64().map(|t| t.round() as i64))
        .ok_or_else(|| missing("temperature"))?;
    let wind_speed = period["windSpeed"].as_str().map(str::to_string);
    Ok(Forecast {
        condition,
        temperature,
        wind_speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use crate::error::FetchFailure;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct JsonHttp {
        routes: HashMap<String, Value>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl HttpClientPort for JsonHttp {
        async fn get(&self, url: &str) -> Result<HttpGetResult> {
            *self.calls.lock().unwrap() += 1;
            let body = self
                .routes
                .get(url)
                .ok_or_else(|| ScraperError::fetch(url, FetchFailure::Status(404)))?;
            Ok(HttpGetResult {
                status: 200,
                bytes: serde_json::to_vec(body).unwrap(),
                content_type: "application/geo+json".into(),
            })
        }
    }

    const FORECAST_URL: &str = "https://api.weather.gov/gridpoints/SEW/125,68/forecast";

    fn enricher(routes: Vec<(&str, Value)>) -> (WeatherEnricher, Arc<JsonHttp>) {
        let http = Arc::new(JsonHttp {
            routes: routes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Default::default()
        });
        (
            WeatherEnricher::new(http.clone(), WeatherConfig::default()),
            http,
        )
    }

    fn points_body() -> Value {
        json!({ "properties": { "forecast": FORECAST_URL } })
    }

    #[tokio::test]
    async fn test_first_period_is_used() {
        let (w, http) = enricher(vec![
            ("https://api.weather.gov/points/47.6062,-122.3321", points_body()),
            (
                FORECAST_URL,
                json!({ "properties": { "periods": [
                    { "shortForecast": "Light Rain", "temperature": 48, "windSpeed": "5 to 10 mph" },
                    { "shortForecast": "Sunny", "temperature": 60, "windSpeed": "2 mph" }
                ]}}),
            ),
        ]);
        let forecast = w
            .forecast(Some(&GeoPoint::new(47.6062, -122.3321)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            forecast,
            Forecast {
                condition: "Light Rain".into(),
                temperature: 48,
                wind_speed: Some("5 to 10 mph".into()),
            }
        );
        assert_eq!(*http.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_absent_coordinates_make_no_calls() {
        let (w, http) = enricher(vec![]);
        assert_eq!(w.forecast(None).await.unwrap(), None);
        assert_eq!(*http.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_forecast_url_is_weather_error() {
        let (w, _) = enricher(vec![(
            "https://api.weather.gov/points/47.6062,-122.3321",
            json!({ "status": 404, "title": "Data Unavailable For Requested Point" }),
        )]);
        let err = w
            .forecast(Some(&GeoPoint::new(47.6062, -122.3321)))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::WeatherLookup(ref m) if m.contains("forecast")));
    }

    #[tokio::test]
    async fn test_empty_periods_is_weather_error() {
        let (w, _) = enricher(vec![
            ("https://api.weather.gov/points/47.6062,-122.3321", points_body()),
            (FORECAST_URL, json!({ "properties": { "periods": [] } })),
        ]);
        assert!(matches!(
            w.forecast(Some(&GeoPoint::new(47.6062, -122.3321))).await,
            Err(ScraperError::WeatherLookup(_))
        ));
    }

    #[test]
    fn test_wind_speed_is_optional() {
        let forecast =
            parse_period(&json!({ "shortForecast": "Cloudy", "temperature": 55 })).unwrap();
        assert_eq!(forecast.wind_speed, None);
    }

    #[test]
    fn test_points_url_rounds_to_four_places() {
        let (w, _) = enricher(vec![]);
        assert_eq!(
            w.points_url(&GeoPoint::new(47.6101193, -122.33421)),
            "https://api.weather.gov/points/47.6101,-122.3342"
        );
    }
}
