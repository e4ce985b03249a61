#![allow(dead_code)]

use async_trait::async_trait;
use seattle_events::app::ports::{HttpClientPort, HttpGetResult};
use seattle_events::config::{Config, GeocodeFallback};
use seattle_events::constants::{DEFAULT_GEOCODER_URL, DEFAULT_INDEX_URL};
use seattle_events::error::{FetchFailure, Result, ScraperError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned bodies by exact URL and remembers every request.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, FetchFailure>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn route(&self, url: impl Into<String>, body: impl Into<String>) -> &Self {
        self.routes.lock().unwrap().insert(url.into(), body.into());
        self
    }

    pub fn route_json(&self, url: impl Into<String>, body: Value) -> &Self {
        self.route(url, body.to_string())
    }

    /// Answers `url` with a transport failure instead of a body.
    pub fn fail(&self, url: impl Into<String>, failure: FetchFailure) -> &Self {
        self.failures.lock().unwrap().insert(url.into(), failure);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == url)
    }
}

#[async_trait]
impl HttpClientPort for FakeHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(failure) = self.failures.lock().unwrap().get(url).cloned() {
            return Err(ScraperError::fetch(url, failure));
        }
        let body = self
            .routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::fetch(url, FetchFailure::Status(404)))?;
        Ok(HttpGetResult {
            status: 200,
            bytes: body.into_bytes(),
            content_type: "text/html; charset=utf-8".into(),
        })
    }
}

pub fn test_config(fallback: GeocodeFallback) -> Config {
    let mut config = Config::default();
    config.geocoder.fallback = fallback;
    config.geocoder.requests_per_min = 0;
    config
}

pub fn event_url(slug: &str) -> String {
    format!("https://visitseattle.org/events/{slug}/")
}

pub fn index_url(page: u32) -> String {
    format!("{DEFAULT_INDEX_URL}{page}/")
}

pub fn index_page(last_page: u32, slugs: &[&str]) -> String {
    let mut body = format!(
        "<ul class=\"pagination\"><li class=\"bpn-last-page-link\"><a href=\"https://visitseattle.org/events/page/{last_page}/?frm=events\" title=\"Navigate to last page\">&raquo;</a></li></ul>\n"
    );
    for slug in slugs {
        body.push_str(&format!(
            "<div class=\"event\"><h3 class=\"event-title\"><a href=\"{}\" title=\"{slug}\">{slug}</a></h3></div>\n",
            event_url(slug)
        ));
    }
    body
}

pub fn detail_page(title: &str, date: &str, venue: &str, category: &str, region: &str) -> String {
    format!(
        r#"<html><body>
<h1 class="page-title" itemprop="headline">{title}</h1>
<h4><span>Friday, {date}</span> | <span>{venue}</span></h4>
<a href="https://visitseattle.org/events/?c=1" class="button big medium black category">{category}</a>
<a href="https://visitseattle.org/events/?r=1" class="button big medium black category">{region}</a>
</body></html>"#
    )
}

pub fn geocode_url(query: &str) -> String {
    reqwest::Url::parse_with_params(DEFAULT_GEOCODER_URL, &[("q", query), ("format", "json")])
        .unwrap()
        .to_string()
}

pub fn points_url(lat: &str, lon: &str) -> String {
    format!("https://api.weather.gov/points/{lat},{lon}")
}

/// Wires both weather hops for one coordinate.
pub fn route_weather(http: &FakeHttp, lat: &str, lon: &str, condition: &str, temperature: i64) {
    let forecast_url = format!("https://api.weather.gov/gridpoints/SEW/{lat}/{lon}/forecast");
    http.route_json(
        points_url(lat, lon),
        json!({ "properties": { "forecast": forecast_url } }),
    );
    http.route_json(
        forecast_url,
        json!({ "properties": { "periods": [
            { "number": 1, "name": "Tonight", "shortForecast": condition,
              "temperature": temperature, "windSpeed": "5 mph" },
            { "number": 2, "name": "Tomorrow", "shortForecast": "Later",
              "temperature": 0, "windSpeed": "0 mph" }
        ]}}),
    );
}

/// Two index pages: A and B on page 1, C on page 2. B has no date line,
/// A geocodes to Capitol Hill, C has no geocoding candidates.
pub fn seattle_snapshot() -> FakeHttp {
    let http = FakeHttp::default();
    http.route(index_url(1), index_page(2, &["a", "b"]));
    http.route(index_url(2), index_page(2, &["c"]));

    http.route(
        event_url("a"),
        detail_page("Night &amp; Day", "6/14/2024", "Neumos", "Music", "Capitol Hill"),
    );
    http.route(
        event_url("b"),
        detail_page("Broken", "date TBA", "Somewhere", "Arts", "Downtown"),
    );
    http.route(
        event_url("c"),
        detail_page("Secret Show", "12/1/2024", "Unlisted Loft", "Music", "SoDo"),
    );

    http.route_json(
        geocode_url("Neumos, Capitol Hill, Seattle"),
        json!([{ "lat": "47.6141", "lon": "-122.3196", "display_name": "Neumos" }]),
    );
    http.route_json(geocode_url("Unlisted Loft, SoDo, Seattle"), json!([]));

    route_weather(&http, "47.6141", "-122.3196", "Mostly Sunny", 72);
    route_weather(&http, "47.6062", "-122.3321", "Rain", 45);
    http
}
