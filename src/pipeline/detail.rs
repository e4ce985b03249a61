use crate::app::ports::HttpClientPort;
use crate::enrichment::{GeoSource, Geocoder, Located, WeatherEnricher};
use crate::error::ScraperError;
use crate::scrapers::visit_seattle::DetailParser;
use crate::types::{EnrichedRecord, Link};
use metrics::{counter, histogram};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

/// Transition an item was attempting when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemStage {
    Fetch,
    Extract,
    Geocode,
    Enrich,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Fetch => "fetch",
            ItemStage::Extract => "extract",
            ItemStage::Geocode => "geocode",
            ItemStage::Enrich => "enrich",
        };
        f.write_str(name)
    }
}

/// A link that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub link: Link,
    /// `None` when the item's task died before reporting a stage
    pub stage: Option<ItemStage>,
    pub reason: String,
}

impl SkippedItem {
    fn new(link: &str, stage: ItemStage, err: &ScraperError) -> Self {
        Self {
            link: link.to_string(),
            stage: Some(stage),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemResult {
    pub record: EnrichedRecord,
    pub geo_source: GeoSource,
    pub forecast_missing: bool,
}

#[derive(Debug, Default)]
pub struct DetailReport {
    /// In input order
    pub records: Vec<EnrichedRecord>,
    pub skipped: Vec<SkippedItem>,
    pub geocode_fallbacks: usize,
    pub forecasts_missing: usize,
}

/// Runs fetch → extract → geocode → weather for every link, several links
/// at a time. Items share nothing mutable, so one item's failure cannot
/// affect another's outcome.
#[derive(Clone)]
pub struct DetailPipeline {
    http: Arc<dyn HttpClientPort>,
    parser: DetailParser,
    geocoder: Geocoder,
    weather: WeatherEnricher,
    concurrency: usize,
}

impl DetailPipeline {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        geocoder: Geocoder,
        weather: WeatherEnricher,
        concurrency: usize,
    ) -> Self {
        Self {
            http,
            parser: DetailParser::new(),
            geocoder,
            weather,
            concurrency: concurrency.max(1),
        }
    }

    /// One link through the whole chain. Only fetch and extraction failures
    /// drop the item; geocoding and weather failures degrade it.
    pub async fn process(&self, link: &str) -> Result<ItemResult, SkippedItem> {
        let body = self
            .http
            .get(link)
            .await
            .map_err(|e| SkippedItem::new(link, ItemStage::Fetch, &e))?
            .text();
        debug!(link, "Fetched");

        let event = self
            .parser
            .parse(&body)
            .map_err(|e| SkippedItem::new(link, ItemStage::Extract, &e))?;
        debug!(link, title = %event.title, "Extracted");

        let query = event.location_query(self.geocoder.city_qualifier());
        let located = match self.geocoder.locate(&query).await {
            Ok(located) => located,
            Err(e) => {
                warn!(
                    link,
                    stage = %ItemStage::Geocode,
                    error = %e,
                    "Geocoding failed, using fallback"
                );
                self.geocoder.fallback()
            }
        };
        let Located { point, source } = located;
        debug!(link, ?source, "Geocoded");

        let weather = match self.weather.forecast(point.as_ref()).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!(
                    link,
                    stage = %ItemStage::Enrich,
                    error = %e,
                    "Weather lookup failed, recording without forecast"
                );
                None
            }
        };
        let forecast_missing = weather.is_none();
        debug!(link, forecast = !forecast_missing, "Enriched");

        Ok(ItemResult {
            record: EnrichedRecord {
                url: link.to_string(),
                event,
                geolocation: point,
                weather,
            },
            geo_source: source,
            forecast_missing,
        })
    }

    pub async fn run(&self, links: &[Link]) -> DetailReport {
        let started = Instant::now();
        let sem = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = links
            .iter()
            .map(|link| {
                let worker = self.clone();
                let sem = sem.clone();
                let item_link = link.clone();
                let span = tracing::debug_span!("item", link = %link);
                let handle = tokio::spawn(
                    async move {
                        // Held until the item is done
                        let _permit = sem.acquire_owned().await.ok();
                        worker.process(&item_link).await
                    }
                    .instrument(span),
                );
                (link, handle)
            })
            .collect();

        let mut report = DetailReport::default();
        for (link, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|join_err| {
                Err(SkippedItem {
                    link: link.clone(),
                    stage: None,
                    reason: format!("item task failed: {join_err}"),
                })
            });
            match outcome {
                Ok(item) => {
                    debug!(link = %link, "Recorded");
                    if item.geo_source == GeoSource::Fallback {
                        report.geocode_fallbacks += 1;
                    }
                    if item.forecast_missing {
                        report.forecasts_missing += 1;
                    }
                    report.records.push(item.record);
                }
                Err(skipped) => {
                    warn!(
                        link = %skipped.link,
                        stage = ?skipped.stage,
                        reason = %skipped.reason,
                        "Skipping item"
                    );
                    report.skipped.push(skipped);
                }
            }
        }

        counter!("seattle_events_items_total", "outcome" => "recorded")
            .increment(report.records.len() as u64);
        counter!("seattle_events_items_total", "outcome" => "skipped")
            .increment(report.skipped.len() as u64);
        histogram!("seattle_events_detail_stage_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            links = links.len(),
            records = report.records.len(),
            skipped = report.skipped.len(),
            geocode_fallbacks = report.geocode_fallbacks,
            forecasts_missing = report.forecasts_missing,
            "Detail stage finished"
        );
        report
    }
}
