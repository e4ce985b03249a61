//! Three-stage ingestion: crawl the paginated index for links, enrich each
//! detail page, persist the batch. Each stage leaves a checkpoint so a later
//! stage can be re-run on its own.

pub mod detail;

pub use detail::{DetailPipeline, DetailReport, ItemStage, SkippedItem};

use crate::app::ports::{CheckpointPort, HttpClientPort};
use crate::config::Config;
use crate::enrichment::{Geocoder, WeatherEnricher};
use crate::error::{Result, ScraperError};
use crate::scrapers::visit_seattle::LinkCrawler;
use crate::storage::{EventStore, StoreReport};
use crate::types::{EnrichedRecord, Link};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Summary of one run, or of the stages that ran.
#[derive(Debug, Default, Serialize)]
pub struct PipelineResult {
    pub links_discovered: usize,
    pub records_enriched: usize,
    pub rows_inserted: usize,
    pub rows_already_present: usize,
    pub geocode_fallbacks: usize,
    pub forecasts_missing: usize,
    pub failed_index_pages: Vec<u32>,
    pub skipped: Vec<SkippedItem>,
}

impl PipelineResult {
    fn absorb_details(&mut self, report: &DetailReport) {
        self.records_enriched = report.records.len();
        self.geocode_fallbacks = report.geocode_fallbacks;
        self.forecasts_missing = report.forecasts_missing;
        self.skipped = report.skipped.clone();
    }

    fn absorb_store(&mut self, report: StoreReport) {
        self.rows_inserted = report.inserted;
        self.rows_already_present = report.ignored;
    }
}

pub struct Pipeline {
    crawler: LinkCrawler,
    details: DetailPipeline,
    checkpoint: Arc<dyn CheckpointPort>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        http: Arc<dyn HttpClientPort>,
        checkpoint: Arc<dyn CheckpointPort>,
    ) -> Result<Self> {
        let crawler = LinkCrawler::new(http.clone(), config.crawler.clone())?;
        let geocoder = Geocoder::new(http.clone(), config.geocoder.clone());
        let weather = WeatherEnricher::new(http.clone(), config.weather.clone());
        let details = DetailPipeline::new(http, geocoder, weather, config.pipeline.concurrency);
        Ok(Self {
            crawler,
            details,
            checkpoint,
        })
    }

    /// Stage 1. Fails only when the pagination bound can't be found.
    #[instrument(skip(self, result))]
    pub async fn crawl(&self, result: &mut PipelineResult) -> Result<Vec<Link>> {
        let started = Instant::now();
        let report = self.crawler.crawl().await?;
        self.checkpoint.save_links(&report.links).await?;
        histogram!("seattle_events_crawl_stage_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result.links_discovered = report.links.len();
        result.failed_index_pages = report.failed_pages;
        Ok(report.links)
    }

    /// Stage 2. Per-item failures end up in `result.skipped`, never in `Err`.
    #[instrument(skip(self, links, result), fields(links = links.len()))]
    pub async fn enrich(
        &self,
        links: &[Link],
        result: &mut PipelineResult,
    ) -> Result<Vec<EnrichedRecord>> {
        let report = self.details.run(links).await;
        self.checkpoint.save_records(&report.records).await?;
        result.absorb_details(&report);
        Ok(report.records)
    }

    /// Stage 3. The store is borrowed only for the length of the batch.
    #[instrument(skip(self, store, records, result), fields(records = records.len()))]
    pub fn store(
        &self,
        store: &mut EventStore,
        records: &[EnrichedRecord],
        result: &mut PipelineResult,
    ) -> Result<StoreReport> {
        let report = store.persist(records)?;
        result.absorb_store(report);
        Ok(report)
    }

    /// Re-enrich from the link checkpoint without crawling.
    pub async fn enrich_from_checkpoint(&self) -> Result<PipelineResult> {
        let links = self.checkpoint.load_links().await?.ok_or_else(|| {
            ScraperError::Config("no link checkpoint found; run the crawl stage first".into())
        })?;
        let mut result = PipelineResult {
            links_discovered: links.len(),
            ..PipelineResult::default()
        };
        self.enrich(&links, &mut result).await?;
        Ok(result)
    }

    /// Persist the record checkpoint without crawling or enriching.
    pub async fn store_from_checkpoint(&self, store: &mut EventStore) -> Result<PipelineResult> {
        let records = self.checkpoint.load_records().await?.ok_or_else(|| {
            ScraperError::Config("no record checkpoint found; run the enrich stage first".into())
        })?;
        let mut result = PipelineResult {
            records_enriched: records.len(),
            ..PipelineResult::default()
        };
        self.store(store, &records, &mut result)?;
        Ok(result)
    }

    pub async fn crawl_only(&self) -> Result<PipelineResult> {
        let mut result = PipelineResult::default();
        self.crawl(&mut result).await?;
        Ok(result)
    }

    /// All three stages. Only a crawl or persistence failure escapes.
    pub async fn run(&self, store: &mut EventStore) -> Result<PipelineResult> {
        let started = Instant::now();
        counter!("seattle_events_pipeline_runs_total").increment(1);
        let mut result = PipelineResult::default();

        let links = self.crawl(&mut result).await?;
        let records = self.enrich(&links, &mut result).await?;
        self.store(store, &records, &mut result)?;

        histogram!("seattle_events_pipeline_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            links = result.links_discovered,
            enriched = result.records_enriched,
            inserted = result.rows_inserted,
            already_present = result.rows_already_present,
            skipped = result.skipped.len(),
            "Pipeline finished"
        );
        Ok(result)
    }
}
