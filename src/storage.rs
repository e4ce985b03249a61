use crate::error::Result;
use crate::types::EnrichedRecord;
use metrics::counter;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument};

const CREATE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    url               TEXT PRIMARY KEY,
    title             TEXT NOT NULL,
    date              TEXT NOT NULL,
    venue             TEXT NOT NULL,
    category          TEXT NOT NULL,
    region            TEXT NOT NULL,
    latitude          REAL,
    longitude         REAL,
    weather_condition TEXT,
    temperature       INTEGER,
    wind_speed        TEXT
);
"#;

// First write wins: a URL already in the table is never touched again
const INSERT_EVENT: &str = r#"
INSERT INTO events (url, title, date, venue, category, region,
                    latitude, longitude, weather_condition, temperature, wind_speed)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT(url) DO NOTHING
"#;

/// One row of the `events` table as the dashboard reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub url: String,
    pub title: String,
    /// RFC 3339 with the Pacific offset of that day
    pub date: String,
    pub venue: String,
    pub category: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather_condition: Option<String>,
    pub temperature: Option<i64>,
    pub wind_speed: Option<String>,
}

impl EventRow {
    pub fn from_record(record: &EnrichedRecord) -> Result<Self> {
        let geo = record.geolocation.as_ref();
        let weather = record.weather.as_ref();
        Ok(Self {
            url: record.url.clone(),
            title: record.event.title.clone(),
            date: record.event.starts_at()?.to_rfc3339(),
            venue: record.event.venue.clone(),
            category: record.event.category.clone(),
            region: record.event.region.clone(),
            latitude: geo.map(|g| g.latitude),
            longitude: geo.map(|g| g.longitude),
            weather_condition: weather.map(|w| w.condition.clone()),
            temperature: weather.map(|w| w.temperature),
            wind_speed: weather.and_then(|w| w.wind_speed.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub inserted: usize,
    /// Rows whose URL was already present
    pub ignored: usize,
}

pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_EVENTS)?;
        Ok(())
    }

    /// Inserts the whole batch in one transaction. Any error rolls the
    /// batch back when the transaction is dropped.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn persist(&mut self, records: &[EnrichedRecord]) -> Result<StoreReport> {
        let rows = records
            .iter()
            .map(EventRow::from_record)
            .collect::<Result<Vec<_>>>()?;

        let tx = self.conn.transaction()?;
        let mut report = StoreReport::default();
        {
            let mut stmt = tx.prepare(INSERT_EVENT)?;
            for row in &rows {
                let changed = stmt.execute(params![
                    row.url,
                    row.title,
                    row.date,
                    row.venue,
                    row.category,
                    row.region,
                    row.latitude,
                    row.longitude,
                    row.weather_condition,
                    row.temperature,
                    row.wind_speed,
                ])?;
                if changed == 0 {
                    debug!(url = %row.url, "Already stored, leaving as is");
                    report.ignored += 1;
                } else {
                    report.inserted += changed;
                }
            }
        }
        tx.commit()?;

        counter!("seattle_events_rows_inserted_total").increment(report.inserted as u64);
        counter!("seattle_events_rows_ignored_total").increment(report.ignored as u64);
        info!(
            inserted = report.inserted,
            ignored = report.ignored,
            "Batch committed"
        );
        Ok(report)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn load_all(&self) -> Result<Vec<EventRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, date, venue, category, region, latitude, longitude,
                    weather_condition, temperature, wind_speed
             FROM events ORDER BY url",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EventRow {
                url: row.get(0)?,
                title: row.get(1)?,
                date: row.get(2)?,
                venue: row.get(3)?,
                category: row.get(4)?,
                region: row.get(5)?,
                latitude: row.get(6)?,
                longitude: row.get(7)?,
                weather_condition: row.get(8)?,
                temperature: row.get(9)?,
                wind_speed: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
