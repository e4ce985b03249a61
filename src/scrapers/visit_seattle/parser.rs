use crate::error::{Result, ScraperError};
use crate::types::RawEvent;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<h1 class="page-title" itemprop="headline">(.+?)</h1>"#)
        .expect("title pattern compiles")
});

static DATE_VENUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<h4><span>.*?(\d{1,2}/\d{1,2}/\d{4})</span> \| <span>(.+?)</span></h4>"#)
        .expect("date/venue pattern compiles")
});

static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a href=".+?" class="button big medium black category">(.+?)</a>"#)
        .expect("category pattern compiles")
});

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).trim().to_string()
}

/// Downstream filters rely on these never being blank.
fn required(field: &str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(ScraperError::Extraction(format!("{field} is blank")));
    }
    Ok(value)
}

/// Pulls a `RawEvent` out of one Visit Seattle detail page.
///
/// Every field is located by a fixed markup pattern; if any pattern is
/// missing the whole page is rejected with `ScraperError::Extraction`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetailParser;

impl DetailParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &str) -> Result<RawEvent> {
        let title = TITLE_RE
            .captures(body)
            .map(|c| decode(&c[1]))
            .ok_or_else(|| ScraperError::Extraction("title heading not found".into()))?;

        let date_venue = DATE_VENUE_RE
            .captures(body)
            .ok_or_else(|| ScraperError::Extraction("date/venue line not found".into()))?;
        let date = NaiveDate::parse_from_str(&date_venue[1], "%m/%d/%Y").map_err(|e| {
            ScraperError::Extraction(format!("unparseable date '{}': {e}", &date_venue[1]))
        })?;
        let venue = decode(&date_venue[2]);

        // First category button is the category, second the region
        let mut metas = CATEGORY_RE.captures_iter(body).map(|c| decode(&c[1]));
        let category = metas
            .next()
            .ok_or_else(|| ScraperError::Extraction("category link not found".into()))?;
        let region = metas
            .next()
            .ok_or_else(|| ScraperError::Extraction("region link not found".into()))?;

        Ok(RawEvent {
            title: required("title", title)?,
            date,
            venue: required("venue", venue)?,
            category: required("category", category)?,
            region: required("region", region)?,
        })
    }
}
