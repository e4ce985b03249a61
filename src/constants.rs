//! Defaults for the Visit Seattle source and its enrichment services.
//! Everything here can be overridden through `Config`.

// Upstream index site
pub const DEFAULT_INDEX_URL: &str = "https://visitseattle.org/events/page/";
pub const DEFAULT_EVENT_LINK_PREFIX: &str = "https://visitseattle.org/events/";

// Enrichment services
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search.php";
pub const DEFAULT_WEATHER_URL: &str = "https://api.weather.gov";
pub const DEFAULT_CITY_QUALIFIER: &str = "Seattle";

// Seattle city center, used when a venue cannot be geocoded
pub const SEATTLE_LATITUDE: f64 = 47.6062;
pub const SEATTLE_LONGITUDE: f64 = -122.3321;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "seattle_events/",
    env!("CARGO_PKG_VERSION"),
    " (event listing enrichment)"
);

// Checkpoint keys
pub const LINKS_CHECKPOINT: &str = "links";
pub const RECORDS_CHECKPOINT: &str = "records";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATABASE_PATH: &str = "data/events.db";
