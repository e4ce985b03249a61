pub mod geocoder;
pub mod weather;

pub use geocoder::{GeoSource, Geocoder, Located};
pub use weather::WeatherEnricher;
