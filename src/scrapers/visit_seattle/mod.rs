pub mod crawler;
pub mod parser;

pub use crawler::{CrawlReport, LinkCrawler};
pub use parser::DetailParser;
