mod browser;
mod fetcher;
pub mod parser;
mod tests;

pub use browser::BrowserFetcher;
pub use fetcher::{
    build_fetcher, DocumentOrigin, FallbackFetcher, FeedDocument, FeedFetcher, HttpFetcher,
};
pub use parser::{filter_category, into_chronological, parse_document, parse_feed};
