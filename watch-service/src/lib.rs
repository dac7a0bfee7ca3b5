pub mod detect;
pub mod filter;
pub mod pipeline;
pub mod service;

pub use detect::{detect_new, next_marker};
pub use filter::filter_keywords;
pub use pipeline::{RunReport, WatchSettings, Watcher};
pub use service::WatchService;
