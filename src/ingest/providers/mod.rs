// src/ingest/providers/mod.rs
pub mod google_news;
pub mod newsapi;

pub use google_news::GoogleNewsProvider;
pub use newsapi::NewsApiProvider;
