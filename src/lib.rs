//! PC-build quotation manager with a StaticICE price lookup

pub mod aggregator;
pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod normalize;
pub mod presentation;
pub mod price_finder;
pub mod scraper;
pub mod scrapers;
pub mod session;
pub mod traits;
