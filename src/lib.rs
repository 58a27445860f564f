//! Multi-source job listing aggregator.
//!
//! [`aggregator::Aggregator`] fans a [`models::SearchRequest`] out to one
//! scraper per platform, scores each listing against the search keywords,
//! and persists the ones not already stored.

pub mod aggregator;
pub mod config;
pub mod database;
pub mod dedup;
pub mod error;
pub mod http_client;
pub mod jobs;
pub mod models;
pub mod pacing;
pub mod scorer;
pub mod scrapers;
pub mod source_adapter;
