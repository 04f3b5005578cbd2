//! Maptastic - bulk raster map tile downloader
//!
//! This library downloads every slippy-map tile covering a bounding box
//! across a range of zoom levels and keeps retrying until each expected tile
//! exists on disk and is non-empty.
//!
//! # High-Level API
//!
//! ```ignore
//! use maptastic::codec::{Quality, TileCodec};
//! use maptastic::coord::{Region, ZoomRange};
//! use maptastic::engine::{DownloadEngine, EngineConfig, NoopObserver};
//! use maptastic::fetcher::TileFetcher;
//! use maptastic::provider::{HttpSettings, ReqwestClient, RequestRetryPolicy, RetryingClient, TileEndpoint};
//! use maptastic::store::{TileLayout, TileStore};
//!
//! let client = RetryingClient::new(ReqwestClient::new(&HttpSettings::default())?, RequestRetryPolicy::default());
//! let store = TileStore::new(TileLayout::new("maps", "thunderforest", "atlas"));
//! let fetcher = TileFetcher::new(client, TileEndpoint::thunderforest("atlas", api_key), store, TileCodec::from_quality(Quality::Medium));
//! let engine = DownloadEngine::new(fetcher, EngineConfig::default())?;
//!
//! let region: Region = "40.75,-73.99,40.74,-73.98".parse()?;
//! let report = engine.run(&region, ZoomRange::new(10, 14)?, &NoopObserver);
//! ```

pub mod codec;
pub mod config;
pub mod coord;
pub mod engine;
pub mod fetcher;
pub mod logging;
pub mod provider;
pub mod store;

/// Version of the Maptastic library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
