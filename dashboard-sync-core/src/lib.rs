#![doc = "dashboard-sync-core: core logic library for dashboard-sync."]

//! Provider clients, transformers, storage adapters and the stats sync
//! orchestrator behind the personal stats dashboard.
//!
//! Nothing here reads process state on its own: clients are constructed from a
//! [`config::ProviderConfig`] and [`config::SyncSettings`] and passed into the
//! functions that need them.
//!
//! # Usage
//! The `dashboard-sync` CLI crate is the production caller; integration tests
//! drive the same API against `mockito` servers and the in-memory stores.

pub mod config;
pub mod contract;
pub mod discogs;
pub mod error;
pub mod firestore;
pub mod flickr;
pub mod gcs;
pub mod github;
pub mod http;
pub mod media;
pub mod memory;
pub mod range;
pub mod spotify;
pub mod synchronise;
pub mod transform;
pub mod wakatime;
