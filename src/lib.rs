//! Client-side mirror of imageboard threads.
//!
//! A [`ThreadMirror`] holds the last known posts of one thread and brings
//! them up to date with [`ThreadMirror::refresh`], reporting how many posts
//! were added and removed upstream. Every outbound request, from any call
//! path, is paced by one shared [`RequestGate`].

pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod mirror;
pub mod models;
pub mod parse;
pub mod sync;
pub mod urls;

pub use client::ChanClient;
pub use config::Config;
pub use error::{Error, Result};
pub use gate::{GateConfig, RequestGate};
pub use mirror::{Fetched, Fetcher, ThreadMirror};
pub use models::{Board, CatalogPage, File, Identified, Post, PostId, ThreadKey, ThreadPreview};
pub use sync::{reconcile, Delta};
pub use urls::ApiHosts;
