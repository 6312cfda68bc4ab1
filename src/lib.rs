//! # bbs-player
//!
//! Retro terminal podcast player.
//!
//! The crate ingests podcast feeds (RSS/Atom or the player's own JSON
//! format), normalizes them into one [`feed::Feed`]/[`feed::Track`] schema,
//! keeps user-added feeds in a local JSON store with a freshness window, and
//! drives playback through an external audio program.
//!
//! ```text
//! sources (HTTP + CORS relay + body cache) -> feed (JSON/XML normalization)
//!        -> library (defaults + custom feeds, storage) -> player (session)
//!        -> ui/app (terminal commands)
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod library;
pub mod player;
pub mod sources;
pub mod storage;
pub mod ui;

pub use error::{FeedError, FeedResult};
