//! Cricket Scoring Engine: delivery ingestion and statistics aggregation.
//!
//! Takes one delivery at a time, validates it, and applies it to every
//! dependent aggregate (batting and bowling figures, innings totals, over/ball
//! progression, innings transition) in a single all-or-nothing transaction.
//!
//! No network, no DB; pure computation over a pluggable store, with an
//! in-memory store included.

pub mod config;
pub mod engine;
pub mod error;
pub mod innings;
pub mod normalize;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::ScoringError;
pub use store::{InMemoryStore, MatchLookup, PlayerLookup, ScoreStore};
pub use types::{DeliveryOutcome, Fixture, RawDelivery, Scorecard};
