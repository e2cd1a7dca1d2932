//! Kindred - personal relationship tracker
//!
//! Keeps the people a user cares about, folds duplicate contacts together,
//! and reminds the user ahead of birthdays, anniversaries and events.

pub mod api;
pub mod auth;
pub mod celebrations;
pub mod config;
pub mod context;
pub mod db;
pub mod dedup;
pub mod digest;
pub mod error;
pub mod events;
pub mod jobs;
pub mod metrics;
pub mod normalize;
pub mod notifier;
pub mod people;
pub mod reminders;
pub mod server;
pub mod users;

pub use context::AppContext;
pub use error::{KindredError, KindredResult};
