pub mod client;
pub mod collector;
pub mod error;
pub mod types;

pub use client::{UpstreamClient, UpstreamConfig};
pub use collector::{collect_media, collect_people, CollectMode, CollectorConfig};
pub use error::UpstreamError;
pub use types::{MediaPage, PeoplePage};
