pub mod delta;
pub mod engagement;
pub mod error;
pub mod orchestrator;
pub mod shared;
pub mod types;

pub use error::SearchError;
pub use orchestrator::{EngineLimits, SearchEngine};
pub use shared::compare_activity;
pub use types::{
    AdmirerEntry, AdmirersResult, AdvancedSearchResult, BasicSearchResult, MediaPageResult,
    PeoplePageResult, PostRef, ProfileDetailsResult, RedFlagEntry, SharedActivityResult,
    UpsellNotice,
};
