//! Persistence for chorus: monitored channels, the message buffer,
//! conversation summaries, suggestions, and pipeline run history.
//!
//! [`Store`] is the trait seam; [`PgStore`] is the production Postgres
//! implementation and [`MemoryStore`] backs tests.

pub mod store;
pub mod store_memory;
pub mod store_pg;
pub mod types;

pub use {
    store::Store,
    store_memory::MemoryStore,
    store_pg::PgStore,
    types::{
        MonitoredChannel, NewMessage, NewSuggestion, PipelineRun, RunStatus, RunTrigger,
        StoredMessage, Suggestion, SuggestionStatus, SummaryMetadata, SummaryRecord,
    },
};
