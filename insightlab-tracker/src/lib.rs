//! InsightLab Tracker: persisted client state behind a record store.
//!
//! This crate builds on `insightlab-core` to provide:
//! - A key/value `RecordStore` seam with file and in-memory backends
//! - The learning-progress state machine (streaks, badges, concepts)
//! - The paper-trading book of saved portfolios

pub mod paper;
pub mod progress;
pub mod store;

pub use paper::{paper_value, PaperBook, PaperError, PaperPortfolio, PaperUpdate, INITIAL_CAPITAL};
pub use progress::{
    ActivityKind, ActivityOutcome, Badge, ConceptProgress, ProgressState, ProgressTracker,
};
pub use store::{
    load_or_default, save_record, FileRecordStore, MemoryRecordStore, RecordStore, StoreError,
    PAPER_PORTFOLIOS_KEY, PROGRESS_KEY,
};
