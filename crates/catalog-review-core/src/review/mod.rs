//! Editable review table for one catalog file: unsaved-change tracking,
//! navigation guarding and the finish-review sequence.

pub mod finish;
pub mod navigation;
pub mod rows;
pub mod session;

pub use finish::{FinishOutcome, FinishSummary};
pub use navigation::{NavigationDecision, NavigationIntent, PendingNavigation, UnsavedChoice};
pub use session::{RemovalPrompt, ReviewFilter, ReviewPhase, ReviewSession, RowField, PAGE_SIZE};
