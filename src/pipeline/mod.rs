//! Triage pipeline.
//!
//! Every batch flows through:
//! 1. [`classifier::Classifier`]: category and confidence per message
//! 2. [`reply::ReplyDrafter`]: suggested reply text
//! 3. [`risk::is_risky`]: manual follow-up flag
//! 4. [`orchestrator::Orchestrator`]: persistence, export and notification
//!
//! **No auto-send path exists.** Drafts are only ever sent after a reviewer
//! approves them in the export.

pub mod classifier;
pub mod orchestrator;
pub mod reply;
pub mod risk;
pub mod types;

pub use classifier::Classifier;
pub use orchestrator::Orchestrator;
pub use reply::ReplyDrafter;
pub use types::{Category, Classification, InboundEmail, ManualItem, RunSummary};
