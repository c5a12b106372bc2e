//! Persistence layer: libSQL review ledger, situation library and CSV export.

pub mod export;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use export::{ExportRow, ReviewExporter, approved_rows, read_export};
pub use libsql_backend::LibSqlBackend;
pub use traits::{
    Database, NewReview, PeriodCounts, ReviewRecord, ReviewStatus, RiskFlag, ScenarioSeed,
    ScenarioTemplate,
};
