//! sheetcut-core: year-end cutover of per-entity ledger workbooks
//!
//! Splits each ledger around a cutoff year into an archive workbook and a
//! trimmed current workbook whose formulas are filled down for new entries,
//! and stamps out per-entity workbooks from a shared template. Files are
//! processed in parallel, one job per workbook.

pub mod classify;
pub mod config;
pub mod cutover;
pub mod dispatch;
pub mod document;
pub mod formula;
pub mod instantiate;
pub mod relocate;
pub mod split;

pub use classify::{CutoffDate, GoverningDate, RowClass, RowClassifier, SplitMode};
pub use config::{ConfigError, CutoverConfig};
pub use cutover::{CutoverOutput, InstanceOutput, ReferenceLedger, run_cutover, run_instantiation};
pub use dispatch::{CleanupFailure, RunReport, WorkerOutcome, empty_dir};
pub use document::{Document, LoadMode};
pub use formula::{TranslateError, translate_formula};
