//! SceneCut Pipeline - from cut points to segment files
//!
//! This crate handles:
//! - Planning contiguous ranges between cut points
//! - Extracting ranges with the stream-copy capability (or degraded mode)
//! - Writing the processing report
//! - Session bookkeeping and the `SceneCutService` facade

pub mod extractor;
pub mod planner;
pub mod report;
pub mod service;
pub mod session;

pub use extractor::{ExtractionOutcome, SegmentExtractor};
pub use planner::{plan_segments, PlannedRange};
pub use report::{ProcessingReport, ReportSettings, ReportWriter};
pub use service::{AnalysisOutcome, CutPointEdit, Preview, ProcessOutcome, SceneCutService};
pub use session::{
    AnalysisRecord, InMemorySessionStore, ProcessingSession, SessionId, SessionStatus, SessionStore,
};
