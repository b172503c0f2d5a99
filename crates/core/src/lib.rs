//! tagwatch core pipeline
//!
//! Captures the runtime state of a tag-management preview session across
//! four dimensions, validates each checkpoint against an expected-outcome
//! set, and aggregates the results into a structured and a narrative
//! report.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Session (session.rs)                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  for each scripted action:                                   │
//! │    capture  -> CheckpointRecorder::record -> Checkpoint      │
//! │                validate(checkpoint, expectations)            │
//! │                annotation_plan -> Annotator (advisory)       │
//! │    other    -> ActionDriver::perform                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Report::build(config, checkpoints)                          │
//! │    ├── to_json()     -> monitoring_report.json               │
//! │    └── to_markdown() -> monitoring_report.md                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows strictly forward: Capture -> Checkpoint -> Validate ->
//! Aggregate -> Report. The browser layer sits behind the [`PreviewPage`]
//! and [`ActionDriver`] traits; the screenshot annotation renderer sits
//! behind [`Annotator`].

pub mod annotate;
pub mod capture;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod report;
pub mod session;
pub mod validate;

pub use annotate::{annotation_plan, Annotator, ArrowDirection, Callout};
pub use capture::{
    BlockedTag, BoundingBox, CapturedVariable, ConsentState, DataLayerEntry, FiredTag,
    PreviewPage, TagSnapshot, KNOWN_CONSENT_SIGNALS,
};
pub use checkpoint::{Checkpoint, CheckpointRecorder, ValidationOutcome};
pub use config::{
    Action, ConsentExpectation, ExpectationSet, ExpectedValue, ScrollEdge, ScrollTarget,
    SessionConfig, VariableExpectation,
};
pub use error::{MonitorError, Result};
pub use report::{Report, ReportPaths, JSON_REPORT_FILENAME, MARKDOWN_REPORT_FILENAME};
pub use session::{ActionDriver, Session, CHECKPOINTS_FILENAME};
pub use validate::{assertions, validate, Assertion, SubjectKind};

/// tagwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
