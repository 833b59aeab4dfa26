#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # stx-engine
//!
//! Discovers configuration instances on disk and evaluates them concurrently,
//! handing every success to a caller-supplied handler.
//!
//! - [`Loader`] turns path arguments into [`Instance`]s, one per package unit
//! - [`ExcludeFilter`] drops instances by display path (fails open)
//! - [`Scheduler`] fans evaluations out over tokio and waits for all of them
//! - [`Evaluator`] and [`InstanceHandler`] are the seams for evaluation and
//!   consumption; [`UnifyEvaluator`] is the default evaluator
//! - [`DiagnosticSink`] receives one [`Diagnostic`] per failure
//! - [`InstanceState`] tracks each instance through the pipeline
//!
//! ```no_run
//! use std::sync::Arc;
//! use stx_engine::{
//!     ExcludeFilter, Instance, LoadConfig, Loader, Scheduler, UnifyEvaluator, WriterSink,
//! };
//!
//! # async fn run() {
//! let sink = Arc::new(WriterSink::stdout());
//! let instances = Loader::new(LoadConfig::default()).load(&["./..."]);
//! let filter = ExcludeFilter::compile(Some("staging"), &*sink);
//! let scheduler = Scheduler::new(Arc::new(UnifyEvaluator), sink);
//! let report = scheduler
//!     .process(instances, &filter, |instance: &Instance, value: &serde_json::Value| {
//!         println!("{}: {value}", instance.display_path());
//!     })
//!     .await;
//! assert!(report.is_success());
//! # }
//! ```

pub mod diagnostic;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod handler;
pub mod instance;
pub mod loader;
pub mod scheduler;
pub mod state;

pub use diagnostic::{CollectingSink, Diagnostic, DiagnosticSink, WriterSink};
pub use error::{EngineError, LoadError};
pub use evaluator::{Evaluator, UnifyEvaluator};
pub use filter::ExcludeFilter;
pub use handler::InstanceHandler;
pub use instance::Instance;
pub use loader::{COMMAND_LINE_ARGUMENTS, DEFAULT_PACKAGE, LoadConfig, Loader, SYNTAX_REVISION};
pub use scheduler::{Concurrency, ProcessReport, ReportEntry, Scheduler};
pub use state::InstanceState;
