//! # slope_core - Slope Stability Analysis Engine
//!
//! `slope_core` drives a slope stability workstation: it validates operator
//! input, builds analysis requests, adapts an external Bishop's-method
//! solver, renders result plots fitted to a display, and composes PDF
//! reports. All inputs and outputs are JSON-serializable, so whole sessions
//! can be saved and restored.
//!
//! ## Design Philosophy
//!
//! - **Validate at the edge**: Records and requests are checked before they
//!   enter a store or reach the solver; stored state is always valid
//! - **External collaborators behind traits**: The solver, the plotting
//!   backend, the display surface, and the document encoder are all trait
//!   objects, so the engine never depends on a specific vendor
//! - **JSON-First**: Session state implements Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use slope_core::records::MaterialRecord;
//! use slope_core::request::GeometrySpec;
//! use slope_core::session::AnalysisSession;
//!
//! let mut session = AnalysisSession::new();
//! session.geometry = Some(GeometrySpec {
//!     height: 3.0,
//!     angle: Some(30.0),
//!     length: None,
//!     uphill_angle: None,
//! });
//! session.materials.add(MaterialRecord::new(20.0, 35.0, 2.0, 5.0)).unwrap();
//!
//! let json = serde_json::to_string_pretty(&session).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`session`] - The working state of one analysis, project metadata
//! - [`records`] - Validated material and load records with typed stores
//! - [`request`] - Geometry, options, limit resolution, request assembly
//! - [`solver`] - Solver adapter traits and the analysis driver
//! - [`results`] - Immutable result types and interpretation bands
//! - [`render`] - Plot selection, letterbox fitting, display presentation
//! - [`report`] - Block-structured report composition
//! - [`pdf`] - Typst-backed PDF encoding
//! - [`errors`] - Structured error types
//! - [`file_io`] - Session persistence with atomic saves

pub mod errors;
pub mod file_io;
pub mod pdf;
pub mod records;
pub mod render;
pub mod report;
pub mod request;
pub mod results;
pub mod session;
pub mod solver;

// Re-export commonly used types at crate root for convenience
pub use errors::{SlopeError, SlopeResult};
pub use file_io::{load_session, save_session};
pub use records::{LineLoadRecord, MaterialRecord, RecordStore, UniformLoadRecord};
pub use render::{PlotKind, RenderOptions, RenderPipeline, RenderWarning};
pub use report::{ReportComposer, ReportDocument, ReportMetadata};
pub use request::{AnalysisOptions, AnalysisRequest, GeometrySpec, RequestBuilder};
pub use results::{ResultSet, StabilityBand};
pub use session::{AnalysisSession, ProjectInfo};
pub use solver::{run_analysis, SlopeExtents, StabilitySolver};
