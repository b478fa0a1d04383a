//! # Analysis Session
//!
//! The mutable working state of one slope analysis: project metadata, the
//! three record stores, scalar geometry and water-table fields, numerical
//! options, and the result set of the most recent successful run.
//!
//! A session outlives individual analysis runs. A rerun that fails leaves
//! the previous results in place; only a successful run replaces them.
//! Reports are composed from a request rebuilt from the *current* field
//! values, so edits made after a run are reflected the next time a report
//! is generated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{SlopeError, SlopeResult};
use crate::records::{LineLoadRecord, MaterialRecord, RecordStore, UniformLoadRecord};
use crate::render::{DisplaySurface, PlotKind, RenderOptions, RenderPipeline, RenderWarning};
use crate::report::{ReportComposer, ReportDocument, ReportMetadata};
use crate::request::{AnalysisOptions, AnalysisRequest, GeometrySpec, RequestBuilder};
use crate::results::ResultSet;
use crate::solver::{run_analysis, SlopeExtents, StabilitySolver};

/// Project, client, and engineer details carried into reports.
///
/// All fields are free text; an empty field suppresses its line in the
/// report rather than printing a blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_name: String,
    pub reference: String,
    pub project_location: String,
    pub client_name: String,
    pub client_company: String,
    pub client_address: String,
    pub engineer_name: String,
    pub engineer_company: String,
    pub engineer_email: String,
    pub engineer_phone: String,
}

/// One slope analysis in progress: inputs, options, and latest results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub info: ProjectInfo,
    pub materials: RecordStore<MaterialRecord>,
    pub uniform_loads: RecordStore<UniformLoadRecord>,
    pub line_loads: RecordStore<LineLoadRecord>,
    /// Unset until the operator has entered a slope
    pub geometry: Option<GeometrySpec>,
    /// Water table depth from the top of the slope, in metres
    pub water_table: Option<f64>,
    pub options: AnalysisOptions,
    /// When the session was created
    pub created: DateTime<Utc>,
    /// When the session was last modified
    pub modified: DateTime<Utc>,
    /// Results of the most recent successful run
    current: Option<ResultSet>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        let now = Utc::now();
        AnalysisSession {
            info: ProjectInfo::default(),
            materials: RecordStore::new(),
            uniform_loads: RecordStore::new(),
            line_loads: RecordStore::new(),
            geometry: None,
            water_table: None,
            options: AnalysisOptions::default(),
            created: now,
            modified: now,
            current: None,
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Results of the most recent successful run, if any.
    pub fn results(&self) -> Option<&ResultSet> {
        self.current.as_ref()
    }

    /// Assemble an [`AnalysisRequest`] from the current field values.
    ///
    /// Limits are resolved fresh on every call, so a request built after an
    /// edit reflects the edited geometry even if no rerun has happened.
    pub fn build_request(&self, extents: &dyn SlopeExtents) -> SlopeResult<AnalysisRequest> {
        let geometry = self
            .geometry
            .ok_or_else(|| SlopeError::missing_field("geometry"))?;

        RequestBuilder::new(
            &self.materials,
            &self.uniform_loads,
            &self.line_loads,
            geometry,
        )
        .water_table(self.water_table)
        .options(self.options)
        .build(extents)
    }

    /// Run a full analysis against the current inputs.
    ///
    /// On success the session's results are replaced and returned. On any
    /// failure the previous results are left untouched.
    pub fn run<S>(&mut self, solver: &mut S) -> SlopeResult<&ResultSet>
    where
        S: StabilitySolver + SlopeExtents,
    {
        let request = self.build_request(solver)?;
        let results = run_analysis(solver, &request)?;

        self.touch();
        Ok(&*self.current.insert(results))
    }

    /// Render the current results into a display surface.
    pub fn render(
        &self,
        pipeline: &RenderPipeline,
        kind: PlotKind,
        options: &RenderOptions,
        display: &mut dyn DisplaySurface,
    ) -> SlopeResult<Vec<RenderWarning>> {
        let results = self.require_results()?;
        pipeline.render_to(results, kind, options, display)
    }

    /// Compose a report from the current inputs and results.
    ///
    /// The request is rebuilt from the live field values rather than
    /// replayed from the last run.
    pub fn compose_report(
        &self,
        extents: &dyn SlopeExtents,
        pipeline: &RenderPipeline,
        date: NaiveDate,
        letterhead_png: Option<Vec<u8>>,
        signature_png: Option<Vec<u8>>,
    ) -> SlopeResult<ReportDocument> {
        let results = self.require_results()?;
        let request = self.build_request(extents)?;

        let meta = ReportMetadata {
            info: self.info.clone(),
            date,
            letterhead_png,
            signature_png,
        };
        Ok(ReportComposer::new(pipeline).compose(&request, results, &meta))
    }

    fn require_results(&self) -> SlopeResult<&ResultSet> {
        self.current
            .as_ref()
            .ok_or_else(|| SlopeError::solver("No analysis results available. Run an analysis first."))
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
