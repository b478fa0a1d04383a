//! # Report Composer
//!
//! Builds the multi-section analysis report as a block-structured
//! [`ReportDocument`], independent of any output format. Encoding and
//! persistence belong to a [`DocumentSink`] implementation (see
//! [`crate::pdf`]); the composer never touches file paths.
//!
//! Section order is fixed. Each section is populated only when its backing
//! data is present; absent optional fields suppress their lines rather than
//! emitting blanks. The figure section renders through the
//! [`RenderPipeline`] at report resolution and degrades to an explanatory
//! note on failure: document composition never fails solely because figure
//! generation failed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SlopeResult;
use crate::render::{PlotKind, RenderOptions, RenderPipeline};
use crate::request::AnalysisRequest;
use crate::results::ResultSet;
use crate::session::ProjectInfo;

/// Report figures are rasterized at a larger fixed size than the screen
/// preview.
pub const REPORT_FIGURE_WIDTH: u32 = 1600;
pub const REPORT_FIGURE_HEIGHT: u32 = 1000;

/// Width of embedded images on the page, in millimetres.
pub const FIGURE_WIDTH_MM: u32 = 150;
const LOGO_WIDTH_MM: u32 = 40;
const SIGNATURE_WIDTH_MM: u32 = 40;

/// A run of inline text within a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Bold(String),
}

/// One block of the structured document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(Vec<Inline>),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Image { png: Vec<u8>, width_mm: u32 },
}

/// The composed report, ready for a [`DocumentSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportDocument {
    /// Project reference shown in the page footer
    pub reference: String,
    /// Report date shown in the page footer
    pub date: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    fn heading(&mut self, level: u8, text: impl Into<String>) {
        self.blocks.push(Block::Heading {
            level,
            text: text.into(),
        });
    }

    fn paragraph(&mut self, runs: Vec<Inline>) {
        self.blocks.push(Block::Paragraph(runs));
    }

    fn text(&mut self, text: impl Into<String>) {
        self.paragraph(vec![Inline::Text(text.into())]);
    }

    /// Concatenated plain text of the whole document (used by tests and
    /// text previews).
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. } => {
                    out.push_str(text);
                    out.push('\n');
                }
                Block::Paragraph(runs) => {
                    for run in runs {
                        match run {
                            Inline::Text(t) | Inline::Bold(t) => out.push_str(t),
                        }
                    }
                    out.push('\n');
                }
                Block::Table { headers, rows } => {
                    out.push_str(&headers.join(" | "));
                    out.push('\n');
                    for row in rows {
                        out.push_str(&row.join(" | "));
                        out.push('\n');
                    }
                }
                Block::Image { .. } => {}
            }
        }
        out
    }

    /// True if any block is an embedded image.
    pub fn has_image(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, Block::Image { .. }))
    }
}

/// The external document-serialization collaborator: encodes a composed
/// document and persists it at the caller-chosen path.
pub trait DocumentSink {
    fn save(&self, document: &ReportDocument, path: &Path) -> SlopeResult<()>;
}

/// Metadata accompanying a report: project/client/engineer details plus the
/// report date and optional letterhead artwork.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub info: ProjectInfo,
    pub date: chrono::NaiveDate,
    /// Letterhead logo, embedded top-right when present
    pub letterhead_png: Option<Vec<u8>>,
    /// Signature image for the closing block
    pub signature_png: Option<Vec<u8>>,
}

impl ReportMetadata {
    fn date_display(&self) -> String {
        // "27 August 2026"
        format!(
            "{} {} {}",
            self.date.format("%-d"),
            self.date.format("%B"),
            self.date.format("%Y")
        )
    }
}

/// Builds report documents from an analysis request and result set.
pub struct ReportComposer<'a> {
    pipeline: &'a RenderPipeline,
}

/// A bold "Label: " followed by a value and a line break.
fn labeled(label: &str, value: impl Into<String>) -> [Inline; 2] {
    [
        Inline::Bold(format!("{label}: ")),
        Inline::Text(format!("{}\n", value.into())),
    ]
}

impl<'a> ReportComposer<'a> {
    pub fn new(pipeline: &'a RenderPipeline) -> Self {
        ReportComposer { pipeline }
    }

    /// Compose the full report. Infallible: the figure section degrades to
    /// a note when rendering fails, and every other section only reads
    /// already-validated data.
    pub fn compose(
        &self,
        request: &AnalysisRequest,
        results: &ResultSet,
        meta: &ReportMetadata,
    ) -> ReportDocument {
        let info = &meta.info;
        let mut doc = ReportDocument {
            reference: if info.reference.is_empty() {
                "N/A".to_string()
            } else {
                info.reference.clone()
            },
            date: meta.date_display(),
            blocks: Vec::new(),
        };

        self.letterhead(&mut doc, meta);
        self.title(&mut doc, info);
        doc.text(
            "This report presents the results of a slope stability analysis conducted using \
             Bishop's method of slices. The analysis was performed to determine the factor of \
             safety against slope failure.",
        );
        self.project_details(&mut doc, info);
        self.slope_geometry(&mut doc, request);
        self.material_table(&mut doc, request);
        self.loading_conditions(&mut doc, request);
        self.water_table(&mut doc, request);
        self.analysis_parameters(&mut doc, request);
        self.results_summary(&mut doc, results);
        self.figure(&mut doc, results);
        self.interpretation(&mut doc, results);
        self.engineer_block(&mut doc, meta);
        doc
    }

    fn letterhead(&self, doc: &mut ReportDocument, meta: &ReportMetadata) {
        if let Some(png) = &meta.letterhead_png {
            doc.blocks.push(Block::Image {
                png: png.clone(),
                width_mm: LOGO_WIDTH_MM,
            });
        }

        let info = &meta.info;
        let mut header = format!("Ref: {}", doc.reference);
        for line in [&info.client_name, &info.client_company, &info.client_address] {
            if !line.is_empty() {
                header.push('\n');
                header.push_str(line);
            }
        }
        header.push('\n');
        header.push_str(&doc.date.clone());
        doc.text(header);
    }

    fn title(&self, doc: &mut ReportDocument, info: &ProjectInfo) {
        let mut title = if info.project_name.is_empty() {
            "Slope Stability Analysis".to_string()
        } else {
            info.project_name.clone()
        };
        if !info.project_location.is_empty() {
            title.push('\n');
            title.push_str(&info.project_location);
        }
        doc.heading(1, title);
    }

    fn project_details(&self, doc: &mut ReportDocument, info: &ProjectInfo) {
        doc.heading(2, "Project Details");
        let mut runs = Vec::new();
        if !info.project_name.is_empty() {
            runs.extend(labeled("Project Name", &info.project_name));
        }
        if !info.reference.is_empty() {
            runs.extend(labeled("Project Reference", &info.reference));
        }
        if !info.project_location.is_empty() {
            runs.extend(labeled("Location", &info.project_location));
        }
        if !info.client_name.is_empty() {
            runs.extend(labeled("Client", &info.client_name));
        }
        if !info.client_company.is_empty() {
            runs.extend(labeled("Client Company", &info.client_company));
        }
        doc.paragraph(runs);
    }

    fn slope_geometry(&self, doc: &mut ReportDocument, request: &AnalysisRequest) {
        doc.heading(2, "Slope Geometry");
        let geometry = &request.geometry;
        let mut runs = Vec::new();
        runs.extend(labeled("Slope Height", format!("{} m", geometry.height)));
        if let Some(angle) = geometry.angle {
            runs.extend(labeled("Slope Angle", format!("{angle} degrees")));
        }
        if let Some(length) = geometry.length {
            runs.extend(labeled("Slope Length", format!("{length} m")));
        }
        match geometry.uphill_angle {
            Some(angle) => runs.extend(labeled("Uphill Surface Angle", format!("{angle} degrees"))),
            None => runs.extend(labeled("Uphill Surface", "Flat")),
        }
        doc.paragraph(runs);
    }

    fn material_table(&self, doc: &mut ReportDocument, request: &AnalysisRequest) {
        doc.heading(2, "Material Properties");
        let rows = request
            .materials
            .iter()
            .enumerate()
            .map(|(i, material)| {
                vec![
                    (i + 1).to_string(),
                    format!("{:.2}", material.unit_weight),
                    format!("{:.2}", material.friction_angle),
                    format!("{:.2}", material.cohesion),
                    format!("{:.2}", material.depth_to_bottom),
                ]
            })
            .collect();
        doc.blocks.push(Block::Table {
            headers: vec![
                "Layer".to_string(),
                "Unit Weight (kN/m³)".to_string(),
                "Friction Angle (deg)".to_string(),
                "Cohesion (kPa)".to_string(),
                "Depth to Bottom (m)".to_string(),
            ],
            rows,
        });
    }

    fn loading_conditions(&self, doc: &mut ReportDocument, request: &AnalysisRequest) {
        doc.heading(2, "Loading Conditions");

        if request.uniform_loads.is_empty() && request.line_loads.is_empty() {
            doc.text("No surface loads applied.");
            return;
        }

        let mut runs = Vec::new();
        if !request.uniform_loads.is_empty() {
            runs.push(Inline::Bold("Uniform Distributed Loads (UDL):\n".to_string()));
            for (i, udl) in request.uniform_loads.iter().enumerate() {
                runs.push(Inline::Bold(format!("  UDL {}: ", i + 1)));
                let length = match udl.length {
                    Some(length) => format!("{length:.2} m"),
                    None => "Infinite".to_string(),
                };
                runs.push(Inline::Text(format!(
                    "Magnitude = {:.2} kPa, Offset = {:.2} m, Length = {}\n",
                    udl.magnitude, udl.offset, length
                )));
            }
        }
        if !request.line_loads.is_empty() {
            runs.push(Inline::Bold("Line Loads:\n".to_string()));
            for (i, load) in request.line_loads.iter().enumerate() {
                runs.push(Inline::Bold(format!("  Line Load {}: ", i + 1)));
                runs.push(Inline::Text(format!(
                    "Magnitude = {:.2} kN/m, Offset = {:.2} m\n",
                    load.magnitude, load.offset
                )));
            }
        }
        doc.paragraph(runs);
    }

    fn water_table(&self, doc: &mut ReportDocument, request: &AnalysisRequest) {
        doc.heading(2, "Water Table");
        match request.water_table {
            Some(depth) => doc.text(format!("Water table depth from top of slope: {depth} m")),
            None => doc.text("No water table considered in the analysis."),
        }
    }

    fn analysis_parameters(&self, doc: &mut ReportDocument, request: &AnalysisRequest) {
        doc.heading(2, "Analysis Parameters");
        let options = &request.options;
        let mut runs = Vec::new();
        runs.extend(labeled("Number of slices", options.slice_count.to_string()));
        runs.extend(labeled(
            "Number of iterations",
            options.iteration_count.to_string(),
        ));
        runs.extend(labeled("Analysis method", "Bishop's Method of Slices"));

        let limits = &request.limits;
        let display = if limits.derived {
            format!(
                "Default (Left = {:.2} m, Right = {:.2} m)",
                limits.left, limits.right
            )
        } else {
            format!("Left = {} m, Right = {} m", limits.left, limits.right)
        };
        runs.extend(labeled("Analysis limits", display));
        doc.paragraph(runs);
    }

    fn results_summary(&self, doc: &mut ReportDocument, results: &ResultSet) {
        doc.heading(2, "Analysis Results");
        let mut runs = Vec::new();
        runs.extend(labeled(
            "Critical Factor of Safety (FOS)",
            format!("{:.4}\n", results.min_fos),
        ));
        runs.push(Inline::Bold("Critical Failure Surface Properties:\n".to_string()));
        let circle = &results.critical_circle;
        runs.push(Inline::Text(format!(
            "  Circle Centre: ({:.3}, {:.3}) m\n",
            circle.center.x, circle.center.y
        )));
        runs.push(Inline::Text(format!("  Circle Radius: {:.3} m\n", circle.radius)));
        runs.push(Inline::Text(format!(
            "  Entry Point: ({:.3}, {:.3}) m\n",
            results.entry.x, results.entry.y
        )));
        runs.push(Inline::Text(format!(
            "  Exit Point: ({:.3}, {:.3}) m\n",
            results.exit.x, results.exit.y
        )));
        doc.paragraph(runs);
    }

    fn figure(&self, doc: &mut ReportDocument, results: &ResultSet) {
        doc.heading(3, "Figure 1: Critical Failure Surface");

        // Always the critical plot, at report resolution, independent of
        // any on-screen render state.
        let render = self
            .pipeline
            .render_figure(
                results,
                PlotKind::Critical,
                &RenderOptions::default(),
                REPORT_FIGURE_WIDTH,
                REPORT_FIGURE_HEIGHT,
            )
            .and_then(|image| image.to_png_bytes());

        match render {
            Ok(png) => doc.blocks.push(Block::Image {
                png,
                width_mm: FIGURE_WIDTH_MM,
            }),
            Err(e) => doc.text(format!("Note: Could not generate figure. Error: {e}")),
        }
    }

    fn interpretation(&self, doc: &mut ReportDocument, results: &ResultSet) {
        doc.heading(2, "Interpretation");
        let mut text = results.stability_band().interpretation(results.min_fos);
        text.push_str(
            "\n\nNote: The analysis assumes circular failure surfaces and uses Bishop's \
             simplified method. Results should be interpreted by a qualified geotechnical \
             engineer in the context of site-specific conditions.",
        );
        doc.text(text);
    }

    fn engineer_block(&self, doc: &mut ReportDocument, meta: &ReportMetadata) {
        doc.heading(2, "Engineer Information");
        let info = &meta.info;
        let mut runs = Vec::new();
        if !info.engineer_name.is_empty() {
            runs.extend(labeled("Engineer", &info.engineer_name));
        }
        if !info.engineer_company.is_empty() {
            runs.extend(labeled("Company", &info.engineer_company));
        }
        if !info.engineer_email.is_empty() {
            runs.extend(labeled("Email", &info.engineer_email));
        }
        if !info.engineer_phone.is_empty() {
            runs.extend(labeled("Phone", &info.engineer_phone));
        }
        runs.push(Inline::Text(format!("\nDate: {}\n", doc.date)));
        doc.paragraph(runs);

        if !info.engineer_name.is_empty() {
            doc.text(format!("Yours sincerely,\n\n\n{}", info.engineer_name));
            if let Some(png) = &meta.signature_png {
                doc.blocks.push(Block::Image {
                    png: png.clone(),
                    width_mm: SIGNATURE_WIDTH_MM,
                });
            }
        }
    }
}
