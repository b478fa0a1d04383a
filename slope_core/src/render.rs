//! # Render Pipeline
//!
//! Converts a vector plot produced by the external plotting collaborator
//! into a raster image fitted to a variable display area.
//!
//! The pipeline never aborts an enclosing analysis or report: sparse result
//! sets produce warnings alongside a successful render, and an `AllPlanes`
//! plot failure degrades to a single fallback `Critical` render. Only a
//! failure of that fallback (or of a `Boundary`/`Critical` plot itself) is a
//! terminal render error.
//!
//! The vector figure is serialized through a transient temp file which is
//! released on every exit path; a release failure (e.g. a file still locked
//! by a scanner) is swallowed because it does not affect rendering
//! correctness.

use std::path::Path;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::errors::{SlopeError, SlopeResult};
use crate::results::ResultSet;

/// Error type the plotting collaborator raises.
pub type PlotFault = Box<dyn std::error::Error + Send + Sync>;

/// Fixed margin subtracted from each display dimension, in pixels.
pub const DISPLAY_MARGIN: u32 = 40;

/// Below this usable size a dimension falls back to the floor.
pub const MIN_USABLE: u32 = 100;

/// Fallback display area used when the queried area is unusably small.
pub const FLOOR_WIDTH: u32 = 800;
pub const FLOOR_HEIGHT: u32 = 600;

/// Native resolution the vector figure is rasterized at before fitting.
pub const RASTER_WIDTH: u32 = 1600;
pub const RASTER_HEIGHT: u32 = 1000;

/// Which plot the external plotting collaborator should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    /// Slope boundary and stratigraphy only
    Boundary,
    /// Boundary plus the critical failure surface
    #[default]
    Critical,
    /// Boundary plus every candidate surface below the FOS threshold
    AllPlanes,
}

impl PlotKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PlotKind::Boundary => "boundary",
            PlotKind::Critical => "critical",
            PlotKind::AllPlanes => "all_planes",
        }
    }
}

/// Per-render parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// FOS threshold filtering candidates in an `AllPlanes` plot
    pub max_fos: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { max_fos: 2.0 }
    }
}

/// A vector figure produced by the plotting collaborator.
pub trait VectorFigure {
    /// Number of traces in the figure. An `AllPlanes` figure with two or
    /// fewer traces contains only boundary/material traces.
    fn trace_count(&self) -> usize;

    /// Serialize the figure to a raster file at the given resolution.
    fn write_png(&self, path: &Path, width: u32, height: u32) -> Result<(), PlotFault>;
}

/// The external plotting collaborator.
pub trait Plotter {
    fn boundary(&self, results: &ResultSet) -> Result<Box<dyn VectorFigure>, PlotFault>;
    fn critical(&self, results: &ResultSet) -> Result<Box<dyn VectorFigure>, PlotFault>;
    fn all_planes(
        &self,
        results: &ResultSet,
        max_fos: f64,
    ) -> Result<Box<dyn VectorFigure>, PlotFault>;
}

/// An abstract 2-D display area the pipeline writes one raster into per
/// call, replacing the prior one.
pub trait DisplaySurface {
    /// Current size of the display area in pixels.
    fn size(&self) -> (u32, u32);

    /// Replace the currently displayed raster.
    fn present(&mut self, image: RasterImage);
}

/// A decoded raster image in RGBA8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixel data, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub(crate) fn from_dynamic(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        RasterImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        }
    }

    /// Encode as PNG bytes (for embedding in report documents).
    pub fn to_png_bytes(&self) -> SlopeResult<Vec<u8>> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| SlopeError::render("Raster pixel buffer does not match dimensions"))?;
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| SlopeError::render(format!("Failed to encode raster as PNG: {e}")))?;
        Ok(bytes)
    }
}

/// Non-fatal render-stage conditions, reported alongside a successful
/// render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderWarning {
    /// Fewer than two candidate surfaces exist at all
    SparseResults { found: usize },
    /// Enough candidates exist, but fewer than two fall below the threshold
    SparseBelowThreshold {
        found: usize,
        below: usize,
        max_fos: f64,
    },
    /// The produced figure carries only boundary/material traces
    SparseTraces { traces: usize, max_fos: f64 },
    /// The `AllPlanes` plot failed; the render fell back to `Critical`
    DegradedToCritical { reason: String },
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderWarning::SparseResults { found } => write!(
                f,
                "Only {found} failure plane(s) found. The analysis may need more iterations or the search may be too restrictive."
            ),
            RenderWarning::SparseBelowThreshold {
                found,
                below,
                max_fos,
            } => write!(
                f,
                "Found {found} failure planes, but only {below} have FOS < {max_fos}. Consider increasing the max FOS value."
            ),
            RenderWarning::SparseTraces { traces, max_fos } => write!(
                f,
                "Plot only generated {traces} traces. Most failure planes may have been filtered out by max FOS = {max_fos}."
            ),
            RenderWarning::DegradedToCritical { reason } => write!(
                f,
                "Failed to generate all planes plot: {reason}. Rendered critical plot instead."
            ),
        }
    }
}

/// Compute the usable display area: subtract the fixed margin per
/// dimension and substitute the floor for any unusably small dimension.
pub fn usable_area(area_w: u32, area_h: u32) -> (u32, u32) {
    let mut usable_w = area_w.saturating_sub(DISPLAY_MARGIN);
    let mut usable_h = area_h.saturating_sub(DISPLAY_MARGIN);
    if usable_w < MIN_USABLE {
        usable_w = FLOOR_WIDTH;
    }
    if usable_h < MIN_USABLE {
        usable_h = FLOOR_HEIGHT;
    }
    (usable_w, usable_h)
}

/// Letterbox a source image into a target area, preserving aspect ratio.
///
/// If the area is proportionally wider than the source, the height is the
/// limiting dimension; otherwise the width is.
pub fn fit_to_area(src_w: u32, src_h: u32, area_w: u32, area_h: u32) -> (u32, u32) {
    let aspect = src_w as f64 / src_h as f64;
    if area_w as f64 / area_h as f64 > aspect {
        let display_w = (area_h as f64 * aspect).round() as u32;
        (display_w, area_h)
    } else {
        let display_h = (area_w as f64 / aspect).round() as u32;
        (area_w, display_h)
    }
}

/// Owns the plotting collaborator and drives plot selection, rasterization,
/// fitting, and presentation.
pub struct RenderPipeline {
    plotter: Box<dyn Plotter>,
}

impl RenderPipeline {
    pub fn new(plotter: Box<dyn Plotter>) -> Self {
        RenderPipeline { plotter }
    }

    /// Render `results` into the display surface, replacing the prior
    /// raster. Returns the non-fatal warnings collected along the way.
    pub fn render_to(
        &self,
        results: &ResultSet,
        kind: PlotKind,
        options: &RenderOptions,
        display: &mut dyn DisplaySurface,
    ) -> SlopeResult<Vec<RenderWarning>> {
        let mut warnings = Vec::new();
        let figure = self.select_figure(results, kind, options, &mut warnings)?;
        let raster = self.rasterize(figure.as_ref(), RASTER_WIDTH, RASTER_HEIGHT)?;

        let (display_w, display_h) = display.size();
        let (area_w, area_h) = usable_area(display_w, display_h);
        let (fit_w, fit_h) = fit_to_area(raster.width(), raster.height(), area_w, area_h);

        let resized = raster.resize_exact(fit_w, fit_h, FilterType::Lanczos3);
        display.present(RasterImage::from_dynamic(&resized));
        Ok(warnings)
    }

    /// Rasterize a plot at a fixed resolution with no display fitting.
    /// Used by the report composer for the high-resolution figure.
    pub fn render_figure(
        &self,
        results: &ResultSet,
        kind: PlotKind,
        options: &RenderOptions,
        width: u32,
        height: u32,
    ) -> SlopeResult<RasterImage> {
        let mut warnings = Vec::new();
        let figure = self.select_figure(results, kind, options, &mut warnings)?;
        let raster = self.rasterize(figure.as_ref(), width, height)?;
        Ok(RasterImage::from_dynamic(&raster))
    }

    fn select_figure(
        &self,
        results: &ResultSet,
        kind: PlotKind,
        options: &RenderOptions,
        warnings: &mut Vec<RenderWarning>,
    ) -> SlopeResult<Box<dyn VectorFigure>> {
        match kind {
            PlotKind::Boundary => self
                .plotter
                .boundary(results)
                .map_err(|e| SlopeError::render(format!("Failed to create plot: {e}"))),
            PlotKind::Critical => self
                .plotter
                .critical(results)
                .map_err(|e| SlopeError::render(format!("Failed to create plot: {e}"))),
            PlotKind::AllPlanes => {
                let found = results.candidates.len();
                if found < 2 {
                    warnings.push(RenderWarning::SparseResults { found });
                } else {
                    let below = results.candidates_below(options.max_fos);
                    if below < 2 {
                        warnings.push(RenderWarning::SparseBelowThreshold {
                            found,
                            below,
                            max_fos: options.max_fos,
                        });
                    }
                }

                match self.plotter.all_planes(results, options.max_fos) {
                    Ok(figure) => {
                        if figure.trace_count() <= 2 {
                            warnings.push(RenderWarning::SparseTraces {
                                traces: figure.trace_count(),
                                max_fos: options.max_fos,
                            });
                        }
                        Ok(figure)
                    }
                    Err(fault) => {
                        warnings.push(RenderWarning::DegradedToCritical {
                            reason: fault.to_string(),
                        });
                        // At most one degrade; a fallback failure is terminal
                        self.plotter.critical(results).map_err(|e| {
                            SlopeError::render(format!("Fallback critical plot failed: {e}"))
                        })
                    }
                }
            }
        }
    }

    /// Serialize the figure through a transient PNG file and decode it.
    fn rasterize(
        &self,
        figure: &dyn VectorFigure,
        width: u32,
        height: u32,
    ) -> SlopeResult<image::DynamicImage> {
        let temp = tempfile::Builder::new()
            .prefix("slope-plot-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| SlopeError::render(format!("Failed to create intermediate file: {e}")))?;

        let decoded = figure
            .write_png(temp.path(), width, height)
            .map_err(|e| SlopeError::render(format!("Failed to serialize plot: {e}")))
            .and_then(|_| {
                image::open(temp.path())
                    .map_err(|e| SlopeError::render(format!("Failed to decode plot raster: {e}")))
            });

        // Housekeeping only: a still-locked intermediate must not fail a
        // render that already succeeded.
        let _ = temp.close();

        decoded
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted plotter and display fakes shared by the unit tests.

    use super::*;

    pub struct FakeFigure {
        pub traces: usize,
    }

    impl VectorFigure for FakeFigure {
        fn trace_count(&self) -> usize {
            self.traces
        }

        fn write_png(&self, path: &Path, width: u32, height: u32) -> Result<(), PlotFault> {
            let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 80, 160, 255]));
            buffer.save(path)?;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakePlotter {
        pub fail_all_planes: bool,
        pub fail_critical: bool,
        pub all_planes_traces: usize,
    }

    impl FakePlotter {
        pub fn healthy() -> Self {
            FakePlotter {
                fail_all_planes: false,
                fail_critical: false,
                all_planes_traces: 5,
            }
        }
    }

    impl Plotter for FakePlotter {
        fn boundary(&self, _results: &ResultSet) -> Result<Box<dyn VectorFigure>, PlotFault> {
            Ok(Box::new(FakeFigure { traces: 2 }))
        }

        fn critical(&self, _results: &ResultSet) -> Result<Box<dyn VectorFigure>, PlotFault> {
            if self.fail_critical {
                Err("critical plot exploded".into())
            } else {
                Ok(Box::new(FakeFigure { traces: 3 }))
            }
        }

        fn all_planes(
            &self,
            _results: &ResultSet,
            _max_fos: f64,
        ) -> Result<Box<dyn VectorFigure>, PlotFault> {
            if self.fail_all_planes {
                Err("all planes plot exploded".into())
            } else {
                Ok(Box::new(FakeFigure {
                    traces: self.all_planes_traces,
                }))
            }
        }
    }

    pub struct FakeDisplay {
        pub width: u32,
        pub height: u32,
        pub current: Option<RasterImage>,
        pub present_count: usize,
    }

    impl FakeDisplay {
        pub fn new(width: u32, height: u32) -> Self {
            FakeDisplay {
                width,
                height,
                current: None,
                present_count: 0,
            }
        }
    }

    impl DisplaySurface for FakeDisplay {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn present(&mut self, image: RasterImage) {
            self.current = Some(image);
            self.present_count += 1;
        }
    }
}
