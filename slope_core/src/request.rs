//! # Analysis Request Construction
//!
//! Scalar geometry and option fields, and the builder that aggregates them
//! with the record stores into an immutable [`AnalysisRequest`].
//!
//! Construction is all-or-nothing: any validation failure names the
//! offending field and discards the partially built request. The only
//! auto-correction performed anywhere in the pipeline is the documented
//! limit-defaulting rule (top-of-slope x − 5, bottom-of-slope x + 5).
//!
//! ## Example
//!
//! ```rust,ignore
//! let request = RequestBuilder::new(&materials, &uniform_loads, &line_loads)
//!     .geometry(geometry)
//!     .water_table(Some(4.0))
//!     .options(options)
//!     .build(&solver)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{SlopeError, SlopeResult};
use crate::records::{
    parse_count, parse_optional, parse_required, LineLoadRecord, MaterialRecord, RecordStore,
    UniformLoadRecord,
};
use crate::solver::SlopeExtents;

/// Margin added outside the slope extents when deriving default analysis
/// limits, in metres.
pub const LIMIT_MARGIN_M: f64 = 5.0;

/// Slope geometry as entered by the operator.
///
/// Exactly one of `angle` / `length` must determine the slope steepness;
/// that exclusivity is the external geometry constructor's contract and is
/// not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySpec {
    /// Slope height in metres (must be positive)
    pub height: f64,
    /// Slope angle in degrees
    pub angle: Option<f64>,
    /// Horizontal slope length in metres
    pub length: Option<f64>,
    /// Uphill surface angle in degrees; absent means flat
    pub uphill_angle: Option<f64>,
}

impl GeometrySpec {
    /// Parse geometry from form text fields.
    pub fn from_fields(
        height: &str,
        angle: &str,
        length: &str,
        uphill_angle: &str,
    ) -> SlopeResult<Self> {
        let spec = GeometrySpec {
            height: parse_required("height", height)?,
            angle: parse_optional("angle", angle)?,
            length: parse_optional("length", length)?,
            uphill_angle: parse_optional("uphill_angle", uphill_angle)?,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> SlopeResult<()> {
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(SlopeError::invalid_input(
                "height",
                self.height.to_string(),
                "Slope height must be positive",
            ));
        }
        Ok(())
    }
}

/// Numerical options for the stability search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Number of slices for the method of slices (>= 1)
    pub slice_count: u32,
    /// Number of trial surfaces to evaluate (>= 1)
    pub iteration_count: u32,
    /// Left analysis limit in metres; both limits or neither must be given
    pub left_limit: Option<f64>,
    /// Right analysis limit in metres
    pub right_limit: Option<f64>,
}

impl AnalysisOptions {
    /// Parse options from form text fields. Empty limit fields mean
    /// "derive defaults from the slope extents".
    pub fn from_fields(
        slices: &str,
        iterations: &str,
        left_limit: &str,
        right_limit: &str,
    ) -> SlopeResult<Self> {
        Ok(AnalysisOptions {
            slice_count: parse_count("slices", slices)?,
            iteration_count: parse_count("iterations", iterations)?,
            left_limit: parse_optional("left_limit", left_limit)?,
            right_limit: parse_optional("right_limit", right_limit)?,
        })
    }

    pub fn validate(&self) -> SlopeResult<()> {
        if self.slice_count == 0 {
            return Err(SlopeError::invalid_input(
                "slices",
                "0",
                "Must be at least 1",
            ));
        }
        if self.iteration_count == 0 {
            return Err(SlopeError::invalid_input(
                "iterations",
                "0",
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            slice_count: 50,
            iteration_count: 2000,
            left_limit: None,
            right_limit: None,
        }
    }
}

/// Resolved horizontal search limits for an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisLimits {
    pub left: f64,
    pub right: f64,
    /// True when the limits were derived from the slope extents rather than
    /// supplied by the operator
    pub derived: bool,
}

impl AnalysisLimits {
    /// Resolve limits from optional operator entries and the slope extents.
    ///
    /// Both supplied: used verbatim. Neither: defaults straddling the slope
    /// by [`LIMIT_MARGIN_M`]. Exactly one: a validation error naming the
    /// missing counterpart.
    pub fn resolve(
        geometry: &GeometrySpec,
        options: &AnalysisOptions,
        extents: &dyn SlopeExtents,
    ) -> SlopeResult<Self> {
        match (options.left_limit, options.right_limit) {
            (Some(left), Some(right)) => Ok(AnalysisLimits {
                left,
                right,
                derived: false,
            }),
            (None, None) => {
                let top = extents
                    .top_coordinates(geometry)
                    .map_err(|e| SlopeError::solver(e.to_string()))?;
                let bottom = extents
                    .bottom_coordinates(geometry)
                    .map_err(|e| SlopeError::solver(e.to_string()))?;
                Ok(AnalysisLimits {
                    left: top.x - LIMIT_MARGIN_M,
                    right: bottom.x + LIMIT_MARGIN_M,
                    derived: true,
                })
            }
            (Some(_), None) => Err(SlopeError::missing_field("right_limit")),
            (None, Some(_)) => Err(SlopeError::missing_field("left_limit")),
        }
    }
}

/// Immutable aggregate of everything one analysis run consumes.
///
/// Constructed once per run by [`RequestBuilder`] and never mutated after
/// handoff to the solver adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub geometry: GeometrySpec,
    /// Soil layers in depth order (insertion order)
    pub materials: Vec<MaterialRecord>,
    pub uniform_loads: Vec<UniformLoadRecord>,
    pub line_loads: Vec<LineLoadRecord>,
    /// Water table depth from the top of the slope; absent means no water
    /// table is modeled
    pub water_table: Option<f64>,
    pub options: AnalysisOptions,
    pub limits: AnalysisLimits,
}

/// Aggregates record stores and scalar fields into an [`AnalysisRequest`].
pub struct RequestBuilder<'a> {
    materials: &'a RecordStore<MaterialRecord>,
    uniform_loads: &'a RecordStore<UniformLoadRecord>,
    line_loads: &'a RecordStore<LineLoadRecord>,
    geometry: GeometrySpec,
    water_table: Option<f64>,
    options: AnalysisOptions,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        materials: &'a RecordStore<MaterialRecord>,
        uniform_loads: &'a RecordStore<UniformLoadRecord>,
        line_loads: &'a RecordStore<LineLoadRecord>,
        geometry: GeometrySpec,
    ) -> Self {
        RequestBuilder {
            materials,
            uniform_loads,
            line_loads,
            geometry,
            water_table: None,
            options: AnalysisOptions::default(),
        }
    }

    /// Set the water table depth (builder pattern).
    pub fn water_table(mut self, depth: Option<f64>) -> Self {
        self.water_table = depth;
        self
    }

    /// Set the analysis options (builder pattern).
    pub fn options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate all inputs and produce the immutable request.
    pub fn build(self, extents: &dyn SlopeExtents) -> SlopeResult<AnalysisRequest> {
        self.geometry.validate()?;
        self.options.validate()?;

        if self.materials.is_empty() {
            return Err(SlopeError::invalid_input(
                "materials",
                "0",
                "Please add at least one material",
            ));
        }

        if let Some(depth) = self.water_table {
            if !depth.is_finite() {
                return Err(SlopeError::invalid_input(
                    "water_table",
                    depth.to_string(),
                    "Water table depth must be a finite number",
                ));
            }
        }

        let limits = AnalysisLimits::resolve(&self.geometry, &self.options, extents)?;

        Ok(AnalysisRequest {
            geometry: self.geometry,
            materials: self.materials.as_slice().to_vec(),
            uniform_loads: self.uniform_loads.as_slice().to_vec(),
            line_loads: self.line_loads.as_slice().to_vec(),
            water_table: self.water_table,
            options: self.options,
            limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::testing::FakeSolver;

    fn geometry() -> GeometrySpec {
        GeometrySpec {
            height: 3.0,
            angle: Some(30.0),
            length: None,
            uphill_angle: None,
        }
    }

    fn stores() -> (
        RecordStore<MaterialRecord>,
        RecordStore<UniformLoadRecord>,
        RecordStore<LineLoadRecord>,
    ) {
        let mut materials = RecordStore::new();
        materials.add(MaterialRecord::new(20.0, 45.0, 2.0, 2.0)).unwrap();
        materials.add(MaterialRecord::new(20.0, 30.0, 2.0, 5.0)).unwrap();
        (materials, RecordStore::new(), RecordStore::new())
    }

    #[test]
    fn test_both_limits_used_verbatim() {
        let (materials, udls, lls) = stores();
        let options = AnalysisOptions {
            left_limit: Some(-2.5),
            right_limit: Some(12.0),
            ..AnalysisOptions::default()
        };

        let request = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .options(options)
            .build(&FakeSolver::healthy())
            .unwrap();

        assert_eq!(request.limits.left, -2.5);
        assert_eq!(request.limits.right, 12.0);
        assert!(!request.limits.derived);
    }

    #[test]
    fn test_no_limits_derives_defaults_from_extents() {
        let (materials, udls, lls) = stores();
        // FakeSolver reports top x = 0, bottom x = 5.196
        let solver = FakeSolver::healthy();

        let request = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .build(&solver)
            .unwrap();

        assert!((request.limits.left - (0.0 - LIMIT_MARGIN_M)).abs() < 1e-9);
        assert!((request.limits.right - (5.196 + LIMIT_MARGIN_M)).abs() < 1e-9);
        assert!(request.limits.derived);
    }

    #[test]
    fn test_single_limit_names_missing_counterpart() {
        let (materials, udls, lls) = stores();

        let left_only = AnalysisOptions {
            left_limit: Some(-2.0),
            ..AnalysisOptions::default()
        };
        let err = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .options(left_only)
            .build(&FakeSolver::healthy())
            .unwrap_err();
        assert_eq!(err, SlopeError::missing_field("right_limit"));

        let right_only = AnalysisOptions {
            right_limit: Some(12.0),
            ..AnalysisOptions::default()
        };
        let err = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .options(right_only)
            .build(&FakeSolver::healthy())
            .unwrap_err();
        assert_eq!(err, SlopeError::missing_field("left_limit"));
    }

    #[test]
    fn test_empty_material_store_rejected() {
        let materials = RecordStore::new();
        let udls = RecordStore::new();
        let lls = RecordStore::new();

        let err = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .build(&FakeSolver::healthy())
            .unwrap_err();
        assert!(err.to_string().contains("materials"));
    }

    #[test]
    fn test_water_table_passed_through() {
        let (materials, udls, lls) = stores();
        let request = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .water_table(Some(4.0))
            .build(&FakeSolver::healthy())
            .unwrap();
        assert_eq!(request.water_table, Some(4.0));
    }

    #[test]
    fn test_materials_keep_insertion_order() {
        let (materials, udls, lls) = stores();
        let request = RequestBuilder::new(&materials, &udls, &lls, geometry())
            .build(&FakeSolver::healthy())
            .unwrap();
        let depths: Vec<f64> = request.materials.iter().map(|m| m.depth_to_bottom).collect();
        assert_eq!(depths, vec![2.0, 5.0]);
    }

    #[test]
    fn test_options_from_fields() {
        let options = AnalysisOptions::from_fields("50", "2000", "", "").unwrap();
        assert_eq!(options.slice_count, 50);
        assert_eq!(options.iteration_count, 2000);
        assert_eq!(options.left_limit, None);

        let err = AnalysisOptions::from_fields("0", "2000", "", "").unwrap_err();
        assert!(err.to_string().contains("slices"));

        let err = AnalysisOptions::from_fields("50", "many", "", "").unwrap_err();
        assert!(err.to_string().contains("iterations"));
    }

    #[test]
    fn test_geometry_from_fields() {
        let spec = GeometrySpec::from_fields("3", "30", "", "").unwrap();
        assert_eq!(spec.height, 3.0);
        assert_eq!(spec.angle, Some(30.0));
        assert_eq!(spec.length, None);

        assert!(GeometrySpec::from_fields("-1", "30", "", "").is_err());
        assert!(GeometrySpec::from_fields("", "30", "", "").is_err());
    }
}
