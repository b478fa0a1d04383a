//! # Solver Collaborator & Adapter
//!
//! The external stability solver is reached through the [`StabilitySolver`]
//! trait; [`run_analysis`] drives it with an [`AnalysisRequest`] and
//! assembles the readers' output into an immutable [`ResultSet`].
//!
//! The adapter performs no numerical work itself. Correctness of the factor
//! of safety computation is entirely the solver's responsibility; the
//! adapter's job is delegation order, fault wrapping, and making "no
//! analysis has been run yet" an explicit state instead of an attribute
//! probe.

use crate::errors::{SlopeError, SlopeResult};
use crate::records::{LineLoadRecord, MaterialRecord, UniformLoadRecord};
use crate::request::{AnalysisOptions, AnalysisRequest, GeometrySpec};
use crate::results::{CandidateSurface, CriticalCircle, Point, ResultSet};

/// Error type collaborators raise; carried verbatim into [`SlopeError::Solver`].
pub type SolverFault = Box<dyn std::error::Error + Send + Sync>;

/// Pure geometry queries against the slope profile.
///
/// The request builder uses these to derive default analysis limits before
/// any analysis has been run.
pub trait SlopeExtents {
    /// Coordinates of the top (crest) of the slope face.
    fn top_coordinates(&self, geometry: &GeometrySpec) -> Result<Point, SolverFault>;

    /// Coordinates of the bottom (toe) of the slope face.
    fn bottom_coordinates(&self, geometry: &GeometrySpec) -> Result<Point, SolverFault>;
}

/// The external slope-stability solver.
///
/// Construction operations mirror the collaborator's own API: geometry
/// first (later steps may query slope extents), then stratigraphy, loads,
/// water table, limits, and numerical options, then `analyse`. The readers
/// return `None` until an analysis has completed.
pub trait StabilitySolver {
    fn set_geometry(&mut self, geometry: &GeometrySpec) -> Result<(), SolverFault>;
    fn set_materials(&mut self, materials: &[MaterialRecord]) -> Result<(), SolverFault>;
    fn set_uniform_loads(&mut self, loads: &[UniformLoadRecord]) -> Result<(), SolverFault>;
    fn set_line_loads(&mut self, loads: &[LineLoadRecord]) -> Result<(), SolverFault>;
    fn set_water_table(&mut self, depth: f64) -> Result<(), SolverFault>;
    fn set_analysis_limits(&mut self, left: f64, right: f64) -> Result<(), SolverFault>;
    fn update_options(&mut self, options: &AnalysisOptions) -> Result<(), SolverFault>;

    /// Run the stability search. Blocking, no timeout; a caller wanting a
    /// time budget must wrap this externally.
    fn analyse(&mut self) -> Result<(), SolverFault>;

    /// Minimum factor of safety, once an analysis has completed.
    fn min_fos(&self) -> Option<f64>;

    /// Circle parameters of the critical surface.
    fn critical_circle(&self) -> Option<CriticalCircle>;

    /// Entry and exit points of the critical surface.
    fn critical_end_points(&self) -> Option<(Point, Point)>;

    /// Every candidate surface evaluated by the search.
    fn candidates(&self) -> Vec<CandidateSurface>;
}

fn wrap(fault: SolverFault) -> SlopeError {
    SlopeError::solver(fault.to_string())
}

/// Drive the solver with `request` and capture its results.
///
/// Delegation order is fixed: geometry, materials, loads, water table,
/// limits, options, analyse. Any collaborator fault aborts the run with the
/// original message wrapped; no partial [`ResultSet`] is ever produced and
/// the request is never mutated.
pub fn run_analysis(
    solver: &mut dyn StabilitySolver,
    request: &AnalysisRequest,
) -> SlopeResult<ResultSet> {
    solver.set_geometry(&request.geometry).map_err(wrap)?;
    solver.set_materials(&request.materials).map_err(wrap)?;
    if !request.uniform_loads.is_empty() {
        solver.set_uniform_loads(&request.uniform_loads).map_err(wrap)?;
    }
    if !request.line_loads.is_empty() {
        solver.set_line_loads(&request.line_loads).map_err(wrap)?;
    }
    if let Some(depth) = request.water_table {
        solver.set_water_table(depth).map_err(wrap)?;
    }
    solver
        .set_analysis_limits(request.limits.left, request.limits.right)
        .map_err(wrap)?;
    solver.update_options(&request.options).map_err(wrap)?;

    solver.analyse().map_err(wrap)?;

    let min_fos = solver
        .min_fos()
        .ok_or_else(|| SlopeError::solver("Analysis completed without a minimum factor of safety"))?;
    let critical_circle = solver
        .critical_circle()
        .ok_or_else(|| SlopeError::solver("Analysis completed without a critical circle"))?;
    let (entry, exit) = solver
        .critical_end_points()
        .ok_or_else(|| SlopeError::solver("Analysis completed without critical surface end points"))?;

    Ok(ResultSet {
        min_fos,
        critical_circle,
        entry,
        exit,
        candidates: solver.candidates(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted solver fake shared by the unit tests.

    use super::*;

    /// Which operation, if any, the fake should fail on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailOn {
        None,
        Analyse,
        SetMaterials,
    }

    pub struct FakeSolver {
        pub calls: Vec<&'static str>,
        pub fail_on: FailOn,
        pub candidates: Vec<CandidateSurface>,
        analysed: bool,
        min_fos: f64,
    }

    impl FakeSolver {
        /// A solver that completes successfully with three candidates.
        pub fn healthy() -> Self {
            let circle = CriticalCircle {
                center: Point::new(4.07, 8.1),
                radius: 7.56,
            };
            let candidate = |fos| CandidateSurface {
                circle,
                entry: Point::new(-1.2, 3.0),
                exit: Point::new(7.9, 0.0),
                fos,
            };
            FakeSolver {
                calls: Vec::new(),
                fail_on: FailOn::None,
                candidates: vec![
                    candidate(Some(1.4321)),
                    candidate(Some(1.8)),
                    candidate(None),
                ],
                analysed: false,
                min_fos: 1.4321,
            }
        }

        pub fn with_min_fos(mut self, fos: f64) -> Self {
            self.min_fos = fos;
            self
        }

        pub fn with_candidates(mut self, candidates: Vec<CandidateSurface>) -> Self {
            self.candidates = candidates;
            self
        }

        pub fn failing_on(mut self, fail_on: FailOn) -> Self {
            self.fail_on = fail_on;
            self
        }

        fn check(&mut self, op: &'static str, fail_on: FailOn) -> Result<(), SolverFault> {
            self.calls.push(op);
            if fail_on != FailOn::None && self.fail_on == fail_on {
                Err(format!("{op} exploded").into())
            } else {
                Ok(())
            }
        }
    }

    impl SlopeExtents for FakeSolver {
        fn top_coordinates(&self, _geometry: &GeometrySpec) -> Result<Point, SolverFault> {
            Ok(Point::new(0.0, 3.0))
        }

        fn bottom_coordinates(&self, _geometry: &GeometrySpec) -> Result<Point, SolverFault> {
            Ok(Point::new(5.196, 0.0))
        }
    }

    impl StabilitySolver for FakeSolver {
        fn set_geometry(&mut self, _geometry: &GeometrySpec) -> Result<(), SolverFault> {
            self.check("geometry", FailOn::None)
        }

        fn set_materials(&mut self, _materials: &[MaterialRecord]) -> Result<(), SolverFault> {
            self.check("materials", FailOn::SetMaterials)
        }

        fn set_uniform_loads(&mut self, _loads: &[UniformLoadRecord]) -> Result<(), SolverFault> {
            self.check("uniform_loads", FailOn::None)
        }

        fn set_line_loads(&mut self, _loads: &[LineLoadRecord]) -> Result<(), SolverFault> {
            self.check("line_loads", FailOn::None)
        }

        fn set_water_table(&mut self, _depth: f64) -> Result<(), SolverFault> {
            self.check("water_table", FailOn::None)
        }

        fn set_analysis_limits(&mut self, _left: f64, _right: f64) -> Result<(), SolverFault> {
            self.check("limits", FailOn::None)
        }

        fn update_options(&mut self, _options: &AnalysisOptions) -> Result<(), SolverFault> {
            self.check("options", FailOn::None)
        }

        fn analyse(&mut self) -> Result<(), SolverFault> {
            self.check("analyse", FailOn::Analyse)?;
            self.analysed = true;
            Ok(())
        }

        fn min_fos(&self) -> Option<f64> {
            self.analysed.then_some(self.min_fos)
        }

        fn critical_circle(&self) -> Option<CriticalCircle> {
            self.analysed.then(|| CriticalCircle {
                center: Point::new(4.07, 8.1),
                radius: 7.56,
            })
        }

        fn critical_end_points(&self) -> Option<(Point, Point)> {
            self.analysed
                .then(|| (Point::new(-1.2, 3.0), Point::new(7.9, 0.0)))
        }

        fn candidates(&self) -> Vec<CandidateSurface> {
            if self.analysed {
                self.candidates.clone()
            } else {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FailOn, FakeSolver};
    use super::*;
    use crate::records::RecordStore;
    use crate::request::RequestBuilder;

    fn request(solver: &FakeSolver) -> AnalysisRequest {
        let mut materials = RecordStore::new();
        materials.add(MaterialRecord::new(20.0, 45.0, 2.0, 2.0)).unwrap();
        let mut udls = RecordStore::new();
        udls.add(UniformLoadRecord::new(100.0, 2.0, Some(1.0))).unwrap();
        let lls: RecordStore<LineLoadRecord> = RecordStore::new();

        let geometry = GeometrySpec {
            height: 3.0,
            angle: Some(30.0),
            length: None,
            uphill_angle: None,
        };
        RequestBuilder::new(&materials, &udls, &lls, geometry)
            .water_table(Some(4.0))
            .build(solver)
            .unwrap()
    }

    #[test]
    fn test_delegation_order() {
        let mut solver = FakeSolver::healthy();
        let request = request(&solver);

        run_analysis(&mut solver, &request).unwrap();

        // Line loads skipped (store empty), water table present
        assert_eq!(
            solver.calls,
            vec![
                "geometry",
                "materials",
                "uniform_loads",
                "water_table",
                "limits",
                "options",
                "analyse"
            ]
        );
    }

    #[test]
    fn test_result_set_assembled_from_readers() {
        let mut solver = FakeSolver::healthy();
        let request = request(&solver);

        let results = run_analysis(&mut solver, &request).unwrap();
        assert!((results.min_fos - 1.4321).abs() < 1e-9);
        assert_eq!(results.candidates.len(), 3);
        assert!((results.critical_circle.radius - 7.56).abs() < 1e-9);
    }

    #[test]
    fn test_fault_wrapped_verbatim() {
        let mut solver = FakeSolver::healthy().failing_on(FailOn::Analyse);
        let request = request(&solver);

        let err = run_analysis(&mut solver, &request).unwrap_err();
        assert_eq!(
            err,
            SlopeError::solver("analyse exploded"),
        );
    }

    #[test]
    fn test_construction_fault_aborts_before_analyse() {
        let mut solver = FakeSolver::healthy().failing_on(FailOn::SetMaterials);
        let request = request(&solver);

        let err = run_analysis(&mut solver, &request).unwrap_err();
        assert_eq!(err.error_code(), "SOLVER_ERROR");
        assert!(!solver.calls.contains(&"analyse"));
    }

    #[test]
    fn test_missing_readers_are_explicit_errors() {
        // A solver whose analyse succeeds but publishes nothing
        struct SilentSolver(FakeSolver);
        impl StabilitySolver for SilentSolver {
            fn set_geometry(&mut self, g: &GeometrySpec) -> Result<(), SolverFault> {
                self.0.set_geometry(g)
            }
            fn set_materials(&mut self, m: &[MaterialRecord]) -> Result<(), SolverFault> {
                self.0.set_materials(m)
            }
            fn set_uniform_loads(&mut self, l: &[UniformLoadRecord]) -> Result<(), SolverFault> {
                self.0.set_uniform_loads(l)
            }
            fn set_line_loads(&mut self, l: &[LineLoadRecord]) -> Result<(), SolverFault> {
                self.0.set_line_loads(l)
            }
            fn set_water_table(&mut self, d: f64) -> Result<(), SolverFault> {
                self.0.set_water_table(d)
            }
            fn set_analysis_limits(&mut self, l: f64, r: f64) -> Result<(), SolverFault> {
                self.0.set_analysis_limits(l, r)
            }
            fn update_options(&mut self, o: &AnalysisOptions) -> Result<(), SolverFault> {
                self.0.update_options(o)
            }
            fn analyse(&mut self) -> Result<(), SolverFault> {
                Ok(())
            }
            fn min_fos(&self) -> Option<f64> {
                None
            }
            fn critical_circle(&self) -> Option<CriticalCircle> {
                None
            }
            fn critical_end_points(&self) -> Option<(Point, Point)> {
                None
            }
            fn candidates(&self) -> Vec<CandidateSurface> {
                Vec::new()
            }
        }

        let inner = FakeSolver::healthy();
        let request = request(&inner);
        let mut solver = SilentSolver(inner);

        let err = run_analysis(&mut solver, &request).unwrap_err();
        assert_eq!(err.error_code(), "SOLVER_ERROR");
        assert!(err.to_string().contains("minimum factor of safety"));
    }
}
