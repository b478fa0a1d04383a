//! # Analysis Results
//!
//! Immutable result types produced by the solver adapter, plus the fixed
//! interpretation bands used by the report composer.
//!
//! A [`ResultSet`] is created once per analysis run and held until the next
//! run replaces it or the session ends. It is read-only to all consumers:
//! repeated renders against the same ResultSet with identical parameters are
//! deterministic.

use serde::{Deserialize, Serialize};

/// A 2-D coordinate in slope space (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Circle parameters of a trial failure surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalCircle {
    pub center: Point,
    pub radius: f64,
}

/// One trial failure surface evaluated by the solver.
///
/// `fos` is `None` when the solver rejected the surface as geometrically
/// invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateSurface {
    pub circle: CriticalCircle,
    pub entry: Point,
    pub exit: Point,
    pub fos: Option<f64>,
}

/// The full, immutable outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Minimum factor of safety over all evaluated candidates
    pub min_fos: f64,
    /// Circle parameters of the critical failure surface
    pub critical_circle: CriticalCircle,
    /// Entry point of the critical surface on the slope face
    pub entry: Point,
    /// Exit point of the critical surface on the slope face
    pub exit: Point,
    /// Every candidate surface the solver evaluated
    pub candidates: Vec<CandidateSurface>,
}

impl ResultSet {
    /// Count candidates with a factor of safety strictly below `max_fos`.
    ///
    /// Candidates without a FOS (geometrically invalid) never count.
    pub fn candidates_below(&self, max_fos: f64) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.fos.is_some_and(|fos| fos < max_fos))
            .count()
    }

    /// Qualitative interpretation band for the minimum factor of safety.
    pub fn stability_band(&self) -> StabilityBand {
        StabilityBand::from_fos(self.min_fos)
    }
}

/// Fixed qualitative interpretation bands for a factor of safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityBand {
    /// FOS < 1.0
    Unstable,
    /// 1.0 <= FOS < 1.3
    Marginal,
    /// 1.3 <= FOS < 1.5
    Temporary,
    /// FOS >= 1.5
    Permanent,
}

impl StabilityBand {
    pub fn from_fos(fos: f64) -> Self {
        if fos < 1.0 {
            StabilityBand::Unstable
        } else if fos < 1.3 {
            StabilityBand::Marginal
        } else if fos < 1.5 {
            StabilityBand::Temporary
        } else {
            StabilityBand::Permanent
        }
    }

    /// The interpretation sentence for a given FOS, as printed in reports.
    pub fn interpretation(&self, fos: f64) -> String {
        match self {
            StabilityBand::Unstable => format!(
                "A factor of safety of {:.4} indicates that the slope is unstable and failure is likely to occur.",
                fos
            ),
            StabilityBand::Marginal => format!(
                "A factor of safety of {:.4} indicates marginal stability. The slope may be at risk of failure.",
                fos
            ),
            StabilityBand::Temporary => format!(
                "A factor of safety of {:.4} indicates acceptable stability for temporary conditions.",
                fos
            ),
            StabilityBand::Permanent => format!(
                "A factor of safety of {:.4} indicates acceptable stability for permanent conditions.",
                fos
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> CriticalCircle {
        CriticalCircle {
            center: Point::new(4.0, 8.0),
            radius: 7.5,
        }
    }

    fn candidate(fos: Option<f64>) -> CandidateSurface {
        CandidateSurface {
            circle: circle(),
            entry: Point::new(0.0, 5.0),
            exit: Point::new(9.0, 0.0),
            fos,
        }
    }

    #[test]
    fn test_candidates_below_skips_invalid() {
        let results = ResultSet {
            min_fos: 1.2,
            critical_circle: circle(),
            entry: Point::new(0.0, 5.0),
            exit: Point::new(9.0, 0.0),
            candidates: vec![
                candidate(Some(1.2)),
                candidate(Some(1.9)),
                candidate(Some(2.4)),
                candidate(None),
            ],
        };

        assert_eq!(results.candidates_below(2.0), 2);
        assert_eq!(results.candidates_below(1.0), 0);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(StabilityBand::from_fos(0.95), StabilityBand::Unstable);
        assert_eq!(StabilityBand::from_fos(1.0), StabilityBand::Marginal);
        assert_eq!(StabilityBand::from_fos(1.3), StabilityBand::Temporary);
        assert_eq!(StabilityBand::from_fos(1.45), StabilityBand::Temporary);
        assert_eq!(StabilityBand::from_fos(1.5), StabilityBand::Permanent);
        assert_eq!(StabilityBand::from_fos(1.55), StabilityBand::Permanent);
    }

    #[test]
    fn test_interpretation_text() {
        assert!(StabilityBand::from_fos(0.95).interpretation(0.95).contains("unstable"));
        assert!(StabilityBand::from_fos(1.45)
            .interpretation(1.45)
            .contains("temporary conditions"));
        assert!(StabilityBand::from_fos(1.55)
            .interpretation(1.55)
            .contains("permanent conditions"));
    }

    #[test]
    fn test_result_set_roundtrip() {
        let results = ResultSet {
            min_fos: 1.4321,
            critical_circle: circle(),
            entry: Point::new(0.0, 5.0),
            exit: Point::new(9.0, 0.0),
            candidates: vec![candidate(Some(1.4321))],
        };
        let json = serde_json::to_string(&results).unwrap();
        let roundtrip: ResultSet = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, results);
    }
}
