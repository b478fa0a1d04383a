//! # Input Records & Record Stores
//!
//! User-entered soil layers and surface loads, plus the ordered stores that
//! hold them between form entry and request building.
//!
//! Records arrive from a form-based interface, so each record family offers
//! two construction paths: typed `new` (validated on store insertion) and
//! strict text parsing via `from_fields`, which names the offending field
//! when a value fails to parse.
//!
//! Ordinal position in a store is significant for materials: layers are
//! consumed by the solver in insertion order, and insertion order IS depth
//! order by convention of the caller. No sorting is ever performed.
//!
//! ## Example
//!
//! ```rust
//! use slope_core::records::{MaterialRecord, RecordStore};
//!
//! let mut materials = RecordStore::new();
//! let index = materials
//!     .add(MaterialRecord::new(20.0, 45.0, 2.0, 2.0))
//!     .unwrap();
//! assert_eq!(index, 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{SlopeError, SlopeResult};

/// Strictly parse a required numeric text field, naming it on failure.
pub(crate) fn parse_required(field: &str, text: &str) -> SlopeResult<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SlopeError::missing_field(field));
    }
    trimmed.parse::<f64>().map_err(|_| {
        SlopeError::invalid_input(field, trimmed, "Please enter a valid numeric value")
    })
}

/// Parse an optional numeric text field; empty text means absent.
pub(crate) fn parse_optional(field: &str, text: &str) -> SlopeResult<Option<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_required(field, trimmed).map(Some)
}

/// Strictly parse a required positive integer text field.
pub(crate) fn parse_count(field: &str, text: &str) -> SlopeResult<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SlopeError::missing_field(field));
    }
    let value: u32 = trimmed.parse().map_err(|_| {
        SlopeError::invalid_input(field, trimmed, "Please enter a valid whole number")
    })?;
    if value == 0 {
        return Err(SlopeError::invalid_input(field, trimmed, "Must be at least 1"));
    }
    Ok(value)
}

fn require_finite(field: &str, value: f64) -> SlopeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SlopeError::invalid_input(
            field,
            value.to_string(),
            "Value must be a finite number",
        ))
    }
}

/// A record that can be held by a [`RecordStore`].
///
/// `validate` must check every field before the store appends the record;
/// insertion is all-or-nothing.
pub trait Record {
    /// Validate every field of the record.
    fn validate(&self) -> SlopeResult<()>;
}

/// A soil layer: one stratum of the slope profile.
///
/// # JSON Format
/// ```json
/// {
///   "unit_weight": 20.0,
///   "friction_angle": 45.0,
///   "cohesion": 2.0,
///   "depth_to_bottom": 2.0
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Unit weight in kN/m³ (must be positive)
    pub unit_weight: f64,
    /// Internal friction angle in degrees
    pub friction_angle: f64,
    /// Cohesion in kPa (must be non-negative)
    pub cohesion: f64,
    /// Depth from top of slope to the bottom of this stratum, in metres
    pub depth_to_bottom: f64,
}

impl MaterialRecord {
    pub fn new(unit_weight: f64, friction_angle: f64, cohesion: f64, depth_to_bottom: f64) -> Self {
        MaterialRecord {
            unit_weight,
            friction_angle,
            cohesion,
            depth_to_bottom,
        }
    }

    /// Parse a material from form text fields.
    pub fn from_fields(
        unit_weight: &str,
        friction_angle: &str,
        cohesion: &str,
        depth_to_bottom: &str,
    ) -> SlopeResult<Self> {
        Ok(MaterialRecord {
            unit_weight: parse_required("unit_weight", unit_weight)?,
            friction_angle: parse_required("friction_angle", friction_angle)?,
            cohesion: parse_required("cohesion", cohesion)?,
            depth_to_bottom: parse_required("depth_to_bottom", depth_to_bottom)?,
        })
    }
}

impl Record for MaterialRecord {
    fn validate(&self) -> SlopeResult<()> {
        require_finite("unit_weight", self.unit_weight)?;
        require_finite("friction_angle", self.friction_angle)?;
        require_finite("cohesion", self.cohesion)?;
        require_finite("depth_to_bottom", self.depth_to_bottom)?;
        if self.unit_weight <= 0.0 {
            return Err(SlopeError::invalid_input(
                "unit_weight",
                self.unit_weight.to_string(),
                "Unit weight must be positive",
            ));
        }
        if self.cohesion < 0.0 {
            return Err(SlopeError::invalid_input(
                "cohesion",
                self.cohesion.to_string(),
                "Cohesion cannot be negative",
            ));
        }
        Ok(())
    }
}

/// A uniformly distributed surface load (UDL).
///
/// `length: None` means the load extends infinitely from its offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformLoadRecord {
    /// Load magnitude in kPa
    pub magnitude: f64,
    /// Distance from the slope crest in metres
    pub offset: f64,
    /// Loaded length in metres; absent means infinite extent
    pub length: Option<f64>,
}

impl UniformLoadRecord {
    pub fn new(magnitude: f64, offset: f64, length: Option<f64>) -> Self {
        UniformLoadRecord {
            magnitude,
            offset,
            length,
        }
    }

    /// Parse a UDL from form text fields. Empty offset defaults to 0,
    /// empty length means infinite.
    pub fn from_fields(magnitude: &str, offset: &str, length: &str) -> SlopeResult<Self> {
        Ok(UniformLoadRecord {
            magnitude: parse_required("magnitude", magnitude)?,
            offset: parse_optional("offset", offset)?.unwrap_or(0.0),
            length: parse_optional("length", length)?,
        })
    }

    /// Display string for the length column: number or "Infinite".
    pub fn length_display(&self) -> String {
        match self.length {
            Some(length) => format!("{:.2}", length),
            None => "Infinite".to_string(),
        }
    }
}

impl Record for UniformLoadRecord {
    fn validate(&self) -> SlopeResult<()> {
        require_finite("magnitude", self.magnitude)?;
        require_finite("offset", self.offset)?;
        if let Some(length) = self.length {
            require_finite("length", length)?;
            if length <= 0.0 {
                return Err(SlopeError::invalid_input(
                    "length",
                    length.to_string(),
                    "Load length must be positive (leave empty for infinite)",
                ));
            }
        }
        Ok(())
    }
}

/// A concentrated line load applied at an offset from the crest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLoadRecord {
    /// Load magnitude in kN/m
    pub magnitude: f64,
    /// Distance from the slope crest in metres
    pub offset: f64,
}

impl LineLoadRecord {
    pub fn new(magnitude: f64, offset: f64) -> Self {
        LineLoadRecord { magnitude, offset }
    }

    /// Parse a line load from form text fields. Empty offset defaults to 0.
    pub fn from_fields(magnitude: &str, offset: &str) -> SlopeResult<Self> {
        Ok(LineLoadRecord {
            magnitude: parse_required("magnitude", magnitude)?,
            offset: parse_optional("offset", offset)?.unwrap_or(0.0),
        })
    }
}

impl Record for LineLoadRecord {
    fn validate(&self) -> SlopeResult<()> {
        require_finite("magnitude", self.magnitude)?;
        require_finite("offset", self.offset)?;
        Ok(())
    }
}

/// An ordered collection of validated records.
///
/// Ordinals are positional, not stored identities: `remove` is a pure
/// positional delete and re-numbers nothing. One independent instance is
/// held per record family; stores never share state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordStore<T: Record> {
    records: Vec<T>,
}

impl<T: Record> RecordStore<T> {
    pub fn new() -> Self {
        RecordStore {
            records: Vec::new(),
        }
    }

    /// Validate and append a record.
    ///
    /// Returns the index the record was assigned. On validation failure
    /// nothing is inserted.
    pub fn add(&mut self, record: T) -> SlopeResult<usize> {
        record.validate()?;
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Remove the record at `index`.
    ///
    /// All records after `index` shift down by one; relative order of the
    /// remaining records is preserved.
    pub fn remove(&mut self, index: usize) -> SlopeResult<T> {
        if index >= self.records.len() {
            return Err(SlopeError::IndexOutOfBounds {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }
}

impl<T: Record> Default for RecordStore<T> {
    fn default() -> Self {
        RecordStore::new()
    }
}
