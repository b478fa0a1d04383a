//! # File I/O Module
//!
//! Session persistence with safety features:
//! - **Atomic saves**: Write to a temp file, verify, rename into place
//! - **Read-back verification**: The temp file is parsed before the rename,
//!   so a truncated or corrupt write never replaces a good file
//! - **Version validation**: Ensure schema compatibility on load
//!
//! ## File Format
//!
//! Sessions are saved as `.slope` files containing JSON: a small envelope
//! with the schema version wrapping the [`AnalysisSession`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use slope_core::file_io::{save_session, load_session};
//! use slope_core::session::AnalysisSession;
//! use std::path::Path;
//!
//! let session = AnalysisSession::new();
//! save_session(&session, Path::new("project.slope")).unwrap();
//! let loaded = load_session(Path::new("project.slope")).unwrap();
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{SlopeError, SlopeResult};
use crate::session::AnalysisSession;

/// Current session file schema version.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// On-disk envelope: schema version plus the session payload.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: String,
    session: AnalysisSession,
}

/// Save a session to a file with atomic write semantics.
///
/// The save process:
/// 1. Serialize the session to JSON
/// 2. Write to a temporary file next to the destination
/// 3. Read the temp file back and parse it to verify the write
/// 4. Rename over the destination (atomic on most filesystems)
///
/// An interrupted or corrupt write therefore never clobbers an existing
/// good file.
pub fn save_session(session: &AnalysisSession, path: &Path) -> SlopeResult<()> {
    let envelope = SessionFile {
        version: SCHEMA_VERSION.to_string(),
        session: session.clone(),
    };
    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| SlopeError::SerializationError {
            reason: e.to_string(),
        })?;

    // The temp file must live on the same filesystem as the destination
    // for the rename to be atomic.
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".slope-save-")
        .tempfile_in(dir)
        .map_err(|e| {
            SlopeError::file_error("create temp file", dir.display().to_string(), e.to_string())
        })?;

    tmp.write_all(json.as_bytes()).map_err(|e| {
        SlopeError::file_error("write temp file", path.display().to_string(), e.to_string())
    })?;
    tmp.as_file().sync_all().map_err(|e| {
        SlopeError::file_error("sync temp file", path.display().to_string(), e.to_string())
    })?;

    verify_written(tmp.path())?;

    tmp.persist(path).map_err(|e| {
        SlopeError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Re-read and parse a just-written temp file before it replaces the
/// destination.
fn verify_written(tmp_path: &Path) -> SlopeResult<()> {
    let mut contents = String::new();
    File::open(tmp_path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| {
            SlopeError::file_error("verify temp file", tmp_path.display().to_string(), e.to_string())
        })?;

    serde_json::from_str::<SessionFile>(&contents)
        .map(|_| ())
        .map_err(|e| SlopeError::SerializationError {
            reason: format!("Save verification failed: {e}"),
        })
}

/// Load a session from a file.
///
/// # Returns
///
/// * `Ok(AnalysisSession)` - Successfully loaded session
/// * `Err(SlopeError::VersionMismatch)` - File version is incompatible
/// * `Err(SlopeError::SerializationError)` - Invalid JSON
/// * `Err(SlopeError::FileError)` - I/O error
pub fn load_session(path: &Path) -> SlopeResult<AnalysisSession> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| SlopeError::file_error("open", path.display().to_string(), e.to_string()))?;

    let envelope: SessionFile =
        serde_json::from_str(&contents).map_err(|e| SlopeError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;

    validate_version(&envelope.version)?;

    Ok(envelope.session)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> SlopeResult<()> {
    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    let mismatch = || SlopeError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions, a newer minor is a breaking change
    if current_parts[0] == 0
        && file_parts.len() > 1
        && current_parts.len() > 1
        && file_parts[1] > current_parts[1]
    {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MaterialRecord;

    fn session() -> AnalysisSession {
        let mut session = AnalysisSession::new();
        session.info.project_name = "Galah Grove Batter".to_string();
        session.info.reference = "25000".to_string();
        session
            .materials
            .add(MaterialRecord::new(20.0, 35.0, 2.0, 5.0))
            .unwrap();
        session.water_table = Some(4.0);
        session
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.slope");

        save_session(&session(), &path).unwrap();

        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.info.project_name, "Galah Grove Batter");
        assert_eq!(loaded.info.reference, "25000");
        assert_eq!(loaded.materials.len(), 1);
        assert_eq!(loaded.water_table, Some(4.0));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atomic.slope");

        save_session(&session(), &path).unwrap();

        assert!(path.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".slope-save-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overwrite.slope");

        save_session(&session(), &path).unwrap();

        let mut updated = session();
        updated.info.project_name = "Revised Batter".to_string();
        save_session(&updated, &path).unwrap();

        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.info.project_name, "Revised Batter");
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.slope");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_session(&path).unwrap_err();
        assert!(matches!(err, SlopeError::SerializationError { .. }));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_session(&dir.path().join("nope.slope")).unwrap_err();
        assert!(matches!(err, SlopeError::FileError { .. }));
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newer.slope");

        let envelope = SessionFile {
            version: "1.0.0".to_string(),
            session: session(),
        };
        std::fs::write(&path, serde_json::to_string(&envelope).unwrap()).unwrap();

        let err = load_session(&path).unwrap_err();
        assert!(matches!(err, SlopeError::VersionMismatch { .. }));
    }
}
