//! Structured errors returned at the engine's public contracts.
//!
//! The engine never panics on bad input and never logs on the error path —
//! every fallible operation returns one of these variants and leaves
//! session state untouched.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a geometric input was rejected before any work was attempted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("geometry could not be parsed: {0}")]
    Unparseable(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("polygon area {area_m2:.2} m² is below the minimum of {min_m2:.2} m²")]
    AreaTooSmall { area_m2: f64, min_m2: f64 },
    #[error("polygon area {area_m2:.2} m² exceeds the maximum of {max_m2:.2} m²")]
    AreaTooLarge { area_m2: f64, max_m2: f64 },
    #[error("polygon self-intersects and could not be repaired")]
    UnrepairableGeometry,
    #[error("expected a polygon or multi-polygon, found a bare linestring")]
    BareLineString,
    #[error("filename must not contain '..', '/', or '\\': {0}")]
    BadFilename(String),
    #[error("project file has major version {found}, which this engine ({supported}) cannot load")]
    UnsupportedProjectVersion { found: u32, supported: u32 },
    #[error("project file is not valid JSON: {0}")]
    MalformedProject(String),
    #[error("stroke must have at least 2 points")]
    DegenerateStroke,
    #[error("closed polygon intent must have at least 3 points")]
    DegenerateRing,
    #[error("width must be greater than zero, got {0}")]
    NonPositiveWidth(f64),
}

/// An operation that requires prior state the session does not yet have.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MissingPrerequisite {
    #[error("no field has been set on this session")]
    NoField,
    #[error("no standing-row model has been generated yet")]
    NoRows,
    #[error("carve requested with no field loaded")]
    CarveWithoutField,
    #[error("export requested with no coordinate reference system on the field")]
    ExportWithoutCrs,
    #[error("no cut paths have been carved yet")]
    NoCutPaths,
    #[error("validation requested with no carved state present")]
    NoCarvedState,
}

/// A geometric operation produced a result the caller could not use.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometricFailure {
    #[error("boolean operation produced an empty result where one was expected")]
    UnexpectedEmptyResult,
    #[error("buffer-by-zero repair did not produce a valid polygon")]
    StillInvalidAfterRepair,
    #[error("pathfinder could not snap {which} to an open cell within {radius} cells")]
    CouldNotSnapToOpenCell { which: &'static str, radius: usize },
    #[error("headland inset consumed the entire field")]
    HeadlandInsetEmptied,
}

/// Top-level error type returned by every fallible public operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    MissingPrerequisite(#[from] MissingPrerequisite),
    #[error(transparent)]
    GeometricFailure(#[from] GeometricFailure),
    #[error("resource failure: {0}")]
    ResourceFailure(String),
}

/// A non-fatal observation attached to an otherwise-successful result.
///
/// Warnings are data, not control flow: `validate` and the carve/import
/// pipelines always succeed and return whatever warnings they collected
/// alongside their payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Warning {
    CarveOutsideField,
    ClockwiseExteriorRing,
    MultiPolygonKeptLargest,
    BareLineStringOffered,
    CarvedAreaOverflowClamped,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Warning::CarveOutsideField => "carve lay entirely outside field",
            Warning::ClockwiseExteriorRing => "counter-clockwise exterior ring expected",
            Warning::MultiPolygonKeptLargest => "multi-polygon input: kept largest ring by area",
            Warning::BareLineStringOffered => "closed linestring given where a polygon was expected",
            Warning::CarvedAreaOverflowClamped => "carved area exceeded field bounds and was clamped",
        };
        f.write_str(msg)
    }
}
