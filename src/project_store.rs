//! Project persistence: serialize and restore the full design state as a
//! versioned `.cmz` JSON document.
//!
//! The document is a plain `serde`-derived struct tree. `camera`/`grid`
//! UI settings are modeled as `serde_json::Value` — the core never
//! interprets them, it only round-trips them opaquely. This module does
//! no file I/O itself: it turns a [`crate::Session`] into bytes and
//! back, and the caller is responsible for actually writing and reading
//! a path.

use crate::carve::{CarveKind, CarvedElement, CarvedPath};
use crate::constraints::ConstraintConfig;
use crate::error::{Error, InvalidInput, MissingPrerequisite, Result};
use crate::field::Field;
use crate::rows::RowSet;
use crate::session::Session;
use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use wkt::{ToWkt, TryFromWkt};

/// The only document version this engine can load. A saved file's major
/// version must match exactly — a higher version fails the load; unknown
/// *fields* within a supported version are ignored.
pub const SUPPORTED_VERSION: u32 = 2;

/// Fixed filename a host application should pass to [`save`] for
/// periodic autosaves, so every session's autosave lands at a
/// predictable, well-known name.
pub const AUTOSAVE_FILENAME: &str = "autosave.cmz";

/// The current instant as a UTC RFC 3339 string, for `saved_at`.
/// `save` takes this as a plain argument rather than stamping it
/// internally, so the document-building itself stays a pure function of
/// its inputs and is easy to test without wall-clock time.
pub fn now_rfc3339() -> Result<String> {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| Error::ResourceFailure(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldDocument {
    exterior: Vec<[f64; 2]>,
    interiors: Vec<Vec<[f64; 2]>>,
    crs: String,
    centroid_offset: (f64, f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CarvedElementDocument {
    id: u64,
    element_type: CarveKind,
    wkt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CarvedPathDocument {
    points: Vec<[f64; 2]>,
    width: f64,
}

/// The full `.cmz` project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub version: u32,
    pub name: String,
    /// UTC ISO-8601 / RFC 3339 timestamp of when this document was saved.
    pub saved_at: String,
    field: FieldDocument,
    walls: Vec<Vec<[f64; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headland_walls: Option<Vec<Vec<[f64; 2]>>>,
    carved_elements: Vec<CarvedElementDocument>,
    carved_paths: Vec<CarvedPathDocument>,
    entrances: Vec<[f64; 2]>,
    exits: Vec<[f64; 2]>,
    emergency_exits: Vec<[f64; 2]>,
    constraints: ConstraintConfig,
    #[serde(default = "serde_json::Value::default")]
    camera: serde_json::Value,
    #[serde(default = "serde_json::Value::default")]
    grid: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

/// Reject any filename containing a path-traversal or separator
/// character, before the caller ever constructs a path from it.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidInput(InvalidInput::BadFilename(name.to_string())));
    }
    Ok(())
}

fn coord_pairs(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.0.iter().map(|c| [c.x, c.y]).collect()
}

fn line_from_pairs(pairs: &[[f64; 2]]) -> LineString<f64> {
    LineString::new(pairs.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
}

fn flatten_rows(rows: &RowSet) -> Vec<Vec<[f64; 2]>> {
    rows.0 .0.iter().map(coord_pairs).collect()
}

fn rows_from_flattened(lines: &[Vec<[f64; 2]>]) -> RowSet {
    RowSet(MultiLineString::new(lines.iter().map(|l| line_from_pairs(l)).collect()))
}

/// Snapshot the session's current state into a document named `name`,
/// carrying the caller's opaque `camera`/`grid` UI blobs and optional
/// metadata. Fails if the session has no field — a project is always
/// anchored to a field.
pub fn save(
    session: &Session,
    name: impl Into<String>,
    saved_at_rfc3339: impl Into<String>,
    camera: serde_json::Value,
    grid: serde_json::Value,
    metadata: Option<serde_json::Value>,
) -> Result<ProjectDocument> {
    let name = name.into();
    log::debug!("saving project {name:?}: {} carved elements, {} carved paths", session.carved_elements().len(), session.carved_paths().len());
    let field = session.field().ok_or(MissingPrerequisite::NoField)?;

    let field_doc = FieldDocument {
        exterior: coord_pairs(&field.polygon().exterior().clone()),
        interiors: field.polygon().interiors().iter().map(coord_pairs).collect(),
        crs: field.crs().to_string(),
        centroid_offset: field.centroid_offset(),
    };

    let carved_elements = session
        .carved_elements()
        .iter()
        .map(|e| CarvedElementDocument { id: e.id, element_type: e.element_type, wkt: e.geometry.to_wkt().to_string() })
        .collect();

    let carved_paths = session
        .carved_paths()
        .iter()
        .map(|p| CarvedPathDocument { points: coord_pairs(&p.points), width: p.width })
        .collect();

    Ok(ProjectDocument {
        version: SUPPORTED_VERSION,
        name,
        saved_at: saved_at_rfc3339.into(),
        field: field_doc,
        walls: flatten_rows(session.rows()),
        headland_walls: None,
        carved_elements,
        carved_paths,
        entrances: session.entrances().iter().map(|c| [c.x, c.y]).collect(),
        exits: session.exits().iter().map(|c| [c.x, c.y]).collect(),
        emergency_exits: session.emergency_exits().iter().map(|c| [c.x, c.y]).collect(),
        constraints: *session.constraints(),
        camera,
        grid,
        metadata,
    })
}

/// Serialize a document to a UTF-8 JSON string.
pub fn to_json(document: &ProjectDocument) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(|e| Error::ResourceFailure(e.to_string()))
}

/// Parse a document from a byte slice (the only I/O-adjacent fallible
/// operation this module performs: turning caller-supplied bytes into
/// structured data). Fails with `UnsupportedProjectVersion` if the major
/// version exceeds what this engine supports.
pub fn from_bytes(bytes: &[u8]) -> Result<ProjectDocument> {
    let document: ProjectDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidInput(InvalidInput::MalformedProject(e.to_string())))?;
    if document.version > SUPPORTED_VERSION {
        return Err(Error::InvalidInput(InvalidInput::UnsupportedProjectVersion {
            found: document.version,
            supported: SUPPORTED_VERSION,
        }));
    }
    Ok(document)
}

/// Restore a full session from a loaded document: field, rows, carved
/// area/elements, carved paths, and every point set. The carved area is
/// reconstructed as the union of the per-element polygons rather than
/// stored redundantly, so `save`→`load`→`save` cannot drift the two
/// apart.
pub fn load(document: &ProjectDocument) -> Result<Session> {
    log::debug!("loading project {:?} (saved {})", document.name, document.saved_at);
    let mut session = Session::new();

    let exterior = line_from_pairs(&document.field.exterior);
    let interiors: Vec<LineString<f64>> = document.field.interiors.iter().map(|i| line_from_pairs(i)).collect();
    let field = Field::reconstruct(exterior, interiors, document.field.crs.clone(), document.field.centroid_offset);
    session.set_field(field);

    session.restore_rows_from_document(rows_from_flattened(&document.walls));

    let mut carved_area = MultiPolygon::<f64>::new(vec![]);
    let mut elements = Vec::with_capacity(document.carved_elements.len());
    for e in &document.carved_elements {
        let geometry = MultiPolygon::<f64>::try_from_wkt_str(&e.wkt)
            .or_else(|_| Polygon::<f64>::try_from_wkt_str(&e.wkt).map(|p| MultiPolygon::new(vec![p])))
            .map_err(|err| Error::InvalidInput(InvalidInput::Unparseable(err.to_string())))?;
        carved_area = crate::geometry::ops::union(&carved_area, &geometry).map_err(Error::GeometricFailure)?;
        elements.push(CarvedElement { id: e.id, element_type: e.element_type, geometry });
    }
    let carved_paths: Vec<CarvedPath> =
        document.carved_paths.iter().map(|p| CarvedPath { points: line_from_pairs(&p.points), width: p.width }).collect();
    session.restore_carved_state(carved_area, elements, carved_paths);

    session.set_entrances(document.entrances.iter().map(|p| Coord { x: p[0], y: p[1] }).collect());
    session.set_exits(document.exits.iter().map(|p| Coord { x: p[0], y: p[1] }).collect());
    session.set_emergency_exits(document.emergency_exits.iter().map(|p| Coord { x: p[0], y: p[1] }).collect());
    session.set_constraints(document.constraints);

    Ok(session)
}

/// Restore only field + CRS + centroid offset from a document, leaving
/// every other piece of session state at its default — for starting a
/// new design on a field saved by a previous project.
pub fn load_boundary_only(document: &ProjectDocument) -> Session {
    let mut session = Session::new();
    let exterior = line_from_pairs(&document.field.exterior);
    let interiors: Vec<LineString<f64>> = document.field.interiors.iter().map(|i| line_from_pairs(i)).collect();
    let field = Field::reconstruct(exterior, interiors, document.field.crs.clone(), document.field.centroid_offset);
    session.set_field(field);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carve::CarveIntent;
    use crate::font::NullFontProvider;
    use geo_types::{coord, LineString as GLineString, Polygon as GPolygon};

    fn square_field(side: f64) -> Field {
        let h = side / 2.0;
        let poly = GPolygon::new(
            GLineString::new(vec![
                coord! {x: -h, y: -h},
                coord! {x: h, y: -h},
                coord! {x: h, y: h},
                coord! {x: -h, y: h},
                coord! {x: -h, y: -h},
            ]),
            vec![],
        );
        Field::import_polygon(&poly, "EPSG:32615").unwrap().0
    }

    #[test]
    fn filename_validation_rejects_traversal_and_separators() {
        assert!(validate_filename("maze.cmz").is_ok());
        assert!(validate_filename("../escape.cmz").is_err());
        assert!(validate_filename("sub/dir.cmz").is_err());
        assert!(validate_filename("sub\\dir.cmz").is_err());
    }

    #[test]
    fn save_then_load_round_trips_rows_and_carved_state() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        session.generate_rows(0.762, 0.0, 0.0).unwrap();
        let intent = CarveIntent::Stroke { points: vec![coord! {x: -40.0, y: 0.0}, coord! {x: 40.0, y: 0.0}], width: 3.0 };
        session.carve(&intent, &NullFontProvider).unwrap();
        session.set_entrances(vec![coord! {x: -49.0, y: 0.0}]);
        session.set_exits(vec![coord! {x: 49.0, y: 0.0}]);

        let doc = save(&session, "roundtrip", "2026-07-26T00:00:00Z", serde_json::Value::Null, serde_json::Value::Null, None).unwrap();
        let json = to_json(&doc).unwrap();
        let reparsed = from_bytes(json.as_bytes()).unwrap();
        let restored = load(&reparsed).unwrap();

        assert_eq!(restored.rows().segment_count(), session.rows().segment_count());
        assert!((restored.carved_area().area_m2() - session.carved_area().area_m2()).abs() < 1e-6);
        assert_eq!(restored.carved_elements().len(), session.carved_elements().len());
        assert_eq!(restored.entrances(), session.entrances());
        assert_eq!(restored.exits(), session.exits());
    }

    #[test]
    fn unsupported_major_version_fails_to_load() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        let doc = save(&session, "v3", "2026-07-26T00:00:00Z", serde_json::Value::Null, serde_json::Value::Null, None).unwrap();
        let mut json_value: serde_json::Value = serde_json::from_str(&to_json(&doc).unwrap()).unwrap();
        json_value["version"] = serde_json::json!(3);
        let bytes = serde_json::to_vec(&json_value).unwrap();
        let err = from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(InvalidInput::UnsupportedProjectVersion { found: 3, supported: 2 })));
    }

    #[test]
    fn load_boundary_only_restores_field_and_nothing_else() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        session.generate_rows(0.762, 0.0, 0.0).unwrap();
        let doc = save(&session, "boundary", "2026-07-26T00:00:00Z", serde_json::Value::Null, serde_json::Value::Null, None).unwrap();
        let fresh = load_boundary_only(&doc);
        assert!(fresh.field().is_some());
        assert!(fresh.rows().is_empty());
        assert!(fresh.carved_elements().is_empty());
    }
}
