//! The carve engine: turns a visitor-facing carve intent into an eraser
//! polygon, then applies that eraser to the standing-row model and the
//! accumulated carved area.
//!
//! A [`CarveIntent`] is a tagged union over the five ways a path can be
//! cut — a freehand stroke, a closed polygon, a line of text, a traced
//! raster image, or an SVG path — reified here as an enum rather than
//! five independent entry points, so `apply_carve` has one call site to
//! validate and one result shape to reason about.

pub mod raster;
pub mod stroke;
pub mod svg_path;
pub mod text;

use crate::error::{Error, InvalidInput, Warning};
use crate::field::Field;
use crate::font::FontProvider;
use crate::geometry::ops;
use crate::rows::RowSet;
use geo::{Area, Contains};
use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};

pub use raster::{raster_eraser, RasterIntent};
pub use stroke::{closed_polygon_eraser, stroke_eraser};
pub use svg_path::{svg_path_eraser, SvgPathIntent};
pub use text::{text_eraser, TextIntent};

/// What kind of cut produced a [`CarvedElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CarveKind {
    Stroke,
    ClosedPolygon,
    TextGlyph,
    RasterVectorization,
    SvgPath,
}

/// The visitor-facing description of a single cut, before it has been
/// turned into geometry.
pub enum CarveIntent {
    Stroke { points: Vec<Coord<f64>>, width: f64 },
    ClosedPolygon { ring: Vec<Coord<f64>> },
    TextGlyph(TextIntent),
    RasterVectorization(RasterIntent),
    SvgPath(SvgPathIntent),
}

impl CarveIntent {
    fn kind(&self) -> CarveKind {
        match self {
            CarveIntent::Stroke { .. } => CarveKind::Stroke,
            CarveIntent::ClosedPolygon { .. } => CarveKind::ClosedPolygon,
            CarveIntent::TextGlyph(_) => CarveKind::TextGlyph,
            CarveIntent::RasterVectorization(_) => CarveKind::RasterVectorization,
            CarveIntent::SvgPath(_) => CarveKind::SvgPath,
        }
    }
}

/// A persisted cut: a stable id, its kind, and the eraser geometry it
/// contributed, already clipped to the field boundary.
#[derive(Debug, Clone)]
pub struct CarvedElement {
    pub id: u64,
    pub element_type: CarveKind,
    pub geometry: MultiPolygon<f64>,
}

/// The freehand stroke that produced a `Stroke` carve, kept alongside the
/// resulting geometry so a host application can redraw the gesture (e.g.
/// for an undo preview) without re-deriving it from the buffered polygon.
#[derive(Debug, Clone)]
pub struct CarvedPath {
    pub points: LineString<f64>,
    pub width: f64,
}

/// The union of every eraser applied so far, clipped to the field.
#[derive(Debug, Clone, Default)]
pub struct CarvedArea(pub MultiPolygon<f64>);

impl CarvedArea {
    pub fn area_m2(&self) -> f64 {
        self.0.unsigned_area()
    }
}

/// Result of applying one carve intent to the current session state.
pub struct CarveOutcome {
    pub new_rows: RowSet,
    pub new_carved_area: CarvedArea,
    pub new_element: CarvedElement,
    pub new_carved_paths: Vec<CarvedPath>,
    pub warnings: Vec<Warning>,
}

/// Sort rings by unsigned area descending, then classify each as a hole
/// if it is contained by some already-classified outer ring, else as an
/// outer ring. Shared between text and SVG-path carves, both of which
/// need to turn an unordered bag of closed rings into outer/hole
/// polygons (letter counters and logo counters alike).
pub(crate) fn classify_rings_by_containment(mut rings: Vec<LineString<f64>>) -> (Vec<Polygon<f64>>, Vec<Polygon<f64>>) {
    rings.sort_by(|a, b| {
        let area_a = Polygon::new(a.clone(), vec![]).unsigned_area();
        let area_b = Polygon::new(b.clone(), vec![]).unsigned_area();
        area_b.partial_cmp(&area_a).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut outers: Vec<Polygon<f64>> = Vec::new();
    let mut holes: Vec<Polygon<f64>> = Vec::new();
    for ring in rings {
        let candidate = Polygon::new(ring, vec![]);
        let is_hole = outers.iter().any(|outer| outer.contains(candidate.exterior()));
        if is_hole {
            holes.push(candidate);
        } else {
            outers.push(candidate);
        }
    }
    (outers, holes)
}

/// Build the raw eraser geometry for a carve intent, in field coordinates,
/// unclipped. Dispatches to the matching submodule.
fn build_eraser(intent: &CarveIntent, font: &dyn FontProvider) -> Result<MultiPolygon<f64>, InvalidInput> {
    match intent {
        CarveIntent::Stroke { points, width } => stroke_eraser(points, *width),
        CarveIntent::ClosedPolygon { ring } => closed_polygon_eraser(ring),
        CarveIntent::TextGlyph(text_intent) => text_eraser(text_intent, font),
        CarveIntent::RasterVectorization(raster_intent) => raster_eraser(raster_intent),
        CarveIntent::SvgPath(svg_intent) => svg_path_eraser(svg_intent),
    }
}

/// Remove the portion of `rows` that falls inside `eraser`.
fn subtract_from_rows(rows: &RowSet, eraser: &MultiPolygon<f64>) -> RowSet {
    use geo::BooleanOps;
    RowSet(eraser.clip(&rows.0, true))
}

/// Apply a carve intent: build its eraser geometry, subtract it from the
/// standing rows, and fold it into the accumulated carved area. Always
/// succeeds once the eraser geometry itself is valid — a carve that lands
/// entirely outside the field is recorded (so it still shows up in history
/// and counts against a visitor's total cuts) but produces a warning and
/// changes nothing else.
pub fn apply_carve(
    intent: &CarveIntent,
    field: &Field,
    rows: &RowSet,
    carved_area: &CarvedArea,
    font: &dyn FontProvider,
    next_id: u64,
) -> Result<CarveOutcome, Error> {
    let eraser = build_eraser(intent, font)?;

    let field_multi = MultiPolygon::new(vec![field.polygon()]);
    let clipped_to_field = ops::intersection(&eraser, &field_multi)?;

    let mut warnings = Vec::new();
    if clipped_to_field.0.is_empty() {
        warnings.push(Warning::CarveOutsideField);
    }

    let new_rows = subtract_from_rows(rows, &eraser);
    let new_carved_area = CarvedArea(ops::union(&carved_area.0, &clipped_to_field)?);

    let new_element = CarvedElement { id: next_id, element_type: intent.kind(), geometry: clipped_to_field };

    let new_carved_paths = match intent {
        CarveIntent::Stroke { points, width } => {
            vec![CarvedPath { points: LineString::new(points.clone()), width: *width }]
        }
        _ => Vec::new(),
    };

    Ok(CarveOutcome { new_rows, new_carved_area, new_element, new_carved_paths, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn stroke_carve_removes_row_material_under_it() {
        let field = square_field(50.0);
        let rows = crate::rows::generate_rows(&field, 0.762, 0.0, 0.0).unwrap();
        let before = rows.segment_count();
        let intent = CarveIntent::Stroke { points: vec![coord! {x: -20.0, y: 0.0}, coord! {x: 20.0, y: 0.0}], width: 3.0 };
        let outcome = apply_carve(&intent, &field, &rows, &CarvedArea::default(), &NullFontProvider, 1).unwrap();
        assert!(outcome.warnings.is_empty());
        assert!(outcome.new_carved_area.area_m2() > 0.0);
        assert_eq!(outcome.new_element.id, 1);
        assert_eq!(outcome.new_element.element_type, CarveKind::Stroke);
        assert_eq!(outcome.new_carved_paths.len(), 1);
        // Splitting the through-field rows in two should grow the segment count.
        assert!(outcome.new_rows.segment_count() >= before);
    }

    #[test]
    fn carve_entirely_outside_field_warns_but_still_succeeds() {
        let field = square_field(10.0);
        let rows = crate::rows::generate_rows(&field, 0.762, 0.0, 0.0).unwrap();
        let intent = CarveIntent::ClosedPolygon {
            ring: vec![
                coord! {x: 100.0, y: 100.0},
                coord! {x: 102.0, y: 100.0},
                coord! {x: 102.0, y: 102.0},
                coord! {x: 100.0, y: 102.0},
            ],
        };
        let outcome = apply_carve(&intent, &field, &rows, &CarvedArea::default(), &NullFontProvider, 2).unwrap();
        assert_eq!(outcome.warnings, vec![Warning::CarveOutsideField]);
        assert_eq!(outcome.new_carved_area.area_m2(), 0.0);
    }
}
