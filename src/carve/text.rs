//! Text-glyph carve intents: render glyph outlines through the
//! `FontProvider` callback, classify outer/hole rings so letter
//! counters ("O", "D", "B", "P", "Q", "R") survive, then position and
//! scale the result.

use crate::carve::classify_rings_by_containment;
use crate::error::InvalidInput;
use crate::font::FontProvider;
use crate::geometry::buffer::round_export_buffer;
use crate::geometry::ops;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Area, Translate};
use geo_types::{Coord, LineString, MultiPolygon};

/// How a text carve fills its glyph outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Fill,
    Stroke,
}

/// Parameters for a single text-glyph carve intent.
#[derive(Debug, Clone)]
pub struct TextIntent {
    pub family: String,
    pub weight: u16,
    pub text: String,
    pub font_size_m: f64,
    pub mode: TextMode,
    pub stroke_width: f64,
    /// Bottom-left corner the rendered text should be translated to.
    pub position: Coord<f64>,
}

/// Build the eraser geometry for a text-glyph carve, in the font
/// provider's native (unscaled, unpositioned) units.
fn build_unplaced_geometry(intent: &TextIntent, font: &dyn FontProvider) -> Result<MultiPolygon<f64>, InvalidInput> {
    let rings = font.outline_rings(&intent.family, intent.weight, &intent.text);
    if rings.is_empty() {
        return Err(InvalidInput::Unparseable(format!(
            "font provider returned no outlines for \"{}\"",
            intent.text
        )));
    }
    let (outers, holes) = classify_rings_by_containment(rings);

    let outer_union = MultiPolygon::new(outers);
    let hole_union = MultiPolygon::new(holes);
    let filled = if hole_union.0.is_empty() {
        outer_union
    } else {
        ops::difference(&outer_union, &hole_union).map_err(|_| InvalidInput::UnrepairableGeometry)?
    };

    match intent.mode {
        TextMode::Fill => Ok(filled),
        TextMode::Stroke => {
            let half = intent.stroke_width / 2.0;
            let outward = round_export_buffer(&filled, half);
            let inward = round_export_buffer(&filled, -half);
            ops::difference(&outward, &inward).map_err(|_| InvalidInput::UnrepairableGeometry)
        }
    }
}

/// Build the final, placed eraser geometry for a text carve: render,
/// classify, scale to `font_size_m`, then translate so the bottom-left
/// corner reaches `position`.
pub fn text_eraser(intent: &TextIntent, font: &dyn FontProvider) -> Result<MultiPolygon<f64>, InvalidInput> {
    let unplaced = build_unplaced_geometry(intent, font)?;
    let rect = unplaced
        .bounding_rect()
        .ok_or_else(|| InvalidInput::Unparseable("text carve produced empty geometry".into()))?;
    let height = rect.max().y - rect.min().y;
    let scale = if height > 1e-9 { intent.font_size_m / height } else { 1.0 };

    let scaled = scale_multi_polygon(&unplaced, scale);
    let scaled_rect = scaled.bounding_rect().expect("scaled geometry retains a bounding rect");
    let dx = intent.position.x - scaled_rect.min().x;
    let dy = intent.position.y - scaled_rect.min().y;
    Ok(scaled.translate(dx, dy))
}

fn scale_multi_polygon(multi: &MultiPolygon<f64>, scale: f64) -> MultiPolygon<f64> {
    use geo::MapCoords;
    multi.map_coords(|c| Coord { x: c.x * scale, y: c.y * scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    /// A stand-in font provider that draws "O" as a ring-with-hole and
    /// "I" as a single solid ring, which is enough to exercise the
    /// classification logic without needing real font rendering.
    struct FakeOFont;

    impl FontProvider for FakeOFont {
        fn outline_rings(&self, _family: &str, _weight: u16, text: &str) -> Vec<LineString<f64>> {
            if text == "O" {
                let outer = LineString::new(vec![
                    coord! {x: 0.0, y: 0.0},
                    coord! {x: 10.0, y: 0.0},
                    coord! {x: 10.0, y: 10.0},
                    coord! {x: 0.0, y: 10.0},
                    coord! {x: 0.0, y: 0.0},
                ]);
                let inner = LineString::new(vec![
                    coord! {x: 3.0, y: 3.0},
                    coord! {x: 7.0, y: 3.0},
                    coord! {x: 7.0, y: 7.0},
                    coord! {x: 3.0, y: 7.0},
                    coord! {x: 3.0, y: 3.0},
                ]);
                vec![outer, inner]
            } else {
                vec![]
            }
        }
    }

    #[test]
    fn hole_is_classified_and_subtracted() {
        let intent = TextIntent {
            family: "sans".into(),
            weight: 400,
            text: "O".into(),
            font_size_m: 20.0,
            mode: TextMode::Fill,
            stroke_width: 0.0,
            position: coord! {x: 0.0, y: 0.0},
        };
        let geom = text_eraser(&intent, &FakeOFont).unwrap();
        assert_eq!(geom.0.len(), 1);
        assert_eq!(geom.0[0].interiors().len(), 1);
        let outer_area = 20.0 * 20.0;
        let hole_area = 8.0 * 8.0; // (7-3) scaled by the same factor as outer
        let expected = outer_area - hole_area;
        assert!((geom.unsigned_area() - expected).abs() / expected < 0.02);
    }

    #[test]
    fn missing_glyph_outlines_is_an_error() {
        let intent = TextIntent {
            family: "sans".into(),
            weight: 400,
            text: "Z".into(),
            font_size_m: 20.0,
            mode: TextMode::Fill,
            stroke_width: 0.0,
            position: coord! {x: 0.0, y: 0.0},
        };
        assert!(text_eraser(&intent, &FakeOFont).is_err());
    }
}
