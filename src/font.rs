//! Font outline callback: the engine does not own font loading. A host
//! application supplies system-font glyph outlines through this trait;
//! the engine only turns outlines into carved geometry.

use geo_types::LineString;

/// Supplies closed glyph-outline rings for a run of text.
///
/// Implementations render `text` in the given `family`/`weight` and
/// return every closed ring produced (both outer contours and the holes
/// inside letters like "O" or "B"), in an arbitrary but consistent
/// em-square unit scale along the Y axis (i.e. cap-height ≈ 1.0 unit).
/// The engine classifies hole vs. outer itself — the callback does not
/// need to know which rings are holes.
pub trait FontProvider {
    fn outline_rings(&self, family: &str, weight: u16, text: &str) -> Vec<LineString<f64>>;
}

/// A `FontProvider` that always returns no outlines. Useful as a default
/// for hosts that have not wired up real font rendering yet, and in
/// tests that supply their own geometry directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFontProvider;

impl FontProvider for NullFontProvider {
    fn outline_rings(&self, _family: &str, _weight: u16, _text: &str) -> Vec<LineString<f64>> {
        Vec::new()
    }
}
