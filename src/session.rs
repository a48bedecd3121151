//! Session state: the single owner of every piece of mutable design
//! state for one maze-in-progress.
//!
//! Rather than a process-wide singleton, this is an explicit handle the
//! caller creates and threads through every operation. A `Session` holds
//! no internal lock (`!Sync` by construction — see [`Session`]'s doc):
//! one-monitor-per-design-session is satisfied by Rust's exclusive-
//! reference discipline rather than a runtime mutex. Every mutating
//! method takes `&mut self` and either commits a fully-formed new state
//! or returns `Err` and leaves `self` untouched.

use crate::carve::{self, CarveIntent, CarveOutcome, CarvedArea, CarvedElement, CarvedPath};
use crate::constraints::{ConstraintConfig, Violation};
use crate::coverage::{self, CoverageReport};
use crate::error::{Error, MissingPrerequisite, Result};
use crate::field::Field;
use crate::flow::{self, FlowReport};
use crate::font::FontProvider;
use crate::live_validator::{self, LiveCheckResult, PendingElement};
use crate::metrics::{self, RowGraph};
use crate::pathfind::{self, Path};
use crate::rasterize::Grid;
use crate::rows::{self, RowSet};
use geo::{Area, Perimeter};
use geo_types::{Coord, MultiPolygon};

#[derive(Debug, Clone, Default)]
pub struct Session {
    field: Option<Field>,
    rows: RowSet,
    /// Baseline row model used by [`Session::uncarve`]; captured the
    /// first time [`Session::generate_rows`] runs after a field is set,
    /// and reset whenever rows are explicitly regenerated.
    original_rows: Option<RowSet>,
    carved_area: CarvedArea,
    carved_elements: Vec<CarvedElement>,
    carved_paths: Vec<CarvedPath>,
    next_element_id: u64,
    entrances: Vec<Coord<f64>>,
    exits: Vec<Coord<f64>>,
    emergency_exits: Vec<Coord<f64>>,
    constraints: ConstraintConfig,
}

impl Session {
    pub fn new() -> Self {
        log::debug!("session created");
        Session { constraints: ConstraintConfig::default(), ..Default::default() }
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn carved_area(&self) -> &CarvedArea {
        &self.carved_area
    }

    pub fn carved_elements(&self) -> &[CarvedElement] {
        &self.carved_elements
    }

    pub fn carved_paths(&self) -> &[CarvedPath] {
        &self.carved_paths
    }

    pub fn entrances(&self) -> &[Coord<f64>] {
        &self.entrances
    }

    pub fn exits(&self) -> &[Coord<f64>] {
        &self.exits
    }

    pub fn emergency_exits(&self) -> &[Coord<f64>] {
        &self.emergency_exits
    }

    pub fn constraints(&self) -> &ConstraintConfig {
        &self.constraints
    }

    pub fn set_constraints(&mut self, config: ConstraintConfig) {
        self.constraints = config;
    }

    /// Replace the authoritative field. Resets every piece of derived
    /// state: rows, the uncarve baseline, carved area,
    /// per-element polygons, and the carved-path list. Entrance/exit/
    /// emergency-exit sets are cleared too — they're expressed in the old
    /// field's centered frame and have no meaning against a new one.
    pub fn set_field(&mut self, field: Field) {
        self.field = Some(field);
        self.rows = RowSet::default();
        self.original_rows = None;
        self.carved_area = CarvedArea::default();
        self.carved_elements.clear();
        self.carved_paths.clear();
        self.next_element_id = 0;
        self.entrances.clear();
        self.exits.clear();
        self.emergency_exits.clear();
    }

    /// Generate the standing-row model and install it as current. The
    /// very first call after a field is loaded also captures the
    /// uncarve baseline; a later call is an explicit regenerate and
    /// replaces that baseline too.
    pub fn generate_rows(&mut self, row_spacing: f64, direction_deg: f64, headland_inset: f64) -> Result<()> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        let rows = rows::generate_rows(field, row_spacing, direction_deg, headland_inset)
            .map_err(Error::GeometricFailure)?;
        self.rows = rows.clone();
        self.original_rows = Some(rows);
        Ok(())
    }

    /// Install a row model loaded from a saved project (`project_store`'s
    /// only way to touch `rows`/`original_rows`, since both fields are
    /// private to this module). The project file records only the
    /// post-carve walls, not a separate pre-carve baseline, so the
    /// restored state also becomes the uncarve baseline: a load behaves,
    /// for uncarve purposes, like a fresh `generate_rows` call against
    /// whatever the file described as "current".
    pub(crate) fn restore_rows_from_document(&mut self, rows: RowSet) {
        self.original_rows = Some(rows.clone());
        self.rows = rows;
    }

    /// Install carved state loaded from a saved project.
    pub(crate) fn restore_carved_state(&mut self, carved_area: MultiPolygon<f64>, elements: Vec<CarvedElement>, paths: Vec<CarvedPath>) {
        self.next_element_id = elements.iter().map(|e| e.id + 1).max().unwrap_or(0);
        self.carved_area = CarvedArea(carved_area);
        self.carved_elements = elements;
        self.carved_paths = paths;
    }

    /// Apply one carve intent. On success, commits the new rows,
    /// carved area, per-element polygon, and any carved-path records, and
    /// returns the warnings collected along the way.
    pub fn carve(&mut self, intent: &CarveIntent, font: &dyn FontProvider) -> Result<Vec<crate::error::Warning>> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::CarveWithoutField)?;
        let CarveOutcome { new_rows, new_carved_area, new_element, new_carved_paths, warnings } =
            carve::apply_carve(intent, field, &self.rows, &self.carved_area, font, self.next_element_id)?;

        self.rows = new_rows;
        self.carved_area = new_carved_area;
        self.next_element_id += 1;
        self.carved_elements.push(new_element);
        self.carved_paths.extend(new_carved_paths);
        Ok(warnings)
    }

    /// Restore standing corn inside `region` (uncarve): rows become the
    /// union of the current rows and whatever the original baseline had
    /// inside `region`; the carved area shrinks by `region`. Per-element
    /// polygons are not retroactively split.
    pub fn uncarve(&mut self, region: &MultiPolygon<f64>) -> Result<()> {
        self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        let original = self.original_rows.as_ref().ok_or(MissingPrerequisite::NoRows)?;

        use geo::BooleanOps;
        let restored = region.clip(&original.0, true);
        let mut combined = self.rows.0.clone();
        combined.0.extend(restored.0);
        self.rows = RowSet(combined);

        let region_multi = region.clone();
        self.carved_area = CarvedArea(crate::geometry::ops::difference(&self.carved_area.0, &region_multi)?);
        Ok(())
    }

    pub fn set_entrances(&mut self, points: Vec<Coord<f64>>) {
        self.entrances = points;
    }

    pub fn set_exits(&mut self, points: Vec<Coord<f64>>) {
        self.exits = points;
    }

    pub fn set_emergency_exits(&mut self, points: Vec<Coord<f64>>) {
        self.emergency_exits = points;
    }

    /// Evaluate the finished-maze constraint checks against the current
    /// field and rows.
    pub fn validate(&self) -> Result<Vec<Violation>> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoCarvedState)?;
        crate::constraints::validate(field, &self.rows, &self.constraints).map_err(Error::GeometricFailure)
    }

    /// Pre-carve check of a pending batch of design elements.
    pub fn check_pending(&self, elements: &[PendingElement]) -> Result<LiveCheckResult> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        Ok(live_validator::check_pending(elements, field, &self.carved_area.0, &self.constraints))
    }

    /// Build the walkability grid for the current field and rows.
    pub fn rasterize(&self, resolution_m: f64) -> Result<Grid> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        Ok(Grid::rasterize(&field.polygon(), &self.rows.0, resolution_m))
    }

    /// Find a path between two world points on a grid at `resolution_m`.
    pub fn find_path(&self, start: Coord<f64>, goal: Coord<f64>, resolution_m: f64) -> Result<Option<Path>> {
        let grid = self.rasterize(resolution_m)?;
        pathfind::find_path(&grid, start, goal).map_err(Error::GeometricFailure)
    }

    /// Whether a path exists between two world points on a grid at
    /// `resolution_m` — a thin convenience over [`Session::find_path`].
    pub fn is_solvable(&self, start: Coord<f64>, goal: Coord<f64>, resolution_m: f64) -> Result<bool> {
        Ok(self.find_path(start, goal, resolution_m)?.is_some())
    }

    /// Build the row-network graph and composite difficulty score.
    pub fn metrics(&self) -> Result<(RowGraph, f64)> {
        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        let graph = metrics::build_graph(&self.rows);
        let polygon = field.polygon();
        let score = metrics::difficulty_score(&graph, polygon.unsigned_area(), polygon.perimeter());
        Ok((graph, score))
    }

    /// Emergency-exit coverage over the current emergency-exit set.
    pub fn emergency_coverage(&self, resolution_m: f64, max_distance_m: f64) -> Result<CoverageReport> {
        let grid = self.rasterize(resolution_m)?;
        Ok(coverage::evaluate_coverage(&grid, &self.emergency_exits, max_distance_m))
    }

    /// Greedily suggest new emergency-exit points until coverage reaches
    /// 95% or 20 suggestions have been added, returning the points
    /// suggested (the session's own emergency-exit set is left
    /// untouched — the caller decides whether to accept them via
    /// [`Session::set_emergency_exits`]).
    pub fn suggest_emergency_exits(&self, resolution_m: f64, max_distance_m: f64) -> Result<Vec<Coord<f64>>> {
        const TARGET_COVERAGE: f64 = 0.95;
        const MAX_SUGGESTIONS: usize = 20;

        let field = self.field.as_ref().ok_or(MissingPrerequisite::NoField)?;
        let polygon = field.polygon();
        let grid = self.rasterize(resolution_m)?;
        let mut exits = self.emergency_exits.clone();
        let mut suggestions = Vec::new();

        for _ in 0..MAX_SUGGESTIONS {
            let report = coverage::evaluate_coverage(&grid, &exits, max_distance_m);
            if report.covered_fraction >= TARGET_COVERAGE {
                break;
            }
            let Some(point) = coverage::suggest_boundary_placement(&grid, &polygon, &exits) else { break };
            exits.push(point);
            suggestions.push(point);
        }
        Ok(suggestions)
    }

    /// Simulate visitor flow, each visitor starting at a random entrance
    /// from the session's entrance set and targeting a random exit from
    /// its exit set.
    pub fn simulate_flow(&self, resolution_m: f64, walker_count: usize, max_steps: usize, seed: u64) -> Result<FlowReport> {
        let grid = self.rasterize(resolution_m)?;
        Ok(flow::simulate_flow(&grid, &self.entrances, &self.exits, walker_count, max_steps, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::NullFontProvider;
    use geo_types::{coord, LineString, Polygon};

    fn square_field(side: f64) -> Field {
        let h = side / 2.0;
        let poly = Polygon::new(
            LineString::new(vec![
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

    fn init_log() {
        use pretty_env_logger::env_logger;
        use std::io::Write;
        let _ = env_logger::builder().format(|buf, record| writeln!(buf, "{} - {}", record.level(), record.args())).try_init();
    }

    #[test]
    fn new_session_logs_its_own_creation() {
        init_log();
        let _session = Session::new();
    }

    #[test]
    fn carve_without_field_is_a_missing_prerequisite() {
        let mut session = Session::new();
        let intent = CarveIntent::Stroke { points: vec![coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0}], width: 2.0 };
        let err = session.carve(&intent, &NullFontProvider).unwrap_err();
        assert!(matches!(err, Error::MissingPrerequisite(MissingPrerequisite::CarveWithoutField)));
    }

    #[test]
    fn set_field_resets_derived_state() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        session.generate_rows(0.762, 0.0, 0.0).unwrap();
        assert!(!session.rows().is_empty());

        let intent = CarveIntent::Stroke { points: vec![coord! {x: -20.0, y: 0.0}, coord! {x: 20.0, y: 0.0}], width: 3.0 };
        session.carve(&intent, &NullFontProvider).unwrap();
        assert!(!session.carved_elements().is_empty());

        session.set_field(square_field(100.0));
        assert!(session.rows().is_empty());
        assert!(session.carved_elements().is_empty());
        assert_eq!(session.carved_area().area_m2(), 0.0);
    }

    #[test]
    fn uncarve_restores_original_rows_inside_region() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        session.generate_rows(0.762, 0.0, 0.0).unwrap();

        let intent = CarveIntent::Stroke { points: vec![coord! {x: -40.0, y: 0.0}, coord! {x: 40.0, y: 0.0}], width: 3.0 };
        session.carve(&intent, &NullFontProvider).unwrap();
        let carved_area_before = session.carved_area().area_m2();
        assert!(carved_area_before > 0.0);

        let region = session.carved_area().0.clone();
        session.uncarve(&region).unwrap();
        assert!(session.carved_area().area_m2() < carved_area_before + 1e-6);
    }

    #[test]
    fn carve_then_generate_rows_again_resets_uncarve_baseline() {
        let mut session = Session::new();
        session.set_field(square_field(100.0));
        session.generate_rows(0.762, 0.0, 0.0).unwrap();
        let intent = CarveIntent::Stroke { points: vec![coord! {x: -40.0, y: 0.0}, coord! {x: 40.0, y: 0.0}], width: 3.0 };
        session.carve(&intent, &NullFontProvider).unwrap();

        session.generate_rows(0.762, 0.0, 0.0).unwrap();
        let region = session.carved_area().0.clone();
        // Carved area was never reset by a plain `generate_rows` call, so
        // uncarve has a region to subtract from; but the baseline it
        // restores from is now the freshly regenerated, uncarved rows.
        assert!(session.uncarve(&region).is_ok());
    }

    #[test]
    fn metrics_and_validate_require_a_field() {
        let session = Session::new();
        assert!(session.metrics().is_err());
        assert!(session.validate().is_err());
    }
}
