//! Raster-vectorization carve intents: threshold a bitmap to a binary
//! mask, clean it up morphologically, trace contours, simplify them,
//! and place the result in field coordinates.

use crate::error::InvalidInput;
use geo::algorithm::simplify::Simplify;
use geo::Area;
use geo_types::{coord, Coord, LineString, MultiPolygon, Polygon};
use image::DynamicImage;

/// Contours smaller than this (in source pixels²) are noise, not intent.
const MIN_CONTOUR_AREA_PX: f64 = 50.0;

/// Parameters for a single raster-vectorization carve intent.
pub struct RasterIntent {
    pub image: DynamicImage,
    /// Luma threshold below which a pixel counts as ink (0-255).
    pub threshold: u8,
    pub target_width_m: f64,
    /// World point the image's center should land on.
    pub position: Coord<f64>,
    pub simplify_tolerance_px: f64,
}

#[derive(Clone)]
struct Mask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Mask {
    fn get(&self, y: i64, x: i64) -> bool {
        if y < 0 || x < 0 || y as usize >= self.height || x as usize >= self.width {
            false
        } else {
            self.bits[y as usize * self.width + x as usize]
        }
    }

    fn set(&mut self, y: usize, x: usize, v: bool) {
        self.bits[y * self.width + x] = v;
    }
}

/// Treat dark, opaque pixels as ink. Transparent pixels are always
/// background regardless of luma, so images with soft anti-aliased edges
/// behave sensibly.
fn binarize(img: &DynamicImage, threshold: u8) -> Mask {
    let gray_alpha = img.to_luma_alpha8();
    let (width, height) = gray_alpha.dimensions();
    let mut bits = vec![false; (width * height) as usize];
    for (x, y, pixel) in gray_alpha.enumerate_pixels() {
        let [luma, alpha] = pixel.0;
        bits[(y * width + x) as usize] = alpha > 0 && luma < threshold;
    }
    Mask { width: width as usize, height: height as usize, bits }
}

fn dilate(mask: &Mask) -> Mask {
    let mut out = mask.clone();
    for y in 0..mask.height {
        for x in 0..mask.width {
            if mask.get(y as i64, x as i64) {
                continue;
            }
            let touches_foreground = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dy, dx)))
                .any(|(dy, dx)| mask.get(y as i64 + dy, x as i64 + dx));
            if touches_foreground {
                out.set(y, x, true);
            }
        }
    }
    out
}

fn erode(mask: &Mask) -> Mask {
    let mut out = mask.clone();
    for y in 0..mask.height {
        for x in 0..mask.width {
            if !mask.get(y as i64, x as i64) {
                continue;
            }
            let fully_surrounded = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dy, dx)))
                .all(|(dy, dx)| mask.get(y as i64 + dy, x as i64 + dx));
            if !fully_surrounded {
                out.set(y, x, false);
            }
        }
    }
    out
}

fn morphological_close(mask: &Mask) -> Mask {
    erode(&dilate(mask))
}

fn morphological_open(mask: &Mask) -> Mask {
    dilate(&erode(mask))
}

/// Four-connected flood-fill labeling of every foreground component.
fn label_foreground_components(mask: &Mask) -> Vec<Vec<(usize, usize)>> {
    let mut visited = vec![false; mask.bits.len()];
    let mut components = Vec::new();
    for y0 in 0..mask.height {
        for x0 in 0..mask.width {
            let idx0 = y0 * mask.width + x0;
            if visited[idx0] || !mask.bits[idx0] {
                continue;
            }
            let mut stack = vec![(y0, x0)];
            visited[idx0] = true;
            let mut component = Vec::new();
            while let Some((y, x)) = stack.pop() {
                component.push((y, x));
                for (dy, dx) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                    let ny = y as i64 + dy;
                    let nx = x as i64 + dx;
                    if ny < 0 || nx < 0 || ny as usize >= mask.height || nx as usize >= mask.width {
                        continue;
                    }
                    let nidx = ny as usize * mask.width + nx as usize;
                    if !visited[nidx] && mask.bits[nidx] {
                        visited[nidx] = true;
                        stack.push((ny as usize, nx as usize));
                    }
                }
            }
            components.push(component);
        }
    }
    components
}

/// Background components with no pixel on the image border are holes
/// enclosed by some foreground region.
fn label_enclosed_background(mask: &Mask) -> Vec<Vec<(usize, usize)>> {
    let inverted = Mask { width: mask.width, height: mask.height, bits: mask.bits.iter().map(|b| !b).collect() };
    label_foreground_components(&inverted)
        .into_iter()
        .filter(|component| {
            component
                .iter()
                .all(|&(y, x)| y != 0 && x != 0 && y != mask.height - 1 && x != mask.width - 1)
        })
        .collect()
}

const MOORE_OFFSETS: [(i64, i64); 8] = [(-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1)];

/// Moore-neighbor boundary tracing, starting from the row-major-first
/// pixel of a component. Returns pixel-center coordinates in (row, col)
/// order forming a closed loop.
fn trace_boundary(mask: &Mask, start: (usize, usize)) -> Vec<(i64, i64)> {
    let start = (start.0 as i64, start.1 as i64);
    let mut boundary = vec![start];
    let mut current = start;
    let mut backtrack_dir: usize = 6; // pixel to the west, background by construction of the scan order
    loop {
        let mut found = None;
        for step in 1..=8 {
            let idx = (backtrack_dir + step) % 8;
            let (dy, dx) = MOORE_OFFSETS[idx];
            let candidate = (current.0 + dy, current.1 + dx);
            if mask.get(candidate.0, candidate.1) {
                found = Some((candidate, idx));
                break;
            }
        }
        let (next, idx) = match found {
            Some(v) => v,
            None => break,
        };
        backtrack_dir = (idx + 4) % 8;
        if next == start {
            break;
        }
        boundary.push(next);
        current = next;
    }
    boundary
}

fn component_start(component: &[(usize, usize)]) -> (usize, usize) {
    *component.iter().min_by_key(|&&(y, x)| (y, x)).expect("component is non-empty")
}

fn pixel_path_to_linestring(path: &[(i64, i64)], image_height: usize) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = path
        .iter()
        .map(|&(row, col)| coord! {x: col as f64 + 0.5, y: (image_height as f64 - row as f64) - 0.5})
        .collect();
    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    LineString::new(coords)
}

/// Build the eraser geometry for a raster-vectorization carve, placed so
/// the source image's center lands on `intent.position`.
pub fn raster_eraser(intent: &RasterIntent) -> Result<MultiPolygon<f64>, InvalidInput> {
    if intent.target_width_m <= 0.0 {
        return Err(InvalidInput::NonPositiveWidth(intent.target_width_m));
    }
    let raw = binarize(&intent.image, intent.threshold);
    let cleaned = morphological_open(&morphological_close(&raw));

    let foreground = label_foreground_components(&cleaned);
    let holes = label_enclosed_background(&cleaned);

    let mut outer_polygons: Vec<Polygon<f64>> = Vec::new();
    for component in &foreground {
        if (component.len() as f64) < MIN_CONTOUR_AREA_PX {
            log::debug!("raster carve: discarding {}px² component below the {}px² noise floor", component.len(), MIN_CONTOUR_AREA_PX);
            continue;
        }
        let path = trace_boundary(&cleaned, component_start(component));
        if path.len() < 3 {
            continue;
        }
        let ring = pixel_path_to_linestring(&path, cleaned.height);
        let simplified = ring.simplify(&intent.simplify_tolerance_px);
        let polygon = Polygon::new(simplified, vec![]);
        if polygon.unsigned_area() >= MIN_CONTOUR_AREA_PX {
            outer_polygons.push(polygon);
        } else {
            log::debug!("raster carve: discarding contour that simplified below the {}px² noise floor", MIN_CONTOUR_AREA_PX);
        }
    }

    if outer_polygons.is_empty() {
        return Err(InvalidInput::Unparseable("raster image contained no ink above threshold".into()));
    }

    for hole_component in &holes {
        if (hole_component.len() as f64) < MIN_CONTOUR_AREA_PX {
            continue;
        }
        let inverted = Mask { width: cleaned.width, height: cleaned.height, bits: cleaned.bits.iter().map(|b| !b).collect() };
        let path = trace_boundary(&inverted, component_start(hole_component));
        if path.len() < 3 {
            continue;
        }
        let ring = pixel_path_to_linestring(&path, cleaned.height).simplify(&intent.simplify_tolerance_px);
        let hole_centroid_pixel = hole_component[0];
        let probe = coord! {
            x: hole_centroid_pixel.1 as f64 + 0.5,
            y: (cleaned.height as f64 - hole_centroid_pixel.0 as f64) - 0.5,
        };
        if let Some(parent) = outer_polygons.iter_mut().find(|p| geo::Contains::contains(&*p, &probe)) {
            let mut exterior_and_holes: Vec<LineString<f64>> = parent.interiors().to_vec();
            exterior_and_holes.push(ring);
            *parent = Polygon::new(parent.exterior().clone(), exterior_and_holes);
        }
    }

    let width_px = cleaned.width as f64;
    let height_px = cleaned.height as f64;
    let scale = intent.target_width_m / width_px;

    let placed: Vec<Polygon<f64>> = outer_polygons
        .into_iter()
        .map(|polygon| {
            use geo::MapCoords;
            let scaled = polygon.map_coords(|c| coord! {x: c.x * scale, y: c.y * scale});
            let center = coord! {x: width_px * scale / 2.0, y: height_px * scale / 2.0};
            let dx = intent.position.x - center.x;
            let dy = intent.position.y - center.y;
            scaled.map_coords(|c| coord! {x: c.x + dx, y: c.y + dy})
        })
        .collect();

    Ok(MultiPolygon::new(placed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid_square_image(size: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
        let margin = size / 4;
        for y in margin..(size - margin) {
            for x in margin..(size - margin) {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn solid_square_produces_one_polygon_no_holes() {
        let intent = RasterIntent {
            image: solid_square_image(40),
            threshold: 128,
            target_width_m: 10.0,
            position: coord! {x: 0.0, y: 0.0},
            simplify_tolerance_px: 0.5,
        };
        let geom = raster_eraser(&intent).unwrap();
        assert_eq!(geom.0.len(), 1);
        assert_eq!(geom.0[0].interiors().len(), 0);
    }

    #[test]
    fn blank_image_is_rejected() {
        let intent = RasterIntent {
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]))),
            threshold: 128,
            target_width_m: 5.0,
            position: coord! {x: 0.0, y: 0.0},
            simplify_tolerance_px: 0.5,
        };
        assert!(raster_eraser(&intent).is_err());
    }

    #[test]
    fn non_positive_target_width_is_rejected() {
        let intent = RasterIntent {
            image: solid_square_image(10),
            threshold: 128,
            target_width_m: 0.0,
            position: coord! {x: 0.0, y: 0.0},
            simplify_tolerance_px: 0.5,
        };
        assert!(raster_eraser(&intent).is_err());
    }
}
