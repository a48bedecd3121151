//! SVG-path carve intents: a small hand-rolled path data parser
//! (M/L/H/V/C/Q/A/Z only — no shorthand curve commands), Y-axis flip,
//! scale-to-fit, and centroid placement.

use crate::carve::classify_rings_by_containment;
use crate::error::InvalidInput;
use crate::geometry::ops;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Centroid, Translate};
use geo_types::{coord, Coord, LineString, MultiPolygon};

/// Parameters for a single SVG-path carve intent.
pub struct SvgPathIntent {
    pub path: String,
    pub size_m: f64,
    /// World point the path's centroid should be translated to.
    pub position: Coord<f64>,
}

enum Token {
    Command(char),
    Number(f64),
}

fn tokenize(path: &str) -> Vec<Token> {
    let chars: Vec<char> = path.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() {
            tokens.push(Token::Command(c));
            i += 1;
            continue;
        }
        let start = i;
        if chars[i] == '+' || chars[i] == '-' {
            i += 1;
        }
        let mut seen_dot = false;
        while i < chars.len() {
            let cc = chars[i];
            if cc.is_ascii_digit() {
                i += 1;
            } else if cc == '.' && !seen_dot {
                seen_dot = true;
                i += 1;
            } else if (cc == 'e' || cc == 'E') && i + 1 < chars.len() {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
            } else {
                break;
            }
        }
        if i > start {
            let text: String = chars[start..i].iter().collect();
            if let Ok(v) = text.parse::<f64>() {
                tokens.push(Token::Number(v));
                continue;
            }
        }
        i += 1; // skip a character we could not make sense of
    }
    tokens
}

fn take_number(tokens: &[Token], idx: &mut usize) -> Result<f64, InvalidInput> {
    match tokens.get(*idx) {
        Some(Token::Number(v)) => {
            *idx += 1;
            Ok(*v)
        }
        _ => Err(InvalidInput::Unparseable("path data ended with a missing argument".into())),
    }
}

fn cubic_point(p0: Coord<f64>, c1: Coord<f64>, c2: Coord<f64>, p1: Coord<f64>, t: f64) -> Coord<f64> {
    let mt = 1.0 - t;
    coord! {
        x: mt * mt * mt * p0.x + 3.0 * mt * mt * t * c1.x + 3.0 * mt * t * t * c2.x + t * t * t * p1.x,
        y: mt * mt * mt * p0.y + 3.0 * mt * mt * t * c1.y + 3.0 * mt * t * t * c2.y + t * t * t * p1.y,
    }
}

fn quadratic_point(p0: Coord<f64>, c: Coord<f64>, p1: Coord<f64>, t: f64) -> Coord<f64> {
    let mt = 1.0 - t;
    coord! {
        x: mt * mt * p0.x + 2.0 * mt * t * c.x + t * t * p1.x,
        y: mt * mt * p0.y + 2.0 * mt * t * c.y + t * t * p1.y,
    }
}

const ARC_FAN_SEGMENTS: usize = 16;

/// Endpoint-to-center arc parameterization (W3C SVG implementation notes),
/// sampled into a line fan of `ARC_FAN_SEGMENTS` points.
fn arc_points(
    p0: Coord<f64>,
    rx: f64,
    ry: f64,
    x_axis_rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    p1: Coord<f64>,
) -> Vec<Coord<f64>> {
    if rx.abs() < 1e-12 || ry.abs() < 1e-12 {
        return vec![p1];
    }
    let phi = x_axis_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let dx2 = (p0.x - p1.x) / 2.0;
    let dy2 = (p0.y - p1.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let mut rx = rx.abs();
    let mut ry = ry.abs();
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let sign = if large_arc != sweep { 1.0 } else { -1.0 };
    let num = (rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p).max(0.0);
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let coef = if den.abs() < 1e-12 { 0.0 } else { sign * (num / den).sqrt() };
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);

    let cx = cos_phi * cxp - sin_phi * cyp + (p0.x + p1.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (p0.y + p1.y) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| -> f64 {
        let dot = ux * vx + uy * vy;
        let len = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
        let mut a = (dot / len).clamp(-1.0, 1.0).acos();
        if ux * vy - uy * vx < 0.0 {
            a = -a;
        }
        a
    };

    let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut delta = angle((x1p - cxp) / rx, (y1p - cyp) / ry, (-x1p - cxp) / rx, (-y1p - cyp) / ry);
    if !sweep && delta > 0.0 {
        delta -= std::f64::consts::TAU;
    } else if sweep && delta < 0.0 {
        delta += std::f64::consts::TAU;
    }

    (1..=ARC_FAN_SEGMENTS)
        .map(|i| {
            let t = theta1 + delta * (i as f64 / ARC_FAN_SEGMENTS as f64);
            let (sin_t, cos_t) = t.sin_cos();
            coord! {
                x: cos_phi * rx * cos_t - sin_phi * ry * sin_t + cx,
                y: sin_phi * rx * cos_t + cos_phi * ry * sin_t + cy,
            }
        })
        .collect()
}

fn parse_subpaths(path: &str) -> Result<Vec<Vec<Coord<f64>>>, InvalidInput> {
    let tokens = tokenize(path);
    let mut idx = 0;
    let mut subpaths: Vec<Vec<Coord<f64>>> = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();
    let mut cursor = coord! {x: 0.0, y: 0.0};
    let mut subpath_start = cursor;
    let mut command: Option<char> = None;

    loop {
        match tokens.get(idx) {
            None => break,
            Some(Token::Command(c)) => {
                command = Some(*c);
                idx += 1;
            }
            Some(Token::Number(_)) => {}
        }
        let cmd = command.ok_or(InvalidInput::Unparseable("path data must begin with a command".into()))?;

        match cmd {
            'M' | 'm' => {
                let x = take_number(&tokens, &mut idx)?;
                let y = take_number(&tokens, &mut idx)?;
                if !current.is_empty() {
                    subpaths.push(std::mem::take(&mut current));
                }
                cursor = if cmd == 'm' { coord! {x: cursor.x + x, y: cursor.y + y} } else { coord! {x, y} };
                subpath_start = cursor;
                current.push(cursor);
                command = Some(if cmd == 'm' { 'l' } else { 'L' });
            }
            'L' | 'l' => {
                let x = take_number(&tokens, &mut idx)?;
                let y = take_number(&tokens, &mut idx)?;
                cursor = if cmd == 'l' { coord! {x: cursor.x + x, y: cursor.y + y} } else { coord! {x, y} };
                current.push(cursor);
            }
            'H' | 'h' => {
                let x = take_number(&tokens, &mut idx)?;
                cursor = coord! {x: if cmd == 'h' { cursor.x + x } else { x }, y: cursor.y};
                current.push(cursor);
            }
            'V' | 'v' => {
                let y = take_number(&tokens, &mut idx)?;
                cursor = coord! {x: cursor.x, y: if cmd == 'v' { cursor.y + y } else { y }};
                current.push(cursor);
            }
            'C' | 'c' => {
                let mut nums = [0.0; 6];
                for n in &mut nums {
                    *n = take_number(&tokens, &mut idx)?;
                }
                let (c1, c2, end) = if cmd == 'c' {
                    (
                        coord! {x: cursor.x + nums[0], y: cursor.y + nums[1]},
                        coord! {x: cursor.x + nums[2], y: cursor.y + nums[3]},
                        coord! {x: cursor.x + nums[4], y: cursor.y + nums[5]},
                    )
                } else {
                    (coord! {x: nums[0], y: nums[1]}, coord! {x: nums[2], y: nums[3]}, coord! {x: nums[4], y: nums[5]})
                };
                current.push(cubic_point(cursor, c1, c2, end, 1.0 / 3.0));
                current.push(cubic_point(cursor, c1, c2, end, 2.0 / 3.0));
                current.push(end);
                cursor = end;
            }
            'Q' | 'q' => {
                let mut nums = [0.0; 4];
                for n in &mut nums {
                    *n = take_number(&tokens, &mut idx)?;
                }
                let (ctrl, end) = if cmd == 'q' {
                    (coord! {x: cursor.x + nums[0], y: cursor.y + nums[1]}, coord! {x: cursor.x + nums[2], y: cursor.y + nums[3]})
                } else {
                    (coord! {x: nums[0], y: nums[1]}, coord! {x: nums[2], y: nums[3]})
                };
                current.push(quadratic_point(cursor, ctrl, end, 1.0 / 3.0));
                current.push(quadratic_point(cursor, ctrl, end, 2.0 / 3.0));
                current.push(end);
                cursor = end;
            }
            'A' | 'a' => {
                let rx = take_number(&tokens, &mut idx)?;
                let ry = take_number(&tokens, &mut idx)?;
                let rotation = take_number(&tokens, &mut idx)?;
                let large_arc = take_number(&tokens, &mut idx)? != 0.0;
                let sweep = take_number(&tokens, &mut idx)? != 0.0;
                let x = take_number(&tokens, &mut idx)?;
                let y = take_number(&tokens, &mut idx)?;
                let end = if cmd == 'a' { coord! {x: cursor.x + x, y: cursor.y + y} } else { coord! {x, y} };
                current.extend(arc_points(cursor, rx, ry, rotation, large_arc, sweep, end));
                cursor = end;
            }
            'Z' | 'z' => {
                if !current.is_empty() {
                    subpaths.push(std::mem::take(&mut current));
                }
                cursor = subpath_start;
            }
            other => return Err(InvalidInput::Unparseable(format!("unsupported path command '{}'", other))),
        }
    }
    if !current.is_empty() {
        subpaths.push(current);
    }
    if subpaths.is_empty() {
        return Err(InvalidInput::Unparseable("path produced no subpaths".into()));
    }
    Ok(subpaths)
}

/// Build the final, placed eraser geometry for an SVG-path carve.
pub fn svg_path_eraser(intent: &SvgPathIntent) -> Result<MultiPolygon<f64>, InvalidInput> {
    let subpaths = parse_subpaths(&intent.path)?;

    let rings: Vec<LineString<f64>> = subpaths
        .into_iter()
        .filter(|pts| pts.len() >= 3)
        .map(|pts| {
            // Flip the Y axis (SVG y grows downward, field y grows north/up)
            // and close the ring to its first point.
            let mut flipped: Vec<Coord<f64>> = pts.iter().map(|c| coord! {x: c.x, y: -c.y}).collect();
            if flipped.first() != flipped.last() {
                let first = flipped[0];
                flipped.push(first);
            }
            LineString::new(flipped)
        })
        .collect();

    if rings.is_empty() {
        return Err(InvalidInput::Unparseable("path contained no closable subpath with at least 3 points".into()));
    }

    let (outers, holes) = classify_rings_by_containment(rings);
    let outer_union = MultiPolygon::new(outers);
    let hole_union = MultiPolygon::new(holes);
    let combined = if hole_union.0.is_empty() {
        outer_union
    } else {
        ops::difference(&outer_union, &hole_union).map_err(|_| InvalidInput::UnrepairableGeometry)?
    };

    let rect = combined
        .bounding_rect()
        .ok_or_else(|| InvalidInput::Unparseable("svg path produced empty geometry".into()))?;
    let width = rect.max().x - rect.min().x;
    let height = rect.max().y - rect.min().y;
    let longer = width.max(height);
    let scale = if longer > 1e-9 { intent.size_m / longer } else { 1.0 };

    use geo::MapCoords;
    let scaled = combined.map_coords(|c| coord! {x: c.x * scale, y: c.y * scale});
    let centroid = scaled.centroid().ok_or_else(|| InvalidInput::Unparseable("svg path has no centroid".into()))?;
    let dx = intent.position.x - centroid.x();
    let dy = intent.position.y - centroid.y();
    Ok(scaled.translate(dx, dy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_square_path_parses_and_closes() {
        let intent = SvgPathIntent {
            path: "M 0 0 L 10 0 L 10 10 L 0 10 Z".to_string(),
            size_m: 5.0,
            position: coord! {x: 0.0, y: 0.0},
        };
        let geom = svg_path_eraser(&intent).unwrap();
        assert_eq!(geom.0.len(), 1);
        use geo::Area;
        assert!((geom.unsigned_area() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn relative_commands_are_supported() {
        let intent = SvgPathIntent {
            path: "m 0 0 l 10 0 l 0 10 l -10 0 z".to_string(),
            size_m: 5.0,
            position: coord! {x: 2.0, y: 3.0},
        };
        let geom = svg_path_eraser(&intent).unwrap();
        assert_eq!(geom.0.len(), 1);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let intent = SvgPathIntent { path: "M 0 0 K 10 10".to_string(), size_m: 5.0, position: coord! {x: 0.0, y: 0.0} };
        assert!(svg_path_eraser(&intent).is_err());
    }

    #[test]
    fn empty_path_is_an_error() {
        let intent = SvgPathIntent { path: "".to_string(), size_m: 5.0, position: coord! {x: 0.0, y: 0.0} };
        assert!(svg_path_eraser(&intent).is_err());
    }
}
