//! Maps an engine result back onto the entity model.
//!
//! The textual path scans the engine's vector-markup output: each node is
//! located by its echoed title marker, clusters and connectors by the color
//! they were assigned at build time. The native path reads the same facts
//! from the typed result object.
//!
//! Engines report geometry top-left-origin with Y growing downward; the
//! diagram convention is the complement. Every extracted point gets
//! `y = canvas_height - y` before it is stored. For shapes reduced to a
//! bounding corner, the correction is applied to the raw min corner, not to
//! each raw point.
//!
//! Extraction is transactional: geometry for every entity is staged first
//! and committed only when the whole result parsed. A failed render leaves
//! the model's layout fields exactly as they were.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use trellis_core::{
    entity::{ClusterGeometry, ExtractionRule, NodePlacement},
    geometry::{Point, max_corner, min_corner},
    identifier::Id,
    registry::{Bibliotekon, ClusterHandle},
};

use crate::{error::ResultError, native::NativeLayout};

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r#"<svg\s+width="(\d+)pt"\s+height="(\d+)pt""#).expect("header pattern")
    })
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern"))
}

/// The vertical-axis correction for one result document.
#[derive(Debug, Clone, Copy)]
struct YDelta {
    height: f32,
}

impl YDelta {
    fn apply(self, p: Point) -> Point {
        Point::new(p.x(), self.height - p.y())
    }
}

/// Geometry staged during parsing, committed only on full success.
#[derive(Default)]
struct Solved {
    nodes: Vec<(Id, NodePlacement)>,
    clusters: Vec<(ClusterHandle, ClusterGeometry, Option<Point>)>,
    lines: Vec<(usize, Vec<Point>)>,
}

impl Solved {
    fn commit(self, bib: &mut Bibliotekon) {
        for (uid, placement) in self.nodes {
            if let Some(node) = bib.node_mut(uid) {
                node.set_placement(placement);
            }
        }
        for (handle, geometry, title) in self.clusters {
            let cluster = bib.cluster_mut(handle);
            cluster.set_geometry(geometry);
            if let Some(anchor) = title {
                cluster.set_title_anchor(anchor);
            }
        }
        for (index, path) in self.lines {
            if let Some(line) = bib.line_mut(index) {
                line.set_path(path);
            }
        }
    }
}

/// Writes one engine result back onto the registry's entities.
pub(crate) struct LayoutResultMapper<'a> {
    bib: &'a mut Bibliotekon,
}

impl<'a> LayoutResultMapper<'a> {
    pub(crate) fn new(bib: &'a mut Bibliotekon) -> Self {
        Self { bib }
    }

    /// Applies a textual vector-markup result.
    pub(crate) fn apply_svg(&mut self, svg: &str) -> Result<(), ResultError> {
        if svg.is_empty() {
            return Err(ResultError::EmptyResult);
        }
        let header = header_regex()
            .captures(svg)
            .ok_or(ResultError::MalformedHeader)?;
        let height: f32 = header[2].parse().map_err(|_| ResultError::MalformedHeader)?;
        let delta = YDelta { height };
        debug!(canvas_height = height; "Solving layout result");

        let mut solved = Solved::default();

        for node in self.bib.nodes() {
            let uid = node.uid();
            let marker = format!("<title>{uid}</title>");
            let idx = svg.find(&marker).ok_or_else(|| ResultError::MissingGeometry {
                id: uid.to_string(),
            })?;
            let after = &svg[idx..];
            let mismatch = || ResultError::ShapeMismatch {
                id: uid.to_string(),
                shape: node.shape().dot_shape().to_owned(),
            };
            let placement = match node.shape().extraction() {
                ExtractionRule::PolygonMin => {
                    let points = points_after(after).ok_or_else(mismatch)?;
                    let min = min_corner(&points).ok_or_else(mismatch)?;
                    NodePlacement::at(delta.apply(min))
                }
                ExtractionRule::RoundedDual => {
                    let points = rounded_points(after).ok_or_else(mismatch)?;
                    let min = min_corner(&points).ok_or_else(mismatch)?;
                    NodePlacement::at(delta.apply(min))
                }
                ExtractionRule::PolygonOutline => {
                    let points = points_after(after).ok_or_else(mismatch)?;
                    let min = min_corner(&points).ok_or_else(mismatch)?;
                    let outline = points.iter().map(|p| delta.apply(*p)).collect();
                    NodePlacement::with_polygon(delta.apply(min), outline)
                }
                ExtractionRule::Ellipse => {
                    let cx = attr_value(after, "cx").ok_or_else(mismatch)?;
                    let cy = attr_value(after, "cy").ok_or_else(mismatch)?;
                    let rx = attr_value(after, "rx").ok_or_else(mismatch)?;
                    let ry = attr_value(after, "ry").ok_or_else(mismatch)?;
                    NodePlacement::at(delta.apply(Point::new(cx - rx, cy - ry)))
                }
            };
            solved.nodes.push((uid, placement));
        }

        for (handle, cluster) in self.bib.clusters() {
            if cluster.is_packed() {
                continue;
            }
            let idx = color_index(svg, &cluster.color().hex()).ok_or_else(|| {
                ResultError::MissingGeometry {
                    id: cluster.block_id(),
                }
            })?;
            let points = points_after(&svg[idx..]).ok_or_else(|| ResultError::MissingGeometry {
                id: cluster.block_id(),
            })?;
            let min = min_corner(&points);
            let max = max_corner(&points);
            let geometry = match (min, max) {
                (Some(min), Some(max)) => {
                    ClusterGeometry::new(delta.apply(min), delta.apply(max))
                }
                _ => {
                    return Err(ResultError::MissingGeometry {
                        id: cluster.block_id(),
                    });
                }
            };

            let title = match cluster.label() {
                Some(size) if !size.is_degenerate() => {
                    let idx = color_index(svg, &cluster.title_color().hex()).ok_or_else(|| {
                        ResultError::MissingGeometry {
                            id: cluster.block_id(),
                        }
                    })?;
                    let points =
                        points_after(&svg[idx..]).ok_or_else(|| ResultError::MissingGeometry {
                            id: cluster.block_id(),
                        })?;
                    min_corner(&points).map(|p| delta.apply(p))
                }
                _ => None,
            };
            solved.clusters.push((handle, geometry, title));
        }

        for (index, line) in self.bib.lines().enumerate() {
            let hex = line.color().hex();
            let idx = svg
                .find(&format!("stroke:{hex};"))
                .ok_or_else(|| ResultError::MissingGeometry { id: hex.clone() })?;
            let path = path_after(&svg[idx..])
                .ok_or_else(|| ResultError::MissingGeometry { id: hex.clone() })?;
            let corrected = path.iter().map(|p| delta.apply(*p)).collect();
            solved.lines.push((index, corrected));
        }

        solved.commit(self.bib);
        Ok(())
    }

    /// Applies a typed native result.
    ///
    /// Identical semantics to the textual path, with one extra shift: native
    /// coordinates are first made canvas-relative by subtracting the
    /// result's origin.
    pub(crate) fn apply_native(&mut self, layout: &NativeLayout) -> Result<(), ResultError> {
        if layout.is_empty() {
            return Err(ResultError::EmptyResult);
        }
        let delta = YDelta {
            height: layout.height(),
        };
        let (min_x, min_y) = layout.origin();
        let shift = |x: f32, y: f32| Point::new(x - min_x, y - min_y);

        let mut solved = Solved::default();

        for node in self.bib.nodes() {
            let uid = node.uid();
            let (left, top) =
                layout
                    .node(&uid.to_string())
                    .ok_or_else(|| ResultError::MissingGeometry {
                        id: uid.to_string(),
                    })?;
            let placement = NodePlacement::at(delta.apply(shift(left, top)));
            solved.nodes.push((uid, placement));
        }

        for (handle, cluster) in self.bib.clusters() {
            if cluster.is_packed() {
                continue;
            }
            let geometry = layout.cluster(&cluster.block_id()).ok_or_else(|| {
                ResultError::MissingGeometry {
                    id: cluster.block_id(),
                }
            })?;
            let min = delta.apply(shift(geometry.left(), geometry.top()));
            let max = delta.apply(shift(geometry.right(), geometry.bottom()));
            let title = geometry
                .label_center()
                .map(|(x, y)| delta.apply(shift(x, y)));
            solved
                .clusters
                .push((handle, ClusterGeometry::new(min, max), title));
        }

        for (index, line) in self.bib.lines().enumerate() {
            let hex = line.color().hex();
            let points = layout
                .line(&hex)
                .ok_or_else(|| ResultError::MissingGeometry { id: hex.clone() })?;
            let corrected = points
                .iter()
                .map(|(x, y)| delta.apply(shift(*x, *y)))
                .collect();
            solved.lines.push((index, corrected));
        }

        solved.commit(self.bib);
        Ok(())
    }
}

/// Parses the next `points="x,y x,y …"` run after the marker.
fn points_after(fragment: &str) -> Option<Vec<Point>> {
    let start = fragment.find("points=\"")? + "points=\"".len();
    let rest = &fragment[start..];
    let end = rest.find('"')?;
    parse_point_list(&rest[..end])
}

/// Parses the next `d="…"` path block after the marker.
fn path_after(fragment: &str) -> Option<Vec<Point>> {
    let start = fragment.find("d=\"")? + "d=\"".len();
    let rest = &fragment[start..];
    let end = rest.find('"')?;
    parse_point_list(&rest[..end])
}

/// Outline of a rounded rectangle: a single path block on engines that emit
/// one, or up to four successive polygon runs merged on older ones.
fn rounded_points(fragment: &str) -> Option<Vec<Point>> {
    let d_idx = fragment.find("d=\"");
    let p_idx = fragment.find("points=\"");
    match (d_idx, p_idx) {
        (Some(d), p) if p.is_none_or(|p| d < p) => path_after(fragment),
        (_, Some(mut p)) => {
            let mut points = points_after(&fragment[p..])?;
            for _ in 0..3 {
                match fragment[p + 1..].find("points=\"") {
                    Some(next) => {
                        p += 1 + next;
                        points.extend(points_after(&fragment[p..])?);
                    }
                    None => break,
                }
            }
            Some(points)
        }
        _ => None,
    }
}

/// Pairs every two numbers of a coordinate list into points.
fn parse_point_list(data: &str) -> Option<Vec<Point>> {
    let numbers: Vec<f32> = number_regex()
        .find_iter(data)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if numbers.len() < 2 {
        return None;
    }
    Some(
        numbers
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect(),
    )
}

/// Locates a color-keyed geometry block: attribute form first, stroke style
/// form as fallback.
fn color_index(svg: &str, hex: &str) -> Option<usize> {
    svg.find(&format!("=\"{hex}\""))
        .or_else(|| svg.find(&format!("stroke:{hex};")))
}

/// Reads a numeric attribute after the marker, e.g. `cx="100"`.
fn attr_value(fragment: &str, name: &str) -> Option<f32> {
    let key = format!("{name}=\"");
    let start = fragment.find(&key)? + key.len();
    let rest = &fragment[start..];
    let end = rest.find('"')?;
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use trellis_core::{
        entity::{EntityPosition, LineEnd, ShapeKind, SymbolKind},
        geometry::Size,
    };

    use super::*;

    const HEADER: &str = "<svg width=\"400pt\" height=\"600pt\">\n";

    fn node(bib: &mut Bibliotekon, uid: &str, shape: ShapeKind) -> Id {
        bib.add_node(uid, shape, EntityPosition::Normal, Size::new(10.0, 10.0))
            .unwrap()
    }

    #[test]
    fn test_empty_result() {
        let mut bib = Bibliotekon::new();
        let err = LayoutResultMapper::new(&mut bib).apply_svg("");
        assert_eq!(err.unwrap_err(), ResultError::EmptyResult);
    }

    #[test]
    fn test_malformed_header() {
        let mut bib = Bibliotekon::new();
        let err = LayoutResultMapper::new(&mut bib).apply_svg("<svg height=\"600\">");
        assert_eq!(err.unwrap_err(), ResultError::MalformedHeader);
    }

    #[test]
    fn test_missing_node_marker() {
        let mut bib = Bibliotekon::new();
        node(&mut bib, "lonely", ShapeKind::Rectangle);
        let err = LayoutResultMapper::new(&mut bib).apply_svg(HEADER);
        assert_eq!(
            err.unwrap_err(),
            ResultError::MissingGeometry {
                id: "lonely".into()
            }
        );
    }

    #[test]
    fn test_mismatched_shape_markup() {
        let mut bib = Bibliotekon::new();
        node(&mut bib, "r", ShapeKind::Rectangle);
        // Marker present but no polygon corner list follows.
        let svg = format!("{HEADER}<title>r</title><circle cx=\"5\" cy=\"5\" r=\"3\"/>");
        let err = LayoutResultMapper::new(&mut bib).apply_svg(&svg);
        assert_eq!(
            err.unwrap_err(),
            ResultError::ShapeMismatch {
                id: "r".into(),
                shape: "rect".into()
            }
        );
    }

    #[test]
    fn test_circle_min_corner_from_center_and_radii() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "c", ShapeKind::Circle);
        let svg = format!(
            "{HEADER}<title>c</title><ellipse cx=\"100\" cy=\"50\" rx=\"10\" ry=\"10\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        let min = bib.node(uid).unwrap().placement().unwrap().min();
        assert_approx_eq!(f32, min.x(), 90.0);
        assert_approx_eq!(f32, min.y(), 560.0);
    }

    #[test]
    fn test_rectangle_min_corner() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "r", ShapeKind::Rectangle);
        let svg = format!(
            "{HEADER}<title>r</title><polygon points=\"10,40 50,40 50,20 10,20\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        // Raw min corner (10, 20), then the vertical flip.
        let min = bib.node(uid).unwrap().placement().unwrap().min();
        assert_approx_eq!(f32, min.x(), 10.0);
        assert_approx_eq!(f32, min.y(), 580.0);
    }

    #[test]
    fn test_rounded_rectangle_path_variant() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "rr", ShapeKind::RoundedRectangle);
        let svg = format!(
            "{HEADER}<title>rr</title><path d=\"M20,30C20,25 25,20 30,20L70,20C75,20 80,25 80,30\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        let min = bib.node(uid).unwrap().placement().unwrap().min();
        assert_approx_eq!(f32, min.x(), 20.0);
        assert_approx_eq!(f32, min.y(), 580.0);
    }

    #[test]
    fn test_rounded_rectangle_merged_polygon_variant() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "rr", ShapeKind::RoundedRectangle);
        let svg = format!(
            "{HEADER}<title>rr</title>\
             <polygon points=\"30,40 70,40\"/>\
             <polygon points=\"20,30 20,35\"/>\
             <polygon points=\"80,30 80,35\"/>\
             <polygon points=\"30,20 70,20\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        // All four runs merged before taking the min corner.
        let min = bib.node(uid).unwrap().placement().unwrap().min();
        assert_approx_eq!(f32, min.x(), 20.0);
        assert_approx_eq!(f32, min.y(), 580.0);
    }

    #[test]
    fn test_octagon_retains_corrected_outline() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "oct", ShapeKind::Octagon);
        let svg = format!("{HEADER}<title>oct</title><polygon points=\"10,30 20,10 30,30\"/>");
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        let placement = bib.node(uid).unwrap().placement().unwrap();
        assert_eq!(placement.min(), Point::new(10.0, 590.0));
        let outline = placement.polygon().unwrap();
        assert_eq!(
            outline,
            [
                Point::new(10.0, 570.0),
                Point::new(20.0, 590.0),
                Point::new(30.0, 570.0),
            ]
        );
    }

    #[test]
    fn test_cluster_geometry_and_title() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(Some(Size::new(40.0, 18.0)), SymbolKind::Package, false);
        bib.close_cluster().unwrap();
        let body_hex = bib.cluster(group).color().hex();
        let title_hex = bib.cluster(group).title_color().hex();

        let svg = format!(
            "{HEADER}<polygon fill=\"{body_hex}\" points=\"10,100 90,100 90,20 10,20\"/>\
             <polygon fill=\"{title_hex}\" points=\"12,35 52,35 52,22 12,22\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        let geometry = bib.cluster(group).geometry().unwrap();
        assert_eq!(geometry.min(), Point::new(10.0, 580.0));
        assert_eq!(geometry.max(), Point::new(90.0, 500.0));
        assert_eq!(bib.cluster(group).title_anchor(), Some(Point::new(12.0, 578.0)));
    }

    #[test]
    fn test_degenerate_title_is_skipped() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(Some(Size::new(0.0, 18.0)), SymbolKind::Package, false);
        bib.close_cluster().unwrap();
        let body_hex = bib.cluster(group).color().hex();

        // No title geometry in the document; must not be demanded either.
        let svg = format!(
            "{HEADER}<polygon fill=\"{body_hex}\" points=\"10,100 90,100 90,20 10,20\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();
        assert!(bib.cluster(group).geometry().is_some());
        assert!(bib.cluster(group).title_anchor().is_none());
    }

    #[test]
    fn test_packed_cluster_is_skipped() {
        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(None, SymbolKind::Package, true);
        bib.close_cluster().unwrap();

        LayoutResultMapper::new(&mut bib).apply_svg(HEADER).unwrap();
        assert!(bib.cluster(group).geometry().is_none());
    }

    #[test]
    fn test_line_path_by_stroke_color() {
        let mut bib = Bibliotekon::new();
        let a = node(&mut bib, "a", ShapeKind::Rectangle);
        let b = node(&mut bib, "b", ShapeKind::Rectangle);
        let index = bib.add_line(LineEnd::Node(a), LineEnd::Node(b), None);
        let hex = bib.line(index).unwrap().color().hex();

        let svg = format!(
            "{HEADER}<title>a</title><polygon points=\"0,10 10,10 10,0 0,0\"/>\
             <title>b</title><polygon points=\"0,40 10,40 10,30 0,30\"/>\
             <path style=\"stroke:{hex};\" d=\"M5,10C5,20 5,25 5,30\"/>"
        );
        LayoutResultMapper::new(&mut bib).apply_svg(&svg).unwrap();

        let path = bib.line(index).unwrap().path().unwrap();
        assert_eq!(path[0], Point::new(5.0, 590.0));
        assert_eq!(path[path.len() - 1], Point::new(5.0, 570.0));
    }

    #[test]
    fn test_failure_applies_nothing() {
        let mut bib = Bibliotekon::new();
        let found = node(&mut bib, "found", ShapeKind::Rectangle);
        node(&mut bib, "absent", ShapeKind::Rectangle);

        let svg = format!("{HEADER}<title>found</title><polygon points=\"0,10 10,0\"/>");
        let err = LayoutResultMapper::new(&mut bib).apply_svg(&svg);
        assert!(matches!(err, Err(ResultError::MissingGeometry { .. })));
        // The first node parsed fine but nothing may be committed.
        assert!(bib.node(found).unwrap().placement().is_none());
    }

    #[test]
    fn test_native_result_shift_and_flip() {
        let mut bib = Bibliotekon::new();
        let uid = node(&mut bib, "n", ShapeKind::Rectangle);

        let mut layout = NativeLayout::new(200.0, 100.0).with_origin(10.0, 5.0);
        layout.insert_node("n", 30.0, 25.0);
        LayoutResultMapper::new(&mut bib).apply_native(&layout).unwrap();

        // (30-10, 25-5) shifted, then y flipped against height 100.
        let min = bib.node(uid).unwrap().placement().unwrap().min();
        assert_approx_eq!(f32, min.x(), 20.0);
        assert_approx_eq!(f32, min.y(), 80.0);
    }

    #[test]
    fn test_native_cluster_and_line() {
        use crate::native::NativeClusterGeometry;

        let mut bib = Bibliotekon::new();
        let group = bib.open_cluster(Some(Size::new(30.0, 12.0)), SymbolKind::Package, false);
        let a = node(&mut bib, "a", ShapeKind::Rectangle);
        bib.close_cluster().unwrap();
        let b = node(&mut bib, "b", ShapeKind::Rectangle);
        let index = bib.add_line(LineEnd::Node(a), LineEnd::Node(b), None);

        let mut layout = NativeLayout::new(200.0, 100.0);
        layout.insert_node("a", 10.0, 10.0);
        layout.insert_node("b", 10.0, 60.0);
        layout.insert_cluster(
            bib.cluster(group).block_id(),
            NativeClusterGeometry::new(5.0, 5.0, 60.0, 40.0).with_label_center(30.0, 12.0),
        );
        layout.insert_line(
            bib.line(index).unwrap().color().hex(),
            vec![(15.0, 30.0), (15.0, 60.0)],
        );
        LayoutResultMapper::new(&mut bib).apply_native(&layout).unwrap();

        let geometry = bib.cluster(group).geometry().unwrap();
        assert_eq!(geometry.min(), Point::new(5.0, 95.0));
        assert_eq!(geometry.max(), Point::new(60.0, 60.0));
        assert_eq!(bib.cluster(group).title_anchor(), Some(Point::new(30.0, 88.0)));
        assert_eq!(
            bib.line(index).unwrap().path().unwrap(),
            [Point::new(15.0, 70.0), Point::new(15.0, 40.0)]
        );
    }

    #[test]
    fn test_native_empty_result() {
        let mut bib = Bibliotekon::new();
        let err = LayoutResultMapper::new(&mut bib).apply_native(&NativeLayout::new(0.0, 0.0));
        assert_eq!(err.unwrap_err(), ResultError::EmptyResult);
    }
}
