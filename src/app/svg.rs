use crate::model;
use eframe::egui;

use super::geometry::{bounding_box, to_path_string};
use super::scene_graph::SceneGraph;

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn rgba_to_svg_rgb(rgba: model::Rgba) -> (String, f32) {
    let opacity = (rgba.a as f32) / 255.0;
    (format!("rgb({},{},{})", rgba.r, rgba.g, rgba.b), opacity)
}

fn dasharray(line_style: model::LineStyle, stroke_width: f32) -> Option<String> {
    match line_style {
        model::LineStyle::Solid => None,
        model::LineStyle::Dashed => Some(format!("{} {}", stroke_width * 4.0, stroke_width * 2.5)),
        model::LineStyle::Dotted => Some(format!("{} {}", stroke_width * 0.5, stroke_width * 2.0)),
    }
}

fn scene_bounds(scene: &model::Scene) -> egui::Rect {
    let mut bounds: Option<egui::Rect> = scene.outline.as_ref().map(|o| {
        let bb = bounding_box(&o.points);
        egui::Rect::from_min_size(egui::pos2(bb.min_x, bb.min_y), egui::vec2(bb.width, bb.height))
    });
    for m in &scene.markers {
        let r = m.rect();
        bounds = Some(bounds.map(|b| b.union(r)).unwrap_or(r));
    }
    bounds.unwrap_or_else(|| egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0)))
}

/// Renders the floor plan as a standalone SVG document in world pixels.
pub(super) fn scene_to_svg(graph: &SceneGraph, pixels_per_meter: f32) -> String {
    let scene = graph.scene();
    let bounds = scene_bounds(scene);
    let padding = 24.0;
    let min_x = bounds.min.x - padding;
    let min_y = bounds.min.y - padding;
    let width = bounds.width() + padding * 2.0;
    let height = bounds.height() + padding * 2.0;

    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.3} {:.3} {:.3} {:.3}" width="{:.3}" height="{:.3}">"#,
        min_x, min_y, width, height, width, height
    ));
    out.push('\n');
    if let (Some((w, h)), Some(area)) = (
        graph.outline_size_m(pixels_per_meter),
        graph.outline_area_m2(pixels_per_meter),
    ) {
        out.push_str(&format!(
            "<desc>{:.2} m x {:.2} m, {:.2} m2, 1 m = {} px</desc>\n",
            w, h, area, pixels_per_meter
        ));
    }

    if let Some(outline) = &scene.outline {
        let (stroke_rgb, stroke_opacity) = rgba_to_svg_rgb(outline.style.stroke);
        let (fill_rgb, fill_opacity) = rgba_to_svg_rgb(outline.style.fill);
        out.push_str(&format!(
            r#"<path d="{}" stroke="{}" stroke-opacity="{:.3}" stroke-width="{:.3}" fill="{}" fill-opacity="{:.3}" />"#,
            to_path_string(&outline.points),
            stroke_rgb,
            stroke_opacity,
            outline.style.stroke_width,
            fill_rgb,
            fill_opacity
        ));
        out.push('\n');
    }

    for edge in &scene.edges {
        // Edges to nodes that no longer exist are left out.
        let (Some(a), Some(b)) = (graph.node_center(edge.source), graph.node_center(edge.target))
        else {
            continue;
        };
        let stroke_width = 2.0;
        let dash = dasharray(edge.style, stroke_width)
            .map(|d| format!(r#" stroke-dasharray="{d}""#))
            .unwrap_or_default();
        out.push_str(&format!(
            r#"<line x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" stroke="rgb(100,116,139)" stroke-width="{:.3}"{} />"#,
            a.x, a.y, b.x, b.y, stroke_width, dash
        ));
        out.push('\n');
    }

    for marker in &scene.markers {
        let (rgb, opacity) = rgba_to_svg_rgb(marker.kind.color());
        out.push_str(&format!(
            r#"<g data-kind="{}"><rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" rx="4" fill="{}" fill-opacity="{:.3}" stroke="rgb(30,41,59)" stroke-width="1" />"#,
            marker.kind.token(),
            marker.position.x,
            marker.position.y,
            marker.size.width,
            marker.size.height,
            rgb,
            opacity
        ));
        let c = marker.center();
        out.push_str(&format!(
            r#"<text x="{:.3}" y="{:.3}" font-family="sans-serif" font-size="13" text-anchor="middle" dominant-baseline="middle" fill="rgb(15,23,42)">{}</text></g>"#,
            c.x,
            c.y,
            escape_xml(&marker.label)
        ));
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::shapes::ShapeTemplate;
    use crate::model::{MarkerKind, Point};

    #[test]
    fn empty_scene_is_a_valid_document() {
        let svg = scene_to_svg(&SceneGraph::new(40.0), 80.0);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("<path"));
        assert!(!svg.contains("<desc>"));
    }

    #[test]
    fn outline_is_written_as_closed_path() {
        let mut g = SceneGraph::new(40.0);
        g.set_outline(ShapeTemplate::Rectangle.points(Point::default(), 1440.0, 800.0));
        let svg = scene_to_svg(&g, 80.0);
        assert!(svg.contains(r#"d="M0,0 L1440,0 L1440,800 L0,800 Z""#));
        assert!(svg.contains("<desc>18.00 m x 10.00 m, 180.00 m2"));
    }

    #[test]
    fn labels_are_escaped_and_edges_drawn() {
        let mut g = SceneGraph::new(40.0);
        let a = g.add_marker(MarkerKind::Room, Point::new(0.0, 0.0));
        let b = g.add_marker(MarkerKind::Exit, Point::new(400.0, 0.0));
        g.update_marker_label(a, "Kho <A&B>");
        g.connect(a, b);
        let svg = scene_to_svg(&g, 80.0);
        assert!(svg.contains("Kho &lt;A&amp;B&gt;"));
        assert!(svg.contains(r#"data-kind="exit""#));
        assert_eq!(svg.matches("<line").count(), 1);
    }
}
