use crate::model::{self, Marker, OUTLINE_ID};
use eframe::egui;

use super::View;
use super::geometry::triangulate;
use super::interaction::{Gesture, PaletteItem};
use super::scene_graph::{SceneGraph, connect_handle};

const SELECTION: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
pub(super) const HANDLE_RADIUS: f32 = 6.0;

pub(super) fn palette_entry(ui: &mut egui::Ui, item: PaletteItem) {
    let text = egui::RichText::new(item.label());
    let text = match item {
        PaletteItem::Marker(kind) => text.color(kind.color().to_color32()),
        PaletteItem::Shape(_) => text.strong(),
    };
    egui::Frame::new()
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_gray(90)))
        .corner_radius(egui::CornerRadius::same(4))
        .inner_margin(6.0)
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(text);
        });
}

pub(super) fn draw_background(
    painter: &egui::Painter,
    rect: egui::Rect,
    view: &View,
    grid_spacing: f32,
) {
    let bg = painter.ctx().style().visuals.extreme_bg_color;
    painter.rect_filled(rect, 0.0, bg);
    let grid_color = egui::Color32::from_gray(60);
    let spacing_world = if grid_spacing > 0.0 { grid_spacing } else { 64.0 };
    let mut spacing_screen = spacing_world * view.zoom;
    while spacing_screen < 12.0 {
        spacing_screen *= 2.0;
    }
    let start = rect.min + view.pan_screen;
    let x0 = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
    let y0 = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
    let mut x = x0;
    while x < rect.max.x {
        painter.line_segment(
            [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
            egui::Stroke::new(1.0, grid_color),
        );
        x += spacing_screen;
    }
    let mut y = y0;
    while y < rect.max.y {
        painter.line_segment(
            [egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)],
            egui::Stroke::new(1.0, grid_color),
        );
        y += spacing_screen;
    }
}

/// Outline, edges, then markers, so markers always sit on top.
pub(super) fn draw_scene(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    graph: &SceneGraph,
    pixels_per_meter: f32,
) {
    let selection = graph.selection();
    if let Some(outline) = graph.outline() {
        draw_outline(painter, origin, view, outline, selection == Some(OUTLINE_ID));
        if let Some((w, h)) = graph.outline_size_m(pixels_per_meter) {
            let top_left = outline
                .points
                .iter()
                .fold(egui::pos2(f32::INFINITY, f32::INFINITY), |acc, p| {
                    egui::pos2(acc.x.min(p.x), acc.y.min(p.y))
                });
            painter.text(
                view.world_to_screen(origin, top_left) - egui::vec2(0.0, 6.0),
                egui::Align2::LEFT_BOTTOM,
                format!("{w:.1} m × {h:.1} m"),
                egui::FontId::proportional(13.0),
                painter.ctx().style().visuals.text_color(),
            );
        }
    }

    for edge in &graph.scene().edges {
        let (Some(a), Some(b)) = (graph.node_center(edge.source), graph.node_center(edge.target))
        else {
            continue;
        };
        draw_styled_line(
            painter,
            view.world_to_screen(origin, a.to_pos2()),
            view.world_to_screen(origin, b.to_pos2()),
            egui::Stroke::new(2.0, egui::Color32::from_rgb(100, 116, 139)),
            edge.style,
        );
    }

    for marker in &graph.scene().markers {
        draw_marker(painter, origin, view, marker, selection == Some(marker.id));
    }
}

fn draw_outline(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    outline: &model::BuildingOutline,
    selected: bool,
) {
    let pts: Vec<egui::Pos2> = outline
        .points
        .iter()
        .map(|p| view.world_to_screen(origin, p.to_pos2()))
        .collect();
    if pts.len() < 2 {
        return;
    }

    let mut mesh = egui::Mesh::default();
    let fill = outline.style.fill.to_color32();
    for p in &pts {
        mesh.colored_vertex(*p, fill);
    }
    for [a, b, c] in triangulate(&outline.points) {
        mesh.add_triangle(a as u32, b as u32, c as u32);
    }
    painter.add(egui::Shape::mesh(mesh));

    let stroke = egui::Stroke::new(
        outline.style.stroke_width * view.zoom.max(0.5),
        outline.style.stroke.to_color32(),
    );
    painter.add(egui::Shape::closed_line(pts.clone(), stroke));
    if selected {
        painter.add(egui::Shape::closed_line(pts.clone(), egui::Stroke::new(1.0, SELECTION)));
        for p in pts {
            let r = egui::Rect::from_center_size(p, egui::vec2(HANDLE_RADIUS, HANDLE_RADIUS) * 2.0);
            painter.rect_filled(r, 2.0, egui::Color32::WHITE);
            painter.rect_stroke(r, 2.0, egui::Stroke::new(1.5, SELECTION), egui::StrokeKind::Middle);
        }
    }
}

fn draw_marker(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    marker: &Marker,
    selected: bool,
) {
    let rect = marker.rect();
    let screen = egui::Rect::from_min_max(
        view.world_to_screen(origin, rect.min),
        view.world_to_screen(origin, rect.max),
    );
    let color = marker.kind.color().to_color32();
    painter.rect_filled(screen, 4.0, color.gamma_multiply(0.85));
    let stroke = if selected {
        egui::Stroke::new(2.0, SELECTION)
    } else {
        egui::Stroke::new(1.0, egui::Color32::from_rgb(30, 41, 59))
    };
    painter.rect_stroke(screen, 4.0, stroke, egui::StrokeKind::Middle);

    let font_size = (13.0 * view.zoom).clamp(8.0, 22.0);
    let text_color = egui::Color32::from_rgb(15, 23, 42);
    if screen.height() >= font_size * 2.4 {
        painter.text(
            screen.center() - egui::vec2(0.0, font_size * 0.6),
            egui::Align2::CENTER_CENTER,
            marker.kind.icon(),
            egui::FontId::proportional(font_size),
            text_color,
        );
        painter.text(
            screen.center() + egui::vec2(0.0, font_size * 0.6),
            egui::Align2::CENTER_CENTER,
            &marker.label,
            egui::FontId::proportional(font_size),
            text_color,
        );
    } else {
        painter.text(
            screen.center(),
            egui::Align2::CENTER_CENTER,
            format!("{} {}", marker.kind.icon(), marker.label),
            egui::FontId::proportional(font_size),
            text_color,
        );
    }

    let handle = view.world_to_screen(origin, connect_handle(marker).to_pos2());
    painter.circle_filled(handle, HANDLE_RADIUS * 0.7, egui::Color32::WHITE);
    painter.circle_stroke(handle, HANDLE_RADIUS * 0.7, egui::Stroke::new(1.5, SELECTION));
}

/// Rubber band for connections and marquee, ghost for palette drops.
pub(super) fn draw_gesture(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    graph: &SceneGraph,
    gesture: &Gesture,
) {
    match gesture {
        Gesture::Connect { source, current } => {
            let Some(marker) = graph.scene().marker(*source) else {
                return;
            };
            let a = view.world_to_screen(origin, connect_handle(marker).to_pos2());
            let b = view.world_to_screen(origin, current.to_pos2());
            draw_dashed_line(painter, a, b, egui::Stroke::new(2.0, SELECTION), 8.0, 4.0);
            painter.circle_filled(b, 3.0, SELECTION);
        }
        Gesture::Marquee { start, current } => {
            let r = egui::Rect::from_two_pos(
                view.world_to_screen(origin, start.to_pos2()),
                view.world_to_screen(origin, current.to_pos2()),
            );
            painter.rect_filled(r, 0.0, SELECTION.gamma_multiply(0.12));
            painter.rect_stroke(r, 0.0, egui::Stroke::new(1.0, SELECTION), egui::StrokeKind::Middle);
        }
        Gesture::PaletteDrag {
            payload,
            hover: Some(at),
        } => {
            let Some(PaletteItem::Marker(kind)) = PaletteItem::from_payload(payload) else {
                return;
            };
            let size = kind.default_size();
            let min = view.world_to_screen(origin, at.to_pos2());
            let r = egui::Rect::from_min_size(min, egui::vec2(size.width, size.height) * view.zoom);
            painter.rect_stroke(
                r,
                4.0,
                egui::Stroke::new(1.5, kind.color().to_color32()),
                egui::StrokeKind::Middle,
            );
        }
        _ => {}
    }
}

fn draw_styled_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    line_style: model::LineStyle,
) {
    match line_style {
        model::LineStyle::Solid => {
            painter.line_segment([a, b], stroke);
        }
        model::LineStyle::Dashed => {
            draw_dashed_line(painter, a, b, stroke, 10.0, 5.0);
        }
        model::LineStyle::Dotted => {
            draw_dashed_line(painter, a, b, stroke, 2.0, 4.0);
        }
    }
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let seg_len = if drawing { dash_len } else { gap_len };
        let next_pos = (pos + seg_len).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next_pos], stroke);
        }
        pos = next_pos;
        drawing = !drawing;
    }
}
