use crate::model::MarkerKind;
use eframe::egui;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::FloorPlanApp;
use super::interaction::PaletteItem;
use super::shapes::ShapeTemplate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CommandId {
    Insert(PaletteItem),
    Save,
    Load,
    ExportSvg,
    ExportSvgAs,
    ToggleSnap,
    Delete,
    ResetScene,
    Help,
}

pub(super) struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub search: &'static str,
}

const fn shape(t: ShapeTemplate) -> CommandId {
    CommandId::Insert(PaletteItem::Shape(t))
}

const fn marker(k: MarkerKind) -> CommandId {
    CommandId::Insert(PaletteItem::Marker(k))
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { id: shape(ShapeTemplate::Rectangle), name: "Outline: Rectangle", search: "outline building rectangle chu nhat" },
    CommandSpec { id: shape(ShapeTemplate::L), name: "Outline: L shape", search: "outline building l shape chu l" },
    CommandSpec { id: shape(ShapeTemplate::U), name: "Outline: U shape", search: "outline building u shape chu u" },
    CommandSpec { id: shape(ShapeTemplate::T), name: "Outline: T shape", search: "outline building t shape chu t" },
    CommandSpec { id: marker(MarkerKind::Room), name: "Marker: Room", search: "marker room phong" },
    CommandSpec { id: marker(MarkerKind::Corridor), name: "Marker: Corridor", search: "marker corridor hallway hanh lang" },
    CommandSpec { id: marker(MarkerKind::Door), name: "Marker: Door", search: "marker door cua" },
    CommandSpec { id: marker(MarkerKind::Stairs), name: "Marker: Stairs", search: "marker stairs staircase cau thang" },
    CommandSpec { id: marker(MarkerKind::Elevator), name: "Marker: Elevator", search: "marker elevator lift thang may" },
    CommandSpec { id: marker(MarkerKind::Exit), name: "Marker: Exit", search: "marker exit emergency loi thoat" },
    CommandSpec { id: marker(MarkerKind::Extinguisher), name: "Marker: Extinguisher", search: "marker fire extinguisher binh chua chay" },
    CommandSpec { id: marker(MarkerKind::Clinic), name: "Marker: Clinic", search: "marker clinic medical phong y te" },
    CommandSpec { id: CommandId::Save, name: "Layout: Save", search: "save layout store" },
    CommandSpec { id: CommandId::Load, name: "Layout: Load", search: "load open layout restore" },
    CommandSpec { id: CommandId::ExportSvg, name: "File: Export SVG", search: "export svg save file" },
    CommandSpec { id: CommandId::ExportSvgAs, name: "File: Export SVG as...", search: "export svg dialog save as" },
    CommandSpec { id: CommandId::ToggleSnap, name: "Grid: Toggle snap", search: "grid snap toggle" },
    CommandSpec { id: CommandId::Delete, name: "Edit: Delete selection", search: "delete remove selection" },
    CommandSpec { id: CommandId::ResetScene, name: "Edit: Clear floor", search: "reset clear floor empty" },
    CommandSpec { id: CommandId::Help, name: "Help: Shortcuts", search: "help shortcuts keys" },
];

#[derive(Default)]
pub(super) struct CommandPalette {
    pub open: bool,
    pub query: String,
    pub selected: usize,
    request_focus: bool,
}

#[derive(Clone, Copy)]
pub(super) struct CommandContext {
    pub has_selection: bool,
    pub has_scene: bool,
}

impl CommandPalette {
    pub fn open(&mut self, query: impl Into<String>) {
        self.open = true;
        self.query = query.into();
        self.selected = 0;
        self.request_focus = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
        self.request_focus = false;
    }

    fn is_enabled(cx: CommandContext, id: CommandId) -> bool {
        match id {
            CommandId::Delete => cx.has_selection,
            CommandId::ResetScene => cx.has_scene,
            _ => true,
        }
    }

    pub(super) fn execute(app: &mut FloorPlanApp, ctx: &egui::Context, id: CommandId) {
        match id {
            CommandId::Insert(item) => app.insert_palette_item(item),
            CommandId::Save => app.save_layout(),
            CommandId::Load => app.load_layout(),
            CommandId::ExportSvg => app.export_svg_to_path(),
            CommandId::ExportSvgAs => app.export_svg_dialog(),
            CommandId::ToggleSnap => app.toggle_snap(),
            CommandId::Delete => app.delete_selected(),
            CommandId::ResetScene => app.reset_scene(),
            CommandId::Help => app.show_help = true,
        }
        ctx.request_repaint();
    }

    fn filtered(&self) -> Vec<(&'static CommandSpec, i64)> {
        let matcher = SkimMatcherV2::default();
        let q = self.query.trim();
        if q.is_empty() {
            return COMMANDS.iter().map(|c| (c, 0)).collect();
        }
        let mut out = Vec::new();
        for c in COMMANDS {
            if let Some(score) = matcher.fuzzy_match(c.search, q) {
                out.push((c, score));
            }
        }
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(b.0.name)));
        out
    }

    pub fn ui(&mut self, ctx: &egui::Context, cx: CommandContext) -> Option<CommandId> {
        if !self.open {
            return None;
        }
        let matches = self.filtered();
        if self.selected >= matches.len() {
            self.selected = matches.len().saturating_sub(1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.close();
            return None;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowDown)) && !matches.is_empty() {
            self.selected = (self.selected + 1).min(matches.len() - 1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowUp)) && !matches.is_empty() {
            self.selected = self.selected.saturating_sub(1);
        }
        let mut run_selected = ctx.input(|i| i.key_pressed(egui::Key::Enter));

        let screen = ctx.content_rect();
        let width = 480.0;
        let height = 300.0;
        let pos = egui::pos2(screen.center().x - width * 0.5, screen.top() + 48.0);
        egui::Area::new(egui::Id::new("command_palette"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 240))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255)))
                    .inner_margin(10.0)
                    .corner_radius(egui::CornerRadius::same(8));
                frame.show(ui, |ui| {
                    ui.set_min_size(egui::vec2(width, height));
                    let resp = ui.add(
                        egui::TextEdit::singleline(&mut self.query)
                            .desired_width(f32::INFINITY)
                            .hint_text("Search commands"),
                    );
                    if self.request_focus {
                        resp.request_focus();
                        self.request_focus = false;
                    }
                    ui.separator();
                    egui::ScrollArea::vertical().max_height(height - 64.0).show(ui, |ui| {
                        for (idx, (spec, _score)) in matches.iter().enumerate() {
                            let enabled = CommandPalette::is_enabled(cx, spec.id);
                            let selected = idx == self.selected;
                            let resp = ui.add_enabled(
                                enabled,
                                egui::Button::new(spec.name).selected(selected),
                            );
                            if resp.clicked() {
                                self.selected = idx;
                                run_selected = true;
                            }
                        }
                    });
                });
            });

        if run_selected {
            if let Some((spec, _)) = matches.get(self.selected) {
                if CommandPalette::is_enabled(cx, spec.id) {
                    let cmd = spec.id;
                    self.close();
                    return Some(cmd);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_palette_item_has_a_command() {
        for item in PaletteItem::all() {
            assert!(COMMANDS.iter().any(|c| c.id == CommandId::Insert(item)));
        }
    }

    #[test]
    fn vietnamese_search_terms_match() {
        let mut palette = CommandPalette::default();
        palette.open("thang may");
        let top = palette.filtered()[0].0;
        assert_eq!(top.id, marker(MarkerKind::Elevator));
    }

    #[test]
    fn delete_needs_a_selection() {
        let cx = CommandContext {
            has_selection: false,
            has_scene: true,
        };
        assert!(!CommandPalette::is_enabled(cx, CommandId::Delete));
        assert!(CommandPalette::is_enabled(cx, CommandId::Save));
    }
}
