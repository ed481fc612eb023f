use crate::model::{LineStyle, MarkerKind, OUTLINE_ID};
use eframe::egui;
use std::time::{Duration, Instant};

use super::FloorPlanApp;
use super::command_palette::{CommandContext, CommandPalette};
use super::interaction::{Gesture, PaletteItem};
use super::render::{HANDLE_RADIUS, draw_background, draw_gesture, draw_scene, palette_entry};
use super::scene_graph::DimensionField;

impl eframe::App for FloorPlanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let wants_keyboard = ctx.wants_keyboard_input();
        let editing_label = self.editor.label_edit().is_some();
        let mut save = false;
        let mut load = false;
        let mut export_dialog = false;
        let mut delete = false;
        let mut escape = false;
        ctx.input_mut(|i| {
            if !self.command_palette.open
                && !editing_label
                && i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::P)
            {
                self.command_palette.open("");
            }
            if i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S) {
                export_dialog = true;
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                save = true;
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                load = true;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                self.show_help = true;
            }
            let skip_shortcuts = wants_keyboard || editing_label || self.command_palette.open;
            if !skip_shortcuts {
                if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                    || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
                {
                    delete = true;
                }
                if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                    escape = true;
                }
            }
        });
        if save {
            self.save_layout();
        }
        if load {
            self.load_layout();
        }
        if export_dialog {
            self.export_svg_dialog();
        }
        if delete {
            self.delete_selected();
        }
        if escape {
            self.editor.cancel_gesture();
        }

        // Palette drags are owned by egui's drag-and-drop; mirror them.
        match egui::DragAndDrop::payload::<String>(ctx) {
            Some(payload) => self.editor.begin_palette_drag(&payload),
            None => self.editor.cancel_palette_drag(),
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Building");
                let b = ui.add(egui::TextEdit::singleline(&mut self.building_input).desired_width(64.0));
                ui.label("Floor");
                let f = ui.add(egui::TextEdit::singleline(&mut self.floor_input).desired_width(48.0));
                let submitted = (b.lost_focus() || f.lost_focus())
                    && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Open").clicked() || submitted {
                    self.apply_layout_key();
                }
                ui.separator();
                if ui.button("Save (⌘S)").clicked() {
                    self.save_layout();
                }
                if ui.button("Load (⌘O)").clicked() {
                    self.load_layout();
                }
                ui.separator();

                let config = *self.editor.config();
                let mut ppm = config.pixels_per_meter;
                ui.label("px/m");
                if ui
                    .add(egui::DragValue::new(&mut ppm).range(10.0..=400.0).speed(1.0))
                    .changed()
                {
                    self.set_pixels_per_meter(ppm);
                }
                let mut grid = config.grid_spacing;
                ui.label("Grid");
                if ui
                    .add(egui::DragValue::new(&mut grid).range(0.0..=200.0).speed(1.0))
                    .changed()
                {
                    self.set_grid_spacing(grid);
                }
                let mut snap = config.snap_to_grid;
                if ui.checkbox(&mut snap, "Snap").changed() {
                    self.toggle_snap();
                }
                ui.separator();
                if ui.button("Export SVG").clicked() {
                    self.export_svg_to_path();
                }
                if ui.button("Help (F1)").clicked() {
                    self.show_help = true;
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(status) = &self.status {
                    ui.label(status);
                } else {
                    ui.label("Ready");
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.view.zoom * 100.0));
                    ui.separator();
                    ui.label(format!("Markers: {}", self.editor.scene().markers.len()));
                    ui.separator();
                    ui.label(self.editor.key().to_string());
                });
            });
        });

        egui::SidePanel::left("palette")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Palette");
                    ui.small("Drag onto the canvas");
                    ui.separator();
                    ui.label("Building outline");
                    for item in PaletteItem::all() {
                        if item == PaletteItem::Marker(MarkerKind::ALL[0]) {
                            ui.add_space(6.0);
                            ui.label("Markers");
                        }
                        let id = egui::Id::new(("palette", item.payload()));
                        ui.dnd_drag_source(id, item.payload().to_string(), |ui| {
                            palette_entry(ui, item);
                        });
                    }

                    ui.separator();
                    ui.label("New outline size");
                    let config = *self.editor.config();
                    let mut w = config.building_width_m;
                    let mut h = config.building_height_m;
                    let mut changed = false;
                    ui.horizontal(|ui| {
                        ui.label("W:");
                        changed |= ui
                            .add(egui::DragValue::new(&mut w).range(1.0..=500.0).speed(0.5).suffix(" m"))
                            .changed();
                        ui.label("H:");
                        changed |= ui
                            .add(egui::DragValue::new(&mut h).range(1.0..=500.0).speed(0.5).suffix(" m"))
                            .changed();
                    });
                    if changed {
                        self.editor.set_building_size_m(w, h);
                        self.settings.default_building_width_m = w;
                        self.settings.default_building_height_m = h;
                        self.persist_settings();
                    }
                    let mut clamp = config.clamp_markers_to_outline;
                    if ui.checkbox(&mut clamp, "Keep markers inside").changed() {
                        self.editor.set_clamp_markers_to_outline(clamp);
                        self.settings.clamp_markers_to_outline = clamp;
                        self.persist_settings();
                    }
                    let mut delay_ms = self.settings.autosave_debounce_ms;
                    ui.horizontal(|ui| {
                        ui.label("Autosave after");
                        if ui
                            .add(egui::DragValue::new(&mut delay_ms).range(50..=10_000).speed(10.0).suffix(" ms"))
                            .changed()
                        {
                            self.editor.set_autosave_delay(Duration::from_millis(delay_ms));
                            self.settings.autosave_debounce_ms = delay_ms;
                            self.persist_settings();
                        }
                    });
                });
            });

        egui::SidePanel::right("inspector")
            .resizable(true)
            .min_width(220.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.inspector_ui(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (rect, response) =
                ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
            let origin = rect.min;
            self.canvas_center_world = self.view.screen_to_world(origin, rect.center());

            let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
            if scroll_delta.abs() > 0.0 {
                if let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos()) {
                    if rect.contains(hover_pos) {
                        let zoom_delta = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
                        self.view.zoom_about_screen_point(origin, hover_pos, zoom_delta);
                    }
                }
            }
            if response.dragged_by(egui::PointerButton::Middle) {
                self.view.pan_screen += response.drag_delta();
            }

            let pointer_pos = ctx.input(|i| i.pointer.interact_pos());
            let pointer_world = pointer_pos.map(|p| self.world_at(origin, p));
            let radius = self.screen_radius_to_world(HANDLE_RADIUS + 2.0);

            if let Some(payload) = response.dnd_release_payload::<String>() {
                if let Some(world) = pointer_world {
                    if self.editor.drop_payload(&payload, world) {
                        if let Some(item) = PaletteItem::from_payload(&payload) {
                            self.status = Some(format!("Added {}", item.label()));
                        }
                    }
                }
            } else if matches!(self.editor.gesture(), Some(Gesture::PaletteDrag { .. })) {
                if let Some(hover) = ctx.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p)) {
                    self.editor.pointer_moved(self.world_at(origin, hover));
                }
            }

            if response.drag_started_by(egui::PointerButton::Primary) {
                let pressed_at = ctx.input(|i| i.pointer.press_origin()).or(pointer_pos);
                if let Some(at) = pressed_at {
                    let world = self.world_at(origin, at);
                    self.editor.pointer_pressed(world, radius);
                }
            } else if response.clicked() {
                if let Some(world) = pointer_world {
                    self.editor.pointer_pressed(world, radius);
                    self.editor.pointer_released(world);
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                if let Some(world) = pointer_world {
                    self.editor.pointer_moved(world);
                }
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                match pointer_world {
                    Some(world) => {
                        self.editor.pointer_released(world);
                    }
                    None => self.editor.cancel_gesture(),
                }
            }
            if response.double_clicked() {
                if let Some(world) = pointer_world {
                    if let Some(id) = self.editor.graph().hit_marker(world) {
                        self.focus_label_edit = self.editor.begin_label_edit(id);
                    }
                }
            }

            let painter = ui.painter_at(rect);
            let ppm = self.editor.config().pixels_per_meter;
            draw_background(&painter, rect, &self.view, self.editor.config().grid_spacing);
            draw_scene(&painter, origin, &self.view, self.editor.graph(), ppm);
            if let Some(gesture) = self.editor.gesture() {
                draw_gesture(&painter, origin, &self.view, self.editor.graph(), gesture);
            }

            self.label_edit_ui(ctx, ui, origin);

            if let Some(world) = pointer_world.filter(|_| response.hovered()) {
                let graph = self.editor.graph();
                let icon = if graph.connect_handle_at(world, radius).is_some() {
                    egui::CursorIcon::Crosshair
                } else if graph.vertex_at(world, radius).is_some() {
                    egui::CursorIcon::Move
                } else if graph.hit_marker(world).is_some() {
                    egui::CursorIcon::Grab
                } else {
                    egui::CursorIcon::Default
                };
                ctx.set_cursor_icon(icon);
            }

            response.context_menu(|ui| {
                ui.add_enabled_ui(self.editor.selection().is_some(), |ui| {
                    if ui.button("Delete").clicked() {
                        self.delete_selected();
                        ui.close();
                    }
                });
                if let Some(id) = self.editor.selection().filter(|id| *id != OUTLINE_ID) {
                    if ui.button("Rename").clicked() {
                        self.focus_label_edit = self.editor.begin_label_edit(id);
                        ui.close();
                    }
                }
                ui.separator();
                if ui.button("Export SVG").clicked() {
                    self.export_svg_to_path();
                    ui.close();
                }
            });
        });

        let cx = CommandContext {
            has_selection: self.editor.selection().is_some(),
            has_scene: !self.editor.scene().is_empty(),
        };
        if let Some(cmd) = self.command_palette.ui(ctx, cx) {
            CommandPalette::execute(self, ctx, cmd);
        }

        super::help::draw_help_window(ctx, &mut self.show_help);

        let now = Instant::now();
        if self.editor.tick(now) {
            self.status = Some(format!("Autosaved {}", self.editor.key()));
        }
        self.drain_notice();
        if let Some(wait) = self.editor.time_until_autosave(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.flush_before_exit();
    }
}

impl FloorPlanApp {
    fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();
        let ppm = self.editor.config().pixels_per_meter;
        match self.editor.selection() {
            None => {
                ui.label("Nothing selected");
            }
            Some(OUTLINE_ID) => {
                ui.label("Building outline");
                if let Some((w, h)) = self.editor.graph().outline_size_m(ppm) {
                    let (mut w, mut h) = (w, h);
                    ui.horizontal(|ui| {
                        ui.label("W:");
                        if ui
                            .add(egui::DragValue::new(&mut w).range(0.5..=500.0).speed(0.1).suffix(" m"))
                            .changed()
                        {
                            self.editor.resize_node(OUTLINE_ID, DimensionField::Width, w);
                        }
                        ui.label("H:");
                        if ui
                            .add(egui::DragValue::new(&mut h).range(0.5..=500.0).speed(0.1).suffix(" m"))
                            .changed()
                        {
                            self.editor.resize_node(OUTLINE_ID, DimensionField::Height, h);
                        }
                    });
                }
                if let Some(area) = self.editor.graph().outline_area_m2(ppm) {
                    ui.label(format!("Area: {area:.1} m²"));
                }
                let corners = self.editor.graph().outline().map_or(0, |o| o.points.len());
                ui.label(format!("Corners: {corners}"));
            }
            Some(id) => {
                let Some(marker) = self.editor.scene().marker(id).cloned() else {
                    return;
                };
                ui.label(format!("{} {}", marker.kind.icon(), marker.kind.default_label()));
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&marker.label).strong());
                    if ui.small_button("Rename").clicked() {
                        self.focus_label_edit = self.editor.begin_label_edit(id);
                    }
                });
                if let Some(size) = self.editor.graph().marker_size_m(id, ppm) {
                    let (mut w, mut h) = (size.width, size.height);
                    ui.horizontal(|ui| {
                        ui.label("W:");
                        if ui
                            .add(egui::DragValue::new(&mut w).range(0.0..=100.0).speed(0.05).suffix(" m"))
                            .changed()
                        {
                            self.editor.resize_node(id, DimensionField::Width, w);
                        }
                        ui.label("H:");
                        if ui
                            .add(egui::DragValue::new(&mut h).range(0.0..=100.0).speed(0.05).suffix(" m"))
                            .changed()
                        {
                            self.editor.resize_node(id, DimensionField::Height, h);
                        }
                    });
                }
                ui.label(format!(
                    "At {:.2} m, {:.2} m",
                    marker.position.x / ppm,
                    marker.position.y / ppm
                ));

                let links: Vec<(usize, u64)> = self
                    .editor
                    .scene()
                    .edges
                    .iter()
                    .enumerate()
                    .filter_map(|(i, e)| {
                        if e.source == id {
                            Some((i, e.target))
                        } else if e.target == id {
                            Some((i, e.source))
                        } else {
                            None
                        }
                    })
                    .collect();
                if !links.is_empty() {
                    ui.separator();
                    ui.label("Connections");
                    let mut remove = None;
                    let mut restyle = None;
                    for (index, other) in links {
                        let name = if other == OUTLINE_ID {
                            "Building".to_string()
                        } else {
                            self.editor
                                .scene()
                                .marker(other)
                                .map(|m| m.label.clone())
                                .unwrap_or_else(|| format!("#{other}"))
                        };
                        let current = self.editor.scene().edges[index].style;
                        ui.horizontal(|ui| {
                            ui.label(format!("→ {name}"));
                            let mut style = current;
                            egui::ComboBox::from_id_salt(("edge_style", index))
                                .width(70.0)
                                .selected_text(style.label())
                                .show_ui(ui, |ui| {
                                    for option in LineStyle::ALL {
                                        ui.selectable_value(&mut style, option, option.label());
                                    }
                                });
                            if style != current {
                                restyle = Some((index, style));
                            }
                            if ui.small_button("✕").clicked() {
                                remove = Some(index);
                            }
                        });
                    }
                    if let Some((index, style)) = restyle {
                        self.editor.set_edge_style(index, style);
                    }
                    if let Some(index) = remove {
                        self.editor.remove_edge(index);
                    }
                }
                ui.separator();
                if ui.button("Delete marker").clicked() {
                    self.delete_selected();
                }
            }
        }

        ui.separator();
        ui.heading("Floor");
        ui.label(self.editor.key().to_string());
        let scene = self.editor.scene();
        ui.label(format!(
            "{} marker(s), {} connection(s)",
            scene.markers.len(),
            scene.edges.len()
        ));
        let duplicates = scene.duplicate_edge_count();
        if duplicates > 0 {
            ui.colored_label(
                egui::Color32::from_rgb(230, 180, 60),
                format!("{duplicates} repeated connection(s)"),
            );
        }
        if self.editor.has_unsaved_changes() {
            ui.small("Unsaved changes");
        } else {
            ui.small("All changes saved");
        }
        if ui
            .add_enabled(!self.editor.scene().is_empty(), egui::Button::new("Clear floor"))
            .clicked()
        {
            self.reset_scene();
        }

        let saved = self.editor.store().keys();
        if !saved.is_empty() {
            ui.separator();
            ui.label("Saved floors");
            let mut open = None;
            for key in saved {
                let current = &key == self.editor.key();
                if ui.selectable_label(current, key.to_string()).clicked() && !current {
                    open = Some(key);
                }
            }
            if let Some(key) = open {
                self.building_input = key.building_id;
                self.floor_input = key.floor_id;
                self.apply_layout_key();
            }
        }
        if let Some(path) = self.editor.store().path() {
            ui.small(format!("Store: {}", path.display()));
        }
    }

    /// Floating single-line editor under the marker being renamed. Enter or
    /// clicking away commits, Escape restores the old label.
    fn label_edit_ui(&mut self, ctx: &egui::Context, ui: &egui::Ui, origin: egui::Pos2) {
        let Some(node_id) = self.editor.label_edit().map(|e| e.node_id) else {
            return;
        };
        let Some(rect) = self.editor.scene().marker(node_id).map(|m| m.rect()) else {
            self.editor.cancel_label_edit();
            return;
        };
        let pos = self.view.world_to_screen(origin, rect.left_bottom()) + egui::vec2(0.0, 4.0);
        let width = (rect.width() * self.view.zoom).max(160.0);
        let request_focus = std::mem::take(&mut self.focus_label_edit);
        let mut finished = None;
        egui::Area::new(ui.id().with("label_edit"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 240))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255)))
                    .inner_margin(4.0);
                frame.show(ui, |ui| {
                    let Some(edit) = self.editor.label_edit_mut() else {
                        return;
                    };
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut edit.buffer)
                            .desired_width(width)
                            .hint_text(edit.original.as_str()),
                    );
                    if request_focus {
                        response.request_focus();
                    }
                    if response.lost_focus() {
                        finished = Some(ui.input(|i| i.key_pressed(egui::Key::Escape)));
                    }
                });
            });
        match finished {
            Some(true) => {
                self.editor.cancel_label_edit();
            }
            Some(false) => {
                self.editor.commit_label_edit();
            }
            None => {}
        }
    }
}
