use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help & Shortcuts")
        .open(open)
        .resizable(true)
        .default_width(520.0)
        .default_height(460.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();

                help_row(ui, "⌘⇧P", "Open command palette");
                help_row(ui, "⌘S", "Save layout for this floor");
                help_row(ui, "⌘O", "Load saved layout for this floor");
                help_row(ui, "⌘⇧S", "Export SVG...");
                help_row(ui, "Delete", "Delete selected node");
                help_row(ui, "Escape", "Cancel gesture or label edit");
                help_row(ui, "F1", "This window");

                ui.add_space(10.0);
                ui.heading("Canvas");
                ui.separator();
                help_row(ui, "Drag from palette", "Place an outline or marker");
                help_row(ui, "Drag corner", "Move an outline vertex (snaps to grid)");
                help_row(ui, "Drag marker", "Move it; stays inside the outline");
                help_row(ui, "Drag ● handle", "Connect to another marker");
                help_row(ui, "Drag empty area", "Select the marker you box in");
                help_row(ui, "Double-click", "Rename a marker");
                help_row(ui, "Middle drag", "Pan");
                help_row(ui, "Scroll wheel", "Zoom");

                ui.add_space(10.0);
                ui.heading("Saving");
                ui.separator();
                ui.label("• Each building and floor pair has its own layout.");
                ui.label("• Edits are saved automatically after a short pause.");
                ui.label("• Switching floor saves the current one first.");
                ui.label("• Layouts live in the store file named in settings.toml:");
                ui.code(r#"store_path = "floor_layouts.json"
pixels_per_meter = 80.0
grid_spacing = 40.0
autosave_debounce_ms = 500"#);
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [140.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
