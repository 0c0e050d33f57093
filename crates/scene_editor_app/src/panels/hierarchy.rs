// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hierarchy panel - scene tree view.
//!
//! Draws the rows derived by the session and turns input into
//! [`UiAction`]s. Nothing here edits the scene or the tree directly.

use scene_sync::engine::{LightKind, Primitive};
use scene_sync::{EditorSession, NodeDescriptor, NodeKind, SceneNodeRef, TreeRow, UiAction};

/// The hierarchy panel showing the scene tree
#[derive(Debug, Default)]
pub struct HierarchyPanel {
    /// Search box contents
    search: String,
    /// Row being renamed (if any)
    renaming: Option<SceneNodeRef>,
    /// Rename buffer
    rename_buffer: String,
}

impl HierarchyPanel {
    /// Create a new hierarchy panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the panel and collect the actions it produced this frame
    pub fn ui(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) -> Vec<UiAction> {
        let mut actions = Vec::new();

        // Toolbar
        ui.horizontal(|ui| {
            let search = ui.add(
                egui::TextEdit::singleline(&mut self.search)
                    .hint_text("Search...")
                    .desired_width(ui.available_width() - 60.0),
            );
            if search.changed() {
                actions.push(UiAction::Search(self.search.clone()));
            }

            ui.menu_button("+", |ui| {
                if let Some(descriptor) = add_menu(ui) {
                    actions.push(UiAction::Add(descriptor));
                    ui.close_menu();
                }
            });

            ui.menu_button("...", |ui| {
                if ui.button("Expand All").clicked() {
                    actions.push(UiAction::ExpandAll);
                    ui.close_menu();
                }
                if ui.button("Collapse All").clicked() {
                    actions.push(UiAction::CollapseAll);
                    ui.close_menu();
                }
            });
        });

        ui.separator();

        let rows = session.tree().rows();
        let scroll_to = session.tree_mut().take_scroll_target();

        egui::ScrollArea::vertical().show(ui, |ui| {
            if rows.is_empty() {
                ui.centered_and_justified(|ui| {
                    let text = if session.tree().is_searching() {
                        "No matching nodes"
                    } else {
                        "No nodes in scene"
                    };
                    ui.label(text);
                });
                return;
            }

            for row in &rows {
                let selected = session.selection().is_selected(row.key);
                let response = self.render_row(ui, row, selected, &mut actions);
                if scroll_to == Some(row.key) {
                    response.scroll_to_me(Some(egui::Align::Center));
                }
            }
        });

        self.shortcuts(ui, session, &mut actions);
        actions
    }

    fn render_row(
        &mut self,
        ui: &mut egui::Ui,
        row: &TreeRow,
        selected: bool,
        actions: &mut Vec<UiAction>,
    ) -> egui::Response {
        ui.horizontal(|ui| {
            // Indentation
            ui.add_space(row.depth as f32 * 16.0);

            if row.has_children {
                let icon = if row.expanded { "v" } else { ">" };
                if ui.small_button(icon).clicked() {
                    actions.push(UiAction::ToggleExpand(row.key));
                }
            } else {
                ui.add_space(20.0);
            }

            if row.show_visibility_toggle {
                let vis_icon = if row.visible { "O" } else { "-" };
                if ui.small_button(vis_icon).on_hover_text("Toggle Visibility").clicked() {
                    actions.push(UiAction::ToggleVisibility(row.key));
                }
            } else {
                ui.add_space(20.0);
            }

            if self.renaming == Some(row.key) {
                let response = ui.add(egui::TextEdit::singleline(&mut self.rename_buffer).desired_width(100.0));
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    self.renaming = None;
                } else if response.lost_focus() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    actions.push(UiAction::Rename {
                        node: row.key,
                        name: std::mem::take(&mut self.rename_buffer),
                    });
                    self.renaming = None;
                }
                return response;
            }

            let text_color = if row.visible {
                ui.style().visuals.text_color()
            } else {
                ui.style().visuals.weak_text_color()
            };
            let text = egui::RichText::new(format!("{} {}", kind_icon(row.kind), row.title)).color(text_color);
            let response = ui
                .add(egui::SelectableLabel::new(selected, text))
                .interact(egui::Sense::click_and_drag());

            response.dnd_set_drag_payload(row.key);
            if let Some(dragged) = response.dnd_release_payload::<SceneNodeRef>() {
                if *dragged != row.key {
                    actions.push(UiAction::Drop {
                        dragged: *dragged,
                        target: row.key,
                    });
                }
            }

            if response.double_clicked() {
                self.start_rename(row);
            } else if response.clicked() {
                actions.push(UiAction::Click(row.key));
            }

            response.context_menu(|ui| {
                if ui.button("Rename").clicked() {
                    self.start_rename(row);
                    ui.close_menu();
                }
                if ui.button("Delete").clicked() {
                    actions.push(UiAction::Delete(row.key));
                    ui.close_menu();
                }
            });

            response
        })
        .inner
    }

    fn start_rename(&mut self, row: &TreeRow) {
        self.renaming = Some(row.key);
        self.rename_buffer = row.title.clone();
    }

    /// Global editing shortcuts, skipped while a text field has focus
    fn shortcuts(&self, ui: &egui::Ui, session: &EditorSession, actions: &mut Vec<UiAction>) {
        if ui.ctx().wants_keyboard_input() {
            return;
        }

        let redo = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::Z);
        let undo = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Z);
        ui.ctx().input_mut(|i| {
            // Redo first: the undo shortcut also matches with shift held
            if i.consume_shortcut(&redo) {
                actions.push(UiAction::Redo);
            } else if i.consume_shortcut(&undo) {
                actions.push(UiAction::Undo);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete) {
                if let Some(selected) = session.selection().selected() {
                    actions.push(UiAction::Delete(selected));
                }
            }
        });
    }
}

/// Contents of the "+" menu
fn add_menu(ui: &mut egui::Ui) -> Option<NodeDescriptor> {
    let mut picked = None;

    ui.label("Mesh");
    for shape in [
        Primitive::Box,
        Primitive::Sphere,
        Primitive::Cylinder,
        Primitive::Plane,
        Primitive::Ground,
        Primitive::Torus,
    ] {
        if ui.button(shape.label()).clicked() {
            picked = Some(NodeDescriptor::mesh(shape));
        }
    }

    ui.separator();
    ui.label("Light");
    for light in [LightKind::Point, LightKind::Directional, LightKind::Spot, LightKind::Hemispheric] {
        if ui.button(light.label()).clicked() {
            picked = Some(NodeDescriptor::light(light));
        }
    }

    ui.separator();
    if ui.button("Camera").clicked() {
        picked = Some(NodeDescriptor::camera());
    }
    if ui.button("Transform Node").clicked() {
        picked = Some(NodeDescriptor::container());
    }
    picked
}

fn kind_icon(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Mesh => "[M]",
        NodeKind::Light => "[L]",
        NodeKind::Camera => "[C]",
        NodeKind::Container => "[T]",
    }
}
