// SPDX-License-Identifier: MIT OR Apache-2.0
//! Status panel - asset load/save indicators.

use scene_sync::{AssetLoadTracker, Indicator, Phase};

/// Bottom bar listing one indicator per named load or save
#[derive(Debug, Default)]
pub struct StatusPanel;

impl StatusPanel {
    /// Create a new status panel
    pub fn new() -> Self {
        Self
    }

    /// Render the indicators currently held by the tracker
    pub fn ui(&self, ui: &mut egui::Ui, assets: &AssetLoadTracker) {
        ui.horizontal_wrapped(|ui| {
            let mut any = false;
            for indicator in assets.indicators() {
                any = true;
                render_indicator(ui, indicator);
                ui.separator();
            }
            if !any {
                ui.weak("Ready");
            }
        });
    }
}

fn render_indicator(ui: &mut egui::Ui, indicator: &Indicator) {
    ui.label(indicator_text(indicator));
    match indicator.phase {
        Phase::Starting | Phase::Progressing => match indicator.percent {
            Some(percent) => {
                ui.add(
                    egui::ProgressBar::new(f32::from(percent) / 100.0)
                        .desired_width(120.0)
                        .show_percentage(),
                );
            }
            None => {
                ui.spinner();
            }
        },
        Phase::Done => {
            ui.colored_label(egui::Color32::from_rgb(80, 200, 120), "Done");
        }
        Phase::Failed => {
            let message = indicator.message.as_deref().unwrap_or("Failed");
            ui.colored_label(ui.visuals().error_fg_color, message);
        }
    }
}

/// Caption shown next to an indicator, e.g. "Loading scene.glb"
fn indicator_text(indicator: &Indicator) -> String {
    format!("{} {}", indicator.key.direction, indicator.key.name)
}
