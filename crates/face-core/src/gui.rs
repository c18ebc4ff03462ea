use crate::catalog::Emotion;
use crate::engine::FaceEngine;
use crate::signal::EmotionWeights;

/// Slider values kept between frames.
pub struct PanelState {
    pub weights: [f32; Emotion::COUNT],
    pub look_at: [f32; 2],
    pub last_error: Option<String>,
}

impl Default for PanelState {
    fn default() -> Self {
        let mut weights = [0.0; Emotion::COUNT];
        weights[Emotion::Neutral.index()] = 1.0;
        Self {
            weights,
            look_at: [0.5, 0.5],
            last_error: None,
        }
    }
}

impl PanelState {
    /// Push the slider weights to the engine, dominant = heaviest slider.
    pub fn apply(&mut self, engine: &mut FaceEngine) {
        let pairs: Vec<(Emotion, f32)> = Emotion::ALL
            .iter()
            .map(|&e| (e, self.weights[e.index()]))
            .collect();
        let result = EmotionWeights::from_pairs(&pairs).and_then(|weights| {
            let dominant = weights.dominant().unwrap_or(Emotion::Neutral);
            engine.set_target(&weights, dominant)
        });
        self.last_error = result.err().map(|e| e.to_string());
    }
}

pub fn face_control_panel(ctx: &egui::Context, panel: &mut PanelState, engine: &mut FaceEngine) {
    egui::SidePanel::right("face_controls")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Face Controls");
            ui.separator();

            ui.label(format!(
                "{} → {}",
                engine.current_emotion(),
                engine.target_emotion()
            ));
            ui.add(egui::ProgressBar::new(engine.transition().progress()).text("Transition"));

            ui.separator();

            egui::CollapsingHeader::new("Emotion Weights")
                .default_open(true)
                .show(ui, |ui| {
                    for emotion in Emotion::ALL {
                        ui.add(
                            egui::Slider::new(&mut panel.weights[emotion.index()], 0.0..=1.0)
                                .text(emotion.as_str()),
                        );
                    }
                    ui.horizontal(|ui| {
                        if ui.button("Apply").clicked() {
                            panel.apply(engine);
                        }
                        if ui.button("Neutral").clicked() {
                            panel.weights = PanelState::default().weights;
                            panel.apply(engine);
                        }
                    });
                    if let Some(err) = &panel.last_error {
                        ui.colored_label(egui::Color32::RED, err);
                    }
                });

            egui::CollapsingHeader::new("Look At")
                .default_open(false)
                .show(ui, |ui| {
                    let x = ui.add(egui::Slider::new(&mut panel.look_at[0], 0.0..=1.0).text("X"));
                    let y = ui.add(egui::Slider::new(&mut panel.look_at[1], 0.0..=1.0).text("Y"));
                    if x.changed() || y.changed() {
                        engine.set_look_at(panel.look_at[0], panel.look_at[1]);
                    }
                });

            egui::CollapsingHeader::new("Appearance")
                .default_open(false)
                .show(ui, |ui| {
                    let mut colors = engine.colors().clone();
                    let mut changed = false;
                    ui.horizontal(|ui| {
                        ui.label("Center Color");
                        changed |= color_edit_rgb(ui, &mut colors.center_color);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Edge Color");
                        changed |= color_edit_rgb(ui, &mut colors.edge_color);
                    });
                    ui.horizontal(|ui| {
                        ui.label("BG Color");
                        changed |= color_edit_rgb(ui, &mut colors.bg_color);
                    });
                    if changed {
                        engine.set_colors(colors);
                    }
                });
        });
}

fn color_edit_rgb(ui: &mut egui::Ui, color: &mut [f32; 3]) -> bool {
    let mut rgba = egui::Color32::from_rgb(
        (color[0] * 255.0) as u8,
        (color[1] * 255.0) as u8,
        (color[2] * 255.0) as u8,
    );
    if ui.color_edit_button_srgba(&mut rgba).changed() {
        color[0] = rgba.r() as f32 / 255.0;
        color[1] = rgba.g() as f32 / 255.0;
        color[2] = rgba.b() as f32 / 255.0;
        return true;
    }
    false
}
