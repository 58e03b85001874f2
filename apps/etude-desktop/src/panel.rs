use egui::Context as EguiContext;
use etude_common::Color;
use etude_stage::{
    FrameReport, OptionChange, PanelOptions, ANGLE_RANGE, INTENSITY_RANGE, PENUMBRA_RANGE,
    SPEED_RANGE,
};

/// Draw the "Controls" window and return the edits made this frame.
pub fn controls(ctx: &EguiContext, options: &PanelOptions, last: Option<&FrameReport>) -> Vec<OptionChange> {
    let mut edited = *options;
    egui::Window::new("Controls")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mut rgb = edited.sphere_color.to_srgb8();
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    edited.sphere_color = Color::from_srgb8(rgb);
                }
                ui.label("sphereColor");
            });
            ui.checkbox(&mut edited.wireframe, "wireframe");
            ui.add(egui::Slider::new(&mut edited.speed, SPEED_RANGE).text("speed"));
            ui.add(egui::Slider::new(&mut edited.angle, ANGLE_RANGE).text("angle"));
            ui.add(egui::Slider::new(&mut edited.penumbra, PENUMBRA_RANGE).text("penumbra"));
            ui.add(egui::Slider::new(&mut edited.intensity, INTENSITY_RANGE).text("intensity"));

            if let Some(report) = last {
                ui.separator();
                ui.small(format!("frame {}", report.frame));
                match report.hits.first() {
                    Some(hit) => ui.small(format!("under pointer: {} ({:.1})", hit.name, hit.distance)),
                    None => ui.small("under pointer: nothing"),
                };
            }
        });
    options.diff(&edited)
}
