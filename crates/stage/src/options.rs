use etude_common::Color;
use std::ops::RangeInclusive;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.0..=0.1;
pub const ANGLE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const PENUMBRA_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Values edited from the control panel and read every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelOptions {
    pub sphere_color: Color,
    pub wireframe: bool,
    pub speed: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub intensity: f32,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            sphere_color: Color::from_hex(0xffea00),
            wireframe: false,
            speed: 0.01,
            angle: 0.2,
            penumbra: 0.0,
            intensity: 1.0,
        }
    }
}

/// One edit made in the control panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionChange {
    SphereColor(Color),
    Wireframe(bool),
    Speed(f32),
    Angle(f32),
    Penumbra(f32),
    Intensity(f32),
}

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

impl PanelOptions {
    /// Store a change, clamping sliders to their ranges.
    pub fn apply(&mut self, change: OptionChange) {
        match change {
            OptionChange::SphereColor(c) => self.sphere_color = c,
            OptionChange::Wireframe(w) => self.wireframe = w,
            OptionChange::Speed(v) => self.speed = clamp(v, &SPEED_RANGE),
            OptionChange::Angle(v) => self.angle = clamp(v, &ANGLE_RANGE),
            OptionChange::Penumbra(v) => self.penumbra = clamp(v, &PENUMBRA_RANGE),
            OptionChange::Intensity(v) => self.intensity = clamp(v, &INTENSITY_RANGE),
        }
    }

    /// Changes that turn `self` into `edited`, in field order.
    pub fn diff(&self, edited: &PanelOptions) -> Vec<OptionChange> {
        let mut changes = Vec::new();
        if edited.sphere_color != self.sphere_color {
            changes.push(OptionChange::SphereColor(edited.sphere_color));
        }
        if edited.wireframe != self.wireframe {
            changes.push(OptionChange::Wireframe(edited.wireframe));
        }
        if edited.speed != self.speed {
            changes.push(OptionChange::Speed(edited.speed));
        }
        if edited.angle != self.angle {
            changes.push(OptionChange::Angle(edited.angle));
        }
        if edited.penumbra != self.penumbra {
            changes.push(OptionChange::Penumbra(edited.penumbra));
        }
        if edited.intensity != self.intensity {
            changes.push(OptionChange::Intensity(edited.intensity));
        }
        changes
    }
}
