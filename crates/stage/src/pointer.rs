use glam::Vec2;

/// Map a surface pixel position to normalized device coordinates:
/// top-left is (-1, 1), bottom-right is (1, -1). Zero sizes count as 1.
pub fn normalize(x: f32, y: f32, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Vec2::new(x / w * 2.0 - 1.0, -(y / h) * 2.0 + 1.0)
}
