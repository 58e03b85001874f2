/// Per-frame uniforms shared by every module.
pub const GLOBALS_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    inv_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    fog_color: vec4<f32>,
    fog: vec4<f32>,
    light_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

/// Per-draw uniforms and the mesh vertex layout.
pub const DRAW_WGSL: &str = r#"
struct Draw {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> draw: Draw;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

fn apply_fog(color: vec3<f32>, world_position: vec3<f32>) -> vec3<f32> {
    let depth = distance(globals.camera_position.xyz, world_position);
    var factor = 0.0;
    if (globals.fog.x == 1.0) {
        factor = clamp((depth - globals.fog.y) / max(globals.fog.z - globals.fog.y, 1e-5), 0.0, 1.0);
    } else if (globals.fog.x == 2.0) {
        let d = globals.fog.y * depth;
        factor = 1.0 - exp(-d * d);
    }
    return mix(color, globals.fog_color.rgb, factor);
}
"#;

/// Basic and standard materials.
pub const MESH_WGSL: &str = r#"
@group(2) @binding(0)
var map_texture: texture_2d<f32>;
@group(2) @binding(1)
var map_sampler: sampler;

const AMBIENT: f32 = 0.05;

struct MeshOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> MeshOutput {
    let world = draw.model * vec4<f32>(in.position, 1.0);
    var out: MeshOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (draw.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    out.uv = in.uv;
    return out;
}

fn spot_light(world_position: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    if (globals.light_position.w == 0.0) {
        return vec3<f32>(0.0);
    }
    let to_light = normalize(globals.light_position.xyz - world_position);
    let cos_theta = dot(-to_light, globals.light_direction.xyz);
    let cos_outer = globals.light_direction.w;
    let cos_inner = globals.light_color.w;
    var spot = 0.0;
    if (cos_inner - cos_outer <= 1e-6) {
        spot = select(0.0, 1.0, cos_theta >= cos_outer);
    } else {
        spot = smoothstep(cos_outer, cos_inner, cos_theta);
    }
    let diffuse = max(dot(normal, to_light), 0.0);
    return globals.light_color.rgb * diffuse * spot;
}

@fragment
fn fs_main(in: MeshOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let base = draw.color * textureSample(map_texture, map_sampler, in.uv);
    var rgb = base.rgb;
    if (draw.params.x > 0.5) {
        var n = normalize(in.world_normal);
        if (!front) {
            n = -n;
        }
        rgb = base.rgb * (AMBIENT + spot_light(in.world_position, n));
    }
    return vec4<f32>(apply_fog(rgb, in.world_position), base.a);
}
"#;

/// Helper lines and wireframes, already in world space.
pub const LINE_WGSL: &str = r#"
struct LineInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_line(in: LineInput) -> LineOutput {
    var out: LineOutput;
    out.clip_position = globals.view_proj * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Fullscreen triangle used by both background modes.
pub const FULLSCREEN_WGSL: &str = r#"
struct ScreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_screen(@builtin(vertex_index) index: u32) -> ScreenOutput {
    let t = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    let ndc = t * 2.0 - 1.0;
    var out: ScreenOutput;
    out.clip_position = vec4<f32>(ndc, 1.0, 1.0);
    out.ndc = ndc;
    out.uv = vec2<f32>(t.x, 1.0 - t.y);
    return out;
}
"#;

/// Cube texture background.
pub const SKYBOX_WGSL: &str = r#"
@group(1) @binding(0)
var sky_texture: texture_cube<f32>;
@group(1) @binding(1)
var sky_sampler: sampler;

@fragment
fn fs_sky(in: ScreenOutput) -> @location(0) vec4<f32> {
    let near = globals.inv_view_proj * vec4<f32>(in.ndc, 0.0, 1.0);
    let far = globals.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w - near.xyz / near.w);
    return textureSample(sky_texture, sky_sampler, vec3<f32>(-dir.x, dir.y, dir.z));
}
"#;

/// Flat texture stretched over the viewport.
pub const BACKDROP_WGSL: &str = r#"
@group(1) @binding(0)
var backdrop_texture: texture_2d<f32>;
@group(1) @binding(1)
var backdrop_sampler: sampler;

@fragment
fn fs_backdrop(in: ScreenOutput) -> @location(0) vec4<f32> {
    return textureSample(backdrop_texture, backdrop_sampler, in.uv);
}
"#;

/// Declarations available to shader-material sources. The vertex source
/// must define `vs_main(in: VertexInput) -> VertexOutput` and the fragment
/// source `fs_main(in: VertexOutput) -> @location(0) vec4<f32>`. Elapsed
/// seconds are in `globals.fog.w`.
pub const SHADER_MATERIAL_PRELUDE: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) world_position: vec3<f32>,
};
"#;

/// Join WGSL fragments into one module source.
pub fn module_source(parts: &[&str]) -> String {
    parts.concat()
}

/// Full module for a shader material.
pub fn shader_material_source(vertex: &str, fragment: &str) -> String {
    module_source(&[GLOBALS_WGSL, DRAW_WGSL, SHADER_MATERIAL_PRELUDE, vertex, fragment])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_material_source_orders_prelude_first() {
        let src = shader_material_source("VS", "FS");
        let globals = src.find("struct Globals").unwrap();
        let prelude = src.find("struct VertexOutput").unwrap();
        let vs = src.find("VS").unwrap();
        assert!(globals < prelude && prelude < vs && vs < src.find("FS").unwrap());
    }

    #[test]
    fn builtin_material_matches_the_prelude() {
        let src = shader_material_source(
            etude_scene::ShaderMaterial::DEFAULT_VERTEX,
            etude_scene::ShaderMaterial::DEFAULT_FRAGMENT,
        );
        assert!(src.contains("fn vs_main(in: VertexInput) -> VertexOutput"));
        assert!(src.contains("struct Draw"));
    }
}
