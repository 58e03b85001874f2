use crate::shaders;
use crate::uniforms::{aligned_stride, DrawUniform, Globals};
use crate::vertex::{draw_ranges, mesh_vertices, scene_lines, LineVertex, Vertex};
use etude_assets::{Texture, TextureData, TextureStore};
use etude_common::{Color, ObjectId, TextureHandle};
use etude_scene::{Background, Material, PerspectiveCamera, Scene, ShaderMaterial, Side};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;
use std::ops::Range;
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

const INITIAL_DRAWS: u64 = 64;
const INITIAL_LINE_VERTICES: u64 = 4096;

/// Everything needed to draw one frame.
pub struct RenderInput<'a> {
    pub scene: &'a Scene,
    pub camera: &'a PerspectiveCamera,
    /// Used when the scene has no background.
    pub clear_color: Color,
    /// Seconds since start, exposed to shader materials.
    pub time: f32,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct GpuTexture {
    bind_group: wgpu::BindGroup,
    cube: bool,
}

enum DrawPipeline {
    Mesh(Side),
    Shader(u64),
}

struct DrawItem {
    mesh: (ObjectId, usize),
    indices: Range<u32>,
    pipeline: DrawPipeline,
    texture: Option<TextureHandle>,
    uniform: DrawUniform,
}

struct PipelineDesc<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

fn build_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    desc: &PipelineDesc<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: desc.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(desc.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Front => 0,
        Side::Back => 1,
        Side::Double => 2,
    }
}

fn cull_mode(side: Side) -> Option<wgpu::Face> {
    match side {
        Side::Front => Some(wgpu::Face::Back),
        Side::Back => Some(wgpu::Face::Front),
        Side::Double => None,
    }
}

fn shader_key(material: &ShaderMaterial) -> u64 {
    let mut hasher = DefaultHasher::new();
    material.vertex_source.hash(&mut hasher);
    material.fragment_source.hash(&mut hasher);
    side_index(material.side).hash(&mut hasher);
    hasher.finish()
}

fn to_wgpu_color(color: Color) -> wgpu::Color {
    let [r, g, b, a] = color.to_linear_rgba();
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

/// wgpu scene renderer.
///
/// Meshes are uploaded on first sight and cached per object part. Helper
/// lines and wireframes are rebuilt every frame in world space.
pub struct WgpuRenderer {
    surface_format: wgpu::TextureFormat,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u64,
    draw_stride: u64,
    texture_layout: wgpu::BindGroupLayout,
    cube_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    default_texture: wgpu::BindGroup,
    mesh_pipelines: [wgpu::RenderPipeline; 3],
    line_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,
    backdrop_pipeline: wgpu::RenderPipeline,
    shader_layout: wgpu::PipelineLayout,
    shader_pipelines: BTreeMap<u64, wgpu::RenderPipeline>,
    line_buffer: wgpu::Buffer,
    line_capacity: u64,
    meshes: BTreeMap<(ObjectId, usize), GpuMesh>,
    textures: BTreeMap<TextureHandle, GpuTexture>,
    depth_texture: wgpu::TextureView,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals_buffer"),
            contents: bytemuck::bytes_of(&Globals::new(
                &PerspectiveCamera::default(),
                &Scene::new(),
                0.0,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });
        let draw_stride = aligned_stride(
            std::mem::size_of::<DrawUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(device, &draw_layout, draw_stride, INITIAL_DRAWS);

        let texture_layout = Self::create_texture_layout(
            device,
            "texture_layout",
            wgpu::TextureViewDimension::D2,
        );
        let cube_layout = Self::create_texture_layout(
            device,
            "cube_layout",
            wgpu::TextureViewDimension::Cube,
        );
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = TextureData::solid("white", [255, 255, 255, 255]);
        let default_view = Self::upload_texture(device, queue, &[&white], false);
        let default_texture =
            Self::create_texture_bind_group(device, &texture_layout, &sampler, &default_view);

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &draw_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let mesh_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(
                shaders::module_source(&[shaders::GLOBALS_WGSL, shaders::DRAW_WGSL, shaders::MESH_WGSL])
                    .into(),
            ),
        });
        let mesh_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &MESH_ATTRIBUTES,
        }];
        let mesh_pipelines = [Side::Front, Side::Back, Side::Double].map(|side| {
            build_pipeline(
                device,
                surface_format,
                &PipelineDesc {
                    label: "mesh_pipeline",
                    layout: &mesh_layout,
                    module: &mesh_module,
                    vertex_entry: "vs_main",
                    fragment_entry: "fs_main",
                    buffers: &mesh_buffers,
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: cull_mode(side),
                    depth_write: true,
                    depth_compare: wgpu::CompareFunction::Less,
                },
            )
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line_pipeline_layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });
        let line_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line_shader"),
            source: wgpu::ShaderSource::Wgsl(
                shaders::module_source(&[shaders::GLOBALS_WGSL, shaders::LINE_WGSL]).into(),
            ),
        });
        let line_pipeline = build_pipeline(
            device,
            surface_format,
            &PipelineDesc {
                label: "line_pipeline",
                layout: &line_layout,
                module: &line_module,
                vertex_entry: "vs_line",
                fragment_entry: "fs_line",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &LINE_ATTRIBUTES,
                }],
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
            },
        );

        let background_pipeline = |label: &str, layout: &wgpu::BindGroupLayout, body: &str, entry: &str| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&globals_layout, layout],
                push_constant_ranges: &[],
            });
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(
                    shaders::module_source(&[shaders::GLOBALS_WGSL, shaders::FULLSCREEN_WGSL, body])
                        .into(),
                ),
            });
            build_pipeline(
                device,
                surface_format,
                &PipelineDesc {
                    label,
                    layout: &pipeline_layout,
                    module: &module,
                    vertex_entry: "vs_screen",
                    fragment_entry: entry,
                    buffers: &[],
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    depth_write: false,
                    depth_compare: wgpu::CompareFunction::Always,
                },
            )
        };
        let sky_pipeline = background_pipeline("sky_pipeline", &cube_layout, shaders::SKYBOX_WGSL, "fs_sky");
        let backdrop_pipeline = background_pipeline(
            "backdrop_pipeline",
            &texture_layout,
            shaders::BACKDROP_WGSL,
            "fs_backdrop",
        );

        let shader_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shader_material_layout"),
            bind_group_layouts: &[&globals_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let line_capacity = INITIAL_LINE_VERTICES;
        let line_buffer = Self::create_line_buffer(device, line_capacity);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            surface_format,
            globals_buffer,
            globals_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity: INITIAL_DRAWS,
            draw_stride,
            texture_layout,
            cube_layout,
            sampler,
            default_texture,
            mesh_pipelines,
            line_pipeline,
            sky_pipeline,
            backdrop_pipeline,
            shader_layout,
            shader_pipelines: BTreeMap::new(),
            line_buffer,
            line_capacity,
            meshes: BTreeMap::new(),
            textures: BTreeMap::new(),
            depth_texture,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Upload textures added to the store since the last call and drop the
    /// ones it no longer holds.
    pub fn sync_textures(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, store: &TextureStore) {
        self.textures.retain(|handle, _| store.contains(*handle));
        for (handle, texture) in store.iter() {
            if self.textures.contains_key(&handle) {
                continue;
            }
            let gpu = match texture {
                Texture::Flat(data) => {
                    let view = Self::upload_texture(device, queue, &[data], false);
                    GpuTexture {
                        bind_group: Self::create_texture_bind_group(
                            device,
                            &self.texture_layout,
                            &self.sampler,
                            &view,
                        ),
                        cube: false,
                    }
                }
                Texture::Cube(faces) => {
                    let faces: Vec<&TextureData> = faces.iter().collect();
                    let view = Self::upload_texture(device, queue, &faces, true);
                    GpuTexture {
                        bind_group: Self::create_texture_bind_group(
                            device,
                            &self.cube_layout,
                            &self.sampler,
                            &view,
                        ),
                        cube: true,
                    }
                }
            };
            tracing::debug!(?handle, label = texture.label(), cube = gpu.cube, "texture uploaded");
            self.textures.insert(handle, gpu);
        }
    }

    /// Render one frame into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        input: &RenderInput<'_>,
    ) {
        let scene = input.scene;
        queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals::new(input.camera, scene, input.time)),
        );

        let items = self.prepare_draws(device, scene);
        if items.len() as u64 > self.draw_capacity {
            self.draw_capacity = (items.len() as u64).next_power_of_two();
            let (buffer, bind_group) =
                Self::create_draw_buffer(device, &self.draw_layout, self.draw_stride, self.draw_capacity);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
        }
        if !items.is_empty() {
            let mut bytes = vec![0u8; items.len() * self.draw_stride as usize];
            for (i, item) in items.iter().enumerate() {
                let at = i * self.draw_stride as usize;
                let src = bytemuck::bytes_of(&item.uniform);
                bytes[at..at + src.len()].copy_from_slice(src);
            }
            queue.write_buffer(&self.draw_buffer, 0, &bytes);
        }

        let lines = scene_lines(scene);
        if lines.len() as u64 > self.line_capacity {
            self.line_capacity = (lines.len() as u64).next_power_of_two();
            self.line_buffer = Self::create_line_buffer(device, self.line_capacity);
        }
        if !lines.is_empty() {
            queue.write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&lines));
        }

        let (clear, background) = match scene.background() {
            Background::None => (input.clear_color, None),
            Background::Color(c) => (c, None),
            Background::Texture(h) | Background::Cube(h) => (input.clear_color, self.textures.get(&h)),
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(to_wgpu_color(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(texture) = background {
                let pipeline = if texture.cube {
                    &self.sky_pipeline
                } else {
                    &self.backdrop_pipeline
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }

            for (i, item) in items.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&item.mesh) else {
                    continue;
                };
                let pipeline = match &item.pipeline {
                    DrawPipeline::Mesh(side) => &self.mesh_pipelines[side_index(*side)],
                    DrawPipeline::Shader(key) => match self.shader_pipelines.get(key) {
                        Some(p) => p,
                        None => continue,
                    },
                };
                let offset = (i as u64 * self.draw_stride) as u32;
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
                if let DrawPipeline::Mesh(_) = item.pipeline {
                    let texture = item
                        .texture
                        .and_then(|h| self.textures.get(&h))
                        .filter(|t| !t.cube)
                        .map_or(&self.default_texture, |t| &t.bind_group);
                    pass.set_bind_group(2, texture, &[]);
                }
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(item.indices.clone(), 0, 0..1);
            }

            if !lines.is_empty() {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(0..lines.len() as u32, 0..1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Upload new meshes, compile shader materials and collect draw items.
    /// Wireframe materials are drawn as lines instead.
    fn prepare_draws(&mut self, device: &wgpu::Device, scene: &Scene) -> Vec<DrawItem> {
        let live: BTreeSet<ObjectId> = scene.ids().into_iter().collect();
        self.meshes.retain(|(id, _), _| live.contains(id));

        let mut items = Vec::new();
        for object in scene.objects() {
            for (part, (matrix, mesh)) in object.world_meshes().into_iter().enumerate() {
                let key = (object.id, part);
                if !self.meshes.contains_key(&key) {
                    let vertices = mesh_vertices(&mesh.geometry);
                    let label = format!("{}#{part}", object.name);
                    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&label),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&label),
                        contents: bytemuck::cast_slice(mesh.geometry.indices()),
                        usage: wgpu::BufferUsages::INDEX,
                    });
                    self.meshes.insert(
                        key,
                        GpuMesh {
                            vertex_buffer,
                            index_buffer,
                        },
                    );
                }

                for range in draw_ranges(mesh) {
                    if range.material.wireframe() {
                        continue;
                    }
                    let pipeline = match range.material {
                        Material::Shader(shader) => {
                            DrawPipeline::Shader(self.shader_pipeline(device, shader))
                        }
                        other => DrawPipeline::Mesh(other.side()),
                    };
                    items.push(DrawItem {
                        mesh: key,
                        indices: range.indices,
                        pipeline,
                        texture: range.material.map(),
                        uniform: DrawUniform::new(matrix, range.material),
                    });
                }
            }
        }
        items
    }

    /// Compile a shader material once. Invalid sources fall back to the
    /// built-in shader and are logged.
    fn shader_pipeline(&mut self, device: &wgpu::Device, material: &ShaderMaterial) -> u64 {
        let key = shader_key(material);
        if self.shader_pipelines.contains_key(&key) {
            return key;
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.compile_shader_material(
            device,
            &material.vertex_source,
            &material.fragment_source,
            material.side,
        );
        let pipeline = match pollster::block_on(device.pop_error_scope()) {
            None => pipeline,
            Some(err) => {
                tracing::error!(%err, "shader material failed to compile; using the built-in shader");
                self.compile_shader_material(
                    device,
                    ShaderMaterial::DEFAULT_VERTEX,
                    ShaderMaterial::DEFAULT_FRAGMENT,
                    material.side,
                )
            }
        };
        self.shader_pipelines.insert(key, pipeline);
        key
    }

    fn compile_shader_material(
        &self,
        device: &wgpu::Device,
        vertex: &str,
        fragment: &str,
        side: Side,
    ) -> wgpu::RenderPipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shader_material"),
            source: wgpu::ShaderSource::Wgsl(shaders::shader_material_source(vertex, fragment).into()),
        });
        build_pipeline(
            device,
            self.surface_format,
            &PipelineDesc {
                label: "shader_material_pipeline",
                layout: &self.shader_layout,
                module: &module,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_ATTRIBUTES,
                }],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: cull_mode(side),
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        )
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_buffer"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn create_line_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("line_buffer"),
            size: capacity * std::mem::size_of::<LineVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_texture_layout(
        device: &wgpu::Device,
        label: &str,
        view_dimension: wgpu::TextureViewDimension,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Upload one layer per entry of `layers`. All layers must share the
    /// size of the first.
    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layers: &[&TextureData],
        cube: bool,
    ) -> wgpu::TextureView {
        let (width, height) = layers.first().map_or((1, 1), |t| (t.width.max(1), t.height.max(1)));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: layers.first().map(|t| t.label.as_str()),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers.len().max(1) as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, data) in layers.iter().enumerate() {
            if (data.width, data.height) != (width, height) {
                tracing::warn!(label = %data.label, "skipping texture layer with mismatched size");
                continue;
            }
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &data.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(if cube {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2
            }),
            ..Default::default()
        })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_mode_follows_side() {
        assert_eq!(cull_mode(Side::Front), Some(wgpu::Face::Back));
        assert_eq!(cull_mode(Side::Back), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(Side::Double), None);
    }

    #[test]
    fn shader_key_depends_on_sources_and_side() {
        let a = ShaderMaterial {
            vertex_source: "v".into(),
            fragment_source: "f".into(),
            side: Side::Front,
        };
        let b = ShaderMaterial {
            side: Side::Double,
            ..a.clone()
        };
        let c = ShaderMaterial {
            fragment_source: "g".into(),
            ..a.clone()
        };
        assert_eq!(shader_key(&a), shader_key(&a.clone()));
        assert_ne!(shader_key(&a), shader_key(&b));
        assert_ne!(shader_key(&a), shader_key(&c));
    }

    #[test]
    fn clear_color_is_linear() {
        let c = to_wgpu_color(Color::from_hex(0xffea00));
        assert_eq!(c.r, 1.0);
        assert_eq!(c.b, 0.0);
        assert!(c.g > 0.8 && c.g < 0.85);
    }
}
