//! Rendering system with wgpu pipeline and shader management.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::engine::FrameOutput;
use crate::params::ShadingParams;
use crate::shading::{NoiseTexture, SPARKLE_VIEW_FREQUENCY};
use crate::terrain::{TerrainMesh, TerrainVertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform buffer for the terrain shader. Every field is a vec4 so the
/// layout matches WGSL without manual padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TerrainUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz: eye position, w: shading time
    pub camera_time: [f32; 4],
    /// rgb: trough colour, w: roughness
    pub color_low: [f32; 4],
    /// rgb: crest colour, w: unused
    pub color_high: [f32; 4],
    /// rgb: base ground colour, w: unused
    pub color_base: [f32; 4],
    /// xyz: direction toward the light, w: intensity
    pub light_dir: [f32; 4],
    /// rgb: light colour, w: ambient intensity
    pub light_color: [f32; 4],
    /// rgb: fog colour, w: exponential density
    pub fog_color: [f32; 4],
    /// x: fog near, y: fog far, z: noise texture span, w: bump strength
    pub fog_params: [f32; 4],
    /// xy: direction, z: frequency, w: speed
    pub ripple_primary: [f32; 4],
    pub ripple_secondary: [f32; 4],
    /// x: primary amplitude, y: secondary amplitude, z: band noise weight
    pub ripple_amplitude: [f32; 4],
    /// x, y: sparkle threshold window, z: view flicker frequency
    pub sparkle: [f32; 4],
}

impl TerrainUniforms {
    /// Pack one frame's lighting and shading state. Colours go to linear
    /// space because the surface format is sRGB.
    pub fn new(view_proj: Mat4, eye: Vec3, frame: &FrameOutput, shading: &ShadingParams) -> Self {
        let c = &frame.color;
        let u = &frame.uniforms;
        let ripple = |layer: &crate::params::RippleLayer| {
            [
                layer.direction[0],
                layer.direction[1],
                layer.frequency,
                layer.speed,
            ]
        };

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_time: eye.extend(u.time).to_array(),
            color_low: u.color_low.to_linear().extend(u.roughness),
            color_high: u.color_high.to_linear().extend(0.0),
            color_base: u.color_base.to_linear().extend(0.0),
            light_dir: c.light_direction.extend(c.light_intensity).to_array(),
            light_color: c.light_color.to_linear().extend(c.ambient_intensity),
            fog_color: c.fog.to_linear().extend(c.fog_density),
            fog_params: [
                c.fog_near,
                c.fog_far,
                shading.noise_texture_span_m,
                shading.bump_strength,
            ],
            ripple_primary: ripple(&shading.primary_ripple),
            ripple_secondary: ripple(&shading.secondary_ripple),
            ripple_amplitude: [
                shading.primary_ripple.amplitude,
                shading.secondary_ripple.amplitude,
                shading.band_noise_weight,
                0.0,
            ],
            sparkle: [
                shading.sparkle_threshold[0],
                shading.sparkle_threshold[1],
                SPARKLE_VIEW_FREQUENCY,
                0.0,
            ],
        }
    }
}

/// Uniform buffer for the sky shader (inverse view-projection + colours)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    /// rgb: zenith colour, w: star opacity
    pub sky_color: [f32; 4],
    /// rgb: horizon colour, w: shading time
    pub fog_color: [f32; 4],
    /// xyz: direction toward the sun, w: dayness
    pub sun_dir: [f32; 4],
}

impl SkyUniforms {
    pub fn new(view_proj: Mat4, frame: &FrameOutput, star_opacity: f32) -> Self {
        let c = &frame.color;
        Self {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            sky_color: c.sky.to_linear().extend(star_opacity),
            fog_color: c.fog.to_linear().extend(frame.uniforms.time),
            sun_dir: c.light_direction.extend(frame.dayness).to_array(),
        }
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    terrain_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    terrain_bind_group: wgpu::BindGroup,
    sky_uniform_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    index_count: u32,
    clear_color: wgpu::Color,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: std::sync::Arc<winit::window::Window>,
        mesh: &TerrainMesh,
        noise_texture: &NoiseTexture,
    ) -> Result<Self, String> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Window must have 'static lifetime via Arc
        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to request device: {}", e))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or("Surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let terrain_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("terrain.wgsl").into()),
        });

        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Index Buffer"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Uniform Buffer"),
            contents: bytemuck::cast_slice(&[TerrainUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Shading noise, sampled with repeat addressing so it tiles across the grid
        let noise_size = noise_texture.size();
        let texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("Shading Noise Texture"),
                size: wgpu::Extent3d {
                    width: noise_size,
                    height: noise_size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            noise_texture.as_bytes(),
        );
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shading Noise Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let terrain_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Terrain Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let terrain_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bind Group"),
            layout: &terrain_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let terrain_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Terrain Pipeline Layout"),
                bind_group_layouts: &[&terrain_bind_group_layout],
                push_constant_ranges: &[],
            });

        let terrain_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Terrain Render Pipeline"),
            layout: Some(&terrain_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &terrain_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                        3 => Float32
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &terrain_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sky_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Uniform Buffer"),
            contents: bytemuck::cast_slice(&[SkyUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sky_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sky Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Bind Group"),
            layout: &sky_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_uniform_buffer.as_entire_binding(),
            }],
        });

        let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[&sky_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sky_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sky Pipeline"),
            layout: Some(&sky_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sky_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sky_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Drawn first, behind everything, without touching depth
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = Self::create_depth_view(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            terrain_pipeline,
            sky_pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            terrain_bind_group,
            sky_uniform_buffer,
            sky_bind_group,
            depth_view,
            index_count: mesh.indices().len() as u32,
            clear_color: wgpu::Color::BLACK,
        })
    }

    fn create_depth_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Reconfigure the surface and depth buffer; zero sizes (minimised) are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, &self.config);
    }

    /// Current surface size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Upload relaxed terrain vertices
    pub fn update_vertices(&self, vertices: &[TerrainVertex]) {
        self.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
    }

    pub fn update_uniforms(&mut self, uniforms: &TerrainUniforms) {
        let [r, g, b, _] = uniforms.fog_color;
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    pub fn update_sky_uniforms(&self, uniforms: &SkyUniforms) {
        self.queue
            .write_buffer(&self.sky_uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Render a frame
    pub fn render(&self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Sky first
            render_pass.set_pipeline(&self.sky_pipeline);
            render_pass.set_bind_group(0, &self.sky_bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle

            render_pass.set_pipeline(&self.terrain_pipeline);
            render_pass.set_bind_group(0, &self.terrain_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeCatalog;
    use crate::engine::DesertEngine;
    use crate::noise::NoiseField;
    use crate::params::{CycleParams, TerrainParams};
    use crate::state::SceneState;

    fn frame() -> FrameOutput {
        let state = SceneState::new(5);
        let terrain = TerrainParams {
            grid_segments: 8,
            ..Default::default()
        };
        let shading = ShadingParams {
            noise_texture_size: 8,
            ..Default::default()
        };
        let mut engine = DesertEngine::new(
            BiomeCatalog::builtin(),
            &state,
            NoiseField::new(5),
            &terrain,
            CycleParams::default(),
            shading,
        );
        engine.frame(&state, 0.016)
    }

    #[test]
    fn test_uniform_layout_is_vec4_aligned() {
        assert_eq!(std::mem::size_of::<TerrainUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<TerrainUniforms>(), 64 + 12 * 16);
        assert_eq!(std::mem::size_of::<SkyUniforms>(), 64 + 3 * 16);
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 36);
    }

    #[test]
    fn test_terrain_uniforms_pack_frame() {
        let frame = frame();
        let shading = ShadingParams::default();
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let uniforms = TerrainUniforms::new(Mat4::IDENTITY, eye, &frame, &shading);

        assert_eq!(&uniforms.camera_time[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(uniforms.camera_time[3], frame.uniforms.time);
        assert_eq!(uniforms.color_low[3], frame.uniforms.roughness);
        assert_eq!(uniforms.light_dir[3], frame.color.light_intensity);
        assert_eq!(uniforms.fog_params[0], frame.color.fog_near);
        assert_eq!(uniforms.fog_params[1], frame.color.fog_far);
        assert_eq!(uniforms.sparkle[2], SPARKLE_VIEW_FREQUENCY);
        // Linear values never exceed their sRGB source
        assert!(uniforms.fog_color[0] <= frame.color.fog.r + 1e-6);
    }

    #[test]
    fn test_sky_uniforms_invert_view_proj() {
        let frame = frame();
        let view_proj = Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0);
        let sky = SkyUniforms::new(view_proj, &frame, 0.25);
        let round_trip = Mat4::from_cols_array_2d(&sky.inv_view_proj) * view_proj;
        assert!(round_trip.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert_eq!(sky.sky_color[3], 0.25);
        assert_eq!(sky.sun_dir[3], frame.dayness);
    }
}
