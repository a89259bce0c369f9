use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use image::{GrayImage, Luma};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use dunescape::{
    biome::BiomeCatalog,
    camera::CameraSystem,
    cli::Args,
    engine::DesertEngine,
    noise::NoiseField,
    params::{CycleParams, OrbitCameraPath, RenderConfig, ShadingParams, TerrainParams},
    rendering::{RenderSystem, SkyUniforms, TerrainUniforms},
    shading::NoiseTexture,
    state::SceneState,
    terrain::{GridLayout, HeightSynthesizer, TerrainVertex},
};

/// Phase step for the Up/Down keys
const PHASE_NUDGE: f32 = 0.02;

/// Longest frame step fed to the simulation (seconds)
const MAX_FRAME_S: f32 = 0.1;

/// Main application state
struct App {
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    engine: DesertEngine,
    camera: CameraSystem,
    state: SceneState,

    render_config: RenderConfig,
    day_length_s: f32,
    vertices: Vec<TerrainVertex>,

    start_time: Instant,
    last_frame: Instant,
}

impl App {
    fn new(engine: DesertEngine, state: SceneState, day_length_s: f32) -> Self {
        let now = Instant::now();
        Self {
            window: None,
            render_system: None,
            engine,
            camera: CameraSystem::new(OrbitCameraPath::default()),
            state,
            render_config: RenderConfig::default(),
            day_length_s,
            vertices: Vec::new(),
            start_time: now,
            last_frame: now,
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::ArrowRight => {
                self.state.next_biome();
            }
            KeyCode::ArrowLeft => {
                self.state.prev_biome();
            }
            KeyCode::ArrowUp => self.state.set_phase(self.state.phase() + PHASE_NUDGE),
            KeyCode::ArrowDown => self.state.set_phase(self.state.phase() - PHASE_NUDGE),
            _ => return,
        }
        log::info!(
            "Biome {} '{}', phase {:.2} ({})",
            self.state.biome_index(),
            self.engine
                .catalog()
                .get_wrapped(self.state.biome_index() as isize)
                .name,
            self.state.phase(),
            if self.state.is_day() { "day" } else { "night" }
        );
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Dunescape")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.engine.terrain.mesh,
            self.engine.shading.noise_texture(),
        )) {
            Ok(render_system) => render_system,
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.render_config.window_width = size.width.max(1);
        self.render_config.window_height = size.height.max(1);

        println!("\nDunescape is running!");
        println!("Left/Right: change biome, Up/Down: shift time of day, ESC: quit\n");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.last_frame = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape {
                    event_loop.exit();
                } else {
                    self.handle_key(key);
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                    let (width, height) = render_system.size();
                    self.render_config.window_width = width;
                    self.render_config.window_height = height;
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

impl App {
    /// Advance the simulation and render a single frame
    fn render_frame(&mut self) {
        let now = Instant::now();
        let delta_s = (now - self.last_frame).as_secs_f32().min(MAX_FRAME_S);
        self.last_frame = now;
        let time_s = self.start_time.elapsed().as_secs_f32();

        self.state.advance_phase(delta_s, self.day_length_s);
        let frame = self.engine.frame(&self.state, delta_s);

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };

        if frame.terrain_changed {
            self.engine.terrain.mesh.write_vertices(&mut self.vertices);
            render_system.update_vertices(&self.vertices);
        }

        let (view_proj, eye) = self
            .camera
            .create_view_proj_matrix(time_s, &self.render_config);

        let uniforms = TerrainUniforms::new(view_proj, eye, &frame, self.engine.shading.params());
        render_system.update_uniforms(&uniforms);
        render_system.update_sky_uniforms(&SkyUniforms::new(
            view_proj,
            &frame,
            self.engine.atmosphere.star_opacity(),
        ));

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = render_system.size();
                render_system.resize(width, height);
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

/// Write the target height field of one biome as a grayscale PNG
fn export_heightmap(
    path: &Path,
    params: &TerrainParams,
    noise: NoiseField,
    catalog: &BiomeCatalog,
    biome_index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = GridLayout::new(params.grid_segments, params.plane_size_m);
    let synthesizer = HeightSynthesizer::new(noise, params);
    let biome = catalog.get_wrapped(biome_index as isize);

    let start = Instant::now();
    let heights = synthesizer.synthesize_field(&grid, biome);

    let (min, max) = heights
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
            (lo.min(h), hi.max(h))
        });
    let range = (max - min).max(1e-6);

    let side = grid.side() as u32;
    let mut img = GrayImage::new(side, side);
    for row in 0..grid.side() {
        for col in 0..grid.side() {
            let h = heights[grid.index(row, col)];
            let gray = ((h - min) / range * 255.0).round().clamp(0.0, 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Luma([gray]));
        }
    }
    img.save(path)?;

    println!("Heightmap for '{}'", biome.name);
    println!("  Size: {}x{}", side, side);
    println!("  Range: {:.2}m .. {:.2}m", min, max);
    println!("  Output: {}", path.display());
    println!("  Time: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let terrain_params = args.terrain_params();
    terrain_params.validate()?;
    let cycle_params = CycleParams::default();
    cycle_params.validate()?;
    let shading_params = ShadingParams::default();
    shading_params.validate()?;

    if !NoiseField::init_global(args.seed) {
        log::warn!("Noise field already initialised, seed {} ignored", args.seed);
    }
    let noise = *NoiseField::global();

    let catalog = args.load_catalog()?;
    let biome_index = args.resolve_biome(&catalog);

    if args.is_headless() {
        if let Some(path) = &args.bake_noise {
            let texture = NoiseTexture::bake(
                &noise,
                shading_params.noise_texture_size,
                shading_params.noise_texture_span_m,
            );
            texture.save_png(path)?;
            println!("Noise texture written to {}", path.display());
        }
        if let Some(path) = &args.export_heightmap {
            export_heightmap(path, &terrain_params, noise, &catalog, biome_index)?;
        }
        return Ok(());
    }

    println!("Dunescape - procedural desert dunes");
    println!("Initializing systems...\n");

    let mut state = SceneState::new(catalog.len());
    state.set_biome(biome_index);
    state.set_phase(args.phase);

    let engine = DesertEngine::new(
        catalog,
        &state,
        noise,
        &terrain_params,
        cycle_params,
        shading_params,
    );

    let mut app = App::new(engine, state, args.day_length);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
