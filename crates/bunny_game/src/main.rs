//! Fluffy Bunny -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All simulation
//! runs inside `RedrawRequested` using a **fixed-timestep** model (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. Hotkeys and hot reload, on frames that will step
//!   3. `simulate_frame` -- controller velocity, rapier step, trigger pickups,
//!      body-to-mesh sync per fixed step, then the bunny's animation mixer and
//!      pickup spin by the wall-clock delta
//!   4. Follow the bunny with the camera, upload uniforms and instances, draw,
//!      composite the egui stats panel
//!
//! Hot reload: the arena and animation JSON files are watched via mtime polling and
//! reloaded at frame boundaries.

mod arena;
mod controller;
mod frame;
mod loading;
mod physics;
mod player_anim;
#[cfg(test)]
mod replay;
mod watcher;
mod world;

use std::path::PathBuf;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use arena::{load_arena_from_path, ArenaFile, CameraSpec};
use bunny_core::input::{InputState, Key};
use bunny_core::time::TimeState;
use bunny_devtools::{OverlayStats, StatsOverlay};
use bunny_platform::window::PlatformConfig;
use bunny_render::{color_from_hex, FollowCamera, FrameUniform, GpuContext, Lighting, MeshPipeline};
use frame::{simulate_frame, SimControl};
use loading::{load_animations, load_assets, LoadingManager};
use player_anim::AnimationRegistry;
use watcher::FileWatcher;
use world::GameWorld;

const ARENA_PATH: &str = "assets/arenas/meadow.json";
const ANIMATION_PATH: &str = "assets/animations/bunny.json";

/// All mutable game state lives here. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
///
/// Ownership is split into three conceptual groups:
///  - **Core systems** (time, input, camera, lights) -- updated every frame
///  - **Content** (arena, animation clips) -- loaded from disk, hot-reloadable
///  - **World** (physics bodies paired with render nodes) -- rebuilt on reset or reload
struct GameState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: FollowCamera,
    lighting: Lighting,
    clear_color: wgpu::Color,
    mesh_pipeline: MeshPipeline,
    stats_overlay: StatsOverlay,

    // --- Hot-reloadable content -------------------------------------------------
    arena_watcher: FileWatcher,
    arena: ArenaFile,
    animation_watcher: FileWatcher,
    animations: AnimationRegistry,

    world: GameWorld,
    control: SimControl,
}

impl GameState {
    fn new(window: Arc<Window>) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        let (width, height) = gpu.size;
        let mesh_pipeline = MeshPipeline::new(&gpu.device, gpu.surface_format, width, height);
        let stats_overlay = StatsOverlay::new(&gpu.device, gpu.surface_format, &window);

        let arena_path = PathBuf::from(ARENA_PATH);
        let animation_path = PathBuf::from(ANIMATION_PATH);
        let mut loading = LoadingManager::new();
        let assets = load_assets(&mut loading, &arena_path, &animation_path);
        if !loading.failures().is_empty() {
            log::warn!(
                "{} of {} asset files fell back to built-in defaults: {}",
                loading.failures().len(),
                loading.items_total(),
                loading.failures().join(", ")
            );
        }

        let mut camera = FollowCamera::new(width, height);
        configure_camera(&mut camera, &assets.arena.camera);
        let world = build_world(&assets.arena);
        camera.follow(world.player_position());

        Ok(Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            lighting: assets.arena.lights.to_lighting(),
            clear_color: clear_color(assets.arena.background_hex()),
            mesh_pipeline,
            stats_overlay,
            arena_watcher: FileWatcher::new(arena_path),
            arena: assets.arena,
            animation_watcher: FileWatcher::new(animation_path),
            animations: assets.animations,
            world,
            control: SimControl::default(),
        })
    }

    fn reset_world(&mut self, reason: &str) {
        let spin_enabled = self.world.spin_enabled;
        self.world = build_world(&self.arena);
        self.world.spin_enabled = spin_enabled;
        self.camera.follow(self.world.player_position());
        log::info!("Arena reset ({reason}): {}", self.arena.arena_id);
    }

    fn reload_arena(&mut self, reason: &str) {
        match load_arena_from_path(self.arena_watcher.path()) {
            Ok(arena) => {
                configure_camera(&mut self.camera, &arena.camera);
                self.lighting = arena.lights.to_lighting();
                self.clear_color = clear_color(arena.background_hex());
                self.arena = arena;
                self.reset_world(reason);
            }
            Err(err) => {
                log::error!("Arena reload failed ({reason}): {err}");
            }
        }
    }

    fn reload_animations(&mut self, reason: &str) {
        match load_animations(self.animation_watcher.path()) {
            Ok(registry) => {
                self.animations = registry;
                log::info!("Animations reloaded ({reason}): {} clips", self.animations.len());
            }
            Err(err) => {
                log::error!("Animation reload failed ({reason}): {err}");
            }
        }
    }

    /// Hotkeys and hot reload. Runs once per frame, only on frames that will
    /// take at least one fixed step, so edges are never read twice.
    /// Returns false when the game should exit.
    fn handle_frame_boundary(&mut self) -> bool {
        if self.input.is_just_pressed(Key::Escape) {
            return false;
        }
        if self.input.is_just_pressed(Key::F3) {
            self.stats_overlay.toggle();
        }
        if self.input.is_just_pressed(Key::F4) {
            self.world.spin_enabled = !self.world.spin_enabled;
            log::info!(
                "Pickup spin: {}",
                if self.world.spin_enabled { "ON" } else { "OFF" }
            );
        }
        if self.input.is_just_pressed(Key::P) {
            self.control.toggle_pause();
        }

        if self.input.is_just_pressed(Key::R) {
            self.reset_world("manual trigger (R)");
        } else if self.arena_watcher.should_reload() {
            self.reload_arena("file watcher");
        }
        if self.animation_watcher.should_reload() {
            self.reload_animations("file watcher");
        }
        true
    }

    fn overlay_stats(&self) -> OverlayStats {
        OverlayStats {
            body_count: self.world.physics.body_count() as u32,
            mesh_count: self.world.scene.len() as u32,
            player_position: self.world.player_position().to_array(),
            player_velocity: self.world.player_velocity().to_array(),
            animation_clip: self.world.animation_clip().map(str::to_string),
            money_collected: self.world.money_collected(),
            money_total: self.world.money_total(),
            paused: self.control.paused,
        }
    }

    fn render(&mut self) {
        self.camera.follow(self.world.player_position());
        let frame = FrameUniform::new(&self.camera, &self.lighting);
        self.mesh_pipeline.write_frame(&self.gpu.queue, &frame);
        let instances = self.world.scene.instances();
        self.mesh_pipeline
            .write_instances(&self.gpu.device, &self.gpu.queue, &instances);

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.stats_overlay.prepare(&self.window, &self.time, &stats);

        // Handle overlay button actions
        if overlay_actions.toggle_pause {
            self.control.toggle_pause();
        }
        if overlay_actions.single_step {
            self.control.single_step_requested = true;
        }
        if overlay_actions.reset_arena {
            self.reset_world("overlay button");
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Arena Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.mesh_pipeline.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            self.mesh_pipeline
                .draw(&mut render_pass, instances.len() as u32);
        }

        self.stats_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.stats_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.stats_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    config: PlatformConfig,
    state: Option<GameState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let state = bunny_platform::window::create_window(event_loop, &self.config)
            .and_then(|window| {
                log::info!(
                    "Window created: {}x{}",
                    self.config.width,
                    self.config.height
                );
                GameState::new(window)
            });
        match state {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .stats_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.mesh_pipeline.resize(&state.gpu.device, w, h);
                    state.camera.set_viewport(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                // Key-up events for keys held while unfocused never arrive.
                state.input.release_all();
                state.world.release_controls();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();
                if state.time.step_ready() && !state.handle_frame_boundary() {
                    log::info!("Escape pressed, exiting.");
                    event_loop.exit();
                    return;
                }

                let report = simulate_frame(
                    &mut state.time,
                    &mut state.input,
                    &mut state.world,
                    &mut state.control,
                    &state.animations,
                );
                if !report.collected.is_empty()
                    && state.world.money_collected() == state.world.money_total()
                {
                    log::info!("All money collected in '{}'", state.arena.arena_id);
                }

                state.render();
            }

            _ => {}
        }
    }
}

fn build_world(arena: &ArenaFile) -> GameWorld {
    let mut rng = arena.obstacles.rng();
    GameWorld::from_arena(arena, &mut rng)
}

fn configure_camera(camera: &mut FollowCamera, spec: &CameraSpec) {
    camera.distance = spec.distance;
    camera.height = spec.height;
    camera.fov_y = spec.fov_deg.to_radians();
}

/// Colours are decoded to linear because the surface is sRGB.
fn clear_color(hex: u32) -> wgpu::Color {
    let [r, g, b, a] = color_from_hex(hex);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyP => Some(Key::P),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Fluffy Bunny starting...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_map_to_game_keys() {
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::KeyP), Some(Key::P));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn clear_colour_is_linear() {
        let black = clear_color(0x000000);
        assert_eq!((black.r, black.g, black.b, black.a), (0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn camera_spec_is_applied() {
        let mut camera = FollowCamera::new(800, 600);
        let spec = CameraSpec {
            distance: 8.0,
            height: 3.0,
            fov_deg: 60.0,
        };
        configure_camera(&mut camera, &spec);
        camera.follow(glam::Vec3::ZERO);
        assert_eq!(camera.eye, glam::Vec3::new(0.0, 3.0, 8.0));
        assert!((camera.fov_y - 60.0_f32.to_radians()).abs() < 1e-6);
    }
}
