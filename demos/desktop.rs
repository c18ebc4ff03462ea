use std::net::TcpListener;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use face::gui::{face_control_panel, PanelState};
use face::signal::next_interval_ms;
use face::{
    Emotion, EmotionWindow, FaceConfig, FaceEngine, FaceResult, FaceSignal, FormFactor,
    LedRenderer, Viewport,
};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

const DEFAULT_SIGNAL_ADDR: &str = "127.0.0.1:9001";

struct App {
    signals: Receiver<FaceSignal>,
    state: Option<AppState>,
}

/// Stand-in for the camera classifier: noisy confident samples, flushed on a
/// randomized cadence like the real one.
struct MoodDrift {
    window: EmotionWindow,
    rng: StdRng,
    favourite: Emotion,
    last_flush_ms: f64,
    next_flush_ms: u64,
}

impl MoodDrift {
    fn new(config: &FaceConfig) -> Self {
        let mut rng = StdRng::from_entropy();
        let next_flush_ms = next_interval_ms(&config.signal, &mut rng);
        Self {
            window: EmotionWindow::from_config(&config.signal),
            rng,
            favourite: Emotion::Neutral,
            last_flush_ms: 0.0,
            next_flush_ms,
        }
    }

    fn step(&mut self, engine: &mut FaceEngine, now_ms: f64) {
        if self.rng.gen_bool(0.02) {
            self.favourite = Emotion::ALL[self.rng.gen_range(0..Emotion::COUNT)];
        }
        let other = Emotion::ALL[self.rng.gen_range(0..Emotion::COUNT)];
        self.window.push(self.favourite, self.rng.gen_range(0.85..1.0));
        self.window.push(other, self.rng.gen_range(0.5..0.95));

        if now_ms - self.last_flush_ms < self.next_flush_ms as f64 {
            return;
        }
        self.last_flush_ms = now_ms;
        self.next_flush_ms = next_interval_ms(&engine.config().signal, &mut self.rng);
        if let Some((weights, dominant)) = self.window.flush() {
            if let Err(e) = engine.set_target(&weights, dominant) {
                warn!("mood drift: {e}");
            }
        }
    }
}

struct AppState {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: LedRenderer,
    engine: FaceEngine,
    panel: PanelState,
    form_factor: FormFactor,
    follow_mouse: bool,
    mood: Option<MoodDrift>,
    start_time: Instant,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl AppState {
    fn viewport(&self) -> Viewport {
        Viewport::from_physical(
            self.surface_config.width,
            self.surface_config.height,
            self.window.scale_factor() as f32,
            self.form_factor,
        )
    }

    fn save_config(&self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Face config", &["json"])
            .set_file_name("face.json")
            .save_file()
        else {
            return;
        };
        let result = self
            .engine
            .config()
            .to_json()
            .and_then(|json| std::fs::write(&path, json).map_err(|e| face::FaceError::config(e.to_string())));
        match result {
            Ok(()) => info!("saved config to {}", path.display()),
            Err(e) => error!("saving config: {e}"),
        }
    }

    fn load_config(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Face config", &["json"])
            .pick_file()
        else {
            return;
        };
        match load_engine(&path, self.viewport()) {
            Ok(engine) => {
                info!("loaded config from {}", path.display());
                self.engine = engine;
                self.panel = PanelState::default();
            }
            Err(e) => error!("loading {}: {e}", path.display()),
        }
    }
}

fn load_engine(path: &Path, viewport: Viewport) -> FaceResult<FaceEngine> {
    let json = std::fs::read_to_string(path).map_err(|e| face::FaceError::config(e.to_string()))?;
    let mut engine = FaceEngine::new(FaceConfig::from_json(&json)?, viewport)?;
    engine.set_look_at(0.5, 0.42);
    Ok(engine)
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Face")
                        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720)),
                )
                .unwrap(),
        );

        let state = pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let surface = instance.create_surface(window.clone()).unwrap();

            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .unwrap();

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("face_device"),
                        ..Default::default()
                    },
                    None,
                )
                .await
                .unwrap();

            let size = window.inner_size();
            let caps = surface.get_capabilities(&adapter);
            let format = caps.formats[0];

            let surface_config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.width.max(1),
                height: size.height.max(1),
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode: caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            };
            surface.configure(&device, &surface_config);

            let renderer = LedRenderer::new(&device, format);

            let form_factor = match std::env::var("FACE_FORM_FACTOR").as_deref() {
                Ok("mobile") => FormFactor::Mobile,
                _ => FormFactor::Desktop,
            };
            let viewport = Viewport::from_physical(
                surface_config.width,
                surface_config.height,
                window.scale_factor() as f32,
                form_factor,
            );
            let mut engine = FaceEngine::new(FaceConfig::default(), viewport).unwrap();
            engine.set_look_at(0.5, 0.42);

            // egui setup
            let egui_ctx = egui::Context::default();
            let egui_state = egui_winit::State::new(
                egui_ctx.clone(),
                egui_ctx.viewport_id(),
                &window,
                Some(window.scale_factor() as f32),
                None,
                None,
            );
            let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

            AppState {
                window,
                device,
                queue,
                surface,
                surface_config,
                renderer,
                engine,
                panel: PanelState::default(),
                form_factor,
                follow_mouse: false,
                mood: None,
                start_time: Instant::now(),
                egui_ctx,
                egui_state,
                egui_renderer,
            }
        });

        self.state = Some(state);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Pass events to egui first
        let egui_response = state.egui_state.on_window_event(&state.window, &event);
        if egui_response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                state.surface_config.width = new_size.width.max(1);
                state.surface_config.height = new_size.height.max(1);
                state
                    .surface
                    .configure(&state.device, &state.surface_config);
                let viewport = state.viewport();
                if let Err(e) = state.engine.resize(viewport) {
                    error!("resize: {e}");
                }
                state.window.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => event_loop.exit(),
                Key::Character(c) => match c.as_str() {
                    "f" => state.follow_mouse = !state.follow_mouse,
                    "m" => {
                        state.mood = match state.mood {
                            Some(_) => None,
                            None => Some(MoodDrift::new(state.engine.config())),
                        };
                        info!("mood drift {}", if state.mood.is_some() { "on" } else { "off" });
                    }
                    "s" => state.save_config(),
                    "l" => state.load_config(),
                    digit => {
                        if let Some(emotion) = digit
                            .parse::<usize>()
                            .ok()
                            .and_then(|n| n.checked_sub(1))
                            .and_then(|i| Emotion::ALL.get(i))
                        {
                            if let Err(e) = state.engine.set_emotion(emotion.as_str()) {
                                warn!("{e}");
                            }
                        }
                    }
                },
                _ => {}
            },
            WindowEvent::CursorMoved { position, .. } => {
                if state.follow_mouse {
                    let x = position.x / state.surface_config.width as f64;
                    let y = position.y / state.surface_config.height as f64;
                    state.engine.set_look_at(x as f32, y as f32);
                }
            }
            WindowEvent::RedrawRequested => {
                let output = match state.surface.get_current_texture() {
                    Ok(output) => output,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state
                            .surface
                            .configure(&state.device, &state.surface_config);
                        return;
                    }
                    Err(e) => {
                        error!("Surface error: {e:?}");
                        return;
                    }
                };

                // Signals land between ticks, never during one
                for signal in self.signals.try_iter() {
                    if let Err(e) = signal.apply(&mut state.engine) {
                        warn!("rejected signal {signal:?}: {e}");
                    }
                }

                let now_ms = state.start_time.elapsed().as_secs_f64() * 1000.0;
                if let Some(mood) = &mut state.mood {
                    mood.step(&mut state.engine, now_ms);
                }
                state.engine.tick(now_ms);
                let (width, height) = state.engine.viewport().clamped_size();
                state.renderer.prepare(
                    &state.device,
                    &state.queue,
                    state.engine.frame(),
                    [width, height],
                );

                // --- egui frame ---
                let raw_input = state.egui_state.take_egui_input(&state.window);
                let full_output = state.egui_ctx.run(raw_input, |ctx| {
                    face_control_panel(ctx, &mut state.panel, &mut state.engine);
                });

                state
                    .egui_state
                    .handle_platform_output(&state.window, full_output.platform_output);

                let paint_jobs = state
                    .egui_ctx
                    .tessellate(full_output.shapes, full_output.pixels_per_point);

                // Update egui textures
                for (id, delta) in &full_output.textures_delta.set {
                    state
                        .egui_renderer
                        .update_texture(&state.device, &state.queue, *id, delta);
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.surface_config.width, state.surface_config.height],
                    pixels_per_point: state.engine.viewport().device_pixel_ratio,
                };

                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let mut encoder =
                    state
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("face_encoder"),
                        });

                // Update egui buffers
                state.egui_renderer.update_buffers(
                    &state.device,
                    &state.queue,
                    &mut encoder,
                    &paint_jobs,
                    &screen_descriptor,
                );

                let bg = state.engine.colors().bg_color;

                // Render cells + egui overlay in same pass
                {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("face_render_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color {
                                    r: bg[0] as f64,
                                    g: bg[1] as f64,
                                    b: bg[2] as f64,
                                    a: 1.0,
                                }),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    state.renderer.draw(&mut pass);

                    // Draw egui overlay
                    state.egui_renderer.render(
                        &mut pass.forget_lifetime(),
                        &paint_jobs,
                        &screen_descriptor,
                    );
                }

                // Free egui textures
                for id in &full_output.textures_delta.free {
                    state.egui_renderer.free_texture(id);
                }

                state.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                state.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Accepts websocket clients and forwards every text frame that parses as a
/// `FaceSignal` to the render loop.
fn spawn_signal_listener(addr: String, tx: Sender<FaceSignal>) {
    thread::spawn(move || {
        let listener = match TcpListener::bind(&addr) {
            Ok(listener) => listener,
            Err(e) => {
                warn!("signal feed disabled, cannot bind {addr}: {e}");
                return;
            }
        };
        info!("listening for face signals on ws://{addr}");

        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let tx = tx.clone();
            thread::spawn(move || {
                let mut socket = match tungstenite::accept(stream) {
                    Ok(socket) => socket,
                    Err(e) => {
                        warn!("websocket handshake failed: {e}");
                        return;
                    }
                };
                loop {
                    match socket.read() {
                        Ok(tungstenite::Message::Text(text)) => {
                            match FaceSignal::from_json(text.as_str()) {
                                Ok(signal) => {
                                    if tx.send(signal).is_err() {
                                        return;
                                    }
                                }
                                Err(e) => warn!("bad signal {:?}: {e}", text.as_str()),
                            }
                        }
                        Ok(tungstenite::Message::Close(_)) | Err(_) => return,
                        Ok(_) => {}
                    }
                }
            });
        }
    });
}

fn main() {
    env_logger::init();

    let (tx, rx) = mpsc::channel();
    let addr = std::env::var("FACE_SIGNAL_ADDR").unwrap_or_else(|_| DEFAULT_SIGNAL_ADDR.to_string());
    spawn_signal_listener(addr, tx);

    let event_loop = EventLoop::new().unwrap();
    let mut app = App {
        signals: rx,
        state: None,
    };
    event_loop.run_app(&mut app).unwrap();
}
