mod audio;
mod config;
mod error;
mod export;
mod render;
mod settings;

use std::env;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

use nannou::prelude::*;

use audio::{AudioSourceAdapter, FrameCell, SpectralAnalyzer};
use config::Config;
use export::encoder::ExportJob;
use export::ExportCapture;
use render::compositor::{BackgroundLayer, Compositor, PostPasses};
use render::RenderEngine;
use settings::{parse_resolution, surface_dimensions, Settings, SuggestedSettings};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.contains(&"--devices".to_string()) {
        AudioSourceAdapter::list_devices();
        return;
    }

    // List all devices at startup
    AudioSourceAdapter::list_devices();

    nannou::app(model).update(update).run();
}

struct Model {
    config: Config,
    settings: Settings,
    source: Option<AudioSourceAdapter>,
    analyzer: Option<SpectralAnalyzer>,
    frames: Option<std::sync::Arc<FrameCell>>,
    engine: RenderEngine,
    compositor: Compositor,
    capture: ExportCapture,
    captured_tx: Sender<Vec<u8>>,
    captured_rx: Receiver<Vec<u8>>,
}

/// `--suggest <file>` merges a suggested-settings toml, the same shape an
/// external suggestion service returns, into the startup snapshot.
fn load_suggestion(settings: &mut Settings) {
    let args: Vec<String> = env::args().collect();
    let path = match args.iter().position(|a| a == "--suggest") {
        Some(i) => match args.get(i + 1) {
            Some(p) => p,
            None => {
                eprintln!("--suggest needs a file path");
                return;
            }
        },
        None => return,
    };
    match std::fs::read_to_string(path).map_err(|e| e.to_string()) {
        Ok(text) => match toml::from_str::<SuggestedSettings>(&text) {
            Ok(suggestion) => {
                settings.apply_suggestion(&suggestion);
                println!("Applied suggestion from {}", path);
            }
            Err(e) => eprintln!("Bad suggestion file {}: {}", path, e),
        },
        Err(e) => eprintln!("Could not read {}: {}", path, e),
    }
}

fn model(app: &App) -> Model {
    let config = Config::load();
    let mut settings = config.settings_or_default();
    load_suggestion(&mut settings);

    let (w, h) = surface_dimensions(&settings.export.resolution, false);
    app.new_window()
        .title("wavescene")
        .size(w, h)
        .view(view)
        .key_pressed(key_pressed)
        .event(window_event)
        .build()
        .unwrap();

    let window = app.main_window();
    let compositor = Compositor::new(window.device(), [w, h]);

    let mut engine = RenderEngine::new(settings.style);

    // An audio file on the command line plays that file; otherwise capture
    // from the microphone.
    let file_arg = {
        let args: Vec<String> = env::args().skip(1).collect();
        let mut file = None;
        let mut skip_value = false;
        for a in &args {
            if skip_value {
                skip_value = false;
                continue;
            }
            if a == "--suggest" {
                skip_value = true;
                continue;
            }
            if !a.starts_with('-') {
                file = Some(a.clone());
                break;
            }
        }
        file
    };
    let source = match &file_arg {
        Some(path) => AudioSourceAdapter::file(&PathBuf::from(path), &config),
        None => AudioSourceAdapter::mic(&config),
    };
    let source = match source {
        Ok(s) => {
            engine.notify(format!("Source: {}", s.description()));
            Some(s)
        }
        Err(e) => {
            eprintln!("Audio source unavailable: {}", e);
            engine.notify(format!("No audio: {}", e));
            None
        }
    };

    let analyzer = source
        .as_ref()
        .map(|s| SpectralAnalyzer::spawn(s.analysis_tap()));
    let frames = analyzer.as_ref().map(|a| a.frames());

    let (captured_tx, captured_rx) = channel();

    Model {
        config,
        settings,
        source,
        analyzer,
        frames,
        engine,
        compositor,
        capture: ExportCapture::new(),
        captured_tx,
        captured_rx,
    }
}

fn update(app: &App, model: &mut Model, _update: Update) {
    // A file reaching its end stops an active recording with it.
    if let Some(source) = &mut model.source {
        if source.poll_ended() && model.capture.is_recording() {
            stop_recording(app, model);
        }
    }

    // Nothing published yet: keep the schedule but skip drawing this tick
    let audio = match model.frames.as_ref().and_then(|cell| cell.latest()) {
        Some(frame) => frame,
        None => return,
    };

    let window = app.main_window();
    let device = window.device();
    let queue = window.queue();

    model.engine.ensure_overlays(&window, &model.settings.overlay);

    let rect = model.compositor.rect();
    let scene = model.engine.scene_draw(&audio, &model.settings, rect);
    let deco = model.engine.deco_draw(rect);

    let post = PostPasses {
        glow: model.settings.theme.glow_intensity,
        bloom: model
            .settings
            .post
            .bloom
            .enabled
            .then_some(model.settings.post.bloom.intensity),
        aberration: model
            .settings
            .post
            .chromatic_aberration
            .enabled
            .then_some(model.settings.post.chromatic_aberration.intensity),
    };
    let background = model
        .engine
        .background_texture()
        .map(|texture| BackgroundLayer { texture });

    model
        .compositor
        .composite(device, queue, &scene, &deco, background, &post);

    if model.capture.is_recording() {
        let tx = model.captured_tx.clone();
        model.compositor.capture_frame(device, queue, move |rgba| {
            let _ = tx.send(rgba);
        });
        drain_captured_frames(model);
    }
}

fn drain_captured_frames(model: &mut Model) {
    let tap = match &model.source {
        Some(s) => s.capture_tap(),
        None => return,
    };
    while let Ok(rgba) = model.captured_rx.try_recv() {
        if let Err(e) = model.capture.tick(&rgba, &tap) {
            eprintln!("Recording failed: {}", e);
            model.engine.notify(format!("Recording failed: {}", e));
            let _ = model.capture.stop(&model.settings);
            tap.set_enabled(false);
            break;
        }
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    // Fit the composited frame to the window, letterboxing as needed
    let [cw, ch] = model.compositor.size();
    let win = app.window_rect();
    let scale = (win.w() / cw as f32).min(win.h() / ch as f32);
    draw.texture(model.compositor.frame_texture())
        .w_h(cw as f32 * scale, ch as f32 * scale);

    draw.to_frame(app, &frame).unwrap();
}

fn window_event(app: &App, model: &mut Model, event: WindowEvent) {
    match event {
        DroppedFile(path) => {
            open_file(app, model, path);
        }
        Resized(_) => {
            // Preview follows the export aspect unless a recording pinned
            // the surface to the full export resolution.
            if !model.capture.is_recording() {
                resize_surface(app, model, false);
            }
        }
        _ => {}
    }
}

fn open_file(app: &App, model: &mut Model, path: PathBuf) {
    if model.capture.is_recording() {
        stop_recording(app, model);
    }
    match AudioSourceAdapter::file(&path, &model.config) {
        Ok(source) => {
            model
                .engine
                .notify(format!("Playing: {}", source.description()));
            let analyzer = SpectralAnalyzer::spawn(source.analysis_tap());
            model.frames = Some(analyzer.frames());
            model.analyzer = Some(analyzer);
            model.source = Some(source);
        }
        Err(e) => {
            eprintln!("Could not open {}: {}", path.display(), e);
            model.engine.notify(format!("Could not open file: {}", e));
        }
    }
}

fn switch_to_mic(model: &mut Model) {
    match AudioSourceAdapter::mic(&model.config) {
        Ok(source) => {
            if let Some(name) = source.device_name() {
                model.config.set_device(name);
            }
            model
                .engine
                .notify(format!("Source: {}", source.description()));
            let analyzer = SpectralAnalyzer::spawn(source.analysis_tap());
            model.frames = Some(analyzer.frames());
            model.analyzer = Some(analyzer);
            model.source = Some(source);
        }
        Err(e) => {
            eprintln!("Microphone unavailable: {}", e);
            model.engine.notify(format!("Microphone: {}", e));
        }
    }
}

fn resize_surface(app: &App, model: &mut Model, recording: bool) {
    let (w, h) = surface_dimensions(&model.settings.export.resolution, recording);
    let window = app.main_window();
    model.compositor.resize(window.device(), [w, h]);
}

fn start_recording(app: &App, model: &mut Model) {
    let source = match &model.source {
        Some(s) => s,
        None => {
            model.engine.notify("Cannot record without an audio source");
            return;
        }
    };

    let (w, h) = parse_resolution(&model.settings.export.resolution).unwrap_or((1920, 1080));
    let job = ExportJob {
        width: w,
        height: h,
        frame_rate: model.settings.export.frame_rate,
        bitrate_mbps: model.settings.export.bitrate_mbps,
        audio_sample_rate: source.sample_rate(),
    };

    match model.capture.start(job, &model.settings) {
        Ok(mime) => {
            source.capture_tap().set_enabled(true);
            resize_surface(app, model, true);
            model.engine.notify(format!("Recording ({})", mime));
        }
        Err(e) => {
            eprintln!("Could not start recording: {}", e);
            model.engine.notify(format!("Recording: {}", e));
        }
    }
}

fn stop_recording(app: &App, model: &mut Model) {
    let window = app.main_window();

    // Flush in-flight GPU readbacks before finishing the encoder
    model.compositor.await_captures(window.device());
    drain_captured_frames(model);

    if let Some(source) = &model.source {
        source.capture_tap().set_enabled(false);
    }

    if model.capture.is_recording() {
        match model.capture.stop(&model.settings) {
            Ok(path) => model.engine.notify(format!("Saved: {}", path.display())),
            Err(e) => {
                eprintln!("Recording not saved: {}", e);
                model.engine.notify(format!("Recording not saved: {}", e));
            }
        }
    }
    resize_surface(app, model, false);
}

fn key_pressed(app: &App, model: &mut Model, key: Key) {
    match key {
        Key::Q => {
            if model.capture.is_recording() {
                stop_recording(app, model);
            }
            app.quit();
        }
        Key::Space => {
            if let Some(source) = &mut model.source {
                source.toggle_playback();
                if source.is_file() {
                    let label = if source.is_playing() {
                        "Playing"
                    } else {
                        "Paused"
                    };
                    model.engine.notify(label);
                }
            }
        }
        Key::S => {
            let style = if app.keys.mods.shift() {
                model.engine.style().prev()
            } else {
                model.engine.style().next()
            };
            model.engine.set_style(style);
            model.settings.style = style;
            model.engine.notify(style.name());
        }
        Key::R => {
            if let Some(source) = &mut model.source {
                if source.is_file() {
                    source.restart();
                    model.engine.notify("Restarted");
                }
            }
        }
        Key::M => switch_to_mic(model),
        Key::E => {
            if model.capture.is_recording() {
                stop_recording(app, model);
            } else {
                start_recording(app, model);
            }
        }
        Key::C => {
            model.config.settings = Some(model.settings.clone());
            if let Some(name) = model.source.as_ref().and_then(|s| s.device_name()) {
                model.config.last_device = Some(name.to_string());
            }
            model.config.save();
            model.engine.notify("Settings saved");
        }
        Key::B => {
            model.settings.post.bloom.enabled = !model.settings.post.bloom.enabled;
            let label = if model.settings.post.bloom.enabled {
                "Bloom on"
            } else {
                "Bloom off"
            };
            model.engine.notify(label);
        }
        Key::A => {
            let ca = &mut model.settings.post.chromatic_aberration;
            ca.enabled = !ca.enabled;
            let label = if ca.enabled {
                "Chromatic aberration on"
            } else {
                "Chromatic aberration off"
            };
            model.engine.notify(label);
        }
        Key::D => AudioSourceAdapter::list_devices(),
        _ => {
            // Digit keys pick an input device from the startup listing
            if let Some(idx) = digit_index(key) {
                let names = AudioSourceAdapter::input_device_names();
                match names.get(idx) {
                    Some(name) => {
                        model.config.last_device = Some(name.clone());
                        switch_to_mic(model);
                    }
                    None => model.engine.notify(format!("No device [{}]", idx)),
                }
            }
        }
    }
}

fn digit_index(key: Key) -> Option<usize> {
    match key {
        Key::Key0 => Some(0),
        Key::Key1 => Some(1),
        Key::Key2 => Some(2),
        Key::Key3 => Some(3),
        Key::Key4 => Some(4),
        Key::Key5 => Some(5),
        Key::Key6 => Some(6),
        Key::Key7 => Some(7),
        Key::Key8 => Some(8),
        Key::Key9 => Some(9),
        _ => None,
    }
}
