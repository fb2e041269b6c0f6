//! Scene rendering.
//!
//! [`RenderEngine`] turns the current audio frame and settings snapshot into
//! the two `Draw` lists the compositor consumes: the style layer (fade,
//! style, logo and text overlays) and the notification layer on top.

pub mod compositor;
pub mod styles;

use nannou::image::GenericImageView;
use nannou::prelude::*;
use nannou::wgpu;

use crate::audio::AudioFrame;
use crate::settings::{BackgroundOverlay, LogoOverlay, OverlayConfig, Settings, TextOverlay};
use styles::{solid, DrawOptions, DrawState, StyleCtx, StyleId};

/// Frames an on-screen notification stays up (~3s at 60fps).
const NOTIFICATION_TTL: u32 = 180;

struct Notification {
    text: String,
    frames_left: u32,
}

struct LoadedImage {
    texture: wgpu::Texture,
    aspect: f32,
    /// Path + bake parameters this texture was built from.
    key: String,
}

pub struct RenderEngine {
    style: StyleId,
    state: DrawState,
    frame_count: u64,
    logo: Option<LoadedImage>,
    background: Option<LoadedImage>,
    notifications: Vec<Notification>,
}

impl RenderEngine {
    pub fn new(style: StyleId) -> Self {
        Self {
            style,
            state: DrawState::default(),
            frame_count: 0,
            logo: None,
            background: None,
            notifications: Vec::new(),
        }
    }

    pub fn style(&self) -> StyleId {
        self.style
    }

    /// Switching styles discards retained particles and peaks so the new
    /// style always starts from a cold state.
    pub fn set_style(&mut self, style: StyleId) {
        if style != self.style {
            self.style = style;
            self.state = DrawState::default();
        }
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        println!("{}", text);
        self.notifications.push(Notification {
            text,
            frames_left: NOTIFICATION_TTL,
        });
    }

    /// Build the style layer for one tick: fade rect, the active style under
    /// the user transform, then the logo and text overlays. The overlays
    /// live on this layer so the fade trails and post passes apply to them.
    pub fn scene_draw(&mut self, audio: &AudioFrame, settings: &Settings, rect: Rect) -> Draw {
        self.frame_count += 1;

        let draw = Draw::new();

        // The fade is what erases previous frames; lower alpha, longer trails
        draw.rect()
            .wh(rect.wh())
            .color(srgba(0.0, 0.0, 0.0, settings.theme.background_fade));

        let t = &settings.transform;
        let tx = (t.position_x - 50.0) / 50.0 * rect.w() / 2.0;
        // Screen-down positive in the settings, y-up here
        let ty = -(t.position_y - 50.0) / 50.0 * rect.h() / 2.0;
        let transformed = draw
            .x_y(tx, ty)
            .scale(t.scale.max(0.01))
            .rotate(-t.rotation.to_radians());

        let opts = DrawOptions::from_settings(settings);
        let ctx = StyleCtx {
            audio,
            rect,
            frame: self.frame_count,
            opts: &opts,
        };
        (self.style.draw_fn())(&transformed, &ctx, &mut self.state);

        // Overlays are screen-anchored, so they go on the untransformed draw
        if let Some(logo) = &self.logo {
            let h = settings.overlay.logo.size;
            let w = h * logo.aspect;
            draw.texture(&logo.texture)
                .x_y(rect.right() - w / 2.0 - 20.0, rect.top() - h / 2.0 - 20.0)
                .w_h(w, h);
        }

        let text = &settings.overlay.text;
        if !text.content.is_empty() {
            let font_size = overlay_font_size(text, audio.bass);
            let x = rect.left() + rect.w() * (text.position_x / 100.0);
            let y = rect.top() - rect.h() * (text.position_y / 100.0);

            // Cheap drop shadow: dark copy behind
            if text.shadow_blur > 0.0 {
                draw.text(&text.content)
                    .font_size(font_size)
                    .x_y(x + 2.0, y - 2.0)
                    .color(srgba(0.0, 0.0, 0.0, 0.8));
            }
            draw.text(&text.content)
                .font_size(font_size)
                .x_y(x, y)
                .color(solid(text.color, 1.0));
        }

        draw
    }

    /// Build the decoration layer: notifications, pinned over the post
    /// passes where trails and glow never touch them.
    pub fn deco_draw(&mut self, rect: Rect) -> Draw {
        let draw = Draw::new();
        self.draw_notifications(&draw, rect);
        draw
    }

    fn draw_notifications(&mut self, draw: &Draw, rect: Rect) {
        let mut y = rect.top() - 40.0;
        for note in &mut self.notifications {
            note.frames_left = note.frames_left.saturating_sub(1);
            let alpha = (note.frames_left as f32 / 60.0).min(1.0);
            draw.text(&note.text)
                .font_size(18)
                .x_y(rect.left() + 160.0, y)
                .w(300.0)
                .left_justify()
                .color(srgba(1.0, 1.0, 1.0, alpha));
            y -= 26.0;
        }
        self.notifications.retain(|n| n.frames_left > 0);
    }

    /// Reload overlay textures when their source path or bake parameters
    /// changed. Opacity and blur are baked into the texture at load time.
    pub fn ensure_overlays(&mut self, window: &Window, overlay: &OverlayConfig) {
        self.logo = Self::refresh(
            self.logo.take(),
            window,
            overlay.logo.path.as_deref(),
            logo_key(&overlay.logo),
            overlay.logo.opacity,
            0.0,
        );
        self.background = Self::refresh(
            self.background.take(),
            window,
            overlay.background.path.as_deref(),
            background_key(&overlay.background),
            overlay.background.opacity,
            overlay.background.blur,
        );
    }

    pub fn background_texture(&self) -> Option<&wgpu::Texture> {
        self.background.as_ref().map(|b| &b.texture)
    }

    fn refresh(
        current: Option<LoadedImage>,
        window: &Window,
        path: Option<&str>,
        key: String,
        opacity: f32,
        blur: f32,
    ) -> Option<LoadedImage> {
        let path = path?;
        if let Some(img) = current {
            if img.key == key {
                return Some(img);
            }
        }
        match load_baked_texture(window, path, opacity, blur) {
            Ok((texture, aspect)) => Some(LoadedImage {
                texture,
                aspect,
                key,
            }),
            Err(e) => {
                eprintln!("Failed to load overlay image {}: {}", path, e);
                None
            }
        }
    }
}

/// Overlay text size with the beat pulse applied.
fn overlay_font_size(text: &TextOverlay, bass: f32) -> u32 {
    let mut size = text.font_size as f32;
    if text.pulse_on_beat {
        size *= 1.0 + bass * 0.3;
    }
    size as u32
}

fn logo_key(logo: &LogoOverlay) -> String {
    format!("{:?}|{}", logo.path, logo.opacity)
}

fn background_key(bg: &BackgroundOverlay) -> String {
    format!("{:?}|{}|{}", bg.path, bg.opacity, bg.blur)
}

/// Load an image with opacity multiplied into the alpha channel. Blur is
/// approximated by downscaling; the linear sampler softens it back up when
/// the texture is stamped at full size.
fn load_baked_texture(
    window: &Window,
    path: &str,
    opacity: f32,
    blur: f32,
) -> Result<(wgpu::Texture, f32), nannou::image::ImageError> {
    let dynamic = nannou::image::open(path)?;
    let (w, h) = dynamic.dimensions();
    let aspect = w as f32 / h.max(1) as f32;

    let mut rgba = dynamic.to_rgba8();
    if opacity < 1.0 {
        for px in rgba.pixels_mut() {
            px.0[3] = (px.0[3] as f32 * opacity.clamp(0.0, 1.0)) as u8;
        }
    }

    let mut image = nannou::image::DynamicImage::ImageRgba8(rgba);
    if blur > 0.0 {
        let factor = 1.0 + blur;
        let dw = ((w as f32 / factor) as u32).max(1);
        let dh = ((h as f32 / factor) as u32).max(1);
        image = image.resize_exact(dw, dh, nannou::image::imageops::FilterType::Triangle);
    }

    let texture = wgpu::Texture::from_image(window, &image);
    Ok((texture, aspect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_switch_discards_retained_state() {
        let mut engine = RenderEngine::new(StyleId::Starfield);
        let audio = AudioFrame::default();
        let settings = Settings::default();
        let rect = Rect::from_w_h(640.0, 480.0);

        // Seed the starfield
        let mut s = settings.clone();
        s.style = StyleId::Starfield;
        engine.scene_draw(&audio, &s, rect);
        assert!(!engine.state.stars.is_empty());

        engine.set_style(StyleId::Vortex);
        assert!(engine.state.stars.is_empty());

        // Re-selecting the same style keeps state
        engine.scene_draw(&audio, &s, rect);
        let count = engine.state.vortex.len();
        engine.set_style(StyleId::Vortex);
        assert_eq!(engine.state.vortex.len(), count);
    }

    #[test]
    fn text_pulse_tracks_bass() {
        let mut text = TextOverlay::default();
        text.font_size = 20;
        text.pulse_on_beat = true;
        assert!(overlay_font_size(&text, 1.0) > overlay_font_size(&text, 0.0));
        assert_eq!(overlay_font_size(&text, 0.0), 20);

        text.pulse_on_beat = false;
        assert_eq!(overlay_font_size(&text, 1.0), 20);
    }

    #[test]
    fn notifications_expire() {
        let mut engine = RenderEngine::new(StyleId::Bars);
        engine.notify("hello");
        let rect = Rect::from_w_h(640.0, 480.0);
        for _ in 0..NOTIFICATION_TTL {
            let draw = Draw::new();
            engine.draw_notifications(&draw, rect);
        }
        assert!(engine.notifications.is_empty());
    }
}
