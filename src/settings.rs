//! The per-tick configuration snapshot.
//!
//! Everything the render engine and the export capture read is collected in
//! [`Settings`]. The snapshot is owned by the app model, mutated only by the
//! outer control layer (keys, config load, AI suggestions) and read by the
//! engine once per tick. There is no reactivity inside the core.

use serde::{Deserialize, Serialize};

use crate::render::styles::StyleId;

/// Longest preview edge; full resolution is only used while recording.
const MAX_PREVIEW_EDGE: u32 = 1920;

pub type Color = [u8; 3];

/// Parses a `#RRGGBB` hex string, as delivered by the suggestion service.
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.strip_prefix('#')?;
    if s.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Aesthetic parameters applied to whichever style is active.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeParams {
    pub name: String,
    pub primary_color: Color,
    pub secondary_color: Color,
    /// Audio response multiplier, roughly 0.1..3.0.
    pub sensitivity: f32,
    pub line_width: f32,
    /// Alpha of the per-tick fade rect; lower values leave longer trails.
    pub background_fade: f32,
    /// Glow halo size in pixels, 0 disables.
    pub glow_intensity: f32,
}

impl Default for ThemeParams {
    fn default() -> Self {
        Self {
            name: "neon".to_string(),
            primary_color: [0, 255, 170],
            secondary_color: [170, 0, 255],
            sensitivity: 1.0,
            line_width: 3.0,
            background_fade: 0.2,
            glow_intensity: 5.0,
        }
    }
}

/// Position/scale/rotation applied around the surface center.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformParams {
    /// 0..100, 50 is centered.
    pub position_x: f32,
    /// 0..100, 50 is centered.
    pub position_y: f32,
    /// 0.1..2.0.
    pub scale: f32,
    /// Degrees, -180..180.
    pub rotation: f32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            position_x: 50.0,
            position_y: 50.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextOverlay {
    pub content: String,
    pub color: Color,
    pub font_size: u32,
    pub shadow_blur: f32,
    /// 0..100 of surface width.
    pub position_x: f32,
    /// 0..100 of surface height.
    pub position_y: f32,
    pub pulse_on_beat: bool,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            content: String::new(),
            color: [255, 255, 255],
            font_size: 48,
            shadow_blur: 10.0,
            position_x: 50.0,
            position_y: 90.0,
            pulse_on_beat: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogoOverlay {
    pub path: Option<String>,
    /// Logo height in pixels; width follows the image aspect.
    pub size: f32,
    pub opacity: f32,
}

impl Default for LogoOverlay {
    fn default() -> Self {
        Self {
            path: None,
            size: 80.0,
            opacity: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackgroundOverlay {
    pub path: Option<String>,
    pub opacity: f32,
    pub blur: f32,
}

impl Default for BackgroundOverlay {
    fn default() -> Self {
        Self {
            path: None,
            opacity: 1.0,
            blur: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub text: TextOverlay,
    pub logo: LogoOverlay,
    pub background: BackgroundOverlay,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomConfig {
    pub enabled: bool,
    /// 0..20.
    pub intensity: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChromaticAberrationConfig {
    pub enabled: bool,
    /// Horizontal offset in pixels, 0..10.
    pub intensity: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostProcessConfig {
    pub bloom: BloomConfig,
    pub chromatic_aberration: ChromaticAberrationConfig,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            bloom: BloomConfig {
                enabled: true,
                intensity: 5.0,
            },
            chromatic_aberration: ChromaticAberrationConfig {
                enabled: false,
                intensity: 1.0,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionStyle {
    Burst,
    Fountain,
    Rain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleShape {
    Circle,
    Square,
    Line,
    Star,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleColoring {
    Primary,
    Secondary,
    /// Interpolate primary -> secondary by spent lifetime.
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactiveProperty {
    None,
    Size,
    Speed,
}

/// Knobs of the fully user-configurable particle style.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomParticleParams {
    pub emission_style: EmissionStyle,
    pub particle_shape: ParticleShape,
    /// 1..10, scales the spawn rate.
    pub particle_count: f32,
    /// 1..10.
    pub particle_speed: f32,
    /// -5..5.
    pub gravity: f32,
    /// -5..5.
    pub wind: f32,
    /// 1..10.
    pub size: f32,
    /// 1..10, relative lifetime.
    pub lifespan: f32,
    pub audio_reactive_property: ReactiveProperty,
    pub wavy_movement: bool,
    pub coloring: ParticleColoring,
}

impl Default for CustomParticleParams {
    fn default() -> Self {
        Self {
            emission_style: EmissionStyle::Burst,
            particle_shape: ParticleShape::Circle,
            particle_count: 5.0,
            particle_speed: 3.0,
            gravity: 0.0,
            wind: 0.0,
            size: 4.0,
            lifespan: 5.0,
            audio_reactive_property: ReactiveProperty::Size,
            wavy_movement: false,
            coloring: ParticleColoring::Mixed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Vp9,
    Vp8,
    H264,
    Av1,
}

impl Codec {
    pub const ALL: [Codec; 4] = [Codec::Vp9, Codec::Vp8, Codec::H264, Codec::Av1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Vp9 => "vp9",
            Codec::Vp8 => "vp8",
            Codec::H264 => "h264",
            Codec::Av1 => "av1",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Webm,
    Mp4,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Webm => "webm",
            Container::Mp4 => "mp4",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportSettings {
    /// "WxH", e.g. "1920x1080".
    pub resolution: String,
    pub frame_rate: u32,
    pub codec: Codec,
    pub container: Container,
    /// Target video bitrate in Mbps.
    pub bitrate_mbps: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            resolution: "1920x1080".to_string(),
            frame_rate: 30,
            codec: Codec::Vp9,
            container: Container::Webm,
            bitrate_mbps: 8,
        }
    }
}

/// The whole immutable-per-tick snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    pub style: StyleId,
    pub theme: ThemeParams,
    pub transform: TransformParams,
    pub overlay: OverlayConfig,
    pub post: PostProcessConfig,
    pub custom_particles: CustomParticleParams,
    pub export: ExportSettings,
}

/// Shape returned by the AI suggestion service. The core only merges it.
#[derive(Clone, Debug, Deserialize)]
pub struct SuggestedSettings {
    pub style: StyleId,
    pub primary_color: String,
    pub secondary_color: String,
    pub sensitivity: f32,
    pub line_width: f32,
    pub background_fade: f32,
    pub glow_intensity: f32,
    pub text_content: String,
    pub image_prompt: String,
}

impl Settings {
    /// Merges a suggestion field-wise into the live snapshot. Unparseable
    /// colors are ignored rather than erroring; the rest still applies.
    pub fn apply_suggestion(&mut self, s: &SuggestedSettings) {
        self.style = s.style;
        if let Some(c) = parse_hex_color(&s.primary_color) {
            self.theme.primary_color = c;
        }
        if let Some(c) = parse_hex_color(&s.secondary_color) {
            self.theme.secondary_color = c;
        }
        self.theme.sensitivity = s.sensitivity;
        self.theme.line_width = s.line_width;
        self.theme.background_fade = s.background_fade;
        self.theme.glow_intensity = s.glow_intensity;
        self.overlay.text.content = s.text_content.clone();
    }

    /// `visualizer-{style}-{theme}-{YYYYMMDD}.{format}`
    pub fn export_filename(&self) -> String {
        format!(
            "visualizer-{}-{}-{}.{}",
            self.style.slug(),
            slugify(&self.theme.name),
            today_yyyymmdd(),
            self.export.container.extension(),
        )
    }
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "theme".to_string()
    } else {
        slug
    }
}

pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Pixel dimensions of the render surface. While a recording is active the
/// requested export resolution is used verbatim; otherwise the long edge is
/// capped for preview performance, preserving aspect ratio.
pub fn surface_dimensions(resolution: &str, recording: bool) -> (u32, u32) {
    let (w, h) = parse_resolution(resolution).unwrap_or((1280, 720));
    if recording {
        return (w, h);
    }
    let long_edge = w.max(h);
    if long_edge <= MAX_PREVIEW_EDGE {
        return (w, h);
    }
    let scale = MAX_PREVIEW_EDGE as f64 / long_edge as f64;
    (
        ((w as f64 * scale).round() as u32).max(1),
        ((h as f64 * scale).round() as u32).max(1),
    )
}

fn today_yyyymmdd() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    yyyymmdd_from_unix(secs)
}

/// Civil-date conversion from days since the Unix epoch.
fn yyyymmdd_from_unix(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{:04}{:02}{:02}", y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_resolution_is_capped_on_long_edge() {
        assert_eq!(surface_dimensions("1920x1080", false), (1920, 1080));
        assert_eq!(surface_dimensions("3840x2160", false), (1920, 1080));
        // Portrait: the long edge is the height.
        assert_eq!(surface_dimensions("2160x3840", false), (1080, 1920));
    }

    #[test]
    fn recording_uses_full_resolution() {
        assert_eq!(surface_dimensions("1920x1080", true), (1920, 1080));
        assert_eq!(surface_dimensions("3840x2160", true), (3840, 2160));
    }

    #[test]
    fn bad_resolution_falls_back() {
        assert_eq!(surface_dimensions("garbage", false), (1280, 720));
        assert_eq!(surface_dimensions("0x100", false), (1280, 720));
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#00ffAA"), Some([0, 255, 170]));
        assert_eq!(parse_hex_color("00ffaa"), None);
        assert_eq!(parse_hex_color("#00ffa"), None);
    }

    #[test]
    fn filename_is_templated() {
        let mut settings = Settings::default();
        settings.style = StyleId::NeonTunnel;
        settings.theme.name = "Deep Space".to_string();
        let name = settings.export_filename();
        assert!(name.starts_with("visualizer-neon-tunnel-deep-space-"));
        assert!(name.ends_with(".webm"));
        // visualizer-neon-tunnel-deep-space-YYYYMMDD.webm
        let date = name
            .trim_end_matches(".webm")
            .rsplit('-')
            .next()
            .unwrap_or("");
        assert_eq!(date.len(), 8);
    }

    #[test]
    fn civil_date_conversion() {
        // 2024-01-01 00:00:00 UTC
        assert_eq!(yyyymmdd_from_unix(1_704_067_200), "20240101");
        // 1970-01-01
        assert_eq!(yyyymmdd_from_unix(0), "19700101");
        // 2000-02-29 (leap day), 951782400
        assert_eq!(yyyymmdd_from_unix(951_782_400), "20000229");
    }

    #[test]
    fn suggestion_merges_field_wise() {
        let mut settings = Settings::default();
        let suggestion = SuggestedSettings {
            style: StyleId::Galaxy,
            primary_color: "#112233".to_string(),
            secondary_color: "not-a-color".to_string(),
            sensitivity: 1.5,
            line_width: 2.0,
            background_fade: 0.4,
            glow_intensity: 12.0,
            text_content: "Night Drive".to_string(),
            image_prompt: "nebula over a highway".to_string(),
        };
        let before_secondary = settings.theme.secondary_color;
        settings.apply_suggestion(&suggestion);
        assert_eq!(settings.style, StyleId::Galaxy);
        assert_eq!(settings.theme.primary_color, [0x11, 0x22, 0x33]);
        assert_eq!(settings.theme.secondary_color, before_secondary);
        assert_eq!(settings.overlay.text.content, "Night Drive");
        assert_eq!(settings.theme.glow_intensity, 12.0);
    }
}
