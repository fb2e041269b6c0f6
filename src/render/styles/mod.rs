//! Style registry.
//!
//! Every visual style is a plain function drawing one tick of the scene from
//! the current audio frame. Stateful styles keep their particles and peaks in
//! [`DrawState`], which the engine resets whenever the style changes.

use nannou::prelude::*;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;
use crate::settings::{Color, CustomParticleParams, Settings};

mod bars;
mod custom;
mod geometry;
mod glitch;
mod particles;
mod radial;
mod waves;

pub use custom::CustomParticle;
pub use particles::{GalaxyParticle, OrbitParticle, PlasmaBlob, Raindrop, Splash, Star};
pub use waves::AuroraBand;

/// Theme parameters resolved for one draw call.
pub struct DrawOptions {
    pub primary: Color,
    pub secondary: Color,
    pub sensitivity: f32,
    pub line_width: f32,
    pub custom: CustomParticleParams,
}

impl DrawOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            primary: settings.theme.primary_color,
            secondary: settings.theme.secondary_color,
            sensitivity: settings.theme.sensitivity,
            line_width: settings.theme.line_width,
            custom: settings.custom_particles.clone(),
        }
    }
}

/// Everything a style function reads.
pub struct StyleCtx<'a> {
    pub audio: &'a AudioFrame,
    pub rect: Rect,
    /// Monotonic tick counter driving time-based motion.
    pub frame: u64,
    pub opts: &'a DrawOptions,
}

impl<'a> StyleCtx<'a> {
    pub fn w(&self) -> f32 {
        self.rect.w()
    }

    pub fn h(&self) -> f32 {
        self.rect.h()
    }
}

/// Retained state of the stateful styles. One bag with a field per concern;
/// styles lazily seed the fields they use. Discarded on style switch so no
/// stale particles leak across styles.
#[derive(Default)]
pub struct DrawState {
    pub custom_particles: Vec<CustomParticle>,
    pub peaks: Vec<f32>,
    pub building_heights: Vec<f32>,
    pub drops: Vec<Raindrop>,
    pub splashes: Vec<Splash>,
    pub aurora_bands: Vec<AuroraBand>,
    pub stars: Vec<Star>,
    pub vortex: Vec<OrbitParticle>,
    pub galaxy: Vec<GalaxyParticle>,
    pub plasma: Vec<PlasmaBlob>,
}

pub type DrawFn = fn(&Draw, &StyleCtx, &mut DrawState);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleId {
    #[default]
    Bars,
    Circle,
    Wave,
    NeonTunnel,
    Particles,
    Grid,
    RadialBars,
    Flower,
    Spiral,
    CosmicPulse,
    RetroSun,
    Equalizer,
    Spiro,
    Rain,
    Aurora,
    Starfield,
    Kaleidoscope,
    Blob,
    Cubic,
    Vortex,
    StringTheory,
    Galaxy,
    Plasma,
    Metropolis,
    DnaHelix,
    Sunburst,
    Glitch,
    Custom,
}

impl StyleId {
    pub const ALL: [StyleId; 28] = [
        StyleId::Bars,
        StyleId::Circle,
        StyleId::Wave,
        StyleId::NeonTunnel,
        StyleId::Particles,
        StyleId::Grid,
        StyleId::RadialBars,
        StyleId::Flower,
        StyleId::Spiral,
        StyleId::CosmicPulse,
        StyleId::RetroSun,
        StyleId::Equalizer,
        StyleId::Spiro,
        StyleId::Rain,
        StyleId::Aurora,
        StyleId::Starfield,
        StyleId::Kaleidoscope,
        StyleId::Blob,
        StyleId::Cubic,
        StyleId::Vortex,
        StyleId::StringTheory,
        StyleId::Galaxy,
        StyleId::Plasma,
        StyleId::Metropolis,
        StyleId::DnaHelix,
        StyleId::Sunburst,
        StyleId::Glitch,
        StyleId::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StyleId::Bars => "Bars",
            StyleId::Circle => "Circle",
            StyleId::Wave => "Wave",
            StyleId::NeonTunnel => "Neon Tunnel",
            StyleId::Particles => "Particles",
            StyleId::Grid => "Grid",
            StyleId::RadialBars => "Radial Bars",
            StyleId::Flower => "Flower",
            StyleId::Spiral => "Spiral",
            StyleId::CosmicPulse => "Cosmic Pulse",
            StyleId::RetroSun => "Retro Sun",
            StyleId::Equalizer => "Equalizer",
            StyleId::Spiro => "Spiro",
            StyleId::Rain => "Rain",
            StyleId::Aurora => "Aurora",
            StyleId::Starfield => "Starfield",
            StyleId::Kaleidoscope => "Kaleidoscope",
            StyleId::Blob => "Blob",
            StyleId::Cubic => "Cubic",
            StyleId::Vortex => "Vortex",
            StyleId::StringTheory => "String Theory",
            StyleId::Galaxy => "Galaxy",
            StyleId::Plasma => "Plasma",
            StyleId::Metropolis => "Metropolis",
            StyleId::DnaHelix => "DNA Helix",
            StyleId::Sunburst => "Sunburst",
            StyleId::Glitch => "Glitch",
            StyleId::Custom => "Custom",
        }
    }

    /// Lowercase identifier used in filenames.
    pub fn slug(&self) -> &'static str {
        match self {
            StyleId::Bars => "bars",
            StyleId::Circle => "circle",
            StyleId::Wave => "wave",
            StyleId::NeonTunnel => "neon-tunnel",
            StyleId::Particles => "particles",
            StyleId::Grid => "grid",
            StyleId::RadialBars => "radial-bars",
            StyleId::Flower => "flower",
            StyleId::Spiral => "spiral",
            StyleId::CosmicPulse => "cosmic-pulse",
            StyleId::RetroSun => "retro-sun",
            StyleId::Equalizer => "equalizer",
            StyleId::Spiro => "spiro",
            StyleId::Rain => "rain",
            StyleId::Aurora => "aurora",
            StyleId::Starfield => "starfield",
            StyleId::Kaleidoscope => "kaleidoscope",
            StyleId::Blob => "blob",
            StyleId::Cubic => "cubic",
            StyleId::Vortex => "vortex",
            StyleId::StringTheory => "string-theory",
            StyleId::Galaxy => "galaxy",
            StyleId::Plasma => "plasma",
            StyleId::Metropolis => "metropolis",
            StyleId::DnaHelix => "dna-helix",
            StyleId::Sunburst => "sunburst",
            StyleId::Glitch => "glitch",
            StyleId::Custom => "custom",
        }
    }

    pub fn next(&self) -> StyleId {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> StyleId {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn draw_fn(&self) -> DrawFn {
        match self {
            StyleId::Bars => bars::bars,
            StyleId::Circle => radial::circle,
            StyleId::Wave => waves::wave,
            StyleId::NeonTunnel => geometry::neon_tunnel,
            StyleId::Particles => particles::particles,
            StyleId::Grid => geometry::grid,
            StyleId::RadialBars => radial::radial_bars,
            StyleId::Flower => radial::flower,
            StyleId::Spiral => geometry::spiral,
            StyleId::CosmicPulse => particles::cosmic_pulse,
            StyleId::RetroSun => radial::retro_sun,
            StyleId::Equalizer => bars::equalizer,
            StyleId::Spiro => geometry::spiro,
            StyleId::Rain => particles::rain,
            StyleId::Aurora => waves::aurora,
            StyleId::Starfield => particles::starfield,
            StyleId::Kaleidoscope => geometry::kaleidoscope,
            StyleId::Blob => geometry::blob,
            StyleId::Cubic => geometry::cubic,
            StyleId::Vortex => particles::vortex,
            StyleId::StringTheory => waves::string_theory,
            StyleId::Galaxy => particles::galaxy,
            StyleId::Plasma => particles::plasma,
            StyleId::Metropolis => bars::metropolis,
            StyleId::DnaHelix => geometry::dna_helix,
            StyleId::Sunburst => radial::sunburst,
            StyleId::Glitch => glitch::glitch,
            StyleId::Custom => custom::custom,
        }
    }
}

/// Color with alpha, in linear draw space.
pub(crate) fn solid(c: Color, alpha: f32) -> Srgba {
    srgba(
        c[0] as f32 / 255.0,
        c[1] as f32 / 255.0,
        c[2] as f32 / 255.0,
        alpha,
    )
}

/// Linear interpolation between two theme colors.
pub(crate) fn mix(a: Color, b: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [
        lerp(a[0], b[0]),
        lerp(a[1], b[1]),
        lerp(a[2], b[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx<'a>(audio: &'a AudioFrame, opts: &'a DrawOptions) -> StyleCtx<'a> {
        StyleCtx {
            audio,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 42,
            opts,
        }
    }

    #[test]
    fn every_style_draws_from_cold_state() {
        let mut audio = AudioFrame::default();
        for (i, bin) in audio.bins.iter_mut().enumerate() {
            *bin = (i as f32 / 128.0).sin().abs();
        }
        audio.bass = 0.7;
        audio.mid = 0.4;
        audio.treble = 0.6;
        audio.overall = 0.5;

        let opts = DrawOptions::from_settings(&Settings::default());
        for style in StyleId::ALL {
            let draw = Draw::new();
            let mut state = DrawState::default();
            let ctx = test_ctx(&audio, &opts);
            // Two frames: one to seed state, one to advance it
            (style.draw_fn())(&draw, &ctx, &mut state);
            (style.draw_fn())(&draw, &ctx, &mut state);
        }
    }

    #[test]
    fn every_style_tolerates_silence() {
        let audio = AudioFrame::default();
        let opts = DrawOptions::from_settings(&Settings::default());
        for style in StyleId::ALL {
            let draw = Draw::new();
            let mut state = DrawState::default();
            let ctx = test_ctx(&audio, &opts);
            (style.draw_fn())(&draw, &ctx, &mut state);
        }
    }

    #[test]
    fn style_cycling_visits_all() {
        let mut seen = Vec::new();
        let mut style = StyleId::default();
        for _ in 0..StyleId::ALL.len() {
            seen.push(style);
            style = style.next();
        }
        assert_eq!(style, StyleId::default());
        seen.sort_by_key(|s| s.slug());
        seen.dedup();
        assert_eq!(seen.len(), StyleId::ALL.len());
    }

    #[test]
    fn prev_inverts_next() {
        for style in StyleId::ALL {
            assert_eq!(style.next().prev(), style);
        }
    }

    #[test]
    fn slugs_are_lowercase_and_unique() {
        let mut slugs: Vec<_> = StyleId::ALL.iter().map(|s| s.slug()).collect();
        for slug in &slugs {
            assert_eq!(*slug, slug.to_lowercase());
            assert!(!slug.contains(' '));
        }
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), StyleId::ALL.len());
    }

    #[test]
    fn mix_hits_endpoints() {
        assert_eq!(mix([0, 0, 0], [255, 255, 255], 0.0), [0, 0, 0]);
        assert_eq!(mix([0, 0, 0], [255, 255, 255], 1.0), [255, 255, 255]);
        assert_eq!(mix([0, 100, 200], [200, 100, 0], 0.5), [100, 100, 100]);
    }
}
