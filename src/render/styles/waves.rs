//! Horizontal wave styles.

use nannou::prelude::*;
use rand::Rng;

use super::{solid, DrawState, StyleCtx};

/// Spectrum drawn as a floating waveform with a fading reflection below.
pub fn wave(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let mut rng = rand::rng();

    // Mids float the whole wave, bass thickens the stroke
    let float_offset = (ctx.frame as f32 * 0.02).sin() * 20.0 + ctx.audio.mid * 50.0 * sens;
    let weight = ctx.opts.line_width + ctx.audio.bass * ctx.opts.line_width * 2.0 * sens;

    let slice = w / (n - 1) as f32;
    let heights: Vec<f32> = bins
        .iter()
        .map(|&bin| {
            let v = bin.powf(1.5) * sens;
            let jitter = (rng.random::<f32>() - 0.5) * ctx.audio.treble * 15.0 * sens;
            v * (h / 2.0 * 0.9) + jitter
        })
        .collect();

    let main = heights.iter().enumerate().map(|(i, &y)| {
        pt2(ctx.rect.left() + i as f32 * slice, -float_offset + y)
    });
    draw.polyline()
        .weight(weight)
        .points(main)
        .color(solid(ctx.opts.primary, 1.0));

    // Reflection fades with depth below the wave
    let reflected = heights.iter().enumerate().map(|(i, &y)| {
        let py = -float_offset - y;
        let depth = (y / (h / 2.0)).clamp(0.0, 1.0);
        let alpha = 0.5 * (1.0 - depth * 0.8);
        (
            pt2(ctx.rect.left() + i as f32 * slice, py),
            solid(ctx.opts.secondary, alpha),
        )
    });
    draw.polyline().weight(weight).points_colored(reflected);
}

/// One drifting curtain of the aurora.
pub struct AuroraBand {
    pub y: f32,
    pub color: crate::settings::Color,
    pub amp: f32,
    pub freq: f32,
    pub offset: f32,
}

const AURORA_BANDS: usize = 5;

/// Layered translucent curtains; bass swells them, treble shimmers.
pub fn aurora(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let sens = ctx.opts.sensitivity;
    let mut rng = rand::rng();

    if state.aurora_bands.is_empty() {
        state.aurora_bands = (0..AURORA_BANDS)
            .map(|i| AuroraBand {
                y: ctx.rect.top() - (h * 0.3 + i as f32 * h * 0.12),
                color: if i % 2 == 0 {
                    ctx.opts.primary
                } else {
                    ctx.opts.secondary
                },
                amp: 20.0 + rng.random::<f32>() * 30.0,
                freq: 0.01 + rng.random::<f32>() * 0.02,
                offset: rng.random::<f32>() * 100.0,
            })
            .collect();
    }

    let time = ctx.frame as f32;
    for band in &state.aurora_bands {
        let mut points = vec![pt2(ctx.rect.left(), ctx.rect.bottom())];
        let steps = (w / 8.0) as usize;
        for s in 0..=steps {
            let x = ctx.rect.left() + s as f32 * 8.0;
            let wave = (x * band.freq + time * 0.01 + band.offset).sin()
                * band.amp
                * (1.0 + ctx.audio.bass * sens);
            let shimmer = (x * 0.1 + time * 0.05).sin() * 10.0 * ctx.audio.treble;
            points.push(pt2(x, band.y + wave + shimmer));
        }
        points.push(pt2(ctx.rect.right(), ctx.rect.bottom()));

        draw.polygon()
            .points(points)
            .color(solid(band.color, 0.3));
    }
}

/// Five vibrating strings, displaced by the spectrum under them.
pub fn string_theory(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let strings = 5;

    for i in 0..strings {
        let y0 = ctx.rect.top() - h / (strings + 1) as f32 * (i + 1) as f32;
        let color = if i % 2 == 1 {
            ctx.opts.primary
        } else {
            ctx.opts.secondary
        };

        let steps = (w / 4.0) as usize;
        let points = (0..=steps).map(|s| {
            let x = ctx.rect.left() + s as f32 * 4.0;
            let frac = (s as f32 * 4.0 / w).min(1.0);
            let value = bins[((frac * n as f32) as usize).min(n - 1)] * ctx.opts.sensitivity;
            let y = y0 + (x * 0.02 + ctx.frame as f32 * 0.05 + i as f32).sin() * 20.0 * value;
            pt2(x, y)
        });

        draw.polyline()
            .weight(ctx.opts.line_width)
            .points(points)
            .color(solid(color, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::render::styles::DrawOptions;
    use crate::settings::Settings;

    #[test]
    fn aurora_seeds_bands_once() {
        let audio = AudioFrame::default();
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();
        let ctx = StyleCtx {
            audio: &audio,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 0,
            opts: &opts,
        };

        aurora(&Draw::new(), &ctx, &mut state);
        assert_eq!(state.aurora_bands.len(), AURORA_BANDS);
        let first_amp = state.aurora_bands[0].amp;
        aurora(&Draw::new(), &ctx, &mut state);
        assert_eq!(state.aurora_bands[0].amp, first_amp);
    }
}
