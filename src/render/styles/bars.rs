//! Bottom-anchored and mirrored bar styles.

use nannou::prelude::*;

use super::{mix, solid, DrawState, StyleCtx};

/// Classic frequency bars rising from the bottom edge. Treble widens the
/// bars, bass boosts the low-frequency end.
pub fn bars(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;

    let width_mod = 1.0 + ctx.audio.treble * 0.5 * sens;
    let slot = w / n as f32;
    let bar_w = (slot - 2.0).max(1.0);

    for (i, &value) in bins.iter().enumerate() {
        let low_freq = (i as f32) < n as f32 * 0.15;
        let bass_boost = if low_freq {
            1.0 + ctx.audio.bass * 1.5 * sens
        } else {
            1.0
        };

        let bar_h = (value * value * h * sens * bass_boost).max(bar_w);
        if bar_h <= bar_w {
            continue;
        }

        let x = ctx.rect.left() + slot * i as f32 + slot / 2.0;
        let bottom = ctx.rect.bottom();
        // Vertical gradient: secondary at the base, towards primary higher up
        let top_color = mix(
            ctx.opts.secondary,
            ctx.opts.primary,
            (bar_h / h).clamp(0.0, 1.0),
        );
        draw.polyline()
            .weight(bar_w * width_mod)
            .caps_round()
            .points_colored([
                (pt2(x, bottom), solid(ctx.opts.secondary, 1.0)),
                (pt2(x, bottom + bar_h), solid(top_color, 1.0)),
            ]);
    }
}

const PEAK_FALL: f32 = 2.0;

/// Mirrored equalizer with white peak caps that fall back slowly.
pub fn equalizer(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let half = h / 2.0;

    if state.peaks.len() != n {
        state.peaks = vec![0.0; n];
    }

    let bar_w = w / n as f32;
    for (i, &value) in bins.iter().enumerate() {
        let bar_h = (value * sens * half).min(half);

        if bar_h > state.peaks[i] {
            state.peaks[i] = bar_h;
        } else {
            state.peaks[i] = (state.peaks[i] - PEAK_FALL).max(0.0);
        }

        let x = ctx.rect.left() + bar_w * i as f32 + bar_w / 2.0;
        let color = solid(
            mix(ctx.opts.secondary, ctx.opts.primary, bar_h / half),
            1.0,
        );
        for dir in [1.0, -1.0] {
            draw.rect()
                .x_y(x, dir * bar_h / 2.0)
                .w_h(bar_w - 1.0, bar_h.max(0.01))
                .color(color);
        }

        if state.peaks[i] > 0.0 {
            let cap = solid([255, 255, 255], 0.5);
            for dir in [1.0, -1.0] {
                draw.rect()
                    .x_y(x, dir * (state.peaks[i] + 2.0))
                    .w_h(bar_w - 1.0, 2.0)
                    .color(cap);
            }
        }
    }
}

/// Perspective skyline mirrored around a vanishing point at the center.
/// Building heights keep their own smoothing so the skyline settles slowly.
pub fn metropolis(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    // The skyline runs its own response curve, so it works from the raw
    // spectrum rather than the pre-smoothed bins
    let bins = &ctx.audio.raw_bins;
    let count = bins.len() / 2;
    let sens = ctx.opts.sensitivity;

    // 40% down from the top edge
    let horizon = ctx.rect.top() - h * 0.4;
    let sky = h * 0.6;

    if state.building_heights.len() != count {
        state.building_heights = vec![0.0; count];
    }

    let building_w = w / count as f32;
    for i in 0..count {
        let target = (bins[i] as f32 / 255.0).powi(3) * sky * sens;
        state.building_heights[i] += (target - state.building_heights[i]) * 0.2;
        let bh = state.building_heights[i];
        if bh < 1.0 {
            continue;
        }

        let taper = 1.0 - (i as f32 / count as f32) * 0.8;
        let ph = bh * taper;

        for dir in [-1.0f32, 1.0] {
            let x1 = dir * (i as f32 * building_w) / 2.0;
            let x2 = dir * ((i + 1) as f32 * building_w) / 2.0;

            // Slanted roof face
            draw.quad()
                .points(
                    pt2(x2, horizon),
                    pt2(x2, horizon + ph),
                    pt2(x1, horizon + ph * 0.9),
                    pt2(x1, horizon),
                )
                .color(solid(ctx.opts.secondary, 1.0));

            // Front face
            draw.rect()
                .x_y((x1 + x2) / 2.0, horizon + ph * 0.45)
                .w_h((x2 - x1).abs(), ph * 0.9)
                .color(solid(ctx.opts.primary, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::render::styles::DrawOptions;
    use crate::settings::Settings;

    #[test]
    fn equalizer_peaks_rise_then_fall() {
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();

        let mut loud = AudioFrame::default();
        loud.bins = [0.8; crate::audio::NUM_BINS];
        let ctx = StyleCtx {
            audio: &loud,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 0,
            opts: &opts,
        };
        equalizer(&Draw::new(), &ctx, &mut state);
        let peak_after_hit = state.peaks[0];
        assert!(peak_after_hit > 100.0);

        let silent = AudioFrame::default();
        let ctx = StyleCtx {
            audio: &silent,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 1,
            opts: &opts,
        };
        equalizer(&Draw::new(), &ctx, &mut state);
        assert!((peak_after_hit - state.peaks[0] - PEAK_FALL).abs() < 1e-3);
    }

    #[test]
    fn metropolis_heights_settle_gradually() {
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();
        let mut loud = AudioFrame::default();
        loud.raw_bins = [255; crate::audio::NUM_BINS];
        let ctx = StyleCtx {
            audio: &loud,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 0,
            opts: &opts,
        };
        metropolis(&Draw::new(), &ctx, &mut state);
        let first = state.building_heights[0];
        metropolis(&Draw::new(), &ctx, &mut state);
        assert!(state.building_heights[0] > first);
        // Still short of the instantaneous target
        assert!(state.building_heights[0] < 600.0 * 0.6);
    }

    #[test]
    fn metropolis_tracks_raw_bins_not_smoothed() {
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();

        // A hot raw spectrum raises the skyline even with the smoothed
        // bins still at zero
        let mut hot = AudioFrame::default();
        hot.raw_bins = [255; crate::audio::NUM_BINS];
        let ctx = StyleCtx {
            audio: &hot,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 0,
            opts: &opts,
        };
        metropolis(&Draw::new(), &ctx, &mut state);
        assert!(state.building_heights[0] > 0.0);

        // Smoothed bins alone move nothing
        let mut state = DrawState::default();
        let mut stale = AudioFrame::default();
        stale.bins = [1.0; crate::audio::NUM_BINS];
        let ctx = StyleCtx {
            audio: &stale,
            rect: Rect::from_w_h(800.0, 600.0),
            frame: 0,
            opts: &opts,
        };
        metropolis(&Draw::new(), &ctx, &mut state);
        assert_eq!(state.building_heights[0], 0.0);
    }
}
