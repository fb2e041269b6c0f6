//! Center-out radial styles.

use nannou::prelude::*;

use super::{mix, solid, DrawState, StyleCtx};

/// Ring of spectrum spokes around a steady base circle.
pub fn circle(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let radius = ctx.w().min(ctx.h()) / 4.0;

    draw.ellipse()
        .radius(radius)
        .no_fill()
        .stroke(solid(ctx.opts.primary, 1.0))
        .stroke_weight(ctx.opts.line_width);

    for (i, &bin) in bins.iter().enumerate() {
        let v = bin * ctx.opts.sensitivity;
        let angle = (i as f32 / n as f32) * TAU - TAU / 4.0;
        let dir = vec2(angle.cos(), angle.sin());
        let inner = dir * radius;
        let outer = dir * (radius + v * 100.0);

        draw.polyline()
            .weight(ctx.opts.line_width)
            .points_colored([
                (pt2(inner.x, inner.y), solid(ctx.opts.primary, 1.0)),
                (pt2(outer.x, outer.y), solid(ctx.opts.secondary, 1.0)),
            ]);
    }
}

/// Sparse radial bars, every second bin.
pub fn radial_bars(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let radius = ctx.w().min(ctx.h()) / 5.0;

    for i in (0..n).step_by(2) {
        let value = bins[i] * ctx.opts.sensitivity;
        let bar_h = value * radius * 1.5;
        let angle = (i as f32 / n as f32) * TAU;
        let dir = vec2(angle.cos(), angle.sin());
        let inner = dir * radius;
        let outer = dir * (radius + bar_h);

        draw.polyline()
            .weight(ctx.opts.line_width)
            .points_colored([
                (pt2(inner.x, inner.y), solid(ctx.opts.primary, 1.0)),
                (pt2(outer.x, outer.y), solid(ctx.opts.secondary, 1.0)),
            ]);
    }
}

/// Closed petal outline; bass grows the flower, treble shapes the petals.
pub fn flower(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let sens = ctx.opts.sensitivity;
    let petals = 8.0;
    let radius = ctx.w().min(ctx.h()) / 4.0 + ctx.audio.bass * 50.0 * sens;

    // Close the outline by repeating the first point
    let points = (0..=360).map(|i| {
        let angle = ((i % 360) as f32).to_radians();
        let petal = (angle * petals).sin() * ctx.audio.treble * 50.0 * sens;
        let r = radius + petal;
        // Radial gradient: primary near the center, secondary at the rim
        let t = ((r - radius * 0.2) / (radius * 0.8)).clamp(0.0, 1.0);
        let color = solid(mix(ctx.opts.primary, ctx.opts.secondary, t), 1.0);
        (pt2(r * angle.cos(), r * angle.sin()), color)
    });

    draw.polyline()
        .weight(ctx.opts.line_width)
        .points_colored(points);
}

/// Scrolling horizon grid, a circular equalizer, and a pulsing sun core.
pub fn retro_sun(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let sens = ctx.opts.sensitivity;

    // Horizon lines scroll downwards forever
    let line_spacing = 10.0;
    let scroll = (ctx.frame as f32 * 2.0) % line_spacing;
    let horizon = -50.0;
    for i in 0..20 {
        let y = horizon - (i as f32 * line_spacing) - scroll;
        if y < ctx.rect.bottom() {
            break;
        }
        draw.line()
            .start(pt2(ctx.rect.left(), y))
            .end(pt2(ctx.rect.right(), y))
            .weight(1.0)
            .color(solid(ctx.opts.secondary, 0.25));
    }

    let bars = 64;
    let radius = w.min(h) / 8.0;
    for i in 0..bars {
        let value = bins[(i * 2) % bins.len()] * sens;
        let bar_h = value * radius * 1.2;
        let angle = (i as f32 / bars as f32) * TAU;
        let dir = vec2(angle.cos(), angle.sin());
        let inner = dir * radius;
        let outer = dir * (radius + bar_h);

        draw.polyline()
            .weight(ctx.opts.line_width)
            .points_colored([
                (pt2(inner.x, inner.y), solid(ctx.opts.primary, 1.0)),
                (pt2(outer.x, outer.y), solid(ctx.opts.secondary, 1.0)),
            ]);
    }

    // Sun core, brighter in the middle
    let pulse = radius * (0.8 + ctx.audio.bass * sens * 0.4);
    draw.ellipse()
        .radius(pulse)
        .color(solid(ctx.opts.primary, 0.5));
    draw.ellipse()
        .radius(pulse * 0.6)
        .color(solid(ctx.opts.primary, 0.8));
}

/// Rays shooting out from a small hub, alternating theme colors.
pub fn sunburst(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let num_rays = 72;
    let pulse = 1.0 + ctx.audio.bass * 0.2;

    for i in 0..num_rays {
        let data_index = (i as f32 / num_rays as f32 * n as f32 * 0.8) as usize;
        let value = bins[data_index].powi(2) * ctx.opts.sensitivity;
        let angle = (i as f32 / num_rays as f32) * TAU + ctx.frame as f32 * 0.005;

        let ray_len = value * w.min(h) * 0.4 * pulse;
        if ray_len < 5.0 {
            continue;
        }

        let color = if i % 2 == 0 {
            ctx.opts.primary
        } else {
            ctx.opts.secondary
        };
        let dir = vec2(angle.cos(), angle.sin());
        let inner = dir * 20.0;
        let mid = dir * (20.0 + ray_len * 0.8);
        let outer = dir * (20.0 + ray_len);

        draw.polyline()
            .weight(ctx.opts.line_width * (1.0 + value * 1.5))
            .caps_round()
            .points_colored([
                (pt2(inner.x, inner.y), solid(color, 1.0)),
                (pt2(mid.x, mid.y), solid(color, 0.5)),
                (pt2(outer.x, outer.y), solid(color, 0.0)),
            ]);
    }
}
