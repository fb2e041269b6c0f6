//! Geometric and parametric styles.

use nannou::prelude::*;

use super::{mix, radial, solid, DrawState, StyleCtx};

/// Concentric rings racing outwards, paced by the bass pulse.
pub fn neon_tunnel(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let pulse = 1.0 + ctx.audio.bass * ctx.opts.sensitivity * 0.5;
    let span = ctx.w().max(ctx.h());
    let cycle = 20.0 * pulse;

    for i in 0..20 {
        let radius = i as f32 * 20.0 * pulse + (ctx.frame as f32 % cycle);
        let alpha = (1.0 - radius / span).max(0.0);
        if alpha <= 0.004 {
            continue;
        }
        let color = if i % 2 == 0 {
            ctx.opts.primary
        } else {
            ctx.opts.secondary
        };
        draw.ellipse()
            .radius(radius)
            .no_fill()
            .stroke(solid(color, alpha))
            .stroke_weight(ctx.opts.line_width);
    }
}

/// 20x20 grid of squares sized and tinted by their bin.
pub fn grid(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let grid_size = 20;
    let step_x = ctx.w() / grid_size as f32;
    let step_y = ctx.h() / grid_size as f32;

    for i in 0..grid_size {
        for j in 0..grid_size {
            let value = (bins[(i * grid_size + j) % n] * ctx.opts.sensitivity).min(1.0);
            let size = value * step_x.min(step_y) * 0.8;
            if size < 0.5 {
                continue;
            }

            let color = if value > 0.5 {
                ctx.opts.secondary
            } else {
                ctx.opts.primary
            };
            draw.rect()
                .x_y(
                    ctx.rect.left() + i as f32 * step_x + step_x / 2.0,
                    ctx.rect.top() - j as f32 * step_y - step_y / 2.0,
                )
                .w_h(size, size)
                .color(solid(color, value));
        }
    }
}

/// Archimedean spiral; overall energy tightens the winding.
pub fn spiral(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let spin = ctx.frame as f32 * 0.01;
    let tightness = 0.5 + ctx.audio.overall * ctx.opts.sensitivity * 2.0;

    let points = (0..500).map(|i| {
        let angle = 0.1 * i as f32;
        let radius = tightness * angle;
        let color = solid(mix(ctx.opts.primary, ctx.opts.secondary, i as f32 / 500.0), 1.0);
        (
            pt2(
                radius * (angle + spin).cos(),
                radius * (angle + spin).sin(),
            ),
            color,
        )
    });

    draw.polyline()
        .weight(ctx.opts.line_width)
        .points_colored(points);
}

/// Hypotrochoid curve; bass and mids deform the rolling radii.
pub fn spiro(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let sens = ctx.opts.sensitivity;
    let big_r = ctx.w().min(ctx.h()) * 0.3;
    let small_r = big_r * (0.4 + ctx.audio.bass * sens * 0.3);
    let pen = small_r * (0.5 + ctx.audio.mid * sens * 0.4);
    let phase = ctx.frame as f32 * 0.01;
    let ratio = (big_r - small_r) / small_r;

    let steps = (TAU * 5.0 / 0.01) as usize;
    let points = (0..steps).map(|s| {
        let t = s as f32 * 0.01;
        pt2(
            (big_r - small_r) * t.cos() + pen * (ratio * t + phase).cos(),
            (big_r - small_r) * t.sin() - pen * (ratio * t + phase).sin(),
        )
    });

    draw.polyline()
        .weight(ctx.opts.line_width)
        .points(points)
        .color(solid(ctx.opts.primary, 1.0));
}

/// Radial bars repeated through eight mirrored wedges.
pub fn kaleidoscope(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let slices = 8;
    let angle = TAU / slices as f32;

    for i in 0..slices {
        let slice_draw = draw.rotate(i as f32 * angle).scale_x(if i % 2 == 1 {
            1.0
        } else {
            -1.0
        });
        let mut scratch = DrawState::default();
        radial::radial_bars(&slice_draw, ctx, &mut scratch);
    }
}

/// Two breathing metaballs outlined by the spectrum.
pub fn blob(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let base = ctx.w().min(ctx.h()) * 0.2;
    let time = ctx.frame as f32;

    let mut draw_blob = |color: crate::settings::Color, radius_mul: f32, offset: f32| {
        let base_radius = base * radius_mul;
        let points = 16;
        let outline: Vec<Point2> = (0..=points)
            .map(|i| {
                let angle = i as f32 * TAU / points as f32;
                let data_index = (i * n / points) % n;
                let value = bins[data_index] * sens;
                let radius =
                    base_radius + value * 60.0 + (time * 0.05 + i as f32 * 0.5 + offset).sin() * 15.0;
                pt2(radius * angle.cos(), radius * angle.sin())
            })
            .collect();

        // Soft fill: translucent body with a brighter core
        draw.polygon()
            .points(outline.iter().copied())
            .color(solid(color, 0.35));
        draw.polygon()
            .points(outline.iter().map(|p| *p * 0.6))
            .color(solid(color, 0.35));
    };

    draw_blob(ctx.opts.secondary, 1.1, PI);
    draw_blob(ctx.opts.primary, 1.0, 0.0);
}

/// Isometric cube field, each cube lifted by its bin.
pub fn cubic(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let size = 30.0;
    let cols = (ctx.w() / size) as usize;
    let rows = (ctx.h() / size) as usize;
    // Canvas-style coordinates, y growing downwards from the top-left
    let to = |x: f32, y: f32| pt2(ctx.rect.left() + x, ctx.rect.top() - y);

    for i in 0..cols {
        for j in 0..rows {
            let value = bins[(i * j) % n] * ctx.opts.sensitivity;
            let z = value * 100.0;
            let (x, y) = (i as f32 * size + size / 2.0, j as f32 * size + size / 2.0);
            let s = size * 0.8;

            // Top face
            draw.quad()
                .points(
                    to(x, y - z),
                    to(x + s / 2.0, y - s / 4.0 - z),
                    to(x, y - s / 2.0 - z),
                    to(x - s / 2.0, y - s / 4.0 - z),
                )
                .color(solid(ctx.opts.primary, 1.0));

            // Left face
            draw.quad()
                .points(
                    to(x - s / 2.0, y - s / 4.0 - z),
                    to(x, y - s / 2.0 - z),
                    to(x, y - z),
                    to(x - s / 2.0, y + s / 4.0 - z),
                )
                .color(solid(ctx.opts.secondary, 1.0));

            // Right face, darker
            draw.quad()
                .points(
                    to(x, y - s / 2.0 - z),
                    to(x + s / 2.0, y - s / 4.0 - z),
                    to(x + s / 2.0, y + s / 4.0 - z),
                    to(x, y - z),
                )
                .color(solid(mix(ctx.opts.secondary, [0, 0, 0], 0.3), 1.0));
        }
    }
}

/// Double helix with depth-faded strands and spectrum-lit rungs.
pub fn dna_helix(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let rotation = ctx.frame as f32 * 0.01;
    let num_points = 128;
    let amplitude = ctx.w() * 0.15 * (1.0 + ctx.audio.bass * sens * 0.5);
    let stretch = ctx.h() * 0.8;

    let point_at = |i: usize, flip: f32| {
        let t = (i as f32 / (num_points - 1) as f32) * 2.0 - 1.0;
        let y = t * stretch / 2.0;
        let angle = t * 5.0 * PI + rotation + flip;
        (pt2(angle.cos() * amplitude, y), angle.sin())
    };

    let mut draw_strand = |flip: f32, color: crate::settings::Color| {
        for i in 0..num_points - 1 {
            let (p1, z1) = point_at(i, flip);
            let (p2, z2) = point_at(i + 1, flip);
            if z1 > -0.2 || z2 > -0.2 {
                let alpha = (z1 * 0.8 + 0.2).max(0.0);
                draw.line()
                    .start(p1)
                    .end(p2)
                    .weight(ctx.opts.line_width)
                    .color(solid(color, alpha));
            }
        }
    };
    draw_strand(0.0, ctx.opts.primary);
    draw_strand(PI, ctx.opts.secondary);

    for i in (0..num_points).step_by(4) {
        let (p1, z) = point_at(i, 0.0);
        let (p2, _) = point_at(i, PI);
        if z > 0.0 {
            let value = bins[i * n / num_points];
            let alpha = (z * 0.8 + 0.2) * value;
            draw.line()
                .start(p1)
                .end(p2)
                .weight((ctx.opts.line_width * 0.5).max(1.0))
                .color(solid([255, 255, 255], alpha));
        }
    }
}
