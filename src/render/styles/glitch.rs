//! Glitch style: bars with datamosh artifacts.
//!
//! The artifacts are built from primitives instead of framebuffer readbacks:
//! displaced slice bands, additive ghost copies of the bars for RGB split,
//! and random corruption blocks.

use nannou::prelude::*;
use rand::Rng;

use super::{bars, solid, DrawState, StyleCtx};
use crate::render::styles::DrawOptions;

pub fn glitch(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let sens = ctx.opts.sensitivity;
    let energy = ctx.audio.overall;
    let bass = ctx.audio.bass;
    let mut rng = rand::rng();

    let thick = DrawOptions {
        primary: ctx.opts.primary,
        secondary: ctx.opts.secondary,
        sensitivity: ctx.opts.sensitivity,
        line_width: 8.0,
        custom: ctx.opts.custom.clone(),
    };
    let thick_ctx = StyleCtx {
        audio: ctx.audio,
        rect: ctx.rect,
        frame: ctx.frame,
        opts: &thick,
    };
    bars::bars(draw, &thick_ctx, state);

    // Slice displacement bands
    if energy * sens > 0.4 && rng.random::<f32>() > 0.7 {
        let slices = 10 + rng.random_range(0..20);
        for _ in 0..slices {
            let y = ctx.rect.bottom() + rng.random::<f32>() * h;
            let slice_h = 1.0 + rng.random::<f32>() * (h / 20.0);
            let shift = (rng.random::<f32>() - 0.5) * w * 0.2 * bass * sens;
            let color = if rng.random::<f32>() > 0.5 {
                ctx.opts.primary
            } else {
                ctx.opts.secondary
            };
            draw.rect()
                .x_y(shift, y)
                .w_h(w, slice_h)
                .color(solid(color, 0.15));
        }
    }

    // RGB split: two additive ghost copies of the bars, offset horizontally
    if bass * sens > 0.6 && rng.random::<f32>() > 0.5 {
        let offset = (rng.random::<f32>() * 10.0 - 5.0) * bass * sens;
        let additive = draw.color_blend(BLEND_ADD);
        for (dir, color) in [(1.0, ctx.opts.primary), (-1.0, ctx.opts.secondary)] {
            let ghost_opts = DrawOptions {
                primary: color,
                secondary: color,
                sensitivity: ctx.opts.sensitivity,
                line_width: 8.0,
                custom: ctx.opts.custom.clone(),
            };
            let ghost_draw = additive.x_y(offset * dir, 0.0);
            let ghost_ctx = StyleCtx {
                audio: ctx.audio,
                rect: ctx.rect,
                frame: ctx.frame,
                opts: &ghost_opts,
            };
            let mut scratch = DrawState::default();
            bars::bars(&ghost_draw, &ghost_ctx, &mut scratch);
        }
    }

    // Corruption blocks
    if energy > 0.5 && rng.random::<f32>() > 0.9 {
        let blocks = rng.random_range(0..5);
        for _ in 0..blocks {
            let color = if rng.random::<f32>() > 0.5 {
                ctx.opts.primary
            } else {
                ctx.opts.secondary
            };
            draw.rect()
                .x_y(
                    ctx.rect.left() + rng.random::<f32>() * w,
                    ctx.rect.bottom() + rng.random::<f32>() * h,
                )
                .w_h(rng.random::<f32>() * w * 0.3, rng.random::<f32>() * h * 0.1)
                .color(solid(color, rng.random::<f32>() * 0.5));
        }
    }
}
