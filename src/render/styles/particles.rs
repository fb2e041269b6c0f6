//! Particle-driven styles.

use nannou::prelude::*;
use rand::Rng;

use super::{mix, solid, DrawState, StyleCtx};

/// Orbiting particle cloud. Stateless: positions are re-rolled each frame so
/// the cloud flickers with the music.
pub fn particles(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let mut rng = rand::rng();

    let count = 100 + (ctx.audio.overall * sens * 150.0) as usize;
    let gradient_radius = (ctx.w() / 2.0) * (0.8 + ctx.audio.mid * 0.4);
    let bass_pulse = ctx.audio.bass * 120.0 * sens;
    let rotation_speed = 0.005 + ctx.audio.treble * 0.03;

    for i in 0..count {
        let spin = ctx.frame as f32 * rotation_speed * if i % 2 == 0 { 1.0 } else { -1.0 };
        let angle = rng.random::<f32>() * TAU + spin;
        let radius = rng.random::<f32>() * (ctx.w() / 2.2) + bass_pulse;

        let value = bins[i % n];
        let size = (2.0 + value * 5.0) * (1.0 + ctx.audio.bass * sens);
        let alpha = (0.3 + ctx.audio.treble * 0.7 * rng.random::<f32>()).min(1.0);
        let color = mix(
            ctx.opts.primary,
            ctx.opts.secondary,
            (radius / gradient_radius).clamp(0.0, 1.0),
        );

        draw.ellipse()
            .x_y(radius * angle.cos(), radius * angle.sin())
            .radius(size)
            .color(solid(color, alpha));
    }
}

/// Soft bass core surrounded by treble-spawned sparks.
pub fn cosmic_pulse(draw: &Draw, ctx: &StyleCtx, _state: &mut DrawState) {
    let sens = ctx.opts.sensitivity;
    let mut rng = rand::rng();

    let pulse_radius = 50.0 + ctx.audio.bass * 255.0 * sens * 0.5;
    draw.ellipse()
        .radius(pulse_radius)
        .color(solid(ctx.opts.primary, 0.35));
    draw.ellipse()
        .radius(pulse_radius * 0.5)
        .color(solid(ctx.opts.primary, 0.6));

    let count = (ctx.audio.treble * 255.0 * sens * 1.5) as usize;
    let outer = ctx.w().min(ctx.h()) / 2.0;
    for _ in 0..count {
        let angle = rng.random::<f32>() * TAU;
        let radius = pulse_radius + rng.random::<f32>() * (outer - pulse_radius).max(0.0);
        draw.ellipse()
            .x_y(radius * angle.cos(), radius * angle.sin())
            .radius(1.0 + rng.random::<f32>() * 2.0)
            .color(solid(ctx.opts.secondary, rng.random::<f32>() * 0.5 + 0.5));
    }
}

pub struct Raindrop {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub length: f32,
}

pub struct Splash {
    pub x: f32,
    pub radius: f32,
    pub life: f32,
}

/// Falling streaks that splash into expanding rings at the bottom edge.
pub fn rain(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let sens = ctx.opts.sensitivity;
    let mut rng = rand::rng();
    let to = |x: f32, y: f32| pt2(ctx.rect.left() + x, ctx.rect.top() - y);

    let target = 50 + (ctx.audio.overall * 255.0 * sens * 1.5) as usize;
    while state.drops.len() < target && rng.random::<f32>() > 0.5 {
        state.drops.push(Raindrop {
            x: rng.random::<f32>() * w,
            y: -20.0,
            speed: 3.0 + rng.random::<f32>() * 4.0,
            length: 15.0 + rng.random::<f32>() * 10.0,
        });
    }

    let mut i = 0;
    while i < state.drops.len() {
        let drop = &mut state.drops[i];
        drop.y += drop.speed;
        let value = bins[i % n];
        let length = drop.length + value * 20.0;

        draw.line()
            .start(to(drop.x, drop.y))
            .end(to(drop.x, drop.y - length))
            .weight(1.5)
            .color(solid(ctx.opts.primary, 0.5 + value * 0.5));

        if drop.y > h {
            state.splashes.push(Splash {
                x: drop.x,
                radius: 0.0,
                life: 1.0,
            });
            state.drops.swap_remove(i);
        } else {
            i += 1;
        }
    }

    state.splashes.retain_mut(|s| {
        s.radius += 2.0;
        s.life -= 0.05;
        if s.life <= 0.0 {
            return false;
        }
        draw.ellipse()
            .xy(to(s.x, h))
            .radius(s.radius)
            .no_fill()
            .stroke(solid(ctx.opts.primary, s.life))
            .stroke_weight(2.0);
        true
    });
}

pub struct Star {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub pz: f32,
}

const STAR_COUNT: usize = 500;

/// Warp-speed starfield; energy drives the speed, fast stars leave streaks.
pub fn starfield(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let mut rng = rand::rng();

    if state.stars.is_empty() {
        state.stars = (0..STAR_COUNT)
            .map(|_| Star {
                x: rng.random::<f32>() * w - w / 2.0,
                y: rng.random::<f32>() * h - h / 2.0,
                z: rng.random::<f32>() * w,
                pz: 0.0,
            })
            .collect();
    }

    let speed = 0.5 + ctx.audio.overall * 3.0;
    let brightness = 0.5 + ctx.audio.treble * 0.5;

    for star in &mut state.stars {
        star.pz = star.z;
        star.z -= speed;
        if star.z <= 0.0 {
            star.z = w;
            star.pz = w;
            star.x = rng.random::<f32>() * w - w / 2.0;
            star.y = rng.random::<f32>() * h - h / 2.0;
        }

        let sx = star.x / star.z * (w / 2.0);
        let sy = star.y / star.z * (h / 2.0);
        let r = ((1.0 - star.z / w) * 3.0).max(0.0);

        if sx.abs() < w / 2.0 && sy.abs() < h / 2.0 {
            draw.ellipse()
                .x_y(sx, sy)
                .radius(r)
                .color(solid([255, 255, 255], brightness));

            if speed > 2.0 {
                let px = star.x / star.pz * (w / 2.0);
                let py = star.y / star.pz * (h / 2.0);
                draw.line()
                    .start(pt2(px, py))
                    .end(pt2(sx, sy))
                    .weight(r.max(0.2))
                    .color(solid([255, 255, 255], brightness * 0.5));
            }
        }
    }
}

pub struct OrbitParticle {
    pub angle: f32,
    pub radius: f32,
    pub speed: f32,
}

const VORTEX_COUNT: usize = 300;

/// Spinning drain of dots; energy speeds the swirl.
pub fn vortex(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let w = ctx.w();
    let mut rng = rand::rng();

    while state.vortex.len() < VORTEX_COUNT {
        state.vortex.push(OrbitParticle {
            angle: rng.random::<f32>() * TAU,
            radius: rng.random::<f32>() * w / 2.0,
            speed: 0.01 + rng.random::<f32>() * 0.02,
        });
    }

    let boost = 1.0 + ctx.audio.overall * ctx.opts.sensitivity;
    for p in &mut state.vortex {
        p.angle += p.speed * boost;
        p.radius -= 0.5;

        draw.ellipse()
            .x_y(p.radius * p.angle.cos(), p.radius * p.angle.sin())
            .radius((p.radius / 100.0).max(0.1))
            .color(solid(ctx.opts.primary, 1.0));

        if p.radius <= 0.0 {
            p.radius = w / 2.0;
            p.angle = rng.random::<f32>() * TAU;
        }
    }
}

pub struct GalaxyParticle {
    pub angle: f32,
    pub radius: f32,
    pub speed: f32,
    pub size: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
}

const GALAXY_COUNT: usize = 600;

/// Stars spiraling into a bass-lit core.
pub fn galaxy(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let sens = ctx.opts.sensitivity;
    let max_radius = ctx.w().min(ctx.h()) / 1.5;
    let mut rng = rand::rng();

    if state.galaxy.is_empty() {
        state.galaxy = (0..GALAXY_COUNT)
            .map(|_| GalaxyParticle {
                angle: rng.random::<f32>() * TAU,
                radius: rng.random::<f32>() * max_radius,
                speed: 0.05 + rng.random::<f32>() * 0.2,
                size: 0.5 + rng.random::<f32>() * 1.5,
                rotation: rng.random::<f32>() * TAU,
                rotation_speed: (rng.random::<f32>() - 0.5) * 0.005,
            })
            .collect();
    }

    for p in &mut state.galaxy {
        p.radius -= p.speed * (0.5 + ctx.audio.overall * sens);
        p.rotation += p.rotation_speed * (1.0 + ctx.audio.bass * sens * 2.0);
        if p.radius <= 0.0 {
            p.radius = max_radius;
            p.angle = rng.random::<f32>() * TAU;
        }

        let wobble = p.radius + p.rotation.sin() * p.radius * 0.2;
        let alpha = (1.0 - p.radius / max_radius).powi(2);
        let color = if rng.random::<f32>() > 0.1 {
            ctx.opts.primary
        } else {
            ctx.opts.secondary
        };

        draw.ellipse()
            .x_y(wobble * p.angle.cos(), wobble * p.angle.sin())
            .radius(p.size)
            .color(solid(color, alpha));
    }

    // Core glow swells with the bass
    let core = max_radius * 0.15;
    draw.ellipse()
        .radius(core)
        .color(solid(ctx.opts.secondary, ctx.audio.bass * 0.3));
    draw.ellipse()
        .radius(core * 0.5)
        .color(solid(ctx.opts.secondary, ctx.audio.bass * 0.5));
}

pub struct PlasmaBlob {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub base_radius: f32,
    pub data_index: usize,
}

const PLASMA_BLOBS: usize = 6;

/// Additive lava-lamp blobs bouncing off the edges.
pub fn plasma(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let bins = &ctx.audio.bins;
    let n = bins.len();
    let mut rng = rand::rng();

    if state.plasma.is_empty() {
        let min_dim = w.min(h);
        state.plasma = (0..PLASMA_BLOBS)
            .map(|i| PlasmaBlob {
                x: rng.random::<f32>() * w - w / 2.0,
                y: rng.random::<f32>() * h - h / 2.0,
                vx: (rng.random::<f32>() - 0.5) * 2.0,
                vy: (rng.random::<f32>() - 0.5) * 2.0,
                base_radius: min_dim * 0.1 + rng.random::<f32>() * min_dim * 0.15,
                data_index: i * n / PLASMA_BLOBS,
            })
            .collect();
    }

    let additive = draw.color_blend(BLEND_ADD);
    for b in &mut state.plasma {
        b.x += b.vx;
        b.y += b.vy;
        if b.x.abs() > w / 2.0 {
            b.vx = -b.vx;
        }
        if b.y.abs() > h / 2.0 {
            b.vy = -b.vy;
        }

        let value = bins[b.data_index] * ctx.opts.sensitivity;
        let radius = b.base_radius * (0.6 + value * 1.2);
        let color = if b.data_index % 2 == 0 {
            ctx.opts.primary
        } else {
            ctx.opts.secondary
        };

        additive
            .ellipse()
            .x_y(b.x, b.y)
            .radius(radius)
            .color(solid(color, 0.2));
        additive
            .ellipse()
            .x_y(b.x, b.y)
            .radius(radius * 0.55)
            .color(solid(color, 0.25));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::render::styles::DrawOptions;
    use crate::settings::Settings;

    fn ctx_for<'a>(audio: &'a AudioFrame, opts: &'a DrawOptions) -> StyleCtx<'a> {
        StyleCtx {
            audio,
            rect: Rect::from_w_h(400.0, 300.0),
            frame: 0,
            opts,
        }
    }

    #[test]
    fn vortex_holds_its_population() {
        let audio = AudioFrame::default();
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();
        for _ in 0..3 {
            vortex(&Draw::new(), &ctx_for(&audio, &opts), &mut state);
        }
        assert_eq!(state.vortex.len(), VORTEX_COUNT);
    }

    #[test]
    fn rain_drops_recycle_into_splashes() {
        let mut audio = AudioFrame::default();
        audio.overall = 1.0;
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();
        let ctx = ctx_for(&audio, &opts);
        // Enough frames for the fastest drops to cross 300px
        for _ in 0..200 {
            rain(&Draw::new(), &ctx, &mut state);
        }
        assert!(!state.drops.is_empty());
        // Splash lifetime is 20 frames, so recent landings are still visible
        assert!(state.drops.len() <= 50 + (255.0 * 1.5) as usize);
    }

    #[test]
    fn galaxy_particles_fall_inward() {
        let audio = AudioFrame::default();
        let opts = DrawOptions::from_settings(&Settings::default());
        let mut state = DrawState::default();
        let ctx = ctx_for(&audio, &opts);
        galaxy(&Draw::new(), &ctx, &mut state);
        // Keep everything clear of the reset-at-center boundary
        for p in &mut state.galaxy {
            p.radius = 100.0;
        }
        let before: f32 = state.galaxy.iter().map(|p| p.radius).sum();
        galaxy(&Draw::new(), &ctx, &mut state);
        let after: f32 = state.galaxy.iter().map(|p| p.radius).sum();
        assert!(after < before);
    }
}
