//! The fully user-configurable particle style.

use nannou::prelude::*;
use rand::Rng;

use super::{mix, solid, DrawState, StyleCtx};
use crate::settings::{EmissionStyle, ParticleColoring, ParticleShape, ReactiveProperty};

const MAX_PARTICLES: usize = 500;

pub struct CustomParticle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub initial_life: f32,
    pub size: f32,
    pub wavy_phase: f32,
}

pub fn custom(draw: &Draw, ctx: &StyleCtx, state: &mut DrawState) {
    let (w, h) = (ctx.w(), ctx.h());
    let settings = &ctx.opts.custom;
    let sens = ctx.opts.sensitivity;
    let bass = ctx.audio.bass;
    let mut rng = rand::rng();
    // Particles live in canvas coordinates, y growing downwards
    let to = |x: f32, y: f32| pt2(ctx.rect.left() + x, ctx.rect.top() - y);

    let to_add = if bass > 0.5 {
        bass * settings.particle_count
    } else {
        settings.particle_count / 5.0
    } * sens;

    for _ in 0..to_add.ceil() as usize {
        if state.custom_particles.len() >= MAX_PARTICLES {
            break;
        }

        let react_speed = match settings.audio_reactive_property {
            ReactiveProperty::Speed => 1.0 + bass * 2.0,
            _ => 1.0,
        };
        let react_size = match settings.audio_reactive_property {
            ReactiveProperty::Size => bass * 10.0,
            _ => 0.0,
        };

        let mut p = CustomParticle {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            life: 1.0,
            initial_life: settings.lifespan / 2.0 + rng.random::<f32>() * (settings.lifespan / 2.0),
            size: (settings.size + react_size).max(1.0),
            wavy_phase: rng.random::<f32>() * TAU,
        };

        match settings.emission_style {
            EmissionStyle::Burst => {
                let angle = rng.random::<f32>() * TAU;
                p.x = w / 2.0;
                p.y = h / 2.0;
                let speed = rng.random::<f32>() * settings.particle_speed * react_speed;
                p.vx = angle.cos() * speed;
                p.vy = angle.sin() * speed;
            }
            EmissionStyle::Fountain => {
                p.x = w / 2.0 + (rng.random::<f32>() - 0.5) * 50.0;
                p.y = h;
                p.vx = (rng.random::<f32>() - 0.5) * 4.0;
                p.vy = -rng.random::<f32>() * settings.particle_speed * 2.0 * react_speed;
            }
            EmissionStyle::Rain => {
                p.x = rng.random::<f32>() * w;
                p.y = 0.0;
                p.vx = rng.random::<f32>() - 0.5;
                p.vy = rng.random::<f32>() * settings.particle_speed * react_speed;
            }
        }
        state.custom_particles.push(p);
    }

    let frame = ctx.frame as f32;
    let opts = ctx.opts;
    state.custom_particles.retain_mut(|p| {
        p.vy += settings.gravity * 0.05;
        p.vx += settings.wind * 0.05;
        if settings.wavy_movement {
            p.vx += (frame * 0.1 + p.wavy_phase).sin() * 0.1;
        }
        p.x += p.vx;
        p.y += p.vy;
        p.life -= 1.0 / (p.initial_life * 30.0);

        if p.life <= 0.0 || p.x < 0.0 || p.x > w || p.y < 0.0 || p.y > h {
            return false;
        }

        let color = match settings.coloring {
            ParticleColoring::Primary => opts.primary,
            ParticleColoring::Secondary => opts.secondary,
            ParticleColoring::Mixed => mix(opts.primary, opts.secondary, 1.0 - p.life),
        };
        let rgba = solid(color, p.life);
        let pos = to(p.x, p.y);

        match settings.particle_shape {
            ParticleShape::Circle => {
                draw.ellipse().xy(pos).radius(p.size / 2.0).color(rgba);
            }
            ParticleShape::Square => {
                draw.rect().xy(pos).w_h(p.size, p.size).color(rgba);
            }
            ParticleShape::Line => {
                let angle = p.vy.atan2(p.vx);
                let d = vec2(angle.cos(), -angle.sin()) * p.size;
                draw.line()
                    .start(pos - d)
                    .end(pos + d)
                    .weight(2.0)
                    .color(rgba);
            }
            ParticleShape::Star => {
                draw.polygon().points(star_points(pos, p.size)).color(rgba);
            }
        }
        true
    });
}

fn star_points(center: Point2, outer: f32) -> Vec<Point2> {
    let spikes = 5;
    let inner = outer / 2.0;
    let step = PI / spikes as f32;
    let mut rot = PI / 2.0 * 3.0;
    let mut points = vec![pt2(center.x, center.y + outer)];
    for _ in 0..spikes {
        points.push(pt2(
            center.x + rot.cos() * outer,
            center.y - rot.sin() * outer,
        ));
        rot += step;
        points.push(pt2(
            center.x + rot.cos() * inner,
            center.y - rot.sin() * inner,
        ));
        rot += step;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::render::styles::DrawOptions;
    use crate::settings::Settings;

    fn ctx_for<'a>(audio: &'a AudioFrame, opts: &'a DrawOptions, frame: u64) -> StyleCtx<'a> {
        StyleCtx {
            audio,
            rect: Rect::from_w_h(400.0, 300.0),
            frame,
            opts,
        }
    }

    #[test]
    fn population_never_exceeds_cap() {
        let mut audio = AudioFrame::default();
        audio.bass = 1.0;
        let mut settings = Settings::default();
        settings.custom_particles.particle_count = 10.0;
        settings.custom_particles.lifespan = 10.0;
        let opts = DrawOptions::from_settings(&settings);
        let mut state = DrawState::default();
        for frame in 0..300 {
            custom(&Draw::new(), &ctx_for(&audio, &opts, frame), &mut state);
            assert!(state.custom_particles.len() <= MAX_PARTICLES);
        }
        assert!(!state.custom_particles.is_empty());
    }

    #[test]
    fn particles_expire() {
        let mut audio = AudioFrame::default();
        audio.bass = 1.0;
        let mut settings = Settings::default();
        settings.custom_particles.lifespan = 1.0;
        settings.custom_particles.particle_speed = 0.0;
        settings.custom_particles.gravity = 0.0;
        let opts = DrawOptions::from_settings(&settings);
        let mut state = DrawState::default();

        custom(&Draw::new(), &ctx_for(&audio, &opts, 0), &mut state);
        assert!(!state.custom_particles.is_empty());

        // Lifespan 1.0 drains in at most 30 frames; stop spawning by silencing
        let silent = AudioFrame::default();
        let quiet = {
            let mut s = settings.clone();
            s.custom_particles.particle_count = 0.0;
            s
        };
        let quiet_opts = DrawOptions::from_settings(&quiet);
        for frame in 1..40 {
            custom(
                &Draw::new(),
                &ctx_for(&silent, &quiet_opts, frame),
                &mut state,
            );
        }
        assert!(state.custom_particles.is_empty());
    }
}
