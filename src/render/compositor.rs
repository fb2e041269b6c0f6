//! Offscreen multi-pass compositor.
//!
//! The style layer renders into a persistent scene texture that is never
//! cleared; the per-tick translucent fade rect is what erases old content,
//! which is how trail effects fall out for free. Each tick the scene texture
//! is stamped into the frame texture in several passes (background, bloom,
//! base, glow, chromatic aberration, decorations) and the frame texture is both
//! shown on the window and read back for export.

use nannou::prelude::*;
use nannou::wgpu;

pub struct Compositor {
    scene_texture: wgpu::Texture,
    scene_renderer: nannou::draw::Renderer,
    frame_texture: wgpu::Texture,
    frame_renderer: nannou::draw::Renderer,
    capturer: wgpu::TextureCapturer,
    size: [u32; 2],
}

/// Background stamp parameters resolved by the engine.
pub struct BackgroundLayer<'a> {
    pub texture: &'a wgpu::Texture,
}

/// Post passes for one composite.
pub struct PostPasses {
    /// Halo width in pixels around everything the styles drew. Comes from
    /// the theme and is always on, unlike the toggleable passes below.
    pub glow: f32,
    pub bloom: Option<f32>,
    pub aberration: Option<f32>,
}

/// Halo layers per glow stamp.
const GLOW_LAYERS: usize = 3;

/// Stamp sizes for the layered halo approximating a glow of `intensity`
/// pixels around a `w` x `h` scene. Empty when the glow is off.
fn glow_stamp_sizes(intensity: f32, w: f32, h: f32) -> Vec<(f32, f32)> {
    if intensity <= 0.0 {
        return Vec::new();
    }
    (1..=GLOW_LAYERS)
        .map(|layer| {
            let px = intensity * layer as f32;
            (w + px * 2.0, h + px * 2.0)
        })
        .collect()
}

impl Compositor {
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let scene_texture = Self::create_texture(device, size);
        let frame_texture = Self::create_texture(device, size);
        let scene_renderer = nannou::draw::RendererBuilder::new()
            .build_from_texture_descriptor(device, scene_texture.descriptor());
        let frame_renderer = nannou::draw::RendererBuilder::new()
            .build_from_texture_descriptor(device, frame_texture.descriptor());

        Self {
            scene_texture,
            scene_renderer,
            frame_texture,
            frame_renderer,
            capturer: wgpu::TextureCapturer::default(),
            size,
        }
    }

    fn create_texture(device: &wgpu::Device, size: [u32; 2]) -> wgpu::Texture {
        wgpu::TextureBuilder::new()
            .size(size)
            .usage(
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            )
            // Single-sampled so the textures can be both stamped and captured
            .sample_count(1)
            .format(wgpu::TextureFormat::Rgba8Unorm)
            .build(device)
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Drawing area of the offscreen textures, centered on the origin.
    pub fn rect(&self) -> Rect {
        Rect::from_w_h(self.size[0] as f32, self.size[1] as f32)
    }

    /// Recreate the textures at a new size. Trails restart from black.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        if size == self.size {
            return;
        }
        *self = Self::new(device, size);
    }

    /// The finished frame, ready to stamp onto the window.
    pub fn frame_texture(&self) -> &wgpu::Texture {
        &self.frame_texture
    }

    /// Run all passes for one tick. `scene` draws the style layer on top of
    /// whatever the fade rect left over; `deco` is drawn over the composite.
    pub fn composite(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Draw,
        deco: &Draw,
        background: Option<BackgroundLayer>,
        post: &PostPasses,
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compositor"),
        });

        // Pass 1: style layer accumulates in the scene texture
        self.scene_renderer
            .render_to_texture(device, &mut encoder, scene, &self.scene_texture);

        // Pass 2: assemble the frame
        let rect = self.rect();
        let draw = Draw::new();
        draw.background().color(BLACK);

        if let Some(bg) = &background {
            draw.texture(bg.texture).w_h(rect.w(), rect.h());
        }

        let scene_view = self.scene_texture.view().build();

        if let Some(intensity) = post.bloom {
            // Soft halo: enlarged additive stamp of the scene
            let grow = 1.0 + intensity / 200.0;
            draw.color_blend(BLEND_ADD)
                .texture(&scene_view)
                .w_h(rect.w() * grow, rect.h() * grow);
        }

        if background.is_some() {
            // Lighten over the backdrop instead of covering it
            draw.color_blend(BLEND_ADD)
                .texture(&scene_view)
                .w_h(rect.w(), rect.h());
        } else {
            draw.texture(&scene_view).w_h(rect.w(), rect.h());
        }

        // Theme glow: layered additive halos a few pixels wider than the base
        let halo = draw.color_blend(BLEND_ADD);
        for (gw, gh) in glow_stamp_sizes(post.glow, rect.w(), rect.h()) {
            halo.texture(&scene_view).w_h(gw, gh);
        }

        if let Some(offset) = post.aberration {
            let additive = draw.color_blend(BLEND_ADD);
            for dir in [-1.0, 1.0] {
                additive
                    .texture(&scene_view)
                    .x(offset * dir)
                    .w_h(rect.w(), rect.h());
            }
        }

        self.frame_renderer
            .render_to_texture(device, &mut encoder, &draw, &self.frame_texture);

        // Pass 3: notifications go over the post passes, unaffected by them
        self.frame_renderer
            .render_to_texture(device, &mut encoder, deco, &self.frame_texture);

        queue.submit(Some(encoder.finish()));
    }

    /// Read the frame texture back and hand the RGBA bytes to `deliver`.
    pub fn capture_frame<F>(&self, device: &wgpu::Device, queue: &wgpu::Queue, deliver: F)
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame capture"),
        });
        let snapshot = self
            .capturer
            .capture(device, &mut encoder, &self.frame_texture);
        queue.submit(Some(encoder.finish()));

        let result = snapshot.read(move |result| {
            if let Ok(image) = result {
                deliver(image.to_owned().into_raw());
            } else {
                eprintln!("Frame readback failed, dropping frame");
            }
        });
        if result.is_err() {
            eprintln!("Could not schedule frame readback");
        }
    }

    /// Block until in-flight readbacks are delivered. Call before finishing
    /// an export so no tail frames are lost.
    pub fn await_captures(&self, device: &wgpu::Device) {
        let _ = self.capturer.await_active_snapshots(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_off_stamps_no_halos() {
        assert!(glow_stamp_sizes(0.0, 800.0, 600.0).is_empty());
        assert!(glow_stamp_sizes(-1.0, 800.0, 600.0).is_empty());
    }

    #[test]
    fn glow_halos_widen_with_intensity() {
        let sizes = glow_stamp_sizes(5.0, 800.0, 600.0);
        assert_eq!(sizes.len(), GLOW_LAYERS);
        let mut prev = (800.0, 600.0);
        for &(gw, gh) in &sizes {
            assert!(gw > prev.0 && gh > prev.1);
            prev = (gw, gh);
        }

        let wider = glow_stamp_sizes(20.0, 800.0, 600.0);
        assert!(wider[0].0 > sizes[0].0);
    }
}
