use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    data_structures::texture::MAX_TEXTURE_UNITS,
    gpu::wgpu_backend::{DepthTexture, WgpuBackend},
};

/// Window surface plus everything needed to draw into it.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: DepthTexture,
    pub surface: wgpu::Surface<'static>,
    pub backend: WgpuBackend,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, clear_colour: wgpu::Color) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("unable to create a window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter can present to this window")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let max_bind_groups = bind_group_limit(adapter.limits().max_bind_groups);
        if max_bind_groups < MAX_TEXTURE_UNITS + 1 {
            log::warn!(
                "adapter offers {} bind groups, shaders may sample at most {} texture units",
                max_bind_groups,
                max_bind_groups.saturating_sub(1)
            );
        }
        let required_limits = wgpu::Limits {
            max_bind_groups,
            ..wgpu::Limits::default()
        };
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("terra-ngin device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                ..Default::default()
            })
            .await
            .context("unable to open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // the built-in shaders write linear colour and rely on an sRGB target
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let depth_texture =
            DepthTexture::new(&device, [config.width, config.height], "depth_texture");
        let backend = WgpuBackend::new(device, queue, surface_format, Some(DepthTexture::FORMAT));

        Ok(Self {
            window,
            depth_texture,
            surface,
            backend,
            config,
            clear_colour,
        })
    }

    /// Reconfigure the surface and recreate the depth buffer. Zero-sized
    /// windows (minimised) are ignored; returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.backend.device, &self.config);
        self.depth_texture =
            DepthTexture::new(&self.backend.device, [width, height], "depth_texture");
        true
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

/// Bind groups to request: uniforms at group 0 and one group per texture unit
/// after that, capped at what the adapter offers.
fn bind_group_limit(adapter_max: u32) -> u32 {
    (MAX_TEXTURE_UNITS + 1).min(adapter_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_groups_are_capped_by_the_adapter() {
        assert_eq!(bind_group_limit(8), MAX_TEXTURE_UNITS + 1);
        assert_eq!(bind_group_limit(4), 4);
    }
}
