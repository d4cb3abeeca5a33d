//! Renderbuffers: single-image render targets with one-shot storage.

use super::{
    binding::BindingState,
    driver::{Driver, RenderbufferId},
};

/// A renderbuffer that owns its driver name.
#[derive(Debug)]
pub struct Renderbuffer {
    id: RenderbufferId,
}

impl Renderbuffer {
    /// Create an unallocated renderbuffer.
    pub fn new(driver: &impl Driver) -> Self {
        Self {
            id: driver.create_renderbuffer(),
        }
    }

    /// Driver name.
    #[must_use]
    pub const fn id(&self) -> RenderbufferId {
        self.id
    }

    /// Allocate single-sampled storage.
    pub fn allocate(
        &mut self,
        driver: &impl Driver,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.allocate_multisample(driver, format, 1, width, height);
    }

    /// Allocate storage with `samples` samples per pixel.
    pub fn allocate_multisample(
        &mut self,
        driver: &impl Driver,
        format: wgpu::TextureFormat,
        samples: u32,
        width: u32,
        height: u32,
    ) {
        driver.renderbuffer_storage(self.id, format, samples, width, height);
        log::debug!(
            "{}: {width}x{height} {format:?}, {samples} samples",
            self.id
        );
    }

    /// Bind through the binding state.
    pub fn bind(&self, bindings: &mut impl BindingState) {
        bindings.bind_renderbuffer(self.id);
    }

    /// Release the driver name.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_renderbuffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        attachment::Attachment,
        binding::recording::{Call, RecordingBindings},
        driver::{FramebufferTarget, MemoryDriver},
        framebuffer::Framebuffer,
    };

    #[test]
    fn depth_stencil_renderbuffer_completes_a_framebuffer() {
        let driver = MemoryDriver::new();
        let mut renderbuffer = Renderbuffer::new(&driver);
        renderbuffer.allocate(
            &driver,
            wgpu::TextureFormat::Depth24PlusStencil8,
            32,
            32,
        );
        let mut fb = Framebuffer::new(&driver);
        fb.attach_renderbuffer(
            &driver,
            Attachment::DepthStencil,
            renderbuffer.id(),
        )
        .unwrap();
        assert_eq!(fb.check_status(&driver, FramebufferTarget::Both), Ok(()));
    }

    #[test]
    fn zero_sized_storage_is_incomplete() {
        let driver = MemoryDriver::new();
        let mut renderbuffer = Renderbuffer::new(&driver);
        renderbuffer.allocate(&driver, wgpu::TextureFormat::Rgba8Unorm, 0, 8);
        let mut fb = Framebuffer::new(&driver);
        fb.attach_renderbuffer(&driver, Attachment::Color(0), renderbuffer.id())
            .unwrap();
        assert!(fb.check_status(&driver, FramebufferTarget::Both).is_err());
    }

    #[test]
    fn bind_and_destroy() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let renderbuffer = Renderbuffer::new(&driver);
        renderbuffer.bind(&mut bindings);
        assert_eq!(bindings.calls, vec![Call::Renderbuffer(renderbuffer.id())]);
        renderbuffer.destroy(&driver);
        assert!(driver.take_errors().is_empty());
    }
}
