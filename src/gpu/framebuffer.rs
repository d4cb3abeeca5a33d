//! Framebuffers: attachment tables addressed by normalized slot index.
//!
//! Every attachment point maps onto one slot of two parallel tables, one for
//! textures and one for renderbuffers (see [`Attachment::slot`]). The tables
//! only record what was attached; attachment validity is reported by
//! [`Framebuffer::check_status`].

use std::fmt;

use super::{
    attachment::{Attachment, DrawBuffer, RESERVED_SLOTS},
    binding::BindingState,
    driver::{
        status, Driver, FramebufferId, FramebufferTarget, RenderbufferId,
        TextureId,
    },
};
use crate::options::FramebufferOptions;

/// An attachment point outside the framebuffer's color attachment range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentError {
    /// Requested color attachment index.
    pub index: u32,
    /// Number of color attachments the framebuffer supports.
    pub max_color_attachments: u32,
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "color attachment {} out of range (limit {})",
            self.index, self.max_color_attachments
        )
    }
}

impl std::error::Error for AttachmentError {}

/// Why a framebuffer is not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatusError {
    /// An attachment is not attachment-complete.
    IncompleteAttachment,
    /// Nothing is attached.
    MissingAttachment,
    /// A draw buffer names an empty attachment.
    IncompleteDrawBuffer,
    /// The read buffer names an empty attachment.
    IncompleteReadBuffer,
    /// The combination of attachment formats is unsupported.
    Unsupported,
    /// Attachments disagree on their sample count.
    IncompleteMultisample,
    /// Layered and non-layered attachments are mixed.
    IncompleteLayerTargets,
    /// A status code outside the known set.
    Unknown(u32),
}

impl FramebufferStatusError {
    /// Map a driver status code; `None` means complete.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            status::COMPLETE => return None,
            status::INCOMPLETE_ATTACHMENT => Self::IncompleteAttachment,
            status::INCOMPLETE_MISSING_ATTACHMENT => Self::MissingAttachment,
            status::INCOMPLETE_DRAW_BUFFER => Self::IncompleteDrawBuffer,
            status::INCOMPLETE_READ_BUFFER => Self::IncompleteReadBuffer,
            status::UNSUPPORTED => Self::Unsupported,
            status::INCOMPLETE_MULTISAMPLE => Self::IncompleteMultisample,
            status::INCOMPLETE_LAYER_TARGETS => Self::IncompleteLayerTargets,
            other => Self::Unknown(other),
        })
    }
}

impl fmt::Display for FramebufferStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteAttachment => {
                write!(f, "an attachment is framebuffer incomplete")
            }
            Self::MissingAttachment => {
                write!(f, "the framebuffer has no attachments")
            }
            Self::IncompleteDrawBuffer => {
                write!(f, "a draw buffer names an empty attachment")
            }
            Self::IncompleteReadBuffer => {
                write!(f, "the read buffer names an empty attachment")
            }
            Self::Unsupported => write!(
                f,
                "the combination of attachment formats is not supported"
            ),
            Self::IncompleteMultisample => {
                write!(f, "the attachments have different sample counts")
            }
            Self::IncompleteLayerTargets => {
                write!(f, "layered and non-layered attachments are mixed")
            }
            Self::Unknown(code) => {
                write!(f, "unknown framebuffer status: {code:#X}")
            }
        }
    }
}

impl std::error::Error for FramebufferStatusError {}

/// A framebuffer that owns its driver name and remembers what is attached.
#[derive(Debug)]
pub struct Framebuffer {
    id: FramebufferId,
    textures: Vec<Option<TextureId>>,
    renderbuffers: Vec<Option<RenderbufferId>>,
    max_color_attachments: u32,
    exclusive_slots: bool,
}

impl Framebuffer {
    /// Create a framebuffer with the default attachment limits.
    pub fn new(driver: &impl Driver) -> Self {
        Self::with_options(driver, &FramebufferOptions::default())
    }

    /// Create a framebuffer sized by `options`.
    pub fn with_options(
        driver: &impl Driver,
        options: &FramebufferOptions,
    ) -> Self {
        let slots = options.max_color_attachments as usize + RESERVED_SLOTS;
        Self {
            id: driver.create_framebuffer(),
            textures: vec![None; slots],
            renderbuffers: vec![None; slots],
            max_color_attachments: options.max_color_attachments,
            exclusive_slots: options.exclusive_slots,
        }
    }

    /// Driver name.
    #[must_use]
    pub const fn id(&self) -> FramebufferId {
        self.id
    }

    /// Number of color attachment points.
    #[must_use]
    pub const fn max_color_attachments(&self) -> u32 {
        self.max_color_attachments
    }

    fn slot(&self, point: Attachment) -> Result<usize, AttachmentError> {
        match point {
            Attachment::Color(index) if index >= self.max_color_attachments => {
                Err(AttachmentError {
                    index,
                    max_color_attachments: self.max_color_attachments,
                })
            }
            _ => Ok(point.slot()),
        }
    }

    /// Attach level 0 of `texture` at `point`.
    ///
    /// # Errors
    ///
    /// [`AttachmentError`] if `point` is a color attachment beyond the limit.
    pub fn attach_texture(
        &mut self,
        driver: &impl Driver,
        point: Attachment,
        texture: TextureId,
    ) -> Result<(), AttachmentError> {
        self.attach_texture_level(driver, point, texture, 0)
    }

    /// Attach mip `level` of `texture` at `point`.
    ///
    /// # Errors
    ///
    /// [`AttachmentError`] if `point` is a color attachment beyond the limit.
    pub fn attach_texture_level(
        &mut self,
        driver: &impl Driver,
        point: Attachment,
        texture: TextureId,
        level: u32,
    ) -> Result<(), AttachmentError> {
        let slot = self.slot(point)?;
        self.textures[slot] = Some(texture);
        if self.exclusive_slots {
            self.renderbuffers[slot] = None;
        }
        driver.framebuffer_texture(self.id, point, texture, level);
        Ok(())
    }

    /// Attach `renderbuffer` at `point`.
    ///
    /// # Errors
    ///
    /// [`AttachmentError`] if `point` is a color attachment beyond the limit.
    pub fn attach_renderbuffer(
        &mut self,
        driver: &impl Driver,
        point: Attachment,
        renderbuffer: RenderbufferId,
    ) -> Result<(), AttachmentError> {
        let slot = self.slot(point)?;
        self.renderbuffers[slot] = Some(renderbuffer);
        if self.exclusive_slots {
            self.textures[slot] = None;
        }
        driver.framebuffer_renderbuffer(self.id, point, renderbuffer);
        Ok(())
    }

    /// Texture recorded at `point`.
    #[must_use]
    pub fn get_texture(&self, point: Attachment) -> Option<TextureId> {
        let slot = self.slot(point).ok()?;
        self.textures[slot]
    }

    /// Renderbuffer recorded at `point`.
    #[must_use]
    pub fn get_renderbuffer(&self, point: Attachment) -> Option<RenderbufferId> {
        let slot = self.slot(point).ok()?;
        self.renderbuffers[slot]
    }

    /// Route fragment outputs to the given draw targets, in order.
    ///
    /// Indices below [`Framebuffer::max_color_attachments`] select color
    /// attachments; larger values are passed to the driver unchanged.
    pub fn set_draw_targets(&self, driver: &impl Driver, indices: &[u32]) {
        let buffers: Vec<DrawBuffer> = indices
            .iter()
            .map(|&index| {
                DrawBuffer::from_index(index, self.max_color_attachments)
            })
            .collect();
        self.set_draw_buffers(driver, &buffers);
    }

    /// Route fragment outputs to explicit draw buffers.
    pub fn set_draw_buffers(&self, driver: &impl Driver, buffers: &[DrawBuffer]) {
        driver.framebuffer_draw_buffers(self.id, buffers);
    }

    /// Select the read target, translated like [`Self::set_draw_targets`].
    pub fn set_read_target(&self, driver: &impl Driver, index: u32) {
        driver.framebuffer_read_buffer(
            self.id,
            DrawBuffer::from_index(index, self.max_color_attachments),
        );
    }

    /// Check completeness for `target`.
    ///
    /// # Errors
    ///
    /// The [`FramebufferStatusError`] matching the driver's status code.
    pub fn check_status(
        &self,
        driver: &impl Driver,
        target: FramebufferTarget,
    ) -> Result<(), FramebufferStatusError> {
        let code = driver.check_framebuffer_status(self.id, target);
        match FramebufferStatusError::from_code(code) {
            None => Ok(()),
            Some(error) => {
                log::warn!("{} incomplete for {target:?}: {error}", self.id);
                Err(error)
            }
        }
    }

    /// Bind to `target` through the binding state.
    pub fn bind(
        &self,
        bindings: &mut impl BindingState,
        target: FramebufferTarget,
    ) {
        bindings.bind_framebuffer(target, self.id);
    }

    /// Release the driver name. Attached objects are not destroyed.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_framebuffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        binding::recording::{Call, RecordingBindings},
        driver::{MemoryDriver, TextureKind},
        renderbuffer::Renderbuffer,
        texture::Texture,
    };

    fn color_texture(driver: &MemoryDriver, width: u32) -> Texture {
        let mut texture = Texture::new(driver, TextureKind::D2);
        texture.allocate(
            driver,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            width,
            width,
            1,
        );
        texture
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(FramebufferStatusError::from_code(status::COMPLETE), None);
        assert_eq!(
            FramebufferStatusError::from_code(status::UNSUPPORTED),
            Some(FramebufferStatusError::Unsupported)
        );
        assert_eq!(
            FramebufferStatusError::from_code(0x1234),
            Some(FramebufferStatusError::Unknown(0x1234))
        );
        assert_eq!(
            FramebufferStatusError::Unknown(0xAB).to_string(),
            "unknown framebuffer status: 0xAB"
        );
    }

    #[test]
    fn attach_then_get() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        let depth = Texture::new(&driver, TextureKind::D2);

        fb.attach_texture(&driver, Attachment::Color(0), color.id())
            .unwrap();
        fb.attach_texture(&driver, Attachment::Depth, depth.id())
            .unwrap();

        assert_eq!(fb.get_texture(Attachment::Color(0)), Some(color.id()));
        assert_eq!(fb.get_texture(Attachment::Depth), Some(depth.id()));
        assert_eq!(fb.get_texture(Attachment::DepthStencil), Some(depth.id()));
        assert_eq!(fb.get_texture(Attachment::Stencil), None);
        assert_eq!(fb.get_texture(Attachment::Color(1)), None);
        assert_eq!(fb.get_renderbuffer(Attachment::Color(0)), None);
        assert_eq!(
            driver.attached_texture(fb.id(), Attachment::Color(0)),
            Some((color.id(), 0))
        );
    }

    #[test]
    fn color_index_beyond_limit_is_rejected() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        assert_eq!(
            fb.attach_texture(&driver, Attachment::Color(8), color.id()),
            Err(AttachmentError {
                index: 8,
                max_color_attachments: 8,
            })
        );
        assert_eq!(driver.attached_texture(fb.id(), Attachment::Color(8)), None);
        assert_eq!(fb.get_texture(Attachment::Color(8)), None);
    }

    #[test]
    fn slots_are_permissive_by_default() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let texture = color_texture(&driver, 4);
        let renderbuffer = Renderbuffer::new(&driver);
        fb.attach_texture(&driver, Attachment::Color(2), texture.id())
            .unwrap();
        fb.attach_renderbuffer(&driver, Attachment::Color(2), renderbuffer.id())
            .unwrap();
        assert_eq!(fb.get_texture(Attachment::Color(2)), Some(texture.id()));
        assert_eq!(
            fb.get_renderbuffer(Attachment::Color(2)),
            Some(renderbuffer.id())
        );
    }

    #[test]
    fn exclusive_slots_clear_the_other_table() {
        let driver = MemoryDriver::new();
        let options = FramebufferOptions {
            exclusive_slots: true,
            ..FramebufferOptions::default()
        };
        let mut fb = Framebuffer::with_options(&driver, &options);
        let texture = color_texture(&driver, 4);
        let renderbuffer = Renderbuffer::new(&driver);
        fb.attach_texture(&driver, Attachment::Stencil, texture.id())
            .unwrap();
        fb.attach_renderbuffer(&driver, Attachment::Stencil, renderbuffer.id())
            .unwrap();
        assert_eq!(fb.get_texture(Attachment::Stencil), None);
        assert_eq!(
            fb.get_renderbuffer(Attachment::Stencil),
            Some(renderbuffer.id())
        );
    }

    #[test]
    fn empty_framebuffer_is_missing_attachments() {
        let driver = MemoryDriver::new();
        let fb = Framebuffer::new(&driver);
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::MissingAttachment)
        );
    }

    #[test]
    fn single_color_attachment_is_complete() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 16);
        fb.attach_texture(&driver, Attachment::Color(0), color.id())
            .unwrap();
        fb.set_draw_targets(&driver, &[0]);
        assert_eq!(fb.check_status(&driver, FramebufferTarget::Draw), Ok(()));
    }

    #[test]
    fn unallocated_texture_is_incomplete() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let texture = Texture::new(&driver, TextureKind::D2);
        fb.attach_texture(&driver, Attachment::Color(0), texture.id())
            .unwrap();
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::IncompleteAttachment)
        );
    }

    #[test]
    fn level_beyond_storage_is_incomplete() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        fb.attach_texture_level(&driver, Attachment::Color(0), color.id(), 1)
            .unwrap();
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::IncompleteAttachment)
        );
    }

    #[test]
    fn draw_and_read_targets_need_attachments() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        fb.attach_texture(&driver, Attachment::Color(0), color.id())
            .unwrap();

        fb.set_draw_targets(&driver, &[0, 1]);
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Draw),
            Err(FramebufferStatusError::IncompleteDrawBuffer)
        );

        fb.set_draw_targets(&driver, &[0]);
        fb.set_read_target(&driver, 3);
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Read),
            Err(FramebufferStatusError::IncompleteReadBuffer)
        );
        assert_eq!(fb.check_status(&driver, FramebufferTarget::Draw), Ok(()));
    }

    #[test]
    fn draw_target_translation_passes_raw_codes_through() {
        let driver = MemoryDriver::new();
        let fb = Framebuffer::new(&driver);
        fb.set_draw_targets(&driver, &[1, 0x0405, 7, 8, 9]);
        assert_eq!(
            driver.draw_buffers(fb.id()),
            Some(vec![
                DrawBuffer::Color(1),
                DrawBuffer::Raw(0x0405),
                DrawBuffer::Color(7),
                DrawBuffer::Color(8),
                DrawBuffer::Raw(9),
            ])
        );
    }

    #[test]
    fn draw_target_at_limit_is_an_incomplete_draw_buffer() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        fb.attach_texture(&driver, Attachment::Color(0), color.id())
            .unwrap();

        fb.set_draw_targets(&driver, &[0, fb.max_color_attachments()]);
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Draw),
            Err(FramebufferStatusError::IncompleteDrawBuffer)
        );
    }

    #[test]
    fn separate_depth_and_stencil_are_unsupported() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let mut depth = Renderbuffer::new(&driver);
        let mut stencil = Renderbuffer::new(&driver);
        depth.allocate(&driver, wgpu::TextureFormat::Depth32Float, 4, 4);
        stencil.allocate(&driver, wgpu::TextureFormat::Stencil8, 4, 4);
        fb.attach_renderbuffer(&driver, Attachment::Depth, depth.id())
            .unwrap();
        fb.attach_renderbuffer(&driver, Attachment::Stencil, stencil.id())
            .unwrap();
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::Unsupported)
        );
    }

    #[test]
    fn mixed_sample_counts() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let color = color_texture(&driver, 4);
        let mut depth = Renderbuffer::new(&driver);
        depth.allocate_multisample(
            &driver,
            wgpu::TextureFormat::Depth24PlusStencil8,
            4,
            4,
            4,
        );
        fb.attach_texture(&driver, Attachment::Color(0), color.id())
            .unwrap();
        fb.attach_renderbuffer(&driver, Attachment::DepthStencil, depth.id())
            .unwrap();
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::IncompleteMultisample)
        );
    }

    #[test]
    fn depth_format_in_color_slot() {
        let driver = MemoryDriver::new();
        let mut fb = Framebuffer::new(&driver);
        let mut depth = Renderbuffer::new(&driver);
        depth.allocate(&driver, wgpu::TextureFormat::Depth32Float, 4, 4);
        fb.attach_renderbuffer(&driver, Attachment::Color(0), depth.id())
            .unwrap();
        assert_eq!(
            fb.check_status(&driver, FramebufferTarget::Both),
            Err(FramebufferStatusError::IncompleteAttachment)
        );
    }

    #[test]
    fn bind_records_target() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let fb = Framebuffer::new(&driver);
        fb.bind(&mut bindings, FramebufferTarget::Read);
        assert_eq!(
            bindings.calls,
            vec![Call::Framebuffer(FramebufferTarget::Read, fb.id())]
        );
        fb.destroy(&driver);
        assert!(driver.take_errors().is_empty());
    }
}
