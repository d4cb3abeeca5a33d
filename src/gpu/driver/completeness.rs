//! Framebuffer attachment records and completeness evaluation shared by all
//! backends.

use std::collections::BTreeMap;

use super::{status, FramebufferTarget, RenderbufferId, TextureId};
use crate::gpu::attachment::{Attachment, DrawBuffer};

/// An image attached to a framebuffer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachedImage {
    Texture { texture: TextureId, level: u32 },
    Renderbuffer(RenderbufferId),
}

/// What a backend knows about an attached image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageInfo {
    /// Storage format, `None` while unallocated.
    pub(crate) format: Option<wgpu::TextureFormat>,
    pub(crate) levels: u32,
    pub(crate) samples: u32,
    /// Whether the image is attached as a layered image.
    pub(crate) layered: bool,
}

/// Attachment state of one framebuffer object.
#[derive(Debug, Clone, Default)]
pub(crate) struct FramebufferRecord {
    /// Depth-stencil attachments are split into a depth and a stencil entry.
    pub(crate) attachments: BTreeMap<Attachment, AttachedImage>,
    pub(crate) draw_buffers: Vec<DrawBuffer>,
    pub(crate) read_buffer: Option<DrawBuffer>,
}

impl FramebufferRecord {
    pub(crate) fn attach(&mut self, point: Attachment, image: AttachedImage) {
        if point == Attachment::DepthStencil {
            let _ = self.attachments.insert(Attachment::Depth, image);
            let _ = self.attachments.insert(Attachment::Stencil, image);
        } else {
            let _ = self.attachments.insert(point, image);
        }
    }

    /// Evaluate completeness for `target` and return a [`status`] code.
    ///
    /// Checks run in order: attachment completeness, missing attachments,
    /// draw buffers, read buffer, unsupported combinations, sample counts,
    /// layer targets. The first failure wins.
    pub(crate) fn evaluate(
        &self,
        target: FramebufferTarget,
        describe: impl Fn(AttachedImage) -> Option<ImageInfo>,
    ) -> u32 {
        let mut infos = Vec::with_capacity(self.attachments.len());
        for (&point, &image) in &self.attachments {
            let Some(info) = describe(image) else {
                return status::INCOMPLETE_ATTACHMENT;
            };
            let Some(format) = info.format else {
                return status::INCOMPLETE_ATTACHMENT;
            };
            if let AttachedImage::Texture { level, .. } = image {
                if level >= info.levels {
                    return status::INCOMPLETE_ATTACHMENT;
                }
            }
            if !point.accepts(format) {
                return status::INCOMPLETE_ATTACHMENT;
            }
            infos.push(info);
        }

        if infos.is_empty() {
            return status::INCOMPLETE_MISSING_ATTACHMENT;
        }

        let has_color =
            |i: u32| self.attachments.contains_key(&Attachment::Color(i));
        if target.draws()
            && self.draw_buffers.iter().any(
                |buffer| matches!(*buffer, DrawBuffer::Color(i) if !has_color(i)),
            )
        {
            return status::INCOMPLETE_DRAW_BUFFER;
        }
        if target.reads() {
            if let Some(DrawBuffer::Color(i)) = self.read_buffer {
                if !has_color(i) {
                    return status::INCOMPLETE_READ_BUFFER;
                }
            }
        }

        let depth = self.attachments.get(&Attachment::Depth);
        let stencil = self.attachments.get(&Attachment::Stencil);
        if let (Some(depth), Some(stencil)) = (depth, stencil) {
            if depth != stencil {
                return status::UNSUPPORTED;
            }
        }

        let first = infos[0];
        if infos.iter().any(|info| info.samples != first.samples) {
            return status::INCOMPLETE_MULTISAMPLE;
        }
        if infos.iter().any(|info| info.layered != first.layered) {
            return status::INCOMPLETE_LAYER_TARGETS;
        }
        status::COMPLETE
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn texture(raw: u32) -> AttachedImage {
        AttachedImage::Texture {
            texture: TextureId::from_raw(
                NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN),
            ),
            level: 0,
        }
    }

    fn color_2d(_: AttachedImage) -> Option<ImageInfo> {
        Some(ImageInfo {
            format: Some(wgpu::TextureFormat::Rgba8Unorm),
            levels: 1,
            samples: 1,
            layered: false,
        })
    }

    #[test]
    fn empty_record_is_missing_attachments() {
        let record = FramebufferRecord::default();
        assert_eq!(
            record.evaluate(FramebufferTarget::Both, color_2d),
            status::INCOMPLETE_MISSING_ATTACHMENT
        );
    }

    #[test]
    fn depth_stencil_fills_both_points() {
        let mut record = FramebufferRecord::default();
        record.attach(Attachment::DepthStencil, texture(3));
        assert_eq!(
            record.attachments.get(&Attachment::Depth),
            Some(&texture(3))
        );
        assert_eq!(
            record.attachments.get(&Attachment::Stencil),
            Some(&texture(3))
        );
    }

    #[test]
    fn draw_buffer_without_attachment() {
        let mut record = FramebufferRecord::default();
        record.attach(Attachment::Color(0), texture(1));
        record.draw_buffers = vec![DrawBuffer::Color(0), DrawBuffer::Color(1)];
        assert_eq!(
            record.evaluate(FramebufferTarget::Draw, color_2d),
            status::INCOMPLETE_DRAW_BUFFER
        );
        // Draw buffers are not consulted for the read target.
        assert_eq!(
            record.evaluate(FramebufferTarget::Read, color_2d),
            status::COMPLETE
        );
    }

    #[test]
    fn mixed_layering() {
        let mut record = FramebufferRecord::default();
        record.attach(Attachment::Color(0), texture(1));
        record.attach(Attachment::Color(1), texture(2));
        let describe = |image: AttachedImage| {
            let layered = image == texture(2);
            color_2d(image).map(|info| ImageInfo { layered, ..info })
        };
        assert_eq!(
            record.evaluate(FramebufferTarget::Both, describe),
            status::INCOMPLETE_LAYER_TARGETS
        );
    }
}
