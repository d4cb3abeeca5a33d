//! Framebuffer attachment points and their normalized slot indices.
//!
//! Slot layout of an attachment table with `N` color attachments:
//!
//! | slot      | attachment point            |
//! |-----------|-----------------------------|
//! | `0`       | depth or depth-stencil      |
//! | `1`       | stencil                     |
//! | `2..N+2`  | color `0..N`                |

use std::fmt;

/// Number of non-color slots at the front of an attachment table.
pub const RESERVED_SLOTS: usize = 2;

/// A named attachment point on a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attachment {
    /// Depth attachment.
    Depth,
    /// Stencil attachment.
    Stencil,
    /// Combined depth-stencil attachment. Shares slot 0 with [`Self::Depth`].
    DepthStencil,
    /// Color attachment `i`.
    Color(u32),
}

impl Attachment {
    /// Normalized slot index of this attachment point.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Depth | Self::DepthStencil => 0,
            Self::Stencil => 1,
            Self::Color(i) => i as usize + RESERVED_SLOTS,
        }
    }

    /// Whether an image of `format` may be attached at this point.
    #[must_use]
    pub fn accepts(self, format: wgpu::TextureFormat) -> bool {
        match self {
            Self::Color(_) => {
                !format.is_depth_stencil_format() && !format.is_compressed()
            }
            Self::Depth => format.has_depth_aspect(),
            Self::Stencil => format.has_stencil_aspect(),
            Self::DepthStencil => {
                format.has_depth_aspect() && format.has_stencil_aspect()
            }
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depth => write!(f, "depth"),
            Self::Stencil => write!(f, "stencil"),
            Self::DepthStencil => write!(f, "depth-stencil"),
            Self::Color(i) => write!(f, "color{i}"),
        }
    }
}

/// One entry of a framebuffer's draw-buffer or read-buffer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    /// Discard output for this fragment output location.
    None,
    /// Route output to color attachment `i`.
    Color(u32),
    /// A raw driver target code passed through untranslated.
    Raw(u32),
}

impl DrawBuffer {
    /// Translate a draw-target index: indices up to and including
    /// `max_color_attachments` name color attachments, anything else passes
    /// through as a raw code.
    ///
    /// `Color(max_color_attachments)` has no slot, so a framebuffer drawing
    /// to it reports an incomplete draw buffer.
    #[must_use]
    pub const fn from_index(index: u32, max_color_attachments: u32) -> Self {
        if index <= max_color_attachments {
            Self::Color(index)
        } else {
            Self::Raw(index)
        }
    }
}
