use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Attachment table layout for
/// [`Framebuffer`](crate::gpu::framebuffer::Framebuffer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Framebuffers", inline)]
#[serde(default)]
pub struct FramebufferOptions {
    /// Number of color attachment points.
    #[schemars(title = "Color Attachments", range(min = 1, max = 32))]
    pub max_color_attachments: u32,
    /// Attaching a texture clears any renderbuffer at the same point, and
    /// the other way around.
    #[schemars(title = "Exclusive Slots")]
    pub exclusive_slots: bool,
}

impl Default for FramebufferOptions {
    fn default() -> Self {
        Self {
            max_color_attachments: 8,
            exclusive_slots: false,
        }
    }
}
