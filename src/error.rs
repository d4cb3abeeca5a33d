//! Crate-level error types.

use std::fmt;

use crate::gpu::{
    buffer::BufferError,
    driver::ContextError,
    framebuffer::{AttachmentError, FramebufferStatusError},
};

/// Errors produced by the gpu-objects crate.
#[derive(Debug)]
pub enum GpuObjectsError {
    /// GPU context initialization failure.
    Context(ContextError),
    /// A buffer precondition was violated.
    Buffer(BufferError),
    /// An attachment point is out of range.
    Attachment(AttachmentError),
    /// A framebuffer is not complete.
    Framebuffer(FramebufferStatusError),
    /// Image decoding failure.
    Image(image::ImageError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for GpuObjectsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(e) => write!(f, "GPU error: {e}"),
            Self::Buffer(e) => write!(f, "buffer error: {e}"),
            Self::Attachment(e) => write!(f, "attachment error: {e}"),
            Self::Framebuffer(e) => {
                write!(f, "framebuffer incomplete: {e}")
            }
            Self::Image(e) => write!(f, "image decode error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for GpuObjectsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(e) => Some(e),
            Self::Buffer(e) => Some(e),
            Self::Attachment(e) => Some(e),
            Self::Framebuffer(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::OptionsParse(_) => None,
        }
    }
}

impl From<ContextError> for GpuObjectsError {
    fn from(e: ContextError) -> Self {
        Self::Context(e)
    }
}

impl From<BufferError> for GpuObjectsError {
    fn from(e: BufferError) -> Self {
        Self::Buffer(e)
    }
}

impl From<AttachmentError> for GpuObjectsError {
    fn from(e: AttachmentError) -> Self {
        Self::Attachment(e)
    }
}

impl From<FramebufferStatusError> for GpuObjectsError {
    fn from(e: FramebufferStatusError) -> Self {
        Self::Framebuffer(e)
    }
}

impl From<image::ImageError> for GpuObjectsError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<std::io::Error> for GpuObjectsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
