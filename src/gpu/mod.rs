//! GPU object handles and the driver surface they are built on.
//!
//! Provides the named-object [`driver`] layer with its in-memory and `wgpu`
//! backends, growable buffers, framebuffer attachment tables, and thin
//! texture, sampler, renderbuffer and vertex-array wrappers.

/// Framebuffer attachment points and draw-buffer selection.
pub mod attachment;
/// The binding-state capability.
pub mod binding;
/// Growable buffers with fixed and mutable storage.
pub mod buffer;
/// Driver trait, object identifiers and backends.
pub mod driver;
/// Typed element descriptors for uploads and vertex attributes.
pub mod element;
/// Framebuffer attachment tables and completeness checks.
pub mod framebuffer;
/// Image decoding for texture uploads.
pub mod image;
/// Renderbuffer objects.
pub mod renderbuffer;
/// Sampler objects.
pub mod sampler;
/// Texture objects.
pub mod texture;
/// Vertex array objects.
pub mod vertex_array;
