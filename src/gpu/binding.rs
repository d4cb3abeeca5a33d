//! The binding-state capability.
//!
//! GPU objects never bind themselves directly; every bind goes through a
//! [`BindingState`] supplied by the caller, which is free to cache the
//! current bindings and skip redundant driver calls.

use super::driver::{
    BufferId, FramebufferId, FramebufferTarget, RenderbufferId, SamplerId,
    TextureId, VertexArrayId,
};

/// Buffer binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Vertex indices.
    ElementArray,
    /// Uniform block storage.
    Uniform,
    /// Shader storage block storage.
    ShaderStorage,
    /// Indirect draw parameters.
    DrawIndirect,
    /// Source of buffer copies.
    CopyRead,
    /// Destination of buffer copies.
    CopyWrite,
}

/// Tracks which objects are bound where.
pub trait BindingState {
    /// Bind `buffer` to `target`.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);
    /// Bind `texture` to texture unit `unit`.
    fn bind_texture_unit(&mut self, unit: u32, texture: TextureId);
    /// Bind `sampler` to texture unit `unit`.
    fn bind_sampler(&mut self, unit: u32, sampler: SamplerId);
    /// Bind `renderbuffer`.
    fn bind_renderbuffer(&mut self, renderbuffer: RenderbufferId);
    /// Bind `framebuffer` to `target`.
    fn bind_framebuffer(
        &mut self,
        target: FramebufferTarget,
        framebuffer: FramebufferId,
    );
    /// Bind `vertex_array`.
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);
    /// A buffer name was replaced by `new` during growth. Every binding of
    /// `old` must now refer to `new`.
    fn buffer_replaced(&mut self, old: BufferId, new: BufferId);
}
