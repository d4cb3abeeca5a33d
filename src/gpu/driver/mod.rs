//! The named-object graphics driver surface.
//!
//! [`Driver`] is the explicit, direct-state-access API every GPU object in
//! this crate is built on: objects are created and addressed by typed
//! identifiers, and every call names the object it acts on. Two backends are
//! provided:
//!
//! - [`MemoryDriver`]: keeps every object in host memory. Used as the test
//!   fake and as a headless reference implementation.
//! - [`WgpuDriver`]: maps the objects onto `wgpu` buffers, textures and
//!   samplers.
//!
//! Driver methods take `&self`; a driver is a single-threaded context and
//! keeps its bookkeeping behind interior mutability.

mod completeness;
mod memory;
mod state;
mod table;
mod wgpu_backend;

use std::{fmt, num::NonZeroU32, ops::Range};

pub use memory::{DriverError, MemoryDriver};
pub use state::{
    SamplerState, VertexArrayState, VertexAttributeState, VertexBindingState,
};
pub use wgpu_backend::{ContextError, OwnedVertexLayout, WgpuDriver};

use crate::gpu::{
    attachment::{Attachment, DrawBuffer},
    element::{ElementDescriptor, ElementKind},
};

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wrap a raw driver name.
            #[must_use]
            pub const fn from_raw(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            /// The raw driver name.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " #{}"), self.0)
            }
        }
    };
}

object_id!(
    /// Name of a buffer object.
    BufferId,
    "buffer"
);
object_id!(
    /// Name of a texture object (including texture views).
    TextureId,
    "texture"
);
object_id!(
    /// Name of a sampler object.
    SamplerId,
    "sampler"
);
object_id!(
    /// Name of a renderbuffer object.
    RenderbufferId,
    "renderbuffer"
);
object_id!(
    /// Name of a framebuffer object.
    FramebufferId,
    "framebuffer"
);
object_id!(
    /// Name of a vertex array object.
    VertexArrayId,
    "vertex array"
);

/// Raw completeness status codes returned by
/// [`Driver::check_framebuffer_status`].
pub mod status {
    /// The framebuffer is complete.
    pub const COMPLETE: u32 = 0x8CD5;
    /// An attachment is not attachment-complete.
    pub const INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
    /// No image is attached.
    pub const INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;
    /// A draw buffer names an empty color attachment.
    pub const INCOMPLETE_DRAW_BUFFER: u32 = 0x8CDB;
    /// The read buffer names an empty color attachment.
    pub const INCOMPLETE_READ_BUFFER: u32 = 0x8CDC;
    /// The combination of attachment formats is not supported.
    pub const UNSUPPORTED: u32 = 0x8CDD;
    /// Attachments disagree on their sample count.
    pub const INCOMPLETE_MULTISAMPLE: u32 = 0x8D56;
    /// Layered and non-layered attachments are mixed.
    pub const INCOMPLETE_LAYER_TARGETS: u32 = 0x8DA8;
}

/// Shape of a texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// One-dimensional texture.
    D1,
    /// Array of one-dimensional layers.
    D1Array,
    /// Two-dimensional texture.
    D2,
    /// Array of two-dimensional layers.
    D2Array,
    /// Three-dimensional texture.
    D3,
    /// Cube map (six two-dimensional faces).
    Cube,
}

impl TextureKind {
    /// Number of coordinates needed to address a texel, including the
    /// layer coordinate for arrays and cube maps.
    #[must_use]
    pub const fn dimensions(self) -> u32 {
        match self {
            Self::D1 => 1,
            Self::D2 | Self::D1Array => 2,
            Self::D3 | Self::D2Array | Self::Cube => 3,
        }
    }

    /// Whether attaching the whole texture produces a layered attachment.
    #[must_use]
    pub const fn is_layered(self) -> bool {
        !matches!(self, Self::D1 | Self::D2)
    }

    /// View dimension of a full view of this texture.
    #[must_use]
    pub const fn view_dimension(self) -> wgpu::TextureViewDimension {
        match self {
            Self::D1 => wgpu::TextureViewDimension::D1,
            Self::D1Array | Self::D2 => wgpu::TextureViewDimension::D2,
            Self::D2Array => wgpu::TextureViewDimension::D2Array,
            Self::D3 => wgpu::TextureViewDimension::D3,
            Self::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

/// Channel layout of host pixel data passed to
/// [`Driver::texture_sub_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single red channel.
    Red,
    /// Red and green.
    Rg,
    /// Red, green and blue.
    Rgb,
    /// Red, green, blue and alpha.
    Rgba,
    /// Blue, green, red and alpha.
    Bgra,
    /// Depth values.
    Depth,
    /// Stencil indices.
    Stencil,
    /// Packed depth and stencil.
    DepthStencil,
}

impl PixelFormat {
    /// Number of channels per pixel.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Red | Self::Depth | Self::Stencil => 1,
            Self::Rg | Self::DepthStencil => 2,
            Self::Rgb => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Bytes per pixel when each channel is stored as `element`.
    ///
    /// Vector elements cover several channels at once, so a `Vec4` upload
    /// into an `Rgba` texture costs 16 bytes per pixel, not 64.
    #[must_use]
    pub const fn bytes_per_pixel(self, element: ElementDescriptor) -> usize {
        self.channels() * element.kind.size()
    }
}

/// Which aspect a combined depth-stencil texture exposes when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthStencilMode {
    /// Sample depth values.
    #[default]
    Depth,
    /// Sample stencil indices.
    Stencil,
}

/// Framebuffer binding target used for binding and status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Draw target only.
    Draw,
    /// Read target only.
    Read,
    /// Both draw and read targets.
    Both,
}

impl FramebufferTarget {
    /// Whether the target includes drawing.
    #[must_use]
    pub const fn draws(self) -> bool {
        matches!(self, Self::Draw | Self::Both)
    }

    /// Whether the target includes reading.
    #[must_use]
    pub const fn reads(self) -> bool {
        matches!(self, Self::Read | Self::Both)
    }
}

/// A single sampler parameter update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerParameter {
    /// Minification filter.
    MinFilter(wgpu::FilterMode),
    /// Magnification filter.
    MagFilter(wgpu::FilterMode),
    /// Filter between mip levels.
    MipmapFilter(wgpu::FilterMode),
    /// Wrap mode along the s (u) axis.
    WrapS(wgpu::AddressMode),
    /// Wrap mode along the t (v) axis.
    WrapT(wgpu::AddressMode),
    /// Wrap mode along the r (w) axis.
    WrapR(wgpu::AddressMode),
    /// Depth comparison function, or `None` to disable comparison.
    Compare(Option<wgpu::CompareFunction>),
    /// Border color used by clamp-to-border addressing.
    BorderColor([f32; 4]),
}

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribFormat {
    /// Number of components (1..=4).
    pub components: u8,
    /// Scalar type of each component in the buffer.
    pub kind: ElementKind,
    /// Map integer data to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
    /// Keep integer data as integers in the shader.
    pub integer: bool,
    /// Byte offset of the attribute within a vertex.
    pub offset: u32,
}

/// The named-object driver surface.
///
/// Invalid calls (out-of-range writes, re-specifying fixed storage, unknown
/// names) are rejected by the driver itself and leave the target object
/// unchanged; callers above this trait do not pre-validate them.
pub trait Driver {
    // -- Buffers ---------------------------------------------------------

    /// Create an unallocated buffer object.
    fn create_buffer(&self) -> BufferId;
    /// Delete a buffer object and release its storage.
    fn delete_buffer(&self, buffer: BufferId);
    /// Allocate fixed storage of `size` bytes, optionally initialized from
    /// `data`. The buffer can never be re-specified afterwards.
    fn buffer_storage(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        flags: wgpu::BufferUsages,
    );
    /// (Re)specify resizable storage of `size` bytes, discarding previous
    /// contents.
    fn buffer_data(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        usage: wgpu::BufferUsages,
    );
    /// Overwrite `data.len()` bytes starting at `offset`.
    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]);
    /// Copy `size` bytes between two buffers.
    fn copy_buffer_sub_data(
        &self,
        src: BufferId,
        dst: BufferId,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
    );

    // -- Textures --------------------------------------------------------

    /// Create an unallocated texture object of the given kind.
    fn create_texture(&self, kind: TextureKind) -> TextureId;
    /// Delete a texture object.
    fn delete_texture(&self, texture: TextureId);
    /// Allocate immutable storage with `levels` mip levels.
    fn texture_storage(
        &self,
        texture: TextureId,
        levels: u32,
        format: wgpu::TextureFormat,
        extent: wgpu::Extent3d,
    );
    /// Upload pixels into `level`, starting at the origin.
    fn texture_sub_image(
        &self,
        texture: TextureId,
        level: u32,
        extent: wgpu::Extent3d,
        format: PixelFormat,
        element: ElementDescriptor,
        data: &[u8],
    );
    /// Regenerate levels `1..` from level 0.
    fn generate_texture_mipmap(&self, texture: TextureId);
    /// Restrict sampling to mip levels `base..=max`.
    fn texture_mip_range(&self, texture: TextureId, base: u32, max: u32);
    /// Select the aspect sampled from a depth-stencil texture.
    fn texture_depth_stencil_mode(
        &self,
        texture: TextureId,
        mode: DepthStencilMode,
    );
    /// Create a new texture name aliasing a range of `source`'s storage.
    fn texture_view(
        &self,
        source: TextureId,
        kind: TextureKind,
        format: wgpu::TextureFormat,
        levels: Range<u32>,
        layers: Range<u32>,
    ) -> TextureId;

    // -- Samplers --------------------------------------------------------

    /// Create a sampler object with default state.
    fn create_sampler(&self) -> SamplerId;
    /// Delete a sampler object.
    fn delete_sampler(&self, sampler: SamplerId);
    /// Update one sampler parameter.
    fn sampler_parameter(&self, sampler: SamplerId, parameter: SamplerParameter);

    // -- Renderbuffers ---------------------------------------------------

    /// Create an unallocated renderbuffer object.
    fn create_renderbuffer(&self) -> RenderbufferId;
    /// Delete a renderbuffer object.
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId);
    /// Allocate renderbuffer storage.
    fn renderbuffer_storage(
        &self,
        renderbuffer: RenderbufferId,
        format: wgpu::TextureFormat,
        samples: u32,
        width: u32,
        height: u32,
    );

    // -- Framebuffers ----------------------------------------------------

    /// Create a framebuffer object with no attachments.
    fn create_framebuffer(&self) -> FramebufferId;
    /// Delete a framebuffer object.
    fn delete_framebuffer(&self, framebuffer: FramebufferId);
    /// Attach mip `level` of `texture` at `point`.
    fn framebuffer_texture(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        texture: TextureId,
        level: u32,
    );
    /// Attach `renderbuffer` at `point`.
    fn framebuffer_renderbuffer(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        renderbuffer: RenderbufferId,
    );
    /// Select the color attachments fragment outputs are written to.
    fn framebuffer_draw_buffers(
        &self,
        framebuffer: FramebufferId,
        buffers: &[DrawBuffer],
    );
    /// Select the color attachment read operations source from.
    fn framebuffer_read_buffer(
        &self,
        framebuffer: FramebufferId,
        buffer: DrawBuffer,
    );
    /// Evaluate completeness for `target`; returns a [`status`] code.
    fn check_framebuffer_status(
        &self,
        framebuffer: FramebufferId,
        target: FramebufferTarget,
    ) -> u32;

    // -- Vertex arrays ---------------------------------------------------

    /// Create an empty vertex array object.
    fn create_vertex_array(&self) -> VertexArrayId;
    /// Delete a vertex array object.
    fn delete_vertex_array(&self, vertex_array: VertexArrayId);
    /// Enable attribute `attribute`.
    fn enable_vertex_attrib(&self, vertex_array: VertexArrayId, attribute: u32);
    /// Declare the format of attribute `attribute`.
    fn vertex_attrib_format(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        format: AttribFormat,
    );
    /// Source attribute `attribute` from buffer binding point `binding`.
    fn vertex_attrib_binding(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        binding: u32,
    );
    /// Bind `buffer` to binding point `binding`.
    fn vertex_array_vertex_buffer(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: usize,
        stride: u32,
    );
    /// Use `buffer` as the element (index) buffer.
    fn vertex_array_element_buffer(
        &self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
    );
    /// Advance binding point `binding` once every `divisor` instances
    /// (`0` = per vertex).
    fn vertex_binding_divisor(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        divisor: u32,
    );
}
