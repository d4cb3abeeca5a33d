//! Host-memory implementation of the driver surface.
//!
//! Every object lives in a table behind a `RefCell`. Buffers keep their real
//! bytes so copies and writes are observable; textures and renderbuffers keep
//! format and level bookkeeping only. Calls a real driver would reject are
//! logged, recorded as [`DriverError`]s and otherwise ignored.

use std::{cell::RefCell, fmt, ops::Range};

use super::{
    completeness::{AttachedImage, FramebufferRecord, ImageInfo},
    state::{SamplerState, VertexArrayState},
    table::ObjectTable,
    AttribFormat, BufferId, DepthStencilMode, Driver, FramebufferId,
    FramebufferTarget, PixelFormat, RenderbufferId, SamplerId,
    SamplerParameter, TextureId, TextureKind, VertexArrayId,
};
use crate::gpu::{
    attachment::{Attachment, DrawBuffer},
    element::ElementDescriptor,
};

/// A call rejected by [`MemoryDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The call named an object that does not exist.
    UnknownObject {
        /// Object type.
        kind: &'static str,
        /// Raw name.
        name: u32,
    },
    /// Fixed buffer storage cannot be re-specified.
    ImmutableBuffer(BufferId),
    /// A write or copy reached past the end of a buffer.
    BufferRange {
        /// Buffer accessed out of range.
        buffer: BufferId,
        /// First byte accessed.
        offset: usize,
        /// Number of bytes accessed.
        len: usize,
        /// Size of the buffer.
        size: usize,
    },
    /// Initial data shorter than the requested allocation.
    ShortInitialData {
        /// Buffer being allocated.
        buffer: BufferId,
        /// Requested size.
        size: usize,
        /// Bytes supplied.
        supplied: usize,
    },
    /// Texture storage can only be allocated once.
    ImmutableTexture(TextureId),
    /// The texture has no storage yet.
    TextureNotAllocated(TextureId),
    /// A mip level beyond the allocated chain.
    LevelOutOfRange {
        /// Texture accessed.
        texture: TextureId,
        /// Requested level.
        level: u32,
        /// Allocated levels.
        levels: u32,
    },
    /// Pixel data shorter than the upload region.
    UploadTooSmall {
        /// Destination texture.
        texture: TextureId,
        /// Bytes the region needs.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// A texture view with an empty or out-of-range level/layer range, or an
    /// incompatible format.
    InvalidView(TextureId),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownObject { kind, name } => {
                write!(f, "unknown {kind} #{name}")
            }
            Self::ImmutableBuffer(id) => {
                write!(f, "{id} has fixed storage and cannot be re-specified")
            }
            Self::BufferRange {
                buffer,
                offset,
                len,
                size,
            } => write!(
                f,
                "{buffer}: range {offset}..{} exceeds size {size}",
                offset.saturating_add(*len)
            ),
            Self::ShortInitialData {
                buffer,
                size,
                supplied,
            } => write!(
                f,
                "{buffer}: {supplied} bytes supplied for a {size}-byte allocation"
            ),
            Self::ImmutableTexture(id) => {
                write!(f, "{id} already has immutable storage")
            }
            Self::TextureNotAllocated(id) => write!(f, "{id} has no storage"),
            Self::LevelOutOfRange {
                texture,
                level,
                levels,
            } => write!(f, "{texture}: level {level} out of {levels} levels"),
            Self::UploadTooSmall {
                texture,
                expected,
                actual,
            } => write!(
                f,
                "{texture}: upload needs {expected} bytes, got {actual}"
            ),
            Self::InvalidView(id) => write!(f, "invalid view of {id}"),
        }
    }
}

impl std::error::Error for DriverError {}

struct BufferRecord {
    bytes: Vec<u8>,
    usage: wgpu::BufferUsages,
    immutable: bool,
}

struct TextureRecord {
    kind: TextureKind,
    format: Option<wgpu::TextureFormat>,
    levels: u32,
    extent: wgpu::Extent3d,
    mip_range: (u32, u32),
    depth_stencil_mode: DepthStencilMode,
    written: Vec<bool>,
}

impl TextureRecord {
    fn new(kind: TextureKind) -> Self {
        Self {
            kind,
            format: None,
            levels: 0,
            extent: wgpu::Extent3d::default(),
            mip_range: (0, 1000),
            depth_stencil_mode: DepthStencilMode::Depth,
            written: Vec::new(),
        }
    }
}

#[derive(Default)]
struct RenderbufferRecord {
    format: Option<wgpu::TextureFormat>,
    width: u32,
    height: u32,
    samples: u32,
}

#[derive(Default)]
struct State {
    buffers: ObjectTable<BufferRecord>,
    textures: ObjectTable<TextureRecord>,
    samplers: ObjectTable<SamplerState>,
    renderbuffers: ObjectTable<RenderbufferRecord>,
    framebuffers: ObjectTable<FramebufferRecord>,
    vertex_arrays: ObjectTable<VertexArrayState>,
    errors: Vec<DriverError>,
}

impl State {
    fn reject(&mut self, error: DriverError) {
        log::warn!("driver rejected call: {error}");
        self.errors.push(error);
    }

    fn unknown(&mut self, kind: &'static str, name: u32) {
        self.reject(DriverError::UnknownObject { kind, name });
    }

    fn describe(&self, image: AttachedImage) -> Option<ImageInfo> {
        match image {
            AttachedImage::Texture { texture, .. } => {
                let record = self.textures.get(texture.0)?;
                Some(ImageInfo {
                    format: record.format,
                    levels: record.levels,
                    samples: 1,
                    layered: record.kind.is_layered(),
                })
            }
            AttachedImage::Renderbuffer(renderbuffer) => {
                let record = self.renderbuffers.get(renderbuffer.0)?;
                let allocated = record.width > 0 && record.height > 0;
                Some(ImageInfo {
                    format: record.format.filter(|_| allocated),
                    levels: 1,
                    samples: record.samples.max(1),
                    layered: false,
                })
            }
        }
    }

    fn specify_buffer(
        &mut self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        usage: wgpu::BufferUsages,
        immutable: bool,
    ) {
        let short = data.filter(|data| data.len() < size).map(<[u8]>::len);
        let Some(record) = self.buffers.get_mut(buffer.0) else {
            self.unknown("buffer", buffer.raw());
            return;
        };
        if record.immutable {
            self.reject(DriverError::ImmutableBuffer(buffer));
            return;
        }
        if let Some(supplied) = short {
            self.reject(DriverError::ShortInitialData {
                buffer,
                size,
                supplied,
            });
            return;
        }
        record.bytes = data.map_or_else(
            || vec![0; size],
            |data| data[..size].to_vec(),
        );
        record.usage = usage;
        record.immutable = immutable;
    }
}

/// Driver keeping every object in host memory.
#[derive(Default)]
pub struct MemoryDriver {
    state: RefCell<State>,
}

impl MemoryDriver {
    /// Create an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the calls rejected so far, oldest first.
    pub fn take_errors(&self) -> Vec<DriverError> {
        std::mem::take(&mut self.state.borrow_mut().errors)
    }

    /// Current contents of a buffer.
    #[must_use]
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .buffers
            .get(buffer.0)
            .map(|record| record.bytes.clone())
    }

    /// Usage flags a buffer was last specified with.
    #[must_use]
    pub fn buffer_usage(&self, buffer: BufferId) -> Option<wgpu::BufferUsages> {
        self.state
            .borrow()
            .buffers
            .get(buffer.0)
            .map(|record| record.usage)
    }

    /// Whether a buffer has fixed storage.
    #[must_use]
    pub fn is_buffer_immutable(&self, buffer: BufferId) -> Option<bool> {
        self.state
            .borrow()
            .buffers
            .get(buffer.0)
            .map(|record| record.immutable)
    }

    /// Number of buffer objects alive.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Number of texture objects alive, views included.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Storage format and level count of a texture.
    #[must_use]
    pub fn texture_storage_info(
        &self,
        texture: TextureId,
    ) -> Option<(wgpu::TextureFormat, u32)> {
        let state = self.state.borrow();
        let record = state.textures.get(texture.0)?;
        record.format.map(|format| (format, record.levels))
    }

    /// Whether `level` of a texture has received pixel data.
    #[must_use]
    pub fn texture_level_written(&self, texture: TextureId, level: u32) -> bool {
        self.state
            .borrow()
            .textures
            .get(texture.0)
            .and_then(|record| record.written.get(level as usize).copied())
            .unwrap_or(false)
    }

    /// Sampled mip range `(base, max)` of a texture.
    #[must_use]
    pub fn texture_mip_range(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .textures
            .get(texture.0)
            .map(|record| record.mip_range)
    }

    /// Sampled aspect of a depth-stencil texture.
    #[must_use]
    pub fn texture_depth_stencil_mode(
        &self,
        texture: TextureId,
    ) -> Option<DepthStencilMode> {
        self.state
            .borrow()
            .textures
            .get(texture.0)
            .map(|record| record.depth_stencil_mode)
    }

    /// Current parameter state of a sampler.
    #[must_use]
    pub fn sampler_state(&self, sampler: SamplerId) -> Option<SamplerState> {
        self.state.borrow().samplers.get(sampler.0).copied()
    }

    /// Current state of a vertex array.
    #[must_use]
    pub fn vertex_array_state(
        &self,
        vertex_array: VertexArrayId,
    ) -> Option<VertexArrayState> {
        self.state.borrow().vertex_arrays.get(vertex_array.0).cloned()
    }

    /// Draw buffers selected on a framebuffer.
    #[must_use]
    pub fn draw_buffers(
        &self,
        framebuffer: FramebufferId,
    ) -> Option<Vec<DrawBuffer>> {
        self.state
            .borrow()
            .framebuffers
            .get(framebuffer.0)
            .map(|record| record.draw_buffers.clone())
    }

    /// Texture and level attached at `point`, if a texture is attached there.
    #[must_use]
    pub fn attached_texture(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
    ) -> Option<(TextureId, u32)> {
        let point = match point {
            Attachment::DepthStencil => Attachment::Depth,
            other => other,
        };
        match self
            .state
            .borrow()
            .framebuffers
            .get(framebuffer.0)?
            .attachments
            .get(&point)?
        {
            AttachedImage::Texture { texture, level } => Some((*texture, *level)),
            AttachedImage::Renderbuffer(_) => None,
        }
    }

    fn with_framebuffer(
        &self,
        framebuffer: FramebufferId,
        update: impl FnOnce(&mut FramebufferRecord),
    ) {
        let mut state = self.state.borrow_mut();
        match state.framebuffers.get_mut(framebuffer.0) {
            Some(record) => update(record),
            None => state.unknown("framebuffer", framebuffer.raw()),
        }
    }

    fn with_vertex_array(
        &self,
        vertex_array: VertexArrayId,
        update: impl FnOnce(&mut VertexArrayState),
    ) {
        let mut state = self.state.borrow_mut();
        match state.vertex_arrays.get_mut(vertex_array.0) {
            Some(record) => update(record),
            None => state.unknown("vertex array", vertex_array.raw()),
        }
    }

    fn with_texture(
        &self,
        texture: TextureId,
        update: impl FnOnce(&mut TextureRecord),
    ) {
        let mut state = self.state.borrow_mut();
        match state.textures.get_mut(texture.0) {
            Some(record) => update(record),
            None => state.unknown("texture", texture.raw()),
        }
    }
}

impl Driver for MemoryDriver {
    fn create_buffer(&self) -> BufferId {
        BufferId(self.state.borrow_mut().buffers.insert(BufferRecord {
            bytes: Vec::new(),
            usage: wgpu::BufferUsages::empty(),
            immutable: false,
        }))
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(buffer.0).is_none() {
            state.unknown("buffer", buffer.raw());
        }
    }

    fn buffer_storage(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        flags: wgpu::BufferUsages,
    ) {
        self.state
            .borrow_mut()
            .specify_buffer(buffer, size, data, flags, true);
    }

    fn buffer_data(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        usage: wgpu::BufferUsages,
    ) {
        self.state
            .borrow_mut()
            .specify_buffer(buffer, size, data, usage, false);
    }

    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.buffers.get_mut(buffer.0) else {
            state.unknown("buffer", buffer.raw());
            return;
        };
        let size = record.bytes.len();
        if let Some(target) = offset
            .checked_add(data.len())
            .and_then(|end| record.bytes.get_mut(offset..end))
        {
            target.copy_from_slice(data);
            return;
        }
        state.reject(DriverError::BufferRange {
            buffer,
            offset,
            len: data.len(),
            size,
        });
    }

    fn copy_buffer_sub_data(
        &self,
        src: BufferId,
        dst: BufferId,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
    ) {
        let mut state = self.state.borrow_mut();
        let source = match state.buffers.get(src.0) {
            Some(record) => record
                .bytes
                .get(src_offset..src_offset.saturating_add(size))
                .map(<[u8]>::to_vec)
                .ok_or(DriverError::BufferRange {
                    buffer: src,
                    offset: src_offset,
                    len: size,
                    size: record.bytes.len(),
                }),
            None => Err(DriverError::UnknownObject {
                kind: "buffer",
                name: src.raw(),
            }),
        };
        let source = match source {
            Ok(bytes) => bytes,
            Err(error) => {
                state.reject(error);
                return;
            }
        };
        let Some(record) = state.buffers.get_mut(dst.0) else {
            state.unknown("buffer", dst.raw());
            return;
        };
        let dst_size = record.bytes.len();
        match record.bytes.get_mut(dst_offset..dst_offset.saturating_add(size)) {
            Some(target) => target.copy_from_slice(&source),
            None => state.reject(DriverError::BufferRange {
                buffer: dst,
                offset: dst_offset,
                len: size,
                size: dst_size,
            }),
        }
    }

    fn create_texture(&self, kind: TextureKind) -> TextureId {
        TextureId(
            self.state
                .borrow_mut()
                .textures
                .insert(TextureRecord::new(kind)),
        )
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(texture.0).is_none() {
            state.unknown("texture", texture.raw());
        }
    }

    fn texture_storage(
        &self,
        texture: TextureId,
        levels: u32,
        format: wgpu::TextureFormat,
        extent: wgpu::Extent3d,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.textures.get_mut(texture.0) else {
            state.unknown("texture", texture.raw());
            return;
        };
        if record.format.is_some() {
            state.reject(DriverError::ImmutableTexture(texture));
            return;
        }
        record.format = Some(format);
        record.levels = levels;
        record.extent = extent;
        record.written = vec![false; levels as usize];
    }

    fn texture_sub_image(
        &self,
        texture: TextureId,
        level: u32,
        extent: wgpu::Extent3d,
        format: PixelFormat,
        element: ElementDescriptor,
        data: &[u8],
    ) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.textures.get_mut(texture.0) else {
            state.unknown("texture", texture.raw());
            return;
        };
        if record.format.is_none() {
            state.reject(DriverError::TextureNotAllocated(texture));
            return;
        }
        let levels = record.levels;
        let Some(written) = record.written.get_mut(level as usize) else {
            state.reject(DriverError::LevelOutOfRange {
                texture,
                level,
                levels,
            });
            return;
        };
        let texels = extent.width as usize
            * extent.height as usize
            * extent.depth_or_array_layers as usize;
        let expected = texels * format.bytes_per_pixel(element);
        if data.len() < expected {
            state.reject(DriverError::UploadTooSmall {
                texture,
                expected,
                actual: data.len(),
            });
            return;
        }
        *written = true;
    }

    fn generate_texture_mipmap(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.textures.get_mut(texture.0) else {
            state.unknown("texture", texture.raw());
            return;
        };
        if record.format.is_none() {
            state.reject(DriverError::TextureNotAllocated(texture));
            return;
        }
        record.written.fill(true);
    }

    fn texture_mip_range(&self, texture: TextureId, base: u32, max: u32) {
        self.with_texture(texture, |record| record.mip_range = (base, max));
    }

    fn texture_depth_stencil_mode(
        &self,
        texture: TextureId,
        mode: DepthStencilMode,
    ) {
        self.with_texture(texture, |record| record.depth_stencil_mode = mode);
    }

    fn texture_view(
        &self,
        source: TextureId,
        kind: TextureKind,
        format: wgpu::TextureFormat,
        levels: Range<u32>,
        layers: Range<u32>,
    ) -> TextureId {
        let mut state = self.state.borrow_mut();
        let mut view = TextureRecord::new(kind);
        match state.textures.get(source.0) {
            Some(src) => {
                let compatible = src.format.is_some_and(|src_format| {
                    src_format.block_copy_size(None)
                        == format.block_copy_size(None)
                });
                let layer_count = if src.kind == TextureKind::Cube {
                    6
                } else {
                    src.extent.depth_or_array_layers
                };
                if compatible
                    && !levels.is_empty()
                    && levels.end <= src.levels
                    && !layers.is_empty()
                    && layers.end <= layer_count.max(1)
                {
                    view.format = Some(format);
                    view.levels = levels.end - levels.start;
                    view.extent = wgpu::Extent3d {
                        depth_or_array_layers: layers.end - layers.start,
                        ..src.extent
                    };
                    view.written =
                        src.written[levels.start as usize..levels.end as usize]
                            .to_vec();
                } else {
                    state.reject(DriverError::InvalidView(source));
                }
            }
            None => state.unknown("texture", source.raw()),
        }
        TextureId(state.textures.insert(view))
    }

    fn create_sampler(&self) -> SamplerId {
        SamplerId(
            self.state
                .borrow_mut()
                .samplers
                .insert(SamplerState::default()),
        )
    }

    fn delete_sampler(&self, sampler: SamplerId) {
        let mut state = self.state.borrow_mut();
        if state.samplers.remove(sampler.0).is_none() {
            state.unknown("sampler", sampler.raw());
        }
    }

    fn sampler_parameter(&self, sampler: SamplerId, parameter: SamplerParameter) {
        let mut state = self.state.borrow_mut();
        match state.samplers.get_mut(sampler.0) {
            Some(record) => record.apply(parameter),
            None => state.unknown("sampler", sampler.raw()),
        }
    }

    fn create_renderbuffer(&self) -> RenderbufferId {
        RenderbufferId(
            self.state
                .borrow_mut()
                .renderbuffers
                .insert(RenderbufferRecord::default()),
        )
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        let mut state = self.state.borrow_mut();
        if state.renderbuffers.remove(renderbuffer.0).is_none() {
            state.unknown("renderbuffer", renderbuffer.raw());
        }
    }

    fn renderbuffer_storage(
        &self,
        renderbuffer: RenderbufferId,
        format: wgpu::TextureFormat,
        samples: u32,
        width: u32,
        height: u32,
    ) {
        let mut state = self.state.borrow_mut();
        match state.renderbuffers.get_mut(renderbuffer.0) {
            Some(record) => {
                *record = RenderbufferRecord {
                    format: Some(format),
                    width,
                    height,
                    samples,
                };
            }
            None => state.unknown("renderbuffer", renderbuffer.raw()),
        }
    }

    fn create_framebuffer(&self) -> FramebufferId {
        FramebufferId(
            self.state
                .borrow_mut()
                .framebuffers
                .insert(FramebufferRecord::default()),
        )
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut state = self.state.borrow_mut();
        if state.framebuffers.remove(framebuffer.0).is_none() {
            state.unknown("framebuffer", framebuffer.raw());
        }
    }

    fn framebuffer_texture(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        texture: TextureId,
        level: u32,
    ) {
        self.with_framebuffer(framebuffer, |record| {
            record.attach(point, AttachedImage::Texture { texture, level });
        });
    }

    fn framebuffer_renderbuffer(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        renderbuffer: RenderbufferId,
    ) {
        self.with_framebuffer(framebuffer, |record| {
            record.attach(point, AttachedImage::Renderbuffer(renderbuffer));
        });
    }

    fn framebuffer_draw_buffers(
        &self,
        framebuffer: FramebufferId,
        buffers: &[DrawBuffer],
    ) {
        self.with_framebuffer(framebuffer, |record| {
            record.draw_buffers = buffers.to_vec();
        });
    }

    fn framebuffer_read_buffer(
        &self,
        framebuffer: FramebufferId,
        buffer: DrawBuffer,
    ) {
        self.with_framebuffer(framebuffer, |record| {
            record.read_buffer = Some(buffer);
        });
    }

    fn check_framebuffer_status(
        &self,
        framebuffer: FramebufferId,
        target: FramebufferTarget,
    ) -> u32 {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.framebuffers.get(framebuffer.0) else {
            state.unknown("framebuffer", framebuffer.raw());
            return 0;
        };
        record.evaluate(target, |image| state.describe(image))
    }

    fn create_vertex_array(&self) -> VertexArrayId {
        VertexArrayId(
            self.state
                .borrow_mut()
                .vertex_arrays
                .insert(VertexArrayState::default()),
        )
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(vertex_array.0).is_none() {
            state.unknown("vertex array", vertex_array.raw());
        }
    }

    fn enable_vertex_attrib(&self, vertex_array: VertexArrayId, attribute: u32) {
        self.with_vertex_array(vertex_array, |record| {
            record.attributes.entry(attribute).or_default().enabled = true;
        });
    }

    fn vertex_attrib_format(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        format: AttribFormat,
    ) {
        self.with_vertex_array(vertex_array, |record| {
            record.attributes.entry(attribute).or_default().format =
                Some(format);
        });
    }

    fn vertex_attrib_binding(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        binding: u32,
    ) {
        self.with_vertex_array(vertex_array, |record| {
            record.attributes.entry(attribute).or_default().binding = binding;
        });
    }

    fn vertex_array_vertex_buffer(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: usize,
        stride: u32,
    ) {
        self.with_vertex_array(vertex_array, |record| {
            let entry = record.bindings.entry(binding).or_default();
            entry.buffer = Some(buffer);
            entry.offset = offset;
            entry.stride = stride;
        });
    }

    fn vertex_array_element_buffer(
        &self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
    ) {
        self.with_vertex_array(vertex_array, |record| {
            record.element_buffer = Some(buffer);
        });
    }

    fn vertex_binding_divisor(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        divisor: u32,
    ) {
        self.with_vertex_array(vertex_array, |record| {
            record.bindings.entry(binding).or_default().divisor = divisor;
        });
    }
}
