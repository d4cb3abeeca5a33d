//! `wgpu` implementation of the driver surface.
//!
//! Buffers, textures, renderbuffers and samplers map onto their `wgpu`
//! counterparts. Framebuffers and vertex arrays have no `wgpu` object; they
//! are kept as state records and exposed to render code through
//! [`WgpuDriver::attachment_view`] and [`WgpuDriver::vertex_buffer_layouts`].
//!
//! Re-specifying a buffer or renderbuffer replaces the `wgpu` resource behind
//! the same name, so bind groups created earlier keep pointing at the old
//! resource and must be rebuilt.

mod mipmap;
mod pipeline;

use std::{cell::RefCell, fmt, ops::Range};

use self::mipmap::MipmapGenerator;
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

/// Errors that can occur while creating a [`WgpuDriver`].
#[derive(Debug)]
pub enum ContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
        }
    }
}

/// Vertex buffer layout that owns its attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedVertexLayout {
    /// Buffer binding point this layout describes.
    pub binding: u32,
    /// Distance between vertices in bytes.
    pub array_stride: wgpu::BufferAddress,
    /// Per-vertex or per-instance stepping.
    pub step_mode: wgpu::VertexStepMode,
    /// Attributes sourced from this binding.
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl OwnedVertexLayout {
    /// Borrow as a `wgpu` layout for pipeline creation.
    #[must_use]
    pub fn as_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

const ALIGN: usize = wgpu::COPY_BUFFER_ALIGNMENT as usize;

fn align_up(size: usize) -> usize {
    size.div_ceil(ALIGN) * ALIGN
}

struct BufferSlot {
    buffer: Option<wgpu::Buffer>,
    size: usize,
    immutable: bool,
}

/// Storage of a texture name. Views alias a sub-range of another texture.
#[derive(Clone)]
struct TextureImage {
    texture: wgpu::Texture,
    format: wgpu::TextureFormat,
    base_level: u32,
    levels: u32,
    base_layer: u32,
    layers: u32,
}

struct TextureSlot {
    kind: TextureKind,
    image: Option<TextureImage>,
    mip_range: (u32, u32),
    depth_stencil_mode: DepthStencilMode,
}

struct RenderbufferSlot {
    texture: Option<wgpu::Texture>,
}

#[derive(Default)]
struct SamplerSlot {
    state: SamplerState,
    sampler: Option<wgpu::Sampler>,
}

#[derive(Default)]
struct State {
    buffers: ObjectTable<BufferSlot>,
    textures: ObjectTable<TextureSlot>,
    samplers: ObjectTable<SamplerSlot>,
    renderbuffers: ObjectTable<RenderbufferSlot>,
    framebuffers: ObjectTable<FramebufferRecord>,
    vertex_arrays: ObjectTable<VertexArrayState>,
    mipmaps: Option<MipmapGenerator>,
}

impl State {
    fn describe(&self, image: AttachedImage) -> Option<ImageInfo> {
        match image {
            AttachedImage::Texture { texture, .. } => {
                let slot = self.textures.get(texture.0)?;
                Some(slot.image.as_ref().map_or(
                    ImageInfo {
                        format: None,
                        levels: 0,
                        samples: 1,
                        layered: slot.kind.is_layered(),
                    },
                    |image| ImageInfo {
                        format: Some(image.format),
                        levels: image.levels,
                        samples: image.texture.sample_count(),
                        layered: slot.kind.is_layered(),
                    },
                ))
            }
            AttachedImage::Renderbuffer(renderbuffer) => {
                let slot = self.renderbuffers.get(renderbuffer.0)?;
                Some(ImageInfo {
                    format: slot.texture.as_ref().map(wgpu::Texture::format),
                    levels: 1,
                    samples: slot
                        .texture
                        .as_ref()
                        .map_or(1, wgpu::Texture::sample_count),
                    layered: false,
                })
            }
        }
    }
}

/// Driver backed by a `wgpu` device and queue.
pub struct WgpuDriver {
    device: wgpu::Device,
    queue: wgpu::Queue,
    state: RefCell<State>,
}

impl WgpuDriver {
    /// Wrap an existing device and queue.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            state: RefCell::default(),
        }
    }

    /// Create a driver on the default adapter without a surface.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if no adapter is available or the device
    /// request fails.
    pub async fn headless() -> Result<Self, ContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(ContextError::AdapterRequest)?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("GPU Objects Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(ContextError::DeviceRequest)?;
        Ok(Self::new(device, queue))
    }

    /// The underlying device.
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The underlying queue.
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The `wgpu` buffer currently behind `buffer`.
    #[must_use]
    pub fn buffer(&self, buffer: BufferId) -> Option<wgpu::Buffer> {
        self.state
            .borrow()
            .buffers
            .get(buffer.0)
            .and_then(|slot| slot.buffer.clone())
    }

    /// A sampling view of `texture` honoring its mip range and
    /// depth-stencil mode.
    #[must_use]
    pub fn sampled_view(&self, texture: TextureId) -> Option<wgpu::TextureView> {
        let state = self.state.borrow();
        let slot = state.textures.get(texture.0)?;
        let image = slot.image.as_ref()?;
        let first = slot.mip_range.0.min(image.levels.saturating_sub(1));
        let last = slot.mip_range.1.clamp(first, image.levels - 1);
        let aspect = if image.format.has_depth_aspect()
            && image.format.has_stencil_aspect()
        {
            match slot.depth_stencil_mode {
                DepthStencilMode::Depth => wgpu::TextureAspect::DepthOnly,
                DepthStencilMode::Stencil => wgpu::TextureAspect::StencilOnly,
            }
        } else {
            wgpu::TextureAspect::All
        };
        Some(image.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Sampled View"),
            format: Some(image.format),
            dimension: Some(slot.kind.view_dimension()),
            aspect,
            base_mip_level: image.base_level + first,
            mip_level_count: Some(last - first + 1),
            base_array_layer: image.base_layer,
            array_layer_count: Some(image.layers),
            ..Default::default()
        }))
    }

    /// The `wgpu` sampler for `sampler`, built from its current state.
    #[must_use]
    pub fn sampler(&self, sampler: SamplerId) -> Option<wgpu::Sampler> {
        let mut state = self.state.borrow_mut();
        let slot = state.samplers.get_mut(sampler.0)?;
        if let Some(built) = &slot.sampler {
            return Some(built.clone());
        }
        let s = slot.state;
        let built = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sampler Object"),
            address_mode_u: s.wrap[0],
            address_mode_v: s.wrap[1],
            address_mode_w: s.wrap[2],
            mag_filter: s.mag_filter,
            min_filter: s.min_filter,
            mipmap_filter: s.mipmap_filter,
            compare: s.compare,
            border_color: s
                .wrap
                .contains(&wgpu::AddressMode::ClampToBorder)
                .then(|| s.wgpu_border_color()),
            ..Default::default()
        });
        slot.sampler = Some(built.clone());
        Some(built)
    }

    /// A single-image render target view of whatever is attached at `point`.
    #[must_use]
    pub fn attachment_view(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
    ) -> Option<wgpu::TextureView> {
        let point = match point {
            Attachment::DepthStencil => Attachment::Depth,
            other => other,
        };
        let state = self.state.borrow();
        match *state.framebuffers.get(framebuffer.0)?.attachments.get(&point)? {
            AttachedImage::Texture { texture, level } => {
                let slot = state.textures.get(texture.0)?;
                let image = slot.image.as_ref()?;
                let layered = slot.kind.is_layered();
                Some(image.texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Attachment View"),
                    format: Some(image.format),
                    dimension: Some(if layered {
                        wgpu::TextureViewDimension::D2Array
                    } else {
                        wgpu::TextureViewDimension::D2
                    }),
                    base_mip_level: image.base_level + level,
                    mip_level_count: Some(1),
                    base_array_layer: image.base_layer,
                    array_layer_count: Some(image.layers),
                    ..Default::default()
                }))
            }
            AttachedImage::Renderbuffer(renderbuffer) => state
                .renderbuffers
                .get(renderbuffer.0)?
                .texture
                .as_ref()
                .map(|texture| {
                    texture.create_view(&wgpu::TextureViewDescriptor::default())
                }),
        }
    }

    /// Vertex buffer layouts described by the enabled attributes of
    /// `vertex_array`, one per binding point, ordered by binding.
    #[must_use]
    pub fn vertex_buffer_layouts(
        &self,
        vertex_array: VertexArrayId,
    ) -> Option<Vec<OwnedVertexLayout>> {
        let state = self.state.borrow();
        let vao = state.vertex_arrays.get(vertex_array.0)?;
        let mut layouts = Vec::with_capacity(vao.bindings.len());
        for (&binding, binding_state) in &vao.bindings {
            let mut attributes = Vec::new();
            for (&location, attribute) in &vao.attributes {
                if !attribute.enabled || attribute.binding != binding {
                    continue;
                }
                let Some(format) = attribute.format else {
                    continue;
                };
                match format.kind.vertex_format(
                    format.components,
                    format.normalized,
                    format.integer,
                ) {
                    Some(vertex_format) => {
                        attributes.push(wgpu::VertexAttribute {
                            format: vertex_format,
                            offset: u64::from(format.offset),
                            shader_location: location,
                        });
                    }
                    None => log::warn!(
                        "attribute {location}: no vertex format for \
                         {:?}x{}",
                        format.kind,
                        format.components
                    ),
                }
            }
            let step_mode = match binding_state.divisor {
                0 => wgpu::VertexStepMode::Vertex,
                1 => wgpu::VertexStepMode::Instance,
                divisor => {
                    log::warn!(
                        "binding {binding}: divisor {divisor} unsupported, \
                         stepping once per instance"
                    );
                    wgpu::VertexStepMode::Instance
                }
            };
            layouts.push(OwnedVertexLayout {
                binding,
                array_stride: u64::from(binding_state.stride),
                step_mode,
                attributes,
            });
        }
        Some(layouts)
    }

    /// Buffer and byte offset bound at `binding` of `vertex_array`.
    #[must_use]
    pub fn vertex_buffer(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
    ) -> Option<(wgpu::Buffer, wgpu::BufferAddress)> {
        let binding = *self
            .state
            .borrow()
            .vertex_arrays
            .get(vertex_array.0)?
            .bindings
            .get(&binding)?;
        Some((self.buffer(binding.buffer?)?, binding.offset as u64))
    }

    /// Element buffer of `vertex_array`.
    #[must_use]
    pub fn element_buffer(
        &self,
        vertex_array: VertexArrayId,
    ) -> Option<wgpu::Buffer> {
        let element = self
            .state
            .borrow()
            .vertex_arrays
            .get(vertex_array.0)?
            .element_buffer?;
        self.buffer(element)
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn specify_buffer(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        usage: wgpu::BufferUsages,
        immutable: bool,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(slot) = state.buffers.get_mut(buffer.0) else {
            log::error!("unknown {buffer}");
            return;
        };
        if slot.immutable {
            log::error!("{buffer} has fixed storage and cannot be re-specified");
            return;
        }
        if data.is_some_and(|data| data.len() < size) {
            log::error!("{buffer}: initial data shorter than {size} bytes");
            return;
        }

        let mapped =
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::MAP_WRITE;
        let usage = usage.difference(mapped)
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;
        slot.size = size;
        slot.immutable = immutable;
        slot.buffer = (size > 0).then(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&buffer.to_string()),
                size: align_up(size) as u64,
                usage,
                mapped_at_creation: false,
            })
        });
        if let (Some(target), Some(data)) = (&slot.buffer, data) {
            let mut padded = data[..size].to_vec();
            padded.resize(align_up(size), 0);
            self.queue.write_buffer(target, 0, &padded);
        }
    }
}

impl Driver for WgpuDriver {
    fn create_buffer(&self) -> BufferId {
        BufferId(self.state.borrow_mut().buffers.insert(BufferSlot {
            buffer: None,
            size: 0,
            immutable: false,
        }))
    }

    fn delete_buffer(&self, buffer: BufferId) {
        match self.state.borrow_mut().buffers.remove(buffer.0) {
            Some(BufferSlot {
                buffer: Some(inner),
                ..
            }) => inner.destroy(),
            Some(_) => {}
            None => log::error!("unknown {buffer}"),
        }
    }

    fn buffer_storage(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        flags: wgpu::BufferUsages,
    ) {
        self.specify_buffer(buffer, size, data, flags, true);
    }

    fn buffer_data(
        &self,
        buffer: BufferId,
        size: usize,
        data: Option<&[u8]>,
        usage: wgpu::BufferUsages,
    ) {
        self.specify_buffer(buffer, size, data, usage, false);
    }

    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]) {
        let state = self.state.borrow();
        let Some(slot) = state.buffers.get(buffer.0) else {
            log::error!("unknown {buffer}");
            return;
        };
        if offset.checked_add(data.len()).is_none_or(|end| end > slot.size) {
            log::error!(
                "{buffer}: write of {} bytes at {offset} exceeds size {}",
                data.len(),
                slot.size
            );
            return;
        }
        if offset % ALIGN != 0 || data.len() % ALIGN != 0 {
            log::error!(
                "{buffer}: write at {offset} of {} bytes is not \
                 {ALIGN}-byte aligned",
                data.len()
            );
            return;
        }
        if let Some(target) = &slot.buffer {
            self.queue.write_buffer(target, offset as u64, data);
        }
    }

    fn copy_buffer_sub_data(
        &self,
        src: BufferId,
        dst: BufferId,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
    ) {
        if size == 0 {
            return;
        }
        let state = self.state.borrow();
        let (Some(from), Some(to)) =
            (state.buffers.get(src.0), state.buffers.get(dst.0))
        else {
            log::error!("copy between unknown buffers {src} and {dst}");
            return;
        };
        let in_range = |offset: usize, slot: &BufferSlot| {
            offset.checked_add(size).is_some_and(|end| end <= slot.size)
        };
        if !in_range(src_offset, from) || !in_range(dst_offset, to) {
            log::error!("copy of {size} bytes from {src} to {dst} out of range");
            return;
        }
        if src_offset % ALIGN != 0 || dst_offset % ALIGN != 0 {
            log::error!("copy offsets must be {ALIGN}-byte aligned");
            return;
        }
        let (Some(from), Some(to)) = (&from.buffer, &to.buffer) else {
            return;
        };
        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Buffer Copy"),
                });
        encoder.copy_buffer_to_buffer(
            from,
            src_offset as u64,
            to,
            dst_offset as u64,
            align_up(size) as u64,
        );
        self.submit(encoder);
    }

    fn create_texture(&self, kind: TextureKind) -> TextureId {
        TextureId(self.state.borrow_mut().textures.insert(TextureSlot {
            kind,
            image: None,
            mip_range: (0, 1000),
            depth_stencil_mode: DepthStencilMode::Depth,
        }))
    }

    fn delete_texture(&self, texture: TextureId) {
        if self.state.borrow_mut().textures.remove(texture.0).is_none() {
            log::error!("unknown {texture}");
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
        let Some(slot) = state.textures.get_mut(texture.0) else {
            log::error!("unknown {texture}");
            return;
        };
        if slot.image.is_some() {
            log::error!("{texture} already has immutable storage");
            return;
        }
        let (dimension, size) = match slot.kind {
            TextureKind::D1 => (wgpu::TextureDimension::D1, extent),
            TextureKind::D1Array => {
                log::error!("{texture}: 1D array textures are not supported");
                return;
            }
            TextureKind::D2 | TextureKind::D2Array => {
                (wgpu::TextureDimension::D2, extent)
            }
            TextureKind::D3 => (wgpu::TextureDimension::D3, extent),
            TextureKind::Cube => (
                wgpu::TextureDimension::D2,
                wgpu::Extent3d {
                    depth_or_array_layers: 6,
                    ..extent
                },
            ),
        };
        let levels = levels.clamp(1, size.max_mips(dimension));
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT;
        if dimension == wgpu::TextureDimension::D1 {
            usage.remove(wgpu::TextureUsages::RENDER_ATTACHMENT);
        }
        usage &= format
            .guaranteed_format_features(self.device.features())
            .allowed_usages;
        let alternate = if format.is_srgb() {
            format.remove_srgb_suffix()
        } else {
            format.add_srgb_suffix()
        };
        let view_formats: &[wgpu::TextureFormat] =
            if alternate == format { &[] } else { &[alternate] };

        let inner = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&texture.to_string()),
            size,
            mip_level_count: levels,
            sample_count: 1,
            dimension,
            format,
            usage,
            view_formats,
        });
        let layers = if dimension == wgpu::TextureDimension::D3 {
            1
        } else {
            size.depth_or_array_layers
        };
        slot.image = Some(TextureImage {
            texture: inner,
            format,
            base_level: 0,
            levels,
            base_layer: 0,
            layers,
        });
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
        let state = self.state.borrow();
        let Some(image) = state
            .textures
            .get(texture.0)
            .and_then(|slot| slot.image.as_ref())
        else {
            log::error!("{texture} has no storage");
            return;
        };
        if level >= image.levels {
            log::error!(
                "{texture}: level {level} out of {} levels",
                image.levels
            );
            return;
        }
        let bytes_per_pixel = format.bytes_per_pixel(element);
        if image.format.block_copy_size(None) != Some(bytes_per_pixel as u32) {
            log::error!(
                "{texture}: {format:?} pixels of {:?} do not match {:?}",
                element.kind,
                image.format
            );
            return;
        }
        let bytes_per_row = extent.width as usize * bytes_per_pixel;
        let expected = bytes_per_row
            * extent.height as usize
            * extent.depth_or_array_layers as usize;
        if data.len() < expected {
            log::error!(
                "{texture}: upload needs {expected} bytes, got {}",
                data.len()
            );
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &image.texture,
                mip_level: image.base_level + level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: image.base_layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &data[..expected],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row as u32),
                rows_per_image: Some(extent.height),
            },
            extent,
        );
    }

    fn generate_texture_mipmap(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        let Some(slot) = state.textures.get(texture.0) else {
            log::error!("unknown {texture}");
            return;
        };
        let Some(image) = slot.image.clone() else {
            log::error!("{texture} has no storage");
            return;
        };
        if slot.kind == TextureKind::D3 || slot.kind == TextureKind::D1 {
            log::warn!("{texture}: mipmap generation needs 2D layers");
            return;
        }
        let filterable = image
            .format
            .guaranteed_format_features(self.device.features())
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE);
        if !filterable
            || !image
                .texture
                .usage()
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            log::warn!(
                "{texture}: {:?} cannot be filtered and rendered to",
                image.format
            );
            return;
        }

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Mipmap Generation"),
                });
        state
            .mipmaps
            .get_or_insert_with(|| MipmapGenerator::new(&self.device))
            .generate(
                &self.device,
                &mut encoder,
                &image.texture,
                image.format,
                image.base_level..image.base_level + image.levels,
                image.base_layer..image.base_layer + image.layers,
            );
        self.submit(encoder);
    }

    fn texture_mip_range(&self, texture: TextureId, base: u32, max: u32) {
        match self.state.borrow_mut().textures.get_mut(texture.0) {
            Some(slot) => slot.mip_range = (base, max),
            None => log::error!("unknown {texture}"),
        }
    }

    fn texture_depth_stencil_mode(
        &self,
        texture: TextureId,
        mode: DepthStencilMode,
    ) {
        match self.state.borrow_mut().textures.get_mut(texture.0) {
            Some(slot) => slot.depth_stencil_mode = mode,
            None => log::error!("unknown {texture}"),
        }
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
        let image = match state
            .textures
            .get(source.0)
            .and_then(|slot| slot.image.as_ref())
        {
            Some(src) => {
                let compatible = format == src.format
                    || format == src.format.add_srgb_suffix()
                    || format == src.format.remove_srgb_suffix();
                let valid = compatible
                    && !levels.is_empty()
                    && levels.end <= src.levels
                    && !layers.is_empty()
                    && layers.end <= src.layers;
                if valid {
                    Some(TextureImage {
                        texture: src.texture.clone(),
                        format,
                        base_level: src.base_level + levels.start,
                        levels: levels.end - levels.start,
                        base_layer: src.base_layer + layers.start,
                        layers: layers.end - layers.start,
                    })
                } else {
                    log::error!("invalid view of {source}");
                    None
                }
            }
            None => {
                log::error!("{source} has no storage to view");
                None
            }
        };
        TextureId(state.textures.insert(TextureSlot {
            kind,
            image,
            mip_range: (0, 1000),
            depth_stencil_mode: DepthStencilMode::Depth,
        }))
    }

    fn create_sampler(&self) -> SamplerId {
        SamplerId(
            self.state
                .borrow_mut()
                .samplers
                .insert(SamplerSlot::default()),
        )
    }

    fn delete_sampler(&self, sampler: SamplerId) {
        if self.state.borrow_mut().samplers.remove(sampler.0).is_none() {
            log::error!("unknown {sampler}");
        }
    }

    fn sampler_parameter(&self, sampler: SamplerId, parameter: SamplerParameter) {
        match self.state.borrow_mut().samplers.get_mut(sampler.0) {
            Some(slot) => {
                slot.state.apply(parameter);
                slot.sampler = None;
            }
            None => log::error!("unknown {sampler}"),
        }
    }

    fn create_renderbuffer(&self) -> RenderbufferId {
        RenderbufferId(
            self.state
                .borrow_mut()
                .renderbuffers
                .insert(RenderbufferSlot { texture: None }),
        )
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        match self.state.borrow_mut().renderbuffers.remove(renderbuffer.0) {
            Some(RenderbufferSlot {
                texture: Some(texture),
            }) => texture.destroy(),
            Some(_) => {}
            None => log::error!("unknown {renderbuffer}"),
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
        let Some(slot) = state.renderbuffers.get_mut(renderbuffer.0) else {
            log::error!("unknown {renderbuffer}");
            return;
        };
        if width == 0 || height == 0 {
            slot.texture = None;
            return;
        }
        slot.texture = Some(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&renderbuffer.to_string()),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples.max(1),
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        }));
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
        if self
            .state
            .borrow_mut()
            .framebuffers
            .remove(framebuffer.0)
            .is_none()
        {
            log::error!("unknown {framebuffer}");
        }
    }

    fn framebuffer_texture(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        texture: TextureId,
        level: u32,
    ) {
        match self.state.borrow_mut().framebuffers.get_mut(framebuffer.0) {
            Some(record) => {
                record.attach(point, AttachedImage::Texture { texture, level });
            }
            None => log::error!("unknown {framebuffer}"),
        }
    }

    fn framebuffer_renderbuffer(
        &self,
        framebuffer: FramebufferId,
        point: Attachment,
        renderbuffer: RenderbufferId,
    ) {
        match self.state.borrow_mut().framebuffers.get_mut(framebuffer.0) {
            Some(record) => {
                record.attach(point, AttachedImage::Renderbuffer(renderbuffer));
            }
            None => log::error!("unknown {framebuffer}"),
        }
    }

    fn framebuffer_draw_buffers(
        &self,
        framebuffer: FramebufferId,
        buffers: &[DrawBuffer],
    ) {
        match self.state.borrow_mut().framebuffers.get_mut(framebuffer.0) {
            Some(record) => record.draw_buffers = buffers.to_vec(),
            None => log::error!("unknown {framebuffer}"),
        }
    }

    fn framebuffer_read_buffer(
        &self,
        framebuffer: FramebufferId,
        buffer: DrawBuffer,
    ) {
        match self.state.borrow_mut().framebuffers.get_mut(framebuffer.0) {
            Some(record) => record.read_buffer = Some(buffer),
            None => log::error!("unknown {framebuffer}"),
        }
    }

    fn check_framebuffer_status(
        &self,
        framebuffer: FramebufferId,
        target: FramebufferTarget,
    ) -> u32 {
        let state = self.state.borrow();
        state.framebuffers.get(framebuffer.0).map_or_else(
            || {
                log::error!("unknown {framebuffer}");
                0
            },
            |record| record.evaluate(target, |image| state.describe(image)),
        )
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
        if self
            .state
            .borrow_mut()
            .vertex_arrays
            .remove(vertex_array.0)
            .is_none()
        {
            log::error!("unknown {vertex_array}");
        }
    }

    fn enable_vertex_attrib(&self, vertex_array: VertexArrayId, attribute: u32) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => {
                vao.attributes.entry(attribute).or_default().enabled = true;
            }
            None => log::error!("unknown {vertex_array}"),
        }
    }

    fn vertex_attrib_format(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        format: AttribFormat,
    ) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => {
                vao.attributes.entry(attribute).or_default().format =
                    Some(format);
            }
            None => log::error!("unknown {vertex_array}"),
        }
    }

    fn vertex_attrib_binding(
        &self,
        vertex_array: VertexArrayId,
        attribute: u32,
        binding: u32,
    ) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => {
                vao.attributes.entry(attribute).or_default().binding = binding;
            }
            None => log::error!("unknown {vertex_array}"),
        }
    }

    fn vertex_array_vertex_buffer(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: usize,
        stride: u32,
    ) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => {
                let entry = vao.bindings.entry(binding).or_default();
                entry.buffer = Some(buffer);
                entry.offset = offset;
                entry.stride = stride;
            }
            None => log::error!("unknown {vertex_array}"),
        }
    }

    fn vertex_array_element_buffer(
        &self,
        vertex_array: VertexArrayId,
        buffer: BufferId,
    ) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => vao.element_buffer = Some(buffer),
            None => log::error!("unknown {vertex_array}"),
        }
    }

    fn vertex_binding_divisor(
        &self,
        vertex_array: VertexArrayId,
        binding: u32,
        divisor: u32,
    ) {
        match self.state.borrow_mut().vertex_arrays.get_mut(vertex_array.0) {
            Some(vao) => vao.bindings.entry(binding).or_default().divisor = divisor,
            None => log::error!("unknown {vertex_array}"),
        }
    }
}
