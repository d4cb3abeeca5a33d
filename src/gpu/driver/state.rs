//! Backend-independent state records for samplers and vertex arrays.

use std::collections::BTreeMap;

use super::{AttribFormat, BufferId, SamplerParameter};

/// Full parameter state of a sampler object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    /// Minification filter.
    pub min_filter: wgpu::FilterMode,
    /// Magnification filter.
    pub mag_filter: wgpu::FilterMode,
    /// Filter between mip levels.
    pub mipmap_filter: wgpu::FilterMode,
    /// Wrap modes along s, t and r.
    pub wrap: [wgpu::AddressMode; 3],
    /// Depth comparison function, if comparison is enabled.
    pub compare: Option<wgpu::CompareFunction>,
    /// Border color for clamp-to-border addressing.
    pub border_color: [f32; 4],
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: wgpu::FilterMode::Nearest,
            mag_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            wrap: [wgpu::AddressMode::Repeat; 3],
            compare: None,
            border_color: [0.0; 4],
        }
    }
}

impl SamplerState {
    /// Apply one parameter update.
    pub fn apply(&mut self, parameter: SamplerParameter) {
        match parameter {
            SamplerParameter::MinFilter(mode) => self.min_filter = mode,
            SamplerParameter::MagFilter(mode) => self.mag_filter = mode,
            SamplerParameter::MipmapFilter(mode) => self.mipmap_filter = mode,
            SamplerParameter::WrapS(mode) => self.wrap[0] = mode,
            SamplerParameter::WrapT(mode) => self.wrap[1] = mode,
            SamplerParameter::WrapR(mode) => self.wrap[2] = mode,
            SamplerParameter::Compare(function) => self.compare = function,
            SamplerParameter::BorderColor(color) => self.border_color = color,
        }
    }

    /// Closest border color wgpu can express.
    ///
    /// wgpu only supports a fixed palette; any other color falls back to
    /// transparent black.
    #[must_use]
    pub fn wgpu_border_color(&self) -> wgpu::SamplerBorderColor {
        if self.border_color == [0.0, 0.0, 0.0, 1.0] {
            wgpu::SamplerBorderColor::OpaqueBlack
        } else if self.border_color == [1.0; 4] {
            wgpu::SamplerBorderColor::OpaqueWhite
        } else {
            wgpu::SamplerBorderColor::TransparentBlack
        }
    }
}

/// One vertex attribute of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexAttributeState {
    /// Whether the attribute is enabled.
    pub enabled: bool,
    /// Declared format, if any.
    pub format: Option<AttribFormat>,
    /// Buffer binding point the attribute reads from.
    pub binding: u32,
}

/// One buffer binding point of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexBindingState {
    /// Bound buffer.
    pub buffer: Option<BufferId>,
    /// Byte offset of the first vertex.
    pub offset: usize,
    /// Distance between vertices in bytes.
    pub stride: u32,
    /// Instance divisor (`0` = per vertex).
    pub divisor: u32,
}

/// Full state of a vertex array object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexArrayState {
    /// Attributes by location.
    pub attributes: BTreeMap<u32, VertexAttributeState>,
    /// Buffer binding points by index.
    pub bindings: BTreeMap<u32, VertexBindingState>,
    /// Element (index) buffer.
    pub element_buffer: Option<BufferId>,
}
