//! Texture objects: storage allocation, typed uploads, mipmaps and views.

use std::ops::RangeInclusive;

use super::{
    binding::BindingState,
    driver::{DepthStencilMode, Driver, PixelFormat, TextureId, TextureKind},
    element::{Element, ElementDescriptor, ElementKind},
};

/// A texture that owns its driver name.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    kind: TextureKind,
    extent: wgpu::Extent3d,
    levels: u32,
}

/// Mip levels of a full chain for a texture of `kind` and the given size.
///
/// Only the dimensions that shrink between levels count: array layers and
/// cube faces do not.
#[must_use]
pub fn full_chain_levels(kind: TextureKind, extent: wgpu::Extent3d) -> u32 {
    let largest = match kind {
        TextureKind::D1 | TextureKind::D1Array => extent.width,
        TextureKind::D2 | TextureKind::D2Array | TextureKind::Cube => {
            extent.width.max(extent.height)
        }
        TextureKind::D3 => extent
            .width
            .max(extent.height)
            .max(extent.depth_or_array_layers),
    };
    (u32::BITS - largest.leading_zeros()).max(1)
}

fn storage_extent(
    kind: TextureKind,
    width: u32,
    height: u32,
    depth: u32,
) -> wgpu::Extent3d {
    let (height, depth) = match kind {
        TextureKind::D1 => (1, 1),
        TextureKind::D1Array | TextureKind::D2 | TextureKind::Cube => {
            (height, 1)
        }
        TextureKind::D2Array | TextureKind::D3 => (height, depth),
    };
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: depth,
    }
}

impl Texture {
    /// Create an unallocated texture of the given kind.
    pub fn new(driver: &impl Driver, kind: TextureKind) -> Self {
        Self {
            id: driver.create_texture(kind),
            kind,
            extent: wgpu::Extent3d::default(),
            levels: 0,
        }
    }

    /// Driver name.
    #[must_use]
    pub const fn id(&self) -> TextureId {
        self.id
    }

    /// Texture kind.
    #[must_use]
    pub const fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Size of level 0 as allocated.
    #[must_use]
    pub const fn extent(&self) -> wgpu::Extent3d {
        self.extent
    }

    /// Number of mip levels, `0` until allocated.
    #[must_use]
    pub const fn levels(&self) -> u32 {
        self.levels
    }

    /// Allocate immutable storage. `levels == 0` allocates a full mip chain.
    ///
    /// Dimensions the kind does not use are ignored.
    pub fn allocate(
        &mut self,
        driver: &impl Driver,
        levels: u32,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        depth: u32,
    ) {
        let extent = storage_extent(self.kind, width, height, depth);
        let levels = if levels == 0 {
            full_chain_levels(self.kind, extent)
        } else {
            levels
        };
        driver.texture_storage(self.id, levels, format, extent);
        log::debug!("{}: {levels} levels of {format:?} {extent:?}", self.id);
        self.extent = extent;
        self.levels = levels;
    }

    /// Upload `data` into `level`, starting at the origin. Dimensions the
    /// kind does not use are ignored.
    pub fn load<T: Element>(
        &self,
        driver: &impl Driver,
        level: u32,
        extent: wgpu::Extent3d,
        format: PixelFormat,
        data: &[T],
    ) {
        driver.texture_sub_image(
            self.id,
            level,
            storage_extent(
                self.kind,
                extent.width,
                extent.height,
                extent.depth_or_array_layers,
            ),
            format,
            T::DESCRIPTOR,
            bytemuck::cast_slice(data),
        );
    }

    /// Upload a decoded RGBA8 image into `level`.
    pub fn load_image(
        &self,
        driver: &impl Driver,
        level: u32,
        image: &image::RgbaImage,
    ) {
        driver.texture_sub_image(
            self.id,
            level,
            wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            PixelFormat::Rgba,
            ElementDescriptor::scalar(ElementKind::U8),
            image.as_raw(),
        );
    }

    /// Regenerate every level below level 0.
    pub fn generate_mipmap(&self, driver: &impl Driver) {
        driver.generate_texture_mipmap(self.id);
    }

    /// Restrict sampling to levels `base..=max`.
    pub fn mipmap_levels(&self, driver: &impl Driver, base: u32, max: u32) {
        driver.texture_mip_range(self.id, base, max);
    }

    /// Select whether a depth-stencil texture samples depth or stencil.
    pub fn depth_stencil_mode(
        &self,
        driver: &impl Driver,
        mode: DepthStencilMode,
    ) {
        driver.texture_depth_stencil_mode(self.id, mode);
    }

    /// Create a texture aliasing `levels` and `layers` (both inclusive) of
    /// this texture's storage, reinterpreted as `kind` and `format`.
    pub fn create_view(
        &self,
        driver: &impl Driver,
        kind: TextureKind,
        format: wgpu::TextureFormat,
        levels: RangeInclusive<u32>,
        layers: RangeInclusive<u32>,
    ) -> Self {
        let (min_level, max_level) = levels.into_inner();
        let (min_layer, max_layer) = layers.into_inner();
        let id = driver.texture_view(
            self.id,
            kind,
            format,
            min_level..max_level.saturating_add(1),
            min_layer..max_layer.saturating_add(1),
        );
        Self {
            id,
            kind,
            extent: wgpu::Extent3d {
                depth_or_array_layers: max_layer
                    .saturating_sub(min_layer)
                    .saturating_add(1),
                ..self.extent
            },
            levels: max_level.saturating_sub(min_level).saturating_add(1),
        }
    }

    /// Bind to texture unit `unit`.
    pub fn bind(&self, bindings: &mut impl BindingState, unit: u32) {
        bindings.bind_texture_unit(unit, self.id);
    }

    /// Release the driver name.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_texture(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        binding::recording::{Call, RecordingBindings},
        driver::MemoryDriver,
    };

    fn extent(width: u32, height: u32, depth: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: depth,
        }
    }

    #[test]
    fn full_chain_counts() {
        assert_eq!(full_chain_levels(TextureKind::D2, extent(256, 64, 1)), 9);
        assert_eq!(full_chain_levels(TextureKind::D2, extent(1, 1, 1)), 1);
        assert_eq!(full_chain_levels(TextureKind::D2, extent(0, 0, 1)), 1);
        assert_eq!(full_chain_levels(TextureKind::D3, extent(4, 4, 32)), 6);
        // Array layers do not shrink.
        assert_eq!(
            full_chain_levels(TextureKind::D2Array, extent(4, 4, 32)),
            3
        );
    }

    #[test]
    fn zero_levels_allocates_full_chain() {
        let driver = MemoryDriver::new();
        let mut texture = Texture::new(&driver, TextureKind::D2);
        texture.allocate(&driver, 0, wgpu::TextureFormat::Rgba8Unorm, 64, 32, 7);
        assert_eq!(texture.levels(), 7);
        assert_eq!(texture.extent(), extent(64, 32, 1));
        assert_eq!(
            driver.texture_storage_info(texture.id()),
            Some((wgpu::TextureFormat::Rgba8Unorm, 7))
        );
    }

    #[test]
    fn typed_loads_and_mipmaps() {
        let driver = MemoryDriver::new();
        let mut texture = Texture::new(&driver, TextureKind::D2);
        texture.allocate(&driver, 3, wgpu::TextureFormat::Rgba32Float, 4, 4, 1);
        let pixels = vec![glam::Vec4::ONE; 16];
        texture.load(&driver, 0, extent(4, 4, 1), PixelFormat::Rgba, &pixels);
        assert!(driver.take_errors().is_empty());
        assert!(driver.texture_level_written(texture.id(), 0));
        assert!(!driver.texture_level_written(texture.id(), 2));

        texture.generate_mipmap(&driver);
        assert!(driver.texture_level_written(texture.id(), 2));
    }

    #[test]
    fn load_image_uploads_rgba8() {
        let driver = MemoryDriver::new();
        let mut texture = Texture::new(&driver, TextureKind::D2);
        texture.allocate(&driver, 1, wgpu::TextureFormat::Rgba8Unorm, 2, 3, 1);
        let image = image::RgbaImage::new(2, 3);
        texture.load_image(&driver, 0, &image);
        assert!(driver.take_errors().is_empty());
        assert!(driver.texture_level_written(texture.id(), 0));
    }

    #[test]
    fn mip_range_and_depth_stencil_mode() {
        let driver = MemoryDriver::new();
        let texture = Texture::new(&driver, TextureKind::D2);
        texture.mipmap_levels(&driver, 1, 4);
        texture.depth_stencil_mode(&driver, DepthStencilMode::Stencil);
        assert_eq!(driver.texture_mip_range(texture.id()), Some((1, 4)));
        assert_eq!(
            driver.texture_depth_stencil_mode(texture.id()),
            Some(DepthStencilMode::Stencil)
        );
    }

    #[test]
    fn views_alias_a_level_and_layer_range() {
        let driver = MemoryDriver::new();
        let mut array = Texture::new(&driver, TextureKind::D2Array);
        array.allocate(&driver, 4, wgpu::TextureFormat::Rgba8Unorm, 8, 8, 6);
        let view = array.create_view(
            &driver,
            TextureKind::D2,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            1..=2,
            3..=3,
        );
        assert!(driver.take_errors().is_empty());
        assert_ne!(view.id(), array.id());
        assert_eq!(view.levels(), 2);
        assert_eq!(
            driver.texture_storage_info(view.id()),
            Some((wgpu::TextureFormat::Rgba8UnormSrgb, 2))
        );

        let _ = array.create_view(
            &driver,
            TextureKind::D2,
            wgpu::TextureFormat::Rgba8Unorm,
            2..=5,
            0..=0,
        );
        assert_eq!(driver.take_errors().len(), 1);
    }

    #[test]
    fn bind_to_unit() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let texture = Texture::new(&driver, TextureKind::Cube);
        texture.bind(&mut bindings, 3);
        assert_eq!(bindings.calls, vec![Call::Texture(3, texture.id())]);
        texture.destroy(&driver);
        assert_eq!(driver.live_textures(), 0);
    }
}
