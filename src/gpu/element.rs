//! Typed element descriptors for texture uploads and vertex attributes.
//!
//! Every upload carries an explicit [`ElementDescriptor`] next to its raw
//! bytes. The descriptor comes from the [`Element`] implementation of the
//! slice's item type, so the set of uploadable types is closed at compile
//! time.

/// Scalar type of one component of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ElementKind {
    /// Size of one component in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether the scalar is a floating-point type.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Vertex format for an attribute with `components` components of this
    /// kind, or `None` when wgpu has no matching format.
    ///
    /// `normalized` maps integer kinds onto the unorm/snorm formats;
    /// `integer` keeps them as integers in the shader. Float kinds ignore
    /// both flags.
    #[must_use]
    pub fn vertex_format(
        self,
        components: u8,
        normalized: bool,
        integer: bool,
    ) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as F;

        let integer = integer && !self.is_float();
        let format = match (self, components, normalized && !integer) {
            (Self::F32, 1, _) => F::Float32,
            (Self::F32, 2, _) => F::Float32x2,
            (Self::F32, 3, _) => F::Float32x3,
            (Self::F32, 4, _) => F::Float32x4,
            (Self::F64, 1, _) => F::Float64,
            (Self::F64, 2, _) => F::Float64x2,
            (Self::F64, 3, _) => F::Float64x3,
            (Self::F64, 4, _) => F::Float64x4,
            (Self::U32, 1, _) => F::Uint32,
            (Self::U32, 2, _) => F::Uint32x2,
            (Self::U32, 3, _) => F::Uint32x3,
            (Self::U32, 4, _) => F::Uint32x4,
            (Self::I32, 1, _) => F::Sint32,
            (Self::I32, 2, _) => F::Sint32x2,
            (Self::I32, 3, _) => F::Sint32x3,
            (Self::I32, 4, _) => F::Sint32x4,
            (Self::U8, 2, false) => F::Uint8x2,
            (Self::U8, 4, false) => F::Uint8x4,
            (Self::U8, 2, true) => F::Unorm8x2,
            (Self::U8, 4, true) => F::Unorm8x4,
            (Self::I8, 2, false) => F::Sint8x2,
            (Self::I8, 4, false) => F::Sint8x4,
            (Self::I8, 2, true) => F::Snorm8x2,
            (Self::I8, 4, true) => F::Snorm8x4,
            (Self::U16, 2, false) => F::Uint16x2,
            (Self::U16, 4, false) => F::Uint16x4,
            (Self::U16, 2, true) => F::Unorm16x2,
            (Self::U16, 4, true) => F::Unorm16x4,
            (Self::I16, 2, false) => F::Sint16x2,
            (Self::I16, 4, false) => F::Sint16x4,
            (Self::I16, 2, true) => F::Snorm16x2,
            (Self::I16, 4, true) => F::Snorm16x4,
            _ => return None,
        };
        // 32-bit integers have no normalized formats.
        if normalized
            && !integer
            && matches!(self, Self::U32 | Self::I32)
        {
            return None;
        }
        Some(format)
    }
}

/// Element descriptor: scalar kind plus component count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementDescriptor {
    /// Scalar type of each component.
    pub kind: ElementKind,
    /// Number of components per element (1..=4).
    pub components: u8,
}

impl ElementDescriptor {
    /// Scalar descriptor (one component).
    #[must_use]
    pub const fn scalar(kind: ElementKind) -> Self {
        Self {
            kind,
            components: 1,
        }
    }

    /// Vector descriptor with `components` components.
    #[must_use]
    pub const fn vector(kind: ElementKind, components: u8) -> Self {
        Self { kind, components }
    }

    /// Size of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        self.kind.size() * self.components as usize
    }
}

/// A plain-old-data type that can be uploaded as typed GPU data.
pub trait Element: bytemuck::Pod {
    /// Descriptor of one value of this type.
    const DESCRIPTOR: ElementDescriptor;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident, $components:literal;)*) => {
        $(
            impl Element for $ty {
                const DESCRIPTOR: ElementDescriptor =
                    ElementDescriptor::vector(ElementKind::$kind, $components);
            }
        )*
    };
}

impl_element! {
    i8 => I8, 1;
    u8 => U8, 1;
    i16 => I16, 1;
    u16 => U16, 1;
    i32 => I32, 1;
    u32 => U32, 1;
    f32 => F32, 1;
    f64 => F64, 1;
    [f32; 2] => F32, 2;
    [f32; 3] => F32, 3;
    [f32; 4] => F32, 4;
    glam::Vec2 => F32, 2;
    glam::Vec3 => F32, 3;
    glam::Vec4 => F32, 4;
}
