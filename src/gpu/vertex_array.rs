//! Vertex array objects: attribute formats and buffer bindings.

use super::{
    binding::BindingState,
    buffer::Buffer,
    driver::{AttribFormat, Driver, VertexArrayId},
    element::ElementDescriptor,
};

/// A vertex array that owns its driver name.
#[derive(Debug)]
pub struct VertexArray {
    id: VertexArrayId,
}

impl VertexArray {
    /// Create an empty vertex array.
    pub fn new(driver: &impl Driver) -> Self {
        Self {
            id: driver.create_vertex_array(),
        }
    }

    /// Driver name.
    #[must_use]
    pub const fn id(&self) -> VertexArrayId {
        self.id
    }

    fn declare(
        &self,
        driver: &impl Driver,
        binding: u32,
        attribute: u32,
        format: AttribFormat,
    ) {
        driver.enable_vertex_attrib(self.id, attribute);
        driver.vertex_attrib_format(self.id, attribute, format);
        driver.vertex_attrib_binding(self.id, attribute, binding);
    }

    /// Enable `attribute` as floating-point data read from `binding`.
    ///
    /// With `normalized`, integer elements are mapped to `[0, 1]` or
    /// `[-1, 1]`.
    pub fn layout(
        &self,
        driver: &impl Driver,
        binding: u32,
        attribute: u32,
        element: ElementDescriptor,
        normalized: bool,
        offset: u32,
    ) {
        self.declare(
            driver,
            binding,
            attribute,
            AttribFormat {
                components: element.components,
                kind: element.kind,
                normalized,
                integer: false,
                offset,
            },
        );
    }

    /// Enable `attribute` as integer data read from `binding`.
    pub fn layout_integer(
        &self,
        driver: &impl Driver,
        binding: u32,
        attribute: u32,
        element: ElementDescriptor,
        offset: u32,
    ) {
        self.declare(
            driver,
            binding,
            attribute,
            AttribFormat {
                components: element.components,
                kind: element.kind,
                normalized: false,
                integer: true,
                offset,
            },
        );
    }

    /// Source binding point `binding` from `buffer`.
    ///
    /// Fixed-storage buffers change name when they grow; bind them again
    /// afterwards.
    pub fn bind_buffer(
        &self,
        driver: &impl Driver,
        binding: u32,
        buffer: &Buffer,
        offset: usize,
        stride: u32,
    ) {
        driver.vertex_array_vertex_buffer(
            self.id,
            binding,
            buffer.id(),
            offset,
            stride,
        );
    }

    /// Use `buffer` for indices.
    pub fn bind_element_buffer(&self, driver: &impl Driver, buffer: &Buffer) {
        driver.vertex_array_element_buffer(self.id, buffer.id());
    }

    /// Advance `binding` once every `divisor` instances (`0` = per vertex).
    pub fn attrib_divisor(
        &self,
        driver: &impl Driver,
        binding: u32,
        divisor: u32,
    ) {
        driver.vertex_binding_divisor(self.id, binding, divisor);
    }

    /// Bind through the binding state.
    pub fn bind(&self, bindings: &mut impl BindingState) {
        bindings.bind_vertex_array(self.id);
    }

    /// Release the driver name. Bound buffers are not destroyed.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_vertex_array(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        binding::recording::{Call, RecordingBindings},
        driver::{MemoryDriver, VertexBindingState},
        element::{Element, ElementKind},
    };

    #[test]
    fn interleaved_layout() {
        let driver = MemoryDriver::new();
        let mut vertices = Buffer::new(&driver);
        vertices
            .allocate_mutable_empty(&driver, 1024, wgpu::BufferUsages::VERTEX)
            .unwrap();
        let vao = VertexArray::new(&driver);
        vao.layout(&driver, 0, 0, glam::Vec3::DESCRIPTOR, false, 0);
        vao.layout(
            &driver,
            0,
            1,
            ElementDescriptor::vector(ElementKind::U8, 4),
            true,
            12,
        );
        vao.layout_integer(&driver, 1, 2, u32::DESCRIPTOR, 0);
        vao.bind_buffer(&driver, 0, &vertices, 0, 16);
        vao.attrib_divisor(&driver, 1, 1);

        let state = driver.vertex_array_state(vao.id()).unwrap();
        let color = state.attributes[&1];
        assert!(color.enabled);
        assert_eq!(color.binding, 0);
        assert_eq!(
            color.format,
            Some(AttribFormat {
                components: 4,
                kind: ElementKind::U8,
                normalized: true,
                integer: false,
                offset: 12,
            })
        );
        assert!(state.attributes[&2].format.is_some_and(|f| f.integer));
        assert_eq!(
            state.bindings[&0],
            VertexBindingState {
                buffer: Some(vertices.id()),
                offset: 0,
                stride: 16,
                divisor: 0,
            }
        );
        assert_eq!(state.bindings[&1].divisor, 1);
        assert_eq!(state.bindings[&1].buffer, None);
    }

    #[test]
    fn element_buffer_and_bind() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let indices = Buffer::new(&driver);
        let vao = VertexArray::new(&driver);
        vao.bind_element_buffer(&driver, &indices);
        assert_eq!(
            driver.vertex_array_state(vao.id()).unwrap().element_buffer,
            Some(indices.id())
        );
        vao.bind(&mut bindings);
        assert_eq!(bindings.calls, vec![Call::VertexArray(vao.id())]);
        vao.destroy(&driver);
        assert!(driver.take_errors().is_empty());
    }
}
