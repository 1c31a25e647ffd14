//! Streaming vertex and index data to renderers that draw with reloadable
//! programs.
//!
//! [`MeshBuilder`] accumulates indexed triangle geometry on the CPU. With the
//! `glow` feature, [`MeshBuffers`] uploads it each frame into GL buffers that
//! only reallocate when the data outgrows them.

use bytemuck::Pod;

/// Smallest allocation a streaming buffer makes, in bytes.
pub const MIN_BUFFER_CAPACITY: usize = 256;

/// Capacity a streaming buffer should grow to so that it holds `required`
/// bytes, given its `current` capacity.
///
/// Returns `current` when it is already large enough, otherwise the next
/// power of two at or above `required` (and at least
/// [`MIN_BUFFER_CAPACITY`]). Growing geometrically keeps reallocations rare
/// when geometry size creeps up frame by frame.
#[must_use]
pub fn grown_capacity(current: usize, required: usize) -> usize {
    if required <= current {
        current
    } else {
        required.next_power_of_two().max(MIN_BUFFER_CAPACITY)
    }
}

/// Indexed triangle geometry built on the CPU.
#[derive(Debug, Clone)]
pub struct MeshBuilder<V> {
    vertices: Vec<V>,
    indices: Vec<u32>,
}

impl<V> Default for MeshBuilder<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<V: Pod> MeshBuilder<V> {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty builder with room for the given number of vertices and
    /// indices.
    #[must_use]
    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    /// Append a vertex and return its index.
    ///
    /// # Panics
    ///
    /// Panics if the mesh already holds `u32::MAX` vertices.
    pub fn push_vertex(&mut self, vertex: V) -> u32 {
        let index = u32::try_from(self.vertices.len()).expect("vertex count exceeds u32::MAX");
        self.vertices.push(vertex);
        index
    }

    /// Append one triangle over existing vertex indices.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append a quad given its corners in winding order, as two triangles.
    pub fn push_quad(&mut self, corners: [V; 4]) {
        let [a, b, c, d] = corners.map(|corner| self.push_vertex(corner));
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
    }

    /// Append another mesh whose indices are relative to its own vertices.
    ///
    /// # Panics
    ///
    /// Panics if the combined mesh would hold more than `u32::MAX` vertices,
    /// or if an index is out of range for `vertices`.
    pub fn extend(&mut self, vertices: &[V], indices: &[u32]) {
        let base = u32::try_from(self.vertices.len()).expect("vertex count exceeds u32::MAX");
        let added = u32::try_from(vertices.len())
            .ok()
            .filter(|&added| base.checked_add(added).is_some())
            .expect("vertex count exceeds u32::MAX");
        let rebased: Vec<u32> = indices
            .iter()
            .map(|&i| {
                assert!(i < added, "index {i} out of range for {added} vertices");
                base + i
            })
            .collect();
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(rebased);
    }

    /// Remove all geometry, keeping the allocations for the next frame.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Whether no triangle has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The vertices.
    #[must_use]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// The triangle indices.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The vertices as raw bytes for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The indices as raw bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(feature = "glow")]
pub use self::gl::{MeshBuffers, StreamBuffer};

#[cfg(feature = "glow")]
mod gl {
    use glow::HasContext;

    use super::{grown_capacity, MeshBuilder};

    /// A GL buffer object whose contents are replaced every frame.
    ///
    /// The storage is reallocated only when an upload exceeds the current
    /// capacity; smaller uploads overwrite the start of the buffer in place.
    pub struct StreamBuffer {
        buffer: glow::Buffer,
        target: u32,
        capacity: usize,
        len: usize,
    }

    impl StreamBuffer {
        /// Create an empty buffer for `target` (e.g. `glow::ARRAY_BUFFER`).
        ///
        /// # Safety
        ///
        /// Requires a valid, current OpenGL context.
        ///
        /// # Errors
        ///
        /// Returns the driver's message if the buffer cannot be created.
        pub unsafe fn new(gl: &glow::Context, target: u32) -> Result<Self, String> {
            let buffer = unsafe { gl.create_buffer() }?;
            Ok(Self {
                buffer,
                target,
                capacity: 0,
                len: 0,
            })
        }

        /// The GL buffer name.
        #[must_use]
        pub fn raw(&self) -> glow::Buffer {
            self.buffer
        }

        /// Allocated size in bytes.
        #[must_use]
        pub fn capacity(&self) -> usize {
            self.capacity
        }

        /// Size of the last upload in bytes.
        #[must_use]
        pub fn len(&self) -> usize {
            self.len
        }

        /// Whether the last upload was empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len == 0
        }

        /// Bind the buffer and replace its contents with `data`.
        ///
        /// # Safety
        ///
        /// Requires the context this buffer was created with to be current.
        ///
        /// # Panics
        ///
        /// Panics if the required capacity exceeds `i32::MAX` bytes.
        pub unsafe fn upload(&mut self, gl: &glow::Context, data: &[u8]) {
            let capacity = grown_capacity(self.capacity, data.len());
            unsafe {
                gl.bind_buffer(self.target, Some(self.buffer));
                if capacity != self.capacity {
                    let size = i32::try_from(capacity).expect("buffer size exceeds i32::MAX");
                    gl.buffer_data_size(self.target, size, glow::STREAM_DRAW);
                    log::debug!("Grew stream buffer to {capacity} bytes");
                    self.capacity = capacity;
                }
                if !data.is_empty() {
                    gl.buffer_sub_data_u8_slice(self.target, 0, data);
                }
            }
            self.len = data.len();
        }

        /// Delete the GL buffer.
        ///
        /// # Safety
        ///
        /// Must be called with the creating context current, exactly once.
        pub unsafe fn destroy(&self, gl: &glow::Context) {
            unsafe { gl.delete_buffer(self.buffer) };
        }
    }

    /// A vertex buffer and an index buffer that a [`MeshBuilder`] is streamed
    /// into.
    pub struct MeshBuffers {
        /// Vertex data (`ARRAY_BUFFER`).
        pub vertices: StreamBuffer,
        /// Index data (`ELEMENT_ARRAY_BUFFER`).
        pub indices: StreamBuffer,
        index_count: usize,
    }

    impl MeshBuffers {
        /// Create both buffers.
        ///
        /// # Safety
        ///
        /// Requires a valid, current OpenGL context.
        ///
        /// # Errors
        ///
        /// Returns the driver's message if a buffer cannot be created.
        pub unsafe fn new(gl: &glow::Context) -> Result<Self, String> {
            Ok(Self {
                vertices: unsafe { StreamBuffer::new(gl, glow::ARRAY_BUFFER) }?,
                indices: unsafe { StreamBuffer::new(gl, glow::ELEMENT_ARRAY_BUFFER) }?,
                index_count: 0,
            })
        }

        /// Upload the mesh. The vertex array object that should record the
        /// index buffer binding must already be bound.
        ///
        /// # Safety
        ///
        /// Requires the context these buffers were created with to be current.
        pub unsafe fn upload<V: bytemuck::Pod>(&mut self, gl: &glow::Context, mesh: &MeshBuilder<V>) {
            unsafe {
                self.vertices.upload(gl, mesh.vertex_bytes());
                self.indices.upload(gl, mesh.index_bytes());
            }
            self.index_count = mesh.indices().len();
        }

        /// Draw the uploaded triangles with the currently bound program and
        /// vertex array.
        ///
        /// # Safety
        ///
        /// Requires the context these buffers were created with to be current.
        ///
        /// # Panics
        ///
        /// Panics if the index count exceeds `i32::MAX`.
        pub unsafe fn draw(&self, gl: &glow::Context) {
            if self.index_count == 0 {
                return;
            }
            let count = i32::try_from(self.index_count).expect("index count exceeds i32::MAX");
            unsafe { gl.draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0) };
        }

        /// Delete both buffers.
        ///
        /// # Safety
        ///
        /// Must be called with the creating context current, exactly once.
        pub unsafe fn destroy(&self, gl: &glow::Context) {
            unsafe {
                self.vertices.destroy(gl);
                self.indices.destroy(gl);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::{Pod, Zeroable};

    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Vertex {
        position: [f32; 2],
    }

    fn v(x: f32, y: f32) -> Vertex {
        Vertex { position: [x, y] }
    }

    #[test]
    fn grown_capacity_keeps_sufficient_buffer() {
        assert_eq!(grown_capacity(1024, 1000), 1024);
        assert_eq!(grown_capacity(1024, 1024), 1024);
    }

    #[test]
    fn grown_capacity_rounds_up_to_power_of_two() {
        assert_eq!(grown_capacity(1024, 1025), 2048);
        assert_eq!(grown_capacity(0, 3000), 4096);
    }

    #[test]
    fn grown_capacity_has_a_floor() {
        assert_eq!(grown_capacity(0, 1), MIN_BUFFER_CAPACITY);
        assert_eq!(grown_capacity(0, 0), 0);
    }

    #[test]
    fn quad_is_two_triangles() {
        let mut mesh = MeshBuilder::new();
        mesh.push_quad([v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]);
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn extend_rebases_indices() {
        let mut mesh = MeshBuilder::new();
        let a = mesh.push_vertex(v(0.0, 0.0));
        let b = mesh.push_vertex(v(1.0, 0.0));
        let c = mesh.push_vertex(v(0.0, 1.0));
        mesh.push_triangle(a, b, c);

        mesh.extend(&[v(2.0, 0.0), v(3.0, 0.0), v(2.0, 1.0)], &[0, 1, 2]);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices()[3], v(2.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn extend_rejects_out_of_range_index() {
        let mut mesh = MeshBuilder::new();
        mesh.push_vertex(v(1.0, 1.0));
        mesh.extend(&[v(2.0, 2.0)], &[u32::MAX]);
    }

    #[test]
    fn rejected_extend_leaves_mesh_untouched() {
        let mut mesh = MeshBuilder::new();
        mesh.push_vertex(v(1.0, 1.0));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mesh.extend(&[v(2.0, 2.0)], &[1]);
        }));
        assert!(result.is_err());
        assert_eq!(mesh.vertices().len(), 1);
        assert!(mesh.indices().is_empty());
    }

    #[test]
    fn byte_views_match_sizes() {
        let mut mesh = MeshBuilder::new();
        mesh.push_quad([v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]);
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.index_bytes().len(), 6 * std::mem::size_of::<u32>());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut mesh = MeshBuilder::<Vertex>::with_capacity(16, 32);
        mesh.push_quad([v(0.0, 0.0); 4]);
        mesh.clear();
        assert!(mesh.is_empty());
        assert!(mesh.vertices().is_empty());
        assert!(mesh.vertices.capacity() >= 16);
    }
}
