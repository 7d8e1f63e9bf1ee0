//! Renderer that records draws instead of submitting them

use slotmap::SlotMap;

use super::{BufferHandle, ColorVertex, RenderError, Renderer};
use crate::foundation::math::{Mat4, Vec4};

/// Uploaded buffer contents
#[derive(Debug, Clone, Default)]
struct UploadedBuffer {
    vertices: Vec<ColorVertex>,
    indices: Vec<u32>,
}

/// One recorded draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Buffer that was drawn
    pub buffer: BufferHandle,
    /// World matrix passed with the draw
    pub transform: Mat4,
    /// Flat color passed with the draw
    pub color: Vec4,
    /// Number of indices in the buffer at draw time
    pub index_count: usize,
}

/// A [`Renderer`] for tests and tools without a graphics device
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    buffers: SlotMap<BufferHandle, UploadedBuffer>,
    draw_calls: Vec<DrawCall>,
    upload_count: usize,
}

impl HeadlessRenderer {
    /// Create an empty renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the draws recorded so far
    pub fn begin_frame(&mut self) {
        self.draw_calls.clear();
    }

    /// Draws recorded since the last [`HeadlessRenderer::begin_frame`]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Total number of uploads performed
    pub fn upload_count(&self) -> usize {
        self.upload_count
    }

    /// Vertices of an uploaded buffer
    pub fn vertices(&self, buffer: BufferHandle) -> Option<&[ColorVertex]> {
        self.buffers.get(buffer).map(|uploaded| uploaded.vertices.as_slice())
    }

    /// Indices of an uploaded buffer
    pub fn indices(&self, buffer: BufferHandle) -> Option<&[u32]> {
        self.buffers.get(buffer).map(|uploaded| uploaded.indices.as_slice())
    }
}

impl Renderer for HeadlessRenderer {
    fn upload(&mut self, vertices: &[ColorVertex], indices: &[u32]) -> Result<BufferHandle, RenderError> {
        if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertices.len()) {
            return Err(RenderError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }

        self.upload_count += 1;
        log::trace!("Uploaded {} vertices / {} indices", vertices.len(), indices.len());
        Ok(self.buffers.insert(UploadedBuffer {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        }))
    }

    fn release(&mut self, buffer: BufferHandle) -> Result<(), RenderError> {
        self.buffers
            .remove(buffer)
            .map(|_| ())
            .ok_or(RenderError::UnknownBuffer(buffer))
    }

    fn draw_indexed(&mut self, buffer: BufferHandle, transform: &Mat4, color: Vec4) -> Result<(), RenderError> {
        let uploaded = self.buffers.get(buffer).ok_or(RenderError::UnknownBuffer(buffer))?;
        self.draw_calls.push(DrawCall {
            buffer,
            transform: *transform,
            color,
            index_count: uploaded.indices.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<ColorVertex> {
        vec![
            ColorVertex::new([0.0, 0.0, 0.0], [1.0; 4]),
            ColorVertex::new([1.0, 0.0, 0.0], [1.0; 4]),
            ColorVertex::new([0.0, 1.0, 0.0], [1.0; 4]),
        ]
    }

    #[test]
    fn test_upload_draw_release() {
        let mut renderer = HeadlessRenderer::new();
        let buffer = renderer.upload(&triangle(), &[0, 1, 2]).unwrap();

        renderer
            .draw_indexed(buffer, &Mat4::identity(), Vec4::new(1.0, 0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(renderer.draw_calls().len(), 1);
        assert_eq!(renderer.draw_calls()[0].index_count, 3);

        renderer.release(buffer).unwrap();
        assert_eq!(renderer.live_buffers(), 0);
        assert_eq!(
            renderer.draw_indexed(buffer, &Mat4::identity(), Vec4::zeros()),
            Err(RenderError::UnknownBuffer(buffer))
        );
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut renderer = HeadlessRenderer::new();
        let result = renderer.upload(&triangle(), &[0, 1, 3]);

        assert_eq!(
            result,
            Err(RenderError::IndexOutOfRange { index: 3, vertex_count: 3 })
        );
        assert_eq!(renderer.upload_count(), 0);
    }
}
