//! Fixed-topology square grid shared by the height field and render mesh.

/// Square XZ grid centred on the origin. Vertices are stored row-major, `z`
/// rows outer and `x` columns inner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    segments: usize,
    size_m: f32,
}

impl GridLayout {
    pub fn new(segments: usize, size_m: f32) -> Self {
        Self {
            segments: segments.max(1),
            size_m,
        }
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Vertices per side
    pub fn side(&self) -> usize {
        self.segments + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.side() * self.side()
    }

    /// Distance between neighbouring vertices (meters)
    pub fn spacing(&self) -> f32 {
        self.size_m / self.segments as f32
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.side() + col
    }

    /// World-space (x, z) of the vertex at `index`
    pub fn position(&self, index: usize) -> (f32, f32) {
        let half = self.size_m / 2.0;
        let row = index / self.side();
        let col = index % self.side();
        (
            col as f32 * self.spacing() - half,
            row as f32 * self.spacing() - half,
        )
    }

    pub fn uv(&self, index: usize) -> [f32; 2] {
        let row = index / self.side();
        let col = index % self.side();
        [
            col as f32 / self.segments as f32,
            row as f32 / self.segments as f32,
        ]
    }

    /// Triangle list indices (counter-clockwise seen from +Y)
    pub fn triangle_indices(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.segments * self.segments * 6);
        for z in 0..self.segments {
            for x in 0..self.segments {
                let top_left = self.index(z, x) as u32;
                let top_right = top_left + 1;
                let bottom_left = self.index(z + 1, x) as u32;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }
        indices
    }
}
