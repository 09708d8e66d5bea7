//! Outline import from texture alpha

use glam::Vec2;

use super::{SpriteMeshData, Vertex2D};
use crate::geometry::{Edge, Rect};

/// Read access to the sprite's texture.
pub trait TextureDataProvider {
    /// Width and height of the texture as imported (possibly downscaled)
    fn texture_size(&self) -> (u32, u32);

    /// Width and height of the source image
    fn actual_size(&self) -> (u32, u32);

    /// Alpha of the imported texture at `(x, y)`; `None` outside
    fn alpha(&self, x: u32, y: u32) -> Option<u8>;
}

/// Traces opaque regions of a texture into closed polylines.
pub trait OutlineGenerator {
    /// Outlines of the opaque area of `rect` (texture pixels).
    ///
    /// Points are relative to the center of `rect`. Paths are closed
    /// implicitly: the last point connects back to the first.
    fn generate_outline(
        &self,
        texture: &dyn TextureDataProvider,
        rect: Rect,
        detail: f32,
        alpha_tolerance: u8,
        hole_detection: bool,
    ) -> Vec<Vec<Vec2>>;
}

/// Imported-to-source scale of the texture (1 when unknown).
fn texture_scale(texture: &dyn TextureDataProvider) -> Vec2 {
    let (width, height) = texture.texture_size();
    let (actual_width, actual_height) = texture.actual_size();
    let ratio = |imported: u32, actual: u32| {
        if imported == 0 || actual == 0 {
            1.0
        } else {
            imported as f32 / actual as f32
        }
    };
    Vec2::new(ratio(width, actual_width), ratio(height, actual_height))
}

impl SpriteMeshData {
    /// Replace vertices and edges with rings traced from the texture alpha.
    ///
    /// Each closed path becomes a ring of vertices joined by sequential
    /// edges. Triangles and weights are cleared; bones are kept.
    pub fn outline_from_alpha(
        &mut self,
        generator: &dyn OutlineGenerator,
        texture: &dyn TextureDataProvider,
        detail: f32,
        alpha_tolerance: u8,
    ) {
        self.vertices.clear();
        self.edges.clear();
        self.indices.clear();

        let scale = texture_scale(texture);
        let scaled_frame = Rect::new(
            self.frame.x * scale.x,
            self.frame.y * scale.y,
            self.frame.width * scale.x,
            self.frame.height * scale.y,
        );
        let paths = generator.generate_outline(texture, scaled_frame, detail, alpha_tolerance, true);
        let half_size = self.frame.size() * 0.5;

        for path in paths.iter().filter(|p| p.len() >= 3) {
            let first = self.vertices.len();
            for point in path {
                let position = *point / scale + half_size;
                self.vertices.push(Vertex2D::new(position));
            }
            let count = path.len();
            for i in 0..count {
                self.edges
                    .push(Edge::new(first + i, first + (i + 1) % count));
            }
        }

        tracing::debug!(
            paths = paths.len(),
            vertices = self.vertices.len(),
            "Generated outline from alpha"
        );
    }
}
