//! Procedural geometry
//!
//! Plain CPU-side meshes and the generators that build them. Generation is
//! deterministic: the same [`GeometryParams`] always produce the same mesh,
//! which is what makes the parameters usable as a cache key.

use std::f32::consts::PI;

use crate::foundation::math::Vec3;
use crate::scene::bounds::AABB;
use crate::scene::lod::QualityTier;

/// Mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in object space
    pub position: [f32; 3],

    /// Unit normal
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    fn position_vec(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Index data for triangles
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create a mesh
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Object-space bounds; empty for a mesh without vertices
    pub fn bounds(&self) -> AABB {
        let positions: Vec<Vec3> = self.vertices.iter().map(Vertex::position_vec).collect();
        AABB::from_points(positions.iter())
    }

    /// Recompute smooth vertex normals from the triangle faces
    pub fn recompute_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.vertices.len()];

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let (Some(va), Some(vb), Some(vc)) =
                (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c))
            else {
                continue;
            };
            let (pa, pb, pc) = (va.position_vec(), vb.position_vec(), vc.position_vec());
            // Area-weighted: the cross product is not normalized
            let face = (pb - pa).cross(&(pc - pa));
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            if let Some(unit) = normal.try_normalize(f32::EPSILON) {
                vertex.normal = unit.into();
            }
        }
    }
}

/// Parameters that fully determine a generated mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryParams {
    /// Sphere radius in thousandths of a world unit
    radius_milli: u32,
    /// Segments around the equator
    pub width_segments: u32,
    /// Segments from pole to pole
    pub height_segments: u32,
    /// Camera distance, rounded to whole units
    pub distance: u32,
    /// Static meshes skip surface deformation
    pub is_static: bool,
}

impl GeometryParams {
    /// Pebble radius used by the quality table
    pub const PEBBLE_RADIUS: f32 = 0.8;

    /// Beyond this distance the quality table uses its coarser entry
    pub const FAR_DISTANCE: f32 = 30.0;

    /// Create parameters
    pub fn new(radius: f32, width_segments: u32, height_segments: u32, distance: f32, is_static: bool) -> Self {
        Self {
            radius_milli: (radius.max(0.0) * 1000.0).round() as u32,
            width_segments: width_segments.max(3),
            height_segments: height_segments.max(2),
            distance: distance.max(0.0).round() as u32,
            is_static,
        }
    }

    /// Pebble parameters for a quality tier at a camera distance
    ///
    /// | tier   | near    | beyond 30 |
    /// |--------|---------|-----------|
    /// | low    | 16 × 12 | 12 × 8    |
    /// | medium | 32 × 24 | 20 × 14   |
    /// | high   | 48 × 32 | 32 × 24   |
    pub fn for_quality(tier: QualityTier, distance: f32, is_static: bool) -> Self {
        let far = distance > Self::FAR_DISTANCE;
        let (width, height) = match (tier, far) {
            (QualityTier::Low, true) => (12, 8),
            (QualityTier::Low, false) => (16, 12),
            (QualityTier::Medium, true) => (20, 14),
            (QualityTier::Medium, false) => (32, 24),
            (QualityTier::High, true) => (32, 24),
            (QualityTier::High, false) => (48, 32),
        };
        Self::new(Self::PEBBLE_RADIUS, width, height, distance, is_static)
    }

    /// Sphere radius
    pub fn radius(&self) -> f32 {
        self.radius_milli as f32 / 1000.0
    }

    /// `"{radius}-{width}-{height}-{distance}-{is_static}"`
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.radius(),
            self.width_segments,
            self.height_segments,
            self.distance,
            self.is_static
        )
    }
}

/// Builds a mesh from parameters
pub trait GeometryGenerator {
    /// Generate the mesh; must be deterministic in `params`
    fn generate(&self, params: &GeometryParams) -> MeshData;
}

/// UV sphere with `(width + 1) × (height + 1)` vertices
///
/// Normals point outwards and texture coordinates wrap once around.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let (w, h) = (width_segments.max(3), height_segments.max(2));
    let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);

    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        let theta = v * PI;
        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            let phi = u * 2.0 * PI;
            let direction = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            vertices.push(Vertex {
                position: (direction * radius).into(),
                normal: direction.into(),
                tex_coord: [u, 1.0 - v],
            });
        }
    }

    let stride = w + 1;
    let mut indices = Vec::with_capacity((6 * w * (h - 1)) as usize);
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * stride + ix + 1;
            let b = iy * stride + ix;
            let c = (iy + 1) * stride + ix;
            let d = (iy + 1) * stride + ix + 1;
            // Pole rows collapse to a single triangle per segment
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    MeshData::new(vertices, indices)
}

/// Slightly flattened, bumpy sphere for background pebbles
#[derive(Debug, Clone, Copy, Default)]
pub struct PebbleGenerator;

impl PebbleGenerator {
    /// Vertical squash applied to deformed pebbles
    pub const FLATTEN: f32 = 0.92;
    /// Bump amplitude up close
    pub const NEAR_BUMP: f32 = 0.015;
    /// Bump amplitude for distant pebbles
    pub const FAR_BUMP: f32 = 0.008;
    /// Distance past which the cheaper single-layer bump is used
    pub const BUMP_FALLOFF_DISTANCE: u32 = 25;

    fn surface_noise(point: &Vec3, far: bool) -> f32 {
        let layer = |scale: f32| {
            let p = point * scale;
            (p.x * 1.7 + p.z * 0.6).sin() * (p.y * 2.3).cos() * (p.z * 1.3 - p.x * 0.4).sin()
        };
        if far {
            layer(0.3)
        } else {
            layer(0.4) * 0.8 + layer(1.2) * 0.2
        }
    }
}

impl GeometryGenerator for PebbleGenerator {
    fn generate(&self, params: &GeometryParams) -> MeshData {
        let mut mesh = uv_sphere(params.radius(), params.width_segments, params.height_segments);
        if params.is_static {
            return mesh;
        }

        let far = params.distance > Self::BUMP_FALLOFF_DISTANCE;
        let bump = if far { Self::FAR_BUMP } else { Self::NEAR_BUMP };
        for vertex in &mut mesh.vertices {
            let p = vertex.position_vec();
            let noise = Self::surface_noise(&p, far);
            vertex.position = [
                p.x + noise * bump * p.x.abs(),
                p.y * Self::FLATTEN + noise * bump * 0.1,
                p.z + noise * bump * p.z.abs(),
            ];
        }
        mesh.recompute_normals();
        mesh
    }
}
