//! Built-in intersection engine: a Bounding Volume Hierarchy over triangles.
//!
//! Binary tree, median split on the longest centroid axis. Quads are split
//! into two triangles that report the quad's face index.

use crate::engine::IntersectionEngine;
use crate::error::GeometryError;
use crate::geometry::{GeometryId, MeshBuffers, Topology};
use crate::ray::{Hit, RayHit};
use crate::triangle::{Triangle, TriangleHit};
use lumen_math::{Aabb, Interval, Ray};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangles.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of triangles.
    Leaf { triangles: Vec<Triangle>, bbox: Aabb },
    /// Empty node (no triangles at all).
    Empty,
}

impl BvhNode {
    /// Create a BVH from a list of triangles.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        if triangles.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(triangles)
    }

    fn build(mut triangles: Vec<Triangle>) -> Self {
        let n = triangles.len();

        let bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles,
                bbox: bounds,
            };
        }

        let centroid_bounds = Aabb::from_iter_points(triangles.iter().map(Triangle::centroid));
        let axis = centroid_bounds.longest_axis();

        triangles.sort_unstable_by(|a, b| {
            let a_val = a.centroid().to_array()[axis];
            let b_val = b.centroid().to_array()[axis];
            a_val.total_cmp(&b_val)
        });

        let right_triangles = triangles.split_off(n / 2);

        BvhNode::Branch {
            left: Box::new(Self::build(triangles)),
            right: Box::new(Self::build(right_triangles)),
            bbox: bounds,
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Nearest hit inside `ray_t`; shrinks `ray_t.max` to each accepted hit.
    pub fn closest<'a>(&'a self, ray: &Ray, ray_t: &mut Interval) -> Option<(&'a Triangle, TriangleHit)> {
        match self {
            BvhNode::Empty => None,

            BvhNode::Leaf { triangles, bbox } => {
                if !bbox.hit(ray, *ray_t) {
                    return None;
                }

                let mut closest = None;
                for tri in triangles {
                    if let Some(hit) = tri.hit(ray, *ray_t) {
                        ray_t.max = hit.t;
                        closest = Some((tri, hit));
                    }
                }
                closest
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, *ray_t) {
                    return None;
                }

                let hit_left = left.closest(ray, ray_t);
                // ray_t.max already trimmed by any left hit
                let hit_right = right.closest(ray, ray_t);
                hit_right.or(hit_left)
            }
        }
    }

    /// Whether any triangle is hit inside `ray_t`.
    pub fn any_hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { triangles, bbox } => {
                bbox.hit(ray, ray_t) && triangles.iter().any(|tri| tri.hit(ray, ray_t).is_some())
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, ray_t) && (left.any_hit(ray, ray_t) || right.any_hit(ray, ray_t))
            }
        }
    }
}

/// Split every face of `mesh` into triangles, dropping zero-area ones.
fn triangulate(mesh: &MeshBuffers) -> (Vec<Triangle>, usize) {
    let mut triangles = Vec::with_capacity(match mesh.topology() {
        Topology::Triangle => mesh.face_count(),
        Topology::Quad => mesh.face_count() * 2,
    });
    let mut degenerate = 0;

    let mut push = |tri: Triangle| {
        if tri.is_degenerate() {
            degenerate += 1;
        } else {
            triangles.push(tri);
        }
    };

    for (face, idx) in mesh.faces().enumerate() {
        let prim_id = face as u32;
        let v = |k: usize| mesh.vertex(idx[k]);
        match mesh.topology() {
            Topology::Triangle => push(Triangle::new(v(0), v(1), v(2), prim_id)),
            Topology::Quad => {
                push(Triangle::new(v(0), v(1), v(2), prim_id));
                push(Triangle::new(v(0), v(2), v(3), prim_id));
            }
        }
    }

    (triangles, degenerate)
}

struct BvhScene {
    id: GeometryId,
    root: BvhNode,
}

/// Pure-Rust intersection engine.
#[derive(Default)]
pub struct BvhEngine {
    scene: Option<BvhScene>,
    next_id: u32,
}

impl BvhEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntersectionEngine for BvhEngine {
    fn attach(&mut self, mesh: &MeshBuffers) -> Result<GeometryId, GeometryError> {
        let (triangles, degenerate) = triangulate(mesh);
        if degenerate > 0 {
            log::debug!("Skipped {} zero-area triangles", degenerate);
        }

        let id = GeometryId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        log::debug!("Building BVH for {} over {} triangles", id, triangles.len());
        self.scene = Some(BvhScene {
            id,
            root: BvhNode::new(triangles),
        });
        Ok(id)
    }

    fn detach(&mut self, id: GeometryId) {
        if self.is_attached(id) {
            self.scene = None;
        }
    }

    fn is_attached(&self, id: GeometryId) -> bool {
        self.scene.as_ref().is_some_and(|s| s.id == id)
    }

    fn intersect(&self, rayhit: &mut RayHit) {
        let Some(scene) = &self.scene else {
            return;
        };

        let mut ray_t = rayhit.interval;
        if let Some((tri, hit)) = scene.root.closest(&rayhit.ray, &mut ray_t) {
            rayhit.record(Hit {
                t: hit.t,
                point: rayhit.ray.at(hit.t),
                normal: tri.normal(),
                prim_id: tri.prim_id(),
                geom_id: scene.id,
                u: hit.u,
                v: hit.v,
            });
        }
    }

    fn occluded(&self, rayhit: &RayHit) -> bool {
        self.scene
            .as_ref()
            .is_some_and(|s| s.root.any_hit(&rayhit.ray, rayhit.interval))
    }

    fn bounds(&self) -> Aabb {
        self.scene
            .as_ref()
            .map_or(Aabb::EMPTY, |s| s.root.bounding_box())
    }
}
