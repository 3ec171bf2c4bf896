//! Intel Embree 4 intersection engine.
//!
//! Manual FFI bindings to the Embree 4 library, avoiding a bindgen dependency.
//! Only the calls needed for one triangle or quad mesh in a single-level scene
//! are declared. Embree reads vertex buffers 16 bytes at a time, so the last
//! position must be followed by one padding float.

use std::ffi::{c_char, c_void};

use lumen_math::{Aabb, Vec3};

use crate::engine::IntersectionEngine;
use crate::error::GeometryError;
use crate::geometry::{GeometryId, MeshBuffers, Topology};
use crate::ray::{Hit, RayHit};

// ============================================================================
// Embree FFI Bindings
// ============================================================================

#[allow(non_camel_case_types)]
type RTCDevice = *mut c_void;

#[allow(non_camel_case_types)]
type RTCScene = *mut c_void;

#[allow(non_camel_case_types)]
type RTCGeometry = *mut c_void;

// Embree geometry types (from rtcore_geometry.h)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCGeometryType {
    Triangle = 0,
    Quad = 1,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCBufferType {
    Index = 0,
    Vertex = 1,
}

// Embree buffer formats (from rtcore_common.h)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCFormat {
    UInt3 = 0x5003,
    UInt4 = 0x5004,
    Float3 = 0x9003,
}

// Ray structure matching Embree's RTCRay
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
#[allow(dead_code)]
struct RTCRay {
    org_x: f32,
    org_y: f32,
    org_z: f32,
    tnear: f32,

    dir_x: f32,
    dir_y: f32,
    dir_z: f32,
    time: f32,

    tfar: f32,
    mask: u32,
    id: u32,
    flags: u32,
}

// Hit structure matching Embree's RTCHit
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
#[allow(dead_code)]
struct RTCHit {
    ng_x: f32,
    ng_y: f32,
    ng_z: f32,

    u: f32,
    v: f32,

    prim_id: u32,
    geom_id: u32,
    inst_id: [u32; 1],
    inst_prim_id: [u32; 1],
}

// Combined ray-hit structure for rtcIntersect1
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRayHit {
    ray: RTCRay,
    hit: RTCHit,
}

// Bounds structure for rtcGetSceneBounds
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone, Default)]
#[allow(dead_code)]
struct RTCBounds {
    lower_x: f32,
    lower_y: f32,
    lower_z: f32,
    align0: f32,

    upper_x: f32,
    upper_y: f32,
    upper_z: f32,
    align1: f32,
}

const RTC_INVALID_GEOMETRY_ID: u32 = 0xFFFF_FFFF;

#[link(name = "embree4")]
extern "C" {
    fn rtcNewDevice(config: *const c_char) -> RTCDevice;
    fn rtcReleaseDevice(device: RTCDevice);
    fn rtcGetDeviceError(device: RTCDevice) -> i32;

    fn rtcNewScene(device: RTCDevice) -> RTCScene;
    fn rtcReleaseScene(scene: RTCScene);
    fn rtcCommitScene(scene: RTCScene);
    fn rtcGetSceneBounds(scene: RTCScene, bounds: *mut RTCBounds);

    fn rtcNewGeometry(device: RTCDevice, geom_type: RTCGeometryType) -> RTCGeometry;
    fn rtcReleaseGeometry(geom: RTCGeometry);
    fn rtcCommitGeometry(geom: RTCGeometry);
    fn rtcAttachGeometry(scene: RTCScene, geom: RTCGeometry) -> u32;
    fn rtcDetachGeometry(scene: RTCScene, geom_id: u32);

    fn rtcSetSharedGeometryBuffer(
        geom: RTCGeometry,
        buffer_type: RTCBufferType,
        slot: u32,
        format: RTCFormat,
        ptr: *const c_void,
        byte_offset: usize,
        byte_stride: usize,
        item_count: usize,
    );

    fn rtcIntersect1(scene: RTCScene, rayhit: *mut RTCRayHit, args: *const c_void);
    fn rtcOccluded1(scene: RTCScene, ray: *mut RTCRay, args: *const c_void);
}

fn error_name(code: i32) -> &'static str {
    match code {
        1 => "RTC_ERROR_UNKNOWN",
        2 => "RTC_ERROR_INVALID_ARGUMENT",
        3 => "RTC_ERROR_INVALID_OPERATION",
        4 => "RTC_ERROR_OUT_OF_MEMORY",
        5 => "RTC_ERROR_UNSUPPORTED_CPU",
        6 => "RTC_ERROR_CANCELLED",
        _ => "UNKNOWN_ERROR",
    }
}

impl RTCRay {
    fn from_rayhit(rayhit: &RayHit) -> Self {
        let origin = rayhit.ray.origin();
        let direction = rayhit.ray.direction();
        Self {
            org_x: origin.x,
            org_y: origin.y,
            org_z: origin.z,
            tnear: rayhit.interval.min,

            dir_x: direction.x,
            dir_y: direction.y,
            dir_z: direction.z,
            time: 0.0,

            tfar: rayhit.interval.max,
            mask: 0xFFFF_FFFF,
            id: 0,
            flags: 0,
        }
    }
}

impl RTCRayHit {
    fn from_rayhit(rayhit: &RayHit) -> Self {
        Self {
            ray: RTCRay::from_rayhit(rayhit),
            hit: RTCHit {
                ng_x: 0.0,
                ng_y: 0.0,
                ng_z: 0.0,
                u: 0.0,
                v: 0.0,
                prim_id: RTC_INVALID_GEOMETRY_ID,
                geom_id: RTC_INVALID_GEOMETRY_ID,
                inst_id: [RTC_INVALID_GEOMETRY_ID],
                inst_prim_id: [RTC_INVALID_GEOMETRY_ID],
            },
        }
    }
}

// ============================================================================
// EmbreeEngine
// ============================================================================

/// Intersection engine backed by an Embree device and one scene.
pub struct EmbreeEngine {
    device: RTCDevice,
    scene: RTCScene,
    attached: Option<Attached>,
    next_id: u32,
}

/// The attached mesh: our id plus the slot Embree assigned it.
///
/// Embree recycles slots after detach, so the slot cannot serve as the id.
#[derive(Debug, Clone, Copy)]
struct Attached {
    id: GeometryId,
    slot: u32,
}

impl EmbreeEngine {
    /// Create a device and an empty scene.
    pub fn new() -> Result<Self, GeometryError> {
        unsafe {
            let device = rtcNewDevice(std::ptr::null());
            if device.is_null() {
                return Err(GeometryError::Engine("failed to create Embree device".into()));
            }

            let scene = rtcNewScene(device);
            if scene.is_null() {
                let code = rtcGetDeviceError(device);
                rtcReleaseDevice(device);
                return Err(GeometryError::Engine(format!(
                    "failed to create Embree scene: {}",
                    error_name(code)
                )));
            }
            rtcCommitScene(scene);

            log::info!("Embree device ready");
            Ok(Self {
                device,
                scene,
                attached: None,
                next_id: 0,
            })
        }
    }

    fn check(&self, stage: &str) -> Result<(), GeometryError> {
        let code = unsafe { rtcGetDeviceError(self.device) };
        if code == 0 {
            Ok(())
        } else {
            Err(GeometryError::Engine(format!(
                "{} after {}",
                error_name(code),
                stage
            )))
        }
    }
}

impl IntersectionEngine for EmbreeEngine {
    fn attach(&mut self, mesh: &MeshBuffers) -> Result<GeometryId, GeometryError> {
        let positions = mesh.padded_positions().ok_or(GeometryError::MissingPadding)?;
        let indices = mesh.indices();

        let (geom_type, index_format) = match mesh.topology() {
            Topology::Triangle => (RTCGeometryType::Triangle, RTCFormat::UInt3),
            Topology::Quad => (RTCGeometryType::Quad, RTCFormat::UInt4),
        };
        let arity = mesh.topology().arity();

        if let Some(previous) = self.attached {
            self.detach(previous.id);
        }

        unsafe {
            let geom = rtcNewGeometry(self.device, geom_type);
            if geom.is_null() {
                self.check("rtcNewGeometry")?;
                return Err(GeometryError::Engine("failed to create Embree geometry".into()));
            }

            // Embree keeps these pointers; the geometry store keeps the buffers
            // alive and unmodified until detach
            rtcSetSharedGeometryBuffer(
                geom,
                RTCBufferType::Vertex,
                0,
                RTCFormat::Float3,
                positions.as_ptr() as *const c_void,
                0,
                3 * std::mem::size_of::<f32>(),
                mesh.vertex_count(),
            );
            rtcSetSharedGeometryBuffer(
                geom,
                RTCBufferType::Index,
                0,
                index_format,
                indices.as_ptr() as *const c_void,
                0,
                arity * std::mem::size_of::<u32>(),
                mesh.face_count(),
            );

            if let Err(e) = self.check("setting geometry buffers") {
                rtcReleaseGeometry(geom);
                return Err(e);
            }

            rtcCommitGeometry(geom);
            let slot = rtcAttachGeometry(self.scene, geom);
            rtcReleaseGeometry(geom);
            rtcCommitScene(self.scene);
            if let Err(e) = self.check("attaching geometry") {
                if slot != RTC_INVALID_GEOMETRY_ID {
                    rtcDetachGeometry(self.scene, slot);
                    rtcCommitScene(self.scene);
                }
                return Err(e);
            }

            let id = GeometryId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            self.attached = Some(Attached { id, slot });
            log::debug!(
                "Embree attached {} in slot {} ({} faces)",
                id,
                slot,
                mesh.face_count()
            );
            Ok(id)
        }
    }

    fn detach(&mut self, id: GeometryId) {
        let Some(attached) = self.attached.filter(|a| a.id == id) else {
            return;
        };
        unsafe {
            rtcDetachGeometry(self.scene, attached.slot);
            rtcCommitScene(self.scene);
        }
        self.attached = None;
    }

    fn is_attached(&self, id: GeometryId) -> bool {
        self.attached.is_some_and(|a| a.id == id)
    }

    fn intersect(&self, rayhit: &mut RayHit) {
        let Some(attached) = self.attached else {
            return;
        };

        let mut raw = RTCRayHit::from_rayhit(rayhit);
        unsafe { rtcIntersect1(self.scene, &mut raw, std::ptr::null()) };

        if raw.hit.geom_id == RTC_INVALID_GEOMETRY_ID {
            return;
        }

        let t = raw.ray.tfar;
        rayhit.record(Hit {
            t,
            point: rayhit.ray.at(t),
            normal: Vec3::new(raw.hit.ng_x, raw.hit.ng_y, raw.hit.ng_z).normalize_or_zero(),
            prim_id: raw.hit.prim_id,
            geom_id: attached.id,
            u: raw.hit.u,
            v: raw.hit.v,
        });
    }

    fn occluded(&self, rayhit: &RayHit) -> bool {
        if self.attached.is_none() {
            return false;
        }

        let mut raw = RTCRay::from_rayhit(rayhit);
        unsafe { rtcOccluded1(self.scene, &mut raw, std::ptr::null()) };

        // Embree marks an occluded ray by setting tfar to -inf
        raw.tfar == f32::NEG_INFINITY
    }

    fn bounds(&self) -> Aabb {
        if self.attached.is_none() {
            return Aabb::EMPTY;
        }

        let mut bounds = RTCBounds::default();
        unsafe { rtcGetSceneBounds(self.scene, &mut bounds) };
        Aabb::from_points(
            Vec3::new(bounds.lower_x, bounds.lower_y, bounds.lower_z),
            Vec3::new(bounds.upper_x, bounds.upper_y, bounds.upper_z),
        )
    }
}

impl Drop for EmbreeEngine {
    fn drop(&mut self) {
        unsafe {
            rtcReleaseScene(self.scene);
            rtcReleaseDevice(self.device);
        }
    }
}

// SAFETY: a committed Embree scene may be queried from any number of threads,
// and every mutation goes through `&mut self`.
unsafe impl Send for EmbreeEngine {}
unsafe impl Sync for EmbreeEngine {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use std::sync::Arc;

    const QUAD: [f32; 12] = [
        -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
    ];

    #[test]
    fn test_embree_hits_owned_quad() {
        let mut engine = EmbreeEngine::new().unwrap();
        let mesh = MeshBuffers::owned(&QUAD, &[0u32, 1, 2, 3], Topology::Quad).unwrap();
        let id = engine.attach(&mesh).unwrap();
        assert!(engine.is_attached(id));

        let camera = Camera::perspective(Vec3::new(0.1, 0.2, 3.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0)
            .unwrap();
        let mut rayhit = camera.primary_ray(0.5, 0.5);
        engine.intersect(&mut rayhit);
        let hit = rayhit.hit.unwrap();
        assert_eq!(hit.prim_id, 0);
        assert!((hit.t - Vec3::new(0.1, 0.2, 3.0).length()).abs() < 1e-3);
        assert!(engine.occluded(&camera.primary_ray(0.5, 0.5)));

        engine.detach(id);
        assert!(!engine.is_attached(id));
        assert!(engine.bounds().is_empty());
    }

    #[test]
    fn test_embree_reattach_issues_fresh_id() {
        let mut engine = EmbreeEngine::new().unwrap();
        let mesh = MeshBuffers::owned(&QUAD, &[0u32, 1, 2, 3], Topology::Quad).unwrap();
        let first = engine.attach(&mesh).unwrap();
        engine.detach(first);

        // Embree hands the freed slot out again; the id must still differ
        let second = engine.attach(&mesh).unwrap();
        assert_ne!(first, second);
        assert!(!engine.is_attached(first));
        assert!(engine.is_attached(second));

        let camera = Camera::perspective(Vec3::new(0.1, 0.2, 3.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0)
            .unwrap();
        let mut rayhit = camera.primary_ray(0.5, 0.5);
        engine.intersect(&mut rayhit);
        assert_eq!(rayhit.hit.unwrap().geom_id, second);

        // Stale ids do not detach the current mesh
        engine.detach(first);
        assert!(engine.is_attached(second));
    }

    #[test]
    fn test_embree_rejects_unpadded_shared_positions() {
        let mut engine = EmbreeEngine::new().unwrap();
        let positions: Arc<[f32]> = Arc::from(&QUAD[..]);
        let indices: Arc<[u32]> = Arc::from(&[0u32, 1, 2][..]);
        let mesh = MeshBuffers::shared(positions, indices, Topology::Triangle).unwrap();

        assert!(matches!(engine.attach(&mesh), Err(GeometryError::MissingPadding)));
    }
}
