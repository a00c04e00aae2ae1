//! The six-face terrain sphere and its per-frame driver.

use std::sync::Arc;

use glam::DVec3;

use selene_collide::Frustum;
use selene_config::TerrainConfig;
use selene_cubesphere::CubeFace;
use selene_stream::{LoadSettings, TaskPool, TextureSlots, TileSource};

use crate::node::{SelectContext, TerrainNode, TreeParams};
use crate::render_list::RenderList;
use crate::resolve::{HopThresholds, ResolveContext};
use crate::TerrainError;

/// One quadtree root per cube face, plus the shared streaming machinery.
///
/// Not thread-safe: [`TerrainSphere::update`] must be called from one
/// thread, once per frame. Only decode work leaves that thread.
pub struct TerrainSphere {
    faces: [TerrainNode; 6],
    source: Arc<dyn TileSource>,
    pool: TaskPool,
    params: TreeParams,
    load: LoadSettings,
    hops: HopThresholds,
    ttl: u32,
    list: RenderList,
}

impl TerrainSphere {
    /// Build the six face roots and spawn the decode pool.
    #[must_use]
    pub fn new(config: &TerrainConfig, source: Arc<dyn TileSource>) -> Self {
        let params = TreeParams {
            face_size: config.lod.face_size(),
            radius: config.planet.radius,
            leaf_distance: config.lod.leaf_distance,
            min_subdivision_level: config.lod.min_subdivision_level,
        };
        let root_level = config.lod.root_level();
        let faces = CubeFace::ALL.map(|face| TerrainNode::new_root(face, root_level, &params));
        let pool = match config.streaming.worker_threads {
            0 => TaskPool::with_default_threads(),
            n => TaskPool::new(n),
        };
        log::info!(
            "terrain sphere: root level {root_level}, face size {}",
            params.face_size
        );
        Self {
            faces,
            source,
            pool,
            params,
            load: LoadSettings {
                min_elevation_level: config.streaming.min_elevation_level,
                min_diffuse_level: config.streaming.min_diffuse_level,
                height_scale: config.streaming.height_scale,
                height_offset: config.streaming.height_offset,
            },
            hops: HopThresholds {
                geometry: config.streaming.geometry_hop,
                normal: config.streaming.normal_hop,
                diffuse: config.streaming.diffuse_hop,
            },
            ttl: config.lod.ttl_frames,
            list: RenderList::new(config.lod.max_render_entries),
        }
    }

    /// Run one frame: clear last frame's pending decodes, select every
    /// face, then age every face. Returns the render list for the frame.
    pub fn update(
        &mut self,
        camera: DVec3,
        frustum: &Frustum,
        slots: &mut dyn TextureSlots,
    ) -> Result<&RenderList, TerrainError> {
        // Last frame's queued decodes are superseded by this selection.
        self.pool.clear();
        self.list.clear();

        let Self {
            faces,
            source,
            pool,
            params,
            load,
            hops,
            list,
            ..
        } = self;
        for node in faces.iter_mut() {
            let mut ctx = SelectContext {
                camera,
                frustum,
                params,
                resolve: ResolveContext {
                    source,
                    slots,
                    pool,
                    load: *load,
                    hops: *hops,
                },
                list,
            };
            node.select(&mut ctx)?;
        }
        for node in self.faces.iter_mut() {
            node.age_children(self.ttl, slots);
        }
        Ok(&self.list)
    }

    /// The root node of one face, for inspection.
    #[must_use]
    pub fn face(&self, face: CubeFace) -> &TerrainNode {
        &self.faces[face.index()]
    }

    /// Decode jobs queued and not yet started.
    #[must_use]
    pub fn pending_decodes(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_list::QuadrantMask;
    use crate::testing::{RecordingSlots, TestSource};
    use glam::DVec4;
    use selene_cubesphere::map_to_sphere;

    fn test_config() -> TerrainConfig {
        let mut config = TerrainConfig::default();
        config.planet.radius = 1_000_000.0;
        config.lod.heightmap_resolution = 256;
        config.lod.patch_resolution = 64; // root level 2
        config.lod.leaf_distance = 20.0;
        config.lod.ttl_frames = 4;
        config.streaming.min_elevation_level = 0;
        config.streaming.min_diffuse_level = 0;
        config.streaming.geometry_hop = 0;
        config.streaming.normal_hop = 0;
        config.streaming.diffuse_hop = 0;
        config.streaming.worker_threads = 1;
        config
    }

    fn everything_frustum() -> Frustum {
        Frustum::from_planes([
            DVec4::new(1.0, 0.0, 0.0, 1.0e12),
            DVec4::new(-1.0, 0.0, 0.0, 1.0e12),
            DVec4::new(0.0, 1.0, 0.0, 1.0e12),
            DVec4::new(0.0, -1.0, 0.0, 1.0e12),
            DVec4::new(0.0, 0.0, 1.0, 1.0e12),
            DVec4::new(0.0, 0.0, -1.0, 1.0e12),
        ])
    }

    #[test]
    fn test_update_emits_every_face_once_from_afar() {
        let config = test_config();
        let mut sphere = TerrainSphere::new(&config, Arc::new(TestSource::new(8)));
        let mut slots = RecordingSlots::default();
        // Far above the planet: every face is a single coarse leaf.
        let camera = DVec3::new(0.0, 1.0e8, 0.0);

        let list = sphere
            .update(camera, &everything_frustum(), &mut slots)
            .expect("update");
        assert_eq!(list.len(), 6, "one full entry per face");
        assert!(list.entries().iter().all(|e| e.quadrants == QuadrantMask::FULL));
    }

    #[test]
    fn test_update_refines_near_the_camera() {
        let config = test_config();
        let mut sphere = TerrainSphere::new(&config, Arc::new(TestSource::new(8)));
        let mut slots = RecordingSlots::default();
        let camera = map_to_sphere(
            DVec3::new(16.0, 0.0, 16.0),
            CubeFace::PosY,
            config.lod.face_size(),
            config.planet.radius,
        );

        let list = sphere
            .update(camera, &everything_frustum(), &mut slots)
            .expect("update");
        let fine = list
            .entries()
            .iter()
            .filter(|e| e.face == CubeFace::PosY && e.level < 2)
            .count();
        assert!(fine > 0, "the camera face must refine below the root level");
    }

    #[test]
    fn test_unvisited_subtrees_are_evicted_after_ttl() {
        let config = test_config();
        let mut sphere = TerrainSphere::new(&config, Arc::new(TestSource::new(8)));
        let mut slots = RecordingSlots::default();
        let frustum = everything_frustum();
        let near = map_to_sphere(
            DVec3::new(16.0, 0.0, 16.0),
            CubeFace::PosY,
            config.lod.face_size(),
            config.planet.radius,
        );
        sphere.update(near, &frustum, &mut slots).expect("update");
        assert!(sphere.face(CubeFace::PosY).child(0).is_some());

        // Retreat to space; after ttl_frames + 1 more frames the refined
        // subtree is gone and its slots are back.
        let live_before = slots.live_count();
        let far = DVec3::new(0.0, 1.0e8, 0.0);
        for _ in 0..=config.lod.ttl_frames + 1 {
            sphere.update(far, &frustum, &mut slots).expect("update");
        }
        assert!(sphere.face(CubeFace::PosY).child(0).is_none());
        assert!(slots.live_count() < live_before);
    }

    #[test]
    fn test_update_clears_stale_decode_jobs() {
        let mut config = test_config();
        // Real hop thresholds so mid-level tiles get queued for decode.
        config.lod.heightmap_resolution = 1024; // root level 4
        config.streaming.geometry_hop = 1;
        config.streaming.normal_hop = 2;
        config.streaming.diffuse_hop = 1;
        config.streaming.min_elevation_level = 2;
        config.streaming.min_diffuse_level = 2;
        let mut sphere = TerrainSphere::new(&config, Arc::new(TestSource::new(8)));
        let mut slots = RecordingSlots::default();
        let frustum = everything_frustum();
        let camera = map_to_sphere(
            DVec3::new(16.0, 0.0, 16.0),
            CubeFace::PosY,
            config.lod.face_size(),
            config.planet.radius,
        );

        sphere.update(camera, &frustum, &mut slots).expect("update");
        // Whatever was queued, the next update starts from a clean queue
        // before re-submitting.
        let far = DVec3::new(0.0, 1.0e9, 0.0);
        sphere.update(far, &frustum, &mut slots).expect("update");
        sphere.update(far, &frustum, &mut slots).expect("update");
        assert_eq!(
            sphere.pending_decodes(),
            0,
            "a coarse-only frame queues nothing and clears the backlog"
        );
    }
}
