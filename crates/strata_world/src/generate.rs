use bevy_ecs::prelude::*;
use glam::IVec2;
use rayon::prelude::*;
use strata_core::jobs::JobSystem;
use strata_shared::coords::chunk_index;
use strata_shared::heightmap::{build_height_map, chunk_layers};
use strata_shared::noise::HeightSampler;
use strata_shared::settings::{GenConfig, TerrainSettings};
use tracing::{debug, info, warn};

use crate::command_log::{LogError, LogSlot, MutationLog};
use crate::components::{ChunkTemplate, HeightMap, PendingGeneration, Region};
use crate::error::GenResult;

/// One region's share of a pass. `slot` is its index in the mutation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub slot: usize,
    pub region: Entity,
    pub index: IVec2,
}

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub regions_generated: usize,
    pub regions_failed: usize,
    pub chunks_created: usize,
}

#[derive(Resource)]
pub struct RegionGenerator {
    jobs: JobSystem,
    sampler: HeightSampler,
    template: ChunkTemplate,
    max_ops_per_slot: usize,
}

impl RegionGenerator {
    /// Validates `config` and starts the worker pool. A bad config stops
    /// here, before any region is touched.
    pub fn new(config: &GenConfig) -> GenResult<Self> {
        config.validate()?;
        let jobs = JobSystem::new(config.pipeline.worker_threads)?;
        Ok(Self::with_jobs(
            &config.terrain,
            jobs,
            config.pipeline.max_ops_per_slot,
        ))
    }

    pub fn with_jobs(settings: &TerrainSettings, jobs: JobSystem, max_ops_per_slot: usize) -> Self {
        Self {
            jobs,
            sampler: HeightSampler::new(settings),
            template: ChunkTemplate::default(),
            max_ops_per_slot,
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        self.sampler.settings()
    }

    /// Pending regions without a height map, ordered by grid index so slot
    /// assignment does not depend on storage order.
    pub fn collect_work(world: &mut World) -> Vec<WorkItem> {
        let mut query = world
            .query_filtered::<(Entity, &Region), (With<PendingGeneration>, Without<HeightMap>)>();
        let mut regions: Vec<(Entity, IVec2)> = query
            .iter(world)
            .map(|(entity, region)| (entity, region.index))
            .collect();
        regions.sort_by_key(|(_, index)| (index.x, index.y));

        regions
            .into_iter()
            .enumerate()
            .map(|(slot, (region, index))| WorkItem {
                slot,
                region,
                index,
            })
            .collect()
    }

    /// Generates every pending region once.
    ///
    /// Workers only read the sampler and write their own log slot. The log is
    /// replayed after `install` returns, which is the only point where all
    /// workers are known to be finished.
    pub fn run_pass(&self, world: &mut World) -> PassReport {
        let work = Self::collect_work(world);
        if work.is_empty() {
            debug!("No regions pending generation");
            return PassReport::default();
        }

        let mut log = MutationLog::with_slots(work.len(), self.max_ops_per_slot);
        let sampler = &self.sampler;
        self.jobs.install(|| {
            log.slots_mut()
                .par_iter_mut()
                .zip(work.par_iter())
                .for_each(|(slot, item)| {
                    if let Err(err) = record_region(slot, item, sampler) {
                        warn!("Region {} left pending: {err}", item.index);
                        slot.abandon();
                    }
                });
        });

        let stats = log.replay(world, &self.template);
        let report = PassReport {
            regions_generated: stats.height_maps_attached,
            regions_failed: work.len() - stats.height_maps_attached,
            chunks_created: stats.entities_created,
        };
        info!(
            "Generated {} region(s), {} chunk(s), {} failed",
            report.regions_generated, report.chunks_created, report.regions_failed
        );
        report
    }
}

/// Records everything one region needs. The height map is recorded first so
/// it replays before the region's chunks.
fn record_region(slot: &mut LogSlot, item: &WorkItem, sampler: &HeightSampler) -> Result<(), LogError> {
    let (field, highest) = build_height_map(item.index, sampler);
    slot.attach_height_map(item.region, field)?;

    if highest == 0 {
        debug!("Region {} is flat at zero, no chunks needed", item.index);
        return Ok(());
    }

    for layer in chunk_layers(highest) {
        let chunk = slot.instantiate_chunk()?;
        slot.set_chunk(chunk, chunk_index(item.index, layer), item.region)?;
        slot.append_to_group(item.region, chunk)?;
        slot.tag_for_voxel_generation(chunk)?;
    }
    debug!(
        "Region {} recorded: max height {highest}, {} entries",
        item.index,
        slot.len()
    );
    Ok(())
}

/// Exclusive system running one pass with the world's [`RegionGenerator`].
/// The report is stored as a [`PassReport`] resource.
pub fn generate_regions(world: &mut World) {
    if !world.contains_resource::<RegionGenerator>() {
        warn!("generate_regions ran without a RegionGenerator resource");
        return;
    }
    let report = world.resource_scope(|world, generator: Mut<RegionGenerator>| {
        generator.run_pass(world)
    });
    world.insert_resource(report);
}
