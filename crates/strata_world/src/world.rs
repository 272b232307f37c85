use std::collections::HashMap;

use bevy_ecs::prelude::*;
use glam::IVec2;
use strata_shared::settings::GenConfig;
use tracing::{debug, warn};

use crate::components::{HeightMap, PendingGeneration, Region, RegionChunks, RegionState};
use crate::error::GenResult;
use crate::generate::{generate_regions, PassReport, RegionGenerator};

/// Spawns a region awaiting generation.
pub fn spawn_region(world: &mut World, index: IVec2) -> Entity {
    world
        .spawn((
            Region { index },
            RegionState::Pending,
            PendingGeneration,
            RegionChunks::default(),
        ))
        .id()
}

/// Despawns a region together with every chunk in its group.
/// Returns the number of chunks removed, or `None` if `region` was not a region.
pub fn despawn_region(world: &mut World, region: Entity) -> Option<usize> {
    world.get::<Region>(region)?;

    let chunks: Vec<Entity> = world
        .get::<RegionChunks>(region)
        .map(|group| group.iter().collect())
        .unwrap_or_default();
    let removed = chunks
        .into_iter()
        .filter(|&chunk| world.despawn(chunk))
        .count();
    world.despawn(region);
    Some(removed)
}

/// An entity world plus a lookup from grid index to region entity.
pub struct TerrainWorld {
    ecs: World,
    regions: HashMap<IVec2, Entity>,
}

impl TerrainWorld {
    pub fn new(config: &GenConfig) -> GenResult<Self> {
        let generator = RegionGenerator::new(config)?;
        let mut ecs = World::new();
        ecs.insert_resource(generator);
        Ok(Self {
            ecs,
            regions: HashMap::new(),
        })
    }

    pub fn ecs(&self) -> &World {
        &self.ecs
    }

    /// Direct world access. Regions despawned through it are respawned by
    /// the next [`TerrainWorld::request_region`] for their index.
    pub fn ecs_mut(&mut self) -> &mut World {
        &mut self.ecs
    }

    /// Spawns the region at `index` unless it already exists.
    pub fn request_region(&mut self, index: IVec2) -> Entity {
        if let Some(&entity) = self.regions.get(&index) {
            if self.ecs.get::<Region>(entity).is_some() {
                return entity;
            }
            warn!("Region {index} was despawned outside the terrain world, respawning");
        }
        let entity = spawn_region(&mut self.ecs, index);
        self.regions.insert(index, entity);
        entity
    }

    pub fn region(&self, index: IVec2) -> Option<Entity> {
        self.regions.get(&index).copied()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn height_map(&self, index: IVec2) -> Option<&HeightMap> {
        self.ecs.get::<HeightMap>(self.region(index)?)
    }

    pub fn chunks(&self, index: IVec2) -> Option<&RegionChunks> {
        self.ecs.get::<RegionChunks>(self.region(index)?)
    }

    pub fn remove_region(&mut self, index: IVec2) -> bool {
        let Some(entity) = self.regions.remove(&index) else {
            return false;
        };
        match despawn_region(&mut self.ecs, entity) {
            Some(chunks) => {
                debug!("Removed region {index} and {chunks} chunk(s)");
                true
            }
            None => {
                warn!("Region {index} was already gone from the world");
                false
            }
        }
    }

    pub fn generate(&mut self) -> PassReport {
        generate_regions(&mut self.ecs);
        self.ecs
            .get_resource::<PassReport>()
            .copied()
            .unwrap_or_default()
    }
}
