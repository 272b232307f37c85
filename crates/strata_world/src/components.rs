use std::ops::Deref;

use bevy_ecs::prelude::*;
use glam::{IVec2, IVec3};
use strata_shared::heightmap::HeightField;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub index: IVec2,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Pending,
    Generated,
}

/// Work tag: the region still needs a height map.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct PendingGeneration;

/// Heights of a generated region. Read-only once attached.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct HeightMap(HeightField);

impl HeightMap {
    pub fn new(field: HeightField) -> Self {
        Self(field)
    }
}

impl Deref for HeightMap {
    type Target = HeightField;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Chunks whose lifetime is tied to the owning region.
#[derive(Component, Debug, Default, Clone, PartialEq, Eq)]
pub struct RegionChunks(Vec<Entity>);

impl RegionChunks {
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.0.contains(&entity)
    }

    pub(crate) fn push(&mut self, entity: Entity) {
        self.0.push(entity);
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Region x, vertical layer, region z.
    pub index: IVec3,
    pub region: Entity,
}

/// Work tag for the voxel content pass.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct PendingVoxelGeneration;

/// Starting state of every chunk spawned during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTemplate {
    pub base: Chunk,
}

impl Default for ChunkTemplate {
    fn default() -> Self {
        Self {
            base: Chunk {
                index: IVec3::ZERO,
                region: Entity::PLACEHOLDER,
            },
        }
    }
}

impl ChunkTemplate {
    pub fn instantiate(&self, world: &mut World) -> Entity {
        world.spawn(self.base).id()
    }
}
