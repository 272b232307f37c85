//! Deferred structural changes recorded by parallel workers.
//!
//! Each work item owns one [`LogSlot`] in a pre-sized arena and is the only
//! writer of that slot, so recording takes no locks. Nothing touches the
//! [`World`] until [`MutationLog::replay`] runs on the coordinating thread,
//! after every worker has returned. Replay visits slots in slot order and
//! entries in the order they were recorded.

use bevy_ecs::prelude::*;
use glam::IVec3;
use strata_shared::heightmap::HeightField;
use thiserror::Error;
use tracing::{debug, warn};

use crate::components::{
    Chunk, ChunkTemplate, HeightMap, PendingGeneration, PendingVoxelGeneration, Region,
    RegionChunks, RegionState,
};

/// Placeholder for an entity that will be spawned when its slot replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingEntity {
    slot: usize,
    local: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("log slot {slot} is full ({capacity} entries)")]
    SlotFull { slot: usize, capacity: usize },
    #[error("placeholder from slot {owner} used in slot {slot}")]
    ForeignPlaceholder { slot: usize, owner: usize },
    #[error("placeholder {local} was never created in slot {slot}")]
    UnknownPlaceholder { slot: usize, local: usize },
}

#[derive(Debug)]
enum LogEntry {
    AttachHeightMap {
        region: Entity,
        field: HeightField,
    },
    InstantiateChunk,
    SetChunk {
        chunk: PendingEntity,
        index: IVec3,
        region: Entity,
    },
    AppendToGroup {
        parent: Entity,
        child: PendingEntity,
    },
    TagForVoxelGeneration {
        chunk: PendingEntity,
    },
}

impl LogEntry {
    fn existing_target(&self) -> Option<Entity> {
        match self {
            LogEntry::AttachHeightMap { region, .. } | LogEntry::SetChunk { region, .. } => {
                Some(*region)
            }
            LogEntry::AppendToGroup { parent, .. } => Some(*parent),
            LogEntry::InstantiateChunk | LogEntry::TagForVoxelGeneration { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct LogSlot {
    index: usize,
    capacity: usize,
    entries: Vec<LogEntry>,
    spawned: usize,
    abandoned: bool,
}

impl LogSlot {
    fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            capacity,
            entries: Vec::new(),
            spawned: 0,
            abandoned: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Attaches `field` to an existing region. On replay the region also
    /// loses [`PendingGeneration`] and becomes [`RegionState::Generated`].
    pub fn attach_height_map(&mut self, region: Entity, field: HeightField) -> Result<(), LogError> {
        self.push(LogEntry::AttachHeightMap { region, field })
    }

    pub fn instantiate_chunk(&mut self) -> Result<PendingEntity, LogError> {
        self.push(LogEntry::InstantiateChunk)?;
        let pending = PendingEntity {
            slot: self.index,
            local: self.spawned,
        };
        self.spawned += 1;
        Ok(pending)
    }

    pub fn set_chunk(
        &mut self,
        chunk: PendingEntity,
        index: IVec3,
        region: Entity,
    ) -> Result<(), LogError> {
        self.check_owner(chunk)?;
        self.push(LogEntry::SetChunk {
            chunk,
            index,
            region,
        })
    }

    pub fn append_to_group(&mut self, parent: Entity, child: PendingEntity) -> Result<(), LogError> {
        self.check_owner(child)?;
        self.push(LogEntry::AppendToGroup { parent, child })
    }

    pub fn tag_for_voxel_generation(&mut self, chunk: PendingEntity) -> Result<(), LogError> {
        self.check_owner(chunk)?;
        self.push(LogEntry::TagForVoxelGeneration { chunk })
    }

    /// Drops everything recorded so far; the slot replays nothing.
    pub fn abandon(&mut self) {
        self.entries.clear();
        self.spawned = 0;
        self.abandoned = true;
    }

    fn push(&mut self, entry: LogEntry) -> Result<(), LogError> {
        if self.entries.len() >= self.capacity {
            return Err(LogError::SlotFull {
                slot: self.index,
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    fn check_owner(&self, pending: PendingEntity) -> Result<(), LogError> {
        if pending.slot != self.index {
            return Err(LogError::ForeignPlaceholder {
                slot: self.index,
                owner: pending.slot,
            });
        }
        if pending.local >= self.spawned {
            return Err(LogError::UnknownPlaceholder {
                slot: self.index,
                local: pending.local,
            });
        }
        Ok(())
    }

    fn resolve(spawned: &[Entity], pending: PendingEntity) -> Option<Entity> {
        let entity = spawned.get(pending.local).copied();
        if entity.is_none() {
            warn!(
                "Placeholder {} in slot {} was never spawned",
                pending.local, pending.slot
            );
        }
        entity
    }

    fn missing_target(&self, world: &World) -> Option<Entity> {
        self.entries
            .iter()
            .filter_map(LogEntry::existing_target)
            .find(|&entity| world.get::<Region>(entity).is_none())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub slots_applied: usize,
    pub slots_skipped: usize,
    pub height_maps_attached: usize,
    pub entities_created: usize,
}

#[derive(Debug)]
pub struct MutationLog {
    slots: Vec<LogSlot>,
}

impl MutationLog {
    pub fn with_slots(count: usize, capacity_per_slot: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|index| LogSlot::new(index, capacity_per_slot))
                .collect(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut LogSlot> {
        self.slots.get_mut(index)
    }

    /// The slot arena, for handing one slot to each worker.
    pub fn slots_mut(&mut self) -> &mut [LogSlot] {
        &mut self.slots
    }

    /// Applies every recorded entry to `world`. Must run only after all
    /// recorders are done; taking `self` by value enforces that no slot is
    /// still borrowed.
    ///
    /// A slot whose target region has been despawned since recording is
    /// skipped as a whole so its chunks never exist without their link.
    pub fn replay(self, world: &mut World, template: &ChunkTemplate) -> ReplayStats {
        let mut stats = ReplayStats::default();

        for slot in self.slots {
            if slot.abandoned {
                stats.slots_skipped += 1;
                continue;
            }
            if let Some(missing) = slot.missing_target(world) {
                warn!(
                    "Skipping log slot {}: region {:?} no longer exists",
                    slot.index, missing
                );
                stats.slots_skipped += 1;
                continue;
            }

            let mut spawned: Vec<Entity> = Vec::with_capacity(slot.spawned);
            for entry in slot.entries {
                match entry {
                    LogEntry::AttachHeightMap { region, field } => {
                        world
                            .entity_mut(region)
                            .insert((HeightMap::new(field), RegionState::Generated))
                            .remove::<PendingGeneration>();
                        stats.height_maps_attached += 1;
                    }
                    LogEntry::InstantiateChunk => {
                        spawned.push(template.instantiate(world));
                        stats.entities_created += 1;
                    }
                    LogEntry::SetChunk {
                        chunk,
                        index,
                        region,
                    } => {
                        if let Some(entity) = LogSlot::resolve(&spawned, chunk) {
                            world.entity_mut(entity).insert(Chunk { index, region });
                        }
                    }
                    LogEntry::AppendToGroup { parent, child } => {
                        let Some(child) = LogSlot::resolve(&spawned, child) else {
                            continue;
                        };
                        if let Some(mut group) = world.get_mut::<RegionChunks>(parent) {
                            group.push(child);
                        } else {
                            let mut group = RegionChunks::default();
                            group.push(child);
                            world.entity_mut(parent).insert(group);
                        }
                    }
                    LogEntry::TagForVoxelGeneration { chunk } => {
                        if let Some(entity) = LogSlot::resolve(&spawned, chunk) {
                            world.entity_mut(entity).insert(PendingVoxelGeneration);
                        }
                    }
                }
            }
            stats.slots_applied += 1;
        }

        debug!(
            "Replayed mutation log: {} applied, {} skipped, {} entities created",
            stats.slots_applied, stats.slots_skipped, stats.entities_created
        );
        stats
    }
}
