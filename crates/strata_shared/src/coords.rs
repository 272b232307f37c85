use glam::{IVec2, IVec3};

/// Cells along one horizontal edge of a region.
pub const REGION_SIZE: usize = 16;
pub const REGION_AREA: usize = REGION_SIZE * REGION_SIZE;

/// Vertical extent of one chunk layer, in height units.
pub const CELL_SIZE_Y: i32 = 16;

/// World-space (x, z) of a region's first cell.
pub fn region_origin(region: IVec2) -> IVec2 {
    region * REGION_SIZE as i32
}

pub fn cell_to_index(local: IVec2) -> usize {
    debug_assert!(
        local.cmpge(IVec2::ZERO).all() && local.cmplt(IVec2::splat(REGION_SIZE as i32)).all(),
        "cell out of region bounds: {local}"
    );
    local.x as usize + local.y as usize * REGION_SIZE
}

/// Inverse of [`cell_to_index`]: x varies fastest, then z.
pub fn index_to_cell(index: usize) -> IVec2 {
    assert!(index < REGION_AREA, "cell index out of bounds: {index}");
    IVec2::new((index % REGION_SIZE) as i32, (index / REGION_SIZE) as i32)
}

/// 3D index of a chunk: region x, vertical layer, region z.
pub fn chunk_index(region: IVec2, layer: i32) -> IVec3 {
    IVec3::new(region.x, layer, region.y)
}
