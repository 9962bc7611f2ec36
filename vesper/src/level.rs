//! Level data and the bulk marker.
//!
//! A loaded map holds flat arrays of plain structs whose slots reference
//! managed objects. The arrays can run to tens of thousands of entries, far
//! too many to mark inside one collector step, so the level's own mark hook
//! leaves them alone and a sentinel [`LevelMarker`] drains them in bounded
//! chunks, re-queueing itself gray until every cursor reaches its end.

use vesper_gc::{GcObject, GcPtr, Marker};

use crate::objects::{Actor, Interpolation, Mover};

/// Sectors marked per bulk-marker invocation.
pub const SECTOR_STEP_SIZE: usize = 32;
/// Polyobjects marked per bulk-marker invocation.
pub const POLY_STEP_SIZE: usize = 120;
/// Sidedefs marked per bulk-marker invocation.
pub const SIDEDEF_STEP_SIZE: usize = 240;

pub struct Sector {
    pub sound_target: Option<GcPtr<Actor>>,
    pub act_target: Option<GcPtr<Actor>>,
    pub floor_mover: Option<GcPtr<Mover>>,
    pub ceiling_mover: Option<GcPtr<Mover>>,
    pub lighting_mover: Option<GcPtr<Mover>>,
    pub interpolations: [Option<GcPtr<Interpolation>>; 4],
    pub floor_height: f64,
    pub ceiling_height: f64,
    pub light_level: i16,
}

impl Sector {
    pub fn new(floor_height: f64, ceiling_height: f64) -> Sector {
        Sector {
            sound_target: None,
            act_target: None,
            floor_mover: None,
            ceiling_mover: None,
            lighting_mover: None,
            interpolations: [None; 4],
            floor_height,
            ceiling_height,
            light_level: 160,
        }
    }
}

pub struct Polyobj {
    pub interpolation: Option<GcPtr<Interpolation>>,
    pub angle: f64,
}

pub struct Side {
    pub texture_interps: [Option<GcPtr<Interpolation>>; 3],
    pub sector: usize,
}

/// Managed wrapper around a loaded map's flat data.
pub struct Level {
    pub sectors: Vec<Sector>,
    pub polyobjs: Vec<Polyobj>,
    pub sides: Vec<Side>,
}

impl Level {
    pub fn with_geometry(sectors: usize, polyobjs: usize, sides: usize) -> Level {
        Level {
            sectors: (0..sectors).map(|_| Sector::new(0.0, 128.0)).collect(),
            polyobjs: (0..polyobjs)
                .map(|_| Polyobj { interpolation: None, angle: 0.0 })
                .collect(),
            sides: (0..sides)
                .map(|i| Side { texture_interps: [None; 3], sector: i % sectors.max(1) })
                .collect(),
        }
    }
}

impl GcObject for Level {
    const NAME: &'static str = "Level";

    // The flat arrays are covered by the level marker; marking them here
    // would stall a whole step on a big map.
}

/// Sentinel object that marks the level arrays in chunks during Propagate.
pub struct LevelMarker {
    level: Option<GcPtr<Level>>,
    sec_num: usize,
    poly_num: usize,
    side_num: usize,
    /// Times the hook re-queued itself in the current cycle.
    pub requeues: u32,
}

impl LevelMarker {
    pub fn new(level: GcPtr<Level>) -> LevelMarker {
        LevelMarker { level: Some(level), sec_num: 0, poly_num: 0, side_num: 0, requeues: 0 }
    }

    /// Called from root marking at the start of every cycle.
    pub fn reset_cursors(&mut self) {
        self.sec_num = 0;
        self.poly_num = 0;
        self.side_num = 0;
        self.requeues = 0;
    }
}

impl GcObject for LevelMarker {
    const NAME: &'static str = "LevelMarker";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.level);
        let Some(mut level) = self.level else {
            return core::mem::size_of::<Self>();
        };
        let level = &mut *level;
        let mut marked = 0;
        let mut more = false;

        let numsectors = level.sectors.len();
        let mut i = 0;
        while i < SECTOR_STEP_SIZE && self.sec_num + i < numsectors {
            let sec = &mut level.sectors[self.sec_num + i];
            marker.mark(&mut sec.sound_target);
            marker.mark(&mut sec.act_target);
            marker.mark(&mut sec.floor_mover);
            marker.mark(&mut sec.ceiling_mover);
            marker.mark(&mut sec.lighting_mover);
            marker.mark_array(&mut sec.interpolations);
            i += 1;
        }
        marked += i * core::mem::size_of::<Sector>();
        if self.sec_num + i < numsectors {
            self.sec_num += i;
            more = true;
        }

        if !more {
            let numpolys = level.polyobjs.len();
            let mut i = 0;
            while i < POLY_STEP_SIZE && self.poly_num + i < numpolys {
                marker.mark(&mut level.polyobjs[self.poly_num + i].interpolation);
                i += 1;
            }
            marked += i * core::mem::size_of::<Polyobj>();
            if self.poly_num + i < numpolys {
                self.poly_num += i;
                more = true;
            }
        }

        if !more {
            let numsides = level.sides.len();
            let mut i = 0;
            while i < SIDEDEF_STEP_SIZE && self.side_num + i < numsides {
                marker.mark_array(&mut level.sides[self.side_num + i].texture_interps);
                i += 1;
            }
            marked += i * core::mem::size_of::<Side>();
            if self.side_num + i < numsides {
                self.side_num += i;
                more = true;
            }
        }

        // Anything left over lands in a later step.
        if more {
            self.requeues += 1;
            marker.requeue_current();
        }
        marked
    }
}
