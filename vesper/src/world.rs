//! The world: root set, thinker ticking, and the per-frame GC hook.

use vesper_gc::{Collector, GcHost, GcPtr, Marker};

use crate::level::{Level, LevelMarker};
use crate::objects::{Actor, EventHandler, Intermission, Interpolation, Menu, Mover, SoundNode, StatusBar};
use crate::options::Options;

pub const MAX_PLAYERS: usize = 8;

/// Per-player slots. Players themselves are host memory; only the objects
/// they point at are managed.
#[derive(Default)]
pub struct Player {
    pub in_game: bool,
    pub actor: Option<GcPtr<Actor>>,
    pub camera: Option<GcPtr<Actor>>,
}

/// The engine's declared root set plus the tick counter. Kept apart from
/// the collector so borrowing one never blocks the other.
pub struct Roots {
    pub tick: u64,
    pub status_bar: Option<GcPtr<StatusBar>>,
    pub menu: Option<GcPtr<Menu>>,
    pub intermission: Option<GcPtr<Intermission>>,
    /// Head of the thinker chain.
    pub actors: Option<GcPtr<Actor>>,
    /// The actor about to tick; must not be freed under the ticker.
    pub next_to_think: Option<GcPtr<Actor>>,
    pub handlers_first: Option<GcPtr<EventHandler>>,
    pub handlers_last: Option<GcPtr<EventHandler>>,
    pub level: Option<GcPtr<Level>>,
    pub level_marker: Option<GcPtr<LevelMarker>>,
    pub players: [Player; MAX_PLAYERS],
    pub sound_sequences: Option<GcPtr<SoundNode>>,
    pub interpolations: Option<GcPtr<Interpolation>>,
}

impl Roots {
    fn new() -> Roots {
        Roots {
            tick: 0,
            status_bar: None,
            menu: None,
            intermission: None,
            actors: None,
            next_to_think: None,
            handlers_first: None,
            handlers_last: None,
            level: None,
            level_marker: None,
            players: Default::default(),
            sound_sequences: None,
            interpolations: None,
        }
    }
}

impl GcHost for Roots {
    fn mark_roots(&mut self, marker: &mut Marker<'_>) {
        marker.mark(&mut self.status_bar);
        marker.mark(&mut self.menu);
        marker.mark(&mut self.intermission);
        marker.mark(&mut self.actors);
        marker.mark(&mut self.handlers_first);
        marker.mark(&mut self.handlers_last);
        marker.mark(&mut self.level);
        for player in &mut self.players {
            if player.in_game {
                marker.mark(&mut player.actor);
                marker.mark(&mut player.camera);
            }
        }
        marker.mark(&mut self.sound_sequences);
        // The bulk marker starts every cycle from the top of its arrays.
        if let Some(mut level_marker) = self.level_marker {
            level_marker.reset_cursors();
        }
        marker.mark(&mut self.level_marker);
        marker.mark(&mut self.interpolations);
        marker.mark(&mut self.next_to_think);
    }

    fn current_tick(&self) -> u64 {
        self.tick
    }
}

/// A running playsim.
pub struct World {
    pub gc: Collector,
    pub roots: Roots,
}

impl World {
    pub fn new(options: &Options) -> World {
        let mut gc = Collector::new();
        gc.set_pause_tuning(options.pause);
        gc.set_step_mul(options.step_mul);
        World { gc, roots: Roots::new() }
    }

    /// Advance the simulation one tick and give the collector its quantum.
    pub fn tick(&mut self) {
        self.roots.tick += 1;
        let mut walk = self.roots.actors;
        while let Some(mut actor) = walk {
            self.roots.next_to_think = actor.snext;
            walk = actor.snext;
            if actor.tics > 0 {
                actor.tics -= 1;
                if actor.tics == 0 {
                    self.destroy_actor(actor);
                }
            }
        }
        self.roots.next_to_think = None;
        self.gc.check_gc(&mut self.roots);
    }

    /// Load a map: the managed level wrapper plus, when the map has any
    /// bulk-flat data, the bulk-marker sentinel (created once per level;
    /// root marking resets its cursors each cycle).
    pub fn load_level(&mut self, sectors: usize, polyobjs: usize, sides: usize) {
        tracing::debug!(sectors, polyobjs, sides, "loading level");
        let level = self.gc.alloc(Level::with_geometry(sectors, polyobjs, sides));
        self.roots.level = Some(level);
        self.gc.write_barrier(level);
        if sectors > 0 || polyobjs > 0 || sides > 0 {
            let marker = self.gc.alloc(LevelMarker::new(level));
            self.roots.level_marker = Some(marker);
            self.gc.write_barrier(marker);
        } else {
            self.roots.level_marker = None;
        }
    }

    /// Spawn an actor at the head of the thinker chain.
    pub fn spawn_actor(&mut self, health: i32, tics: i32) -> GcPtr<Actor> {
        let mut actor = self.gc.alloc(Actor::new(health, tics));
        actor.snext = self.roots.actors;
        if let Some(head) = self.roots.actors {
            self.gc.barrier(Some(actor), head);
        }
        self.roots.actors = Some(actor);
        self.gc.write_barrier(actor);
        actor
    }

    /// Remove an actor: unlink it from the thinker chain before
    /// euthanizing, so marking's clearing of stale slots cannot truncate
    /// the chain behind it.
    pub fn destroy_actor(&mut self, actor: GcPtr<Actor>) {
        if let Some(head) = self.roots.actors {
            if head.ptr_eq(&actor) {
                self.roots.actors = actor.snext;
                if let Some(new_head) = self.roots.actors {
                    self.gc.write_barrier(new_head);
                }
            } else {
                let mut walk = self.roots.actors;
                while let Some(mut curr) = walk {
                    walk = curr.snext;
                    if let Some(next) = curr.snext {
                        if next.ptr_eq(&actor) {
                            curr.snext = actor.snext;
                            if let Some(spliced) = curr.snext {
                                self.gc.barrier(Some(curr), spliced);
                            }
                            break;
                        }
                    }
                }
            }
        }
        if let Some(next) = self.roots.next_to_think {
            if next.ptr_eq(&actor) {
                self.roots.next_to_think = actor.snext;
            }
        }
        self.gc.destroy(actor);
    }

    /// Start a floor mover on a sector, with its interpolation.
    pub fn start_floor_mover(&mut self, sector: usize, dest: f64, speed: f64) -> Option<GcPtr<Mover>> {
        let mut level = self.roots.level?;
        if sector >= level.sectors.len() {
            return None;
        }
        let mut interp = self.gc.alloc(Interpolation::new(level.sectors[sector].floor_height, dest));
        interp.next = self.roots.interpolations;
        if let Some(head) = self.roots.interpolations {
            self.gc.barrier(Some(interp), head);
        }
        self.roots.interpolations = Some(interp);
        self.gc.write_barrier(interp);

        let mover = self.gc.alloc(Mover { sector, interp: Some(interp), speed, dest });
        level.sectors[sector].floor_mover = Some(mover);
        self.gc.barrier(Some(level), mover);
        Some(mover)
    }

    /// Start a sound sequence at the head of the sequence list.
    pub fn start_sound_sequence(&mut self, origin: Option<GcPtr<Actor>>, sequence: u32) -> GcPtr<SoundNode> {
        let mut node = self.gc.alloc(SoundNode {
            next: self.roots.sound_sequences,
            origin: None,
            sequence,
            delay: 0,
        });
        if let Some(next) = node.next {
            self.gc.barrier(Some(node), next);
        }
        if let Some(origin) = origin {
            node.origin = Some(origin);
            self.gc.barrier(Some(node), origin);
        }
        self.roots.sound_sequences = Some(node);
        self.gc.write_barrier(node);
        node
    }

    /// Push a menu onto the UI stack.
    pub fn push_menu(&mut self, title: &str) -> GcPtr<Menu> {
        let menu = self.gc.alloc(Menu { parent: self.roots.menu, title: title.to_owned() });
        if let Some(parent) = self.roots.menu {
            self.gc.barrier(Some(menu), parent);
        }
        self.roots.menu = Some(menu);
        self.gc.write_barrier(menu);
        menu
    }

    /// Pop the top menu; it becomes garbage once unreferenced.
    pub fn pop_menu(&mut self) {
        if let Some(menu) = self.roots.menu {
            self.roots.menu = menu.parent;
            if let Some(parent) = self.roots.menu {
                self.gc.write_barrier(parent);
            }
        }
    }

    /// Seat a player and give them a fresh actor.
    pub fn join_player(&mut self, slot: usize, health: i32) -> GcPtr<Actor> {
        let actor = self.spawn_actor(health, 0);
        let player = &mut self.roots.players[slot];
        player.in_game = true;
        player.actor = Some(actor);
        player.camera = Some(actor);
        self.gc.write_barrier(actor);
        actor
    }

    /// Engine shutdown: clear the root set and run the final collection.
    pub fn shutdown(&mut self) {
        tracing::debug!(objects = self.gc.object_count(), "engine shutdown");
        self.roots.status_bar = None;
        self.roots.menu = None;
        self.roots.intermission = None;
        self.roots.actors = None;
        self.roots.next_to_think = None;
        self.roots.handlers_first = None;
        self.roots.handlers_last = None;
        self.roots.level = None;
        self.roots.level_marker = None;
        self.roots.players = Default::default();
        self.roots.sound_sequences = None;
        self.roots.interpolations = None;
        self.gc.shutdown(&mut self.roots);
    }
}
