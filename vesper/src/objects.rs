//! Managed playsim objects.
//!
//! The types under the collector's management. Each one reports its
//! outgoing managed references from its mark hook; teardown with engine
//! side effects goes in the destroy hook.

use vesper_gc::{Collector, GcObject, GcPtr, Marker};

/// A map actor: the script-visible moving object. Actors are the only
/// ticking objects here, so the thinker chain is threaded straight through
/// them rather than through a separate thinker base type.
pub struct Actor {
    /// Next actor in the world's thinker chain.
    pub snext: Option<GcPtr<Actor>>,
    pub target: Option<GcPtr<Actor>>,
    pub tracer: Option<GcPtr<Actor>>,
    pub master: Option<GcPtr<Actor>>,
    pub health: i32,
    /// Ticks of life left; the world destroys the actor when it hits zero.
    pub tics: i32,
}

impl Actor {
    pub fn new(health: i32, tics: i32) -> Actor {
        Actor { snext: None, target: None, tracer: None, master: None, health, tics }
    }
}

impl GcObject for Actor {
    const NAME: &'static str = "Actor";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.snext);
        marker.mark(&mut self.target);
        marker.mark(&mut self.tracer);
        marker.mark(&mut self.master);
        core::mem::size_of::<Self>()
    }

    fn destroy(&mut self, _gc: &mut Collector) {
        self.target = None;
        self.tracer = None;
        self.master = None;
        self.health = 0;
    }
}

/// A value being interpolated between ticks; lives on an intrusive list
/// rooted at the world's interpolation head.
pub struct Interpolation {
    pub next: Option<GcPtr<Interpolation>>,
    pub value: f64,
    pub target: f64,
}

impl Interpolation {
    pub fn new(value: f64, target: f64) -> Interpolation {
        Interpolation { next: None, value, target }
    }
}

impl GcObject for Interpolation {
    const NAME: &'static str = "Interpolation";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.next);
        core::mem::size_of::<Self>()
    }
}

/// Sector floor/ceiling/lighting machinery. Referenced from the sector's
/// slots in the level arrays, so it survives through the bulk marker.
pub struct Mover {
    pub sector: usize,
    pub interp: Option<GcPtr<Interpolation>>,
    pub speed: f64,
    pub dest: f64,
}

impl GcObject for Mover {
    const NAME: &'static str = "Mover";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.interp);
        core::mem::size_of::<Self>()
    }

    fn destroy(&mut self, _gc: &mut Collector) {
        self.interp = None;
        self.speed = 0.0;
    }
}

/// An active sound sequence; a chain rooted at the world's list head.
pub struct SoundNode {
    pub next: Option<GcPtr<SoundNode>>,
    pub origin: Option<GcPtr<Actor>>,
    pub sequence: u32,
    pub delay: u32,
}

impl GcObject for SoundNode {
    const NAME: &'static str = "SoundNode";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.next);
        marker.mark(&mut self.origin);
        core::mem::size_of::<Self>()
    }
}

/// A menu on the UI stack; menus chain to their parent.
pub struct Menu {
    pub parent: Option<GcPtr<Menu>>,
    pub title: String,
}

impl GcObject for Menu {
    const NAME: &'static str = "Menu";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.parent);
        core::mem::size_of::<Self>()
    }
}

/// The status bar UI object.
pub struct StatusBar {
    pub popup: Option<GcPtr<Menu>>,
}

impl GcObject for StatusBar {
    const NAME: &'static str = "StatusBar";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.popup);
        core::mem::size_of::<Self>()
    }
}

/// Intermission controller between levels.
pub struct Intermission {
    pub stage: u32,
}

impl GcObject for Intermission {
    const NAME: &'static str = "Intermission";
}

/// Scripted event handler; a doubly linked chain whose head and tail are
/// both roots.
pub struct EventHandler {
    pub next: Option<GcPtr<EventHandler>>,
    pub prev: Option<GcPtr<EventHandler>>,
    pub order: i32,
}

impl GcObject for EventHandler {
    const NAME: &'static str = "EventHandler";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.next);
        marker.mark(&mut self.prev);
        core::mem::size_of::<Self>()
    }
}
