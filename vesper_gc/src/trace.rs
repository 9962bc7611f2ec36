//! Type-directed hooks and the marking interface.
//!
//! The collector is decoupled from the engine's object model through two
//! traits: [`GcObject`], implemented once per managed type, and [`GcHost`],
//! implemented by whatever owns the root set. The collector reaches object
//! fields only through the monomorphized hooks recorded in each type's
//! [`ClassDesc`].

use core::ptr::NonNull;

use crate::collector::Collector;
use crate::gc_header::{GcHeader, ObjectFlags};
use crate::pointer::GcPtr;

/// A managed type.
///
/// Implementations report their outgoing managed references from
/// [`propagate_mark`](GcObject::propagate_mark) and perform explicit
/// teardown in [`destroy`](GcObject::destroy). Plain `Drop` glue still runs
/// when the memory is freed; `destroy` is for teardown with engine side
/// effects (detaching from lists, stopping sounds) and is skipped for
/// objects the host already destroyed explicitly.
pub trait GcObject: Sized + 'static {
    /// Type name used by diagnostics.
    const NAME: &'static str;

    /// Call [`Marker::mark`] on every managed reference this object holds
    /// and return a work-cost estimate, conventionally the object's size.
    /// Bulk markers return the bytes they covered instead.
    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        let _ = marker;
        core::mem::size_of::<Self>()
    }

    /// Explicit teardown, invoked by the sweeper on dead objects that were
    /// not euthanized by the host. May allocate; the new objects join the
    /// current cycle at the live white.
    fn destroy(&mut self, gc: &mut Collector) {
        let _ = gc;
    }
}

/// Type descriptor: one static per managed type, pointed at by every
/// object header of that type.
pub struct ClassDesc {
    pub name: &'static str,
    /// Payload size, header excluded.
    pub size: usize,
    pub(crate) propagate: unsafe fn(*mut u8, &mut Marker<'_>) -> usize,
    pub(crate) destroy: unsafe fn(*mut u8, &mut Collector),
    pub(crate) drop_in_place: unsafe fn(*mut u8),
}

unsafe fn propagate_shim<T: GcObject>(data: *mut u8, marker: &mut Marker<'_>) -> usize {
    (*(data as *mut T)).propagate_mark(marker)
}

unsafe fn destroy_shim<T: GcObject>(data: *mut u8, gc: &mut Collector) {
    (*(data as *mut T)).destroy(gc)
}

unsafe fn drop_shim<T: GcObject>(data: *mut u8) {
    core::ptr::drop_in_place(data as *mut T)
}

trait HasClass {
    const CLASS: ClassDesc;
    const CLASS_REF: &'static ClassDesc = &Self::CLASS;
}

impl<T: GcObject> HasClass for T {
    const CLASS: ClassDesc = ClassDesc {
        name: T::NAME,
        size: core::mem::size_of::<T>(),
        propagate: propagate_shim::<T>,
        destroy: destroy_shim::<T>,
        drop_in_place: drop_shim::<T>,
    };
}

pub(crate) fn class_of<T: GcObject>() -> &'static ClassDesc {
    <T as HasClass>::CLASS_REF
}

/// The host side of the collector.
pub trait GcHost {
    /// Enumerate the root set, calling [`Marker::mark`] on each managed
    /// reference root. Runs once at the start of every cycle; every root
    /// must be shaded before propagation advances. Ordering among roots is
    /// not significant.
    fn mark_roots(&mut self, marker: &mut Marker<'_>);

    /// Monotonic tick counter, read into the collector's `CheckTime` once
    /// per [`Collector::check_gc`].
    fn current_tick(&self) -> u64;
}

/// Marking interface handed to root hooks and to
/// [`GcObject::propagate_mark`].
pub struct Marker<'a> {
    pub(crate) gc: &'a mut Collector,
    /// The object whose mark hook is currently running, if any.
    pub(crate) current: Option<NonNull<GcHeader>>,
}

impl Marker<'_> {
    /// Shade the slot's target gray. Idempotent: gray and black targets are
    /// left alone. A target scheduled for destruction drops out of the
    /// graph instead — the slot is cleared to `None`.
    pub fn mark<T>(&mut self, slot: &mut Option<GcPtr<T>>) {
        let Some(ptr) = slot else { return };
        let header = ptr.header();
        unsafe {
            let h = header.as_ptr();
            if (*h).flags().contains(ObjectFlags::RELEASED) {
                return;
            }
            if (*h).flags().contains(ObjectFlags::EUTHANIZE) {
                *slot = None;
            } else if (*h).is_white() {
                (*h).white_to_gray();
                self.gc.gray.push(header);
            }
        }
    }

    /// Batched [`mark`](Marker::mark).
    pub fn mark_array<T>(&mut self, slots: &mut [Option<GcPtr<T>>]) {
        for slot in slots {
            self.mark(slot);
        }
    }

    /// Flip the object currently being propagated back to gray and push it
    /// onto the gray list again. Bulk markers call this after a partial
    /// pass so the remaining chunks land in later steps.
    pub fn requeue_current(&mut self) {
        let Some(current) = self.current else {
            debug_assert!(false, "requeue_current outside a mark hook");
            return;
        };
        unsafe {
            (*current.as_ptr()).black_to_gray();
            self.gc.gray.push(current);
        }
    }
}
