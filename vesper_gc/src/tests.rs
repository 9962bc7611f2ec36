//! Collector tests.
//!
//! Scenario coverage for the incremental cycle, the write barriers, soft
//! roots, explicit destruction, and the accounting invariants.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Collector, GcHost, GcObject, GcPtr, GcState, Marker, ObjectFlags};

/// A simple test object that can reference one other object.
#[repr(C)]
struct TestObject {
    value: u64,
    next: Option<GcPtr<TestObject>>,
    destroy_count: *const AtomicU32,
}

impl TestObject {
    fn new(value: u64) -> TestObject {
        TestObject { value, next: None, destroy_count: core::ptr::null() }
    }

    fn counted(value: u64, counter: &AtomicU32) -> TestObject {
        TestObject { value, next: None, destroy_count: counter }
    }
}

impl GcObject for TestObject {
    const NAME: &'static str = "TestObject";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        marker.mark(&mut self.next);
        core::mem::size_of::<Self>()
    }

    fn destroy(&mut self, _gc: &mut Collector) {
        if !self.destroy_count.is_null() {
            unsafe { (*self.destroy_count).fetch_add(1, Ordering::Relaxed) };
        }
    }
}

/// Destroy hook that allocates; exercises list surgery under the sweeper.
struct Spawner;

impl GcObject for Spawner {
    const NAME: &'static str = "Spawner";

    fn destroy(&mut self, gc: &mut Collector) {
        gc.alloc(TestObject::new(7));
    }
}

/// Mark hook that re-queues itself, bulk-marker style.
struct Chunky {
    passes_left: u32,
    passes_done: u32,
}

impl GcObject for Chunky {
    const NAME: &'static str = "Chunky";

    fn propagate_mark(&mut self, marker: &mut Marker<'_>) -> usize {
        self.passes_done += 1;
        if self.passes_left > 0 {
            self.passes_left -= 1;
            marker.requeue_current();
        }
        core::mem::size_of::<Self>()
    }
}

/// Host with a flat list of root slots and a controllable tick counter.
struct TestHost {
    roots: Vec<Option<GcPtr<TestObject>>>,
    tick: u64,
}

impl TestHost {
    fn new() -> TestHost {
        TestHost { roots: Vec::new(), tick: 100 }
    }

    fn add_root(&mut self, ptr: GcPtr<TestObject>) -> usize {
        self.roots.push(Some(ptr));
        self.roots.len() - 1
    }
}

impl GcHost for TestHost {
    fn mark_roots(&mut self, marker: &mut Marker<'_>) {
        for slot in &mut self.roots {
            marker.mark(slot);
        }
    }

    fn current_tick(&self) -> u64 {
        self.tick
    }
}

/// Force stepping until the collector returns to Pause, recording the state
/// observed after each frame.
fn collect_to_pause(gc: &mut Collector, host: &mut TestHost) -> Vec<GcState> {
    gc.set_threshold_bytes(0);
    let mut seen = Vec::new();
    for _ in 0..100_000 {
        gc.check_gc(host);
        seen.push(gc.state());
        if gc.state() == GcState::Pause {
            return seen;
        }
    }
    panic!("collector failed to reach Pause");
}

// ============================================================================
// Allocation and accounting
// ============================================================================

#[test]
fn alloc_links_and_accounts() {
    let mut gc = Collector::new();
    let one = {
        let _ptr = gc.alloc(TestObject::new(0));
        gc.alloc_bytes()
    };
    for i in 1..10 {
        gc.alloc(TestObject::new(i));
    }
    assert_eq!(gc.object_count(), 10);
    assert_eq!(gc.alloc_bytes(), 10 * one);
}

#[test]
fn accounting_matches_list_after_collection() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let per_object = {
        let root = gc.alloc(TestObject::new(0));
        host.add_root(root);
        gc.alloc_bytes()
    };
    for i in 0..20 {
        gc.alloc(TestObject::new(i));
    }
    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 1);
    assert_eq!(gc.alloc_bytes(), per_object);
}

#[test]
fn collect_unreachable() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    for i in 0..10 {
        gc.alloc(TestObject::new(i));
    }
    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 0);
    assert_eq!(gc.alloc_bytes(), 0);
}

#[test]
fn rooted_chain_survives() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let mut head = gc.alloc(TestObject::new(0));
    let mut a = gc.alloc(TestObject::new(1));
    let b = gc.alloc(TestObject::new(2));
    head.next = Some(a);
    a.next = Some(b);

    host.add_root(head);
    gc.full_gc(&mut host);

    assert_eq!(gc.object_count(), 3);
    assert_eq!(head.value, 0);
    assert_eq!(head.next.unwrap().value, 1);
    assert_eq!(head.next.unwrap().next.unwrap().value, 2);
}

// ============================================================================
// Incremental cycle
// ============================================================================

#[test]
fn incremental_chain_cycle() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    gc.set_step_mul(100);

    let mut objects: Vec<GcPtr<TestObject>> = Vec::new();
    for i in 0..1000 {
        objects.push(gc.alloc(TestObject::new(i)));
    }
    for i in 0..999 {
        let mut obj = objects[i];
        obj.next = Some(objects[i + 1]);
    }
    host.add_root(objects[0]);
    let before = gc.alloc_bytes();

    let seen = collect_to_pause(&mut gc, &mut host);

    assert_eq!(gc.object_count(), 1000);
    assert_eq!(gc.alloc_bytes(), before);
    // The cycle must have been spread over frames, not done in one gulp.
    assert!(seen.contains(&GcState::Propagate));
    assert!(seen.contains(&GcState::Sweep));
}

#[test]
fn step_mul_zero_collects_in_one_step() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    gc.set_step_mul(0);
    for i in 0..100 {
        gc.alloc(TestObject::new(i));
    }
    gc.step(&mut host);
    assert_eq!(gc.state(), GcState::Pause);
    assert_eq!(gc.object_count(), 0);
}

#[test]
fn threshold_follows_estimate() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let root = gc.alloc(TestObject::new(0));
    host.add_root(root);
    gc.full_gc(&mut host);
    assert_eq!(gc.estimate(), gc.alloc_bytes());
    assert_eq!(gc.threshold(), gc.estimate() / 100 * gc.pause_tuning() as usize);
}

#[test]
fn garbage_cycle_collected() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let destroyed = AtomicU32::new(0);

    let mut a = gc.alloc(TestObject::counted(1, &destroyed));
    let per_object = gc.alloc_bytes();
    let mut b = gc.alloc(TestObject::counted(2, &destroyed));
    a.next = Some(b);
    b.next = Some(a);
    let before = gc.alloc_bytes();

    gc.full_gc(&mut host);

    // The mutual references do not keep the pair alive.
    assert_eq!(gc.object_count(), 0);
    assert_eq!(before - gc.alloc_bytes(), 2 * per_object);
    assert_eq!(destroyed.load(Ordering::Relaxed), 2);
}

// ============================================================================
// Write barriers
// ============================================================================

#[test]
fn barrier_preserves_invariant_mid_propagate() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let mut r = gc.alloc(TestObject::new(0));
    let mut x = gc.alloc(TestObject::new(1));
    r.next = Some(x);
    host.add_root(r);

    // Start a cycle and propagate until X is black.
    gc.single_step(&mut host);
    assert_eq!(gc.state(), GcState::Propagate);
    while !x.flags().contains(ObjectFlags::BLACK) {
        gc.single_step(&mut host);
    }

    // A new white object stored behind a black one must survive the cycle.
    let y = gc.alloc(TestObject::new(99));
    x.next = Some(y);
    gc.barrier(Some(x), y);

    while gc.state() != GcState::Pause {
        gc.single_step(&mut host);
    }
    assert_eq!(gc.object_count(), 3);
    assert_eq!(x.next.unwrap().value, 99);
}

#[test]
fn write_barrier_reshades_during_propagate() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let root = gc.alloc(TestObject::new(0));
    host.add_root(root);
    let w = gc.alloc(TestObject::new(5));

    gc.single_step(&mut host);
    assert_eq!(gc.state(), GcState::Propagate);
    assert!(w.flags().intersects(ObjectFlags::WHITE_BITS));
    gc.write_barrier(w);
    assert!(w.flags().is_empty());

    while gc.state() != GcState::Pause {
        gc.single_step(&mut host);
    }
    // Shaded, so it survived this cycle despite being unreachable.
    assert_eq!(gc.object_count(), 2);

    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 1);
}

#[test]
fn barrier_outside_propagate_is_harmless() {
    let mut gc = Collector::new();
    let a = gc.alloc(TestObject::new(1));
    let b = gc.alloc(TestObject::new(2));
    let before = a.flags();
    gc.barrier(Some(a), b);
    assert_eq!(a.flags(), before);
    assert_eq!(b.flags(), before);
}

#[test]
fn tri_color_invariant_holds_during_propagate() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let mut objects: Vec<GcPtr<TestObject>> = Vec::new();
    for i in 0..100 {
        objects.push(gc.alloc(TestObject::new(i)));
    }
    for i in 0..99 {
        let mut obj = objects[i];
        obj.next = Some(objects[i + 1]);
    }
    host.add_root(objects[0]);

    gc.single_step(&mut host);
    while gc.state() == GcState::Propagate {
        gc.single_step(&mut host);
        // No black object may point at a white one.
        for header in gc.objects() {
            let header = unsafe { header.as_ref() };
            if header.is_black() {
                let obj = unsafe { &*(header.data_ptr() as *const TestObject) };
                if let Some(next) = obj.next {
                    assert!(!next.flags().intersects(ObjectFlags::WHITE_BITS));
                }
            }
        }
    }
}

// ============================================================================
// Explicit destruction and release
// ============================================================================

#[test]
fn euthanized_object_freed_without_finalizer() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let destroyed = AtomicU32::new(0);

    let z = gc.alloc(TestObject::counted(9, &destroyed));
    let slot = host.add_root(z);

    gc.destroy(z);
    assert_eq!(destroyed.load(Ordering::Relaxed), 1);

    gc.full_gc(&mut host);
    // Marking dropped the stale root slot; the sweeper freed the object
    // without running the hook a second time.
    assert!(host.roots[slot].is_none());
    assert_eq!(destroyed.load(Ordering::Relaxed), 1);
    assert_eq!(gc.object_count(), 0);
    assert_eq!(gc.alloc_bytes(), 0);
}

#[test]
fn destroy_is_idempotent() {
    let mut gc = Collector::new();
    let destroyed = AtomicU32::new(0);
    let z = gc.alloc(TestObject::counted(9, &destroyed));
    gc.destroy(z);
    gc.destroy(z);
    assert_eq!(destroyed.load(Ordering::Relaxed), 1);
}

#[test]
fn released_object_is_ignored_not_freed() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let a = gc.alloc(TestObject::new(1));
    host.add_root(a);
    let b = gc.alloc(TestObject::new(2));
    let with_b = gc.alloc_bytes();
    gc.release(b);
    assert!(gc.alloc_bytes() < with_b);
    let slot = host.add_root(b);

    gc.full_gc(&mut host);

    // B is off the list and untouched: still referenced, still readable.
    assert_eq!(gc.object_count(), 1);
    assert!(host.roots[slot].is_some());
    assert_eq!(b.value, 2);
    assert!(b.flags().contains(ObjectFlags::RELEASED));
    assert!(!b.flags().contains(ObjectFlags::CLEANUP));
}

#[test]
fn destroy_hook_may_allocate_during_sweep() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    gc.alloc(Spawner);
    gc.full_gc(&mut host);

    // The spawned object joined at the live white behind the sweep cursor.
    assert_eq!(gc.object_count(), 1);
    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 0);
}

#[test]
fn alloc_during_sweep_survives() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let root = gc.alloc(TestObject::new(0));
    host.add_root(root);
    for i in 0..100 {
        gc.alloc(TestObject::new(i));
    }

    gc.single_step(&mut host);
    while gc.state() != GcState::Sweep {
        gc.single_step(&mut host);
    }
    // One partial sweep, then allocate while the cursor is mid-list.
    gc.single_step(&mut host);
    let fresh = gc.alloc(TestObject::new(123));

    while gc.state() != GcState::Pause {
        gc.single_step(&mut host);
    }
    assert_eq!(gc.object_count(), 2);
    assert_eq!(fresh.value, 123);
    assert!(!fresh.flags().contains(ObjectFlags::CLEANUP));
}

// ============================================================================
// Soft roots
// ============================================================================

#[test]
fn soft_root_pins_and_unpins() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let destroyed = AtomicU32::new(0);

    let s = gc.alloc(TestObject::counted(42, &destroyed));
    gc.add_soft_root(s);
    assert!(s.flags().contains(ObjectFlags::ROOTED));

    gc.full_gc(&mut host);
    // S and the sentinel survive.
    assert_eq!(gc.object_count(), 2);
    assert_eq!(s.value, 42);

    gc.del_soft_root(s);
    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 1);
    assert_eq!(destroyed.load(Ordering::Relaxed), 1);
}

#[test]
fn del_soft_root_without_root_is_noop() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let a = gc.alloc(TestObject::new(1));
    host.add_root(a);
    gc.del_soft_root(a);
    gc.full_gc(&mut host);
    assert_eq!(gc.object_count(), 1);
}

#[test]
fn shutdown_drops_sentinel_and_latches() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let s = gc.alloc(TestObject::new(1));
    gc.add_soft_root(s);
    assert_eq!(gc.object_count(), 2);

    gc.shutdown(&mut host);
    assert!(gc.final_gc());
    // Sentinel freed, former soft root no longer pinned.
    assert_eq!(gc.object_count(), 0);
    assert_eq!(gc.alloc_bytes(), 0);
}

// ============================================================================
// Marking primitives
// ============================================================================

#[test]
fn mark_is_idempotent() {
    let mut gc = Collector::new();
    let obj = gc.alloc(TestObject::new(1));
    let mut slot = Some(obj);

    {
        let mut marker = Marker { gc: &mut gc, current: None };
        marker.mark(&mut slot);
        marker.mark(&mut slot);
        marker.mark(&mut slot);
    }
    assert!(obj.flags().is_empty());
    // Exactly one gray entry, however many times the slot was marked.
    assert!(gc.gray.pop().is_some());
    assert!(gc.gray.pop().is_none());
}

#[test]
fn mark_clears_slot_to_euthanized_target() {
    let mut gc = Collector::new();
    let z = gc.alloc(TestObject::new(1));
    gc.destroy(z);
    let mut slot = Some(z);
    {
        let mut marker = Marker { gc: &mut gc, current: None };
        marker.mark(&mut slot);
    }
    assert!(slot.is_none());
}

#[test]
fn requeued_marker_terminates() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();

    let chunky = gc.alloc(Chunky { passes_left: 5, passes_done: 0 });
    gc.add_soft_root(chunky);

    gc.full_gc(&mut host);

    assert_eq!(chunky.passes_left, 0);
    assert_eq!(chunky.passes_done, 6);
}

// ============================================================================
// Randomized barrier interleaving
// ============================================================================

/// Walk the graph from the declared roots; every reachable object must be
/// on the allocation list and not torn down.
fn verify_no_dangling(gc: &Collector, host: &TestHost) {
    let live: BTreeSet<usize> = gc.objects().map(|h| h.as_ptr() as usize).collect();
    let mut visited: BTreeSet<usize> = BTreeSet::new();
    let mut stack: Vec<GcPtr<TestObject>> = host.roots.iter().flatten().copied().collect();
    while let Some(obj) = stack.pop() {
        let addr = obj.header().as_ptr() as usize;
        if !visited.insert(addr) {
            continue;
        }
        assert!(live.contains(&addr), "reachable object missing from the allocation list");
        assert!(!obj.flags().contains(ObjectFlags::CLEANUP));
        if let Some(next) = obj.next {
            stack.push(next);
        }
    }
}

#[test]
fn random_mutation_never_dangles() {
    let mut gc = Collector::new();
    let mut host = TestHost::new();
    let mut rng = StdRng::seed_from_u64(0x6715_C01D);

    let mut core_objs: Vec<GcPtr<TestObject>> = Vec::new();
    for i in 0..10 {
        let obj = gc.alloc(TestObject::new(i));
        core_objs.push(obj);
        host.add_root(obj);
    }

    gc.set_threshold_bytes(0);
    for round in 0..500 {
        let i = rng.gen_range(0..core_objs.len());
        let mut src = core_objs[i];
        // Rewire one edge at a time, always through the barrier. Old
        // targets may become garbage; that is the point.
        if rng.gen_bool(0.3) {
            src.next = None;
        } else if rng.gen_bool(0.5) {
            let j = rng.gen_range(0..core_objs.len());
            let dst = core_objs[j];
            src.next = Some(dst);
            gc.barrier(Some(src), dst);
        } else {
            let dst = gc.alloc(TestObject::new(1000 + round));
            src.next = Some(dst);
            gc.barrier(Some(src), dst);
        }

        host.tick += 1;
        gc.check_gc(&mut host);
        if gc.state() != GcState::Pause {
            gc.set_threshold_bytes(0);
        }
        verify_no_dangling(&gc, &host);
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn stats_readout_format() {
    let mut gc = Collector::new();
    gc.alloc(TestObject::new(1));
    let text = format!("{}", gc.stats());
    assert!(text.starts_with("[  Pause  ]"));
    assert!(text.contains("Alloc:"));
    assert!(text.contains("Thresh:"));
    assert!(text.contains("MinStep:"));
}
