//! The incremental collector.
//!
//! A tri-color mark-and-sweep collector that interleaves a bounded quantum
//! of marking or sweeping with each simulation tick. The cycle is
//! Pause → Propagate → Sweep → Finalize; the write barrier keeps the
//! tri-color invariant (no black object points at a white one) while the
//! mutator runs between increments, and the step controller ties the work
//! quantum to the recent allocation rate so collection cost tracks
//! allocation pressure.
//!
//! Single-threaded by design: every operation runs to completion on the
//! mutator's thread before control returns.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use crate::gc_header::{GcHeader, ObjectFlags};
use crate::gray_list::GrayList;
use crate::pointer::GcPtr;
use crate::trace::{class_of, GcHost, GcObject, Marker};

/// Default pause between cycles, as a percentage: wait for the live
/// estimate to grow by half before starting the next cycle.
pub const DEFAULT_PAUSE: u32 = 150;

/// Default collection speed relative to allocation, as a percentage.
/// 0 means every step runs a full cycle.
pub const DEFAULT_STEP_MUL: u32 = 200;

/// Hard floor for the per-step work budget.
const GC_STEP_SIZE: usize = 16 * GcHeader::SIZE;

/// Allocation-list entries examined per sweep step.
const SWEEP_MAX: usize = 40;

/// Cost of skipping one live entry during sweep.
const SWEEP_COST: usize = GcHeader::SIZE / 4;

/// Cost of destroying and freeing one dead entry.
const FINALIZE_COST: usize = 100;

/// Threshold used before the first cycle has produced an estimate.
const STARTUP_THRESHOLD: usize = 128 * 1024;

/// Collector phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GcState {
    /// Between cycles.
    Pause,
    /// Draining the gray list.
    Propagate,
    /// Walking the allocation list, freeing dead objects.
    Sweep,
    /// Sweep finished; the next step records the cycle bookkeeping.
    Finalize,
}

impl GcState {
    fn name(self) -> &'static str {
        match self {
            GcState::Pause => "Pause",
            GcState::Propagate => "Propagate",
            GcState::Sweep => "Sweep",
            GcState::Finalize => "Finalize",
        }
    }
}

/// Sentinel that splits the allocation list: everything linked after it is
/// a soft root.
struct SoftRootHead;

impl GcObject for SoftRootHead {
    const NAME: &'static str = "SoftRootHead";
}

/// The collector. One per playsim; tests instantiate their own instead of
/// sharing process state.
pub struct Collector {
    /// Total bytes held by managed objects.
    alloc_bytes: usize,
    /// `alloc_bytes` level that triggers the next step.
    threshold: usize,
    /// Running lower-bound estimate of live bytes; recomputed at sweep
    /// start, decremented as the sweeper frees.
    estimate: usize,
    pub(crate) gray: GrayList,
    /// Head of the allocation list.
    root: Option<NonNull<GcHeader>>,
    /// Soft-root sentinel, once one exists.
    soft_roots: Option<NonNull<GcHeader>>,
    /// Sweep cursor: the link being examined is `sweep_prev`'s next
    /// pointer, or the list head link while `sweep_prev` is `None`.
    sweep_prev: Option<NonNull<GcHeader>>,
    sweep_current: Option<NonNull<GcHeader>>,
    /// Which white is currently live; `FIXED` rides along so the dead mask
    /// always tests fixed objects live.
    current_white: ObjectFlags,
    state: GcState,
    pause: u32,
    step_mul: u32,
    /// Steps taken in the current cycle.
    step_count: u32,
    /// Tick captured by the latest `check_gc`.
    check_time: u64,
    last_collect_time: u64,
    last_collect_alloc: usize,
    /// Step-size floor captured when the sweep began, so the collector does
    /// not slow down if the allocation rate drops mid-sweep.
    min_step_size: usize,
    /// Latched for shutdown-mode collection; destroy hooks may consult it.
    final_gc: bool,
}

impl Collector {
    pub fn new() -> Collector {
        Collector {
            alloc_bytes: 0,
            threshold: STARTUP_THRESHOLD,
            estimate: 0,
            gray: GrayList::new(),
            root: None,
            soft_roots: None,
            sweep_prev: None,
            sweep_current: None,
            current_white: ObjectFlags::WHITE0 | ObjectFlags::FIXED,
            state: GcState::Pause,
            pause: DEFAULT_PAUSE,
            step_mul: DEFAULT_STEP_MUL,
            step_count: 0,
            check_time: 0,
            last_collect_time: 0,
            last_collect_alloc: 0,
            min_step_size: 0,
            final_gc: false,
        }
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocate a managed object: link it at the head of the allocation
    /// list, colored with the current white.
    pub fn alloc<T: GcObject>(&mut self, value: T) -> GcPtr<T> {
        assert!(core::mem::align_of::<T>() <= GcHeader::ALIGN);
        let class = class_of::<T>();
        let layout = GcHeader::layout_for_size(core::mem::size_of::<T>());
        unsafe {
            let raw = alloc::alloc::alloc(layout);
            if raw.is_null() {
                alloc::alloc::handle_alloc_error(layout);
            }
            let header = raw as *mut GcHeader;
            header.write(GcHeader::new(
                class,
                self.current_white & ObjectFlags::WHITE_BITS,
                layout.size(),
            ));
            let header = NonNull::new_unchecked(header);
            self.link_head(header);
            self.alloc_bytes += layout.size();
            let data = raw.add(GcHeader::SIZE) as *mut T;
            data.write(value);
            GcPtr::from_ptr(data)
        }
    }

    /// Explicitly destroy an object: run its destroy hook once and schedule
    /// it for collection regardless of reachability. Idempotent. Marking
    /// clears any slot that still points at it.
    pub fn destroy<T>(&mut self, ptr: GcPtr<T>) {
        let header = ptr.header();
        unsafe {
            let flags = (*header.as_ptr()).flags();
            if flags.intersects(ObjectFlags::EUTHANIZE | ObjectFlags::CLEANUP) {
                return;
            }
            let class = (*header.as_ptr()).class();
            (class.destroy)((*header.as_ptr()).data_ptr(), self);
            (*header.as_ptr()).insert_flags(ObjectFlags::EUTHANIZE);
        }
    }

    /// Stop tracking an object whose memory the host manages itself. The
    /// object may keep participating in the reference graph as a leaf; the
    /// collector skips it everywhere and never frees it.
    pub fn release<T>(&mut self, ptr: GcPtr<T>) {
        let header = ptr.header();
        unsafe {
            if (*header.as_ptr()).flags().contains(ObjectFlags::RELEASED) {
                return;
            }
            if self.unlink(header) {
                self.alloc_bytes = self.alloc_bytes.saturating_sub((*header.as_ptr()).alloc_size());
                (*header.as_ptr()).insert_flags(ObjectFlags::RELEASED);
            }
        }
    }

    // ------------------------------------------------------------------
    // Write barriers
    // ------------------------------------------------------------------

    /// Write barrier for a store of `dst` into a field of `src`. During
    /// Propagate this shades `dst` gray (forward barrier), removing the
    /// black-to-white edge; in every other state it re-whitens `src` so the
    /// barrier does not fire again through the same source this cycle. A
    /// no-op whenever the tri-color precondition does not hold.
    pub fn barrier<S, D>(&mut self, src: Option<GcPtr<S>>, dst: GcPtr<D>) {
        let dst_header = dst.header().as_ptr();
        unsafe {
            if (*dst_header).flags().contains(ObjectFlags::RELEASED) {
                return;
            }
            if self.state == GcState::Propagate {
                if (*dst_header).is_white() && !(*dst_header).is_dead(self.other_white()) {
                    (*dst_header).white_to_gray();
                    self.gray.push(dst.header());
                }
            } else if let Some(src) = src {
                let src_header = src.header().as_ptr();
                if (*src_header).is_black() {
                    (*src_header).make_white(self.current_white);
                }
            }
        }
    }

    /// Conservative one-argument barrier: re-shade `obj` if a propagation
    /// is under way, so references stored into it are not missed. Also the
    /// barrier of choice for stores into unmanaged root slots.
    pub fn write_barrier<T>(&mut self, obj: GcPtr<T>) {
        if self.state != GcState::Propagate {
            return;
        }
        unsafe { self.mark_object(obj.header()) };
    }

    // ------------------------------------------------------------------
    // Soft roots
    // ------------------------------------------------------------------

    /// Make `obj` a soft root: it behaves exactly like a root in every
    /// cycle until [`del_soft_root`](Collector::del_soft_root). The object
    /// is relinked just after the soft-root sentinel, which sits at the
    /// tail of the allocation list so everything past it is a soft root.
    pub fn add_soft_root<T>(&mut self, obj: GcPtr<T>) {
        if self.soft_roots.is_none() {
            let sentinel = self.alloc(SoftRootHead).header();
            unsafe {
                (*sentinel.as_ptr()).insert_flags(ObjectFlags::FIXED);
                self.unlink(sentinel);
                self.link_tail(sentinel);
            }
            self.soft_roots = Some(sentinel);
        }
        let header = obj.header();
        let sentinel = self.soft_roots.unwrap();
        if header == sentinel {
            return;
        }
        unsafe {
            self.unlink(header);
            (*header.as_ptr()).next = (*sentinel.as_ptr()).next;
            (*sentinel.as_ptr()).next = Some(header);
            if self.sweep_prev == Some(sentinel) {
                self.sweep_current = Some(header);
            }
            (*header.as_ptr()).insert_flags(ObjectFlags::ROOTED);
        }
        self.write_barrier(obj);
    }

    /// Unroot a soft root; it must now be reachable or it will be
    /// collected. No-op if `obj` is not rooted.
    pub fn del_soft_root<T>(&mut self, obj: GcPtr<T>) {
        let header = obj.header();
        unsafe {
            if !(*header.as_ptr()).flags().contains(ObjectFlags::ROOTED) {
                return;
            }
            (*header.as_ptr()).remove_flags(ObjectFlags::ROOTED);
            if self.unlink(header) {
                self.link_head(header);
            }
        }
    }

    /// Free the soft-root sentinel. Shutdown only; objects that were soft
    /// roots stay linked but are no longer treated as roots.
    pub fn del_soft_root_head(&mut self) {
        if let Some(sentinel) = self.soft_roots.take() {
            unsafe {
                (*sentinel.as_ptr()).insert_flags(ObjectFlags::REALLY_DELETE);
                self.unlink(sentinel);
                self.free_object(sentinel);
            }
        }
    }

    // ------------------------------------------------------------------
    // Driving the cycle
    // ------------------------------------------------------------------

    /// Frame hook. Refreshes the tick counter and runs [`step`]
    /// (Collector::step) if allocation has reached the threshold. Returns
    /// whether a step ran.
    pub fn check_gc(&mut self, host: &mut impl GcHost) -> bool {
        self.check_time = host.current_tick();
        if self.alloc_bytes >= self.threshold {
            self.step(host);
            true
        } else {
            false
        }
    }

    /// Run single steps until the work budget is exhausted or the cycle
    /// completes. While a cycle is in flight the threshold is pinned to the
    /// current allocation so the next frame keeps stepping.
    pub fn step(&mut self, host: &mut impl GcHost) {
        // Recalculate the budget in case the allocation rate went up since
        // the sweep began; min_step_size keeps it from dropping below what
        // was decided then.
        let mut budget = self.calc_step_size().max(self.min_step_size);
        loop {
            let done = self.single_step(host);
            budget = budget.saturating_sub(done);
            if budget == 0 || self.state == GcState::Pause {
                break;
            }
        }
        if self.state != GcState::Pause {
            self.threshold = self.alloc_bytes;
        } else {
            debug_assert!(self.alloc_bytes >= self.estimate);
            self.set_threshold();
        }
        self.step_count = self.step_count.wrapping_add(1);
    }

    /// Collect everything in one stop-the-world pass: finish (or discard
    /// and redo) the current cycle, then run one more complete cycle.
    pub fn full_gc(&mut self, host: &mut impl GcHost) {
        if matches!(self.state, GcState::Pause | GcState::Propagate) {
            // Discarding an unfinished propagation is safe: the sweep below
            // re-whitens survivors and the marking restarts from scratch.
            self.sweep_prev = None;
            self.sweep_current = self.root;
            self.gray.clear();
            self.state = GcState::Sweep;
        }
        while self.state != GcState::Finalize {
            self.single_step(host);
        }
        self.mark_root(host);
        while self.state != GcState::Pause {
            self.single_step(host);
        }
        self.set_threshold();
    }

    /// Shutdown-mode collection: latch `final_gc`, drop the soft-root
    /// sentinel, and run a full cycle. The host should clear its root slots
    /// first if it expects the heap to empty out.
    pub fn shutdown(&mut self, host: &mut impl GcHost) {
        self.final_gc = true;
        self.del_soft_root_head();
        self.full_gc(host);
    }

    /// Performs one step of the collector.
    pub(crate) fn single_step(&mut self, host: &mut impl GcHost) -> usize {
        match self.state {
            GcState::Pause => {
                self.mark_root(host);
                0
            }
            GcState::Propagate => {
                if !self.gray.is_empty() {
                    self.propagate_mark()
                } else {
                    self.atomic();
                    0
                }
            }
            GcState::Sweep => {
                let old = self.alloc_bytes;
                let cost = self.sweep_step();
                self.estimate = self
                    .estimate
                    .saturating_sub(old.saturating_sub(self.alloc_bytes));
                cost
            }
            GcState::Finalize => {
                self.state = GcState::Pause;
                self.last_collect_alloc = self.alloc_bytes;
                self.last_collect_time = self.check_time;
                tracing::debug!(
                    alloc_bytes = self.alloc_bytes,
                    steps = self.step_count,
                    "collection cycle finished"
                );
                0
            }
        }
    }

    /// Mark the root set and enter Propagate.
    fn mark_root(&mut self, host: &mut impl GcHost) {
        self.gray.clear();
        {
            let mut marker = Marker { gc: self, current: None };
            host.mark_roots(&mut marker);
        }
        // Everything linked past the sentinel is a soft root; skip the ones
        // already scheduled for destruction.
        if let Some(sentinel) = self.soft_roots {
            let mut walk = unsafe { (*sentinel.as_ptr()).next };
            while let Some(curr) = walk {
                walk = unsafe { (*curr.as_ptr()).next };
                let flags = unsafe { (*curr.as_ptr()).flags() };
                if flags.contains(ObjectFlags::ROOTED) && !flags.contains(ObjectFlags::EUTHANIZE) {
                    unsafe { self.mark_object(curr) };
                }
            }
        }
        tracing::debug!(alloc_bytes = self.alloc_bytes, "collection cycle started");
        self.state = GcState::Propagate;
        self.step_count = 0;
    }

    /// Shade an object gray without going through a slot.
    unsafe fn mark_object(&mut self, header: NonNull<GcHeader>) {
        let h = header.as_ptr();
        if (*h).flags().contains(ObjectFlags::RELEASED) {
            return;
        }
        if (*h).is_white() {
            (*h).white_to_gray();
            self.gray.push(header);
        }
    }

    /// Pop the top gray object, turn it black, and run its mark hook.
    /// Euthanized objects skip the hook but still report their size as
    /// cost.
    fn propagate_mark(&mut self) -> usize {
        let Some(header) = self.gray.pop() else { return 0 };
        let h = header.as_ptr();
        unsafe {
            debug_assert!((*h).is_gray());
            (*h).gray_to_black();
            if (*h).flags().contains(ObjectFlags::EUTHANIZE) {
                (*h).alloc_size()
            } else {
                let class = (*h).class();
                let data = (*h).data_ptr();
                let mut marker = Marker { gc: self, current: Some(header) };
                (class.propagate)(data, &mut marker)
            }
        }
    }

    /// The Propagate → Sweep flip. Everything that was the live white is
    /// now dead-on-sight; survivors are black and get re-whitened as the
    /// sweep passes them.
    fn atomic(&mut self) {
        self.current_white = self.other_white();
        self.sweep_prev = None;
        self.sweep_current = self.root;
        self.state = GcState::Sweep;
        self.estimate = self.alloc_bytes;
        self.min_step_size = self.calc_step_size();
        tracing::debug!(estimate = self.estimate, "mark phase finished");
    }

    /// Examine up to [`SWEEP_MAX`] allocation-list entries: re-whiten the
    /// live ones, unlink and free the dead ones.
    fn sweep_step(&mut self) -> usize {
        let dead_mask = self.other_white();
        let mut swept = 0usize;
        let mut finalized = 0usize;
        while swept < SWEEP_MAX {
            let Some(curr) = self.sweep_current else { break };
            swept += 1;
            let h = curr.as_ptr();
            unsafe {
                if !(*h).is_dead(dead_mask) {
                    (*h).make_white(self.current_white);
                    self.sweep_prev = Some(curr);
                    self.sweep_current = (*h).next;
                } else {
                    debug_assert!(!(*h).flags().contains(ObjectFlags::CLEANUP));
                    let next = (*h).next;
                    match self.sweep_prev {
                        Some(prev) => (*prev.as_ptr()).next = next,
                        None => self.root = next,
                    }
                    self.sweep_current = next;
                    if !(*h).flags().contains(ObjectFlags::EUTHANIZE) {
                        // The destroy hook may allocate or mark; new
                        // objects join at the live white behind the
                        // cursor, and stray marks are harmless because
                        // sweeping never consults the gray list.
                        let class = (*h).class();
                        let data = (*h).data_ptr();
                        (class.destroy)(data, self);
                    }
                    (*h).insert_flags(ObjectFlags::CLEANUP);
                    self.free_object(curr);
                    finalized += 1;
                }
            }
        }
        if self.sweep_current.is_none() {
            self.state = GcState::Finalize;
        }
        (swept - finalized) * SWEEP_COST + finalized * FINALIZE_COST
    }

    /// Run the drop glue and return the memory.
    unsafe fn free_object(&mut self, header: NonNull<GcHeader>) {
        let h = header.as_ptr();
        let flags = (*h).flags();
        if flags.contains(ObjectFlags::FIXED) && !flags.contains(ObjectFlags::REALLY_DELETE) {
            tracing::warn!(class = (*h).class().name, "freeing a fixed object");
        }
        let size = (*h).alloc_size();
        self.alloc_bytes = self.alloc_bytes.saturating_sub(size);
        ((*h).class().drop_in_place)((*h).data_ptr());
        alloc::alloc::dealloc(
            h as *mut u8,
            Layout::from_size_align_unchecked(size, GcHeader::ALIGN),
        );
    }

    // ------------------------------------------------------------------
    // Step sizing and thresholds
    // ------------------------------------------------------------------

    /// Per-step work budget: bytes gained since the last cycle finished,
    /// per tick, scaled by `step_mul`. Effectively unbounded when
    /// `step_mul` is zero or no time has passed, which makes one step run a
    /// full cycle.
    fn calc_step_size(&self) -> usize {
        let elapsed = self.check_time.saturating_sub(self.last_collect_time);
        let alloc = self.last_collect_alloc.min(self.estimate);
        let gained = self.alloc_bytes.saturating_sub(alloc);
        if self.step_mul > 0 && elapsed > 0 {
            let target = gained as u64 / elapsed * self.step_mul as u64 / 100;
            GC_STEP_SIZE.max(target as usize)
        } else {
            usize::MAX / 2
        }
    }

    /// Set the threshold for the next cycle from the live estimate.
    pub fn set_threshold(&mut self) {
        self.threshold = self.estimate / 100 * self.pause as usize;
    }

    /// Override the trigger threshold directly (console control).
    pub fn set_threshold_bytes(&mut self, bytes: usize) {
        self.threshold = bytes;
    }

    // ------------------------------------------------------------------
    // Accessors and tuning
    // ------------------------------------------------------------------

    pub fn alloc_bytes(&self) -> usize {
        self.alloc_bytes
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn estimate(&self) -> usize {
        self.estimate
    }

    pub fn state(&self) -> GcState {
        self.state
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn min_step_size(&self) -> usize {
        self.min_step_size
    }

    pub fn pause_tuning(&self) -> u32 {
        self.pause
    }

    pub fn set_pause_tuning(&mut self, pause: u32) {
        self.pause = pause;
    }

    pub fn step_mul(&self) -> u32 {
        self.step_mul
    }

    pub fn set_step_mul(&mut self, step_mul: u32) {
        self.step_mul = step_mul;
    }

    /// True once a shutdown collection has begun.
    pub fn final_gc(&self) -> bool {
        self.final_gc
    }

    /// Number of objects on the allocation list.
    pub fn object_count(&self) -> usize {
        self.objects().count()
    }

    /// Walk the allocation list.
    pub(crate) fn objects(&self) -> ObjectIter {
        ObjectIter { walk: self.root }
    }

    /// Snapshot for the stat readout.
    pub fn stats(&self) -> GcStats {
        GcStats {
            state: self.state,
            alloc_bytes: self.alloc_bytes,
            threshold: self.threshold,
            estimate: self.estimate,
            step_count: self.step_count,
            min_step_size: self.min_step_size,
        }
    }

    // ------------------------------------------------------------------
    // Allocation-list surgery
    // ------------------------------------------------------------------

    fn other_white(&self) -> ObjectFlags {
        self.current_white ^ ObjectFlags::WHITE_BITS
    }

    /// Link at the head of the allocation list, keeping the sweep cursor
    /// coherent: a cursor still parked on the head link must end up after
    /// the new entry, which is already the live white and needs no visit.
    unsafe fn link_head(&mut self, header: NonNull<GcHeader>) {
        (*header.as_ptr()).next = self.root;
        self.root = Some(header);
        if self.state == GcState::Sweep && self.sweep_prev.is_none() && self.sweep_current.is_some()
        {
            self.sweep_prev = Some(header);
        }
    }

    unsafe fn link_tail(&mut self, header: NonNull<GcHeader>) {
        (*header.as_ptr()).next = None;
        match self.root {
            None => self.root = Some(header),
            Some(mut curr) => loop {
                match (*curr.as_ptr()).next {
                    Some(next) => curr = next,
                    None => {
                        (*curr.as_ptr()).next = Some(header);
                        break;
                    }
                }
            },
        }
    }

    /// Unlink from the allocation list, patching the sweep cursor when it
    /// points at or just before the removed entry.
    unsafe fn unlink(&mut self, header: NonNull<GcHeader>) -> bool {
        let mut prev: Option<NonNull<GcHeader>> = None;
        let mut walk = self.root;
        while let Some(curr) = walk {
            if curr == header {
                let next = (*curr.as_ptr()).next;
                if self.sweep_prev == Some(curr) {
                    self.sweep_prev = prev;
                }
                if self.sweep_current == Some(curr) {
                    self.sweep_current = next;
                }
                match prev {
                    Some(p) => (*p.as_ptr()).next = next,
                    None => self.root = next,
                }
                (*curr.as_ptr()).next = None;
                return true;
            }
            prev = Some(curr);
            walk = (*curr.as_ptr()).next;
        }
        false
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        // Tear down whatever is left without running destroy hooks; drop
        // glue still runs so host-side resources are returned.
        self.gray.clear();
        self.sweep_prev = None;
        self.sweep_current = None;
        self.soft_roots = None;
        let mut walk = self.root.take();
        while let Some(curr) = walk {
            unsafe {
                walk = (*curr.as_ptr()).next;
                (*curr.as_ptr()).insert_flags(ObjectFlags::REALLY_DELETE | ObjectFlags::CLEANUP);
                self.free_object(curr);
            }
        }
    }
}

pub(crate) struct ObjectIter {
    walk: Option<NonNull<GcHeader>>,
}

impl Iterator for ObjectIter {
    type Item = NonNull<GcHeader>;

    fn next(&mut self) -> Option<NonNull<GcHeader>> {
        let curr = self.walk?;
        self.walk = unsafe { (*curr.as_ptr()).next };
        Some(curr)
    }
}

/// Stat readout snapshot. Displays as
/// `[  Pause  ] Alloc:    12K  Thresh:    18K  Est:    12K  Steps: 3  MinStep:     0K`.
#[derive(Clone, Copy, Debug)]
pub struct GcStats {
    pub state: GcState,
    pub alloc_bytes: usize,
    pub threshold: usize,
    pub estimate: usize,
    pub step_count: u32,
    pub min_step_size: usize,
}

fn kib(bytes: usize) -> usize {
    bytes.saturating_add(1023) >> 10
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:^9}] Alloc:{:6}K  Thresh:{:6}K  Est:{:6}K  Steps: {}  MinStep:{:6}K",
            self.state.name(),
            kib(self.alloc_bytes),
            kib(self.threshold),
            kib(self.estimate),
            self.step_count,
            kib(self.min_step_size),
        )
    }
}
