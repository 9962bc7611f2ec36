//! Object header for tri-color marking.
//!
//! Every managed object has a `GcHeader` prepended to track GC state.
//! Layout: | GcHeader | object data ... |
//!
//! The color is spread over three independent flag bits (the two whites and
//! black); a gray object carries none of them and sits on the gray list.
//! Which white is "live" alternates between cycles, so sweeping never has to
//! repaint the whole heap before marking can start again.

use core::{alloc::Layout, ptr::NonNull};

use bitflags::bitflags;

use crate::trace::ClassDesc;

bitflags! {
    /// Per-object flag word.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct ObjectFlags: u32 {
        /// White of the even cycles.
        const WHITE0 = 1 << 0;
        /// White of the odd cycles.
        const WHITE1 = 1 << 1;
        /// Marked and fully scanned.
        const BLACK = 1 << 2;
        /// Immortal sentinel. Always treated as live, never swept.
        const FIXED = 1 << 3;
        /// The object is a soft root (lives past the soft-root sentinel).
        const ROOTED = 1 << 4;
        /// Explicitly destroyed by the host; collected regardless of
        /// reachability, and its mark hook is skipped.
        const EUTHANIZE = 1 << 5;
        /// Memory is not tracked by the collector. Ignored by marking and
        /// by the write barrier; never freed.
        const RELEASED = 1 << 6;
        /// The destructor has run and the memory is about to be freed.
        const CLEANUP = 1 << 7;
        /// Suppresses the diagnostic for intentionally freeing a `FIXED`
        /// object.
        const REALLY_DELETE = 1 << 8;

        /// Both white bits.
        const WHITE_BITS = Self::WHITE0.bits() | Self::WHITE1.bits();
        /// All three color bits.
        const COLOR_BITS = Self::WHITE_BITS.bits() | Self::BLACK.bits();
    }
}

/// Header prepended to every managed allocation.
///
/// The allocation list and the gray list are both threaded through here so
/// the collector never allocates while collecting.
#[repr(C, align(16))]
pub struct GcHeader {
    /// Type descriptor: size plus the mark/destroy/drop hooks.
    class: &'static ClassDesc,
    flags: ObjectFlags,
    /// Total allocation size, header included.
    alloc_size: usize,
    /// Next object in the allocation list.
    pub(crate) next: Option<NonNull<GcHeader>>,
    /// Next object in the gray list; meaningful only while gray.
    pub(crate) gray_next: Option<NonNull<GcHeader>>,
}

impl GcHeader {
    /// Size of the header. Also the distance from a header to its payload.
    pub const SIZE: usize = core::mem::size_of::<GcHeader>();

    /// Alignment of every managed allocation. Payload types with stricter
    /// alignment are not supported.
    pub const ALIGN: usize = 16;

    pub(crate) fn new(class: &'static ClassDesc, flags: ObjectFlags, alloc_size: usize) -> GcHeader {
        GcHeader { class, flags, alloc_size, next: None, gray_next: None }
    }

    #[inline]
    pub fn class(&self) -> &'static ClassDesc {
        self.class
    }

    #[inline]
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    #[inline]
    pub(crate) fn insert_flags(&mut self, flags: ObjectFlags) {
        self.flags.insert(flags);
    }

    #[inline]
    pub(crate) fn remove_flags(&mut self, flags: ObjectFlags) {
        self.flags.remove(flags);
    }

    /// Total allocation size, header included.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.alloc_size
    }

    // ------------------------------------------------------------------
    // Color arithmetic
    // ------------------------------------------------------------------

    #[inline]
    pub fn is_white(&self) -> bool {
        self.flags.intersects(ObjectFlags::WHITE_BITS)
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        self.flags.contains(ObjectFlags::BLACK)
    }

    /// Gray carries none of the color bits; the gray list membership is the
    /// other half of the definition.
    #[inline]
    pub fn is_gray(&self) -> bool {
        !self.flags.intersects(ObjectFlags::COLOR_BITS)
    }

    #[inline]
    pub(crate) fn white_to_gray(&mut self) {
        self.flags.remove(ObjectFlags::WHITE_BITS);
    }

    #[inline]
    pub(crate) fn gray_to_black(&mut self) {
        self.flags.insert(ObjectFlags::BLACK);
    }

    #[inline]
    pub(crate) fn black_to_gray(&mut self) {
        self.flags.remove(ObjectFlags::BLACK);
    }

    /// Repaint with the given cycle's live white, clearing any other color.
    #[inline]
    pub(crate) fn make_white(&mut self, current_white: ObjectFlags) {
        self.flags.remove(ObjectFlags::COLOR_BITS);
        self.flags.insert(current_white & ObjectFlags::WHITE_BITS);
    }

    /// Dead for sweep purposes: carries only the previous cycle's white.
    /// `dead_mask` is the other-white mask with `FIXED` included, so fixed
    /// objects always test live.
    #[inline]
    pub(crate) fn is_dead(&self, dead_mask: ObjectFlags) -> bool {
        ((self.flags ^ ObjectFlags::WHITE_BITS) & dead_mask).is_empty()
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Pointer to the payload, immediately after the header.
    #[inline]
    pub(crate) fn data_ptr(&self) -> *mut u8 {
        unsafe { (self as *const GcHeader as *mut u8).add(Self::SIZE) }
    }

    /// Recover the header from a payload pointer.
    ///
    /// # Safety
    /// `data` must point at the payload of a live managed allocation.
    #[inline]
    pub(crate) unsafe fn from_data_ptr<T>(data: *const T) -> NonNull<GcHeader> {
        NonNull::new_unchecked((data as *mut u8).sub(Self::SIZE) as *mut GcHeader)
    }

    /// Layout of an allocation with a `size`-byte payload.
    #[inline]
    pub(crate) fn layout_for_size(size: usize) -> Layout {
        let total = Self::SIZE + align_up(size, Self::ALIGN);
        Layout::from_size_align(total, Self::ALIGN).unwrap()
    }
}

#[inline]
fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
