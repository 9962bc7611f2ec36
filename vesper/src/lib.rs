//! Vesper playsim.
//!
//! The engine side of the collector: the managed object skeleton (actors,
//! interpolations, movers, sound nodes, menus), the level wrapper with its
//! bulk marker, the root set, runtime options, and the `gc` console
//! command. The collector core lives in [`vesper_gc`], re-exported here as
//! [`gc`].

pub mod console;
pub mod level;
pub mod objects;
pub mod options;
pub mod world;

pub use vesper_gc as gc;
