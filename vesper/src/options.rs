//! Runtime options passed throughout the engine.

use parking_lot::{Mutex, MutexGuard};

use vesper_gc::{DEFAULT_PAUSE, DEFAULT_STEP_MUL};

pub struct Options {
    /// Collector pause between cycles, in percent.
    pub pause: u32,

    /// Collector speed relative to allocation, in percent.
    pub step_mul: u32,

    /// Buffer to write all console output into instead of stdout.
    pub dump_buffer: Option<Mutex<String>>,
}

impl Options {
    pub fn dump_buffer(&self) -> Option<MutexGuard<'_, String>> {
        self.dump_buffer.as_ref().map(|buffer| buffer.lock())
    }
}

impl Default for Options {
    fn default() -> Self {
        OptionsBuilder::new().build()
    }
}

pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self(Options {
            pause: DEFAULT_PAUSE,
            step_mul: DEFAULT_STEP_MUL,
            dump_buffer: None,
        })
    }

    /// Return the options that have been built, consuming the builder.
    pub fn build(self) -> Options {
        self.0
    }

    pub fn pause(mut self, pause: u32) -> Self {
        self.0.pause = pause.max(1);
        self
    }

    pub fn step_mul(mut self, step_mul: u32) -> Self {
        self.0.step_mul = step_mul;
        self
    }

    pub fn dump_buffer(mut self, dump_buffer: Option<Mutex<String>>) -> Self {
        self.0.dump_buffer = dump_buffer;
        self
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
