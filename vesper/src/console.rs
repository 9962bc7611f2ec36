//! The `gc` console command.
//!
//! Operator control over the collector: suspend it, schedule it, force a
//! full collection, count live objects, and adjust the pause/stepmul
//! tunables at runtime.

use thiserror::Error;

use crate::world::World;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Usage: gc stop|now|full|count|pause [size]|stepmul [size]")]
    Usage,
    #[error("Unknown gc subcommand '{0}'")]
    UnknownVerb(String),
    #[error("Bad numeric argument '{0}'")]
    BadNumber(String),
}

/// Dispatch one `gc` console command. Returns the text to print.
/// Verbs are case-insensitive; arguments past the ones a verb consumes are
/// ignored.
pub fn gc_command(world: &mut World, args: &[&str]) -> Result<String, ConsoleError> {
    let Some((verb, rest)) = args.split_first() else {
        return Err(ConsoleError::Usage);
    };
    match verb.to_ascii_lowercase().as_str() {
        "stop" => {
            // Park the threshold where allocation cannot reach it.
            world.gc.set_threshold_bytes(usize::MAX - 2);
            Ok("Collection suspended".to_owned())
        }
        "now" => {
            world.gc.set_threshold_bytes(world.gc.alloc_bytes());
            Ok("Collection scheduled".to_owned())
        }
        "full" => {
            let World { gc, roots } = world;
            gc.full_gc(roots);
            Ok(gc.stats().to_string())
        }
        "count" => Ok(format!("{} active objects counted", world.gc.object_count())),
        "pause" => match rest.first() {
            None => Ok(format!("Current GC pause is {}", world.gc.pause_tuning())),
            Some(value) => {
                let value = parse_number(value)?;
                world.gc.set_pause_tuning(value.max(1));
                Ok(format!("GC pause is now {}", world.gc.pause_tuning()))
            }
        },
        "stepmul" => match rest.first() {
            None => Ok(format!("Current GC stepmul is {}", world.gc.step_mul())),
            Some(value) => {
                let value = parse_number(value)?;
                world.gc.set_step_mul(value.max(100));
                Ok(format!("GC stepmul is now {}", world.gc.step_mul()))
            }
        },
        _ => Err(ConsoleError::UnknownVerb((*verb).to_owned())),
    }
}

/// The `stat gc` readout.
pub fn gc_stat(world: &World) -> String {
    world.gc.stats().to_string()
}

fn parse_number(text: &str) -> Result<u32, ConsoleError> {
    text.parse().map_err(|_| ConsoleError::BadNumber(text.to_owned()))
}
