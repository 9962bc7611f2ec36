//! Frame-loop demo: ticks a world, churns actors, and lets the collector
//! amortize its work across frames. Prints the `stat gc` readout as it
//! goes and accepts `gc` console commands from the command line.

use anyhow::Result;
use clap::Parser;

use vesper::console::{gc_command, gc_stat};
use vesper::options::OptionsBuilder;
use vesper::world::World;

/// Raw command line arguments.
#[derive(Parser)]
#[command(about)]
struct Args {
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Actors spawned per tick
    #[arg(long, default_value_t = 3)]
    spawn_per_tick: u32,

    /// Lifetime of a spawned actor, in ticks
    #[arg(long, default_value_t = 70)]
    actor_tics: i32,

    /// Sector count for the demo level
    #[arg(long, default_value_t = 600)]
    sectors: usize,

    /// Print the gc stat readout every N ticks (0 = never)
    #[arg(long, default_value_t = 350)]
    stats_every: u64,

    /// Initial GC pause percentage
    #[arg(long)]
    gc_pause: Option<u32>,

    /// Initial GC stepmul percentage
    #[arg(long)]
    gc_stepmul: Option<u32>,

    /// Console commands to run after the loop, e.g. "count" or "pause 200"
    #[arg(long = "gc")]
    gc_commands: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut builder = OptionsBuilder::new();
    if let Some(pause) = args.gc_pause {
        builder = builder.pause(pause);
    }
    if let Some(step_mul) = args.gc_stepmul {
        builder = builder.step_mul(step_mul);
    }
    let options = builder.build();

    let mut world = World::new(&options);
    world.load_level(args.sectors, 8, args.sectors * 3);
    world.join_player(0, 100);

    for tick in 1..=args.ticks {
        for _ in 0..args.spawn_per_tick {
            world.spawn_actor(20, args.actor_tics);
        }
        if tick % 90 == 0 && args.sectors > 0 {
            world.start_floor_mover(tick as usize % args.sectors, 64.0, 0.5);
        }
        world.tick();
        if args.stats_every > 0 && tick % args.stats_every == 0 {
            println!("tick {tick:5}  {}", gc_stat(&world));
        }
    }

    for command in &args.gc_commands {
        let argv: Vec<&str> = command.split_whitespace().collect();
        match gc_command(&mut world, &argv) {
            Ok(text) => println!("gc {command}: {text}"),
            Err(err) => eprintln!("gc {command}: {err}"),
        }
    }

    println!("final: {}", gc_stat(&world));
    world.shutdown();
    println!("after shutdown: {} objects", world.gc.object_count());
    Ok(())
}
