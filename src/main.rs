mod allocator;
mod commands;
mod report;
mod simulation;

use std::{
    env,
    fs::File,
    io::{self, BufReader, Write},
};

use anyhow::{Context, Result};
use log::*;

use commands::CommandSource;
use report::Report;
use simulation::Simulation;

const SEPARATOR: &str = "========================================";

fn main() -> Result<()> {
    // Log at the info level unless told otherwise.
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let Some(path) = env::args().nth(1) else {
        println!("Usage: firstfit <input_file>");
        println!("Example: firstfit memory_requests.txt");
        return Ok(());
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Memory Allocation Simulator (First-Fit)")?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out)?;
    writeln!(out, "Reading from: {path}")?;

    let file = File::open(&path)
        .with_context(|| format!("Failed to open {path}"))?;
    info!("Opened {path}.");

    // The first line gives the size of the memory, the rest of
    // the file is the list of commands to apply to it.
    let (total_memory, commands) = CommandSource::new(BufReader::new(file))
        .with_context(|| format!("Failed to read the header of {path}"))?;

    let mut simulation = Simulation::new(total_memory)?;
    simulation.run(commands, &mut out)?;

    write!(out, "{}", Report::new(simulation.allocator()))?;
    info!("Simulation finished.");

    Ok(())
}
