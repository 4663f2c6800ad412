use std::fmt;
use std::io::Write;

use crate::{
    allocator::{AllocError, Allocator},
    commands::{Command, CommandError},
};

use anyhow::Result;
use log::*;

/// Observable outcome of a single command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Allocated { process: String, size: u64 },
    AllocationFailed { process: String, size: u64 },
    Released { process: String },
    UnknownProcess { process: String },
    Rejected { process: String, reason: &'static str },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::Allocated { process, size, .. } => {
                write!(f, "Allocated {size} KB to process {process}")
            }
            Event::AllocationFailed { process, size } => {
                write!(f, "Failed to allocate {size} KB to process {process}")
            }
            Event::Released { process } => {
                write!(f, "Released memory of process {process}")
            }
            Event::UnknownProcess { process } => {
                write!(f, "No process found with name: {process}")
            }
            Event::Rejected { process, reason } => {
                write!(f, "Rejected request from process {process}: {reason}")
            }
        }
    }
}

/// Drives an allocator with a stream of commands, applied one
/// after the other in the order they arrive.
pub struct Simulation {
    allocator: Allocator,
}

impl Simulation {
    pub fn new(total_memory: u64) -> Result<Self> {
        let allocator = Allocator::new(total_memory)?;
        info!("Simulating {total_memory} KB of memory.");

        Ok(Self { allocator })
    }

    /// Current state of the memory, for reporting.
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Apply a single command to the allocator.
    pub fn apply(&mut self, command: Command) -> Event {
        match command {
            Command::Request { process, size } => {
                match self.allocator.allocate(&process, size) {
                    Ok(allocation) => {
                        debug!(
                            "Placed {process} at {:#x} ({} KB).",
                            allocation.start,
                            allocation.size,
                        );
                        Event::Allocated { process, size }
                    }
                    Err(AllocError::InvalidRequest(reason)) => {
                        warn!("Rejected request from {process}: {reason}");
                        Event::Rejected { process, reason }
                    }
                    Err(AllocError::NoFit { .. }) => Event::AllocationFailed { process, size },
                    Err(AllocError::UnknownProcess(_)) => {
                        unreachable!("an allocation never looks up an owner")
                    }
                }
            }
            Command::Release { process } => {
                match self.allocator.deallocate(&process) {
                    Ok(_) => Event::Released { process },
                    Err(AllocError::InvalidRequest(reason)) => {
                        warn!("Rejected release from {process}: {reason}");
                        Event::Rejected { process, reason }
                    }
                    Err(AllocError::NoFit { .. }) => {
                        unreachable!("a release never searches for a free block")
                    }
                    Err(AllocError::UnknownProcess(_)) => Event::UnknownProcess { process },
                }
            }
        }
    }

    /// Apply every command from the source and write one line
    /// per command to `out`.
    ///
    /// Lines that cannot be parsed are reported and skipped. A
    /// read error ends the stream, but whatever was applied up
    /// to that point is kept.
    pub fn run<I, W>(&mut self, commands: I, out: &mut W) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<Command, CommandError>>,
        W: Write,
    {
        let mut applied = 0;
        let mut skipped = 0;

        for command in commands {
            match command {
                Ok(command) => {
                    let event = self.apply(command);
                    debug!("{event:?}");
                    writeln!(out, "{event}")?;
                    applied += 1;
                }
                Err(CommandError::Unknown { line, text }) => {
                    warn!("Skipping line {line}.");
                    writeln!(out, "Unknown command: {text}")?;
                    skipped += 1;
                }
                Err(error) => {
                    error!("Error reading commands: {error}");
                    break;
                }
            }
        }

        info!(
            "Applied {applied} commands ({skipped} skipped) to {} KB of memory: \
             {} allocations succeeded, {} failed.",
            self.allocator.total_memory(),
            self.allocator.successful_allocations(),
            self.allocator.failed_allocations(),
        );
        Ok(())
    }
}
