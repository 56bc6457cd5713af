//! A small teaching computer: the TOY machine
//!
//! <https://introcs.cs.princeton.edu/java/62toy/>
//!
//! Sixteen 16-bit registers, 256 words of memory, sixteen instructions, and a
//! pair of queues standing in for standard input and output. The [`Portal`]
//! is what a host (a web page, the bundled binary) drives: set up, mark
//! running, step, look at the state, step again.

pub mod config;
pub mod error;
pub mod instruction;
pub mod io;
pub mod listing;
pub mod memory;
pub mod opcode;
pub mod portal;
pub mod region;
pub mod registers;
pub mod vm;

/// The machine word: every register and memory cell holds one
pub type Word = u16;

pub use config::{Config, InputPolicy};
pub use error::{Error, Fault};
pub use portal::{Portal, Status};
pub use vm::{StepOutcome, Vm};
