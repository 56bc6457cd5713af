use crate::Word;

/// An error caused by the host misusing the machine
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("register index {0} is out of range (0..16)")]
  RegisterOutOfRange(usize),

  #[error("memory address {0:#04X} is out of range (0x00..0x100)")]
  AddressOutOfRange(usize),

  #[error("program of {0} words does not fit in memory")]
  ProgramTooLarge(usize),

  #[error("no program has been loaded")]
  NoProgramLoaded,

  #[error("could not read listing: {0}")]
  Io(#[from] std::io::Error),
}

/// A terminal condition raised while executing an instruction
///
/// A fault stops the machine without committing the faulting instruction.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
  #[error("illegal instruction {word:04X} at {pc:02X}")]
  IllegalOpcode { pc: u8, word: Word },

  #[error("input exhausted at {pc:02X}")]
  InputExhausted { pc: u8 },

  #[error("address {address:04X} out of range at {pc:02X}")]
  AddressOutOfRange { pc: u8, address: Word },

  #[error("instruction fetch at {pc:02X} runs past the end of memory")]
  FetchOutOfBounds { pc: u8 },
}
