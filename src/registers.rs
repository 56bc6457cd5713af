use crate::error::Error;
use crate::Word;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 16;

/// The sixteen general purpose registers of the machine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterFile {
  registers: [Word; REGISTER_COUNT],
}

impl RegisterFile {
  /// Create a register file with every register zeroed
  pub fn new() -> Self {
    Self::default()
  }

  pub fn read(&self, index: usize) -> Result<Word, Error> {
    self
      .registers
      .get(index)
      .copied()
      .ok_or(Error::RegisterOutOfRange(index))
  }

  pub fn write(&mut self, index: usize, value: Word) -> Result<(), Error> {
    let slot = self
      .registers
      .get_mut(index)
      .ok_or(Error::RegisterOutOfRange(index))?;
    *slot = value;
    Ok(())
  }

  /// Overwrite a prefix of the register file.
  ///
  /// Values past the sixteenth are ignored, registers past the prefix keep
  /// their previous value.
  pub fn load(&mut self, values: &[Word]) {
    for (slot, value) in self.registers.iter_mut().zip(values) {
      *slot = *value;
    }
  }

  pub fn clear(&mut self) {
    self.registers = [0; REGISTER_COUNT];
  }

  /// Fixed width hex rendering of a single register
  pub fn format(&self, index: usize) -> Result<String, Error> {
    self.read(index).map(|value| format!("{value:04X}"))
  }

  pub fn iter(&self) -> impl Iterator<Item = Word> + '_ {
    self.registers.iter().copied()
  }

  // instruction operands are nibbles, so they are always in range
  pub(crate) fn get(&self, index: usize) -> Word {
    self.registers[index & 0xF]
  }

  pub(crate) fn set(&mut self, index: usize, value: Word) {
    self.registers[index & 0xF] = value;
  }
}
