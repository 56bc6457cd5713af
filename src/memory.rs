use crate::error::Error;
use crate::region::Region;
use crate::Word;

/// Number of addressable words
pub const MEMORY_SIZE: usize = 256;

/// Address of the stdio port: loads from it read input, stores to it write
/// output
pub const IO_ADDRESS: u8 = 0xFF;

/// Flat word-addressed memory shared by code and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
  cells: [Word; MEMORY_SIZE],
}

impl Memory {
  pub fn new() -> Self {
    Self {
      cells: [0; MEMORY_SIZE],
    }
  }

  pub fn read(&self, address: usize) -> Result<Word, Error> {
    self
      .cells
      .get(address)
      .copied()
      .ok_or(Error::AddressOutOfRange(address))
  }

  pub fn write(&mut self, address: usize, value: Word) -> Result<(), Error> {
    let cell = self
      .cells
      .get_mut(address)
      .ok_or(Error::AddressOutOfRange(address))?;
    *cell = value;
    Ok(())
  }

  /// Replace the whole image, starting at address zero.
  ///
  /// Short programs are padded with `0000` (halt), programs longer than
  /// memory are rejected and leave the image untouched.
  pub fn load_program(&mut self, words: &[Word]) -> Result<(), Error> {
    if words.len() > MEMORY_SIZE {
      return Err(Error::ProgramTooLarge(words.len()));
    }
    self.cells = [0; MEMORY_SIZE];
    self.cells[..words.len()].copy_from_slice(words);
    Ok(())
  }

  /// Overlay the cells of a region, leaving every other cell alone.
  ///
  /// Either every cell is written or, on a bad address, none is.
  pub fn load_region<R>(&mut self, region: &R) -> Result<(), Error>
  where
    R: Region,
  {
    let cells = region.cells();
    if let Some((address, _)) = cells.iter().find(|(a, _)| *a >= MEMORY_SIZE) {
      return Err(Error::AddressOutOfRange(*address));
    }
    for (address, word) in cells {
      self.cells[address] = word;
    }
    Ok(())
  }

  pub fn clear(&mut self) {
    self.cells = [0; MEMORY_SIZE];
  }

  /// Fixed width hex rendering of a single cell
  pub fn format(&self, address: usize) -> Result<String, Error> {
    self.read(address).map(|value| format!("{value:04X}"))
  }

  pub fn iter(&self) -> impl Iterator<Item = Word> + '_ {
    self.cells.iter().copied()
  }

  pub(crate) fn get(&self, address: u8) -> Word {
    self.cells[address as usize]
  }

  pub(crate) fn set(&mut self, address: u8, value: Word) {
    self.cells[address as usize] = value;
  }
}

impl Default for Memory {
  fn default() -> Self {
    Self::new()
  }
}
