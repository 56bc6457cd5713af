use crate::Word;

/// Address the demo program is installed at, and where it starts running
pub const DEMO_ORIGIN: u8 = 0x10;

/// Reads two numbers and writes their product, computed by repeated addition
#[rustfmt::skip]
pub const DEMO_PROGRAM: [Word; 10] = [
  0x8AFF, // 10: R[A] ← stdin
  0x8BFF, // 11: R[B] ← stdin
  0x7C00, // 12: R[C] ← 0
  0x7101, // 13: R[1] ← 1
  0xCA18, // 14: if R[A] == 0 goto 18
  0x1CCB, // 15: R[C] ← R[C] + R[B]
  0x2AA1, // 16: R[A] ← R[A] - R[1]
  0xC014, // 17: goto 14
  0x9CFF, // 18: stdout ← R[C]
  0x0000, // 19: halt
];

/// Something that can be installed into memory
pub trait Region {
  /// The `(address, word)` pairs to write
  fn cells(&self) -> Vec<(usize, Word)>;
}

/// A `Chunk` is a contiguous run of words placed at an origin address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
  origin: usize,
  words: Vec<Word>,
}

impl Chunk {
  pub fn new(origin: usize, words: Vec<Word>) -> Self {
    Self { origin, words }
  }

  /// The built-in demonstration program
  pub fn demo() -> Self {
    Self::new(DEMO_ORIGIN as usize, DEMO_PROGRAM.to_vec())
  }

  pub fn origin(&self) -> usize {
    self.origin
  }

  pub fn words(&self) -> &[Word] {
    &self.words
  }
}

impl From<Vec<Word>> for Chunk {
  fn from(words: Vec<Word>) -> Self {
    Self::new(0, words)
  }
}

impl Region for Chunk {
  fn cells(&self) -> Vec<(usize, Word)> {
    self
      .words
      .iter()
      .enumerate()
      .map(|(offset, word)| (self.origin + offset, *word))
      .collect()
  }
}
