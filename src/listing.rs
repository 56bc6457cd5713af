//! Program listings: one `AA: WWWW` memory cell per line.
//!
//! ```text
//! 10: 8AFF   read to R[A]
//! 11: 8BFF   read to R[B]
//! ```
//!
//! Anything after the word is a comment. Lines that do not start, in the
//! first column, with a two digit hex address, a colon, optional spaces and a
//! four digit hex word are skipped, so headers and prose can sit between the
//! cells.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::region::Region;
use crate::Word;

/// Two hex digits of address, a colon, optional spaces, four hex digits of word
static CELL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([[:xdigit:]]{2}): *([[:xdigit:]]{4})").unwrap());

/// The memory cells described by a listing, in file order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
  cells: Vec<(u8, Word)>,
}

impl Listing {
  pub fn parse(text: &str) -> Self {
    let cells = text.lines().filter_map(parse_line).collect();
    Self { cells }
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
    let text = fs::read_to_string(path)?;
    Ok(Self::parse(&text))
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Lowest address in the listing, the usual place to start running
  pub fn origin(&self) -> Option<u8> {
    self.cells.iter().map(|(address, _)| *address).min()
  }
}

impl Region for Listing {
  fn cells(&self) -> Vec<(usize, Word)> {
    self
      .cells
      .iter()
      .map(|(address, word)| (*address as usize, *word))
      .collect()
  }
}

fn parse_line(line: &str) -> Option<(u8, Word)> {
  let caps = CELL.captures(line)?;
  let address = u8::from_str_radix(&caps[1], 16).ok()?;
  let word = Word::from_str_radix(&caps[2], 16).ok()?;
  Some((address, word))
}
