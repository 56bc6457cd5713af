use std::collections::VecDeque;

use crate::Word;

/// The input and output queues attached to the stdio port
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoQueues {
  input: VecDeque<Word>,
  output: Vec<Word>,
}

impl IoQueues {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queues pre-seeded with input
  pub fn with_input<I>(input: I) -> Self
  where
    I: IntoIterator<Item = Word>,
  {
    Self {
      input: input.into_iter().collect(),
      output: Vec::new(),
    }
  }

  pub fn push_input(&mut self, value: Word) {
    self.input.push_back(value);
  }

  /// Consume the next input word, `None` once the queue is exhausted
  pub fn pop_input(&mut self) -> Option<Word> {
    self.input.pop_front()
  }

  pub fn peek_input(&self) -> Option<Word> {
    self.input.front().copied()
  }

  pub fn push_output(&mut self, value: Word) {
    self.output.push(value);
  }

  pub fn inputs(&self) -> impl Iterator<Item = Word> + '_ {
    self.input.iter().copied()
  }

  pub fn outputs(&self) -> &[Word] {
    &self.output
  }

  /// Remaining input, e.g. `Input 2(0002x), 3(0003x)`
  pub fn inputs_as_string(&self) -> String {
    render("Input ", "No input", self.input.iter())
  }

  /// Everything written so far, e.g. `Output: 6(0006x)`
  pub fn outputs_as_string(&self) -> String {
    render("Output: ", "No output", self.output.iter())
  }
}

fn render<'a>(prefix: &str, empty: &str, words: impl Iterator<Item = &'a Word>) -> String {
  let items: Vec<String> = words.map(|w| format!("{w}({w:04X}x)")).collect();
  if items.is_empty() {
    empty.to_string()
  } else {
    format!("{prefix}{}", items.join(", "))
  }
}
