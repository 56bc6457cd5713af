/// What a read from the stdio port does once the input queue is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPolicy {
  /// Stop the machine with [`Fault::InputExhausted`](crate::Fault::InputExhausted)
  #[default]
  Fault,
  /// Read `0000` and keep going
  Zero,
}

/// Execution options for a [`Vm`](crate::vm::Vm)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub input_policy: InputPolicy,
  /// Step budget for [`Vm::run_to_budget`](crate::vm::Vm::run_to_budget)
  pub max_steps: usize,
}

impl Config {
  pub const DEFAULT_MAX_STEPS: usize = 10_000;

  pub fn with_input_policy(mut self, input_policy: InputPolicy) -> Self {
    self.input_policy = input_policy;
    self
  }

  pub fn with_max_steps(mut self, max_steps: usize) -> Self {
    self.max_steps = max_steps;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      input_policy: InputPolicy::default(),
      max_steps: Self::DEFAULT_MAX_STEPS,
    }
  }
}
