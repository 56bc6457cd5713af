use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::Error;
use crate::listing::Listing;
use crate::registers::REGISTER_COUNT;
use crate::region::{Chunk, Region, DEMO_ORIGIN};
use crate::vm::{State, StepOutcome, Vm};
use crate::Word;

/// Lifecycle of the machine as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
  /// Nothing loaded since construction or the last clear
  Unloaded,
  /// A program is loaded but not running
  Ready,
  Running,
  Halted,
  /// Stopped by a fault, with its reason
  Faulted(String),
}

/// The control and inspection surface a host drives the machine through.
///
/// The host sets the machine up, marks it running, then calls
/// [`Portal::step_program`] once per tick and reads the accessors to refresh
/// its view. Pacing is entirely up to the host.
#[derive(Debug, Clone)]
pub struct Portal {
  vm: Vm,
  /// Cells installed since the last clear, replayed by `restart`
  program: Option<BTreeMap<u8, Word>>,
  /// Input queued when the program was first started, replayed by `restart`
  seed: Vec<Word>,
  /// Where the program was first started from, `None` until it is
  entry: Option<u8>,
}

impl Portal {
  pub fn new() -> Self {
    Self::with_config(Config::default())
  }

  pub fn with_config(config: Config) -> Self {
    Self {
      vm: Vm::with_config(config),
      program: None,
      seed: Vec::new(),
      entry: None,
    }
  }

  pub fn vm(&self) -> &Vm {
    &self.vm
  }

  /// Overwrite a prefix of the registers; values past the sixteenth are ignored
  pub fn load_regs(&mut self, values: &[Word]) {
    if values.len() > REGISTER_COUNT {
      tracing::debug!("ignoring {} values past R[F]", values.len() - REGISTER_COUNT);
    }
    self.vm.registers_mut().load(values);
  }

  /// Install the built-in demo program at 0x10
  pub fn load_fixed_program(&mut self) {
    if let Err(err) = self.install(&Chunk::demo()) {
      tracing::error!("demo program did not load: {err}");
    }
  }

  /// Replace the whole memory image, starting at address zero
  pub fn load_program(&mut self, words: &[Word]) -> Result<(), Error> {
    self.vm.memory_mut().load_program(words)?;
    // load_program rejected anything longer than memory
    let cells = (0..=u8::MAX).zip(words.iter().copied()).collect();
    tracing::debug!("loaded {} word image", words.len());
    self.program = Some(cells);
    self.entry = None;
    Ok(())
  }

  /// Overlay the cells of a parsed listing
  pub fn load_listing(&mut self, listing: &Listing) -> Result<(), Error> {
    self.install(listing)
  }

  fn install<R>(&mut self, region: &R) -> Result<(), Error>
  where
    R: Region,
  {
    self.vm.memory_mut().load_region(region)?;
    let mut cells = self.program.take().unwrap_or_default();
    // load_region accepted every address
    cells.extend(region.cells().into_iter().map(|(a, w)| (a as u8, w)));
    tracing::debug!("program now covers {} cells", cells.len());
    self.program = Some(cells);
    self.entry = None;
    Ok(())
  }

  pub fn set_pc(&mut self, address: usize) -> Result<(), Error> {
    let pc = u8::try_from(address).map_err(|_| Error::AddressOutOfRange(address))?;
    tracing::debug!("pc set to {pc:02X}");
    self.vm.set_pc(pc);
    Ok(())
  }

  pub fn get_pc(&self) -> u8 {
    self.vm.pc()
  }

  pub fn push_to_input(&mut self, value: Word) {
    self.vm.io_mut().push_input(value);
  }

  /// Mark the machine running from the current pc.
  ///
  /// The first start after a program is installed records the pc and the
  /// queued input as the set up `restart` returns to. Resuming after a pause
  /// keeps that record.
  pub fn set_program_running(&mut self) -> Result<(), Error> {
    if self.program.is_none() {
      return Err(Error::NoProgramLoaded);
    }
    if self.entry.is_none() {
      self.entry = Some(self.vm.pc());
      self.seed = self.vm.io().inputs().collect();
      tracing::debug!("entry point {:02X}, {} inputs queued", self.vm.pc(), self.seed.len());
    }
    self.vm.start();
    Ok(())
  }

  /// Pause a running machine
  pub fn reset_program_running(&mut self) {
    self.vm.stop();
  }

  pub fn get_program_running(&self) -> bool {
    self.vm.is_running()
  }

  pub fn clear_regs_and_memory(&mut self) {
    self.vm.registers_mut().clear();
    self.vm.memory_mut().clear();
    self.vm.stop();
    self.program = None;
    self.seed.clear();
    self.entry = None;
  }

  /// Execute one instruction, a no-op unless the machine is running
  pub fn step_program(&mut self) -> Option<StepOutcome> {
    self.vm.step()
  }

  /// Step until the machine stops or the budget runs out, returning the
  /// number of instructions executed
  pub fn run_to_completion(&mut self, max_steps: usize) -> usize {
    self.vm.run(max_steps)
  }

  /// [`Portal::run_to_completion`] with the configured step budget
  pub fn run(&mut self) -> usize {
    self.vm.run_to_budget()
  }

  /// Put the machine back into the state right after its initial set up.
  ///
  /// Registers and output start empty, memory holds only the installed
  /// program (the demo if there is none) and the input queued at the first
  /// start is queued again. The new machine replaces the old one in a single
  /// move.
  pub fn restart(&mut self) {
    let mut vm = Vm::with_config(*self.vm.config());
    let program = self.program.get_or_insert_with(|| {
      let demo = Chunk::demo();
      (DEMO_ORIGIN..).zip(demo.words().iter().copied()).collect()
    });
    for (address, word) in program.iter() {
      vm.memory_mut().set(*address, *word);
    }
    if self.entry.is_none() {
      self.seed = self.vm.io().inputs().collect();
    }
    let entry = *self.entry.get_or_insert(DEMO_ORIGIN);
    for value in &self.seed {
      vm.io_mut().push_input(*value);
    }
    vm.set_pc(entry);
    vm.start();
    tracing::debug!("restarted at {entry:02X}");
    self.vm = vm;
  }

  pub fn reg_as_string(&self, index: usize) -> Result<String, Error> {
    self.vm.registers().format(index)
  }

  pub fn memory_as_string(&self, address: usize) -> Result<String, Error> {
    self.vm.memory().format(address)
  }

  pub fn inputs_as_string(&self) -> String {
    self.vm.io().inputs_as_string()
  }

  pub fn outputs_as_string(&self) -> String {
    self.vm.io().outputs_as_string()
  }

  pub fn next_instruction_as_string(&self) -> String {
    self.vm.preview()
  }

  /// Why the last run stopped, if it stopped on a fault
  pub fn get_last_fault_reason(&self) -> Option<String> {
    match self.vm.state() {
      State::Faulted(fault) => Some(fault.to_string()),
      _ => None,
    }
  }

  pub fn status(&self) -> Status {
    match self.vm.state() {
      State::Running => Status::Running,
      State::Halted => Status::Halted,
      State::Faulted(fault) => Status::Faulted(fault.to_string()),
      State::Idle if self.program.is_some() => Status::Ready,
      State::Idle => Status::Unloaded,
    }
  }
}

impl Default for Portal {
  fn default() -> Self {
    Self::new()
  }
}
