use crate::config::{Config, InputPolicy};
use crate::error::Fault;
use crate::instruction::{self, Instruction};
use crate::io::IoQueues;
use crate::memory::{Memory, IO_ADDRESS};
use crate::opcode::Opcode;
use crate::registers::RegisterFile;
use crate::Word;

/// Where the machine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  /// Not started, or paused by the host
  Idle,
  Running,
  Halted,
  Faulted(Fault),
}

/// The result of executing a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
  /// The program counter moved on and the machine keeps running
  Continued,
  Halted,
  /// Nothing was committed, the machine stopped
  Faulted(Fault),
}

/// A virtual machine for the TOY architecture.
///
/// Sixteen 16-bit registers, 256 words of memory with the last word mapped to
/// the input/output queues, and an 8-bit program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
  pc: u8,
  registers: RegisterFile,
  memory: Memory,
  io: IoQueues,
  state: State,
  config: Config,
}

impl Vm {
  /// Create a new, empty virtual machine
  pub fn new() -> Self {
    Self::with_config(Config::default())
  }

  pub fn with_config(config: Config) -> Self {
    Self {
      pc: 0,
      registers: RegisterFile::new(),
      memory: Memory::new(),
      io: IoQueues::new(),
      state: State::Idle,
      config,
    }
  }

  pub fn pc(&self) -> u8 {
    self.pc
  }

  pub fn set_pc(&mut self, pc: u8) {
    self.pc = pc;
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn registers_mut(&mut self) -> &mut RegisterFile {
    &mut self.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  pub fn io(&self) -> &IoQueues {
    &self.io
  }

  pub fn io_mut(&mut self) -> &mut IoQueues {
    &mut self.io
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn is_running(&self) -> bool {
    self.state == State::Running
  }

  pub fn start(&mut self) {
    self.state = State::Running;
  }

  /// Pause a running machine; a halted or faulted machine stays as it is
  pub fn stop(&mut self) {
    if self.state == State::Running {
      self.state = State::Idle;
    }
  }

  /// Fetch, decode and execute one instruction.
  ///
  /// Returns `None` without touching anything when the machine is not
  /// running.
  pub fn step(&mut self) -> Option<StepOutcome> {
    if !self.is_running() {
      return None;
    }
    let outcome = match Instruction::decode(&self.memory, self.pc) {
      Ok(ins) => self.execute(&ins),
      Err(fault) => self.settle(StepOutcome::Faulted(fault)),
    };
    Some(outcome)
  }

  /// Execute an already decoded instruction located at the current pc
  pub fn execute(&mut self, ins: &Instruction) -> StepOutcome {
    let pc = self.pc;
    let flow = Task::new(self, pc, ins).run();
    let outcome = match flow {
      Ok(Flow::Halt) => {
        self.registers.set(0, 0);
        StepOutcome::Halted
      }
      Ok(flow) => {
        self.pc = match flow {
          Flow::Jump(target) => target,
          // decode keeps every instruction below the stdio port, so this
          // stays inside a u8
          _ => pc.wrapping_add(ins.size() as u8),
        };
        self.registers.set(0, 0);
        tracing::trace!(
          "{:?} pc={:02X} word={:04X} next={:02X} regs={:?}",
          ins.opcode,
          pc,
          ins.word,
          self.pc,
          self.registers
        );
        StepOutcome::Continued
      }
      Err(fault) => StepOutcome::Faulted(fault),
    };
    self.settle(outcome)
  }

  fn settle(&mut self, outcome: StepOutcome) -> StepOutcome {
    match outcome {
      StepOutcome::Continued => {}
      StepOutcome::Halted => {
        tracing::info!("halted at {:02X}", self.pc);
        self.state = State::Halted;
      }
      StepOutcome::Faulted(fault) => {
        tracing::warn!("faulted: {fault}");
        self.state = State::Faulted(fault);
      }
    }
    outcome
  }

  /// Step until the machine stops or `max_steps` instructions have run,
  /// returning the number of instructions executed
  pub fn run(&mut self, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps {
      if self.step().is_none() {
        return steps;
      }
      steps += 1;
    }
    if self.is_running() {
      tracing::info!("reached maximum steps ({max_steps}), still running");
    }
    steps
  }

  /// [`Vm::run`] with the step budget from the machine's [`Config`]
  pub fn run_to_budget(&mut self) -> usize {
    self.run(self.config.max_steps)
  }

  /// Human readable form of the instruction at the pc, with no side effects
  pub fn preview(&self) -> String {
    instruction::preview(self.pc, &self.registers, &self.memory, &self.io)
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

enum Flow {
  Next,
  Jump(u8),
  Halt,
}

/// Execution of a single instruction.
///
/// Every operation checks everything that can fault before it writes, so a
/// fault leaves the machine untouched.
struct Task<'vm, 'ins> {
  vm: &'vm mut Vm,
  pc: u8,
  ins: &'ins Instruction,
}

impl<'vm, 'ins> Task<'vm, 'ins> {
  fn new(vm: &'vm mut Vm, pc: u8, ins: &'ins Instruction) -> Self {
    Self { vm, pc, ins }
  }

  fn reg(&self, index: usize) -> Word {
    self.vm.registers.get(index)
  }

  fn set_reg(&mut self, index: usize, value: Word) {
    self.vm.registers.set(index, value);
  }

  fn address(&self, value: Word) -> Result<u8, Fault> {
    u8::try_from(value).map_err(|_| Fault::AddressOutOfRange {
      pc: self.pc,
      address: value,
    })
  }

  // stdin → m[FF]
  fn read_input(&mut self) -> Result<Word, Fault> {
    let word = match (self.vm.io.pop_input(), self.vm.config.input_policy) {
      (Some(word), _) => word,
      (None, InputPolicy::Zero) => 0,
      (None, InputPolicy::Fault) => return Err(Fault::InputExhausted { pc: self.pc }),
    };
    self.vm.memory.set(IO_ADDRESS, word);
    Ok(word)
  }

  // m[FF] → stdout
  fn write_output(&mut self, word: Word) {
    self.vm.memory.set(IO_ADDRESS, word);
    self.vm.io.push_output(word);
  }

  fn run(&mut self) -> Result<Flow, Fault> {
    match self.ins.opcode {
      Opcode::Halt => Ok(Flow::Halt),
      Opcode::Add => alu(self, Word::wrapping_add),
      Opcode::Subtract => alu(self, Word::wrapping_sub),
      Opcode::And => alu(self, |s, t| s & t),
      Opcode::Xor => alu(self, |s, t| s ^ t),
      Opcode::ShiftLeft => alu(self, |s, t| s.checked_shl(t as u32).unwrap_or(0)),
      Opcode::ShiftRight => alu(self, |s, t| s.checked_shr(t as u32).unwrap_or(0)),
      Opcode::LoadAddress => load_address(self),
      Opcode::Load => load(self),
      Opcode::Store => store(self),
      Opcode::LoadIndirect => load_indirect(self),
      Opcode::StoreIndirect => store_indirect(self),
      Opcode::BranchZero => branch(self, |v| v == 0),
      Opcode::BranchPositive => branch(self, |v| v > 0),
      Opcode::JumpRegister => jump_register(self),
      Opcode::JumpAndLink => jump_and_link(self),
    }
  }
}

// r[d] ← r[s] <op> r[t]
fn alu(task: &mut Task<'_, '_>, op: impl Fn(Word, Word) -> Word) -> Result<Flow, Fault> {
  let value = op(task.reg(task.ins.s), task.reg(task.ins.t));
  task.set_reg(task.ins.d, value);
  Ok(Flow::Next)
}

// r[d] ← aa
fn load_address(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  task.set_reg(task.ins.d, task.ins.addr as Word);
  Ok(Flow::Next)
}

// r[d] ← m[aa]
fn load(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let value = if task.ins.addr == IO_ADDRESS {
    task.read_input()?
  } else {
    task.vm.memory.get(task.ins.addr)
  };
  task.set_reg(task.ins.d, value);
  Ok(Flow::Next)
}

// m[aa] ← r[d]
fn store(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let value = task.reg(task.ins.d);
  if task.ins.addr == IO_ADDRESS {
    task.write_output(value);
  } else {
    task.vm.memory.set(task.ins.addr, value);
  }
  Ok(Flow::Next)
}

// r[d] ← m[r[t]]
fn load_indirect(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let address = task.address(task.reg(task.ins.t))?;
  let value = if address == IO_ADDRESS {
    task.read_input()?
  } else {
    task.vm.memory.get(address)
  };
  task.set_reg(task.ins.d, value);
  Ok(Flow::Next)
}

// m[r[t]] ← r[d]
fn store_indirect(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let address = task.address(task.reg(task.ins.t))?;
  let value = task.reg(task.ins.d);
  if address == IO_ADDRESS {
    task.write_output(value);
  } else {
    task.vm.memory.set(address, value);
  }
  Ok(Flow::Next)
}

// if cond(r[d]) : pc ← aa
fn branch(task: &mut Task<'_, '_>, cond: impl Fn(Word) -> bool) -> Result<Flow, Fault> {
  if cond(task.reg(task.ins.d)) {
    Ok(Flow::Jump(task.ins.addr))
  } else {
    Ok(Flow::Next)
  }
}

// pc ← r[d]
fn jump_register(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let target = task.address(task.reg(task.ins.d))?;
  Ok(Flow::Jump(target))
}

// r[d] ← pc + 1 ; pc ← aa
fn jump_and_link(task: &mut Task<'_, '_>) -> Result<Flow, Fault> {
  let link = task.pc as Word + task.ins.size() as Word;
  task.set_reg(task.ins.d, link);
  Ok(Flow::Jump(task.ins.addr))
}

#[cfg(test)]
mod tests {
  use super::*;

  use crate::region::Chunk;

  fn all_zeroed(iter: impl Iterator<Item = Word>) {
    for i in iter {
      assert_eq!(i, 0);
    }
  }

  /// A running machine with `words` placed at 0x10 and the pc pointing there
  fn running(words: Vec<Word>) -> Vm {
    running_with(Config::default(), words)
  }

  fn running_with(config: Config, words: Vec<Word>) -> Vm {
    let mut vm = Vm::with_config(config);
    vm.memory_mut()
      .load_region(&Chunk::new(0x10, words))
      .unwrap();
    vm.set_pc(0x10);
    vm.start();
    vm
  }

  fn reg(vm: &Vm, index: usize) -> Word {
    vm.registers().read(index).unwrap()
  }

  mod vm {
    use super::*;

    #[test]
    fn new() {
      let vm = Vm::new();
      assert_eq!(vm.pc(), 0);
      assert_eq!(vm.state(), State::Idle);
      all_zeroed(vm.registers().iter());
      all_zeroed(vm.memory().iter());
    }

    #[test]
    fn step_when_idle_is_noop() {
      let mut vm = Vm::new();
      vm.memory_mut().write(0, 0x7105).unwrap();
      assert_eq!(vm.step(), None);
      assert_eq!(vm.pc(), 0);
      assert_eq!(reg(&vm, 1), 0);
    }

    #[test]
    fn step_load_address() {
      let mut vm = running(vec![0x7C2A]);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 0xC), 0x2A);
      assert_eq!(vm.pc(), 0x11);
    }

    #[test]
    fn step_arithmetic() {
      let mut vm = running(vec![0x1123, 0x2123, 0x2124, 0x3123, 0x4123, 0x5123, 0x6123]);
      vm.registers_mut().load(&[0, 0, 0x19, 0x08, 0x20]);

      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 33);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 17);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1) as i16, -7);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 8);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 17);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 6400);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 0);
      assert_eq!(vm.pc(), 0x17);
    }

    #[test]
    fn step_add_wraps() {
      let mut vm = running(vec![0x1123]);
      vm.registers_mut().load(&[0, 0, 0xFFFF, 0x0002]);
      vm.step();
      assert_eq!(reg(&vm, 1), 0x0001);
    }

    #[test]
    fn step_wide_shifts_clear() {
      let mut vm = running(vec![0x5123, 0x6423]);
      vm.registers_mut().load(&[0, 0, 0x00FF, 16, 0x1234]);
      vm.step();
      vm.step();
      assert_eq!(reg(&vm, 1), 0);
      assert_eq!(reg(&vm, 4), 0);
    }

    #[test]
    fn step_load_store() {
      let mut vm = running(vec![0x8150, 0x9151]);
      vm.memory_mut().write(0x50, 0xBEEF).unwrap();
      vm.step();
      assert_eq!(reg(&vm, 1), 0xBEEF);
      vm.step();
      assert_eq!(vm.memory().read(0x51).unwrap(), 0xBEEF);
    }

    #[test]
    fn step_indirect() {
      let mut vm = running(vec![0xA102, 0xB103]);
      vm.registers_mut().load(&[0, 0, 0x60, 0x61]);
      vm.memory_mut().write(0x60, 0x4242).unwrap();
      vm.step();
      assert_eq!(reg(&vm, 1), 0x4242);
      vm.step();
      assert_eq!(vm.memory().read(0x61).unwrap(), 0x4242);
    }

    #[test]
    fn step_indirect_out_of_range_faults() {
      let mut vm = running(vec![0xB103]);
      vm.registers_mut().load(&[0, 7, 0, 0x0100]);
      let before = vm.clone();
      let fault = Fault::AddressOutOfRange {
        pc: 0x10,
        address: 0x0100,
      };
      assert_eq!(vm.step(), Some(StepOutcome::Faulted(fault)));
      assert_eq!(vm.state(), State::Faulted(fault));
      assert_eq!(vm.memory(), before.memory());
      assert_eq!(vm.registers(), before.registers());
      assert_eq!(vm.pc(), 0x10);
    }

    #[test]
    fn step_branch_zero() {
      let mut vm = running(vec![0xC130, 0xC230]);
      vm.registers_mut().load(&[0, 1, 0]);
      vm.step();
      assert_eq!(vm.pc(), 0x11); // not taken
      vm.step();
      assert_eq!(vm.pc(), 0x30); // taken
    }

    #[test]
    fn step_branch_positive_compares_unsigned() {
      let mut vm = running(vec![0xD130, 0xD230]);
      vm.registers_mut().load(&[0, 0x0000, 0x8000]);
      vm.step();
      assert_eq!(vm.pc(), 0x11);
      vm.step();
      assert_eq!(vm.pc(), 0x30); // the top bit set is still above zero
    }

    #[test]
    fn step_subroutine_call_and_return() {
      #[rustfmt::skip]
      let mut vm = running(vec![
        0xF514, // 10: jl R[5], 14
        0x0000, // 11: hlt
        0x0000, // 12
        0x0000, // 13
        0x7207, // 14: R[2] ← 7
        0xE500, // 15: jr R[5]
      ]);
      vm.step();
      assert_eq!(vm.pc(), 0x14);
      assert_eq!(reg(&vm, 5), 0x11);
      vm.step();
      vm.step();
      assert_eq!(vm.pc(), 0x11);
      assert_eq!(vm.step(), Some(StepOutcome::Halted));
      assert_eq!(reg(&vm, 2), 7);
    }

    #[test]
    fn step_jump_register_out_of_range() {
      let mut vm = running(vec![0xE100]);
      vm.registers_mut().write(1, 0x0123).unwrap();
      assert!(matches!(
        vm.step(),
        Some(StepOutcome::Faulted(Fault::AddressOutOfRange { .. }))
      ));
      assert_eq!(vm.pc(), 0x10);
    }

    #[test]
    fn register_zero_reads_as_zero() {
      let mut vm = running(vec![0x7005, 0x1102]);
      vm.step();
      assert_eq!(reg(&vm, 0), 0);
      vm.registers_mut().write(0, 9).unwrap();
      vm.step();
      assert_eq!(reg(&vm, 1), 9); // read before the reset
      assert_eq!(reg(&vm, 0), 0);
    }

    #[test]
    fn step_halt() {
      let mut vm = running(vec![0x7101, 0x0000]);
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(vm.step(), Some(StepOutcome::Halted));
      assert_eq!(vm.pc(), 0x11);
      assert_eq!(vm.state(), State::Halted);
      // cant progress
      let before = vm.clone();
      assert_eq!(vm.step(), None);
      assert_eq!(vm, before);
    }

    #[test]
    fn halt_clears_register_zero() {
      let mut vm = running(vec![0x0000]);
      vm.registers_mut().write(0, 0x0042).unwrap();
      assert_eq!(vm.step(), Some(StepOutcome::Halted));
      assert_eq!(reg(&vm, 0), 0);
    }

    #[test]
    fn illegal_opcode_faults() {
      let mut vm = running(vec![0x0ABC]);
      assert_eq!(
        vm.step(),
        Some(StepOutcome::Faulted(Fault::IllegalOpcode {
          pc: 0x10,
          word: 0x0ABC
        }))
      );
      assert!(!vm.is_running());
    }

    #[test]
    fn fetch_from_last_cell_faults() {
      let mut vm = Vm::new();
      vm.set_pc(0xFF);
      vm.start();
      assert_eq!(
        vm.step(),
        Some(StepOutcome::Faulted(Fault::FetchOutOfBounds { pc: 0xFF }))
      );
      assert_eq!(vm.pc(), 0xFF);
    }

    #[test]
    fn stop_pauses_and_start_resumes() {
      let mut vm = running(vec![0x7101, 0x7202, 0x0000]);
      vm.step();
      vm.stop();
      assert_eq!(vm.state(), State::Idle);
      assert_eq!(vm.step(), None);
      vm.start();
      vm.step();
      assert_eq!(reg(&vm, 2), 2);
    }
  }

  mod stdio {
    use super::*;

    #[test]
    fn read_and_write_through_port() {
      let mut vm = running(vec![0x81FF, 0x91FF]);
      vm.io_mut().push_input(0x0042);
      vm.step();
      assert_eq!(reg(&vm, 1), 0x0042);
      assert_eq!(vm.memory().read(0xFF).unwrap(), 0x0042);
      vm.registers_mut().write(1, 0x0043).unwrap();
      vm.step();
      assert_eq!(vm.io().outputs(), &[0x0043]);
      assert_eq!(vm.memory().read(0xFF).unwrap(), 0x0043);
    }

    #[test]
    fn indirect_through_port() {
      let mut vm = running(vec![0xA102, 0xB102]);
      vm.registers_mut().write(2, 0xFF).unwrap();
      vm.io_mut().push_input(5);
      vm.step();
      assert_eq!(reg(&vm, 1), 5);
      vm.step();
      assert_eq!(vm.io().outputs(), &[5]);
    }

    #[test]
    fn exhausted_input_faults_without_committing() {
      let mut vm = running(vec![0x81FF]);
      vm.memory_mut().write(0xFF, 0x7777).unwrap();
      let before = vm.clone();
      assert_eq!(
        vm.step(),
        Some(StepOutcome::Faulted(Fault::InputExhausted { pc: 0x10 }))
      );
      assert_eq!(vm.registers(), before.registers());
      assert_eq!(vm.memory(), before.memory());
      assert_eq!(vm.pc(), 0x10);
    }

    #[test]
    fn exhausted_input_reads_zero_when_configured() {
      let config = Config::default().with_input_policy(InputPolicy::Zero);
      let mut vm = running_with(config, vec![0x81FF, 0x0000]);
      vm.registers_mut().write(1, 9).unwrap();
      assert_eq!(vm.step(), Some(StepOutcome::Continued));
      assert_eq!(reg(&vm, 1), 0);
      assert_eq!(vm.step(), Some(StepOutcome::Halted));
    }
  }

  mod program {
    use super::*;

    fn demo(inputs: &[Word]) -> Vm {
      let mut vm = Vm::new();
      vm.memory_mut().load_region(&Chunk::demo()).unwrap();
      vm.set_pc(0x10);
      for input in inputs {
        vm.io_mut().push_input(*input);
      }
      vm.start();
      vm
    }

    #[test]
    fn demo_multiplies() {
      let mut vm = demo(&[2, 3]);
      let steps = vm.run(1000);
      assert_eq!(vm.state(), State::Halted);
      assert_eq!(vm.io().outputs(), &[6]);
      assert_eq!(vm.pc(), 0x19);
      // 4 setup, 2 loops of 4, final test, write, halt
      assert_eq!(steps, 15);
    }

    #[test]
    fn demo_with_zero() {
      let mut vm = demo(&[0, 25]);
      vm.run(1000);
      assert_eq!(vm.io().outputs(), &[0]);
    }

    #[test]
    fn demo_without_second_input() {
      let mut vm = demo(&[4]);
      vm.run(1000);
      assert_eq!(vm.state(), State::Faulted(Fault::InputExhausted { pc: 0x11 }));
      assert!(vm.io().outputs().is_empty());
    }

    #[test]
    fn run_respects_budget() {
      let mut vm = demo(&[100, 3]);
      assert_eq!(vm.run(5), 5);
      assert!(vm.is_running());
      vm.run(1000);
      assert_eq!(vm.io().outputs(), &[300]);
    }

    #[test]
    fn run_to_budget_uses_config() {
      let mut vm = demo(&[100, 3]);
      vm.config = Config::default().with_max_steps(5);
      assert_eq!(vm.run_to_budget(), 5);
      assert!(vm.is_running());
      vm.config = Config::default();
      vm.run_to_budget();
      assert_eq!(vm.io().outputs(), &[300]);
    }

    #[test]
    fn preview_has_no_side_effects() {
      let vm = demo(&[2, 3]);
      let before = vm.clone();
      let first = vm.preview();
      assert_eq!(first, "10: 8AFF - ld R[A] <- stdin (0002)");
      assert_eq!(vm.preview(), first);
      assert_eq!(vm, before);
    }
  }
}
