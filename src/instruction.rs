use crate::error::Fault;
use crate::io::IoQueues;
use crate::memory::{Memory, IO_ADDRESS};
use crate::opcode::{Format, Opcode};
use crate::registers::RegisterFile;
use crate::Word;

/// Every instruction occupies a single word
pub const INSTRUCTION_SIZE: usize = 1;

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
  pub opcode: Opcode,
  pub word: Word,
  pub d: usize,
  pub s: usize,
  pub t: usize,
  pub addr: u8,
}

impl Instruction {
  /// Split a word into its fields, `None` for reserved encodings.
  ///
  /// Fields that the opcode's format does not use are zeroed.
  pub fn from_word(word: Word) -> Option<Self> {
    let opcode = Opcode::from((word >> 12) as u8);
    if opcode == Opcode::Halt && word != 0 {
      return None;
    }
    let d = ((word >> 8) & 0xF) as usize;
    let (s, t, addr) = match opcode.format() {
      Format::Address => (0, 0, (word & 0xFF) as u8),
      Format::Register => (((word >> 4) & 0xF) as usize, (word & 0xF) as usize, 0),
    };
    Some(Self {
      opcode,
      word,
      d,
      s,
      t,
      addr,
    })
  }

  /// Fetch and decode the instruction at `pc`.
  ///
  /// The instruction has to end before the stdio port.
  pub fn decode(memory: &Memory, pc: u8) -> Result<Self, Fault> {
    if pc as usize + INSTRUCTION_SIZE > IO_ADDRESS as usize {
      return Err(Fault::FetchOutOfBounds { pc });
    }
    let word = memory.get(pc);
    Self::from_word(word).ok_or(Fault::IllegalOpcode { pc, word })
  }

  /// Number of words the instruction occupies
  pub fn size(&self) -> usize {
    INSTRUCTION_SIZE
  }

  /// Describe what executing this instruction would do, operands resolved
  /// against the given state
  pub fn describe(
    &self,
    pc: u8,
    registers: &RegisterFile,
    memory: &Memory,
    io: &IoQueues,
  ) -> String {
    let (d, s, t, addr) = (self.d, self.s, self.t, self.addr);
    let mn = self.opcode.mnemonic();
    let rd = registers.get(d);
    let rs = registers.get(s);
    let rt = registers.get(t);
    let input = || match io.peek_input() {
      Some(word) => format!("{word:04X}"),
      None => "input empty".to_string(),
    };
    match self.opcode {
      Opcode::Halt => mn.to_string(),
      Opcode::Add
      | Opcode::Subtract
      | Opcode::And
      | Opcode::Xor
      | Opcode::ShiftLeft
      | Opcode::ShiftRight => {
        let sym = match self.opcode {
          Opcode::Add => "+",
          Opcode::Subtract => "-",
          Opcode::And => "&",
          Opcode::Xor => "^",
          Opcode::ShiftLeft => "<<",
          _ => ">>",
        };
        format!("{mn} R[{d:X}] <- R[{s:X}] {sym} R[{t:X}] ({rs:04X} {sym} {rt:04X})")
      }
      Opcode::LoadAddress => format!("{mn} R[{d:X}] <- {:04X}", addr as Word),
      Opcode::Load if addr == IO_ADDRESS => format!("{mn} R[{d:X}] <- stdin ({})", input()),
      Opcode::Load => format!("{mn} R[{d:X}] <- mem[{addr:02X}] ({:04X})", memory.get(addr)),
      Opcode::Store if addr == IO_ADDRESS => format!("{mn} stdout <- R[{d:X}] ({rd:04X})"),
      Opcode::Store => format!("{mn} mem[{addr:02X}] <- R[{d:X}] ({rd:04X})"),
      Opcode::LoadIndirect => match u8::try_from(rt) {
        Ok(IO_ADDRESS) => format!("{mn} R[{d:X}] <- stdin via R[{t:X}] ({})", input()),
        Ok(a) => format!("{mn} R[{d:X}] <- mem[R[{t:X}]={a:02X}] ({:04X})", memory.get(a)),
        Err(_) => format!("{mn} R[{d:X}] <- mem[R[{t:X}]={rt:04X}] (out of range)"),
      },
      Opcode::StoreIndirect => match u8::try_from(rt) {
        Ok(IO_ADDRESS) => format!("{mn} stdout via R[{t:X}] <- R[{d:X}] ({rd:04X})"),
        Ok(a) => format!("{mn} mem[R[{t:X}]={a:02X}] <- R[{d:X}] ({rd:04X})"),
        Err(_) => format!("{mn} mem[R[{t:X}]={rt:04X}] <- R[{d:X}] (out of range)"),
      },
      Opcode::BranchZero => {
        let taken = if rd == 0 { "taken" } else { "not taken" };
        format!("{mn} R[{d:X}]={rd:04X} == 0 -> pc {addr:02X} ({taken})")
      }
      Opcode::BranchPositive => {
        let taken = if rd > 0 { "taken" } else { "not taken" };
        format!("{mn} R[{d:X}]={rd:04X} > 0 -> pc {addr:02X} ({taken})")
      }
      Opcode::JumpRegister => match u8::try_from(rd) {
        Ok(target) => format!("{mn} pc <- R[{d:X}] ({target:02X})"),
        Err(_) => format!("{mn} pc <- R[{d:X}] ({rd:04X} out of range)"),
      },
      Opcode::JumpAndLink => {
        let link = pc as usize + self.size();
        format!("{mn} R[{d:X}] <- {link:02X}, pc <- {addr:02X}")
      }
    }
  }
}

/// Render the instruction at `pc` without touching any state, e.g.
/// `10: 8AFF - ld R[A] <- stdin (0002)`
pub fn preview(
  pc: u8,
  registers: &RegisterFile,
  memory: &Memory,
  io: &IoQueues,
) -> String {
  match Instruction::decode(memory, pc) {
    Ok(ins) => format!(
      "{pc:02X}: {:04X} - {}",
      ins.word,
      ins.describe(pc, registers, memory, io)
    ),
    Err(Fault::IllegalOpcode { word, .. }) => format!("{pc:02X}: {word:04X} - illegal"),
    Err(_) => format!("{pc:02X}: ---- - fetch out of bounds"),
  }
}
