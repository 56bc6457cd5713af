/// How the twelve operand bits of an instruction word are split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  /// `op d s t`, three register nibbles
  Register,
  /// `op d aa`, a register nibble and an 8-bit address
  Address,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// Stops the machine. Only the all-zero word encodes it.
  ///
  /// | Operation | Semantics/RTL      | Assembly |
  /// |-----------|--------------------|----------|
  /// | Halt      | `(stop execution)` | `hlt`    |
  Halt = 0x0,

  /// | Operation | Semantics/RTL         | Assembly         |
  /// |-----------|-----------------------|------------------|
  /// | Add       | `r[d] ← r[s] + r[t]`  | `add rd, rs, rt` |
  Add = 0x1,

  /// | Operation | Semantics/RTL         | Assembly         |
  /// |-----------|-----------------------|------------------|
  /// | Subtract  | `r[d] ← r[s] − r[t]`  | `sub rd, rs, rt` |
  Subtract = 0x2,

  /// | Operation   | Semantics/RTL         | Assembly         |
  /// |-------------|-----------------------|------------------|
  /// | Logical AND | `r[d] ← r[s] & r[t]`  | `and rd, rs, rt` |
  And = 0x3,

  /// | Operation   | Semantics/RTL         | Assembly         |
  /// |-------------|-----------------------|------------------|
  /// | Logical XOR | `r[d] ← r[s] ^ r[t]`  | `xor rd, rs, rt` |
  Xor = 0x4,

  /// Shifting by 16 or more clears the destination.
  ///
  /// | Operation  | Semantics/RTL          | Assembly         |
  /// |------------|------------------------|------------------|
  /// | Shift Left | `r[d] ← r[s] << r[t]`  | `shl rd, rs, rt` |
  ShiftLeft = 0x5,

  /// Logical shift, shifting by 16 or more clears the destination.
  ///
  /// | Operation   | Semantics/RTL          | Assembly         |
  /// |-------------|------------------------|------------------|
  /// | Shift Right | `r[d] ← r[s] >> r[t]`  | `shr rd, rs, rt` |
  ShiftRight = 0x6,

  /// | Operation    | Semantics/RTL | Assembly      |
  /// |--------------|---------------|---------------|
  /// | Load Address | `r[d] ← aa`   | `lda rd, $aa` |
  LoadAddress = 0x7,

  /// Loading from `FF` consumes the next input word.
  ///
  /// | Operation | Semantics/RTL  | Assembly     |
  /// |-----------|----------------|--------------|
  /// | Load      | `r[d] ← m[aa]` | `ld rd, aa`  |
  Load = 0x8,

  /// Storing to `FF` appends to the output.
  ///
  /// | Operation | Semantics/RTL  | Assembly     |
  /// |-----------|----------------|--------------|
  /// | Store     | `m[aa] ← r[d]` | `st rd, aa`  |
  Store = 0x9,

  /// | Operation     | Semantics/RTL     | Assembly         |
  /// |---------------|-------------------|------------------|
  /// | Load Indirect | `r[d] ← m[r[t]]`  | `ldi rd, (rt)`   |
  LoadIndirect = 0xA,

  /// | Operation      | Semantics/RTL     | Assembly         |
  /// |----------------|-------------------|------------------|
  /// | Store Indirect | `m[r[t]] ← r[d]`  | `sti rd, (rt)`   |
  StoreIndirect = 0xB,

  /// | Operation   | Semantics/RTL              | Assembly     |
  /// |-------------|----------------------------|--------------|
  /// | Branch Zero | `if r[d] == 0 : pc ← aa`   | `bz rd, aa`  |
  BranchZero = 0xC,

  /// The comparison is unsigned, so any non-zero word branches.
  ///
  /// | Operation       | Semantics/RTL            | Assembly     |
  /// |-----------------|--------------------------|--------------|
  /// | Branch Positive | `if r[d] > 0 : pc ← aa`  | `bp rd, aa`  |
  BranchPositive = 0xD,

  /// | Operation     | Semantics/RTL | Assembly |
  /// |---------------|---------------|----------|
  /// | Jump Register | `pc ← r[d]`   | `jr rd`  |
  JumpRegister = 0xE,

  /// | Operation     | Semantics/RTL                | Assembly     |
  /// |---------------|------------------------------|--------------|
  /// | Jump and Link | `r[d] ← pc + 1 ; pc ← aa`    | `jl rd, aa`  |
  JumpAndLink = 0xF,
}

impl Opcode {
  pub fn format(self) -> Format {
    match self {
      Self::LoadAddress
      | Self::Load
      | Self::Store
      | Self::BranchZero
      | Self::BranchPositive
      | Self::JumpAndLink => Format::Address,
      _ => Format::Register,
    }
  }

  pub fn mnemonic(self) -> &'static str {
    match self {
      Self::Halt => "hlt",
      Self::Add => "add",
      Self::Subtract => "sub",
      Self::And => "and",
      Self::Xor => "xor",
      Self::ShiftLeft => "shl",
      Self::ShiftRight => "shr",
      Self::LoadAddress => "lda",
      Self::Load => "ld",
      Self::Store => "st",
      Self::LoadIndirect => "ldi",
      Self::StoreIndirect => "sti",
      Self::BranchZero => "bz",
      Self::BranchPositive => "bp",
      Self::JumpRegister => "jr",
      Self::JumpAndLink => "jl",
    }
  }
}

impl From<u8> for Opcode {
  fn from(maybe_nibble: u8) -> Self {
    match maybe_nibble & 0x0F {
      0x0 => Self::Halt,
      0x1 => Self::Add,
      0x2 => Self::Subtract,
      0x3 => Self::And,
      0x4 => Self::Xor,
      0x5 => Self::ShiftLeft,
      0x6 => Self::ShiftRight,
      0x7 => Self::LoadAddress,
      0x8 => Self::Load,
      0x9 => Self::Store,
      0xA => Self::LoadIndirect,
      0xB => Self::StoreIndirect,
      0xC => Self::BranchZero,
      0xD => Self::BranchPositive,
      0xE => Self::JumpRegister,
      _ => Self::JumpAndLink,
    }
  }
}
