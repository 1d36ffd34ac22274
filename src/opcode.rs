/*!
  Opcodes of the softcore instruction set. The mnemonic spelling is the wire
  format of the assembly language: `strum` derives the mnemonic ⇔ variant
  mapping, so the opcode table is checked at compile time rather than kept in
  a runtime dictionary. Argument grammars live with the handlers in
  `crate::engine`.
*/

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
Display, EnumIter, EnumString, IntoStaticStr,
Clone,   Copy,     Eq,         PartialEq,     Debug, Hash
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Opcode {
  // Control codes //
  Noc,    // implicit no-op for empty and label-only lines
  Mem,    // memory declaration pseudo-op, illegal at runtime
  Dsp,    // log a register or memory cell

  // Null operation //
  Nop,    // one cycle delay

  // Transfer //
  Xfr,    // register <- source, or memory cell <- register

  // Arithmetic //
  Adc,    // add with carry
  Shr,    // shift right through carry
  Shl,    // shift left through carry

  // Logic //
  And,
  Ior,
  Eor,

  // Flow //
  Jmp,
  Jnz,
  Jze,
}

impl Opcode {
  /// The textual mnemonic, also used as the trace category for the
  /// per-instruction log events.
  pub fn mnemonic(self) -> &'static str {
    self.into()
  }
}
