/*!

  The machine itself: registers, flags, memory, symbol tables, the loader,
  the operand resolvers, and the fetch-decode-execute loop.

  Loading is a single forward pass that binds labels and performs `MEM`
  allocations; everything else is resolved lazily, by re-parsing each line
  every time the instruction pointer lands on it. A reference operand
  resolves to the number a label stands for (a memory address or a line
  index), never to a cell's content; dereferencing goes through brackets.

*/

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};

use log::{debug, error, info, trace};
use nom::IResult;
use prettytable::{format as TableFormat, Table};

use crate::config::Config;
use crate::errors::{AllocationError, ConfigError, ExecError, LoadError};
use crate::flags::{format_status, Flag};
use crate::lexer::{
  at_end, comma_list, identifier, integer, no_parse, quoted, skip_spaces, Ident,
};
use crate::opcode::Opcode;
use crate::parser::{parse_line, ParsedLine};
use crate::symboltable::SymbolTable;
use crate::word::{Word, WordWidth, LSB};

lazy_static! {
  static ref STATUS: Ident = Ident::from("STATUS");
  static ref R0:     Ident = Ident::from("R0");

  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// How a run ended normally. Abnormal ends are `ExecError`s.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Halt {
  EndOfProgram { cycles: u64 },
  CycleLimit { cycles: u64 },
}

impl Display for Halt {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Halt::EndOfProgram { cycles } => {
        write!(f, "reached end of code after {} cycle(s).", cycles)
      }
      Halt::CycleLimit { cycles } => {
        write!(f, "reached end of cycles after {} cycle(s).", cycles)
      }
    }
  }
}

/// A resolved instruction source operand. The value read and the trace
/// description are produced together by `source_value`; a memory source is
/// bounds-checked there, at read time.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Source {
  Immediate(Word),
  Reference(Word, String),
  Register(Ident),
  Memory(usize, String),
}

pub struct Engine {
  width:     WordWidth,
  cycle_max: u64,

  // Machine state //
  registers: HashMap<Ident, Word>,
  memory:    Vec<Word>,

  // Load products //
  labels:        SymbolTable, // line labels -> line index
  memory_labels: SymbolTable, // memory labels -> base address
  address_mask:  Word,
  program:       Vec<String>,
}

/// Mask truncating register-composed memory addresses: all ones over the
/// smallest bit width that covers the last address. Sizes 0 and 1 need no
/// address bits at all.
fn address_width_mask(size: usize) -> Word {
  let mut width = 0;
  let mut last = size.saturating_sub(1);
  while last > 0 {
    width += 1;
    last >>= 1;
  }
  (LSB << width) - 1
}

/// Common prefix of every trace line: instruction pointer, then cycles.
fn trace_header(ip: usize, cycles: u64) -> String {
  format!(" {:04}  {:06}  ", ip, cycles)
}

impl Engine {

  // region Construction

  pub fn new(config: &Config) -> Result<Engine, ConfigError> {
    let width =
      WordWidth::new(config.bits).ok_or(ConfigError::BadWidth(config.bits))?;

    let mut registers = HashMap::new();
    registers.insert(STATUS.clone(), 0);
    registers.insert(R0.clone(), 0);

    if !config.regs.is_empty() {
      let bad = || ConfigError::BadValue { key: "REGS", value: config.regs.clone() };
      let (rest, names) =
        comma_list(identifier)(config.regs.as_str()).map_err(|_| bad())?;
      if !at_end(rest) {
        return Err(bad());
      }
      for name in names {
        registers.entry(name).or_insert(0);
      }
    }

    Ok(Engine {
      width,
      cycle_max:     config.cycle_max,
      registers,
      memory:        Vec::new(),
      labels:        SymbolTable::new(),
      memory_labels: SymbolTable::new(),
      address_mask:  0,
      program:       Vec::new(),
    })
  }

  // endregion

  // region Flags and registers

  fn status(&self) -> Word {
    self.registers[&*STATUS]
  }

  fn set_register(&mut self, name: &Ident, value: Word) {
    self.registers.insert(name.clone(), value);
  }

  fn flag(&self, flag: Flag) -> bool {
    self.status() & flag.weight() > 0
  }

  fn raise_flag(&mut self, flag: Flag) {
    let status = self.status() | flag.weight();
    self.set_register(&STATUS, status);
  }

  fn lower_flag(&mut self, flag: Flag) {
    let status = self.status() & !flag.weight();
    self.set_register(&STATUS, status);
  }

  fn update_zn(&mut self, result: Word) {
    self.lower_flag(Flag::Z);
    self.lower_flag(Flag::N);
    if result == 0 {
      self.raise_flag(Flag::Z);
    }
    if self.width.sign(result) {
      self.raise_flag(Flag::N);
    }
  }

  fn format_register(&self, name: &Ident) -> String {
    let value = self.registers[name];
    match *name == *STATUS {
      true  => format!("{}:{}", name, format_status(value)),
      false => format!("{}:{}", name, self.width.render(value)),
    }
  }

  // endregion

  // region Loading

  /// First pass over the source: appends the lines to the program, binds
  /// labels, performs `MEM` allocations, then fixes the address mask from
  /// the final memory size. Any failure aborts the whole load.
  pub fn load(&mut self, text: &str) -> Result<(), LoadError> {
    debug!("load code:");

    let start = self.program.len();
    self.program.extend(text.lines().map(String::from));

    for index in start..self.program.len() {
      let line = self.program[index].clone();
      let parsed = parse_line(&line, index)?;

      match parsed.label {
        Some(name) => {
          if let Err(first) = self.labels.bind(name.clone(), index) {
            return Err(LoadError::DuplicateLabel {
              name:   name.to_string(),
              first,
              second: index,
            });
          }
          debug!("     - new label '{}' at line {}", name, index);
          if parsed.opcode == Opcode::Mem {
            self
              .allocate(&name, parsed.args)
              .map_err(|kind| LoadError::Allocation { line: index, kind })?;
          }
        }

        None => {
          if parsed.opcode == Opcode::Mem {
            return Err(LoadError::Allocation {
              line: index,
              kind: AllocationError::MissingLabel,
            });
          }
        }
      }
    }

    self.address_mask = address_width_mask(self.memory.len());

    debug!("summary:");
    debug!(" recorded {} label(s)", self.labels.len());
    debug!(" recorded {} address(es)", self.memory_labels.len());
    debug!(" full memory size is {}", self.memory.len());
    debug!(" address width is {}", self.address_mask.count_ones());
    debug!(" address mask is {}", self.address_mask);

    Ok(())
  }

  /// One `MEM` allocation: a strictly positive cell count, optionally `=`
  /// and explicit content. Short content is right-padded with zeros; every
  /// cell is stored masked. The label binds to the pre-extension length.
  fn allocate(&mut self, label: &Ident, args: &str) -> Result<(), AllocationError> {
    let (rest, count) = integer(args).map_err(|_| AllocationError::MissingLength)?;
    if count < 1 {
      return Err(AllocationError::NonPositiveLength(count));
    }
    let count = count as usize;

    let rest = skip_spaces(rest);
    let (rest, mut content) = match rest.strip_prefix('=') {
      Some(tail) => self.content(skip_spaces(tail), count)?,
      None       => (rest, vec![0; count]),
    };
    if !at_end(rest) {
      return Err(AllocationError::TrailingInput);
    }
    content.resize(count, 0);

    let base = self.memory.len();
    // The line label was bound first, so a duplicate cannot reach here.
    let _ = self.memory_labels.bind(label.clone(), base);

    debug!(" new pointer '{}' at address {}:", label, base);
    debug!(" allocate + {}:", count);
    let cells: Vec<String> = content.iter().map(|v| format!("{:3}", v)).collect();
    debug!("  {}", cells.join(","));

    self.memory.extend(content);
    Ok(())
  }

  /// Explicit allocation content: a quoted string (one cell per character
  /// code) or a comma-separated integer list, either at most `count` long.
  fn content<'a>(
    &self,
    input: &'a str,
    count: usize,
  ) -> Result<(&'a str, Vec<Word>), AllocationError> {
    if let Ok((rest, text)) = quoted(input) {
      let given = text.chars().count();
      if given > count {
        return Err(AllocationError::ContentTooLong { declared: count, given });
      }
      let cells = text.chars().map(|c| self.width.mask(c as Word)).collect();
      return Ok((rest, cells));
    }

    let (rest, values) =
      comma_list(integer)(input).map_err(|_| AllocationError::TrailingInput)?;
    if values.len() > count {
      return Err(AllocationError::ContentTooLong { declared: count, given: values.len() });
    }
    let cells = values.iter().map(|v| self.width.mask_signed(*v)).collect();
    Ok((rest, cells))
  }

  // endregion

  // region Operand resolution

  /// An identifier naming an existing register.
  fn register<'a>(&self, input: &'a str) -> IResult<&'a str, Ident> {
    let (rest, name) = identifier(input)?;
    match self.registers.contains_key(&name) {
      true  => Ok((rest, name)),
      false => no_parse(input),
    }
  }

  /// Base-`CB` positional composition of a register list: the first
  /// register is the least significant digit.
  fn compose_address(&self, names: &[Ident]) -> Word {
    let mut address: Word = 0;
    let mut weight:  Word = LSB;
    for name in names {
      address = address.wrapping_add(self.registers[name].wrapping_mul(weight));
      weight = weight.wrapping_mul(self.width.cb);
    }
    address
  }

  /// Optional `$ <index>` word-selection suffix, spaces allowed before the
  /// `$` but not after it. A negative index is a failure at `input`.
  fn word_select<'a>(
    &self,
    input: &'a str,
    rest: &'a str,
    value: Word,
    message: String,
  ) -> IResult<&'a str, (Word, String)> {
    let tail = match skip_spaces(rest).strip_prefix('$') {
      Some(tail) => tail,
      None       => return Ok((rest, (value, message))),
    };
    let (next, index) = match integer(tail) {
      Ok(ok) => ok,
      Err(_) => return no_parse(input),
    };
    let index = match u32::try_from(index) {
      Ok(index) => index,
      Err(_)    => return no_parse(input),
    };
    let selected = self.width.select(value, index);
    Ok((next, (selected, format!("{} ${}", message, index))))
  }

  /// A label reference. A memory label resolves to its base address and
  /// admits a `+ <offset>` suffix; a plain line label resolves to its line
  /// index. Both admit word selection. The value is the resolved number
  /// itself, never a memory cell's content.
  fn reference<'a>(&self, input: &'a str) -> IResult<&'a str, (Word, String)> {
    let (rest, name) = identifier(input)?;

    if let Some(base) = self.memory_labels.get(&name) {
      let mut value = base as i64;
      let mut message = format!("{}:{}", name, base);
      let mut rest = rest;

      if let Some(tail) = skip_spaces(rest).strip_prefix('+') {
        let (next, offset) = match integer(skip_spaces(tail)) {
          Ok(ok) => ok,
          Err(_) => return no_parse(input),
        };
        value += offset;
        if value < 0 {
          return no_parse(input);
        }
        message = format!("({}+{}):{}", message, offset, value);
        rest = next;
      }

      return self.word_select(input, rest, value as Word, message);
    }

    match self.labels.get(&name) {
      Some(line) => {
        let message = format!("{}:{}", name, line);
        self.word_select(input, rest, line as Word, message)
      }
      None => no_parse(input),
    }
  }

  /// The inside of a bracketed memory address: a register list (composed
  /// and truncated to the address mask), or, in double-access contexts
  /// only, a bare integer (also truncated) or a reference (not truncated).
  fn inner_address<'a>(
    &self,
    input: &'a str,
    double: bool,
  ) -> IResult<&'a str, (Word, String)> {
    if let Ok((rest, names)) = comma_list(|s| self.register(s))(input) {
      let address = self.compose_address(&names) & self.address_mask;
      let parts: Vec<String> = names
        .iter()
        .map(|name| format!("{}:{}", name, self.registers[name]))
        .collect();
      return Ok((rest, (address, parts.join(", "))));
    }
    if !double {
      return no_parse(input);
    }
    if let Ok((rest, value)) = integer(input) {
      let address = (value as Word) & self.address_mask;
      return Ok((rest, (address, format!("{}", value))));
    }
    self.reference(input)
  }

  /// A bracket-delimited memory address.
  fn memory_address<'a>(
    &self,
    input: &'a str,
    double: bool,
  ) -> IResult<&'a str, (usize, String)> {
    let rest = match input.strip_prefix('[') {
      Some(rest) => rest,
      None       => return no_parse(input),
    };
    let (rest, (address, message)) = match self.inner_address(skip_spaces(rest), double) {
      Ok(ok) => ok,
      Err(_) => return no_parse(input),
    };
    match skip_spaces(rest).strip_prefix(']') {
      Some(rest) => Ok((rest, (address as usize, format!("[{}]", message)))),
      None       => no_parse(input),
    }
  }

  /// `<destination register> <source>` with nothing trailing. The source
  /// alternatives are tried in order: immediate (masked), reference,
  /// register, bracketed memory address.
  fn reg_dest_source(&self, args: &str) -> Option<(Ident, Source)> {
    let (rest, dest) = self.register(args).ok()?;
    let rest = skip_spaces(rest);

    if let Ok((next, value)) = integer(rest) {
      return match at_end(next) {
        true  => Some((dest, Source::Immediate(self.width.mask_signed(value)))),
        false => None,
      };
    }
    if let Ok((next, (value, message))) = self.reference(rest) {
      return match at_end(next) {
        true  => Some((dest, Source::Reference(value, message))),
        false => None,
      };
    }
    if let Ok((next, name)) = self.register(rest) {
      return match at_end(next) {
        true  => Some((dest, Source::Register(name))),
        false => None,
      };
    }
    if let Ok((next, (address, message))) = self.memory_address(rest, false) {
      return match at_end(next) {
        true  => Some((dest, Source::Memory(address, message))),
        false => None,
      };
    }
    None
  }

  /// `<bracketed address> <source register>` with nothing trailing.
  fn mem_dest_source(&self, args: &str) -> Option<(usize, String, Ident)> {
    let (rest, (address, message)) = self.memory_address(args, false).ok()?;
    let (rest, source) = self.register(skip_spaces(rest)).ok()?;
    match at_end(rest) {
      true  => Some((address, message, source)),
      false => None,
    }
  }

  /// Reads a resolved source, producing the operand value and its trace
  /// description. Memory reads are bounds-checked here.
  fn source_value(&self, source: &Source, line: usize) -> Result<(Word, String), ExecError> {
    match source {
      Source::Immediate(value) => Ok((*value, format!("{}", value))),

      Source::Reference(value, message) => Ok((*value, message.clone())),

      Source::Register(name) => {
        let value = self.registers[name];
        Ok((value, format!("{}:{}", name, value)))
      }

      Source::Memory(address, message) => match self.memory.get(*address) {
        Some(value) => Ok((*value, format!("{}:{}", message, value))),
        None => Err(ExecError::AddressOutOfRange {
          address: *address,
          size:    self.memory.len(),
          line,
        }),
      },
    }
  }

  // endregion

  // region Instruction execution

  /// Executes one parsed line, yielding the next instruction pointer and
  /// cycle count.
  fn execute(
    &mut self,
    parsed: &ParsedLine<'_>,
    ip: usize,
    cycles: u64,
  ) -> Result<(usize, u64), ExecError> {
    let args = parsed.args;
    match parsed.opcode {
      Opcode::Noc => Ok((ip + 1, cycles)),

      Opcode::Mem => Err(ExecError::MemNotExecutable { line: ip }),

      Opcode::Dsp => self.op_dsp(args, ip, cycles),

      Opcode::Nop => match at_end(args) {
        true => {
          trace!(target: "NOP", "{}NOP", trace_header(ip, cycles));
          Ok((ip + 1, cycles + 1))
        }
        false => Err(ExecError::UnexpectedArguments { opcode: Opcode::Nop, line: ip }),
      },

      Opcode::Xfr => self.op_xfr(args, ip, cycles),
      Opcode::Adc => self.op_adc(args, ip, cycles),

      op @ Opcode::Shr | op @ Opcode::Shl => self.op_shift(op, args, ip, cycles),

      op @ Opcode::And | op @ Opcode::Ior | op @ Opcode::Eor => {
        self.op_logic(op, args, ip, cycles)
      }

      Opcode::Jmp => self.op_jump(Opcode::Jmp, args, ip, cycles, true),
      Opcode::Jnz => self.op_jump(Opcode::Jnz, args, ip, cycles, !self.flag(Flag::Z)),
      Opcode::Jze => self.op_jump(Opcode::Jze, args, ip, cycles, self.flag(Flag::Z)),
    }
  }

  /// `DSP` logs a register or, with double access allowed, a memory cell.
  /// It charges no cycle.
  fn op_dsp(&mut self, args: &str, ip: usize, cycles: u64) -> Result<(usize, u64), ExecError> {
    if let Ok((rest, name)) = self.register(args) {
      if !at_end(rest) {
        return Err(ExecError::BadOperands { opcode: Opcode::Dsp, line: ip });
      }
      info!("{}{}", trace_header(ip, cycles), self.format_register(&name));
      return Ok((ip + 1, cycles));
    }

    if let Ok((rest, (address, message))) = self.memory_address(args, true) {
      if !at_end(rest) {
        return Err(ExecError::BadOperands { opcode: Opcode::Dsp, line: ip });
      }
      let value = self.memory.get(address).copied().ok_or(
        ExecError::AddressOutOfRange { address, size: self.memory.len(), line: ip },
      )?;
      info!("{}{}:{}", trace_header(ip, cycles), message, self.width.render(value));
      return Ok((ip + 1, cycles));
    }

    Err(ExecError::BadOperands { opcode: Opcode::Dsp, line: ip })
  }

  /// `XFR` moves a source into a register, or a register into a memory
  /// cell. Exactly one of the two forms parses.
  fn op_xfr(&mut self, args: &str, ip: usize, cycles: u64) -> Result<(usize, u64), ExecError> {
    if let Some((dest, source)) = self.reg_dest_source(args) {
      let (value, message) = self.source_value(&source, ip)?;
      let value = self.width.mask(value);
      self.set_register(&dest, value);
      trace!(
        target: "XFR",
        "{}{} = {} = {}",
        trace_header(ip, cycles), dest, message, self.width.render(value)
      );
      return Ok((ip + 1, cycles + 1));
    }

    if let Some((address, message, source)) = self.mem_dest_source(args) {
      let value = self.registers[&source];
      if address >= self.memory.len() {
        return Err(ExecError::AddressOutOfRange {
          address,
          size: self.memory.len(),
          line: ip,
        });
      }
      self.memory[address] = value;
      trace!(
        target: "XFR",
        "{}{} = {}:{} = {}",
        trace_header(ip, cycles), message, source, value, self.width.render(value)
      );
      return Ok((ip + 1, cycles + 1));
    }

    Err(ExecError::BadOperands { opcode: Opcode::Xfr, line: ip })
  }

  /// `ADC`: destination + operand + carry. Overflow comes from the sign
  /// bits before masking, carry from bit `W` of the raw sum.
  fn op_adc(&mut self, args: &str, ip: usize, cycles: u64) -> Result<(usize, u64), ExecError> {
    let (dest, source) = self
      .reg_dest_source(args)
      .ok_or(ExecError::BadOperands { opcode: Opcode::Adc, line: ip })?;
    let (y, message) = self.source_value(&source, ip)?;

    let x = self.registers[&dest];
    let carry_in = self.flag(Flag::C) as Word;
    let raw = x.wrapping_add(y).wrapping_add(carry_in);

    let sx = self.width.sign(x);
    let sy = self.width.sign(y);
    let sz = self.width.sign(raw);

    self.lower_flag(Flag::O);
    self.lower_flag(Flag::C);
    if (sx && sy && !sz) || (!sx && !sy && sz) {
      self.raise_flag(Flag::O);
    }
    if raw & self.width.cb > 0 {
      self.raise_flag(Flag::C);
    }

    let z = self.width.mask(raw);
    self.update_zn(z);
    self.set_register(&dest, z);

    trace!(
      target: "ADC",
      "{}{} = {}:{} + {} + C:{} = {}",
      trace_header(ip, cycles), dest, dest, x, message, carry_in, self.width.render(z)
    );
    Ok((ip + 1, cycles + 1))
  }

  /// `SHR` / `SHL`: shift by one through the carry. The old carry enters
  /// the vacated bit, the shifted-out bit becomes the new carry.
  fn op_shift(
    &mut self,
    op: Opcode,
    args: &str,
    ip: usize,
    cycles: u64,
  ) -> Result<(usize, u64), ExecError> {
    let (rest, dest) = self
      .register(args)
      .map_err(|_| ExecError::BadOperands { opcode: op, line: ip })?;
    if !at_end(rest) {
      return Err(ExecError::BadOperands { opcode: op, line: ip });
    }

    let x = self.registers[&dest];
    let carry_in = self.flag(Flag::C);
    self.lower_flag(Flag::C);

    let (mut z, carry_out, inserted, symbol) = match op {
      Opcode::Shr => (x >> 1, x & LSB > 0, self.width.msb, ">>"),
      _           => (self.width.mask(x << 1), self.width.sign(x), LSB, "<<"),
    };
    if carry_in {
      z += inserted;
    }
    if carry_out {
      self.raise_flag(Flag::C);
    }
    self.update_zn(z);
    self.set_register(&dest, z);

    let carry_term = match carry_in {
      true  => inserted,
      false => 0,
    };
    trace!(
      target: op.mnemonic(),
      "{}{} = {} {}:{} + C:{} = {}",
      trace_header(ip, cycles), dest, symbol, dest, x, carry_term, self.width.render(z)
    );
    Ok((ip + 1, cycles + 1))
  }

  /// `AND` / `IOR` / `EOR`: bitwise combination into the destination
  /// register, updating Z and N only.
  fn op_logic(
    &mut self,
    op: Opcode,
    args: &str,
    ip: usize,
    cycles: u64,
  ) -> Result<(usize, u64), ExecError> {
    let (dest, source) = self
      .reg_dest_source(args)
      .ok_or(ExecError::BadOperands { opcode: op, line: ip })?;
    let (y, message) = self.source_value(&source, ip)?;

    let x = self.registers[&dest];
    let (z, symbol) = match op {
      Opcode::And => (x & y, "&"),
      Opcode::Ior => (x | y, "v"),
      _           => (x ^ y, "^"),
    };
    let z = self.width.mask(z);
    self.update_zn(z);
    self.set_register(&dest, z);

    trace!(
      target: op.mnemonic(),
      "{}{} = {}:{} {} {} = {}",
      trace_header(ip, cycles), dest, dest, x, symbol, message, self.width.render(z)
    );
    Ok((ip + 1, cycles + 1))
  }

  /// A jump target: a register list composed positionally (not truncated
  /// to the address mask, which bounds data memory, not the program), or a
  /// line label.
  fn jump_target(&self, args: &str) -> Option<(usize, String)> {
    if let Ok((rest, names)) = comma_list(|s| self.register(s))(args) {
      if !at_end(rest) {
        return None;
      }
      let address = self.compose_address(&names);
      let parts: Vec<String> = names.iter().map(|name| name.to_string()).collect();
      return Some((address as usize, format!("[{}]", parts.join(", "))));
    }

    let (rest, name) = identifier(args).ok()?;
    if !at_end(rest) {
      return None;
    }
    let line = self.labels.get(&name)?;
    Some((line, name.to_string()))
  }

  /// `JMP` / `JNZ` / `JZE`. A non-taken conditional advances but still
  /// charges its cycle.
  fn op_jump(
    &mut self,
    op: Opcode,
    args: &str,
    ip: usize,
    cycles: u64,
    taken: bool,
  ) -> Result<(usize, u64), ExecError> {
    let (target, message) = self
      .jump_target(args)
      .ok_or(ExecError::BadOperands { opcode: op, line: ip })?;

    match taken {
      true => {
        trace!(
          target: op.mnemonic(),
          "{}{} to {}:{}",
          trace_header(ip, cycles), op, message, target
        );
        Ok((target, cycles + 1))
      }
      false => {
        trace!(target: op.mnemonic(), "{}{} continue", trace_header(ip, cycles), op);
        Ok((ip + 1, cycles + 1))
      }
    }
  }

  // endregion

  // region Execution loop

  /// Runs the loaded program from the first line. Each step re-parses the
  /// current line and dispatches on its opcode. An execution error halts
  /// immediately, leaving registers and memory as last mutated.
  pub fn run(&mut self) -> Result<Halt, ExecError> {
    let mut ip: usize = 0;
    let mut cycles: u64 = 0;

    info!("start processing:");
    info!(" line  cycles  instruction");
    info!(" ----  ------  -----------");

    loop {
      if ip >= self.program.len() {
        // Only reachable by jumping past the end or running an empty
        // program; falling off the last line is handled below.
        return match ip == self.program.len() {
          true  => Ok(Halt::EndOfProgram { cycles }),
          false => Err(ExecError::IpOutOfRange { ip, length: self.program.len() }),
        };
      }

      let line = self.program[ip].clone();
      let parsed = parse_line(&line, ip)?;

      let (next_ip, next_cycles) = match self.execute(&parsed, ip, cycles) {
        Ok(next) => next,
        Err(failure) => {
          error!("error while running code at line {}.", ip);
          return Err(failure);
        }
      };

      if next_ip == self.program.len() {
        return Ok(Halt::EndOfProgram { cycles: next_cycles });
      }
      if self.cycle_max > 0 && next_cycles > self.cycle_max {
        return Ok(Halt::CycleLimit { cycles: next_cycles });
      }

      ip = next_ip;
      cycles = next_cycles;
    }
  }

  // endregion
}

impl Display for Engine {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let mut register_table = Table::new();
    register_table.set_format(*TABLE_DISPLAY_FORMAT);
    register_table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    let mut registers: Vec<(String, Word)> = self
      .registers
      .iter()
      .map(|(name, value)| (name.to_string(), *value))
      .collect();
    registers.sort();
    for (name, value) in &registers {
      match name == "STATUS" {
        true => {
          register_table.add_row(row![r->format!("{} =", name), format_status(*value)]);
        }
        false => {
          register_table.add_row(row![r->format!("{} =", name), self.width.render(*value)]);
        }
      }
    }

    let mut memory_table = Table::new();
    memory_table.set_format(*TABLE_DISPLAY_FORMAT);
    memory_table.set_titles(row![ubr->"Address", ubl->"Contents"]);
    for (address, cell) in self.memory.iter().enumerate() {
      match self.memory_labels.name_of(address) {
        Some(label) => {
          memory_table.add_row(
            row![r->format!("{} --> MM[{}] =", label, address), self.width.render(*cell)],
          );
        }
        None => {
          memory_table.add_row(
            row![r->format!("MM[{}] =", address), self.width.render(*cell)],
          );
        }
      }
    }

    let mut combined_table = table!([register_table, memory_table]);
    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "word width: {} bits\n{}", self.width.bits, combined_table)
  }
}
