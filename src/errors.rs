/*!
  Error taxonomy. Loading and execution are each all-or-nothing per failure
  point: nothing here is retried, and normal halts (end of program, cycle
  limit) are values in `crate::engine`, not errors.
*/

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::opcode::Opcode;

/// A lexical failure at a specific line and column, rendered with a caret
/// pointing at the offending character.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseFailure {
  pub line:   usize,
  pub column: usize,
  pub text:   String,
}

impl ParseFailure {
  pub fn new(text: &str, line: usize, column: usize) -> ParseFailure {
    ParseFailure { line, column, text: text.to_string() }
  }
}

impl Display for ParseFailure {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let trailing = self.text.len().saturating_sub(self.column + 1);
    write!(
      f,
      "failed to parse opcode at line {}.\n{}\n{}^{}",
      self.line,
      self.text,
      ".".repeat(self.column),
      ".".repeat(trailing)
    )
  }
}

impl std::error::Error for ParseFailure {}

/// Reasons a `MEM` declaration can be rejected during loading.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AllocationError {
  #[error("a MEM directive requires a label")]
  MissingLabel,
  #[error("allocation length undefined, integer expected")]
  MissingLength,
  #[error("allocation length should be strictly positive, got {0}")]
  NonPositiveLength(i64),
  #[error("content length {given} is larger than the allocated size {declared}")]
  ContentTooLong { declared: usize, given: usize },
  #[error("failed to parse, end of line expected")]
  TrailingInput,
}

/// Failures that abort the whole load; no partial program is executable.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("parse error while loading code.\n{0}")]
  Parse(#[from] ParseFailure),
  #[error("duplicate label '{name}' at lines {first} & {second}")]
  DuplicateLabel { name: String, first: usize, second: usize },
  #[error("MEM error at line {line}: {kind}")]
  Allocation { line: usize, kind: AllocationError },
}

/// Failures that halt a run at the current instruction, leaving registers
/// and memory as last mutated.
#[derive(Debug, Error)]
pub enum ExecError {
  #[error("{0}")]
  Parse(#[from] ParseFailure),
  #[error("MEM error at line {line}: MEM is not an executable instruction")]
  MemNotExecutable { line: usize },
  #[error("{opcode} error at line {line}: no argument expected")]
  UnexpectedArguments { opcode: Opcode, line: usize },
  #[error("{opcode} error at line {line}: parsing failed")]
  BadOperands { opcode: Opcode, line: usize },
  #[error("memory address {address} out of range at line {line}, memory size is {size}")]
  AddressOutOfRange { address: usize, size: usize, line: usize },
  #[error("instruction pointer {ip} out of range, program length is {length}")]
  IpOutOfRange { ip: usize, length: usize },
}

/// Configuration problems: unreadable file or a malformed value for a
/// recognized key. Unrecognized keys are ignored, not errors.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("cannot read configuration file {path}: {source}")]
  Io { path: String, source: std::io::Error },
  #[error("invalid value for {key}: '{value}'")]
  BadValue { key: &'static str, value: String },
  #[error("BITS must be between 1 and 32, got {0}")]
  BadWidth(u32),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_points_at_column() {
    let failure = ParseFailure::new("  BAD R0", 3, 2);
    let rendered = failure.to_string();
    assert_eq!(
      rendered,
      "failed to parse opcode at line 3.\n  BAD R0\n..^....."
    );
  }

  #[test]
  fn caret_at_end_of_line() {
    let failure = ParseFailure::new("JMP", 0, 3);
    assert!(failure.to_string().ends_with("JMP\n...^"));
  }
}
