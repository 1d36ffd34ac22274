/*!
  The line parser: splits one raw source line into an optional label, an
  opcode, and the unparsed argument tail. Opcode-specific argument parsing is
  deferred to load/execution time; only the label and the mnemonic are
  validated here.
*/

use std::str::FromStr;

use crate::errors::ParseFailure;
use crate::lexer::{identifier, label, skip_spaces, Ident};
use crate::opcode::Opcode;

/// One parsed statement. `args` borrows the tail of the source line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedLine<'a> {
  pub label:  Option<Ident>,
  pub opcode: Opcode,
  pub args:   &'a str,
}

impl<'a> ParsedLine<'a> {
  fn noc(label: Option<Ident>) -> ParsedLine<'a> {
    ParsedLine { label, opcode: Opcode::Noc, args: "" }
  }
}

/// Splits a line into `(label, opcode, argument tail)`. Empty and
/// comment-only lines are implicit `NOC`s, as are label-only lines (the
/// label still binds). An unknown or unparsable opcode is a structured
/// failure pointing at the offending column.
pub fn parse_line(line: &str, index: usize) -> Result<ParsedLine<'_>, ParseFailure> {
  let rest = skip_spaces(line);
  if rest.is_empty() {
    return Ok(ParsedLine::noc(None));
  }

  let (rest, found_label) = match label(rest) {
    Ok((after, name)) => (after, Some(name)),
    Err(_) => (rest, None),
  };

  let rest = skip_spaces(rest);
  if rest.is_empty() {
    return Ok(ParsedLine::noc(found_label));
  }

  // Column of the opcode, for the caret diagnostic.
  let column = line.len() - rest.len();
  let (after, name) =
    identifier(rest).map_err(|_| ParseFailure::new(line, index, column))?;
  let opcode =
    Opcode::from_str(&name).map_err(|_| ParseFailure::new(line, index, column))?;
  Ok(ParsedLine { label: found_label, opcode, args: skip_spaces(after) })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_and_comment_lines_are_noc() {
    assert_eq!(parse_line("", 0), Ok(ParsedLine::noc(None)));
    assert_eq!(parse_line("   ", 0), Ok(ParsedLine::noc(None)));
    assert_eq!(parse_line("  # only a comment", 0), Ok(ParsedLine::noc(None)));
  }

  #[test]
  fn label_only_line_carries_the_label() {
    let parsed = parse_line("loop:", 4).unwrap();
    assert_eq!(parsed.label, Some(Ident::from("LOOP")));
    assert_eq!(parsed.opcode, Opcode::Noc);
    assert_eq!(parsed.args, "");
  }

  #[test]
  fn label_opcode_and_args() {
    let parsed = parse_line("start: XFR R0 5 # init", 0).unwrap();
    assert_eq!(parsed.label, Some(Ident::from("START")));
    assert_eq!(parsed.opcode, Opcode::Xfr);
    assert_eq!(parsed.args, "R0 5 # init");
  }

  #[test]
  fn opcode_without_label() {
    let parsed = parse_line("  adc r0 2", 7).unwrap();
    assert_eq!(parsed.label, None);
    assert_eq!(parsed.opcode, Opcode::Adc);
    assert_eq!(parsed.args, "r0 2");
  }

  #[test]
  fn unknown_opcode_is_a_failure_with_column() {
    let failure = parse_line("  FROB R0", 12).unwrap_err();
    assert_eq!(failure.line, 12);
    assert_eq!(failure.column, 2);
    assert!(failure.to_string().contains("line 12"));
  }

  #[test]
  fn unparsable_opcode_is_a_failure() {
    let failure = parse_line("loop: 123", 3).unwrap_err();
    assert_eq!(failure.column, 6);
  }
}
