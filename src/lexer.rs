/*!
  Cursor-based lexical primitives for the assembly grammar. Every recognizer
  follows one contract, expressed through `nom`'s `IResult`: success hands
  back the remaining input and the parsed value; failure leaves the caller's
  input untouched, so unlimited lookahead is just retry. No exceptions, no
  separate tokenizer pass.
*/

use nom::{
  bytes::complete::{take_while, take_while1},
  character::complete::{char as one_char, one_of, satisfy},
  combinator::{opt, recognize},
  error::{Error, ErrorKind},
  sequence::{delimited, pair, terminated},
  IResult,
};
use string_cache::DefaultAtom;

use crate::word::Word;

/// Interned, case-normalized identifier. Register names, line labels, and
/// memory labels all share this type.
pub type Ident = DefaultAtom;

/// A failure at the caller's own position, for recognizers with side
/// conditions (table lookups, range checks) on top of the raw grammar.
pub fn no_parse<T>(input: &str) -> IResult<&str, T> {
  Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)))
}

/// Skips spaces and tabs. A `#` starts a comment, which terminates the line:
/// everything after it is skipped.
pub fn skip_spaces(input: &str) -> &str {
  let rest = input.trim_start_matches(|c| c == ' ' || c == '\t');
  match rest.starts_with('#') {
    true  => "",
    false => rest,
  }
}

/// Skip spaces and comments, then test for the end of the line.
pub fn at_end(input: &str) -> bool {
  skip_spaces(input).is_empty()
}

/// Unsigned integer in the given base (2, 8, 10, or 16), case-insensitive
/// digits, at least one digit. Consumes up to the first non-digit.
pub fn unsigned(base: u32) -> impl Fn(&str) -> IResult<&str, Word> {
  move |input| {
    let (rest, digits) = take_while1(|c: char| c.is_digit(base))(input)?;
    let value = digits.chars().fold(0 as Word, |accum, c| {
      accum
        .wrapping_mul(base as Word)
        .wrapping_add(c.to_digit(base).unwrap_or(0) as Word)
    });
    Ok((rest, value))
  }
}

/// Optional sign symbol; yields `true` for `-`.
pub fn sign(input: &str) -> IResult<&str, bool> {
  let (rest, symbol) = opt(one_of("+-"))(input)?;
  Ok((rest, symbol == Some('-')))
}

/// Signed integer with an optional case-insensitive base prefix: `0B`, `0O`,
/// `0D`, or `0X` select base 2, 8, 10, or 16; the default base is 10. The
/// sign precedes the prefix.
pub fn integer(input: &str) -> IResult<&str, i64> {
  let (rest, negative) = sign(input)?;
  let (rest, base) = base_prefix(rest);
  let (rest, value) = unsigned(base)(rest)?;
  Ok((rest, apply_sign(value, negative)))
}

fn apply_sign(value: Word, negative: bool) -> i64 {
  match negative {
    true  => (value as i64).wrapping_neg(),
    false => value as i64,
  }
}

// Never fails: without a recognized two-character prefix the base is 10 and
// nothing is consumed.
fn base_prefix(input: &str) -> (&str, u32) {
  let mut chars = input.chars();
  if let (Some('0'), Some(tag)) = (chars.next(), chars.next()) {
    let base = match tag.to_ascii_uppercase() {
      'B' => 2,
      'O' => 8,
      'D' => 10,
      'X' => 16,
      _   => return (input, 10),
    };
    return (&input[2..], base);
  }
  (input, 10)
}

/// Identifier: a letter or underscore, then letters, digits, and
/// underscores. The result is case-normalized to uppercase and interned.
pub fn identifier(input: &str) -> IResult<&str, Ident> {
  let (rest, name) = recognize(pair(
    satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
    take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
  ))(input)?;
  Ok((rest, Ident::from(name.to_ascii_uppercase().as_str())))
}

/// Label: an identifier immediately followed by `:`, no space in between.
pub fn label(input: &str) -> IResult<&str, Ident> {
  terminated(identifier, one_char(':'))(input)
}

/// Quoted string on a single line, no escape sequences. Fails without a
/// closing quote.
pub fn quoted(input: &str) -> IResult<&str, &str> {
  delimited(
    one_char('"'),
    take_while(|c| c != '"' && c != '\n'),
    one_char('"'),
  )(input)
}

/// Comma-separated list of whatever `element` recognizes, spaces allowed
/// around the commas. Strict: once a comma is consumed the next element is
/// mandatory, and its failure fails the whole list at the original position.
pub fn comma_list<'a, T, F>(mut element: F) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<T>>
where
  F: FnMut(&'a str) -> IResult<&'a str, T>,
{
  move |input| {
    let (mut rest, first) = element(input)?;
    let mut items = vec![first];
    loop {
      match skip_spaces(rest).strip_prefix(',') {
        None => break,
        Some(tail) => match element(skip_spaces(tail)) {
          Ok((next, item)) => {
            items.push(item);
            rest = next;
          }
          Err(_) => {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::SeparatedList)));
          }
        },
      }
    }
    Ok((rest, items))
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn spaces_and_comments() {
    assert_eq!(skip_spaces("  \t x"), "x");
    assert_eq!(skip_spaces("x"), "x");
    assert_eq!(skip_spaces("   # a comment"), "");
    assert!(at_end("   # trailing words"));
    assert!(at_end(""));
    assert!(!at_end("  x"));
  }

  #[test]
  fn unsigned_by_base() {
    assert_eq!(unsigned(10)("42 rest"), Ok((" rest", 42)));
    assert_eq!(unsigned(2)("1011"), Ok(("", 11)));
    assert_eq!(unsigned(8)("17"), Ok(("", 15)));
    assert_eq!(unsigned(16)("fF"), Ok(("", 255)));
    // Stops at the first non-digit of the base.
    assert_eq!(unsigned(2)("102"), Ok(("2", 2)));
    assert!(unsigned(10)("x").is_err());
    assert!(unsigned(10)("").is_err());
  }

  #[test]
  fn signed_integers() {
    assert_eq!(integer("-5"), Ok(("", -5)));
    assert_eq!(integer("+5"), Ok(("", 5)));
    assert_eq!(integer("5"), Ok(("", 5)));
    // No space allowed between sign and digits.
    assert!(integer("- 5").is_err());
  }

  #[test]
  fn integer_base_prefixes() {
    assert_eq!(integer("0x1F"), Ok(("", 31)));
    assert_eq!(integer("0XFF"), Ok(("", 255)));
    assert_eq!(integer("0b101"), Ok(("", 5)));
    assert_eq!(integer("0o17"), Ok(("", 15)));
    assert_eq!(integer("0d12"), Ok(("", 12)));
    assert_eq!(integer("-0x10"), Ok(("", -16)));
    assert_eq!(integer("12"), Ok(("", 12)));
    assert_eq!(integer("0"), Ok(("", 0)));
    // A prefix with no digits fails outright.
    assert!(integer("0x").is_err());
    assert!(integer("zz").is_err());
  }

  #[test]
  fn identifiers_normalize_case() {
    assert_eq!(identifier("r0 x"), Ok((" x", Ident::from("R0"))));
    assert_eq!(identifier("_tmp1"), Ok(("", Ident::from("_TMP1"))));
    assert_eq!(identifier("Loop:"), Ok((":", Ident::from("LOOP"))));
    assert!(identifier("0ab").is_err());
  }

  #[test]
  fn labels_need_adjacent_colon() {
    assert_eq!(label("start: NOP"), Ok((" NOP", Ident::from("START"))));
    assert!(label("start : NOP").is_err());
    assert!(label("start").is_err());
  }

  #[test]
  fn quoted_strings() {
    assert_eq!(quoted("\"AB\" rest"), Ok((" rest", "AB")));
    assert_eq!(quoted("\"\""), Ok(("", "")));
    assert!(quoted("\"open").is_err());
    assert!(quoted("bare").is_err());
  }

  #[test]
  fn comma_lists_are_strict() {
    assert_eq!(comma_list(integer)("1, 2 ,3"), Ok(("", vec![1, 2, 3])));
    assert_eq!(comma_list(integer)("7 next"), Ok((" next", vec![7])));
    // An element failure after a comma fails the whole list.
    assert!(comma_list(integer)("1, 2, x").is_err());
    assert!(comma_list(integer)("x").is_err());
  }

  #[test]
  fn identifier_lists() {
    let (rest, names) = comma_list(identifier)("r1, r2, r3").unwrap();
    assert_eq!(rest, "");
    assert_eq!(names, vec![Ident::from("R1"), Ident::from("R2"), Ident::from("R3")]);
  }

  proptest! {
    #[test]
    fn rendered_literals_round_trip(value in 0u64..=0xFFFF_FFFF) {
      let decimal = format!("{}", value);
      prop_assert_eq!(integer(&decimal), Ok(("", value as i64)));
      let hex = format!("0x{:X}", value);
      prop_assert_eq!(integer(&hex), Ok(("", value as i64)));
      let octal = format!("0o{:o}", value);
      prop_assert_eq!(integer(&octal), Ok(("", value as i64)));
      let binary = format!("0b{:b}", value);
      prop_assert_eq!(integer(&binary), Ok(("", value as i64)));
      let prefixed_decimal = format!("0d{}", value);
      prop_assert_eq!(integer(&prefixed_decimal), Ok(("", value as i64)));
      let negative = format!("-{}", value);
      prop_assert_eq!(integer(&negative), Ok(("", -(value as i64))));
    }

    #[test]
    fn parsing_stops_at_first_non_digit(value in 0u64..=0xFFFF, tail in "[ +g#\\]][a-z ]*") {
      let text = format!("{}{}", value, tail);
      let (rest, parsed) = integer(&text).unwrap();
      prop_assert_eq!(parsed, value as i64);
      prop_assert_eq!(rest, tail.as_str());
    }
  }
}
