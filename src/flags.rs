//! The four status flags and their bit weights inside the `STATUS` register.

use num_enum::IntoPrimitive;
use strum_macros::Display as StrumDisplay;

use crate::word::Word;

/// Flag bits packed into `STATUS`. The discriminant is the bit weight.
#[derive(StrumDisplay, IntoPrimitive, Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum Flag {
  /// Negative sign bit.
  N = 0b1000,
  /// Zero bit.
  Z = 0b0100,
  /// Signed overflow bit.
  O = 0b0010,
  /// Carry bit.
  C = 0b0001,
}

/// Order in which flags are rendered in status dumps.
pub const FLAG_ORDER: [Flag; 4] = [Flag::N, Flag::Z, Flag::O, Flag::C];

impl Flag {
  pub fn weight(self) -> Word {
    u8::from(self) as Word
  }
}

/// Renders a `STATUS` value as one letter per raised flag, `.` otherwise,
/// e.g. `N..C`.
pub fn format_status(status: Word) -> String {
  FLAG_ORDER
    .iter()
    .map(|flag| match status & flag.weight() > 0 {
      true  => flag.to_string(),
      false => ".".to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn weights_are_distinct_bits() {
    assert_eq!(Flag::N.weight(), 8);
    assert_eq!(Flag::Z.weight(), 4);
    assert_eq!(Flag::O.weight(), 2);
    assert_eq!(Flag::C.weight(), 1);
  }

  #[test]
  fn status_rendering() {
    assert_eq!(format_status(0b0000), "....");
    assert_eq!(format_status(0b1001), "N..C");
    assert_eq!(format_status(0b1111), "NZOC");
  }
}
