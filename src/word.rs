//! Fixed-width word arithmetic. The word width `W` is a runtime configuration
//! value; every register and memory cell holds a `Word` already masked to it.

/// Machine values are stored in the low `W` bits of a `u64`.
pub type Word = u64;

/// Weight of the lowest bit, the carry-in position for `SHL`.
pub const LSB: Word = 1;

/// The constants derived from the configured bit width: `CB = 2^W` is the
/// modulus, `MSK = CB - 1` the value mask, and `MSB = CB / 2` the sign bit.
/// Fixed at engine construction and never changed afterwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WordWidth {
  pub bits: u32,
  pub cb:   Word,
  pub msk:  Word,
  pub msb:  Word,
}

impl WordWidth {
  /// Widths outside 1..=32 are rejected; 32 keeps the `ADC` sum well inside
  /// `u64` range.
  pub fn new(bits: u32) -> Option<WordWidth> {
    match bits {
      1..=32 => {
        let cb = (LSB << bits) as Word;
        Some(WordWidth { bits, cb, msk: cb - 1, msb: cb >> 1 })
      }
      _ => None,
    }
  }

  /// Coerces a value to the word width.
  pub fn mask(&self, value: Word) -> Word {
    value & self.msk
  }

  /// Coerces a signed value to the word width, wrapping negatives in two's
  /// complement exactly like the hardware would.
  pub fn mask_signed(&self, value: i64) -> Word {
    (value as Word) & self.msk
  }

  /// Whether the sign bit of a (masked) value is set.
  pub fn sign(&self, value: Word) -> bool {
    value & self.msb > 0
  }

  /// The signed reading of a masked value.
  pub fn signed(&self, value: Word) -> i64 {
    match self.sign(value) {
      true  => value as i64 - self.cb as i64,
      false => value as i64,
    }
  }

  /// Extracts the `index`-th `W`-bit slice of a wider resolved value, the `$`
  /// word-selector.
  pub fn select(&self, value: Word, index: u32) -> Word {
    let shift = index.saturating_mul(self.bits);
    match shift >= Word::BITS {
      true  => 0,
      false => (value >> shift) & self.msk,
    }
  }

  /// Renders a value as `unsigned:signed`, the format used by every trace
  /// line that shows a register or memory cell.
  pub fn render(&self, value: Word) -> String {
    format!("{}:{}", value, self.signed(value))
  }
}
