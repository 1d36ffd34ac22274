/*!

  Run configuration, read from a `KEY = value` file before the machine is
  built. Recognized keys:

    BITS      word width of the machine in bits, 1 through 32
    LOGFILE   path of a file that receives a copy of all log output
    CYCLEMAX  cycle budget for a run, 0 meaning unlimited
    REGS      comma separated list of registers to create at startup

  Unrecognized keys and blank lines are ignored so that one file can be
  shared with other tools.

*/

use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
  pub bits: u32,
  pub logfile: String,
  pub cycle_max: u64,
  pub regs: String,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      bits: 8,
      logfile: String::new(),
      cycle_max: 0,
      regs: String::new(),
    }
  }
}

impl Config {
  pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Config::parse_text(&text)
  }

  /// Parses the `KEY = value` lines of a configuration file. Later lines
  /// override earlier ones.
  pub fn parse_text(text: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for line in text.lines() {
      let (key, value) = match line.split_once('=') {
        Some(pair) => pair,
        None => continue,
      };
      let value = value.trim();

      match key.trim().to_uppercase().as_str() {
        "BITS" => {
          config.bits = value.parse().map_err(|_| ConfigError::BadValue {
            key: "BITS",
            value: value.to_string(),
          })?;
        }
        "CYCLEMAX" => {
          config.cycle_max = value.parse().map_err(|_| ConfigError::BadValue {
            key: "CYCLEMAX",
            value: value.to_string(),
          })?;
        }
        "LOGFILE" => {
          config.logfile = value.to_string();
        }
        "REGS" => {
          config.regs = value.to_string();
        }
        _ => {
          // Keys we do not know about belong to someone else.
        }
      }
    }

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = Config::default();
    assert_eq!(config.bits, 8);
    assert_eq!(config.cycle_max, 0);
    assert!(config.logfile.is_empty());
    assert!(config.regs.is_empty());
  }

  #[test]
  fn parses_known_keys() {
    let text = "BITS = 4\nLOGFILE = run.log\nCYCLEMAX = 100\nREGS = R0, R1, IX\n";
    let config = Config::parse_text(text).unwrap();
    assert_eq!(config.bits, 4);
    assert_eq!(config.logfile, "run.log");
    assert_eq!(config.cycle_max, 100);
    assert_eq!(config.regs, "R0, R1, IX");
  }

  #[test]
  fn ignores_unknown_keys_and_blank_lines() {
    let text = "\nCOLOR = blue\n\nbits=16\n";
    let config = Config::parse_text(text).unwrap();
    assert_eq!(config.bits, 16);
  }

  #[test]
  fn rejects_non_numeric_bits() {
    let error = Config::parse_text("BITS = eight").unwrap_err();
    match error {
      ConfigError::BadValue { key, value } => {
        assert_eq!(key, "BITS");
        assert_eq!(value, "eight");
      }
      other => panic!("unexpected error: {}", other),
    }
  }
}
