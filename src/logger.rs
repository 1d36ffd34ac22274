/*!

  Log sink for the machine. Messages go to stdout and, when a log file is
  configured, to that file as well. Records are printed bare, without level
  or timestamp decoration, because most of them are machine state dumps and
  per-instruction traces meant to read like a transcript.

  Per-instruction traces are emitted at `Trace` level with the mnemonic as
  the log target, so individual opcodes can be watched without drowning in
  the rest of the trace stream.

*/

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct EngineLogger {
  level: LevelFilter,
  trace_ops: HashSet<String>,
  file: Option<Mutex<File>>,
}

impl Log for EngineLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= self.level
      || (metadata.level() == Level::Trace && self.trace_ops.contains(metadata.target()))
  }

  fn log(&self, record: &Record) {
    if !self.enabled(record.metadata()) {
      return;
    }
    println!("{}", record.args());
    if let Some(file) = &self.file {
      if let Ok(mut file) = file.lock() {
        // Nothing sensible to do if the log file fills up mid-run.
        let _ = writeln!(file, "{}", record.args());
      }
    }
  }

  fn flush(&self) {
    if let Some(file) = &self.file {
      if let Ok(mut file) = file.lock() {
        let _ = file.flush();
      }
    }
  }
}

/// Installs the global logger. The base level is `Info`, raised to `Debug`
/// by `verbose`; `trace_ops` holds uppercased mnemonics whose traces pass
/// regardless. The log file, if any, is truncated.
pub fn init(verbose: bool, trace_ops: HashSet<String>, logfile: &str) -> io::Result<()> {
  let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

  let file = match logfile.is_empty() {
    true => None,
    false => Some(Mutex::new(File::create(logfile)?)),
  };

  let max = match trace_ops.is_empty() {
    true => level,
    false => LevelFilter::Trace,
  };

  let logger = EngineLogger { level, trace_ops, file };
  log::set_boxed_logger(Box::new(logger)).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
  log::set_max_level(max);
  Ok(())
}
