/*!

  Emulator for a small FPGA-style softcore processor: a fixed-width-word
  register machine with flat static memory, programmed in a line-oriented
  assembly language. The `softcore` binary reads a configuration file and a
  source file, loads the program (binding labels and `MEM` allocations),
  and runs it until a halt condition or an error.

*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod config;
mod engine;
mod errors;
mod flags;
mod lexer;
mod logger;
mod opcode;
mod parser;
mod symboltable;
mod word;

use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, info, LevelFilter};

use crate::config::Config;
use crate::engine::Engine;

#[derive(Parser, Debug)]
#[command(version, about = "Assembler/interpreter for a fixed-width-word softcore processor")]
struct Args {
  /// Assembly source file to load and run.
  #[arg(default_value = "./code.machine")]
  source: PathBuf,

  /// Configuration file with KEY = value lines.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Trace every execution of the given mnemonic; repeatable.
  #[arg(long, value_name = "MNEMONIC")]
  trace: Vec<String>,

  /// Log configuration, loading, and machine-state details.
  #[arg(short, long)]
  verbose: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
  let config = match &args.config {
    Some(path) => Config::from_file(path)?,
    None => {
      // The default configuration file is optional.
      let default = Path::new("./softcore.cfg");
      match default.exists() {
        true  => Config::from_file(default)?,
        false => Config::default(),
      }
    }
  };

  let trace_ops: HashSet<String> =
    args.trace.iter().map(|name| name.to_uppercase()).collect();
  logger::init(args.verbose, trace_ops, &config.logfile)?;

  info!("softcore version {}", env!("CARGO_PKG_VERSION"));

  let mut machine = Engine::new(&config)?;
  let source = fs::read_to_string(&args.source)?;
  machine.load(&source)?;
  debug!("{}", machine);

  let halt = machine.run()?;
  info!("\n{}", halt);
  Ok(())
}

fn main() -> ExitCode {
  let args = Args::parse();
  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(failure) => {
      // The logger is not installed yet when configuration fails.
      match log::max_level() == LevelFilter::Off {
        true  => eprintln!("error: {}", failure),
        false => log::error!("{}", failure),
      }
      ExitCode::FAILURE
    }
  }
}
