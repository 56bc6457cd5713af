use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use toy::listing::Listing;
use toy::region::DEMO_ORIGIN;
use toy::{Config, InputPolicy, Portal, Status, Word};
use tracing_subscriber::EnvFilter;

/// Run a TOY program until it halts
#[derive(Parser)]
#[command(name = "toy", version, about)]
struct Cli {
  /// Program listing, one `AA: WWWW` cell per line (the built-in demo when omitted)
  #[arg(short, long)]
  listing: Option<PathBuf>,

  /// Start address in hex (defaults to the lowest address of the program)
  #[arg(long, value_parser = parse_address)]
  pc: Option<u8>,

  /// Give up after this many instructions
  #[arg(long, default_value_t = Config::DEFAULT_MAX_STEPS)]
  max_steps: usize,

  /// Read 0000 instead of faulting once the input runs out
  #[arg(long)]
  zero_on_empty_input: bool,

  /// Print each instruction before it executes
  #[arg(long)]
  trace: bool,

  /// Input words: decimal (negative allowed) or hex with a 0x prefix
  #[arg(value_parser = parse_word, allow_negative_numbers = true)]
  inputs: Vec<Word>,
}

fn parse_address(s: &str) -> Result<u8, String> {
  u8::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| format!("bad address {s:?}: {e}"))
}

fn parse_word(s: &str) -> Result<Word, String> {
  let parsed = match s.strip_prefix("0x") {
    Some(hex) => Word::from_str_radix(hex, 16).ok(),
    None => s
      .parse::<Word>()
      .ok()
      .or_else(|| s.parse::<i16>().ok().map(|v| v as Word)),
  };
  parsed.ok_or_else(|| format!("bad word {s:?}"))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
    .init();

  let cli = Cli::parse();

  let policy = if cli.zero_on_empty_input {
    InputPolicy::Zero
  } else {
    InputPolicy::Fault
  };
  let config = Config::default()
    .with_input_policy(policy)
    .with_max_steps(cli.max_steps);
  let mut portal = Portal::with_config(config);

  let origin = match &cli.listing {
    Some(path) => {
      let listing = Listing::from_file(path)
        .with_context(|| format!("loading listing {}", path.display()))?;
      let Some(origin) = listing.origin() else {
        bail!("{} holds no memory cells", path.display());
      };
      portal.load_listing(&listing)?;
      origin
    }
    None => {
      portal.load_fixed_program();
      DEMO_ORIGIN
    }
  };
  portal.set_pc(cli.pc.unwrap_or(origin) as usize)?;
  for input in &cli.inputs {
    portal.push_to_input(*input);
  }
  portal.set_program_running()?;

  println!("{}", portal.inputs_as_string());
  let mut steps = 0;
  while portal.get_program_running() && steps < config.max_steps {
    if cli.trace {
      println!("{}", portal.next_instruction_as_string());
    }
    portal.step_program();
    steps += 1;
  }
  println!("{}", portal.outputs_as_string());

  if cli.trace {
    let regs: Vec<String> = portal.vm().registers().iter().map(|r| format!("{r:04X}")).collect();
    println!("pc: {:02X} regs: {}", portal.get_pc(), regs.join(" "));
  }

  match portal.status() {
    Status::Halted => Ok(()),
    Status::Faulted(reason) => bail!("machine faulted: {reason}"),
    _ => bail!("still running after {steps} steps"),
  }
}
