//! Tape VM - CLI Entry Point
//!
//! `tape [OPTIONS] <TAPE_FILE>` checks a tape file against its canonical
//! rendering, optionally repairs it, and runs it.

use std::io::Write;
use std::path::PathBuf;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tape::{load_tape, Engine, Exit, MachineConfig, TapeError, TapeFile};

/// Width of the rule framing the program dump.
const RULE_WIDTH: usize = 64;

#[derive(Parser)]
#[command(name = "tape")]
#[command(version)]
#[command(about = "Run programs on the tape virtual machine")]
struct Cli {
    /// Tape file to run (canonical text dump, or a raw image ending in .bin)
    tape_file: PathBuf,

    /// Run the program even if the file is not well-formed
    #[arg(short, long)]
    force: bool,

    /// Print the well-formed version of the tape file and exit
    #[arg(short, long)]
    repair: bool,

    /// With --repair, rewrite the tape file in place
    #[arg(short, long, requires = "repair")]
    update: bool,

    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Use the 256-cell machine that traps on overflow
    #[arg(long)]
    legacy: bool,

    /// Machine configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the postmortem of a fatal error as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let file = match load_tape(&cli.tape_file, config.capacity) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", cli.tape_file.display(), e);
            std::process::exit(1);
        }
    };
    log::info!("loaded {} ({} cells)", cli.tape_file.display(), file.image.len());

    if cli.repair {
        repair(&cli, &file);
        return;
    }

    if let Err(e) = file.verify() {
        if !cli.force {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        log::warn!("running a tape file that is not well-formed");
    }

    print_dump(&file.image);

    let mut engine = Engine::with_config(config);
    if let Err(e) = engine.load_program(&file.image) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match engine.run(&mut out) {
        Ok(summary) => {
            let _ = out.flush();
            log::info!("{:?} after {} steps", summary.exit, summary.steps);
            if let Exit::FellOff(address) = summary.exit {
                log::info!("control left the tape at {}", address);
            }
        }
        Err(e) => {
            let _ = out.flush();
            report(&e, cli.json);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }
}

/// Config file, then `--legacy`, then `--max-steps`.
fn resolve_config(cli: &Cli) -> Result<MachineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => MachineConfig::load(path)?,
        None => MachineConfig::default(),
    };

    if cli.legacy {
        let legacy = MachineConfig::legacy();
        config.capacity = legacy.capacity;
        config.overflow = legacy.overflow;
    }
    if cli.max_steps.is_some() {
        config.max_steps = cli.max_steps;
    }

    config.validate()?;
    Ok(config)
}

fn repair(cli: &Cli, file: &TapeFile) {
    let is_image = cli.tape_file.extension().is_some_and(|ext| ext == "bin");
    if cli.update && is_image {
        eprintln!("❌ Cannot update a raw image in place: {}", cli.tape_file.display());
        std::process::exit(1);
    }

    let diff = file.diff();
    eprintln!("🔧 Repairing tape file ({} lines differ)", diff.mismatches);

    let mut text = diff.apply(&file.lines).join("\n");
    text.push('\n');
    print!("{}", text);

    if cli.update {
        if let Err(e) = std::fs::write(&cli.tape_file, &text) {
            eprintln!("❌ Failed to write {}: {}", cli.tape_file.display(), e);
            std::process::exit(1);
        }
        eprintln!("✓ Tape file {} updated in place.", cli.tape_file.display());
    }
}

fn print_dump(image: &[u8]) {
    let rule = "-".repeat(RULE_WIDTH);
    eprintln!("{}", rule);
    for line in tape::format_tape(image) {
        eprintln!("{}", line);
    }
    eprintln!("{}", rule);
}

fn report(err: &TapeError, json: bool) {
    eprintln!();
    eprintln!("❌ {}", err);

    if json {
        match serde_json::to_string_pretty(err) {
            Ok(text) => eprintln!("{}", text),
            Err(e) => eprintln!("⚠️  Could not serialize postmortem: {}", e),
        }
        return;
    }

    eprintln!("━━━ History ━━━");
    for entry in &err.history {
        eprintln!("{}", entry);
    }
}
