//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu <program>` - Run a `.ls8` (or `.asm`) file
//! - `ls8-emu run <program>` - Run with tracing / limits / state dump
//! - `ls8-emu debug <program>` - Interactive debugger
//! - `ls8-emu asm <source>` - Assemble to `.ls8`
//! - `ls8-emu disasm <program>` - Disassemble a `.ls8` file

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version)]
#[command(about = "An emulator for the LS-8 8-bit computer")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Program to run (`.ls8`, or `.asm` to assemble first)
    program: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the `.ls8` or `.asm` file to execute
        program: PathBuf,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print a trace line to stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the `.ls8` or `.asm` file to debug
        program: PathBuf,
    },
    /// Assemble source to a `.ls8` file
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output `.ls8` file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a program to readable text
    Disasm {
        /// Path to the `.ls8` or `.asm` file
        program: PathBuf,
    },
}

/// Options for a single run.
#[derive(Default)]
struct RunOptions {
    max_cycles: Option<u64>,
    trace: bool,
    dump_state: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match (cli.command, cli.program) {
        (Some(Commands::Run { program, max_cycles, trace, dump_state }), _) => {
            run_program(&program, RunOptions { max_cycles, trace, dump_state });
        }
        #[cfg(feature = "tui")]
        (Some(Commands::Debug { program }), _) => {
            debug_program(&program);
        }
        (Some(Commands::Asm { source, output }), _) => {
            assemble_file(&source, output);
        }
        (Some(Commands::Disasm { program }), _) => {
            disassemble_file(&program);
        }
        (None, Some(program)) => {
            run_program(&program, RunOptions::default());
        }
        (None, None) => {
            Cli::command()
                .error(ErrorKind::MissingRequiredArgument, "no program specified")
                .exit();
        }
    }
}

/// Load a program image, assembling `.asm` sources first.
fn load_image(path: &Path) -> Vec<u8> {
    use ls8::{assemble, load_program_file};

    if path.extension().is_some_and(|ext| ext == "asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: failed to read {}: {}", path.display(), e);
                process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(bytes) => {
                info!("assembled {} bytes from {}", bytes.len(), path.display());
                bytes
            }
            Err(e) => {
                eprintln!("error: assembly failed: {}", e);
                process::exit(1);
            }
        }
    } else {
        match load_program_file(path) {
            Ok(program) => {
                if program.is_empty() {
                    warn!("{} contains no instructions", path.display());
                }
                program.bytes
            }
            Err(e) => {
                eprintln!("error: failed to load {}: {}", path.display(), e);
                process::exit(1);
            }
        }
    }
}

fn run_program(path: &Path, options: RunOptions) {
    use ls8::Cpu;

    let image = load_image(path);

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&image) {
        eprintln!("error: failed to load program: {}", e);
        process::exit(1);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut executed = 0u64;

    while cpu.is_running() {
        if options.max_cycles.is_some_and(|max| executed >= max) {
            eprintln!(
                "warning: reached max cycles limit ({}) without halting",
                executed
            );
            break;
        }

        if options.trace {
            eprintln!("{}", cpu.trace_line());
        }

        if let Err(e) = cpu.step(&mut out) {
            let _ = out.flush();
            eprintln!("error: CPU fault: {}", e);
            process::exit(1);
        }
        executed += 1;
    }

    if let Err(e) = out.flush() {
        eprintln!("error: failed to write output: {}", e);
        process::exit(1);
    }

    info!("{:?} after {} instructions", cpu.state, cpu.cycles);

    if options.dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to serialize state: {}", e);
                process::exit(1);
            }
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &Path) {
    use ls8::run_debugger;

    let image = load_image(path);

    if let Err(e) = run_debugger(image) {
        eprintln!("error: debugger failed: {}", e);
        process::exit(1);
    }
}

fn assemble_file(source_path: &Path, output: Option<PathBuf>) {
    use ls8::{assemble, save_program};

    let out_path = output.unwrap_or_else(|| source_path.with_extension("ls8"));

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", source_path.display(), e);
            process::exit(1);
        }
    };

    let bytes = match assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: assembly failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = save_program(&out_path, &bytes) {
        eprintln!("error: failed to save {}: {}", out_path.display(), e);
        process::exit(1);
    }

    println!("Assembled {} bytes → {}", bytes.len(), out_path.display());
}

fn disassemble_file(path: &Path) {
    use ls8::disassemble;

    let image = load_image(path);
    print!("{}", disassemble(&image));
}
