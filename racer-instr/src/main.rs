//! Host-driver binary: reads a textual IR module, runs the instrumentation
//! pass, emits the rewritten IR and the sidecar report.

use std::{
    path::PathBuf,
    process,
    sync::atomic::{AtomicBool, Ordering},
};

use clap::Parser;
use log::{debug, error};
use racer_instr::{pass, Error};

/// Armed only around the critical instrumentation region; an interrupt
/// outside of it is ignored.
static IN_CRITICAL: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "racer-instr")]
#[command(about = "Static instrumentation core of the racer kernel fuzzer")]
#[command(version)]
struct Cli {
    /// Instrumentation mode (`ignore` or `normal`).
    #[arg(long = "racer-mode")]
    mode: String,

    /// Compile-info database (JSON).
    #[arg(long = "racer-input")]
    input: PathBuf,

    /// Sidecar report destination.
    #[arg(long = "racer-output")]
    output: PathBuf,

    /// IR module to instrument.
    module: PathBuf,

    /// Rewritten IR destination; stdout when omitted.
    #[arg(short = 'o', long = "emit")]
    emit: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<(), Error> {
    let mode = pass::Mode::parse(&cli.mode)?;

    let src = std::fs::read_to_string(&cli.module).map_err(|source| Error::Io {
        path: cli.module.clone(),
        source,
    })?;
    let mut module =
        racer_ir::parser::parse_module(&cli.module.to_string_lossy(), &src)?;

    IN_CRITICAL.store(true, Ordering::SeqCst);
    let result = pass::run_pass(&mut module, mode, &cli.input, &cli.output);
    IN_CRITICAL.store(false, Ordering::SeqCst);
    result?;

    match &cli.emit {
        Some(path) => std::fs::write(path, module.to_string()).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?,
        None => print!("{}", module),
    }

    Ok(())
}

fn main() {
    env_logger::init();

    // discarding partial in-memory results on interrupt is safe: the build
    // system re-runs the pass from scratch on retry
    if let Err(err) = ctrlc::set_handler(|| {
        if IN_CRITICAL.load(Ordering::SeqCst) {
            debug!("interrupted during instrumentation");
            process::exit(1);
        }
    }) {
        error!("failed to install interrupt handler: {}", err);
    }

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!("{}", err);
        process::exit(1);
    }
}
