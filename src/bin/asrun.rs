//! CLI tool for running raw action bytecode with asrun
//!
//! Usage: asrun [options] <actions.bin>
//!
//! Options:
//!   --version <n>      Format version of the bytecode (default: 7)
//!   --config <file>    JSON guard configuration (see `GuardConfig`)
//!   --trace            Trace every executed action (needs RUST_LOG=asrun=trace)
//!
//! The file holds one action block, executed with a fresh root movie clip
//! as its scope. `trace()` output goes to stdout.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use asrun::{
    ActionBlock, DisplayClip, ExecutionContext, GuardConfig, Interpreter, LogTracer, MovieHost,
    ObjectRef,
};
use tracing_subscriber::{EnvFilter, fmt};

type CliError = Box<dyn std::error::Error>;

/// Host that prints trace output and ignores everything else
struct ConsoleHost;

impl MovieHost for ConsoleHost {
    fn trace(&self, message: &str) {
        println!("{}", message);
    }
}

/// CLI configuration
struct Config {
    path: PathBuf,
    version: u8,
    guards: GuardConfig,
    trace: bool,
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asrun=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_args() -> Result<Config, String> {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map_or("asrun", |s| s.as_str());

    let mut version = 7u8;
    let mut guards = GuardConfig::default();
    let mut trace = false;
    let mut path_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        let Some(arg) = args.get(i) else {
            break;
        };
        if arg == "--version" {
            i += 1;
            version = args
                .get(i)
                .ok_or_else(|| "--version requires a value".to_string())?
                .parse::<u8>()
                .map_err(|_| "--version must be an integer between 0 and 255".to_string())?;
        } else if arg == "--config" {
            i += 1;
            let config_path = args
                .get(i)
                .ok_or_else(|| "--config requires a file".to_string())?;
            let json = fs::read_to_string(config_path)
                .map_err(|e| format!("Cannot read {}: {}", config_path, e))?;
            guards = GuardConfig::from_json(&json)
                .map_err(|e| format!("Invalid guard configuration: {}", e))?;
        } else if arg == "--trace" {
            trace = true;
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option: {}", arg));
        } else {
            path_arg = Some(arg);
        }
        i += 1;
    }

    let path_arg = path_arg.ok_or_else(|| {
        format!(
            "Usage: {} [--version <n>] [--config <file>] [--trace] <actions.bin>",
            program_name
        )
    })?;

    Ok(Config {
        path: PathBuf::from(path_arg),
        version,
        guards,
        trace,
    })
}

fn run() -> Result<(), CliError> {
    let config = parse_args().map_err(boxed)?;
    let bytes = fs::read(&config.path)
        .map_err(|e| boxed(format!("Cannot read {}: {}", config.path.display(), e)))?;

    let ctx = ExecutionContext::new(config.version, Rc::new(ConsoleHost), config.guards);
    let root: ObjectRef = DisplayClip::new_root(0, Some(ctx.prototypes().object.clone()));
    ctx.set_root(root.clone());

    let mut interp = Interpreter::new();
    if config.trace {
        interp = interp.with_tracer(Box::new(LogTracer::new()));
    }

    interp
        .execute_actions(&ctx, ActionBlock::new(bytes), root.clone())
        .map_err(|e| boxed(e.to_string()))?;
    interp
        .flush_pending_scripts(&ctx)
        .map_err(|e| boxed(e.to_string()))?;

    if ctx.is_execution_prohibited() {
        tracing::warn!("script execution was disabled by a guard");
    }
    Ok(())
}

fn boxed(message: String) -> CliError {
    message.into()
}
