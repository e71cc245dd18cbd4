use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use tinycpu_debugger::console::Console;
use tinycpu_debugger::dap;
use tinycpu_debugger::debugger::Controller;
use tinycpu_debugger::loader::LaunchConfig;

const LOG_FILE_VAR: &str = "TINYCPU_DEBUG_LOG";

const USAGE: &str = "\
usage: tinycpu-debugger --dap
       tinycpu-debugger <program.tiny>
       tinycpu-debugger --hex <file> --listing <file> [--entry <addr>]
       tinycpu-debugger --asm <file> [--out-dir <dir>] [--artifact-base <name>] [--entry <addr>]
options: --no-stop-on-entry";

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.target(env_logger::Target::Stderr);

    // stdout carries the DAP wire, so a file is the only other place logs may go.
    if let Some(path) = std::env::var_os(LOG_FILE_VAR) {
        match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {:?}: {}", path, e),
        }
    }
    builder.init();
}

fn parse_entry(text: &str) -> Result<u16, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|_| format!("Invalid entry address: {text}"))
}

fn parse_args(args: &[String]) -> Result<LaunchConfig, String> {
    let mut config = LaunchConfig::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--hex" => config.hex = Some(PathBuf::from(value("--hex")?)),
            "--listing" => config.listing = Some(PathBuf::from(value("--listing")?)),
            "--asm" => config.asm = Some(PathBuf::from(value("--asm")?)),
            "--out-dir" => config.output_dir = Some(PathBuf::from(value("--out-dir")?)),
            "--artifact-base" => config.artifact_base = Some(value("--artifact-base")?),
            "--entry" => config.entry = Some(parse_entry(&value("--entry")?)?),
            "--no-stop-on-entry" => config.stop_on_entry = false,
            flag if flag.starts_with("--") => return Err(format!("Unknown option {flag}")),
            program => config.program = Some(PathBuf::from(program)),
        }
    }

    if config.program.is_none() && config.asm.is_none() && config.hex.is_none() {
        return Err(USAGE.to_string());
    }
    Ok(config)
}

fn run_interactive_mode(args: &[String]) -> io::Result<ExitCode> {
    let config = match parse_args(args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return Ok(ExitCode::from(2));
        }
    };

    let mut controller = Controller::new();
    if let Err(e) = controller.launch(&config) {
        error!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    let stdin = io::stdin();
    let mut console = Console::new(controller, io::stdout());
    console.run(stdin.lock())?;
    console.into_output().flush()?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> io::Result<ExitCode> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    info!("Args: {:?}", args);

    let dap_mode = args
        .iter()
        .any(|arg| arg == "--dap" || arg == "--debug-adapter");

    if dap_mode {
        dap::run_dap_mode()?;
        Ok(ExitCode::SUCCESS)
    } else {
        run_interactive_mode(&args)
    }
}
