use anyhow::{Context, Result};
use argh::FromArgs;
use env_logger::Env;
use log::LevelFilter;
use minish::{DEFAULT_PROMPT, Environment, ExitCode, Interpreter, IoStreams, ShellConfig};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

#[derive(FromArgs)]
/// A minimal command interpreter with built-ins and external programs.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its exit code.
    command: Option<String>,

    #[argh(option)]
    /// prompt printed before each line of an interactive session. Defaults to "> ".
    prompt: Option<String>,

    #[argh(switch)]
    /// never print a prompt, even on a terminal.
    no_prompt: bool,

    #[argh(switch, short = 'v')]
    /// log debug messages to stderr.
    verbose: bool,

    #[argh(positional)]
    /// file to read commands from instead of standard input.
    script: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn run(args: Args) -> Result<ExitCode> {
    let mut out = io::stdout();
    let mut err = io::stderr();
    let mut streams = IoStreams::new(&mut out, &mut err);
    let env = Environment::new();

    if let Some(line) = args.command {
        let mut sh = Interpreter::new(env, ShellConfig::default());
        return Ok(sh.run_line(&line, &mut streams).exit_code);
    }

    match args.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("can't open script {}", path.display()))?;
            Interpreter::new(env, ShellConfig::default()).run(BufReader::new(file), &mut streams)
        }
        None => {
            let stdin = io::stdin();
            let config = if args.no_prompt || !stdin.is_terminal() {
                ShellConfig::default()
            } else {
                ShellConfig::interactive(args.prompt.as_deref().unwrap_or(DEFAULT_PROMPT))
            };
            Interpreter::new(env, config).run(stdin.lock(), &mut streams)
        }
    }
}

fn main() {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("minish: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
