use std::fs::File;
use std::io::{self, BufRead, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::{Diagnostics, EXIT_STATIC};
use rox::scanner::Scanner;
use rox::session::Session;
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as one JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program and prints the syntax tree of every statement
    Parse { filename: Option<PathBuf> },

    /// Runs input from a file as a Rox program
    Run { filename: Option<PathBuf> },

    /// Reads and runs one line at a time from stdin
    Repl,
}

/// File contents, memory mapped.  Empty files cannot be mapped.
enum Source {
    Mapped(Mmap),
    Empty,
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Source::Mapped(map) => &map[..],
            Source::Empty => &[],
        }
    }
}

fn read_file(filename: &Path) -> Result<Source> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        info!("{:?} is empty", filename);
        return Ok(Source::Empty);
    }

    // SAFETY: the map is read-only and dropped before the process exits; a
    // concurrent truncation by another process is outside our control.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", len, filename);
    Ok(Source::Mapped(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print every diagnostic to stderr.
fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
    }
}

fn tokenize(source: &[u8], json: bool) -> Result<i32> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                if json {
                    tokens.push(token);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        return Ok(EXIT_STATIC);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(source: &[u8]) -> i32 {
    let mut session = Session::new();
    let mut diagnostics = Diagnostics::new();

    let statements = session.parse(source, &mut diagnostics);
    report(&diagnostics);

    match statements {
        Some(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
            info!("Parse subcommand completed");
            0
        }
        None => diagnostics.exit_code(),
    }
}

fn run(source: &[u8]) -> i32 {
    let mut session = Session::new();
    let diagnostics = session.run(source);
    report(&diagnostics);

    info!("Run finished with exit code {}", diagnostics.exit_code());
    diagnostics.exit_code()
}

fn repl() -> Result<i32> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush stdout")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            info!("REPL reached end of input");
            return Ok(0);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // A failed line never ends the session.
        let diagnostics = session.run(trimmed.as_bytes());
        report(&diagnostics);
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code: i32 = match args.commands {
        Commands::Repl => repl()?,

        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => tokenize(&read_file(&filename)?, json)?,
            None => no_input(),
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => parse(&read_file(&filename)?),
            None => no_input(),
        },

        Commands::Run { filename } => match filename {
            Some(filename) => run(&read_file(&filename)?),
            None => no_input(),
        },
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}

fn no_input() -> i32 {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    0
}
