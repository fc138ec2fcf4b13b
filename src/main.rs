use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use mini_cpp as mc;

use mc::ast::Program;
use mc::codegen::CEmitter;
use mc::dot::DotPrinter;
use mc::error::MiniError;
use mc::interpreter::World;
use mc::parser::parse_source;
use mc::scanner::Scanner;
use mc::value::Value;

/// Exit status for input that cannot be scanned, parsed or decoded.
const EXIT_BAD_INPUT: i32 = 65;

/// Exit status for a program that fails while running.
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "mini-cpp interpreter and C emitter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// Treat the input file as a JSON-serialized AST instead of source text
    #[arg(long, global = true)]
    ast_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file and prints its AST as JSON
    Parse { filename: Option<PathBuf> },

    /// Writes a Graphviz description of the AST
    Dot {
        filename: Option<PathBuf>,

        #[arg(short, long, default_value = "ast.dot")]
        output: PathBuf,
    },

    /// Writes equivalent C source
    EmitC {
        filename: Option<PathBuf>,

        #[arg(short, long, default_value = "out.c")]
        output: PathBuf,
    },

    /// Runs the program's entry function and prints its result
    Run {
        filename: Option<PathBuf>,

        /// Function called with no arguments to start the program
        #[arg(long, default_value = "main")]
        entry: String,
    },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &Path) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn write_file(filename: &Path, contents: &str) -> Result<()> {
    let mut file =
        File::create(filename).context(format!("Failed to create file {:?}", filename))?;

    file.write_all(contents.as_bytes())
        .context(format!("Failed to write file {:?}", filename))?;

    info!("Wrote {} bytes to {:?}", contents.len(), filename);
    Ok(())
}

/// The input file, or a polite exit when none was given.
fn require_input(filename: Option<PathBuf>) -> PathBuf {
    match filename {
        Some(filename) => filename,
        None => {
            info!("No filepath provided");
            println!("No input filepath was provided. Exiting...");
            std::process::exit(0);
        }
    }
}

/// Builds the AST from source text or from its JSON form, exiting with
/// status 65 when the input is malformed.
fn load_program(filename: &Path, ast_json: bool) -> Result<Program> {
    let buf = read_file(filename)?;

    let loaded: std::result::Result<Program, MiniError> = if ast_json {
        String::from_utf8(buf)
            .map_err(MiniError::from)
            .and_then(|text| Program::from_json(&text))
    } else {
        parse_source(&buf)
    };

    match loaded {
        Ok(program) => {
            info!("Loaded program with {} items", program.items.len());
            Ok(program)
        }
        Err(e) => {
            debug!("Load debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(EXIT_BAD_INPUT);
        }
    }
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'mini_cpp::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("mini_cpp::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let filename = require_input(filename);
            info!("Running Tokenize subcommand");
            let buf = read_file(&filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&buf) {
                match token {
                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        tokenized = false;
                        debug!("Tokenization debug: {}", e);
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code {}", EXIT_BAD_INPUT);
                std::process::exit(EXIT_BAD_INPUT);
            }
        }

        Commands::Parse { filename } => {
            let filename = require_input(filename);
            info!("Running Parse subcommand");
            let program = load_program(&filename, args.ast_json)?;

            println!("{}", program.to_json()?);
        }

        Commands::Dot { filename, output } => {
            let filename = require_input(filename);
            info!("Running Dot subcommand");
            let program = load_program(&filename, args.ast_json)?;

            write_file(&output, &DotPrinter::print(&program))?;
            eprintln!(
                "AST written to {} (use: dot -Tpng {} -o ast.png)",
                output.display(),
                output.display()
            );
        }

        Commands::EmitC { filename, output } => {
            let filename = require_input(filename);
            info!("Running EmitC subcommand");
            let program = load_program(&filename, args.ast_json)?;

            write_file(&output, &CEmitter::emit(&program))?;
            println!("C code written to {}", output.display());
        }

        Commands::Run { filename, entry } => {
            let filename = require_input(filename);
            info!("Running Run subcommand");
            let program = load_program(&filename, args.ast_json)?;

            let mut world = World::new();
            world.register_host("print", 1, |args: &[Value]| {
                let value = args.first().copied().unwrap_or_default();
                println!("{}", value);
                value
            });

            match world.run(&program, &entry) {
                Ok(value) => {
                    info!("Program executed successfully");
                    println!("Program returned: {}", value.as_number());
                }

                Err(e) => {
                    debug!("Runtime debug: {}", e);
                    eprintln!("Runtime error: {}", e);
                    std::process::exit(EXIT_RUNTIME);
                }
            }
        }
    }

    Ok(())
}
