use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use govlang::console::StdConsole;
use govlang::diag::StderrSink;
use govlang::interpreter::{Interpreter, TraceConfig};
use govlang::{lexer, parser, printer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Parse,
    Debug,
}

#[derive(Debug)]
struct Config {
    command: Command,
    filename: String,
    verbosity: u8,
    step: bool,
}

enum ArgsOutcome {
    Proceed(Config),
    HelpRequested,
}

fn print_help(program_name: &str) {
    println!("Gov Language Interpreter");
    println!();
    println!("Usage: {program_name} [COMMAND] [OPTIONS] <filename.gov>");
    println!();
    println!("Commands:");
    println!("  run       Interpret and execute the code (default)");
    println!("  parse     Show the parsed AST structure");
    println!("  debug     Show detailed runtime information");
    println!();
    println!("Options:");
    println!("  -h, --help           Show this help message");
    println!(
        "  -v, --verbose LEVEL  Set debug verbosity level (0-3, default: 1 for debug, 0 for run)"
    );
    println!("  -s, --step           Enable step-by-step execution in debug mode");
    println!();
    println!("Examples:");
    println!("  {program_name} hello_world.gov");
    println!("  {program_name} run hello_world.gov");
    println!("  {program_name} parse hello_world.gov");
    println!("  {program_name} debug -v 2 -s hello_world.gov");
}

fn parse_args(args: &[String]) -> Result<ArgsOutcome, String> {
    if args.is_empty() {
        return Err("No arguments provided".to_string());
    }

    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        return Ok(ArgsOutcome::HelpRequested);
    }

    let mut command = Command::Run;
    let mut filename = None;
    let mut verbosity = 0u8;
    let mut verbosity_set = false;
    let mut step = false;

    let mut rest = args;
    match rest.first().map(String::as_str) {
        Some("run") => {
            command = Command::Run;
            rest = &rest[1..];
        }
        Some("parse") => {
            command = Command::Parse;
            rest = &rest[1..];
        }
        Some("debug") => {
            command = Command::Debug;
            rest = &rest[1..];
        }
        _ => {}
    }

    let mut index = 0;
    while index < rest.len() {
        let arg = &rest[index];
        if arg == "-v" || arg == "--verbose" {
            let Some(level) = rest.get(index + 1) else {
                return Err("--verbose requires a level argument".to_string());
            };
            let level: i64 = level
                .parse()
                .map_err(|_| "Invalid debug level. Must be a number 0-3".to_string())?;
            verbosity = level.clamp(0, 3) as u8;
            verbosity_set = true;
            index += 2;
        } else if arg == "-s" || arg == "--step" {
            step = true;
            index += 1;
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option {arg}"));
        } else {
            filename = Some(arg.clone());
            break;
        }
    }

    let Some(filename) = filename else {
        return Err("No filename provided".to_string());
    };

    if command == Command::Debug && !verbosity_set {
        verbosity = 1;
    }

    Ok(ArgsOutcome::Proceed(Config {
        command,
        filename,
        verbosity,
        step,
    }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GOVLANG_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn execute(config: &Config) -> Result<ExitCode> {
    let source = fs::read_to_string(&config.filename)
        .with_context(|| format!("Could not open file {}", config.filename))?;

    if config.verbosity > 0 {
        println!("Source loaded: {} characters", source.len());
    }

    let mut diag = StderrSink;
    let tokens = lexer::tokenize(&source, &mut diag);

    if config.verbosity > 0 {
        println!("Tokens generated: {}", tokens.len());
    }
    if config.verbosity > 1 {
        println!();
        println!("Tokens:");
        for (index, token) in tokens.iter().enumerate() {
            println!("  [{index}] {:?} \"{}\"", token.kind, token.lexeme);
        }
        println!();
    }

    let program = match parser::parse_tokens(tokens, &mut diag) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("Parse error occurred");
            return Ok(ExitCode::FAILURE);
        }
    };

    if config.verbosity > 0 {
        println!(
            "Program parsed successfully with {} statements",
            program.statements.len()
        );
    }

    if config.command == Command::Parse {
        println!();
        println!("Abstract Syntax Tree:");
        println!("=====================");
        print!("{}", printer::render_program(&program));
        return Ok(ExitCode::SUCCESS);
    }

    let mut console = StdConsole;
    let mut interpreter = Interpreter::new(&mut console, &mut diag);

    if config.command == Command::Debug {
        println!();
        println!("Debug Mode (Level {})", config.verbosity);
        println!("=====================================");
        if config.step {
            println!("Step-by-step execution enabled. Press Enter to continue after each step.");
            println!();
        }
        interpreter = interpreter.with_trace(TraceConfig {
            enabled: true,
            level: config.verbosity,
            step: config.step,
        });
    }

    interpreter.interpret(&program);
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();

    let program_name = std::env::args().next().unwrap_or_else(|| "govlang".to_string());
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match parse_args(&args) {
        Ok(ArgsOutcome::Proceed(config)) => config,
        Ok(ArgsOutcome::HelpRequested) => {
            print_help(&program_name);
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("Error: {message}");
            print_help(&program_name);
            return ExitCode::FAILURE;
        }
    };

    match execute(&config) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
