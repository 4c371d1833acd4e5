// luaparse: check a Lua file for syntax errors

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use luaparse::lines::executable_lines;
use luaparse::{parse_with_config, AstNode, ParserConfig};

/// Command-line options
struct Options {
    path: String,
    config: ParserConfig,
    lines: bool,
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("luaparse");

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            eprintln!("Usage: {} <file.lua | -> [--max-depth N] [--lines]", program_name);
            eprintln!();
            eprintln!("Options:");
            eprintln!(
                "  --max-depth N   Deepest allowed nesting (default {})",
                ParserConfig::default().max_depth
            );
            eprintln!("  --lines         Print the executable lines instead of a summary");
            return ExitCode::from(2);
        }
    };

    let (source, filename) = match read_source(&options.path) {
        Ok(read) => read,
        Err(e) => {
            report(&format!("{}: {}", options.path, e));
            return ExitCode::from(1);
        }
    };

    let chunk = match parse_with_config(&source, Some(&filename), &options.config) {
        Ok(chunk) => chunk,
        Err(e) => {
            report(&e.to_string());
            return ExitCode::from(1);
        }
    };

    if options.lines {
        for line in executable_lines(&chunk, &source).sorted() {
            println!("{}", line);
        }
    } else {
        let statements = match &chunk {
            AstNode::Block { stats, .. } => stats.len(),
            _ => 0,
        };
        println!("ok: {} statements", statements);
    }

    ExitCode::SUCCESS
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Fails only when a global subscriber is already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_tty())
        .with_target(false)
        .compact()
        .try_init();
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut path = None;
    let mut config = ParserConfig::default();
    let mut lines = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--lines" => lines = true,
            "--max-depth" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--max-depth needs a value".to_string())?;
                let depth = value
                    .parse::<usize>()
                    .ok()
                    .filter(|&depth| depth > 0)
                    .ok_or_else(|| format!("invalid nesting depth '{}'", value))?;
                config = config.with_max_depth(depth);
            }
            flag if flag.starts_with('-') && flag != "-" => {
                return Err(format!("unknown option '{}'", flag));
            }
            file => {
                if path.is_some() {
                    return Err(format!("unexpected argument '{}'", file));
                }
                path = Some(file.to_string());
            }
        }
    }

    let path = path.ok_or_else(|| "no input file provided".to_string())?;
    Ok(Options {
        path,
        config,
        lines,
    })
}

/// Read the source and pick the name used in error messages.
fn read_source(path: &str) -> io::Result<(String, String)> {
    if path == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return Ok((source, "stdin".to_string()));
    }

    debug!(path, "reading source");
    Ok((fs::read_to_string(path)?, path.to_string()))
}

fn report(message: &str) {
    if io::stderr().is_tty() {
        eprintln!("{}", message.to_string().red().bold());
    } else {
        eprintln!("{}", message);
    }
}
