//! Entry point: wires `preprocess` -> `minimal_lexer::tokenize` ->
//! `minimal_parser::non_terminals::Source::parse`, with a stage-stop flag per
//! step and a token/CST dump at whichever stage the pipeline stops.

mod cli;
mod error;
mod preprocessor;

use clap::Parser as ClapParser;
use log::{error, info, Level};

use cli::Cli;
use error::MinimalError;
use minimal_lexer::tokenize;
use minimal_parser::non_terminals::Source;
use minimal_parser::{Parse, ParseBuffer, ParseDisplay};

const USAGE: &str = "usage: minimal [OPTIONS] <FILE...>";

fn print_info() {
    println!("{USAGE}");
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("A *.mini source to C transpiler front end (preprocess, lex, parse).");
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::Info } else { Level::Warn };
    simple_logger::init_with_level(level).unwrap();

    if cli.usage {
        println!("{USAGE}");
        return;
    }
    if cli.info {
        print_info();
        return;
    }

    if let Err(err) = run(&cli) {
        error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), MinimalError> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| preprocessor::default_output_path(cli.main_file()));

    let source_text = preprocessor::preprocess(&cli.paths, &output, cli.verbose)?;
    if cli.pre {
        info!("stopped after preprocessing: {}", output.display());
        return Ok(());
    }

    let tokens = tokenize(&source_text)?;
    if cli.lex {
        dump_tokens(&tokens);
        return Ok(());
    }

    let mut buffer = ParseBuffer::new(&tokens);
    let tree = Source::parse(&mut buffer).map_err(MinimalError::Parse)?;
    if cli.syn {
        tree.display(0, None);
        return Ok(());
    }

    // Semantic analysis, code generation, assembly, and linking are outside
    // this front end's scope (SPEC_FULL.md Non-goals); `--sem`/`--cgen`/
    // `--ir`/`--asm`/`--obj`/`--exe` all land here with nothing further to
    // do once parsing has succeeded.
    tree.display(0, None);
    Ok(())
}

fn dump_tokens(tokens: &[minimal_lexer::Token]) {
    println!("LINE:COL LEXEME CATEGORY NAME");
    for token in tokens {
        println!("{token}");
    }
}
