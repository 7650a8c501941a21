//! Command-line flags (`SPEC_FULL.md` §6). `--help`/`--version` are handled
//! by `clap`'s derive automatically; `--usage`/`--info` are this front end's
//! own general flags and are handled explicitly in `main`.

use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "minimal", author, version, about = "Preprocess, lex, and parse Minimal (.mini) source")]
pub struct Cli {
    /// Print a one-line usage summary and exit.
    #[arg(long)]
    pub usage: bool,

    /// Print build/author information and exit.
    #[arg(long)]
    pub info: bool,

    /// Raise log verbosity from Warn to Info.
    #[arg(short, long)]
    pub verbose: bool,

    /// Stop after preprocessing and leave the `.prep` file on disk.
    #[arg(long)]
    pub pre: bool,

    /// Stop after lexing and dump the token stream.
    #[arg(long)]
    pub lex: bool,

    /// Stop after parsing and dump the concrete syntax tree.
    #[arg(long)]
    pub syn: bool,

    /// Stop after semantic analysis (not implemented by this front end).
    #[arg(long)]
    pub sem: bool,

    /// Stop after C code generation (not implemented by this front end).
    #[arg(long)]
    pub cgen: bool,

    /// Stop after IR emission (not implemented by this front end).
    #[arg(long)]
    pub ir: bool,

    /// Stop after assembly emission (not implemented by this front end).
    #[arg(long)]
    pub asm: bool,

    /// Stop after object-file emission (not implemented by this front end).
    #[arg(long)]
    pub obj: bool,

    /// Stop after linking (not implemented by this front end).
    #[arg(long)]
    pub exe: bool,

    /// Output file base name. Defaults to the main file's stem.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source files; the last one is the main file.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl Cli {
    pub fn main_file(&self) -> &Path {
        self.paths.last().expect("clap requires at least one path")
    }

    /// Every input but the last: modules imported by the main file.
    pub fn module_files(&self) -> &[PathBuf] {
        &self.paths[..self.paths.len() - 1]
    }
}
