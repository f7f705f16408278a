use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;

use symbolicate::Addr;

use clap::ArgAction;
use clap::Args as Arguments;
use clap::Parser;
use clap::Subcommand;


/// Parse an address from a string.
fn parse_addr(s: &str) -> Result<Addr> {
    // Addresses are always represented in hex, with or without 0x
    // prefix.
    Addr::from_str_radix(s.trim_start_matches("0x"), 16)
        .with_context(|| format!("failed to parse address: {s}"))
}

/// Parse a symbol of the form `MODULE:ADDR=NAME` from a string.
fn parse_symbol(s: &str) -> Result<Symbol> {
    let (location, name) = s
        .split_once('=')
        .with_context(|| format!("symbol `{s}` is not of the form MODULE:ADDR=NAME"))?;
    let (module, addr) = location
        .rsplit_once(':')
        .with_context(|| format!("symbol `{s}` lacks a module"))?;

    if module.is_empty() {
        anyhow::bail!("symbol `{s}` has an empty module")
    }
    if name.is_empty() {
        anyhow::bail!("symbol `{s}` has an empty name")
    }

    let symbol = Symbol {
        module: module.to_string(),
        addr: parse_addr(addr)?,
        name: name.to_string(),
    };
    Ok(symbol)
}


/// A symbol, as provided on the command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    /// The module the symbol belongs to.
    pub module: String,
    /// The module relative start address of the symbol.
    pub addr: Addr,
    /// The raw, possibly mangled, name of the symbol.
    pub name: String,
}


/// A command line interface for symbolicating crash logs.
#[derive(Debug, Parser)]
#[clap(version = env!("VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// Increase verbosity (can be supplied multiple times).
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbosity: u8,
}


#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite a crash log, replacing frame references with symbols.
    Rewrite(Rewrite),
    /// Resolve one or more module relative addresses.
    Resolve(Resolve),
    /// Demangle one or more symbol names.
    Demangle(Demangle),
}


#[derive(Debug, Arguments)]
pub struct Symbols {
    /// A symbol to use, of the form MODULE:ADDR=NAME (can be supplied
    /// multiple times).
    ///
    /// ADDR is the hexadecimal, module relative, start address of the
    /// symbol.
    #[clap(short, long = "symbol")]
    #[arg(value_parser = parse_symbol)]
    pub symbols: Vec<Symbol>,
}


#[derive(Debug, Arguments)]
#[group(multiple = false)]
pub struct Format {
    /// Recognize frames in the format of Apple crash reports.
    #[clap(long)]
    pub apple: bool,
    /// A regular expression recognizing frames, defining the capture
    /// groups `module` and `offset` and, optionally, `frame`.
    #[clap(long)]
    pub pattern: Option<String>,
}


/// A type representing the `rewrite` command.
#[derive(Debug, Arguments)]
pub struct Rewrite {
    #[command(flatten)]
    pub symbols: Symbols,
    #[command(flatten)]
    pub format: Format,
    /// Report progress on stderr after every N frames (0 disables
    /// reporting).
    #[clap(long, default_value_t = 0, value_name = "N")]
    pub stepping: u32,
    /// Disable the demangling of symbol names.
    #[clap(long)]
    pub no_demangle: bool,
    /// Copy frames that could not be resolved verbatim, instead of
    /// replacing them with a marker.
    #[clap(long)]
    pub keep_unresolved: bool,
    /// Build all symbol tables before rewriting.
    #[clap(long)]
    pub prefetch: bool,
    /// The crash log to rewrite. Read from stdin if not provided.
    pub path: Option<PathBuf>,
}


/// A type representing the `resolve` command.
#[derive(Debug, Arguments)]
pub struct Resolve {
    #[command(flatten)]
    pub symbols: Symbols,
    /// Disable the demangling of symbol names.
    #[clap(long)]
    pub no_demangle: bool,
    /// The module the addresses belong to.
    pub module: String,
    /// The module relative addresses to resolve.
    #[arg(value_parser = parse_addr)]
    pub addrs: Vec<Addr>,
}


/// A type representing the `demangle` command.
#[derive(Debug, Arguments)]
pub struct Demangle {
    /// The names to demangle.
    pub names: Vec<String>,
}
