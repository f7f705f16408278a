#![allow(clippy::let_and_return, clippy::let_unit_value)]

mod args;

use std::borrow::Cow;
use std::fs::read;
use std::io::stderr;
use std::io::stdin;
use std::io::stdout;
use std::io::Read as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;

use symbolicate::demangle::demangle;
use symbolicate::rewrite::Builder;
use symbolicate::rewrite::RegexScanner;
use symbolicate::Resolved;
use symbolicate::Resolver;
use symbolicate::SymbolMap;

use clap::Parser as _;

use tracing::subscriber::set_global_default as set_global_subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::FmtSubscriber;


/// Create a [`SymbolMap`] from the symbols provided on the command
/// line.
fn symbol_map(symbols: args::Symbols) -> SymbolMap {
    symbols
        .symbols
        .into_iter()
        .fold(SymbolMap::new(), |mut map, symbol| {
            let args::Symbol { module, addr, name } = symbol;
            let () = map.insert(&module, [(addr, name)]);
            map
        })
}

/// Read the contents of the file at `path` or, if not present, of
/// stdin.
fn read_log(path: Option<&Path>) -> Result<Vec<u8>> {
    if let Some(path) = path {
        read(path).with_context(|| format!("failed to read crash log `{}`", path.display()))
    } else {
        let mut log = Vec::new();
        let _count = stdin()
            .lock()
            .read_to_end(&mut log)
            .context("failed to read crash log from stdin")?;
        Ok(log)
    }
}

/// The handler for the 'rewrite' command.
fn rewrite(rewrite: args::Rewrite) -> Result<()> {
    let args::Rewrite {
        symbols,
        format,
        stepping,
        no_demangle,
        keep_unresolved,
        prefetch,
        path,
    } = rewrite;

    let scanner = match format {
        args::Format {
            pattern: Some(pattern),
            ..
        } => RegexScanner::new(&pattern).context("failed to create frame scanner")?,
        args::Format { apple: true, .. } => RegexScanner::apple(),
        args::Format { .. } => RegexScanner::default(),
    };

    let rewriter = Builder::default()
        .set_stepping(stepping)
        .enable_demangling(!no_demangle)
        .set_scanner(scanner)
        .keep_unresolved(keep_unresolved)
        .enable_prefetch(prefetch)
        .build(symbol_map(symbols));

    let log = read_log(path.as_deref())?;
    let text = rewriter
        .rewrite_with_progress(&log, |event| {
            eprintln!("processed {}/{} frames", event.processed, event.total)
        })
        .context("failed to rewrite crash log")?;

    let () = stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("failed to write rewritten crash log")?;
    Ok(())
}

/// The handler for the 'resolve' command.
fn resolve(resolve: args::Resolve) -> Result<()> {
    let args::Resolve {
        symbols,
        no_demangle,
        module,
        addrs,
    } = resolve;

    let resolver = Resolver::new(symbol_map(symbols));
    for addr in addrs {
        match resolver.resolve(&module, addr) {
            Resolved::Sym(sym) => {
                let name = if no_demangle {
                    Cow::Borrowed(sym.name.as_str())
                } else {
                    demangle(&sym.name)
                };
                let past_end = if sym.past_end { " (past end)" } else { "" };
                println!(
                    "{addr:#016x}: {name} @ {:#x}+{:#x}{past_end}",
                    sym.addr, sym.offset
                )
            }
            Resolved::Unknown => println!("{addr:#016x}: {}", symbolicate::UNKNOWN_MARKER),
        }
    }
    Ok(())
}

/// The handler for the 'demangle' command.
fn demangle_names(demangle_args: args::Demangle) -> Result<()> {
    for name in demangle_args.names {
        println!("{}", demangle(&name));
    }
    Ok(())
}


fn main() -> Result<()> {
    let args = args::Args::parse();
    let level = match args.verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_span_events(FmtSpan::FULL)
        .with_timer(SystemTime)
        .with_writer(stderr)
        .finish();

    let () =
        set_global_subscriber(subscriber).with_context(|| "failed to set tracing subscriber")?;

    match args.command {
        args::Command::Rewrite(rewrite) => self::rewrite(rewrite),
        args::Command::Resolve(resolve) => self::resolve(resolve),
        args::Command::Demangle(demangle) => self::demangle_names(demangle),
    }
}
