//! **symbolicate** is a library for turning raw crash logs into
//! human readable ones.
//!
//! Crash logs collected from deployed binaries reference stack frames
//! as `<module> + <offset>` pairs, because the running image had its
//! debug symbols stripped. Given the per-module symbol tables that were
//! preserved separately, this crate replaces each such frame with the
//! name of the function containing the address, demangling C++, Rust,
//! and Swift names on the way.
//!
//! The main entry point is the [`Rewriter`][rewrite::Rewriter], which
//! operates on the text of a complete log:
//! ```
//! use symbolicate::rewrite::Builder;
//! use symbolicate::SymbolMap;
//!
//! let mut symbols = SymbolMap::new();
//! let () = symbols.insert("libFoo", [(0x1000, "_Z3fooi"), (0x2000, "_Z3barv")]);
//!
//! let rewriter = Builder::default().set_stepping(1).build(symbols);
//! let rewritten = rewriter
//!     .rewrite(b"0 libFoo + 0x1050\n1 libBar + 0x10\n")
//!     .unwrap();
//! assert_eq!(rewritten.text, "0 foo(int) + 0x50\n1 <unknown>\n");
//!
//! let counts = rewritten
//!     .progress
//!     .map(|event| event.processed)
//!     .collect::<Vec<_>>();
//! assert_eq!(counts, [1, 2]);
//! ```
//!
//! Lower level building blocks are available as well: the
//! [`Resolver`] maps a module and an address to the nearest preceding
//! symbol, [`SymbolTable`] is the per-module index it consults, and
//! [`demangle()`][demangle::demangle] converts mangled names into
//! display names.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::let_and_return, clippy::let_unit_value)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    clippy::absolute_paths,
    rustdoc::broken_intra_doc_links
)]


mod cache;
pub mod demangle;
mod error;
mod provider;
mod resolver;
pub mod rewrite;
mod symtab;
mod util;

pub use crate::error::Error;
pub use crate::error::ErrorExt;
pub use crate::error::ErrorKind;
pub use crate::provider::FnProvider;
pub use crate::provider::RawSym;
pub use crate::provider::SymbolMap;
pub use crate::provider::SymbolProvider;
pub use crate::resolver::Resolved;
pub use crate::resolver::ResolvedSym;
pub use crate::resolver::Resolver;
pub use crate::symtab::SymbolRecord;
pub use crate::symtab::SymbolTable;


/// A result type using our [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A type representing addresses.
///
/// Addresses in this crate are always relative to the load address of
/// the module they belong to.
pub type Addr = u64;

/// The marker substituted for frames that could not be symbolized.
pub const UNKNOWN_MARKER: &str = "<unknown>";


#[cfg(feature = "tracing")]
#[macro_use]
#[allow(unused_imports)]
mod log {
    pub(crate) use tracing::debug;
    pub(crate) use tracing::error;
    pub(crate) use tracing::info;
    pub(crate) use tracing::instrument;
    pub(crate) use tracing::trace;
    pub(crate) use tracing::warn;
}

#[cfg(not(feature = "tracing"))]
#[macro_use]
#[allow(unused_imports)]
mod log {
    macro_rules! debug {
        ($($args:tt)*) => {{
          if false {
            // Make sure to use `args` to prevent any warnings about
            // unused variables.
            let _args = format_args!($($args)*);
          }
        }};
    }
    pub(crate) use debug;
    pub(crate) use debug as error;
    pub(crate) use debug as info;
    pub(crate) use debug as trace;
    pub(crate) use debug as warn;
}
