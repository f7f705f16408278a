//! Functionality for rewriting crash logs.
//!
//! This module contains functionality for rewriting the text of crash
//! logs, replacing references to stack frames in the form of
//! `<module> + <offset>` with the names of the symbols they fall into.
//!
//! For example, here we symbolicate a fragment of a crash log using
//! symbols that were registered in memory, while reporting progress
//! after every second frame:
//! ```
//! use symbolicate::rewrite::Builder;
//! use symbolicate::SymbolMap;
//!
//! let mut symbols = SymbolMap::new();
//! let () = symbols.insert("libFoo", [(0x1000, "_Z3fooi"), (0x2000, "_Z3barv")]);
//! let () = symbols.insert("MyApp", [(0x4000, "$s5MyApp14ViewControllerC11viewDidLoadyyF")]);
//!
//! let log = "\
//! Thread 0 Crashed:
//! 0 libFoo + 0x1050
//! 1 libFoo + 8200
//! 2 MyApp + 0x4010
//! ";
//!
//! let rewriter = Builder::default().set_stepping(2).build(symbols);
//! let mut progress = Vec::new();
//! let text = rewriter
//!     .rewrite_with_progress(log.as_bytes(), |event| progress.push(event.processed))
//!     .unwrap();
//!
//! # #[cfg(feature = "demangle")]
//! assert_eq!(
//!     text,
//!     "\
//! Thread 0 Crashed:
//! 0 foo(int) + 0x50
//! 1 bar() + 0x8
//! 2 MyApp.ViewController.viewDidLoad + 0x10
//! "
//! );
//! assert_eq!(progress, [2, 3]);
//! ```

mod progress;
mod rewriter;
mod scanner;

use std::ops::Range;

pub use progress::Progress;
pub use rewriter::Builder;
pub use rewriter::DemangleFn;
pub use rewriter::Rewriter;
pub use scanner::FrameScanner;
pub use scanner::RegexScanner;

use crate::Addr;


/// A reference to a stack frame inside of a crash log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameRef<'log> {
    /// The identifier of the module the frame belongs to.
    pub module: &'log str,
    /// The module relative address of the frame.
    pub addr: Addr,
    /// The byte range of the log text occupied by the reference.
    ///
    /// This range is replaced in its entirety when rewriting.
    pub span: Range<usize>,
}


/// A progress report, as emitted while rewriting a crash log.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProgressEvent {
    /// The number of frames processed so far.
    pub processed: usize,
    /// The total number of frames in the log.
    pub total: usize,
}


/// The result of rewriting a crash log by a [`Rewriter`].
#[derive(Debug)]
pub struct Rewritten {
    /// The rewritten text of the log.
    pub text: String,
    /// The progress reports for the rewrite.
    ///
    /// Reports can be consumed independently of the text.
    pub progress: Progress,
}
