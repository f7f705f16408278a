use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::fmt::Write as _;
use std::str;

use crate::demangle::demangle;
use crate::log::debug;
use crate::Error;
use crate::ErrorExt as _;
use crate::Resolved;
use crate::Resolver;
use crate::Result;
use crate::SymbolProvider;
use crate::UNKNOWN_MARKER;

use super::progress::is_report_point;
use super::FrameRef;
use super::FrameScanner;
use super::Progress;
use super::ProgressEvent;
use super::RegexScanner;
use super::Rewritten;


/// The signature of functions converting raw symbol names into display
/// names.
pub type DemangleFn = for<'n> fn(&'n str) -> Cow<'n, str>;


/// A builder for configurable construction of [`Rewriter`] objects.
///
/// By default progress reporting is disabled, symbol names are
/// demangled using [`demangle`][crate::demangle::demangle], frames are
/// recognized by the default [`RegexScanner`], unresolved frames are
/// replaced with [`UNKNOWN_MARKER`], and symbol tables are built
/// lazily.
pub struct Builder {
    /// See [`Builder::set_stepping`].
    stepping: u32,
    /// See [`Builder::enable_demangling`].
    demangle: bool,
    /// See [`Builder::set_demangler`].
    demangler: DemangleFn,
    /// See [`Builder::set_scanner`].
    scanner: Box<dyn FrameScanner + Send + Sync>,
    /// See [`Builder::keep_unresolved`].
    keep_unresolved: bool,
    /// See [`Builder::enable_prefetch`].
    prefetch: bool,
}

impl Builder {
    /// Set the number of frames after which progress is reported.
    ///
    /// A value of zero disables progress reporting. Otherwise, progress
    /// is reported after every `stepping` frames and once more after
    /// the last frame.
    pub fn set_stepping(mut self, stepping: u32) -> Builder {
        self.stepping = stepping;
        self
    }

    /// Enable/disable the demangling of symbol names.
    pub fn enable_demangling(mut self, enable: bool) -> Builder {
        self.demangle = enable;
        self
    }

    /// Set the function used for converting raw symbol names into
    /// display names.
    ///
    /// The function is only used if demangling is enabled.
    pub fn set_demangler(mut self, demangler: DemangleFn) -> Builder {
        self.demangler = demangler;
        self
    }

    /// Set the [`FrameScanner`] used for finding frame references.
    pub fn set_scanner<S>(mut self, scanner: S) -> Builder
    where
        S: FrameScanner + Send + Sync + 'static,
    {
        self.scanner = Box::new(scanner);
        self
    }

    /// Enable/disable the verbatim reproduction of frames that could
    /// not be resolved.
    ///
    /// If disabled, such frames are replaced with [`UNKNOWN_MARKER`].
    pub fn keep_unresolved(mut self, keep: bool) -> Builder {
        self.keep_unresolved = keep;
        self
    }

    /// Enable/disable the eager construction of symbol tables for all
    /// modules referenced by a log, before any frame is substituted.
    pub fn enable_prefetch(mut self, enable: bool) -> Builder {
        self.prefetch = enable;
        self
    }

    /// Create the [`Rewriter`] object, retrieving symbols from
    /// `provider`.
    pub fn build<P>(self, provider: P) -> Rewriter<P>
    where
        P: SymbolProvider,
    {
        let Builder {
            stepping,
            demangle,
            demangler,
            scanner,
            keep_unresolved,
            prefetch,
        } = self;

        Rewriter {
            stepping,
            demangle,
            demangler,
            scanner,
            keep_unresolved,
            prefetch,
            resolver: Resolver::new(provider),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            stepping: 0,
            demangle: true,
            demangler: demangle,
            scanner: Box::new(RegexScanner::default()),
            keep_unresolved: false,
            prefetch: false,
        }
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let Builder {
            stepping,
            demangle,
            demangler: _,
            scanner,
            keep_unresolved,
            prefetch,
        } = self;

        f.debug_struct(stringify!(Builder))
            .field("stepping", stepping)
            .field("demangle", demangle)
            .field("scanner", scanner)
            .field("keep_unresolved", keep_unresolved)
            .field("prefetch", prefetch)
            .finish_non_exhaustive()
    }
}


/// Check that frame references are ordered, do not overlap, and are
/// located within `log`, at character boundaries.
fn validate_frames(log: &str, frames: &[FrameRef<'_>]) -> Result<()> {
    let mut end = 0;
    for frame in frames {
        let span = &frame.span;
        if span.start < end || span.start > span.end {
            return Err(Error::with_invalid_input(format!(
                "frame reference at {span:?} overlaps its predecessor or is out of order"
            )))
        }
        if log.get(span.clone()).is_none() {
            return Err(Error::with_invalid_input(format!(
                "frame reference at {span:?} is not a valid range of the log"
            )))
        }
        end = span.end;
    }
    Ok(())
}


/// A rewriter of crash logs.
///
/// A rewriter scans the text of crash logs for references to stack
/// frames, resolves them by means of a [`Resolver`], and replaces them
/// with the (demangled) name of the symbol they fall into and the
/// offset into this symbol. All other text is reproduced unchanged.
///
/// Symbol tables are cached inside the rewriter. As such, rewriting
/// multiple logs referencing the same modules with the same
/// `Rewriter` instance only retrieves symbols once.
pub struct Rewriter<P> {
    /// See [`Builder::set_stepping`].
    stepping: u32,
    /// See [`Builder::enable_demangling`].
    demangle: bool,
    /// See [`Builder::set_demangler`].
    demangler: DemangleFn,
    /// See [`Builder::set_scanner`].
    scanner: Box<dyn FrameScanner + Send + Sync>,
    /// See [`Builder::keep_unresolved`].
    keep_unresolved: bool,
    /// See [`Builder::enable_prefetch`].
    prefetch: bool,
    /// The resolver used for looking up frames.
    resolver: Resolver<P>,
}

impl<P> Rewriter<P>
where
    P: SymbolProvider,
{
    /// Create a new [`Rewriter`] retrieving symbols from `provider`.
    ///
    /// This method is just a short hand for instantiating a `Rewriter`
    /// from the default [`Builder`].
    #[inline]
    pub fn new(provider: P) -> Self {
        Builder::default().build(provider)
    }

    /// Retrieve a [`Builder`] object for configurable construction of a
    /// [`Rewriter`].
    #[inline]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Append the replacement text for `frame` to `text`.
    fn substitute(&self, text: &mut String, log: &str, frame: &FrameRef<'_>) {
        match self.resolver.resolve(frame.module, frame.addr) {
            Resolved::Sym(sym) => {
                let name = if self.demangle {
                    (self.demangler)(&sym.name)
                } else {
                    Cow::Borrowed(sym.name.as_str())
                };
                let () = text.push_str(&name);
                // Writing to a `String` is infallible.
                let _result = write!(text, " + {:#x}", sym.offset);
            }
            Resolved::Unknown if self.keep_unresolved => text.push_str(&log[frame.span.clone()]),
            Resolved::Unknown => text.push_str(UNKNOWN_MARKER),
        }
    }

    /// Rewrite `log`, reporting progress via `report`.
    ///
    /// The function returns the rewritten text along with the total
    /// number of frames found.
    fn rewrite_impl<F>(&self, log: &[u8], report: F) -> Result<(String, usize)>
    where
        F: FnMut(ProgressEvent),
    {
        let log = str::from_utf8(log)
            .map_err(Error::from)
            .context("crash log is not valid UTF-8")?;
        let frames = self.scanner.scan(log);
        self.substitute_frames(log, &frames, report)
    }

    /// Replace `frames` in `log`, reporting progress via `report`.
    fn substitute_frames<F>(
        &self,
        log: &str,
        frames: &[FrameRef<'_>],
        mut report: F,
    ) -> Result<(String, usize)>
    where
        F: FnMut(ProgressEvent),
    {
        let () = validate_frames(log, frames)?;

        if self.prefetch {
            let modules = frames
                .iter()
                .map(|frame| frame.module)
                .collect::<BTreeSet<_>>();
            let available = self.resolver.prefetch(modules);
            debug!("symbols for {available} referenced modules are available");
        }

        let total = frames.len();
        let mut text = String::with_capacity(log.len());
        let mut copied = 0;

        for (idx, frame) in frames.iter().enumerate() {
            let () = text.push_str(&log[copied..frame.span.start]);
            let () = self.substitute(&mut text, log, frame);
            copied = frame.span.end;

            let processed = idx + 1;
            if is_report_point(processed, total, self.stepping) {
                let () = report(ProgressEvent { processed, total });
            }
        }
        let () = text.push_str(&log[copied..]);

        debug!("rewrote {total} frame references");
        Ok((text, total))
    }

    /// Rewrite the crash log `log`.
    ///
    /// Progress reports for the rewrite are available through
    /// [`Rewritten::progress`], independently of the text.
    ///
    /// The only error condition is a log that is not valid UTF-8 (or,
    /// with a custom [`FrameScanner`], invalid frame spans); unknown
    /// modules and unresolvable addresses are reflected in the text.
    #[cfg_attr(feature = "tracing", crate::log::instrument(skip_all, fields(len = log.len())))]
    pub fn rewrite(&self, log: &[u8]) -> Result<Rewritten> {
        let (text, total) = self.rewrite_impl(log, |_event| ())?;
        let rewritten = Rewritten {
            text,
            progress: Progress::new(total, self.stepping),
        };
        Ok(rewritten)
    }

    /// Rewrite `log`, replacing the provided, already identified,
    /// frame references.
    ///
    /// The configured [`FrameScanner`] is not consulted. `frames` have
    /// to be ordered by their spans, which must not overlap, or an
    /// error of kind [`ErrorKind::InvalidInput`][crate::ErrorKind::InvalidInput]
    /// is reported.
    #[cfg_attr(feature = "tracing", crate::log::instrument(skip_all, fields(len = log.len(), frames = frames.len())))]
    pub fn rewrite_frames(&self, log: &str, frames: &[FrameRef<'_>]) -> Result<Rewritten> {
        let (text, total) = self.substitute_frames(log, frames, |_event| ())?;
        let rewritten = Rewritten {
            text,
            progress: Progress::new(total, self.stepping),
        };
        Ok(rewritten)
    }

    /// Rewrite the crash log `log`, reporting progress via `report` as
    /// frames are processed.
    ///
    /// `report` is invoked with the same events as contained in the
    /// [`Progress`] stream reported by [`Rewriter::rewrite`]. It is not
    /// invoked at all if rewriting fails.
    #[cfg_attr(feature = "tracing", crate::log::instrument(skip_all, fields(len = log.len())))]
    pub fn rewrite_with_progress<F>(&self, log: &[u8], report: F) -> Result<String>
    where
        F: FnMut(ProgressEvent),
    {
        let (text, _total) = self.rewrite_impl(log, report)?;
        Ok(text)
    }
}

impl<P> Rewriter<P> {
    /// Retrieve the [`Resolver`] used by this rewriter.
    #[inline]
    pub fn resolver(&self) -> &Resolver<P> {
        &self.resolver
    }

    /// Retrieve the number of frames after which progress is reported.
    #[inline]
    pub fn stepping(&self) -> u32 {
        self.stepping
    }
}

impl<P> Debug for Rewriter<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct(stringify!(Rewriter))
            .field("stepping", &self.stepping)
            .field("demangle", &self.demangle)
            .field("keep_unresolved", &self.keep_unresolved)
            .field("prefetch", &self.prefetch)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
