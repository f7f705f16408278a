use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::OnceLock;

use regex::Captures;
use regex::Regex;

use crate::log::trace;
use crate::Addr;
use crate::Error;
use crate::ErrorExt as _;
use crate::Result;

use super::FrameRef;


/// The interface for finding stack frame references in crash logs.
///
/// Implementations encapsulate knowledge about the format of a crash
/// log. They report frame references in the order in which they appear
/// in the text, with non-overlapping spans.
pub trait FrameScanner: Debug {
    /// Find all frame references in `log`.
    fn scan<'log>(&self, log: &'log str) -> Vec<FrameRef<'log>>;
}


/// Parse an offset as it appears in a crash log.
///
/// Offsets prefixed with `0x` are hexadecimal, all others decimal.
fn parse_offset(s: &str) -> Option<Addr> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Addr::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<Addr>().ok()
    }
}


/// A [`FrameScanner`] finding frame references by means of a regular
/// expression.
///
/// The expression has to define the named capture groups `module` and
/// `offset`, the latter matching a decimal or `0x`-prefixed hexadecimal
/// number. The span that is replaced when rewriting is the one captured
/// by the group `frame`, if present, or the whole match otherwise.
pub struct RegexScanner {
    regex: Regex,
}

impl RegexScanner {
    /// The pattern used by [`RegexScanner::default`], matching
    /// references of the form `<module> + <offset>`, e.g.,
    /// `libFoo.dylib + 0x1a2b` or `libFoo.dylib + 6699`.
    pub const DEFAULT_PATTERN: &'static str =
        r"(?P<module>[^\s+]+)[ \t]+\+[ \t]+(?P<offset>0[xX][0-9a-fA-F]+|[0-9]+)\b";

    /// A pattern matching the frame lines of Apple crash reports, e.g.,
    /// `3   UIKit   0x30a6d8e4 0x30a5e000 + 63716`.
    ///
    /// The module is taken from the second column and only the
    /// `<load address> + <offset>` part is replaced.
    pub const APPLE_PATTERN: &'static str = r"(?m)^[0-9]+[ \t]+(?P<module>\S+)[ \t]+0[xX][0-9a-fA-F]+[ \t]+(?P<frame>0[xX][0-9a-fA-F]+[ \t]+\+[ \t]+(?P<offset>0[xX][0-9a-fA-F]+|[0-9]+))\b";

    /// Create a new [`RegexScanner`] using the provided pattern.
    ///
    /// The pattern is rejected if it fails to compile or lacks one of
    /// the mandatory capture groups.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|err| Error::with_invalid_input(err.to_string()))
            .with_context(|| format!("failed to compile frame pattern `{pattern}`"))?;

        for group in ["module", "offset"] {
            if !regex.capture_names().any(|name| name == Some(group)) {
                return Err(Error::with_invalid_input(format!(
                    "frame pattern `{pattern}` lacks capture group `{group}`"
                )))
            }
        }

        Ok(Self { regex })
    }

    /// Create a [`RegexScanner`] for Apple crash reports, using
    /// [`RegexScanner::APPLE_PATTERN`].
    pub fn apple() -> Self {
        static APPLE: OnceLock<Regex> = OnceLock::new();

        let regex = APPLE.get_or_init(|| {
            Regex::new(Self::APPLE_PATTERN).expect("Apple frame pattern is valid")
        });
        Self {
            regex: regex.clone(),
        }
    }

    fn frame_ref<'log>(captures: &Captures<'log>) -> Option<FrameRef<'log>> {
        let module = captures.name("module")?.as_str();
        let offset = captures.name("offset")?.as_str();
        let span = captures
            .name("frame")
            .or_else(|| captures.get(0))?
            .range();

        // Numbers not fitting into an address are not considered
        // frames.
        let addr = parse_offset(offset)?;
        let frame = FrameRef { module, addr, span };
        Some(frame)
    }
}

impl Default for RegexScanner {
    fn default() -> Self {
        static DEFAULT: OnceLock<Regex> = OnceLock::new();

        let regex = DEFAULT.get_or_init(|| {
            Regex::new(Self::DEFAULT_PATTERN).expect("default frame pattern is valid")
        });
        Self {
            regex: regex.clone(),
        }
    }
}

impl FrameScanner for RegexScanner {
    fn scan<'log>(&self, log: &'log str) -> Vec<FrameRef<'log>> {
        let frames = self
            .regex
            .captures_iter(log)
            .filter_map(|captures| Self::frame_ref(&captures))
            .collect::<Vec<_>>();

        trace!("found {} frame references", frames.len());
        frames
    }
}

impl Debug for RegexScanner {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple(stringify!(RegexScanner))
            .field(&self.regex.as_str())
            .finish()
    }
}
