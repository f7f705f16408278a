use std::borrow::Borrow;
use std::borrow::Cow;
use std::error;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::ops::Deref;
use std::str;


mod private {
    use super::*;

    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
    impl Sealed for &'static str {}
    impl Sealed for String {}
    impl Sealed for Error {}
}


/// A `str` replacement whose owned representation is a `Box<str>` and
/// not a `String`.
#[derive(Debug)]
#[repr(transparent)]
#[doc(hidden)]
pub struct Str(str);

impl ToOwned for Str {
    type Owned = Box<str>;

    #[inline]
    fn to_owned(&self) -> Self::Owned {
        self.0.to_string().into_boxed_str()
    }
}

impl Borrow<Str> for Box<str> {
    #[inline]
    fn borrow(&self) -> &Str {
        // SAFETY: `Str` is `repr(transparent)` and so `&str` and `&Str`
        //         can trivially be converted into each other.
        unsafe { &*(self.deref() as *const str as *const Str) }
    }
}

impl Deref for Str {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// For convenient use in `format!`, for example.
impl Display for Str {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}


/// A helper trait to abstracting over various string types, allowing
/// for conversion into a `Cow<'static, Str>`. This is the `Cow` enabled
/// equivalent of `ToString`.
pub trait IntoCowStr {
    /// Convert the object into a `Cow<'static, Str>`.
    fn into_cow_str(self) -> Cow<'static, Str>;
}

impl IntoCowStr for &'static str {
    fn into_cow_str(self) -> Cow<'static, Str> {
        // SAFETY: `Str` is `repr(transparent)` and so `&str` and `&Str`
        //         can trivially be converted into each other.
        let other = unsafe { &*(self as *const str as *const Str) };
        Cow::Borrowed(other)
    }
}

impl IntoCowStr for String {
    fn into_cow_str(self) -> Cow<'static, Str> {
        Cow::Owned(self.into_boxed_str())
    }
}


/// The kinds of errors this crate reports.
///
/// This is a subset of [`std::io::ErrorKind`], limited to what can
/// actually surface from the crate.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An entity was not found, often a module.
    NotFound,
    /// Data not valid for the operation were encountered, e.g., a log
    /// that is not valid UTF-8.
    InvalidData,
    /// A parameter was incorrect.
    InvalidInput,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "entity not found",
            Self::InvalidData => "invalid data",
            Self::InvalidInput => "invalid input parameter",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}


enum ErrorImpl {
    Utf8(str::Utf8Error),
    Kind {
        kind: ErrorKind,
        message: Cow<'static, Str>,
    },
    Context {
        context: Cow<'static, Str>,
        source: Box<ErrorImpl>,
    },
}

impl ErrorImpl {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Utf8(..) => ErrorKind::InvalidData,
            Self::Kind { kind, .. } => *kind,
            Self::Context { source, .. } => source.kind(),
        }
    }

    fn source(&self) -> Option<&ErrorImpl> {
        match self {
            Self::Context { source, .. } => Some(source),
            Self::Utf8(..) | Self::Kind { .. } => None,
        }
    }

    /// Format this one layer of the error, without its sources.
    fn fmt_layer(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Utf8(error) => Display::fmt(error, f),
            Self::Kind { message, .. } => Display::fmt(message, f),
            Self::Context { context, .. } => Display::fmt(context, f),
        }
    }
}


/// The error type used by the library.
///
/// Errors generally form a chain, with higher-level errors typically
/// providing additional context for lower level ones. E.g., a failure
/// to read a log may wrap the UTF-8 decoding error describing why.
///
/// The [`Display`] representation of an error only reports the
/// outermost layer. Use the alternate form (`{:#}`) to print the
/// entire chain, separated by `: `. The [`Debug`] representation
/// lists all causes.
pub struct Error {
    error: Box<ErrorImpl>,
}

impl Error {
    fn with_kind<M>(kind: ErrorKind, message: M) -> Self
    where
        M: IntoCowStr,
    {
        Self {
            error: Box::new(ErrorImpl::Kind {
                kind,
                message: message.into_cow_str(),
            }),
        }
    }

    /// Create an [`Error`] of kind [`ErrorKind::NotFound`].
    #[inline]
    pub fn with_not_found<M>(message: M) -> Self
    where
        M: IntoCowStr,
    {
        Self::with_kind(ErrorKind::NotFound, message)
    }

    /// Create an [`Error`] of kind [`ErrorKind::InvalidData`].
    #[inline]
    pub fn with_invalid_data<M>(message: M) -> Self
    where
        M: IntoCowStr,
    {
        Self::with_kind(ErrorKind::InvalidData, message)
    }

    /// Create an [`Error`] of kind [`ErrorKind::InvalidInput`].
    #[inline]
    pub fn with_invalid_input<M>(message: M) -> Self
    where
        M: IntoCowStr,
    {
        Self::with_kind(ErrorKind::InvalidInput, message)
    }

    /// Retrieve the kind of the innermost error in the chain.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    fn layer_context(self, context: Cow<'static, Str>) -> Self {
        Self {
            error: Box::new(ErrorImpl::Context {
                context,
                source: self.error,
            }),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let () = self.error.fmt_layer(f)?;

        if f.alternate() {
            let mut error = self.error.source();
            while let Some(err) = error {
                let () = write!(f, ": ")?;
                let () = err.fmt_layer(f)?;
                error = err.source();
            }
        }
        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let () = write!(f, "Error: ")?;
        let () = self.error.fmt_layer(f)?;

        if let Some(source) = self.error.source() {
            let () = f.write_str("\n\nCaused by:")?;

            let mut error = Some(source);
            while let Some(err) = error {
                let () = write!(f, "\n    ")?;
                let () = err.fmt_layer(f)?;
                error = err.source();
            }
        }
        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.error.deref() {
            ErrorImpl::Utf8(error) => Some(error),
            ErrorImpl::Kind { .. } | ErrorImpl::Context { .. } => None,
        }
    }
}

impl From<str::Utf8Error> for Error {
    fn from(other: str::Utf8Error) -> Self {
        Self {
            error: Box::new(ErrorImpl::Utf8(other)),
        }
    }
}


/// A trait providing ergonomic chaining capabilities to [`Error`].
pub trait ErrorExt: private::Sealed {
    /// The output type produced by [`context`](Self::context) and
    /// [`with_context`](Self::with_context).
    type Output;

    /// Add context to this error.
    // If we had specialization of sorts we could be more lenient as to
    // what we can accept, but for now this method always works with
    // static strings and nothing else.
    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr;

    /// Add context to this error, using a closure for lazy evaluation.
    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C;
}

impl ErrorExt for Error {
    type Output = Error;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr,
    {
        self.layer_context(context.into_cow_str())
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C,
    {
        self.layer_context(f().into_cow_str())
    }
}

impl<T, E> ErrorExt for Result<T, E>
where
    E: ErrorExt,
{
    type Output = Result<T, E::Output>;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(err.context(context)),
        }
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(err.with_context(f)),
        }
    }
}
