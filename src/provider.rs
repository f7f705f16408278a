use std::collections::HashMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::rc::Rc;
use std::sync::Arc;

use crate::Addr;
use crate::Error;
use crate::Result;


/// A symbol as reported by a [`SymbolProvider`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RawSym {
    /// The module relative start address of the symbol.
    pub addr: Addr,
    /// The raw, possibly mangled, name of the symbol.
    pub name: String,
    /// The symbol's size, if known.
    pub size: Option<usize>,
}

impl RawSym {
    /// Create a new [`RawSym`] without size information.
    #[inline]
    pub fn new(addr: Addr, name: impl Into<String>) -> Self {
        Self {
            addr,
            name: name.into(),
            size: None,
        }
    }

    /// Create a new [`RawSym`] of the given size.
    #[inline]
    pub fn with_size(addr: Addr, name: impl Into<String>, size: usize) -> Self {
        Self {
            addr,
            name: name.into(),
            size: Some(size),
        }
    }
}

impl<N> From<(Addr, N)> for RawSym
where
    N: Into<String>,
{
    #[inline]
    fn from((addr, name): (Addr, N)) -> Self {
        Self::new(addr, name)
    }
}


/// The interface of anything providing raw symbols for modules.
///
/// Providers are consulted at most once per module and
/// [`Resolver`][crate::Resolver]. They report symbols in a stable order,
/// as that order decides which symbol wins when several share an
/// address.
pub trait SymbolProvider {
    /// Retrieve all symbols of the module identified by `module`.
    ///
    /// A module the provider knows nothing about should be reported as
    /// an error of kind [`ErrorKind::NotFound`][crate::ErrorKind::NotFound].
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>>;
}

impl<P> SymbolProvider for &P
where
    P: SymbolProvider + ?Sized,
{
    #[inline]
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        (**self).raw_syms(module)
    }
}

impl<P> SymbolProvider for Box<P>
where
    P: SymbolProvider + ?Sized,
{
    #[inline]
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        (**self).raw_syms(module)
    }
}

impl<P> SymbolProvider for Rc<P>
where
    P: SymbolProvider + ?Sized,
{
    #[inline]
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        (**self).raw_syms(module)
    }
}

impl<P> SymbolProvider for Arc<P>
where
    P: SymbolProvider + ?Sized,
{
    #[inline]
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        (**self).raw_syms(module)
    }
}


/// A [`SymbolProvider`] backed by a closure.
///
/// ```
/// use symbolicate::Error;
/// use symbolicate::FnProvider;
/// use symbolicate::RawSym;
/// use symbolicate::SymbolProvider as _;
///
/// let provider = FnProvider::new(|module: &str| match module {
///     "main" => Ok(vec![RawSym::new(0x1000, "main")]),
///     _ => Err(Error::with_not_found(format!("`{module}` not found"))),
/// });
/// assert_eq!(provider.raw_syms("main").unwrap().len(), 1);
/// assert!(provider.raw_syms("libc").is_err());
/// ```
#[derive(Clone, Copy)]
pub struct FnProvider<F>(F);

impl<F> FnProvider<F>
where
    F: Fn(&str) -> Result<Vec<RawSym>>,
{
    /// Create a new [`FnProvider`] wrapping the provided closure.
    #[inline]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> SymbolProvider for FnProvider<F>
where
    F: Fn(&str) -> Result<Vec<RawSym>>,
{
    #[inline]
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        (self.0)(module)
    }
}

impl<F> Debug for FnProvider<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("FnProvider(..)")
    }
}


/// An in-memory [`SymbolProvider`], mapping module identifiers to
/// their symbols.
#[derive(Clone, Debug, Default)]
pub struct SymbolMap {
    modules: HashMap<Box<str>, Vec<RawSym>>,
}

impl SymbolMap {
    /// Create a new, empty [`SymbolMap`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add symbols for `module`.
    ///
    /// Symbols are appended to any already registered for the same
    /// module, preserving the order of registration.
    pub fn insert<I, S>(&mut self, module: &str, syms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<RawSym>,
    {
        let entry = self.modules.entry(Box::from(module)).or_default();
        let () = entry.extend(syms.into_iter().map(S::into));
    }

    /// Check whether symbols have been registered for `module`.
    #[inline]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Iterate over the identifiers of all modules known to the map.
    #[inline]
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|module| &**module)
    }
}

impl SymbolProvider for SymbolMap {
    fn raw_syms(&self, module: &str) -> Result<Vec<RawSym>> {
        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| Error::with_not_found(format!("no symbols known for module `{module}`")))
    }
}

impl<'m, S> FromIterator<(&'m str, S)> for SymbolMap
where
    S: Into<RawSym>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (&'m str, S)>,
    {
        let mut map = Self::new();
        for (module, sym) in iter {
            let () = map.insert(module, [sym]);
        }
        map
    }
}
