use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;

use crate::cache::TableCache;
use crate::log::debug;
use crate::log::warn;
use crate::Addr;
use crate::SymbolProvider;
use crate::SymbolTable;


/// The result of address resolution by a [`Resolver`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedSym {
    /// The raw, possibly mangled, name of the symbol that an address
    /// belongs to.
    pub name: String,
    /// The module relative address at which the symbol starts.
    pub addr: Addr,
    /// The byte offset of the resolved address from the start of the
    /// symbol (i.e., from `addr`).
    ///
    /// E.g., when resolving address 0x1050 of a function that starts
    /// at 0x1000, the offset will be 0x50.
    pub offset: u64,
    /// The symbol's size, if available.
    pub size: Option<usize>,
    /// Whether the resolved address lies past the known extent of the
    /// symbol.
    ///
    /// Resolution is best-effort: crash addresses may legitimately lie
    /// just past the last instruction of a function, e.g., when the
    /// last instruction is a call that does not return. Hence the
    /// closest preceding symbol is reported regardless.
    pub past_end: bool,
}


/// An enumeration used as reporting vehicle for address resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolved {
    /// The address was resolved to the provided symbol.
    Sym(ResolvedSym),
    /// The address could not be resolved, either because the module
    /// is unknown or because no symbol precedes the address.
    Unknown,
}

impl Resolved {
    /// Convert the object into a [`ResolvedSym`] reference, if the
    /// corresponding variant is active.
    #[inline]
    pub fn as_sym(&self) -> Option<&ResolvedSym> {
        match self {
            Self::Sym(sym) => Some(sym),
            Self::Unknown => None,
        }
    }

    /// Convert the object into a [`ResolvedSym`] object, if the
    /// corresponding variant is active.
    #[inline]
    pub fn into_sym(self) -> Option<ResolvedSym> {
        match self {
            Self::Sym(sym) => Some(sym),
            Self::Unknown => None,
        }
    }
}


/// A resolver of module relative addresses to symbols.
///
/// The resolver retrieves symbols from a [`SymbolProvider`] and indexes
/// them in one [`SymbolTable`] per module. Tables are built lazily, on
/// first reference of a module (or eagerly via
/// [`Resolver::prefetch`]), at most once, and cached for the lifetime
/// of the resolver.
///
/// A provider failing to produce symbols for a module is not an error:
/// the failure is logged and all addresses in this module resolve to
/// [`Resolved::Unknown`].
pub struct Resolver<P> {
    provider: P,
    cache: TableCache,
}

impl<P> Resolver<P>
where
    P: SymbolProvider,
{
    /// Create a new [`Resolver`] using the provided symbol provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: TableCache::new(),
        }
    }

    fn build_table(&self, module: &str) -> Option<SymbolTable> {
        match self.provider.raw_syms(module) {
            Ok(syms) => Some(SymbolTable::build(module, syms)),
            Err(err) => {
                warn!("failed to retrieve symbols for module `{module}`: {err:#}; ignoring...");
                None
            }
        }
    }

    /// Retrieve the symbol table for `module`, building it if
    /// necessary.
    ///
    /// `None` is returned if the provider could not produce symbols for
    /// the module.
    pub fn table(&self, module: &str) -> Option<Arc<SymbolTable>> {
        self.cache
            .get_or_build(module, || self.build_table(module))
    }

    /// Eagerly build the symbol tables of the provided modules.
    ///
    /// The function returns the number of modules for which a table is
    /// available.
    pub fn prefetch<'m, M>(&self, modules: M) -> usize
    where
        M: IntoIterator<Item = &'m str>,
    {
        modules
            .into_iter()
            .filter(|module| self.table(module).is_some())
            .count()
    }

    /// Resolve `addr` in `module` to the closest preceding symbol.
    #[cfg_attr(feature = "tracing", crate::log::instrument(skip_all, fields(module = module, addr = format_args!("{addr:#x}"))))]
    pub fn resolve(&self, module: &str, addr: Addr) -> Resolved {
        let table = if let Some(table) = self.table(module) {
            table
        } else {
            return Resolved::Unknown
        };

        match table.lookup(addr) {
            Some(sym) => {
                let resolved = ResolvedSym {
                    name: sym.name.to_string(),
                    addr: sym.addr,
                    offset: addr - sym.addr,
                    size: sym.size,
                    past_end: sym.is_past_end(addr),
                };
                Resolved::Sym(resolved)
            }
            None => {
                debug!("no symbol precedes {addr:#x} in module `{module}`");
                Resolved::Unknown
            }
        }
    }
}

impl<P> Resolver<P> {
    /// Retrieve the identifiers of all modules whose symbols have been
    /// requested so far, in lexicographical order.
    ///
    /// Modules for which the provider failed are included.
    #[inline]
    pub fn cached_modules(&self) -> Vec<Box<str>> {
        self.cache.modules()
    }

    /// Check whether symbols for `module` have been requested already.
    #[inline]
    pub fn is_cached(&self, module: &str) -> bool {
        self.cache.contains(module)
    }

    /// Retrieve the provider backing this resolver.
    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> Debug for Resolver<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct(stringify!(Resolver))
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
