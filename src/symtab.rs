use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::slice;
use std::sync::OnceLock;

use crate::log::debug;
use crate::util::find_equal_range_by_key;
use crate::util::find_lower_bound_by_key;
use crate::Addr;
use crate::RawSym;


/// A symbol as stored in a [`SymbolTable`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SymbolRecord {
    /// The module relative address at which the symbol starts.
    pub addr: Addr,
    /// The raw, possibly mangled, name of the symbol.
    pub name: Box<str>,
    /// The symbol's size, if the provider knows it.
    pub size: Option<usize>,
}

impl SymbolRecord {
    /// Check whether `addr` lies past the known extent of the symbol.
    ///
    /// Symbols without size information never report an address as
    /// being past their end. A size of zero is treated the same way, as
    /// it commonly denotes a label with unknown extent.
    #[inline]
    pub fn is_past_end(&self, addr: Addr) -> bool {
        match self.size {
            Some(0) | None => false,
            Some(size) => addr.saturating_sub(self.addr) >= size as u64,
        }
    }
}

impl From<RawSym> for SymbolRecord {
    #[inline]
    fn from(other: RawSym) -> Self {
        let RawSym { addr, name, size } = other;
        Self {
            addr,
            name: name.into_boxed_str(),
            size,
        }
    }
}


/// An immutable index over the symbols of a single module.
///
/// Records are kept sorted by start address, with each address
/// appearing at most once, so that addresses can be mapped to the
/// closest preceding symbol via binary search.
pub struct SymbolTable {
    /// The identifier of the module the symbols belong to.
    module: Box<str>,
    /// The symbols, sorted by address.
    syms: Box<[SymbolRecord]>,
    /// An index over `syms` that is sorted by name.
    by_name_idx: OnceLock<Box<[usize]>>,
}

impl SymbolTable {
    /// Build a [`SymbolTable`] for `module` from an unordered collection
    /// of raw symbols.
    ///
    /// When multiple symbols share an address, the one appearing first
    /// in `syms` wins and all others are discarded. Building from an
    /// empty collection produces an empty table, in which every lookup
    /// misses.
    pub fn build<I, S>(module: &str, syms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RawSym>,
    {
        let mut syms = syms
            .into_iter()
            .map(|sym| SymbolRecord::from(sym.into()))
            .collect::<Vec<_>>();
        let count = syms.len();

        // A stable sort keeps symbols with equal addresses in the
        // order in which the provider reported them.
        let () = syms.sort_by_key(|sym| sym.addr);
        let () = syms.dedup_by_key(|sym| sym.addr);

        debug!(
            "built symbol table for `{module}` with {} symbols ({} duplicates discarded)",
            syms.len(),
            count - syms.len()
        );

        Self {
            module: Box::from(module),
            syms: syms.into_boxed_slice(),
            by_name_idx: OnceLock::new(),
        }
    }

    /// Find the symbol covering `addr`, i.e., the one with the greatest
    /// start address not exceeding it.
    ///
    /// `None` is returned if `addr` is smaller than all start addresses
    /// or if the table is empty.
    #[inline]
    pub fn lookup(&self, addr: Addr) -> Option<&SymbolRecord> {
        let idx = find_lower_bound_by_key(&self.syms, addr, |sym| sym.addr)?;
        self.syms.get(idx)
    }

    /// Find all symbols with the given raw name.
    ///
    /// Symbols are reported in address order.
    pub fn find_addr(&self, name: &str) -> impl ExactSizeIterator<Item = &SymbolRecord> {
        let by_name_idx = self
            .by_name_idx
            .get_or_init(|| Self::create_by_name_idx(&self.syms));

        let range = find_equal_range_by_key(by_name_idx, name, |idx| &*self.syms[*idx].name);
        by_name_idx[range].iter().map(|idx| &self.syms[*idx])
    }

    fn create_by_name_idx(syms: &[SymbolRecord]) -> Box<[usize]> {
        let mut by_name_idx = (0..syms.len()).collect::<Box<[_]>>();
        let () = by_name_idx.sort_by(|idx1, idx2| {
            let sym1 = &syms[*idx1];
            let sym2 = &syms[*idx2];
            sym1.name
                .cmp(&sym2.name)
                .then_with(|| sym1.addr.cmp(&sym2.addr))
        });

        by_name_idx
    }

    /// Retrieve the identifier of the module this table belongs to.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Retrieve the number of symbols in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.syms.len()
    }

    /// Check whether the table contains no symbols at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    /// Iterate over all symbols, in ascending address order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, SymbolRecord> {
        self.syms.iter()
    }
}

impl<'tab> IntoIterator for &'tab SymbolTable {
    type Item = &'tab SymbolRecord;
    type IntoIter = slice::Iter<'tab, SymbolRecord>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Debug for SymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "SymbolTable(\"{}\", {} symbols)", self.module, self.syms.len())
    }
}
