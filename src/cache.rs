use std::collections::HashMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::PoisonError;

use crate::SymbolTable;


/// The cached state of a single module: either its symbol table or
/// `None`, if no table could be built for it.
type Slot = OnceLock<Option<Arc<SymbolTable>>>;


/// An insert-only cache of per-module symbol tables.
///
/// Each table is built at most once, even if multiple threads request
/// the same module concurrently, and entries are never evicted.
pub(crate) struct TableCache {
    /// The map from module identifiers to their build-once slots.
    ///
    /// The lock only guards the map itself. Tables are built outside
    /// of it, so that building a table for one module does not block
    /// lookups into another.
    slots: Mutex<HashMap<Box<str>, Arc<Slot>>>,
}

impl TableCache {
    /// Create a new, empty `TableCache` instance.
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Box<str>, Arc<Slot>>> {
        // Slots are only ever inserted, never modified in place, so a
        // panic while holding the lock cannot leave the map in an
        // inconsistent state.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retrieve the table for `module`, if already present, or build
    /// it using `init` and return it then.
    ///
    /// A `None` produced by `init` is cached as well, meaning that
    /// `init` is never invoked again for the same module.
    pub(crate) fn get_or_build<F>(&self, module: &str, init: F) -> Option<Arc<SymbolTable>>
    where
        F: FnOnce() -> Option<SymbolTable>,
    {
        let slot = {
            let mut slots = self.slots();
            if let Some(slot) = slots.get(module) {
                Arc::clone(slot)
            } else {
                let slot = Arc::new(Slot::new());
                let _prev = slots.insert(Box::from(module), Arc::clone(&slot));
                slot
            }
        };

        slot.get_or_init(|| init().map(Arc::new)).clone()
    }

    /// Check whether `module` has been processed, irrespective of
    /// whether a table could be built for it.
    pub(crate) fn contains(&self, module: &str) -> bool {
        self.slots()
            .get(module)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    /// Retrieve the identifiers of all modules processed so far, in
    /// lexicographical order.
    pub(crate) fn modules(&self) -> Vec<Box<str>> {
        let mut modules = self
            .slots()
            .iter()
            .filter(|(_module, slot)| slot.get().is_some())
            .map(|(module, _slot)| module.clone())
            .collect::<Vec<_>>();
        let () = modules.sort();
        modules
    }
}

impl Debug for TableCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_list().entries(self.modules()).finish()
    }
}
