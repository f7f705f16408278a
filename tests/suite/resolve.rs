use std::sync::Arc;

use symbolicate::Addr;
use symbolicate::Error;
use symbolicate::ErrorKind;
use symbolicate::FnProvider;
use symbolicate::RawSym;
use symbolicate::Resolved;
use symbolicate::Resolver;
use symbolicate::Result;
use symbolicate::SymbolMap;
use symbolicate::SymbolProvider;
use symbolicate::SymbolTable;

use test_log::test;
use test_tag::tag;


/// Check that every address at or above the lowest start address
/// resolves to the closest preceding symbol.
#[tag(miri)]
#[test]
fn resolve_nearest_preceding() {
    let starts = [0x1000 as Addr, 0x1010, 0x1100, 0x1101, 0x2000];
    // Register symbols out of order, to make sure that sorting is
    // not the provider's responsibility.
    let mut symbols = SymbolMap::new();
    let () = symbols.insert(
        "libFoo",
        starts
            .iter()
            .rev()
            .map(|addr| (*addr, format!("sym_{addr:x}"))),
    );
    let resolver = Resolver::new(symbols);

    for addr in (0xff0..0x2040).step_by(3) {
        let expected = starts.iter().rev().find(|start| **start <= addr);
        match (resolver.resolve("libFoo", addr), expected) {
            (Resolved::Sym(sym), Some(start)) => {
                assert_eq!(sym.addr, *start, "{addr:#x}");
                assert_eq!(sym.offset, addr - start);
                assert_eq!(sym.name, format!("sym_{start:x}"));
            }
            (Resolved::Unknown, None) => (),
            (resolved, expected) => panic!("{addr:#x}: {resolved:?} vs. {expected:?}"),
        }
    }
}

/// Check that the scenario of a two symbol module resolves as
/// expected.
#[tag(miri)]
#[test]
fn resolve_two_symbol_module() {
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libFoo", [(0x1000, "_Z3fooiv"), (0x2000, "_Z3barv")]);
    let resolver = Resolver::new(symbols);

    let sym = resolver.resolve("libFoo", 0x1050).into_sym().unwrap();
    assert_eq!(sym.addr, 0x1000);
    assert_eq!(sym.name, "_Z3fooiv");
    assert_eq!(sym.offset, 0x50);

    #[cfg(feature = "demangle")]
    assert_eq!(symbolicate::demangle::demangle(&sym.name), "foo(int, void)");

    assert_eq!(resolver.resolve("libFoo", 0x0500), Resolved::Unknown);
    assert_eq!(resolver.resolve("libBar", 0x1050), Resolved::Unknown);
}

/// Check that the first symbol registered wins if multiple share an
/// address.
#[tag(miri)]
#[test]
fn resolve_duplicate_addresses() {
    let table = SymbolTable::build(
        "libFoo",
        [
            RawSym::new(0x1000, "first"),
            RawSym::new(0x1000, "second"),
            RawSym::new(0x0800, "before"),
            RawSym::new(0x1000, "third"),
        ],
    );
    assert_eq!(table.len(), 2);
    assert_eq!(&*table.lookup(0x1234).unwrap().name, "first");
    assert_eq!(&*table.lookup(0x0fff).unwrap().name, "before");
    assert_eq!(table.find_addr("second").len(), 0);
}

/// Make sure that provider failures are confined to the module in
/// question.
#[tag(miri)]
#[test]
fn resolve_provider_failure() {
    let provider = FnProvider::new(|module: &str| -> Result<Vec<RawSym>> {
        match module {
            "libFoo" => Ok(vec![RawSym::new(0x1000, "foo")]),
            "libCorrupt" => Err(Error::with_invalid_data("symbol file is truncated")),
            _ => Err(Error::with_not_found(format!("no symbols for `{module}`"))),
        }
    });
    let resolver = Resolver::new(provider);

    assert_eq!(resolver.resolve("libCorrupt", 0x1000), Resolved::Unknown);
    assert_eq!(resolver.resolve("libMissing", 0x1000), Resolved::Unknown);
    assert!(resolver.table("libCorrupt").is_none());
    assert!(resolver.resolve("libFoo", 0x1000).as_sym().is_some());

    let err = resolver.provider().raw_syms("libCorrupt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

/// Check that resolvers can share a provider and hand out tables
/// that outlive them.
#[tag(miri)]
#[test]
fn resolve_shared_provider() {
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libFoo", [(0x10, "foo")]);
    let symbols = Arc::new(symbols);

    let table = {
        let resolver = Resolver::new(Arc::clone(&symbols));
        let table = resolver.table("libFoo").unwrap();
        assert!(Arc::ptr_eq(&table, &resolver.table("libFoo").unwrap()));
        table
    };
    assert_eq!(table.module(), "libFoo");

    let resolver = Resolver::new(&*symbols);
    assert_eq!(resolver.resolve("libFoo", 0x18).into_sym().unwrap().offset, 8);
}
