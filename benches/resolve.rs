use std::hint::black_box;

use symbolicate::Addr;
use symbolicate::RawSym;
use symbolicate::Resolver;
use symbolicate::SymbolMap;
use symbolicate::SymbolTable;

use criterion::measurement::Measurement;
use criterion::Bencher;
use criterion::BenchmarkGroup;


const SYM_COUNT: usize = 100_000;


/// Create `SYM_COUNT` synthetic symbols, spaced 0x40 bytes apart and
/// reported in reverse address order.
fn synthetic_syms() -> Vec<RawSym> {
    (0..SYM_COUNT)
        .rev()
        .map(|idx| RawSym::new(0x1000 + idx as Addr * 0x40, format!("_Z6func{idx:05}v")))
        .collect()
}

/// Build a symbol table from a large number of unordered symbols.
fn build_symtab() {
    let syms = synthetic_syms();
    let table = SymbolTable::build(black_box("libBig"), black_box(syms));
    assert_eq!(table.len(), SYM_COUNT);
}

/// Resolve addresses in a module whose symbol table has already been
/// built.
fn resolve_cached<M>(b: &mut Bencher<'_, M>)
where
    M: Measurement,
{
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libBig", synthetic_syms());
    let resolver = Resolver::new(symbols);
    let _table = resolver.table("libBig").unwrap();

    let addrs = (0..1024)
        .map(|idx| 0x1000 + idx * 0x61f)
        .collect::<Vec<Addr>>();

    let () = b.iter(|| {
        for addr in &addrs {
            let resolved = resolver.resolve(black_box("libBig"), black_box(*addr));
            assert!(resolved.as_sym().is_some());
        }
    });
}


pub fn benchmark<M>(group: &mut BenchmarkGroup<'_, M>)
where
    M: Measurement,
{
    bench_fn!(group, build_symtab);
    bench_sub_fn!(group, resolve_cached);
}
