use std::fs::read;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use symbolicate::rewrite::Builder;
use symbolicate::rewrite::FrameRef;
use symbolicate::rewrite::FrameScanner;
use symbolicate::rewrite::ProgressEvent;
use symbolicate::rewrite::RegexScanner;
use symbolicate::rewrite::Rewriter;
use symbolicate::ErrorKind;
use symbolicate::FnProvider;
use symbolicate::RawSym;
use symbolicate::Result;
use symbolicate::SymbolMap;
use symbolicate::SymbolProvider as _;
use symbolicate::UNKNOWN_MARKER;

use test_log::test;
use test_tag::tag;


/// Read the Apple crash report used for testing.
fn crash_report() -> Vec<u8> {
    let path = Path::new(&env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("crash-report.log");
    read(path).unwrap()
}

/// Retrieve the symbols matching the Apple crash report used for
/// testing.
fn crash_report_symbols() -> SymbolMap {
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libobjc.A.dylib", [(0x2f00, "objc_msgSend")]);
    let () = symbols.insert(
        "MyApp",
        [
            (0x1a00, "main"),
            (0x2d00, "_ZN5MyApp6Logger5flushEv"),
            (0x2e00, "$s5MyApp14ViewControllerC11viewDidLoadyyF"),
        ],
    );
    let () = symbols.insert("libSystem.B.dylib", [(0x12000, "__semwait_signal")]);
    symbols
}


/// Check that we can symbolicate a complete Apple crash report.
#[test]
fn rewrite_apple_crash_report() {
    let log = crash_report();
    let rewriter = Builder::default()
        .set_scanner(RegexScanner::apple())
        .set_stepping(2)
        .build(crash_report_symbols());
    let rewritten = rewriter.rewrite(&log).unwrap();

    let log = String::from_utf8(log).unwrap();
    let logger_flush = if cfg!(feature = "demangle") {
        "MyApp::Logger::flush() + 0x7c"
    } else {
        "_ZN5MyApp6Logger5flushEv + 0x7c"
    };
    let expected = log
        .replace("0x33f0e000 + 12060", "objc_msgSend + 0x1c")
        .replace(
            "0x00001000 + 11824",
            "MyApp.ViewController.viewDidLoad + 0x30",
        )
        .replace("0x00001000 + 11644", logger_flush)
        .replace("0x30a5e000 + 63716", UNKNOWN_MARKER)
        .replace("0x00001000 + 6672", "main + 0x10")
        .replace("0x31d19000 + 73924", "__semwait_signal + 0xc4");
    assert_eq!(rewritten.text, expected);

    let events = rewritten.progress.collect::<Vec<_>>();
    let expected = [2, 4, 6]
        .map(|processed| ProgressEvent {
            processed,
            total: 6,
        })
        .to_vec();
    assert_eq!(events, expected);
}

/// Check that a log mixing known and unknown modules is rewritten
/// frame by frame, with progress reported every third frame.
#[cfg(feature = "demangle")]
#[tag(miri)]
#[test]
fn rewrite_mixed_modules() {
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libFoo", [(0x1000, "_Z3fooiv"), (0x2000, "_Z3barv")]);

    let log = (0..10)
        .map(|idx| {
            let module = if idx == 4 { "libBar" } else { "libFoo" };
            format!("#{idx} {module} + {:#x}\n", 0x1050 + idx * 0x400)
        })
        .collect::<String>();
    let rewriter = Builder::default().set_stepping(3).build(symbols);
    let rewritten = rewriter.rewrite(log.as_bytes()).unwrap();

    let lines = rewritten.text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "#0 foo(int, void) + 0x50");
    assert_eq!(lines[3], "#3 foo(int, void) + 0xc50");
    assert_eq!(lines[4], format!("#4 {UNKNOWN_MARKER}"));
    assert_eq!(lines[5], "#5 bar() + 0x450");
    assert_eq!(lines[9], "#9 bar() + 0x1450");

    let processed = rewritten
        .progress
        .map(|event| event.processed)
        .collect::<Vec<_>>();
    assert_eq!(processed, [3, 6, 9, 10]);
}

/// Check that logs are reproduced unchanged if no frame resolves and
/// unresolved frames are kept.
#[test]
fn rewrite_without_symbols() {
    let log = crash_report();

    for scanner in [RegexScanner::default(), RegexScanner::apple()] {
        let rewriter = Builder::default()
            .set_scanner(scanner)
            .keep_unresolved(true)
            .build(SymbolMap::new());
        let rewritten = rewriter.rewrite(&log).unwrap();
        assert_eq!(rewritten.text.as_bytes(), log.as_slice());
    }
}

/// Check that a custom frame pattern can be used.
#[tag(miri)]
#[test]
fn rewrite_custom_pattern() {
    let scanner =
        RegexScanner::new(r"\[(?P<module>[A-Za-z]+)@(?P<offset>0x[0-9a-f]+)\]").unwrap();
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("core", [(0x100, "dispatch"), (0x200, "idle")]);

    let rewriter = Builder::default().set_scanner(scanner).build(symbols);
    let rewritten = rewriter
        .rewrite(b"#0 [core@0x104] #1 [core@0x2ff] #2 [gpu@0x10] core + 0x104")
        .unwrap();
    assert_eq!(
        rewritten.text,
        "#0 dispatch + 0x4 #1 idle + 0xff #2 <unknown> core + 0x104"
    );
}

/// Check that frame references with offsets not representable as
/// addresses are left alone.
#[tag(miri)]
#[test]
fn rewrite_overflowing_offset() {
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libFoo", [(0x0, "start")]);

    let rewriter = Builder::default().set_stepping(1).build(symbols);
    let log = b"libFoo + 0x1ffffffffffffffff\nlibFoo + 99999999999999999999999\nlibFoo + 0x10\n";
    let rewritten = rewriter.rewrite(log).unwrap();
    assert_eq!(
        rewritten.text,
        "libFoo + 0x1ffffffffffffffff\nlibFoo + 99999999999999999999999\nstart + 0x10\n"
    );
    assert_eq!(rewritten.progress.total(), 1);
}

/// Make sure that a scanner reporting overlapping frames causes an
/// error.
#[tag(miri)]
#[test]
fn rewrite_overlapping_frames() {
    #[derive(Debug)]
    struct Overlapping;

    impl FrameScanner for Overlapping {
        fn scan<'log>(&self, log: &'log str) -> Vec<FrameRef<'log>> {
            vec![
                FrameRef {
                    module: log,
                    addr: 0,
                    span: 0..log.len(),
                },
                FrameRef {
                    module: log,
                    addr: 0,
                    span: 0..1,
                },
            ]
        }
    }

    let rewriter = Builder::default()
        .set_scanner(Overlapping)
        .build(SymbolMap::new());
    let err = rewriter.rewrite(b"libFoo + 0x10").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

/// Check that a single rewriter can be used from multiple threads,
/// with symbols being retrieved only once per module.
#[test]
fn rewrite_concurrently() {
    let requests = AtomicUsize::new(0);
    let symbols = crash_report_symbols();
    let provider = FnProvider::new(|module: &str| -> Result<Vec<RawSym>> {
        let _prev = requests.fetch_add(1, Ordering::Relaxed);
        symbols.raw_syms(module)
    });

    let log = crash_report();
    let rewriter = Builder::default()
        .set_scanner(RegexScanner::apple())
        .build(provider);
    let expected = rewriter.rewrite(&log).unwrap().text;

    let () = thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| rewriter.rewrite(&log).unwrap().text))
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });

    // libobjc.A.dylib, MyApp, UIKit, libSystem.B.dylib
    assert_eq!(requests.load(Ordering::Relaxed), 4);
    assert_eq!(rewriter.resolver().cached_modules().len(), 4);
}

/// Check that progress reported live matches the progress stream.
#[test]
fn rewrite_progress_consistency() {
    let log = (0..25)
        .map(|idx| format!("{idx} libFoo + {}\n", 0x1000 + idx * 4))
        .collect::<String>();
    let mut symbols = SymbolMap::new();
    let () = symbols.insert("libFoo", [(0x1000, "foo")]);
    let rewriter = Rewriter::<SymbolMap>::builder().set_stepping(7).build(symbols);

    let mut live = Vec::new();
    let text = rewriter
        .rewrite_with_progress(log.as_bytes(), |event| live.push(event))
        .unwrap();
    let rewritten = rewriter.rewrite(log.as_bytes()).unwrap();

    assert_eq!(text, rewritten.text);
    assert_eq!(live, rewritten.progress.collect::<Vec<_>>());
    assert_eq!(
        live.iter().map(|event| event.processed).collect::<Vec<_>>(),
        [7, 14, 21, 25]
    );
    assert_eq!(rewriter.stepping(), 7);
}
