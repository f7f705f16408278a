use std::borrow::Cow;

use symbolicate::demangle::demangle;
use symbolicate::demangle::is_mangled;
use symbolicate::demangle::Scheme;

use test_tag::tag;


/// Check that demangling never fails, irrespective of the input.
#[tag(miri)]
#[test]
fn demangle_total() {
    let names = [
        "",
        "_",
        "__",
        "_Z",
        "_ZZ",
        "_ZN",
        "_ZNK",
        "_R",
        "_RN",
        "$s",
        "$s9",
        "$s99999999999999999999999",
        "_T0",
        "_$s",
        "\u{0}",
        "ümlaut",
        "$s3ü",
        "_ZN4core3fmt5write17h0123456789abcdeE",
    ];

    for name in names {
        let demangled = demangle(name);
        if !is_mangled(name) {
            assert_eq!(demangled, name);
        }
    }
}

/// Check that names from various languages are demangled as expected.
#[test]
fn demangle_mixed() {
    let names = [
        ("objc_msgSend", "objc_msgSend"),
        ("-[UIApplication _run]", "-[UIApplication _run]"),
        ("$s5MyApp11AppDelegateC11applicationyyF", "MyApp.AppDelegate.application"),
        ("_$s5MyApp4UserV4nameSSvg", "MyApp.User.name"),
    ];

    for (name, expected) in names {
        assert_eq!(demangle(name), expected, "{name}");
    }
}

/// Check that C++ and Rust names are demangled when support is
/// available.
#[cfg(feature = "demangle")]
#[test]
fn demangle_native() {
    let names = [
        ("_ZN5MyApp6Logger5flushEv", "MyApp::Logger::flush()"),
        ("__ZN5MyApp6Logger5flushEv", "MyApp::Logger::flush()"),
        ("_ZN3std2rt10lang_start17h0123456789abcdefE", "std::rt::lang_start"),
        ("_RNvNtCs1234_7mycrate3foo3bar", "mycrate::foo::bar"),
    ];

    for (name, expected) in names {
        let demangled = demangle(name);
        assert!(matches!(demangled, Cow::Owned(_)), "{name}");
        assert_eq!(demangled, expected, "{name}");
    }
}

/// Check that the classification of names is exposed.
#[tag(miri)]
#[test]
fn demangle_classification() {
    assert_eq!(Scheme::classify("_Z3fooi"), Scheme::Itanium);
    assert_eq!(
        Scheme::classify("_ZN3std2rt10lang_start17h0123456789abcdefE"),
        Scheme::Rust
    );
    assert_eq!(Scheme::classify("$s4main3fooyyF"), Scheme::Swift);
    assert_eq!(Scheme::classify("main"), Scheme::Plain);
}
