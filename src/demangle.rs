//! Conversion of mangled symbol names into display names.
//!
//! Demangling is a total function: every input produces an output and
//! input that is not recognized as being mangled according to any of
//! the supported schemes, or that fails to decode, is reported as-is.
//!
//! ```
//! use symbolicate::demangle::demangle;
//! # #[cfg(feature = "demangle")]
//! assert_eq!(demangle("_ZN9wikipedia7article6formatEv"), "wikipedia::article::format()");
//! assert_eq!(demangle("$s4main3fooyyF"), "main.foo");
//! assert_eq!(demangle("objc_msgSend"), "objc_msgSend");
//! ```

use std::borrow::Cow;


/// A mangling scheme a symbol name may be encoded with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scheme {
    /// The Itanium C++ ABI mangling scheme, used by virtually all C++
    /// compilers outside of Windows (`_Z...`).
    Itanium,
    /// One of the Rust mangling schemes: the legacy scheme, which piggy
    /// backs on Itanium nested names but includes a hash (`_ZN...17h...E`),
    /// or the v0 scheme (`_R...`).
    Rust,
    /// The Swift mangling scheme (`$s...`, `_T0...`).
    Swift,
    /// The name does not appear to be mangled.
    Plain,
}

impl Scheme {
    /// Classify a name by the mangling scheme it appears to use.
    ///
    /// Classification only considers the overall shape of the name,
    /// i.e., a name classified as anything but [`Scheme::Plain`] may
    /// still fail to decode.
    pub fn classify(name: &str) -> Self {
        // Apple platforms prepend an additional underscore to all
        // symbols.
        let unprefixed = name.strip_prefix('_').unwrap_or(name);

        if is_rust_legacy(name) {
            Self::Rust
        } else if is_rust_v0(name) || is_rust_v0(unprefixed) {
            Self::Rust
        } else if name.starts_with("_Z") || name.starts_with("__Z") {
            Self::Itanium
        } else if SWIFT_PREFIXES
            .into_iter()
            .any(|prefix| name.starts_with(prefix) || unprefixed.starts_with(prefix))
        {
            Self::Swift
        } else {
            Self::Plain
        }
    }
}


const SWIFT_PREFIXES: [&str; 4] = ["$s", "$S", "$e", "_T0"];


/// Check whether `name` looks like a legacy Rust symbol, i.e., an
/// Itanium nested name whose last component is a hash.
fn is_rust_legacy(name: &str) -> bool {
    // Ignore any LLVM suffixes (`.llvm.1234`).
    let name = name.split('.').next().unwrap_or(name);
    let inner = if let Some(inner) = name.strip_prefix("_ZN") {
        inner
    } else if let Some(inner) = name.strip_prefix("__ZN") {
        inner
    } else {
        return false
    };

    inner
        .strip_suffix('E')
        .and_then(|inner| inner.get(inner.len().checked_sub(16 + 3)?..))
        .and_then(|hash| hash.strip_prefix("17h"))
        .map(|hash| hash.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Check whether `name` looks like a v0 Rust symbol.
fn is_rust_v0(name: &str) -> bool {
    name.strip_prefix("_R")
        .and_then(|rest| rest.bytes().next())
        .map(|b| b.is_ascii_uppercase())
        .unwrap_or(false)
}


#[cfg(feature = "demangle")]
fn demangle_itanium(name: &str) -> Option<String> {
    use cpp_demangle::DemangleOptions;
    use cpp_demangle::Symbol;

    // `cpp_demangle` expects the plain Itanium prefix.
    let name = if name.starts_with("__Z") {
        &name[1..]
    } else {
        name
    };

    let sym = Symbol::new(name).ok()?;
    sym.demangle(&DemangleOptions::default()).ok()
}

#[cfg(not(feature = "demangle"))]
fn demangle_itanium(_name: &str) -> Option<String> {
    None
}

#[cfg(feature = "demangle")]
fn demangle_rust(name: &str) -> Option<String> {
    let sym = rustc_demangle::try_demangle(name).ok()?;
    // The alternate format omits the hash.
    Some(format!("{sym:#}"))
}

#[cfg(not(feature = "demangle"))]
fn demangle_rust(_name: &str) -> Option<String> {
    None
}

/// Decode the context path of a Swift symbol, e.g., `main.foo` for
/// `$s4main3fooyyF`.
///
/// Only the leading run of length-prefixed identifiers (and the kinds of
/// nominal types in between) is decoded, which names the entity but not
/// its type. `None` is returned if not even a single identifier could
/// be decoded.
fn demangle_swift(name: &str) -> Option<String> {
    let unprefixed = name.strip_prefix('_').unwrap_or(name);
    let mut rest = SWIFT_PREFIXES
        .into_iter()
        .find_map(|prefix| name.strip_prefix(prefix).or_else(|| unprefixed.strip_prefix(prefix)))?;

    let mut idents = Vec::new();
    loop {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        // A zero length marks a word substitution or Punycode encoded
        // identifier, neither of which we support.
        if digits == 0 || rest.starts_with('0') {
            break
        }

        let len = match rest[..digits].parse::<usize>() {
            Ok(len) => len,
            Err(_) => break,
        };
        let ident = match rest[digits..].get(..len) {
            Some(ident) => ident,
            None => break,
        };
        let () = idents.push(ident);
        rest = &rest[digits + len..];

        // Nominal types are followed by their kind (class, struct,
        // enum, protocol). Skip it if it is followed by a nested
        // identifier.
        if let Some(nested) = rest.strip_prefix(|c: char| matches!(c, 'C' | 'V' | 'O' | 'P')) {
            if nested.starts_with(|c: char| c.is_ascii_digit()) {
                rest = nested;
            }
        }
    }

    if idents.is_empty() {
        None
    } else {
        Some(idents.join("."))
    }
}


/// Demangle a symbol name, if it is mangled according to a known
/// scheme.
///
/// The function never fails: names that are not mangled, or that
/// appear mangled but cannot be decoded, are returned unchanged. Itanium
/// C++ and Rust names are only demangled if the `demangle` feature is
/// enabled.
pub fn demangle(name: &str) -> Cow<'_, str> {
    let demangled = match Scheme::classify(name) {
        Scheme::Itanium => demangle_itanium(name),
        Scheme::Rust => demangle_rust(name).or_else(|| {
            // Legacy Rust names are valid Itanium names as well.
            if name.contains("_ZN") {
                demangle_itanium(name)
            } else {
                None
            }
        }),
        Scheme::Swift => demangle_swift(name),
        Scheme::Plain => None,
    };

    demangled.map_or(Cow::Borrowed(name), Cow::Owned)
}

/// Check whether `name` appears to be mangled according to any of the
/// supported schemes.
#[inline]
pub fn is_mangled(name: &str) -> bool {
    Scheme::classify(name) != Scheme::Plain
}
