use std::env;

use anyhow::Context as _;
use anyhow::Result;

use grev::git_revision_auto;


/// Embed the program version, including the git revision if available,
/// as `VERSION` environment variable.
fn main() -> Result<()> {
    let dir = env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR is not set")?;
    let version = env!("CARGO_PKG_VERSION");

    if let Some(git_rev) = git_revision_auto(dir)? {
        println!("cargo:rustc-env=VERSION={version} ({git_rev})");
    } else {
        println!("cargo:rustc-env=VERSION={version}");
    }
    Ok(())
}
