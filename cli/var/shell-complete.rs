#![allow(clippy::let_unit_value)]

use std::io::stdout;

use clap::CommandFactory as _;
use clap::Parser;

use clap_complete::generate;
use clap_complete::Shell;


#[allow(unused)]
mod prog {
    include!("../src/args.rs");
}


/// Generate a shell completion script for the `symbolicate` program.
#[derive(Debug, Parser)]
struct Args {
    /// The shell to generate a completion script for.
    shell: Shell,
    /// The name of the binary to generate the completion script for.
    #[clap(default_value = "symbolicate")]
    bin_name: String,
}


fn main() {
    let Args { shell, bin_name } = Args::parse();
    let mut app = prog::Args::command();
    let () = generate(shell, &mut app, &bin_name, &mut stdout());
}
