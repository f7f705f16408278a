mod demangle;
mod resolve;
mod rewrite;
