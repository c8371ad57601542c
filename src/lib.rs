pub mod config;
pub mod diagnostics;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod session;
pub mod stream;
pub mod symbols;
pub mod token;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{CompileOptions, EmitMode, SemicolonPolicy};
pub use diagnostics::{CompileError, Diagnostic};
pub use session::{Compilation, Session};

/// Run the whole pipeline over `input` with an empty catalog.
pub fn compile_sql(input: &str, options: &CompileOptions) -> Compilation {
    Session::new(*options).run(input)
}
