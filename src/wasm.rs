use crate::compile_sql;
use crate::config::{CompileOptions, EmitMode, SemicolonPolicy};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn compile_sql_wasm(input: &str, semicolon: &str, emit: &str) -> String {
    let options = CompileOptions {
        semicolon: SemicolonPolicy::from_name(semicolon),
        emit: EmitMode::from_name(emit),
    };

    compile_sql(input, &options).render_report(options.emit)
}
