use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rs_sql_ir::diagnostics::Result;
use rs_sql_ir::semantic::Catalog;
use rs_sql_ir::{CompileError, CompileOptions, EmitMode, SemicolonPolicy, Session};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// SQL source file
    file: PathBuf,

    /// Whether every statement must end with `;`
    #[arg(long, value_enum, default_value_t = SemicolonPolicy::Required)]
    semicolon: SemicolonPolicy,

    /// Report sections to print
    #[arg(long, value_enum, default_value_t = EmitMode::All)]
    emit: EmitMode,

    /// Schema file with table definitions, e.g. `users(id INT, name VARCHAR);`
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn run(cli: &Cli) -> Result<()> {
    let catalog = match &cli.schema {
        Some(path) => Catalog::from_source(&read(path)?).map_err(CompileError::Schema)?,
        None => Catalog::new(),
    };
    let source = read(&cli.file)?;
    debug!(file = %cli.file.display(), bytes = source.len(), "compiling");

    let options = CompileOptions {
        semicolon: cli.semicolon,
        emit: cli.emit,
    };
    let compilation = Session::new(options).with_catalog(catalog).run(&source);
    print!("{}", compilation.render_report(options.emit));
    compilation.check()
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
