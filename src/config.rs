use std::fmt;

/// Whether a statement must be closed by `;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SemicolonPolicy {
    #[default]
    Required,
    Optional,
}

impl SemicolonPolicy {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "optional" => SemicolonPolicy::Optional,
            _ => SemicolonPolicy::Required,
        }
    }
}

impl fmt::Display for SemicolonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemicolonPolicy::Required => write!(f, "required"),
            SemicolonPolicy::Optional => write!(f, "optional"),
        }
    }
}

/// Which sections of the compilation report are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmitMode {
    #[default]
    All,
    Tokens,
    Ir,
}

impl EmitMode {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "tokens" => EmitMode::Tokens,
            "ir" => EmitMode::Ir,
            _ => EmitMode::All,
        }
    }
}

impl fmt::Display for EmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitMode::All => write!(f, "all"),
            EmitMode::Tokens => write!(f, "tokens"),
            EmitMode::Ir => write!(f, "ir"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub semicolon: SemicolonPolicy,
    pub emit: EmitMode,
}
