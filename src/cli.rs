use clap::Parser;

/// diffaid — review staged git changes with AI
///
/// Analyzes your staged diff and reports errors, warnings, and notes
/// about potential issues before you commit.
///
/// Exit codes: 0 no errors found, 1 errors found (or warnings with
/// --strict), 2 tool error (git failure, API issues).
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "diffaid", version, about)]
pub struct Cli {
    /// Print the review result as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat warnings as failures (exit 1)
    #[arg(long)]
    pub strict: bool,

    /// Gemini model to use (default: gemini-2.5-flash)
    #[arg(long)]
    pub model: Option<String>,

    /// Path to config file (default: .diffaid.toml if present)
    #[arg(long)]
    pub config: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
