use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;

/// Language server that shows which React components the React Compiler
/// optimized, right next to their declarations.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Verbosity of the log written to stderr.
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct CompilerArgs {
    /// Node.js executable used to run babel-plugin-react-compiler.
    #[arg(long, default_value = "node")]
    pub node: PathBuf,

    /// Plugin directory to fall back on when the workspace has none installed.
    #[arg(long, env = "REACT_COMPILER_MARKER_BUNDLED_PLUGIN")]
    pub bundled_plugin: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LspArgs {
    /// Talk LSP over stdin/stdout. This is the only transport, so the flag is
    /// accepted for compatibility with editors that always pass it.
    #[arg(long)]
    pub stdio: bool,

    #[command(flatten)]
    pub compiler: CompilerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Directory to scan.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Plugin location relative to the root.
    #[arg(long, default_value = crate::settings::DEFAULT_PLUGIN_PATH)]
    pub plugin_path: String,

    /// Directory name to skip at any depth. Repeat to add more; replaces the defaults.
    #[arg(long = "exclude-dir")]
    pub exclude_dirs: Vec<String>,

    /// File extension to include, e.g. `.tsx`. Repeat to add more; replaces the defaults.
    #[arg(long = "extension")]
    pub extensions: Vec<String>,

    /// Number of files compiled in parallel.
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    #[command(flatten)]
    pub compiler: CompilerArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the language server (default).
    Lsp(LspArgs),
    /// Scan a directory and print the compiler report as JSON.
    Report(ReportArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_options() {
        let cli = Cli::try_parse_from([
            "react-compiler-marker-lsp",
            "report",
            "app",
            "--exclude-dir",
            "vendor",
            "--exclude-dir",
            "generated",
            "--extension",
            ".tsx",
            "--max-concurrency",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::Report(args) => {
                assert_eq!(args.root, PathBuf::from("app"));
                assert_eq!(args.exclude_dirs, vec!["vendor", "generated"]);
                assert_eq!(args.extensions, vec![".tsx"]);
                assert_eq!(args.max_concurrency, Some(2));
                assert_eq!(args.plugin_path, "node_modules/babel-plugin-react-compiler");
                assert_eq!(args.compiler.node, PathBuf::from("node"));
            }
            other => panic!("expected report command, got {other:?}"),
        }
    }
}
