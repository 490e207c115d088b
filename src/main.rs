use std::sync::Arc;
use std::{env, io::Write};

use anyhow::Result;
use clap::{Parser, error::ErrorKind};
use tower_lsp::{LspService, Server};

use react_compiler_marker::compiler::CompilerAdapter;
use react_compiler_marker::compiler::node::NodeBackend;
use react_compiler_marker::report::{self, ReportOptions};
use react_compiler_marker::server::{ReactCompilerServer, ServerConfig, ServerState};
use react_compiler_marker::{cli, telemetry};

fn main() -> Result<()> {
    let telemetry = telemetry::init_telemetry();

    let raw_args: Vec<String> = env::args().collect();
    let cli = parse_cli(raw_args).unwrap_or_else(|err| err.exit());

    // With tracing on, log records are already routed into the subscriber.
    if !telemetry.tracing_enabled {
        // stdout belongs to the LSP transport (or the JSON report).
        env_logger::Builder::new()
            .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
            .filter_level(cli.verbose.log_level_filter())
            .target(env_logger::fmt::Target::Stderr)
            .init();
    }

    match cli.command {
        cli::Command::Lsp(lsp_args) => run_lsp(lsp_args),
        cli::Command::Report(report_args) => run_report(report_args),
    }
}

fn run_lsp(args: cli::LspArgs) -> Result<()> {
    let config = ServerConfig {
        node: args.compiler.node,
        bundled_plugin: args.compiler.bundled_plugin,
        ..ServerConfig::default()
    };
    log::debug!("Starting language server ({config:?})");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let (service, socket) =
            LspService::new(move |client| ReactCompilerServer::new(client, ServerState::with_node_backend(config)));
        Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
            .serve(service)
            .await;
    });
    Ok(())
}

fn run_report(args: cli::ReportArgs) -> Result<()> {
    let backend = Arc::new(NodeBackend::new(args.compiler.node));
    let adapter = CompilerAdapter::new(backend, args.compiler.bundled_plugin);
    let options = ReportOptions {
        root: args.root,
        plugin_path_hint: args.plugin_path,
        max_concurrency: args.max_concurrency,
        include_extensions: non_empty(args.extensions),
        exclude_dirs: non_empty(args.exclude_dirs),
    };

    let report = report::generate_report(&adapter, &options, &|progress| {
        log::info!("Scanned {}/{} files", progress.processed, progress.total)
    })?;

    for error in &report.errors {
        log::warn!("{}: {}", error.path, error.message);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

/// Editors launch the server as `react-compiler-marker-lsp --stdio`, so a
/// missing subcommand means `lsp`.
fn parse_cli(raw_args: Vec<String>) -> Result<cli::Cli, clap::Error> {
    match cli::Cli::try_parse_from(&raw_args) {
        Ok(cli) => Ok(cli),
        Err(err) => {
            if should_default_to_lsp(&err, &raw_args) {
                let mut fallback_args = raw_args.clone();
                let insert_at = index_after_global_flags(&fallback_args);
                fallback_args.insert(insert_at, "lsp".into());
                cli::Cli::try_parse_from(&fallback_args)
            } else {
                Err(err)
            }
        }
    }
}

fn should_default_to_lsp(err: &clap::Error, args: &[String]) -> bool {
    match err.kind() {
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => true,
        ErrorKind::UnknownArgument => args.iter().skip(1).any(|arg| !is_global_flag(arg)),
        _ => false,
    }
}

fn index_after_global_flags(args: &[String]) -> usize {
    let mut idx = 1;
    while let Some(arg) = args.get(idx) {
        if is_global_flag(arg) {
            idx += 1;
        } else {
            break;
        }
    }
    idx.min(args.len())
}

fn is_global_flag(arg: &str) -> bool {
    matches!(
        arg,
        "-v" | "-vv"
            | "-vvv"
            | "-vvvv"
            | "-q"
            | "-qq"
            | "-qqq"
            | "-qqqq"
            | "--verbose"
            | "--quiet"
            | "-h"
            | "--help"
            | "-V"
            | "--version"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<cli::Cli, clap::Error> {
        parse_cli(args.iter().map(|arg| arg.to_string()).collect())
    }

    #[test]
    fn defaults_to_lsp_without_args() {
        let cli = parse(&["react-compiler-marker-lsp"]).expect("expected default lsp command");
        assert!(matches!(cli.command, cli::Command::Lsp(_)));
    }

    #[test]
    fn defaults_to_lsp_with_stdio_flag() {
        let cli = parse(&["react-compiler-marker-lsp", "--stdio"]).expect("expected lsp command");

        match cli.command {
            cli::Command::Lsp(args) => assert!(args.stdio),
            other => panic!("expected lsp command, got {other:?}"),
        }
    }

    #[test]
    fn global_flags_stay_before_the_inserted_subcommand() {
        let cli = parse(&["react-compiler-marker-lsp", "-v", "--stdio", "--node", "/opt/node"])
            .expect("expected lsp command");

        match cli.command {
            cli::Command::Lsp(args) => assert_eq!(args.compiler.node.to_str(), Some("/opt/node")),
            other => panic!("expected lsp command, got {other:?}"),
        }
    }

    #[test]
    fn explicit_report_command() {
        let cli = parse(&["react-compiler-marker-lsp", "report", "src"]).expect("expected report command");
        assert!(matches!(cli.command, cli::Command::Report(_)));
    }

    #[test]
    fn unknown_subcommands_are_errors() {
        assert!(parse(&["react-compiler-marker-lsp", "deploy"]).is_err());
    }
}
