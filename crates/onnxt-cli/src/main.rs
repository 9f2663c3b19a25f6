//! onnxt - ONNX weight import and transposition
//!
//! Loads an ONNX model, folds constant `Transpose` nodes into their
//! initializers, applies any explicitly requested initializer transposes
//! and writes the rewritten model back out.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod error;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use error::CliError;
use onnxt_core::logging::{init_logging, LogLevel, LoggingConfig};
use onnxt_core::{Permutation, Severity, TracingSink};
use onnxt_onnx::{layer_listing, ImportConfig, Importer, LoadedModel};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// Import ONNX weights and rewrite their layout
#[derive(Parser, Debug)]
#[command(name = "onnxt")]
#[command(version, about, long_about = None)]
struct Cli {
    /// ONNX model to read
    #[arg(value_name = "MODEL")]
    model: PathBuf,

    /// Write the converted ONNX model to FILE
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Transpose an initializer, e.g. `fc.weight=1,0` (repeatable)
    #[arg(short, long = "transpose", value_name = "NAME=PERM", value_parser = parse_transpose)]
    transposes: Vec<TransposeRequest>,

    /// Model precision in bits (32 or 16)
    #[arg(short = 'd', long, default_value_t = 32)]
    dtype_bits: u32,

    /// List inputs, weights, nodes and outputs after import
    #[arg(short, long)]
    list_layers: bool,

    /// Keep Transpose nodes on initializers in the graph
    #[arg(long)]
    no_fold: bool,

    /// TOML import configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Verbosity on the diagnostic scale, where 2 is warnings.
    fn verbosity(&self) -> i32 {
        Severity::Warning.verbosity() + i32::from(self.verbose) - i32::from(self.quiet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TransposeRequest {
    name: String,
    perm: Permutation,
}

fn parse_transpose(arg: &str) -> anyhow::Result<TransposeRequest> {
    let Some((name, order)) = arg.rsplit_once('=') else {
        bail!("expected NAME=PERM, got '{arg}'");
    };
    if name.is_empty() {
        bail!("missing initializer name in '{arg}'");
    }
    let order = order
        .split(',')
        .map(|axis| {
            axis.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid axis '{axis}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let perm = Permutation::new(&order)?;
    Ok(TransposeRequest {
        name: name.to_string(),
        perm,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let severity = Severity::from_verbosity(cli.verbosity());

    let logging = LoggingConfig::new()
        .with_level(LogLevel::from(severity))
        .with_json_format(cli.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&cli, severity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli, severity: Severity) -> Result<(), CliError> {
    if cli.dtype_bits != 32 && cli.dtype_bits != 16 {
        return Err(CliError::InvalidBitDepth(cli.dtype_bits));
    }
    if !cli.model.exists() {
        return Err(CliError::InputNotFound(cli.model.clone()));
    }

    let mut config = match &cli.config {
        Some(path) => ImportConfig::from_file(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => ImportConfig::default(),
    };
    if cli.no_fold {
        config = config.with_fold_transposes(false);
    }

    info!("Parsing model");
    let mut model = Importer::new(config)
        .with_sink(Box::new(TracingSink::new(severity)))
        .import_file(&cli.model)
        .map_err(|source| CliError::Parse {
            path: cli.model.clone(),
            source,
        })?;

    if severity >= Severity::Warning {
        println!("{}", model.info());
    }
    debug!(bits = cli.dtype_bits, "model precision");

    for request in &cli.transposes {
        model
            .transpose_initializer(&request.name, &request.perm)
            .map_err(|source| CliError::Transpose {
                name: request.name.clone(),
                source,
            })?;
    }

    report(&model, severity);
    if cli.list_layers {
        print!("{}", layer_listing(&model));
    }

    if let Some(path) = &cli.output {
        model.write_to_file(path).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
    }

    if severity >= Severity::Warning {
        println!("All done");
    }
    Ok(())
}

fn report(model: &LoadedModel, severity: Severity) {
    let unsupported = model.unsupported_nodes();
    if !unsupported.is_empty() && severity >= Severity::Error {
        eprintln!(
            "{} node(s) could not be folded and were left in the graph:",
            unsupported.len()
        );
        for node in unsupported {
            eprintln!("  {} ({}): {}", node.node, node.op_type, node.reason);
        }
    }
    let stats = model.context().arena_stats();
    info!(
        folded = model.folded_nodes().len(),
        buffers = stats.allocations,
        peak_bytes = stats.peak_bytes,
        "import finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnxt_onnx::onnx_proto::{AttributeProto, GraphProto, ModelProto, NodeProto, TensorProto};
    use prost::Message;

    fn write_model(dir: &std::path::Path) -> PathBuf {
        let model = ModelProto {
            ir_version: 7,
            graph: Some(GraphProto {
                name: "g".to_string(),
                node: vec![NodeProto {
                    name: "t".to_string(),
                    op_type: "Transpose".to_string(),
                    input: vec!["w".to_string()],
                    output: vec!["wt".to_string()],
                    attribute: vec![AttributeProto {
                        name: "perm".to_string(),
                        r#type: 7,
                        ints: vec![1, 0],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                initializer: vec![TensorProto {
                    name: "w".to_string(),
                    dims: vec![2, 3],
                    data_type: 1,
                    float_data: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let path = dir.join("model.onnx");
        std::fs::write(&path, model.encode_to_vec()).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("onnxt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = cli(&["model.onnx"]);
        assert_eq!(cli.model, PathBuf::from("model.onnx"));
        assert_eq!(cli.dtype_bits, 32);
        assert!(cli.output.is_none());
        assert!(cli.transposes.is_empty());
        assert!(!cli.list_layers);
        assert!(!cli.no_fold);
        assert_eq!(cli.verbosity(), 2);
    }

    #[test]
    fn test_cli_counted_verbosity() {
        assert_eq!(cli(&["m.onnx", "-vv"]).verbosity(), 4);
        assert_eq!(cli(&["m.onnx", "-v", "-q", "-q"]).verbosity(), 1);
        assert_eq!(
            Severity::from_verbosity(cli(&["m.onnx", "-qqqq"]).verbosity()),
            Severity::InternalError
        );
    }

    #[test]
    fn test_cli_repeated_transposes() {
        let cli = cli(&[
            "m.onnx",
            "-t",
            "a=1,0",
            "--transpose",
            "b=0,2,1",
            "-o",
            "out.onnx",
        ]);
        assert_eq!(cli.transposes.len(), 2);
        assert_eq!(cli.transposes[0].name, "a");
        assert_eq!(cli.transposes[0].perm.order(), &[1, 0]);
        assert_eq!(cli.transposes[1].perm.order(), &[0, 2, 1]);
        assert_eq!(cli.output, Some(PathBuf::from("out.onnx")));
    }

    #[test]
    fn test_parse_transpose_errors() {
        assert!(parse_transpose("no_equals").is_err());
        assert!(parse_transpose("=1,0").is_err());
        assert!(parse_transpose("w=1,x").is_err());
        assert!(parse_transpose("w=0,0").is_err());
        assert!(Cli::try_parse_from(["onnxt", "m.onnx", "-t", "w=2,1"]).is_err());
    }

    #[test]
    fn test_parse_transpose_name_with_equals() {
        let request = parse_transpose("a=b=1, 0").unwrap();
        assert_eq!(request.name, "a=b");
        assert_eq!(request.perm.order(), &[1, 0]);
    }

    #[test]
    fn test_invalid_bit_depth() {
        let cli = cli(&["missing.onnx", "-d", "8"]);
        let err = run(&cli, Severity::Error).unwrap_err();
        assert!(matches!(err, CliError::InvalidBitDepth(8)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_input() {
        let cli = cli(&["/nonexistent/model.onnx"]);
        let err = run(&cli, Severity::Error).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_unparsable_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.onnx");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();

        let cli = cli(&[path.to_str().unwrap()]);
        let err = run(&cli, Severity::Error).unwrap_err();
        assert!(matches!(err, CliError::Parse { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_run_writes_folded_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let out = dir.path().join("out.onnx");

        let cli = cli(&[model.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        run(&cli, Severity::Error).unwrap();

        let written = onnxt_onnx::ModelLoader::load_from_file(&out).unwrap();
        assert!(written.nodes().is_empty());
        assert_eq!(written.weights("wt").unwrap().shape.as_slice(), &[3, 2]);
    }

    #[test]
    fn test_run_unknown_transpose_target() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());

        let cli = cli(&[model.to_str().unwrap(), "-t", "missing=1,0"]);
        let err = run(&cli, Severity::Error).unwrap_err();
        assert!(matches!(err, CliError::Transpose { .. }));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_run_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let out = dir.path().join("no_such_dir").join("out.onnx");

        let cli = cli(&[model.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        let err = run(&cli, Severity::Error).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let config = dir.path().join("onnxt.toml");
        std::fs::write(&config, "min_ir_version = 8\n").unwrap();

        let cli_args = cli(&[model.to_str().unwrap(), "-c", config.to_str().unwrap()]);
        let err = run(&cli_args, Severity::Error).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        std::fs::write(&config, "min_ir_version = \"seven\"\n").unwrap();
        let cli_args = cli(&[model.to_str().unwrap(), "-c", config.to_str().unwrap()]);
        let err = run(&cli_args, Severity::Error).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_no_fold_keeps_transpose_node() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let out = dir.path().join("out.onnx");

        let cli = cli(&[model.to_str().unwrap(), "--no-fold", "-o", out.to_str().unwrap()]);
        run(&cli, Severity::Error).unwrap();

        let written = ModelProto::decode(std::fs::read(&out).unwrap().as_slice()).unwrap();
        let graph = written.graph.unwrap();
        assert_eq!(graph.node.len(), 1);
        assert_eq!(graph.node[0].op_type, "Transpose");
        assert_eq!(graph.initializer[0].name, "w");
    }
}
