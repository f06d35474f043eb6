//! Analyze command - Run the analyzer over resolved stylesheet dumps
//!
//! Each input file is a JSON-encoded `ResolvedStylesheet` as written by a
//! resolver. Files are independent, so they are analyzed in parallel.

use clap::{Args, ValueEnum};
use glob::glob;
use nuance_calque::{AnalysisStats, Analyzer};
use nuance_toile::{ResolvedStylesheet, TreeError};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::config::{load_config, CONFIG_FILE};

/// Resolver dumps are written as `<stylesheet>.resolved.json`
const DEFAULT_PATTERN: &str = "./**/*.resolved.json";

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Glob pattern(s) or paths of resolved stylesheet JSON dumps
    #[arg(default_value = DEFAULT_PATTERN)]
    pub patterns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Config file path (defaults to ./nuance.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full analysis records keyed by file path
    Json,
    /// Per-file entry counts
    Text,
}

#[derive(Debug, Error)]
enum AnalyzeError {
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Failed to serialize analysis: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What survives of one analysis once its input is dropped
#[derive(Debug)]
struct FileReport {
    stats: AnalysisStats,
    json: Option<serde_json::Value>,
}

pub fn run(args: AnalyzeArgs) {
    let start = Instant::now();
    let config = load_config(args.config.as_deref());
    let analyzer = Analyzer::new().with_options(config.analysis);

    let files = collect_json_files(&args.patterns);
    if files.is_empty() {
        eprintln!("No .json files found matching patterns: {:?}", args.patterns);
        return;
    }

    let want_json = args.format == OutputFormat::Json;
    let results: Vec<(String, Result<FileReport, AnalyzeError>)> = files
        .par_iter()
        .map(|path| {
            let report = fs::read_to_string(path)
                .map_err(AnalyzeError::from)
                .and_then(|content| analyze_source(&analyzer, &content, want_json));
            (path.to_string_lossy().to_string(), report)
        })
        .collect();

    let mut failed = 0usize;
    let mut output = serde_json::Map::new();
    for (path, result) in results {
        match result {
            Ok(report) => match (args.format, report.json) {
                (OutputFormat::Json, Some(json)) => {
                    output.insert(path, json);
                }
                _ => {
                    println!("{path}");
                    for line in report.stats.to_string().lines() {
                        println!("  {line}");
                    }
                }
            },
            Err(e) => {
                failed += 1;
                eprintln!("\x1b[31mError:\x1b[0m {}: {}", path, e);
            }
        }
    }

    if args.format == OutputFormat::Json {
        let output = serde_json::Value::Object(output);
        let printed = if args.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        };
        match printed {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("\x1b[31mError:\x1b[0m Failed to print output: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!(
            "\nAnalyzed {} files in {:.4?}",
            files.len() - failed,
            start.elapsed()
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Decode, validate and analyze one dump
fn analyze_source(
    analyzer: &Analyzer,
    content: &str,
    want_json: bool,
) -> Result<FileReport, AnalyzeError> {
    let stylesheet = ResolvedStylesheet::from_json(content)?;
    let analysis = analyzer.analyze(&stylesheet);
    let json = if want_json {
        Some(serde_json::to_value(&analysis)?)
    } else {
        None
    };
    Ok(FileReport {
        stats: analysis.stats(),
        json,
    })
}

/// Expand patterns into `.json` files, skipping `node_modules` and the
/// config file. Plain directories are searched recursively.
fn collect_json_files(patterns: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = patterns
        .iter()
        .flat_map(|pattern| {
            let path = Path::new(pattern);
            let pattern = if path.is_dir() {
                path.join("**/*.json").to_string_lossy().to_string()
            } else {
                pattern.clone()
            };
            glob(&pattern)
                .ok()
                .into_iter()
                .flatten()
                .filter_map(|r| r.ok())
                .collect::<Vec<_>>()
        })
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext == "json")
                && p.file_name().map_or(true, |name| name != CONFIG_FILE)
                && !p.components().any(|c| c.as_os_str() == "node_modules")
        })
        .collect();
    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuance_toile::{Dialect, TreeBuilder};

    fn dump() -> String {
        let mut s = TreeBuilder::new();
        let foo = s.section(s.root(), ".foo");
        let padding = s.property(foo, "padding", "@a");

        let mut r = TreeBuilder::new();
        let rroot = r.root();
        r.define_variable(rroot, "@a", "2px");
        let rfoo = r.section(rroot, ".foo");
        let rpadding = r.property(rfoo, "padding", "2px");
        r.set_origin(rfoo, foo);
        r.set_origin(rpadding, padding);

        let stylesheet = ResolvedStylesheet::new(Dialect::Less, s.finish(), r.finish());
        serde_json::to_string(&stylesheet).unwrap()
    }

    #[test]
    fn test_analyze_source() {
        let analyzer = Analyzer::new();
        let report = analyze_source(&analyzer, &dump(), true).unwrap();
        let json = report.json.unwrap();
        assert_eq!(json["selectors"]["s1"], ".foo");
        assert_eq!(json["computedValues"]["s2"], "2px");
        assert_eq!(report.stats.source_nodes, 3);
        assert_eq!(report.stats.failed_values, 0);

        let report = analyze_source(&analyzer, &dump(), false).unwrap();
        assert!(report.json.is_none());
        insta::assert_snapshot!(report.stats.to_string(), @r"
        nodes:       3 source, 3 result, 0 pruned
        references:  3
        selectors:   1
        completions: 2
        mixin calls: 0
        suggestions: 0
        computed:    1 (0 failed)
        ");
    }

    #[test]
    fn test_default_pattern_skips_project_json() {
        let pattern = glob::Pattern::new(DEFAULT_PATTERN).unwrap();
        assert!(pattern.matches("./dist/theme.resolved.json"));
        assert!(!pattern.matches("./package.json"));
        assert!(!pattern.matches("./app/tsconfig.json"));
    }

    #[test]
    fn test_rejects_invalid_dump() {
        let err = analyze_source(&Analyzer::new(), "{", false).unwrap_err();
        assert!(matches!(err, AnalyzeError::Tree(TreeError::Decode(_))));
    }
}
