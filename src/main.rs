//! AIQL - agent intent language
//!
//! Command-line interface for lexing, parsing and reasoning over AIQL programs.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use aiql::ast::{LogicalNode, Program};
use aiql::config::{AiqlConfig, LogLevel, OutputFormat};
use aiql::error::{AiqlError, ErrorCode};
use aiql::lexer::{Lexer, LexerOptions, Token};
use aiql::parser::parse_with_options;
use aiql::reasoning::{InferenceEngine, ProofFormatter, ProofResult};

#[derive(Parser)]
#[command(name = "aiql")]
#[command(version)]
#[command(about = "AIQL - parse, inspect and reason over agent intent programs", long_about = None)]
struct Cli {
    /// Input files to process
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Read input from stdin
    #[arg(long)]
    stdin: bool,

    /// Print the token stream
    #[arg(long)]
    tokens: bool,

    /// Print the parsed program
    #[arg(long)]
    ast: bool,

    /// Run forward chaining and print derived facts
    #[arg(long)]
    think: bool,

    /// Maximum number of forward-chaining rounds
    #[arg(long, value_name = "N")]
    max_steps: Option<usize>,

    /// Goal to prove by backward chaining (repeatable)
    #[arg(long, value_name = "GOAL")]
    prove: Vec<String>,

    /// Check the knowledge base for contradictions
    #[arg(long)]
    check: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Configuration file (defaults to the standard search path)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Reasoning profile (default, shallow, deep, or a custom profile)
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Keep comments in the token stream
    #[arg(long)]
    preserve_comments: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// AIQL surface syntax and plain text
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// A named chunk of source text
struct Source {
    label: String,
    content: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            match err.downcast_ref::<AiqlError>() {
                Some(aiql) if cli.format == Some(FormatArg::Json) => {
                    eprintln!("{}", aiql.to_json_pretty());
                }
                _ => eprintln!("Error: {:#}", err),
            }
            let status = err
                .downcast_ref::<AiqlError>()
                .map(AiqlError::exit_status)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(status).unwrap_or(1))
        }
    }
}

/// Returns whether every requested proof and check succeeded
fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    init_tracing(config.general.log_level);

    let sources = read_sources(cli)?;
    let lexer_options = config.lexer_options();
    let format = config.general.format;
    let mut out = String::new();
    let mut report = serde_json::Map::new();

    if cli.tokens {
        let mut streams = Vec::new();
        for source in &sources {
            let tokens = Lexer::with_options(&source.content, lexer_options)
                .tokenize()
                .map_err(|e| AiqlError::from(e).in_file(&source.label))?;
            match format {
                OutputFormat::Text => write_tokens(&mut out, &tokens),
                OutputFormat::Json => streams.push(tokens_to_json(&source.label, &tokens)),
            }
        }
        if format == OutputFormat::Json {
            report.insert("tokens".to_string(), Value::Array(streams));
        }
    }

    let programs = parse_sources(&sources, lexer_options)?;

    let reasoning = cli.think || !cli.prove.is_empty() || cli.check;
    if cli.ast || (!cli.tokens && !reasoning) {
        match format {
            OutputFormat::Text => {
                for program in &programs {
                    out.push_str(&program.to_string());
                }
            }
            OutputFormat::Json => {
                report.insert("programs".to_string(), serde_json::to_value(&programs)?);
            }
        }
    }

    let mut success = true;

    if reasoning {
        let mut engine = InferenceEngine::with_config(Program::default(), config.engine_config())?;
        for program in programs {
            engine.add_program(program);
        }
        info!(facts = engine.len(), rules = engine.rules().len(), "knowledge base loaded");

        if cli.think {
            let derived = engine.forward_chain(config.reasoning.max_steps);
            info!(
                derived = derived.len(),
                rounds = engine.stats().rounds,
                converged = engine.stats().converged,
                "forward chaining finished"
            );
            match format {
                OutputFormat::Text => {
                    out.push_str(&format!("# Derived {} fact(s)\n", derived.len()));
                    for node in &derived {
                        out.push_str(&format!("{}\n", node));
                    }
                }
                OutputFormat::Json => {
                    report.insert("derived".to_string(), nodes_to_json(&derived));
                    report.insert("stats".to_string(), serde_json::to_value(engine.stats())?);
                }
            }
        }

        let mut proofs = Vec::new();
        for text in &cli.prove {
            let goal = parse_goal(text, lexer_options)?;
            let result = engine.backward_chain(&goal);
            success &= result.is_proved();
            match (&result, format) {
                (ProofResult::Proved(proof), OutputFormat::Text) => {
                    out.push_str(&ProofFormatter::new(proof).to_text());
                }
                (ProofResult::Proved(proof), OutputFormat::Json) => {
                    proofs.push(ProofFormatter::new(proof).to_value());
                }
                (ProofResult::NotProved { reason }, OutputFormat::Text) => {
                    out.push_str(&format!("Not proved: {}\n", reason));
                }
                (ProofResult::NotProved { reason }, OutputFormat::Json) => {
                    proofs.push(json!({ "goal": goal.to_string(), "proved": false, "reason": reason }));
                }
            }
        }
        if format == OutputFormat::Json && !cli.prove.is_empty() {
            report.insert("proofs".to_string(), Value::Array(proofs));
        }

        if cli.check {
            let consistency = engine.check_consistency();
            success &= consistency.is_consistent();
            match format {
                OutputFormat::Text => {
                    out.push_str(&format!(
                        "# Checked {} fact(s): {} contradiction(s)\n",
                        consistency.facts_checked,
                        consistency.contradictions.len()
                    ));
                    for contradiction in &consistency.contradictions {
                        out.push_str(&format!("{}\n", contradiction));
                    }
                }
                OutputFormat::Json => {
                    let found: Vec<Value> = consistency
                        .contradictions
                        .iter()
                        .map(|c| {
                            json!({
                                "kind": c.kind.as_str(),
                                "left": c.left.to_string(),
                                "right": c.right.to_string(),
                                "reason": c.reason,
                            })
                        })
                        .collect();
                    report.insert(
                        "consistency".to_string(),
                        json!({
                            "consistent": consistency.is_consistent(),
                            "facts_checked": consistency.facts_checked,
                            "contradictions": found,
                        }),
                    );
                }
            }
        }
    }

    if format == OutputFormat::Json {
        out = serde_json::to_string_pretty(&Value::Object(report))?;
        out.push('\n');
    }

    if let Some(path) = &cli.output {
        fs::write(path, out).with_context(|| format!("Failed to write to: {}", path.display()))?;
    } else {
        io::stdout()
            .write_all(out.as_bytes())
            .context("Failed to write to stdout")?;
    }

    Ok(success)
}

fn load_config(cli: &Cli) -> Result<AiqlConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AiqlConfig::load_from_file(path).map_err(AiqlError::from)?;
            config.apply_env_overrides();
            config
        }
        None => AiqlConfig::load().map_err(AiqlError::from)?,
    };

    if let Some(profile) = &cli.profile {
        config.apply_profile(profile).map_err(AiqlError::from)?;
    }
    if let Some(max_steps) = cli.max_steps {
        config.reasoning.max_steps = max_steps;
    }
    if let Some(format) = cli.format {
        config.general.format = format.into();
    }
    if cli.preserve_comments {
        config.lexer.preserve_comments = true;
    }
    if cli.verbose {
        config.general.log_level = LogLevel::Verbose;
    }
    if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    }

    config.validate().map_err(AiqlError::from)?;
    Ok(config)
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_sources(cli: &Cli) -> Result<Vec<Source>> {
    let mut sources = Vec::new();

    if cli.stdin || cli.inputs.is_empty() {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read from stdin")?;
        sources.push(Source {
            label: "<stdin>".to_string(),
            content,
        });
    }

    for path in &cli.inputs {
        let content = fs::read_to_string(path).map_err(|e| {
            let code = match e.kind() {
                io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                io::ErrorKind::PermissionDenied => ErrorCode::FileAccessDenied,
                _ => ErrorCode::IoError,
            };
            AiqlError::new(code, format!("Failed to read file: {}", path.display()))
                .with_cause(e.to_string())
        })?;
        sources.push(Source {
            label: path.display().to_string(),
            content,
        });
    }

    Ok(sources)
}

fn parse_sources(sources: &[Source], options: LexerOptions) -> Result<Vec<Program>> {
    let mut programs = Vec::with_capacity(sources.len());
    for source in sources {
        let program = parse_with_options(&source.content, options)
            .map_err(|e| e.in_file(&source.label))?;
        info!(source = %source.label, nodes = program.body.len(), "parsed");
        programs.push(program);
    }
    Ok(programs)
}

fn parse_goal(text: &str, options: LexerOptions) -> Result<LogicalNode> {
    let mut program = parse_with_options(text, options).map_err(|e| e.in_file("--prove"))?;
    match program.body.len() {
        1 => Ok(program.body.remove(0)),
        0 => Err(AiqlError::new(ErrorCode::EmptyInput, "goal is empty").into()),
        n => Err(AiqlError::new(
            ErrorCode::MalformedNode,
            format!("goal must be a single node, found {}", n),
        )
        .with_hint("Combine goals with 'and'")
        .into()),
    }
}

fn write_tokens(out: &mut String, tokens: &[Token]) {
    for token in tokens {
        out.push_str(&format!(
            "{}:{}\t{:?}\t{}\n",
            token.line, token.column, token.kind, token.lexeme
        ));
    }
}

fn tokens_to_json(label: &str, tokens: &[Token]) -> Value {
    let items: Vec<Value> = tokens
        .iter()
        .map(|t| {
            json!({
                "kind": format!("{:?}", t.kind),
                "value": t.value,
                "lexeme": t.lexeme,
                "line": t.line,
                "column": t.column,
            })
        })
        .collect();
    json!({ "source": label, "tokens": items })
}

fn nodes_to_json(nodes: &[LogicalNode]) -> Value {
    Value::Array(nodes.iter().map(|n| Value::String(n.to_string())).collect())
}
