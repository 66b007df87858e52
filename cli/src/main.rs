mod config;
mod test_runner;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use grapher::{GraphError, View};
use yw::{Extractor, Parsed};

use crate::config::{Config, MarkerRequest};

/// Environment variable holding a tracing filter, e.g. `YW_LOG=debug`.
const LOG_ENV: &str = "YW_LOG";

#[derive(Parser)]
#[command(
    name = "yw",
    version,
    about = "Recover and graph workflows from annotated script comments"
)]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log pipeline details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract annotations and build the workflow model
    Extract(ExtractArgs),

    /// Extract, resolve and render the workflow as Graphviz DOT
    Graph(GraphArgs),

    /// Run .test.yw fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Source file to analyze ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    source: String,

    /// Literal comment marker, e.g. "#" or "//"
    #[arg(long, conflicts_with = "pattern")]
    comment: Option<String>,

    /// Regular expression matching the start of a comment
    #[arg(long)]
    pattern: Option<String>,

    /// Source language, used to look up the comment marker
    #[arg(long)]
    language: Option<String>,

    /// Configuration file (defaults to ./yw.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the extracted comment lines to a file ("-" for stdout)
    #[arg(short, long, num_args = 0..=1, default_missing_value = "-")]
    lines: Option<String>,
}

#[derive(clap::Args)]
struct ExtractArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(clap::Args)]
struct GraphArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write the DOT graph to a file ("-" for stdout)
    #[arg(
        short = 'g',
        long = "graph",
        num_args = 0..=1,
        default_value = "-",
        default_missing_value = "-"
    )]
    output: String,

    /// Graph view: process, data or combined
    #[arg(long)]
    view: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.yw file or a directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Yw(#[from] yw::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Source text and codespan database for one run.
struct Session {
    config: Config,
    files: SimpleFiles<String, String>,
    file_id: usize,
    color: ColorChoice,
}

fn main() {
    let args = command_option_to_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose, cli.no_color);

    let exit_code = match cli.command {
        Command::Extract(args) => run(cli.no_color, &args.source, |_, parsed| {
            let workflow = &parsed.workflow;
            eprintln!(
                "ok: {} block(s), {} port(s), {} channel(s)",
                workflow.tree().declared_block_count(),
                workflow.tree().port_count(),
                workflow.channels().len()
            );
            Ok(())
        }),
        Command::Graph(args) => run(cli.no_color, &args.source, |session, parsed| {
            let view = match args.view.as_deref().or(session.config.graph.view.as_deref()) {
                Some(view) => view.parse::<View>()?,
                None => View::default(),
            };
            let graph = grapher::render(&parsed.workflow, view);
            write_output(&args.output, &graph.to_dot())
        }),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                0
            } else {
                test_runner::run_tests(&args.path, cli.no_color, &args.category)
            }
        }
    };
    process::exit(exit_code);
}

/// Flags whose next token is always their value.
const VALUE_FLAGS: &[&str] = &[
    "-s",
    "--source",
    "--comment",
    "--pattern",
    "--language",
    "--config",
    "--view",
    "--category",
];

/// Flags whose next token is their value unless it looks like a flag.
const OPTIONAL_VALUE_FLAGS: &[&str] = &["-l", "--lines", "-g", "--graph"];

const SUBCOMMANDS: &[&str] = &["extract", "graph", "test", "help"];

/// Accept `-c COMMAND` / `--command COMMAND` in place of the subcommand.
/// Flag values are skipped, and nothing is rewritten once a subcommand
/// name has been seen.
fn command_option_to_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut pos = None;
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "-c" || arg == "--command" || arg.starts_with("--command=") {
            pos = Some(i);
            break;
        }
        if SUBCOMMANDS.contains(&arg) {
            return args;
        }
        if VALUE_FLAGS.contains(&arg) {
            i += 1;
        } else if OPTIONAL_VALUE_FLAGS.contains(&arg)
            && args.get(i + 1).is_some_and(|next| !next.starts_with('-'))
        {
            i += 1;
        }
        i += 1;
    }

    let Some(pos) = pos else {
        return args;
    };
    let flag = args.remove(pos);
    let command = match flag.strip_prefix("--command=") {
        Some(value) => value.to_string(),
        None if pos < args.len() => args.remove(pos),
        None => return args,
    };
    args.insert(1.min(args.len()), command);
    args
}

fn init_tracing(verbose: bool, no_color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}

/// Shared extract step for every command; `then` runs on success.
fn run(
    no_color: bool,
    args: &SourceArgs,
    then: impl FnOnce(&Session, &Parsed) -> Result<(), CliError>,
) -> i32 {
    let color = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut session = match Config::load(args.config.as_deref()) {
        Ok(config) => Session {
            config,
            files: SimpleFiles::new(),
            file_id: 0,
            color,
        },
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };

    let result = extract(&mut session, args).and_then(|parsed| {
        if let Some(path) = &args.lines {
            write_output(path, &parsed.extraction.lines_report())?;
        }
        then(&session, &parsed)
    });

    match result {
        Ok(()) => 0,
        Err(err) => {
            report(&session, &err);
            1
        }
    }
}

fn extract(session: &mut Session, args: &SourceArgs) -> Result<Parsed, CliError> {
    let source_path = (args.source != "-").then(|| Path::new(&args.source));
    let (marker, language) = session
        .config
        .resolve_marker(MarkerRequest {
            comment: args.comment.as_deref(),
            pattern: args.pattern.as_deref(),
            language: args.language.as_deref(),
            source: source_path,
        })
        .map_err(yw::Error::from)?;

    // Fail on a missing marker before touching the source.
    let extractor = Extractor::from_marker(marker, language.as_deref())
        .map_err(yw::Error::from)?
        .keep_comments(args.lines.is_some());

    let source = read_source(&args.source)?;
    session.file_id = session.files.add(args.source.clone(), source);
    debug!(source = %args.source, "read source");

    let mut parser = yw::Parser::new(extractor);
    if let Some(root) = &session.config.graph.root {
        parser = parser.root_name(root.clone());
    }
    let text = session
        .files
        .get(session.file_id)
        .map(|file| file.source().as_str())
        .unwrap_or_default();
    Ok(parser.parse_str(text)?)
}

fn read_source(path: &str) -> Result<String, CliError> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Read {
                path: "<stdin>".to_string(),
                source,
            })?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|source| {
        yw::Error::from(yw::ConfigError::UnreadableSource {
            path: PathBuf::from(path),
            source,
        })
        .into()
    })
}

fn write_output(path: &str, text: &str) -> Result<(), CliError> {
    let result = if path == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush())
    } else {
        std::fs::write(path, text)
    };
    result.map_err(|source| CliError::Write {
        path: path.to_string(),
        source,
    })
}

fn report(session: &Session, err: &CliError) {
    let CliError::Yw(yw::Error::Markup(markup)) = err else {
        eprintln!("error: {}", err);
        return;
    };
    let diagnostic: Diagnostic<usize> = markup.to_diagnostic(session.file_id);
    let writer = StandardStream::stderr(session.color);
    let config = term::Config::default();
    if term::emit_to_write_style(&mut writer.lock(), &config, &session.files, &diagnostic).is_err() {
        eprintln!("error: {}", err);
    }
}
