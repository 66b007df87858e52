use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use grapher::View;
use yw::{CommentMarker, Error, Extractor, Parser};

const FIXTURE_SUFFIX: &str = ".test.yw";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Literal comment marker for the source below the frontmatter.
    #[serde(default = "default_comment")]
    pub comment: String,

    /// View used for `expect_edges`. Defaults to the process view.
    #[serde(default)]
    pub view: Option<String>,

    /// Number of blocks in the tree, root included.
    #[serde(default)]
    pub expect_blocks: Option<usize>,

    #[serde(default)]
    pub expect_channels: Option<usize>,

    /// `"from -> to"` node ids that must be edges of the rendered graph.
    #[serde(default)]
    pub expect_edges: Vec<String>,

    /// The build must fail with a markup error whose message contains this.
    #[serde(default)]
    pub expect_markup_error: Option<String>,

    /// 1-based line of the expected markup error, counted from the first
    /// line after the frontmatter.
    #[serde(default)]
    pub expect_error_line: Option<usize>,

    #[serde(default)]
    pub expect_open_inputs: Option<usize>,

    #[serde(default)]
    pub expect_open_outputs: Option<usize>,
}

fn default_comment() -> String {
    "#".to_string()
}

/// Split a `.test.yw` file into its TOML config and annotated source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(FIXTURE_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
        Ok(content) => match parse_test_file(&content) {
            Err(e) => (None, Err(format!("frontmatter error: {}", e))),
            Ok((config, source)) => (config.description.clone(), check(&config, source)),
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Run one fixture's source through the pipeline and compare expectations.
fn check(config: &TestConfig, source: &str) -> Result<(), String> {
    let marker = CommentMarker::literal(config.comment.as_str()).map_err(|e| e.to_string())?;
    let result = Parser::new(Extractor::new(marker)).parse_str(source);

    let parsed = match (result, &config.expect_markup_error) {
        (Err(Error::Markup(err)), Some(expected)) => {
            let message = err.to_string();
            if !message.contains(expected.as_str()) {
                return Err(format!(
                    "expected markup error containing \"{}\", got: {}",
                    expected, message
                ));
            }
            return match config.expect_error_line {
                Some(line) if line != err.line() => Err(format!(
                    "expected error on line {}, but it is on line {}",
                    line,
                    err.line()
                )),
                _ => Ok(()),
            };
        }
        (Err(err), _) => return Err(format!("unexpected error: {}", err)),
        (Ok(_), Some(expected)) => {
            return Err(format!(
                "expected markup error containing \"{}\", but the build succeeded",
                expected
            ));
        }
        (Ok(parsed), None) => parsed,
    };

    let workflow = &parsed.workflow;
    expect_count("block", config.expect_blocks, workflow.tree().block_count())?;
    expect_count("channel", config.expect_channels, workflow.channels().len())?;
    expect_count("open input", config.expect_open_inputs, workflow.open_inputs().len())?;
    expect_count("open output", config.expect_open_outputs, workflow.open_outputs().len())?;

    if config.expect_edges.is_empty() {
        return Ok(());
    }
    let view = match &config.view {
        Some(name) => name.parse::<View>().map_err(|e| e.to_string())?,
        None => View::default(),
    };
    let graph = grapher::render(workflow, view);
    let missing: Vec<&str> = config
        .expect_edges
        .iter()
        .filter(|edge| match edge.split_once("->") {
            Some((from, to)) => !graph.has_edge(from.trim(), to.trim()),
            None => true,
        })
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "missing edge(s) in {} view: {}\n  graph:\n{}",
            view,
            missing.join(", "),
            graph.to_dot().trim_end()
        ))
    }
}

fn expect_count(what: &str, expected: Option<usize>, actual: usize) -> Result<(), String> {
    match expected {
        Some(expected) if expected != actual => Err(format!(
            "expected {} {}(s), got {}",
            expected, what, actual
        )),
        _ => Ok(()),
    }
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

/// Pick the fixtures to run, warning about unknown categories.
fn select(path: &Path, categories: &[String]) -> Vec<(String, Vec<PathBuf>)> {
    if path.is_file() {
        return vec![(String::new(), vec![path.to_path_buf()])];
    }

    let all = discover_categorized(path);
    if categories.is_empty() {
        return all.into_iter().collect();
    }

    let mut selected = BTreeMap::new();
    for requested in categories {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                selected.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected.into_iter().collect()
}

/// Run all fixtures under `path` (or a single file). Returns the exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected = select(path, categories);
    if selected.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let single = path.is_file();
    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if !single {
            eprintln!();
            eprintln!("{}", paint(category_label(cat), "1", no_color));
        }
        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "---\ndescription = \"two steps\"\nexpect_channels = 1\nexpect_edges = [\"A -> B\"]\n---\n# @begin A\n# @out x\n# @end A\n# @begin B\n# @in x\n# @end B\n";

    #[test]
    fn splits_frontmatter_from_source() {
        let (config, source) = parse_test_file(FIXTURE).unwrap();
        assert_eq!(config.description.as_deref(), Some("two steps"));
        assert_eq!(config.comment, "#");
        assert!(source.starts_with("# @begin A\n"));
    }

    #[test]
    fn missing_frontmatter_is_an_error() {
        assert!(parse_test_file("# @begin A\n").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n").is_err());
    }

    #[test]
    fn passing_fixture_checks_clean() {
        let (config, source) = parse_test_file(FIXTURE).unwrap();
        assert_eq!(check(&config, source), Ok(()));
    }

    #[test]
    fn wrong_counts_and_edges_fail() {
        let (mut config, source) = parse_test_file(FIXTURE).unwrap();
        config.expect_channels = Some(2);
        assert!(check(&config, source).unwrap_err().contains("expected 2 channel(s), got 1"));

        config.expect_channels = None;
        config.expect_edges = vec!["B -> A".to_string()];
        assert!(check(&config, source).unwrap_err().contains("B -> A"));
    }

    #[test]
    fn markup_error_line_is_relative_to_source() {
        let content = "---\nexpect_markup_error = \"never closed\"\nexpect_error_line = 2\n---\n# nothing here\n# @begin A\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(check(&config, source), Ok(()));
    }
}
