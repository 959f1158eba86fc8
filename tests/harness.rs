use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use govlang::console::MemoryConsole;
use govlang::diag::CollectingSink;
use govlang::interpreter::Interpreter;
use govlang::{lexer, parser};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CaseClass {
    RuntimeSuccess,
    ParseError,
}

#[derive(Debug, Deserialize, Clone)]
struct ExpectedOutcome {
    exit_code: i32,
    stdout_file: Option<String>,
    diagnostics_file: Option<String>,
    error_contains_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct CaseSpec {
    class: CaseClass,
    stdin_file: Option<String>,
    expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
struct Case {
    name: String,
    dir: PathBuf,
    program_path: PathBuf,
    spec: CaseSpec,
}

impl Case {
    fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }
}

fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let program_path = path.join("program.gov");
        ensure!(
            program_path.exists(),
            "Missing program.gov for case {}",
            path.display()
        );

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

fn stdin_lines(case: &Case) -> Result<Vec<String>> {
    let Some(stdin_file) = case.spec.stdin_file.as_deref() else {
        return Ok(Vec::new());
    };
    let raw = case.read_text(stdin_file)?;
    Ok(raw.lines().map(str::to_string).collect())
}

fn run_case(case: &Case) -> Result<()> {
    let source = fs::read_to_string(&case.program_path)
        .with_context(|| format!("Reading {}", case.name))?;

    let mut diag = CollectingSink::new();
    let tokens = lexer::tokenize(&source, &mut diag);
    let parse_result = parser::parse_tokens(tokens, &mut diag);

    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            ensure!(
                case.spec.expected.exit_code == 0,
                "Case {} expected exit code must be 0 for runtime_success",
                case.name
            );
            let program = parse_result
                .with_context(|| format!("Parsing {}", case.name))?;

            let mut console = MemoryConsole::with_input(stdin_lines(case)?);
            Interpreter::new(&mut console, &mut diag).interpret(&program);

            let stdout_file = case
                .spec
                .expected
                .stdout_file
                .as_deref()
                .with_context(|| format!("Missing stdout_file in {}", case.name))?;
            let expected_output = normalize_output(&case.read_text(stdout_file)?);
            let actual_output = normalize_output(&console.output.join("\n"));
            assert_eq!(actual_output, expected_output, "Output mismatch for {}", case.name);

            match case.spec.expected.diagnostics_file.as_deref() {
                Some(diagnostics_file) => {
                    let expected_diagnostics =
                        normalize_output(&case.read_text(diagnostics_file)?);
                    let actual_diagnostics = normalize_output(&diag.messages.join("\n"));
                    assert_eq!(
                        actual_diagnostics, expected_diagnostics,
                        "Diagnostics mismatch for {}",
                        case.name
                    );
                }
                None => {
                    ensure!(
                        diag.messages.is_empty(),
                        "Case {} produced unexpected diagnostics: {:?}",
                        case.name,
                        diag.messages
                    );
                }
            }
        }
        CaseClass::ParseError => {
            ensure!(
                case.spec.expected.exit_code == 1,
                "Case {} expected exit code must be 1 for parse_error",
                case.name
            );
            let expected_file = case
                .spec
                .expected
                .error_contains_file
                .as_deref()
                .with_context(|| format!("Missing error expectation file in {}", case.name))?;
            let expected_error = case.read_text(expected_file)?;
            let expected_error = expected_error.trim();

            let error = parse_result.expect_err("expected parse failure");
            let actual = error.to_string();
            ensure!(
                actual.contains(expected_error),
                "Expected parse error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
    }

    Ok(())
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for case in cases {
        run_case(&case)?;
    }
    Ok(())
}
