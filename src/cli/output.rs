use crate::checker::decorations::Action;
use crate::{CheckResult, SpellError};
use colored::*;
use console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonError {
    file: String,
    line: usize,
    column: usize,
    word: String,
    suggestions: Vec<String>,
    context: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonOutput {
    files_checked: usize,
    total_errors: usize,
    errors: Vec<JsonError>,
}

pub fn print_errors(
    file_path: &Path,
    result: &CheckResult,
    colored_output: bool,
    format: &OutputFormat,
) {
    match format {
        OutputFormat::Text => print_text_errors(file_path, result, colored_output),
        OutputFormat::Json => print_json_errors(file_path, result),
    }
}

fn print_text_errors(file_path: &Path, result: &CheckResult, colored_output: bool) {
    if result.errors.is_empty() {
        return;
    }

    let file_name = file_path.display().to_string();

    if colored_output {
        println!("\n{}", file_name.bold().underline());
    } else {
        println!("\n{}", file_name);
    }

    for error in &result.errors {
        let line_info = format!("{}:{}", error.line, error.column);

        if colored_output {
            println!(
                "  {} {} {}",
                line_info.blue().bold(),
                error.word.red().bold(),
                format_context(&error.context, &error.word, colored_output).dimmed()
            );
        } else {
            println!("  {} {} {}", line_info, error.word, &error.context);
        }

        if !error.suggestions.is_empty() {
            let joined = if colored_output {
                error
                    .suggestions
                    .iter()
                    .map(|s| s.green().to_string())
                    .collect::<Vec<_>>()
                    .join(&", ".dimmed().to_string())
            } else {
                error.suggestions.join(", ")
            };
            println!("    → {}", joined);
        }
    }
}

fn print_json_errors(file_path: &Path, result: &CheckResult) {
    let json_errors: Vec<JsonError> = result
        .errors
        .iter()
        .map(|e| JsonError {
            file: file_path.display().to_string(),
            line: e.line,
            column: e.column,
            word: e.word.clone(),
            suggestions: e.suggestions.clone(),
            context: e.context.clone(),
        })
        .collect();

    let output = JsonOutput {
        files_checked: 1,
        total_errors: result.error_count,
        errors: json_errors,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "failed to serialize report"),
    }
}

fn format_context(context: &str, word: &str, colored: bool) -> String {
    if colored {
        context.replace(word, &word.red().bold().underline().to_string())
    } else {
        context.to_string()
    }
}

pub fn print_check_summary(total_errors: usize, files: &[impl AsRef<Path>], colored: bool) {
    println!();
    if total_errors == 0 {
        if colored {
            println!("{}", "✓ No spelling errors found!".green().bold());
        } else {
            println!("✓ No spelling errors found!");
        }
    } else {
        let error_word = if total_errors == 1 { "error" } else { "errors" };
        let file_word = if files.len() == 1 { "file" } else { "files" };
        if colored {
            println!(
                "{} {} {} found in {} {}",
                "✗".red().bold(),
                total_errors.to_string().red().bold(),
                error_word,
                files.len(),
                file_word
            );
        } else {
            println!(
                "✗ {} {} found in {} {}",
                total_errors,
                error_word,
                files.len(),
                file_word
            );
        }
    }
}

pub fn print_fix_summary(total_fixed: usize, files: &[impl AsRef<Path>], colored: bool) {
    println!();
    if total_fixed == 0 {
        if colored {
            println!("{}", "No corrections needed!".green().bold());
        } else {
            println!("No corrections needed!");
        }
    } else {
        let fix_word = if total_fixed == 1 { "correction" } else { "corrections" };
        let file_word = if files.len() == 1 { "file" } else { "files" };
        if colored {
            println!(
                "{} {} {} applied to {} {}",
                "✓".green().bold(),
                total_fixed.to_string().green().bold(),
                fix_word,
                files.len(),
                file_word
            );
        } else {
            println!(
                "✓ {} {} applied to {} {}",
                total_fixed,
                fix_word,
                files.len(),
                file_word
            );
        }
    }
}

/// What the user picked for one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Apply(Action),
    Skip,
    Quit,
}

/// Build the menu for one marker. The index of each entry maps to the
/// returned choice.
pub fn prompt_entries(error: &SpellError) -> Vec<(String, PromptChoice)> {
    let mut entries: Vec<(String, PromptChoice)> = error
        .suggestions
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, s)| (format!("Replace with \"{}\"", s), PromptChoice::Apply(Action::Replace(i))))
        .collect();

    entries.push(("Ignore this occurrence".to_string(), PromptChoice::Apply(Action::Ignore)));
    entries.push((
        format!("Add \"{}\" to dictionary", error.word),
        PromptChoice::Apply(Action::AddToDictionary),
    ));
    if let Some(first) = error.suggestions.first() {
        entries.push((
            format!("Always correct to \"{}\"", first),
            PromptChoice::Apply(Action::AlwaysCorrect),
        ));
    }
    entries.push(("Skip".to_string(), PromptChoice::Skip));
    entries.push(("Quit".to_string(), PromptChoice::Quit));
    entries
}

pub fn print_interactive_prompt(error: &SpellError, colored: bool) -> PromptChoice {
    if colored {
        println!(
            "\n{} {}:{}",
            "Misspelling found:".yellow().bold(),
            error.line.to_string().blue(),
            error.column.to_string().blue()
        );
    } else {
        println!("\nMisspelling found: {}:{}", error.line, error.column);
    }
    println!("  {}", format_context(&error.context, &error.word, colored));

    let entries = prompt_entries(error);
    let labels: Vec<&str> = entries.iter().map(|(label, _)| label.as_str()).collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("\"{}\"", error.word))
        .items(&labels)
        .default(0)
        .interact_on_opt(&Term::stderr());

    match selection {
        Ok(Some(index)) => entries[index].1,
        Ok(None) => PromptChoice::Skip,
        Err(e) => {
            tracing::warn!(error = %e, "prompt failed, stopping interactive mode");
            PromptChoice::Quit
        }
    }
}
