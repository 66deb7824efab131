use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use rayon::prelude::*;
use scribecheck::checker::decorations::MarkerState;
use scribecheck::checker::dictionary::{self, Dictionary, DictionarySource, WordListDictionary};
use scribecheck::checker::overrides::{FileOverrideStore, OverrideStore};
use scribecheck::cli::output::{self, OutputFormat, PromptChoice};
use scribecheck::document::Document;
use scribecheck::{dict, CheckResult, Config, Engine, ErrorKind, FlaggedError, SpellError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const CHECKED_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "txt", "text"];

#[derive(Parser, Debug)]
#[command(name = "scribecheck")]
#[command(version, about = "Spell-check and autocorrect for prose files", long_about = None)]
struct Cli {
    /// Files or directories to check
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Apply autocorrect rules and write the files back
    #[arg(short, long)]
    fix: bool,

    /// Walk through each misspelling and pick an action
    #[arg(short, long, requires = "fix")]
    interactive: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with code 0 even if errors are found
    #[arg(long)]
    no_fail: bool,

    /// Language/dictionary to use (e.g., en_US, en_GB)
    #[arg(short, long, default_value = "en_US")]
    language: String,

    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Add words to personal dictionary
    #[arg(long)]
    add_to_dict: Vec<String>,

    /// Pattern to ignore (regex)
    #[arg(long)]
    ignore_pattern: Vec<String>,

    /// Personal dictionary file
    #[arg(long)]
    personal_dict: Option<PathBuf>,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Dictionary management
    Dict {
        #[command(subcommand)]
        action: DictCommands,
    },
    /// Per-file overrides (personal words, ignored occurrences, autocorrect rules)
    Overrides {
        #[command(subcommand)]
        action: OverrideCommands,
    },
}

#[derive(Parser, Debug)]
enum DictCommands {
    /// List installed dictionaries
    List,
    /// Download a Hunspell dictionary
    Download {
        /// Language code (e.g., en_US, en_GB, fr_FR)
        language: String,
    },
    /// Update all dictionaries
    Update,
    /// Show dictionary info
    Info {
        /// Language code
        language: String,
    },
    /// Compile a plain word list into a dictionary
    Build {
        /// Name to install the word list under
        language: String,
        /// Text file with one word per line
        source: PathBuf,
    },
}

#[derive(Parser, Debug)]
enum OverrideCommands {
    /// Print the stored overrides of a file
    Show { file: PathBuf },
    /// Forget the stored overrides of a file
    Clear { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SCRIBECHECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "scribecheck", &mut io::stdout());
        return Ok(());
    }

    // Handle subcommands
    if let Some(command) = cli.command {
        return handle_command(command);
    }

    let config = Config::load(
        cli.language.clone(),
        cli.personal_dict.clone(),
        cli.ignore_pattern.clone(),
    )?;

    if !cli.add_to_dict.is_empty() {
        let added = config.append_personal_words(&cli.add_to_dict)?;
        println!("Added {} word(s) to the personal dictionary", added);
        if cli.files.is_empty() {
            return Ok(());
        }
    }

    if cli.files.is_empty() {
        anyhow::bail!("No files specified. Use --help for usage information.");
    }

    let files = collect_files(&cli.files);
    let colored = !cli.no_color && console::Term::stdout().is_term();
    let dictionary = load_dictionary(&config);
    let store = FileOverrideStore::new(
        Config::overrides_dir().context("Failed to get data directory")?,
    );

    let (total_errors, total_fixed) = if cli.interactive {
        fix_interactive(&files, &config, dictionary, &store, colored)?
    } else {
        check_all(&files, &config, dictionary, &store, cli.fix, colored, &cli.format)
    };

    // Print summary
    if cli.fix {
        output::print_fix_summary(total_fixed, &files, colored);
    } else if cli.format == OutputFormat::Text {
        output::print_check_summary(total_errors, &files, colored);
    }

    // Exit with appropriate code
    if total_errors > 0 && !cli.no_fail && !cli.fix {
        std::process::exit(1);
    }

    Ok(())
}

/// Expand directories (respecting ignore files) into the prose files below them.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in ignore::WalkBuilder::new(path).build() {
                match entry {
                    Ok(entry) => {
                        let candidate = entry.path();
                        let checked = candidate
                            .extension()
                            .and_then(|ext| ext.to_str())
                            .is_some_and(|ext| CHECKED_EXTENSIONS.contains(&ext));
                        if candidate.is_file() && checked {
                            files.push(candidate.to_path_buf());
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
                }
            }
        } else {
            eprintln!("Error: File not found: {}", path.display());
        }
    }
    files
}

/// Load the configured dictionary once for all files. Missing or broken
/// dictionaries leave checking fail-open.
fn load_dictionary(config: &Config) -> Option<Arc<dyn Dictionary>> {
    let (aff, dic) = config.dictionary_paths()?;

    if aff.exists() && dic.exists() {
        let runtime = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "could not start runtime for dictionary load");
                return None;
            }
        };
        return match runtime.block_on(dictionary::load(
            DictionarySource::File(aff),
            DictionarySource::File(dic),
        )) {
            Ok(dictionary) => Some(Arc::new(dictionary)),
            Err(e) => {
                eprintln!("Warning: {}; no words will be flagged", e);
                None
            }
        };
    }

    let word_list = dic.with_extension("fst");
    if word_list.exists() {
        return match WordListDictionary::open(&word_list) {
            Ok(dictionary) => Some(Arc::new(dictionary)),
            Err(e) => {
                eprintln!("Warning: {}; no words will be flagged", e);
                None
            }
        };
    }

    eprintln!(
        "Warning: no dictionary installed for {}; run `scribecheck dict download {}`",
        config.language, config.language
    );
    None
}

fn document_id(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn open_engine<S: OverrideStore + 'static>(
    path: &Path,
    config: &Config,
    dictionary: Option<&Arc<dyn Dictionary>>,
    store: S,
) -> Engine {
    let mut engine = Engine::new(document_id(path), config, store);
    if let Some(dictionary) = dictionary {
        engine.set_dictionary(Arc::clone(dictionary), Instant::now());
    }
    engine
}

fn locate_all(engine: &Engine, doc: &Document) -> Vec<SpellError> {
    engine
        .flagged_errors()
        .iter()
        .map(|error| SpellError::locate(error, doc))
        .collect()
}

/// Check one file. With `fix`, autocorrect rules are applied and the file is
/// rewritten when its text changed.
fn check_file(
    path: &Path,
    config: &Config,
    dictionary: Option<&Arc<dyn Dictionary>>,
    store: &FileOverrideStore,
    fix: bool,
) -> Result<CheckResult> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut doc = Document::from_file_content(path, &content);
    let mut engine = open_engine(path, config, dictionary, store.clone());

    let (report, _) = engine.check_now(&mut doc);
    let errors = locate_all(&engine, &doc);

    if fix && doc.text() != content {
        fs::write(path, doc.text())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(CheckResult {
        error_count: errors.len(),
        fixed_count: report.corrected,
        errors,
    })
}

fn check_all(
    files: &[PathBuf],
    config: &Config,
    dictionary: Option<Arc<dyn Dictionary>>,
    store: &FileOverrideStore,
    fix: bool,
    colored: bool,
    format: &OutputFormat,
) -> (usize, usize) {
    // Without --fix, keep the text exactly as on disk so positions match.
    let mut config = config.clone();
    config.autocorrect = fix;

    let results: Vec<Result<CheckResult>> = files
        .par_iter()
        .map(|path| check_file(path, &config, dictionary.as_ref(), store, fix))
        .collect();

    let mut total_errors = 0;
    let mut total_fixed = 0;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(result) => {
                output::print_errors(path, &result, colored, format);
                total_errors += result.error_count;
                total_fixed += result.fixed_count;
            }
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }
    (total_errors, total_fixed)
}

fn fix_interactive(
    files: &[PathBuf],
    config: &Config,
    dictionary: Option<Arc<dyn Dictionary>>,
    store: &FileOverrideStore,
    colored: bool,
) -> Result<(usize, usize)> {
    let mut total_errors = 0;
    let mut total_fixed = 0;

    'files: for path in files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut doc = Document::from_file_content(path, &content);
        let mut engine = open_engine(path, config, dictionary.as_ref(), store.clone());

        let (report, _) = engine.check_now(&mut doc);
        total_fixed += report.corrected;
        let mut quit = false;

        let ids: Vec<_> = engine.decorations().iter().map(|d| d.id).collect();
        for id in ids {
            // Earlier actions may have resolved this marker already.
            let Some(marker) = engine.decorations().into_iter().find(|d| d.id == id) else {
                continue;
            };
            let flagged = FlaggedError {
                word: marker.word,
                from: marker.from,
                to: marker.to,
                suggestions: marker.suggestions,
                kind: ErrorKind::Spelling,
            };

            match output::print_interactive_prompt(&SpellError::locate(&flagged, &doc), colored) {
                PromptChoice::Apply(action) => {
                    match engine.resolve(&mut doc, id, action, Instant::now()) {
                        Ok(resolution) => {
                            tracing::debug!(word = %resolution.word, state = ?resolution.state, "resolved");
                            if matches!(
                                resolution.state,
                                MarkerState::Replaced | MarkerState::AutocorrectAdded
                            ) {
                                total_fixed += 1;
                            }
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                PromptChoice::Skip => total_errors += 1,
                PromptChoice::Quit => {
                    quit = true;
                    break;
                }
            }
        }

        if doc.text() != content {
            fs::write(path, doc.text())
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        engine
            .flush_overrides()
            .with_context(|| format!("Failed to save overrides for {}", path.display()))?;

        if quit {
            break 'files;
        }
    }

    Ok((total_errors, total_fixed))
}

fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Dict { action } => match action {
            DictCommands::List => {
                dict::manager::list_dictionaries()?;
            }
            DictCommands::Download { language } => {
                dict::manager::download_dictionary(&language)?;
            }
            DictCommands::Update => {
                dict::manager::update_dictionaries()?;
            }
            DictCommands::Info { language } => {
                dict::manager::show_info(&language)?;
            }
            DictCommands::Build { language, source } => {
                dict::manager::build_word_list(&language, &source)?;
            }
        },
        Commands::Overrides { action } => {
            let store = FileOverrideStore::new(
                Config::overrides_dir().context("Failed to get data directory")?,
            );
            match action {
                OverrideCommands::Show { file } => show_overrides(&store, &file)?,
                OverrideCommands::Clear { file } => {
                    if store.remove(&document_id(&file))? {
                        println!("Cleared overrides for {}", file.display());
                    } else {
                        println!("No overrides stored for {}", file.display());
                    }
                }
            }
        }
    }
    Ok(())
}

fn show_overrides(store: &FileOverrideStore, file: &Path) -> Result<()> {
    let Some(overrides) = store.load(&document_id(file))? else {
        println!("No overrides stored for {}", file.display());
        return Ok(());
    };

    println!("Overrides for {}", file.display());
    let words: Vec<&str> = overrides.personal_dictionary().collect();
    println!("  Personal words: {}", words.join(", "));
    for occurrence in overrides.ignored_occurrences() {
        println!(
            "  Ignored: {} at {}..{}",
            occurrence.word, occurrence.from, occurrence.to
        );
    }
    for (word, correction) in overrides.autocorrect_map() {
        println!("  Autocorrect: {} -> {}", word, correction);
    }
    Ok(())
}
