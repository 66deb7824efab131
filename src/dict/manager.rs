use crate::checker::dictionary::{HunspellDictionary, WordListDictionary};
use crate::checker::parse_word_list;
use crate::config::Config;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DICTIONARIES_BASE_URL: &str =
    "https://raw.githubusercontent.com/wooorm/dictionaries/main/dictionaries";

/// Language codes we know how to fetch, mapped to the upstream directory name.
const LANGUAGES: &[(&str, &str)] = &[
    ("en_US", "en"),
    ("en_GB", "en-GB"),
    ("en_CA", "en-CA"),
    ("en_AU", "en-AU"),
    ("de_DE", "de"),
    ("fr_FR", "fr"),
    ("es_ES", "es"),
    ("nl_NL", "nl"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryFormat {
    Hunspell,
    WordList,
}

#[derive(Debug, Clone)]
pub struct DictionaryInfo {
    pub language: String,
    pub format: DictionaryFormat,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Remote affix and dictionary URLs for a language.
pub fn source_urls(language: &str) -> Option<(String, String)> {
    let (_, upstream) = LANGUAGES.iter().find(|(code, _)| *code == language)?;
    Some((
        format!("{}/{}/index.aff", DICTIONARIES_BASE_URL, upstream),
        format!("{}/{}/index.dic", DICTIONARIES_BASE_URL, upstream),
    ))
}

/// Installed dictionaries in `dir`, sorted by language.
pub fn installed(dir: &Path) -> Result<Vec<DictionaryInfo>> {
    let mut found = Vec::new();
    if !dir.exists() {
        return Ok(found);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("dic") if path.with_extension("aff").exists() => DictionaryFormat::Hunspell,
            Some("fst") => DictionaryFormat::WordList,
            _ => continue,
        };
        let Some(language) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let size_bytes = fs::metadata(&path)?.len();
        found.push(DictionaryInfo {
            language: language.to_string(),
            format,
            path: path.clone(),
            size_bytes,
        });
    }

    found.sort_by(|a, b| a.language.cmp(&b.language));
    Ok(found)
}

pub fn list_dictionaries() -> Result<()> {
    let data_dir = Config::data_dir().context("Failed to get data directory")?;
    let dictionaries = installed(&data_dir)?;

    if dictionaries.is_empty() {
        println!("{}", "No dictionaries installed.".yellow());
        println!(
            "Run {} to download a dictionary.",
            "scribecheck dict download en_US".cyan()
        );
        return Ok(());
    }

    println!("{}", "Installed dictionaries:".bold());
    println!();

    for info in &dictionaries {
        let format = match info.format {
            DictionaryFormat::Hunspell => "hunspell",
            DictionaryFormat::WordList => "word list",
        };
        println!(
            "  {} {} {} ({})",
            "✓".green(),
            info.language.cyan().bold(),
            format.dimmed(),
            format!("{}KB", info.size_bytes / 1024).dimmed()
        );
    }

    println!();
    println!(
        "Data directory: {}",
        data_dir.display().to_string().dimmed()
    );

    Ok(())
}

fn fetch(url: &str) -> Result<String> {
    let response = reqwest::blocking::get(url).with_context(|| format!("Failed to fetch {}", url))?;
    if !response.status().is_success() {
        anyhow::bail!("Failed to fetch {}: HTTP {}", url, response.status());
    }
    response.text().with_context(|| format!("Failed to read {}", url))
}

pub fn download_dictionary(language: &str) -> Result<()> {
    let Some((aff_url, dic_url)) = source_urls(language) else {
        let known: Vec<&str> = LANGUAGES.iter().map(|(code, _)| *code).collect();
        anyhow::bail!(
            "Language '{}' is not supported. Available: {}",
            language,
            known.join(", ")
        );
    };

    println!(
        "{} dictionary for {}...",
        "Downloading".cyan().bold(),
        language.yellow()
    );
    println!("Source: {}", dic_url.dimmed());

    let data_dir = Config::data_dir().context("Failed to get data directory")?;
    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Fetching affix file...");
    let aff = fetch(&aff_url)?;
    pb.set_message("Fetching word list...");
    let dic = fetch(&dic_url)?;

    pb.set_message("Validating...");
    HunspellDictionary::new(&aff, &dic)
        .with_context(|| format!("Downloaded dictionary for {} does not parse", language))?;
    pb.finish_with_message("Download complete");

    let aff_path = data_dir.join(format!("{}.aff", language));
    let dic_path = data_dir.join(format!("{}.dic", language));
    fs::write(&aff_path, aff).with_context(|| format!("Failed to write {}", aff_path.display()))?;
    fs::write(&dic_path, dic).with_context(|| format!("Failed to write {}", dic_path.display()))?;
    tracing::debug!(path = %dic_path.display(), "dictionary installed");

    println!(
        "{} Dictionary installed: {}",
        "✓".green().bold(),
        dic_path.display().to_string().cyan()
    );

    Ok(())
}

pub fn update_dictionaries() -> Result<()> {
    let data_dir = Config::data_dir().context("Failed to get data directory")?;
    let languages: Vec<String> = installed(&data_dir)?
        .into_iter()
        .filter(|info| info.format == DictionaryFormat::Hunspell)
        .map(|info| info.language)
        .collect();

    if languages.is_empty() {
        println!("{}", "No dictionaries to update.".yellow());
        return Ok(());
    }

    println!(
        "{} {} {}...",
        "Updating".cyan().bold(),
        languages.len(),
        if languages.len() == 1 {
            "dictionary"
        } else {
            "dictionaries"
        }
    );
    println!();

    for language in languages {
        download_dictionary(&language)?;
        println!();
    }

    println!("{} All dictionaries updated!", "✓".green().bold());

    Ok(())
}

/// Compile a plain word list (one word per line) into `<language>.fst`.
pub fn build_word_list(language: &str, source: &Path) -> Result<PathBuf> {
    let content = fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let words: Vec<String> = parse_word_list(&content).collect();
    if words.is_empty() {
        anyhow::bail!("{} contains no words", source.display());
    }

    let data_dir = Config::data_dir().context("Failed to get data directory")?;
    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
    let output = data_dir.join(format!("{}.fst", language));
    WordListDictionary::build(&words, &output)?;

    println!(
        "{} Built word list with {} words: {}",
        "✓".green().bold(),
        words.len().to_string().yellow(),
        output.display().to_string().cyan()
    );
    Ok(output)
}

/// The header line of a `.dic` file is its approximate word count.
fn declared_word_count(dic: &str) -> Option<usize> {
    dic.lines().next()?.trim().parse().ok()
}

pub fn show_info(language: &str) -> Result<()> {
    let data_dir = Config::data_dir().context("Failed to get data directory")?;
    let aff_path = data_dir.join(format!("{}.aff", language));
    let dic_path = data_dir.join(format!("{}.dic", language));
    let fst_path = data_dir.join(format!("{}.fst", language));

    if dic_path.exists() && aff_path.exists() {
        let aff = fs::read_to_string(&aff_path)?;
        let dic = fs::read_to_string(&dic_path)?;

        println!("{}", format!("Dictionary: {}", language).bold());
        println!("  Affix: {}", aff_path.display());
        println!("  Words: {}", dic_path.display());
        println!(
            "  Size: {} KB",
            (aff.len() + dic.len()) / 1024
        );
        println!("  Format: Hunspell");
        match declared_word_count(&dic) {
            Some(count) => println!("  Entries: {}", count),
            None => println!("  Entries: {}", "Unknown".yellow()),
        }
        match HunspellDictionary::new(&aff, &dic) {
            Ok(_) => println!("  Status: {}", "OK".green()),
            Err(e) => println!("  {}: {}", "Error loading dictionary".red(), e),
        }
        return Ok(());
    }

    if fst_path.exists() {
        println!("{}", format!("Dictionary: {}", language).bold());
        println!("  Path: {}", fst_path.display());
        println!("  Size: {} KB", fs::metadata(&fst_path)?.len() / 1024);
        println!("  Format: FST word list");
        match WordListDictionary::open(&fst_path) {
            Ok(dict) => println!("  Entries: {}", dict.len()),
            Err(e) => println!("  {}: {}", "Error loading dictionary".red(), e),
        }
        return Ok(());
    }

    println!(
        "{} Dictionary for {} not found.",
        "✗".red().bold(),
        language.yellow()
    );
    println!(
        "Run {} to download it.",
        format!("scribecheck dict download {}", language).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_source_urls() {
        let (aff, dic) = source_urls("en_GB").unwrap();
        assert!(aff.ends_with("/en-GB/index.aff"));
        assert!(dic.ends_with("/en-GB/index.dic"));
        assert!(source_urls("xx_XX").is_none());
    }

    #[test]
    fn test_installed_requires_affix_pair() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("en_US.aff"), "SET UTF-8\n").unwrap();
        fs::write(dir.path().join("en_US.dic"), "1\nhello\n").unwrap();
        fs::write(dir.path().join("de_DE.dic"), "1\nhallo\n").unwrap();
        WordListDictionary::build(&["rust".to_string()], &dir.path().join("tech.fst")).unwrap();

        let found = installed(dir.path()).unwrap();
        let names: Vec<(&str, DictionaryFormat)> = found
            .iter()
            .map(|info| (info.language.as_str(), info.format))
            .collect();
        assert_eq!(
            names,
            vec![
                ("en_US", DictionaryFormat::Hunspell),
                ("tech", DictionaryFormat::WordList)
            ]
        );
    }

    #[test]
    fn test_installed_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(installed(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_declared_word_count() {
        assert_eq!(declared_word_count("49569\nhello\n"), Some(49569));
        assert_eq!(declared_word_count("hello\n"), None);
    }
}
