use crate::checker::tokenizer::WordBoundary;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub language: String,
    pub personal_dictionary: Option<PathBuf>,
    pub ignore_patterns: Vec<String>,

    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Quiet period after the last edit before a pass runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,

    #[serde(default)]
    pub word_boundary: WordBoundary,

    #[serde(default = "default_autocorrect")]
    pub autocorrect: bool,
}

fn default_max_suggestions() -> usize {
    5
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_min_word_length() -> usize {
    1
}

/// Extra suppression seeded by [`Config::load`] for command-line checks of
/// technical prose. Embedders start from [`Config::default`] without it.
const CLI_IGNORE_PATTERNS: &[&str] = &[
    r"\b[A-Z0-9_]{2,}\b",    // ALL_CAPS
    r"\b[a-fA-F0-9]{32,}\b", // Hashes
];

fn default_autocorrect() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "en_US".to_string(),
            personal_dictionary: None,
            ignore_patterns: vec![
                r"https?://\S+".to_string(), // URLs
                r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}".to_string(), // Emails
            ],
            max_suggestions: default_max_suggestions(),
            debounce_ms: default_debounce_ms(),
            min_word_length: default_min_word_length(),
            word_boundary: WordBoundary::Ascii,
            autocorrect: default_autocorrect(),
        }
    }
}

impl Config {
    /// Load configuration with priority: CLI args > local config > global config > defaults
    pub fn load(
        language: String,
        personal_dict: Option<PathBuf>,
        cli_patterns: Vec<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        config
            .ignore_patterns
            .extend(CLI_IGNORE_PATTERNS.iter().map(|p| p.to_string()));

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        let local_path = PathBuf::from(".scribecheck.toml");
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        }

        // Apply CLI overrides
        config.language = language;
        if let Some(dict) = personal_dict {
            config.personal_dictionary = Some(dict);
        }
        if !cli_patterns.is_empty() {
            config.ignore_patterns.extend(cli_patterns);
        }

        // Set default personal dictionary if not specified
        if config.personal_dictionary.is_none() {
            config.personal_dictionary = Self::default_personal_dict_path();
        }

        // Ensure personal dictionary file exists
        if let Some(path) = &config.personal_dictionary {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .context("Failed to create personal dictionary directory")?;
            }
            if !path.exists() {
                fs::write(path, "").context("Failed to create personal dictionary file")?;
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: Self) -> Self {
        // Merge logic: other's values override self's if they differ from defaults
        if other.language != "en_US" {
            self.language = other.language;
        }
        if other.personal_dictionary.is_some() {
            self.personal_dictionary = other.personal_dictionary;
        }
        if !other.ignore_patterns.is_empty() {
            self.ignore_patterns = other.ignore_patterns;
        }
        if other.max_suggestions != default_max_suggestions() {
            self.max_suggestions = other.max_suggestions;
        }
        if other.debounce_ms != default_debounce_ms() {
            self.debounce_ms = other.debounce_ms;
        }
        if other.min_word_length != default_min_word_length() {
            self.min_word_length = other.min_word_length;
        }
        if other.word_boundary != WordBoundary::default() {
            self.word_boundary = other.word_boundary;
        }
        self.autocorrect = other.autocorrect;
        self
    }

    /// Append words to the personal dictionary file, skipping ones already there.
    pub fn append_personal_words(&self, words: &[String]) -> Result<usize> {
        let Some(path) = &self.personal_dictionary else {
            anyhow::bail!("No personal dictionary configured");
        };

        let mut content = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        } else {
            String::new()
        };
        let mut known: HashSet<String> = crate::checker::parse_word_list(&content).collect();

        let mut added = 0;
        for word in words.iter().map(|w| w.trim()) {
            if word.is_empty() || !known.insert(word.to_string()) {
                continue;
            }
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(word);
            content.push('\n');
            added += 1;
        }

        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(added)
    }

    /// Affix and dictionary files for the configured language.
    pub fn dictionary_paths(&self) -> Option<(PathBuf, PathBuf)> {
        let dir = Self::data_dir()?;
        Some((
            dir.join(format!("{}.aff", self.language)),
            dir.join(format!("{}.dic", self.language)),
        ))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "scribecheck").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn default_personal_dict_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "scribecheck").map(|dirs| dirs.config_dir().join("personal.txt"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "scribecheck").map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn overrides_dir() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("overrides"))
    }
}
