use crate::checker::dictionary::WordListDictionary;

/// Rank word-list candidates for a misspelling using edit distance.
pub fn generate<D: AsRef<[u8]>>(
    word: &str,
    dictionary: &WordListDictionary<D>,
    max_suggestions: usize,
) -> Vec<String> {
    // Try progressively more expensive operations
    let mut suggestions: Vec<String> = Vec::new();
    let chars: Vec<char> = word.chars().collect();

    // 1. Prefix matching (fast)
    if chars.len() >= 3 {
        let prefix: String = chars[..3].iter().collect();
        let mut prefix_matches = dictionary.words_with_prefix(&prefix);
        prefix_matches.sort_by_key(|w| edit_distance(word, w));

        for candidate in prefix_matches {
            if edit_distance(word, &candidate) <= 2 {
                push_unique(&mut suggestions, candidate);
            }
        }
    }

    if suggestions.len() >= max_suggestions {
        suggestions.truncate(max_suggestions);
        return suggestions;
    }

    // 2. Single-edit transformations that land on a dictionary word
    for transform in generate_transformations(word) {
        if dictionary.contains(&transform) {
            push_unique(&mut suggestions, transform);
            if suggestions.len() >= max_suggestions {
                suggestions.truncate(max_suggestions);
                return suggestions;
            }
        }
    }

    // 3. Shorter prefix, looser distance
    if chars.len() >= 2 {
        let prefix: String = chars[..2].iter().collect();
        let mut prefix_matches = dictionary.words_with_prefix(&prefix);
        prefix_matches.sort_by_key(|w| edit_distance(word, w));

        for candidate in prefix_matches {
            if edit_distance(word, &candidate) <= 3 {
                push_unique(&mut suggestions, candidate);
                if suggestions.len() >= max_suggestions {
                    suggestions.truncate(max_suggestions);
                    return suggestions;
                }
            }
        }
    }

    // 4. Bounded scan for very short words only
    if chars.len() <= 3 {
        let mut candidates: Vec<(usize, String)> = dictionary
            .words_near_length(chars.len(), 1, 100)
            .into_iter()
            .filter_map(|w| {
                let dist = edit_distance(word, &w);
                (dist <= 2 && !suggestions.contains(&w)).then_some((dist, w))
            })
            .collect();

        candidates.sort_by_key(|(dist, _)| *dist);

        for (_, candidate) in candidates {
            suggestions.push(candidate);
            if suggestions.len() >= max_suggestions {
                break;
            }
        }
    }

    suggestions.truncate(max_suggestions);
    suggestions
}

fn push_unique(suggestions: &mut Vec<String>, candidate: String) {
    if !suggestions.contains(&candidate) {
        suggestions.push(candidate);
    }
}

/// Levenshtein distance between two strings
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1) // deletion
                .min(current[j] + 1) // insertion
                .min(previous[j] + cost); // substitution
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Common single-edit typos of a word
fn generate_transformations(word: &str) -> Vec<String> {
    let mut transformations = Vec::new();
    let chars: Vec<char> = word.chars().collect();

    // Deletions
    for i in 0..chars.len() {
        let mut new_word = chars.clone();
        new_word.remove(i);
        transformations.push(new_word.iter().collect());
    }

    // Transpositions (swap adjacent)
    for i in 0..chars.len().saturating_sub(1) {
        let mut new_word = chars.clone();
        new_word.swap(i, i + 1);
        transformations.push(new_word.iter().collect());
    }

    // Doubled letters dropped while typing ("helo" -> "hello")
    for i in 0..chars.len() {
        let mut new_word = chars.clone();
        new_word.insert(i, chars[i]);
        transformations.push(new_word.iter().collect());
    }

    // Any missing letter ("wrld" -> "world")
    for i in 0..=chars.len() {
        for letter in 'a'..='z' {
            let mut new_word = chars.clone();
            new_word.insert(i, letter);
            transformations.push(new_word.iter().collect());
        }
    }

    // Replacements (common typos)
    let common_replacements = [
        ('a', 'e'),
        ('e', 'i'),
        ('i', 'o'),
        ('o', 'u'),
        ('b', 'v'),
        ('c', 'k'),
        ('f', 'v'),
        ('g', 'j'),
        ('m', 'n'),
        ('s', 'z'),
        ('t', 'd'),
    ];

    for (i, &ch) in chars.iter().enumerate() {
        for &(from, to) in &common_replacements {
            if ch == from {
                let mut new_word = chars.clone();
                new_word[i] = to;
                transformations.push(new_word.iter().collect());
            }
        }
    }

    // Any other wrong letter
    for (i, &ch) in chars.iter().enumerate() {
        for letter in ('a'..='z').filter(|&l| l != ch) {
            let mut new_word = chars.clone();
            new_word[i] = letter;
            transformations.push(new_word.iter().collect());
        }
    }

    transformations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("hello", "hello"), 0);
        assert_eq!(edit_distance("hello", "hallo"), 1);
        assert_eq!(edit_distance("helo", "hello"), 1);
        assert_eq!(edit_distance("hello", "world"), 4);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_transformations() {
        let transforms = generate_transformations("hello");
        assert!(transforms.contains(&"hllo".to_string())); // deletion
        assert!(transforms.contains(&"ehllo".to_string())); // transposition
        assert!(generate_transformations("helo").contains(&"hello".to_string()));
    }

    #[test]
    fn test_generate_missing_letter() {
        let dict = WordListDictionary::from_words(["hello", "world", "word"]).unwrap();
        let suggestions = generate("wrld", &dict, 5);
        assert_eq!(suggestions[0], "world");
    }

    #[test]
    fn test_generate_wrong_letter() {
        let dict = WordListDictionary::from_words(["house", "mouse"]).unwrap();
        let suggestions = generate("hoxse", &dict, 5);
        assert!(suggestions.contains(&"house".to_string()));
    }

    #[test]
    fn test_generate_ranks_closest_first() {
        let dict = WordListDictionary::from_words(["hello", "helmet", "help", "world"]).unwrap();
        let suggestions = generate("helo", &dict, 3);
        assert_eq!(suggestions[0], "hello");
        assert!(suggestions.len() <= 3);
        assert!(!suggestions.contains(&"world".to_string()));
    }

    #[test]
    fn test_short_words_scan() {
        let dict = WordListDictionary::from_words(["an", "as", "the"]).unwrap();
        let suggestions = generate("az", &dict, 5);
        assert!(suggestions.contains(&"as".to_string()));
    }

    #[test]
    fn test_multibyte_prefix_does_not_panic() {
        let dict = WordListDictionary::from_words(["café"]).unwrap();
        let _ = generate("éé", &dict, 5);
    }
}
