use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::ops::Range;

/// Character ranges of the prose in a Markdown source (skip code blocks,
/// inline code, HTML, link destinations, entities and escapes). Offsets point into the source
/// itself, so edits can be written straight back to the file.
pub fn prose_runs(content: &str) -> Vec<Range<usize>> {
    let to_char = char_offsets(content);
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut in_code_block = false;

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
            }
            Event::Text(text) if !in_code_block => {
                // Entities and escapes decode to text the source does not
                // spell out; their offsets cannot be mapped back, so skip them.
                if content[range.clone()] != *text {
                    continue;
                }
                let run = to_char[range.start]..to_char[range.end];
                match runs.last_mut() {
                    Some(last) if last.end == run.start => last.end = run.end,
                    _ => runs.push(run),
                }
            }
            _ => {}
        }
    }

    runs
}

/// Map every byte offset (including one past the end) to a char offset.
fn char_offsets(content: &str) -> Vec<usize> {
    let mut map = vec![0; content.len() + 1];
    let mut chars = 0;
    for (byte, ch) in content.char_indices() {
        for slot in &mut map[byte..byte + ch.len_utf8()] {
            *slot = chars;
        }
        chars += 1;
    }
    map[content.len()] = chars;
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slices(content: &str) -> Vec<String> {
        prose_runs(content)
            .into_iter()
            .map(|r| content.chars().skip(r.start).take(r.end - r.start).collect())
            .collect()
    }

    #[test]
    fn test_markdown_prose_only() {
        let content = r#"
# Title

This is a test paragraph with some words.

```rust
fn main() {
    println!("This should be ignored");
}
```

More text with `inline_code` here.
"#;

        let runs = slices(content);
        assert!(runs.iter().any(|r| r == "Title"));
        assert!(runs.iter().any(|r| r.contains("test paragraph")));
        assert!(!runs.iter().any(|r| r.contains("println")));
        assert!(!runs.iter().any(|r| r.contains("inline_code")));
    }

    #[test]
    fn test_offsets_point_into_source() {
        let content = "Some *emphasis* here";
        let runs = prose_runs(content);
        assert_eq!(runs, vec![0..5, 6..14, 15..20]);
    }

    #[test]
    fn test_entities_and_escapes_are_skipped() {
        let runs = slices("Tom &amp; Jerry like snake\\_case");
        assert!(!runs.iter().any(|r| r.contains("amp")));
        assert!(!runs.iter().any(|r| r.contains('\\')));
        assert!(runs.iter().any(|r| r.contains("Tom")));
        assert!(runs.iter().any(|r| r.contains("Jerry")));
    }

    #[test]
    fn test_char_offsets_with_multibyte() {
        let map = char_offsets("é a");
        assert_eq!(map[2], 1);
        assert_eq!(map[4], 3);
    }
}
