use std::ops::Range;

/// One run per non-empty line, in character offsets. Line terminators
/// (`\n`, and a `\r` before it) stay outside the runs.
pub fn line_runs(content: &str) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut line_start = 0;
    let mut pos = 0;
    let mut prev_cr = false;

    for ch in content.chars() {
        if ch == '\n' {
            let end = if prev_cr { pos - 1 } else { pos };
            if end > line_start {
                runs.push(line_start..end);
            }
            line_start = pos + 1;
        }
        prev_cr = ch == '\r';
        pos += 1;
    }

    if pos > line_start {
        runs.push(line_start..pos);
    }

    runs
}
