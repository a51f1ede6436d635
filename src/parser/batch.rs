//! Splitting a source unit into batches.
//!
//! `GO` on a line of its own ends a batch. `GO;` and `GO <count>` are
//! accepted too. SQLCMD directive lines (`:r`, `:setvar`, `:on error` ...)
//! are lifted out of the batch text and kept beside it; the line is blanked
//! so the remaining text keeps its line numbering.

/// One batch of a source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based batch number within the unit.
    pub number: usize,
    pub content: String,
    /// 1-based line of the unit where the batch text starts.
    pub start_line: usize,
    /// Repeat count from `GO <count>`.
    pub repeat: Option<u32>,
    pub directives: Vec<SqlcmdDirective>,
}

impl Batch {
    /// Converts a 1-based line inside the batch into a line of the unit.
    pub fn file_line(&self, batch_line: usize) -> usize {
        self.start_line + batch_line.max(1) - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlcmdDirective {
    /// 1-based line of the unit.
    pub line: usize,
    /// Lowercased command, e.g. `:r` or `:setvar`.
    pub command: String,
    pub text: String,
}

/// Splits `content` into batches.
///
/// Batches that hold neither SQL text nor directives are dropped; numbering
/// counts only the batches that are kept.
pub fn split_batches(content: &str) -> Vec<Batch> {
    let estimated_batches = (content.lines().count() / 20).max(1);
    let mut batches = Vec::with_capacity(estimated_batches);
    let mut current = String::new();
    let mut directives = Vec::new();
    let mut batch_start_line = 1;
    let mut in_block_comment = false;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();

        if !in_block_comment {
            if let Some(repeat) = parse_go_line(trimmed) {
                push_batch(
                    &mut batches,
                    std::mem::take(&mut current),
                    batch_start_line,
                    repeat,
                    std::mem::take(&mut directives),
                );
                batch_start_line = line_number + 1;
                continue;
            }

            if trimmed.starts_with(':') && trimmed.len() > 1 {
                let command = trimmed
                    .split_whitespace()
                    .next()
                    .unwrap_or(trimmed)
                    .to_ascii_lowercase();
                directives.push(SqlcmdDirective {
                    line: line_number,
                    command,
                    text: trimmed.to_string(),
                });
                current.push('\n');
                continue;
            }
        }

        in_block_comment = track_block_comment(line, in_block_comment);
        current.push_str(line);
        current.push('\n');
    }

    push_batch(&mut batches, current, batch_start_line, None, directives);
    batches
}

fn push_batch(
    batches: &mut Vec<Batch>,
    content: String,
    start_line: usize,
    repeat: Option<u32>,
    directives: Vec<SqlcmdDirective>,
) {
    if content.trim().is_empty() && directives.is_empty() {
        return;
    }
    batches.push(Batch {
        number: batches.len() + 1,
        content,
        start_line,
        repeat,
        directives,
    });
}

/// Recognizes a batch separator line, returning its repeat count.
///
/// The outer `Option` says whether the line is a separator at all.
fn parse_go_line(trimmed: &str) -> Option<Option<u32>> {
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let mut parts = body.split_whitespace();
    let first = parts.next()?;
    if !first.eq_ignore_ascii_case("go") {
        return None;
    }
    match (parts.next(), parts.next()) {
        (None, _) => Some(None),
        (Some(count), None) => count.parse::<u32>().ok().map(Some),
        _ => None,
    }
}

/// Tracks whether a `/* ... */` comment is still open at the end of `line`.
///
/// String literals are honored so that `'/*'` does not open a comment.
fn track_block_comment(line: &str, mut open: bool) -> bool {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        if open {
            if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                open = false;
                i += 2;
                continue;
            }
        } else if in_string {
            if bytes[i] == b'\'' {
                in_string = false;
            }
        } else {
            match bytes[i] {
                b'\'' => in_string = true,
                b'-' if bytes.get(i + 1) == Some(&b'-') => return false,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    open = true;
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_batches() {
        let sql = "CREATE TABLE t1 (id INT)\nGO\nCREATE TABLE t2 (id INT)";
        let batches = split_batches(sql);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].start_line, 1);
        assert_eq!(batches[1].start_line, 3);
        assert_eq!(batches[1].number, 2);
    }

    #[test]
    fn test_go_variants() {
        let sql = "SELECT 1\nGO;\nSELECT 2\n  go 5  \nSELECT 3";
        let batches = split_batches(sql);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].repeat, Some(5));
        assert!(batches[2].content.contains("SELECT 3"));
    }

    #[test]
    fn test_go_inside_word_does_not_split() {
        let batches = split_batches("SELECT 1 AS go_col\nGOTO label");
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_go_inside_block_comment_does_not_split() {
        let batches = split_batches("/* start\nGO\nend */\nSELECT 1");
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_empty_batches_are_dropped() {
        let batches = split_batches("GO\n\nGO\nSELECT 1\nGO\n");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].number, 1);
        assert_eq!(batches[0].start_line, 4);
    }

    #[test]
    fn test_sqlcmd_directives_are_lifted() {
        let sql = ":setvar Env Prod\nSELECT 1\n:r .\\other.sql\n";
        let batches = split_batches(sql);
        assert_eq!(batches.len(), 1);
        let directives = &batches[0].directives;
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].command, ":setvar");
        assert_eq!(directives[1].line, 3);
        assert!(!batches[0].content.contains(":r"));
        // Line numbering inside the batch is preserved.
        assert_eq!(batches[0].content.lines().nth(1), Some("SELECT 1"));
    }

    #[test]
    fn test_file_line() {
        let batches = split_batches("SELECT 1\nGO\n\nSELECT 2");
        assert_eq!(batches[1].file_line(2), 4);
    }
}
