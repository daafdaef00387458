//! Splitting a unified diff into per-file segments.
//!
//! Segments keep their exact bytes: concatenating the `text` of every
//! [`FileDiff`] returned by [`parse_file_diffs`] gives back the input.
//! Both `git diff` output (`diff --git` headers, extended header lines,
//! binary notices) and plain `---`/`+++` unified diffs, optionally preceded
//! by the `diff -ruN …` line of a recursive `diff`, are accepted.

use crate::error::DiffParseError;

/// One file's portion of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Repository-relative path of the file, without `a/`/`b/` prefixes.
    pub path: String,
    /// Exact text of this segment, headers included.
    pub text: String,
}

#[derive(Debug, Default)]
struct Segment {
    start: usize,
    /// Line the segment header starts on, for error messages.
    line: usize,
    git: bool,
    header: Option<String>,
    old: Option<String>,
    new: Option<String>,
    saw_hunk: bool,
    old_left: u64,
    new_left: u64,
}

impl Segment {
    fn in_hunk(&self) -> bool {
        self.old_left > 0 || self.new_left > 0
    }
}

fn err(line: usize, message: impl Into<String>) -> DiffParseError {
    DiffParseError {
        line,
        message: message.into(),
    }
}

/// Parse `diff` into file diffs in their original order.
pub fn parse_file_diffs(diff: &str) -> Result<Vec<FileDiff>, DiffParseError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut offset = 0;
    let mut line_no = 0;

    for raw in diff.split_inclusive('\n') {
        line_no += 1;
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(seg) = segments.last_mut() {
            if seg.in_hunk() {
                hunk_line(seg, line, line_no)?;
                continue;
            }
            if seg.saw_hunk && line.starts_with('\\') {
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            segments.push(Segment {
                start,
                line: line_no,
                git: true,
                header: Some(rest.to_string()),
                ..Segment::default()
            });
            continue;
        }

        // `diff -ruN a/x b/x` and similar command lines from plain `diff -r`.
        if line.starts_with("diff ") {
            segments.push(Segment {
                start,
                line: line_no,
                ..Segment::default()
            });
            continue;
        }

        if let Some(rest) = line.strip_prefix("--- ") {
            match segments.last_mut() {
                Some(seg) if !seg.saw_hunk && seg.old.is_none() => {
                    seg.old = Some(rest.to_string());
                }
                _ => segments.push(Segment {
                    start,
                    line: line_no,
                    old: Some(rest.to_string()),
                    ..Segment::default()
                }),
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            match segments.last_mut() {
                Some(seg) if !seg.saw_hunk && seg.old.is_some() && seg.new.is_none() => {
                    seg.new = Some(rest.to_string());
                }
                _ => return Err(err(line_no, "`+++` line without preceding `---` line")),
            }
            continue;
        }

        if line.starts_with("@@") {
            let Some(seg) = segments.last_mut() else {
                return Err(err(line_no, "hunk before any file header"));
            };
            if seg.old.is_none() || seg.new.is_none() {
                return Err(err(line_no, "hunk without `---`/`+++` file header"));
            }
            let (old, new) = parse_hunk_header(line).ok_or_else(|| {
                err(line_no, format!("malformed hunk header {line:?}"))
            })?;
            seg.saw_hunk = true;
            seg.old_left = old;
            seg.new_left = new;
            continue;
        }

        match segments.last() {
            None if line.trim().is_empty() => {}
            None => return Err(err(line_no, "content before the first file header")),
            Some(seg) if seg.saw_hunk && line.trim().is_empty() => {}
            Some(seg) if seg.saw_hunk => {
                return Err(err(line_no, format!("unexpected line after hunk: {line:?}")))
            }
            // Extended git headers: index, mode changes, renames, binary notices.
            Some(seg) if seg.git && seg.old.is_none() => {}
            Some(_) => return Err(err(line_no, format!("unexpected line in file header: {line:?}"))),
        }
    }

    if let Some(seg) = segments.last() {
        if seg.in_hunk() {
            return Err(err(line_no, "unexpected end of diff inside hunk"));
        }
    }

    let mut out = Vec::with_capacity(segments.len());
    for (i, seg) in segments.iter().enumerate() {
        // Leading blank lines belong to the first segment.
        let start = if i == 0 { 0 } else { seg.start };
        let end = segments.get(i + 1).map(|s| s.start).unwrap_or(diff.len());
        let path = segment_path(seg).ok_or_else(|| err(seg.line, "file diff without a path"))?;
        out.push(FileDiff {
            path,
            text: diff[start..end].to_string(),
        });
    }
    Ok(out)
}

fn hunk_line(seg: &mut Segment, line: &str, line_no: usize) -> Result<(), DiffParseError> {
    let (old, new) = match line.chars().next() {
        // An empty line is context whose leading space was stripped.
        None | Some(' ') => (1, 1),
        Some('-') => (1, 0),
        Some('+') => (0, 1),
        Some('\\') => (0, 0),
        Some(_) => return Err(err(line_no, format!("unexpected line in hunk: {line:?}"))),
    };
    if old > seg.old_left || new > seg.new_left {
        return Err(err(line_no, "hunk is longer than its header declares"));
    }
    seg.old_left -= old;
    seg.new_left -= new;
    Ok(())
}

/// Line counts of `@@ -a[,b] +c[,d] @@`.
fn parse_hunk_header(line: &str) -> Option<(u64, u64)> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    Some((
        range_len(old.strip_prefix('-')?)?,
        range_len(new.strip_prefix('+')?)?,
    ))
}

fn range_len(range: &str) -> Option<u64> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<u64>().ok()?;
            len.parse().ok()
        }
        None => {
            range.parse::<u64>().ok()?;
            Some(1)
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

const DEV_NULL: &str = "/dev/null";

fn segment_path(seg: &Segment) -> Option<String> {
    let old = seg.old.as_deref().map(clean_path);
    let new = seg.new.as_deref().map(clean_path);
    let prefixed = uses_git_prefixes(seg, old.as_deref(), new.as_deref());

    let strip = |p: &str, prefix: &str| -> String {
        if prefixed {
            p.strip_prefix(prefix).unwrap_or(p).to_string()
        } else {
            p.to_string()
        }
    };

    if let Some(new) = new.as_deref().filter(|p| *p != DEV_NULL) {
        return Some(strip(new, "b/"));
    }
    if let Some(old) = old.as_deref().filter(|p| *p != DEV_NULL) {
        return Some(strip(old, "a/"));
    }
    let (a, b) = split_git_header(seg.header.as_deref()?)?;
    if a.starts_with("a/") && b.starts_with("b/") {
        Some(b["b/".len()..].to_string())
    } else {
        Some(b.to_string())
    }
}

/// Whether the segment's paths carry git's `a/` and `b/` prefixes.
fn uses_git_prefixes(seg: &Segment, old: Option<&str>, new: Option<&str>) -> bool {
    if let Some((a, b)) = seg.header.as_deref().and_then(split_git_header) {
        return a.starts_with("a/") && b.starts_with("b/");
    }
    let old_ok = old.map_or(true, |p| p == DEV_NULL || p.starts_with("a/"));
    let new_ok = new.map_or(true, |p| p == DEV_NULL || p.starts_with("b/"));
    old_ok && new_ok && (old.is_some_and(|p| p != DEV_NULL) || new.is_some_and(|p| p != DEV_NULL))
}

/// The two paths of a `diff --git <a> <b>` header.
fn split_git_header(rest: &str) -> Option<(&str, &str)> {
    if let Some(idx) = rest.rfind(" b/") {
        if rest.starts_with("a/") {
            return Some((&rest[..idx], &rest[idx + 1..]));
        }
    }
    // Same path on both sides: `<p> <p>`.
    let mid = rest.len() / 2;
    if rest.len() % 2 == 1 && rest.is_char_boundary(mid) && rest.as_bytes()[mid] == b' ' {
        let (a, b) = (&rest[..mid], &rest[mid + 1..]);
        if a == b {
            return Some((a, b));
        }
    }
    rest.split_once(' ')
}

/// Drop a trailing `\t<timestamp>` and surrounding quotes.
fn clean_path(raw: &str) -> String {
    let p = raw.split('\t').next().unwrap_or(raw).trim_end();
    match p.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => p.to_string(),
    }
}
