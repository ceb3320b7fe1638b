//! Line anchoring for review comments.
//!
//! GitHub's "list files" entries carry a bare unified diff fragment: hunks
//! only, no `diff --git` or `---`/`+++` headers. This module walks those
//! hunks to find a line on the new side a comment can be attached to.

use prowl_core::{LineAnchor, ProwlError};
use tracing::debug;

/// A hunk header's ranges: `@@ -old_start,old_lines +new_start,new_lines @@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
}

/// Pick the comment line for `patch` according to `anchor`.
///
/// Never fails: a missing patch, a patch without additions, or a malformed
/// header all fall back to line 1.
///
/// # Examples
///
/// ```
/// use prowl_core::LineAnchor;
/// use prowl_review::patch::anchor_line;
///
/// let patch = "@@ -10,3 +10,4 @@ fn main() {\n     let a = 1;\n+    let b = 2;\n     a\n }";
/// assert_eq!(anchor_line(Some(patch), LineAnchor::FirstLine), 1);
/// assert_eq!(anchor_line(Some(patch), LineAnchor::FirstAddition), 11);
/// ```
pub fn anchor_line(patch: Option<&str>, anchor: LineAnchor) -> u32 {
    match anchor {
        LineAnchor::FirstLine => 1,
        LineAnchor::FirstAddition => {
            let Some(patch) = patch else { return 1 };
            match first_added_line(patch) {
                Ok(Some(line)) => line,
                Ok(None) => first_hunk_start(patch).unwrap_or(1),
                Err(e) => {
                    debug!("falling back to line 1: {e}");
                    1
                }
            }
        }
    }
}

/// New-side line number of the first `+` line in `patch`, if any.
///
/// # Errors
///
/// Returns [`ProwlError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use prowl_review::patch::first_added_line;
///
/// let patch = "@@ -1,2 +1,3 @@\n a\n-b\n+c\n+d";
/// assert_eq!(first_added_line(patch).unwrap(), Some(2));
/// ```
pub fn first_added_line(patch: &str) -> Result<Option<u32>, ProwlError> {
    let mut new_line: Option<u32> = None;

    for line in patch.lines() {
        if line.starts_with("@@") {
            let range = parse_hunk_header(line)?;
            new_line = Some(range.new_start);
            continue;
        }

        let Some(current) = new_line.as_mut() else {
            continue;
        };

        if line.starts_with('+') {
            return Ok(Some(*current));
        }
        if line.starts_with(' ') || line.is_empty() {
            *current = current.saturating_add(1);
        }
        // '-' lines and "\ No newline at end of file" do not advance the new side
    }

    Ok(None)
}

fn first_hunk_start(patch: &str) -> Option<u32> {
    patch
        .lines()
        .find(|l| l.starts_with("@@"))
        .and_then(|l| parse_hunk_header(l).ok())
        .map(|r| r.new_start.max(1))
}

/// Parse a hunk header line.
///
/// # Errors
///
/// Returns [`ProwlError::Parse`] if the line is not `@@ -a[,b] +c[,d] @@...`.
///
/// # Examples
///
/// ```
/// use prowl_review::patch::parse_hunk_header;
///
/// let r = parse_hunk_header("@@ -132,7 +132,8 @@ module Test").unwrap();
/// assert_eq!((r.old_start, r.old_lines, r.new_start, r.new_lines), (132, 7, 132, 8));
/// ```
pub fn parse_hunk_header(line: &str) -> Result<HunkRange, ProwlError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| ProwlError::Parse(format!("invalid hunk header: {line}")))?;

    let Some((old, new)) = inner.split_once(' ') else {
        return Err(ProwlError::Parse(format!("invalid hunk header: {line}")));
    };

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| ProwlError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| ProwlError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok(HunkRange {
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), ProwlError> {
    let number = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| ProwlError::Parse(format!("invalid range number in: {context}")))
    };
    match range.split_once(',') {
        Some((start, count)) => Ok((number(start)?, number(count)?)),
        None => Ok((number(range)?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_without_counts_defaults_to_one() {
        let r = parse_hunk_header("@@ -3 +4 @@").unwrap();
        assert_eq!(r.old_lines, 1);
        assert_eq!(r.new_start, 4);
        assert_eq!(r.new_lines, 1);
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(parse_hunk_header("@@ garbage").is_err());
        assert!(parse_hunk_header("@@ 1,2 +1,2 @@").is_err());
        assert!(parse_hunk_header("@@ -x,2 +1,2 @@").is_err());
        assert!(parse_hunk_header("@@ -1,2 @@").is_err());
    }

    #[test]
    fn first_addition_skips_context_and_removals() {
        let patch = "\
@@ -20,6 +20,6 @@ impl Foo {
     fn a() {}
     fn b() {}
-    fn c() {}
+    fn c() -> u8 { 0 }
     fn d() {}
 }";
        assert_eq!(first_added_line(patch).unwrap(), Some(22));
    }

    #[test]
    fn first_addition_in_second_hunk() {
        let patch = "\
@@ -1,2 +1,1 @@
 keep
-gone
@@ -40,2 +39,3 @@
 ctx
+new
 ctx";
        assert_eq!(first_added_line(patch).unwrap(), Some(40));
    }

    #[test]
    fn new_file_starts_at_one() {
        let patch = "@@ -0,0 +1,3 @@\n+a\n+b\n+c";
        assert_eq!(first_added_line(patch).unwrap(), Some(1));
    }

    #[test]
    fn deletion_only_patch_falls_back_to_hunk_start() {
        let patch = "@@ -5,2 +5,1 @@\n keep\n-gone";
        assert_eq!(first_added_line(patch).unwrap(), None);
        assert_eq!(anchor_line(Some(patch), LineAnchor::FirstAddition), 5);
    }

    #[test]
    fn missing_or_broken_patch_anchors_at_one() {
        assert_eq!(anchor_line(None, LineAnchor::FirstAddition), 1);
        assert_eq!(anchor_line(Some("@@ nonsense\n+x"), LineAnchor::FirstAddition), 1);
        assert_eq!(anchor_line(Some(""), LineAnchor::FirstAddition), 1);
    }

    #[test]
    fn first_line_ignores_patch() {
        let patch = "@@ -100,1 +100,2 @@\n ctx\n+add";
        assert_eq!(anchor_line(Some(patch), LineAnchor::FirstLine), 1);
    }

    #[test]
    fn hunk_start_at_line_limit_does_not_overflow() {
        let patch = "@@ -1 +4294967295,2 @@\n ctx\n+add";
        assert_eq!(first_added_line(patch).unwrap(), Some(u32::MAX));
        assert_eq!(anchor_line(Some(patch), LineAnchor::FirstAddition), u32::MAX);
    }
}
