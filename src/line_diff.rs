//! Character-level diff between a removed line and the line that replaced it
//!
//! Drives the fine-grained highlighting of paired `-`/`+` lines. Inputs are
//! single source lines, so the quadratic LCS table is cheap enough.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Added,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPart {
    pub kind: PartKind,
    pub text: String,
}

impl DiffPart {
    fn new(kind: PartKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Compute a character-level edit script turning `old` into `new`.
///
/// Removed and unchanged parts concatenate to `old`; added and unchanged parts
/// concatenate to `new`. Adjacent parts never share a kind. When both
/// directions keep an equally long common subsequence, the new-side character
/// is taken as added first, which keeps the output deterministic.
pub fn diff_chars(old: &str, new: &str) -> Vec<DiffPart> {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    let (m, n) = (a.len(), b.len());

    // lcs[i][j]: longest common subsequence of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut parts: Vec<DiffPart> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < m || j < n {
        let (kind, ch) = if i < m && j < n && a[i] == b[j] {
            i += 1;
            j += 1;
            (PartKind::Unchanged, a[i - 1])
        } else if j < n && (i == m || lcs[i][j + 1] >= lcs[i + 1][j]) {
            j += 1;
            (PartKind::Added, b[j - 1])
        } else {
            i += 1;
            (PartKind::Removed, a[i - 1])
        };

        match parts.last_mut() {
            Some(last) if last.kind == kind => last.text.push(ch),
            _ => parts.push(DiffPart::new(kind, ch)),
        }
    }

    parts
}

/// Reassemble one side of a diff from its parts
#[cfg(test)]
pub fn reconstruct(parts: &[DiffPart], side: PartKind) -> String {
    parts
        .iter()
        .filter(|p| p.kind == PartKind::Unchanged || p.kind == side)
        .map(|p| p.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_appended_character() {
        assert_eq!(
            diff_chars("foo", "fooo"),
            vec![
                DiffPart::new(PartKind::Unchanged, "foo"),
                DiffPart::new(PartKind::Added, "o"),
            ]
        );
    }

    #[test]
    fn test_identical_lines_yield_one_part() {
        let s = "let x = ünïcødé + 🦀;";
        assert_eq!(diff_chars(s, s), vec![DiffPart::new(PartKind::Unchanged, s)]);
    }

    #[test]
    fn test_empty_sides() {
        assert!(diff_chars("", "").is_empty());
        assert_eq!(diff_chars("", "abc"), vec![DiffPart::new(PartKind::Added, "abc")]);
        assert_eq!(diff_chars("abc", ""), vec![DiffPart::new(PartKind::Removed, "abc")]);
    }

    #[test]
    fn test_tie_prefers_added() {
        assert_eq!(
            diff_chars("ab", "ba"),
            vec![
                DiffPart::new(PartKind::Added, "b"),
                DiffPart::new(PartKind::Unchanged, "a"),
                DiffPart::new(PartKind::Removed, "b"),
            ]
        );
    }

    #[test]
    fn test_replacement_inside_line() {
        let parts = diff_chars("let count = 1;", "let total = 1;");
        assert_eq!(parts.first(), Some(&DiffPart::new(PartKind::Unchanged, "let ")));
        assert_eq!(parts.last(), Some(&DiffPart::new(PartKind::Unchanged, " = 1;")));
        assert!(parts.windows(2).all(|w| w[0].kind != w[1].kind));
    }

    #[test]
    fn test_reconstructs_both_sides() {
        let cases = [
            ("", ""),
            ("foo", "fooo"),
            ("fn main() {}", "pub fn main() -> Result<()> {}"),
            ("héllo wörld", "hello world!"),
            ("tab\there", "tabs\t\there"),
            ("日本語のテキスト", "日本のテキスト語"),
            ("🦀 crab", "crab 🦀🦀"),
            ("abcabba", "cbabac"),
        ];

        for (old, new) in cases {
            let parts = diff_chars(old, new);
            assert_eq!(reconstruct(&parts, PartKind::Removed), old, "old side of {:?}", (old, new));
            assert_eq!(reconstruct(&parts, PartKind::Added), new, "new side of {:?}", (old, new));
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parts_rebuild_both_sides(old in "\\PC{0,24}", new in "\\PC{0,24}") {
                let parts = diff_chars(&old, &new);
                prop_assert_eq!(reconstruct(&parts, PartKind::Removed), old);
                prop_assert_eq!(reconstruct(&parts, PartKind::Added), new);
                for pair in parts.windows(2) {
                    prop_assert_ne!(pair[0].kind, pair[1].kind);
                }
            }

            #[test]
            fn identical_input_is_one_unchanged_part(text in "\\PC{1,32}") {
                let parts = diff_chars(&text, &text);
                prop_assert_eq!(parts, vec![DiffPart::new(PartKind::Unchanged, text.as_str())]);
            }
        }
    }
}
