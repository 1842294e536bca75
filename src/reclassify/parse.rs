use regex::Regex;
use std::sync::LazyLock;

/// A marker (`reclassify to`, `reclassify as`, `t-group`, `tgroup`) that
/// starts a word, then optional `:`/`=`, then a dotted numeric id.
static NOTE_TGROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\w-])(?:reclassify\s+(?:to|as)|t-?group)\s*[:=]?\s*(\d+(?:\.\d+)+)")
        .expect("note T-group pattern is valid")
});

static TGROUP_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("T-group id pattern is valid"));

/// Pull a proposed T-group id out of a free-text decision note.
///
/// Recognises `t-group: 2004.1.1`, `tgroup 2004.1.1`, `reclassify to 2004.1.1`
/// and similar, case-insensitively. A T-group id is a dot-separated numeric
/// path with at least two components. When several markers appear, the
/// earliest one followed by an id wins.
pub fn tgroup_from_note(note: &str) -> Option<String> {
    NOTE_TGROUP_REGEX
        .captures(note)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `2004.1.1` yes, `2004` no, `2004..1` no
pub fn is_tgroup_id(s: &str) -> bool {
    TGROUP_ID_REGEX.is_match(s)
}
