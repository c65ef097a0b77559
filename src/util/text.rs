use std::borrow::Cow;

/// Marker inserted where a long name may wrap (U+200B ZERO WIDTH SPACE).
pub const SOFT_BREAK: char = '\u{200b}';

/// Extension every enqueued item name must carry.
const NZB_EXTENSION: &str = ".nzb";

/// Inserts a [`SOFT_BREAK`] after every `.` and `_`.
///
/// Release names such as `Some.Show.S01E01.720p_x264` have no spaces, so
/// without break opportunities a table cell cannot wrap them. Display only:
/// identities and search strings always use the raw name.
///
/// Returns `Cow::Borrowed` when the name contains neither character.
///
/// # Examples
///
/// ```
/// use nzbfeed::util::{with_soft_breaks, SOFT_BREAK};
///
/// assert_eq!(with_soft_breaks("plain"), "plain");
/// assert_eq!(
///     with_soft_breaks("a.b_c"),
///     format!("a.{SOFT_BREAK}b_{SOFT_BREAK}c")
/// );
/// ```
pub fn with_soft_breaks(name: &str) -> Cow<'_, str> {
    if !name.contains(['.', '_']) {
        return Cow::Borrowed(name);
    }

    let extra = name.matches(['.', '_']).count() * SOFT_BREAK.len_utf8();
    let mut out = String::with_capacity(name.len() + extra);
    for c in name.chars() {
        out.push(c);
        if c == '.' || c == '_' {
            out.push(SOFT_BREAK);
        }
    }
    Cow::Owned(out)
}

/// Appends `.nzb` unless the name already ends with it (case-insensitive).
///
/// # Examples
///
/// ```
/// use nzbfeed::util::ensure_nzb_extension;
///
/// assert_eq!(ensure_nzb_extension("report"), "report.nzb");
/// assert_eq!(ensure_nzb_extension("report.NZB"), "report.NZB");
/// ```
pub fn ensure_nzb_extension(name: &str) -> Cow<'_, str> {
    let has_extension = name.len() >= NZB_EXTENSION.len()
        && name
            .get(name.len() - NZB_EXTENSION.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(NZB_EXTENSION));

    if has_extension {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}{NZB_EXTENSION}"))
    }
}

/// Strips terminal control characters from feed-supplied text before it is
/// printed to a terminal.
///
/// Feed titles come from arbitrary third-party indexers; an embedded ESC
/// sequence could otherwise rewrite the operator's terminal. Tab is kept, all
/// other C0 controls, DEL and C1 controls are dropped.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control = |c: char| c != '\t' && c.is_control();

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_control(c)).collect())
}
