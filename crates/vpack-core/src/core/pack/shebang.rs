//! Shebang rewriting for scripts in the environment's bin directory.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::Regex;

// Groups: whole shebang, executable, trailing options.
const SHEBANG_PATTERN: &str = r"(?m-u)\A(#!(?:[ ]*)(/(?:\\ |[^ \n\r\t])*)(.*))$";

fn shebang_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(SHEBANG_PATTERN).expect("shebang pattern is valid"))
}

/// Rewrites an absolute shebang that points inside `prefix` to
/// `#!/usr/bin/env <program><options>`.
///
/// Returns the (possibly unchanged) data and whether the script is
/// relocatable: `false` when there is no shebang or when `prefix` occurs
/// more than once, in which case the data is returned untouched.
#[must_use]
pub fn rewrite_shebang<'a>(data: &'a [u8], prefix: &str) -> (Cow<'a, [u8]>, bool) {
    let Some(captures) = shebang_regex().captures(data) else {
        return (Cow::Borrowed(data), false);
    };
    if count_occurrences(data, prefix.as_bytes()) > 1 {
        return (Cow::Borrowed(data), false);
    }
    let (Some(shebang), Some(executable), Some(options)) =
        (captures.get(1), captures.get(2), captures.get(3))
    else {
        return (Cow::Borrowed(data), false);
    };
    if !inside_prefix(executable.as_bytes(), prefix.as_bytes()) {
        return (Cow::Borrowed(data), true);
    }

    let program = executable
        .as_bytes()
        .rsplit(|byte| *byte == b'/')
        .next()
        .unwrap_or_default();
    let mut rewritten = Vec::with_capacity(data.len());
    rewritten.extend_from_slice(&data[..shebang.start()]);
    rewritten.extend_from_slice(b"#!/usr/bin/env ");
    rewritten.extend_from_slice(program);
    rewritten.extend_from_slice(options.as_bytes());
    rewritten.extend_from_slice(&data[shebang.end()..]);
    (Cow::Owned(rewritten), true)
}

/// `executable` lies under `prefix`, matching whole path components.
fn inside_prefix(executable: &[u8], prefix: &[u8]) -> bool {
    if prefix.is_empty() || !executable.starts_with(prefix) {
        return false;
    }
    prefix.ends_with(b"/") || executable.get(prefix.len()).map_or(true, |next| *next == b'/')
}

/// Non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(at) = rest
        .windows(needle.len())
        .position(|window| window == needle)
    {
        count += 1;
        rest = &rest[at + needle.len()..];
    }
    count
}
