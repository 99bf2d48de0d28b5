//! `_name_` token substitution inside interpolated text.

use std::borrow::Cow;
use std::sync::LazyLock;

use fancy_regex::{Captures, Regex};

static TOKEN: LazyLock<Result<Regex, String>> = LazyLock::new(|| {
    Regex::new(r"(?<![A-Za-z0-9])_([A-Za-z][A-Za-z0-9_.\-]*?)_(?![A-Za-z0-9])").map_err(|e| e.to_string())
});

/// Replace every `_name_` whose name `lookup` knows. Unknown names are left
/// as written.
pub(crate) fn substitute_tokens<'t, F>(text: &'t str, lookup: F) -> Cow<'t, str>
where
    F: Fn(&str) -> Option<String>,
{
    if !text.contains('_') {
        return Cow::Borrowed(text);
    }
    let regex = match TOKEN.as_ref() {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(error = %err, "interpolation pattern failed to compile");
            return Cow::Borrowed(text);
        }
    };
    regex.replace_all(text, |caps: &Captures<'_>| {
        let name = caps.get(1).map_or("", |m| m.as_str());
        lookup(name).unwrap_or_else(|| caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()))
    })
}
