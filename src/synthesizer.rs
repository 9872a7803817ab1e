use once_cell::sync::Lazy;
use regex::Regex;

/// Every renamed screenshot gets this extension, whatever it was before
pub const OUTPUT_EXTENSION: &str = "png";

/// Longest token kept, in bytes. Leaves room under the usual 255-byte name
/// limit for the date, a collision counter and the extension.
pub const MAX_TOKEN_BYTES: usize = 200;

/// Anything that is not a word character, a CJK unified ideograph or a hyphen
static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\x{4E00}-\x{9FFF}-]").expect("failed to compile disallowed character regex")
});

static UNDERSCORE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("failed to compile underscore regex"));

static HYPHEN_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("failed to compile hyphen regex"));

/// Turns free-form description text into a token that is safe inside a file
/// name. May return an empty string. Long tokens are cut on a character
/// boundary at `MAX_TOKEN_BYTES`.
pub fn sanitize(description: &str) -> String {
    let underscored = description.replace(' ', "_");
    let stripped = DISALLOWED_RE.replace_all(&underscored, "");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&stripped, "_");
    let collapsed = HYPHEN_RUN_RE.replace_all(&collapsed, "-");
    let trimmed = trim_separators(&collapsed);

    if trimmed.len() <= MAX_TOKEN_BYTES {
        return trimmed.to_string();
    }

    let cut = trimmed
        .char_indices()
        .map(|(idx, c)| idx + c.len_utf8())
        .take_while(|end| *end <= MAX_TOKEN_BYTES)
        .last()
        .unwrap_or(0);
    trim_separators(&trimmed[..cut]).to_string()
}

fn trim_separators(token: &str) -> &str {
    token.trim_matches(|c| c == '_' || c == '-')
}

/// Builds `{date}-{token}.png`, or `None` when the description sanitizes
/// down to nothing.
pub fn synthesize(date: &str, description: &str) -> Option<String> {
    let token = sanitize(description);
    if token.is_empty() {
        return None;
    }

    Some(format!("{}-{}.{}", date, token, OUTPUT_EXTENSION))
}
