use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid non-word pattern"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid separator pattern"));

/// Lowercases `name`, drops punctuation and collapses whitespace, underscores and
/// dashes into single dashes. Returns an empty string when nothing survives.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let dashed = SEPARATORS.replace_all(&stripped, "-");
    dashed.trim_matches('-').to_string()
}

/// `#RRGGBB`, case-insensitive.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators_and_strips_punctuation() {
        assert_eq!(slugify("  My  Team's_Workspace!! "), "my-teams-workspace");
        assert_eq!(slugify("--Launch -- Plan--"), "launch-plan");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn hex_colors_require_six_digits() {
        assert!(is_hex_color("#3b82f6"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("3b82f6"));
        assert!(!is_hex_color("#3b82f"));
        assert!(!is_hex_color("#3b82fg"));
    }
}
