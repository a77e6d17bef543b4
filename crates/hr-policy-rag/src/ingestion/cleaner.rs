//! Whitespace normalisation for extracted text

use regex::Regex;
use std::sync::OnceLock;

fn whitespace() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse every whitespace run to one space, drop NULs and trim
pub fn clean_text(text: &str) -> String {
    let without_nul = text.replace('\0', "");
    whitespace().replace_all(&without_nul, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Annual\tleave\n\n is   20\u{0}\r\n days  "),
            "Annual leave is 20 days"
        );
        assert_eq!(clean_text(" \n\t "), "");
    }
}
