use unicode_normalization::UnicodeNormalization;

/// Longest identifier CKAN will accept from us once the family prefix is added.
pub const MAX_SLUG_LEN: usize = 96;

// Applied in order: the double-encoded sequences share leading bytes, so the
// three-character forms must be replaced before the two-character `Ã¢`.
const QUOTE_REPAIRS: [(&str, &str); 8] = [
    ("\u{201d}", "\""),
    ("\u{201c}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{00e2}\u{0080}\u{0099}", "'"),
    ("\u{00e2}\u{0080}\u{009c}", "\""),
    ("\u{00e2}\u{0080}\u{009d}", "\""),
    ("\u{00c3}\u{00a2}", "'"),
];

const TITLE_EXCEPTIONS: [(&str, &str); 13] = [
    ("Ca", "CA"),
    ("Usa", "USA"),
    ("Or", "or"),
    ("Of", "of"),
    ("The", "the"),
    ("In", "in"),
    ("On", "on"),
    ("At", "at"),
    ("To", "to"),
    ("For", "for"),
    ("And", "and"),
    ("Sdi", "SDI"),
    ("Cso", "CSO"),
];

const COMPOUND_FIXUPS: [(&str, &str); 3] = [("Sdi:", "SDI:"), ("Fsh:", "FSH"), ("(Cso)", "(CSO)")];

/// Double-encoded middle dot that RRK descriptions use as a list separator.
pub const MOJIBAKE_MIDDLE_DOT: &str = "\u{00c2}\u{00b7}";

/// NFKC-normalizes `input` and repairs known mis-encoded quotes.
pub fn normalize_text(input: Option<&str>) -> String {
    let Some(input) = input else {
        return String::new();
    };
    let mut normalized: String = input.nfkc().collect();
    for (from, to) in QUOTE_REPAIRS {
        if normalized.contains(from) {
            normalized = normalized.replace(from, to);
        }
    }
    normalized
}

/// Normalizes a free-text description: trailing `\r`, `\n` and `*` are
/// dropped, quotes repaired, and the mis-encoded middle dot turned into a dash.
pub fn clean_description(input: &str) -> String {
    normalize_text(Some(trim_trailing_markup(input))).replace(MOJIBAKE_MIDDLE_DOT, " - ")
}

pub fn trim_trailing_markup(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n', '*'])
}

/// Uppercases the first cased character of every word and lowercases the rest.
/// A word starts after any character that has no case, so `they're` becomes
/// `They'Re` and `3d` becomes `3D`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_cased = false;
    for ch in input.chars() {
        let cased = ch.is_lowercase() || ch.is_uppercase();
        if cased {
            if previous_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
        } else {
            out.push(ch);
        }
        previous_cased = cased;
    }
    out
}

/// Display title for a package: title case with the catalog's acronym and
/// small-word exceptions. The first word is always title-cased, even when it
/// is in the exception table.
pub fn fix_title(input: &str) -> String {
    let titled = title_case(input);
    let mut words: Vec<String> = titled
        .split_whitespace()
        .map(|word| {
            TITLE_EXCEPTIONS
                .iter()
                .find(|(from, _)| *from == word)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect();
    if let Some(first) = words.first_mut() {
        *first = title_case(first);
    }
    let mut joined = words.join(" ");
    for (from, to) in COMPOUND_FIXUPS {
        joined = joined.replace(from, to);
    }
    joined
}

/// Lowercase, hyphen-separated ASCII identifier derived from `input`.
///
/// Result is empty or matches `^[a-z][a-z0-9-]*$`, is at most
/// [`MAX_SLUG_LEN`] characters, and is stable under re-application.
pub fn slugify(input: &str) -> String {
    let ascii: String = input
        .nfkd()
        .filter(|ch| ch.is_ascii())
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else if ch.is_ascii_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
        }
    }

    let slug = slug.trim_start_matches(|ch: char| !ch.is_ascii_alphabetic());
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_none_is_empty() {
        assert_eq!(normalize_text(None), "");
    }

    #[test]
    fn normalize_repairs_quotes() {
        let input = "\u{201c}dead\u{201d} trees aren\u{2019}t \u{00e2}\u{0080}\u{0099}live\u{00e2}\u{0080}\u{0099}";
        assert_eq!(normalize_text(Some(input)), "\"dead\" trees aren't 'live'");
    }

    #[test]
    fn normalize_applies_nfkc() {
        assert_eq!(normalize_text(Some("ﬁre ①")), "fire 1");
    }

    #[test]
    fn description_trims_and_replaces_middle_dot() {
        let input = "canopy\u{00c2}\u{00b7}cover\r\n**";
        assert_eq!(clean_description(input), "canopy - cover");
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("they're 3d MAPS"), "They'Re 3D Maps");
        assert_eq!(title_case("sdi: stand-density"), "Sdi: Stand-Density");
    }

    #[test]
    fn fix_title_exceptions() {
        assert_eq!(fix_title("usa forest sdi: stand"), "Usa Forest SDI: Stand");
        assert_eq!(
            fix_title("density of trees in ca and the usa"),
            "Density of Trees in CA and the USA"
        );
        assert_eq!(fix_title("fsh: richness (cso)"), "FSH Richness (CSO)");
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Test Layer"), "test-layer");
        assert_eq!(slugify("  Crème brûlée -- (2001-2021) "), "creme-brulee-2001-2021");
        assert_eq!(slugify("2021 Annual_Biomass"), "annual-biomass");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_truncates_without_trailing_hyphen() {
        let input = format!("{} tail", "a".repeat(MAX_SLUG_LEN - 1));
        let slug = slugify(&input);
        assert_eq!(slug.len(), MAX_SLUG_LEN - 1);
        assert!(!slug.ends_with('-'));
    }
}
