//! URL slug derivation

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Lowercase, strip diacritics and collapse every run of characters outside
/// `[a-z0-9]` into one hyphen. The result never starts or ends with a hyphen
/// and is empty when the input has no ASCII letters or digits.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    let folded = input.to_lowercase();
    for c in folded.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_clean(slug: &str) -> bool {
        slug.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
    }

    #[test]
    fn test_plain_title() {
        assert_eq!(slugify("Foo"), "foo");
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_diacritics_are_stripped() {
        assert_eq!(slugify("Perché è già così"), "perche-e-gia-cosi");
        assert_eq!(slugify("Ĉu Ŝi Ĝuas? Über Façade"), "cu-si-guas-uber-facade");
    }

    #[test]
    fn test_punctuation_runs_collapse() {
        assert_eq!(slugify("  --Lean & Agile:  2024 edition!!  "), "lean-agile-2024-edition");
        assert_eq!(slugify("a___b...c"), "a-b-c");
    }

    #[test]
    fn test_non_latin_only_is_empty() {
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_output_alphabet_over_mixed_inputs() {
        let inputs = [
            "L'è l'ora di cambiare",
            "Ørsted & Søn — København",
            "İstanbul'da Strateji",
            "“Quoted” «title» 100%",
            "tab\tnew\nline",
            "ÀÉÎÕÜ àéîõü",
        ];
        for input in inputs {
            let slug = slugify(input);
            assert!(is_clean(&slug), "{input:?} -> {slug:?}");
            assert!(!slug.is_empty(), "{input:?} produced an empty slug");
        }
    }
}
