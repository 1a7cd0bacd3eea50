//! Chapter name language preference
//!
//! Matroska chapter displays are tagged with ISO 639-2 language codes.
//! The preferred order is the user's locale language followed by English.
//! Some languages have two ISO 639-2 codes (bibliographic `ger` and
//! terminology `deu`); both are accepted since files use either.

/// Fallback language when nothing in the locale matches
pub const DEFAULT_LANGUAGE: &str = "eng";

/// ISO 639-1 code to ISO 639-2 (bibliographic, terminology) codes
const ISO_639_1_TO_2: &[(&str, &str, &str)] = &[
    ("ar", "ara", "ara"),
    ("bg", "bul", "bul"),
    ("ca", "cat", "cat"),
    ("cs", "cze", "ces"),
    ("cy", "wel", "cym"),
    ("da", "dan", "dan"),
    ("de", "ger", "deu"),
    ("el", "gre", "ell"),
    ("en", "eng", "eng"),
    ("es", "spa", "spa"),
    ("et", "est", "est"),
    ("eu", "baq", "eus"),
    ("fa", "per", "fas"),
    ("fi", "fin", "fin"),
    ("fr", "fre", "fra"),
    ("ga", "gle", "gle"),
    ("he", "heb", "heb"),
    ("hi", "hin", "hin"),
    ("hr", "hrv", "hrv"),
    ("hu", "hun", "hun"),
    ("hy", "arm", "hye"),
    ("id", "ind", "ind"),
    ("is", "ice", "isl"),
    ("it", "ita", "ita"),
    ("ja", "jpn", "jpn"),
    ("ka", "geo", "kat"),
    ("ko", "kor", "kor"),
    ("lt", "lit", "lit"),
    ("lv", "lav", "lav"),
    ("mk", "mac", "mkd"),
    ("ms", "may", "msa"),
    ("nb", "nob", "nob"),
    ("nl", "dut", "nld"),
    ("nn", "nno", "nno"),
    ("no", "nor", "nor"),
    ("pl", "pol", "pol"),
    ("pt", "por", "por"),
    ("ro", "rum", "ron"),
    ("ru", "rus", "rus"),
    ("sk", "slo", "slk"),
    ("sl", "slv", "slv"),
    ("sq", "alb", "sqi"),
    ("sr", "srp", "srp"),
    ("sv", "swe", "swe"),
    ("th", "tha", "tha"),
    ("tr", "tur", "tur"),
    ("uk", "ukr", "ukr"),
    ("vi", "vie", "vie"),
    ("zh", "chi", "zho"),
];

/// The process locale from `LC_ALL`, `LC_MESSAGES` or `LANG`
pub fn locale_from_env() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// ISO 639-1 language part of a POSIX locale (`de_DE.UTF-8@euro` -> `de`)
pub fn language_of_locale(locale: &str) -> Option<String> {
    let language = locale
        .split(['_', '-', '.', '@'])
        .next()?
        .to_ascii_lowercase();
    if language.is_empty() || language == "c" || language == "posix" {
        return None;
    }
    Some(language)
}

/// ISO 639-2 codes for a language code
///
/// Three-letter input is assumed to already be ISO 639-2. Unknown
/// two-letter codes map to nothing.
pub fn iso639_2_codes(language: &str) -> Vec<String> {
    let language = language.to_ascii_lowercase();
    if language.len() == 3 {
        return vec![language];
    }
    ISO_639_1_TO_2
        .iter()
        .find(|(two, _, _)| *two == language)
        .map(|(_, bibliographic, terminology)| {
            if bibliographic == terminology {
                vec![bibliographic.to_string()]
            } else {
                vec![bibliographic.to_string(), terminology.to_string()]
            }
        })
        .unwrap_or_default()
}

/// Preferred chapter-name languages for a locale string, ending with `eng`
pub fn languages_for_locale(locale: Option<&str>) -> Vec<String> {
    let mut languages: Vec<String> = locale
        .and_then(language_of_locale)
        .map(|language| iso639_2_codes(&language))
        .unwrap_or_default();
    if !languages.iter().any(|code| code == DEFAULT_LANGUAGE) {
        languages.push(DEFAULT_LANGUAGE.to_string());
    }
    languages
}

/// Preferred chapter-name languages for the current process locale
pub fn preferred_languages() -> Vec<String> {
    languages_for_locale(locale_from_env().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of_locale() {
        assert_eq!(language_of_locale("de_DE.UTF-8").as_deref(), Some("de"));
        assert_eq!(language_of_locale("fr").as_deref(), Some("fr"));
        assert_eq!(language_of_locale("pt-BR").as_deref(), Some("pt"));
        assert_eq!(language_of_locale("C.UTF-8"), None);
        assert_eq!(language_of_locale("POSIX"), None);
        assert_eq!(language_of_locale(""), None);
    }

    #[test]
    fn test_both_iso_639_2_variants() {
        assert_eq!(iso639_2_codes("de"), vec!["ger", "deu"]);
        assert_eq!(iso639_2_codes("it"), vec!["ita"]);
        assert_eq!(iso639_2_codes("FRA"), vec!["fra"]);
        assert!(iso639_2_codes("xx").is_empty());
    }

    #[test]
    fn test_languages_for_locale_end_with_english() {
        assert_eq!(
            languages_for_locale(Some("de_DE.UTF-8")),
            vec!["ger", "deu", "eng"]
        );
        assert_eq!(languages_for_locale(Some("en_US.UTF-8")), vec!["eng"]);
        assert_eq!(languages_for_locale(None), vec!["eng"]);
        assert_eq!(languages_for_locale(Some("C")), vec!["eng"]);
    }
}
