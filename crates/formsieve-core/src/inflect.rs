//! English inflection used by the linguistic filters and the list heuristic.

use regex::Regex;
use std::sync::OnceLock;

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
    "data",
    "status",
    "address",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
];

const PLURAL_RULES: &[(&str, &str)] = &[
    (r"(?i)(quiz)$", "${1}zes"),
    (r"(?i)(matr|vert|ind)(ix|ex)$", "${1}ices"),
    (r"(?i)(x|ch|ss|sh)$", "${1}es"),
    (r"(?i)([^aeiouy]|qu)y$", "${1}ies"),
    (r"(?i)(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
    (r"(?i)sis$", "ses"),
    (r"(?i)([ti])um$", "${1}a"),
    (r"(?i)(bu)s$", "${1}ses"),
    (r"(?i)(alias)$", "${1}es"),
    (r"(?i)(octop|vir)us$", "${1}i"),
    (r"(?i)(ax|test)is$", "${1}es"),
    (r"(?i)s$", "s"),
    (r"(?i)$", "s"),
];

const SINGULAR_RULES: &[(&str, &str)] = &[
    (r"(?i)(quiz)zes$", "${1}"),
    (r"(?i)(matr)ices$", "${1}ix"),
    (r"(?i)(vert|ind)ices$", "${1}ex"),
    (r"(?i)(alias)(es)?$", "${1}"),
    (r"(?i)(octop|vir)(us|i)$", "${1}us"),
    (r"(?i)(cris|ax|test)(is|es)$", "${1}is"),
    (r"(?i)(shoe)s$", "${1}"),
    (r"(?i)(o)es$", "${1}"),
    (r"(?i)(bus)(es)?$", "${1}"),
    (r"(?i)(x|ch|ss|sh)es$", "${1}"),
    (r"(?i)(m)ovies$", "${1}ovie"),
    (r"(?i)([^aeiouy]|qu)ies$", "${1}y"),
    (r"(?i)([lr])ves$", "${1}f"),
    (r"(?i)(tive|hive)s$", "${1}"),
    (r"(?i)([^f])ves$", "${1}fe"),
    (r"(?i)(analy|ba|diagno|parenthe|progno|synop|the)ses$", "${1}sis"),
    (r"(?i)([ti])a$", "${1}um"),
    (r"(?i)(ss|us|is)$", "${1}"),
    (r"(?i)s$", ""),
];

type RuleSet = Vec<(Regex, &'static str)>;

static PLURALS: OnceLock<RuleSet> = OnceLock::new();
static SINGULARS: OnceLock<RuleSet> = OnceLock::new();

fn compile(rules: &[(&str, &'static str)]) -> RuleSet {
    rules
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
}

fn apply(word: &str, rules: &RuleSet) -> String {
    for (regex, replacement) in rules {
        if regex.is_match(word) {
            return regex.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

fn last_word(text: &str) -> (&str, &str) {
    match text.rfind(|c: char| !c.is_alphanumeric()) {
        Some(pos) => text.split_at(pos + 1),
        None => ("", text),
    }
}

/// Pluralize the last word of `text`.
pub fn pluralize(text: &str) -> String {
    let (head, word) = last_word(text);
    if word.is_empty() || UNCOUNTABLE.contains(&word.to_lowercase().as_str()) {
        return text.to_string();
    }
    let lower = word.to_lowercase();
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, p)| *s == lower || *p == lower) {
        return format!("{head}{}", match_case(word, plural));
    }
    format!("{head}{}", apply(word, PLURALS.get_or_init(|| compile(PLURAL_RULES))))
}

/// Singularize the last word of `text`.
pub fn singularize(text: &str) -> String {
    let (head, word) = last_word(text);
    if word.is_empty() || UNCOUNTABLE.contains(&word.to_lowercase().as_str()) {
        return text.to_string();
    }
    let lower = word.to_lowercase();
    if let Some((singular, _)) = IRREGULAR.iter().find(|(s, p)| *p == lower || *s == lower) {
        return format!("{head}{}", match_case(word, singular));
    }
    format!("{head}{}", apply(word, SINGULARS.get_or_init(|| compile(SINGULAR_RULES))))
}

/// Whether `word` reads as a plural noun.
pub fn is_plural(word: &str) -> bool {
    let (_, last) = last_word(word);
    if last.is_empty() {
        return false;
    }
    let lower = last.to_lowercase();
    if IRREGULAR.iter().any(|(_, p)| *p == lower) {
        return true;
    }
    singularize(&lower) != lower
}

/// `1` -> `1st`, `12` -> `12th`. Non-numeric input is returned unchanged.
pub fn ordinalize(text: &str) -> String {
    let Ok(n) = text.trim().parse::<i64>() else {
        return text.to_string();
    };
    let abs = n.unsigned_abs();
    let suffix = match (abs % 100, abs % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn match_case(source: &str, target: &str) -> String {
    if source.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = target.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plurals() {
        assert_eq!(pluralize("email"), "emails");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("red apple"), "red apples");
    }

    #[test]
    fn singulars() {
        assert_eq!(singularize("emails"), "email");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("analyses"), "analysis");
    }

    #[test]
    fn plural_detection() {
        assert!(is_plural("emails"));
        assert!(is_plural("hobbies"));
        assert!(is_plural("people"));
        assert!(!is_plural("email"));
        assert!(!is_plural("address"));
        assert!(!is_plural("status"));
        assert!(!is_plural("news"));
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinalize("1"), "1st");
        assert_eq!(ordinalize("2"), "2nd");
        assert_eq!(ordinalize("3"), "3rd");
        assert_eq!(ordinalize("11"), "11th");
        assert_eq!(ordinalize("22"), "22nd");
        assert_eq!(ordinalize("113"), "113th");
        assert_eq!(ordinalize("abc"), "abc");
    }
}
