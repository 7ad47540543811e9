//! Collection naming conventions.
//!
//! A record definition maps to one collection. Unless the definition names its collection
//! explicitly, the name is derived from the type name: converted to snake case, with the
//! last word pluralized.

/// Derives the default collection name for a record definition.
///
/// ```ignore
/// assert_eq!(default_collection_name("User"), "users");
/// assert_eq!(default_collection_name("BookCategory"), "book_categories");
/// ```
pub fn default_collection_name(model_name: &str) -> String {
    pluralize(&to_snake_case(model_name))
}

/// Converts a `CamelCase` type name into `snake_case`.
///
/// Runs of capitals are treated as one word (`HTTPRequest` -> `http_request`).
pub fn to_snake_case(name: &str) -> String {
    let chars = name.chars().collect::<Vec<_>>();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();

            if i > 0 && !result.ends_with('_') && (prev_lower || (prev_upper && next_lower)) {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(*ch);
        }
    }

    result
}

/// Pluralizes an English word using the common suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return format!("{word}es");
    }

    if let Some(stem) = word.strip_suffix('y') {
        let consonant_before = stem
            .chars()
            .last()
            .is_some_and(|c| !"aeiou".contains(c));

        if consonant_before {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}
