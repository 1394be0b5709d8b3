//! Identifier normalization for protobuf message, field and enum value names.
//!
//! `OpenAPI` names are free-form (`pet-store`, `userIDs`, `HTTPServer`,
//! `2fa`). Protobuf wants `UpperCamelCase` messages and `lower_snake_case`
//! fields. Both normalizers share one word splitter, so a name normalized
//! twice is unchanged.

use std::collections::HashMap;

/// Converts arbitrary strings into legal protobuf identifiers.
///
/// The acronym table keeps well-known abbreviations in their canonical
/// spelling inside message names (`nft_id` → `NFTId` with `NFT` registered).
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    /// Lower-cased acronym → canonical spelling.
    acronyms: HashMap<String, String>,
}

impl NameNormalizer {
    /// Create a normalizer with the given acronym spellings (e.g., `["NFT", "IDs"]`).
    pub fn new<I, S>(acronyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let acronyms = acronyms
            .into_iter()
            .map(|a| {
                let a = a.as_ref();
                (a.to_ascii_lowercase(), a.to_string())
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { acronyms }
    }

    /// Normalize to `UpperCamelCase`, preserving registered acronyms.
    ///
    /// ```
    /// use openapi2proto::NameNormalizer;
    ///
    /// let names = NameNormalizer::new(["NFT"]);
    /// assert_eq!(names.normalize_message_name("nft-collection"), "NFTCollection");
    /// assert_eq!(names.normalize_message_name("pet_store"), "PetStore");
    /// ```
    #[must_use]
    pub fn normalize_message_name(&self, s: &str) -> String {
        let name: String = split_words(s)
            .iter()
            .map(|word| self.message_word(word))
            .collect();
        guard_leading_digit(name)
    }

    /// Normalize to `lower_snake_case`.
    ///
    /// ```
    /// use openapi2proto::NameNormalizer;
    ///
    /// let names = NameNormalizer::default();
    /// assert_eq!(names.normalize_field_name("createdAt"), "created_at");
    /// assert_eq!(names.normalize_field_name("HTTPServer"), "http_server");
    /// ```
    #[must_use]
    pub fn normalize_field_name(&self, s: &str) -> String {
        let name = split_words(s)
            .iter()
            .map(|word| word.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("_");
        guard_leading_digit(name)
    }

    /// Upper snake case, as used for enum value names (`in-progress` → `IN_PROGRESS`).
    #[must_use]
    pub fn normalize_enum_value_name(&self, s: &str) -> String {
        self.normalize_field_name(s).to_ascii_uppercase()
    }

    fn message_word(&self, word: &str) -> String {
        let lower = word.to_ascii_lowercase();
        if let Some(canonical) = self.acronyms.get(&lower) {
            return canonical.clone();
        }
        // Plural of a registered acronym: `NFTs`.
        if let Some(stem) = lower.strip_suffix('s') {
            if let Some(canonical) = self.acronyms.get(stem) {
                return format!("{canonical}s");
            }
        }
        capitalize(&lower)
    }
}

/// Split into words at separators, case transitions and digit→upper boundaries.
///
/// Inside an upper-case run the last capital starts a new word when followed
/// by lower case (`HTTPServer` → `HTTP`, `Server`), unless that lower case is a
/// lone plural `s` closing the run (`IDs` stays one word).
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let boundary = if prev.is_ascii_lowercase() || prev.is_ascii_digit() {
                true
            } else {
                prev.is_ascii_uppercase()
                    && chars.get(i + 1).is_some_and(char::is_ascii_lowercase)
                    && !is_plural_suffix(&chars, i + 1)
            };
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `true` when `chars[at]` is an `s` that ends the word.
fn is_plural_suffix(chars: &[char], at: usize) -> bool {
    chars.get(at) == Some(&'s') && !chars.get(at + 1).is_some_and(char::is_ascii_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Protobuf identifiers cannot start with a digit.
fn guard_leading_digit(name: String) -> String {
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> NameNormalizer {
        NameNormalizer::new(["NFT", "DID", "IDs"])
    }

    #[test]
    fn split_on_separators_and_case() {
        assert_eq!(split_words("pet-store_v2 item"), ["pet", "store", "v2", "item"]);
        assert_eq!(split_words("createdAt"), ["created", "At"]);
        assert_eq!(split_words("HTTPServer"), ["HTTP", "Server"]);
        assert_eq!(split_words("userIDs"), ["user", "IDs"]);
        assert_eq!(split_words("IDsList"), ["IDs", "List"]);
        assert_eq!(split_words("V2NFT"), ["V2", "NFT"]);
        assert!(split_words("--").is_empty());
    }

    #[test]
    fn message_names() {
        let n = normalizer();
        assert_eq!(n.normalize_message_name("pet"), "Pet");
        assert_eq!(n.normalize_message_name("pet_store"), "PetStore");
        assert_eq!(n.normalize_message_name("Pet Store API"), "PetStoreApi");
        assert_eq!(n.normalize_message_name("nft_metadata"), "NFTMetadata");
        assert_eq!(n.normalize_message_name("userIds"), "UserIDs");
        assert_eq!(n.normalize_message_name("NFTs"), "NFTs");
        assert_eq!(n.normalize_message_name("did-document"), "DIDDocument");
    }

    #[test]
    fn field_names() {
        let n = normalizer();
        assert_eq!(n.normalize_field_name("petId"), "pet_id");
        assert_eq!(n.normalize_field_name("Pet-Store"), "pet_store");
        assert_eq!(n.normalize_field_name("userIDs"), "user_ids");
        assert_eq!(n.normalize_field_name("already_snake"), "already_snake");
    }

    #[test]
    fn leading_digit_is_guarded() {
        let n = normalizer();
        assert_eq!(n.normalize_message_name("2fa"), "_2fa");
        assert_eq!(n.normalize_field_name("3d-model"), "_3d_model");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let n = normalizer();
        assert_eq!(n.normalize_message_name(""), "");
        assert_eq!(n.normalize_field_name(""), "");
        assert_eq!(n.normalize_field_name("__"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = normalizer();
        for input in [
            "pet_store",
            "HTTPServer",
            "userIDs",
            "nft-collection",
            "GetV2NFTCategories",
            "2fa",
            "x-rate-limit",
            "DIDs",
        ] {
            let message = n.normalize_message_name(input);
            assert_eq!(n.normalize_message_name(&message), message, "{input}");
            let field = n.normalize_field_name(input);
            assert_eq!(n.normalize_field_name(&field), field, "{input}");
        }
    }

    #[test]
    fn enum_value_names() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize_enum_value_name("in-progress"), "IN_PROGRESS");
        assert_eq!(n.normalize_enum_value_name("Active"), "ACTIVE");
    }
}
