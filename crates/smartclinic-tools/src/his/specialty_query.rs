//! Full-list versus filtered specialty lookups.
//!
//! The HIS only offers the complete specialty list, so narrowing it down
//! happens here. A question is tokenized (upper-cased, split on anything that
//! is not a letter or digit) and then:
//!
//! 1. If any token is one of [`FULL_LIST_TERMS`], the full list is returned,
//!    even when the question also names a specialty.
//! 2. Otherwise the [`STOP_WORDS`] are dropped. If nothing is left, the full
//!    list is returned.
//! 3. Otherwise each remaining word filters the list: a record matches when
//!    its `DESCRIPTION` contains the word or its stem (see [`stem`]).
//!
//! This is a heuristic. The term lists are pinned by the tests below.
//!
//! ```
//! use smartclinic_tools::his::specialty_query::{SpecialtyQuery, classify};
//!
//! assert_eq!(classify("What specialties are available?"), SpecialtyQuery::FullList);
//! assert_eq!(
//!     classify("do you have cardiologists"),
//!     SpecialtyQuery::Filtered { terms: vec!["CARDIOLOGISTS".to_string()] },
//! );
//! ```

use serde_json::{Value, json};

/// Tokens that ask for the whole list.
pub const FULL_LIST_TERMS: &[&str] = &[
    "FULL",
    "ALL",
    "COMPLETE",
    "EVERYTHING",
    "YES",
    "YEAH",
    "SURE",
    "LIST",
    "SHOW",
    "MORE",
    "AVAILABLE",
    "OFFER",
];

/// Tokens that carry no specialty information.
pub const STOP_WORDS: &[&str] = &[
    "WHAT",
    "WHICH",
    "ARE",
    "IS",
    "THE",
    "DO",
    "DOES",
    "YOU",
    "HAVE",
    "THERE",
    "ANY",
    "FOR",
    "A",
    "AN",
    "IN",
    "AT",
    "BY",
    "WITH",
    "ABOUT",
    "PLEASE",
    "CAN",
    "COULD",
    "WOULD",
    "ME",
    "I",
    "WE",
    "OF",
    "TO",
    "GIVE",
    "TELL",
    "SPECIALTY",
    "SPECIALTIES",
    "SPECIALITY",
    "SPECIALITIES",
    "DOCTOR",
    "DOCTORS",
    "DEPARTMENT",
    "DEPARTMENTS",
];

/// Suffixes stripped to turn a practitioner word into its field
/// (`CARDIOLOGISTS` -> `CARDIOLOG`, `PEDIATRICIANS` -> `PEDIATRIC`).
const STEM_SUFFIXES: &[&str] = &["IANS", "IAN", "ISTS", "IST", "S"];

/// Shortest stem still used for matching.
const MIN_STEM_LEN: usize = 4;

/// How a specialty question should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialtyQuery {
    /// Return every specialty.
    FullList,
    /// Return the specialties matching any of these upper-case words.
    Filtered {
        /// Content words left after removing stop words, in query order.
        terms: Vec<String>,
    },
}

/// Upper-cases `query` and splits it on non-alphanumeric characters.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_uppercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strips the first matching practitioner suffix, if the remaining stem is
/// long enough to be meaningful.
#[must_use]
pub fn stem(term: &str) -> Option<&str> {
    STEM_SUFFIXES.iter().find_map(|suffix| {
        term.strip_suffix(suffix)
            .filter(|stem| stem.chars().count() >= MIN_STEM_LEN)
    })
}

/// Decides between the full list and a filtered lookup.
#[must_use]
pub fn classify(query: &str) -> SpecialtyQuery {
    let tokens = tokenize(query);

    if tokens.iter().any(|t| FULL_LIST_TERMS.contains(&t.as_str())) {
        return SpecialtyQuery::FullList;
    }

    let mut terms: Vec<String> = Vec::new();
    for token in tokens {
        if !STOP_WORDS.contains(&token.as_str()) && !terms.contains(&token) {
            terms.push(token);
        }
    }

    if terms.is_empty() {
        SpecialtyQuery::FullList
    } else {
        SpecialtyQuery::Filtered { terms }
    }
}

impl SpecialtyQuery {
    /// Whether a specialty `description` satisfies this query.
    #[must_use]
    pub fn matches(&self, description: &str) -> bool {
        match self {
            Self::FullList => true,
            Self::Filtered { terms } => {
                let description = description.to_uppercase();
                terms.iter().any(|term| {
                    description.contains(term.as_str())
                        || stem(term).is_some_and(|s| description.contains(s))
                })
            }
        }
    }

    /// Builds the tool payload from the raw `InitAll` response.
    ///
    /// Records are read from `Codes.SPECIALITY`; a response without that
    /// array yields an empty list.
    #[must_use]
    pub fn select(&self, response: &Value) -> Value {
        let records: &[Value] = response
            .get("Codes")
            .and_then(|codes| codes.get("SPECIALITY"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        match self {
            Self::FullList => json!({
                "specialties": records,
                "is_full_list": true,
            }),
            Self::Filtered { terms } => {
                let matching: Vec<&Value> = records
                    .iter()
                    .filter(|record| {
                        record
                            .get("DESCRIPTION")
                            .and_then(Value::as_str)
                            .is_some_and(|d| self.matches(d))
                    })
                    .collect();
                json!({
                    "specialties": matching,
                    "is_full_list": false,
                    "matched_terms": terms,
                })
            }
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classify_never_panics(query in ".*") {
            let _ = classify(&query).select(&json!({"Codes": {"SPECIALITY": [{"DESCRIPTION": "Cardiology"}]}}));
        }

        #[test]
        fn filtered_terms_are_never_stop_words(query in "[a-zA-Z ,?]{0,60}") {
            if let SpecialtyQuery::Filtered { terms } = classify(&query) {
                prop_assert!(!terms.is_empty());
                for term in terms {
                    prop_assert!(!STOP_WORDS.contains(&term.as_str()));
                    prop_assert!(!FULL_LIST_TERMS.contains(&term.as_str()));
                }
            }
        }
    }
}
