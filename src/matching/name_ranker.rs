//! Similarity ranking for name search.
//!
//! Candidates are first filtered by a case-insensitive substring match of
//! the query against "first last". Survivors are ranked by the nucleo
//! substring score (word-boundary and prefix hits score higher), then by
//! how much of the name the query covers, then by most recent update.

use crate::models::Contact;
use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use std::cmp::Ordering;

/// Case-fold text for comparison. Full Unicode lowercase mapping; stored
/// `*_fold` columns are computed with this too.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Candidates per requested result fed to the ranker.
pub const NAME_CANDIDATES_PER_RESULT: usize = 10;

/// Floor on the candidate count, so small limits still rank a useful pool.
pub const MIN_NAME_CANDIDATES: usize = 50;

/// How many substring matches name search loads before ranking. The most
/// recently updated candidates are kept; older matches past the cap are
/// never ranked.
pub fn name_candidate_cap(limit: usize) -> usize {
    limit
        .saturating_mul(NAME_CANDIDATES_PER_RESULT)
        .max(MIN_NAME_CANDIDATES)
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(&fold(needle))
}

/// Ranks contacts against one name query.
pub struct NameRanker {
    query: String,
    atom: Atom,
    matcher: Matcher,
    buf: Vec<char>,
}

impl NameRanker {
    /// Create a ranker for a (trimmed) query.
    pub fn new(query: &str) -> Self {
        let atom = Atom::new(
            query,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Substring,
            false,
        );
        Self {
            query: query.to_string(),
            atom,
            matcher: Matcher::new(Config::DEFAULT),
            buf: Vec::new(),
        }
    }

    /// Whether the contact's full name contains the query.
    pub fn matches(&self, contact: &Contact) -> bool {
        contains_ignore_case(&contact.full_name(), &self.query)
    }

    /// Similarity score of a name, 0 when there is no match.
    pub fn score(&mut self, name: &str) -> u16 {
        self.atom
            .score(Utf32Str::new(name, &mut self.buf), &mut self.matcher)
            .unwrap_or(0)
    }

    /// Keep matching contacts and order them best match first.
    pub fn rank(&mut self, contacts: Vec<Contact>) -> Vec<Contact> {
        let candidates: Vec<Contact> = contacts
            .into_iter()
            .filter(|c| self.matches(c))
            .collect();

        let mut scored: Vec<(u16, usize, Contact)> = candidates
            .into_iter()
            .map(|c| {
                let name = c.full_name();
                let score = self.score(&name);
                (score, name.chars().count(), c)
            })
            .collect();

        scored.sort_by(|(score_a, len_a, a), (score_b, len_b, b)| {
            score_b
                .cmp(score_a)
                .then_with(|| len_a.cmp(len_b))
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        scored.into_iter().map(|(_, _, c)| c).collect()
    }
}

/// Most recently updated first, ties broken by ascending id.
pub fn recency_then_id(a: &Contact, b: &Contact) -> Ordering {
    b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id))
}
