//! Matching utilities for contact search.
//!
//! This module provides case-insensitive substring matching and similarity
//! ranking for name-shaped search queries.

pub mod name_ranker;

pub use name_ranker::{
    contains_ignore_case, fold, name_candidate_cap, recency_then_id, NameRanker,
};
