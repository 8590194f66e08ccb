//! The closed-loop preference-learning core of the job scout.
//!
//! User triage decisions (liked / maybe / disliked) flow in through the
//! external job catalog; what flows out is a set of small persisted
//! recommendation artifacts: an accuracy trend, rewritten filtering
//! guidance with a strictness level, autonomous strategy parameters and a
//! ranked view of search-query performance. Every module degrades to a
//! safe default instead of failing; the loop is advisory and must never
//! block the surrounding job-search workflow.

pub mod accuracy;
pub mod deadlines;
pub mod preferences;
pub mod queries;
pub mod signals;
pub mod strategy;
