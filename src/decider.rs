//! Choice of the final status sent for a document that has none.

use rand::Rng;

use crate::entities::FinalStatus;
use crate::matching::Match;

pub trait StatusDecider {
    fn decide(&mut self, matched: &Match) -> FinalStatus;
}

/// Accepts or rejects with equal probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDecider;

impl StatusDecider for RandomDecider {
    fn decide(&mut self, _matched: &Match) -> FinalStatus {
        if rand::thread_rng().gen_bool(0.5) {
            FinalStatus::Accepted
        } else {
            FinalStatus::Rejected
        }
    }
}

impl<F> StatusDecider for F
where
    F: FnMut(&Match) -> FinalStatus,
{
    fn decide(&mut self, matched: &Match) -> FinalStatus {
        self(matched)
    }
}
