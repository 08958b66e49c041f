use super::builder::{AggregationQuery, Predicate};
use super::operator::RemainingAmountFilter;

/// Caller-side filter: an optional remaining-amount comparison and the
/// under-target flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    pub remaining_amount: Option<RemainingAmountFilter>,
    pub is_less_than_target_amount: bool,
}

impl CollectionFilter {
    pub fn is_empty(&self) -> bool {
        self.remaining_amount.is_none() && !self.is_less_than_target_amount
    }
}

/// Turns a filter into the aggregation query. Both conditions, when present, must hold.
pub fn compose(filter: &CollectionFilter) -> AggregationQuery {
    let mut query = AggregationQuery::new();
    if filter.is_less_than_target_amount {
        query = query.and_where(Predicate::UnderTarget);
    }
    if let Some(remaining) = filter.remaining_amount {
        query = query.and_where(Predicate::Remaining(remaining));
    }
    query
}
