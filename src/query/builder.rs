use crate::db::models::CollectionSummary;
use crate::money::Amount;

use super::operator::{CentsCheck, RemainingAmountFilter};

/// Per-collection contribution sums, left-joined so collections without
/// contributors still appear once with a NULL `total_amount`.
const AGGREGATE_SELECT: &str = "\
SELECT c.id, c.title, c.description, c.target_amount, c.link, a.total_amount
FROM collections c
LEFT JOIN (
    SELECT collection_id, SUM(amount) AS total_amount
    FROM contributors
    GROUP BY collection_id
) a ON a.collection_id = c.id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Raised strictly less than target, or nothing raised at all.
    UnderTarget,
    /// `target - raised` compared against a threshold; nothing raised counts as 0.
    Remaining(RemainingAmountFilter),
}

impl Predicate {
    fn write_sql(&self, sql: &mut String, params: &mut Vec<Amount>) {
        match self {
            Predicate::UnderTarget => {
                sql.push_str("(a.total_amount < c.target_amount OR a.total_amount IS NULL)");
            }
            Predicate::Remaining(filter) => match filter.cents_check() {
                CentsCheck::Compare(operator, bound) => {
                    params.push(bound);
                    sql.push_str(&format!(
                        "(c.target_amount - COALESCE(a.total_amount, 0)) {} ?{}",
                        operator.sql(),
                        params.len()
                    ));
                }
                CentsCheck::Always => sql.push_str("(1 = 1)"),
                CentsCheck::Never => sql.push_str("(1 = 0)"),
            },
        }
    }

    /// Evaluates the predicate against an already aggregated row.
    pub fn matches(&self, summary: &CollectionSummary) -> bool {
        match self {
            Predicate::UnderTarget => match summary.raised {
                Some(raised) => raised < summary.collection.target_amount,
                None => true,
            },
            Predicate::Remaining(filter) => filter.matches(summary.remaining_amount()),
        }
    }
}

/// Aggregation query over all collections, narrowed by AND-ed predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationQuery {
    predicates: Vec<Predicate>,
}

impl AggregationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// SQL text with numbered placeholders, plus the values to bind in order.
    ///
    /// Result columns: `id, title, description, target_amount, link, total_amount`.
    pub fn to_sql(&self) -> (String, Vec<Amount>) {
        let mut sql = String::from(AGGREGATE_SELECT);
        let mut params = Vec::new();
        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { "\nWHERE " } else { "\n  AND " });
            predicate.write_sql(&mut sql, &mut params);
        }
        sql.push_str("\nORDER BY c.id");
        (sql, params)
    }

    pub fn matches(&self, summary: &CollectionSummary) -> bool {
        self.predicates.iter().all(|p| p.matches(summary))
    }
}
