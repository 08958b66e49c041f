use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::money::Amount;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub target_amount: Amount,
    pub link: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub id: i64,
    pub collection_id: i64,
    pub user_name: String,
    pub amount: Amount,
}

#[derive(Serialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A collection joined with the sum of its contributions.
///
/// `raised` is `None` when the collection has no contributors at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub collection: Collection,
    pub raised: Option<Amount>,
}

impl CollectionSummary {
    pub fn total_contributed(&self) -> Amount {
        self.raised.unwrap_or(Amount::ZERO)
    }

    pub fn remaining_amount(&self) -> Amount {
        self.collection.target_amount - self.total_contributed()
    }
}

#[derive(Debug, Clone)]
pub struct NewCollection {
    pub title: String,
    pub description: String,
    pub target_amount: Amount,
    pub link: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CollectionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<Amount>,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContributor {
    pub user_name: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default)]
pub struct ContributorChanges {
    pub user_name: Option<String>,
    pub amount: Option<Amount>,
}
