use axum::{
    extract::{Json, Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{validation, ApiJson};
use crate::db::models::{
    CollectionChanges, CollectionSummary, Contributor, NewCollection, NewContributor,
};
use crate::error::ApiError;
use crate::money::Amount;
use crate::query::{CollectionFilter, QueryError, RemainingAmountFilter};
use crate::AppState;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResource {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub target_amount: Amount,
    pub link: String,
    pub total_contributed: Amount,
    pub remaining_amount: Amount,
}

impl From<CollectionSummary> for CollectionResource {
    fn from(summary: CollectionSummary) -> Self {
        let total_contributed = summary.total_contributed();
        let remaining_amount = summary.remaining_amount();
        let c = summary.collection;
        CollectionResource {
            id: c.id,
            title: c.title,
            description: c.description,
            target_amount: c.target_amount,
            link: c.link,
            total_contributed,
            remaining_amount,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct CollectionDetailResource {
    #[serde(flatten)]
    pub collection: CollectionResource,
    pub contributors: Vec<Contributor>,
}

impl CollectionDetailResource {
    fn new(collection: crate::db::models::Collection, contributors: Vec<Contributor>) -> Self {
        let raised: Option<Amount> = if contributors.is_empty() {
            None
        } else {
            Some(contributors.iter().map(|c| c.amount).sum())
        };
        CollectionDetailResource {
            collection: CollectionSummary { collection, raised }.into(),
            contributors,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<Amount>,
    pub link: Option<String>,
}

impl CollectionPayload {
    /// Validates a payload where every field is required.
    fn into_new(self) -> Result<NewCollection, ApiError> {
        Ok(NewCollection {
            title: validation::text("title", validation::required("title", self.title)?)?,
            description: validation::text(
                "description",
                validation::required("description", self.description)?,
            )?,
            target_amount: validation::non_negative(
                "targetAmount",
                validation::required("targetAmount", self.target_amount)?,
            )?,
            link: validation::link("link", validation::required("link", self.link)?)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorPayload {
    pub user_name: Option<String>,
    pub amount: Option<Amount>,
}

fn parse_flag(key: &str, value: &str) -> Result<bool, QueryError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(QueryError::InvalidFilterInput(format!("{} must be a boolean", key))),
    }
}

/// Reads `remainingAmount[<op>]=<number>` and `isLessThanTargetAmount=<bool>`
/// from a raw query string. Unrelated parameters are ignored.
pub fn parse_filter_query(raw: Option<&str>) -> Result<CollectionFilter, QueryError> {
    let mut operators: Vec<(String, String)> = Vec::new();
    let mut remaining_requested = false;
    let mut filter = CollectionFilter::default();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        if key == "isLessThanTargetAmount" {
            filter.is_less_than_target_amount = parse_flag(&key, &value)?;
        } else if key == "remainingAmount" {
            return Err(QueryError::InvalidFilterInput(
                "remainingAmount must be keyed by an operator, e.g. remainingAmount[lt]=500".into(),
            ));
        } else if let Some(op) = key
            .strip_prefix("remainingAmount[")
            .and_then(|k| k.strip_suffix(']'))
        {
            remaining_requested = true;
            operators.push((op.to_string(), value.into_owned()));
        }
    }

    if remaining_requested {
        filter.remaining_amount = Some(RemainingAmountFilter::from_entries(operators)?);
    }
    Ok(filter)
}

pub async fn list_collections(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter_query(query.as_deref())
        .inspect_err(|e| tracing::debug!("Rejected collection filter: {}", e))?;
    let summaries = state.collections.get_filtered(&filter).await?;
    let data: Vec<CollectionResource> =
        summaries.into_iter().map(CollectionResource::from).collect();
    Ok(Json(json!({ "data": data })))
}

pub async fn show_collection(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let (collection, contributors) = crate::db::get_collection_with_contributors(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Collection not found."))?;
    Ok(Json(json!({ "data": CollectionDetailResource::new(collection, contributors) })))
}

pub async fn create_collection(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CollectionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = crate::db::create_collection(&state.db, req.into_new()?).await?;
    tracing::info!(collection_id = created.id, "collection created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": CollectionDetailResource::new(created, Vec::new()) })),
    ))
}

async fn apply_collection_changes(
    state: &AppState,
    id: i64,
    changes: CollectionChanges,
) -> Result<impl IntoResponse, ApiError> {
    if !crate::db::update_collection(&state.db, id, changes).await? {
        return Err(ApiError::NotFound("Collection not found."));
    }
    Ok(Json(json!({ "message": "Collection updated." })))
}

/// PUT: every field is required.
pub async fn replace_collection(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CollectionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let full = req.into_new()?;
    let changes = CollectionChanges {
        title: Some(full.title),
        description: Some(full.description),
        target_amount: Some(full.target_amount),
        link: Some(full.link),
    };
    apply_collection_changes(&state, id, changes).await
}

/// PATCH: only the fields present are validated and written.
pub async fn update_collection(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CollectionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = CollectionChanges {
        title: validation::optional_text("title", req.title)?,
        description: validation::optional_text("description", req.description)?,
        target_amount: req
            .target_amount
            .map(|a| validation::non_negative("targetAmount", a))
            .transpose()?,
        link: req.link.map(|l| validation::link("link", l)).transpose()?,
    };
    apply_collection_changes(&state, id, changes).await
}

pub async fn delete_collection(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    if !crate::db::delete_collection(&state.db, id).await? {
        return Err(ApiError::NotFound("Collection not found."));
    }
    tracing::info!(collection_id = id, "collection deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_contributor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContributorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewContributor {
        user_name: validation::text("userName", validation::required("userName", req.user_name)?)?,
        amount: validation::amount("amount", validation::required("amount", req.amount)?)?,
    };

    let contributor = crate::db::create_contributor(&state.db, id, new)
        .await?
        .ok_or(ApiError::NotFound("Collection not found."))?;
    Ok((StatusCode::CREATED, Json(json!({ "data": contributor }))))
}
