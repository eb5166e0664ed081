//! Message history endpoints.
//!
//! Reads go over REST; writes only ever happen through the gateway.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::models::message::StoredMessage;
use crate::store::messages::PageParams;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/community/{community_id}", get(community_history))
        .route("/messages/private/{user_id}", get(private_history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// 1-based page number.
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<StoredMessage>,
    pub has_more: bool,
}

/// Fetch one past the page size; the extra row only tells us whether a
/// next page exists. The offset saturates, so a page far past the end
/// reads as an empty page.
fn probe_window(params: &HistoryParams) -> (PageParams, u64) {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    (
        PageParams {
            offset: page.saturating_sub(1).saturating_mul(limit),
            limit: limit + 1,
        },
        limit,
    )
}

async fn community_history(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (window, limit) = probe_window(&params);
    let mut data = state.messages.list_community(&community_id, window).await?;

    let has_more = data.len() as u64 > limit;
    data.truncate(limit as usize);

    Ok(Json(HistoryResponse { data, has_more }))
}

async fn private_history(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (window, limit) = probe_window(&params);
    let mut data = state
        .messages
        .list_private(&identity.user_id, &user_id, window)
        .await?;

    let has_more = data.len() as u64 > limit;
    data.truncate(limit as usize);

    Ok(Json(HistoryResponse { data, has_more }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_window_fetches_one_extra_row() {
        let params = HistoryParams {
            page: Some(3),
            limit: Some(20),
        };
        let (window, limit) = probe_window(&params);
        assert_eq!(window.offset, 40);
        assert_eq!(window.limit, 21);
        assert_eq!(limit, 20);
    }

    #[test]
    fn probe_window_saturates_extreme_pages() {
        let params = HistoryParams {
            page: Some(u64::MAX),
            limit: Some(100),
        };
        let (window, _) = probe_window(&params);
        assert_eq!(window.offset, u64::MAX);

        let params = HistoryParams {
            page: Some(0),
            limit: None,
        };
        let (window, _) = probe_window(&params);
        assert_eq!(window.offset, 0);
    }
}
