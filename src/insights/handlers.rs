use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        ExportResponse, InsightCreate, InsightListResponse, InsightResponse, InsightUpdate,
        Pagination,
    },
    export::{ExportJob, EXPORT_SUCCESS},
    repo_types::Analytics,
    services::InsightService,
};
use crate::{
    auth::extractors::CurrentUser,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/insights", get(list_insights).post(create_insight))
        .route("/insights/analytics", get(get_analytics))
        .route("/insights/export", post(export_insights))
        .route(
            "/insights/:id",
            get(get_insight).put(update_insight).delete(delete_insight),
        )
}

#[instrument(skip_all, fields(limit = p.limit, offset = p.offset))]
pub async fn list_insights(
    State(svc): State<InsightService>,
    _user: CurrentUser,
    AppQuery(p): AppQuery<Pagination>,
) -> AppResult<Json<InsightListResponse>> {
    p.validate()?;
    let (items, total) = svc.list(p.limit, p.offset).await?;
    Ok(Json(InsightListResponse {
        items: items.into_iter().map(InsightResponse::from).collect(),
        total,
        limit: p.limit,
        offset: p.offset,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_insight(
    State(svc): State<InsightService>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<InsightCreate>,
) -> AppResult<(StatusCode, Json<InsightResponse>)> {
    let created = svc.create(body, &user).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[instrument(skip_all)]
pub async fn get_analytics(
    State(svc): State<InsightService>,
    _user: CurrentUser,
) -> AppResult<Json<Analytics>> {
    Ok(Json(svc.analytics().await?))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn export_insights(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ExportResponse>> {
    let job = ExportJob::new(
        state.insights.clone(),
        state.notifier.clone(),
        &state.config.export,
    );
    let summary = job.run(&user).await?;
    Ok(Json(ExportResponse {
        message: EXPORT_SUCCESS,
        exported_count: summary.exported_count,
    }))
}

#[instrument(skip(svc, _user))]
pub async fn get_insight(
    State(svc): State<InsightService>,
    _user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<InsightResponse>> {
    Ok(Json(svc.get(id).await?.into()))
}

#[instrument(skip(svc, user, body), fields(user_id = %user.id))]
pub async fn update_insight(
    State(svc): State<InsightService>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<InsightUpdate>,
) -> AppResult<Json<InsightResponse>> {
    let patch = body.into_patch()?;
    Ok(Json(svc.update(id, patch, &user).await?.into()))
}

#[instrument(skip(svc, user), fields(user_id = %user.id))]
pub async fn delete_insight(
    State(svc): State<InsightService>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    svc.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
