use axum::{
    Form,
    body::Bytes,
    extract::{Path, State, rejection::FormRejection},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect},
};
use tracing::{debug, info};

use super::{
    AppState, Result, WebError,
    forms::{QueryForm, RecordForm},
    views,
};
use crate::core::RecordId;
use crate::deploy::SIGNATURE_HEADER;
use crate::query::{ParsedQuery, RecordQuery};

const LIST_PATH: &str = "/read";

pub async fn index() -> Html<String> {
    Html(views::index())
}

pub async fn healthcheck() -> &'static str {
    "ok"
}

pub async fn list_records(State(state): State<AppState>) -> Result<Html<String>> {
    let records = state.store.find(&RecordQuery::newest_first()).await?;
    Ok(Html(views::read(&records, None)))
}

pub async fn query_records(
    State(state): State<AppState>,
    form: std::result::Result<Form<QueryForm>, FormRejection>,
) -> Result<Html<String>> {
    let Form(form) = form?;
    let line = form.into_line()?;
    let parsed = ParsedQuery::parse(&line)?;
    if let Some(filter) = parsed.filter() {
        debug!(field = %filter.field, op = %filter.op, value = %filter.value, "filter parsed");
    }

    let records = state.store.find(&RecordQuery::from_parsed(parsed)).await?;
    Ok(Html(views::read(&records, Some(&line))))
}

pub async fn create_form() -> Html<String> {
    Html(views::create())
}

pub async fn create_record(
    State(state): State<AppState>,
    form: std::result::Result<Form<RecordForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;
    let record = state.store.insert(form.into_draft()?).await?;
    info!(record_id = %record.record_id, "record created");
    Ok(Redirect::to(LIST_PATH))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Html<String>> {
    let record_id: RecordId = record_id.parse()?;
    let record = state
        .store
        .find_one(record_id)
        .await?
        .ok_or_else(|| WebError::NotFound("record not found".to_string()))?;
    Ok(Html(views::edit(&record)))
}

pub async fn edit_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    form: std::result::Result<Form<RecordForm>, FormRejection>,
) -> Result<Redirect> {
    let record_id: RecordId = record_id.parse()?;
    let Form(form) = form?;
    let draft = form.into_draft()?;
    state
        .store
        .replace(record_id, draft)
        .await?
        .ok_or_else(|| WebError::NotFound("record not found".to_string()))?;
    info!(record_id = %record_id, "record updated");
    Ok(Redirect::to(LIST_PATH))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Redirect> {
    let record_id: RecordId = record_id.parse()?;
    let deleted = state.store.delete(record_id).await?;
    info!(record_id = %record_id, deleted, "record delete requested");
    Ok(Redirect::to(LIST_PATH))
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let deployer = state
        .deployer
        .as_ref()
        .ok_or_else(|| WebError::NotFound("webhook is not enabled".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let report = deployer.handle(signature, &body).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.render(),
    ))
}

pub async fn not_found() -> WebError {
    WebError::NotFound("page not found".to_string())
}
