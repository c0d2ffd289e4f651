use std::fmt::Display;
use std::str::FromStr;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use campus_core::AppError;
use campus_models::ids::LinkId;

use crate::modules::program_tree::model::{
    AdjacencyParams, AdjacencyRow, CreateLinkDto, LinkResponse, ReverseAdjacencyParams,
    ReverseAdjacencyRow, UpdateLinkDto,
};
use crate::modules::program_tree::service::ProgramTreeService;
use crate::state::AppState;
use crate::validator::{QueryParams, ValidatedJson};

/// Parses a comma-separated id list. An absent or blank parameter is an
/// empty list.
fn parse_id_list<T>(raw: Option<&str>, name: &str) -> Result<Vec<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(|item| {
            item.trim().parse::<T>().map_err(|e| {
                AppError::bad_request(anyhow!(
                    "type error: {name} must be a comma-separated list of UUIDs ({e})"
                ))
            })
        })
        .collect()
}

/// Attach a child under a parent
#[utoipa::path(
    post,
    path = "/api/program-tree/links",
    summary = "Create link",
    request_body = CreateLinkDto,
    responses(
        (status = 201, description = "Link created", body = LinkResponse),
        (status = 400, description = "The link breaks a tree rule"),
        (status = 404, description = "Parent or child not found"),
        (status = 422, description = "Invalid input")
    ),
    tag = "Program Tree"
)]
#[instrument(skip(state))]
pub async fn create_link(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateLinkDto>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let link = ProgramTreeService::create_link(state.program_tree.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// Move a link or change its attributes
#[utoipa::path(
    put,
    path = "/api/program-tree/links/{id}",
    summary = "Update link",
    params(
        ("id" = Uuid, Path, description = "Link ID")
    ),
    request_body = UpdateLinkDto,
    responses(
        (status = 200, description = "Link updated", body = LinkResponse),
        (status = 400, description = "The link breaks a tree rule"),
        (status = 404, description = "Link or parent not found"),
        (status = 422, description = "Invalid input")
    ),
    tag = "Program Tree"
)]
#[instrument(skip(state))]
pub async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateLinkDto>,
) -> Result<Json<LinkResponse>, AppError> {
    let link =
        ProgramTreeService::update_link(state.program_tree.as_ref(), LinkId::from(id), dto).await?;
    Ok(Json(link))
}

#[utoipa::path(
    delete,
    path = "/api/program-tree/links/{id}",
    summary = "Detach link",
    params(
        ("id" = Uuid, Path, description = "Link ID")
    ),
    responses(
        (status = 204, description = "Link deleted"),
        (status = 404, description = "Link not found")
    ),
    tag = "Program Tree"
)]
#[instrument(skip(state))]
pub async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ProgramTreeService::delete_link(state.program_tree.as_ref(), LinkId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every link below the given roots, breadth first
#[utoipa::path(
    get,
    path = "/api/program-tree/adjacency",
    summary = "Get adjacency list",
    params(AdjacencyParams),
    responses(
        (status = 200, description = "Links ordered by root, level and order", body = Vec<AdjacencyRow>),
        (status = 400, description = "root_ids is not a list of UUIDs")
    ),
    tag = "Program Tree"
)]
#[instrument(skip(state))]
pub async fn get_adjacency_list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<AdjacencyParams>,
) -> Result<Json<Vec<AdjacencyRow>>, AppError> {
    let root_ids = parse_id_list(params.root_ids.as_deref(), "root_ids")?;
    let rows = ProgramTreeService::adjacency_list(state.program_tree.as_ref(), &root_ids).await?;
    Ok(Json(rows))
}

/// Every link above the given leaves and branches
#[utoipa::path(
    get,
    path = "/api/program-tree/reverse-adjacency",
    summary = "Get reverse adjacency list",
    params(ReverseAdjacencyParams),
    responses(
        (status = 200, description = "Links from each starting node up to the roots", body = Vec<ReverseAdjacencyRow>),
        (status = 400, description = "An id list is not a list of UUIDs")
    ),
    tag = "Program Tree"
)]
#[instrument(skip(state))]
pub async fn get_reverse_adjacency_list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ReverseAdjacencyParams>,
) -> Result<Json<Vec<ReverseAdjacencyRow>>, AppError> {
    let child_leaf_ids = parse_id_list(params.child_leaf_ids.as_deref(), "child_leaf_ids")?;
    let child_branch_ids = parse_id_list(params.child_branch_ids.as_deref(), "child_branch_ids")?;

    let rows = ProgramTreeService::reverse_adjacency_list(
        state.program_tree.as_ref(),
        &child_leaf_ids,
        &child_branch_ids,
        params.link_type,
    )
    .await?;
    Ok(Json(rows))
}
