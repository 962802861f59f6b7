//! `/api/users` handlers.

use crate::error::ApiError;
use crate::types::{
    parse_user_id, AddHobbyRequest, CreateUserRequest, FriendRequest, HobbyQuery,
    UpdateUserRequest,
};
use crate::{with_service, SharedState};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use usernet_core::{Ack, GraphView, ScoredUser};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

pub async fn list_users(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ScoredUser>>, ApiError> {
    let users = with_service(&state, |service| service.list_users()).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<SharedState>,
    body: JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<ScoredUser>), ApiError> {
    let Json(request) = body?;
    let input = request.into_new_user()?;
    let user = with_service(&state, move |service| service.create_user(input)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ScoredUser>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = with_service(&state, move |service| service.get_user(id)).await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<UpdateUserRequest>,
) -> Result<Json<ScoredUser>, ApiError> {
    let id = parse_user_id(&id)?;
    let Json(request) = body?;
    let patch = request.into_patch()?;
    let user = with_service(&state, move |service| service.update_user(id, patch)).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let id = parse_user_id(&id)?;
    let ack = with_service(&state, move |service| service.delete_user(id)).await?;
    Ok(Json(ack))
}

pub async fn link_users(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<FriendRequest>,
) -> Result<Json<Ack>, ApiError> {
    let Json(request) = body?;
    let friend = request.friend_id()?;
    let id = parse_user_id(&id)?;
    let ack = with_service(&state, move |service| service.link_users(id, friend)).await?;
    Ok(Json(ack))
}

pub async fn unlink_users(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<FriendRequest>,
) -> Result<Json<Ack>, ApiError> {
    let Json(request) = body?;
    let friend = request.friend_id()?;
    let id = parse_user_id(&id)?;
    let ack = with_service(&state, move |service| service.unlink_users(id, friend)).await?;
    Ok(Json(ack))
}

pub async fn add_hobby(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<AddHobbyRequest>,
) -> Result<Json<ScoredUser>, ApiError> {
    let id = parse_user_id(&id)?;
    let Json(request) = body?;
    let Some(hobby) = request.hobby else {
        return Err(ApiError::bad_request("Hobby is required"));
    };
    let user = with_service(&state, move |service| service.add_hobby(id, &hobby)).await?;
    Ok(Json(user))
}

pub async fn graph(State(state): State<SharedState>) -> Result<Json<GraphView>, ApiError> {
    let view = with_service(&state, |service| service.graph()).await?;
    Ok(Json(view))
}

pub async fn hobbies(
    State(state): State<SharedState>,
    query: Result<Query<HobbyQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Query(query) = query?;
    let hobbies = with_service(&state, move |service| service.hobbies(query.q.as_deref())).await?;
    Ok(Json(hobbies))
}
