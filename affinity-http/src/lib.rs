//! The group service's HTTP façade: routes, authentication extraction and the
//! error-to-status-code mapping described for the external HTTP surface.

use std::convert::Infallible;
use std::sync::Arc;

use affinity_core::{AffinityError, Principal, Token};
use affinity_service::{GroupService, SchemeRegistry};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Shared façade state: the group service being fronted and the schemes that
/// authenticate inbound requests.
#[derive(Clone)]
pub struct AppState {
    service: Arc<GroupService>,
    schemes: Arc<SchemeRegistry>,
}

impl AppState {
    /// Build façade state over an existing service and scheme registry.
    pub fn new(service: Arc<GroupService>, schemes: Arc<SchemeRegistry>) -> Self {
        Self { service, schemes }
    }
}

/// A rejection carrying an [`AffinityError`], so `recover` can render the
/// specification's status-code table.
#[derive(Debug)]
struct ApiError(AffinityError);

impl warp::reject::Reject for ApiError {}

fn reject(err: AffinityError) -> Rejection {
    warp::reject::custom(ApiError(err))
}

fn authenticate(state: &AppState, header: Option<String>) -> Result<Principal, Rejection> {
    let header = header.ok_or_else(|| reject(AffinityError::Unauthorized("missing Authorization header".into())))?;
    let token = Token::parse(&header).map_err(reject)?;
    state.schemes.authenticate(&token).map_err(reject)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn auth_header() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

#[derive(Serialize, Deserialize)]
struct GroupDescriptorBody {
    uri: String,
    members: Vec<String>,
}

/// Every route handler below converts to this via [`Reply::into_response`], so the
/// `.or()`-combined filter chain has one concrete extract type to `.unify()` down to
/// regardless of which handler answered.
type BoxReply = warp::reply::Response;

async fn add_group(group: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    state.service.add_group(&as_user, &group).map_err(reject)?;
    Ok(StatusCode::OK.into_response())
}

async fn remove_group(group: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    state.service.remove_group(&as_user, &group).map_err(reject)?;
    Ok(StatusCode::OK.into_response())
}

async fn describe_group(group: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    let descriptor = state.service.describe_group(&as_user, &group).map_err(reject)?;
    Ok(warp::reply::json(&GroupDescriptorBody {
        uri: descriptor.uri,
        members: descriptor.members,
    })
    .into_response())
}

async fn add_member(group: String, principal: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    let member = Principal::parse(&principal).map_err(reject)?;
    state.service.add_member(&as_user, &group, &member).map_err(reject)?;
    Ok(StatusCode::OK.into_response())
}

async fn remove_member(group: String, principal: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    let member = Principal::parse(&principal).map_err(reject)?;
    state.service.remove_member(&as_user, &group, &member).map_err(reject)?;
    Ok(StatusCode::OK.into_response())
}

async fn check_member(group: String, principal: String, state: AppState, header: Option<String>) -> Result<BoxReply, Rejection> {
    let as_user = authenticate(&state, header)?;
    let member = Principal::parse(&principal).map_err(reject)?;
    let is_member = state.service.check_member(&as_user, &group, &member).map_err(reject)?;
    if is_member {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(StatusCode::NOT_FOUND.into_response())
    }
}

/// Build the complete set of routes described for the group service's HTTP surface.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let group_only = warp::path::param::<String>().and(warp::path::end());
    let group_and_principal = warp::path::param::<String>()
        .and(warp::path::param::<String>())
        .and(warp::path::end());

    let put_group = warp::put()
        .and(group_only)
        .and(with_state(state.clone()))
        .and(auth_header())
        .and_then(add_group);

    let delete_group = warp::delete()
        .and(group_only)
        .and(with_state(state.clone()))
        .and(auth_header())
        .and_then(remove_group);

    let get_group = warp::get()
        .and(group_only)
        .and(with_state(state.clone()))
        .and(auth_header())
        .and_then(describe_group);

    let put_member = warp::put()
        .and(group_and_principal)
        .and(with_state(state.clone()))
        .and(auth_header())
        .and_then(add_member);

    let delete_member = warp::delete()
        .and(group_and_principal)
        .and(with_state(state.clone()))
        .and(auth_header())
        .and_then(remove_member);

    let get_member = warp::get()
        .and(group_and_principal)
        .and(with_state(state))
        .and(auth_header())
        .and_then(check_member);

    put_group
        .or(delete_group)
        .unify()
        .or(get_group)
        .unify()
        .or(put_member)
        .unify()
        .or(delete_member)
        .unify()
        .or(get_member)
        .unify()
        .recover(handle_rejection)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(ApiError(cause)) = err.find() {
        let status = match cause {
            AffinityError::NotFound(_) => StatusCode::NOT_FOUND,
            AffinityError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AffinityError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AffinityError::ParseError(_) => StatusCode::BAD_REQUEST,
            AffinityError::AlreadyGranted { .. } => StatusCode::BAD_REQUEST,
            AffinityError::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, cause.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "unhandled rejection".to_string())
    };

    Ok(warp::reply::with_status(warp::reply::json(&ErrorBody { error: message }), status))
}
