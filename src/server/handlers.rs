// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication API routes, mounted under `/api`.

use super::error::ApiError;
use super::guard::{SessionToken, SessionUser};
use super::AppState;
use crate::domain::{OauthOptions, Profile};
use crate::error::ErrorKind;
use log::debug;
use rocket::http::{CookieJar, Status};
use rocket::serde::json::{json, Json, Value};
use rocket::{catch, get, options, post, Request, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct BeginRequest {
    pub provider: String,
    /// Extra parameters forwarded to the provider (`prompt`, `login_hint`...)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BeginResponse {
    /// Provider authorization URL the client must redirect to
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// Start a federated login.
#[post("/auth/begin", format = "json", data = "<request>")]
pub async fn begin(
    app: &State<AppState>,
    request: Json<BeginRequest>,
) -> Result<Json<BeginResponse>, ApiError> {
    let request = request.into_inner();
    let options = OauthOptions {
        params: request.params,
    };
    let url = app.accounts.begin_auth(&request.provider, &options).await?;
    Ok(Json(BeginResponse { url }))
}

/// Complete a federated login posted by the client application.
#[post("/auth/finish", format = "json", data = "<request>")]
pub async fn finish(
    app: &State<AppState>,
    cookies: &CookieJar<'_>,
    request: Json<FinishRequest>,
) -> Result<Json<Profile>, ApiError> {
    complete(app, cookies, &request.code, &request.state).await
}

/// Complete a federated login when the provider redirects straight to the API.
#[get("/auth/callback?<code>&<state>")]
pub async fn callback(
    app: &State<AppState>,
    cookies: &CookieJar<'_>,
    code: Option<String>,
    state: Option<String>,
) -> Result<Json<Profile>, ApiError> {
    complete(
        app,
        cookies,
        code.as_deref().unwrap_or_default(),
        state.as_deref().unwrap_or_default(),
    )
    .await
}

async fn complete(
    app: &AppState,
    cookies: &CookieJar<'_>,
    code: &str,
    state: &str,
) -> Result<Json<Profile>, ApiError> {
    let result = app.accounts.finish_auth(code, state).await?;
    cookies.add(app.cookies.session_cookie(result.token));
    Ok(Json(result.profile))
}

/// Revoke the presented session and clear the cookie.
///
/// A missing, expired or otherwise unusable token still clears the cookie.
#[post("/auth/logout")]
pub async fn logout(
    app: &State<AppState>,
    cookies: &CookieJar<'_>,
    token: SessionToken,
) -> Result<Status, ApiError> {
    if let Some(token) = token.0 {
        match app.accounts.logout(&token).await {
            Ok(()) => {}
            Err(e) if e.is(ErrorKind::Unauthenticated) => {
                debug!("Logout with unusable token: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    cookies.remove(app.cookies.removal_cookie());
    Ok(Status::NoContent)
}

/// Profile of the signed-in user.
#[get("/profile")]
pub async fn profile(app: &State<AppState>, user: SessionUser) -> Result<Json<Profile>, ApiError> {
    let profile = app.accounts.get_profile(user.user.id).await?;
    Ok(Json(profile))
}

#[get("/healthz")]
pub fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// # Answers to OPTIONS requests
#[options("/<_path..>")]
pub fn preflight(_path: PathBuf) -> Status {
    Status::NoContent
}

fn error_body(status: Status, message: &str) -> Json<Value> {
    Json(json!({ "error": status.reason_lossy().to_lowercase().replace(' ', "_"), "message": message }))
}

#[catch(401)]
pub fn unauthorized(_request: &Request<'_>) -> Json<Value> {
    Json(json!({ "error": ErrorKind::Unauthenticated.code(), "message": "authentication required" }))
}

#[catch(404)]
pub fn not_found(request: &Request<'_>) -> Json<Value> {
    error_body(Status::NotFound, &format!("no route for {}", request.uri()))
}

#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request<'_>) -> Json<Value> {
    error_body(status, status.reason_lossy())
}
