use anyhow::anyhow;
use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID}, users, AppResult, AppState};

use super::{clients::ClientProvider, Clients};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or(anyhow!("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or(anyhow!("OAuth: without code"))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(anyhow!("no csrf_state").into());
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(anyhow!("csrf tokens don't match").into());
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(anyhow!("no pkce_verifier").into());
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: serde_json::Value = http_client.get(provider.userinfo_url())
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, env!("CARGO_PKG_NAME"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let new_user = provider.new_user(&body)?;
    let external_id = new_user.external_id.clone().unwrap_or_default();
    let user = match users::find_by_external_id(&db_pool, &external_id).await? {
        Some(user) => user,
        None => users::create_user(&db_pool, new_user).await?,
    };

    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    tracing::info!(user_id = %user.id, %provider, "welcome {} {}", user.first_name, user.last_name);

    let return_url: String = session.remove(RETURN_URL).await?.unwrap_or("/users/me".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
