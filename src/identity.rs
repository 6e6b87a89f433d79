//! Trusted request identity.
//!
//! Authentication itself lives upstream (session service / reverse proxy);
//! by the time a request reaches this server its identity headers are
//! trusted. The extractor upserts the user record so display names stay
//! current without a separate registration call.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::Error;
use crate::rooms::DecisionService;
use crate::types::User;

const USER_ID_HEADER: &str = "x-user-id";
const DISPLAY_NAME_HEADER: &str = "x-display-name";

/// The authenticated user behind the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<DecisionService>> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<DecisionService>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::Unauthenticated(format!("missing {} header", USER_ID_HEADER))
            })?
            .to_string();

        let display_name = parts
            .headers
            .get(DISPLAY_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let user = state.store().upsert_user(&user_id, display_name).await;
        Ok(CurrentUser(user))
    }
}
