use axum::{
    extract::{Extension, RawQuery},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use tracing::{error, instrument};
use url::form_urlencoded;

use crate::engine;

#[utoipa::path(
    get,
    path = "/wsapi/2.0/verify",
    params(
        ("id" = String, Query, description = "Numeric API key id"),
        ("otp" = String, Query, description = "44-symbol modhex token"),
        ("nonce" = String, Query, description = "Client-chosen echo string"),
        ("h" = Option<String>, Query, description = "Base64 HMAC-SHA1 request signature"),
    ),
    responses(
        (status = 200, description = "Validation outcome as CRLF-terminated key=value lines", content_type = "text/plain"),
        (status = 500, description = "Storage failure; no validation outcome")
    ),
    tag = "verify"
)]
// axum handler for OTP verification
#[instrument(skip_all)]
pub async fn verify(pool: Extension<PgPool>, RawQuery(query): RawQuery) -> impl IntoResponse {
    let query = query.unwrap_or_default();
    let params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    match engine::validate(&pool, &params).await {
        Ok(reply) => (StatusCode::OK, reply.into_body()).into_response(),
        Err(error) => {
            // A validation outcome must never be guessed on storage failure.
            error!("validation aborted: {:#}", error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
