//! Public landing handler.

use crate::models::{HomeResponse, HOME_MESSAGE};
use axum::Json;

/// Handler for GET /
///
/// Always 200, never consults the issuer.
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: HOME_MESSAGE,
    })
}
