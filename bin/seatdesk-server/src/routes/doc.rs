use utoipa::OpenApi;

use crate::routes::{auth, console, health};

#[derive(OpenApi)]
#[openapi(info(
    title = "seatdesk-server",
    description = "Console API for renewable seat records",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(auth::AuthApi::openapi());
    root.merge(console::api_docs());
    root
}
