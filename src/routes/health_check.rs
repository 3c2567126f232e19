use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Liveness probe for the hosting platform; never touches the store or the
/// verifier.
///
/// Note: viewing http response requires `curl -v`
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
