use actix_web::{web, HttpResponse, Result};
use crate::models::ApiResponse;

pub async fn health_check() -> Result<HttpResponse> {
    let response = ApiResponse::success("Service is healthy");
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App};

    #[actix_web::test]
    async fn test_health_check() {
        let app = actix_test::init_service(App::new().configure(config)).await;
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], "Service is healthy");
    }
}
