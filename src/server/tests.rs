//! Tests for server building blocks

use crate::server::middleware::{REQUEST_ID_HEADER, RequestIdMiddleware};
use crate::server::routes::{ActorRequest, ApiResponse};
use actix_web::test as actix_test;
use actix_web::{App, HttpResponse, web};

#[test]
fn test_api_response_omits_empty_meta() {
    let body = serde_json::to_value(ApiResponse::success(vec!["database"])).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0], "database");
    assert!(body.get("meta").is_none());
}

#[test]
fn test_actor_defaults_to_operator() {
    assert_eq!(ActorRequest::actor(None), "operator");

    let blank = web::Json(ActorRequest { by: "  ".to_string() });
    assert_eq!(ActorRequest::actor(Some(blank)), "operator");

    let named = web::Json(ActorRequest { by: "oncall".to_string() });
    assert_eq!(ActorRequest::actor(Some(named)), "oncall");
}

#[actix_web::test]
async fn test_request_id_is_generated_and_echoed() {
    let app = actix_test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .route("/", web::get().to(HttpResponse::Ok)),
    )
    .await;

    let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
    let generated = res.headers().get(REQUEST_ID_HEADER).unwrap();
    assert_eq!(generated.len(), 36);

    let req = actix_test::TestRequest::get()
        .uri("/")
        .insert_header((REQUEST_ID_HEADER, "trace-42"))
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-42");
}
