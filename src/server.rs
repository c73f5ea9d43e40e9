//! HTTP transport for the mock engine.
//!
//! Every method and path is routed to one handler that runs the engine on a blocking
//! worker and maps the outcome onto a status line and body.

use crate::engine::{MockEngine, MockResponse};
use crate::error::{Error, ErrorKind};
use actix_web::dev::Server;
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use log::{debug, error};
use std::net::TcpListener;

/// Handles any request by sampling the matching operation of the API document.
pub async fn mock_handler(req: HttpRequest, engine: web::Data<MockEngine>) -> HttpResponse {
    let method = req.method().as_str().to_lowercase();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string());
    debug!("Mocking {} {}", method, path);

    let engine = engine.into_inner();
    match web::block(move || engine.respond(&method, &path)).await {
        Ok(Ok(response)) => success_response(response),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("Mock worker failed: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

fn success_response(response: MockResponse) -> HttpResponse {
    let Ok(status) = StatusCode::from_u16(response.status) else {
        return HttpResponse::InternalServerError()
            .body(format!("Invalid status code: {}", response.status));
    };
    if status == StatusCode::NO_CONTENT {
        return HttpResponse::build(status).finish();
    }
    HttpResponse::build(status).json(response.body)
}

fn error_response(err: &Error) -> HttpResponse {
    match err.kind() {
        ErrorKind::NotFound => {
            debug!("{}", err);
            HttpResponse::NotFound().body(err.to_string())
        }
        ErrorKind::Internal => {
            error!("{}", err);
            HttpResponse::InternalServerError().body(err.to_string())
        }
    }
}

/// Builds the server on an already bound listener.
pub fn build_server(listener: TcpListener, engine: MockEngine) -> std::io::Result<Server> {
    let engine = web::Data::new(engine);
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(engine.clone())
            .default_service(web::to(mock_handler))
    })
    .listen(listener)?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryLoader;
    use crate::engine::{DocumentSource, EngineConfig};
    use actix_web::{body::to_bytes, test};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    const USERS: &str = r##"
openapi: 3.0.0
paths:
  /users/list:
    get:
      responses:
        200:
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/User'
  /users/{id}:
    delete:
      responses:
        204:
          description: deleted
    patch:
      responses:
        200:
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Missing/deeper#/x'
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
        email:
          type: string
          format: email
"##;

    fn engine() -> MockEngine {
        let mut loader = MemoryLoader::new();
        loader.insert_yaml("/apidoc/users.yaml", USERS).unwrap();
        MockEngine::with_loader(
            EngineConfig::new(DocumentSource::Root(PathBuf::from("/apidoc"))),
            Box::new(loader),
        )
    }

    #[actix_web::test]
    async fn test_json_body() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine()))
                .default_service(web::to(mock_handler)),
        )
        .await;
        let req = test::TestRequest::get().uri("/users/list?page=2").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([{"id": 0, "email": "user@example.com"}]));
    }

    #[actix_web::test]
    async fn test_no_content() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine()))
                .default_service(web::to(mock_handler)),
        )
        .await;
        let req = test::TestRequest::delete().uri("/users/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[actix_web::test]
    async fn test_not_found_lists_endpoints() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine()))
                .default_service(web::to(mock_handler)),
        )
        .await;
        let req = test::TestRequest::post().uri("/users/list").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("GET /users/list"));
        assert!(text.contains("DELETE /users/{id}"));
        assert!(text.contains("PATCH /users/{id}"));
    }

    #[actix_web::test]
    async fn test_resolution_failure_is_internal_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine()))
                .default_service(web::to(mock_handler)),
        )
        .await;
        let req = test::TestRequest::patch().uri("/users/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("Malformed $ref"));
    }

    #[actix_web::test]
    async fn test_success_response_rejects_invalid_status() {
        let resp = success_response(MockResponse {
            status: 1000,
            body: json!({}),
        });
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, "Invalid status code: 1000");
    }

    #[actix_web::test]
    async fn test_build_server_start_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = build_server(listener, engine()).unwrap();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        handle.stop(true).await;
    }
}
