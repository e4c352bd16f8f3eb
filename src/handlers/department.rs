use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::config::PagingConfig;
use crate::db::Store;
use crate::errors::AppError;
use crate::models::department;
use crate::services::DepartmentService;
use crate::utils::pagination::PageParams;
use crate::utils::validation::{not_blank, validate_payload};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRequest {
    id: Option<i64>,
    #[validate(length(max = 255), custom = "not_blank")]
    name: String,
}

pub async fn get_departments<S: Store>(
    service: web::Data<DepartmentService<S>>,
) -> Result<HttpResponse, AppError> {
    let departments = service.list_all().await?;
    Ok(HttpResponse::Ok().json(departments))
}

pub async fn get_departments_paginated<S: Store>(
    req: HttpRequest,
    service: web::Data<DepartmentService<S>>,
    paging: web::Data<PagingConfig>,
) -> Result<HttpResponse, AppError> {
    let request = PageParams::parse(req.query_string())
        .into_request(department::SORTABLE, &paging)?;
    let page = service.list_page(&request).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_department<S: Store>(
    service: web::Data<DepartmentService<S>>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department = service.get_by_id(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn create_department<S: Store>(
    service: web::Data<DepartmentService<S>>,
    new_department: web::Json<DepartmentRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*new_department)?;

    let department = service.create(new_department.name.trim()).await?;
    Ok(HttpResponse::Created().json(department))
}

pub async fn update_department<S: Store>(
    service: web::Data<DepartmentService<S>>,
    updates: web::Json<DepartmentRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*updates)?;
    let id = updates
        .id
        .ok_or_else(|| AppError::BadRequest("department id is required".to_owned()))?;

    let department = service.update(id, updates.name.trim()).await?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn delete_department<S: Store>(
    service: web::Data<DepartmentService<S>>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    service.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::db::MemoryStore;
    use crate::handlers::testing::app;

    #[actix_web::test]
    async fn create_then_get() {
        let app = test::init_service(app(MemoryStore::new())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/departments")
            .set_json(json!({ "name": "Engineering" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "Engineering");
        assert_eq!(created["employees"], json!([]));

        let req = test::TestRequest::get().uri("/api/v1/departments/1").to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["name"], "Engineering");
    }

    #[actix_web::test]
    async fn duplicate_name_is_conflict() {
        let app = test::init_service(app(MemoryStore::new())).await;

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = test::TestRequest::post()
                .uri("/api/v1/departments")
                .set_json(json!({ "name": "Ops" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
    }

    #[actix_web::test]
    async fn blank_name_is_bad_request() {
        let app = test::init_service(app(MemoryStore::new())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/departments")
            .set_json(json!({ "name": "  " }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_body_and_path_are_bad_request() {
        let app = test::init_service(app(MemoryStore::new())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/departments")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"name\":")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/departments/abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_department_is_not_found() {
        let app = test::init_service(app(MemoryStore::new())).await;

        let req = test::TestRequest::get().uri("/api/v1/departments/5").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Department does not exist with ID: 5");

        let req = test::TestRequest::delete().uri("/api/v1/departments/5").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn update_uses_id_from_body() {
        let app = test::init_service(app(MemoryStore::new())).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/departments")
            .set_json(json!({ "name": "Engineering" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/api/v1/departments")
            .set_json(json!({ "id": 1, "name": "Research" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["id"], 1);
        assert_eq!(updated["name"], "Research");

        let req = test::TestRequest::put()
            .uri("/api/v1/departments")
            .set_json(json!({ "name": "Research" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/v1/departments")
            .set_json(json!({ "id": 8, "name": "Research" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn delete_acknowledges() {
        let app = test::init_service(app(MemoryStore::new())).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/departments")
            .set_json(json!({ "name": "Engineering" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::delete().uri("/api/v1/departments/1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "deleted": true }));

        let req = test::TestRequest::get().uri("/api/v1/departments").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed, json!([]));
    }

    #[actix_web::test]
    async fn paginated_listing() {
        let app = test::init_service(app(MemoryStore::new())).await;
        for name in ["Ops", "Finance", "Legal"] {
            let req = test::TestRequest::post()
                .uri("/api/v1/departments")
                .set_json(json!({ "name": name }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/departments/paginated?page=0&size=2&sort=name")
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["totalElements"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["content"][0]["name"], "Finance");
        assert_eq!(page["content"][1]["name"], "Legal");

        let req = test::TestRequest::get()
            .uri("/api/v1/departments/paginated?size=0")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/v1/departments/paginated?sort=budget")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
