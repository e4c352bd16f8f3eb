use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::config::PagingConfig;
use crate::db::Store;
use crate::errors::AppError;
use crate::models::employee;
use crate::services::EmployeeService;
use crate::utils::pagination::PageParams;
use crate::utils::validation::{not_blank, validate_payload};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    id: Option<i64>,
    #[validate(length(max = 255), custom = "not_blank")]
    first_name: String,
    #[validate(length(max = 255), custom = "not_blank")]
    last_name: String,
    department_id: Option<i64>,
}

pub async fn get_employees<S: Store>(
    service: web::Data<EmployeeService<S>>,
) -> Result<HttpResponse, AppError> {
    let employees = service.list_all().await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employees_paginated<S: Store>(
    req: HttpRequest,
    service: web::Data<EmployeeService<S>>,
    paging: web::Data<PagingConfig>,
) -> Result<HttpResponse, AppError> {
    let request = PageParams::parse(req.query_string())
        .into_request(employee::SORTABLE, &paging)?;
    let page = service.list_page(&request).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_employee<S: Store>(
    service: web::Data<EmployeeService<S>>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee = service.get_by_id(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// The department comes from the path; a `departmentId` in the body is
/// ignored.
pub async fn create_employee<S: Store>(
    service: web::Data<EmployeeService<S>>,
    department_id: web::Path<i64>,
    new_employee: web::Json<EmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*new_employee)?;

    let employee = service
        .create(
            department_id.into_inner(),
            new_employee.first_name.trim(),
            new_employee.last_name.trim(),
        )
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

pub async fn update_employee<S: Store>(
    service: web::Data<EmployeeService<S>>,
    updates: web::Json<EmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*updates)?;
    let id = updates
        .id
        .ok_or_else(|| AppError::BadRequest("employee id is required".to_owned()))?;
    let department_id = updates
        .department_id
        .ok_or_else(|| AppError::BadRequest("department id is required".to_owned()))?;

    let employee = service
        .update(
            id,
            updates.first_name.trim(),
            updates.last_name.trim(),
            department_id,
        )
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee<S: Store>(
    service: web::Data<EmployeeService<S>>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    service.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": true })))
}
