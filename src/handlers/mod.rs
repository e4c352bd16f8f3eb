pub mod department;
pub mod employee;

use actix_web::web;

use crate::db::Store;
use crate::errors::AppError;

/// Registers every route under `/api/v1`. The services and the paging
/// configuration must already be in the app data.
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1")
            .service(
                web::resource("/departments")
                    .route(web::get().to(department::get_departments::<S>))
                    .route(web::post().to(department::create_department::<S>))
                    .route(web::put().to(department::update_department::<S>)),
            )
            .service(
                web::resource("/departments/paginated")
                    .route(web::get().to(department::get_departments_paginated::<S>)),
            )
            .service(
                web::resource("/departments/{id}")
                    .route(web::get().to(department::get_department::<S>))
                    .route(web::delete().to(department::delete_department::<S>)),
            )
            .service(
                web::resource("/departments/{department_id}/employees")
                    .route(web::post().to(employee::create_employee::<S>)),
            )
            .service(
                web::resource("/employees")
                    .route(web::get().to(employee::get_employees::<S>))
                    .route(web::put().to(employee::update_employee::<S>)),
            )
            .service(
                web::resource("/employees/paginated")
                    .route(web::get().to(employee::get_employees_paginated::<S>)),
            )
            .service(
                web::resource("/employees/{id}")
                    .route(web::get().to(employee::get_employee::<S>))
                    .route(web::delete().to(employee::delete_employee::<S>)),
            ),
    );
}
