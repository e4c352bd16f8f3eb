mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;
mod utils;

use std::io;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};

use crate::config::{Backend, Settings};
use crate::db::{MemoryStore, PgStore, Store};
use crate::services::{DepartmentService, EmployeeService};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env().map_err(io::Error::other)?;

    match &settings.backend {
        Backend::Postgres { database_url } => {
            let store = PgStore::connect(database_url, settings.max_connections)
                .await
                .map_err(io::Error::other)?;
            store.migrate().await.map_err(io::Error::other)?;
            info!("Connected to the database, migrations applied");
            serve(store, &settings).await
        }
        Backend::Memory => {
            warn!("Using the in-memory store, data will be lost on shutdown");
            serve(MemoryStore::new(), &settings).await
        }
    }
}

async fn serve<S: Store>(store: S, settings: &Settings) -> io::Result<()> {
    let departments = web::Data::new(DepartmentService::new(store.clone()));
    let employees = web::Data::new(EmployeeService::new(store));
    let paging = web::Data::new(settings.paging);

    info!("Starting server at {}", settings.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(departments.clone())
            .app_data(employees.clone())
            .app_data(paging.clone())
            .configure(handlers::configure::<S>)
    })
    .bind(&settings.bind_address)?
    .run()
    .await
}
