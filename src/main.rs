pub mod error;
pub mod models;
pub mod pipeline;
pub mod routes;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{error, info};

use pipeline::Pipeline;

const DEFAULT_MODEL_PATH: &str = "model/credit_default_pipeline.json";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let model_path =
        std::env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());

    // A service without a pipeline is useless; refuse to start.
    let pipeline = match Pipeline::load(&model_path) {
        Ok(pipeline) => {
            info!("loaded pipeline artifact from {}", model_path);
            pipeline
        }
        Err(e) => {
            error!("failed to load pipeline artifact: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline_data = web::Data::new(pipeline);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let workers = std::env::var("WORKERS")
        .ok()
        .and_then(|w| w.parse().ok())
        .unwrap_or_else(num_cpus::get);

    let bind_address = format!("{}:{}", host, port);
    info!("serving on http://{}", bind_address);
    info!("endpoints:");
    info!("  GET  /         - landing page");
    info!("  GET  /predict  - schema documentation");
    info!("  POST /predict  - prediction (object or array of objects)");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(pipeline_data.clone())
            .app_data(web::JsonConfig::default().limit(1024 * 1024))
            .service(routes::home)
            .service(routes::predict_info)
            .service(routes::predict)
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await
}
