use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod queue;
pub mod quote;
pub mod render;
pub mod state;
pub mod storage;

pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::quote::handlers::generate_mbi_quote,
            crate::quote::handlers::health
        ),
        components(
            schemas(
                quote::models::QuoteRecord,
                quote::handlers::MissingFieldsResponse,
                quote::handlers::HealthResponse,
                storage::StoredObject,
                ErrorResponse,
            )
        ),
        tags(
            (name = "Document Generation", description = "Quote PDF generation endpoints."),
            (name = "Health", description = "Liveness reporting.")
        )
    )]
    struct ApiDoc;

    let app_config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration. Check AWS_REGION, S3_BUCKET_NAME and SQS_QUEUE_URL in .env. Error: {e}");
            std::process::exit(1);
        }
    };

    let renderer = match render::HtmlPrintEngine::new(
        &app_config.template_dir,
        &app_config.browser_bin,
    ) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            log::error!(
                "Failed to load quote template from {:?}: {e}",
                app_config.template_dir
            );
            std::process::exit(1);
        }
    };

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(app_config.aws_region.clone()))
        .load()
        .await;

    let storage: Arc<dyn storage::ObjectStorage + Send + Sync> =
        Arc::new(storage::S3QuoteStorage::new(
            aws_sdk_s3::Client::new(&aws_config),
            app_config.bucket.clone(),
            app_config.aws_region.clone(),
        ));
    let queue_client: Arc<dyn queue::QueueClient + Send + Sync> =
        Arc::new(queue::SqsQueueClient::new(
            aws_sdk_sqs::Client::new(&aws_config),
            app_config.queue_url.clone(),
        ));

    let consumer = queue::QuoteConsumer::new(
        queue_client,
        renderer.clone(),
        storage,
        app_config.consumer.clone(),
    );
    consumer.start();
    log::info!("Quote consumer started for queue: {}", app_config.queue_url);

    let app_state = web::Data::new(AppState {
        renderer,
        consumer: consumer.clone(),
    });

    let prometheus = PrometheusMetricsBuilder::new("quote_document_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    let port = app_config.port;
    log::info!("Starting server at http://0.0.0.0:{port}");

    let server = HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(
                web::resource("/generate/mbi-quote")
                    .route(web::post().to(quote::handlers::generate_mbi_quote)),
            )
            .service(web::resource("/health").route(web::get().to(quote::handlers::health)))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    // Cooperative shutdown: the in-flight batch finishes, the next poll never
    // starts.
    consumer.stop();
    server
}
