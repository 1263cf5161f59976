#[actix_web::main]
async fn main() -> std::io::Result<()> {
    quote_document_server::run().await
}
