use hemmer_provider_readme::{init_logging, serve, ReadmeProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ReadMe provider");
    serve(ReadmeProvider::new()).await
}
