//! Binary entrypoint for the axent tool

#[tokio::main]
async fn main() {
    if let Err(e) = axent::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
