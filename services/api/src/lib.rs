mod cli;
mod console;
mod infra;
mod routes;
mod server;

use tower_staffing::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
