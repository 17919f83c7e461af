mod calculate;
mod cli;
mod infra;
mod routes;
mod server;

use maxjungsi::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
