mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use feasibility_screening::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
