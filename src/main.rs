use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match report_simplifier::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("report-simplifier: {e}");
            ExitCode::FAILURE
        }
    }
}
