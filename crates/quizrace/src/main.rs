use quizrace::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), QuizraceError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut builder = QuizraceServer::builder();
    if let Ok(addr) = std::env::var("QUIZRACE_ADDR") {
        builder = builder.bind(&addr);
    }
    if let Ok(path) = std::env::var("QUIZRACE_QUESTIONS") {
        let data = tokio::fs::read(&path).await?;
        let bank = QuestionBank::from_json(&data)?;
        tracing::info!(%path, questions = bank.len(), "loaded question file");
        builder = builder.questions(bank);
    }

    let server = builder.build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await
}
