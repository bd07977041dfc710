use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use nbsim_core::constants::DEFAULT_CONVERT_INTERVAL_SECS;
use nbsim_core::env_duration_secs;
use nbsim_http::{create_router, AppState};
use nbsim_service::{Converter, ConverterKind, GenerationService, GenerationSettings};

use crate::build_llm;

pub(crate) async fn run(
    port: u16,
    host: String,
    gen_dir: PathBuf,
    model: Option<String>,
    converter: &str,
    origin: String,
) -> Result<()> {
    let kind: ConverterKind = converter.parse().map_err(anyhow::Error::msg)?;
    let llm = Arc::new(build_llm(model)?);
    tracing::info!(model = %llm.model(), base_url = %llm.base_url(), "using model");

    tokio::fs::create_dir_all(&gen_dir).await?;
    let settings = GenerationSettings {
        gen_dir,
        convert_interval: env_duration_secs(
            "NBSIM_CONVERT_INTERVAL_SECS",
            DEFAULT_CONVERT_INTERVAL_SECS,
        ),
    };
    let service = Arc::new(GenerationService::new(llm, Arc::new(Converter::new(kind)), settings));
    let state = Arc::new(AppState::new(service).with_origin(origin));

    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
