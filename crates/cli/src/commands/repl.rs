use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use futures_util::StreamExt;
use nbsim_core::constants::REPL_ARTIFACT_BASE;
use nbsim_core::ArtifactKey;
use nbsim_llm::Conversation;
use nbsim_service::{Converter, ConverterKind, NotebookWriter};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::build_llm;

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "$ ")?;
    stdout.flush()?;
    Ok(())
}

pub(crate) async fn run(gen_dir: PathBuf, model: Option<String>, converter: &str) -> Result<()> {
    let kind: ConverterKind = converter.parse().map_err(anyhow::Error::msg)?;
    let converter = Converter::new(kind);
    let llm = build_llm(model)?;
    tokio::fs::create_dir_all(&gen_dir).await?;

    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut writer =
            NotebookWriter::new(&gen_dir, ArtifactKey::from_base(REPL_ARTIFACT_BASE));
        let mut chunks = llm.stream_chat(&conversation.request_for(input)).await?;
        let mut reply = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            print!(".");
            std::io::stdout().flush()?;
            writer.add_part(&chunk).await?;
            reply.push_str(&chunk);
        }
        println!();

        writer.finish().await?;
        match converter.convert_file(&writer.notebook_path()).await {
            Ok(html) => tracing::info!(html = %html.display(), "notebook updated"),
            Err(e) => tracing::warn!(error = %e, "conversion failed"),
        }
        conversation.record(input, &reply);
    }
    Ok(())
}
