use anyhow::{Context, Result};

use govnews::context::AppContext;
use govnews::sources::gemini;

pub async fn ask(ctx: &AppContext, prompt: &str) -> Result<()> {
    let answer = gemini::chat(ctx, &[], prompt)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Generative-AI request failed")?;

    println!("{answer}");
    Ok(())
}
