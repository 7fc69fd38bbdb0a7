//! Peek command implementation.

use anyhow::{Context, Result};
use console::style;

use lava_client::format_job_id;

use super::common::{GlobalOpts, open_session, print_json};

/// Execute the peek command: print where a running job's output is buffered.
pub async fn execute(opts: &GlobalOpts, job_id: i64) -> Result<()> {
    let mut session = open_session(opts).await?;
    let path = session
        .peek_job(job_id)
        .await
        .with_context(|| format!("Cannot peek at job {}", format_job_id(job_id)))?;

    if opts.json {
        return print_json(&serde_json::json!({ "job_id": job_id, "path": path }));
    }

    println!(
        "{} Output of job {} is buffered in {}",
        style("→").cyan().bold(),
        style(format_job_id(job_id)).bold(),
        path
    );
    Ok(())
}
