//! Queues command implementation.

use anyhow::Result;
use console::style;

use super::common::{GlobalOpts, limit, open_session, print_json};

/// Execute the queues command.
pub async fn execute(opts: &GlobalOpts, names: &[String]) -> Result<()> {
    let mut session = open_session(opts).await?;
    let queues = session.queue_info(names).await?;

    if opts.json {
        return print_json(&queues);
    }

    println!(
        "{:<12}  {:>4}  {:<14}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
        style("QUEUE_NAME").bold(),
        style("PRIO").bold(),
        style("STATUS").bold(),
        style("MAX").bold(),
        style("JL/U").bold(),
        style("NJOBS").bold(),
        style("PEND").bold(),
        style("RUN").bold(),
        style("SUSP").bold()
    );

    for queue in &queues {
        let label = queue.status_label();
        let status = if queue.is_open() && queue.is_active() {
            style(label).green()
        } else if queue.is_open() {
            style(label).yellow()
        } else {
            style(label).red()
        };
        println!(
            "{:<12}  {:>4}  {:<14}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
            queue.queue,
            queue.priority,
            status,
            limit(queue.max_jobs),
            limit(queue.user_job_limit),
            queue.num_jobs,
            queue.num_pend,
            queue.num_run,
            queue.num_ssusp + queue.num_ususp
        );
    }

    Ok(())
}
