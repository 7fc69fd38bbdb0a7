//! Users command implementation.

use anyhow::Result;
use console::style;

use super::common::{GlobalOpts, open_session, print_json};

/// Execute the users command.
pub async fn execute(opts: &GlobalOpts, names: &[String]) -> Result<()> {
    let mut session = open_session(opts).await?;
    let users = session.user_info(names).await?;

    if opts.json {
        return print_json(&users);
    }

    println!(
        "{:<16}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
        style("USER").bold(),
        style("MAX").bold(),
        style("NJOBS").bold(),
        style("PEND").bold(),
        style("RUN").bold(),
        style("SSUSP").bold(),
        style("USUSP").bold(),
        style("RSV").bold()
    );

    for user in &users {
        let max = user
            .job_limit()
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{:<16}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
            user.user,
            max,
            user.num_jobs,
            user.num_pend,
            user.num_run,
            user.num_ssusp,
            user.num_ususp,
            user.num_reserve
        );
    }

    Ok(())
}
