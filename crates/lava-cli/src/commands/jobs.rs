//! Jobs command implementation.
//!
//! Walks a job cursor and prints one line per job, bjobs style.

use anyhow::Result;
use console::style;

use lava_client::reasons::{decode_suspend_reason, job_pending_reasons};
use lava_client::records::job_options;
use lava_client::{JobFilter, JobInfoEnt, JobState, LoadIndexLog, format_job_id};

use super::common::{GlobalOpts, open_session, print_json, short_time};

/// Turn command-line selections into a cursor filter.
pub fn build_filter(
    job_id: Option<i64>,
    user: Option<String>,
    queue: Option<String>,
    host: Option<String>,
    all: bool,
) -> JobFilter {
    if let Some(id) = job_id {
        return JobFilter::by_id(id);
    }
    JobFilter {
        job_id: None,
        user,
        queue,
        host,
        options: if all {
            job_options::ALL_JOB
        } else {
            job_options::CUR_JOB
        },
    }
}

/// Execute the jobs command.
pub async fn execute(opts: &GlobalOpts, filter: &JobFilter, long: bool) -> Result<()> {
    let mut session = open_session(opts).await?;

    let count = session.open_jobs(filter).await?;
    let mut jobs = Vec::with_capacity(count);
    while let Some(job) = session.read_job().await? {
        jobs.push(job);
    }
    session.close_jobs().await?;

    if opts.json {
        return print_json(&jobs);
    }

    if jobs.is_empty() {
        match filter.job_id {
            Some(id) => println!("Job <{}> is not found", format_job_id(id)),
            None if filter.options & job_options::ALL_JOB != 0 => println!("No job found"),
            None => println!("No unfinished job found"),
        }
        return Ok(());
    }

    println!(
        "{:<10}  {:<10}  {:<6}  {:<10}  {:<12}  {:<16}  {:<16}  {}",
        style("JOBID").bold(),
        style("USER").bold(),
        style("STAT").bold(),
        style("QUEUE").bold(),
        style("FROM_HOST").bold(),
        style("EXEC_HOST").bold(),
        style("JOB_NAME").bold(),
        style("SUBMIT_TIME").bold()
    );

    let load = LoadIndexLog::default();
    for job in &jobs {
        print_job(job);
        if long {
            for line in reason_lines(job, &load) {
                println!("    {}", style(line).dim());
            }
        }
    }

    Ok(())
}

fn print_job(job: &JobInfoEnt) {
    let state = job.state();
    let stat = match state {
        JobState::Run => style(state.name()).green(),
        JobState::Done => style(state.name()).cyan(),
        JobState::Exit => style(state.name()).red(),
        JobState::Pend | JobState::Wait => style(state.name()).yellow(),
        _ => style(state.name()).magenta(),
    };
    let exec_host = match job.ex_hosts.first() {
        Some(first) if job.ex_hosts.len() > 1 => format!("{}*{first}", job.ex_hosts.len()),
        Some(first) => first.clone(),
        None => String::new(),
    };
    let name = if job.j_name.is_empty() {
        &job.submit.command
    } else {
        &job.j_name
    };

    println!(
        "{:<10}  {:<10}  {:<6}  {:<10}  {:<12}  {:<16}  {:<16}  {}",
        format_job_id(job.job_id),
        job.user,
        stat,
        job.queue(),
        job.from_host,
        exec_host,
        truncate(name, 16),
        short_time(&job.submit_time)
    );
}

/// Pending or suspension reasons for `--long` output.
fn reason_lines(job: &JobInfoEnt, load: &LoadIndexLog) -> Vec<String> {
    let state = job.state();
    if state == JobState::Pend || state == JobState::Psusp {
        job_pending_reasons(job, load)
    } else if state.is_suspended() {
        vec![decode_suspend_reason(job.reasons, job.subreasons, load)]
    } else {
        Vec::new()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('*');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_id_ignores_other_flags() {
        let filter = build_filter(Some(7), Some("bob".into()), None, None, false);
        assert_eq!(filter, JobFilter::by_id(7));
    }

    #[test]
    fn test_filter_defaults_to_unfinished_jobs() {
        let filter = build_filter(None, Some("alice".into()), Some("normal".into()), None, false);
        assert_eq!(filter.options, job_options::CUR_JOB);
        assert_eq!(filter.user.as_deref(), Some("alice"));
        assert_eq!(filter.queue.as_deref(), Some("normal"));

        let filter = build_filter(None, None, None, None, true);
        assert_eq!(filter.options, job_options::ALL_JOB);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("a-very-long-job-name", 8), "a-very-*");
    }

    #[tokio::test]
    async fn test_pending_job_reasons_from_sim() {
        let opts = GlobalOpts {
            sim: true,
            ..GlobalOpts::default()
        };
        let mut session = open_session(&opts).await.unwrap();
        let jobs = session.jobs(&JobFilter::by_user("bob")).await.unwrap();
        let lines = reason_lines(&jobs[0], &LoadIndexLog::default());
        assert_eq!(lines, vec!["Not enough job slots: 2 hosts"]);
    }
}
