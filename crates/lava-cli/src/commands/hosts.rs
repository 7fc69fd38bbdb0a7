//! Hosts command implementation.
//!
//! Batch status per host by default, static configuration with `--info`.

use anyhow::Result;
use console::style;

use lava_client::{HostInfo, HostInfoEnt, HostState};

use super::common::{GlobalOpts, limit, open_session, print_json};

/// Execute the hosts command.
pub async fn execute(opts: &GlobalOpts, names: &[String], info: bool) -> Result<()> {
    let mut session = open_session(opts).await?;

    if info {
        let hosts = session.host_info(names).await?;
        if opts.json {
            return print_json(&hosts);
        }
        print_static(&hosts);
    } else {
        let hosts = session.host_runtime_info(names).await?;
        if opts.json {
            return print_json(&hosts);
        }
        print_runtime(&hosts);
    }
    Ok(())
}

fn print_runtime(hosts: &[HostInfoEnt]) {
    println!(
        "{:<16}  {:<12}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
        style("HOST_NAME").bold(),
        style("STATUS").bold(),
        style("JL/U").bold(),
        style("MAX").bold(),
        style("NJOBS").bold(),
        style("RUN").bold(),
        style("SSUSP").bold(),
        style("USUSP").bold(),
        style("RSV").bold()
    );

    for host in hosts {
        let status = host.status.to_string();
        let status = match host.status.state() {
            HostState::Ok => style(status).green(),
            HostState::Closed => style(status).yellow(),
            HostState::Unreachable | HostState::Unavailable => style(status).red(),
        };
        println!(
            "{:<16}  {:<12}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}",
            host.host,
            status,
            limit(host.user_job_limit),
            limit(host.max_jobs),
            host.num_jobs,
            host.num_run,
            host.num_ssusp,
            host.num_ususp,
            host.num_reserve
        );
    }
}

fn print_static(hosts: &[HostInfo]) {
    println!(
        "{:<16}  {:<8}  {:<12}  {:>5}  {:>5}  {:>7}  {:>7}  {:<6}  {}",
        style("HOST_NAME").bold(),
        style("TYPE").bold(),
        style("MODEL").bold(),
        style("CPUF").bold(),
        style("NCPUS").bold(),
        style("MAXMEM").bold(),
        style("MAXSWP").bold(),
        style("SERVER").bold(),
        style("RESOURCES").bold()
    );

    for host in hosts {
        let resources: Vec<&str> = host.resources.iter().map(|r| r.name.as_str()).collect();
        println!(
            "{:<16}  {:<8}  {:<12}  {:>5.1}  {:>5}  {:>7}  {:>7}  {:<6}  ({})",
            host.host_name,
            host.host_type,
            host.host_model,
            host.cpu_factor,
            limit(host.max_cpus),
            megabytes(host.max_mem),
            megabytes(host.max_swap),
            if host.is_server { "Yes" } else { "No" },
            resources.join(" ")
        );
    }
}

fn megabytes(value: i32) -> String {
    if value > 0 {
        format!("{value}M")
    } else {
        "-".to_string()
    }
}
