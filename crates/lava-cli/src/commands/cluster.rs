//! Cluster command implementation.

use anyhow::Result;
use console::style;
use serde::Serialize;

use lava_client::LsInfo;

use super::common::{GlobalOpts, open_session, print_json};

#[derive(Serialize)]
struct ClusterSummary {
    cluster: String,
    master: String,
    info: LsInfo,
}

/// Execute the cluster command.
pub async fn execute(opts: &GlobalOpts) -> Result<()> {
    let mut session = open_session(opts).await?;

    let summary = ClusterSummary {
        cluster: session.cluster_name().await?,
        master: session.master_name().await?,
        info: session.static_info().await?,
    };

    if opts.json {
        return print_json(&summary);
    }

    println!("My cluster name is {}", style(&summary.cluster).cyan().bold());
    println!("My master name is {}", style(&summary.master).cyan().bold());
    println!();

    let info = &summary.info;
    println!("{}", style("Host types:").bold());
    println!("  {}", info.host_types.join("  "));
    println!();

    println!("{}", style("Host models:").bold());
    println!("  {:<16}  {}", style("MODEL").bold(), style("CPU FACTOR").bold());
    for (model, factor) in info.host_models.iter().zip(&info.cpu_factor) {
        println!("  {model:<16}  {factor:.1}");
    }
    println!();

    println!("{} {}", style("Resources:").bold(), info.n_res());
    println!(
        "  {:<12}  {:<12}  {:<10}  {}",
        style("NAME").bold(),
        style("TYPE").bold(),
        style("ORDER").bold(),
        style("DESCRIPTION").bold()
    );
    for res in &info.res_table {
        println!(
            "  {:<12}  {:<12}  {:<10}  {}",
            res.name,
            res.value_type.symbol(),
            res.order_type.symbol(),
            style(&res.description).dim()
        );
    }

    Ok(())
}
