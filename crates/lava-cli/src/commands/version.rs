//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - client for openlava-style batch schedulers",
        style("Lava").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  lava-client       Protocol, records and session API");
    println!("  lava-adapter-sim  Simulated scheduler master");
    println!("  lava-cli          Command-line interface");
    println!();
    println!(
        "Protocol version: {}",
        style(lava_client::protocol::PROTOCOL_VERSION).dim()
    );
}
