//! Lava Command-Line Interface
//!
//! Query and submit to an openlava-style scheduler master.
//!
//! ```text
//! lava hosts                 # per-host batch status
//! lava jobs -u alice -a      # alice's jobs, finished ones included
//! lava submit -q normal -n 2 -- ./solver --input mesh.dat
//! lava --sim --json queues   # against the built-in simulator, as JSON
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::GlobalOpts;
use commands::{cluster, events, hosts, jobs, peek, queues, submit, users, version};

/// Lava - client for openlava-style batch schedulers
#[derive(Parser)]
#[command(name = "lava")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Console, global = true)]
    log_format: LogFormat,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Talk to the built-in simulated master instead of a real one
    #[arg(long, global = true)]
    sim: bool,

    /// Configuration file (defaults to ~/.lava/config.yaml)
    #[arg(short, long, env = "LAVA_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Console,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cluster name, master host and static cluster information
    Cluster,

    /// Show hosts
    Hosts {
        /// Host names (all hosts if omitted)
        names: Vec<String>,

        /// Static host configuration instead of batch status
        #[arg(short, long)]
        info: bool,
    },

    /// Show queues
    Queues {
        /// Queue names (all queues if omitted)
        names: Vec<String>,
    },

    /// Show users
    Users {
        /// User names (all users if omitted)
        names: Vec<String>,
    },

    /// List jobs
    Jobs {
        /// A single job ID
        job_id: Option<i64>,

        /// Only jobs of this user ("all" for every user)
        #[arg(short, long)]
        user: Option<String>,

        /// Only jobs in this queue
        #[arg(short, long)]
        queue: Option<String>,

        /// Only jobs running on this host
        #[arg(short = 'm', long)]
        host: Option<String>,

        /// Include finished jobs
        #[arg(short, long)]
        all: bool,

        /// Show pending and suspension reasons
        #[arg(short, long)]
        long: bool,
    },

    /// Submit a job
    Submit {
        /// Command line to run
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,

        /// Submission template (YAML or JSON) that flags are applied on top of
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Queue
        #[arg(short, long)]
        queue: Option<String>,

        /// Job name
        #[arg(short = 'J', long)]
        name: Option<String>,

        /// Processors, as MIN or MIN,MAX
        #[arg(short = 'n', long)]
        processors: Option<String>,

        /// Candidate hosts (repeatable)
        #[arg(short = 'm', long = "host")]
        hosts: Vec<String>,

        /// Resource requirement string
        #[arg(short = 'R', long)]
        res_req: Option<String>,

        /// Standard input file
        #[arg(short, long)]
        input: Option<String>,

        /// Standard output file
        #[arg(short, long)]
        output: Option<String>,

        /// Standard error file
        #[arg(short, long)]
        error: Option<String>,

        /// Project name
        #[arg(short = 'P', long)]
        project: Option<String>,

        /// Dependency condition
        #[arg(short = 'w', long)]
        depend: Option<String>,

        /// Run exclusively on its hosts
        #[arg(short = 'x', long)]
        exclusive: bool,

        /// Submit held
        #[arg(short = 'H', long)]
        hold: bool,
    },

    /// Show the output file of a running job
    Peek {
        /// Job ID
        job_id: i64,
    },

    /// Read the scheduler event log
    Events {
        /// Event log file (defaults to lsb.events of the installation)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Only events of this job
        #[arg(short, long)]
        job: Option<i64>,

        /// Only events of this type (e.g. JOB_NEW)
        #[arg(short = 't', long = "type")]
        event_type: Option<String>,
    },

    /// Show version information
    Version,
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Console => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let opts = GlobalOpts {
        config: cli.config,
        sim: cli.sim,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Cluster => cluster::execute(&opts).await,

        Commands::Hosts { names, info } => hosts::execute(&opts, &names, info).await,

        Commands::Queues { names } => queues::execute(&opts, &names).await,

        Commands::Users { names } => users::execute(&opts, &names).await,

        Commands::Jobs {
            job_id,
            user,
            queue,
            host,
            all,
            long,
        } => {
            let filter = jobs::build_filter(job_id, user, queue, host, all);
            jobs::execute(&opts, &filter, long).await
        }

        Commands::Submit {
            command,
            template,
            queue,
            name,
            processors,
            hosts,
            res_req,
            input,
            output,
            error,
            project,
            depend,
            exclusive,
            hold,
        } => {
            let args = submit::SubmitArgs {
                command,
                template,
                queue,
                name,
                processors,
                hosts,
                res_req,
                input,
                output,
                error,
                project,
                depend,
                exclusive,
                hold,
            };
            submit::execute(&opts, args).await
        }

        Commands::Peek { job_id } => peek::execute(&opts, job_id).await,

        Commands::Events {
            file,
            job,
            event_type,
        } => events::execute(&opts, file, job, event_type.as_deref()).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["lava", "-vv", "hosts"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Console);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lava", "queues", "normal", "--sim", "--json"]).unwrap();
        assert!(cli.sim);
        assert!(cli.json);
        match cli.command {
            Commands::Queues { names } => assert_eq!(names, vec!["normal"]),
            _ => panic!("expected queues"),
        }
    }

    #[test]
    fn test_json_log_format() {
        let cli = Cli::try_parse_from(["lava", "--log-format", "json", "version"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(Cli::try_parse_from(["lava", "--log-format", "xml", "version"]).is_err());
    }

    #[test]
    fn test_submit_keeps_command_flags() {
        let cli = Cli::try_parse_from([
            "lava", "submit", "-q", "night", "-n", "2,4", "-m", "node01", "-m", "node02", "--",
            "./solver", "-q", "fast",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit {
                command,
                queue,
                processors,
                hosts,
                ..
            } => {
                assert_eq!(command, vec!["./solver", "-q", "fast"]);
                assert_eq!(queue.as_deref(), Some("night"));
                assert_eq!(processors.as_deref(), Some("2,4"));
                assert_eq!(hosts, vec!["node01", "node02"]);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_jobs_filters() {
        let cli = Cli::try_parse_from(["lava", "jobs", "-u", "bob", "-a", "-l"]).unwrap();
        match cli.command {
            Commands::Jobs {
                job_id,
                user,
                all,
                long,
                ..
            } => {
                assert_eq!(job_id, None);
                assert_eq!(user.as_deref(), Some("bob"));
                assert!(all);
                assert!(long);
            }
            _ => panic!("expected jobs"),
        }
    }

    #[test]
    fn test_peek_requires_numeric_id() {
        assert!(Cli::try_parse_from(["lava", "peek", "abc"]).is_err());
        assert!(Cli::try_parse_from(["lava", "peek", "42"]).is_ok());
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["lava"]).is_err());
    }
}
