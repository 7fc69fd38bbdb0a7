//! Submit command implementation.
//!
//! Build a submission from an optional template file plus command-line
//! flags, send it, and report the job id or the master's rejection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use lava_client::{Submit, SubmitReply, format_job_id};

use super::common::{GlobalOpts, open_session, parse_processors, print_json, read_file};

/// Command-line arguments of `lava submit`.
#[derive(Debug, Default)]
pub struct SubmitArgs {
    pub command: Vec<String>,
    pub template: Option<PathBuf>,
    pub queue: Option<String>,
    pub name: Option<String>,
    pub processors: Option<String>,
    pub hosts: Vec<String>,
    pub res_req: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub project: Option<String>,
    pub depend: Option<String>,
    pub exclusive: bool,
    pub hold: bool,
}

/// Parse a submission template. `.json` files are JSON, anything else YAML.
pub fn parse_template(path: &Path, contents: &str) -> Result<Submit> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let mut request: Submit = if is_json {
        serde_json::from_str(contents)
            .with_context(|| format!("Invalid JSON template: {}", path.display()))?
    } else {
        serde_yaml_ng::from_str(contents)
            .with_context(|| format!("Invalid YAML template: {}", path.display()))?
    };
    request.imply_options();
    Ok(request)
}

/// Apply command-line flags on top of `base`.
pub fn build_request(base: Submit, args: &SubmitArgs) -> Result<Submit> {
    let mut request = base;

    if !args.command.is_empty() {
        request.command = args.command.join(" ");
    }
    if let Some(queue) = &args.queue {
        request = request.with_queue(queue);
    }
    if let Some(name) = &args.name {
        request = request.with_job_name(name);
    }
    if let Some(range) = &args.processors {
        let (min, max) = parse_processors(range)?;
        request = request.with_processors(min, max);
    }
    if !args.hosts.is_empty() {
        request = request.with_hosts(&args.hosts);
    }
    if let Some(res_req) = &args.res_req {
        request = request.with_res_req(res_req);
    }
    if let Some(path) = &args.input {
        request = request.with_in_file(path);
    }
    if let Some(path) = &args.output {
        request = request.with_out_file(path);
    }
    if let Some(path) = &args.error {
        request = request.with_err_file(path);
    }
    if let Some(project) = &args.project {
        request = request.with_project(project);
    }
    if let Some(cond) = &args.depend {
        request = request.with_depend_cond(cond);
    }
    if args.exclusive {
        request = request.exclusive();
    }
    if args.hold {
        request = request.hold();
    }

    if request.command.trim().is_empty() {
        anyhow::bail!("No command given (pass it after `--` or in the template)");
    }
    Ok(request)
}

/// Execute the submit command.
pub async fn execute(opts: &GlobalOpts, args: SubmitArgs) -> Result<()> {
    let base = match &args.template {
        Some(path) => parse_template(path, &read_file(path).await?)?,
        None => Submit::default(),
    };
    let request = build_request(base, &args)?;

    let mut session = open_session(opts).await?;
    let reply = session.submit(&request).await?;

    if opts.json {
        print_json(&reply)?;
    } else {
        print_reply(&reply);
    }

    match &reply.rejection {
        Some(rejection) => anyhow::bail!("Job not submitted: {}", rejection.message),
        None => Ok(()),
    }
}

fn print_reply(reply: &SubmitReply) {
    if let Some(job_id) = reply.job_id {
        println!(
            "{} Job <{}> is submitted to queue <{}>.",
            style("✓").green().bold(),
            style(format_job_id(job_id)).bold(),
            reply.queue
        );
        return;
    }

    if let Some(rejection) = &reply.rejection {
        let field = match (rejection.field, rejection.index) {
            (Some(field), Some(idx)) => format!(" [{field}[{idx}]]"),
            (Some(field), None) => format!(" [{field}]"),
            _ => String::new(),
        };
        eprintln!(
            "{} {}{} ({})",
            style("✗").red().bold(),
            rejection.message,
            style(field).dim(),
            rejection.kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_client::records::{sub_options, sub_options2};

    fn args(command: &[&str]) -> SubmitArgs {
        SubmitArgs {
            command: command.iter().map(|s| (*s).to_string()).collect(),
            ..SubmitArgs::default()
        }
    }

    #[test]
    fn test_flags_set_fields_and_option_bits() {
        let mut a = args(&["./solver", "-q", "fast"]);
        a.queue = Some("night".into());
        a.processors = Some("2,4".into());
        a.hosts = vec!["node01".into(), "node02".into()];
        a.hold = true;

        let request = build_request(Submit::default(), &a).unwrap();
        assert_eq!(request.command, "./solver -q fast");
        assert_eq!(request.queue, "night");
        assert!(request.has_option(sub_options::QUEUE));
        assert!(request.has_option(sub_options::HOST));
        assert_eq!(request.asked_hosts, vec!["node01", "node02"]);
        assert_eq!((request.num_processors, request.max_num_processors), (2, 4));
        assert_ne!(request.options2 & sub_options2::HOLD, 0);
    }

    #[test]
    fn test_missing_command_is_an_error() {
        assert!(build_request(Submit::default(), &args(&[])).is_err());
    }

    #[test]
    fn test_yaml_template_with_override() {
        let yaml = "command: sleep 60\nqueue: priority\njob_name: nap\n";
        let base = parse_template(Path::new("nap.yaml"), yaml).unwrap();
        assert!(base.has_option(sub_options::QUEUE));
        assert!(base.has_option(sub_options::JOB_NAME));

        let mut a = args(&[]);
        a.queue = Some("normal".into());
        let request = build_request(base, &a).unwrap();
        assert_eq!(request.command, "sleep 60");
        assert_eq!(request.queue, "normal");
        assert_eq!(request.job_name, "nap");
    }

    #[test]
    fn test_json_template() {
        let json = r#"{"command": "hostname", "num_processors": 1, "max_num_processors": 1}"#;
        let request = parse_template(Path::new("t.json"), json).unwrap();
        assert_eq!(request.command, "hostname");
        assert_eq!(request.max_num_processors, 1);
        assert!(parse_template(Path::new("t.json"), "command: x").is_err());
    }

    #[tokio::test]
    async fn test_submit_to_sim() {
        let opts = GlobalOpts {
            sim: true,
            ..GlobalOpts::default()
        };
        let mut a = args(&["hostname"]);
        a.processors = Some("1".into());
        execute(&opts, a).await.unwrap();

        let mut a = args(&["reboot"]);
        a.queue = Some("nosuch".into());
        assert!(execute(&opts, a).await.is_err());
    }
}
