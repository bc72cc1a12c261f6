//! Windows Service Control Manager access through `sc` and `net`.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use super::runner::{CommandOutcome, CommandRunner};
use super::{ServiceControl, ServiceQuery};

/// `ERROR_SERVICE_DOES_NOT_EXIST`, reported by `sc query` for unknown names.
pub const SERVICE_DOES_NOT_EXIST: i32 = 1060;

/// Queries with `sc query`, starts and stops with `net start` / `net stop`.
#[derive(Debug, Clone)]
pub struct ScServiceControl<R> {
    runner: R,
    sc: PathBuf,
    net: PathBuf,
}

impl<R: CommandRunner> ScServiceControl<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            sc: PathBuf::from("sc"),
            net: PathBuf::from("net"),
        }
    }

    fn net(&self, verb: &str, name: &str) -> CommandOutcome {
        self.runner
            .run(&self.net, &[OsString::from(verb), OsString::from(name)])
    }
}

impl<R: CommandRunner> ServiceControl for ScServiceControl<R> {
    fn query(&self, name: &str) -> ServiceQuery {
        let outcome = self
            .runner
            .run(&self.sc, &[OsString::from("query"), OsString::from(name)]);
        let query = parse_sc_query(&outcome);
        debug!(service = %name, state = ?query, "Queried service");
        query
    }

    fn start(&self, name: &str) -> CommandOutcome {
        self.net("start", name)
    }

    fn stop(&self, name: &str) -> CommandOutcome {
        self.net("stop", name)
    }
}

/// Interpret `sc query` output.
///
/// Only the explicit "does not exist" status (1060) means the service is
/// absent. A spawn failure or any output we cannot read is `Unknown`.
pub fn parse_sc_query(outcome: &CommandOutcome) -> ServiceQuery {
    if outcome.exit_code == Some(SERVICE_DOES_NOT_EXIST)
        || mentions_not_found(&outcome.stdout)
        || mentions_not_found(&outcome.stderr)
    {
        return ServiceQuery::NotFound;
    }

    if !outcome.success {
        return ServiceQuery::Unknown(outcome.diagnostic());
    }

    match state_token(&outcome.stdout) {
        Some("RUNNING") | Some("PAUSED") => ServiceQuery::Running,
        Some("STOPPED") => ServiceQuery::Stopped,
        Some(token) if token.ends_with("_PENDING") => ServiceQuery::Pending,
        Some(token) => ServiceQuery::Unknown(format!("unrecognized service state {}", token)),
        None => ServiceQuery::Unknown(format!(
            "no STATE line in output of {}",
            outcome.command
        )),
    }
}

fn mentions_not_found(text: &str) -> bool {
    text.contains(&format!("FAILED {}", SERVICE_DOES_NOT_EXIST))
}

/// Pull `RUNNING` out of `        STATE              : 4  RUNNING`.
fn state_token(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("STATE"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, rest)| rest.split_whitespace().nth(1))
}
