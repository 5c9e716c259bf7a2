//! Prerequisite checks for `bundler verify`.

use std::fmt;

use crate::github::SourceProvider;
use crate::runner::TaskRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub docker: CheckResult,
    pub helm: CheckResult,
    pub github: CheckResult,
}

impl VerifyReport {
    pub fn all_passed(&self) -> bool {
        self.docker.passed && self.helm.passed && self.github.passed
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, check) in [
            ("docker", &self.docker),
            ("helm", &self.helm),
            ("github", &self.github),
        ] {
            writeln!(f, "  [{}] {label:<8} {}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

/// Run every check concurrently, without early return.
pub async fn verify_prerequisites<R, S>(runner: &R, source: &S) -> VerifyReport
where
    R: TaskRunner,
    S: SourceProvider,
{
    let (docker, helm, github) =
        tokio::join!(runner.docker_version(), runner.helm_version(), source.ping());

    VerifyReport {
        docker: match docker {
            Ok(v) => CheckResult::ok(&v),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
        helm: match helm {
            Ok(v) => CheckResult::ok(&v),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
        github: match github {
            Ok(()) => CheckResult::ok("reachable"),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
    }
}
