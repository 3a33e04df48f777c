//! Running an external part-conversion tool once per catalog entry.
//!
//! Each invocation is bounded by a timeout and isolated: a failing entry is
//! recorded and the batch moves on. Output of the tool (stdout and stderr
//! combined) decides between a real conversion, an entry that was already
//! present, and a failure.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{PartEntry, PartsCatalog};

const ALREADY_SATISFIED_MARKERS: &[&str] = &["already exists", "already in library"];
const OUTPUT_TAIL_LINES: usize = 5;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "kebab-case")]
pub enum ConversionStatus {
    Converted,
    AlreadySatisfied,
    Failed(String),
}

impl ConversionStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ConversionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub part: String,
    pub mpn: Option<String>,
    pub status: ConversionStatus,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub results: Vec<ConversionResult>,
}

impl ConversionSummary {
    fn count(&self, pred: impl Fn(&ConversionStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn converted(&self) -> usize {
        self.count(|s| *s == ConversionStatus::Converted)
    }

    pub fn already_satisfied(&self) -> usize {
        self.count(|s| *s == ConversionStatus::AlreadySatisfied)
    }

    pub fn failed(&self) -> usize {
        self.count(ConversionStatus::is_failed)
    }
}

#[derive(Debug, Clone)]
pub struct PartConverter {
    pub program: String,
    /// `{part}` and `{mpn}` are replaced per entry.
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Extra attempts after a failure.
    pub retries: u32,
}

impl PartConverter {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            timeout: Duration::from_secs(60),
            retries: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    fn expand_args(&self, key: &str, entry: &PartEntry) -> Result<Vec<String>, String> {
        self.args
            .iter()
            .map(|arg| {
                let mut arg = arg.replace("{part}", key);
                if arg.contains("{mpn}") {
                    let mpn = entry
                        .mpn
                        .as_deref()
                        .ok_or_else(|| format!("part {key} has no MPN"))?;
                    arg = arg.replace("{mpn}", mpn);
                }
                Ok(arg)
            })
            .collect()
    }

    /// One invocation of the tool.
    fn run_once(&self, args: &[String]) -> ConversionStatus {
        let handle = match duct::cmd(self.program.as_str(), args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .start()
        {
            Ok(handle) => handle,
            Err(e) => {
                return ConversionStatus::Failed(format!(
                    "could not start {}: {e}",
                    self.program
                ));
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match handle.try_wait() {
                Ok(Some(output)) => {
                    let text = String::from_utf8_lossy(&output.stdout);
                    return classify(output.status.success(), &text);
                }
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(e) = handle.kill() {
                        log::warn!("Failed to kill {} after timeout: {e}", self.program);
                    }
                    return ConversionStatus::Failed(format!(
                        "timed out after {:.1}s",
                        self.timeout.as_secs_f64()
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return ConversionStatus::Failed(format!(
                        "waiting for {}: {e}",
                        self.program
                    ));
                }
            }
        }
    }

    pub fn convert(&self, key: &str, entry: &PartEntry) -> ConversionResult {
        let mut result = ConversionResult {
            part: key.to_string(),
            mpn: entry.mpn.clone(),
            status: ConversionStatus::Converted,
            attempts: 0,
        };
        let args = match self.expand_args(key, entry) {
            Ok(args) => args,
            Err(reason) => {
                result.status = ConversionStatus::Failed(reason);
                return result;
            }
        };

        for attempt in 1..=self.retries + 1 {
            result.attempts = attempt;
            result.status = self.run_once(&args);
            match &result.status {
                ConversionStatus::Failed(reason) => {
                    log::warn!("Converting {key} failed (attempt {attempt}): {reason}");
                }
                _ => break,
            }
        }
        result
    }

    /// Convert every entry in key order. Never stops early.
    pub fn convert_all(&self, parts: &PartsCatalog) -> ConversionSummary {
        let results: Vec<ConversionResult> = parts
            .iter()
            .map(|(key, entry)| self.convert(key, entry))
            .collect();
        let summary = ConversionSummary { results };
        log::info!(
            "Converted {} parts ({} already present, {} failed)",
            summary.converted(),
            summary.already_satisfied(),
            summary.failed()
        );
        summary
    }
}

fn classify(success: bool, output: &str) -> ConversionStatus {
    if success {
        return ConversionStatus::Converted;
    }
    let lowered = output.to_lowercase();
    if ALREADY_SATISFIED_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ConversionStatus::AlreadySatisfied;
    }
    ConversionStatus::Failed(output_tail(output))
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "exited with an error and no output".to_string()
    } else {
        tail
    }
}
