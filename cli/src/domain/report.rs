//! Tolerant parsers for Dokku's human-oriented report output.
//!
//! Dokku prints unversioned `Key: value` blocks introduced by
//! `=====> NAME ... information` marker lines. Every parser here skips lines
//! it does not recognise and defaults missing fields instead of failing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use dockyard_common::{AppInfo, AppStatus, GitReport, ProcessEntry, ProcessScale, ReportField};
use regex::Regex;

static PS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"=====> (\S+) ps information").expect("valid regex")
});

static DOMAINS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"=====> (\S+) domains information").expect("valid regex")
});

static RUNNING_TRUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)Running:\s+true").expect("valid regex")
});

static RUNNING_FALSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)Running:\s+false").expect("valid regex")
});

static DEPLOYED_TRUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)Deployed:\s+true").expect("valid regex")
});

/// `Status web 1` or `Status web.1` anywhere in a block.
static PROCESS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Status\s+(\w+)[.\s]+\d+").expect("valid regex")
});

/// The same, anchored to a whole report key, capturing the ordinal.
static PROCESS_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^Status\s+(\w+)[.\s]+(\d+)$").expect("valid regex")
});

static STATUS_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(\w+)").expect("valid regex")
});

static KV_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\s*(.+?):\s+(.*)$").expect("valid regex")
});

static VHOSTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Domains app vhosts:\s+(.+)").expect("valid regex")
});

static SCALE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\s*(\w+):\s*(\d+)").expect("valid regex")
});

const MARKER: &str = "=====>";

/// Split `output` at every `=====>` marker. Text before the first marker is
/// dropped.
fn marker_blocks(output: &str) -> Vec<&str> {
    let starts: Vec<usize> = output.match_indices(MARKER).map(|(idx, _)| idx).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(output.len());
            &output[start..end]
        })
        .collect()
}

/// Status precedence: running beats stopped beats deployed beats not
/// deployed. A best-effort reading of free text, not an exhaustive state set.
#[must_use]
pub fn classify_status(block: &str) -> (AppStatus, bool) {
    if RUNNING_TRUE_RE.is_match(block) {
        (AppStatus::Running, true)
    } else if RUNNING_FALSE_RE.is_match(block) && DEPLOYED_TRUE_RE.is_match(block) {
        (AppStatus::Stopped, true)
    } else if DEPLOYED_TRUE_RE.is_match(block) {
        (AppStatus::Deployed, true)
    } else {
        (AppStatus::NotDeployed, false)
    }
}

/// Parse bulk `ps:report` output into one [`AppInfo`] per app block.
/// Domains are left empty for the caller to fill.
#[must_use]
pub fn parse_ps_report_all(output: &str) -> Vec<AppInfo> {
    marker_blocks(output)
        .into_iter()
        .filter_map(|block| {
            let name = PS_HEADER_RE.captures(block)?.get(1)?.as_str().to_string();
            let (status, deployed) = classify_status(block);

            let mut process_types: Vec<String> = Vec::new();
            let mut process_type_counts: BTreeMap<String, u32> = BTreeMap::new();
            let mut process_count = 0;
            for caps in PROCESS_LINE_RE.captures_iter(block) {
                let kind = caps[1].to_string();
                if !process_type_counts.contains_key(&kind) {
                    process_types.push(kind.clone());
                }
                *process_type_counts.entry(kind).or_insert(0) += 1;
                process_count += 1;
            }

            Some(AppInfo {
                name,
                status,
                deployed,
                process_count,
                process_types,
                process_type_counts,
                domains: Vec::new(),
            })
        })
        .collect()
}

/// `Key: value` pairs of a report in order, skipping marker lines.
#[must_use]
pub fn parse_kv_report(output: &str) -> Vec<ReportField> {
    output
        .trim()
        .lines()
        .filter(|line| !line.starts_with("===="))
        .filter_map(|line| {
            let caps = KV_LINE_RE.captures(line)?;
            Some(ReportField {
                key: caps[1].trim().to_string(),
                value: caps[2].trim().to_string(),
            })
        })
        .collect()
}

/// Parse a single-app `ps:report` into its key/value map and container list.
#[must_use]
pub fn parse_app_report(output: &str) -> (BTreeMap<String, String>, Vec<ProcessEntry>) {
    let mut report = BTreeMap::new();
    let mut processes = Vec::new();

    for field in parse_kv_report(output) {
        if let Some(caps) = PROCESS_KEY_RE.captures(&field.key) {
            let status = STATUS_WORD_RE
                .captures(&field.value)
                .map_or_else(|| field.value.clone(), |c| c[1].to_string());
            processes.push(ProcessEntry {
                name: format!("{}.{}", &caps[1], &caps[2]),
                process_type: caps[1].to_string(),
                status,
            });
        }
        report.insert(field.key, field.value);
    }

    (report, processes)
}

fn split_vhosts(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

/// Bulk `domains:report`: app name → vhosts. Apps with no vhost line map to
/// an empty list.
#[must_use]
pub fn parse_domains_report_all(output: &str) -> BTreeMap<String, Vec<String>> {
    let mut result = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in output.trim().lines() {
        if let Some(caps) = DOMAINS_HEADER_RE.captures(line) {
            let app = caps[1].to_string();
            result.insert(app.clone(), Vec::new());
            current = Some(app);
            continue;
        }
        let Some(app) = current.as_ref() else {
            continue;
        };
        if let Some(caps) = VHOSTS_RE.captures(line) {
            result.insert(app.clone(), split_vhosts(&caps[1]));
        }
    }
    result
}

/// Single-app `domains:report`.
#[must_use]
pub fn parse_domains_report(output: &str) -> Vec<String> {
    output
        .trim()
        .lines()
        .filter_map(|line| VHOSTS_RE.captures(line))
        .flat_map(|caps| split_vhosts(&caps[1]))
        .collect()
}

/// `config:show`: split at the first colon, skip marker lines.
#[must_use]
pub fn parse_config_show(output: &str) -> BTreeMap<String, String> {
    output
        .trim()
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() || key.starts_with("====") {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn report_value(output: &str, key: &str) -> String {
    let Ok(pattern) = Regex::new(&format!(r"{}:\s+(.+)", regex::escape(key))) else {
        return String::new();
    };
    pattern
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default()
}

/// `git:report`. Absent fields are empty strings.
#[must_use]
pub fn parse_git_report(output: &str) -> GitReport {
    GitReport {
        deploy_branch: report_value(output, "Git deploy branch"),
        source_hash: report_value(output, "Git source image"),
        last_updated_at: report_value(output, "Git last updated at"),
    }
}

/// Listing commands (`apps:list`, `postgres:list`) print a header line first.
#[must_use]
pub fn parse_list_output(output: &str) -> Vec<String> {
    output
        .trim()
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `postgres:links` prints one app per line with no header.
#[must_use]
pub fn parse_links_output(output: &str) -> Vec<String> {
    output
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `ps:scale APP` prints `type: count` rows under a table header.
#[must_use]
pub fn parse_scale_report(output: &str) -> Vec<ProcessScale> {
    output
        .trim()
        .lines()
        .filter(|line| !line.starts_with("====") && !line.starts_with("---"))
        .filter_map(|line| {
            let caps = SCALE_LINE_RE.captures(line)?;
            let count = caps[2].parse().ok()?;
            Some(ProcessScale {
                process_type: caps[1].to_string(),
                count,
            })
        })
        .collect()
}
