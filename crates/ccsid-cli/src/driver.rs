//! CCSID enumeration
//!
//! Walks the configured CCSIDs in increasing order and dumps every one the
//! system can convert. A failure is logged and counted against its own CCSID
//! only; the walk always reaches the end of the list.

use anyhow::{Context, Result};
use ccsid_bridge::{build_with_target, classify, Bridge, PasePrimitives, UTF16_CCSID};
use ccsid_config::Config;
use ccsid_report::{write_reports, CharDatabase, ReportOptions, WrittenReports};
use indicatif::ProgressBar;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What one run enumerates and where it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPlan {
    /// CCSIDs to visit, ascending
    pub ccsids: Vec<u32>,
    /// CCSIDs never converted, even when listed explicitly
    pub skip: Vec<u32>,
    pub output_dir: PathBuf,
    pub target_ccsid: u32,
    pub options: ReportOptions,
}

impl DumpPlan {
    /// Plan for `config`; a non-empty `explicit` list replaces the range
    pub fn from_config(config: &Config, explicit: &[u32]) -> Self {
        let ccsids = if explicit.is_empty() {
            (config.first()..=config.last()).collect()
        } else {
            let mut ccsids = explicit.to_vec();
            ccsids.sort_unstable();
            ccsids.dedup();
            ccsids
        };

        Self {
            ccsids,
            skip: config.skip().to_vec(),
            output_dir: config.output_dir().to_path_buf(),
            target_ccsid: config.target_ccsid().unwrap_or(UTF16_CCSID),
            options: ReportOptions {
                html: config.html(),
            },
        }
    }
}

/// Result of visiting one CCSID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(WrittenReports),
    Skipped,
    Unsupported,
}

/// Counts over a whole run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} unsupported, {} failed",
            self.written, self.skipped, self.unsupported, self.failed
        )
    }
}

/// Classify `ccsid` and, if it is single- or double-byte, write its reports
pub fn dump_ccsid<P: PasePrimitives, D: CharDatabase>(
    bridge: &Bridge<P>,
    ccsid: u32,
    plan: &DumpPlan,
    db: &D,
) -> Result<Outcome> {
    if plan.skip.contains(&ccsid) {
        debug!(ccsid, "skip-listed");
        return Ok(Outcome::Skipped);
    }

    let scheme = classify(bridge, ccsid)
        .with_context(|| format!("Failed to classify CCSID {}", ccsid))?;
    let Some(code) = scheme.code() else {
        return Ok(Outcome::Unsupported);
    };
    info!("ccsid: {} {:x}", ccsid, code);

    let table = build_with_target(bridge, ccsid, scheme, plan.target_ccsid)
        .with_context(|| format!("Failed to build table for CCSID {}", ccsid))?;
    let written = write_reports(&table, &plan.output_dir, db, plan.options)
        .with_context(|| format!("Failed to write reports for CCSID {}", ccsid))?;

    Ok(Outcome::Written(written))
}

/// Visit every CCSID of `plan`
pub fn run<P: PasePrimitives, D: CharDatabase>(
    bridge: &Bridge<P>,
    plan: &DumpPlan,
    db: &D,
    progress: &ProgressBar,
) -> Summary {
    let mut summary = Summary::default();

    for &ccsid in &plan.ccsids {
        progress.set_message(format!("CCSID {}", ccsid));
        match dump_ccsid(bridge, ccsid, plan, db) {
            Ok(Outcome::Written(_)) => summary.written += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Ok(Outcome::Unsupported) => summary.unsupported += 1,
            Err(e) => {
                warn!(ccsid, "{:#}", e);
                summary.failed += 1;
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    info!(%summary, "enumeration finished");
    summary
}
