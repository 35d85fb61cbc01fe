//! Feed contracts and raw-file distribution
//!
//! The warehouse loaders consume whatever sits in each feed's input folder;
//! the fetcher's responsibility ends once files are in the right folder
//! under the right name. The feed table mirrors the loaders' expectations
//! (sheet layout, canonical column names, company allow-list, load mode) so
//! both sides configure against the same structure.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// How the warehouse loader applies a feed's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Rows are appended to the target table
    Append,
    /// Rows for overlapping report dates are deleted first, then inserted
    Replace,
}

/// Contract of one data feed between the fetcher and the warehouse loader.
///
/// The sheet layout fields are the loader's side of the contract; the
/// fetcher carries them but never reads them.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub name: String,
    /// Folder the loader ingests from; the fetcher delivers files here
    pub input_dir: PathBuf,
    /// Folder the loader moves processed files to
    pub archive_dir: PathBuf,
    /// Worksheet the loader reads
    pub sheet: String,
    /// Header rows the loader skips before data starts
    pub skip_rows: u32,
    /// Canonical column names, in sheet order
    pub columns: Vec<String>,
    /// Companies whose rows are kept; everything else is dropped
    pub companies: Vec<String>,
    pub load_mode: LoadMode,
    /// Filename prefix that routes raw drops into this feed's input folder
    pub raw_prefix: Option<String>,
}

impl FeedConfig {
    /// The three production feeds, rooted under `data_root`.
    ///
    /// The sales feed is filled by the portal session itself; the two
    /// management-system feeds arrive as raw drops and are routed by prefix.
    pub fn standard_feeds(data_root: &Path) -> Vec<Self> {
        vec![
            Self {
                name: "sales".to_string(),
                input_dir: data_root.join("TL_new"),
                archive_dir: data_root.join("TL_arch"),
                sheet: "TurnoverList".to_string(),
                skip_rows: 0,
                columns: to_strings(&[
                    "Day", "Store", "Company", "Open", "Amount", "Curr", "Pcs", "Rcp", "People",
                    "Hours", "Work", "Comp:", "Open_1", "Amount_1", "Curr_1", "Pcs_1", "Rcp_1",
                    "People_1", "Hours_1", "Work_1",
                ]),
                companies: to_strings(&["Retail Kazakhstan", "Retail CIS"]),
                load_mode: LoadMode::Append,
                raw_prefix: None,
            },
            Self {
                name: "ms_sales".to_string(),
                input_dir: data_root.join("RTL_new"),
                archive_dir: data_root.join("RTL_arch"),
                sheet: "RTL50000_by_season_by_store old".to_string(),
                skip_rows: 3,
                columns: to_strings(&[
                    "Company", "Country", "Day", "Mfg Season", "Line Code", "Gender", "Dept Group",
                    "Dept", "Sub Dept", "Class", "Class_1", "Style", "Style_1", "Chain", "Store",
                    "Store_1", "Metrics", "Ttl Sls Qty", "TTL Curr Rtl Price €", "Discount €",
                    "Ttl Sls €", "Ttl Cost LC", "Ttl Sls Trasp Cost LC", "Ttl Cost €", "Ttl Sls LC",
                    "Ttl Sls Trasp Cost €",
                ]),
                companies: to_strings(&["RU", "KZ"]),
                load_mode: LoadMode::Append,
                raw_prefix: Some("RTL".to_string()),
            },
            Self {
                name: "ms_stock".to_string(),
                input_dir: data_root.join("FNC_new"),
                archive_dir: data_root.join("FNC_arch"),
                sheet: "FNC03-50001-Margin_stock all st".to_string(),
                skip_rows: 2,
                columns: to_strings(&[
                    "Company", "Day", "Store", "Store_1", "Mfg Season", "Line Code", "Line_Code_1",
                    "Style", "Style_1", "Sub_Dept", "Sub_Dept_1", "Metrics", "TTL EOH Ttl Qty",
                    "TTL Loading Cost €", "TTL Loading Cost LC", "TTL Trasp Cost €", "Cost €",
                ]),
                companies: to_strings(&["RU", "KZ"]),
                load_mode: LoadMode::Replace,
                raw_prefix: Some("FNC".to_string()),
            },
        ]
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Creates every feed's input and archive folder if missing.
pub fn ensure_feed_dirs(feeds: &[FeedConfig]) -> Result<()> {
    for feed in feeds {
        for dir in [&feed.input_dir, &feed.archive_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create feed directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Moves files from the raw drop folder into the input folder of the feed
/// whose filename prefix matches. Unmatched files are left in place.
pub fn distribute_raw_files(raw_dir: &Path, feeds: &[FeedConfig]) -> Result<usize> {
    let entries = fs::read_dir(raw_dir)
        .with_context(|| format!("Cannot read raw data directory {}", raw_dir.display()))?;

    let mut moved = 0;

    for entry in entries.flatten() {
        if !entry.path().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let Some(feed) = feeds.iter().find(|feed| {
            feed.raw_prefix
                .as_ref()
                .is_some_and(|prefix| name.starts_with(prefix.as_str()))
        }) else {
            continue;
        };

        let destination = feed.input_dir.join(&name);
        fs::rename(entry.path(), &destination).with_context(|| {
            format!("Cannot move {} into {}", name, feed.input_dir.display())
        })?;

        info!("Routed {} to feed '{}'", name, feed.name);
        moved += 1;
    }

    Ok(moved)
}
