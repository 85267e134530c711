//! Reference listing

use anyhow::Result;
use serde::Serialize;

use refsnap::review::{scan_references, ReferenceEntry};

use super::Context;
use crate::output::{print_list, TableDisplay};

#[derive(Serialize)]
pub struct ReferenceDisplay {
    pub source: String,
    pub platform: Option<String>,
    pub file_name: String,
    pub size: u64,
    pub path: String,
}

impl From<ReferenceEntry> for ReferenceDisplay {
    fn from(entry: ReferenceEntry) -> Self {
        let size = std::fs::metadata(&entry.path).map(|m| m.len()).unwrap_or(0);
        Self {
            source: entry.source,
            platform: entry.platform,
            file_name: entry.file_name,
            size,
            path: entry.path.display().to_string(),
        }
    }
}

impl TableDisplay for ReferenceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Source", "Platform", "File", "Size"]
    }

    fn row(&self) -> Vec<String> {
        let size = if self.size > 1024 * 1024 {
            format!("{:.1}MB", self.size as f64 / 1024.0 / 1024.0)
        } else if self.size > 1024 {
            format!("{:.1}KB", self.size as f64 / 1024.0)
        } else {
            format!("{}B", self.size)
        };
        vec![
            self.source.clone(),
            self.platform.clone().unwrap_or_else(|| "-".to_string()),
            self.file_name.clone(),
            size,
        ]
    }
}

/// List references, optionally only those of the configured platform.
pub fn list(ctx: &Context, current_platform: bool) -> Result<()> {
    let displays: Vec<ReferenceDisplay> = scan_references(&ctx.root)?
        .into_iter()
        .filter(|entry| !current_platform || entry.platform.as_deref() == ctx.platform())
        .map(ReferenceDisplay::from)
        .collect();
    print_list(&displays, ctx.format);
    Ok(())
}
