//! Effective configuration

use anyhow::Result;
use serde::Serialize;

use super::Context;
use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Serialize)]
pub struct Setting {
    pub key: &'static str,
    pub value: String,
}

impl TableDisplay for Setting {
    fn headers() -> Vec<&'static str> {
        vec!["Setting", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.key.to_string(), self.value.clone()]
    }
}

pub fn show(ctx: &Context) -> Result<()> {
    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&ctx.config)?);
        return Ok(());
    }

    let config = &ctx.config;
    let settings = vec![
        Setting {
            key: "record",
            value: config.record.to_string(),
        },
        Setting {
            key: "diff_tool",
            value: config.diff_tool.clone().unwrap_or_else(|| "-".to_string()),
        },
        Setting {
            key: "artifacts_dir",
            value: config.artifacts_dir().display().to_string(),
        },
        Setting {
            key: "timeout_ms",
            value: config.timeout_ms.to_string(),
        },
        Setting {
            key: "platform",
            value: config.platform.clone().unwrap_or_else(|| "-".to_string()),
        },
    ];
    print_list(&settings, ctx.format);
    Ok(())
}
