use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::trace::Trace;

/// What an unpack run changed.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Report {
    pub version: u8,
    pub compression: String,
    pub tags: Vec<TagReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    /// tag indices from the movie down through nested sprites
    pub path: Vec<usize>,
    pub code: u16,
    pub layout: String,
    pub original_size: usize,
    pub recovered_size: usize,
    pub regions: Vec<RegionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionReport {
    pub entry: usize,
    pub body_start: usize,
    pub body_end: usize,
    pub jump_pairs: usize,
    pub constant_pool: bool,
    pub recovered: usize,
}

impl From<&Trace> for RegionReport {
    fn from(t: &Trace) -> Self {
        Self {
            entry: t.entry,
            body_start: t.body_start,
            body_end: t.body_end,
            jump_pairs: t.jump_pairs.len(),
            constant_pool: t.constant_pool.is_some(),
            recovered: t.code.len(),
        }
    }
}

impl Report {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = File::create(path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        serde_yaml::to_writer(&mut writer, self)?;
        Ok(())
    }
}
