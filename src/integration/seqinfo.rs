//! Sequence metadata (`seqinfo.ini` style key/value files).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::tracker::FrameShape;

#[derive(Debug, Clone, PartialEq)]
pub struct SeqInfo {
    pub framerate: u32,
    pub seqlength: u32,
    /// Frame size, when both `imwidth` and `imheight` are present
    pub frame_shape: Option<FrameShape>,
    /// Remaining keys, lower-cased
    pub extra: BTreeMap<String, String>,
}

impl SeqInfo {
    /// Parse `key=value` lines. Keys are case-insensitive; section headers
    /// and `;`/`#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut values = BTreeMap::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with(['[', ';', '#']) {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let framerate = take_number(&mut values, "framerate")?
            .ok_or(Error::MissingMetadata("framerate"))?;
        let seqlength = take_number(&mut values, "seqlength")?
            .ok_or(Error::MissingMetadata("seqlength"))?;
        let width = take_number(&mut values, "imwidth")?;
        let height = take_number(&mut values, "imheight")?;

        Ok(Self {
            framerate,
            seqlength,
            frame_shape: width.zip(height).map(|(w, h)| FrameShape::new(h, w)),
            extra: values,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").map(String::as_str)
    }
}

fn take_number(values: &mut BTreeMap<String, String>, key: &str) -> Result<Option<u32>> {
    match values.remove(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidMetadata {
                key: key.to_string(),
                value,
            }),
    }
}
