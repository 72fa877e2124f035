//! Comma-separated detection records, as used by MOT-style ground truth and
//! detection files.
//!
//! Accepted layouts:
//! - `frame,id,left,top,width,height`
//! - `frame,id,left,top,width,height,confidence,class,visibility`
//! - `frame,id,left,top,width,height,confidence,x,y,z` (trailing three ignored)

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::tracker::{Detection, TrackId};

fn field<T: FromStr>(value: &str, line: usize, name: &'static str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidField {
        line,
        field: name,
        value: value.to_string(),
    })
}

/// Parse a field that must hold a whole number, possibly written as a float.
fn integral(value: &str, line: usize, name: &'static str) -> Result<f64> {
    let number: f64 = field(value, line, name)?;
    if !number.is_finite() || number.fract() != 0.0 {
        return Err(Error::InvalidField {
            line,
            field: name,
            value: value.to_string(),
        });
    }
    Ok(number)
}

/// Parse one record. `line` is only used for error reporting.
pub fn parse_record(record: &str, line: usize) -> Result<Detection> {
    let fields: Vec<&str> = record.trim().split(',').map(str::trim).collect();
    if !matches!(fields.len(), 6 | 9 | 10) {
        return Err(Error::FieldCount {
            line,
            got: fields.len(),
        });
    }

    // Frame numbers are sometimes written as floats.
    let frame = integral(fields[0], line, "frame")?;
    if frame < 1.0 || frame > u32::MAX as f64 {
        return Err(Error::InvalidField {
            line,
            field: "frame",
            value: fields[0].to_string(),
        });
    }
    let id = integral(fields[1], line, "id")?;
    let left: f32 = field(fields[2], line, "left")?;
    let top: f32 = field(fields[3], line, "top")?;
    let width: f32 = field(fields[4], line, "width")?;
    let height: f32 = field(fields[5], line, "height")?;

    let mut detection = Detection::new(frame as u32, left, top, width, height)
        .with_id(TrackId::from_raw(id as i64));

    if fields.len() >= 9 {
        detection.confidence = Some(field(fields[6], line, "confidence")?);
    }
    if fields.len() == 9 {
        let class = integral(fields[7], line, "class")?;
        detection.class_id = Some(class as i32);
        detection.visibility = Some(field(fields[8], line, "visibility")?);
    }

    Ok(detection)
}

/// Parse every non-blank line of `text`.
pub fn parse_records(text: &str) -> Result<Vec<Detection>> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_record(l, i + 1))
        .collect()
}

pub fn read_records(path: &Path) -> Result<Vec<Detection>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&text)
}

/// Bucket detections by frame. The result has one entry per frame from 1 to
/// the highest frame present; frames without detections are empty.
pub fn group_by_frame(detections: Vec<Detection>) -> Vec<Vec<Detection>> {
    let mut by_frame: BTreeMap<u32, Vec<Detection>> = BTreeMap::new();
    for det in detections {
        by_frame.entry(det.frame).or_default().push(det);
    }
    let last = by_frame.keys().next_back().copied().unwrap_or(0);
    (1..=last)
        .map(|frame| by_frame.remove(&frame).unwrap_or_default())
        .collect()
}

/// Render a detection as a record.
///
/// Six fields are written when the detection has no confidence, class or
/// visibility; otherwise nine, with `-1` standing in for absent values.
pub fn format_record(detection: &Detection) -> String {
    let [left, top, width, height] = detection.rect.to_tlwh();
    let mut out = format!(
        "{},{},{},{},{},{}",
        detection.frame, detection.id, left, top, width, height
    );
    if detection.confidence.is_some()
        || detection.class_id.is_some()
        || detection.visibility.is_some()
    {
        let confidence = detection.confidence.unwrap_or(-1.0);
        let class = detection.class_id.unwrap_or(-1);
        let visibility = detection.visibility.unwrap_or(-1.0);
        out.push_str(&format!(",{confidence},{class},{visibility}"));
    }
    out
}
