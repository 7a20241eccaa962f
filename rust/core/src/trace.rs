// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position trace files
//!
//! One sample per line: `time,x,y,z[,qx,qy,qz,qw]`. Blank lines and `#`
//! comments are skipped.

use nalgebra::Point3;
use nom::{
    character::complete::{char, space0},
    multi::separated_list1,
    sequence::delimited,
    IResult,
};

use crate::error::{Error, Result};
use crate::types::{PositionSample, Quat};

fn field(input: &str) -> IResult<&str, f64> {
    delimited(space0, number, space0)(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    match fast_float::parse_partial::<f64, _>(input) {
        Ok((value, consumed)) if consumed > 0 => Ok((&input[consumed..], value)),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn record(input: &str) -> IResult<&str, Vec<f64>> {
    separated_list1(char(','), field)(input)
}

/// Parses a single trace line; `Ok(None)` for blanks and comments.
pub fn parse_sample(line: &str, line_no: usize) -> Result<Option<PositionSample>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (remaining, values) =
        record(line).map_err(|_| Error::parse(line_no, "expected comma-separated numbers"))?;
    if !remaining.is_empty() {
        return Err(Error::parse(line_no, format!("trailing input '{}'", remaining)));
    }

    match values.as_slice() {
        [t, x, y, z] => Ok(Some(PositionSample::new(*t, Point3::new(*x, *y, *z)))),
        [t, x, y, z, qx, qy, qz, qw] => Ok(Some(PositionSample {
            time: *t,
            position: Point3::new(*x, *y, *z),
            orientation: Quat::new(*qx, *qy, *qz, *qw),
        })),
        other => Err(Error::parse(
            line_no,
            format!("expected 4 or 8 fields, got {}", other.len()),
        )),
    }
}

/// Parses a whole trace file.
pub fn parse_trace(text: &str) -> Result<Vec<PositionSample>> {
    let mut samples = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(sample) = parse_sample(line, i + 1)? {
            samples.push(sample);
        }
    }
    Ok(samples)
}

/// Formats a sample as a trace line (no trailing newline).
pub fn format_sample(sample: &PositionSample) -> String {
    let p = sample.position;
    let q = sample.orientation;
    format!(
        "{},{},{},{},{},{},{},{}",
        sample.time, p.x, p.y, p.z, q.x, q.y, q.z, q.w
    )
}
