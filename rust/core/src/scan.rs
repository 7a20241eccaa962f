// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface scan parser using nom
//!
//! Scans arrive as a Wavefront OBJ subset: `v x y z` vertices and
//! `f a b c ...` faces (optionally `a/t/n` references, negative relative
//! indices, polygons fan-triangulated). Metadata rides in comments:
//!
//! ```text
//! # handedness: left
//! # device: hl2-0042
//! ```
//!
//! Left-handed scans are re-wound so every face normal follows the
//! right-handed convention used by the rest of the engine.

use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{map_res, opt, recognize, rest},
    multi::many1,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Coordinate-system handedness declared by a scan header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl Handedness {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "right" | "right-handed" | "rh" => Some(Handedness::Right),
            "left" | "left-handed" | "lh" => Some(Handedness::Left),
            _ => None,
        }
    }
}

/// Parsed scan: welded vertex list plus triangle indices
#[derive(Debug, Clone, Default)]
pub struct ScanMesh {
    pub vertices: Vec<Point3<f64>>,
    /// Triangles, already re-wound to right-handed order
    pub faces: Vec<[u32; 3]>,
    pub handedness: Handedness,
    /// Optional `# device:` tag
    pub device: Option<String>,
    /// Triangles dropped because they repeat a vertex
    pub degenerate_faces: usize,
}

impl ScanMesh {
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Triangle corner positions
    #[inline]
    pub fn triangle(&self, face: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }
}

// ============================================================================
// Line-level combinators
// ============================================================================

/// Float via fast_float (accepts `1`, `-0.5`, `1e-3`)
fn number(input: &str) -> IResult<&str, f64> {
    match fast_float::parse_partial::<f64, _>(input) {
        Ok((value, consumed)) if consumed > 0 => Ok((&input[consumed..], value)),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Signed integer index: 12, -1
fn index(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

/// `v x y z [r g b]`
fn vertex(input: &str) -> IResult<&str, [f64; 3]> {
    let (input, (x, y, z)) = preceded(
        pair(tag("v"), space1),
        tuple((number, preceded(space1, number), preceded(space1, number))),
    )(input)?;
    Ok((input, [x, y, z]))
}

/// Face vertex reference; texture/normal suffixes are skipped
fn face_ref(input: &str) -> IResult<&str, i64> {
    terminated(index, take_till(|c: char| c.is_whitespace()))(input)
}

/// `f a b c ...`
fn face(input: &str) -> IResult<&str, Vec<i64>> {
    preceded(tag("f"), many1(preceded(space1, face_ref)))(input)
}

/// `# key: value`
fn metadata(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (_, _, key, _, _, value)) = tuple((
        char('#'),
        space0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        char(':'),
        space0,
        rest,
    ))(input)?;
    Ok((input, (key, value)))
}

fn describe(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("{:?} near '{}'", e.code, e.input.chars().take(24).collect::<String>())
        }
        nom::Err::Incomplete(_) => "incomplete input".into(),
    }
}

// ============================================================================
// Scan parsing
// ============================================================================

struct PendingFace {
    line: usize,
    refs: SmallVec<[i64; 4]>,
}

/// Parses a scan file held in memory.
///
/// Unknown statements (`vn`, `vt`, `o`, `g`, `usemtl`, ...) are ignored.
/// A malformed `v` or `f` statement, or a face index outside the vertex
/// list, fails the whole scan: callers log and skip it.
pub fn parse_scan(bytes: &[u8]) -> Result<ScanMesh> {
    let mut mesh = ScanMesh::default();
    let mut pending: Vec<PendingFace> = Vec::new();

    let mut start = 0usize;
    let mut line_no = 0usize;
    for end in memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len())) {
        if start > end {
            break;
        }
        let raw = &bytes[start..end];
        start = end + 1;
        line_no += 1;

        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::parse(line_no, format!("invalid UTF-8: {}", e)))?
            .trim();
        if line.is_empty() {
            continue;
        }

        let keyword = line.split_ascii_whitespace().next().unwrap_or("");
        match keyword {
            "v" => {
                let (_, [x, y, z]) = vertex(line).map_err(|e| Error::parse(line_no, describe(e)))?;
                mesh.vertices.push(Point3::new(x, y, z));
            }
            "f" => {
                let (_, refs) = face(line).map_err(|e| Error::parse(line_no, describe(e)))?;
                if refs.len() < 3 {
                    return Err(Error::parse(line_no, "face needs at least 3 vertices"));
                }
                // Relative indices refer to the vertices read so far
                let count = mesh.vertices.len() as i64;
                let refs = refs
                    .into_iter()
                    .map(|r| if r < 0 { count + r + 1 } else { r })
                    .collect();
                pending.push(PendingFace { line: line_no, refs });
            }
            _ if keyword.starts_with('#') => {
                if let Ok((_, (key, value))) = metadata(line) {
                    match key.to_ascii_lowercase().as_str() {
                        "handedness" | "coordinate-system" => {
                            if let Some(h) = Handedness::from_label(value) {
                                mesh.handedness = h;
                            }
                        }
                        "device" => mesh.device = Some(value.trim().to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let vertex_count = mesh.vertices.len();
    for face in pending {
        let mut resolved: SmallVec<[u32; 4]> = SmallVec::with_capacity(face.refs.len());
        for &r in &face.refs {
            if r < 1 || r as usize > vertex_count {
                return Err(Error::IndexOutOfRange {
                    line: face.line,
                    index: r,
                    vertex_count,
                });
            }
            resolved.push((r - 1) as u32);
        }

        for i in 1..resolved.len() - 1 {
            let (a, b, c) = (resolved[0], resolved[i], resolved[i + 1]);
            if a == b || b == c || a == c {
                mesh.degenerate_faces += 1;
                continue;
            }
            mesh.faces.push(match mesh.handedness {
                Handedness::Right => [a, b, c],
                Handedness::Left => [a, c, b],
            });
        }
    }

    Ok(mesh)
}

/// Reads and parses a scan from disk.
pub fn read_scan(path: &std::path::Path) -> Result<ScanMesh> {
    let bytes = std::fs::read(path)?;
    parse_scan(&bytes)
}

/// Serializes a mesh back to the OBJ subset accepted by [`parse_scan`].
pub fn write_obj(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(vertices.len() * 32 + faces.len() * 16);
    for v in vertices {
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    for f in faces {
        let _ = writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# device: hl2-7
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
f 1 4 3 2
";

    #[test]
    fn parse_number_forms() {
        assert_eq!(number("1.5 rest").unwrap(), (" rest", 1.5));
        assert_eq!(number("-2e-1").unwrap().1, -0.2);
        assert!(number("x").is_err());
    }

    #[test]
    fn parse_face_refs_with_suffixes() {
        let (_, refs) = face("f 1/2/3 4//6 -1").unwrap();
        assert_eq!(refs, vec![1, 4, -1]);
    }

    #[test]
    fn parse_quad_fans_into_triangles() {
        let mesh = parse_scan(QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces, vec![[0, 3, 2], [0, 2, 1]]);
        assert_eq!(mesh.device.as_deref(), Some("hl2-7"));
        assert_eq!(mesh.handedness, Handedness::Right);
    }

    #[test]
    fn left_handed_scans_are_rewound() {
        let text = format!("# handedness: left\n{}", QUAD);
        let mesh = parse_scan(text.as_bytes()).unwrap();
        assert_eq!(mesh.handedness, Handedness::Left);
        assert_eq!(mesh.faces, vec![[0, 2, 3], [0, 1, 2]]);
    }

    #[test]
    fn relative_indices_resolve_against_vertices_so_far() {
        let mesh = parse_scan(b"v 0 0 0\nv 1 0 0\nv 0 0 1\nf -3 -1 -2\n").unwrap();
        assert_eq!(mesh.faces, vec![[0, 2, 1]]);
    }

    #[test]
    fn degenerate_faces_are_dropped() {
        let mesh = parse_scan(b"v 0 0 0\nv 1 0 0\nf 1 2 2\n").unwrap();
        assert!(mesh.faces.is_empty());
        assert_eq!(mesh.degenerate_faces, 1);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let err = parse_scan(b"v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { line: 2, .. }));
    }

    #[test]
    fn malformed_vertex_reports_line() {
        let err = parse_scan(b"v 0 0 0\nv 1 zero 0\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn crlf_and_ignored_statements() {
        let text = "o room\r\nvn 0 1 0\r\nv 0 0 0\r\nv 1 0 0\r\nv 0 0 1\r\nusemtl floor\r\nf 1 3 2\r\n";
        let mesh = parse_scan(text.as_bytes()).unwrap();
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn write_obj_round_trips() {
        let mesh = parse_scan(QUAD.as_bytes()).unwrap();
        let text = write_obj(&mesh.vertices, &mesh.faces);
        let again = parse_scan(text.as_bytes()).unwrap();
        assert_eq!(again.faces, mesh.faces);
        assert_eq!(again.vertices, mesh.vertices);
    }
}
