//! Reader for the line-based polygon mesh format.
//!
//! ```text
//! # comment
//! v <x> <y>                         vertex
//! f <v1> <v2>                       face (edge) between two vertices
//! c <f1> <f2> ... <fn>              cell bounded by faces, n >= 3
//! b <face> U fixedValue <ux> <uy>   velocity condition on a boundary face
//! b <face> p fixedGradient <g>      pressure condition on a boundary face
//! ```
//!
//! Indices are zero-based. The owner of an interior face is its lower-indexed cell.

use super::structs::Mesh;
use crate::solver::boundary::{BoundaryCondition, BoundaryConditionType, Boundaries};
use crate::solver::types::{Scalar, Vector};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unrecognized token '{token}'")]
    UnknownToken { line: usize, token: String },

    #[error("line {line}: index {index} out of range")]
    InvalidIndex { line: usize, index: usize },

    #[error("cell {cell}: faces do not form a closed loop")]
    OpenCell { cell: usize },

    #[error("face {face} is shared by more than two cells or by no cell")]
    Disconnected { face: usize },

    #[error("boundary face {face} has no boundary conditions")]
    MissingBoundary { face: usize },

    #[error("boundary face {face} has no condition for '{variable}'")]
    IncompleteBoundary { face: usize, variable: &'static str },
}

#[derive(Default)]
struct PartialBoundaries {
    velocity: Option<BoundaryCondition<Vector>>,
    pressure: Option<BoundaryCondition<Scalar>>,
    line: usize,
}

#[derive(Default)]
struct RawMesh {
    vertices: Vec<(f64, f64)>,
    faces: Vec<(usize, usize, usize)>, // (v1, v2, line)
    cells: Vec<(Vec<usize>, usize)>,   // (faces, line)
    boundaries: HashMap<usize, PartialBoundaries>,
}

pub fn read_poly_mesh_file(path: impl AsRef<Path>) -> Result<Mesh, MeshParseError> {
    let file = File::open(path)?;
    read_poly_mesh(BufReader::new(file))
}

pub fn read_poly_mesh(reader: impl BufRead) -> Result<Mesh, MeshParseError> {
    let mut raw = RawMesh::default();
    for (idx, line) in reader.lines().enumerate() {
        parse_line(&line?, idx + 1, &mut raw)?;
    }
    build_mesh(raw)
}

pub fn parse_poly_mesh(input: &str) -> Result<Mesh, MeshParseError> {
    read_poly_mesh(input.as_bytes())
}

fn parse_line(line: &str, line_no: usize, raw: &mut RawMesh) -> Result<(), MeshParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&entity) = tokens.first() else {
        return Ok(());
    };
    if entity.starts_with('#') {
        return Ok(());
    }

    match entity {
        "v" => {
            expect_len(&tokens, 3, line_no)?;
            let x = parse_number(tokens[1], line_no)?;
            let y = parse_number(tokens[2], line_no)?;
            raw.vertices.push((x, y));
        }
        "f" => {
            expect_len(&tokens, 3, line_no)?;
            let v1 = parse_index(tokens[1], line_no)?;
            let v2 = parse_index(tokens[2], line_no)?;
            raw.faces.push((v1, v2, line_no));
        }
        "c" => {
            if tokens.len() < 4 {
                return Err(MeshParseError::Syntax {
                    line: line_no,
                    message: "a cell needs at least three faces".to_string(),
                });
            }
            let faces = tokens[1..]
                .iter()
                .map(|t| parse_index(t, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            raw.cells.push((faces, line_no));
        }
        "b" => parse_boundary(&tokens, line_no, raw)?,
        other => {
            return Err(MeshParseError::UnknownToken {
                line: line_no,
                token: other.to_string(),
            })
        }
    }
    Ok(())
}

fn parse_boundary(tokens: &[&str], line_no: usize, raw: &mut RawMesh) -> Result<(), MeshParseError> {
    if tokens.len() < 5 {
        return Err(MeshParseError::Syntax {
            line: line_no,
            message: "expected 'b <face> <U|p> <type> <values>'".to_string(),
        });
    }
    let face = parse_index(tokens[1], line_no)?;
    let kind: BoundaryConditionType =
        tokens[3]
            .parse()
            .map_err(|_| MeshParseError::UnknownToken {
                line: line_no,
                token: tokens[3].to_string(),
            })?;

    let entry = raw.boundaries.entry(face).or_default();
    entry.line = line_no;
    match tokens[2] {
        "U" => {
            expect_len(tokens, 6, line_no)?;
            let value = Vector::new(
                parse_number(tokens[4], line_no)?,
                parse_number(tokens[5], line_no)?,
            );
            entry.velocity = Some(BoundaryCondition { kind, value });
        }
        "p" => {
            expect_len(tokens, 5, line_no)?;
            let value = parse_number(tokens[4], line_no)?;
            entry.pressure = Some(BoundaryCondition { kind, value });
        }
        other => {
            return Err(MeshParseError::UnknownToken {
                line: line_no,
                token: other.to_string(),
            })
        }
    }
    Ok(())
}

fn expect_len(tokens: &[&str], len: usize, line: usize) -> Result<(), MeshParseError> {
    if tokens.len() != len {
        return Err(MeshParseError::Syntax {
            line,
            message: format!("expected {} fields, found {}", len, tokens.len()),
        });
    }
    Ok(())
}

fn parse_number(token: &str, line: usize) -> Result<f64, MeshParseError> {
    token.parse().map_err(|_| MeshParseError::Syntax {
        line,
        message: format!("invalid number '{}'", token),
    })
}

fn parse_index(token: &str, line: usize) -> Result<usize, MeshParseError> {
    token.parse().map_err(|_| MeshParseError::Syntax {
        line,
        message: format!("invalid index '{}'", token),
    })
}

/// Walks the cell's edges head to tail and returns the vertex loop.
fn order_cell_vertices(edges: &[(usize, usize)], cell: usize) -> Result<Vec<usize>, MeshParseError> {
    let mut remaining: Vec<(usize, usize)> = edges[1..].to_vec();
    let (start, mut current) = edges[0];
    let mut loop_vertices = vec![start];

    while !remaining.is_empty() {
        loop_vertices.push(current);
        let pos = remaining
            .iter()
            .position(|&(a, b)| a == current || b == current)
            .ok_or(MeshParseError::OpenCell { cell })?;
        let (a, b) = remaining.swap_remove(pos);
        current = if a == current { b } else { a };
    }

    if current != start {
        return Err(MeshParseError::OpenCell { cell });
    }
    Ok(loop_vertices)
}

fn build_mesh(raw: RawMesh) -> Result<Mesh, MeshParseError> {
    let num_vertices = raw.vertices.len();
    let num_faces = raw.faces.len();

    let mut mesh = Mesh::new();
    mesh.vx = raw.vertices.iter().map(|v| v.0).collect();
    mesh.vy = raw.vertices.iter().map(|v| v.1).collect();

    for &(v1, v2, line) in &raw.faces {
        for v in [v1, v2] {
            if v >= num_vertices {
                return Err(MeshParseError::InvalidIndex { line, index: v });
            }
        }
    }
    mesh.face_v1 = raw.faces.iter().map(|f| f.0).collect();
    mesh.face_v2 = raw.faces.iter().map(|f| f.1).collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_faces];
    mesh.cell_face_offsets.push(0);
    mesh.cell_vertex_offsets.push(0);

    for (cell, (faces, line)) in raw.cells.iter().enumerate() {
        for &f in faces {
            if f >= num_faces {
                return Err(MeshParseError::InvalidIndex { line: *line, index: f });
            }
            adjacency[f].push(cell);
        }
        let edges: Vec<(usize, usize)> = faces.iter().map(|&f| (raw.faces[f].0, raw.faces[f].1)).collect();
        let vertices = order_cell_vertices(&edges, cell)?;

        mesh.cell_faces.extend(faces);
        mesh.cell_face_offsets.push(mesh.cell_faces.len());
        mesh.cell_vertices.extend(vertices);
        mesh.cell_vertex_offsets.push(mesh.cell_vertices.len());
    }

    let num_cells = raw.cells.len();
    mesh.cell_cx = vec![0.0; num_cells];
    mesh.cell_cy = vec![0.0; num_cells];
    mesh.cell_vol = vec![0.0; num_cells];

    for (face, cells) in adjacency.iter().enumerate() {
        match cells.as_slice() {
            [only] => {
                mesh.face_owner.push(*only);
                mesh.face_neighbor.push(None);
            }
            [a, b] => {
                mesh.face_owner.push(*a.min(b));
                mesh.face_neighbor.push(Some(*a.max(b)));
            }
            _ => return Err(MeshParseError::Disconnected { face }),
        }
    }

    let mut boundaries = raw.boundaries;
    for face in 0..num_faces {
        if mesh.face_neighbor[face].is_some() {
            mesh.face_boundary.push(None);
            continue;
        }
        let entry = boundaries
            .remove(&face)
            .ok_or(MeshParseError::MissingBoundary { face })?;
        let velocity = entry.velocity.ok_or(MeshParseError::IncompleteBoundary {
            face,
            variable: "U",
        })?;
        let pressure = entry.pressure.ok_or(MeshParseError::IncompleteBoundary {
            face,
            variable: "p",
        })?;
        mesh.face_boundary.push(Some(Boundaries::new(velocity, pressure)));
    }
    if let Some((&face, entry)) = boundaries.iter().min_by_key(|(f, _)| **f) {
        return Err(MeshParseError::Syntax {
            line: entry.line,
            message: format!("face {} is not a boundary face", face),
        });
    }

    mesh.face_patch = vec![None; num_faces];
    mesh.face_nx = vec![0.0; num_faces];
    mesh.face_ny = vec![0.0; num_faces];
    mesh.face_area = vec![0.0; num_faces];
    mesh.face_cx = vec![0.0; num_faces];
    mesh.face_cy = vec![0.0; num_faces];

    mesh.recalculate_geometry();
    mesh.orient_face_normals();
    log::debug!(
        "parsed poly mesh: {} vertices, {} faces, {} cells",
        mesh.num_vertices(),
        mesh.num_faces(),
        mesh.num_cells()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two unit squares side by side; face 6 is shared.
    const TWO_SQUARES: &str = "\
# vertices
v 0 0
v 1 0
v 2 0
v 0 1
v 1 1
v 2 1
f 0 1
f 1 2
f 3 4
f 4 5
f 0 3
f 2 5
f 1 4
c 0 6 2 4
c 1 5 3 6
b 0 U fixedValue 0 0
b 0 p fixedGradient 0
b 1 U fixedValue 0 0
b 1 p fixedGradient 0
b 2 U fixedValue 0 0
b 2 p fixedGradient 0
b 3 U fixedValue 0 0
b 3 p fixedGradient 0
b 4 U fixedValue 1 0
b 4 p fixedGradient 0
b 5 U fixedGradient 0 0
b 5 p fixedValue 0
";

    #[test]
    fn parses_two_cells_with_shared_face() {
        let mesh = parse_poly_mesh(TWO_SQUARES).unwrap();
        assert_eq!(mesh.num_cells(), 2);
        assert_eq!(mesh.num_faces(), 7);
        assert_eq!(mesh.face_cells(6), (0, Some(1)));
        assert!((mesh.cell_volume(0) - 1.0).abs() < 1e-12);
        assert!((mesh.cell_centroid(1).x - 1.5).abs() < 1e-12);
        assert!((mesh.face_normal(6).x - 1.0).abs() < 1e-12);
        assert!((mesh.face_normal(4).x + 1.0).abs() < 1e-12);
        assert_eq!(mesh.face_boundaries(4).velocity.value, Vector::new(1.0, 0.0));
        assert!(mesh.face_boundaries(5).pressure.is_fixed_value());
    }

    #[test]
    fn missing_pressure_condition_is_reported() {
        let input = TWO_SQUARES.replace("b 5 p fixedValue 0\n", "");
        let err = parse_poly_mesh(&input).unwrap_err();
        assert!(matches!(
            err,
            MeshParseError::IncompleteBoundary { face: 5, variable: "p" }
        ));
    }

    #[test]
    fn unknown_entity_reports_line() {
        let err = parse_poly_mesh("v 0 0\nx 1 2\n").unwrap_err();
        match err {
            MeshParseError::UnknownToken { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_condition_type_is_rejected() {
        let input = TWO_SQUARES.replace("b 5 p fixedValue 0", "b 5 p slip 0");
        assert!(matches!(
            parse_poly_mesh(&input),
            Err(MeshParseError::UnknownToken { .. })
        ));
    }

    #[test]
    fn open_cell_is_rejected() {
        let input = "v 0 0\nv 1 0\nv 0 1\nv 1 1\nf 0 1\nf 1 3\nf 2 3\nc 0 1 2\n";
        assert!(matches!(
            parse_poly_mesh(input),
            Err(MeshParseError::OpenCell { cell: 0 })
        ));
    }
}
