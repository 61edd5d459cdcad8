use super::structs::{Mesh, Patch};
use crate::solver::boundary::Boundaries;
use nalgebra::{Point2, Vector2};
use std::collections::HashMap;

/// Bundles the four boundary sides for structured mesh generators.
#[derive(Clone, Copy, Debug)]
pub struct BoundarySides {
    pub left: Boundaries,
    pub right: Boundaries,
    pub bottom: Boundaries,
    pub top: Boundaries,
}

impl BoundarySides {
    /// Creates a new BoundarySides with all sides set to a no-slip wall.
    pub fn wall() -> Self {
        Self {
            left: Boundaries::wall(),
            right: Boundaries::wall(),
            bottom: Boundaries::wall(),
            top: Boundaries::wall(),
        }
    }

    /// Pressure-driven channel: fixed pressures left and right, walls top and bottom.
    pub fn pressure_channel(p_in: f64, p_out: f64) -> Self {
        Self {
            left: Boundaries::pressure_inlet(p_in),
            right: Boundaries::outlet(p_out),
            ..Self::wall()
        }
    }
}

impl Mesh {
    pub fn apply_boundary_sides(&mut self, sides: BoundarySides) {
        self.set_left_boundary(sides.left);
        self.set_right_boundary(sides.right);
        self.set_bottom_boundary(sides.bottom);
        self.set_top_boundary(sides.top);
    }
}

/// Uniform `nx` x `ny` grid of rectangles. Cell `(i, j)` has index `j * nx + i`.
pub fn generate_structured_rect_mesh(nx: usize, ny: usize, length: f64, height: f64) -> Mesh {
    assert!(nx > 0, "nx must be > 0");
    assert!(ny > 0, "ny must be > 0");
    assert!(length > 0.0, "length must be > 0");
    assert!(height > 0.0, "height must be > 0");

    let dx = length / nx as f64;
    let dy = height / ny as f64;

    let mut mesh = Mesh::new();

    // --- Vertices ---
    let num_vertices = (nx + 1) * (ny + 1);
    mesh.vx = vec![0.0; num_vertices];
    mesh.vy = vec![0.0; num_vertices];

    let vid = |i: usize, j: usize| -> usize { j * (nx + 1) + i };
    for j in 0..=ny {
        for i in 0..=nx {
            let v = vid(i, j);
            mesh.vx[v] = i as f64 * dx;
            mesh.vy[v] = j as f64 * dy;
        }
    }

    // --- Faces (edges) ---
    let cell_id = |i: usize, j: usize| -> usize { j * nx + i };

    // Maps (vertical edge i,j) -> face index, where i in 0..=nx, j in 0..ny-1
    let mut vert_face = vec![usize::MAX; (nx + 1) * ny];
    let vfid = |i: usize, j: usize| -> usize { j * (nx + 1) + i };

    for j in 0..ny {
        for i in 0..=nx {
            let (owner, neighbor, patch, nx_out) = if i == 0 {
                (cell_id(0, j), None, Some(Patch::Left), -1.0)
            } else if i == nx {
                (cell_id(nx - 1, j), None, Some(Patch::Right), 1.0)
            } else {
                (cell_id(i - 1, j), Some(cell_id(i, j)), None, 1.0)
            };

            vert_face[vfid(i, j)] = push_face(
                &mut mesh,
                (vid(i, j), vid(i, j + 1)),
                owner,
                neighbor,
                patch,
                Vector2::new(nx_out, 0.0),
            );
        }
    }

    // Maps (horizontal edge i,j) -> face index, where i in 0..nx-1, j in 0..=ny
    let mut horiz_face = vec![usize::MAX; nx * (ny + 1)];
    let hfid = |i: usize, j: usize| -> usize { j * nx + i };

    for j in 0..=ny {
        for i in 0..nx {
            let (owner, neighbor, patch, ny_out) = if j == 0 {
                (cell_id(i, 0), None, Some(Patch::Bottom), -1.0)
            } else if j == ny {
                (cell_id(i, ny - 1), None, Some(Patch::Top), 1.0)
            } else {
                (cell_id(i, j - 1), Some(cell_id(i, j)), None, 1.0)
            };

            horiz_face[hfid(i, j)] = push_face(
                &mut mesh,
                (vid(i, j), vid(i + 1, j)),
                owner,
                neighbor,
                patch,
                Vector2::new(0.0, ny_out),
            );
        }
    }

    // --- Cells ---
    let num_cells = nx * ny;
    mesh.cell_cx = vec![0.0; num_cells];
    mesh.cell_cy = vec![0.0; num_cells];
    mesh.cell_vol = vec![0.0; num_cells];

    mesh.cell_faces = Vec::with_capacity(num_cells * 4);
    mesh.cell_face_offsets = Vec::with_capacity(num_cells + 1);
    mesh.cell_vertices = Vec::with_capacity(num_cells * 4);
    mesh.cell_vertex_offsets = Vec::with_capacity(num_cells + 1);

    mesh.cell_face_offsets.push(0);
    mesh.cell_vertex_offsets.push(0);

    for j in 0..ny {
        for i in 0..nx {
            mesh.cell_faces.extend([
                vert_face[vfid(i, j)],
                vert_face[vfid(i + 1, j)],
                horiz_face[hfid(i, j)],
                horiz_face[hfid(i, j + 1)],
            ]);
            mesh.cell_face_offsets.push(mesh.cell_faces.len());

            mesh.cell_vertices
                .extend([vid(i, j), vid(i + 1, j), vid(i + 1, j + 1), vid(i, j + 1)]);
            mesh.cell_vertex_offsets.push(mesh.cell_vertices.len());
        }
    }

    mesh.recalculate_geometry();
    mesh
}

fn push_face(
    mesh: &mut Mesh,
    (v1, v2): (usize, usize),
    owner: usize,
    neighbor: Option<usize>,
    patch: Option<Patch>,
    normal: Vector2<f64>,
) -> usize {
    let idx = mesh.face_v1.len();
    mesh.face_v1.push(v1);
    mesh.face_v2.push(v2);
    mesh.face_owner.push(owner);
    mesh.face_neighbor.push(neighbor);
    mesh.face_boundary
        .push(neighbor.is_none().then(Boundaries::wall));
    mesh.face_patch.push(patch);
    mesh.face_nx.push(normal.x);
    mesh.face_ny.push(normal.y);
    mesh.face_area.push(0.0);
    mesh.face_cx.push(0.0);
    mesh.face_cy.push(0.0);
    idx
}

#[derive(Clone, Copy, Debug)]
enum CellEdge {
    Left,
    Right,
    Bottom,
    Top,
}

fn generate_structured_mesh_from_vertex_grid<F>(
    nx: usize,
    ny: usize,
    vx: Vec<f64>,
    vy: Vec<f64>,
    cell_exists: F,
) -> Mesh
where
    F: Fn(usize, usize) -> bool,
{
    assert_eq!(vx.len(), (nx + 1) * (ny + 1));
    assert_eq!(vy.len(), (nx + 1) * (ny + 1));

    let mut mesh = Mesh::new();
    mesh.vx = vx;
    mesh.vy = vy;

    let vid = |i: usize, j: usize| -> usize { j * (nx + 1) + i };
    let mut cell_map = vec![None; nx * ny];
    let cell_key = |i: usize, j: usize| -> usize { j * nx + i };

    // Assign contiguous cell indices for existing cells.
    let mut next_cell = 0usize;
    for j in 0..ny {
        for i in 0..nx {
            if cell_exists(i, j) {
                cell_map[cell_key(i, j)] = Some(next_cell);
                next_cell += 1;
            }
        }
    }

    let num_cells = next_cell;
    mesh.cell_cx = vec![0.0; num_cells];
    mesh.cell_cy = vec![0.0; num_cells];
    mesh.cell_vol = vec![0.0; num_cells];

    mesh.cell_faces = Vec::with_capacity(num_cells * 4);
    mesh.cell_face_offsets = Vec::with_capacity(num_cells + 1);
    mesh.cell_vertices = Vec::with_capacity(num_cells * 4);
    mesh.cell_vertex_offsets = Vec::with_capacity(num_cells + 1);
    mesh.cell_face_offsets.push(0);
    mesh.cell_vertex_offsets.push(0);

    let mut face_map: HashMap<(usize, usize), usize> = HashMap::new();

    let patch_for_new_face = |i: usize, j: usize, edge: CellEdge| -> Patch {
        match edge {
            CellEdge::Left if i == 0 => Patch::Left,
            CellEdge::Right if i + 1 == nx => Patch::Right,
            CellEdge::Bottom if j == 0 => Patch::Bottom,
            CellEdge::Top if j + 1 == ny => Patch::Top,
            _ => Patch::Obstacle,
        }
    };

    for j in 0..ny {
        for i in 0..nx {
            let Some(cell_idx) = cell_map[cell_key(i, j)] else {
                continue;
            };

            let v00 = vid(i, j);
            let v10 = vid(i + 1, j);
            let v11 = vid(i + 1, j + 1);
            let v01 = vid(i, j + 1);

            mesh.cell_vertices.extend([v00, v10, v11, v01]);
            mesh.cell_vertex_offsets.push(mesh.cell_vertices.len());

            let cell_edges: [(usize, usize, CellEdge); 4] = [
                (v00, v10, CellEdge::Bottom),
                (v10, v11, CellEdge::Right),
                (v11, v01, CellEdge::Top),
                (v01, v00, CellEdge::Left),
            ];

            for (v1, v2, edge_kind) in cell_edges {
                let key = if v1 < v2 { (v1, v2) } else { (v2, v1) };

                if let Some(&face_idx) = face_map.get(&key) {
                    mesh.face_neighbor[face_idx] = Some(cell_idx);
                    mesh.face_boundary[face_idx] = None;
                    mesh.face_patch[face_idx] = None;
                    mesh.cell_faces.push(face_idx);
                    continue;
                }

                // Counter-clockwise edge: (dy, -dx) points out of this cell.
                let p1 = Point2::new(mesh.vx[v1], mesh.vy[v1]);
                let p2 = Point2::new(mesh.vx[v2], mesh.vy[v2]);
                let edge_vec = p2 - p1;
                let normal = Vector2::new(edge_vec.y, -edge_vec.x).normalize();

                let face_idx = push_face(
                    &mut mesh,
                    (v1, v2),
                    cell_idx,
                    None,
                    Some(patch_for_new_face(i, j, edge_kind)),
                    normal,
                );

                face_map.insert(key, face_idx);
                mesh.cell_faces.push(face_idx);
            }

            mesh.cell_face_offsets.push(mesh.cell_faces.len());
        }
    }

    mesh.recalculate_geometry();
    mesh
}

/// Channel of height `height` with a step of `step_x` x `step_height` cut from the
/// lower-left corner. The step faces get [`Patch::Obstacle`].
pub fn generate_structured_backward_step_mesh(
    nx: usize,
    ny: usize,
    length: f64,
    height: f64,
    step_x: f64,
    step_height: f64,
) -> Mesh {
    assert!(nx > 0 && ny > 0);
    assert!(step_height > 0.0 && step_height < height);
    assert!(step_x > 0.0 && step_x < length);

    let dx = length / nx as f64;
    let dy = height / ny as f64;
    let nx_step = (step_x / dx).round() as usize;
    let ny_step = (step_height / dy).round() as usize;

    assert!(
        (nx_step as f64 * dx - step_x).abs() < 1e-12,
        "step_x must align with dx"
    );
    assert!(
        (ny_step as f64 * dy - step_height).abs() < 1e-12,
        "step height must align with dy"
    );

    let num_vertices = (nx + 1) * (ny + 1);
    let mut vx = vec![0.0; num_vertices];
    let mut vy = vec![0.0; num_vertices];
    let vid = |i: usize, j: usize| -> usize { j * (nx + 1) + i };
    for j in 0..=ny {
        for i in 0..=nx {
            let v = vid(i, j);
            vx[v] = i as f64 * dx;
            vy[v] = j as f64 * dy;
        }
    }

    let cell_exists = move |i: usize, j: usize| -> bool { i >= nx_step || j >= ny_step };

    generate_structured_mesh_from_vertex_grid(nx, ny, vx, vy, cell_exists)
}

/// Grid whose bottom edge ramps linearly from 0 to `ramp_height`, giving
/// non-orthogonal cells everywhere except the first column's left edge.
pub fn generate_structured_trapezoid_mesh(
    nx: usize,
    ny: usize,
    length: f64,
    height: f64,
    ramp_height: f64,
) -> Mesh {
    assert!(nx > 0 && ny > 0);
    assert!(length > 0.0 && height > 0.0);
    assert!(ramp_height >= 0.0 && ramp_height < height);

    let num_vertices = (nx + 1) * (ny + 1);
    let mut vx = vec![0.0; num_vertices];
    let mut vy = vec![0.0; num_vertices];
    let vid = |i: usize, j: usize| -> usize { j * (nx + 1) + i };

    for j in 0..=ny {
        let eta = j as f64 / ny as f64;
        for i in 0..=nx {
            let xi = i as f64 / nx as f64;
            let y_bottom = xi * ramp_height;
            let v = vid(i, j);
            vx[v] = xi * length;
            vy[v] = y_bottom + eta * (height - y_bottom);
        }
    }

    generate_structured_mesh_from_vertex_grid(nx, ny, vx, vy, |_i, _j| true)
}
