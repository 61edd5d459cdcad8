use crate::solver::boundary::Boundaries;
use crate::solver::types::{CellId, FaceId, Scalar, Vector};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

/// Named group of boundary faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Patch {
    Left,
    Right,
    Bottom,
    Top,
    /// Faces exposed by cells removed from a structured grid (e.g. a step).
    Obstacle,
}

#[derive(Default, Clone, Debug)]
pub struct Mesh {
    // Vertices
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,

    // Faces
    pub face_v1: Vec<usize>,
    pub face_v2: Vec<usize>,
    pub face_owner: Vec<usize>,
    pub face_neighbor: Vec<Option<usize>>,
    pub face_patch: Vec<Option<Patch>>,
    pub face_boundary: Vec<Option<Boundaries>>,
    pub face_nx: Vec<f64>, // unit normal, outward from the owner
    pub face_ny: Vec<f64>,
    pub face_area: Vec<f64>,
    pub face_cx: Vec<f64>,
    pub face_cy: Vec<f64>,

    // Cells
    pub cell_cx: Vec<f64>,
    pub cell_cy: Vec<f64>,
    pub cell_vol: Vec<f64>,

    // Connectivity
    pub cell_faces: Vec<usize>,
    pub cell_face_offsets: Vec<usize>, // cell_face_offsets[i] .. cell_face_offsets[i+1]

    pub cell_vertices: Vec<usize>,
    pub cell_vertex_offsets: Vec<usize>,

    pub use_non_orthogonal_correction: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_cells(&self) -> usize {
        self.cell_cx.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_cx.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vx.len()
    }

    pub fn is_2d(&self) -> bool {
        true
    }

    pub fn cell_volume(&self, cell: CellId) -> Scalar {
        self.cell_vol[cell]
    }

    pub fn cell_centroid(&self, cell: CellId) -> Point2<f64> {
        Point2::new(self.cell_cx[cell], self.cell_cy[cell])
    }

    pub fn cell_faces(&self, cell: CellId) -> &[FaceId] {
        &self.cell_faces[self.cell_face_offsets[cell]..self.cell_face_offsets[cell + 1]]
    }

    pub fn cell_vertices(&self, cell: CellId) -> &[usize] {
        &self.cell_vertices[self.cell_vertex_offsets[cell]..self.cell_vertex_offsets[cell + 1]]
    }

    pub fn face_centroid(&self, face: FaceId) -> Point2<f64> {
        Point2::new(self.face_cx[face], self.face_cy[face])
    }

    /// Unit normal pointing out of the owner.
    pub fn face_normal(&self, face: FaceId) -> Vector {
        Vector::new(self.face_nx[face], self.face_ny[face])
    }

    /// Normal scaled by face length, pointing out of the owner.
    pub fn face_area_vector(&self, face: FaceId) -> Vector {
        self.face_normal(face) * self.face_area[face]
    }

    /// Area vector oriented outward from `cell`, which must be adjacent to `face`.
    pub fn face_area_vector_from(&self, cell: CellId, face: FaceId) -> Vector {
        if self.face_owner[face] == cell {
            self.face_area_vector(face)
        } else {
            -self.face_area_vector(face)
        }
    }

    pub fn face_area(&self, face: FaceId) -> Scalar {
        self.face_area[face]
    }

    pub fn face_owner(&self, face: FaceId) -> CellId {
        self.face_owner[face]
    }

    pub fn face_neighbor(&self, face: FaceId) -> Option<CellId> {
        self.face_neighbor[face]
    }

    /// `(owner, neighbour)`.
    pub fn face_cells(&self, face: FaceId) -> (CellId, Option<CellId>) {
        (self.face_owner[face], self.face_neighbor[face])
    }

    /// The cell across `face` as seen from `cell`.
    pub fn other_cell(&self, cell: CellId, face: FaceId) -> Option<CellId> {
        match self.face_cells(face) {
            (owner, Some(neighbor)) if owner == cell => Some(neighbor),
            (owner, Some(_)) => Some(owner),
            (_, None) => None,
        }
    }

    pub fn is_boundary_face(&self, face: FaceId) -> bool {
        self.face_neighbor[face].is_none()
    }

    /// Conditions of a boundary face. Interior faces report a wall, which no stencil reads.
    pub fn face_boundaries(&self, face: FaceId) -> Boundaries {
        debug_assert!(self.is_boundary_face(face), "face {} is interior", face);
        self.face_boundary[face].unwrap_or_default()
    }

    pub fn face_patch(&self, face: FaceId) -> Option<Patch> {
        self.face_patch[face]
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.num_faces()).filter(move |&f| self.is_boundary_face(f))
    }

    pub fn patch_faces(&self, patch: Patch) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.num_faces()).filter(move |&f| self.face_patch[f] == Some(patch))
    }

    pub fn set_face_boundary(&mut self, face: FaceId, boundaries: Boundaries) {
        assert!(
            self.is_boundary_face(face),
            "cannot set boundary conditions on interior face {}",
            face
        );
        self.face_boundary[face] = Some(boundaries);
    }

    /// Assigns `boundaries` to every face of `patch`; returns the number of faces touched.
    pub fn set_patch_boundary(&mut self, patch: Patch, boundaries: Boundaries) -> usize {
        let mut count = 0;
        for (tag, bc) in self.face_patch.iter().zip(self.face_boundary.iter_mut()) {
            if *tag == Some(patch) {
                *bc = Some(boundaries);
                count += 1;
            }
        }
        count
    }

    pub fn set_left_boundary(&mut self, boundaries: Boundaries) {
        self.set_patch_boundary(Patch::Left, boundaries);
    }

    pub fn set_right_boundary(&mut self, boundaries: Boundaries) {
        self.set_patch_boundary(Patch::Right, boundaries);
    }

    pub fn set_bottom_boundary(&mut self, boundaries: Boundaries) {
        self.set_patch_boundary(Patch::Bottom, boundaries);
    }

    pub fn set_top_boundary(&mut self, boundaries: Boundaries) {
        self.set_patch_boundary(Patch::Top, boundaries);
    }

    /// Turns on non-orthogonal correction when the worst face exceeds `threshold`.
    pub fn enable_non_orthogonal_correction_if_skewed(&mut self, threshold: f64) -> bool {
        let skew = self.calculate_max_skewness();
        self.use_non_orthogonal_correction = skew > threshold;
        if self.use_non_orthogonal_correction {
            log::info!(
                "max skewness {:.3e} above {:.3e}: non-orthogonal correction enabled",
                skew,
                threshold
            );
        }
        self.use_non_orthogonal_correction
    }

    pub fn recalculate_geometry(&mut self) {
        // 1. Recalculate Faces
        let vx = &self.vx;
        let vy = &self.vy;
        let face_v1 = &self.face_v1;
        let face_v2 = &self.face_v2;

        self.face_cx
            .par_iter_mut()
            .zip(&mut self.face_cy)
            .zip(&mut self.face_area)
            .zip(&mut self.face_nx)
            .zip(&mut self.face_ny)
            .enumerate()
            .for_each(|(i, ((((cx, cy), area), nx), ny))| {
                let v0 = Point2::new(vx[face_v1[i]], vy[face_v1[i]]);
                let v1 = Point2::new(vx[face_v2[i]], vy[face_v2[i]]);

                let center = Point2::from((v0.coords + v1.coords) * 0.5);
                *cx = center.x;
                *cy = center.y;

                let edge_vec = v1 - v0;
                *area = edge_vec.norm();

                // Preserve normal orientation
                let tangent = edge_vec.normalize();
                let mut normal = Vector2::new(tangent.y, -tangent.x);

                let current_normal = Vector2::new(*nx, *ny);
                if normal.dot(&current_normal) < 0.0 {
                    normal = -normal;
                }
                *nx = normal.x;
                *ny = normal.y;
            });

        // 2. Recalculate Cells
        let cell_vertex_offsets = &self.cell_vertex_offsets;
        let cell_vertices = &self.cell_vertices;

        self.cell_cx
            .par_iter_mut()
            .zip(&mut self.cell_cy)
            .zip(&mut self.cell_vol)
            .enumerate()
            .for_each(|(i, ((cx_out, cy_out), vol_out))| {
                let start = cell_vertex_offsets[i];
                let end = cell_vertex_offsets[i + 1];
                let n = end - start;

                // Polygon area and centroid (shoelace)
                let mut signed_area = 0.0;
                let mut c_x = 0.0;
                let mut c_y = 0.0;

                for k in 0..n {
                    let idx0 = cell_vertices[start + k];
                    let idx1 = cell_vertices[start + (k + 1) % n];

                    let cross = vx[idx0] * vy[idx1] - vx[idx1] * vy[idx0];
                    signed_area += cross;
                    c_x += (vx[idx0] + vx[idx1]) * cross;
                    c_y += (vy[idx0] + vy[idx1]) * cross;
                }

                signed_area *= 0.5;
                let area = signed_area.abs();

                let center = if area > 1e-12 {
                    Vector2::new(c_x / (6.0 * signed_area), c_y / (6.0 * signed_area))
                } else {
                    let mut center = Vector2::zeros();
                    for k in 0..n {
                        let idx = cell_vertices[start + k];
                        center.x += vx[idx];
                        center.y += vy[idx];
                    }
                    center / n as f64
                };

                *cx_out = center.x;
                *cy_out = center.y;
                *vol_out = area;
            });
    }

    /// Flips face normals that do not point away from their owner.
    pub fn orient_face_normals(&mut self) {
        for face in 0..self.num_faces() {
            let owner = self.face_owner[face];
            let outward = self.face_centroid(face) - self.cell_centroid(owner);
            if self.face_normal(face).dot(&outward) < 0.0 {
                self.face_nx[face] = -self.face_nx[face];
                self.face_ny[face] = -self.face_ny[face];
            }
        }
    }

    /// `1 - |cos|` of the angle between face normal and the owner-to-neighbour line.
    pub fn calculate_max_skewness(&self) -> f64 {
        (0..self.face_cx.len())
            .into_par_iter()
            .map(|i| {
                let owner = self.face_owner[i];
                let d = match self.face_neighbor[i] {
                    Some(neigh) => self.cell_centroid(neigh) - self.cell_centroid(owner),
                    None => self.face_centroid(i) - self.cell_centroid(owner),
                };

                let d_norm = if d.norm_squared() > 1e-24 {
                    d.normalize()
                } else {
                    Vector2::zeros()
                };

                1.0 - d_norm.dot(&self.face_normal(i)).abs()
            })
            .reduce(|| 0.0, f64::max)
    }

    /// Point-in-polygon search (ray casting).
    pub fn cell_at_point(&self, p: Point2<f64>) -> Option<CellId> {
        (0..self.num_cells()).find(|&i| {
            let verts = self.cell_vertices(i);
            let n = verts.len();
            let mut inside = false;
            let mut j = n - 1;
            for k in 0..n {
                let (pi_x, pi_y) = (self.vx[verts[k]], self.vy[verts[k]]);
                let (pj_x, pj_y) = (self.vx[verts[j]], self.vy[verts[j]]);

                if ((pi_y > p.y) != (pj_y > p.y))
                    && (p.x < (pj_x - pi_x) * (p.y - pi_y) / (pj_y - pi_y) + pi_x)
                {
                    inside = !inside;
                }
                j = k;
            }
            inside
        })
    }
}
