/// Depth magnitude below which a point is considered to lie on the camera plane.
pub const MIN_DEPTH: f64 = 1e-10;

/// Error types for the projection module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProjectionError {
    /// The point lies on the principal plane of the camera.
    #[error("Cannot reproject point with zero depth (depth = {0})")]
    ZeroDepth(f64),
}

/// A 3x4 projection matrix mapping homogeneous world points to homogeneous image points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionMatrix(pub [[f64; 4]; 3]);

impl ProjectionMatrix {
    /// Create a new projection matrix from its rows.
    pub fn new(rows: [[f64; 4]; 3]) -> Self {
        Self(rows)
    }

    /// Get the rows of the matrix.
    #[inline]
    pub fn rows(&self) -> &[[f64; 4]; 3] {
        &self.0
    }

    /// Reproject a 3D point into normalized image coordinates.
    ///
    /// The point is extended to `(x, y, z, 1)` and multiplied with the matrix,
    /// followed by the perspective division by the third component.
    ///
    /// # Arguments
    ///
    /// * `point` - The 3D point in world coordinates.
    ///
    /// # Returns
    ///
    /// The `(u, v)` image coordinates or [`ProjectionError::ZeroDepth`] when the
    /// point lies on the principal plane of the camera.
    ///
    /// Example:
    ///
    /// ```
    /// use recon_3d::projection::ProjectionMatrix;
    ///
    /// let p = ProjectionMatrix::new([
    ///     [2.0, 0.0, 0.0, 0.0],
    ///     [0.0, 2.0, 0.0, 0.0],
    ///     [0.0, 0.0, 1.0, 0.0],
    /// ]);
    /// let uv = p.reproject(&[1.0, 2.0, 4.0]).unwrap();
    /// assert_eq!(uv, [0.5, 1.0]);
    /// ```
    pub fn reproject(&self, point: &[f64; 3]) -> Result<[f64; 2], ProjectionError> {
        let [row0, row1, row2] = &self.0;
        let depth = dot_homogeneous(row2, point);
        if depth.abs() < MIN_DEPTH {
            return Err(ProjectionError::ZeroDepth(depth));
        }
        Ok([
            dot_homogeneous(row0, point) / depth,
            dot_homogeneous(row1, point) / depth,
        ])
    }
}

#[inline]
fn dot_homogeneous(row: &[f64; 4], point: &[f64; 3]) -> f64 {
    row[0] * point[0] + row[1] * point[1] + row[2] * point[2] + row[3]
}
