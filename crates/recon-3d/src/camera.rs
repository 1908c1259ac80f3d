use crate::projection::{ProjectionError, ProjectionMatrix};

/// A quaternion stored as `[w, x, y, z]`.
pub type Quaternion = [f64; 4];

/// The projection of a camera expressed as a 3x3 linear map and a 3D offset.
///
/// A world point `X` maps to the homogeneous image point `linear * X - offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProjection {
    /// The 3x3 linear part, row major.
    pub linear: [[f64; 3]; 3],
    /// The offset subtracted after applying the linear map.
    pub offset: [f64; 3],
}

impl Default for CameraProjection {
    fn default() -> Self {
        Self::identity()
    }
}

impl CameraProjection {
    /// The identity projection with a zero offset.
    ///
    /// Used by formats that store already resolved image coordinates.
    pub fn identity() -> Self {
        Self {
            linear: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0; 3],
        }
    }

    /// Build the projection of a pinhole camera from its focal length, orientation and center.
    ///
    /// The linear map is `diag(f, f, 1) * R(q)` and the offset is `linear * center`, so
    /// that a world point is first moved into the camera frame and then scaled by the
    /// focal length. The image coordinates are relative to the image center.
    ///
    /// # Arguments
    ///
    /// * `focal` - The focal length in pixels.
    /// * `quaternion` - The camera rotation as `[w, x, y, z]`.
    /// * `center` - The camera center in world coordinates.
    pub fn from_focal_quaternion(focal: f64, quaternion: &Quaternion, center: &[f64; 3]) -> Self {
        let rotation = quaternion_to_rotation_matrix(quaternion);
        let scale = [focal, focal, 1.0];

        let mut linear = [[0.0; 3]; 3];
        for (row, (dst, src)) in linear.iter_mut().zip(rotation.iter()).enumerate() {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d = scale[row] * s;
            }
        }

        let offset = mat33_mul_vec3(&linear, center);

        Self { linear, offset }
    }

    /// Split a 3x4 projection matrix `[M | t]` into the linear map `M` and the offset `-t`.
    pub fn from_projection_matrix(matrix: &ProjectionMatrix) -> Self {
        let rows = matrix.rows();
        let mut linear = [[0.0; 3]; 3];
        let mut offset = [0.0; 3];
        for (i, row) in rows.iter().enumerate() {
            linear[i] = [row[0], row[1], row[2]];
            offset[i] = -row[3];
        }
        Self { linear, offset }
    }

    /// Assemble the equivalent 3x4 projection matrix `[linear | -offset]`.
    pub fn to_projection_matrix(&self) -> ProjectionMatrix {
        let mut rows = [[0.0; 4]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            let l = &self.linear[i];
            *row = [l[0], l[1], l[2], -self.offset[i]];
        }
        ProjectionMatrix::new(rows)
    }

    /// Project a world point into image coordinates with perspective division.
    pub fn project(&self, point: &[f64; 3]) -> Result<[f64; 2], ProjectionError> {
        self.to_projection_matrix().reproject(point)
    }
}

/// Compute the rotation matrix of a quaternion `[w, x, y, z]`.
///
/// The quaternion is used as is, without normalization, so the diagonal keeps the
/// `w² + x² - y² - z²` form of the bundle adjustment tools that write these files.
///
/// Example:
///
/// ```
/// use recon_3d::camera::quaternion_to_rotation_matrix;
///
/// let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn quaternion_to_rotation_matrix(quaternion: &Quaternion) -> [[f64; 3]; 3] {
    let [w, x, y, z] = *quaternion;
    let (w2, x2, y2, z2) = (w * w, x * x, y * y, z * z);

    [
        [
            w2 + x2 - y2 - z2,
            2.0 * x * y - 2.0 * w * z,
            2.0 * x * z + 2.0 * w * y,
        ],
        [
            2.0 * w * z + 2.0 * x * y,
            w2 - x2 + y2 - z2,
            2.0 * y * z - 2.0 * w * x,
        ],
        [
            2.0 * x * z - 2.0 * w * y,
            2.0 * y * z + 2.0 * w * x,
            w2 - x2 - y2 + z2,
        ],
    ]
}

/// Viewing direction of an NVM camera derived from its quaternion `[w, x, y, z]`.
///
/// NVM files do not store the direction. The axis convention differs from formats that
/// store the direction explicitly: the identity rotation looks along `+z`.
pub fn nvm_view_direction(quaternion: &Quaternion) -> [f64; 3] {
    let [w, x, y, z] = *quaternion;
    [
        2.0 * (x * z - y * w),
        -2.0 * (y * z - x * w),
        1.0 - 2.0 * (x * x - y * y),
    ]
}

fn mat33_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_quaternion() {
        let focal = 800.0;
        let center = [1.0, 2.0, 3.0];
        let proj = CameraProjection::from_focal_quaternion(focal, &[1.0, 0.0, 0.0, 0.0], &center);

        assert_eq!(
            proj.linear,
            [[800.0, 0.0, 0.0], [0.0, 800.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_eq!(proj.offset, [800.0, 1600.0, 3.0]);
        assert_eq!(nvm_view_direction(&[1.0, 0.0, 0.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_about_z() {
        let half = std::f64::consts::FRAC_PI_4;
        let q = [half.cos(), 0.0, 0.0, half.sin()];
        let rotation = quaternion_to_rotation_matrix(&q);
        let expected = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_project_matches_pinhole() -> Result<(), ProjectionError> {
        let half = 0.3f64;
        let q = [half.cos(), half.sin(), 0.0, 0.0];
        let center = [0.5, -1.0, -4.0];
        let focal = 600.0;
        let proj = CameraProjection::from_focal_quaternion(focal, &q, &center);

        let point = [0.2, 0.4, 1.5];
        let uv = proj.project(&point)?;

        // move into the camera frame by hand and apply the pinhole model
        let r = quaternion_to_rotation_matrix(&q);
        let d = [
            point[0] - center[0],
            point[1] - center[1],
            point[2] - center[2],
        ];
        let cam = mat33_mul_vec3(&r, &d);
        assert_relative_eq!(uv[0], focal * cam[0] / cam[2], epsilon = 1e-9);
        assert_relative_eq!(uv[1], focal * cam[1] / cam[2], epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_projection_matrix_split() {
        let p = ProjectionMatrix::new([
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
        ]);
        let proj = CameraProjection::from_projection_matrix(&p);
        assert_eq!(
            proj.linear,
            [[1.0, 2.0, 3.0], [5.0, 6.0, 7.0], [9.0, 10.0, 11.0]]
        );
        assert_eq!(proj.offset, [-4.0, -8.0, -12.0]);
        assert_eq!(proj.to_projection_matrix(), p);
    }

    #[test]
    fn test_identity_projection() {
        let proj = CameraProjection::default();
        assert_eq!(proj, CameraProjection::identity());
        assert_eq!(proj.offset, [0.0; 3]);
        assert!(proj.project(&[1.0, 1.0, 0.0]).is_err());
    }
}
