use std::path::{Path, PathBuf};

use recon_3d::camera::CameraProjection;

use super::{open_lines, parent_dir, require_file, resolve, RMV_VERSION_1};
use crate::{
    adapter::{InputAdapter, Texture},
    error::DatasetError,
};

const FIELD_DELIMITERS: &str = ";";

/// Reader of RMV files.
///
/// RMV stores textures with resolved sizes, positions and directions, and points with
/// normalized colours and final texture coordinates, so no camera math is involved.
#[derive(Debug, Clone)]
pub struct RmvReader {
    path: PathBuf,
}

impl RmvReader {
    /// Create a reader for an existing RMV file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = require_file(path.as_ref())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Read the file and drive the adapter with its content.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        let mut lines = open_lines(&self.path)?;

        let version = lines.next_non_comment_line()?;
        if version != RMV_VERSION_1 {
            return Err(DatasetError::UnsupportedVersion {
                path: self.path.clone(),
                found: version,
            });
        }

        let base = parent_dir(&self.path);

        // textures
        let num_textures: usize = lines.next_scalar()?;
        for _ in 0..num_textures {
            let mut tokens = lines.next_tokens(FIELD_DELIMITERS)?;
            let id = tokens.next_token()?;
            let file_name = resolve(base, tokens.next_str()?);
            let width = tokens.next_token()?;
            let height = tokens.next_token()?;
            let position = tokens.next_vec3()?;
            let direction = tokens.next_vec3()?;

            adapter.on_texture(&Texture {
                id,
                file_name,
                width,
                height,
                position,
                direction,
                projection: CameraProjection::identity(),
                offset_uv: [0.0; 2],
            });
        }

        // points
        let num_points: usize = lines.next_scalar()?;
        let mut tex_coords: Vec<(u32, f64, f64)> = Vec::new();
        for _ in 0..num_points {
            let mut tokens = lines.next_tokens(FIELD_DELIMITERS)?;
            let [x, y, z] = tokens.next_vec3()?;
            let [r, g, b] = tokens.next_vec3()?;
            tokens.skip()?; // confidence

            let num_coords: usize = tokens.next_token()?;
            tex_coords.clear();
            for _ in 0..num_coords {
                tex_coords.push((
                    tokens.next_token()?,
                    tokens.next_token()?,
                    tokens.next_token()?,
                ));
            }

            adapter.on_begin_point();
            adapter.on_point_position(x, y, z);
            adapter.on_point_colour(r, g, b);
            for &(id, u, v) in &tex_coords {
                adapter.on_point_tex_coord(id, u, v);
            }
            adapter.on_end_point();
        }

        log::info!(
            "Read {} textures and {} points from {}",
            num_textures,
            num_points,
            self.path.display()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pointcloud::TexturedPointCloud, tokens::TokenError};

    const SAMPLE: &str = "RMV_1\n\n2\n0;img0.jpg;640;480;0;0;0;0;0;1\n# second camera\n5;sub/img1.jpg;320;240;1;2;3;0;1;0\n\n2\n0.5;1.5;2.5;1;0.5;0;0.9;2;0;10;20;5;30.5;40\n-1;-2;-3;0;0;0;0;0\n";

    #[test]
    fn test_read_rmv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.rmv");
        std::fs::write(&path, SAMPLE)?;

        let mut cloud = TexturedPointCloud::default();
        RmvReader::open(&path)?.load(&mut cloud)?;

        assert_eq!(cloud.textures().len(), 2);
        let t1 = &cloud.textures()[1];
        assert_eq!(t1.id, 5);
        assert_eq!(t1.file_name, dir.path().join("sub").join("img1.jpg"));
        assert_eq!((t1.width, t1.height), (320, 240));
        assert_eq!(t1.position, [1.0, 2.0, 3.0]);
        assert_eq!(t1.direction, [0.0, 1.0, 0.0]);
        assert_eq!(t1.projection, CameraProjection::identity());

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[0], [0.5, 1.5, 2.5]);
        assert_eq!(cloud.colors()[0], [1.0, 0.5, 0.0]);
        assert_eq!(
            cloud.tex_coords()[0],
            vec![(0, 10.0, 20.0), (5, 30.5, 40.0)]
        );
        // confidence is not part of the event stream
        assert_eq!(cloud.confidences()[0], 0.0);
        assert!(cloud.tex_coords()[1].is_empty());
        Ok(())
    }

    #[test]
    fn test_read_rmv_wrong_version() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.rmv");
        std::fs::write(&path, "RMV_2\n0\n0\n")?;

        let res = RmvReader::open(&path)?.load(&mut TexturedPointCloud::default());
        assert!(matches!(
            res,
            Err(DatasetError::UnsupportedVersion { found, .. }) if found == "RMV_2"
        ));
        Ok(())
    }

    #[test]
    fn test_read_rmv_missing_file() {
        assert!(matches!(
            RmvReader::open("/does/not/exist.rmv"),
            Err(DatasetError::FileDoesNotExist(_))
        ));
    }

    #[test]
    fn test_read_rmv_bad_field() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.rmv");
        std::fs::write(&path, "RMV_1\n0\n1\n1;2;x;0;0;0;0;0\n")?;

        let mut cloud = TexturedPointCloud::default();
        let res = RmvReader::open(&path)?.load(&mut cloud);
        assert!(matches!(
            res,
            Err(DatasetError::Token(TokenError::InvalidField { .. }))
        ));
        // a point is only emitted once its whole line decoded
        assert!(cloud.is_empty());
        Ok(())
    }

    #[test]
    fn test_read_rmv_truncated() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.rmv");
        std::fs::write(&path, "RMV_1\n0\n3\n1;2;3;0;0;0;0;0\n")?;

        let res = RmvReader::open(&path)?.load(&mut TexturedPointCloud::default());
        assert!(matches!(res, Err(DatasetError::Token(TokenError::UnexpectedEof(_)))));
        Ok(())
    }
}
