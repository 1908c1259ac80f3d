use std::path::{Path, PathBuf};

use recon_3d::camera::{nvm_view_direction, CameraProjection};

use super::{open_lines, parent_dir, require_file, resolve, WHITESPACE};
use crate::{
    adapter::{InputAdapter, Texture},
    error::DatasetError,
    jpeg::read_jpeg_size,
};

const NVM_VERSION_3: &str = "NVM_V3";

/// Reader of NVM files written by structure from motion tools.
///
/// Each camera line holds the image file, the focal length, the rotation quaternion
/// `w x y z` and the camera center. Image sizes are not stored in the file and are
/// recovered from the JPEG headers, so every image must exist next to the file.
#[derive(Debug, Clone)]
pub struct NvmReader {
    path: PathBuf,
}

impl NvmReader {
    /// Create a reader for an existing NVM file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = require_file(path.as_ref())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Read the file and drive the adapter with its content.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        let mut lines = open_lines(&self.path)?;

        // the version line may carry extra tags such as `FixedK`
        let version = lines.next_non_comment_line()?;
        if !version.starts_with(NVM_VERSION_3) {
            return Err(DatasetError::UnsupportedVersion {
                path: self.path.clone(),
                found: version,
            });
        }

        let base = parent_dir(&self.path);

        // cameras, the id of a texture is its index in the file
        let num_textures: usize = lines.next_scalar()?;
        let mut image_centers: Vec<[f64; 2]> = Vec::new();
        for id in 0..num_textures {
            let mut tokens = lines.next_tokens(WHITESPACE)?;
            let file_name = resolve(base, tokens.next_str()?);
            let focal: f64 = tokens.next_token()?;
            let quaternion = [
                tokens.next_token()?,
                tokens.next_token()?,
                tokens.next_token()?,
                tokens.next_token()?,
            ];
            let center = tokens.next_vec3()?;

            let size = read_jpeg_size(&file_name)?;
            let offset_uv = [0.5 * size.width as f64, 0.5 * size.height as f64];
            image_centers.push(offset_uv);

            log::debug!(
                "Camera {id}: {} ({}x{})",
                file_name.display(),
                size.width,
                size.height
            );

            adapter.on_texture(&Texture {
                id: id as u32,
                file_name,
                width: size.width,
                height: size.height,
                position: center,
                direction: nvm_view_direction(&quaternion),
                projection: CameraProjection::from_focal_quaternion(focal, &quaternion, &center),
                offset_uv,
            });
        }

        // points, measurements are relative to the image center
        let num_points: usize = lines.next_scalar()?;
        let mut tex_coords: Vec<(u32, f64, f64)> = Vec::new();
        for _ in 0..num_points {
            let mut tokens = lines.next_tokens(WHITESPACE)?;
            let [x, y, z] = tokens.next_vec3()?;
            let [r, g, b] = tokens.next_vec3()?;

            let num_measurements: usize = tokens.next_token()?;
            tex_coords.clear();
            for _ in 0..num_measurements {
                let id: u32 = tokens.next_token()?;
                tokens.skip()?; // feature index
                let u: f64 = tokens.next_token()?;
                let v: f64 = tokens.next_token()?;

                let [cu, cv] = image_centers
                    .get(id as usize)
                    .ok_or(DatasetError::UnknownTexture(id))?;
                tex_coords.push((id, u + cu, v + cv));
            }

            adapter.on_begin_point();
            adapter.on_point_position(x, y, z);
            adapter.on_point_colour(r / 255.0, g / 255.0, b / 255.0);
            for &(id, u, v) in &tex_coords {
                adapter.on_point_tex_coord(id, u, v);
            }
            adapter.on_end_point();
        }

        log::info!(
            "Read {} cameras and {} points from {}",
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
    use crate::{jpeg::jfif_header_bytes, pointcloud::TexturedPointCloud};
    use approx::assert_relative_eq;

    fn write_fixture(dir: &Path, nvm: &str) -> Result<PathBuf, std::io::Error> {
        std::fs::write(dir.join("a.jpg"), jfif_header_bytes(640, 480))?;
        std::fs::write(dir.join("b.jpg"), jfif_header_bytes(320, 200))?;
        let path = dir.join("scene.nvm");
        std::fs::write(&path, nvm)?;
        Ok(path)
    }

    const SAMPLE: &str = "NVM_V3\n\n2\na.jpg 800 1 0 0 0 1 2 3 0 0\nb.jpg 500 0 0 0 1 0 0 0 0 0\n\n2\n0 0 10 255 0 51 2 0 7 -20 15.5 1 3 0 0\n1 1 1 0 0 0 0\n\n0\n";

    #[test]
    fn test_read_nvm() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(dir.path(), SAMPLE)?;

        let mut cloud = TexturedPointCloud::default();
        NvmReader::open(&path)?.load(&mut cloud)?;

        let textures = cloud.textures();
        assert_eq!(textures.len(), 2);

        let a = &textures[0];
        assert_eq!(a.id, 0);
        assert_eq!(a.file_name, dir.path().join("a.jpg"));
        assert_eq!((a.width, a.height), (640, 480));
        assert_eq!(a.position, [1.0, 2.0, 3.0]);
        assert_eq!(a.direction, [0.0, 0.0, 1.0]);
        assert_eq!(a.offset_uv, [320.0, 240.0]);
        assert_eq!(
            a.projection.linear,
            [[800.0, 0.0, 0.0], [0.0, 800.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_eq!(a.projection.offset, [800.0, 1600.0, 3.0]);

        // half turn about z
        let b = &textures[1];
        assert_eq!(b.id, 1);
        assert_eq!(b.offset_uv, [160.0, 100.0]);
        assert_relative_eq!(b.projection.linear[0][0], -500.0);
        assert_relative_eq!(b.projection.linear[1][1], -500.0);
        assert_relative_eq!(b.projection.linear[2][2], 1.0);

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[0], [0.0, 0.0, 10.0]);
        assert_relative_eq!(cloud.colors()[0][0], 1.0);
        assert_relative_eq!(cloud.colors()[0][1], 0.0);
        assert_relative_eq!(cloud.colors()[0][2], 0.2);
        assert_eq!(
            cloud.tex_coords()[0],
            vec![(0, 300.0, 255.5), (1, 160.0, 100.0)]
        );
        assert!(cloud.tex_coords()[1].is_empty());
        Ok(())
    }

    #[test]
    fn test_read_nvm_invalid_version() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(dir.path(), "NVM_V2\n0\n0\n")?;
        let res = NvmReader::open(&path)?.load(&mut TexturedPointCloud::default());
        assert!(matches!(res, Err(DatasetError::UnsupportedVersion { .. })));
        Ok(())
    }

    #[test]
    fn test_read_nvm_oversized_camera_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(dir.path(), "NVM_V3\n18446744073709551615\n")?;
        let mut cloud = TexturedPointCloud::default();
        let res = NvmReader::open(&path)?.load(&mut cloud);
        assert!(matches!(res, Err(DatasetError::Token(_))));
        assert!(cloud.textures().is_empty());
        Ok(())
    }

    #[test]
    fn test_read_nvm_unknown_texture() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(
            dir.path(),
            "NVM_V3\n1\na.jpg 800 1 0 0 0 0 0 0 0 0\n1\n0 0 1 0 0 0 1 4 0 1 1\n",
        )?;
        let mut cloud = TexturedPointCloud::default();
        let res = NvmReader::open(&path)?.load(&mut cloud);
        assert!(matches!(res, Err(DatasetError::UnknownTexture(4))));
        assert!(cloud.is_empty());
        Ok(())
    }

    #[test]
    fn test_read_nvm_missing_image() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(dir.path(), "NVM_V3\n1\nmissing.jpg 800 1 0 0 0 0 0 0\n0\n")?;
        let res = NvmReader::open(&path)?.load(&mut TexturedPointCloud::default());
        assert!(matches!(res, Err(DatasetError::FileDoesNotExist(_))));
        Ok(())
    }

    #[test]
    fn test_read_nvm_bad_image() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(dir.path(), "NVM_V3\n1\nc.jpg 800 1 0 0 0 0 0 0\n0\n")?;
        std::fs::write(dir.path().join("c.jpg"), b"\x89PNG\r\n\x1a\n")?;
        let res = NvmReader::open(&path)?.load(&mut TexturedPointCloud::default());
        assert!(matches!(res, Err(DatasetError::JpegHeader { .. })));
        Ok(())
    }
}
