use std::path::{Path, PathBuf};

use recon_3d::{camera::CameraProjection, projection::ProjectionMatrix};

use super::{
    open_lines,
    patches::{open_patch_pairs, PatchPair},
    require_dir, require_file, resolve, WHITESPACE,
};
use crate::{
    adapter::{InputAdapter, Texture},
    error::DatasetError,
};

const CONTOUR_MAGIC: &str = "CONTOUR";

/// Reader of the output directory of multi view stereo tools.
///
/// The dataset root holds a `00` directory with the camera list `cameras.txt`, the
/// images in `visualize`, one projection matrix per image in `txt` and the patch
/// pairs in `models`. Texture coordinates are not stored; they are computed by
/// reprojecting every point into each image it is visible in.
#[derive(Debug, Clone)]
pub struct CmvsReader {
    cameras_path: PathBuf,
    models_dir: PathBuf,
    images_dir: PathBuf,
    matrices_dir: PathBuf,
}

/// A camera of the cameras file with its projection matrix.
struct Camera {
    texture: Texture,
    matrix: ProjectionMatrix,
}

impl Camera {
    /// Reproject a point into the image of the camera.
    fn tex_coord(&self, position: &[f64; 3]) -> Result<(f64, f64), DatasetError> {
        match self.matrix.reproject(position) {
            Ok([u, v]) => Ok((u, v)),
            Err(source) => Err(DatasetError::Projection {
                texture_id: self.texture.id,
                source,
            }),
        }
    }
}

impl CmvsReader {
    /// Create a reader for a dataset root, checking the expected layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let root = require_dir(path.as_ref())?.join("00");
        let reader = Self {
            cameras_path: root.join("cameras.txt"),
            models_dir: root.join("models"),
            images_dir: root.join("visualize"),
            matrices_dir: root.join("txt"),
        };

        require_file(&reader.cameras_path)?;
        require_dir(&reader.models_dir)?;
        require_dir(&reader.images_dir)?;
        require_dir(&reader.matrices_dir)?;

        Ok(reader)
    }

    /// Read the dataset and drive the adapter with its content.
    ///
    /// The cameras and the headers of all patch pairs are validated before the first
    /// event is emitted.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        let cameras = self.read_cameras()?;
        let pairs = open_patch_pairs(&self.models_dir)?;
        let num_points: usize = pairs.iter().map(PatchPair::count).sum();

        for camera in &cameras {
            adapter.on_texture(&camera.texture);
        }

        for pair in pairs {
            pair.emit_points(adapter, |id, position| {
                cameras
                    .get(id as usize)
                    .ok_or(DatasetError::UnknownTexture(id))?
                    .tex_coord(position)
            })?;
        }

        log::info!(
            "Read {} cameras and {} points from {}",
            cameras.len(),
            num_points,
            self.models_dir.display()
        );

        Ok(())
    }

    fn read_cameras(&self) -> Result<Vec<Camera>, DatasetError> {
        let mut lines = open_lines(&self.cameras_path)?;

        let num_cameras: usize = lines.next_scalar()?;
        let mut cameras = Vec::new();
        for id in 0..num_cameras {
            let image_name = lines.next_non_comment_line()?;
            lines.skip_line()?; // focal length
            lines.skip_line()?; // principal point
            lines.skip_line()?; // translation
            let position = lines.next_tokens(WHITESPACE)?.next_vec3()?;
            lines.skip_line()?; // axis angle
            lines.skip_line()?; // quaternion
            lines.skip_line()?; // rotation, first row
            lines.skip_line()?; // rotation, second row
            let direction = lines.next_tokens(WHITESPACE)?.next_vec3()?;

            let file_name = resolve(&self.images_dir, &image_name);
            let matrix = self.read_projection_matrix(&file_name)?;

            log::debug!("Camera {id}: {}", file_name.display());

            cameras.push(Camera {
                texture: Texture {
                    id: id as u32,
                    file_name,
                    width: 0,
                    height: 0,
                    position,
                    direction,
                    projection: CameraProjection::from_projection_matrix(&matrix),
                    offset_uv: [0.0; 2],
                },
                matrix,
            });
        }
        Ok(cameras)
    }

    /// Read the `txt/<image stem>.txt` matrix of an image.
    fn read_projection_matrix(&self, image: &Path) -> Result<ProjectionMatrix, DatasetError> {
        let mut matrix_name = image.file_stem().unwrap_or_default().to_os_string();
        matrix_name.push(".txt");
        let path = self.matrices_dir.join(matrix_name);

        let mut lines = open_lines(&path)?;
        let magic = lines.next_non_comment_line()?;
        if magic != CONTOUR_MAGIC {
            return Err(DatasetError::InvalidMagic {
                path,
                expected: CONTOUR_MAGIC,
                found: magic,
            });
        }

        let mut rows = [[0.0; 4]; 3];
        for row in rows.iter_mut() {
            let mut tokens = lines.next_tokens(WHITESPACE)?;
            for value in row.iter_mut() {
                *value = tokens.next_token()?;
            }
        }
        Ok(ProjectionMatrix::new(rows))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    use crate::formats::patches::fixtures::{write_patch_pair, FixturePoint};

    /// A camera of the cameras file.
    pub(crate) struct FixtureCamera {
        pub image: &'static str,
        pub position: [f64; 3],
        pub direction: [f64; 3],
        pub matrix: [[f64; 4]; 3],
    }

    /// Write a complete dataset under `root`.
    pub(crate) fn write_cmvs_dataset(
        root: &Path,
        cameras: &[FixtureCamera],
        points: &[FixturePoint],
    ) -> std::io::Result<()> {
        let base = root.join("00");
        for dir in ["models", "visualize", "txt"] {
            std::fs::create_dir_all(base.join(dir))?;
        }

        let mut text = format!("# cameras\n{}\n", cameras.len());
        for c in cameras {
            let [px, py, pz] = c.position;
            let [dx, dy, dz] = c.direction;
            text.push_str(&format!(
                "{}\n1000\n320 240\n0 0 0\n{px} {py} {pz}\n0 0 0\n1 0 0 0\n1 0 0\n0 1 0\n{dx} {dy} {dz}\n",
                c.image
            ));

            let stem = c.image.trim_end_matches(".jpg");
            let rows = c
                .matrix
                .iter()
                .map(|r| format!("{} {} {} {}", r[0], r[1], r[2], r[3]))
                .collect::<Vec<_>>();
            std::fs::write(
                base.join("txt").join(format!("{stem}.txt")),
                format!("CONTOUR\n{}\n", rows.join("\n")),
            )?;
        }
        std::fs::write(base.join("cameras.txt"), text)?;

        write_patch_pair(&base.join("models"), "option-0000", points)
    }
}
