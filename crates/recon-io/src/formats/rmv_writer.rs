use std::{
    io::Write,
    path::{Path, PathBuf},
};

use super::{RMV_DELIMITER, RMV_VERSION_1};
use crate::{adapter::OutputAdapter, error::DatasetError, tokens::FieldLine};

/// Encode a reconstruction as RMV.
///
/// Floats are written in their shortest round-trip form, so reading the output back
/// reproduces every value exactly.
///
/// # Arguments
///
/// * `writer` - The destination of the encoded text.
/// * `source` - The reconstruction to encode.
pub fn write_rmv<W, S>(writer: &mut W, source: &mut S) -> Result<(), DatasetError>
where
    W: Write + ?Sized,
    S: OutputAdapter + ?Sized,
{
    let text = render(source)?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}

fn render<S: OutputAdapter + ?Sized>(source: &mut S) -> Result<String, DatasetError> {
    let mut out = String::new();
    push_line(&mut out, RMV_VERSION_1);
    push_line(&mut out, "");

    let num_textures = source.count_textures();
    push_line(&mut out, &num_textures.to_string());
    for _ in 0..num_textures {
        source.fetch_next_texture();
        let file_name = checked_file_name(source.texture_file_name())?;
        let (width, height) = source.texture_size();

        let mut line = FieldLine::new(RMV_DELIMITER);
        line.push(source.texture_id())
            .push(file_name)
            .push(width)
            .push(height)
            .push_vec3(&source.texture_position())
            .push_vec3(&source.texture_direction());
        push_line(&mut out, line.as_str());
    }
    push_line(&mut out, "");

    let num_points = source.count_points();
    push_line(&mut out, &num_points.to_string());
    for _ in 0..num_points {
        source.fetch_next_point();

        let mut line = FieldLine::new(RMV_DELIMITER);
        line.push_vec3(&source.point_position())
            .push_vec3(&source.point_colour())
            .push(source.point_confidence());

        let num_coords = source.count_point_texture_coordinates();
        line.push(num_coords);
        for _ in 0..num_coords {
            source.fetch_next_point_texture_coordinate();
            let (id, u, v) = source.point_texture_coordinate();
            line.push(id).push(u).push(v);
        }
        push_line(&mut out, line.as_str());
    }

    log::debug!("Encoded {num_textures} textures and {num_points} points as RMV");
    Ok(out)
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// A file name that reads back as a single RMV field.
fn checked_file_name(path: &Path) -> Result<&str, DatasetError> {
    let name = path
        .to_str()
        .ok_or_else(|| DatasetError::InvalidField(format!("non UTF-8 file name {path:?}")))?;
    if name.trim().is_empty() || name.contains([RMV_DELIMITER, '\n', '\r']) {
        return Err(DatasetError::InvalidField(format!(
            "file name {name:?} cannot be stored in RMV"
        )));
    }
    Ok(name)
}

/// Writer of RMV files.
#[derive(Debug, Clone)]
pub struct RmvWriter {
    path: PathBuf,
}

impl RmvWriter {
    /// Create a writer for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode the reconstruction and write the file.
    ///
    /// Missing parent directories are created. Nothing is written if encoding fails.
    pub fn write<S: OutputAdapter + ?Sized>(&self, source: &mut S) -> Result<(), DatasetError> {
        let text = render(source)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, text)?;

        log::info!("Wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapter::InputAdapter, adapter::Texture, pointcloud::TexturedPointCloud};

    fn sample_cloud() -> TexturedPointCloud {
        let mut cloud = TexturedPointCloud::default();
        let mut texture = Texture::new(3, "/data/img 3.jpg");
        texture.width = 640;
        texture.height = 480;
        texture.position = [0.1, -2.0, 3.5];
        texture.direction = [0.0, 0.0, 1.0];
        cloud.on_texture(&texture);

        cloud.on_begin_point();
        cloud.on_point_position(1.0, 2.0, 3.0);
        cloud.on_point_colour(1.0, 0.5, 0.25);
        cloud.on_point_tex_coord(3, 12.5, 7.0);
        cloud.on_end_point();
        cloud
    }

    #[test]
    fn test_write_rmv_layout() -> Result<(), DatasetError> {
        let cloud = sample_cloud();
        let mut buffer = Vec::new();
        write_rmv(&mut buffer, &mut cloud.source())?;

        let text = String::from_utf8_lossy(&buffer);
        assert_eq!(
            text,
            "RMV_1\n\n1\n3;/data/img 3.jpg;640;480;0.1;-2;3.5;0;0;1\n\n1\n1;2;3;1;0.5;0.25;0;1;3;12.5;7\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_rmv_empty() -> Result<(), DatasetError> {
        let cloud = TexturedPointCloud::default();
        let mut buffer = Vec::new();
        write_rmv(&mut buffer, &mut cloud.source())?;
        assert_eq!(buffer, b"RMV_1\n\n0\n\n0\n");
        Ok(())
    }

    #[test]
    fn test_write_rmv_rejects_delimiter_in_file_name() {
        let mut cloud = TexturedPointCloud::default();
        cloud.on_texture(&Texture::new(0, "bad;name.jpg"));
        let mut buffer = Vec::new();
        let res = write_rmv(&mut buffer, &mut cloud.source());
        assert!(matches!(res, Err(DatasetError::InvalidField(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_write_rmv_rejects_empty_file_name() {
        for name in ["", "  "] {
            let mut cloud = TexturedPointCloud::default();
            cloud.on_texture(&Texture::new(0, name));
            let mut buffer = Vec::new();
            let res = write_rmv(&mut buffer, &mut cloud.source());
            assert!(matches!(res, Err(DatasetError::InvalidField(_))));
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_rmv_writer_creates_parent_dirs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("out").join("scene.rmv");
        let cloud = sample_cloud();

        RmvWriter::new(&path).write(&mut cloud.source())?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("RMV_1\n"));
        Ok(())
    }

    #[test]
    fn test_rmv_writer_no_partial_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.rmv");
        let mut cloud = TexturedPointCloud::default();
        cloud.on_texture(&Texture::new(0, "line\nbreak.jpg"));

        assert!(RmvWriter::new(&path).write(&mut cloud.source()).is_err());
        assert!(!path.exists());
        Ok(())
    }
}
