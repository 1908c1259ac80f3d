use std::path::{Path, PathBuf};

use super::{open_lines, FileLines, WHITESPACE};
use crate::{adapter::InputAdapter, error::DatasetError};

const PATCHES_MAGIC: &str = "PATCHES";
const PATCH_RECORD_MAGIC: &str = "PATCHS";
const PATCH_EXTENSION: &str = "patch";

/// Collect the patch files of a directory, sorted by file name.
pub(crate) fn find_patch_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == PATCH_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Check if a directory holds at least one patch file.
pub(crate) fn has_patch_files(dir: &Path) -> bool {
    find_patch_files(dir).is_ok_and(|files| !files.is_empty())
}

/// A validated patch file and the PLY file of its points.
///
/// Only the path and the point count are kept, the files are reopened when the points
/// are emitted.
pub(crate) struct PatchPair {
    patch_path: PathBuf,
    count: usize,
}

/// The two files of a pair, both positioned at the first record.
struct PatchReaders {
    patches: FileLines,
    points: FileLines,
    count: usize,
}

impl PatchReaders {
    /// Open a patch file and its `.ply` sibling, validating both headers.
    fn open(patch_path: &Path) -> Result<Self, DatasetError> {
        let points_path = patch_path.with_extension("ply");

        let mut patches = open_lines(patch_path)?;
        let magic = patches.next_non_comment_line()?;
        if magic != PATCHES_MAGIC {
            return Err(DatasetError::InvalidMagic {
                path: patch_path.to_path_buf(),
                expected: PATCHES_MAGIC,
                found: magic,
            });
        }
        let count: usize = patches.next_scalar()?;

        let mut points = open_lines(&points_path)?;
        let magic = points.next_non_comment_line()?;
        if magic != "ply" {
            return Err(DatasetError::InvalidMagic {
                path: points_path,
                expected: "ply",
                found: magic,
            });
        }
        points.skip_line()?; // format

        let mut tokens = points.next_tokens(WHITESPACE)?;
        let element = tokens.next_str()?.to_string();
        let name = tokens.next_str()?.to_string();
        if element != "element" || name != "vertex" {
            return Err(DatasetError::InvalidMagic {
                path: points_path,
                expected: "element vertex",
                found: format!("{element} {name}"),
            });
        }
        let num_points: usize = tokens.next_token()?;
        if num_points != count {
            return Err(DatasetError::CountMismatch {
                path: patch_path.to_path_buf(),
                declared: count,
                found: num_points,
            });
        }
        points.skip_until("end_header")?;

        Ok(Self {
            patches,
            points,
            count,
        })
    }
}

impl PatchPair {
    /// Validate the headers of a patch file and its `.ply` sibling.
    pub(crate) fn open(patch_path: &Path) -> Result<Self, DatasetError> {
        let count = PatchReaders::open(patch_path)?.count;
        log::debug!("{}: {count} patches", patch_path.display());
        Ok(Self {
            patch_path: patch_path.to_path_buf(),
            count,
        })
    }

    /// Number of points in the pair.
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Emit every point of the pair.
    ///
    /// # Arguments
    ///
    /// * `adapter` - Receives the points.
    /// * `tex_coord` - Maps a visible texture id and the point position to `(u, v)`.
    pub(crate) fn emit_points<A, F>(
        &self,
        adapter: &mut A,
        mut tex_coord: F,
    ) -> Result<(), DatasetError>
    where
        A: InputAdapter + ?Sized,
        F: FnMut(u32, &[f64; 3]) -> Result<(f64, f64), DatasetError>,
    {
        let PatchReaders {
            mut patches,
            mut points,
            count,
        } = PatchReaders::open(&self.patch_path)?;
        if count != self.count {
            return Err(DatasetError::CountMismatch {
                path: self.patch_path.clone(),
                declared: self.count,
                found: count,
            });
        }

        let mut tex_coords: Vec<(u32, f64, f64)> = Vec::new();
        for _ in 0..count {
            let mut tokens = points.next_tokens(WHITESPACE)?;
            let position = tokens.next_vec3()?;
            let [nx, ny, nz] = tokens.next_vec3()?;
            let [r, g, b] = tokens.next_vec3()?;

            // position, normal and score lines of the patch record are not used
            patches.skip_until(PATCH_RECORD_MAGIC)?;
            patches.skip_line()?;
            patches.skip_line()?;
            patches.skip_line()?;

            let num_visible: usize = patches.next_scalar()?;
            tex_coords.clear();
            if num_visible > 0 {
                let mut ids = patches.next_tokens(WHITESPACE)?;
                for _ in 0..num_visible {
                    let id: u32 = ids.next_token()?;
                    let (u, v) = tex_coord(id, &position)?;
                    tex_coords.push((id, u, v));
                }
            }

            let [x, y, z] = position;
            adapter.on_begin_point();
            adapter.on_point_position(x, y, z);
            adapter.on_point_normal(nx, ny, nz);
            adapter.on_point_colour(r / 255.0, g / 255.0, b / 255.0);
            for &(id, u, v) in &tex_coords {
                adapter.on_point_tex_coord(id, u, v);
            }
            adapter.on_end_point();
        }
        Ok(())
    }
}

/// Validate all patch pairs of a directory before anything is emitted.
pub(crate) fn open_patch_pairs(dir: &Path) -> Result<Vec<PatchPair>, DatasetError> {
    find_patch_files(dir)?
        .iter()
        .map(|path| PatchPair::open(path))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    /// A point with its patch record.
    pub(crate) struct FixturePoint {
        pub position: [f64; 3],
        pub normal: [f64; 3],
        pub colour: [u8; 3],
        pub visible: Vec<u32>,
    }

    /// Write `<stem>.patch` and `<stem>.ply` in the layout of multi view stereo tools.
    pub(crate) fn write_patch_pair(
        dir: &Path,
        stem: &str,
        points: &[FixturePoint],
    ) -> std::io::Result<()> {
        let mut patch = format!("PATCHES\n{}\n", points.len());
        let mut ply = format!(
            "ply\nformat ascii 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nproperty float nx\nproperty float ny\nproperty float nz\nproperty uchar diffuse_red\nproperty uchar diffuse_green\nproperty uchar diffuse_blue\nend_header\n",
            points.len()
        );
        for p in points {
            let [x, y, z] = p.position;
            let [nx, ny, nz] = p.normal;
            let [r, g, b] = p.colour;
            patch.push_str(&format!("PATCHS\n{x} {y} {z} 1\n{nx} {ny} {nz} 0\n0.9 0.1 0.2\n"));
            let ids = p.visible.iter().map(u32::to_string).collect::<Vec<_>>();
            patch.push_str(&format!("{}\n{}\n0\n\n", ids.len(), ids.join(" ")));
            ply.push_str(&format!("{x} {y} {z} {nx} {ny} {nz} {r} {g} {b}\n"));
        }
        std::fs::write(dir.join(format!("{stem}.patch")), patch)?;
        std::fs::write(dir.join(format!("{stem}.ply")), ply)?;
        Ok(())
    }
}
