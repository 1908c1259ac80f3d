use std::path::{Path, PathBuf};

use recon_3d::camera::CameraProjection;

/// A camera registered with the reconstruction, named after the image it textures.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Texture id, unique within a dataset.
    pub id: u32,
    /// Path of the source image.
    pub file_name: PathBuf,
    /// Image width in pixels, 0 when unknown.
    pub width: u32,
    /// Image height in pixels, 0 when unknown.
    pub height: u32,
    /// Camera position.
    pub position: [f64; 3],
    /// Camera viewing direction, not necessarily normalized.
    pub direction: [f64; 3],
    /// Projection of world points onto the image.
    pub projection: CameraProjection,
    /// Offset of the image origin added to projected coordinates, in pixels.
    pub offset_uv: [f64; 2],
}

impl Texture {
    /// Create a texture with an identity projection and no image offset.
    pub fn new(id: u32, file_name: impl Into<PathBuf>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            width: 0,
            height: 0,
            position: [0.0; 3],
            direction: [0.0; 3],
            projection: CameraProjection::identity(),
            offset_uv: [0.0; 2],
        }
    }
}

/// Receives the canonical events produced while reading a dataset.
///
/// Textures may be registered at any time but readers always register a texture
/// before the first point referencing it. Points arrive strictly bracketed:
///
/// `on_begin_point`, one `on_point_position`, at most one `on_point_normal`,
/// one `on_point_colour`, any number of `on_point_tex_coord`, `on_end_point`.
pub trait InputAdapter {
    /// Register a texture.
    fn on_texture(&mut self, texture: &Texture);

    /// Start a new point.
    fn on_begin_point(&mut self);

    /// Set the position of the current point.
    fn on_point_position(&mut self, x: f64, y: f64, z: f64);

    /// Set the normal of the current point.
    fn on_point_normal(&mut self, x: f64, y: f64, z: f64);

    /// Set the colour of the current point, each channel in `[0, 1]`.
    fn on_point_colour(&mut self, r: f64, g: f64, b: f64);

    /// Add a texture coordinate of the current point.
    fn on_point_tex_coord(&mut self, id: u32, u: f64, v: f64);

    /// Finish the current point.
    fn on_end_point(&mut self);
}

/// Supplies a reconstruction to a writer through fetch-then-read cursors.
///
/// A writer calls `fetch_next_*` exactly once before reading the fields of the next
/// item, and reads exactly `count_*` items of each kind. Reading before the first
/// fetch is a contract violation.
pub trait OutputAdapter {
    /// Number of textures.
    fn count_textures(&mut self) -> usize;

    /// Advance to the next texture.
    fn fetch_next_texture(&mut self);

    /// Id of the current texture.
    fn texture_id(&self) -> u32;

    /// Image file of the current texture.
    fn texture_file_name(&self) -> &Path;

    /// Image size `(width, height)` of the current texture.
    fn texture_size(&self) -> (u32, u32);

    /// Camera position of the current texture.
    fn texture_position(&self) -> [f64; 3];

    /// Camera direction of the current texture.
    fn texture_direction(&self) -> [f64; 3];

    /// Number of points.
    fn count_points(&mut self) -> usize;

    /// Advance to the next point.
    fn fetch_next_point(&mut self);

    /// Position of the current point.
    fn point_position(&self) -> [f64; 3];

    /// Colour of the current point.
    fn point_colour(&self) -> [f64; 3];

    /// Confidence of the current point.
    fn point_confidence(&self) -> f64;

    /// Number of texture coordinates of the current point.
    fn count_point_texture_coordinates(&mut self) -> usize;

    /// Advance to the next texture coordinate of the current point.
    fn fetch_next_point_texture_coordinate(&mut self);

    /// Current texture coordinate as `(texture id, u, v)`.
    fn point_texture_coordinate(&self) -> (u32, f64, f64);
}
