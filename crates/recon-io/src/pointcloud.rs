use std::path::Path;

use crate::adapter::{InputAdapter, OutputAdapter, Texture};

/// A texture coordinate as `(texture id, u, v)`.
pub type TexCoord = (u32, f64, f64);

/// A point cloud with the textures it was reconstructed from.
///
/// Collects the events of a reader through [`InputAdapter`] and hands them to a writer
/// through [`TexturedPointCloud::source`]. Per point attributes are stored in parallel
/// vectors of equal length.
#[derive(Debug, Clone, Default)]
pub struct TexturedPointCloud {
    // The registered textures in registration order.
    textures: Vec<Texture>,
    // The positions of the points.
    points: Vec<[f64; 3]>,
    // The colors of the points, each channel in [0, 1].
    colors: Vec<[f64; 3]>,
    // The normals of the points, zero when not provided.
    normals: Vec<[f64; 3]>,
    // The confidences of the points, zero when not provided.
    confidences: Vec<f64>,
    // The texture coordinates of each point.
    tex_coords: Vec<Vec<TexCoord>>,
    // Whether a point is open between begin and end events.
    in_point: bool,
}

impl TexturedPointCloud {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a complete point.
    pub fn push_point(
        &mut self,
        position: [f64; 3],
        normal: [f64; 3],
        colour: [f64; 3],
        confidence: f64,
        tex_coords: Vec<TexCoord>,
    ) {
        self.points.push(position);
        self.normals.push(normal);
        self.colors.push(colour);
        self.confidences.push(confidence);
        self.tex_coords.push(tex_coords);
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the textures of the point cloud.
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Look up a texture by id.
    pub fn texture(&self, id: u32) -> Option<&Texture> {
        self.textures.iter().find(|t| t.id == id)
    }

    /// Get as reference the positions of the points.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points.
    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    /// Get as reference the normals of the points.
    pub fn normals(&self) -> &[[f64; 3]] {
        &self.normals
    }

    /// Get as reference the confidences of the points.
    pub fn confidences(&self) -> &[f64] {
        &self.confidences
    }

    /// Get as reference the texture coordinates of the points.
    pub fn tex_coords(&self) -> &[Vec<TexCoord>] {
        &self.tex_coords
    }

    /// A cursor over the point cloud for writers.
    pub fn source(&self) -> PointCloudSource<'_> {
        PointCloudSource {
            cloud: self,
            next_texture: 0,
            next_point: 0,
            next_tex_coord: 0,
        }
    }
}

impl InputAdapter for TexturedPointCloud {
    fn on_texture(&mut self, texture: &Texture) {
        self.textures.push(texture.clone());
    }

    fn on_begin_point(&mut self) {
        debug_assert!(!self.in_point, "point started twice");
        self.in_point = true;
        self.push_point([0.0; 3], [0.0; 3], [0.0; 3], 0.0, Vec::new());
    }

    fn on_point_position(&mut self, x: f64, y: f64, z: f64) {
        debug_assert!(self.in_point, "position outside of a point");
        if let Some(point) = self.points.last_mut() {
            *point = [x, y, z];
        }
    }

    fn on_point_normal(&mut self, x: f64, y: f64, z: f64) {
        debug_assert!(self.in_point, "normal outside of a point");
        if let Some(normal) = self.normals.last_mut() {
            *normal = [x, y, z];
        }
    }

    fn on_point_colour(&mut self, r: f64, g: f64, b: f64) {
        debug_assert!(self.in_point, "colour outside of a point");
        if let Some(colour) = self.colors.last_mut() {
            *colour = [r, g, b];
        }
    }

    fn on_point_tex_coord(&mut self, id: u32, u: f64, v: f64) {
        debug_assert!(self.in_point, "texture coordinate outside of a point");
        if let Some(coords) = self.tex_coords.last_mut() {
            coords.push((id, u, v));
        }
    }

    fn on_end_point(&mut self) {
        debug_assert!(self.in_point, "point ended twice");
        self.in_point = false;
    }
}

/// Read cursors over a [`TexturedPointCloud`].
///
/// # Panics
///
/// Reading the fields of an item before fetching it panics.
#[derive(Debug, Clone)]
pub struct PointCloudSource<'a> {
    cloud: &'a TexturedPointCloud,
    next_texture: usize,
    next_point: usize,
    next_tex_coord: usize,
}

impl PointCloudSource<'_> {
    fn texture(&self) -> &Texture {
        &self.cloud.textures[self.next_texture - 1]
    }

    fn point_index(&self) -> usize {
        self.next_point - 1
    }
}

impl OutputAdapter for PointCloudSource<'_> {
    fn count_textures(&mut self) -> usize {
        self.cloud.textures.len()
    }

    fn fetch_next_texture(&mut self) {
        self.next_texture += 1;
    }

    fn texture_id(&self) -> u32 {
        self.texture().id
    }

    fn texture_file_name(&self) -> &Path {
        &self.texture().file_name
    }

    fn texture_size(&self) -> (u32, u32) {
        let texture = self.texture();
        (texture.width, texture.height)
    }

    fn texture_position(&self) -> [f64; 3] {
        self.texture().position
    }

    fn texture_direction(&self) -> [f64; 3] {
        self.texture().direction
    }

    fn count_points(&mut self) -> usize {
        self.cloud.len()
    }

    fn fetch_next_point(&mut self) {
        self.next_point += 1;
        self.next_tex_coord = 0;
    }

    fn point_position(&self) -> [f64; 3] {
        self.cloud.points[self.point_index()]
    }

    fn point_colour(&self) -> [f64; 3] {
        self.cloud.colors[self.point_index()]
    }

    fn point_confidence(&self) -> f64 {
        self.cloud.confidences[self.point_index()]
    }

    fn count_point_texture_coordinates(&mut self) -> usize {
        self.cloud.tex_coords[self.point_index()].len()
    }

    fn fetch_next_point_texture_coordinate(&mut self) {
        self.next_tex_coord += 1;
    }

    fn point_texture_coordinate(&self) -> (u32, f64, f64) {
        let coords = &self.cloud.tex_coords[self.point_index()];
        coords[self.next_tex_coord - 1]
    }
}
