use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use super::require_file;
use crate::{
    adapter::InputAdapter,
    error::DatasetError,
    ply::{parse_ply, PlyDataType, PlyScalar, PlyVisitor},
};

/// Reader of PLY point clouds.
///
/// Only the `vertex` element is read. Positions and normals default to zero and colours
/// to white when the file does not declare them.
#[derive(Debug, Clone)]
pub struct PlyReader {
    path: PathBuf,
}

impl PlyReader {
    /// Create a reader for an existing PLY file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = require_file(path.as_ref())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Read the file and drive the adapter with its vertices.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut visitor = VertexVisitor::new(adapter);
        parse_ply(&mut reader, &mut visitor)?;

        log::info!(
            "Read {} points from {}",
            visitor.num_points,
            self.path.display()
        );
        Ok(())
    }
}

/// The vertex property a value is stored into.
#[derive(Debug, Clone, Copy)]
enum VertexField {
    Position(usize),
    Normal(usize),
    Colour { channel: usize, divisor: f64 },
}

/// Gathers the properties of each vertex and emits it as a point.
struct VertexVisitor<'a, A: ?Sized> {
    adapter: &'a mut A,
    position: [f64; 3],
    normal: [f64; 3],
    colour: [f64; 3],
    num_points: usize,
}

impl<'a, A: InputAdapter + ?Sized> VertexVisitor<'a, A> {
    fn new(adapter: &'a mut A) -> Self {
        Self {
            adapter,
            position: [0.0; 3],
            normal: [0.0; 3],
            colour: [1.0; 3],
            num_points: 0,
        }
    }
}

fn colour_divisor(data_type: PlyDataType) -> Option<f64> {
    match data_type {
        PlyDataType::UInt8 => Some(255.0),
        PlyDataType::Float32 | PlyDataType::Float64 => Some(1.0),
        _ => None,
    }
}

fn colour_field(channel: usize, data_type: PlyDataType) -> Option<VertexField> {
    colour_divisor(data_type).map(|divisor| VertexField::Colour { channel, divisor })
}

impl<A: InputAdapter + ?Sized> PlyVisitor for VertexVisitor<'_, A> {
    type Field = VertexField;

    fn element_definition(&mut self, element: &str, _count: usize) -> bool {
        element == "vertex"
    }

    fn scalar_property_definition(
        &mut self,
        element: &str,
        property: &str,
        data_type: PlyDataType,
    ) -> Option<VertexField> {
        if element != "vertex" {
            return None;
        }

        let field = match property {
            "x" | "y" | "z" | "nx" | "ny" | "nz" if !data_type.is_float() => None,
            "x" => Some(VertexField::Position(0)),
            "y" => Some(VertexField::Position(1)),
            "z" => Some(VertexField::Position(2)),
            "nx" => Some(VertexField::Normal(0)),
            "ny" => Some(VertexField::Normal(1)),
            "nz" => Some(VertexField::Normal(2)),
            "red" | "diffuse_red" => colour_field(0, data_type),
            "green" | "diffuse_green" => colour_field(1, data_type),
            "blue" | "diffuse_blue" => colour_field(2, data_type),
            _ => None,
        };

        if field.is_none() {
            log::debug!("Ignoring vertex property '{property}' of type {data_type:?}");
        }
        field
    }

    fn element_begin(&mut self) {
        self.position = [0.0; 3];
        self.normal = [0.0; 3];
        self.colour = [1.0; 3];
    }

    fn scalar_property(&mut self, field: VertexField, value: PlyScalar) {
        let value = value.as_f64();
        match field {
            VertexField::Position(i) => self.position[i] = value,
            VertexField::Normal(i) => self.normal[i] = value,
            VertexField::Colour { channel, divisor } => self.colour[channel] = value / divisor,
        }
    }

    fn element_end(&mut self) {
        let [x, y, z] = self.position;
        let [nx, ny, nz] = self.normal;
        let [r, g, b] = self.colour;

        self.adapter.on_begin_point();
        self.adapter.on_point_position(x, y, z);
        self.adapter.on_point_normal(nx, ny, nz);
        self.adapter.on_point_colour(r, g, b);
        self.adapter.on_end_point();
        self.num_points += 1;
    }
}
