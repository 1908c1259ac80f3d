use std::io::{BufRead, Read};

use super::{
    properties::{
        PlyDataType, PlyElementDefinition, PlyFormat, PlyPropertyDefinition, PlyPropertyKind,
        PlyScalar,
    },
    PlyError,
};
use crate::tokens::Tokens;

/// The parsed header of a PLY file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyHeader {
    /// Storage format of the body.
    pub format: PlyFormat,
    /// Declared elements in storage order.
    pub elements: Vec<PlyElementDefinition>,
    /// `comment` and `obj_info` lines.
    pub comments: Vec<String>,
}

/// Receives the content of a PLY file while it is parsed.
///
/// Definitions are announced once per element and property after the header is read.
/// Properties for which no field is returned are decoded and dropped. Afterwards every
/// record of a subscribed element is delivered as `element_begin`, one
/// `scalar_property` per selected property, `element_end`.
pub trait PlyVisitor {
    /// Identifies a selected property.
    type Field: Copy;

    /// Announce an element; return `true` to receive its records.
    fn element_definition(&mut self, element: &str, count: usize) -> bool;

    /// Announce a scalar property; return the field that receives its values.
    fn scalar_property_definition(
        &mut self,
        element: &str,
        property: &str,
        data_type: PlyDataType,
    ) -> Option<Self::Field>;

    /// A record of a subscribed element starts.
    fn element_begin(&mut self);

    /// A selected property value of the current record.
    fn scalar_property(&mut self, field: Self::Field, value: PlyScalar);

    /// The current record ends.
    fn element_end(&mut self);
}

/// Parse the header of a PLY file, leaving the reader at the first byte of the body.
pub fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut line_number = 0;
    let mut format = None;
    let mut elements: Vec<PlyElementDefinition> = Vec::new();
    let mut comments = Vec::new();

    let malformed = |line: usize, message: &str| PlyError::MalformedHeader {
        line,
        message: message.to_string(),
    };

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(malformed(line_number, "missing end_header"));
        }
        line_number += 1;
        let trimmed = line.trim();

        if line_number == 1 {
            if trimmed != "ply" {
                return Err(PlyError::MissingMagic);
            }
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            ["end_header"] => break,
            ["format", keyword, _version] => format = Some(PlyFormat::parse(keyword)?),
            ["comment" | "obj_info", ..] => {
                let text = trimmed
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, c)| c);
                comments.push(text.trim().to_string());
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| malformed(line_number, "invalid element count"))?;
                elements.push(PlyElementDefinition {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count_type, item_type, name] => {
                let kind = PlyPropertyKind::List {
                    count: PlyDataType::parse(count_type)?,
                    item: PlyDataType::parse(item_type)?,
                };
                push_property(&mut elements, name, kind)
                    .ok_or_else(|| malformed(line_number, "property before element"))?;
            }
            ["property", data_type, name] => {
                let kind = PlyPropertyKind::Scalar(PlyDataType::parse(data_type)?);
                push_property(&mut elements, name, kind)
                    .ok_or_else(|| malformed(line_number, "property before element"))?;
            }
            _ => return Err(malformed(line_number, trimmed)),
        }
    }

    let format = format.ok_or_else(|| malformed(line_number, "missing format line"))?;

    Ok(PlyHeader {
        format,
        elements,
        comments,
    })
}

fn push_property(
    elements: &mut [PlyElementDefinition],
    name: &str,
    kind: PlyPropertyKind,
) -> Option<()> {
    let element = elements.last_mut()?;
    element.properties.push(PlyPropertyDefinition {
        name: name.to_string(),
        kind,
    });
    Some(())
}

/// Parse a PLY file, feeding the selected properties to the visitor.
///
/// # Arguments
///
/// * `reader` - The PLY data, positioned at the `ply` magic.
/// * `visitor` - Selects properties and receives their values.
///
/// # Returns
///
/// The header of the file.
pub fn parse_ply<R, V>(reader: &mut R, visitor: &mut V) -> Result<PlyHeader, PlyError>
where
    R: BufRead,
    V: PlyVisitor,
{
    let header = parse_header(reader)?;
    log::debug!(
        "PLY {:?} body with elements {:?}",
        header.format,
        header
            .elements
            .iter()
            .map(|e| (e.name.as_str(), e.count))
            .collect::<Vec<_>>()
    );

    // announce all definitions before any record
    let plans = header
        .elements
        .iter()
        .map(|element| {
            let subscribed = visitor.element_definition(&element.name, element.count);
            let fields = element
                .properties
                .iter()
                .map(|property| match property.kind {
                    PlyPropertyKind::Scalar(data_type) => visitor.scalar_property_definition(
                        &element.name,
                        &property.name,
                        data_type,
                    ),
                    PlyPropertyKind::List { .. } => None,
                })
                .collect::<Vec<_>>();
            (subscribed, fields)
        })
        .collect::<Vec<_>>();

    match header.format {
        PlyFormat::Ascii => read_body(&mut AsciiRecords::new(reader), &header, &plans, visitor)?,
        PlyFormat::BinaryLittleEndian => {
            let mut records = BinaryRecords::new(reader, false);
            read_body(&mut records, &header, &plans, visitor)?
        }
        PlyFormat::BinaryBigEndian => {
            let mut records = BinaryRecords::new(reader, true);
            read_body(&mut records, &header, &plans, visitor)?
        }
    }

    Ok(header)
}

/// A source of property values, one record at a time.
trait RecordReader {
    fn begin_record(&mut self, element: &str) -> Result<(), PlyError>;
    fn read_value(&mut self, element: &str, data_type: PlyDataType) -> Result<PlyScalar, PlyError>;
}

struct AsciiRecords<'a, R> {
    reader: &'a mut R,
    line: String,
    line_number: usize,
    tokens: Tokens,
}

impl<'a, R: BufRead> AsciiRecords<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            tokens: Tokens::new("", " \t", ""),
        }
    }
}

impl<R: BufRead> RecordReader for AsciiRecords<'_, R> {
    fn begin_record(&mut self, element: &str) -> Result<(), PlyError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(PlyError::UnexpectedEof(element.to_string()));
            }
            self.line_number += 1;
            if !self.line.trim().is_empty() {
                break;
            }
        }
        self.tokens = Tokens::new(
            self.line.trim(),
            " \t",
            format!("body line {}", self.line_number),
        );
        Ok(())
    }

    fn read_value(&mut self, element: &str, data_type: PlyDataType) -> Result<PlyScalar, PlyError> {
        let invalid = |message: String| PlyError::InvalidValue {
            element: element.to_string(),
            message,
        };
        let token = self.tokens.next_str().map_err(|e| invalid(e.to_string()))?;
        PlyScalar::parse(data_type, token).map_err(invalid)
    }
}

struct BinaryRecords<'a, R> {
    reader: &'a mut R,
    big_endian: bool,
    buffer: [u8; 8],
}

impl<'a, R: Read> BinaryRecords<'a, R> {
    fn new(reader: &'a mut R, big_endian: bool) -> Self {
        Self {
            reader,
            big_endian,
            buffer: [0; 8],
        }
    }
}

impl<R: Read> RecordReader for BinaryRecords<'_, R> {
    fn begin_record(&mut self, _element: &str) -> Result<(), PlyError> {
        Ok(())
    }

    fn read_value(&mut self, element: &str, data_type: PlyDataType) -> Result<PlyScalar, PlyError> {
        let bytes = &mut self.buffer[..data_type.size()];
        self.reader.read_exact(bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => PlyError::UnexpectedEof(element.to_string()),
            _ => PlyError::Io(e),
        })?;
        Ok(PlyScalar::from_bytes(data_type, bytes, self.big_endian))
    }
}

fn read_body<S, V>(
    source: &mut S,
    header: &PlyHeader,
    plans: &[(bool, Vec<Option<V::Field>>)],
    visitor: &mut V,
) -> Result<(), PlyError>
where
    S: RecordReader,
    V: PlyVisitor,
{
    for (element, (subscribed, fields)) in header.elements.iter().zip(plans) {
        for _ in 0..element.count {
            source.begin_record(&element.name)?;
            if *subscribed {
                visitor.element_begin();
            }

            for (property, field) in element.properties.iter().zip(fields) {
                match property.kind {
                    PlyPropertyKind::Scalar(data_type) => {
                        let value = source.read_value(&element.name, data_type)?;
                        if let (true, Some(field)) = (*subscribed, field) {
                            visitor.scalar_property(*field, value);
                        }
                    }
                    PlyPropertyKind::List { count, item } => {
                        let len = source
                            .read_value(&element.name, count)?
                            .as_count()
                            .ok_or_else(|| PlyError::InvalidValue {
                                element: element.name.clone(),
                                message: format!("invalid length of list '{}'", property.name),
                            })?;
                        for _ in 0..len {
                            source.read_value(&element.name, item)?;
                        }
                    }
                }
            }

            if *subscribed {
                visitor.element_end();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every callback as text.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl PlyVisitor for Recorder {
        type Field = char;

        fn element_definition(&mut self, element: &str, count: usize) -> bool {
            self.events.push(format!("element {element} {count}"));
            element == "vertex"
        }

        fn scalar_property_definition(
            &mut self,
            element: &str,
            property: &str,
            _data_type: PlyDataType,
        ) -> Option<char> {
            match (element, property) {
                ("vertex", "x") => Some('x'),
                ("vertex", "red") => Some('r'),
                _ => None,
            }
        }

        fn element_begin(&mut self) {
            self.events.push("begin".to_string());
        }

        fn scalar_property(&mut self, field: char, value: PlyScalar) {
            self.events.push(format!("{field}={}", value.as_f64()));
        }

        fn element_end(&mut self) {
            self.events.push("end".to_string());
        }
    }

    #[test]
    fn test_parse_header_basic() -> Result<(), PlyError> {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader)?;
        assert_eq!(header.format, PlyFormat::BinaryLittleEndian);
        assert_eq!(header.elements.len(), 1);
        assert_eq!(header.elements[0].count, 10);
        assert_eq!(header.elements[0].properties.len(), 3);
        assert_eq!(header.elements[0].properties[0].name, "x");
        assert_eq!(
            header.elements[0].properties[0].kind,
            PlyPropertyKind::Scalar(PlyDataType::Float32)
        );
        Ok(())
    }

    #[test]
    fn test_parse_header_lists_and_comments() -> Result<(), PlyError> {
        let header_text = "ply\nformat ascii 1.0\ncomment made by hand\nelement vertex 2\nproperty double x\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";
        let header = parse_header(&mut header_text.as_bytes())?;
        assert_eq!(header.comments, vec!["made by hand".to_string()]);
        assert_eq!(header.elements[1].name, "face");
        assert_eq!(
            header.elements[1].properties[0].kind,
            PlyPropertyKind::List {
                count: PlyDataType::UInt8,
                item: PlyDataType::Int32
            }
        );
        Ok(())
    }

    #[test]
    fn test_parse_header_errors() {
        let no_magic = "format ascii 1.0\nend_header\n";
        assert!(matches!(
            parse_header(&mut no_magic.as_bytes()),
            Err(PlyError::MissingMagic)
        ));

        let no_end = "ply\nformat ascii 1.0\nelement vertex 1\n";
        assert!(matches!(
            parse_header(&mut no_end.as_bytes()),
            Err(PlyError::MalformedHeader { .. })
        ));

        let orphan = "ply\nformat ascii 1.0\nproperty float x\nend_header\n";
        assert!(matches!(
            parse_header(&mut orphan.as_bytes()),
            Err(PlyError::MalformedHeader { line: 3, .. })
        ));

        let bad_format = "ply\nformat binary_middle_endian 1.0\nend_header\n";
        assert!(matches!(
            parse_header(&mut bad_format.as_bytes()),
            Err(PlyError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_ascii_with_faces() -> Result<(), PlyError> {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty uchar red\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n1.5 2 255\n\n-1 0 0\n3 0 1 1\n";
        let mut recorder = Recorder::default();
        parse_ply(&mut text.as_bytes(), &mut recorder)?;
        assert_eq!(
            recorder.events,
            vec![
                "element vertex 2",
                "element face 1",
                "begin",
                "x=1.5",
                "r=255",
                "end",
                "begin",
                "x=-1",
                "r=0",
                "end",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_binary_endianness() -> Result<(), PlyError> {
        for big_endian in [false, true] {
            let format = if big_endian {
                "binary_big_endian"
            } else {
                "binary_little_endian"
            };
            let mut data = format!(
                "ply\nformat {format} 1.0\nelement vertex 1\nproperty double x\nproperty uchar red\nproperty list uchar int idx\nend_header\n"
            )
            .into_bytes();
            if big_endian {
                data.extend_from_slice(&4.25f64.to_be_bytes());
            } else {
                data.extend_from_slice(&4.25f64.to_le_bytes());
            }
            data.push(7);
            data.push(2);
            data.extend_from_slice(&[0u8; 8]);

            let mut recorder = Recorder::default();
            parse_ply(&mut data.as_slice(), &mut recorder)?;
            assert_eq!(
                recorder.events,
                vec!["element vertex 1", "begin", "x=4.25", "r=7", "end"]
            );
        }
        Ok(())
    }

    #[test]
    fn test_parse_truncated_body() {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nend_header\n1.0\n";
        let mut recorder = Recorder::default();
        assert!(matches!(
            parse_ply(&mut text.as_bytes(), &mut recorder),
            Err(PlyError::UnexpectedEof(_))
        ));

        let header: &[u8] = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nend_header\n";
        let mut data = header.to_vec();
        data.extend_from_slice(&[0u8; 2]);
        assert!(matches!(
            parse_ply(&mut data.as_slice(), &mut Recorder::default()),
            Err(PlyError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_parse_invalid_ascii_value() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty uchar red\nend_header\nabc\n";
        assert!(matches!(
            parse_ply(&mut text.as_bytes(), &mut Recorder::default()),
            Err(PlyError::InvalidValue { .. })
        ));
    }
}
