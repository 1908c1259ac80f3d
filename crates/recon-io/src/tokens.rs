use std::{fmt::Display, io::BufRead, str::FromStr};

/// Lines starting with this character, after trimming, are skipped.
pub const COMMENT_MARKER: char = '#';

/// Error types for the tokens module.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Error reading the underlying source
    #[error("Failed to read the input. {0}")]
    Io(#[from] std::io::Error),

    /// The source ended before the expected line
    #[error("Unexpected end of file in {0}")]
    UnexpectedEof(String),

    /// The line ended before the expected field
    #[error("{0}: missing field")]
    MissingField(String),

    /// A field could not be converted to the requested type
    #[error("{location}: cannot parse '{field}': {reason}")]
    InvalidField {
        /// The `name:line` location of the field.
        location: String,
        /// The offending field.
        field: String,
        /// The conversion error.
        reason: String,
    },
}

/// A forward only line decoder over a text source.
///
/// Keeps track of the line number for diagnostics. Blank lines and lines starting with
/// [`COMMENT_MARKER`] are skipped by every read except [`LineReader::skip_line`].
pub struct LineReader<R> {
    reader: R,
    name: String,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> LineReader<R> {
    /// Create a new line reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered text source.
    /// * `name` - The name of the source used in error messages, usually the file path.
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// The name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The `name:line` location of the last consumed line.
    pub fn location(&self) -> String {
        format!("{}:{}", self.name, self.line_number)
    }

    fn read_raw_line(&mut self) -> Result<(), TokenError> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Err(TokenError::UnexpectedEof(self.name.clone()));
        }
        self.line_number += 1;
        Ok(())
    }

    /// Read the next line that is neither blank nor a comment.
    ///
    /// # Returns
    ///
    /// The line without leading and trailing whitespace.
    pub fn next_non_comment_line(&mut self) -> Result<String, TokenError> {
        loop {
            self.read_raw_line()?;
            let line = self.buffer.trim();
            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                continue;
            }
            return Ok(line.to_string());
        }
    }

    /// Discard the next raw line, whatever it contains.
    pub fn skip_line(&mut self) -> Result<(), TokenError> {
        self.read_raw_line()
    }

    /// Discard non comment lines up to and including the first one equal to `marker`.
    pub fn skip_until(&mut self, marker: &str) -> Result<(), TokenError> {
        while self.next_non_comment_line()? != marker {}
        Ok(())
    }

    /// Parse the next non comment line as a single value.
    pub fn next_scalar<T>(&mut self) -> Result<T, TokenError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let line = self.next_non_comment_line()?;
        parse_field(&line, &self.location())
    }

    /// Split the next non comment line into fields.
    ///
    /// # Arguments
    ///
    /// * `delimiters` - Every character of this string separates fields.
    pub fn next_tokens(&mut self, delimiters: &'static str) -> Result<Tokens, TokenError> {
        let line = self.next_non_comment_line()?;
        Ok(Tokens::new(line, delimiters, self.location()))
    }
}

/// A forward only cursor over the delimiter separated fields of one line.
///
/// Consecutive delimiters are collapsed, so empty fields are never produced.
#[derive(Debug, Clone)]
pub struct Tokens {
    line: String,
    delimiters: &'static str,
    cursor: usize,
    location: String,
}

impl Tokens {
    /// Tokenize a line.
    ///
    /// Example:
    ///
    /// ```
    /// use recon_io::tokens::Tokens;
    ///
    /// let mut tokens = Tokens::new("7;image.jpg;;640", ";", "example");
    /// assert_eq!(tokens.next_token::<u32>().unwrap(), 7);
    /// tokens.skip().unwrap();
    /// assert_eq!(tokens.next_token::<u32>().unwrap(), 640);
    /// assert!(tokens.is_exhausted());
    /// ```
    pub fn new(
        line: impl Into<String>,
        delimiters: &'static str,
        location: impl Into<String>,
    ) -> Self {
        Self {
            line: line.into(),
            delimiters,
            cursor: 0,
            location: location.into(),
        }
    }

    fn next_range(&self) -> Option<(usize, usize)> {
        let delimiters = self.delimiters;
        let rest = &self.line[self.cursor..];
        let start = self.cursor + rest.find(|c: char| !delimiters.contains(c))?;
        let end = self.line[start..]
            .find(|c: char| delimiters.contains(c))
            .map_or(self.line.len(), |len| start + len);
        Some((start, end))
    }

    fn advance(&mut self) -> Result<(usize, usize), TokenError> {
        let (start, end) = self
            .next_range()
            .ok_or_else(|| TokenError::MissingField(self.location.clone()))?;
        self.cursor = end;
        Ok((start, end))
    }

    /// Parse the next field as `T`.
    pub fn next_token<T>(&mut self) -> Result<T, TokenError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let (start, end) = self.advance()?;
        parse_field(&self.line[start..end], &self.location)
    }

    /// Borrow the next field without conversion.
    pub fn next_str(&mut self) -> Result<&str, TokenError> {
        let (start, end) = self.advance()?;
        Ok(&self.line[start..end])
    }

    /// Discard the next field.
    pub fn skip(&mut self) -> Result<(), TokenError> {
        self.advance().map(|_| ())
    }

    /// Parse the next three fields as a 3D vector.
    pub fn next_vec3(&mut self) -> Result<[f64; 3], TokenError> {
        Ok([self.next_token()?, self.next_token()?, self.next_token()?])
    }

    /// Check if all fields have been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.next_range().is_none()
    }

    /// The `name:line` location the line was read from.
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Utility function to parse a single field with a located error.
fn parse_field<T>(field: &str, location: &str) -> Result<T, TokenError>
where
    T: FromStr,
    T::Err: Display,
{
    field.parse::<T>().map_err(|e| TokenError::InvalidField {
        location: location.to_string(),
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Builds one output line from fields joined by a single separator.
#[derive(Debug, Clone)]
pub struct FieldLine {
    line: String,
    separator: char,
    fields: usize,
}

impl FieldLine {
    /// Create an empty line.
    pub fn new(separator: char) -> Self {
        Self {
            line: String::new(),
            separator,
            fields: 0,
        }
    }

    /// Append a field.
    pub fn push(&mut self, value: impl Display) -> &mut Self {
        if self.fields > 0 {
            self.line.push(self.separator);
        }
        self.line.push_str(&value.to_string());
        self.fields += 1;
        self
    }

    /// Append three fields.
    pub fn push_vec3(&mut self, values: &[f64; 3]) -> &mut Self {
        values.iter().fold(self, |line, v| line.push(v))
    }

    /// Get the line without a trailing newline.
    pub fn as_str(&self) -> &str {
        &self.line
    }
}
