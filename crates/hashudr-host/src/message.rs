//! # Message Layout Codec
//!
//! The host exchanges parameters and query rows as fixed-width byte
//! buffers described by metadata: one entry per field with its type, length
//! and the offsets of its value and its null indicator. [`MessageLayout`]
//! is that metadata; its readers are the only place that does offset
//! arithmetic on a buffer.
//!
//! ## Storage
//!
//! | Type | Value bytes | Alignment |
//! |---|---|---|
//! | `Text` (CHAR) | declared length, space padded | 1 |
//! | `Varying` (VARCHAR) | u16 length + declared capacity | 2 |
//! | `Short` | 2 | 2 |
//! | `Long` | 4 | 4 |
//! | `Int64` | 8 | 8 |
//! | `Blob` | 8 (blob id quad) | 4 |
//!
//! Every field is followed by a 2-byte null indicator (non-zero = null).
//! All integers are little-endian.

use crate::context::BlobId;

/// Host SQL type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SqlType {
    Varying = 448,
    Text = 452,
    Long = 496,
    Short = 500,
    Blob = 520,
    Int64 = 580,
}

impl SqlType {
    /// The host's numeric type code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Resolve a numeric code. The low bit (nullable flag) is ignored.
    pub fn from_code(code: u16) -> Option<Self> {
        match code & !1 {
            448 => Some(Self::Varying),
            452 => Some(Self::Text),
            496 => Some(Self::Long),
            500 => Some(Self::Short),
            520 => Some(Self::Blob),
            580 => Some(Self::Int64),
            _ => None,
        }
    }

    fn alignment(self) -> usize {
        match self {
            Self::Text => 1,
            Self::Varying | Self::Short => 2,
            Self::Long | Self::Blob => 4,
            Self::Int64 => 8,
        }
    }

    fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Short => Some(2),
            Self::Long => Some(4),
            Self::Int64 | Self::Blob => Some(8),
            Self::Text | Self::Varying => None,
        }
    }
}

/// Metadata for one field of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    /// Blob sub-type (0 = unstructured binary); 0 for other types.
    pub sub_type: i16,
    /// Declared length: value bytes for fixed types and CHAR, data
    /// capacity for VARCHAR.
    pub length: usize,
    /// Character set id (0 = NONE).
    pub char_set: u16,
    pub offset: usize,
    pub null_offset: usize,
}

/// Errors reading or writing a message buffer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    /// Field index beyond the layout.
    #[error("no field at index {index} (message has {count} fields)")]
    NoSuchField { index: usize, count: usize },

    /// The field's type does not fit the requested access.
    #[error("field {name:?} has type {actual:?}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: SqlType,
    },

    /// The buffer is shorter than the layout requires.
    #[error("buffer holds {actual} bytes, message needs {required}")]
    BufferTooShort { required: usize, actual: usize },

    /// A VARCHAR length prefix or a written value exceeds the capacity.
    #[error("field {name:?}: {len} bytes exceed capacity {capacity}")]
    Overflow {
        name: String,
        len: usize,
        capacity: usize,
    },
}

/// Field metadata plus total message length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLayout {
    fields: Vec<FieldDescriptor>,
    length: usize,
}

impl MessageLayout {
    /// Start building a layout; offsets are assigned by
    /// [`MessageLayoutBuilder::build`].
    pub fn builder() -> MessageLayoutBuilder {
        MessageLayoutBuilder::default()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Total buffer length in bytes.
    pub fn message_length(&self) -> usize {
        self.length
    }

    /// A zeroed buffer of the message length (every field non-null).
    pub fn new_buffer(&self) -> Vec<u8> {
        vec![0u8; self.length]
    }

    /// Metadata of the field at `index`.
    pub fn field(&self, index: usize) -> Result<&FieldDescriptor, LayoutError> {
        self.fields.get(index).ok_or(LayoutError::NoSuchField {
            index,
            count: self.fields.len(),
        })
    }

    /// Whether the field at `index` is null.
    pub fn is_null(&self, buffer: &[u8], index: usize) -> Result<bool, LayoutError> {
        let field = self.field(index)?;
        let flag = self.bytes::<2>(buffer, field.null_offset)?;
        Ok(i16::from_le_bytes(flag) != 0)
    }

    /// Read a SMALLINT field; `None` when null.
    pub fn read_short(&self, buffer: &[u8], index: usize) -> Result<Option<i16>, LayoutError> {
        self.read_fixed(buffer, index, SqlType::Short, "SMALLINT")
            .map(|v| v.map(i16::from_le_bytes))
    }

    /// Read an INTEGER field; `None` when null.
    pub fn read_long(&self, buffer: &[u8], index: usize) -> Result<Option<i32>, LayoutError> {
        self.read_fixed(buffer, index, SqlType::Long, "INTEGER")
            .map(|v| v.map(i32::from_le_bytes))
    }

    /// Read a BIGINT field; `None` when null.
    pub fn read_int64(&self, buffer: &[u8], index: usize) -> Result<Option<i64>, LayoutError> {
        self.read_fixed(buffer, index, SqlType::Int64, "BIGINT")
            .map(|v| v.map(i64::from_le_bytes))
    }

    /// Read a blob id; `None` when null.
    pub fn read_blob_id(&self, buffer: &[u8], index: usize) -> Result<Option<BlobId>, LayoutError> {
        self.read_fixed(buffer, index, SqlType::Blob, "BLOB")
            .map(|v| v.map(BlobId::from_bytes))
    }

    /// Read the bytes of a CHAR or VARCHAR field; `None` when null.
    ///
    /// CHAR yields the full declared length, padding included. VARCHAR
    /// yields exactly the bytes named by its length prefix.
    pub fn read_text<'b>(
        &self,
        buffer: &'b [u8],
        index: usize,
    ) -> Result<Option<&'b [u8]>, LayoutError> {
        let field = self.field(index)?;
        let value = match field.sql_type {
            SqlType::Text => self.slice(buffer, field.offset, field.length)?,
            SqlType::Varying => {
                let len = usize::from(u16::from_le_bytes(self.bytes::<2>(buffer, field.offset)?));
                if len > field.length {
                    return Err(LayoutError::Overflow {
                        name: field.name.clone(),
                        len,
                        capacity: field.length,
                    });
                }
                self.slice(buffer, field.offset + 2, len)?
            }
            other => {
                return Err(LayoutError::TypeMismatch {
                    name: field.name.clone(),
                    expected: "CHAR or VARCHAR",
                    actual: other,
                })
            }
        };
        if self.is_null(buffer, index)? {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn read_fixed<const N: usize>(
        &self,
        buffer: &[u8],
        index: usize,
        expected: SqlType,
        expected_name: &'static str,
    ) -> Result<Option<[u8; N]>, LayoutError> {
        let field = self.field(index)?;
        if field.sql_type != expected {
            return Err(LayoutError::TypeMismatch {
                name: field.name.clone(),
                expected: expected_name,
                actual: field.sql_type,
            });
        }
        let value = self.bytes::<N>(buffer, field.offset)?;
        if self.is_null(buffer, index)? {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn slice<'b>(&self, buffer: &'b [u8], offset: usize, len: usize) -> Result<&'b [u8], LayoutError> {
        if buffer.len() < self.length {
            return Err(LayoutError::BufferTooShort {
                required: self.length,
                actual: buffer.len(),
            });
        }
        buffer
            .get(offset..offset + len)
            .ok_or(LayoutError::BufferTooShort {
                required: offset + len,
                actual: buffer.len(),
            })
    }

    fn bytes<const N: usize>(&self, buffer: &[u8], offset: usize) -> Result<[u8; N], LayoutError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(buffer, offset, N)?);
        Ok(out)
    }
}

/// Builder assigning aligned offsets to a sequence of fields.
#[derive(Debug, Default)]
pub struct MessageLayoutBuilder {
    fields: Vec<FieldDescriptor>,
}

impl MessageLayoutBuilder {
    /// Append a field. `length` is ignored for fixed-size types.
    pub fn field(mut self, name: impl Into<String>, sql_type: SqlType, length: usize) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            sql_type,
            sub_type: 0,
            length: sql_type.fixed_len().unwrap_or(length),
            char_set: 0,
            offset: 0,
            null_offset: 0,
        });
        self
    }

    /// Set the blob sub-type of the last appended field.
    pub fn sub_type(mut self, sub_type: i16) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.sub_type = sub_type;
        }
        self
    }

    /// Set the character set of the last appended field.
    pub fn char_set(mut self, char_set: u16) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.char_set = char_set;
        }
        self
    }

    pub fn build(mut self) -> MessageLayout {
        let mut cursor = 0usize;
        for field in &mut self.fields {
            cursor = align(cursor, field.sql_type.alignment());
            field.offset = cursor;
            cursor += match field.sql_type {
                SqlType::Varying => 2 + field.length,
                _ => field.length,
            };
            cursor = align(cursor, 2);
            field.null_offset = cursor;
            cursor += 2;
        }
        MessageLayout {
            fields: self.fields,
            length: cursor,
        }
    }
}

fn align(offset: usize, to: usize) -> usize {
    offset.div_ceil(to) * to
}

/// Writes typed values into a fresh message buffer. Every field starts null.
#[derive(Debug)]
pub struct MessageWriter<'a> {
    layout: &'a MessageLayout,
    buffer: Vec<u8>,
}

impl<'a> MessageWriter<'a> {
    pub fn new(layout: &'a MessageLayout) -> Self {
        let mut buffer = layout.new_buffer();
        for field in layout.fields() {
            buffer[field.null_offset..field.null_offset + 2].copy_from_slice(&(-1i16).to_le_bytes());
        }
        Self { layout, buffer }
    }

    /// Mark a field null.
    pub fn set_null(&mut self, index: usize) -> Result<&mut Self, LayoutError> {
        let field = self.layout.field(index)?;
        let at = field.null_offset;
        self.buffer[at..at + 2].copy_from_slice(&(-1i16).to_le_bytes());
        Ok(self)
    }

    pub fn write_short(&mut self, index: usize, value: i16) -> Result<&mut Self, LayoutError> {
        self.write_fixed(index, SqlType::Short, "SMALLINT", &value.to_le_bytes())
    }

    pub fn write_long(&mut self, index: usize, value: i32) -> Result<&mut Self, LayoutError> {
        self.write_fixed(index, SqlType::Long, "INTEGER", &value.to_le_bytes())
    }

    pub fn write_int64(&mut self, index: usize, value: i64) -> Result<&mut Self, LayoutError> {
        self.write_fixed(index, SqlType::Int64, "BIGINT", &value.to_le_bytes())
    }

    pub fn write_blob_id(&mut self, index: usize, value: BlobId) -> Result<&mut Self, LayoutError> {
        self.write_fixed(index, SqlType::Blob, "BLOB", &value.to_bytes())
    }

    /// Write CHAR (space padded to the declared length) or VARCHAR data.
    pub fn write_text(&mut self, index: usize, value: &[u8]) -> Result<&mut Self, LayoutError> {
        let field = self.layout.field(index)?;
        if value.len() > field.length {
            return Err(LayoutError::Overflow {
                name: field.name.clone(),
                len: value.len(),
                capacity: field.length,
            });
        }
        let at = field.offset;
        match field.sql_type {
            SqlType::Text => {
                let slot = &mut self.buffer[at..at + field.length];
                slot.fill(b' ');
                slot[..value.len()].copy_from_slice(value);
            }
            SqlType::Varying => {
                let len = value.len() as u16;
                self.buffer[at..at + 2].copy_from_slice(&len.to_le_bytes());
                self.buffer[at + 2..at + 2 + value.len()].copy_from_slice(value);
            }
            other => {
                return Err(LayoutError::TypeMismatch {
                    name: field.name.clone(),
                    expected: "CHAR or VARCHAR",
                    actual: other,
                })
            }
        }
        self.clear_null(index)
    }

    /// The finished buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn write_fixed(
        &mut self,
        index: usize,
        expected: SqlType,
        expected_name: &'static str,
        bytes: &[u8],
    ) -> Result<&mut Self, LayoutError> {
        let field = self.layout.field(index)?;
        if field.sql_type != expected {
            return Err(LayoutError::TypeMismatch {
                name: field.name.clone(),
                expected: expected_name,
                actual: field.sql_type,
            });
        }
        let at = field.offset;
        self.buffer[at..at + bytes.len()].copy_from_slice(bytes);
        self.clear_null(index)
    }

    fn clear_null(&mut self, index: usize) -> Result<&mut Self, LayoutError> {
        let at = self.layout.field(index)?.null_offset;
        self.buffer[at..at + 2].copy_from_slice(&0i16.to_le_bytes());
        Ok(self)
    }
}
