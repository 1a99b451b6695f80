//! Low-level PDF 1.4 serialization: numbered objects, streams, the
//! cross-reference table and the trailer.

use std::fmt;
use std::io::Write;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("I/O error while writing PDF: {0}")]
    Io(#[from] std::io::Error),

    #[error("object {0} written twice")]
    DuplicateObject(u32),

    #[error("object {0} reserved but never written")]
    MissingObject(u32),

    #[error("object {0} was never reserved")]
    UnknownObject(u32),
}

/// Indirect object number. Displays as a reference (`12 0 R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

pub struct PdfWriter {
    buffer: Vec<u8>,
    /// Byte offset of each object, indexed by `number - 1`
    offsets: Vec<Option<usize>>,
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut buffer = Vec::with_capacity(16 * 1024);
        buffer.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    /// Allocates an object number to be written later.
    pub fn reserve(&mut self) -> ObjectId {
        self.offsets.push(None);
        ObjectId(self.offsets.len() as u32)
    }

    /// Writes `body` (a dictionary, array or scalar) as object `id`.
    pub fn write_object(&mut self, id: ObjectId, body: &str) -> Result<(), PdfError> {
        self.begin(id)?;
        write!(self.buffer, "{} 0 obj\n{}\nendobj\n", id.0, body)?;
        Ok(())
    }

    /// Writes a stream object. `dictionary` holds the entries besides
    /// `/Length`, without the surrounding `<< >>`.
    pub fn write_stream(
        &mut self,
        id: ObjectId,
        dictionary: &str,
        data: &[u8],
    ) -> Result<(), PdfError> {
        self.begin(id)?;
        let separator = if dictionary.is_empty() { "" } else { " " };
        write!(
            self.buffer,
            "{} 0 obj\n<< {}{}/Length {} >>\nstream\n",
            id.0,
            dictionary,
            separator,
            data.len()
        )?;
        self.buffer.extend_from_slice(data);
        self.buffer.extend_from_slice(b"\nendstream\nendobj\n");
        Ok(())
    }

    /// Appends the cross-reference table and trailer.
    pub fn finish(mut self, root: ObjectId, info: ObjectId) -> Result<Vec<u8>, PdfError> {
        let mut offsets = Vec::with_capacity(self.offsets.len());
        for (index, offset) in self.offsets.iter().enumerate() {
            match offset {
                Some(offset) => offsets.push(*offset),
                None => return Err(PdfError::MissingObject(index as u32 + 1)),
            }
        }

        let xref_offset = self.buffer.len();
        write!(self.buffer, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
        for offset in offsets {
            write!(self.buffer, "{offset:010} 00000 n \n")?;
        }
        write!(
            self.buffer,
            "trailer\n<< /Size {} /Root {} /Info {} >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            root,
            info,
            xref_offset
        )?;
        Ok(self.buffer)
    }

    fn begin(&mut self, id: ObjectId) -> Result<(), PdfError> {
        let offset = self.buffer.len();
        let slot = self
            .offsets
            .get_mut(id.0 as usize - 1)
            .ok_or(PdfError::UnknownObject(id.0))?;
        if slot.is_some() {
            return Err(PdfError::DuplicateObject(id.0));
        }
        *slot = Some(offset);
        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}
