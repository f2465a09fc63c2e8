/// Binary export/import of named constant tables.
///
/// Layout (every integer in the selected byte order):
///
/// ```text
/// u16   byte-order marker 0x1000
/// u16   version tag length, then the tag bytes "[v1.0]"
/// u32   float buffer size
/// u32   int buffer size
/// u32   entry count
/// per entry, sorted by name:
///   u16 name length, UTF-8 name
///   u32 type code, u32 physical index, u32 logical index,
///   u32 element size, u32 array size, u16 variability bits
/// ```
///
/// Import detects the byte order from the marker.

use std::io::{ErrorKind, Read, Write};
use crate::error::{Error, Result};
use crate::{orbit_bail, orbit_debug, orbit_err};
use super::constants::{GpuConstantDefinition, GpuConstantType, GpuNamedConstants, GpuParamVariability};

pub const VERSION_TAG: &str = "[v1.0]";
const BYTE_ORDER_MARKER: u16 = 0x1000;
const SOURCE: &str = "orbit3d::GpuNamedConstantsSerializer";

/// Byte order used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Native,
    Big,
    Little,
}

impl Endian {
    fn is_big(self) -> bool {
        match self {
            Endian::Native => cfg!(target_endian = "big"),
            Endian::Big => true,
            Endian::Little => false,
        }
    }
}

pub struct GpuNamedConstantsSerializer;

impl GpuNamedConstantsSerializer {
    /// Write `named` to `writer`
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if a name or index does not fit the format,
    /// `Error::BackendError` if the writer fails.
    pub fn export<W: Write>(named: &GpuNamedConstants, writer: &mut W, endian: Endian) -> Result<()> {
        let mut out = ByteWriter { writer, big: endian.is_big() };

        out.u16(BYTE_ORDER_MARKER)?;
        out.string(VERSION_TAG)?;
        out.u32(to_u32(named.float_buffer_size, "float buffer size")?)?;
        out.u32(to_u32(named.int_buffer_size, "int buffer size")?)?;
        out.u32(to_u32(named.len(), "entry count")?)?;

        let mut entries: Vec<_> = named.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (name, def) in entries {
            out.string(name)?;
            out.u32(def.constant_type.code())?;
            out.u32(to_u32(def.physical_index, "physical index")?)?;
            out.u32(to_u32(def.logical_index, "logical index")?)?;
            out.u32(to_u32(def.element_size, "element size")?)?;
            out.u32(to_u32(def.array_size, "array size")?)?;
            out.u16(def.variability.bits())?;
        }

        orbit_debug!(SOURCE, "Exported {} named constants", named.len());
        Ok(())
    }

    pub fn export_to_vec(named: &GpuNamedConstants, endian: Endian) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        Self::export(named, &mut bytes, endian)?;
        Ok(bytes)
    }

    /// Read a table written by [`export`](Self::export)
    ///
    /// # Errors
    ///
    /// `Error::Unsupported` for an unknown marker, version tag or type code,
    /// `Error::BoundsViolation` for truncated input.
    pub fn import<R: Read>(reader: &mut R) -> Result<GpuNamedConstants> {
        let mut input = ByteReader { reader, big: false };

        // The marker is first read as little endian
        let marker = input.u16()?;
        if marker == BYTE_ORDER_MARKER.swap_bytes() {
            input.big = true;
        } else if marker != BYTE_ORDER_MARKER {
            orbit_bail!(Unsupported => SOURCE, "Unknown byte order marker {:#06x}", marker);
        }
        let tag = input.string()?;
        if tag != VERSION_TAG {
            orbit_bail!(Unsupported => SOURCE, "Unsupported named constants version '{}'", tag);
        }

        let mut named = GpuNamedConstants::new();
        named.float_buffer_size = input.u32()? as usize;
        named.int_buffer_size = input.u32()? as usize;
        let count = input.u32()?;

        for _ in 0..count {
            let name = input.string()?;
            let code = input.u32()?;
            let constant_type = GpuConstantType::from_code(code).ok_or_else(|| {
                orbit_err!(Unsupported => SOURCE, "Unknown constant type code {} for '{}'", code, name)
            })?;
            let def = GpuConstantDefinition {
                constant_type,
                physical_index: input.u32()? as usize,
                logical_index: input.u32()? as usize,
                element_size: input.u32()? as usize,
                array_size: input.u32()? as usize,
                variability: GpuParamVariability::from_bits_retain(input.u16()?),
            };
            named.insert(&name, def);
        }

        orbit_debug!(SOURCE, "Imported {} named constants", named.len());
        Ok(named)
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| orbit_err!(SOURCE, "{} {} does not fit in 32 bits", what, value))
}

fn io_error(err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        orbit_err!(BoundsViolation => SOURCE, "Named constants stream is truncated")
    } else {
        orbit_err!(BackendError => SOURCE, "Named constants stream error: {}", err)
    }
}

struct ByteWriter<'a, W: Write> {
    writer: &'a mut W,
    big: bool,
}

impl<W: Write> ByteWriter<'_, W> {
    fn u16(&mut self, value: u16) -> Result<()> {
        let bytes = if self.big { value.to_be_bytes() } else { value.to_le_bytes() };
        self.writer.write_all(&bytes).map_err(io_error)
    }

    fn u32(&mut self, value: u32) -> Result<()> {
        let bytes = if self.big { value.to_be_bytes() } else { value.to_le_bytes() };
        self.writer.write_all(&bytes).map_err(io_error)
    }

    fn string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| orbit_err!(SOURCE, "Name '{}' is longer than {} bytes", value, u16::MAX))?;
        self.u16(len)?;
        self.writer.write_all(value.as_bytes()).map_err(io_error)
    }
}

struct ByteReader<'a, R: Read> {
    reader: &'a mut R,
    big: bool,
}

impl<R: Read> ByteReader<'_, R> {
    fn u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.reader.read_exact(&mut bytes).map_err(io_error)?;
        Ok(if self.big { u16::from_be_bytes(bytes) } else { u16::from_le_bytes(bytes) })
    }

    fn u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.reader.read_exact(&mut bytes).map_err(io_error)?;
        Ok(if self.big { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) })
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.reader.read_exact(&mut bytes).map_err(io_error)?;
        String::from_utf8(bytes)
            .map_err(|_| orbit_err!(Unsupported => SOURCE, "Constant name is not valid UTF-8"))
    }
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
