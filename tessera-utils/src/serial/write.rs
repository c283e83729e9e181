#![allow(missing_docs)]
use std::io::{Error, ErrorKind, Result, Write};

use crate::serial::WriteTo;

impl WriteTo for bool {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        u8::from(*self).write(writer)
    }
}

impl WriteTo for u8 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for u16 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for i8 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for i32 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for i64 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for f32 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for f64 {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl WriteTo for str {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        let len = u16::try_from(self.len())
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "string too long for u16 prefix"))?;
        len.write(writer)?;
        writer.write_all(self.as_bytes())
    }
}

impl WriteTo for String {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.as_str().write(writer)
    }
}
