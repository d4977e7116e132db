//! Little-endian cursor over image bytes

use crate::error::ParseError;

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ParseError> {
        let truncated = ParseError::Truncated {
            offset: self.position,
            needed: count,
        };
        let end = self.position.checked_add(count).ok_or(truncated.clone())?;
        let bytes = self.data.get(self.position..end).ok_or(truncated)?;
        self.position = end;
        Ok(bytes)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ParseError> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u64_le(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<(), ParseError> {
        self.read_bytes(count).map(|_| ())
    }
}
