use thiserror::Error;

/// Errors produced while decoding raw contract state bytes.
///
/// Every error carries the byte offset it occurred at, so a failed decode
/// can be located in the original buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {offset}: wanted {wanted} more bytes, {available} available")]
    UnexpectedEnd {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("invalid tag byte {tag} at offset {offset}")]
    InvalidTag { offset: usize, tag: u8 },

    #[error("invalid UTF-8 in string starting at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

/// Forward-only cursor over a raw state buffer.
///
/// The lockup wire format mixes fixed-width little-endian integers, tagged
/// unions and options with no embedded record length, so decoding is a
/// single forward pass. There is no backtracking.
pub struct StateReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads `N` raw bytes, used for fixed-size digests.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        Ok(u128::from_le_bytes(self.read_fixed()?))
    }

    /// Reads a u32 length prefix followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset: start })
    }

    /// Reads a 1-byte presence flag: 0 means absent, 1 means present
    /// followed by the payload. Any other value is an invalid tag.
    pub fn read_option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        let offset = self.pos;
        match self.read_u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            tag => Err(DecodeError::InvalidTag { offset, tag }),
        }
    }

    /// Reads a u32 count prefix followed by that many encodings of `T`.
    pub fn read_array<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.read_u32()? as usize;
        // Cap the pre-allocation; a garbage count prefix fails on read, not
        // on allocation.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }
}

/// Encoder mirroring [`StateReader`] for the records this crate needs to
/// re-serialize, primarily vesting schedules for hash verification.
#[derive(Default)]
pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u128(&mut self, value: u128) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a u32 length prefix followed by the string's UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Writes the 1-byte presence flag and, when present, the payload.
    pub fn write_option<T>(&mut self, value: Option<&T>, write: impl FnOnce(&mut Self, &T)) {
        match value {
            None => self.write_u8(0),
            Some(inner) => {
                self.write_u8(1);
                write(self, inner);
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_integers_round_trip() {
        let mut writer = StateWriter::new();
        writer.write_u8(7);
        writer.write_u32(40_000);
        writer.write_u64(1_000_000_000_000);
        writer.write_u128(u128::MAX);
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 40_000);
        assert_eq!(reader.read_u64().unwrap(), 1_000_000_000_000);
        assert_eq!(reader.read_u128().unwrap(), u128::MAX);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn string_round_trip() {
        let mut writer = StateWriter::new();
        writer.write_string("alice.near");
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "alice.near");
        assert_eq!(reader.position(), 4 + "alice.near".len());
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut writer = StateWriter::new();
        writer.write_u32(2);
        writer.write_bytes(&[0xff, 0xfe]);
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert_eq!(
            reader.read_string().unwrap_err(),
            DecodeError::InvalidUtf8 { offset: 0 }
        );
    }

    #[test]
    fn truncated_read_reports_offset() {
        let bytes = [1u8, 2];
        let mut reader = StateReader::new(&bytes);
        reader.read_u8().unwrap();
        assert_eq!(
            reader.read_u64().unwrap_err(),
            DecodeError::UnexpectedEnd {
                offset: 1,
                wanted: 8,
                available: 1,
            }
        );
    }

    #[test]
    fn option_absent_present_and_invalid() {
        let mut reader = StateReader::new(&[0]);
        assert_eq!(reader.read_option(|r| r.read_u8()).unwrap(), None);
        assert_eq!(reader.position(), 1);

        let mut reader = StateReader::new(&[1, 5]);
        assert_eq!(reader.read_option(|r| r.read_u8()).unwrap(), Some(5));

        let mut reader = StateReader::new(&[2]);
        assert_eq!(
            reader.read_option(|r| r.read_u8()).unwrap_err(),
            DecodeError::InvalidTag { offset: 0, tag: 2 }
        );
    }

    #[test]
    fn array_reads_count_prefix() {
        let mut writer = StateWriter::new();
        writer.write_u32(3);
        writer.write_u64(1);
        writer.write_u64(2);
        writer.write_u64(3);
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert_eq!(reader.read_array(|r| r.read_u64()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn array_with_garbage_count_fails_on_read() {
        let mut writer = StateWriter::new();
        writer.write_u32(u32::MAX);
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert!(matches!(
            reader.read_array(|r| r.read_u64()),
            Err(DecodeError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn write_option_round_trip() {
        let mut writer = StateWriter::new();
        writer.write_option(Some(&42u64), |w, v| w.write_u64(*v));
        writer.write_option::<u64>(None, |w, v| w.write_u64(*v));
        let bytes = writer.into_bytes();

        let mut reader = StateReader::new(&bytes);
        assert_eq!(reader.read_option(|r| r.read_u64()).unwrap(), Some(42));
        assert_eq!(reader.read_option(|r| r.read_u64()).unwrap(), None);
    }
}
