use super::*;

/// Sequential little-endian reader over an immutable byte buffer.
///
/// Every read either consumes exactly the bytes it needs or fails with
/// [`Error::BufferUnderrun`] and leaves the offset untouched.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::BufferUnderrun {
                offset: self.offset,
                needed: len,
                remaining,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_bin<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buffer = [0u8; N];
        buffer.copy_from_slice(self.take(N)?);
        Ok(buffer)
    }

    fn read_array<T, const W: usize>(
        &mut self,
        len: usize,
        f: fn([u8; W]) -> T,
    ) -> Result<Vec<T>, Error> {
        let size = len.checked_mul(W).ok_or(Error::BufferUnderrun {
            offset: self.offset,
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        let bytes = self.take(size)?;
        Ok(bytes
            .chunks_exact(W)
            .map(|chunk| {
                let mut buffer = [0u8; W];
                buffer.copy_from_slice(chunk);
                f(buffer)
            })
            .collect())
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bin::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.read_bin::<2>()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(i16::from_le_bytes(self.read_bin::<2>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.read_bin::<4>()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_le_bytes(self.read_bin::<4>()?))
    }

    pub fn read_u8_array(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_u16_array(&mut self, len: usize) -> Result<Vec<u16>, Error> {
        self.read_array(len, u16::from_le_bytes)
    }

    pub fn read_i16_array(&mut self, len: usize) -> Result<Vec<i16>, Error> {
        self.read_array(len, i16::from_le_bytes)
    }

    pub fn read_u32_array(&mut self, len: usize) -> Result<Vec<u32>, Error> {
        self.read_array(len, u32::from_le_bytes)
    }

    pub fn read_f32_array(&mut self, len: usize) -> Result<Vec<f32>, Error> {
        self.read_array(len, f32::from_le_bytes)
    }

    pub fn read_vec<const N: usize>(&mut self) -> Result<[f32; N], Error> {
        let bytes = self.take(4 * N)?;
        let mut buffer = [0.0f32; N];
        for (v, chunk) in buffer.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(buffer)
    }

    pub fn read_vec2(&mut self) -> Result<[f32; 2], Error> {
        self.read_vec::<2>()
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], Error> {
        self.read_vec::<3>()
    }

    pub fn read_vec4(&mut self) -> Result<[f32; 4], Error> {
        self.read_vec::<4>()
    }

    /// Reads `len` bytes as windows-1252 text, terminators included.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, Error> {
        let bytes = self.take(len)?;
        Ok(decode_text(bytes, Encoding::Ascii))
    }

    /// Reads a `len`-byte field and decodes the bytes before its first zero.
    ///
    /// A field without a terminator is decoded whole.
    pub fn read_zero_terminated_string(
        &mut self,
        len: usize,
        encoding: Encoding,
    ) -> Result<String, Error> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if end == 0 {
            return Ok(String::new());
        }
        Ok(decode_text(&bytes[..end], encoding))
    }
}

fn decode_text(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        // ascii labels resolve to windows-1252, as in WHATWG decoders
        Encoding::Ascii => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
        Encoding::ShiftJis => encoding_rs::SHIFT_JIS
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}
