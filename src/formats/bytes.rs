use crate::foundation::error::{DeepError, DeepResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

/// Cursor over container bytes; every short read reports [`DeepError::TruncatedData`].
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    endian: Endian,
}

macro_rules! read_num {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self, what: &'static str) -> DeepResult<$ty> {
            let raw = self.array(what)?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(raw),
                Endian::Big => <$ty>::from_be_bytes(raw),
            })
        }
    };
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self {
            bytes,
            pos: 0,
            endian,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Fail unless at least `len` bytes are left, without consuming them.
    pub(crate) fn ensure(&self, len: usize, what: &'static str) -> DeepResult<()> {
        if len > self.remaining() {
            return Err(DeepError::TruncatedData {
                what,
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn take(&mut self, len: usize, what: &'static str) -> DeepResult<&'a [u8]> {
        self.ensure(len, what)?;
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn array<const N: usize>(&mut self, what: &'static str) -> DeepResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    read_num!(u8, u8);
    read_num!(u16, u16);
    read_num!(u32, u32);
    read_num!(u64, u64);
    read_num!(f32, f32);

    /// Read `len` bytes as a UTF-8 string.
    pub(crate) fn utf8(&mut self, len: usize, what: &'static str) -> DeepResult<String> {
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| DeepError::format(format!("{what} is not valid UTF-8: {e}")))
    }

    /// Append `count` floats to `out`.
    ///
    /// The byte length is checked up front so a corrupt count never allocates.
    pub(crate) fn f32s(
        &mut self,
        count: usize,
        what: &'static str,
        out: &mut Vec<f32>,
    ) -> DeepResult<()> {
        let len = count
            .checked_mul(4)
            .ok_or_else(|| DeepError::format(format!("{what} length overflows")))?;
        let raw = self.take(len, what)?;
        let endian = self.endian;
        out.reserve(count);
        out.extend(raw.chunks_exact(4).map(|c| {
            let b = [c[0], c[1], c[2], c[3]];
            match endian {
                Endian::Little => f32::from_le_bytes(b),
                Endian::Big => f32::from_be_bytes(b),
            }
        }));
        Ok(())
    }

    /// Fail when anything is left after the payload.
    pub(crate) fn finish(self) -> DeepResult<()> {
        if self.remaining() != 0 {
            return Err(DeepError::format(format!(
                "{} trailing bytes after payload at offset {}",
                self.remaining(),
                self.pos
            )));
        }
        Ok(())
    }
}

macro_rules! write_num {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self, v: $ty) {
            match self.endian {
                Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
                Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            }
        }
    };
}

#[derive(Debug)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl ByteWriter {
    pub(crate) fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub(crate) fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    write_num!(u8, u8);
    write_num!(u16, u16);
    write_num!(u32, u32);
    write_num!(u64, u64);
    write_num!(f32, f32);

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
