// Copyright ⓒ 2024-2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Big-endian primitives shared by every message codec.
//!
//! An [`Encoder`] appends to a growable buffer and never fails on integers.
//! A [`Decoder`] reads from a frame, and fails with
//! [`Error::TruncatedFrame`] rather than reading past its end.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Length of a null string or byte sequence.
const NULL_LENGTH: i16 = -1;

/// The number of bytes a value occupies once encoded.
pub trait ByteSize {
    fn size_in_bytes(&self) -> usize;
}

/// A value that can be written with an [`Encoder`].
pub trait Encode: ByteSize {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()>;

    /// Encode into a buffer sized by [`ByteSize::size_in_bytes`].
    fn encode(&self) -> Result<Bytes> {
        let mut encoder = Encoder::with_capacity(self.size_in_bytes());
        self.encode_into(&mut encoder)?;
        Ok(encoder.finish())
    }
}

/// A value that can be read with a [`Decoder`].
pub trait Decode: Sized {
    fn decode_from(decoder: &mut Decoder) -> Result<Self>;

    /// Decode a value that must occupy every byte of `encoded`.
    fn decode(encoded: impl Into<Bytes>) -> Result<Self> {
        let mut decoder = Decoder::new(encoded);
        let decoded = Self::decode_from(&mut decoder)?;
        decoder.finish().map(|()| decoded)
    }
}

impl ByteSize for i8 {
    fn size_in_bytes(&self) -> usize {
        size_of::<i8>()
    }
}

impl ByteSize for i16 {
    fn size_in_bytes(&self) -> usize {
        size_of::<i16>()
    }
}

impl ByteSize for i32 {
    fn size_in_bytes(&self) -> usize {
        size_of::<i32>()
    }
}

impl ByteSize for i64 {
    fn size_in_bytes(&self) -> usize {
        size_of::<i64>()
    }
}

impl ByteSize for String {
    fn size_in_bytes(&self) -> usize {
        size_of::<i16>() + self.len()
    }
}

impl ByteSize for Option<String> {
    fn size_in_bytes(&self) -> usize {
        size_of::<i16>() + self.as_ref().map_or(0, String::len)
    }
}

impl ByteSize for Option<Bytes> {
    fn size_in_bytes(&self) -> usize {
        size_of::<i32>() + self.as_ref().map_or(0, Bytes::len)
    }
}

impl<T> ByteSize for Vec<T>
where
    T: ByteSize,
{
    fn size_in_bytes(&self) -> usize {
        self.iter()
            .map(ByteSize::size_in_bytes)
            .fold(size_of::<i32>(), |acc, size| acc + size)
    }
}

impl Encode for i32 {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i32(*self);
        Ok(())
    }
}

impl Decode for i32 {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        decoder.get_i32()
    }
}

/// Sequential big-endian writer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buffer.put_i16(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buffer.put_i64(value);
    }

    /// raw bytes without any length prefix
    pub fn put_slice(&mut self, value: &[u8]) {
        self.buffer.put_slice(value);
    }

    /// a string prefixed with its 16-bit length
    pub fn put_string(&mut self, value: &str) -> Result<()> {
        i16::try_from(value.len())
            .map_err(|_| Error::StringTooLong(value.len()))
            .map(|length| {
                self.put_i16(length);
                self.put_slice(value.as_bytes());
            })
    }

    pub fn put_nullable_string(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = value {
            self.put_string(value)
        } else {
            self.put_i16(NULL_LENGTH);
            Ok(())
        }
    }

    /// bytes prefixed with their 32-bit length, or `-1` when null
    pub fn put_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        if let Some(value) = value {
            i32::try_from(value.len()).map_err(Into::into).map(|length| {
                self.put_i32(length);
                self.put_slice(value);
            })
        } else {
            self.put_i32(NULL_LENGTH.into());
            Ok(())
        }
    }

    /// a 32-bit element count followed by each element
    pub fn put_array<T>(&mut self, items: &[T]) -> Result<()>
    where
        T: Encode,
    {
        self.put_i32(i32::try_from(items.len())?);
        items.iter().try_for_each(|item| item.encode_into(self))
    }

    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Sequential big-endian reader over a single frame.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Decoder {
    encoded: Bytes,
}

impl Decoder {
    pub fn new(encoded: impl Into<Bytes>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.encoded.remaining()
    }

    fn ensure(&self, wanted: usize) -> Result<()> {
        let remaining = self.remaining();

        if wanted > remaining {
            Err(Error::TruncatedFrame { wanted, remaining })
        } else {
            Ok(())
        }
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.encoded.try_get_i8().map_err(Into::into)
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.encoded.try_get_i16().map_err(Into::into)
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.encoded.try_get_i32().map_err(Into::into)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.encoded.try_get_u32().map_err(Into::into)
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.encoded.try_get_i64().map_err(Into::into)
    }

    /// the next `length` bytes, without copying
    pub fn get_slice(&mut self, length: usize) -> Result<Bytes> {
        self.ensure(length)?;
        Ok(self.encoded.split_to(length))
    }

    /// a decoder over the next `length` bytes, which are consumed from this one
    pub fn split(&mut self, length: usize) -> Result<Decoder> {
        self.get_slice(length).map(Decoder::new)
    }

    pub fn get_string(&mut self) -> Result<String> {
        self.get_nullable_string()
            .and_then(|string| string.ok_or(Error::InvalidLength(NULL_LENGTH.into())))
    }

    pub fn get_nullable_string(&mut self) -> Result<Option<String>> {
        match self.get_i16()? {
            NULL_LENGTH => Ok(None),

            length if length < 0 => Err(Error::InvalidLength(length.into())),

            length => self
                .get_slice(usize::try_from(length)?)
                .and_then(|encoded| String::from_utf8(encoded.to_vec()).map_err(Into::into))
                .map(Some),
        }
    }

    pub fn get_bytes(&mut self) -> Result<Option<Bytes>> {
        match self.get_i32()? {
            -1 => Ok(None),

            length if length < 0 => Err(Error::InvalidLength(length)),

            length => self.get_slice(usize::try_from(length)?).map(Some),
        }
    }

    pub fn get_array<T>(&mut self) -> Result<Vec<T>>
    where
        T: Decode,
    {
        let count = self.get_i32()?;
        let count = usize::try_from(count).map_err(|_| Error::InvalidLength(count))?;

        // every element occupies at least one byte
        self.ensure(count)?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode_from(self)?);
        }
        Ok(items)
    }

    /// fails unless every byte of the frame has been consumed
    pub fn finish(self) -> Result<()> {
        if self.encoded.has_remaining() {
            Err(Error::TrailingBytes(self.encoded.remaining()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_is_length_prefixed() -> Result<()> {
        let mut encoder = Encoder::new();
        encoder.put_string("orders")?;

        assert_eq!(
            &[0, 6, 111, 114, 100, 101, 114, 115][..],
            &encoder.finish()[..]
        );
        Ok(())
    }

    #[test]
    fn null_string() -> Result<()> {
        let mut encoder = Encoder::new();
        encoder.put_nullable_string(None)?;

        let mut decoder = Decoder::new(encoder.finish());
        assert_eq!(None, decoder.get_nullable_string()?);
        decoder.finish()
    }

    #[test]
    fn string_too_long() {
        let long = "a".repeat(usize::try_from(i16::MAX).unwrap() + 1);

        assert!(matches!(
            Encoder::new().put_string(&long),
            Err(Error::StringTooLong(length)) if length == long.len()
        ));
    }

    #[test]
    fn get_i32_truncated() {
        assert!(matches!(
            Decoder::new(vec![0, 0, 1]).get_i32(),
            Err(Error::TruncatedFrame {
                wanted: 4,
                remaining: 3
            })
        ));
    }

    #[test]
    fn string_length_exceeds_frame() {
        let mut decoder = Decoder::new(vec![0, 10, 97, 98]);

        assert!(matches!(
            decoder.get_string(),
            Err(Error::TruncatedFrame {
                wanted: 10,
                remaining: 2
            })
        ));
    }

    #[test]
    fn negative_string_length() {
        assert!(matches!(
            Decoder::new(vec![255, 254]).get_string(),
            Err(Error::InvalidLength(-2))
        ));
    }

    #[test]
    fn null_is_not_a_string() {
        assert!(matches!(
            Decoder::new(vec![255, 255]).get_string(),
            Err(Error::InvalidLength(-1))
        ));
    }

    #[test]
    fn array_count_exceeds_frame() {
        assert!(matches!(
            Decoder::new(vec![0x7f, 0xff, 0xff, 0xff]).get_array::<i32>(),
            Err(Error::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn trailing_bytes() -> Result<()> {
        let mut decoder = Decoder::new(vec![0, 0, 0, 7, 1]);
        assert_eq!(7, decoder.get_i32()?);
        assert!(matches!(decoder.finish(), Err(Error::TrailingBytes(1))));
        Ok(())
    }

    #[test]
    fn array_size_matches_encoding() -> Result<()> {
        let replicas = vec![1, 2, 3];

        let mut encoder = Encoder::new();
        encoder.put_array(&replicas)?;

        assert_eq!(replicas.size_in_bytes(), encoder.len());
        assert_eq!(replicas, Decoder::new(encoder.finish()).get_array::<i32>()?);
        Ok(())
    }
}
