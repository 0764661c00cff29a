//! Add, change or insert message headers

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use crate::encoding::Writable;

/// Append a header to the message
#[doc(alias = "SMFIR_ADDHEADER")]
#[derive(Debug, Clone)]
pub struct AddHeader {
    name: BytesMut,
    value: BytesMut,
}

impl AddHeader {
    const CODE: u8 = b'h';

    /// Add a header with the given name and value
    #[must_use]
    pub fn new(name: &[u8], value: &[u8]) -> Self {
        Self {
            name: BytesMut::from_iter(name),
            value: BytesMut::from_iter(value),
        }
    }

    /// The name of the header
    #[must_use]
    pub fn name(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.name)
    }

    /// The value of the header
    #[must_use]
    pub fn value(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.value)
    }
}

impl Writable for AddHeader {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.name);
        buffer.put_u8(0);
        buffer.extend_from_slice(&self.value);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.name.len() + 1 + self.value.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Change one occurrence of an existing header.
///
/// The index is 1-based and counts only headers sharing `name`; an
/// empty value deletes that occurrence entirely.
#[doc(alias = "SMFIR_CHGHEADER")]
#[derive(Debug, Clone)]
pub struct ChangeHeader {
    index: u32,
    name: BytesMut,
    value: BytesMut,
}

impl ChangeHeader {
    const CODE: u8 = b'm';

    /// Change the `index`th header called `name` to `value`
    #[must_use]
    pub fn new(index: u32, name: &[u8], value: &[u8]) -> Self {
        Self {
            index,
            name: BytesMut::from_iter(name),
            value: BytesMut::from_iter(value),
        }
    }

    /// Delete the `index`th header called `name`
    #[must_use]
    pub fn delete(index: u32, name: &[u8]) -> Self {
        Self::new(index, name, b"")
    }

    /// The name of the header
    #[must_use]
    pub fn name(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.name)
    }

    /// The value of the header
    #[must_use]
    pub fn value(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.value)
    }

    /// The per-name index of the occurrence to change
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Writable for ChangeHeader {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.put_slice(&u32::to_be_bytes(self.index));
        buffer.extend_from_slice(&self.name);
        buffer.put_u8(0);
        buffer.extend_from_slice(&self.value);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        4 + self.name.len() + 1 + self.value.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Insert a header at a position in the full header list
///
/// Index 0 inserts at the very top.
#[doc(alias = "SMFIR_INSHEADER")]
#[derive(Debug, Clone)]
pub struct InsertHeader {
    index: u32,
    name: BytesMut,
    value: BytesMut,
}

impl InsertHeader {
    const CODE: u8 = b'i';

    /// Insert a `name: value` header before list position `index`
    #[must_use]
    pub fn new(index: u32, name: &[u8], value: &[u8]) -> Self {
        Self {
            index,
            name: BytesMut::from_iter(name),
            value: BytesMut::from_iter(value),
        }
    }

    /// The name of the header
    #[must_use]
    pub fn name(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.name)
    }

    /// The value of the header
    #[must_use]
    pub fn value(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.value)
    }

    /// The list index at which to insert this header
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Writable for InsertHeader {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.put_slice(&u32::to_be_bytes(self.index));
        buffer.extend_from_slice(&self.name);
        buffer.put_u8(0);
        buffer.extend_from_slice(&self.value);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        4 + self.name.len() + 1 + self.value.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}
