//! PDF object types emitted by the writer.

use std::collections::HashMap;

/// Dictionary payload shared by dictionaries and streams.
pub type Dict = HashMap<String, Object>;

/// A value the writer can serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// `null`
    Null,
    Boolean(bool),
    Integer(i64),
    /// Written with at most five decimals
    Real(f64),
    /// Raw bytes, written literal or hex depending on content
    String(Vec<u8>),
    /// Name without the leading `/`
    Name(String),
    Array(Vec<Object>),
    Dictionary(Dict),
    /// Dictionary followed by binary payload; `/Length` is filled in on write
    Stream {
        dict: Dict,
        data: bytes::Bytes,
    },
    /// `id gen R`
    Reference(ObjectRef),
}

/// Number and generation of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub id: u32,
    pub gen: u16,
}

impl ObjectRef {
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(12, 0).to_string(), "12 0 R");
    }
}
