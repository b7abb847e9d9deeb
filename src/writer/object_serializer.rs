//! Byte-level output of [`Object`] values.
//!
//! Objects go straight into an `io::Write` sink (ISO 32000-1 §7.3 syntax),
//! so a page can reach the disk as soon as it is composited.

use crate::object::{Dict, Object, ObjectRef};
use std::io::Write;

/// Writes objects in PDF syntax, dictionaries on a single line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Serializer used by [`PdfWriter`](super::PdfWriter).
    pub fn compact() -> Self {
        Self
    }

    /// Write an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn write_indirect<W: Write>(
        &self,
        w: &mut W,
        obj_ref: ObjectRef,
        obj: &Object,
    ) -> std::io::Result<()> {
        writeln!(w, "{} {} obj", obj_ref.id, obj_ref.gen)?;
        self.write_object(w, obj)?;
        write!(w, "\nendobj\n")
    }

    /// Write an object.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => write!(w, "{}", r),
        }
    }

    /// Write a real number, trimmed to at most 5 decimals.
    fn write_real<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        if value.fract() == 0.0 {
            write!(w, "{}", value as i64)
        } else {
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            write!(w, "{}", trimmed)
        }
    }

    /// Write a PDF string: literal `(...)` for printable ASCII, hex `<...>` otherwise.
    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if !is_printable {
            write!(w, "<")?;
            for byte in data {
                write!(w, "{:02X}", byte)?;
            }
            return write!(w, ">");
        }

        write!(w, "(")?;
        for &byte in data {
            match byte {
                b'(' => write!(w, "\\(")?,
                b')' => write!(w, "\\)")?,
                b'\\' => write!(w, "\\\\")?,
                b'\n' => write!(w, "\\n")?,
                b'\r' => write!(w, "\\r")?,
                b'\t' => write!(w, "\\t")?,
                _ => w.write_all(&[byte])?,
            }
        }
        write!(w, ")")
    }

    /// Write a PDF name, escaping delimiters and non-regular bytes as `#xx`.
    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            let regular = byte.is_ascii_graphic()
                && !matches!(
                    byte,
                    b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
                );
            if regular {
                w.write_all(&[byte])?;
            } else {
                write!(w, "#{:02X}", byte)?;
            }
        }
        Ok(())
    }

    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")
    }

    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dict) -> std::io::Result<()> {
        write!(w, "<<")?;

        // Sorted keys keep output deterministic
        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                write!(w, " ")?;
                self.write_name(w, key)?;
                write!(w, " ")?;
                self.write_object(w, value)?;
            }
        }

        write!(w, " >>")
    }

    fn write_stream<W: Write>(&self, w: &mut W, dict: &Dict, data: &[u8]) -> std::io::Result<()> {
        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));

        self.write_dictionary(w, &dict_with_length)?;
        write!(w, "\nstream\n")?;
        w.write_all(data)?;
        write!(w, "\nendstream")
    }
}

/// Object constructors used when building pages and trailers.
impl ObjectSerializer {
    /// `/s`
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Text string: ASCII as-is, anything else as UTF-16BE with a byte order mark.
    pub fn string(s: &str) -> Object {
        if s.is_ascii() {
            Object::String(s.as_bytes().to_vec())
        } else {
            Object::String(encode_utf16_be(s))
        }
    }

    pub fn integer(i: i64) -> Object {
        Object::Integer(i)
    }

    /// Dictionary from `(key, value)` pairs.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(Self::dict_map(entries))
    }

    /// Bare map, for stream dictionaries.
    pub fn dict_map(entries: Vec<(&str, Object)>) -> Dict {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// `id gen R`
    pub fn reference(obj_ref: ObjectRef) -> Object {
        Object::Reference(obj_ref)
    }

    /// `[llx lly urx ury]` for a box at `(x, y)` of the given size.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Object {
        Object::Array(vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(x + width),
            Object::Real(y + height),
        ])
    }
}

fn encode_utf16_be(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + s.len() * 2);
    out.extend_from_slice(&[0xFE, 0xFF]);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(obj: &Object) -> String {
        let mut buf = Vec::new();
        ObjectSerializer::compact().write_object(&mut buf, obj).unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(text(&Object::Null), "null");
        assert_eq!(text(&Object::Boolean(true)), "true");
        assert_eq!(text(&Object::Integer(-123)), "-123");
        assert_eq!(text(&Object::Reference(ObjectRef::new(5, 0))), "5 0 R");
    }

    #[test]
    fn test_serialize_real() {
        assert_eq!(text(&Object::Real(841.89)), "841.89");
        assert_eq!(text(&Object::Real(595.0)), "595");
        assert_eq!(text(&Object::Real(0.123456789)), "0.12346");
    }

    #[test]
    fn test_serialize_strings() {
        assert_eq!(text(&Object::String(b"Report (draft)".to_vec())), "(Report \\(draft\\))");
        assert_eq!(text(&Object::String(vec![0x00, 0xFF])), "<00FF>");
    }

    #[test]
    fn test_ascii_text_string_stays_literal() {
        assert_eq!(text(&ObjectSerializer::string("Invoice 7")), "(Invoice 7)");
    }

    #[test]
    fn test_non_ascii_text_string_is_utf16_with_bom() {
        assert_eq!(text(&ObjectSerializer::string("Café")), "<FEFF00430061006600E9>");
        // outside the BMP: surrogate pair
        assert_eq!(text(&ObjectSerializer::string("\u{1F4C4}")), "<FEFFD83DDCC4>");
    }

    #[test]
    fn test_serialize_name_escaping() {
        assert_eq!(text(&ObjectSerializer::name("XObject")), "/XObject");
        assert_eq!(text(&ObjectSerializer::name("Im 1")), "/Im#201");
        assert_eq!(text(&ObjectSerializer::name("a/b")), "/a#2Fb");
    }

    #[test]
    fn test_serialize_dictionary_sorted() {
        let dict = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            ("Count", ObjectSerializer::integer(1)),
        ]);
        assert_eq!(text(&dict), "<< /Count 1 /Type /Page >>");
    }

    #[test]
    fn test_write_indirect_stream() {
        let s = ObjectSerializer::compact();
        let stream = Object::Stream {
            dict: ObjectSerializer::dict_map(vec![("Filter", ObjectSerializer::name("FlateDecode"))]),
            data: bytes::Bytes::from_static(b"q Q"),
        };
        let mut buf = Vec::new();
        s.write_indirect(&mut buf, ObjectRef::new(7, 0), &stream).unwrap();
        let out = String::from_utf8_lossy(&buf);
        assert!(out.starts_with("7 0 obj\n"));
        assert!(out.contains("/Length 3"));
        assert!(out.contains("stream\nq Q\nendstream"));
        assert!(out.ends_with("endobj\n"));
    }

    #[test]
    fn test_rect_helper() {
        let rect = ObjectSerializer::rect(0.0, 0.0, 842.0, 595.0);
        assert_eq!(text(&rect), "[0 0 842 595]");
    }
}
