//! Streaming PDF document writer.
//!
//! Objects go to the output as soon as they are complete: image XObjects
//! when registered, a page and its content stream when the next page starts
//! (or on flush), and the page tree, catalog, xref table and trailer last.
//! Memory stays bounded by one page, and an aborted run leaves whatever was
//! already written on the sink.

use super::content_stream::ContentStreamBuilder;
use super::image_handler::ImageData;
use super::object_serializer::ObjectSerializer;
use crate::compositor::{PageHandle, PdfSink, PlaceableImage};
use crate::config::DocumentMetadata;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::raster::CompressedImage;
use std::io::Write;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Whether to compress page content streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            creator: Some("pagepress".to_string()),
            compress: true,
        }
    }
}

impl PdfWriterConfig {
    /// Build from job metadata.
    pub fn from_metadata(metadata: &DocumentMetadata, compress: bool) -> Self {
        Self {
            title: metadata.title.clone(),
            author: metadata.author.clone(),
            creator: metadata.creator.clone(),
            compress,
            ..Self::default()
        }
    }

    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Compress data using Flate/Deflate compression.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Byte-counting adapter used to record xref offsets.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Page whose content is still being drawn.
struct OpenPage {
    index: usize,
    width: f32,
    height: f32,
    content: ContentStreamBuilder,
    xobjects: Vec<(String, ObjectRef)>,
}

/// Registered image XObject.
struct ImageSlot {
    obj_ref: ObjectRef,
    width: u32,
    height: u32,
}

/// Streaming PDF writer over any `io::Write` sink.
pub struct PdfWriter<W: Write> {
    out: CountingWriter<W>,
    config: PdfWriterConfig,
    serializer: ObjectSerializer,
    next_obj_id: u32,
    offsets: Vec<(u32, u64)>,
    catalog_ref: ObjectRef,
    pages_ref: ObjectRef,
    page_refs: Vec<ObjectRef>,
    open_page: Option<OpenPage>,
    images: Vec<ImageSlot>,
    finished: bool,
}

impl<W: Write> PdfWriter<W> {
    /// Create a writer and emit the PDF header.
    pub fn new(out: W, config: PdfWriterConfig) -> Result<Self> {
        let mut writer = Self {
            out: CountingWriter { inner: out, written: 0 },
            config,
            serializer: ObjectSerializer::compact(),
            next_obj_id: 1,
            offsets: Vec::new(),
            catalog_ref: ObjectRef::new(0, 0),
            pages_ref: ObjectRef::new(0, 0),
            page_refs: Vec::new(),
            open_page: None,
            images: Vec::new(),
            finished: false,
        };
        writer.catalog_ref = writer.alloc_ref();
        writer.pages_ref = writer.alloc_ref();

        writeln!(writer.out, "%PDF-{}", writer.config.version)?;
        // Binary marker (recommended for binary content)
        writer.out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;
        Ok(writer)
    }

    /// Number of pages started so far.
    pub fn page_count(&self) -> usize {
        self.page_refs.len() + usize::from(self.open_page.is_some())
    }

    /// Bytes written to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.out.written
    }

    /// Recover the underlying sink.
    pub fn into_inner(self) -> W {
        self.out.inner
    }

    fn alloc_ref(&mut self) -> ObjectRef {
        let id = self.next_obj_id;
        self.next_obj_id += 1;
        ObjectRef::new(id, 0)
    }

    fn write_object(&mut self, obj_ref: ObjectRef, obj: &Object) -> Result<()> {
        self.offsets.push((obj_ref.id, self.out.written));
        self.serializer.write_indirect(&mut self.out, obj_ref, obj)?;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::Composition("document already flushed".to_string()));
        }
        Ok(())
    }

    /// Write the open page's content stream and page object.
    fn close_page(&mut self) -> Result<()> {
        let Some(page) = self.open_page.take() else {
            return Ok(());
        };

        let raw = page.content.build()?;
        let mut content_dict = ObjectSerializer::dict_map(vec![]);
        let data = if self.config.compress {
            content_dict.insert("Filter".to_string(), ObjectSerializer::name("FlateDecode"));
            compress_data(&raw)?
        } else {
            raw
        };

        let content_ref = self.alloc_ref();
        self.write_object(
            content_ref,
            &Object::Stream {
                dict: content_dict,
                data: bytes::Bytes::from(data),
            },
        )?;

        let xobjects = page
            .xobjects
            .iter()
            .map(|(name, obj_ref)| (name.clone(), Object::Reference(*obj_ref)))
            .collect();

        let page_ref = self.alloc_ref();
        let page_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            ("Parent", ObjectSerializer::reference(self.pages_ref)),
            (
                "MediaBox",
                ObjectSerializer::rect(0.0, 0.0, page.width as f64, page.height as f64),
            ),
            ("Contents", ObjectSerializer::reference(content_ref)),
            (
                "Resources",
                ObjectSerializer::dict(vec![("XObject", Object::Dictionary(xobjects))]),
            ),
        ]);
        self.write_object(page_ref, &page_obj)?;
        self.page_refs.push(page_ref);

        log::debug!("Wrote page {} ({} bytes so far)", page.index + 1, self.out.written);
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        let kids = self.page_refs.iter().copied().map(Object::Reference).collect();
        let pages_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", ObjectSerializer::integer(self.page_refs.len() as i64)),
        ]);
        self.write_object(self.pages_ref, &pages_obj)?;

        let catalog_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", ObjectSerializer::reference(self.pages_ref)),
        ]);
        self.write_object(self.catalog_ref, &catalog_obj)?;

        let creation_date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let mut info_entries = vec![("CreationDate", ObjectSerializer::string(&creation_date))];
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::string(title)));
        }
        if let Some(author) = &self.config.author {
            info_entries.push(("Author", ObjectSerializer::string(author)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::string(creator)));
        }
        let info_obj = ObjectSerializer::dict(info_entries);
        let info_ref = self.alloc_ref();
        self.write_object(info_ref, &info_obj)?;

        let xref_start = self.out.written;
        writeln!(self.out, "xref")?;
        writeln!(self.out, "0 {}", self.next_obj_id)?;
        // Object 0 is always free
        writeln!(self.out, "0000000000 65535 f ")?;

        self.offsets.sort_by_key(|(id, _)| *id);
        for (_, offset) in &self.offsets {
            writeln!(self.out, "{:010} 00000 n ", offset)?;
        }

        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(self.next_obj_id as i64)),
            ("Root", ObjectSerializer::reference(self.catalog_ref)),
            ("Info", ObjectSerializer::reference(info_ref)),
        ]);
        writeln!(self.out, "trailer")?;
        self.serializer.write_object(&mut self.out, &trailer)?;
        writeln!(self.out)?;
        writeln!(self.out, "startxref")?;
        writeln!(self.out, "{}", xref_start)?;
        write!(self.out, "%%EOF")?;
        Ok(())
    }
}

impl<W: Write> PdfSink for PdfWriter<W> {
    fn new_page(&mut self, width: f32, height: f32) -> Result<PageHandle> {
        self.ensure_open()?;
        self.close_page()?;

        let index = self.page_refs.len();
        self.open_page = Some(OpenPage {
            index,
            width,
            height,
            content: ContentStreamBuilder::new(),
            xobjects: Vec::new(),
        });
        Ok(PageHandle(index))
    }

    fn new_image(&mut self, image: CompressedImage) -> Result<PlaceableImage> {
        self.ensure_open()?;
        let data = ImageData::from_compressed(image)?;

        let smask = match (data.build_soft_mask_dict(), &data.soft_mask) {
            (Some(dict), Some(mask)) => {
                let mask_ref = self.alloc_ref();
                self.write_object(
                    mask_ref,
                    &Object::Stream {
                        dict,
                        data: bytes::Bytes::from(mask.clone()),
                    },
                )?;
                Some(Object::Reference(mask_ref))
            },
            _ => None,
        };

        let image_ref = self.alloc_ref();
        let dict = data.build_xobject_dict(smask);
        let (width, height) = (data.width, data.height);
        self.write_object(
            image_ref,
            &Object::Stream {
                dict,
                data: bytes::Bytes::from(data.data),
            },
        )?;

        let id = self.images.len();
        self.images.push(ImageSlot {
            obj_ref: image_ref,
            width,
            height,
        });
        Ok(PlaceableImage::new(id, width, height))
    }

    fn draw_on(&mut self, image: &PlaceableImage, page: PageHandle) -> Result<()> {
        self.ensure_open()?;
        let slot = self
            .images
            .get(image.id())
            .ok_or_else(|| Error::Composition(format!("unknown image {}", image.id())))?;
        let (width, height, obj_ref) = (slot.width, slot.height, slot.obj_ref);

        let open = self
            .open_page
            .as_mut()
            .filter(|p| p.index == page.0)
            .ok_or_else(|| Error::Composition(format!("page {} is no longer open", page.0 + 1)))?;

        let scale = image.scale();
        let display_width = width as f32 * scale;
        let display_height = height as f32 * scale;

        let resource_id = format!("Im{}", image.id() + 1);
        if !open.xobjects.iter().any(|(name, _)| *name == resource_id) {
            open.xobjects.push((resource_id.clone(), obj_ref));
        }
        // Anchor the image's top-left corner at the page's top-left corner
        let y = open.height - display_height;
        open.content.draw_image(&resource_id, 0.0, y, display_width, display_height);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.close_page()?;
        self.write_trailer()?;
        self.out.flush()?;
        self.finished = true;
        log::debug!(
            "Finished PDF: {} pages, {} objects, {} bytes",
            self.page_refs.len(),
            self.next_obj_id - 1,
            self.out.written
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{encode_png, PixelBuffer};

    fn finish(writer: PdfWriter<Vec<u8>>) -> String {
        String::from_utf8_lossy(&writer.into_inner()).to_string()
    }

    fn png(width: u32, height: u32) -> CompressedImage {
        encode_png(&PixelBuffer::filled(width, height, [0, 128, 0, 255])).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let mut writer = PdfWriter::new(Vec::new(), PdfWriterConfig::default()).unwrap();
        writer.flush().unwrap();
        let content = finish(writer);

        assert!(content.starts_with("%PDF-1.7"));
        assert!(content.contains("/Type /Catalog"));
        assert!(content.contains("/Count 0"));
        assert!(content.ends_with("%%EOF"));
    }

    #[test]
    fn test_page_with_image() {
        let config = PdfWriterConfig::default().with_compress(false);
        let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
        let page = writer.new_page(842.0, 595.0).unwrap();
        let mut image = writer.new_image(png(421, 100)).unwrap();
        image.scale_by(2.0);
        writer.draw_on(&image, page).unwrap();
        writer.flush().unwrap();

        let content = finish(writer);
        assert!(content.contains("/Subtype /Image"));
        assert!(content.contains("/Width 421"));
        assert!(content.contains("/MediaBox [0 0 842 595]"));
        assert!(content.contains("/XObject << /Im1"));
        // 842 wide, 200 tall, top-aligned on a 595pt page
        assert!(content.contains("842 0 0 200 0 395 cm"));
        assert!(content.contains("/Im1 Do"));
        assert!(content.contains("/Count 1"));
    }

    #[test]
    fn test_pages_stream_in_order() {
        let mut writer = PdfWriter::new(Vec::new(), PdfWriterConfig::default()).unwrap();
        for _ in 0..3 {
            let page = writer.new_page(595.0, 842.0).unwrap();
            let image = writer.new_image(png(10, 10)).unwrap();
            writer.draw_on(&image, page).unwrap();
        }
        assert_eq!(writer.page_count(), 3);
        let before_flush = writer.bytes_written();
        writer.flush().unwrap();
        assert!(writer.bytes_written() > before_flush);

        let content = finish(writer);
        assert!(content.contains("/Count 3"));
        assert_eq!(content.matches("/Type /Page ").count(), 3);
    }

    #[test]
    fn test_draw_on_closed_page_fails() {
        let mut writer = PdfWriter::new(Vec::new(), PdfWriterConfig::default()).unwrap();
        let first = writer.new_page(595.0, 842.0).unwrap();
        let image = writer.new_image(png(4, 4)).unwrap();
        writer.new_page(595.0, 842.0).unwrap();

        let err = writer.draw_on(&image, first).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Composition);
    }

    #[test]
    fn test_metadata_in_info() {
        let config = PdfWriterConfig::default().with_title("Weekly").with_author("Ops");
        let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
        writer.flush().unwrap();
        let content = finish(writer);
        assert!(content.contains("/Title (Weekly)"));
        assert!(content.contains("/Author (Ops)"));
        assert!(content.contains("/CreationDate (D:"));
    }

    #[test]
    fn test_flush_twice_is_noop() {
        let mut writer = PdfWriter::new(Vec::new(), PdfWriterConfig::default()).unwrap();
        writer.flush().unwrap();
        let len = writer.bytes_written();
        writer.flush().unwrap();
        assert_eq!(writer.bytes_written(), len);
        assert!(writer.new_page(1.0, 1.0).is_err());
    }
}
