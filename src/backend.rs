//! Text backends over the PDF decoding crates.
//!
//! Each [`PdfBackend`] variant has exactly one constructor; `AUTO` resolves to
//! `lopdf`, which is also the only backend that can hand out page images for
//! OCR.

use crate::error::{AdapterError, AdapterResult};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfBackend {
    Auto,
    Lopdf,
    PdfExtract,
}

impl PdfBackend {
    /// Resolves a wire name. Unknown names are returned as the error so the
    /// caller can record them as ignored.
    pub fn parse(name: &str) -> Result<Self, String> {
        match name.trim().to_ascii_uppercase().as_str() {
            "" | "AUTO" => Ok(Self::Auto),
            "LOPDF" => Ok(Self::Lopdf),
            "PDF_EXTRACT" | "PDFEXTRACT" => Ok(Self::PdfExtract),
            _ => Err(name.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Lopdf => "LOPDF",
            Self::PdfExtract => "PDF_EXTRACT",
        }
    }

    pub fn open(self, path: &Path) -> AdapterResult<Box<dyn TextSource>> {
        match self {
            Self::Auto | Self::Lopdf => Ok(Box::new(LopdfSource::open(path)?)),
            Self::PdfExtract => Ok(Box::new(PdfExtractSource::open(path)?)),
        }
    }
}

/// An encoded raster image embedded in a page, in a format OCR engines read directly.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub data: Vec<u8>,
    pub extension: &'static str,
}

pub trait TextSource {
    fn backend(&self) -> PdfBackend;
    fn page_count(&self) -> u32;
    /// Text layer of a 1-based page.
    fn page_text(&self, page: u32) -> AdapterResult<String>;
    fn page_images(&self, _page: u32) -> Vec<PageImage> {
        Vec::new()
    }
}

pub struct LopdfSource {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfSource {
    pub fn open(path: &Path) -> AdapterResult<Self> {
        let doc = Document::load(path).map_err(|e| AdapterError::source_read(path, e))?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        Self { doc, pages }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;
        // Resources may be inherited from any ancestor in the page tree.
        for _ in 0..32 {
            if let Ok(res) = node.get(b"Resources") {
                let (_, res) = self.doc.dereference(res).ok()?;
                return res.as_dict().ok();
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }
}

impl TextSource for LopdfSource {
    fn backend(&self) -> PdfBackend {
        PdfBackend::Lopdf
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> AdapterResult<String> {
        self.doc
            .extract_text(&[page])
            .map_err(|e| AdapterError::Conversion(format!("page {page}: {e}")))
    }

    fn page_images(&self, page: u32) -> Vec<PageImage> {
        let Some(&page_id) = self.pages.get(&page) else {
            return Vec::new();
        };
        let Some(xobjects) = self
            .resources(page_id)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|x| self.doc.dereference(x).ok())
            .and_then(|(_, x)| x.as_dict().ok())
        else {
            return Vec::new();
        };

        let mut images = Vec::new();
        for (name, obj) in xobjects.iter() {
            let Ok((_, obj)) = self.doc.dereference(obj) else {
                continue;
            };
            let Ok(stream) = obj.as_stream() else {
                continue;
            };
            if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(&b"Image"[..]) {
                continue;
            }
            match image_extension(&stream.dict) {
                Some(extension) => images.push(PageImage {
                    data: stream.content.clone(),
                    extension,
                }),
                None => debug!(
                    "page {page}: skipping image {} with unsupported filter",
                    String::from_utf8_lossy(name)
                ),
            }
        }
        images
    }
}

/// Only filters whose stream bytes are a standalone image file qualify.
fn image_extension(dict: &Dictionary) -> Option<&'static str> {
    let filter = dict.get(b"Filter").ok()?;
    let name = match filter {
        Object::Name(n) => n.as_slice(),
        Object::Array(items) if items.len() == 1 => items[0].as_name().ok()?,
        _ => return None,
    };
    match name {
        b"DCTDecode" => Some("jpg"),
        b"JPXDecode" => Some("jp2"),
        _ => None,
    }
}

pub struct PdfExtractSource {
    pages: Vec<String>,
}

impl PdfExtractSource {
    pub fn open(path: &Path) -> AdapterResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| AdapterError::source_read(path, e))?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| AdapterError::source_read(path, e))?;
        Ok(Self { pages })
    }
}

impl TextSource for PdfExtractSource {
    fn backend(&self) -> PdfBackend {
        PdfBackend::PdfExtract
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> AdapterResult<String> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .cloned()
            .ok_or_else(|| AdapterError::Conversion(format!("page {page} out of range")))
    }
}

/// Builds a PDF with one line of Courier text per page.
///
/// Used by the doctor self-test; also handy for fixtures.
pub fn build_text_pdf(pages: &[&str]) -> AdapterResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| AdapterError::Conversion(format!("encode content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AdapterError::Conversion(format!("serialize pdf: {e}")))?;
    Ok(buf)
}
