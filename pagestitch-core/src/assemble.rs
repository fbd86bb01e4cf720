//! Turning compressed pages into one PDF
//!
//! Each JPEG becomes an image XObject drawn over its own page, sized so the
//! image covers it exactly at the configured resolution. The JPEG bytes are
//! embedded untouched behind a `DCTDecode` filter.

use crate::codec::CompressedPage;
use crate::config::AssemblyOptions;
use crate::error::{Result, StitchError};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

const POINTS_PER_INCH: f64 = 72.0;
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    options: AssemblyOptions,
}

impl DocumentAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    /// Page size in points for an image of `width` x `height` pixels
    pub fn page_size(&self, width: u32, height: u32) -> (f64, f64) {
        let scale = POINTS_PER_INCH / self.options.dpi;
        (width as f64 * scale, height as f64 * scale)
    }

    /// Build a PDF whose page order equals the order of `pages`.
    ///
    /// # Errors
    ///
    /// [`StitchError::EmptyDocument`] for an empty slice,
    /// [`StitchError::InvalidPage`] when a buffer is not a JPEG, and
    /// [`StitchError::Assembly`] if serialization fails.
    pub fn assemble(&self, pages: &[CompressedPage]) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(StitchError::EmptyDocument);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            kids.push(Object::Reference(self.add_page(&mut doc, pages_id, page)?));
        }

        let page_tree = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let info_id = doc.add_object(self.info_dictionary());
        doc.trailer.set("Info", Object::Reference(info_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        debug!("Assembled {} pages into {} bytes", pages.len(), buffer.len());
        Ok(buffer)
    }

    fn add_page(
        &self,
        doc: &mut Document,
        parent: ObjectId,
        page: &CompressedPage,
    ) -> Result<ObjectId> {
        if !page.data.starts_with(&JPEG_SOI) {
            return Err(StitchError::InvalidPage {
                counter: page.counter,
            });
        }

        let image = Stream::new(
            Dictionary::from_iter([
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(page.width as i64)),
                ("Height", Object::Integer(page.height as i64)),
                ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
                ("Filter", Object::Name(b"DCTDecode".to_vec())),
            ]),
            page.data.clone(),
        );
        let image_id = doc.add_object(image);

        let name = format!("Im{}", page.counter);
        let (width, height) = self.page_size(page.width, page.height);

        // Unit square scaled to the full page, then the image painted into it
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width as _),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(height as _),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([(
                name.as_str(),
                Object::Reference(image_id),
            )])),
        )]);

        Ok(doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(parent)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width as _),
                    Object::Real(height as _),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ])))
    }

    fn info_dictionary(&self) -> Dictionary {
        let mut info = Dictionary::new();
        if let Some(title) = &self.options.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        info.set("Creator", Object::string_literal(self.options.creator.as_str()));
        info.set("Producer", Object::string_literal(self.options.creator.as_str()));
        info
    }
}
