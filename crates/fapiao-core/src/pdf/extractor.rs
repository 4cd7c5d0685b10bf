//! PDF text and image extraction using lopdf and pdf-extract.

use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::text_layout::layout_from_page_text;
use super::{PdfPage, Result};
use crate::error::PdfError;
use crate::media::ImageSource;

/// A loaded PDF document.
pub struct PdfLayoutSource {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfLayoutSource {
    /// Parse a PDF, decrypting it when it uses the empty password.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads the bytes, so it needs the decrypted copy.
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Every page in order.
    ///
    /// Pages whose trimmed text is shorter than `min_text_length` also carry
    /// their first decodable embedded image.
    pub fn pages(&self, min_text_length: usize) -> Result<Vec<PdfPage>> {
        let texts = pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let count = self.page_count();
        let mut pages = Vec::with_capacity(count as usize);
        for number in 1..=count {
            let layout = texts
                .get(number as usize - 1)
                .map(|text| layout_from_page_text(text))
                .unwrap_or_default();
            let image = if layout.is_blank(min_text_length) {
                self.page_image(number)?
            } else {
                None
            };
            trace!(
                "Page {}: {} chars, image: {}",
                number,
                layout.full_text.chars().count(),
                image.is_some()
            );
            pages.push(PdfPage {
                number,
                layout,
                image,
            });
        }
        Ok(pages)
    }

    /// First embedded image of a page that can be decoded.
    pub fn page_image(&self, page: u32) -> Result<Option<ImageSource>> {
        let pages = self.document.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let Some(resources) = self.page_resources(*page_id) else {
            return Ok(None);
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(None);
        };
        let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) else {
            return Ok(None);
        };

        let mut image = None;
        for (_, obj) in xobjects.iter() {
            let Ok((_, obj)) = self.document.dereference(obj) else {
                continue;
            };
            image = image_from_object(&self.document, obj)?;
            if image.is_some() {
                break;
            }
        }
        debug!("Page {} image found: {}", page, image.is_some());
        Ok(image)
    }

    /// Resources dictionary of a page, following `Parent` inheritance.
    fn page_resources(&self, node_id: ObjectId) -> Option<Dictionary> {
        let Ok(Object::Dictionary(dict)) = self.document.get_object(node_id) else {
            return None;
        };
        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = self.document.dereference(resources) {
                return Some(res_dict.clone());
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(*parent_id),
            _ => None,
        }
    }
}

fn image_from_object(doc: &Document, obj: &Object) -> Result<Option<ImageSource>> {
    let Object::Stream(stream) = obj else {
        return Ok(None);
    };
    let dict = &stream.dict;
    let is_image = dict
        .get(b"Subtype")
        .and_then(|o| o.as_name())
        .is_ok_and(|name| name == b"Image");
    if !is_image {
        return Ok(None);
    }

    let dimension = |key: &[u8]| dict.get(key).and_then(|o| o.as_i64()).ok();
    let (Some(raw_width), Some(raw_height)) = (dimension(b"Width"), dimension(b"Height")) else {
        return Ok(None);
    };
    let invalid = || PdfError::ImageDimensions {
        width: raw_width,
        height: raw_height,
    };
    let width = u32::try_from(raw_width).map_err(|_| invalid())?;
    let height = u32::try_from(raw_height).map_err(|_| invalid())?;
    trace!("Found image object {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };
        match filter_name {
            // Already a JPEG stream; pass it through untouched.
            Some(b"DCTDecode") => return Ok(Some(ImageSource::from_jpeg(&stream.content))),
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter");
                return Ok(None);
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return Ok(None);
    }

    let Some(decoded) = raw_image(&data, width, height, color_space)? else {
        return Ok(None);
    };
    Ok(ImageSource::from_image(&decoded).ok())
}

fn raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Result<Option<DynamicImage>> {
    let too_large = || PdfError::ImageDimensions {
        width: width.into(),
        height: height.into(),
    };
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;
    let rgb_len = pixels.checked_mul(3).ok_or_else(too_large)?;

    let rgb = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= rgb_len => data[..rgb_len].to_vec(),
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            data[..pixels].iter().flat_map(|&g| [g, g, g]).collect()
        }
        _ => {
            trace!("Could not decode {} bytes of raw image data", data.len());
            return Ok(None);
        }
    };
    Ok(ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8))
}
