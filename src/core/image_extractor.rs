//! First-image extraction from PDF documents
//!
//! Only the first page is inspected. JPEG streams are copied out verbatim;
//! raw rasters are re-encoded as PNG so the scorer can decode every
//! extracted file the same way.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::ItemError;

/// Nested form XObjects deeper than this are not searched
const MAX_FORM_DEPTH: usize = 4;

/// An image written to a scratch file. The file is removed on drop.
#[derive(Debug)]
pub struct ExtractedImage {
    file: NamedTempFile,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ExtractedImage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Extract the first image of the first page of `pdf` into `scratch_dir`
pub fn extract_first_image(pdf: &Path, scratch_dir: &Path) -> Result<ExtractedImage, ItemError> {
    let doc = Document::load(pdf)?;
    extract_from_document(&doc, scratch_dir)
}

/// Same as [`extract_first_image`] for an already loaded document
pub fn extract_from_document(doc: &Document, scratch_dir: &Path) -> Result<ExtractedImage, ItemError> {
    let first_page = doc
        .get_pages()
        .into_values()
        .next()
        .ok_or(ItemError::NoPages)?;

    let resources = page_resources(doc, first_page)?.ok_or(ItemError::NoImages)?;
    let stream = find_first_image(doc, resources, 0).ok_or(ItemError::NoImages)?;

    write_image(doc, stream, scratch_dir)
}

/// Resources of a page, following `Parent` links for inherited entries
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>, ItemError> {
    let mut node = doc.get_dictionary(page_id)?;
    // Bounded walk so a cyclic Parent chain cannot loop forever
    for _ in 0..64 {
        if let Ok(resources) = node.get(b"Resources") {
            return Ok(Some(resolve(doc, resources).as_dict()?));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = doc.get_dictionary(parent)?,
            Err(_) => return Ok(None),
        }
    }
    Err(ItemError::page_tree("page tree too deep"))
}

fn find_first_image<'a>(doc: &'a Document, resources: &'a Dictionary, depth: usize) -> Option<&'a Stream> {
    let xobjects = resources
        .get(b"XObject")
        .map(|obj| resolve(doc, obj))
        .and_then(Object::as_dict)
        .ok()?;

    for (_, value) in xobjects.iter() {
        let Ok(stream) = resolve(doc, value).as_stream() else {
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => return Some(stream),
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                let nested = stream
                    .dict
                    .get(b"Resources")
                    .map(|obj| resolve(doc, obj))
                    .and_then(Object::as_dict);
                if let Ok(nested) = nested {
                    if let Some(found) = find_first_image(doc, nested, depth + 1) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn write_image(doc: &Document, stream: &Stream, scratch_dir: &Path) -> Result<ExtractedImage, ItemError> {
    let width = dict_u32(&stream.dict, b"Width")?;
    let height = dict_u32(&stream.dict, b"Height")?;
    let filters = stream_filters(stream);

    match filters.split_last() {
        Some((last, leading)) if last == "DCTDecode" && !leading.iter().any(|f| is_image_codec(f)) => {
            let jpeg = if leading.is_empty() {
                stream.content.clone()
            } else {
                undo_filters(stream, leading)?
            };
            let mut file = scratch_file(scratch_dir, ".jpg")?;
            file.write_all(&jpeg)?;
            file.flush()?;
            Ok(ExtractedImage {
                file,
                format: ImageFormat::Jpeg,
                width,
                height,
            })
        }
        _ if filters.iter().any(|f| is_image_codec(f)) => Err(ItemError::UnsupportedImage(filters.join(","))),
        _ => {
            let data = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream.decompressed_content()?
            };
            let image = raw_raster(doc, stream, width, height, &data)?;
            let mut file = scratch_file(scratch_dir, ".png")?;
            image.write_to(file.as_file_mut(), ImageFormat::Png)?;
            Ok(ExtractedImage {
                file,
                format: ImageFormat::Png,
                width,
                height,
            })
        }
    }
}

fn is_image_codec(filter: &str) -> bool {
    matches!(filter, "DCTDecode" | "JPXDecode" | "CCITTFaxDecode" | "JBIG2Decode")
}

/// Decode only the `leading` filters of a chain, leaving the final codec's bytes
fn undo_filters(stream: &Stream, leading: &[String]) -> Result<Vec<u8>, ItemError> {
    let mut partial = stream.clone();
    let names: Vec<Object> = leading.iter().map(|f| Object::Name(f.as_bytes().to_vec())).collect();
    partial.dict.set("Filter", names);

    // Parameters are kept only when they belong to the first filter
    let params = match stream.dict.get(b"DecodeParms") {
        Ok(Object::Array(items)) => items.first().filter(|p| p.as_dict().is_ok()).cloned(),
        Ok(Object::Dictionary(dict)) if leading.len() == 1 => Some(Object::Dictionary(dict.clone())),
        _ => None,
    };
    match params {
        Some(params) => partial.dict.set("DecodeParms", params),
        None => {
            partial.dict.remove(b"DecodeParms");
        }
    }
    Ok(partial.decompressed_content()?)
}

fn scratch_file(scratch_dir: &Path, suffix: &str) -> Result<NamedTempFile, ItemError> {
    Ok(tempfile::Builder::new()
        .prefix("image-")
        .suffix(suffix)
        .tempfile_in(scratch_dir)?)
}

/// How samples map to colours
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    /// Gray, RGB or CMYK samples
    Device(u8),
    /// One index per pixel into a table of `base`-component colours
    Indexed { base: u8, hival: usize, palette: Vec<u8> },
}

/// Build an image from uncompressed samples
fn raw_raster(doc: &Document, stream: &Stream, width: u32, height: u32, data: &[u8]) -> Result<DynamicImage, ItemError> {
    let bits = match stream.dict.get(b"BitsPerComponent").and_then(Object::as_i64) {
        Ok(bits @ (1 | 2 | 4 | 8 | 16)) => bits as u8,
        Ok(bits) => return Err(ItemError::UnsupportedImage(format!("{bits} bits per component"))),
        Err(_) => 8,
    };

    match color_space(doc, &stream.dict)? {
        ColorSpace::Device(components) => {
            let samples = read_samples(data, width, height, components, bits)?
                .into_iter()
                .map(|v| scale_to_u8(v, bits))
                .collect();
            to_image(width, height, components, samples)
        }
        ColorSpace::Indexed { base, hival, palette } => {
            let entry = usize::from(base);
            let indices = read_samples(data, width, height, 1, bits)?;
            let mut samples = Vec::with_capacity(indices.len() * entry);
            for index in indices {
                let start = usize::from(index).min(hival) * entry;
                let colour = palette.get(start..start + entry).ok_or_else(|| {
                    ItemError::UnsupportedImage(format!("palette too short for index {index}"))
                })?;
                samples.extend_from_slice(colour);
            }
            to_image(width, height, base, samples)
        }
    }
}

/// Unpack rows of `bits`-wide samples; rows start on a byte boundary
fn read_samples(data: &[u8], width: u32, height: u32, components: u8, bits: u8) -> Result<Vec<u16>, ItemError> {
    let per_row = width as usize * usize::from(components);
    let bits = usize::from(bits);
    let row_bytes = (per_row * bits).div_ceil(8);
    ensure_len(data, row_bytes * height as usize)?;

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data.chunks_exact(row_bytes).take(height as usize) {
        match bits {
            8 => samples.extend(row[..per_row].iter().map(|&b| u16::from(b))),
            16 => samples.extend(
                row.chunks_exact(2)
                    .take(per_row)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let mask = (1u16 << bits) - 1;
                samples.extend((0..per_row).map(|i| {
                    let offset = i * bits;
                    let shift = 8 - bits - offset % 8;
                    (u16::from(row[offset / 8]) >> shift) & mask
                }));
            }
        }
    }
    Ok(samples)
}

/// Stretch or narrow a sample to the 0..=255 range
fn scale_to_u8(value: u16, bits: u8) -> u8 {
    match bits {
        8 => value as u8,
        16 => (value >> 8) as u8,
        _ => {
            let max = (1u32 << bits) - 1;
            (u32::from(value) * 255 / max) as u8
        }
    }
}

fn to_image(width: u32, height: u32, components: u8, samples: Vec<u8>) -> Result<DynamicImage, ItemError> {
    let image = match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 255 - u16::from(cmyk[3]);
                    [0, 1, 2].map(|i| ((255 - u16::from(cmyk[i])) * k / 255) as u8)
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        n => return Err(ItemError::UnsupportedImage(format!("{n} colour components"))),
    };
    image.ok_or_else(|| ItemError::UnsupportedImage("sample buffer does not match image size".into()))
}

fn ensure_len(data: &[u8], expected: usize) -> Result<(), ItemError> {
    if data.len() < expected {
        return Err(ItemError::UnsupportedImage(format!(
            "truncated samples: {} of {} bytes",
            data.len(),
            expected
        )));
    }
    Ok(())
}

/// Colour space declared by an image dictionary
fn color_space(doc: &Document, dict: &Dictionary) -> Result<ColorSpace, ItemError> {
    if dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false) {
        return Ok(ColorSpace::Device(1));
    }
    let space = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve(doc, obj),
        Err(_) => return Ok(ColorSpace::Device(1)),
    };

    if let Object::Array(items) = space {
        let family = items.first().map(|o| resolve(doc, o)).and_then(|o| o.as_name().ok());
        if family == Some(b"Indexed".as_slice()) || family == Some(b"I".as_slice()) {
            return indexed_space(doc, items);
        }
    }
    device_components(doc, space).map(ColorSpace::Device)
}

/// `[/Indexed base hival lookup]`
fn indexed_space(doc: &Document, items: &[Object]) -> Result<ColorSpace, ItemError> {
    let [_, base, hival, lookup] = items else {
        return Err(ItemError::UnsupportedImage("malformed Indexed colour space".into()));
    };

    let base = device_components(doc, resolve(doc, base))?;
    let hival = resolve(doc, hival)
        .as_i64()
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ItemError::UnsupportedImage("Indexed colour space without hival".into()))?
        .min(255);
    let palette = match resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(table) if stream_filters(table).is_empty() => table.content.clone(),
        Object::Stream(table) => table.decompressed_content()?,
        _ => return Err(ItemError::UnsupportedImage("unreadable Indexed lookup table".into())),
    };

    Ok(ColorSpace::Indexed { base, hival, palette })
}

/// Number of colour components of a non-indexed colour space
fn device_components(doc: &Document, space: &Object) -> Result<u8, ItemError> {
    match space {
        Object::Name(name) => components_for_name(name),
        Object::Array(items) => {
            let family = items.first().map(|o| resolve(doc, o)).and_then(|o| o.as_name().ok());
            match family {
                Some(b"ICCBased") => {
                    let profile = items.get(1).map(|o| resolve(doc, o)).and_then(|o| o.as_stream().ok());
                    match profile.and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok()) {
                        Some(n @ (1 | 3 | 4)) => Ok(n as u8),
                        _ => Err(ItemError::UnsupportedImage("ICC profile without usable /N".into())),
                    }
                }
                Some(name) => components_for_name(name),
                None => Err(ItemError::UnsupportedImage("empty colour space".into())),
            }
        }
        _ => Err(ItemError::UnsupportedImage("unreadable colour space".into())),
    }
}

fn components_for_name(name: &[u8]) -> Result<u8, ItemError> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        other => Err(ItemError::UnsupportedImage(format!(
            "colour space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn stream_filters(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Result<u32, ItemError> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            ItemError::UnsupportedImage(format!("missing /{}", String::from_utf8_lossy(key)))
        })
}

/// Follow a single indirect reference, leaving direct objects untouched
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}
