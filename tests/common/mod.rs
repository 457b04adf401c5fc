//! Shared fixtures for integration tests
//!
//! PDFs are generated with lopdf at test time. Every page carries a
//! `Marker` string so merged page order can be checked.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdf_batch_rs::prelude::{Interrupt, ProgressObserver};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Write a PDF with one page per marker
pub fn write_marked_pdf(dir: &Path, name: &str, markers: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));

    let kids: Vec<Object> = markers
        .iter()
        .map(|marker| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Marker" => Object::string_literal(*marker),
            })
            .into()
        })
        .collect();

    finish_document(&mut doc, pages_id, kids);
    save(doc, dir, name)
}

fn rgb_samples(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.extend_from_slice(&pixel(x, y));
        }
    }
    samples
}

fn image_dict(width: u32, height: u32) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    }
}

/// Write a one-page PDF showing a raw 8-bit RGB image
pub fn write_rgb_image_pdf(dir: &Path, name: &str, width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> PathBuf {
    let image = Stream::new(image_dict(width, height), rgb_samples(width, height, pixel));
    write_image_pdf(dir, name, image)
}

/// Same as [`write_rgb_image_pdf`] with the samples behind `FlateDecode`
pub fn write_flate_rgb_image_pdf(dir: &Path, name: &str, width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> PathBuf {
    let mut image = Stream::new(image_dict(width, height), rgb_samples(width, height, pixel));
    image.compress().unwrap();
    assert!(image.dict.has(b"Filter"), "fixture samples did not compress");
    write_image_pdf(dir, name, image)
}

/// Write a one-page PDF showing a JPEG (`DCTDecode`) image
pub fn write_jpeg_image_pdf(dir: &Path, name: &str, width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> PathBuf {
    let rgb = image::RgbImage::from_raw(width, height, rgb_samples(width, height, pixel)).unwrap();
    let mut jpeg = Vec::new();
    image::DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .unwrap();

    let mut dict = image_dict(width, height);
    dict.set("Filter", "DCTDecode");
    write_image_pdf(dir, name, Stream::new(dict, jpeg))
}

/// Write a one-page PDF whose image claims to be JPEG but is not
pub fn write_broken_jpeg_pdf(dir: &Path, name: &str) -> PathBuf {
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 8,
            "Height" => 8,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        b"this is not a jpeg stream".to_vec(),
    );
    write_image_pdf(dir, name, image)
}

/// Write bytes that only pretend to be a PDF
pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.7\nRANDOM GARBAGE DATA HERE\n%%EOF").unwrap();
    path
}

fn write_image_pdf(dir: &Path, name: &str, image: Stream) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(image);
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"q 100 0 0 100 0 0 cm /Im1 Do Q".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        },
        "Marker" => Object::string_literal(name),
    });

    finish_document(&mut doc, pages_id, vec![page_id.into()]);
    save(doc, dir, name)
}

fn finish_document(doc: &mut Document, pages_id: ObjectId, kids: Vec<Object>) {
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
}

fn save(mut doc: Document, dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Page markers of a PDF on disk, in page order
pub fn page_markers(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            let marker = page.get(b"Marker").unwrap().as_str().unwrap();
            String::from_utf8_lossy(marker).into_owned()
        })
        .collect()
}

/// Rows of an export file as (path, score field)
pub fn read_export(path: &Path) -> Vec<(String, String)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].to_string())
        })
        .collect()
}

/// Everything a pipeline reported
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Start { label: String, total: usize },
    ItemStarted(String),
    ItemFinished { completed: usize, total: usize },
    Log(Level, String),
    Finish(String),
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<Observed>,
}

impl RecordingObserver {
    pub fn items_started(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Observed::ItemStarted(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn logged(&self, level: Level, needle: &str) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Observed::Log(l, m) if *l == level && m.contains(needle)))
    }
}

impl ProgressObserver for RecordingObserver {
    fn start(&mut self, label: &str, total: usize) {
        self.events.push(Observed::Start {
            label: label.to_string(),
            total,
        });
    }

    fn item_started(&mut self, name: &str) {
        self.events.push(Observed::ItemStarted(name.to_string()));
    }

    fn item_finished(&mut self, completed: usize, total: usize) {
        self.events.push(Observed::ItemFinished { completed, total });
    }

    fn log(&mut self, level: Level, message: &str) {
        self.events.push(Observed::Log(level, message.to_string()));
    }

    fn finish(&mut self, message: &str) {
        self.events.push(Observed::Finish(message.to_string()));
    }
}

/// Records events and requests an interrupt once `after` items are finished
#[derive(Debug)]
pub struct InterruptAfter {
    pub recorder: RecordingObserver,
    pub after: usize,
    pub interrupt: Interrupt,
}

impl InterruptAfter {
    pub fn new(after: usize, interrupt: &Interrupt) -> Self {
        Self {
            recorder: RecordingObserver::default(),
            after,
            interrupt: interrupt.clone(),
        }
    }
}

impl ProgressObserver for InterruptAfter {
    fn start(&mut self, label: &str, total: usize) {
        self.recorder.start(label, total);
    }

    fn item_started(&mut self, name: &str) {
        self.recorder.item_started(name);
    }

    fn item_finished(&mut self, completed: usize, total: usize) {
        self.recorder.item_finished(completed, total);
        if completed == self.after {
            self.interrupt.request();
        }
    }

    fn log(&mut self, level: Level, message: &str) {
        self.recorder.log(level, message);
    }

    fn finish(&mut self, message: &str) {
        self.recorder.finish(message);
    }
}
