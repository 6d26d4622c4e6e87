//! Encodes flattened page images into the exported PDF.

use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

use crate::error::{AppError, AppResult};

pub trait DocumentWriter {
    /// One output page per image, in the given order.
    fn write_document(&self, images: &[RgbaImage]) -> AppResult<Vec<u8>>;
}

/// Output page size in points for an image laid out at a uniform page width.
pub fn fitted_page_size(page_width: f32, image_width: u32, image_height: u32) -> (f32, f32) {
    if image_width == 0 {
        return (page_width, 0.0);
    }
    let height = image_height as f32 * page_width / image_width as f32;
    (page_width, height)
}

#[derive(Debug, Clone)]
pub struct LopdfWriter {
    page_width: f32,
}

impl LopdfWriter {
    pub fn new(page_width: f32) -> Self {
        Self { page_width }
    }
}

impl DocumentWriter for LopdfWriter {
    fn write_document(&self, images: &[RgbaImage]) -> AppResult<Vec<u8>> {
        if images.is_empty() {
            return Err(AppError::export("no page images to write"));
        }
        if !self.page_width.is_finite() || self.page_width <= 0.0 {
            return Err(AppError::export("page width must be a positive finite value"));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(images.len());

        for image in images {
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(AppError::export("page image has zero size"));
            }
            let (page_width, page_height) = fitted_page_size(self.page_width, width, height);

            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(width),
                    "Height" => i64::from(height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8_i64,
                },
                rgb_on_white(image),
            ));

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            page_width.into(),
                            0_i64.into(),
                            0_i64.into(),
                            page_height.into(),
                            0_i64.into(),
                            0_i64.into(),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content.encode().map_err(|err| {
                AppError::export(format!("failed to encode page content: {err}"))
            })?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0_i64.into(),
                    0_i64.into(),
                    page_width.into(),
                    page_height.into(),
                ],
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        "Im0" => image_id,
                    },
                },
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| AppError::export(format!("failed to serialize document: {err}")))?;
        Ok(bytes)
    }
}

/// Drops alpha by compositing onto white; PDF image XObjects carry no alpha channel here.
fn rgb_on_white(image: &RgbaImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for pixel in image.pixels() {
        let alpha = u32::from(pixel[3]);
        for channel in &pixel.0[..3] {
            let value = (u32::from(*channel) * alpha + 255 * (255 - alpha)) / 255;
            out.push(value as u8);
        }
    }
    out
}
