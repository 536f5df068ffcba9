use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

/// JPEG quality used for the canonical encoding.
const JPEG_QUALITY: u8 = 90;

/// MIME types accepted as image input.
const ALLOWED_MIME: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/heic",
    "image/heif",
];

/// Extensions accepted when the declared MIME type is missing or wrong
/// (iOS uploads frequently omit or misreport it).
const ALLOWED_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "heif"];

/// One uploaded file as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    /// Declared MIME type, when the uploader sent one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A normalized image: canonical JPEG payload plus derived metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Original stem with the extension replaced by `.jpg`.
    pub filename: String,
    /// Base64 (standard alphabet) of the JPEG bytes, no data-URI envelope.
    pub encoded: String,
    /// Approximate decoded size, `encoded.len() * 3 / 4`.
    pub approx_bytes: usize,
}

/// Per-file normalization failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("not an image: {0}")]
    NotAnImage(String),

    #[error("camera-format decode failed: {0}")]
    CameraDecode(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("jpeg encode failed: {0}")]
    Encode(String),
}

/// A file the batch skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub filename: String,
    pub error: NormalizeError,
}

/// Result of normalizing a batch: input order preserved in both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub normalized: Vec<NormalizedImage>,
    pub rejected: Vec<RejectedFile>,
}

/// Pre-decoder for camera-native formats the raster pipeline cannot read
/// directly (HEIC/HEIF). Implementations return bytes in any format the
/// `image` crate decodes (JPEG, PNG, ...).
pub trait CameraDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, String>;
}

/// Whether the upload looks like an image at all.
///
/// Checks the declared MIME type against the allowlist, falling back to the
/// file extension. Callers may filter with this before normalizing, or let
/// [`Normalizer::normalize`] reject per file.
pub fn is_image_file(file: &UploadedFile) -> bool {
    if let Some(mime) = &file.content_type {
        if ALLOWED_MIME.contains(&mime.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    matches!(extension(&file.filename), Some(ext) if ALLOWED_EXT.contains(&ext.as_str()))
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn is_camera_format(file: &UploadedFile) -> bool {
    if let Some(mime) = &file.content_type {
        let mime = mime.to_ascii_lowercase();
        if mime == "image/heic" || mime == "image/heif" {
            return true;
        }
    }
    if matches!(extension(&file.filename).as_deref(), Some("heic" | "heif")) {
        return true;
    }
    has_heif_brand(&file.bytes)
}

/// ISO-BMFF `ftyp` sniff for HEIF-family major brands.
fn has_heif_brand(bytes: &[u8]) -> bool {
    const BRANDS: &[&[u8; 4]] = &[b"heic", b"heix", b"hevc", b"heif", b"mif1", b"msf1"];
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && BRANDS.iter().any(|b| &bytes[8..12] == *b)
}

fn jpg_filename(original: &str) -> String {
    match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.jpg"),
        _ => format!("{original}.jpg"),
    }
}

/// The media normalizer.
///
/// Stateless apart from the optional camera-format pre-decoder; safe to share.
#[derive(Default)]
pub struct Normalizer {
    camera: Option<Box<dyn CameraDecoder>>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

impl Normalizer {
    /// Normalizer without camera-format support: HEIC/HEIF input is reported
    /// as a per-file [`NormalizeError::CameraDecode`].
    pub fn new() -> Self {
        Self { camera: None }
    }

    /// Attach a pre-decoder for camera-native formats.
    pub fn with_camera_decoder(decoder: Box<dyn CameraDecoder>) -> Self {
        Self {
            camera: Some(decoder),
        }
    }

    /// Normalize one file into the canonical encoding.
    ///
    /// Non-images are rejected with a typed error; camera formats go through
    /// the pre-decoder first; the decoded raster is flattened onto an opaque
    /// white background and re-encoded as JPEG at quality 90.
    pub fn normalize(&self, file: &UploadedFile) -> Result<NormalizedImage, NormalizeError> {
        if !is_image_file(file) {
            return Err(NormalizeError::NotAnImage(file.filename.clone()));
        }

        let raster: Cow<'_, [u8]> = if is_camera_format(file) {
            match &self.camera {
                Some(decoder) => Cow::Owned(
                    decoder
                        .decode(&file.bytes)
                        .map_err(NormalizeError::CameraDecode)?,
                ),
                None => {
                    return Err(NormalizeError::CameraDecode(
                        "no HEIC/HEIF decoder configured".to_string(),
                    ));
                }
            }
        } else {
            Cow::Borrowed(file.bytes.as_slice())
        };

        let decoded = image::load_from_memory(&raster)
            .map_err(|e| NormalizeError::Decode(e.to_string()))?;
        let flattened = flatten_on_white(&decoded);

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(&flattened)
            .map_err(|e| NormalizeError::Encode(e.to_string()))?;

        let encoded = BASE64.encode(&jpeg);
        let approx_bytes = encoded.len() * 3 / 4;

        Ok(NormalizedImage {
            filename: jpg_filename(&file.filename),
            encoded,
            approx_bytes,
        })
    }

    /// Normalize a batch; each file succeeds or fails independently.
    pub fn normalize_batch(&self, files: &[UploadedFile]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for file in files {
            match self.normalize(file) {
                Ok(image) => outcome.normalized.push(image),
                Err(error) => {
                    tracing::warn!(filename = %file.filename, %error, "skipping file");
                    outcome.rejected.push(RejectedFile {
                        filename: file.filename.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}

/// Flatten transparency onto an opaque white background, yielding RGB.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        if alpha == 0 {
            continue;
        }
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ImageEncoder, Rgba, RgbaImage};

    fn png_bytes(pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 2, pixel);
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), 2, 2, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    fn png_upload(filename: &str) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: png_bytes(Rgba([10, 20, 30, 255])),
        }
    }

    struct PngCameraDecoder;

    impl CameraDecoder for PngCameraDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<Vec<u8>, String> {
            Ok(png_bytes(Rgba([1, 2, 3, 255])))
        }
    }

    #[test]
    fn normalizes_a_png_into_base64_jpeg() {
        let result = Normalizer::new().normalize(&png_upload("photo.png")).unwrap();
        assert_eq!(result.filename, "photo.jpg");
        assert_eq!(result.approx_bytes, result.encoded.len() * 3 / 4);

        let jpeg = BASE64.decode(&result.encoded).unwrap();
        let round = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(round.to_rgb8().dimensions(), (2, 2));
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        let file = UploadedFile {
            filename: "ghost.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: png_bytes(Rgba([0, 0, 0, 0])),
        };
        let result = Normalizer::new().normalize(&file).unwrap();
        let jpeg = BASE64.decode(&result.encoded).unwrap();
        let rgb = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let px = rgb.get_pixel(0, 0);
        // JPEG is lossy; fully transparent input must come back near-white.
        assert!(px[0] > 240 && px[1] > 240 && px[2] > 240, "{px:?}");
    }

    #[test]
    fn non_image_input_is_a_typed_rejection() {
        let file = UploadedFile {
            filename: "notes.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: vec![1, 2, 3],
        };
        let err = Normalizer::new().normalize(&file).unwrap_err();
        assert!(matches!(err, NormalizeError::NotAnImage(_)));
    }

    #[test]
    fn corrupt_image_is_a_decode_failure() {
        let file = UploadedFile {
            filename: "broken.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0; 16],
        };
        let err = Normalizer::new().normalize(&file).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn heic_without_a_camera_decoder_is_reported_per_file() {
        let file = UploadedFile {
            filename: "IMG_0001.heic".to_string(),
            content_type: None,
            bytes: vec![0; 32],
        };
        let err = Normalizer::new().normalize(&file).unwrap_err();
        assert!(matches!(err, NormalizeError::CameraDecode(_)));
    }

    #[test]
    fn heic_goes_through_the_injected_pre_decoder() {
        let normalizer = Normalizer::with_camera_decoder(Box::new(PngCameraDecoder));
        let file = UploadedFile {
            filename: "IMG_0001.heic".to_string(),
            content_type: Some("image/heic".to_string()),
            bytes: vec![0; 32],
        };
        let result = normalizer.normalize(&file).unwrap();
        assert_eq!(result.filename, "IMG_0001.jpg");
    }

    #[test]
    fn heif_brand_is_sniffed_from_the_container_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0, 0, 0, 24]);
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(b"heic");
        bytes.extend_from_slice(&[0; 12]);
        let file = UploadedFile {
            // Misreported type and extension; the container header decides.
            filename: "upload.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes,
        };
        let err = Normalizer::new().normalize(&file).unwrap_err();
        assert!(matches!(err, NormalizeError::CameraDecode(_)));
    }

    #[test]
    fn batch_isolates_failures_per_file() {
        let files = vec![
            png_upload("one.png"),
            UploadedFile {
                filename: "two.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                bytes: vec![1, 2, 3],
            },
            png_upload("three.png"),
        ];
        let outcome = Normalizer::new().normalize_batch(&files);
        assert_eq!(outcome.normalized.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.normalized[0].filename, "one.jpg");
        assert_eq!(outcome.normalized[1].filename, "three.jpg");
        assert_eq!(outcome.rejected[0].filename, "two.txt");
        assert!(matches!(
            outcome.rejected[0].error,
            NormalizeError::NotAnImage(_)
        ));
    }

    #[test]
    fn filenames_without_an_extension_still_get_jpg() {
        let mut file = png_upload("snapshot");
        file.filename = "snapshot".to_string();
        let result = Normalizer::new().normalize(&file).unwrap();
        assert_eq!(result.filename, "snapshot.jpg");
    }
}
