/// LUT compute service
///
/// Applies a cube or Hald LUT to an image. Images travel as
/// `data:image/...;base64,` URIs in both directions; the result is always PNG.
///
/// Both LUT kinds are normalized to the same lattice (red index varies
/// fastest) and sampled with trilinear interpolation.

use cgmath::{Vector3, VectorSpace};
use image::{ImageFormat, RgbaImage};
use log::{debug, error};
use std::future::Future;
use std::io::Cursor;
use tokio::task;

use super::loader::{decode_data_uri, to_data_uri};
use crate::error::LutError;
use crate::state::data::{ImageRef, LutKind, LutPayload};

/// The service that turns (image, LUT) into a new image
pub trait LutCompute: Send + Sync {
    fn apply_lut(
        &self,
        image: &ImageRef,
        payload: &LutPayload,
        kind: LutKind,
    ) -> impl Future<Output = Result<ImageRef, LutError>> + Send;
}

/// Applies LUTs on the CPU in a blocking worker thread
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuLutCompute;

impl LutCompute for CpuLutCompute {
    async fn apply_lut(&self, image: &ImageRef, payload: &LutPayload, kind: LutKind) -> Result<ImageRef, LutError> {
        let image = image.clone();
        let payload = payload.clone();

        // Spawn blocking because decoding and per-pixel sampling are CPU-intensive
        let result = task::spawn_blocking(move || apply_lut_blocking(&image, &payload, kind))
            .await
            .map_err(|e| LutError::compute(format!("task join error: {}", e)))?;

        if let Err(e) = &result {
            error!("❌ {}", e);
        }
        result
    }
}

/// 3D color lattice, `size³` entries with red varying fastest
#[derive(Debug, Clone, PartialEq)]
pub struct CubeLut {
    pub size: usize,
    pub data: Vec<Vector3<f32>>,
}

impl CubeLut {
    fn at(&self, r: usize, g: usize, b: usize) -> Vector3<f32> {
        self.data[r + g * self.size + b * self.size * self.size]
    }

    /// Trilinear lookup of a color in [0, 1]
    pub fn sample(&self, color: Vector3<f32>) -> Vector3<f32> {
        let max = (self.size - 1) as f32;
        let axis = |c: f32| {
            let pos = c.clamp(0.0, 1.0) * max;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(self.size - 1);
            (lo, hi, pos - lo as f32)
        };
        let (r0, r1, fr) = axis(color.x);
        let (g0, g1, fg) = axis(color.y);
        let (b0, b1, fb) = axis(color.z);

        let c00 = self.at(r0, g0, b0).lerp(self.at(r1, g0, b0), fr);
        let c10 = self.at(r0, g1, b0).lerp(self.at(r1, g1, b0), fr);
        let c01 = self.at(r0, g0, b1).lerp(self.at(r1, g0, b1), fr);
        let c11 = self.at(r0, g1, b1).lerp(self.at(r1, g1, b1), fr);

        let c0 = c00.lerp(c10, fg);
        let c1 = c01.lerp(c11, fg);
        c0.lerp(c1, fb)
    }

    /// Apply to every pixel, alpha is kept
    pub fn apply(&self, image: &mut RgbaImage) {
        for pixel in image.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let input = Vector3::new(r as f32, g as f32, b as f32) / 255.0;
            let output = self.sample(input);
            pixel.0[0] = to_u8(output.x);
            pixel.0[1] = to_u8(output.y);
            pixel.0[2] = to_u8(output.z);
        }
    }
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Parse `.cube` text
///
/// `LUT_3D_SIZE` is required; other keywords (TITLE, DOMAIN_MIN, ...) are
/// ignored. Every line of three numbers is one lattice entry.
pub fn parse_cube_lut(text: &str) -> Result<CubeLut, String> {
    let mut size: Option<usize> = None;
    let mut data = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts[0] == "LUT_3D_SIZE" {
            let value = parts.get(1).ok_or("LUT_3D_SIZE has no value")?;
            size = Some(value.parse().map_err(|e| format!("invalid LUT_3D_SIZE '{}': {}", value, e))?);
            continue;
        }

        // Keyword lines start with a letter, data lines with a number
        if parts[0].parse::<f32>().is_err() {
            continue;
        }
        if parts.len() != 3 {
            return Err(format!("expected 3 values per data line, found {}: '{}'", parts.len(), line));
        }
        let mut rgb = [0.0f32; 3];
        for (slot, part) in rgb.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|e| format!("invalid value '{}': {}", part, e))?;
        }
        data.push(Vector3::from(rgb));
    }

    let size = size.ok_or("LUT_3D_SIZE not found in .cube file")?;
    if size < 2 {
        return Err(format!("LUT_3D_SIZE must be at least 2, got {}", size));
    }
    let expected = size
        .checked_pow(3)
        .ok_or_else(|| format!("LUT_3D_SIZE {} is too large", size))?;
    if data.len() != expected {
        return Err(format!(
            "LUT data size does not match LUT_3D_SIZE ({} entries, expected {})",
            data.len(),
            expected
        ));
    }

    Ok(CubeLut { size, data })
}

/// Read a Hald CLUT image into a lattice
///
/// A level-L Hald image is square with side L³ and encodes a cube of size L².
pub fn hald_to_cube(hald: &RgbaImage) -> Result<CubeLut, String> {
    let (width, height) = hald.dimensions();
    if width != height {
        return Err(format!("Hald CLUT must be square, got {}x{}", width, height));
    }

    let level = (width as f64).cbrt().round() as u32;
    if level < 2 || level * level * level != width {
        return Err(format!("Hald CLUT side {} is not a cube of an integer level >= 2", width));
    }

    // size³ == width * height for a valid Hald image
    let size = (level * level) as usize;
    let data = (0..width as usize * height as usize)
        .map(|index| {
            let x = index as u32 % width;
            let y = index as u32 / width;
            let [r, g, b, _] = hald.get_pixel(x, y).0;
            Vector3::new(r as f32, g as f32, b as f32) / 255.0
        })
        .collect();

    Ok(CubeLut { size, data })
}

/// Blocking implementation of the LUT compute request
fn apply_lut_blocking(image: &ImageRef, payload: &LutPayload, kind: LutKind) -> Result<ImageRef, LutError> {
    if payload.kind() != kind {
        return Err(LutError::compute(format!("{} payload sent as {} LUT", payload.kind(), kind)));
    }

    let mut pixels = decode_data_uri_image(image.as_str()).map_err(LutError::compute)?;

    let lut = match payload {
        LutPayload::Text(text) => parse_cube_lut(text),
        LutPayload::DataUri(uri) => decode_data_uri_image(uri).and_then(|hald| hald_to_cube(&hald)),
    }
    .map_err(LutError::compute)?;

    debug!(
        "🎨 Applying {} LUT (size {}) to {}x{} image",
        kind,
        lut.size,
        pixels.width(),
        pixels.height()
    );
    lut.apply(&mut pixels);

    let mut png_bytes: Vec<u8> = Vec::new();
    pixels
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(LutError::compute)?;

    Ok(ImageRef::new(to_data_uri(&png_bytes, "png")))
}

/// Decode `data:image/...;base64,<data>` into RGBA pixels
pub fn decode_data_uri_image(uri: &str) -> Result<RgbaImage, String> {
    let bytes = decode_data_uri(uri)?;
    let image = image::load_from_memory(&bytes).map_err(|e| format!("could not decode image: {}", e))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const IDENTITY_CUBE: &str = "TITLE \"identity\"\n# two point lattice\nLUT_3D_SIZE 2\nDOMAIN_MIN 0.0 0.0 0.0\n\
        0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";

    const INVERT_CUBE: &str = "LUT_3D_SIZE 2\n\
        1 1 1\n0 1 1\n1 0 1\n0 0 1\n1 1 0\n0 1 0\n1 0 0\n0 0 0\n";

    fn png_uri(image: &RgbaImage) -> String {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        to_data_uri(&bytes, "png")
    }

    fn sample_image() -> RgbaImage {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, Rgba([51, 102, 204, 128]));
        image.put_pixel(1, 1, Rgba([255, 255, 255, 0]));
        image
    }

    fn identity_hald(level: u32) -> RgbaImage {
        let side = level * level * level;
        let size = level * level;
        let mut hald = RgbaImage::new(side, side);
        for index in 0..size * size * size {
            let r = index % size;
            let g = (index / size) % size;
            let b = index / (size * size);
            let scale = |v: u32| (v as f32 / (size - 1) as f32 * 255.0).round() as u8;
            hald.put_pixel(index % side, index / side, Rgba([scale(r), scale(g), scale(b), 255]));
        }
        hald
    }

    fn assert_close(actual: &RgbaImage, expected: &RgbaImage) {
        assert_eq!(actual.dimensions(), expected.dimensions());
        for (a, e) in actual.pixels().zip(expected.pixels()) {
            for channel in 0..4 {
                let diff = (a.0[channel] as i16 - e.0[channel] as i16).abs();
                assert!(diff <= 1, "pixel {:?} != {:?}", a, e);
            }
        }
    }

    #[test]
    fn test_parse_cube_lut() {
        let lut = parse_cube_lut(IDENTITY_CUBE).unwrap();
        assert_eq!(lut.size, 2);
        assert_eq!(lut.data.len(), 8);
        assert_eq!(lut.data[1], Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_cube_lut_requires_size() {
        let err = parse_cube_lut("0 0 0\n1 1 1\n").unwrap_err();
        assert!(err.contains("LUT_3D_SIZE not found"));
    }

    #[test]
    fn test_parse_cube_lut_rejects_short_table() {
        let err = parse_cube_lut("LUT_3D_SIZE 2\n0 0 0\n").unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn test_parse_cube_lut_rejects_huge_size() {
        let err = parse_cube_lut("LUT_3D_SIZE 9999999\n0 0 0\n").unwrap_err();
        assert!(err.contains("too large"), "{}", err);
    }

    #[tokio::test]
    async fn test_huge_cube_size_is_reported_not_panicking() {
        let image = ImageRef::new(png_uri(&sample_image()));
        let payload = LutPayload::Text("LUT_3D_SIZE 9999999\n0 0 0\n".into());

        match CpuLutCompute.apply_lut(&image, &payload, LutKind::CubeText).await {
            Err(LutError::Compute(detail)) => assert!(detail.contains("too large"), "{}", detail),
            other => panic!("expected compute error, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_interpolates() {
        let lut = parse_cube_lut(INVERT_CUBE).unwrap();
        let out = lut.sample(Vector3::new(0.25, 0.5, 1.0));
        assert!((out.x - 0.75).abs() < 1e-5);
        assert!((out.y - 0.5).abs() < 1e-5);
        assert!(out.z.abs() < 1e-5);
    }

    #[test]
    fn test_hald_identity_matches_cube_identity() {
        let lut = hald_to_cube(&identity_hald(2)).unwrap();
        assert_eq!(lut.size, 4);

        let mut image = sample_image();
        lut.apply(&mut image);
        assert_close(&image, &sample_image());
    }

    #[test]
    fn test_hald_must_be_a_cube_level() {
        assert!(hald_to_cube(&RgbaImage::new(8, 4)).is_err());
        assert!(hald_to_cube(&RgbaImage::new(10, 10)).is_err());
    }

    #[tokio::test]
    async fn test_apply_cube_inverts_colors() {
        let image = ImageRef::new(png_uri(&sample_image()));
        let payload = LutPayload::Text(INVERT_CUBE.to_string());

        let result = CpuLutCompute.apply_lut(&image, &payload, LutKind::CubeText).await.unwrap();

        assert!(result.as_str().starts_with("data:image/png;base64,"));
        let output = decode_data_uri_image(result.as_str()).unwrap();
        assert_eq!(output.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(output.get_pixel(1, 0).0, [0, 255, 255, 255]);
        assert_eq!(output.get_pixel(0, 1).0, [204, 153, 51, 128]);
        assert_eq!(output.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_apply_hald_identity() {
        let image = ImageRef::new(png_uri(&sample_image()));
        let payload = LutPayload::DataUri(png_uri(&identity_hald(2)));

        let result = CpuLutCompute.apply_lut(&image, &payload, LutKind::HaldImage).await.unwrap();

        assert_close(&decode_data_uri_image(result.as_str()).unwrap(), &sample_image());
    }

    #[tokio::test]
    async fn test_bad_inputs_are_compute_errors() {
        let image = ImageRef::new(png_uri(&sample_image()));

        let corrupt_hald = LutPayload::DataUri("data:image/png;base64,AQID".into());
        let result = CpuLutCompute.apply_lut(&image, &corrupt_hald, LutKind::HaldImage).await;
        assert!(matches!(result, Err(LutError::Compute(_))));

        let bad_cube = LutPayload::Text("LUT_3D_SIZE 2\n".into());
        let result = CpuLutCompute.apply_lut(&image, &bad_cube, LutKind::CubeText).await;
        assert!(matches!(result, Err(LutError::Compute(_))));

        let not_a_uri = ImageRef::new("/photos/img.jpg");
        let cube = LutPayload::Text(INVERT_CUBE.into());
        let result = CpuLutCompute.apply_lut(&not_a_uri, &cube, LutKind::CubeText).await;
        assert!(matches!(result, Err(LutError::Compute(_))));

        let result = CpuLutCompute.apply_lut(&image, &cube, LutKind::HaldImage).await;
        assert!(matches!(result, Err(LutError::Compute(_))));
    }
}
