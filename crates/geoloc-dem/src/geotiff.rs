//! Single-band GeoTIFF decoding shared by tiles and offset grids.

use crate::{DemError, Result};
use geoloc_core::GeoTransform;
use std::io::{Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GDAL_NODATA: u16 = 42113;

/// Samples and georeferencing of the first image in a GeoTIFF.
#[derive(Debug)]
pub(crate) struct Raster {
    /// Row-major samples.
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Pixel-corner transform, if the file carries one.
    pub transform: Option<GeoTransform>,
    pub no_data_value: Option<f32>,
}

impl Raster {
    pub(crate) fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut decoder = Decoder::new(std::io::BufReader::new(file))?;

        // 1/3 arc-second tiles are 10812 x 10812 f32 samples, ~466 MB
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let transform = read_transform(&mut decoder)?;
        let no_data_value = read_nodata_value(&mut decoder);
        let data = decode_samples(&mut decoder)?;

        if data.len() != width as usize * height as usize {
            return Err(DemError::InvalidGrid(format!(
                "expected {} samples for {}x{}, found {} (multi-band rasters are not supported)",
                width as usize * height as usize,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            transform,
            no_data_value,
        })
    }
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read the pixel-corner transform from ModelTransformation, or from
/// ModelTiepoint plus ModelPixelScale.
fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    if let Ok(matrix) = decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION)) {
        if matrix.len() < 8 {
            return Err(DemError::InvalidGeoTiff(format!(
                "ModelTransformation has {} values, expected 16",
                matrix.len()
            )));
        }
        // Row-major 4x4: x = m0*i + m1*j + m3, y = m4*i + m5*j + m7
        return Ok(Some(GeoTransform([
            matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
        ])));
    }

    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT));
    let pixel_scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE));
    match (tiepoint, pixel_scale) {
        (Ok(tiepoint), Ok(scale)) => {
            if tiepoint.len() < 6 || scale.len() < 2 {
                return Err(DemError::InvalidGeoTiff(
                    "ModelTiepoint needs 6 values and ModelPixelScale 2".to_string(),
                ));
            }
            // Tiepoint (i, j, k, x, y, z) ties raster (i, j) to map (x, y);
            // rows run south.
            let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
            Ok(Some(GeoTransform::north_up(
                x - i * scale[0],
                scale[0],
                y + j * scale[1],
                -scale[1],
            )))
        }
        _ => Ok(None),
    }
}

/// GDAL_NODATA is an ASCII tag.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
}

fn decode_samples<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let data = match decoder.read_image()? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    };
    Ok(data)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Writes small single-band GeoTIFF fixtures.

    use super::*;
    use std::path::PathBuf;
    use tiff::encoder::{colortype, TiffEncoder};

    pub(crate) enum Georeference {
        TiepointScale { origin: (f64, f64), scale: (f64, f64) },
        Transformation(GeoTransform),
        None,
    }

    pub(crate) fn write_geotiff(
        dir: &Path,
        name: &str,
        width: u32,
        height: u32,
        data: &[f32],
        georeference: Georeference,
        no_data: Option<&str>,
    ) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width, height)
            .unwrap();

        match georeference {
            Georeference::TiepointScale { origin, scale } => {
                image
                    .encoder()
                    .write_tag(tag(MODEL_TIEPOINT), &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..])
                    .unwrap();
                image
                    .encoder()
                    .write_tag(tag(MODEL_PIXEL_SCALE), &[scale.0, scale.1, 0.0][..])
                    .unwrap();
            }
            Georeference::Transformation(t) => {
                let t = t.terms();
                let matrix = [
                    t[1], t[2], 0.0, t[0], //
                    t[4], t[5], 0.0, t[3], //
                    0.0, 0.0, 0.0, 0.0, //
                    0.0, 0.0, 0.0, 1.0,
                ];
                image
                    .encoder()
                    .write_tag(tag(MODEL_TRANSFORMATION), &matrix[..])
                    .unwrap();
            }
            Georeference::None => {}
        }
        if let Some(no_data) = no_data {
            image.encoder().write_tag(tag(GDAL_NODATA), no_data).unwrap();
        }

        image.write_data(data).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_read_tiepoint_scale() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let path = write_geotiff(
            dir.path(),
            "grid.tif",
            3,
            2,
            &data,
            Georeference::TiepointScale {
                origin: (-123.0, 48.0),
                scale: (0.5, 0.25),
            },
            Some("-9999"),
        );

        let raster = Raster::read(&path).unwrap();
        assert_eq!((raster.width, raster.height), (3, 2));
        assert_eq!(raster.data, data);
        assert_eq!(raster.no_data_value, Some(-9999.0));
        assert_eq!(
            raster.transform,
            Some(GeoTransform([-123.0, 0.5, 0.0, 48.0, 0.0, -0.25]))
        );
    }

    #[test]
    fn test_read_transformation_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let transform = GeoTransform([10.0, 0.1, 0.02, 5.0, 0.0, -0.1]);
        let path = write_geotiff(
            dir.path(),
            "rotated.tif",
            2,
            2,
            &[1.0, 2.0, 3.0, 4.0],
            Georeference::Transformation(transform),
            None,
        );

        let raster = Raster::read(&path).unwrap();
        assert_eq!(raster.transform, Some(transform));
        assert_eq!(raster.no_data_value, None);
    }

    #[test]
    fn test_read_without_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_geotiff(dir.path(), "plain.tif", 1, 1, &[7.0], Georeference::None, None);
        assert!(Raster::read(&path).unwrap().transform.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Raster::read(dir.path().join("missing.tif")),
            Err(DemError::Io(_))
        ));
    }
}
