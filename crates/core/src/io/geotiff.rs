//! Single-band GeoTIFF reading and writing
//!
//! Uses the `tiff` crate. Georeferencing is read from and written to the
//! ModelPixelScale/ModelTiepoint tags; the GDAL_NODATA tag is honoured on
//! read (matching cells become NaN) and always written as `nan`.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Grid};
use ndarray::{Array2, ArrayView2};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::{debug, warn};

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Tag the file as geographic WGS84 (EPSG:4326) rather than projected
    pub geographic: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { geographic: true }
    }
}

fn tiff_error(context: &str, e: tiff::TiffError) -> Error {
    Error::Other(format!("{}: {}", context, e))
}

/// Read the first band of a GeoTIFF file as `f64`, no-data as NaN
pub fn read_band<P: AsRef<Path>>(path: P) -> Result<(Array2<f64>, GeoTransform)> {
    let file = File::open(path.as_ref())?;
    read_band_from_reader(BufReader::new(file))
}

/// Same as [`read_band`] for any `Read + Seek` source
pub fn read_band_from_reader<R: Read + Seek>(reader: R) -> Result<(Array2<f64>, GeoTransform)> {
    let mut decoder = Decoder::new(reader).map_err(|e| tiff_error("TIFF decode error", e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_error("cannot read dimensions", e))?;
    let (rows, cols) = (height as usize, width as usize);

    macro_rules! widen {
        ($buf:expr) => {
            $buf.into_iter().map(|v| v as f64).collect::<Vec<f64>>()
        };
    }

    let mut values = match decoder
        .read_image()
        .map_err(|e| tiff_error("cannot read image data", e))?
    {
        DecodingResult::F64(buf) => buf,
        DecodingResult::F32(buf) => widen!(buf),
        DecodingResult::U8(buf) => widen!(buf),
        DecodingResult::U16(buf) => widen!(buf),
        DecodingResult::U32(buf) => widen!(buf),
        DecodingResult::U64(buf) => widen!(buf),
        DecodingResult::I8(buf) => widen!(buf),
        DecodingResult::I16(buf) => widen!(buf),
        DecodingResult::I32(buf) => widen!(buf),
        DecodingResult::I64(buf) => widen!(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("TIFF pixel format".into())),
    };

    if values.len() != rows * cols {
        // Multi-sample (RGB, interleaved bands) images are not single-band grids
        return Err(Error::InvalidDimensions {
            bands: values.len() / (rows * cols).max(1),
            rows,
            cols,
        });
    }

    if let Some(nodata) = read_nodata(&mut decoder) {
        debug!("GDAL_NODATA = {}", nodata);
        for v in values.iter_mut().filter(|v| **v == nodata) {
            *v = f64::NAN;
        }
    }

    let transform = read_geotransform(&mut decoder).unwrap_or_else(|| {
        warn!("no georeferencing tags found, using unit cells at the origin");
        GeoTransform::default()
    });

    Ok((Array2::from_shape_vec((rows, cols), values)?, transform))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    text.trim_matches(char::from(0)).trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: raster (I, J, K) -> model (X, Y, Z)
    Some(GeoTransform::new(
        tiepoint[3] - tiepoint[0] * scale[0],
        tiepoint[4] + tiepoint[1] * scale[1],
        scale[0],
        -scale[1],
    ))
}

/// Read named bands from one file each and stack them into a [`Grid`].
///
/// All files must share dimensions and georeferencing.
pub fn read_grid<S, P>(bands: &[(S, P)]) -> Result<Grid>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let mut names = Vec::with_capacity(bands.len());
    let mut arrays = Vec::with_capacity(bands.len());
    let mut reference: Option<(GeoTransform, (usize, usize), PathBuf)> = None;

    for (name, path) in bands {
        let path = path.as_ref();
        let (data, transform) = read_band(path)?;
        match &reference {
            None => reference = Some((transform, data.dim(), path.to_path_buf())),
            Some((t, dim, first)) => {
                if *dim != data.dim() || !t.approx_eq(&transform) {
                    return Err(Error::GeometryMismatch(format!(
                        "{} does not share the grid of {}",
                        path.display(),
                        first.display()
                    )));
                }
            }
        }
        names.push(name.as_ref().to_string());
        arrays.push(data);
    }

    let transform = reference.map(|(t, _, _)| t).unwrap_or_default();
    Grid::from_band_arrays(transform, names, arrays)
}

/// Write one band as a 32-bit float GeoTIFF
pub fn write_band<P: AsRef<Path>>(
    band: ArrayView2<'_, f64>,
    transform: &GeoTransform,
    path: P,
    options: &GeoTiffOptions,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_band_to_writer(band, transform, BufWriter::new(file), options)
}

/// Same as [`write_band`] for any `Write + Seek` sink
pub fn write_band_to_writer<W: Write + Seek>(
    band: ArrayView2<'_, f64>,
    transform: &GeoTransform,
    writer: W,
    options: &GeoTiffOptions,
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_error("TIFF encoder error", e))?;
    let (rows, cols) = band.dim();
    let data: Vec<f32> = band.iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_error("cannot create TIFF image", e))?;

    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    // Key directory header (version 1.1.0, N keys) followed by (key, location, count, value)
    let geokeys: Vec<u16> = if options.geographic {
        vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]
    } else {
        vec![1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1]
    };

    let encoder = image.encoder();
    encoder
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| tiff_error("cannot write scale tag", e))?;
    encoder
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| tiff_error("cannot write tiepoint tag", e))?;
    encoder
        .write_tag(GEO_KEY_DIRECTORY, geokeys.as_slice())
        .map_err(|e| tiff_error("cannot write geokey tag", e))?;
    encoder
        .write_tag(GDAL_NODATA, "nan")
        .map_err(|e| tiff_error("cannot write nodata tag", e))?;

    image
        .write_data(&data)
        .map_err(|e| tiff_error("cannot write image data", e))?;
    Ok(())
}

/// Write every band of `grid` to `<dir>/<band>.tif`, returning the paths
pub fn write_grid<P: AsRef<Path>>(grid: &Grid, dir: P, options: &GeoTiffOptions) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    grid.band_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let path = dir.join(format!("{}.tif", name));
            write_band(grid.band_at(i), grid.transform(), &path, options)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    fn sample_band() -> Array2<f64> {
        let mut band = Array2::from_shape_fn((6, 8), |(r, c)| (r * 8 + c) as f64 * 0.5);
        band[(2, 3)] = f64::NAN;
        band
    }

    #[test]
    fn test_buffer_roundtrip() {
        let band = sample_band();
        let transform = GeoTransform::north_up(-80.0, 60.0, 0.25);

        let mut buf = Vec::new();
        write_band_to_writer(band.view(), &transform, Cursor::new(&mut buf), &GeoTiffOptions::default())
            .unwrap();
        let (read, read_transform) = read_band_from_reader(Cursor::new(buf)).unwrap();

        assert_eq!(read.dim(), (6, 8));
        assert!(read[(2, 3)].is_nan());
        assert_relative_eq!(read[(5, 7)], 23.5);
        assert!(read_transform.approx_eq(&transform));
    }

    #[test]
    fn test_grid_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let transform = GeoTransform::north_up(0.0, 6.0, 1.0);
        let grid = Grid::from_bands(
            transform,
            vec![("bio01".into(), sample_band()), ("bio12".into(), sample_band() * 2.0)],
        )
        .unwrap();

        let paths = write_grid(&grid, dir.path(), &GeoTiffOptions::default()).unwrap();
        assert_eq!(paths.len(), 2);

        let bands: Vec<(&str, PathBuf)> = vec![("bio01", paths[0].clone()), ("bio12", paths[1].clone())];
        let read = read_grid(&bands).unwrap();
        assert_eq!(read.band_names(), grid.band_names());
        assert_relative_eq!(read.band("bio12").unwrap()[(1, 1)], 9.0);
    }

    #[test]
    fn test_read_grid_rejects_misaligned_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tif");
        let b = dir.path().join("b.tif");
        let opts = GeoTiffOptions::default();
        write_band(sample_band().view(), &GeoTransform::north_up(0.0, 6.0, 1.0), &a, &opts).unwrap();
        write_band(sample_band().view(), &GeoTransform::north_up(1.0, 6.0, 1.0), &b, &opts).unwrap();

        let result = read_grid(&[("a", &a), ("b", &b)]);
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }
}
