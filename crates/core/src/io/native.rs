//! Native GeoTIFF reading/writing using the `tiff` crate.
//!
//! DEMs are read as single-band rasters with ModelPixelScale/ModelTiepoint
//! georeferencing and an optional GDAL no-data tag. Direction stacks are
//! written as one 32-bit float page per azimuth; each page carries the
//! georeferencing tags and an `ImageDescription` with the page metadata.

use crate::error::{Error, Result};
use crate::io::StackWriter;
use crate::projection::Projection;
use crate::raster::{GeoTransform, PackagedStack, Raster};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

fn tiff_err(what: &str, e: impl std::fmt::Display) -> Error {
    Error::Format(format!("{}: {}", what, e))
}

/// Read a single-band GeoTIFF DEM.
///
/// Cells equal to the GDAL no-data value are replaced with NaN. The file must
/// carry ModelPixelScale + ModelTiepoint or ModelTransformation tags, since
/// cell spacing cannot be guessed.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF DEM from an in-memory buffer
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<Raster> {
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<Raster> {
    let mut decoder = Decoder::new(reader).map_err(|e| tiff_err("TIFF decode error", e))?;
    let (rows, cols) = dimensions(&mut decoder)?;
    let transform = read_geotransform(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;
    let data = read_page(&mut decoder, cells(rows, cols)?)?;

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(transform);
    if let Some(nd) = nodata {
        raster.set_nodata(Some(nd));
        let masked = raster.mask_nodata();
        debug!(nodata = nd, masked, "masked no-data cells");
    }
    Ok(raster)
}

fn dimensions<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<(usize, usize)> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_err("Cannot read dimensions", e))?;
    Ok((height as usize, width as usize))
}

fn cells(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or_else(|| Error::Format(format!("{}x{} image is too large", rows, cols)))
}

/// GDAL stores the no-data value as ASCII text.
fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder
        .find_tag(Tag::GdalNodata)
        .map_err(|e| tiff_err("Cannot read no-data tag", e))?
    else {
        return Ok(None);
    };
    let text = value
        .into_string()
        .map_err(|e| tiff_err("Malformed no-data tag", e))?;
    let text = text.trim().trim_end_matches('\0');
    match text.parse::<f64>() {
        Ok(nd) => Ok(Some(nd)),
        Err(_) if text.eq_ignore_ascii_case("nan") => Ok(None),
        Err(_) => Err(Error::Format(format!("bad no-data value '{}'", text))),
    }
}

/// Decode the current page as f64 values.
fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>, expected: usize) -> Result<Vec<f64>> {
    let result = decoder
        .read_image()
        .map_err(|e| tiff_err("Cannot read image data", e))?;

    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I32(buf) => buf.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != expected {
        return Err(Error::Format(format!(
            "page holds {} samples, expected {} (multi-band DEMs are not supported)",
            data.len(),
            expected
        )));
    }
    Ok(data)
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>> {
    decoder
        .find_tag(tag)
        .map_err(|e| tiff_err("Cannot read georeferencing tag", e))?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(|e| tiff_err("Malformed georeferencing tag", e))
}

/// Read the GeoTransform from ModelTiepoint + ModelPixelScale, or from
/// ModelTransformation when the file uses the affine form.
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = find_f64_vec(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64_vec(decoder, Tag::ModelTiepointTag)?;

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(Error::Format("truncated pixel scale or tiepoint tag".into()));
        }
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    if let Some(m) = find_f64_vec(decoder, Tag::ModelTransformationTag)? {
        if m.len() < 8 {
            return Err(Error::Format("truncated model transformation tag".into()));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(Error::Format("rotated or sheared GeoTIFFs are not supported".into()));
        }
        return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
    }

    Err(Error::Format(
        "GeoTIFF has no georeferencing tags; cell spacing is unknown".into(),
    ))
}

/// Write a DEM raster as a 32-bit float GeoTIFF.
///
/// Masked cells go out as the raster's no-data marker, recorded in the GDAL tag.
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file).map_err(|e| tiff_err("TIFF encoder error", e))?;
    let fill = raster.nodata().unwrap_or(f64::NAN);
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| if v.is_nan() { fill as f32 } else { v as f32 })
        .collect();
    let (rows, cols) = raster.shape();
    write_page(&mut encoder, rows, cols, raster.transform(), None, raster.nodata(), &data)
}

/// Append one georeferenced Gray32Float page.
fn write_page<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    rows: usize,
    cols: usize,
    gt: &GeoTransform,
    description: Option<&str>,
    nodata: Option<f64>,
    data: &[f32],
) -> Result<()> {
    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;

    // Minimal GeoKeyDirectory: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
        .map_err(|e| tiff_err("Cannot write geokey tag", e))?;

    if let Some(text) = description {
        image
            .encoder()
            .write_tag(Tag::ImageDescription, text)
            .map_err(|e| tiff_err("Cannot write description tag", e))?;
    }

    if let Some(nd) = nodata {
        image
            .encoder()
            .write_tag(Tag::GdalNodata, nd.to_string().as_str())
            .map_err(|e| tiff_err("Cannot write no-data tag", e))?;
    }

    image
        .write_data(data)
        .map_err(|e| tiff_err("Cannot write image data", e))
}

/// Per-page metadata serialized into `ImageDescription`.
fn page_description(stack: &PackagedStack, k: usize) -> String {
    format!(
        "variable={};direction={};description={};projection={}",
        stack.variable_name, stack.azimuths[k], stack.description, stack.projection
    )
}

#[derive(Debug, Default)]
struct PageMeta {
    variable: Option<String>,
    direction: Option<f64>,
    description: Option<String>,
    projection: Option<String>,
}

fn parse_page_description(text: &str) -> PageMeta {
    let mut meta = PageMeta::default();
    for field in text.trim_end_matches('\0').split(';') {
        if let Some((key, value)) = field.split_once('=') {
            match key.trim() {
                "variable" => meta.variable = Some(value.to_string()),
                "direction" => meta.direction = value.trim().parse().ok(),
                "description" => meta.description = Some(value.to_string()),
                "projection" => meta.projection = Some(value.to_string()),
                _ => {}
            }
        }
    }
    meta
}

/// Write a direction stack as a multi-page GeoTIFF, one page per azimuth.
pub fn write_stack_geotiff<P: AsRef<Path>>(stack: &PackagedStack, path: P) -> Result<()> {
    stack.validate()?;
    let (n_dir, rows, cols) = stack.shape();

    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file).map_err(|e| tiff_err("TIFF encoder error", e))?;

    for k in 0..n_dir {
        let page: Vec<f32> = stack.slice(k).iter().map(|&v| v as f32).collect();
        let description = page_description(stack, k);
        write_page(&mut encoder, rows, cols, &stack.transform, Some(&description), None, &page)?;
    }
    Ok(())
}

/// Read a stack written by [`write_stack_geotiff`].
pub fn read_stack_geotiff<P: AsRef<Path>>(path: P) -> Result<PackagedStack> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(file).map_err(|e| tiff_err("TIFF decode error", e))?;
    let (rows, cols) = dimensions(&mut decoder)?;
    let transform = read_geotransform(&mut decoder)?;

    let mut values = Vec::new();
    let mut azimuths = Vec::new();
    let mut first = PageMeta::default();

    loop {
        if dimensions(&mut decoder)? != (rows, cols) {
            return Err(Error::Format("stack pages differ in size".into()));
        }
        let text = decoder
            .get_tag_ascii_string(Tag::ImageDescription)
            .map_err(|e| tiff_err("Page without description", e))?;
        let meta = parse_page_description(&text);
        let direction = meta
            .direction
            .ok_or_else(|| Error::Format(format!("no direction in page description '{}'", text)))?;
        azimuths.push(direction);
        values.extend(read_page(&mut decoder, cells(rows, cols)?)?);
        if azimuths.len() == 1 {
            first = meta;
        }

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| tiff_err("Cannot advance to next page", e))?;
    }

    let data = Array3::from_shape_vec((azimuths.len(), rows, cols), values)
        .map_err(|e| Error::Format(e.to_string()))?;

    Ok(PackagedStack {
        data,
        azimuths,
        x_coords: transform.x_coords(cols),
        y_coords: transform.y_coords(rows),
        projection: first.projection.unwrap_or_else(|| Projection::unknown().to_string()),
        variable_name: first.variable.unwrap_or_else(|| "maxus".to_string()),
        description: first.description.unwrap_or_default(),
        transform,
    })
}

/// [`StackWriter`] producing multi-page GeoTIFF stacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffStackWriter;

impl StackWriter for GeoTiffStackWriter {
    fn format_name(&self) -> &'static str {
        "GeoTIFF"
    }

    fn write(&self, stack: &PackagedStack, path: &Path) -> Result<()> {
        write_stack_geotiff(stack, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_stack() -> PackagedStack {
        let gt = GeoTransform::new(600_000.0, 4_800_000.0, 30.0, -30.0);
        let data = Array3::from_shape_fn((3, 4, 5), |(k, i, j)| {
            k as f64 * 10.0 - i as f64 + j as f64 * 0.25
        });
        PackagedStack {
            data,
            azimuths: vec![0.0, 120.0, 240.0],
            x_coords: gt.x_coords(5),
            y_coords: gt.y_coords(4),
            projection: "EPSG:32611".into(),
            variable_name: "maxus".into(),
            description: "Maximum upwind slope".into(),
            transform: gt,
        }
    }

    #[test]
    fn test_dem_roundtrip() {
        let mut dem = Raster::from_vec((0..12).map(|v| v as f64 * 1.5).collect(), 3, 4).unwrap();
        dem.set_transform(GeoTransform::new(10.0, 100.0, 5.0, -5.0));

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_geotiff(&dem, tmp.path()).unwrap();
        let back = read_geotiff(tmp.path()).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert_eq!(back.get(2, 3).unwrap(), 16.5);
        assert_eq!(back.transform(), dem.transform());
    }

    #[test]
    fn test_dem_nodata_roundtrip() {
        let mut dem = Raster::from_vec(vec![5.0, -9999.0, 7.0, 8.0], 2, 2).unwrap();
        dem.set_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        dem.set_nodata(Some(-9999.0));

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_geotiff(&dem, tmp.path()).unwrap();
        let back = read_geotiff(tmp.path()).unwrap();

        assert_eq!(back.nodata(), Some(-9999.0));
        assert!(back.get(0, 1).unwrap().is_nan());
        assert_eq!(back.get(1, 1).unwrap(), 8.0);
        assert_eq!(back.spacing(), (10.0, 10.0));
    }

    fn plain_tiff(build: impl FnOnce(&mut TiffEncoder<File>)) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut encoder = TiffEncoder::new(File::create(tmp.path()).unwrap()).unwrap();
        build(&mut encoder);
        tmp
    }

    #[test]
    fn test_ungeoreferenced_tiff_is_rejected() {
        let tmp = plain_tiff(|encoder| {
            encoder
                .write_image::<Gray32Float>(3, 2, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap();
        });
        assert!(matches!(read_geotiff(tmp.path()), Err(Error::Format(_))));
        let bytes = std::fs::read(tmp.path()).unwrap();
        assert!(matches!(read_geotiff_from_buffer(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_model_transformation_tag() {
        let tmp = plain_tiff(|encoder| {
            let mut image = encoder.new_image::<Gray32Float>(3, 2).unwrap();
            let matrix = [
                25.0, 0.0, 0.0, 1000.0, //
                0.0, -25.0, 0.0, 5000.0, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            image
                .encoder()
                .write_tag(Tag::ModelTransformationTag, &matrix[..])
                .unwrap();
            image.write_data(&[1.0f32; 6]).unwrap();
        });
        let dem = read_geotiff(tmp.path()).unwrap();
        assert_eq!(dem.spacing(), (25.0, 25.0));
        assert_eq!(dem.transform().origin_x, 1000.0);
        assert_eq!(dem.transform().origin_y, 5000.0);
    }

    #[test]
    fn test_stack_roundtrip() {
        let stack = sample_stack();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        GeoTiffStackWriter.write(&stack, tmp.path()).unwrap();

        let back = read_stack_geotiff(tmp.path()).unwrap();
        assert_eq!(back.shape(), (3, 4, 5));
        assert_eq!(back.azimuths, stack.azimuths);
        assert_eq!(back.projection, "EPSG:32611");
        assert_eq!(back.variable_name, "maxus");
        assert_eq!(back.description, "Maximum upwind slope");
        assert_eq!(back.x_coords, stack.x_coords);
        assert_relative_eq!(back.data[(2, 3, 4)], stack.data[(2, 3, 4)], epsilon = 1e-5);
    }

    #[test]
    fn test_parse_description_ignores_unknown_keys() {
        let meta = parse_page_description("variable=tbreak;direction=45;extra=1;projection=+proj=utm +zone=11");
        assert_eq!(meta.variable.as_deref(), Some("tbreak"));
        assert_eq!(meta.direction, Some(45.0));
        assert_eq!(meta.projection.as_deref(), Some("+proj=utm +zone=11"));
    }
}
