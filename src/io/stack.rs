use gdal::raster::{GdalDataType, GdalType};
use gdal::{Dataset, DriverManager};
use std::path::{Path, PathBuf};

use super::gdal::GdalError;

/// Stack single-band rasters into one multiband GeoTIFF, band order = input order.
///
/// Georeferencing, sample type and size come from the first input; every other
/// input must have the same size.
pub fn write_stack(bands: &[PathBuf], output: &Path) -> Result<usize, GdalError> {
    let first_path = bands
        .first()
        .ok_or_else(|| GdalError::UnsupportedFormat("nothing to stack".into()))?;
    let first = Dataset::open(first_path)?;
    let band_type = first.rasterband(1)?.band_type();
    match band_type {
        GdalDataType::UInt8 => write_stack_typed::<u8>(bands, output, &first),
        GdalDataType::UInt16 => write_stack_typed::<u16>(bands, output, &first),
        GdalDataType::Int16 => write_stack_typed::<i16>(bands, output, &first),
        GdalDataType::UInt32 => write_stack_typed::<u32>(bands, output, &first),
        GdalDataType::Int32 => write_stack_typed::<i32>(bands, output, &first),
        GdalDataType::Float32 => write_stack_typed::<f32>(bands, output, &first),
        _ => write_stack_typed::<f64>(bands, output, &first),
    }
}

fn write_stack_typed<T: GdalType + Copy>(
    bands: &[PathBuf],
    output: &Path,
    first: &Dataset,
) -> Result<usize, GdalError> {
    let (cols, rows) = first.raster_size();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<T, _>(output, cols, rows, bands.len())?;
    if let Ok(gt) = first.geo_transform() {
        ds.set_geo_transform(&gt)?;
    }
    let projection = first.projection();
    if !projection.is_empty() {
        ds.set_projection(&projection)?;
    }

    for (idx, path) in bands.iter().enumerate() {
        let src = Dataset::open(path)?;
        let size = src.raster_size();
        if size != (cols, rows) {
            return Err(GdalError::DimensionMismatch(cols, rows, size.0, size.1));
        }
        let src_band = src.rasterband(1)?;
        let mut buf = src_band.read_as::<T>((0, 0), size, size, None)?;
        let mut dst_band = ds.rasterband(idx + 1)?;
        if let Some(nodata) = src_band.no_data_value() {
            dst_band.set_no_data_value(Some(nodata))?;
        }
        dst_band.write((0, 0), size, &mut buf)?;
    }

    Ok(bands.len())
}
