//! Fixture writers producing small raster files on disk.
//!
//! Both writers take the grid in row-major order, row 0 first, matching
//! the layout the readers hand back.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// Result type for fixture writers.
pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

// GeoTIFF Tag IDs (not in standard tiff crate)
pub const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
pub const GEOTIFF_MODELTIEPOINT: u16 = 33922;
pub const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;
pub const GDAL_METADATA: u16 = 42112;

/// A NetCDF dataset on a regular latitude/longitude grid.
///
/// # Example
///
/// ```ignore
/// GriddedFixture::new(create_axis(-100.0, 0.5, 4), create_axis(40.0, -0.5, 3))
///     .variable("PM25", create_pm25_grid(4, 3))
///     .write(dir.path().join("pm25.nc"))?;
/// ```
#[derive(Debug, Clone)]
pub struct GriddedFixture {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub lon_name: String,
    pub lat_name: String,
    pub variables: Vec<(String, Vec<f32>)>,
    pub fill_value: Option<f32>,
    /// When above 1, variables get a leading `time` dimension; step `t`
    /// holds the base values plus `t * 100`.
    pub time_steps: usize,
}

impl GriddedFixture {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>) -> Self {
        Self {
            lons,
            lats,
            lon_name: "lon".to_string(),
            lat_name: "lat".to_string(),
            variables: Vec::new(),
            fill_value: None,
            time_steps: 1,
        }
    }

    pub fn variable(mut self, name: &str, data: Vec<f32>) -> Self {
        self.variables.push((name.to_string(), data));
        self
    }

    pub fn axis_names(mut self, lon_name: &str, lat_name: &str) -> Self {
        self.lon_name = lon_name.to_string();
        self.lat_name = lat_name.to_string();
        self
    }

    pub fn fill_value(mut self, value: f32) -> Self {
        self.fill_value = Some(value);
        self
    }

    pub fn time_steps(mut self, steps: usize) -> Self {
        self.time_steps = steps;
        self
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> FixtureResult<()> {
        let mut file = netcdf::create(path.as_ref())?;

        file.add_dimension(&self.lat_name, self.lats.len())?;
        file.add_dimension(&self.lon_name, self.lons.len())?;
        if self.time_steps > 1 {
            file.add_dimension("time", self.time_steps)?;
        }

        let mut lat_var = file.add_variable::<f64>(&self.lat_name, &[self.lat_name.as_str()])?;
        lat_var.put_values(&self.lats, ..)?;
        let mut lon_var = file.add_variable::<f64>(&self.lon_name, &[self.lon_name.as_str()])?;
        lon_var.put_values(&self.lons, ..)?;

        let mut dims = Vec::new();
        if self.time_steps > 1 {
            dims.push("time");
        }
        dims.push(self.lat_name.as_str());
        dims.push(self.lon_name.as_str());

        for (name, data) in &self.variables {
            let mut values = Vec::with_capacity(data.len() * self.time_steps);
            for step in 0..self.time_steps {
                values.extend(data.iter().map(|v| {
                    if Some(*v) == self.fill_value {
                        *v
                    } else {
                        v + (step * 100) as f32
                    }
                }));
            }

            let mut var = file.add_variable::<f32>(name, &dims)?;
            if let Some(fill) = self.fill_value {
                var.put_attribute("_FillValue", fill)?;
            }
            var.put_values(&values, ..)?;
        }

        Ok(())
    }
}

/// A north-up, multi-band float GeoTIFF with band descriptions.
#[derive(Debug, Clone)]
pub struct BandStackFixture {
    pub width: usize,
    pub height: usize,
    pub origin: (f64, f64),
    pub pixel_size: (f64, f64),
    /// Band description (None leaves the band undescribed) and its values.
    pub bands: Vec<(Option<String>, Vec<f32>)>,
}

impl BandStackFixture {
    pub fn new(width: usize, height: usize, origin: (f64, f64), pixel_size: (f64, f64)) -> Self {
        Self {
            width,
            height,
            origin,
            pixel_size,
            bands: Vec::new(),
        }
    }

    pub fn band(mut self, description: &str, data: Vec<f32>) -> Self {
        self.bands.push((Some(description.to_string()), data));
        self
    }

    pub fn undescribed_band(mut self, data: Vec<f32>) -> Self {
        self.bands.push((None, data));
        self
    }

    /// GDAL's metadata XML carrying the band descriptions.
    pub fn gdal_metadata(&self) -> String {
        let mut xml = String::from("<GDALMetadata>\n");
        for (i, (description, _)) in self.bands.iter().enumerate() {
            if let Some(description) = description {
                xml.push_str(&format!(
                    "  <Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>\n",
                    i, description
                ));
            }
        }
        xml.push_str("</GDALMetadata>");
        xml
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> FixtureResult<()> {
        let bands = self.bands.len();
        if bands == 0 {
            return Err("a band stack needs at least one band".into());
        }

        let writer = BufWriter::new(File::create(path.as_ref())?);
        let mut encoder = TiffEncoder::new(writer)?;
        let mut dir = encoder.image_directory()?;

        dir.write_tag(Tag::ImageWidth, self.width as u32)?;
        dir.write_tag(Tag::ImageLength, self.height as u32)?;
        let bits_per_sample: Vec<u16> = vec![32; bands];
        dir.write_tag(Tag::BitsPerSample, bits_per_sample.as_slice())?;
        dir.write_tag(Tag::Compression, 1u16)?;
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
        let sample_format: Vec<u16> = vec![3; bands];
        dir.write_tag(Tag::SampleFormat, sample_format.as_slice())?;
        dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
        dir.write_tag(Tag::RowsPerStrip, self.height as u32)?;
        if bands > 1 {
            let extra_samples: Vec<u16> = vec![0; bands - 1];
            dir.write_tag(Tag::ExtraSamples, extra_samples.as_slice())?;
        }

        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
        let pixel_scale = [self.pixel_size.0, self.pixel_size.1, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), pixel_scale.as_slice())?;
        // ModelTiepoint ties pixel (0, 0) to the top-left corner
        let tiepoint = [0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), tiepoint.as_slice())?;
        // Geographic model, pixel-is-area
        let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 2, 1025, 0, 1, 1];
        dir.write_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY), geokeys.as_slice())?;
        let metadata = self.gdal_metadata();
        dir.write_tag(Tag::Unknown(GDAL_METADATA), metadata.as_str())?;

        // Interleave band values pixel by pixel
        let mut pixel_bytes = Vec::with_capacity(self.width * self.height * bands * 4);
        for i in 0..self.width * self.height {
            for (_, data) in &self.bands {
                pixel_bytes.extend_from_slice(&data[i].to_le_bytes());
            }
        }

        let strip_offset = dir.write_data(pixel_bytes.as_slice())?;
        dir.write_tag(Tag::StripOffsets, u32::try_from(strip_offset)?)?;
        dir.write_tag(Tag::StripByteCounts, pixel_bytes.len() as u32)?;
        dir.finish()?;

        Ok(())
    }
}
