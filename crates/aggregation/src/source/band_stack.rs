//! GeoTIFF band stacks whose bands are named by their descriptions.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use grid_processor::{AffineTransform, GridError, Layer};
use quick_xml::events::Event;
use quick_xml::Reader;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::error::{AggregationError, Result};
use crate::metadata::SourceKind;
use crate::source::LayerSource;

// GeoTIFF / GDAL tag IDs (not in standard tiff crate)
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

/// A multi-band GeoTIFF read into memory in one pass.
#[derive(Debug)]
pub struct BandStackSource {
    path: PathBuf,
    width: usize,
    height: usize,
    /// Band names in band order.
    descriptions: Vec<String>,
    /// Band values, one row-major grid per band.
    bands: Vec<Vec<f32>>,
    pixel_scale: Vec<f64>,
    tiepoint: Vec<f64>,
}

impl BandStackSource {
    pub fn open(path: &Path) -> Result<Self> {
        let err = |e: tiff::TiffError| AggregationError::source(path, e);

        let file = File::open(path).map_err(|e| AggregationError::source(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(err)?;

        let (width, height) = decoder.dimensions().map_err(err)?;
        let (width, height) = (width as usize, height as usize);
        let samples = decoder
            .find_tag(Tag::SamplesPerPixel)
            .map_err(err)?
            .map(|v| v.into_u16())
            .transpose()
            .map_err(err)?
            .unwrap_or(1) as usize;

        let pixel_scale = decoder
            .find_tag(Tag::Unknown(MODEL_PIXEL_SCALE))
            .map_err(err)?
            .map(|v| v.into_f64_vec())
            .transpose()
            .map_err(err)?
            .unwrap_or_default();
        let tiepoint = decoder
            .find_tag(Tag::Unknown(MODEL_TIEPOINT))
            .map_err(err)?
            .map(|v| v.into_f64_vec())
            .transpose()
            .map_err(err)?
            .unwrap_or_default();
        let metadata = decoder
            .find_tag(Tag::Unknown(GDAL_METADATA))
            .map_err(err)?
            .map(|v| v.into_string())
            .transpose()
            .map_err(err)?;
        let nodata = decoder
            .find_tag(Tag::Unknown(GDAL_NODATA))
            .map_err(err)?
            .map(|v| v.into_string())
            .transpose()
            .map_err(err)?
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

        let pixels = to_f32(decoder.read_image().map_err(err)?)
            .ok_or_else(|| AggregationError::source(path, "unsupported sample format"))?;
        let expected = width * height * samples;
        if pixels.len() < expected {
            return Err(AggregationError::source(
                path,
                format!("expected {} samples, read {}", expected, pixels.len()),
            ));
        }

        let mut bands = vec![Vec::with_capacity(width * height); samples];
        for pixel in pixels[..expected].chunks_exact(samples) {
            for (band, &value) in bands.iter_mut().zip(pixel) {
                let is_nodata = nodata.is_some_and(|n| f64::from(value) == n);
                band.push(if is_nodata { f32::NAN } else { value });
            }
        }

        let described = match metadata {
            Some(xml) => parse_band_descriptions(&xml)
                .map_err(|e| AggregationError::source(path, format!("GDAL metadata: {}", e)))?,
            None => HashMap::new(),
        };
        let descriptions = (0..samples)
            .map(|i| {
                described
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| format!("band_{}", i + 1))
            })
            .collect::<Vec<_>>();

        debug!(
            path = %path.display(),
            width,
            height,
            bands = samples,
            descriptions = ?descriptions,
            "Read band stack"
        );

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            descriptions,
            bands,
            pixel_scale,
            tiepoint,
        })
    }
}

impl LayerSource for BandStackSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> SourceKind {
        SourceKind::BandStack
    }

    fn available_names(&self) -> Vec<String> {
        self.descriptions.clone()
    }

    /// Origin from the tiepoint (raster point `(i, j)` at model `(x, y)`),
    /// cell size from the pixel scale. North-up only.
    fn transform(&self) -> Result<AffineTransform> {
        if self.pixel_scale.len() < 2 || self.tiepoint.len() < 6 {
            return Err(GridError::invalid_georeference(format!(
                "{} lacks ModelPixelScale/ModelTiepoint tags",
                self.path.display()
            ))
            .into());
        }
        let (sx, sy) = (self.pixel_scale[0], self.pixel_scale[1]);
        if sx == 0.0 || sy == 0.0 {
            return Err(GridError::invalid_georeference("zero pixel scale").into());
        }

        let (i, j, x, y) = (
            self.tiepoint[0],
            self.tiepoint[1],
            self.tiepoint[3],
            self.tiepoint[4],
        );
        Ok(AffineTransform::from_origin(x - i * sx, y + j * sy, sx, -sy))
    }

    fn extract(&self, name: &str) -> Result<Layer> {
        let index = self
            .descriptions
            .iter()
            .position(|d| d == name)
            .ok_or_else(|| AggregationError::Lookup {
                name: name.to_string(),
                file: self.path.display().to_string(),
            })?;

        info!(variable = %name, band = index + 1, "Extracting layer");
        Ok(Layer::new(self.bands[index].clone(), self.width, self.height)?)
    }
}

fn to_f32(result: DecodingResult) -> Option<Vec<f32>> {
    let values = match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => return None,
    };
    Some(values)
}

/// Band descriptions from GDAL's metadata XML, keyed by 0-based band.
///
/// GDAL stores them as
/// `<Item name="DESCRIPTION" sample="0" role="description">no2</Item>`.
fn parse_band_descriptions(xml: &str) -> std::result::Result<HashMap<usize, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut descriptions = HashMap::new();
    let mut current: Option<usize> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"Item" => {
                let mut is_description = false;
                let mut sample = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"role" => is_description = value == "description",
                        b"sample" => sample = value.parse::<usize>().ok(),
                        _ => {}
                    }
                }
                current = if is_description { sample } else { None };
            }
            Event::Text(t) => {
                if let Some(sample) = current {
                    descriptions.insert(sample, t.unescape()?.into_owned());
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(descriptions)
}
