use std::path::{Path, PathBuf};

use crate::{
    errors::{BgStripError, Result, TransformError},
    imageops::{apply_alpha_mask, encode_png, mask::min_max_normalize, mask::FloatMask},
    traits::BackgroundRemover,
};
use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Input edge used when the model declares a dynamic spatial size.
pub const DEFAULT_INPUT_SIZE: u32 = 320;

// ImageNet statistics, as expected by u2net-family salient object models.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub model_path: PathBuf,
    pub device_id: i32,
    pub intra_threads: Option<usize>,
}

impl ModelOptions {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            device_id: 0,
            intra_threads: None,
        }
    }
}

/// Background remover backed by an ONNX salient-object model.
///
/// The model takes one `1x3xHxW` float tensor and returns a mask whose first
/// channel is used as the alpha channel of the output PNG.
pub struct OnnxBackgroundRemover {
    pub input_width: u32,
    pub input_height: u32,
    input_name: String,
    output_name: String,
    label: String,
    session: Mutex<Session>,
}

impl OnnxBackgroundRemover {
    pub fn new(options: &ModelOptions) -> Result<Self> {
        let model_path = options.model_path.as_path();
        if !model_path.exists() {
            return Err(BgStripError::Configuration {
                message: format!("model file does not exist: {}", model_path.display()),
            });
        }

        let mut builder = SessionBuilder::new()
            .map_err(|e| model_error("session builder init", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(options.device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(options.device_id)
                    .build(),
            ])
            .map_err(|e| model_error("register execution providers", e))?
            .with_memory_pattern(true)
            .map_err(|e| model_error("enable memory pattern", e))?;

        if let Some(threads) = options.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| model_error("set intra-op threads", e))?;
        }

        let mut session = builder
            .commit_from_file(model_path)
            .map_err(|e| model_error(format!("load model file: {}", model_path.display()), e))?;

        let (input_name, output_name) = match (session.inputs.first(), session.outputs.first()) {
            (Some(input), Some(output)) => (input.name.clone(), output.name.clone()),
            _ => {
                return Err(BgStripError::Model {
                    operation: "inspect model signature".to_string(),
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "model must have at least one input and one output",
                    )),
                })
            }
        };

        let shape = session.inputs[0]
            .input_type
            .tensor_shape()
            .ok_or_else(|| BgStripError::Model {
                operation: "read model input shape".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "model input is not a tensor",
                )),
            })?;
        let dim = |index: usize| -> u32 {
            shape
                .get(index)
                .copied()
                .filter(|&d| d > 0)
                .map_or(DEFAULT_INPUT_SIZE, |d| d as u32)
        };
        let (input_height, input_width) = (dim(2), dim(3));

        // warm up so the first real job does not pay for graph initialization
        let data = Array4::<f32>::zeros((1, 3, input_height as usize, input_width as usize));
        let input = TensorRef::from_array_view(&data)
            .map_err(|e| model_error("create warm-up tensor", e))?;
        session
            .run(ort::inputs![input_name.as_str() => input])
            .map_err(|e| model_error("warm-up run", e))?;

        info!(
            model = %model_path.display(),
            input = %input_name,
            output = %output_name,
            width = input_width,
            height = input_height,
            "model loaded"
        );

        Ok(Self {
            input_width,
            input_height,
            input_name,
            output_name,
            label: format!("onnx:{}", file_label(model_path)),
            session: Mutex::new(session),
        })
    }

    pub fn predict(
        &self,
        tensor: ArrayView4<f32>,
    ) -> std::result::Result<Array4<f32>, TransformError> {
        let mut binding = self.session.lock();
        let outputs = binding.run(
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?],
        )?;
        let mask = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();
        Ok(mask)
    }

    fn segment(&self, image: &DynamicImage) -> std::result::Result<DynamicImage, TransformError> {
        let rgb = image.to_rgb8();
        let tensor = preprocess(&rgb, self.input_width, self.input_height);
        let mask = self.predict(tensor.view())?;
        debug!(shape = ?mask.shape(), "mask predicted");

        let mask = postprocess_mask(mask, rgb.width(), rgb.height())?;
        let rgba = apply_alpha_mask(&rgb, &mask)?;
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl BackgroundRemover for OnnxBackgroundRemover {
    fn remove_background(&self, input: &[u8]) -> std::result::Result<Vec<u8>, TransformError> {
        let image = image::load_from_memory(input).map_err(TransformError::Decode)?;
        let result = self.segment(&image)?;
        encode_png(&result)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn model_error(operation: impl Into<String>, err: impl std::fmt::Display) -> BgStripError {
    BgStripError::Model {
        operation: operation.into(),
        source: err.to_string().into(),
    }
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// Resize to the model input and lay out as normalized NCHW.
pub fn preprocess(image: &RgbImage, width: u32, height: u32) -> Array4<f32> {
    let resized = imageops::resize(image, width, height, FilterType::Lanczos3);
    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            let value = resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (value - MEAN[c]) / STD[c]
        },
    )
}

/// Turn the first mask channel into a float mask at the original image size.
pub fn postprocess_mask(
    mask: Array4<f32>,
    width: u32,
    height: u32,
) -> std::result::Result<FloatMask, TransformError> {
    let shape = mask.shape();
    if shape.contains(&0) {
        return Err(TransformError::Inference(format!(
            "model returned an empty mask with shape {:?}",
            shape
        )));
    }
    let (mask_height, mask_width) = (shape[2] as u32, shape[3] as u32);

    let mut values: Vec<f32> = mask.slice(s![0, 0, .., ..]).iter().copied().collect();
    min_max_normalize(&mut values);

    let mask = FloatMask::from_raw(mask_width, mask_height, values).ok_or_else(|| {
        TransformError::Inference("mask buffer does not match its shape".to_string())
    })?;
    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}
