// src/video.rs - Camera capture through nokhwa, mirrored for a selfie view
use anyhow::{Context, Result};
use image::{DynamicImage, ImageBuffer};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{info, warn};

use pinch_quiz::config::VideoConfig;

#[derive(Debug, Clone, Copy)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

pub struct CameraFeed {
    camera: Camera,
    index: u32,
}

impl CameraFeed {
    pub fn open(index: u32, video: &VideoConfig) -> Result<Self> {
        let wanted = CameraFormat::new(
            Resolution::new(video.width, video.height),
            FrameFormat::MJPEG,
            video.fps,
        );
        // Exact format first, then the closest match, then anything the device streams
        let attempts = [
            RequestedFormatType::Exact(wanted),
            RequestedFormatType::Closest(wanted),
            RequestedFormatType::AbsoluteHighestResolution,
        ];

        let mut last_error = None;
        for request in attempts {
            let requested = RequestedFormat::new::<RgbFormat>(request);
            match Camera::new(CameraIndex::Index(index), requested) {
                Ok(mut camera) => {
                    camera
                        .open_stream()
                        .map_err(|e| anyhow::anyhow!("Failed to open camera stream: {}", e))?;
                    let feed = Self { camera, index };
                    let info = feed.info();
                    info!(
                        "Camera {} streaming at {}x{} @ {} fps",
                        index, info.width, info.height, info.fps
                    );
                    if info.width != video.width || info.height != video.height {
                        warn!(
                            "Requested {}x{}, device granted {}x{}",
                            video.width, video.height, info.width, info.height
                        );
                    }
                    return Ok(feed);
                }
                Err(e) => {
                    warn!("Camera {} rejected {:?}: {}", index, request, e);
                    last_error = Some(e);
                }
            }
        }

        Err(anyhow::anyhow!(
            "Failed to open camera {}: {}",
            index,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }

    pub fn read_frame(&mut self) -> Result<DynamicImage> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| anyhow::anyhow!("Failed to capture frame: {}", e))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow::anyhow!("Failed to decode frame: {}", e))?;

        let width = decoded.width();
        let height = decoded.height();
        let img: ImageBuffer<image::Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, decoded.into_vec())
                .context("Failed to create image buffer")?;

        let flipped = image::imageops::flip_horizontal(&img);
        Ok(DynamicImage::ImageRgb8(flipped))
    }

    pub fn info(&self) -> VideoInfo {
        let resolution = self.camera.resolution();
        VideoInfo {
            width: resolution.width(),
            height: resolution.height(),
            fps: self.camera.frame_rate(),
        }
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera {}: {}", self.index, e);
        }
    }
}
