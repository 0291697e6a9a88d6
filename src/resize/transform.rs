use crate::{
    config::Settings,
    error::{ResizeError, Result},
    resize::{
        dimensions,
        format::OutputFormat,
        io::{ChunkWriter, SourceReader, UntilClosed},
        key::Dimension,
    },
    store::ByteStream,
};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use futures::TryStreamExt;
use image::{
    DynamicImage, ImageDecoder, ImageError, ImageReader, RgbImage, RgbaImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use std::{
    io::{self, BufReader, Read},
    sync::{Arc, OnceLock},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// Output chunks buffered between the encoder and the writer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSummary {
    pub source: (u32, u32),
    pub output: (u32, u32),
    pub format: OutputFormat,
    pub bytes_out: u64,
}

/// A running transform: the encoded bytes and the worker producing them.
pub struct TransformJob {
    pub output: ByteStream,
    pub handle: JoinHandle<Result<TransformSummary>>,
}

#[derive(Debug, Clone)]
pub struct ImageTransformer {
    format: OutputFormat,
    quality: u8,
    max_dimension: u32,
    channel_capacity: usize,
}

impl ImageTransformer {
    #[must_use]
    pub const fn new(settings: &Settings) -> Self {
        Self {
            format: settings.format,
            quality: settings.quality,
            max_dimension: settings.max_dimension,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Start transforming `source` on a blocking worker.
    ///
    /// The returned stream yields encoded chunks as they are produced and ends
    /// with an `Err` item if the transform fails after output started. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn spawn(&self, source: ByteStream, width: Dimension, height: Dimension) -> TransformJob {
        // faults of the source stream, so they are not reported as corrupt images
        let upstream_fault: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
        let fault = Arc::clone(&upstream_fault);
        let source = source.inspect_err(move |e| {
            let _ = fault.set(e.to_string());
        });
        let reader = SyncIoBridge::new(StreamReader::new(source));

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let transformer = self.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let reader = UntilClosed::new(reader, tx.clone());
            let mut writer = ChunkWriter::new(tx);

            // abandoned before the worker started
            if writer.is_closed() {
                return Err(ResizeError::OutputClosed);
            }

            let result = transformer
                .decode(reader, width, height)
                .map_err(|e| match upstream_fault.get() {
                    Some(fault) => ResizeError::StorageUnavailable(fault.clone()),
                    None if writer.is_closed() => ResizeError::OutputClosed,
                    None => e,
                })
                .and_then(|(image, source)| {
                    let output = (image.width(), image.height());
                    transformer.encode(&image, &mut writer)?;
                    Ok((source, output))
                });

            match result {
                Ok((source, output)) => {
                    let bytes_out = writer.finish().map_err(|e| output_error(&e))?;
                    Ok(TransformSummary {
                        source,
                        output,
                        format: transformer.format,
                        bytes_out,
                    })
                }
                Err(ResizeError::OutputClosed) => Err(ResizeError::OutputClosed),
                Err(e) => {
                    writer.fail(io::Error::other(e.to_string()));
                    Err(e)
                }
            }
        });

        TransformJob {
            output: Box::pin(ReceiverStream::new(rx)),
            handle,
        }
    }

    /// Decode, orient and resize; returns the resized image and the source size
    ///
    /// # Errors
    ///
    /// Will return `Decode` for unreadable input or `UnsupportedDimensions`
    /// when the resolved size is out of bounds
    pub fn decode<R: Read>(
        &self,
        reader: R,
        width: Dimension,
        height: Dimension,
    ) -> Result<(DynamicImage, (u32, u32))> {
        dimensions::check_requested(width, height, self.max_dimension)?;

        let image = decode_oriented(reader)?;
        let source = (image.width(), image.height());

        let target = dimensions::resolve(width, height, source);
        dimensions::check_resolved(target, self.max_dimension)?;

        log::debug!(
            "resizing {}x{} to {}x{}",
            source.0,
            source.1,
            target.0,
            target.1
        );

        let image = if target == source {
            normalize(image)
        } else {
            resize(&image, target)?
        };

        Ok((image, source))
    }

    /// Encode `image` into `writer` using the configured format
    ///
    /// # Errors
    ///
    /// Will return `OutputClosed` if the receiving side went away
    pub fn encode(&self, image: &DynamicImage, writer: &mut ChunkWriter) -> Result<()> {
        let result = match self.format {
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut *writer)),
            OutputFormat::Jpeg => image
                .to_rgb8()
                .write_with_encoder(JpegEncoder::new_with_quality(&mut *writer, self.quality)),
        };

        result.map_err(|e| match e {
            ImageError::IoError(e) => output_error(&e),
            e => ResizeError::Internal(format!("{} encode failed: {e}", self.format)),
        })
    }
}

fn output_error(e: &io::Error) -> ResizeError {
    if e.kind() == io::ErrorKind::BrokenPipe {
        ResizeError::OutputClosed
    } else {
        ResizeError::Internal(format!("encoder output: {e}"))
    }
}

/// Sniff the format from the first bytes, decode, then apply the EXIF orientation
fn decode_oriented<R: Read>(reader: R) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(BufReader::new(SourceReader::new(reader)))
        .with_guessed_format()
        .map_err(|e| ResizeError::Decode(e.to_string()))?
        .into_decoder()
        .map_err(decode_error)?;

    let orientation = decoder.orientation().map_err(decode_error)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    image.apply_orientation(orientation);

    Ok(image)
}

fn decode_error(e: ImageError) -> ResizeError {
    ResizeError::Decode(e.to_string())
}

/// 8 bit RGB or RGBA, what the resizer and both encoders work with
fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        image if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        image => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// Lanczos3 resize, alpha is kept when the source has it
fn resize(image: &DynamicImage, (width, height): (u32, u32)) -> Result<DynamicImage> {
    let has_alpha = image.color().has_alpha();
    let (pixel_type, buffer) = if has_alpha {
        (PixelType::U8x4, image.to_rgba8().into_raw())
    } else {
        (PixelType::U8x3, image.to_rgb8().into_raw())
    };

    let src = Image::from_vec_u8(image.width(), image.height(), buffer, pixel_type)
        .map_err(|e| ResizeError::Internal(format!("failed to create source image: {e}")))?;
    let mut dst = Image::new(width, height, pixel_type);

    Resizer::new()
        .resize(
            &src,
            &mut dst,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
        )
        .map_err(|e| ResizeError::Internal(format!("resize failed: {e}")))?;

    let resized = if has_alpha {
        RgbaImage::from_raw(width, height, dst.into_vec()).map(DynamicImage::ImageRgba8)
    } else {
        RgbImage::from_raw(width, height, dst.into_vec()).map(DynamicImage::ImageRgb8)
    };

    resized.ok_or_else(|| ResizeError::Internal("failed to convert resized image".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::{StreamExt, stream};
    use image::{ImageFormat, Rgb, Rgba};
    use std::{io::Cursor, time::Duration};

    fn settings(format: OutputFormat) -> Settings {
        Settings::new("images", "http://localhost").with_format(format)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    /// Pixels PNG can not compress, so the encoded output spans many chunks
    fn noise(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x9E37_79B9;
        RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        })
    }

    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        noise(width, height).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn chunked(data: Vec<u8>, size: usize) -> ByteStream {
        let chunks: Vec<io::Result<Bytes>> = data
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    async fn collect(output: ByteStream) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut output = output;
        while let Some(chunk) = output.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[test]
    fn test_decode_fixed() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let (image, source) = transformer
            .decode(Cursor::new(png(100, 50)), Dimension::Fixed(20), Dimension::Fixed(20))
            .unwrap();
        assert_eq!(source, (100, 50));
        assert_eq!((image.width(), image.height()), (20, 20));
    }

    #[test]
    fn test_decode_auto() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let (image, _) = transformer
            .decode(Cursor::new(png(1000, 500)), Dimension::Fixed(400), Dimension::Auto)
            .unwrap();
        assert_eq!((image.width(), image.height()), (400, 200));
    }

    #[test]
    fn test_decode_both_auto_keeps_size() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let (image, source) = transformer
            .decode(Cursor::new(png(33, 17)), Dimension::Auto, Dimension::Auto)
            .unwrap();
        assert_eq!(source, (33, 17));
        assert_eq!((image.width(), image.height()), (33, 17));
    }

    #[test]
    fn test_decode_garbage() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let result = transformer.decode(
            Cursor::new(b"definitely not an image".to_vec()),
            Dimension::Fixed(10),
            Dimension::Fixed(10),
        );
        assert!(matches!(result, Err(ResizeError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let mut data = png(64, 64);
        data.truncate(data.len() / 2);
        let result = transformer.decode(Cursor::new(data), Dimension::Fixed(10), Dimension::Auto);
        assert!(matches!(result, Err(ResizeError::Decode(_))));
    }

    #[test]
    fn test_decode_too_large() {
        let settings = settings(OutputFormat::Png).with_max_dimension(100);
        let transformer = ImageTransformer::new(&settings);
        // 100 wide on a 10x1000 source resolves to 100x10000
        let result =
            transformer.decode(Cursor::new(png(10, 1000)), Dimension::Fixed(100), Dimension::Auto);
        assert!(matches!(result, Err(ResizeError::UnsupportedDimensions(_))));
    }

    #[test]
    fn test_resize_keeps_alpha() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 4])));
        let resized = resize(&image, (5, 5)).unwrap();
        assert!(resized.color().has_alpha());
        assert_eq!((resized.width(), resized.height()), (5, 5));
    }

    #[tokio::test]
    async fn test_spawn_png() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let job = transformer.spawn(
            chunked(png(300, 300), 1024),
            Dimension::Fixed(200),
            Dimension::Fixed(200),
        );
        let out = collect(job.output).await.unwrap();
        let summary = job.handle.await.unwrap().unwrap();

        assert_eq!(summary.source, (300, 300));
        assert_eq!(summary.output, (200, 200));
        assert_eq!(summary.bytes_out, out.len() as u64);

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 200));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_spawn_jpeg() {
        let settings = settings(OutputFormat::Jpeg).with_quality(70);
        let transformer = ImageTransformer::new(&settings);
        let job = transformer.spawn(chunked(png(64, 32), 100), Dimension::Auto, Dimension::Fixed(16));
        let out = collect(job.output).await.unwrap();
        let summary = job.handle.await.unwrap().unwrap();

        assert_eq!(summary.output, (32, 16));
        assert_eq!(summary.format, OutputFormat::Jpeg);
        assert_eq!(out.get(..2), Some(&[0xFF, 0xD8][..]));
    }

    #[tokio::test]
    async fn test_spawn_upstream_fault() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let mut data = png(64, 64);
        data.truncate(40);
        let source: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(data)),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ]));
        let job = transformer.spawn(source, Dimension::Fixed(10), Dimension::Fixed(10));
        let out = collect(job.output).await;
        assert!(out.is_err());
        let result = job.handle.await.unwrap();
        assert!(matches!(result, Err(ResizeError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_spawn_output_dropped() {
        let transformer =
            ImageTransformer::new(&settings(OutputFormat::Png)).with_channel_capacity(1);
        let job = transformer.spawn(
            chunked(png(2000, 2000), 64 * 1024),
            Dimension::Auto,
            Dimension::Auto,
        );
        drop(job.output);
        let result = job.handle.await.unwrap();
        assert!(matches!(result, Err(ResizeError::OutputClosed)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_encoder_parks_on_full_channel() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let image = DynamicImage::ImageRgb8(noise(512, 512));
        let (tx, mut rx) = mpsc::channel(1);

        let worker = tokio::task::spawn_blocking(move || {
            let mut writer = ChunkWriter::new(tx);
            transformer.encode(&image, &mut writer)?;
            writer.finish().map_err(|e| output_error(&e))
        });

        // wait for the first chunk, then give the encoder time to run ahead
        for _ in 0..200 {
            if !rx.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(rx.len(), 1);
        assert!(!worker.is_finished());

        let mut chunks = 0;
        let mut bytes = 0;
        while let Some(chunk) = rx.recv().await {
            chunks += 1;
            bytes += chunk.unwrap().len() as u64;
        }

        assert_eq!(worker.await.unwrap().unwrap(), bytes);
        assert!(chunks > 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_waits_for_reader() {
        let transformer =
            ImageTransformer::new(&settings(OutputFormat::Png)).with_channel_capacity(1);
        let job = transformer.spawn(
            chunked(noise_png(512, 512), 64 * 1024),
            Dimension::Auto,
            Dimension::Auto,
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!job.handle.is_finished());

        let out = collect(job.output).await.unwrap();
        let summary = job.handle.await.unwrap().unwrap();
        assert_eq!(summary.bytes_out, out.len() as u64);
        assert!(out.len() > 4 * 64 * 1024);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_releases_abandoned_source() {
        let transformer = ImageTransformer::new(&settings(OutputFormat::Png));
        let (source_tx, source_rx) = mpsc::channel::<io::Result<Bytes>>(4);
        let job = transformer.spawn(
            Box::pin(ReceiverStream::new(source_rx)),
            Dimension::Fixed(10),
            Dimension::Fixed(10),
        );
        drop(job.output);

        // the source never ends, the worker has to stop on its own
        let data = noise_png(256, 256);
        let _ = source_tx
            .send(Ok(Bytes::copy_from_slice(&data[..1024])))
            .await;

        let result = tokio::time::timeout(Duration::from_secs(10), job.handle)
            .await
            .expect("worker kept reading an abandoned source")
            .unwrap();
        assert!(matches!(result, Err(ResizeError::OutputClosed)));

        tokio::time::timeout(Duration::from_secs(10), source_tx.closed())
            .await
            .unwrap();
    }
}
