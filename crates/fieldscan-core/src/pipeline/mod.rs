//! The normalize → recognize → parse pipeline and its source adapters.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::capture::{CaptureDevice, CaptureSession, TriggerSource};
use crate::error::{InputError, Result};
use crate::fields::{FieldParser, LineFieldParser};
use crate::models::config::{CaptureConfig, ScanConfig};
use crate::models::record::{ExtractionResult, FieldRecord};
use crate::normalize::{ImageNormalizer, RawImage};
use crate::ocr::{OcrBackend, TextRecognizer};
use crate::pdf::{PageRasterizer, PdfRasterizer};

/// One page or frame in, one record out.
pub struct Pipeline<B: OcrBackend, P: FieldParser = LineFieldParser> {
    normalizer: ImageNormalizer,
    recognizer: TextRecognizer<B>,
    parser: P,
    augment: bool,
}

impl<B: OcrBackend> Pipeline<B> {
    /// Pipeline with the line parser and augmentation on.
    pub fn new(backend: B) -> Self {
        Self::with_parser(backend, LineFieldParser::new())
    }

    pub fn from_config(backend: B, config: &ScanConfig) -> Self {
        Self::new(backend).with_augment(config.normalize.augment)
    }
}

impl<B: OcrBackend, P: FieldParser> Pipeline<B, P> {
    pub fn with_parser(backend: B, parser: P) -> Self {
        Self {
            normalizer: ImageNormalizer::new(),
            recognizer: TextRecognizer::new(backend),
            parser,
            augment: true,
        }
    }

    pub fn with_augment(mut self, augment: bool) -> Self {
        self.augment = augment;
        self
    }

    pub fn augment(&self) -> bool {
        self.augment
    }

    pub fn recognizer(&self) -> &TextRecognizer<B> {
        &self.recognizer
    }

    /// Normalize, recognize and parse a single image.
    pub fn process_raw(&self, image: &RawImage) -> Result<FieldRecord> {
        let normalized = self.normalizer.normalize(image, self.augment);
        let text = self.recognizer.recognize(&normalized)?;
        Ok(self.parser.parse(text.as_str()))
    }
}

/// Entry points for PDFs, still images and live capture.
pub struct DocumentScanner<B: OcrBackend, R: PdfRasterizer = PageRasterizer> {
    pipeline: Pipeline<B>,
    rasterizer: R,
    frame_path: PathBuf,
}

impl<B: OcrBackend> DocumentScanner<B> {
    /// Scanner rendering PDFs with pdfium when available.
    pub fn new(pipeline: Pipeline<B>) -> Self {
        Self::with_rasterizer(pipeline, PageRasterizer::default())
    }

    /// Fails only when the configured PDF renderer cannot be loaded.
    pub fn from_config(backend: B, config: &ScanConfig) -> Result<Self> {
        let rasterizer = PageRasterizer::from_config(&config.pdf)?;
        Ok(
            Self::with_rasterizer(Pipeline::from_config(backend, config), rasterizer)
                .with_frame_path(config.capture.frame_path()),
        )
    }
}

impl<B: OcrBackend, R: PdfRasterizer> DocumentScanner<B, R> {
    pub fn with_rasterizer(pipeline: Pipeline<B>, rasterizer: R) -> Self {
        Self {
            pipeline,
            rasterizer,
            frame_path: CaptureConfig::default().frame_path(),
        }
    }

    /// Where a saved capture frame is written.
    pub fn with_frame_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.frame_path = path.into();
        self
    }

    pub fn pipeline(&self) -> &Pipeline<B> {
        &self.pipeline
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    /// One record per page, in page order. Any failing page fails the document.
    pub fn process_pdf(&self, path: &Path) -> Result<ExtractionResult> {
        info!("Processing PDF: {}", path.display());
        let data = fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.process_pdf_bytes(&data)
    }

    pub fn process_pdf_bytes(&self, data: &[u8]) -> Result<ExtractionResult> {
        let start = Instant::now();
        let pages = self.rasterizer.rasterize(data)?;
        let page_count = pages.len();
        info!("Rasterized {} pages", page_count);

        let mut result = ExtractionResult::empty();
        for (index, page) in pages.into_iter().enumerate() {
            let raw = RawImage::from_dynamic(page)?;
            let record = self.pipeline.process_raw(&raw)?;
            debug!(
                "Page {}/{}: {} fields",
                index + 1,
                page_count,
                record.len() - 1
            );
            result.push(record);
        }

        info!(
            "Extracted {} records in {}ms",
            result.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Exactly one record for a still image.
    pub fn process_image(&self, path: &Path) -> Result<ExtractionResult> {
        info!("Processing image: {}", path.display());
        let raw = RawImage::open(path)?;
        let record = self.pipeline.process_raw(&raw)?;
        Ok(ExtractionResult::from(vec![record]))
    }

    /// Interactive capture: one record if a frame is saved, none otherwise.
    ///
    /// An unavailable device is logged and yields an empty result.
    pub fn process_capture<D, T>(
        &self,
        device: &mut D,
        triggers: &mut T,
    ) -> Result<ExtractionResult>
    where
        D: CaptureDevice,
        T: TriggerSource,
    {
        CaptureSession::new(device, triggers, &self.frame_path).run(|frame| {
            let raw = RawImage::new(frame)?;
            self.pipeline.process_raw(&raw)
        })
    }

    /// `.pdf` (any case) goes to the PDF adapter, everything else to the image adapter.
    pub fn process_path(&self, path: &Path) -> Result<ExtractionResult> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            self.process_pdf(path)
        } else {
            self.process_image(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::{FakeDevice, ScriptedTriggers};
    use crate::capture::Trigger;
    use crate::error::{OcrError, PdfError, ScanError};
    use crate::models::config::PdfRendererKind;
    use crate::models::record::FieldName;
    use crate::normalize::NormalizedImage;
    use crate::ocr::tests::ScriptedBackend;
    use crate::pdf::{build_pdf, LopdfRasterizer};
    use image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    /// Reads back the size of the normalized image as an invoice number.
    struct SizeBackend;

    impl OcrBackend for SizeBackend {
        fn name(&self) -> &str {
            "size"
        }

        fn image_to_text(&self, image: &NormalizedImage) -> std::result::Result<String, OcrError> {
            let (width, height) = image.dimensions();
            Ok(format!("Invoice #: {}x{}", width, height))
        }
    }

    fn invoice_numbers(result: &ExtractionResult) -> Vec<&str> {
        result
            .iter()
            .map(|r| r.field(FieldName::InvoiceNumber).unwrap())
            .collect()
    }

    fn normalized_width(number: &str) -> u32 {
        number.split('x').next().unwrap().parse().unwrap()
    }

    /// Ignores the bytes and hands out fixed pages.
    struct FakeRasterizer {
        pages: usize,
    }

    impl PdfRasterizer for FakeRasterizer {
        fn rasterize(&self, _data: &[u8]) -> std::result::Result<Vec<DynamicImage>, PdfError> {
            if self.pages == 0 {
                return Err(PdfError::NoPages);
            }
            Ok((0..self.pages)
                .map(|i| {
                    DynamicImage::ImageRgb8(RgbImage::from_fn(5, 4, |x, y| {
                        Rgb([(x * 50) as u8, (y * 60) as u8, i as u8])
                    }))
                })
                .collect())
        }
    }

    fn scanner(
        backend: ScriptedBackend,
        pages: usize,
    ) -> DocumentScanner<ScriptedBackend, FakeRasterizer> {
        DocumentScanner::with_rasterizer(Pipeline::new(backend), FakeRasterizer { pages })
    }

    fn write_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"%PDF-stand-in").unwrap();
        path
    }

    #[test]
    fn test_pdf_pages_become_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "doc.pdf");
        let backend = ScriptedBackend::new(["Invoice #: P1", "Invoice #: P2", "Invoice #: P3"]);

        let result = scanner(backend, 3).process_pdf(&path).unwrap();

        let numbers: Vec<_> = result
            .iter()
            .map(|r| r.field(FieldName::InvoiceNumber).unwrap())
            .collect();
        assert_eq!(numbers, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn test_real_pdf_pages_in_page_order() {
        let data = build_pdf(&[vec![(4, 3, 10)], vec![(5, 3, 90)], vec![(6, 3, 200)]]);
        let scanner = DocumentScanner::with_rasterizer(
            Pipeline::new(SizeBackend).with_augment(false),
            LopdfRasterizer::new(),
        );

        let result = scanner.process_pdf_bytes(&data).unwrap();

        assert_eq!(invoice_numbers(&result), vec!["8x6", "10x6", "12x6"]);
    }

    #[test]
    fn test_default_scanner_reads_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        fs::write(
            &path,
            build_pdf(&[vec![(40, 30, 20)], vec![(50, 30, 120)], vec![(60, 30, 220)]]),
        )
        .unwrap();
        let scanner = DocumentScanner::new(Pipeline::new(SizeBackend));

        let result = scanner.process_path(&path).unwrap();

        // page size depends on the renderer, page order does not
        let widths: Vec<u32> = invoice_numbers(&result)
            .into_iter()
            .map(normalized_width)
            .collect();
        assert_eq!(widths.len(), 3);
        assert!(widths[0] < widths[1] && widths[1] < widths[2]);
    }

    #[cfg(feature = "pdfium")]
    #[test]
    fn test_text_only_pdf_with_pdfium() {
        use crate::pdf::{build_text_pdf, PdfiumRasterizer};

        let Ok(rasterizer) = PdfiumRasterizer::new(72) else {
            eprintln!("skipping: pdfium library not available");
            return;
        };
        let scanner = DocumentScanner::with_rasterizer(Pipeline::new(SizeBackend), rasterizer);

        let result = scanner
            .process_pdf_bytes(&build_text_pdf("Invoice #: INV-1"))
            .unwrap();

        assert_eq!(invoice_numbers(&result), vec!["400x200"]);
    }

    #[test]
    fn test_failing_page_fails_whole_pdf() {
        let backend = ScriptedBackend::failing_after(["Total 1"]);
        let scanner = scanner(backend, 3);

        let result = scanner.process_pdf_bytes(b"ignored");

        assert!(matches!(
            result,
            Err(ScanError::RecognitionUnavailable(OcrError::Recognition(_)))
        ));
        // the third page is never reached
        assert_eq!(scanner.pipeline().recognizer().backend().remaining(), 0);
    }

    #[test]
    fn test_rasterizer_failure_is_input_error() {
        let result = scanner(ScriptedBackend::new(["unused"]), 0).process_pdf_bytes(b"");

        assert!(matches!(
            result,
            Err(ScanError::InputUnreadable(InputError::Pdf(PdfError::NoPages)))
        ));
    }

    #[test]
    fn test_missing_pdf_is_unreadable() {
        let result = scanner(ScriptedBackend::new(["unused"]), 1)
            .process_pdf(Path::new("/nonexistent/doc.pdf"));

        assert!(matches!(
            result,
            Err(ScanError::InputUnreadable(InputError::Read { .. }))
        ));
    }

    #[test]
    fn test_image_yields_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::from_fn(10, 7, |x, _| Rgb([(x * 25) as u8, 0, 0]))
            .save(&path)
            .unwrap();

        let backend = ScriptedBackend::new(["Order 55\nDate: 2024-02-02"]);
        let result = scanner(backend, 1).process_image(&path).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.records()[0].get("order_number"), Some("Order 55"));
        assert_eq!(result.records()[0].get("date"), Some("Date: 2024-02-02"));
    }

    #[test]
    fn test_undecodable_image_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "page.png");

        let result = scanner(ScriptedBackend::new(["unused"]), 1).process_image(&path);

        assert!(matches!(
            result,
            Err(ScanError::InputUnreadable(InputError::Decode(_)))
        ));
    }

    #[test]
    fn test_process_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "scan.PDF");
        let backend = ScriptedBackend::new(["a", "b"]);

        let result = scanner(backend, 2).process_path(&path).unwrap();
        assert_eq!(result.len(), 2);

        // not a PDF, so it is decoded as an image and fails
        let other = write_file(dir.path(), "scan.pdf.txt");
        let result = scanner(ScriptedBackend::new(["c"]), 2).process_path(&other);
        assert!(matches!(
            result,
            Err(ScanError::InputUnreadable(InputError::Decode(_)))
        ));
    }

    #[test]
    fn test_capture_save_yields_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let frame_path = dir.path().join("captured_frame.jpg");
        let scanner =
            scanner(ScriptedBackend::new(["Total: 12.50"]), 1).with_frame_path(&frame_path);
        let mut device = FakeDevice::with_frames(4);
        let mut triggers = ScriptedTriggers::new([None, Some(Trigger::Save)]);

        let result = scanner.process_capture(&mut device, &mut triggers).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.records()[0].get("total"), Some("Total: 12.50"));
        assert!(frame_path.exists());
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_capture_quit_and_unavailable_yield_nothing() {
        let scanner = scanner(ScriptedBackend::new(["unused"]), 1);

        let mut device = FakeDevice::with_frames(4);
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Quit)]);
        assert!(scanner.process_capture(&mut device, &mut triggers).unwrap().is_empty());
        assert_eq!(device.released, 1);

        let mut device = FakeDevice::unopenable();
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Save)]);
        assert!(scanner.process_capture(&mut device, &mut triggers).unwrap().is_empty());
        assert_eq!(device.released, 1);

        // the scripted text was never consumed
        assert_eq!(scanner.pipeline().recognizer().backend().remaining(), 1);
    }

    #[test]
    fn test_capture_recognition_failure_releases_device() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = scanner(ScriptedBackend::failing_after(Vec::<String>::new()), 1)
            .with_frame_path(dir.path().join("f.jpg"));
        let mut device = FakeDevice::with_frames(2);
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Save)]);

        let result = scanner.process_capture(&mut device, &mut triggers);

        assert!(matches!(result, Err(ScanError::RecognitionUnavailable(_))));
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_from_config_reads_augment_renderer_and_frame_path() {
        let mut config = ScanConfig::default();
        config.normalize.augment = false;
        config.capture.output_dir = PathBuf::from("frames");
        config.pdf.renderer = PdfRendererKind::Embedded;

        let scanner = DocumentScanner::from_config(ScriptedBackend::new(["x"]), &config).unwrap();

        assert!(!scanner.pipeline().augment());
        assert_eq!(scanner.rasterizer().name(), "embedded");
        assert_eq!(scanner.frame_path(), Path::new("frames/captured_frame.jpg"));
        assert!(Pipeline::new(ScriptedBackend::new(["x"])).augment());
    }
}
