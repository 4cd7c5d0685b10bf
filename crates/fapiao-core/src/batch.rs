//! Batch upload: load files, create records and run recognition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{FapiaoError, FileError, PdfError};
use crate::invoice::InvoiceSegmenter;
use crate::layout::PageLayout;
use crate::media::ImageSource;
use crate::models::config::FapiaoConfig;
use crate::models::fields::ExtractedFields;
use crate::models::record::{InvoiceDraft, RecognitionMethod, RecognitionStatus};
use crate::pdf::{PdfLayoutSource, PdfPage};
use crate::recognize::{RecognitionInput, Recognizer, SiliconFlowClient};
use crate::store::InvoiceStore;

/// File extensions accepted by the batch pipeline.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Whether `path` has a supported extension (case-insensitive).
pub fn is_supported_file(path: &Path) -> bool {
    file_kind(path).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Image,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(FileKind::Pdf),
        "jpg" | "jpeg" | "png" => Some(FileKind::Image),
        _ => None,
    }
}

/// A file that could not be loaded.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Files handed to the batch.
    pub total: usize,
    /// Files with a supported extension.
    pub supported: usize,
    /// Supported files that loaded.
    pub processed: usize,
    /// Supported files that failed to load.
    pub failed: usize,
    /// Files skipped for their extension.
    pub skipped: usize,
    /// Records whose recognition succeeded.
    pub recognized: usize,
    /// Records whose recognition ended in error.
    pub recognition_errors: usize,
    /// Records marked as duplicates.
    pub duplicates: usize,
    pub skipped_files: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// What to do with a record once it is in the store.
enum Work {
    /// Fields are already known.
    Fields(ExtractedFields),
    /// Run the recognition cascade.
    Recognize(RecognitionInput),
}

struct Planned {
    draft: InvoiceDraft,
    work: Work,
}

/// Drives files through loading, segmentation and recognition into a store.
pub struct BatchProcessor {
    recognizer: Recognizer,
    segmenter: InvoiceSegmenter,
    store: Arc<InvoiceStore>,
    concurrency: usize,
    min_text_length: usize,
}

impl BatchProcessor {
    /// Build a processor, enabling remote recognition when an API key is set.
    pub fn from_config(config: &FapiaoConfig) -> Result<Self, FapiaoError> {
        let mut recognizer = Recognizer::new(&config.recognition);
        if let Some(client) = SiliconFlowClient::from_config(&config.remote)? {
            info!("Remote recognition enabled: {}", config.remote.api_url);
            recognizer = recognizer.with_remote(Arc::new(client));
        }
        Ok(Self::new(recognizer, config))
    }

    pub fn new(recognizer: Recognizer, config: &FapiaoConfig) -> Self {
        Self {
            recognizer,
            segmenter: InvoiceSegmenter::new(),
            store: Arc::new(InvoiceStore::new(config.dedup.enabled)),
            concurrency: config.batch.concurrency.max(1),
            min_text_length: config.recognition.min_text_length,
        }
    }

    pub fn store(&self) -> &Arc<InvoiceStore> {
        &self.store
    }

    /// Process files and wait for every recognition task.
    pub async fn process(&self, paths: &[PathBuf]) -> BatchReport {
        self.process_with_progress(paths, |_| {}).await
    }

    /// Like [`process`](Self::process), calling `on_loaded` after each file.
    pub async fn process_with_progress<F>(&self, paths: &[PathBuf], on_loaded: F) -> BatchReport
    where
        F: Fn(&Path),
    {
        let mut report = BatchReport {
            total: paths.len(),
            ..Default::default()
        };

        let mut supported = Vec::new();
        for path in paths {
            match file_kind(path) {
                Some(kind) => supported.push((path, kind)),
                None => {
                    debug!("Skipping unsupported file: {}", path.display());
                    report.skipped += 1;
                    report.skipped_files.push(path.clone());
                }
            }
        }
        report.supported = supported.len();
        info!("Starting batch: {} supported, {} skipped", report.supported, report.skipped);

        let on_loaded = &on_loaded;
        let mut tasks = JoinSet::new();
        for group in supported.chunks(self.concurrency) {
            let loaded = join_all(group.iter().map(|&(path, kind)| async move {
                let result = self.load_file(path, kind).await;
                on_loaded(path);
                result
            }))
            .await;

            for ((path, _), result) in group.iter().zip(loaded) {
                match result {
                    Ok(planned) => {
                        report.processed += 1;
                        self.enqueue(planned, &mut tasks);
                    }
                    Err(err) => {
                        warn!("Failed to load {}: {}", path.display(), err);
                        report.failed += 1;
                        report.failures.push(FileFailure {
                            path: (*path).clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!("Recognition task did not finish: {}", err);
            }
        }

        report.duplicates = self.store.check_duplicates();
        for record in self.store.snapshot() {
            match record.recognition_status {
                RecognitionStatus::Success => report.recognized += 1,
                RecognitionStatus::Error => report.recognition_errors += 1,
                _ => {}
            }
        }

        info!(
            "Batch complete: {} processed, {} failed, {} recognized, {} errors, {} duplicates",
            report.processed,
            report.failed,
            report.recognized,
            report.recognition_errors,
            report.duplicates
        );
        report
    }

    /// Insert records in order and start their recognition.
    fn enqueue(&self, planned: Vec<Planned>, tasks: &mut JoinSet<()>) {
        for Planned { draft, work } in planned {
            let id = self.store.insert(draft);
            match work {
                Work::Fields(fields) => {
                    self.store.apply_fields(id, fields, RecognitionMethod::LayoutRegex);
                }
                Work::Recognize(input) => {
                    self.store.mark_processing(id);
                    let recognizer = self.recognizer.clone();
                    let store = Arc::clone(&self.store);
                    tasks.spawn(async move {
                        let outcome = recognizer.recognize(&input).await;
                        store.apply_recognition(id, outcome);
                    });
                }
            }
        }
    }

    async fn load_file(&self, path: &Path, kind: FileKind) -> Result<Vec<Planned>, FapiaoError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match kind {
            FileKind::Pdf => {
                let min_text_length = self.min_text_length;
                let pages = tokio::task::spawn_blocking(move || {
                    PdfLayoutSource::load(&bytes)?.pages(min_text_length)
                })
                .await
                .map_err(|e| PdfError::Parse(e.to_string()))??;
                debug!("Loaded {} with {} pages", name, pages.len());
                Ok(self.plan_pdf(&name, pages))
            }
            FileKind::Image => {
                let image = ImageSource::from_bytes(&bytes)?;
                Ok(vec![Planned {
                    draft: InvoiceDraft::new(name.clone(), name),
                    work: Work::Recognize(RecognitionInput::from_image(image)),
                }])
            }
        }
    }

    fn plan_pdf(&self, name: &str, pages: Vec<PdfPage>) -> Vec<Planned> {
        let multi_page = pages.len() > 1;
        let mut planned = Vec::new();

        for page in pages {
            let segments = self.segmenter.segment(&page.layout);
            if segments.len() > 1 {
                info!(
                    "{} page {}: {} invoices on one page",
                    name,
                    page.number,
                    segments.len()
                );
                for (idx, segment) in segments.into_iter().enumerate() {
                    let draft = InvoiceDraft::new(
                        format!("{} - page {} - invoice {}", name, page.number, idx + 1),
                        name,
                    )
                    .with_page(page.number);
                    let work = if segment.fields.invoice_number.is_empty() {
                        Work::Recognize(
                            RecognitionInput::from_layout(PageLayout::from_text(segment.text))
                                .with_image(page.image.clone()),
                        )
                    } else {
                        Work::Fields(segment.fields)
                    };
                    planned.push(Planned { draft, work });
                }
                continue;
            }

            let file_name = if multi_page {
                format!("{} - page {}", name, page.number)
            } else {
                name.to_string()
            };
            planned.push(Planned {
                draft: InvoiceDraft::new(file_name, name).with_page(page.number),
                work: Work::Recognize(
                    RecognitionInput::from_layout(page.layout).with_image(page.image),
                ),
            });
        }
        planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::models::record::InvoiceStatus;
    use crate::recognize::RemoteExtractor;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    fn processor() -> BatchProcessor {
        let config = FapiaoConfig::default();
        BatchProcessor::new(Recognizer::new(&config.recognition), &config)
    }

    fn page(number: u32, text: &str) -> PdfPage {
        PdfPage {
            number,
            layout: PageLayout::from_text(text),
            image: None,
        }
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_file(Path::new("a.PDF")));
        assert!(is_supported_file(Path::new("dir/b.jpeg")));
        assert!(is_supported_file(Path::new("c.Png")));
        assert!(!is_supported_file(Path::new("notes.txt")));
        assert!(!is_supported_file(Path::new("no_extension")));
    }

    #[test]
    fn test_plan_single_page_keeps_file_name() {
        let planned = processor().plan_pdf("a.pdf", vec![page(1, "发票号码：12345678")]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].draft.file_name, "a.pdf");
        assert_eq!(planned[0].draft.page_number, Some(1));
    }

    #[test]
    fn test_plan_multi_page_names_pages() {
        let planned = processor().plan_pdf("a.pdf", vec![page(1, "x"), page(2, "y")]);
        let names: Vec<&str> = planned.iter().map(|p| p.draft.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf - page 1", "a.pdf - page 2"]);
    }

    #[test]
    fn test_plan_splits_page_with_two_invoices() {
        let filler = "明细".repeat(120);
        let text = format!(
            "发票号码：12345678901234567890 价税合计（小写）¥100.00 {filler} \
             发票号码：87654321 价税合计（小写）¥50.00"
        );
        let planned = processor().plan_pdf("a.pdf", vec![page(1, &text)]);

        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].draft.file_name, "a.pdf - page 1 - invoice 1");
        assert_eq!(planned[1].draft.file_name, "a.pdf - page 1 - invoice 2");
        assert!(matches!(
            &planned[0].work,
            Work::Fields(f) if f.invoice_number == "12345678901234567890"
        ));
        assert!(matches!(&planned[1].work, Work::Fields(f) if f.invoice_number == "87654321"));
    }

    #[tokio::test]
    async fn test_batch_tallies_skipped_failed_and_errors() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();
        let missing = dir.path().join("missing.png");

        let processor = processor();
        let report = processor.process(&[notes, broken, missing]).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.supported, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.processed, 0);
        assert!(processor.store().is_empty());
    }

    #[tokio::test]
    async fn test_image_without_remote_ends_in_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.png");
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        image.save(&path).unwrap();

        let processor = processor();
        let report = processor.process(&[path]).await;

        assert_eq!(report.processed, 1);
        assert_eq!(report.recognition_errors, 1);
        let records = processor.store().snapshot();
        assert_eq!(records[0].file_name, "scan.png");
        assert_eq!(records[0].status, InvoiceStatus::Invalid);
        assert!(records[0].error_message.as_deref().unwrap().contains("image-only"));
    }

    /// Vision model that answers each scan after its own delay.
    struct DelayedRemote {
        answers: HashMap<String, (u64, &'static str, &'static str)>,
        finished: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl RemoteExtractor for DelayedRemote {
        async fn extract_text(&self, _text: &str) -> Result<ExtractedFields, RemoteError> {
            Err(RemoteError::UnparseableResponse("text not expected".to_string()))
        }

        async fn extract_image(
            &self,
            image: &ImageSource,
        ) -> Result<ExtractedFields, RemoteError> {
            let Some(&(delay, name, number)) = self.answers.get(image.data_url()) else {
                return Err(RemoteError::UnparseableResponse("unknown scan".to_string()));
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.finished.lock().unwrap().push(name);
            Ok(ExtractedFields {
                invoice_number: number.to_string(),
                total_amount: Decimal::from(10),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_records_keep_file_order_when_recognition_finishes_out_of_order() {
        let dir = tempdir().unwrap();
        let scans = [
            ("a.png", 90, "11111111"),
            ("b.png", 45, "22222222"),
            ("c.png", 0, "11111111"),
        ];

        let mut paths = Vec::new();
        let mut answers = HashMap::new();
        for (width, (name, delay, number)) in (1u32..).zip(scans) {
            let path = dir.path().join(name);
            image::RgbImage::from_pixel(width, 1, image::Rgb([255, 255, 255]))
                .save(&path)
                .unwrap();
            let url = ImageSource::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
            answers.insert(url.data_url().to_string(), (delay, name, number));
            paths.push(path);
        }

        let remote = Arc::new(DelayedRemote {
            answers,
            finished: Mutex::new(Vec::new()),
        });
        let mut config = FapiaoConfig::default();
        config.batch.concurrency = 2;
        let recognizer = Recognizer::new(&config.recognition).with_remote(remote.clone());
        let processor = BatchProcessor::new(recognizer, &config);

        let report = processor.process(&paths).await;

        assert_eq!(*remote.finished.lock().unwrap(), vec!["c.png", "b.png", "a.png"]);
        assert_eq!(report.recognized, 3);
        assert_eq!(report.duplicates, 1);

        let records = processor.store().snapshot();
        let files: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(files, vec!["a.png", "b.png", "c.png"]);
        assert!(records.iter().all(|r| r.recognition_status == RecognitionStatus::Success));
        assert!(!records[0].is_duplicate);
        assert!(records[2].is_duplicate);
        assert_eq!(records[2].recognition_method, Some(RecognitionMethod::RemoteOcr));
    }
}
