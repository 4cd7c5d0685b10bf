//! Recognition cascade: layout regex, then remote text model, then remote OCR.

pub mod remote;
#[cfg(feature = "native")]
pub mod siliconflow;

pub use remote::RemoteExtractor;
#[cfg(feature = "native")]
pub use siliconflow::SiliconFlowClient;

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::RecognitionError;
use crate::invoice::{InvoiceParser, RegexInvoiceParser};
use crate::layout::PageLayout;
use crate::media::ImageSource;
use crate::models::config::RecognitionConfig;
use crate::models::fields::ExtractedFields;
use crate::models::record::{RecognitionMethod, Recognized};

/// What is known about one page or page segment.
#[derive(Debug, Clone, Default)]
pub struct RecognitionInput {
    /// Text layer, when the source has one.
    pub layout: Option<PageLayout>,
    /// Rendered or embedded page image.
    pub image: Option<ImageSource>,
}

impl RecognitionInput {
    pub fn from_layout(layout: PageLayout) -> Self {
        Self {
            layout: Some(layout),
            image: None,
        }
    }

    pub fn from_image(image: ImageSource) -> Self {
        Self {
            layout: None,
            image: Some(image),
        }
    }

    pub fn with_image(mut self, image: Option<ImageSource>) -> Self {
        self.image = image;
        self
    }
}

/// Runs the recognition strategies in order for one invoice.
#[derive(Clone)]
pub struct Recognizer {
    parser: RegexInvoiceParser,
    remote: Option<Arc<dyn RemoteExtractor>>,
    min_text_length: usize,
}

impl Recognizer {
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            parser: RegexInvoiceParser::new(),
            remote: None,
            min_text_length: config.min_text_length,
        }
    }

    /// Enable the remote strategies.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteExtractor>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Recognize one invoice.
    ///
    /// Remote failures never escape as panics; they end up in the returned
    /// error, which the caller stores on the record.
    pub async fn recognize(
        &self,
        input: &RecognitionInput,
    ) -> Result<Recognized, RecognitionError> {
        let usable = input
            .layout
            .as_ref()
            .filter(|layout| !layout.is_blank(self.min_text_length));
        let mut remote_failure = None;

        if let Some(layout) = usable {
            let fields = self.parser.parse_layout(layout);
            if !fields.invoice_number.is_empty() {
                info!("Recognized {} from layout", fields.invoice_number);
                return accept(fields, RecognitionMethod::LayoutRegex, None);
            }

            if let Some(remote) = &self.remote {
                debug!("No invoice number in layout, asking remote text model");
                match remote.extract_text(&layout.full_text).await {
                    Ok(remote_fields) if !remote_fields.invoice_number.is_empty() => {
                        info!("Recognized {} with remote text model", remote_fields.invoice_number);
                        return accept(remote_fields, RecognitionMethod::RemoteLlm, None);
                    }
                    Ok(_) => debug!("Remote text model found no invoice number"),
                    Err(err) => {
                        warn!("Remote text extraction failed: {}", err);
                        remote_failure = Some(err.to_string());
                    }
                }
            }

            if fields.total_amount > Decimal::ZERO {
                info!("Returning partial layout result with total {}", fields.total_amount);
                return accept(fields, RecognitionMethod::LayoutRegex, remote_failure);
            }

            return Err(RecognitionError::ExtractionIncomplete { remote_failure });
        }

        let Some(remote) = &self.remote else {
            return Err(RecognitionError::ImageOnlyUnsupported);
        };
        let Some(image) = &input.image else {
            return Err(RecognitionError::ExtractionIncomplete { remote_failure });
        };

        debug!("No text layer, asking remote vision model");
        let fields = remote.extract_image(image).await.map_err(|err| {
            warn!("Remote image extraction failed: {}", err);
            RecognitionError::RemoteCall(err)
        })?;
        accept(fields, RecognitionMethod::RemoteOcr, None)
    }
}

fn accept(
    fields: ExtractedFields,
    method: RecognitionMethod,
    remote_failure: Option<String>,
) -> Result<Recognized, RecognitionError> {
    if fields.has_content() {
        Ok(Recognized { fields, method })
    } else {
        Err(RecognitionError::ExtractionIncomplete { remote_failure })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRemote {
        text_number: Option<&'static str>,
        fail_text: bool,
        image_total: Option<&'static str>,
        text_calls: AtomicUsize,
        image_calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteExtractor for FakeRemote {
        async fn extract_text(&self, _text: &str) -> Result<ExtractedFields, RemoteError> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_text {
                return Err(RemoteError::Status {
                    status: 503,
                    body: "busy".to_string(),
                });
            }
            Ok(ExtractedFields {
                invoice_number: self.text_number.unwrap_or_default().to_string(),
                ..Default::default()
            })
        }

        async fn extract_image(
            &self,
            _image: &ImageSource,
        ) -> Result<ExtractedFields, RemoteError> {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            match self.image_total {
                Some(total) => Ok(ExtractedFields {
                    total_amount: Decimal::from_str(total).unwrap(),
                    ..Default::default()
                }),
                None => Err(RemoteError::UnparseableResponse("no json".to_string())),
            }
        }
    }

    fn recognizer() -> Recognizer {
        Recognizer::new(&RecognitionConfig::default())
    }

    fn image() -> ImageSource {
        ImageSource::from_data_url("data:image/png;base64,AAAA").unwrap()
    }

    fn text_input(text: &str) -> RecognitionInput {
        RecognitionInput::from_layout(PageLayout::from_text(text))
    }

    #[tokio::test]
    async fn test_layout_number_wins_without_remote_call() {
        let remote = Arc::new(FakeRemote::default());
        let recognizer = recognizer().with_remote(remote.clone());

        let result = recognizer
            .recognize(&text_input("发票号码：24442000000012345678"))
            .await
            .unwrap();

        assert_eq!(result.method, RecognitionMethod::LayoutRegex);
        assert_eq!(remote.text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_text_fills_missing_number() {
        let remote = Arc::new(FakeRemote {
            text_number: Some("12345678"),
            ..Default::default()
        });
        let recognizer = recognizer().with_remote(remote);

        let result = recognizer
            .recognize(&text_input("电子发票 价税合计 （小写）¥88.00"))
            .await
            .unwrap();

        assert_eq!(result.method, RecognitionMethod::RemoteLlm);
        assert_eq!(result.fields.invoice_number, "12345678");
    }

    #[tokio::test]
    async fn test_partial_total_survives_remote_failure() {
        let remote = Arc::new(FakeRemote {
            fail_text: true,
            ..Default::default()
        });
        let recognizer = recognizer().with_remote(remote);

        let result = recognizer
            .recognize(&text_input("电子发票 价税合计 （小写）¥88.00"))
            .await
            .unwrap();

        assert_eq!(result.method, RecognitionMethod::LayoutRegex);
        assert_eq!(result.fields.total_amount, Decimal::from_str("88.00").unwrap());
    }

    #[tokio::test]
    async fn test_remote_failure_is_reported_when_nothing_found() {
        let remote = Arc::new(FakeRemote {
            fail_text: true,
            ..Default::default()
        });
        let recognizer = recognizer().with_remote(remote);

        let err = recognizer
            .recognize(&text_input("这是一段没有任何发票字段的说明文字"))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("no valid content recognized"));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_image_only_page_without_remote() {
        let input =
            RecognitionInput::from_layout(PageLayout::from_text("  ")).with_image(Some(image()));
        let err = recognizer().recognize(&input).await.unwrap_err();

        assert!(matches!(err, RecognitionError::ImageOnlyUnsupported));
        assert_eq!(
            err.to_string(),
            "image-only page, recognition unsupported without remote capability"
        );
    }

    #[tokio::test]
    async fn test_image_only_page_uses_remote_ocr() {
        let remote = Arc::new(FakeRemote {
            image_total: Some("42.00"),
            ..Default::default()
        });
        let recognizer = recognizer().with_remote(remote.clone());

        let result = recognizer
            .recognize(&RecognitionInput::from_image(image()))
            .await
            .unwrap();

        assert_eq!(result.method, RecognitionMethod::RemoteOcr);
        assert_eq!(remote.text_calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote.image_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_ocr_failure_is_remote_call_error() {
        let recognizer = recognizer().with_remote(Arc::new(FakeRemote::default()));
        let err = recognizer
            .recognize(&RecognitionInput::from_image(image()))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::RemoteCall(_)));
    }

    #[tokio::test]
    async fn test_text_page_never_reaches_ocr() {
        let remote = Arc::new(FakeRemote {
            image_total: Some("42.00"),
            ..Default::default()
        });
        let recognizer = recognizer().with_remote(remote.clone());
        let input = text_input("这是一段没有任何发票字段的说明文字").with_image(Some(image()));

        assert!(recognizer.recognize(&input).await.is_err());
        assert_eq!(remote.image_calls.load(Ordering::SeqCst), 0);
    }
}
