//! Acquisition against a real HTTP server
//!
//! Covers the loop end to end through `HttpPageSource`:
//! - which URLs are requested (skip list, ceiling)
//! - error-content retries over the wire
//! - transport failures on the very first page
//! - the assembled PDF, read back page by page

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use oxidize_pdf::parser::{PdfDocument, PdfReader};
use pagestitch_core::{
    AcquisitionOptions, CancellationFlag, HttpOptions, HttpPageSource, PageAcquisition,
    PageEncoder, StitchConfig, StitchError, Stitcher, StopReason, UrlTemplate,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sized_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([240, 240, 230])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn page_png() -> Vec<u8> {
    sized_png(12, 16)
}

/// MediaBox width of every page, in order, after checking that each page
/// has an image XObject and paints it
fn page_widths(pdf: &[u8]) -> Vec<f64> {
    let reader = PdfReader::new(Cursor::new(pdf.to_vec())).expect("unreadable PDF");
    let doc = PdfDocument::new(reader);
    (0..doc.page_count().unwrap())
        .map(|i| {
            let page = doc.get_page(i).unwrap();
            let xobjects = page
                .get_resources()
                .and_then(|r| r.get("XObject"))
                .and_then(|x| x.as_dict())
                .unwrap_or_else(|| panic!("page {i} has no XObject resources"));
            assert!(
                xobjects.0.values().any(|obj| doc
                    .resolve(obj)
                    .unwrap()
                    .as_stream()
                    .and_then(|s| s.dict.get("Subtype"))
                    .and_then(|s| s.as_name())
                    .is_some_and(|n| n.0 == "Image")),
                "page {i} carries no image"
            );
            let content = doc.get_page_content_streams(&page).unwrap().concat();
            assert!(
                content.windows(3).any(|w| w == b" Do"),
                "page {i} never paints its image"
            );
            page.media_box[2] - page.media_box[0]
        })
        .collect()
}

/// Every `/pages/<n>` answers with an image
async fn endless_viewer() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pages/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(page_png()),
        )
        .mount(&server)
        .await;
    server
}

fn template_for(server: &MockServer) -> UrlTemplate {
    UrlTemplate::parse(&format!("{}/pages/{{counter}}", server.uri())).unwrap()
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

fn http_source() -> HttpPageSource {
    HttpPageSource::new(&HttpOptions::default()).unwrap()
}

#[tokio::test]
async fn test_page_43_is_never_requested_over_http() {
    let server = endless_viewer().await;
    let source = http_source();
    let options = AcquisitionOptions::default().with_page_ceiling(50);

    let outcome = PageAcquisition::new(&source, options, PageEncoder::default())
        .run(&template_for(&server))
        .await;

    let paths = requested_paths(&server).await;
    assert_eq!(paths.len(), 49);
    assert!(!paths.contains(&"/pages/43".to_string()));
    assert!(!paths.contains(&"/pages/51".to_string()));

    let counters = outcome.counters();
    assert_eq!(counters.len(), 49);
    assert_eq!(&counters[41..43], &[42, 44]);
    assert_eq!(outcome.stop, StopReason::CeilingReached { counter: 51 });
}

#[tokio::test]
async fn test_error_content_over_http_uses_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(path("/pages/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(page_png()))
        .mount(&server)
        .await;
    Mock::given(path_regex(r"^/pages/[2-9]$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"errors":["Error converting document"]}"#),
        )
        .mount(&server)
        .await;

    let source = http_source();
    let outcome = PageAcquisition::new(&source, AcquisitionOptions::default(), PageEncoder::default())
        .run(&template_for(&server))
        .await;

    assert_eq!(outcome.counters(), vec![1]);
    assert_eq!(outcome.stop, StopReason::RetriesExhausted { counter: 5 });
    assert_eq!(
        requested_paths(&server).await,
        vec!["/pages/1", "/pages/2", "/pages/3", "/pages/4", "/pages/5"]
    );
}

#[tokio::test]
async fn test_server_error_on_first_page_means_no_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let stitcher = Stitcher::new(http_source(), StitchConfig::default()).unwrap();
    let err = stitcher
        .stitch(&template_for(&server), &CancellationFlag::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StitchError::NoPagesProcessed));
    assert_eq!(requested_paths(&server).await, vec!["/pages/1"]);
}

#[tokio::test]
async fn test_html_body_truncates_document() {
    let server = MockServer::start().await;
    Mock::given(path_regex(r"^/pages/[12]$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(page_png()))
        .mount(&server)
        .await;
    Mock::given(path("/pages/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login required</html>"))
        .mount(&server)
        .await;

    let stitcher = Stitcher::new(http_source(), StitchConfig::default()).unwrap();
    let doc = stitcher
        .stitch(&template_for(&server), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(doc.page_counters, vec![1, 2]);
    assert!(matches!(doc.stop, StopReason::Image { counter: 3, .. }));
    assert_eq!(page_widths(&doc.bytes).len(), 2);
}

#[tokio::test]
async fn test_stitched_pages_follow_counter_order() {
    // Page n is 10 + n pixels wide, so every page has its own MediaBox
    let server = MockServer::start().await;
    for n in 1..=45u32 {
        Mock::given(path(format!("/pages/{n}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(sized_png(10 + n, 20)))
            .mount(&server)
            .await;
    }

    let mut config = StitchConfig::default();
    config.acquisition = config.acquisition.with_page_ceiling(45);
    let stitcher = Stitcher::new(http_source(), config).unwrap();
    let doc = stitcher
        .stitch(&template_for(&server), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(doc.page_count(), 44);
    assert_eq!(doc.stop, StopReason::CeilingReached { counter: 46 });

    // 96 dpi default: one pixel is 0.75pt
    let expected: Vec<f64> = doc
        .page_counters
        .iter()
        .map(|&n| (10 + n) as f64 * 0.75)
        .collect();
    let widths = page_widths(&doc.bytes);
    assert_eq!(widths.len(), doc.page_count());
    for (i, (got, want)) in widths.iter().zip(&expected).enumerate() {
        assert!((got - want).abs() < 0.01, "page {i}: {got} != {want}");
    }
    assert!(!doc.page_counters.contains(&43));
}
