//! Sample requests shared by the renderer tests.

use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::export::{ProgressReporter, StaticAssetFetcher};
use crate::models::{ExportFormat, ExportProgress, ExportQuality, ExportRequest};

pub const LOGO_URL: &str = "https://assets.example.com/brand/logo.png";
pub const PHOTO_URL: &str = "https://assets.example.com/brand/team.jpg";

/// Smallest JPEG header `imagesize` accepts: SOI then a baseline SOF
/// declaring 32x16 pixels.
pub const TINY_JPEG: [u8; 23] = [
    0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x20, 0x03, 0x01, 0x22, 0x00,
    0x02, 0x11, 0x01, 0x03, 0x11, 0x01, 0xFF, 0xD9,
];

/// Five slides listed out of order, one of each common type.
pub fn sprint_request(format: ExportFormat) -> ExportRequest {
    serde_json::from_value(json!({
        "presentation": {
            "id": "pres-42",
            "title": "Sprint 42 Review",
            "createdAt": "2024-06-14T16:30:00Z",
            "metadata": {
                "sprintName": "Sprint 42",
                "totalSlides": 5,
                "hasMetrics": true,
                "demoStoriesCount": 1,
                "customSlidesCount": 0
            },
            "slides": [
                {"id": "s3", "title": "Numbers", "type": "metrics", "order": 3,
                 "content": {"completedIssues": 8, "velocity": 21}},
                {"id": "s1", "title": "Sprint 42 Review", "type": "title", "order": 1,
                 "content": "Team Atlas"},
                {"id": "s5", "title": "Company Update", "type": "corporate", "order": 5,
                 "content": "Quarterly goals", "corporateSlideUrl": LOGO_URL},
                {"id": "s2", "title": "Highlights", "type": "summary", "order": 2,
                 "content": "- Shipped **search**\n- Fixed login"},
                {"id": "s4", "title": "Search demo", "type": "demo-story", "order": 4,
                 "content": "Walkthrough of the new search", "storyId": "ENG-101"}
            ]
        },
        "allIssues": [
            {"id": "i1", "identifier": "ENG-101", "title": "Full-text search", "status": "Done",
             "priority": 2, "estimate": 5, "assignee": "Ada",
             "url": "https://tracker.example.com/ENG-101"},
            {"id": "i2", "identifier": "ENG-102", "title": "Login redirect loop", "status": "Done",
             "priority": 1, "estimate": 3, "assignee": "Grace"},
            {"id": "i3", "identifier": "ENG-103", "title": "Rate limiting", "status": "In Progress",
             "priority": 3, "estimate": 8, "assignee": "Ada"}
        ],
        "upcomingIssues": [
            {"id": "i4", "identifier": "ENG-110", "title": "Saved searches", "status": "Todo",
             "priority": 3, "estimate": 5},
            {"id": "i5", "identifier": "ENG-111", "title": "Audit log", "status": "Todo",
             "priority": 1}
        ],
        "options": {"format": format}
    }))
    .expect("sample request is valid")
}

pub fn with_quality(mut request: ExportRequest, quality: ExportQuality) -> ExportRequest {
    request.options.quality = quality;
    request
}

/// Fetcher that knows the corporate logo and the team photo.
pub fn asset_fetcher() -> Arc<StaticAssetFetcher> {
    Arc::new(
        StaticAssetFetcher::new()
            .with_asset(LOGO_URL, vec![0x89, b'P', b'N', b'G'], Some("image/png"))
            .with_asset(PHOTO_URL, TINY_JPEG.to_vec(), Some("image/jpeg")),
    )
}

pub fn collecting_reporter() -> (ProgressReporter, Arc<Mutex<Vec<ExportProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let reporter = ProgressReporter::new(move |p| sink.lock().unwrap().push(p.clone()));
    (reporter, seen)
}

/// Asserts the progress contract: non-decreasing, total reached exactly
/// once and on the last snapshot.
pub fn assert_progress_contract(seen: &[ExportProgress], slides: usize) {
    assert_eq!(seen.len(), slides + 2);
    assert!(seen.windows(2).all(|w| w[0].current <= w[1].current));
    assert!(seen.iter().all(|p| p.current <= p.total));
    assert_eq!(seen.iter().filter(|p| p.current == p.total).count(), 1);
    let last = seen.last().unwrap();
    assert_eq!(last.current, last.total);
    assert_eq!(last.percentage, 100);
}

/// Renders to a UTF-8 string, for text formats.
pub fn text(blob: &[u8]) -> String {
    String::from_utf8(blob.to_vec()).unwrap()
}
