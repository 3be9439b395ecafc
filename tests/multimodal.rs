use atomic_agents::multimodal::{extract, extract_schema, extract_value};
use atomic_agents::{AtomicError, Media, MediaKind, Node};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn media(i: usize) -> Media {
    Media::from_url(MediaKind::Image, format!("https://example.com/{i}.png"))
}

/// Builds a record nested `depth` levels deep, with one media field and one
/// text field per level and a list of two media at the bottom.
fn nested(depth: usize, next: &mut usize) -> Value {
    let here = *next;
    *next += 1;
    if depth == 0 {
        let (a, b) = (*next, *next + 1);
        *next += 2;
        return json!({
            "leaf": here,
            "image": media(here),
            "gallery": [media(a), media(b)],
        });
    }
    json!({
        "image": media(here),
        "level": depth,
        "child": nested(depth - 1, next),
    })
}

#[test]
fn extracts_every_media_at_any_depth_in_order() {
    for depth in 0..6 {
        let mut counter = 0;
        let value = nested(depth, &mut counter);
        let node = Node::from_value(value).unwrap();
        assert_eq!(node.media_count(), counter);

        let extraction = extract(&node);

        assert_eq!(extraction.media.len(), counter, "depth={depth}");
        let expected: Vec<Media> = (0..counter).map(media).collect();
        assert_eq!(extraction.media, expected);
        let residual = extraction.residual.unwrap();
        assert_eq!(residual.media_count(), 0);
    }
}

#[test]
fn doc_image_scenario() {
    let image = media(1);
    let extraction = extract_value(json!({
        "doc": {"image": image, "caption": "hi"},
        "note": "ok",
    }))
    .unwrap();

    assert_eq!(extraction.media, vec![image]);
    assert_eq!(
        extraction.residual_value().unwrap(),
        Some(json!({"doc": {"caption": "hi"}, "note": "ok"}))
    );
}

/// A report with no media at all.
#[derive(Serialize, Deserialize, JsonSchema)]
struct Report {
    title: String,
    score: f64,
    tags: Vec<String>,
    empty: Vec<String>,
    owner: Option<String>,
    sections: Vec<Section>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
struct Section {
    heading: String,
    words: u32,
}

#[test]
fn residual_without_media_matches_plain_serialization() {
    let report = Report {
        title: "Quarterly".into(),
        score: 0.75,
        tags: vec!["finance".into(), "q3".into()],
        empty: Vec::new(),
        owner: None,
        sections: vec![
            Section {
                heading: "Zebra".into(),
                words: 120,
            },
            Section {
                heading: "Apple".into(),
                words: 80,
            },
        ],
    };

    let extraction = extract_schema(&report).unwrap();

    assert!(!extraction.has_media());
    assert_eq!(
        extraction.residual_json().unwrap(),
        serde_json::to_string(&report).unwrap()
    );
}

/// A question that carries attachments.
#[derive(Serialize, Deserialize, JsonSchema)]
struct Ticket {
    summary: String,
    screenshot: Media,
    attachments: Vec<Media>,
    notes: Vec<Value>,
}

#[test]
fn typed_records_with_media_split_cleanly() {
    let ticket = Ticket {
        summary: "login broken".into(),
        screenshot: media(0),
        attachments: vec![media(1), Media::from_path(MediaKind::Pdf, "logs.pdf")],
        notes: vec![json!("see logs"), serde_json::to_value(media(2)).unwrap()],
    };

    let extraction = extract_schema(&ticket).unwrap();

    assert_eq!(extraction.media.len(), 4);
    assert_eq!(extraction.media[2], Media::from_path(MediaKind::Pdf, "logs.pdf"));
    assert_eq!(
        extraction.residual_json().unwrap(),
        r#"{"summary":"login broken","notes":["see logs"]}"#
    );
}

#[test]
fn unknown_media_kind_reports_its_path() {
    let err = extract_value(json!({
        "doc": {
            "attachments": [
                media(0),
                {"$media": "hologram", "source": {"url": "https://example.com/x"}},
            ]
        }
    }))
    .unwrap_err();

    match err {
        AtomicError::UnsupportedNode { path, .. } => assert_eq!(path, "$.doc.attachments[1]"),
        other => panic!("unexpected error: {other}"),
    }
}
