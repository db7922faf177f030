use std::sync::{Arc, Mutex};

use chat_message_content::code::CodeSegment;
use chat_message_content::observe::{ContentEvent, ContentObserver};
use chat_message_content::pipeline::{ContentKind, FallbackPolicy, PipelineState};
use chat_message_content::product::FieldValue;
use chat_message_content::{ContentError, Message, MessageContentPipeline};
use serde_json::json;
use tracing::Level;

#[derive(Debug, Default)]
struct CollectingObserver {
    events: Mutex<Vec<ContentEvent>>,
}

impl ContentObserver for CollectingObserver {
    fn observe(&self, _level: Level, event: &ContentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn assistant(payload: &serde_json::Value) -> Message {
    Message::assistant(payload.to_string()).with_id("assistant-1")
}

#[test]
fn test_assistant_message_with_code_and_product() {
    let content = r#"{"body":{"response2":"Here:\n```js\nconsole.log(1)\n```","products":[{"metadata":{"brand_name":"Acme","price":10,"currency":"USD","product_image":"{\"url\":\"http://x/y.png\"}"}}]}}"#;
    let msg = Message::assistant(content).with_id("scenario");

    let decoded = MessageContentPipeline::new().decode(&msg).unwrap();

    assert_eq!(decoded.markdown_body, "Here:\n```js\nconsole.log(1)\n```");
    assert_eq!(decoded.code_segments.len(), 1);
    assert_eq!(
        decoded.code_segments[0].segment,
        CodeSegment::CodeBlock {
            language: "js".to_string(),
            content: "console.log(1)".to_string(),
        }
    );
    assert_eq!(decoded.code_segments[0].key.to_string(), "scenario:code:0");

    assert_eq!(decoded.products.len(), 1);
    let card = &decoded.products[0];
    assert_eq!(card.brand_name.as_deref(), Some("Acme"));
    assert_eq!(card.price, Some(FieldValue::from(10)));
    assert_eq!(card.currency, Some(FieldValue::from("USD")));
    assert_eq!(card.image_url, "http://x/y.png");
}

#[test]
fn test_catalog_records_with_inconsistent_types() {
    let msg = assistant(&json!({
        "body": {
            "response2": "Two gift ideas:",
            "products": [
                { "metadata": {
                    "id": 1,
                    "name": "Nutty & Nourishing Shea Big Gift",
                    "price": 22,
                    "brand_name": "The Body Shop Home",
                    "currency": "USD",
                    "currency_raw": "(#1039336)",
                    "sub_category": "(#1039336)",
                    "product_image": "{\"url\":\"https://media.thebodyshop.com/i/1039336?$product-zoom$&fmt=auto\"}"
                }},
                { "metadata": {
                    "id": 2,
                    "availability": "InStock",
                    "price": 65,
                    "brand_name": "Gift Sets",
                    "currency": "USD",
                    "currency_raw": 13_189_923,
                    "sub_category": 13_189_923,
                    "style_and_material": 13_189_923
                }}
            ]
        }
    }));

    let decoded = MessageContentPipeline::new().decode(&msg).unwrap();
    assert_eq!(decoded.products.len(), 2);
    assert_eq!(
        decoded.products[0].name.as_deref(),
        Some("Nutty & Nourishing Shea Big Gift")
    );
    assert_eq!(
        decoded.products[0].image_url,
        "https://media.thebodyshop.com/i/1039336?$product-zoom$&fmt=auto"
    );
    assert_eq!(decoded.products[1].image_url, "");
    assert_eq!(decoded.products[1].price_label(), "USD:65");
}

#[test]
fn test_user_message_is_literal_even_when_json() {
    let content = r#"{"body":{"response2":"hidden"}}"#;
    let msg = Message::user(content).with_id("u");
    let outcome = MessageContentPipeline::new().run(&msg);
    assert_eq!(outcome.state(), PipelineState::Ready);
    let decoded = outcome.into_result().unwrap();
    assert_eq!(decoded.kind, ContentKind::PlainText);
    assert_eq!(decoded.markdown_body, content);
}

#[test]
fn test_missing_product_image_is_not_an_error() {
    let observer = Arc::new(CollectingObserver::default());
    let pipeline = MessageContentPipeline::new().with_observer(observer.clone());
    let msg = assistant(&json!({
        "body": { "response2": "x", "products": [ { "metadata": { "brand_name": "Acme" } } ] }
    }));

    let decoded = pipeline.decode(&msg).unwrap();
    assert_eq!(decoded.products[0].image_url, "");

    let events = observer.events.lock().unwrap();
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, ContentEvent::MalformedImageRef { .. }))
    );
}

#[test]
fn test_corrupt_image_is_distinguishable_from_absent() {
    let observer = Arc::new(CollectingObserver::default());
    let pipeline = MessageContentPipeline::new().with_observer(observer.clone());
    let msg = assistant(&json!({
        "body": { "response2": "x", "products": [
            { "metadata": { "product_image": "" } },
            { "metadata": { "product_image": "{\"url\":" } }
        ] }
    }));

    let decoded = pipeline.decode(&msg).unwrap();
    assert_eq!(decoded.products[0].image_url, "");
    assert_eq!(decoded.products[1].image_url, "");

    let events = observer.events.lock().unwrap();
    let malformed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ContentEvent::MalformedImageRef { product_index, .. } => Some(*product_index),
            _ => None,
        })
        .collect();
    assert_eq!(malformed, vec![1]);
}

#[test]
fn test_streaming_cursor_segments() {
    let msg = assistant(&json!({
        "body": { "response2": "Working on it `▍`\n\n```\n`▍` leftover text\n```\n" }
    }));

    let decoded = MessageContentPipeline::new().decode(&msg).unwrap();
    let segments: Vec<&CodeSegment> = decoded.code_segments.iter().map(|k| &k.segment).collect();
    assert_eq!(
        segments,
        vec![
            &CodeSegment::StreamCursor,
            &CodeSegment::CodeBlock {
                language: String::new(),
                content: "▍ leftover text".to_string(),
            },
        ]
    );
}

#[test]
fn test_repeated_runs_are_identical() {
    let msg = assistant(&json!({
        "body": {
            "response2": "a `b`\n```rs\nfn x() {}\n```",
            "products": [ { "metadata": { "price": "9.99", "currency": 840 } } ]
        }
    }));
    let pipeline = MessageContentPipeline::new();

    let first = pipeline.decode(&msg).unwrap();
    let second = pipeline.decode(&msg).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_malformed_payload_surfaces_without_panicking() {
    let msg = Message::assistant("I could not produce JSON").with_id("m");
    let pipeline = MessageContentPipeline::new().with_fallback(FallbackPolicy::Surface);

    let err = pipeline.decode_or_fallback(&msg).unwrap_err();
    assert!(matches!(err, ContentError::MalformedPayload { .. }));

    let recovered = MessageContentPipeline::new().decode_or_fallback(&msg).unwrap();
    assert_eq!(recovered.kind, ContentKind::Fallback);
    assert_eq!(recovered.markdown_body, "I could not produce JSON");
}

#[test]
fn test_decoded_message_json_shape() {
    let msg = assistant(&json!({
        "body": { "response2": "`x`", "products": [ { "metadata": { "brand_name": "Acme" } } ] }
    }));
    let decoded = MessageContentPipeline::new().decode(&msg).unwrap();
    let value = serde_json::to_value(&decoded).unwrap();

    assert_eq!(value["messageId"], "assistant-1");
    assert_eq!(value["role"], "assistant");
    assert_eq!(value["kind"], "structured");
    assert_eq!(value["products"][0], json!({ "brandName": "Acme", "imageUrl": "" }));
    assert_eq!(
        value["codeSegments"][0],
        json!({
            "key": { "messageId": "assistant-1", "index": 0 },
            "kind": "inline_code",
            "content": "x"
        })
    );
}
