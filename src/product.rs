//! Product records embedded in assistant payloads.
//!
//! Catalog metadata arrives with no enforced schema: the same field can be a
//! number in one record, a string in the next, and missing in a third. The
//! raw record keeps every known field as an untyped optional JSON value and
//! exposes typed accessors, each with a single coercion rule:
//!
//! - [`RawProductMetadata::text_field`]: JSON string, otherwise absent.
//! - [`RawProductMetadata::number_or_text_field`]: JSON number or string,
//!   otherwise absent.
//!
//! [`extract`] turns envelopes into [`ProductCard`]s, one card per envelope,
//! in order, with no filtering.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::image;
use crate::observe::{self, ContentEvent, ContentObserver};

/// A value that may be numeric or textual, preserved as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A JSON number.
    Number(Number),
    /// A JSON string.
    Text(String),
}

impl FieldValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One product's metadata exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProductMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_and_material: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_vertical: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_page_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<Value>,
    /// Any field the catalog sends that is not listed above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawProductMetadata {
    /// Text accessor: a JSON string is returned, anything else is absent.
    pub fn text_field(field: Option<&Value>) -> Option<String> {
        field.and_then(Value::as_str).map(str::to_string)
    }

    /// Number-or-text accessor: numbers and strings pass through unchanged,
    /// anything else is absent.
    pub fn number_or_text_field(field: Option<&Value>) -> Option<FieldValue> {
        field.and_then(FieldValue::from_json)
    }

    #[must_use]
    pub fn brand_name(&self) -> Option<String> {
        Self::text_field(self.brand_name.as_ref())
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        Self::text_field(self.name.as_ref())
    }

    #[must_use]
    pub fn product_page_url(&self) -> Option<String> {
        Self::text_field(self.product_page_url.as_ref())
    }

    #[must_use]
    pub fn price(&self) -> Option<FieldValue> {
        Self::number_or_text_field(self.price.as_ref())
    }

    #[must_use]
    pub fn currency(&self) -> Option<FieldValue> {
        Self::number_or_text_field(self.currency.as_ref())
    }
}

/// One raw product record prior to normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductEnvelope {
    #[serde(default)]
    pub metadata: RawProductMetadata,
}

impl ProductEnvelope {
    /// Build an envelope from an arbitrary JSON value.
    ///
    /// Never fails: a non-object entry, or a missing or non-object
    /// `metadata`, yields an envelope whose fields are all absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let metadata = value
            .get("metadata")
            .filter(|m| m.is_object())
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();
        Self { metadata }
    }
}

/// A normalized product, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<FieldValue>,
    /// Image URL; empty when no usable image is available.
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_page_url: Option<String>,
}

impl ProductCard {
    /// `"<currency>:<price>"`, with either side empty when absent.
    #[must_use]
    pub fn price_label(&self) -> String {
        let currency = self
            .currency
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let price = self
            .price
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        format!("{currency}:{price}")
    }

    /// Whether an image is available.
    #[must_use]
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

/// Normalize envelopes into cards, preserving order.
///
/// Image references that fail to decode become an empty `image_url` and are
/// reported to `observer` as [`ContentEvent::MalformedImageRef`].
pub fn extract(products: &[ProductEnvelope], observer: &dyn ContentObserver) -> Vec<ProductCard> {
    products
        .iter()
        .enumerate()
        .map(|(index, envelope)| normalize(index, &envelope.metadata, observer))
        .collect()
}

fn normalize(
    index: usize,
    metadata: &RawProductMetadata,
    observer: &dyn ContentObserver,
) -> ProductCard {
    let image_url = match image::resolve(metadata) {
        Ok(url) => {
            if !url.is_empty() && !image::is_absolute_url(&url) {
                observe::emit(
                    observer,
                    &ContentEvent::UnverifiedImageRef {
                        product_index: index,
                    },
                );
            }
            url
        }
        Err(err) => {
            observe::emit(
                observer,
                &ContentEvent::MalformedImageRef {
                    product_index: index,
                    reason: err.to_string(),
                },
            );
            String::new()
        }
    };

    ProductCard {
        brand_name: metadata.brand_name(),
        price: metadata.price(),
        currency: metadata.currency(),
        image_url,
        name: metadata.name(),
        product_page_url: metadata.product_page_url(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NoopObserver;
    use crate::observe::testing::RecordingObserver;
    use serde_json::json;

    fn envelope(value: Value) -> ProductEnvelope {
        ProductEnvelope::from_value(&value)
    }

    #[test]
    fn test_mixed_field_types_pass_through() {
        let products = vec![
            envelope(json!({ "metadata": {
                "brand_name": "The Body Shop Home",
                "price": 22,
                "currency": "USD",
                "currency_raw": "(#1039336)",
            }})),
            envelope(json!({ "metadata": {
                "brand_name": "Gift Sets",
                "price": "65.00",
                "currency": 13_189_923,
                "sub_category": 13_189_923,
            }})),
        ];

        let cards = extract(&products, &NoopObserver);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].brand_name.as_deref(), Some("The Body Shop Home"));
        assert_eq!(cards[0].price, Some(FieldValue::from(22)));
        assert_eq!(cards[0].currency, Some(FieldValue::from("USD")));
        assert_eq!(cards[1].price, Some(FieldValue::from("65.00")));
        assert_eq!(cards[1].currency, Some(FieldValue::from(13_189_923)));
    }

    #[test]
    fn test_empty_metadata_still_produces_card() {
        let products = vec![
            envelope(json!({})),
            envelope(json!("not an object")),
            envelope(json!({ "metadata": null })),
        ];
        let cards = extract(&products, &NoopObserver);
        assert_eq!(cards.len(), 3);
        for card in cards {
            assert!(card.brand_name.is_none());
            assert!(card.price.is_none());
            assert!(card.currency.is_none());
            assert_eq!(card.image_url, "");
        }
    }

    #[test]
    fn test_wrong_shapes_become_absent() {
        let products = vec![envelope(json!({ "metadata": {
            "brand_name": 42,
            "price": true,
            "currency": ["USD"],
        }}))];
        let card = &extract(&products, &NoopObserver)[0];
        assert!(card.brand_name.is_none());
        assert!(card.price.is_none());
        assert!(card.currency.is_none());
    }

    #[test]
    fn test_unknown_fields_are_kept_in_extra() {
        let env = envelope(json!({ "metadata": { "color": "red", "price": 1 } }));
        assert_eq!(env.metadata.extra.get("color"), Some(&json!("red")));
        assert_eq!(env.metadata.price, Some(json!(1)));
    }

    #[test]
    fn test_malformed_image_is_reported_not_dropped() {
        let observer = RecordingObserver::default();
        let products = vec![envelope(json!({ "metadata": {
            "brand_name": "Acme",
            "product_image": "{\"url\": ",
        }}))];
        let cards = extract(&products, &observer);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].image_url, "");
        assert_eq!(cards[0].brand_name.as_deref(), Some("Acme"));
        assert_eq!(observer.names(), vec!["content.malformed_image_ref"]);
    }

    #[test]
    fn test_relative_direct_image_is_reported_as_unverified() {
        let observer = RecordingObserver::default();
        let products = vec![envelope(json!({ "metadata": { "product_image": "img/a.png" } }))];
        let cards = extract(&products, &observer);
        assert_eq!(cards[0].image_url, "img/a.png");
        assert_eq!(observer.names(), vec!["content.unverified_image_ref"]);
    }

    #[test]
    fn test_price_label() {
        let card = ProductCard {
            brand_name: None,
            price: Some(FieldValue::from(22)),
            currency: Some(FieldValue::from("USD")),
            image_url: String::new(),
            name: None,
            product_page_url: None,
        };
        assert_eq!(card.price_label(), "USD:22");
        assert!(!card.has_image());

        let bare = ProductCard {
            price: None,
            currency: None,
            ..card
        };
        assert_eq!(bare.price_label(), ":");
    }

    #[test]
    fn test_card_serializes_camel_case_and_omits_absent() {
        let card = ProductCard {
            brand_name: Some("Acme".to_string()),
            price: Some(FieldValue::from(10)),
            currency: None,
            image_url: "http://x/y.png".to_string(),
            name: None,
            product_page_url: None,
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(
            json,
            json!({ "brandName": "Acme", "price": 10, "imageUrl": "http://x/y.png" })
        );
    }
}
