use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::error::ApiError;

const EXPENSE_CATEGORIES: &[&str] = &[
    "court",
    "equipment",
    "supplies",
    "food",
    "refreshments",
    "transportation",
    "accommodation",
    "booking_fee",
    "software",
    "decorations",
    "gifts",
    "donation",
    "entry_fee",
    "other",
];

const PAYMENT_METHODS: &[&str] = &["venmo", "zelle", "cash", "other"];

fn label(value: &str) -> String {
    value
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Enumeration values clients use to populate pickers. These mirror the
/// typed enums in `schemas`, so there is no metadata table to query.
#[get("/api/metadata/{type}")]
pub async fn get_metadata(kind: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let values = match kind.as_str() {
        "expense_category" => EXPENSE_CATEGORIES,
        "payment_method" => PAYMENT_METHODS,
        _ => return Err(ApiError::validation("invalid metadata type")),
    };
    let metadata: Vec<_> = values
        .iter()
        .map(|value| json!({ "type": kind.as_str(), "value": value, "label": label(value) }))
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "metadata": metadata })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_humanized() {
        assert_eq!(label("booking_fee"), "Booking Fee");
        assert_eq!(label("venmo"), "Venmo");
    }
}
