use async_stream::stream;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    BoxError,
};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::{error, info};

use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    pub city_from: Option<String>,
    pub city_to: Option<String>,
}

fn city_code(raw: Option<String>) -> Result<Option<String>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(Some(code.to_ascii_uppercase()))
        }
        Some(code) => Err(code.to_string()),
    }
}

/// Cheapest confirmed flights from the latest completed update, streamed as
/// `{"data":[...]}`.
pub async fn get_prices(
    State(app_state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> Response {
    let (city_from, city_to) = match (city_code(query.city_from), city_code(query.city_to)) {
        (Ok(from), Ok(to)) => (from, to),
        (Err(code), _) | (_, Err(code)) => {
            return JsonResponse::bad_request(&format!("Invalid city code: {code}"))
                .into_response();
        }
    };

    let update = match app_state.price_updates.latest_completed_update().await {
        Ok(Some(update)) => update,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(?e, "failed to load latest price update");
            return JsonResponse::server_error("Failed to load prices").into_response();
        }
    };
    info!(update_id = %update.id, ?city_from, ?city_to, "serving prices");

    let repo = app_state.price_updates.clone();
    let body = stream! {
        let mut rows = repo.stream_flights(update.id, city_from, city_to);
        yield Ok::<String, BoxError>("{\"data\":[".to_string());
        let mut first = true;
        while let Some(row) = rows.next().await {
            let flight = match row {
                Ok(flight) => flight,
                Err(e) => {
                    error!(update_id = %update.id, ?e, "price stream aborted");
                    yield Err(e.into());
                    return;
                }
            };
            match serde_json::to_string(&flight) {
                Ok(json) if first => {
                    first = false;
                    yield Ok(json);
                }
                Ok(json) => yield Ok(format!(",{json}")),
                Err(e) => {
                    error!(update_id = %update.id, ?e, "failed to encode flight");
                    yield Err(e.into());
                    return;
                }
            }
        }
        yield Ok("]}".to_string());
    };

    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(body),
    )
        .into_response()
}
