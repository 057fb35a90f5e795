//! Newsletter sign-up

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::extract::AppJson;
use commentarium_common::{
    db::normalize_email,
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub email: String,
}

pub async fn subscribe(
    State(state): State<AppState>,
    AppJson(request): AppJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>)> {
    let request = SubscribeRequest {
        email: normalize_email(&request.email),
    };
    request.validate()?;

    match state.store.subscribe(&request.email).await {
        Ok(subscriber) => {
            metrics::record_subscription("created");
            tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription created");
            Ok((
                StatusCode::CREATED,
                Json(SubscribeResponse {
                    success: true,
                    email: subscriber.email,
                }),
            ))
        }
        Err(e @ AppError::DuplicateSubscription { .. }) => {
            metrics::record_subscription("duplicate");
            Err(e)
        }
        Err(e) => {
            metrics::record_subscription("error");
            Err(e)
        }
    }
}
