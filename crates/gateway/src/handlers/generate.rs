//! LLM-backed editor functions

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::app::AppState;
use crate::extract::AppJson;
use commentarium_common::{
    content::{parse_completion, GenerationKind, ParsedCompletion},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateContentRequest {
    #[validate(length(min = 1, max = 4000))]
    pub prompt: String,

    #[serde(rename = "type")]
    pub kind: GenerationKind,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateContentResponse {
    /// title, excerpt and content requests
    Text { content: String },
    /// complete requests
    Article(ParsedCompletion),
}

fn require_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(AppError::MissingField {
            field: "prompt".to_string(),
        });
    }
    Ok(())
}

pub async fn generate_content(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateContentRequest>,
) -> Result<Json<GenerateContentResponse>> {
    request.validate()?;
    require_prompt(&request.prompt)?;
    let start = Instant::now();

    let completion = state
        .generator
        .complete(&request.kind.system_prompt(), &request.kind.user_prompt(&request.prompt))
        .await?;

    let response = match request.kind {
        GenerationKind::Complete => {
            let article = parse_completion(&completion).inspect_err(|e| {
                tracing::warn!(error = %e, completion_len = completion.len(), "Completion did not follow the template");
            })?;
            GenerateContentResponse::Article(article)
        }
        _ => GenerateContentResponse::Text {
            content: completion.trim().to_string(),
        },
    };

    tracing::info!(
        kind = request.kind.as_str(),
        model = state.generator.model_name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Content generated"
    );

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_url: String,
}

pub async fn generate_image(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>> {
    request.validate()?;
    require_prompt(&request.prompt)?;

    let image = state.generator.generate_image(request.prompt.trim()).await?;

    tracing::info!(mime_type = %image.mime_type, bytes = image.bytes.len(), "Image generated");

    Ok(Json(GenerateImageResponse {
        image_url: image.to_data_uri(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::test_support::*;
    use axum::http::StatusCode;
    use commentarium_common::llm::MockGenerator;
    use serde_json::json;

    fn generate(prompt: &str, kind: &str) -> axum::http::Request<axum::body::Body> {
        json_request(
            "POST",
            "/functions/generate-content",
            json!({ "prompt": prompt, "type": kind }),
        )
    }

    #[tokio::test]
    async fn test_simple_kinds_return_trimmed_content() {
        let app = TestAppBuilder::new()
            .generator(MockGenerator::new("\n  Il valore del tempo  \n"))
            .build();

        for kind in ["title", "excerpt", "content"] {
            let (status, body) = app.send(generate("gestione del tempo", kind)).await;
            assert_eq!(status, StatusCode::OK, "{kind}");
            assert_eq!(body, json!({ "content": "Il valore del tempo" }));
        }
    }

    #[tokio::test]
    async fn test_complete_is_parsed() {
        let app = TestAppBuilder::new()
            .generator(MockGenerator::new(
                "TITOLO: Foo\nESTRATTO: Bar\nSLUG: \nCONTENUTO_HTML:\n<p>Baz</p>",
            ))
            .build();

        let (status, body) = app.send(generate("foo", "complete")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "title": "Foo", "excerpt": "Bar", "slug": "foo", "content": "<p>Baz</p>" })
        );
    }

    #[tokio::test]
    async fn test_unparseable_completion_is_500() {
        let app = TestAppBuilder::new()
            .generator(MockGenerator::new("Mi dispiace, non posso aiutarti."))
            .build();

        let (status, body) = app.send(generate("foo", "complete")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "COMPLETION_PARSE_ERROR");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let app = TestAppBuilder::new().generator(MockGenerator::failing()).build();

        let (status, body) = app.send(generate("foo", "title")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "GENERATION_ERROR");

        let (status, _) = app
            .send(json_request("POST", "/functions/generate-image", json!({ "prompt": "x" })))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = TestAppBuilder::new().build();

        let (status, body) = app.send(generate("   ", "title")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");

        let (status, body) = app.send(generate("foo", "summary")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_image_is_returned_as_data_uri() {
        let app = TestAppBuilder::new().build();
        let (status, body) = app
            .send(json_request(
                "POST",
                "/functions/generate-image",
                json!({ "prompt": "sala riunioni luminosa" }),
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["imageUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[tokio::test]
    async fn test_function_endpoints_are_rate_limited() {
        let app = TestAppBuilder::new().rate_limit(1, 1).build();

        let (status, _) = app.send(generate("foo", "title")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.send(generate("foo", "title")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");

        // content routes are not behind the bucket
        let (status, _) = app.send(get("/api/posts")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
