use actix_web::{get, post, web, HttpResponse};
use log::info;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{self, PredictionResponse};
use crate::pipeline::{Pipeline, PipelineError, Record};

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Credit Default Prediction API</title>
    <meta charset="UTF-8">
    <style>
        body {
            margin: 0;
            padding: 0;
            height: 100vh;
            display: flex;
            justify-content: center;
            align-items: flex-start;
            font-family: sans-serif;
        }
        .content {
            margin-top: 20vh;
            text-align: center;
        }
    </style>
</head>
<body>
    <div class="content">
        <h2>Credit Default Prediction API</h2>
        <p>POST applicant records to <code>/predict</code>.</p>
    </div>
</body>
</html>
"#;

#[get("/")]
pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(LANDING_PAGE)
}

/// Schema documentation for callers; no computation happens here.
#[get("/predict")]
pub async fn predict_info() -> HttpResponse {
    HttpResponse::Ok().json(models::predict_info())
}

/// Accepts a single applicant record or an array of records and returns one
/// prediction per record, in input order. Any pipeline failure fails the
/// whole batch.
#[post("/predict")]
pub async fn predict(
    pipeline: web::Data<Pipeline>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let records = coerce_records(payload.into_inner())?;
    info!("prediction request with {} record(s)", records.len());

    let labels = pipeline
        .classify(&records)
        .map_err(|e| ApiError::Prediction(e.to_string()))?;
    let probabilities = pipeline
        .predict_proba(&records)
        .map_err(|e| ApiError::Prediction(e.to_string()))?;

    let results: Vec<PredictionResponse> = labels
        .iter()
        .zip(&probabilities)
        .map(|(&label, proba)| PredictionResponse::new(label, proba[label]))
        .collect();

    Ok(HttpResponse::Ok().json(results))
}

/// A JSON object is a batch of one; an array contributes one record per
/// element. Any other top-level shape is rejected outright.
fn coerce_records(value: Value) -> Result<Vec<Record>, ApiError> {
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(ApiError::Prediction(
                    PipelineError::NotAnObject { row: i }.to_string(),
                )),
            })
            .collect(),
        _ => Err(ApiError::InvalidInputShape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::json;

    async fn service(
        pipeline: Pipeline,
    ) -> impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    > {
        test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline))
                .service(home)
                .service(predict_info)
                .service(predict),
        )
        .await
    }

    fn assert_confidence_format(confidence: &str) {
        let pct = confidence.strip_suffix('%').expect("missing % sign");
        let (_, decimals) = pct.split_once('.').expect("missing decimal point");
        assert_eq!(decimals.len(), 2, "expected two decimals in {confidence:?}");
        let value: f64 = pct.parse().unwrap();
        assert!((0.0..=100.0).contains(&value));
    }

    #[actix_web::test]
    async fn single_object_yields_one_result() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "status": "no_checking_account", "duration": 60, "age": 25 }))
            .to_request();
        let body: Vec<PredictionResponse> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.len(), 1);
        assert_eq!(body[0].outcome, "Likely to default (not pay back)");
        assert_confidence_format(&body[0].confidence);
    }

    #[actix_web::test]
    async fn array_payload_preserves_order() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!([
                { "status": "no_checking_account", "duration": 60, "age": 25 },
                { "status": "positive_balance", "duration": 6, "age": 50 }
            ]))
            .to_request();
        let body: Vec<PredictionResponse> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.len(), 2);
        assert_eq!(body[0].outcome, "Likely to default (not pay back)");
        assert_eq!(body[1].outcome, "Likely to pay back");
        for result in &body {
            assert_confidence_format(&result.confidence);
        }
    }

    #[actix_web::test]
    async fn scalar_payloads_are_rejected_with_shape_error() {
        let app = service(crate::pipeline::test_pipeline()).await;
        for payload in [json!("hello"), json!(42), json!(null)] {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_json(&payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400, "payload {payload} should be rejected");

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(
                body["error"],
                "Input must be a JSON object or an array of objects."
            );
        }
    }

    #[actix_web::test]
    async fn missing_feature_fails_the_whole_batch() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!([
                { "status": "positive_balance", "duration": 6, "age": 50 },
                { "status": "positive_balance", "age": 50 }
            ]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("duration"), "unexpected error: {message}");
    }

    #[actix_web::test]
    async fn non_object_array_element_is_a_prediction_error() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!([{ "status": "positive_balance", "duration": 6, "age": 50 }, 7]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "record 1 is not a JSON object");
    }

    #[actix_web::test]
    async fn malformed_json_body_is_rejected() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn tied_probability_is_reported_as_default_at_fifty_percent() {
        // Zero weights and intercept put every record exactly on the boundary.
        let pipeline: Pipeline = serde_json::from_value(json!({
            "features": [
                { "type": "numeric", "name": "duration", "mean": 0.0, "std": 1.0 }
            ],
            "model": { "weights": [0.0], "intercept": 0.0 }
        }))
        .unwrap();
        let app = service(pipeline).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "duration": 12 }))
            .to_request();
        let body: Vec<PredictionResponse> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.len(), 1);
        assert_eq!(body[0].confidence, "50.00%");
        assert_eq!(body[0].outcome, "Likely to default (not pay back)");
    }

    #[actix_web::test]
    async fn predict_info_documents_the_schema() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::get().uri("/predict").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["message"].as_str().unwrap().contains("POST"));
        assert!(body["example_payload"].is_object());
    }

    #[actix_web::test]
    async fn landing_page_is_html() {
        let app = service(crate::pipeline::test_pipeline()).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let content_type = resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("<html"));
    }
}
