//! Extractors whose rejections render as the standard JSON error body

use axum::extract::{FromRequest, FromRequestParts};
use commentarium_common::errors::AppError;

/// `Json<T>` with `AppError` rejections (400 on malformed or mistyped bodies)
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query<T>` with `AppError` rejections
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
