//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the payment command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::payment::{
    CancelPaymentCommand, CancelPaymentHandler, FulfillmentOrchestrator, GetPaymentStatusHandler,
    GetPaymentStatusQuery, IngestWebhookCommand, IngestWebhookHandler, IngestWebhookResult,
    InitiatePaymentCommand, InitiatePaymentHandler, ListEnrollmentsHandler, ListEnrollmentsQuery,
    ListUserPaymentsHandler, ListUserPaymentsQuery,
};
use crate::domain::foundation::{CourseId, PaymentId, UserId};
use crate::domain::payment::{PaymentError, PaymentMethod};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    CatalogReader, CheckoutGateways, EnrollmentCache, EnrollmentReader, PaymentRepository,
    ProcessedEventLedger, RoomMembership,
};

use super::dto::{
    EnrollmentResponse, ErrorResponse, HealthResponse, InitiatePaymentRequest,
    InitiatePaymentResponse, PaymentResponse, PaymentStatusResponse, PaymobCallbackParams,
    WebhookAckResponse,
};

const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub enrollments: Arc<dyn EnrollmentReader>,
    pub catalog: Arc<dyn CatalogReader>,
    pub ledger: Arc<dyn ProcessedEventLedger>,
    pub rooms: Arc<dyn RoomMembership>,
    pub enrollment_cache: Arc<dyn EnrollmentCache>,
    pub gateways: CheckoutGateways,
    pub gateway_timeout: Duration,
}

impl PaymentAppState {
    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.payments.clone(),
            self.enrollments.clone(),
            self.catalog.clone(),
            self.gateways.clone(),
            self.gateway_timeout,
        )
    }

    pub fn cancel_payment_handler(&self) -> CancelPaymentHandler {
        CancelPaymentHandler::new(self.payments.clone())
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.payments.clone())
    }

    pub fn list_user_payments_handler(&self) -> ListUserPaymentsHandler {
        ListUserPaymentsHandler::new(self.payments.clone())
    }

    pub fn list_enrollments_handler(&self) -> ListEnrollmentsHandler {
        ListEnrollmentsHandler::new(self.enrollments.clone(), self.enrollment_cache.clone())
    }

    pub fn fulfillment(&self) -> FulfillmentOrchestrator {
        FulfillmentOrchestrator::new(
            self.payments.clone(),
            self.ledger.clone(),
            self.rooms.clone(),
            self.enrollment_cache.clone(),
        )
    }

    pub fn webhook_handler(&self) -> IngestWebhookHandler {
        IngestWebhookHandler::new(self.gateways.clone(), Arc::new(self.fulfillment()))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity, set by the gateway in front of this service.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("UNAUTHORIZED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, PaymentError> {
    raw.parse()
        .map_err(|_| PaymentError::validation("paymentId", "must be a UUID"))
}

// ════════════════════════════════════════════════════════════════════════════════
// Buyer Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment/initiate - Start a hosted checkout for a course
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let course_id: CourseId = request
        .course_id
        .parse()
        .map_err(|_| PaymentError::validation("courseId", "must be a UUID"))?;

    let cmd = InitiatePaymentCommand {
        buyer_id: user.user_id,
        course_id,
        method: request.payment_method,
    };
    let result = state.initiate_payment_handler().handle(cmd).await?;

    let response = InitiatePaymentResponse {
        payment_id: result.payment_id.to_string(),
        payment_url: result.payment_url,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /payment/:paymentId/status - Current status of the caller's payment
pub async fn get_payment_status(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let query = GetPaymentStatusQuery {
        payment_id: parse_payment_id(&payment_id)?,
        requester_id: user.user_id,
    };
    let payment = state.payment_status_handler().handle(query).await?;

    Ok(Json(PaymentStatusResponse {
        status: payment.status,
    }))
}

/// DELETE /payment/:paymentId - Cancel the caller's pending payment
pub async fn cancel_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = CancelPaymentCommand {
        payment_id: parse_payment_id(&payment_id)?,
        requester_id: user.user_id,
    };
    let result = state.cancel_payment_handler().handle(cmd).await?;

    Ok(Json(PaymentResponse::from(result.payment)))
}

/// GET /payment/user/:userId - The caller's payment history
pub async fn list_user_payments(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let user_id = UserId::new(user_id).map_err(|_| PaymentError::UserNotFound)?;
    let query = ListUserPaymentsQuery {
        user_id,
        requester_id: user.user_id,
    };
    let payments = state.list_user_payments_handler().handle(query).await?;

    let response: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(Json(response))
}

/// GET /enrollments - Courses the caller is enrolled in
pub async fn list_enrollments(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, PaymentApiError> {
    let query = ListEnrollmentsQuery {
        user_id: user.user_id,
    };
    let enrollments = state.list_enrollments_handler().handle(query).await?;

    let response: Vec<EnrollmentResponse> = enrollments
        .into_iter()
        .map(EnrollmentResponse::from)
        .collect();
    Ok(Json(response))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Callbacks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook - Stripe events, signed in the `Stripe-Signature` header
pub async fn handle_stripe_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ingest(&state, PaymentMethod::Stripe, body, signature).await
}

/// POST /webhook/paymob?hmac=... - Paymob transaction callbacks
pub async fn handle_paymob_webhook(
    State(state): State<PaymentAppState>,
    Query(params): Query<PaymobCallbackParams>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    ingest(&state, PaymentMethod::Paymob, body, params.hmac).await
}

async fn ingest(
    state: &PaymentAppState,
    provider: PaymentMethod,
    body: Bytes,
    signature: Option<String>,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    let cmd = IngestWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler().handle(cmd).await? {
        IngestWebhookResult::Processed(outcome) => {
            tracing::info!(provider = %provider, outcome = ?outcome, "Webhook processed");
        }
        IngestWebhookResult::Ignored(reason) => {
            tracing::debug!(provider = %provider, reason = %reason, "Webhook ignored");
        }
    }

    Ok(Json(WebhookAckResponse { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl PaymentApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PaymentError::NotFound(_)
            | PaymentError::UserNotFound
            | PaymentError::CourseNotFound => StatusCode::NOT_FOUND,
            PaymentError::UserNotVerified => StatusCode::FORBIDDEN,
            PaymentError::AlreadyPurchased
            | PaymentError::AlreadyPending
            | PaymentError::AlreadyEnrolled => StatusCode::CONFLICT,
            PaymentError::InvalidPaymentMethod(_)
            | PaymentError::NotPending
            | PaymentError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            PaymentError::GatewayUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Payment request failed");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}

/// Webhook error response; the status tells the gateway whether to redeliver.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_success() {
            return (status, Json(WebhookAckResponse { received: true })).into_response();
        }

        let code = match &self.0 {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_TIMESTAMP"
            }
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::Database(_) => "PROCESSING_FAILED",
            WebhookError::MissingMetadata(_) | WebhookError::Ignored(_) => "IGNORED",
        };
        let body = ErrorResponse::new(code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
