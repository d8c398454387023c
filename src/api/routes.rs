//! API Routes
//!
//! HTTP endpoint definitions. Paths keep the Portuguese names existing
//! clients call; bodies use English field names.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Extension, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{format_date, Beneficiary, Loan, OperationContext, Payment, PaymentType};
use crate::error::{AppError, AppResult};
use crate::handlers::{BeneficiaryCommand, LoanCommand, LoanTotal, PaymentCommand};

use super::AppState;

/// Room for multipart boundaries and part headers on top of the image
const MULTIPART_OVERHEAD: usize = 16 * 1024;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: i64,
    pub beneficiary_id: i64,
    pub loan_date: String,
    pub due_date: String,
    pub principal: Decimal,
    pub percentage: Decimal,
    pub interest: Decimal,
    pub total_due: Decimal,
    pub settled: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            beneficiary_id: loan.beneficiary_id,
            loan_date: format_date(&loan.loan_date),
            due_date: format_date(&loan.due_date),
            interest: loan.interest(),
            total_due: loan.total_due(),
            principal: loan.principal,
            percentage: loan.percentage,
            settled: loan.settled,
            note: loan.note,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub loan_id: i64,
    pub payment_date: String,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            loan_id: payment.loan_id,
            payment_date: format_date(&payment.payment_date),
            amount: payment.amount,
            payment_type: payment.payment_type,
            note: payment.note,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub ano: i32,
    pub mes: u32,
}

#[derive(Debug, Serialize)]
pub struct MonthTotalResponse {
    pub year: i32,
    pub month: u32,
    pub total: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct SettledQuery {
    pub quitado: bool,
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

fn month_total(month: MonthQuery, total: Option<Decimal>) -> Json<MonthTotalResponse> {
    Json(MonthTotalResponse {
        year: month.ano,
        month: month.mes,
        total,
    })
}

fn loans(loans: Vec<Loan>) -> Json<Vec<LoanResponse>> {
    Json(loans.into_iter().map(LoanResponse::from).collect())
}

fn payments(payments: Vec<Payment>) -> Json<Vec<PaymentResponse>> {
    Json(payments.into_iter().map(PaymentResponse::from).collect())
}

// =========================================================================
// API Router
// =========================================================================

/// Create the authenticated API router
pub fn create_router(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        // Beneficiaries
        .route("/beneficiario", post(create_beneficiary).get(list_beneficiaries))
        .route(
            "/beneficiario/:id",
            get(get_beneficiary)
                .put(update_beneficiary)
                .delete(delete_beneficiary),
        )
        .route("/beneficiario/buscarPorNome/:nome", get(search_beneficiaries))
        .route(
            "/beneficiario/:id/imagem",
            post(upload_image)
                .get(download_image)
                .layer(DefaultBodyLimit::max(max_image_bytes + MULTIPART_OVERHEAD)),
        )
        // Loans
        .route("/emprestimo", post(create_loan).get(list_loans))
        .route("/emprestimo/vencidos", get(list_overdue_loans))
        .route("/emprestimo/situacao", get(list_loans_by_settled))
        .route("/emprestimo/total-emprestado", get(total_lent))
        .route("/emprestimo/total-a-receber-bruto", get(total_receivable_gross))
        .route("/emprestimo/total-a-receber-liquido", get(total_receivable_net))
        .route("/emprestimo/beneficiario/:id", get(list_loans_by_beneficiary))
        .route(
            "/emprestimo/:id",
            get(get_loan).put(update_loan).delete(delete_loan),
        )
        // Payments
        .route("/pagamento", post(create_payment).get(list_payments))
        .route("/pagamento/total-recebido", get(total_received))
        .route("/pagamento/emprestimo/:id", get(list_payments_by_loan))
        .route("/pagamento/emprestimo/:id/total", get(total_received_for_loan))
        .route(
            "/pagamento/:id",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
}

// =========================================================================
// POST /login
// =========================================================================

/// Exchange login and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let request = payload(body)?;

    let session = state
        .authenticator
        .authenticate(&request.login, &request.password, &context)
        .await?;

    Ok(Json(LoginResponse {
        token: session.token,
        token_type: "Bearer",
        expires_at: session.expires_at,
    }))
}

// =========================================================================
// /api/beneficiario
// =========================================================================

async fn create_beneficiary(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    body: Result<Json<BeneficiaryCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Beneficiary>)> {
    let command = payload(body)?;
    let beneficiary = state.beneficiaries.insert(command, &context).await?;
    Ok((StatusCode::CREATED, Json(beneficiary)))
}

async fn list_beneficiaries(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> AppResult<Json<Vec<Beneficiary>>> {
    Ok(Json(state.beneficiaries.list_all(&context).await?))
}

async fn get_beneficiary(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Beneficiary>> {
    Ok(Json(state.beneficiaries.get_by_id(&id, &context).await?))
}

async fn update_beneficiary(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
    body: Result<Json<BeneficiaryCommand>, JsonRejection>,
) -> AppResult<Json<Beneficiary>> {
    let command = payload(body)?;
    Ok(Json(state.beneficiaries.update(&id, command, &context).await?))
}

async fn delete_beneficiary(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.beneficiaries.remove(&id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_beneficiaries(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<Beneficiary>>> {
    Ok(Json(state.beneficiaries.search_by_name(&name, &context).await?))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidRequest(err.body_text())
    }
}

/// Attach the `file` part of a multipart body as the beneficiary image
async fn upload_image(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<StatusCode> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            file = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }

    let bytes = file.ok_or_else(|| AppError::InvalidRequest("Missing 'file' part".to_string()))?;
    if bytes.len() > state.max_image_bytes {
        return Err(AppError::PayloadTooLarge);
    }

    state
        .beneficiaries
        .attach_image(&id, bytes.to_vec(), &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_image(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, media_type) = state.beneficiaries.image(&id, &context).await?;
    Ok(([(header::CONTENT_TYPE, media_type)], bytes))
}

// =========================================================================
// /api/emprestimo
// =========================================================================

async fn create_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    body: Result<Json<LoanCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let command = payload(body)?;
    let loan = state.loans.insert(command, &context).await?;
    Ok((StatusCode::CREATED, Json(loan.into())))
}

async fn list_loans(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> AppResult<Json<Vec<LoanResponse>>> {
    Ok(loans(state.loans.list_all(&context).await?))
}

async fn get_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<LoanResponse>> {
    Ok(Json(state.loans.get_by_id(&id, &context).await?.into()))
}

async fn update_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
    body: Result<Json<LoanCommand>, JsonRejection>,
) -> AppResult<Json<LoanResponse>> {
    let command = payload(body)?;
    Ok(Json(state.loans.update(&id, command, &context).await?.into()))
}

async fn delete_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.loans.remove(&id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_loans_by_beneficiary(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<LoanResponse>>> {
    Ok(loans(state.loans.list_by_beneficiary(&id, &context).await?))
}

async fn list_overdue_loans(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<OverdueQuery>, QueryRejection>,
) -> AppResult<Json<Vec<LoanResponse>>> {
    let params = query(params)?;
    Ok(loans(state.loans.list_overdue(&params.data, &context).await?))
}

async fn list_loans_by_settled(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<SettledQuery>, QueryRejection>,
) -> AppResult<Json<Vec<LoanResponse>>> {
    let params = query(params)?;
    Ok(loans(state.loans.list_by_settled(params.quitado, &context).await?))
}

async fn total_lent(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<MonthQuery>, QueryRejection>,
) -> AppResult<Json<MonthTotalResponse>> {
    let month = query(params)?;
    let total = state
        .loans
        .total_lent_in_month(month.ano, month.mes, &context)
        .await?;
    Ok(month_total(month, total))
}

async fn total_receivable_gross(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<MonthQuery>, QueryRejection>,
) -> AppResult<Json<MonthTotalResponse>> {
    let month = query(params)?;
    let total = state
        .loans
        .total_receivable_gross_in_month(month.ano, month.mes, &context)
        .await?;
    Ok(month_total(month, total))
}

async fn total_receivable_net(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<MonthQuery>, QueryRejection>,
) -> AppResult<Json<MonthTotalResponse>> {
    let month = query(params)?;
    let total = state
        .loans
        .total_receivable_net_in_month(month.ano, month.mes, &context)
        .await?;
    Ok(month_total(month, total))
}

// =========================================================================
// /api/pagamento
// =========================================================================

async fn create_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    body: Result<Json<PaymentCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PaymentResponse>)> {
    let command = payload(body)?;
    let payment = state.payments.insert(command, &context).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> AppResult<Json<Vec<PaymentResponse>>> {
    Ok(payments(state.payments.list_all(&context).await?))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<PaymentResponse>> {
    Ok(Json(state.payments.get_by_id(&id, &context).await?.into()))
}

async fn update_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
    body: Result<Json<PaymentCommand>, JsonRejection>,
) -> AppResult<Json<PaymentResponse>> {
    let command = payload(body)?;
    Ok(Json(state.payments.update(&id, command, &context).await?.into()))
}

async fn delete_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.payments.remove(&id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_payments_by_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PaymentResponse>>> {
    Ok(payments(state.payments.list_by_loan(&id, &context).await?))
}

async fn total_received_for_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> AppResult<Json<LoanTotal>> {
    Ok(Json(state.payments.total_received_for_loan(&id, &context).await?))
}

async fn total_received(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    params: Result<Query<MonthQuery>, QueryRejection>,
) -> AppResult<Json<MonthTotalResponse>> {
    let month = query(params)?;
    let total = state
        .payments
        .total_received_in_month(month.ano, month.mes, &context)
        .await?;
    Ok(month_total(month, total))
}
