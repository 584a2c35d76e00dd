//! Registry administration. Only super admins reach these.

use crate::app::LedgerTx;
use crate::domain::Capability;
use crate::transport::http::types::{
    json_body, ApiResult, AppState, OutcomeBody, OwnerResponse, RequestActor,
    TransferOwnershipRequest, WhitelistRequest, WhitelistStatus,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/ledger/init",
    responses(
        (status = 200, description = "Registry initialized with the service signer as owner", body = LedgerTx),
        (status = 403, description = "Caller is not a super admin", body = ErrorBody),
        (status = 502, description = "Ledger call failed", body = ErrorBody)
    )
)]
pub async fn init_contract_handler(
    State(state): State<AppState>,
    actor: RequestActor,
) -> ApiResult<Json<OutcomeBody<LedgerTx>>> {
    actor.require(Capability::AdministerLedger)?;
    Ok(Json(state.service.init_contract().await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/ledger/whitelist",
    request_body = WhitelistRequest,
    responses(
        (status = 200, description = "Address allowed to store documents", body = LedgerTx),
        (status = 400, description = "Blank or malformed address", body = ErrorBody),
        (status = 502, description = "Ledger call failed", body = ErrorBody)
    )
)]
pub async fn whitelist_add_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    request: Result<Json<WhitelistRequest>, JsonRejection>,
) -> ApiResult<Json<OutcomeBody<LedgerTx>>> {
    actor.require(Capability::AdministerLedger)?;
    let request = json_body(request, "{\"address\": \"...\"}")?;
    Ok(Json(
        state.service.whitelist_address(&request.address).await?.into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/ledger/whitelist/{address}",
    params(("address" = String, Path, description = "Ledger address")),
    responses(
        (status = 200, description = "Address removed from the whitelist", body = LedgerTx),
        (status = 502, description = "Ledger call failed", body = ErrorBody)
    )
)]
pub async fn whitelist_remove_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    Path(address): Path<String>,
) -> ApiResult<Json<OutcomeBody<LedgerTx>>> {
    actor.require(Capability::AdministerLedger)?;
    Ok(Json(
        state.service.remove_from_whitelist(&address).await?.into(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/ledger/whitelist/{address}",
    params(("address" = String, Path, description = "Ledger address")),
    responses(
        (status = 200, description = "Whitelist membership", body = WhitelistStatus)
    )
)]
pub async fn whitelist_check_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    Path(address): Path<String>,
) -> ApiResult<Json<WhitelistStatus>> {
    actor.require(Capability::AdministerLedger)?;
    let whitelisted = state.service.is_whitelisted(&address).await?;
    Ok(Json(WhitelistStatus {
        address,
        whitelisted,
    }))
}

#[utoipa::path(
    get,
    path = "/api/ledger/owner",
    responses(
        (status = 200, description = "Registry owner address", body = OwnerResponse),
        (status = 502, description = "Registry not initialized or unreachable", body = ErrorBody)
    )
)]
pub async fn owner_handler(
    State(state): State<AppState>,
    actor: RequestActor,
) -> ApiResult<Json<OwnerResponse>> {
    actor.require(Capability::AdministerLedger)?;
    let owner = state.service.owner_address().await?;
    Ok(Json(OwnerResponse { owner }))
}

#[utoipa::path(
    post,
    path = "/api/ledger/owner",
    request_body = TransferOwnershipRequest,
    responses(
        (status = 200, description = "Registry handed to the new owner", body = LedgerTx),
        (status = 400, description = "Blank or malformed address", body = ErrorBody),
        (status = 502, description = "Ledger refused the transfer", body = ErrorBody)
    )
)]
pub async fn transfer_ownership_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    request: Result<Json<TransferOwnershipRequest>, JsonRejection>,
) -> ApiResult<Json<OutcomeBody<LedgerTx>>> {
    actor.require(Capability::AdministerLedger)?;
    let request = json_body(request, "{\"newOwner\": \"...\"}")?;
    Ok(Json(
        state.service.transfer_ownership(&request.new_owner).await?.into(),
    ))
}
