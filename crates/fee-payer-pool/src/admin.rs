use relay_types::RotationState;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::info;

use crate::state::PoolState;

/// Admin-driven rotation transitions (spec §4.1's state diagram). These are
/// explicit operator actions, never triggered by the request path.
#[derive(Debug, Clone, Copy)]
pub enum AdminOp {
    StartRetirement(Pubkey),
    CompleteRetirement(Pubkey),
    EmergencyRetire(Pubkey),
    Reactivate(Pubkey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetirementOutcome {
    Transitioned(RotationState),
    /// `complete_retirement` was requested but reservations are still open;
    /// the payer stays RETIRING until they drain.
    StillDraining { remaining_reservations: usize },
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("unknown fee payer {0}")]
    UnknownPayer(Pubkey),
    #[error("payer {0} is not ACTIVE, cannot start retirement")]
    NotActive(Pubkey),
    #[error("payer {0} is not RETIRING")]
    NotRetiring(Pubkey),
    #[error("payer {0} was force-retired and cannot be reactivated")]
    ForcedRetirementIrreversible(Pubkey),
    #[error("payer {0} is not RETIRED")]
    NotRetired(Pubkey),
}

pub fn apply_admin_op(state: &mut PoolState, op: AdminOp) -> Result<RetirementOutcome, AdminError> {
    match op {
        AdminOp::StartRetirement(pubkey) => start_retirement(state, pubkey),
        AdminOp::CompleteRetirement(pubkey) => complete_retirement(state, pubkey),
        AdminOp::EmergencyRetire(pubkey) => emergency_retire(state, pubkey),
        AdminOp::Reactivate(pubkey) => reactivate(state, pubkey),
    }
}

fn start_retirement(state: &mut PoolState, pubkey: Pubkey) -> Result<RetirementOutcome, AdminError> {
    let payer = state.payers.get_mut(&pubkey).ok_or(AdminError::UnknownPayer(pubkey))?;
    if !matches!(payer.rotation_state, RotationState::Active) {
        return Err(AdminError::NotActive(pubkey));
    }
    payer.rotation_state = RotationState::Retiring { forced: false };
    info!(payer = %pubkey, "fee payer entering retirement: accepts no new reservations");
    Ok(RetirementOutcome::Transitioned(payer.rotation_state))
}

fn complete_retirement(state: &mut PoolState, pubkey: Pubkey) -> Result<RetirementOutcome, AdminError> {
    let payer = state.payers.get_mut(&pubkey).ok_or(AdminError::UnknownPayer(pubkey))?;
    let forced = match payer.rotation_state {
        RotationState::Retiring { forced } => forced,
        _ => return Err(AdminError::NotRetiring(pubkey)),
    };
    if !payer.reservations.is_empty() {
        return Ok(RetirementOutcome::StillDraining { remaining_reservations: payer.reservations.len() });
    }
    payer.rotation_state = RotationState::Retired { forced };
    info!(payer = %pubkey, "fee payer retirement complete");
    Ok(RetirementOutcome::Transitioned(payer.rotation_state))
}

fn emergency_retire(state: &mut PoolState, pubkey: Pubkey) -> Result<RetirementOutcome, AdminError> {
    let reservation_ids: Vec<_> = {
        let payer = state.payers.get(&pubkey).ok_or(AdminError::UnknownPayer(pubkey))?;
        payer.reservations.iter().copied().collect()
    };
    for id in reservation_ids {
        state.remove_reservation(id);
    }
    let payer = state.payers.get_mut(&pubkey).expect("checked above");
    payer.rotation_state = RotationState::Retired { forced: true };
    info!(payer = %pubkey, cancelled = payer.reservations.len(), "fee payer emergency-retired, reservations cancelled");
    Ok(RetirementOutcome::Transitioned(payer.rotation_state))
}

fn reactivate(state: &mut PoolState, pubkey: Pubkey) -> Result<RetirementOutcome, AdminError> {
    let payer = state.payers.get_mut(&pubkey).ok_or(AdminError::UnknownPayer(pubkey))?;
    match payer.rotation_state {
        RotationState::Retired { forced: true } => Err(AdminError::ForcedRetirementIrreversible(pubkey)),
        RotationState::Retired { forced: false } => {
            payer.rotation_state = RotationState::Active;
            info!(payer = %pubkey, "fee payer reactivated");
            Ok(RetirementOutcome::Transitioned(payer.rotation_state))
        }
        _ => Err(AdminError::NotRetired(pubkey)),
    }
}
