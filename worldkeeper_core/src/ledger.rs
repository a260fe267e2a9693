//! Player balances with an append-only transaction history.
//!
//! Every balance change writes exactly one [`LedgerEntry`] in the same
//! transaction as the account update, so a player's balance always equals
//! the sum of their entries. Nothing here can drive a balance negative:
//! debits only ever move what is there.
//!
//! Money enters through [`credit`] and the opening grant of
//! [`settle_join`]. Transfers and join fees move it between accounts, the
//! latter into the world's [`TREASURY`].

use crate::error::{WorldError, WorldResult};
use crate::model::PlayerId;
use crate::store::{keys, StoreTx};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use worldkeeper_env::WorldId;

/// Account holding the join fees of a world. Player ids start at 1.
pub const TREASURY: PlayerId = PlayerId(0);

/// Why a balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    #[default]
    Credit,
    /// Opening balance of a joining human
    Grant,
    Transfer,
    JoinFee,
}

/// A player's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub world_id: WorldId,
    pub player_id: PlayerId,
    pub balance: f64,
}

/// One immutable balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub player_id: PlayerId,
    /// Signed amount
    pub amount: f64,
    /// Epoch ms
    pub timestamp: u64,
    /// Store-wide sequence, orders entries sharing a timestamp
    pub seq: u64,
    #[serde(default)]
    pub kind: EntryKind,
}

fn account(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId) -> WorldResult<Option<Account>> {
    tx.get(&keys::account(world_id, player_id))
}

fn record(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId, amount: f64, kind: EntryKind) -> WorldResult<()> {
    let seq = tx.generate_id()?;
    let entry = LedgerEntry {
        player_id,
        amount,
        timestamp: tx.now(),
        seq,
        kind,
    };
    tx.put(&keys::ledger_entry(world_id, player_id, entry.timestamp, seq), &entry)
}

/// Creates a zero-balance account if the player has none.
///
/// Returns whether an account was created.
pub fn ensure_account(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId) -> WorldResult<bool> {
    if account(tx, world_id, player_id)?.is_some() {
        return Ok(false);
    }
    tx.put(
        &keys::account(world_id, player_id),
        &Account {
            world_id,
            player_id,
            balance: 0.0,
        },
    )?;
    debug!("Opened account for {} in world {}", player_id, world_id);
    Ok(true)
}

/// Current balance; a player without an account holds nothing.
pub fn balance(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId) -> WorldResult<f64> {
    Ok(account(tx, world_id, player_id)?.map_or(0.0, |a| a.balance))
}

fn add(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId, amount: f64, kind: EntryKind) -> WorldResult<f64> {
    ensure_account(tx, world_id, player_id)?;
    let mut acct = account(tx, world_id, player_id)?
        .ok_or_else(|| WorldError::not_found("account", player_id))?;
    acct.balance += amount;
    tx.put(&keys::account(world_id, player_id), &acct)?;
    record(tx, world_id, player_id, amount, kind)?;
    Ok(acct.balance)
}

/// Adds a positive amount to a player's balance, opening the account if
/// needed. Returns the new balance.
pub fn credit(tx: &StoreTx<'_>, world_id: WorldId, player_id: PlayerId, amount: f64) -> WorldResult<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(WorldError::invalid_input(format!(
            "credit amount must be positive, got {}",
            amount
        )));
    }
    add(tx, world_id, player_id, amount, EntryKind::Credit)
}

/// Result of [`settle_join`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSettlement {
    pub granted: f64,
    /// Paid into the treasury; never more than the player held
    pub fee: f64,
}

/// Opens a joining player's account, grants the opening balance and pays
/// the join fee into the world treasury.
///
/// A player is settled at most once: the settlement is recorded alongside
/// the entries, and later calls return `None` without writing anything.
/// Rejoining produces a new player id, so every join pays exactly once.
pub fn settle_join(
    tx: &StoreTx<'_>,
    world_id: WorldId,
    player_id: PlayerId,
    starting_balance: f64,
    join_fee: f64,
) -> WorldResult<Option<JoinSettlement>> {
    for (what, amount) in [("starting balance", starting_balance), ("join fee", join_fee)] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(WorldError::invalid_input(format!("{} must be non-negative, got {}", what, amount)));
        }
    }
    if player_id == TREASURY {
        return Err(WorldError::invalid_input("the treasury cannot join"));
    }
    let marker = keys::join_settlement(world_id, player_id);
    if tx.get::<JoinSettlement>(&marker)?.is_some() {
        debug!("Join of {} in world {} already settled", player_id, world_id);
        return Ok(None);
    }

    ensure_account(tx, world_id, player_id)?;
    if starting_balance > 0.0 {
        add(tx, world_id, player_id, starting_balance, EntryKind::Grant)?;
    }
    let fee = join_fee.min(balance(tx, world_id, player_id)?);
    if fee > 0.0 {
        add(tx, world_id, player_id, -fee, EntryKind::JoinFee)?;
        add(tx, world_id, TREASURY, fee, EntryKind::JoinFee)?;
    }

    let settlement = JoinSettlement {
        granted: starting_balance,
        fee,
    };
    tx.put(&marker, &settlement)?;
    info!("💰 {} joined world {} with {}, paid fee {}", player_id, world_id, starting_balance, fee);
    Ok(Some(settlement))
}

/// Moves the whole of `from`'s balance to `to`.
///
/// Both account updates and both ledger entries commit together. A source
/// with nothing to give (no account, or zero balance) makes this a no-op
/// that writes nothing, so running it twice moves money once. Returns the
/// amount moved.
pub fn transfer_all(tx: &StoreTx<'_>, world_id: WorldId, from: PlayerId, to: PlayerId) -> WorldResult<f64> {
    if from == to {
        return Ok(0.0);
    }
    let mut source = match account(tx, world_id, from)? {
        Some(acct) if acct.balance > 0.0 => acct,
        _ => {
            debug!("Nothing to transfer from {} to {}", from, to);
            return Ok(0.0);
        }
    };
    ensure_account(tx, world_id, to)?;
    let mut dest = account(tx, world_id, to)?
        .ok_or_else(|| WorldError::not_found("account", to))?;

    let amount = source.balance;
    source.balance = 0.0;
    dest.balance += amount;
    tx.put(&keys::account(world_id, from), &source)?;
    tx.put(&keys::account(world_id, to), &dest)?;
    record(tx, world_id, from, -amount, EntryKind::Transfer)?;
    record(tx, world_id, to, amount, EntryKind::Transfer)?;

    info!("💰 Transferred {} from {} to {} in world {}", amount, from, to, world_id);
    Ok(amount)
}

/// Opens a zero-balance account for every player of the world lacking one.
///
/// Returns how many accounts were created; re-running it creates none.
pub fn backfill_missing_accounts(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<usize> {
    let world = tx.require_world(world_id)?;
    let mut created = 0;
    for player in &world.players {
        if ensure_account(tx, world_id, player.id)? {
            created += 1;
        }
    }
    if created > 0 {
        info!("Backfilled {} account(s) in world {}", created, world_id);
    }
    Ok(created)
}
