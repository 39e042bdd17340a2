//! Balance recomputation command
//!
//! The cached balance on a user is derived state; when it drifts from
//! the ledger this resets it to the ledger-derived truth.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

/// Arguments for recomputing a balance
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Creator user id
    #[arg(long)]
    pub creator_id: i64,

    /// Write the recomputed balance back instead of just reporting it
    #[arg(long)]
    pub fix: bool,
}

/// Recompute (and optionally repair) one creator's cached balance
pub async fn run(config_path: &Path, args: BalanceArgs) -> Result<()> {
    let (_config, store) = super::open(config_path).await?;

    let user = store.users().get_required(args.creator_id).await?;
    let derived = store.transactions().recompute_balance(args.creator_id).await?;

    if derived == user.current_balance_cents {
        info!(creator_id = args.creator_id, balance_cents = derived, "Balance matches ledger");
    } else {
        warn!(
            creator_id = args.creator_id,
            cached_cents = user.current_balance_cents,
            derived_cents = derived,
            "Cached balance drifted from ledger"
        );
        if args.fix {
            store.users().set_balance(args.creator_id, derived).await?;
            info!(creator_id = args.creator_id, balance_cents = derived, "Balance repaired");
        }
    }

    println!(
        "{}",
        serde_json::json!({
            "creator_id": args.creator_id,
            "cached_cents": user.current_balance_cents,
            "derived_cents": derived,
            "fixed": args.fix && derived != user.current_balance_cents,
        })
    );
    Ok(())
}
