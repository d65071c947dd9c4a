use beacon_core::chain::Chain;
use beacon_core::error::BeaconError;
use beacon_core::types::{AbiValue, Address, ContractHandle, Receipt, Signer, TxHash};
use tracing::{info, warn};

use crate::overview::GrantRecord;

/// Where a release is withdrawn from.
#[derive(Clone, Debug)]
pub enum GrantSource {
    /// Grantee withdraws grant `id` from the grant contract directly.
    Direct { token_grant: ContractHandle, id: u128 },
    /// Grantee withdraws through the managed-grant contract that holds it.
    Managed { managed_grant: ContractHandle },
}

impl GrantSource {
    /// Route for `record`: its managed-grant contract if it has one.
    pub fn for_record(record: &GrantRecord, token_grant: &ContractHandle) -> Self {
        match record.managed_grant {
            Some(address) => GrantSource::Managed {
                managed_grant: ContractHandle::new("ManagedGrant", address),
            },
            None => GrantSource::Direct {
                token_grant: token_grant.clone(),
                id: record.id,
            },
        }
    }

    fn target(&self) -> (&ContractHandle, Vec<AbiValue>) {
        match self {
            GrantSource::Direct { token_grant, id } => (token_grant, vec![AbiValue::Uint(*id)]),
            GrantSource::Managed { managed_grant } => (managed_grant, vec![]),
        }
    }

    pub fn contract(&self) -> Address {
        self.target().0.address
    }
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub title: String,
    pub content: String,
}

impl Message {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            title: "Success".into(),
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            title: "Error".into(),
            content: content.into(),
        }
    }
}

/// Receives the transient outcome message of a user action.
pub trait Notifier {
    fn notify(&self, message: Message);
}

/// Writes messages to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: Message) {
        match message.kind {
            MessageKind::Success => info!(title = %message.title, "{}", message.content),
            MessageKind::Error => warn!(title = %message.title, "{}", message.content),
        }
    }
}

// ── Release ──────────────────────────────────────────────────────────────────

/// Withdraw the releasable tokens of a grant as `signer`.
///
/// `on_tx_hash` sees the transaction hash once it is known. The outcome is
/// reported to `notifier` either way; a failure is also returned.
pub async fn release_tokens<C, N, F>(
    chain: &C,
    signer: &Signer,
    source: &GrantSource,
    notifier: &N,
    on_tx_hash: F,
) -> Result<Receipt, BeaconError>
where
    C: Chain,
    N: Notifier + ?Sized,
    F: FnOnce(TxHash),
{
    let (contract, args) = source.target();
    match contract.send(chain, signer, "withdraw", args).await {
        Ok(receipt) => {
            on_tx_hash(receipt.tx_hash);
            info!(contract = %contract, grantee = %signer, tx = %receipt.tx_hash, "tokens released");
            notifier.notify(Message::success("Tokens have been successfully released"));
            Ok(receipt)
        }
        Err(e) => {
            notifier.notify(Message::error(e.to_string()));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(managed: Option<Address>) -> GrantRecord {
        GrantRecord {
            id: 9,
            grantee: Address::from_bytes([1; 20]),
            start: 0,
            cliff: 0,
            duration: 1,
            amount: 1,
            unlocked: 1,
            released: 0,
            ready_to_release: 1,
            managed_grant: managed,
        }
    }

    #[test]
    fn direct_grant_withdraws_by_id() {
        let token_grant = ContractHandle::new("TokenGrant", Address::from_bytes([2; 20]));
        let source = GrantSource::for_record(&record(None), &token_grant);
        let (contract, args) = source.target();
        assert_eq!(contract.address, token_grant.address);
        assert_eq!(args, vec![AbiValue::Uint(9)]);
    }

    #[test]
    fn managed_grant_withdraws_without_id() {
        let managed = Address::from_bytes([3; 20]);
        let token_grant = ContractHandle::new("TokenGrant", Address::from_bytes([2; 20]));
        let source = GrantSource::for_record(&record(Some(managed)), &token_grant);
        assert_eq!(source.contract(), managed);
        assert!(source.target().1.is_empty());
    }
}
