use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use payment_hub_core::application::ledger::LedgerService;
use payment_hub_core::application::payments::PaymentService;
use payment_hub_core::application::settlement::{BatchOutcome, SettlementService};
use payment_hub_core::domain::ledger::EntryType;
use payment_hub_core::domain::payment::{AccountId, CreatePayment, StatusChange};
use payment_hub_core::domain::ports::StatusChangedHook;
use payment_hub_core::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryPaymentStore};
use payment_hub_core::interfaces::response::ApiResponse;

/// Demo harness: seeds accounts with an opening deposit, creates bill
/// payments against them and runs one settlement batch.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of accounts to seed
    #[arg(long, default_value_t = 2)]
    accounts: u64,

    /// Bill payments created per account
    #[arg(long, default_value_t = 3)]
    payments: u32,

    /// Opening deposit credited to each account
    #[arg(long, default_value = "1000.00")]
    opening_deposit: Decimal,

    /// Emit the report as a JSON envelope instead of plain text
    #[arg(long)]
    json: bool,
}

/// Stand-in for the fraud-detection/notification sink: logs every change.
struct LoggingHook;

#[async_trait]
impl StatusChangedHook for LoggingHook {
    async fn status_changed(&self, change: StatusChange) {
        info!(
            payment_id = change.payment_id,
            old = %change.old_status,
            new = %change.new_status,
            "status change published"
        );
    }
}

#[derive(Serialize)]
struct AccountReport {
    account_id: AccountId,
    balance: Decimal,
    total_credits: Decimal,
    total_debits: Decimal,
    entries: u64,
}

#[derive(Serialize)]
struct BatchReport {
    settled: u32,
    failed: u32,
    accounts: Vec<AccountReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let payments = Arc::new(PaymentService::with_hook(
        Box::new(InMemoryPaymentStore::new()),
        Box::new(LoggingHook),
    ));
    let ledger = Arc::new(LedgerService::new(Box::new(InMemoryLedgerStore::new())));
    let settlement = SettlementService::new(payments.clone(), ledger.clone());

    for account_id in 1..=cli.accounts {
        // Fund the account: a settled deposit payment backed by a CREDIT entry.
        let deposit = payments
            .create(CreatePayment {
                user_id: Some(account_id),
                bill_id: Some(0),
                account_id: Some(account_id),
                amount: Some(cli.opening_deposit),
                currency: None,
                payment_method: Some("BANK_TRANSFER".to_string()),
            })
            .await
            .into_diagnostic()?;
        ledger
            .record_transaction(
                &deposit,
                account_id,
                EntryType::Credit,
                cli.opening_deposit,
                cli.opening_deposit,
                "Opening deposit",
            )
            .await
            .into_diagnostic()?;
        payments
            .update_status(deposit.id, "settled")
            .await
            .into_diagnostic()?;

        for n in 1..=cli.payments {
            payments
                .create(CreatePayment {
                    user_id: Some(account_id),
                    bill_id: Some(u64::from(n)),
                    account_id: Some(account_id),
                    amount: Some(Decimal::from(25 * n)),
                    currency: None,
                    payment_method: Some("CREDIT_CARD".to_string()),
                })
                .await
                .into_diagnostic()?;
        }
    }

    let BatchOutcome { settled, failed } = settlement.run_batch().await.into_diagnostic()?;

    let mut accounts = Vec::new();
    for account_id in 1..=cli.accounts {
        let balance = ledger.audit_account(account_id).await.into_diagnostic()?;
        accounts.push(AccountReport {
            account_id,
            balance: balance.value(),
            total_credits: ledger.total_credits(account_id).await.into_diagnostic()?,
            total_debits: ledger.total_debits(account_id).await.into_diagnostic()?,
            entries: ledger.entry_count(account_id).await.into_diagnostic()?,
        });
    }

    if cli.json {
        let report = BatchReport {
            settled,
            failed,
            accounts,
        };
        let body = ApiResponse::success("settlement batch complete", report);
        println!(
            "{}",
            serde_json::to_string_pretty(&body).into_diagnostic()?
        );
    } else {
        println!("batch complete: settled={settled} failed={failed}");
        for report in &accounts {
            println!(
                "account {}: balance={} credits={} debits={} entries={}",
                report.account_id,
                report.balance,
                report.total_credits,
                report.total_debits,
                report.entries
            );
        }
    }

    Ok(())
}
