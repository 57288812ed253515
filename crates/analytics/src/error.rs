use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Ledger read failed: {0}")]
    Ledger(#[from] ledger::LedgerError),
}
