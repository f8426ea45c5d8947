pub mod card;
pub mod credit;
pub mod onchain;
pub mod wallet;

pub use card::CardAdapter;
pub use credit::{CreditAdapter, CreditNote, CreditStatus};
pub use onchain::OnchainAdapter;
pub use wallet::WalletAdapter;
