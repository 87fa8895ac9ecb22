pub mod cache;
pub mod signer;

pub use cache::{RESET_INTERVAL, SigningToken, TokenCache};
pub use signer::{Es256Signer, ProviderClaims, SigningKey, TokenSigner};
