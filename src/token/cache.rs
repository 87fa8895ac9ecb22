use chrono::{DateTime, Utc};
use jsonwebtoken::Algorithm;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

use super::signer::{ProviderClaims, SigningKey, TokenSigner};
use crate::error::ApnsError;

/// How long a provider token is reused. APNs rejects tokens older than an hour
/// and throttles tokens refreshed more often than every twenty minutes.
pub const RESET_INTERVAL: Duration = Duration::from_secs(55 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningToken {
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl SigningToken {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.timestamp).to_std() {
            Ok(age) => age < RESET_INTERVAL,
            // minted "in the future" after a clock step back
            Err(_) => true,
        }
    }
}

/// Holds the single provider token of a client.
///
/// The lock is only held to read or replace the token, never while signing.
/// Two sends that both find the token stale will both sign and the last write
/// wins. APNs accepts any unexpired token, so the cost is a redundant signature.
pub struct TokenCache<S: TokenSigner> {
    signer: S,
    key: SigningKey,
    team: String,
    key_id: String,
    current: RwLock<Option<SigningToken>>,
}

impl<S: TokenSigner> TokenCache<S> {
    pub fn new(
        signer: S,
        key: SigningKey,
        team: impl Into<String>,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            key,
            team: team.into(),
            key_id: key_id.into(),
            current: RwLock::new(None),
        }
    }

    pub fn get_token(&self) -> Result<String, ApnsError> {
        self.get_token_at(Utc::now())
    }

    pub fn get_token_at(&self, now: DateTime<Utc>) -> Result<String, ApnsError> {
        {
            let current = self.current.read();
            if let Some(token) = current.as_ref().filter(|token| token.is_fresh_at(now)) {
                return Ok(token.value.clone());
            }
        }

        let claims = ProviderClaims {
            iss: self.team.clone(),
            iat: now.timestamp(),
        };
        debug!(team = %self.team, key_id = %self.key_id, "Generating provider token");
        let value = self
            .signer
            .sign(&claims, &self.key, Algorithm::ES256, &self.key_id)?;

        *self.current.write() = Some(SigningToken {
            value: value.clone(),
            timestamp: now,
        });
        Ok(value)
    }

    /// Drops the cached token so the next call signs a new one.
    pub fn invalidate(&self) {
        debug!("Invalidating provider token");
        *self.current.write() = None;
    }

    pub fn current(&self) -> Option<SigningToken> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::signer::{Es256Signer, MockTokenSigner, tests::TEST_PRIVATE_KEY};
    use chrono::TimeDelta;
    use std::{
        sync::{
            Barrier,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    /// Blocks every signature until `parties` callers are signing at once.
    struct RendezvousSigner {
        barrier: Barrier,
        calls: AtomicUsize,
    }

    impl TokenSigner for RendezvousSigner {
        fn sign(
            &self,
            _claims: &ProviderClaims,
            _key: &SigningKey,
            _algorithm: Algorithm,
            _key_id: &str,
        ) -> Result<String, ApnsError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.barrier.wait();
            Ok(format!("token-{call}"))
        }
    }

    fn cache_with(signer: MockTokenSigner) -> TokenCache<MockTokenSigner> {
        TokenCache::new(signer, SigningKey::from_pem("pem"), "TEAM", "KEYID")
    }

    #[test]
    fn test_token_reused_before_reset_interval() {
        let mut signer = MockTokenSigner::new();
        signer
            .expect_sign()
            .once()
            .returning(|_, _, _, _| Ok("token-1".to_string()));

        let cache = cache_with(signer);
        let minted = Utc::now();

        assert_eq!(cache.get_token_at(minted).unwrap(), "token-1");
        let later = minted + TimeDelta::minutes(54) + TimeDelta::seconds(59);
        assert_eq!(cache.get_token_at(later).unwrap(), "token-1");
    }

    #[test]
    fn test_token_regenerated_at_reset_interval() {
        let mut signer = MockTokenSigner::new();
        let mut calls = 0;
        signer.expect_sign().times(2).returning(move |_, _, _, _| {
            calls += 1;
            Ok(format!("token-{calls}"))
        });

        let cache = cache_with(signer);
        let minted = Utc::now();

        assert_eq!(cache.get_token_at(minted).unwrap(), "token-1");
        let stale = minted + TimeDelta::minutes(55);
        assert_eq!(cache.get_token_at(stale).unwrap(), "token-2");
        assert_eq!(cache.current().unwrap().timestamp, stale);
    }

    #[test]
    fn test_invalidate_forces_new_signature() {
        let mut signer = MockTokenSigner::new();
        let mut calls = 0;
        signer.expect_sign().times(2).returning(move |_, _, _, _| {
            calls += 1;
            Ok(format!("token-{calls}"))
        });

        let cache = cache_with(signer);
        let now = Utc::now();

        assert_eq!(cache.get_token_at(now).unwrap(), "token-1");
        cache.invalidate();
        assert!(cache.current().is_none());
        assert_eq!(cache.get_token_at(now).unwrap(), "token-2");
    }

    #[test]
    fn test_claims_use_team_and_whole_seconds() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_999).unwrap();

        let mut signer = MockTokenSigner::new();
        signer
            .expect_sign()
            .once()
            .withf(|claims, _, algorithm, key_id| {
                claims.iss == "TEAM"
                    && claims.iat == 1_700_000_000
                    && *algorithm == Algorithm::ES256
                    && key_id == "KEYID"
            })
            .returning(|_, _, _, _| Ok("token".to_string()));

        let cache = cache_with(signer);
        assert_eq!(cache.get_token_at(now).unwrap(), "token");
    }

    #[test]
    fn test_signing_failure_propagates_and_caches_nothing() {
        let mut signer = MockTokenSigner::new();
        signer
            .expect_sign()
            .once()
            .returning(|_, _, _, _| Err(ApnsError::Configuration("bad key".to_string())));

        let cache = cache_with(signer);

        assert!(matches!(cache.get_token(), Err(ApnsError::Configuration(_))));
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_real_signer_produces_cacheable_token() {
        let cache = TokenCache::new(
            Es256Signer,
            SigningKey::from_pem(TEST_PRIVATE_KEY),
            "TEAM",
            "KEYID",
        );

        let first = cache.get_token().unwrap();
        let second = cache.get_token().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.split('.').count(), 3);
    }

    #[test]
    fn test_concurrent_refresh_signs_twice_and_keeps_last_write() {
        let cache = TokenCache::new(
            RendezvousSigner {
                barrier: Barrier::new(2),
                calls: AtomicUsize::new(0),
            },
            SigningKey::from_pem("pem"),
            "TEAM",
            "KEYID",
        );
        let now = Utc::now();

        // Neither caller can finish signing until both are past the read lock.
        let tokens: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| cache.get_token_at(now).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(cache.signer.calls.load(Ordering::SeqCst), 2);
        assert_ne!(tokens[0], tokens[1]);
        let kept = cache.current().unwrap();
        assert!(tokens.contains(&kept.value));
        assert_eq!(kept.timestamp, now);
        assert_eq!(cache.get_token_at(now).unwrap(), kept.value);
    }
}
