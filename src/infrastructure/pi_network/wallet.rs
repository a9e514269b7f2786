use std::fmt;

use anyhow::{Result, anyhow};
use ed25519_dalek::{Signer, SigningKey};
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

/// App wallet that signs app-to-user transfers.
pub struct PiWallet {
    signing_key: SigningKey,
}

impl PiWallet {
    /// Accepts a Stellar secret seed (`S...`).
    pub fn from_seed(seed: &str) -> Result<Self> {
        let secret = PrivateKey::from_string(seed.trim())
            .map_err(|err| anyhow!("wallet private seed is not a valid secret seed: {:?}", err))?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret.0),
        })
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> String {
        PublicKey(self.public_key()).to_string()
    }

    /// Last four bytes of the public key, used by the network to pick the signer.
    pub fn signature_hint(&self) -> [u8; 4] {
        let public_key = self.public_key();
        [public_key[28], public_key[29], public_key[30], public_key[31]]
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for PiWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

pub fn decode_address(address: &str) -> Result<[u8; 32]> {
    let public_key = PublicKey::from_string(address.trim())
        .map_err(|err| anyhow!("invalid account address {}: {:?}", address, err))?;
    Ok(public_key.0)
}
