use anyhow::{Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use super::wallet::PiWallet;

const ENVELOPE_TYPE_TX: i32 = 2;
const KEY_TYPE_ED25519: i32 = 0;
const PRECOND_TIME: i32 = 1;
const MEMO_TEXT: i32 = 1;
const OPERATION_TYPE_PAYMENT: i32 = 1;
const ASSET_TYPE_NATIVE: i32 = 0;

const MAX_MEMO_TEXT_BYTES: usize = 28;
const STROOPS_PER_PI: f64 = 10_000_000.0;

/// Single native-asset payment from the app wallet to a user, memo'd with
/// the payment identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct A2uTransaction {
    source: [u8; 32],
    destination: [u8; 32],
    fee: u32,
    sequence: i64,
    max_time: u64,
    memo: String,
    amount_stroops: i64,
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub envelope: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn envelope_base64(&self) -> String {
        STANDARD.encode(&self.envelope)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl A2uTransaction {
    pub fn new(
        source: [u8; 32],
        destination: [u8; 32],
        fee: u32,
        sequence: i64,
        max_time: u64,
        memo: &str,
        amount_stroops: i64,
    ) -> Result<Self> {
        if memo.len() > MAX_MEMO_TEXT_BYTES {
            bail!(
                "memo {:?} exceeds {} bytes allowed in a text memo",
                memo,
                MAX_MEMO_TEXT_BYTES
            );
        }
        if amount_stroops <= 0 {
            bail!("transaction amount must be positive, got {} stroops", amount_stroops);
        }

        Ok(Self {
            source,
            destination,
            fee,
            sequence,
            max_time,
            memo: memo.to_string(),
            amount_stroops,
        })
    }

    pub fn to_xdr(&self) -> Vec<u8> {
        let mut xdr = XdrWriter::default();

        xdr.write_i32(KEY_TYPE_ED25519);
        xdr.write_fixed(&self.source);
        xdr.write_u32(self.fee);
        xdr.write_i64(self.sequence);

        xdr.write_i32(PRECOND_TIME);
        xdr.write_u64(0);
        xdr.write_u64(self.max_time);

        xdr.write_i32(MEMO_TEXT);
        xdr.write_var(self.memo.as_bytes());

        xdr.write_u32(1);
        // operation source account: absent
        xdr.write_u32(0);
        xdr.write_i32(OPERATION_TYPE_PAYMENT);
        xdr.write_i32(KEY_TYPE_ED25519);
        xdr.write_fixed(&self.destination);
        xdr.write_i32(ASSET_TYPE_NATIVE);
        xdr.write_i64(self.amount_stroops);

        // ext
        xdr.write_i32(0);

        xdr.into_bytes()
    }

    /// Transaction hash for `network_passphrase`; this is also the txid.
    pub fn hash(&self, network_passphrase: &str) -> [u8; 32] {
        let network_id: [u8; 32] = Sha256::digest(network_passphrase.as_bytes()).into();

        let mut payload = XdrWriter::default();
        payload.write_fixed(&network_id);
        payload.write_i32(ENVELOPE_TYPE_TX);
        payload.write_fixed(&self.to_xdr());

        Sha256::digest(payload.into_bytes()).into()
    }

    pub fn sign(&self, wallet: &PiWallet, network_passphrase: &str) -> SignedTransaction {
        let hash = self.hash(network_passphrase);
        let signature = wallet.sign(&hash);

        let mut envelope = XdrWriter::default();
        envelope.write_i32(ENVELOPE_TYPE_TX);
        envelope.write_fixed(&self.to_xdr());
        envelope.write_u32(1);
        envelope.write_fixed(&wallet.signature_hint());
        envelope.write_var(&signature);

        SignedTransaction {
            envelope: envelope.into_bytes(),
            hash,
        }
    }
}

/// Converts a Pi amount into stroops, the 7-decimal integer unit used on-chain.
pub fn amount_to_stroops(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("payment amount must be a positive number, got {}", amount);
    }

    let stroops = (amount * STROOPS_PER_PI).round();
    if stroops > i64::MAX as f64 {
        bail!("payment amount {} is too large", amount);
    }

    Ok(stroops as i64)
}

#[derive(Default)]
struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Fixed-length opaque; callers only pass lengths that are multiples of 4.
    fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Variable-length opaque or string: length prefix, bytes, zero padding to 4.
    fn write_var(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        let padding = (4 - bytes.len() % 4) % 4;
        self.buf.extend(std::iter::repeat_n(0u8, padding));
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
