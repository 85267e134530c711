//! Raw bytes

use sha2::{Digest, Sha256};

use refsnap::{Difference, Rendering, Snapshotting, StrategyError};

/// `Vec<u8>` stored verbatim in `.bin` references.
#[derive(Debug, Clone, Copy, Default)]
pub struct Data;

impl Snapshotting<Vec<u8>> for Data {
    type Format = Vec<u8>;

    fn path_extension(&self) -> Option<&str> {
        Some("bin")
    }

    fn render(&self, value: Vec<u8>) -> Rendering<Vec<u8>> {
        Rendering::ready(value)
    }

    fn to_bytes(&self, format: &Vec<u8>) -> Result<Vec<u8>, StrategyError> {
        Ok(format.clone())
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, StrategyError> {
        Ok(bytes.to_vec())
    }

    fn diff(&self, reference: &Vec<u8>, candidate: &Vec<u8>) -> Option<Difference> {
        if reference == candidate {
            return None;
        }
        let offset = reference
            .iter()
            .zip(candidate)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| reference.len().min(candidate.len()));

        Some(Difference::new(format!(
            "Expected data to match\n\
             reference: {} bytes, sha256 {}\n\
             candidate: {} bytes, sha256 {}\n\
             first difference at byte {}",
            reference.len(),
            sha256_hex(reference),
            candidate.len(),
            sha256_hex(candidate),
            offset
        )))
    }
}

/// SHA-256 digest of `data`, hex encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
