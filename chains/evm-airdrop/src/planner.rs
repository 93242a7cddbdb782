//! Turns the raw address column into ordered, de-duplicated batches of
//! recipients that have not been paid yet.

use core_logic::ProgressStore;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub total: usize,
    pub empty: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub already_paid: usize,
    pub eligible: usize,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub remaining: Vec<Address>,
    pub stats: PlanStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position within this run.
    pub index: usize,
    pub addresses: Vec<Address>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Canonical spellings, as stored in the progress file.
    pub fn canonical(&self) -> Vec<String> {
        self.addresses.iter().map(canonical).collect()
    }
}

/// EIP-55 checksummed form.
pub fn canonical(address: &Address) -> String {
    to_checksum(address, None)
}

/// Parse an address string, enforcing the checksum when it is mixed-case.
pub fn parse_address(raw: &str) -> Option<Address> {
    let raw = raw.trim();
    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let address = Address::from_str(hex).ok()?;

    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && canonical(&address)[2..] != *hex {
        return None;
    }

    Some(address)
}

/// Non-empty, well-formed, checksum-valid and not the zero address.
pub fn is_valid_address(raw: &str) -> bool {
    matches!(parse_address(raw), Some(a) if !a.is_zero())
}

/// Filter the raw list down to addresses still owed a transfer.
pub fn plan(raw: &[String], progress: &ProgressStore) -> Plan {
    let mut stats = PlanStats {
        total: raw.len(),
        ..Default::default()
    };
    let mut seen_raw: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<Address> = HashSet::new();
    let mut remaining = Vec::new();

    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            stats.empty += 1;
            continue;
        }
        if !seen_raw.insert(entry) {
            stats.duplicates += 1;
            continue;
        }

        let address = match parse_address(entry) {
            Some(a) if !a.is_zero() => a,
            _ => {
                debug!("Skipping invalid address: {}", entry);
                stats.invalid += 1;
                continue;
            }
        };

        if !seen.insert(address) {
            stats.duplicates += 1;
            continue;
        }
        if progress.contains(&canonical(&address)) {
            stats.already_paid += 1;
            continue;
        }

        remaining.push(address);
    }

    stats.eligible = remaining.len();
    info!(
        "Address list: {} total, {} empty, {} duplicate, {} invalid, {} already paid, {} remaining",
        stats.total, stats.empty, stats.duplicates, stats.invalid, stats.already_paid, stats.eligible
    );

    Plan { remaining, stats }
}

/// Split into consecutive batches of at most `batch_size`, preserving order.
pub fn partition(addresses: &[Address], batch_size: usize) -> Vec<Batch> {
    if batch_size == 0 {
        return Vec::new();
    }

    addresses
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            addresses: chunk.to_vec(),
        })
        .collect()
}
