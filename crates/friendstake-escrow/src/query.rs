//! # Record Queries
//!
//! Filters over serialized bet records, matching raw bytes at fixed
//! offsets of the record layout. Records that fail to decode are skipped
//! and logged rather than failing the whole query.

use tracing::warn;

use friendstake_core::{Address, Identity};

use crate::error::EscrowError;
use crate::ledger::Ledger;
use crate::record::{BetRecord, JUDGE_OFFSET, MAKER_OFFSET, OPPONENT_OFFSET};

/// A predicate over a record's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// The bytes at `offset` equal `bytes`.
    Memcmp {
        /// Byte offset into the serialized record.
        offset: usize,
        /// Bytes that must appear there.
        bytes: Vec<u8>,
    },
}

impl RecordFilter {
    /// Records whose maker is `id`.
    pub fn maker(id: &Identity) -> Self {
        Self::identity_at(MAKER_OFFSET, id)
    }

    /// Records whose opponent is `id`.
    pub fn opponent(id: &Identity) -> Self {
        Self::identity_at(OPPONENT_OFFSET, id)
    }

    /// Records whose judge is `id`.
    pub fn judge(id: &Identity) -> Self {
        Self::identity_at(JUDGE_OFFSET, id)
    }

    fn identity_at(offset: usize, id: &Identity) -> Self {
        Self::Memcmp {
            offset,
            bytes: id.as_bytes().to_vec(),
        }
    }

    /// Whether `data` satisfies the filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => offset
                .checked_add(bytes.len())
                .and_then(|end| data.get(*offset..end))
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

/// Decode every record in `raw` that satisfies all `filters`.
pub fn scan(raw: &[(Address, Vec<u8>)], filters: &[RecordFilter]) -> Vec<(Address, BetRecord)> {
    raw.iter()
        .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
        .filter_map(|(address, data)| match BetRecord::decode(data) {
            Ok(record) => Some((*address, record)),
            Err(e) => {
                warn!(address = %address, error = %e, "skipping undecodable record");
                None
            }
        })
        .collect()
}

impl Ledger {
    /// Live records satisfying every filter, ordered by address.
    pub fn list(&self, filters: &[RecordFilter]) -> Vec<(Address, BetRecord)> {
        scan(&self.raw_records(), filters)
    }

    /// Every live record.
    pub fn list_all(&self) -> Vec<(Address, BetRecord)> {
        self.list(&[])
    }

    /// The live record at `bet`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Layout`] if it cannot be decoded.
    pub fn fetch(&self, bet: &Address) -> Result<Option<BetRecord>, EscrowError> {
        self.record(bet)
    }

    /// Records made by `id`.
    pub fn by_maker(&self, id: &Identity) -> Vec<(Address, BetRecord)> {
        self.list(&[RecordFilter::maker(id)])
    }

    /// Records offered to `id`.
    pub fn by_opponent(&self, id: &Identity) -> Vec<(Address, BetRecord)> {
        self.list(&[RecordFilter::opponent(id)])
    }

    /// Records judged by `id`.
    pub fn by_judge(&self, id: &Identity) -> Vec<(Address, BetRecord)> {
        self.list(&[RecordFilter::judge(id)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(maker: u8, opponent: u8, judge: u8) -> BetRecord {
        BetRecord::open(
            Identity::from_bytes([maker; 32]),
            Identity::from_bytes([opponent; 32]),
            Identity::from_bytes([judge; 32]),
            5,
            "q".into(),
            255,
            255,
        )
    }

    fn raw() -> Vec<(Address, Vec<u8>)> {
        vec![
            (Address::from_bytes([0xa0; 32]), record(1, 2, 3).encode()),
            (Address::from_bytes([0xa1; 32]), record(2, 1, 3).encode()),
            (Address::from_bytes([0xa2; 32]), record(1, 3, 2).encode()),
        ]
    }

    #[test]
    fn filters_by_role_offset() {
        let one = Identity::from_bytes([1; 32]);
        assert_eq!(scan(&raw(), &[RecordFilter::maker(&one)]).len(), 2);
        assert_eq!(scan(&raw(), &[RecordFilter::opponent(&one)]).len(), 1);
        assert_eq!(scan(&raw(), &[RecordFilter::judge(&one)]).len(), 0);
    }

    #[test]
    fn filters_combine_as_and() {
        let one = Identity::from_bytes([1; 32]);
        let three = Identity::from_bytes([3; 32]);
        let hits = scan(
            &raw(),
            &[RecordFilter::maker(&one), RecordFilter::judge(&three)],
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, Address::from_bytes([0xa0; 32]));
    }

    #[test]
    fn out_of_range_memcmp_never_matches() {
        let filter = RecordFilter::Memcmp {
            offset: usize::MAX,
            bytes: vec![0],
        };
        assert!(!filter.matches(&[0; 8]));
        let filter = RecordFilter::Memcmp {
            offset: 4,
            bytes: vec![0; 8],
        };
        assert!(!filter.matches(&[0; 8]));
    }

    #[test]
    fn undecodable_records_skipped() {
        let mut entries = raw();
        entries.push((Address::from_bytes([0xff; 32]), vec![1, 2, 3]));
        assert_eq!(scan(&entries, &[]).len(), 3);
    }
}
