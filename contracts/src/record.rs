//! # Attestation Record
//!
//! The single asset type on the reLedger network: an attested record of a
//! completed real-estate sale. A record is issued once, as the only output
//! of a zero-input transaction, and is never amended or consumed afterwards.
//!
//! Construction only enforces that every field was supplied. Whether the
//! values make sense (distinct broker, positive price, and so on) is the job
//! of [`crate::attestation::AttestationContract`], so that every participant
//! can re-check it independently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reledger_protocol::identity::Party;
use reledger_protocol::transaction::ContractState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Raised when a record is constructed with a field left out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("required field `{0}` was not supplied")]
    MissingField(&'static str),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structured postal address of the property. All components are free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAddress {
    /// Unit or apartment identifier.
    pub apt_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    /// State or region.
    pub state: String,
    pub zip_code: String,
    /// Municipal parcel identifier (borough/block/lot in NYC).
    pub parcel_id: String,
}

impl PropertyAddress {
    fn fields(&self) -> [&str; 7] {
        [
            self.apt_number.as_str(),
            self.address_line1.as_str(),
            self.address_line2.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip_code.as_str(),
            self.parcel_id.as_str(),
        ]
    }
}

/// An attested real-estate sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub address: PropertyAddress,
    /// Closing price in the smallest currency unit.
    pub price: i64,
    /// Closing date. Opaque to the ledger; only checked for presence.
    pub selling_date: String,
    /// The recording authority. Must sign every issuance.
    pub ledger_authority: Party,
    pub sell_attester: Party,
    pub buy_attester: Party,
    /// The initiating broker.
    pub broker: Party,
}

impl AttestationRecord {
    pub fn builder() -> AttestationRecordBuilder {
        AttestationRecordBuilder::default()
    }

    /// True when at least one of the seven address components is non-empty.
    ///
    /// This is an OR across the components: a record with only a zip code
    /// passes. Kept deliberately; see the contract tests.
    pub fn check_address_fields(&self) -> bool {
        self.address.fields().iter().any(|f| !f.is_empty())
    }
}

impl ContractState for AttestationRecord {
    fn participants(&self) -> Vec<Party> {
        vec![
            self.ledger_authority.clone(),
            self.sell_attester.clone(),
            self.buy_attester.clone(),
            self.broker.clone(),
        ]
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        for field in self.address.fields() {
            push_str(&mut buf, field);
        }
        buf.extend_from_slice(&self.price.to_le_bytes());
        push_str(&mut buf, &self.selling_date);
        for party in [
            &self.ledger_authority,
            &self.sell_attester,
            &self.buy_attester,
            &self.broker,
        ] {
            push_str(&mut buf, party.name());
            buf.extend_from_slice(party.owning_key().as_bytes());
        }
        buf
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`AttestationRecord`]. Every setter must be called;
/// [`build`](Self::build) names the first field that was not.
#[derive(Debug, Default, Clone)]
pub struct AttestationRecordBuilder {
    apt_number: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    parcel_id: Option<String>,
    price: Option<i64>,
    selling_date: Option<String>,
    ledger_authority: Option<Party>,
    sell_attester: Option<Party>,
    buy_attester: Option<Party>,
    broker: Option<Party>,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: impl Into<$ty>) -> Self {
            self.$name = Some(value.into());
            self
        }
    };
}

impl AttestationRecordBuilder {
    setter!(apt_number, String);
    setter!(address_line1, String);
    setter!(address_line2, String);
    setter!(city, String);
    setter!(state, String);
    setter!(zip_code, String);
    setter!(parcel_id, String);
    setter!(price, i64);
    setter!(selling_date, String);
    setter!(ledger_authority, Party);
    setter!(sell_attester, Party);
    setter!(buy_attester, Party);
    setter!(broker, Party);

    /// Set all seven address components at once.
    pub fn address(self, address: PropertyAddress) -> Self {
        self.apt_number(address.apt_number)
            .address_line1(address.address_line1)
            .address_line2(address.address_line2)
            .city(address.city)
            .state(address.state)
            .zip_code(address.zip_code)
            .parcel_id(address.parcel_id)
    }

    pub fn build(self) -> Result<AttestationRecord, SchemaError> {
        fn req<T>(v: Option<T>, name: &'static str) -> Result<T, SchemaError> {
            v.ok_or(SchemaError::MissingField(name))
        }

        Ok(AttestationRecord {
            address: PropertyAddress {
                apt_number: req(self.apt_number, "apt_number")?,
                address_line1: req(self.address_line1, "address_line1")?,
                address_line2: req(self.address_line2, "address_line2")?,
                city: req(self.city, "city")?,
                state: req(self.state, "state")?,
                zip_code: req(self.zip_code, "zip_code")?,
                parcel_id: req(self.parcel_id, "parcel_id")?,
            },
            price: req(self.price, "price")?,
            selling_date: req(self.selling_date, "selling_date")?,
            ledger_authority: req(self.ledger_authority, "ledger_authority")?,
            sell_attester: req(self.sell_attester, "sell_attester")?,
            buy_attester: req(self.buy_attester, "buy_attester")?,
            broker: req(self.broker, "broker")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reledger_protocol::crypto::LedgerKeypair;

    fn party(name: &str) -> Party {
        Party::new(name, LedgerKeypair::generate().public_key())
    }

    fn complete() -> AttestationRecordBuilder {
        AttestationRecord::builder()
            .apt_number("4B")
            .address_line1("350 Fifth Avenue")
            .address_line2("")
            .city("New York")
            .state("NY")
            .zip_code("10118")
            .parcel_id("1-00835-0041")
            .price(125_000_000i64)
            .selling_date("2026-03-14")
            .ledger_authority(party("reLedger"))
            .sell_attester(party("SellBank"))
            .buy_attester(party("BuyBank"))
            .broker(party("Broker"))
    }

    #[test]
    fn complete_builder_produces_record() {
        let record = complete().build().unwrap();
        assert_eq!(record.address.city, "New York");
        assert_eq!(record.price, 125_000_000);
    }

    #[test]
    fn missing_field_is_named() {
        let mut b = complete();
        b.selling_date = None;
        assert_eq!(
            b.build().unwrap_err(),
            SchemaError::MissingField("selling_date")
        );

        let mut b = complete();
        b.broker = None;
        assert_eq!(b.build().unwrap_err(), SchemaError::MissingField("broker"));
    }

    #[test]
    fn empty_strings_are_supplied_values() {
        let record = complete().selling_date("").build().unwrap();
        assert!(record.selling_date.is_empty());
    }

    #[test]
    fn participants_in_fixed_order() {
        let record = complete().build().unwrap();
        let names: Vec<_> = record
            .participants()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["reLedger", "SellBank", "BuyBank", "Broker"]);
    }

    #[test]
    fn any_single_address_component_satisfies_check() {
        let empty = PropertyAddress::default();
        let record = complete().address(empty.clone()).build().unwrap();
        assert!(!record.check_address_fields());

        let only_zip = PropertyAddress {
            zip_code: "10118".into(),
            ..empty
        };
        let record = complete().address(only_zip).build().unwrap();
        assert!(record.check_address_fields());
    }

    #[test]
    fn canonical_bytes_track_content() {
        let record = complete().build().unwrap();
        let mut other = record.clone();
        assert_eq!(record.canonical_bytes(), other.canonical_bytes());
        other.price += 1;
        assert_ne!(record.canonical_bytes(), other.canonical_bytes());
    }
}
