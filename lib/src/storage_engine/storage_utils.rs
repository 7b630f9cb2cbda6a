// lib/src/storage_engine/storage_utils.rs

use std::cmp::Ordering;

use bincode::config::{self, BigEndian, Configuration, Fixint};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::Serialize;

use models::medical::Patient;

use crate::errors::Result;
use crate::storage_engine::storage_engine::{PatientPage, PatientQuery};

/// Provides a standard bincode configuration for stored records.
pub fn bincode_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

pub fn serialize_record<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(encode_to_vec(value, bincode_config())?)
}

pub fn deserialize_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = decode_from_slice(bytes, bincode_config())?;
    Ok(value)
}

/// Listing order: newest first, ties broken by the later patient code.
pub fn newest_first(a: &Patient, b: &Patient) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.patient_code.cmp(&a.patient_code))
}

/// Applies the search filter and cuts out the requested page. `patients`
/// must already be in listing order.
pub fn paginate(patients: Vec<Patient>, query: &PatientQuery) -> PatientPage {
    let matching: Vec<Patient> = match &query.search {
        Some(needle) => patients
            .into_iter()
            .filter(|p| p.matches_search(needle))
            .collect(),
        None => patients,
    };

    let total = matching.len();
    let per_page = query.per_page.max(1);
    let page = query.page.max(1);
    let total_pages = total.div_ceil(per_page);
    let patients = matching
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    PatientPage {
        patients,
        total: total as u64,
        page,
        per_page,
        total_pages,
    }
}
