use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

use crate::database::{BookingStore, StoreError};

/// A rendered selection prompt plus the literal inputs it accepts.
/// Option sets are fetched fresh for every transition; a stale set from a
/// previous turn is never reused.
pub struct Rendered {
    pub prompt: String,
    pub options: Vec<String>,
}

pub async fn specialties(store: &Arc<dyn BookingStore>) -> Result<Option<Rendered>, StoreError> {
    let specialties = store.list_specialties().await?;
    if specialties.is_empty() {
        return Ok(None);
    }
    let mut prompt = String::from("Please choose a speciality by typing its ID:\n");
    let mut options = Vec::with_capacity(specialties.len());
    for sp in specialties {
        prompt.push_str(&format!("{}. {}\n", sp.id, sp.name));
        options.push(sp.id.to_string());
    }
    Ok(Some(Rendered { prompt, options }))
}

pub async fn doctors(
    store: &Arc<dyn BookingStore>,
    specialty_id: i32,
) -> Result<Option<Rendered>, StoreError> {
    let doctors = store.list_doctors(specialty_id).await?;
    if doctors.is_empty() {
        return Ok(None);
    }
    let mut prompt = String::from("Please choose a doctor by typing their ID:\n");
    let mut options = Vec::with_capacity(doctors.len());
    for doc in doctors {
        prompt.push_str(&format!("{}. {} (fee ₹{:.0})\n", doc.id, doc.name, doc.fee));
        options.push(doc.id.to_string());
    }
    Ok(Some(Rendered { prompt, options }))
}

pub async fn slots(
    store: &Arc<dyn BookingStore>,
    doctor_id: i32,
    date: NaiveDate,
    not_before: Option<NaiveTime>,
) -> Result<Option<Rendered>, StoreError> {
    let slots = store.list_open_slots(doctor_id, date, not_before).await?;
    if slots.is_empty() {
        return Ok(None);
    }
    let mut prompt = String::from("Select a slot by typing its ID:\n");
    let mut options = Vec::with_capacity(slots.len());
    for slot in slots {
        prompt.push_str(&format!("{}. {}\n", slot.id, slot.slot_time.format("%H:%M")));
        options.push(slot.id.to_string());
    }
    Ok(Some(Rendered { prompt, options }))
}

/// Saved phone numbers from the user's booking history, offered for
/// reselection. A fresh 10-digit number is always accepted too, so the
/// option set here is a convenience rather than a hard constraint.
pub fn saved_phones(phones: &[String]) -> Rendered {
    let mut prompt =
        String::from("Pick a saved phone number by typing it, or enter a new 10 digit number:\n");
    for phone in phones {
        prompt.push_str(&format!("• {}\n", phone));
    }
    Rendered {
        prompt,
        options: phones.to_vec(),
    }
}
