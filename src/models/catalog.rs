use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{NaiveDate, NaiveTime};

pub const STATUS_PAID: &str = "paid";
pub const STATUS_CONTACT_REQUEST: &str = "contact_request";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Specialty {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: i32,
    pub name: String,
    pub fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpenSlot {
    pub id: i32,
    pub slot_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingRow {
    pub id: i32,
    pub phone_no: String,
    pub payment_status: String,
}

/// Payload the finalizer writes once a payment is confirmed.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub doctor_id: i32,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub payment_status: String,
    pub name: String,
    pub phone_no: String,
}

/// One row of the doctor dashboard (bookings joined with doctor names).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DashboardRow {
    pub id: i32,
    pub patient_name: String,
    pub phone_no: String,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub doctor_name: String,
}
