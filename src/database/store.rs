use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::database::Database;
use crate::models::{BookingRow, DashboardRow, Doctor, NewBooking, OpenSlot, Specialty};
use crate::models::catalog::{STATUS_CONTACT_REQUEST, STATUS_PAID};

#[derive(Debug)]
pub enum StoreError {
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Everything the conversation engine and the payment finalizer need from
/// the relational store. The flow code only talks to this trait, so tests
/// run against an in-memory implementation.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError>;
    async fn list_doctors(&self, specialty_id: i32) -> Result<Vec<Doctor>, StoreError>;
    async fn get_doctor(&self, doctor_id: i32) -> Result<Option<Doctor>, StoreError>;
    /// Open slots for a doctor on a date. `not_before` trims away times
    /// that have already passed when the date is today.
    async fn list_open_slots(
        &self,
        doctor_id: i32,
        date: NaiveDate,
        not_before: Option<NaiveTime>,
    ) -> Result<Vec<OpenSlot>, StoreError>;
    async fn find_bookings_by_phone(&self, phone: &str) -> Result<Vec<BookingRow>, StoreError>;
    async fn set_payment_status(&self, phone: &str, status: &str) -> Result<(), StoreError>;
    /// Distinct phone numbers this user has booked with before.
    async fn phones_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError>;
    async fn has_paid_booking(&self, user_id: i64) -> Result<bool, StoreError>;
    /// A phone is blocked while any of its bookings sits in
    /// `contact_request` (support has not called back yet).
    async fn is_phone_blocked(&self, phone: &str) -> Result<bool, StoreError>;
    async fn slot_details(&self, slot_id: i32) -> Result<Option<(NaiveDate, NaiveTime)>, StoreError>;
    /// Compare-and-set: marks the slot booked only if it is still free.
    /// Returns whether this caller won the slot.
    async fn try_book_slot(&self, slot_id: i32) -> Result<bool, StoreError>;
    async fn insert_booking(&self, booking: &NewBooking) -> Result<(), StoreError>;
    async fn list_bookings_for_doctor(
        &self,
        doctor_id: i32,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DashboardRow>, StoreError>;
}

#[async_trait]
impl BookingStore for Database {
    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError> {
        let specialties = sqlx::query_as::<_, Specialty>(
            "SELECT id, name FROM specialties ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(specialties)
    }

    async fn list_doctors(&self, specialty_id: i32) -> Result<Vec<Doctor>, StoreError> {
        let doctors = sqlx::query_as::<_, Doctor>(
            "SELECT id, name, fee FROM doctors WHERE specialty_id = $1 ORDER BY id",
        )
        .bind(specialty_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }

    async fn get_doctor(&self, doctor_id: i32) -> Result<Option<Doctor>, StoreError> {
        let doctor = sqlx::query_as::<_, Doctor>(
            "SELECT id, name, fee FROM doctors WHERE id = $1",
        )
        .bind(doctor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doctor)
    }

    async fn list_open_slots(
        &self,
        doctor_id: i32,
        date: NaiveDate,
        not_before: Option<NaiveTime>,
    ) -> Result<Vec<OpenSlot>, StoreError> {
        let slots = sqlx::query_as::<_, OpenSlot>(
            r#"
            SELECT id, slot_time FROM doctor_slots
            WHERE doctor_id = $1 AND slot_date = $2 AND is_booked = FALSE
              AND ($3::time IS NULL OR slot_time > $3)
            ORDER BY slot_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .bind(not_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    async fn find_bookings_by_phone(&self, phone: &str) -> Result<Vec<BookingRow>, StoreError> {
        let bookings = sqlx::query_as::<_, BookingRow>(
            "SELECT id, phone_no, payment_status FROM bookings WHERE phone_no = $1",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn set_payment_status(&self, phone: &str, status: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET payment_status = $1 WHERE phone_no = $2")
            .bind(status)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn phones_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let phones = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT phone_no FROM bookings WHERE user_id = $1 ORDER BY phone_no",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(phones)
    }

    async fn has_paid_booking(&self, user_id: i64) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE user_id = $1 AND payment_status = $2)",
        )
        .bind(user_id)
        .bind(STATUS_PAID)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn is_phone_blocked(&self, phone: &str) -> Result<bool, StoreError> {
        let blocked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE phone_no = $1 AND payment_status = $2)",
        )
        .bind(phone)
        .bind(STATUS_CONTACT_REQUEST)
        .fetch_one(&self.pool)
        .await?;
        Ok(blocked)
    }

    async fn slot_details(&self, slot_id: i32) -> Result<Option<(NaiveDate, NaiveTime)>, StoreError> {
        let details = sqlx::query_as::<_, (NaiveDate, NaiveTime)>(
            "SELECT slot_date, slot_time FROM doctor_slots WHERE id = $1",
        )
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(details)
    }

    async fn try_book_slot(&self, slot_id: i32) -> Result<bool, StoreError> {
        // Conditional update: the row count tells us whether we won the
        // slot or someone else confirmed first.
        let result = sqlx::query(
            "UPDATE doctor_slots SET is_booked = TRUE WHERE id = $1 AND is_booked = FALSE",
        )
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (user_id, doctor_id, slot_date, slot_time, payment_status, name, phone_no)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.doctor_id)
        .bind(booking.slot_date)
        .bind(booking.slot_time)
        .bind(&booking.payment_status)
        .bind(&booking.name)
        .bind(&booking.phone_no)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_bookings_for_doctor(
        &self,
        doctor_id: i32,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DashboardRow>, StoreError> {
        let rows = sqlx::query_as::<_, DashboardRow>(
            r#"
            SELECT b.id, b.name AS patient_name, b.phone_no, b.slot_date, b.slot_time,
                   d.name AS doctor_name
            FROM bookings b
            JOIN doctors d ON b.doctor_id = d.id
            WHERE b.doctor_id = $1 AND ($2::date IS NULL OR b.slot_date = $2)
            ORDER BY b.slot_date, b.slot_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
