pub mod store;

pub use store::{BookingStore, StoreError};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS specialties (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id SERIAL PRIMARY KEY,
                specialty_id INTEGER NOT NULL REFERENCES specialties(id),
                name TEXT NOT NULL,
                fee DOUBLE PRECISION NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS doctor_slots (
                id SERIAL PRIMARY KEY,
                doctor_id INTEGER NOT NULL REFERENCES doctors(id),
                slot_date DATE NOT NULL,
                slot_time TIME NOT NULL,
                is_booked BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id SERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                doctor_id INTEGER NOT NULL REFERENCES doctors(id),
                slot_date DATE NOT NULL,
                slot_time TIME NOT NULL,
                payment_status TEXT NOT NULL,
                name TEXT NOT NULL,
                phone_no TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Default catalogue so a fresh deployment answers /book straight away
        sqlx::query(
            r#"
            INSERT INTO specialties (name)
            VALUES ('General Medicine'), ('Cardiology'), ('Dermatology'), ('Orthopedics')
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_doctors_specialty ON doctors (specialty_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_doctor_slots_lookup ON doctor_slots (doctor_id, slot_date, is_booked)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookings_phone ON bookings (phone_no)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings (user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
