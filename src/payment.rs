//! Web payment surface: the page the bot's payment link points to, the
//! confirmation endpoint that finalizes a booking, and the doctor
//! dashboard. Runs as a tokio task next to the Telegram dispatcher.

use std::error::Error;
use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::ChatId;

use crate::bot_state::SessionMap;
use crate::database::{BookingStore, StoreError};
use crate::models::catalog::STATUS_PAID;
use crate::models::NewBooking;

#[derive(Clone)]
pub struct PaymentState {
    pub bot: Bot,
    pub store: Arc<dyn BookingStore>,
    pub sessions: SessionMap,
}

pub fn router(state: PaymentState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/pay/:chat_id/:doctor_id/:slot_id", get(pay_page))
        .route("/confirm_payment", post(confirm_payment))
        .route("/dashboard", get(dashboard))
        .with_state(state)
}

pub async fn serve(state: PaymentState, port: u16) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("💳 Payment server listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn home() -> Html<&'static str> {
    Html("<h2>Payment Server is Running</h2>")
}

#[derive(Debug, Deserialize)]
struct PayQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    fee: f64,
}

async fn pay_page(
    State(state): State<PaymentState>,
    Path((chat_id, doctor_id, slot_id)): Path<(i64, i32, i32)>,
    Query(q): Query<PayQuery>,
) -> Html<String> {
    let slot = match state.store.slot_details(slot_id).await {
        Ok(Some(slot)) => slot,
        Ok(None) => return Html("<h3>This slot does not exist.</h3>".to_string()),
        Err(e) => {
            log::error!("❌ Error loading slot {}: {}", slot_id, e);
            return Html("<h3>Something went wrong. Please try again later.</h3>".to_string());
        }
    };
    let doctor_name = match state.store.get_doctor(doctor_id).await {
        Ok(Some(doctor)) => doctor.name,
        Ok(None) => return Html("<h3>This doctor does not exist.</h3>".to_string()),
        Err(e) => {
            log::error!("❌ Error loading doctor {}: {}", doctor_id, e);
            return Html("<h3>Something went wrong. Please try again later.</h3>".to_string());
        }
    };

    Html(render_pay_page(
        chat_id,
        doctor_id,
        slot_id,
        &q.name,
        &q.phone,
        q.fee,
        &doctor_name,
        slot.0,
        slot.1,
    ))
}

#[allow(clippy::too_many_arguments)]
fn render_pay_page(
    chat_id: i64,
    doctor_id: i32,
    slot_id: i32,
    name: &str,
    phone: &str,
    fee: f64,
    doctor_name: &str,
    slot_date: NaiveDate,
    slot_time: NaiveTime,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Payment Page</title></head>
<body style="font-family:Arial;text-align:center;">
    <h2>Pay for Your Appointment</h2>
    <p>Patient Name: {name}</p>
    <p>Phone: {phone}</p>
    <p>Doctor: {doctor}</p>
    <p>Date: {date}</p>
    <p>Time: {time}</p>
    <p>Fee: ₹{fee:.2}</p>
    <form method="POST" action="/confirm_payment">
        <input type="hidden" name="chat_id" value="{chat_id}">
        <input type="hidden" name="doctor_id" value="{doctor_id}">
        <input type="hidden" name="slot_id" value="{slot_id}">
        <input type="hidden" name="name" value="{name}">
        <input type="hidden" name="phone" value="{phone}">
        <input type="hidden" name="fee" value="{fee}">
        <button type="submit" style="padding:10px 20px;">Pay Now</button>
    </form>
</body>
</html>"#,
        name = escape_html(name),
        phone = escape_html(phone),
        doctor = escape_html(doctor_name),
        date = slot_date,
        time = slot_time.format("%H:%M"),
        fee = fee,
        chat_id = chat_id,
        doctor_id = doctor_id,
        slot_id = slot_id,
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmForm {
    pub chat_id: i64,
    pub doctor_id: i32,
    pub slot_id: i32,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub fee: f64,
}

pub enum FinalizeOutcome {
    Confirmed {
        doctor_name: String,
        slot_date: NaiveDate,
        slot_time: NaiveTime,
    },
    /// Another confirmation won the slot first; nothing was written.
    SlotTaken,
}

/// The booking finalizer. Wins the slot with a conditional update before
/// writing anything, so two confirmations for the same slot can never both
/// produce a booking.
pub async fn finalize_booking(
    store: &dyn BookingStore,
    form: &ConfirmForm,
) -> Result<FinalizeOutcome, StoreError> {
    let Some((slot_date, slot_time)) = store.slot_details(form.slot_id).await? else {
        return Ok(FinalizeOutcome::SlotTaken);
    };

    if !store.try_book_slot(form.slot_id).await? {
        return Ok(FinalizeOutcome::SlotTaken);
    }

    let doctor_name = store
        .get_doctor(form.doctor_id)
        .await?
        .map(|d| d.name)
        .unwrap_or_else(|| "your doctor".to_string());

    store
        .insert_booking(&NewBooking {
            user_id: form.chat_id,
            doctor_id: form.doctor_id,
            slot_date,
            slot_time,
            payment_status: STATUS_PAID.to_string(),
            name: form.name.clone(),
            phone_no: form.phone.clone(),
        })
        .await?;

    Ok(FinalizeOutcome::Confirmed {
        doctor_name,
        slot_date,
        slot_time,
    })
}

async fn confirm_payment(
    State(state): State<PaymentState>,
    Form(form): Form<ConfirmForm>,
) -> Html<String> {
    let chat_id = ChatId(form.chat_id);

    match finalize_booking(state.store.as_ref(), &form).await {
        Ok(FinalizeOutcome::Confirmed {
            doctor_name,
            slot_date,
            slot_time,
        }) => {
            state.sessions.mark_booking_done(chat_id).await;
            log::info!(
                "🎉 Payment confirmed: chat {}, doctor {}, slot {}",
                form.chat_id,
                form.doctor_id,
                form.slot_id
            );

            let message = format!(
                "✅ Payment received!\nBooking confirmed with Dr. {} on {} at {}.",
                doctor_name,
                slot_date,
                slot_time.format("%H:%M")
            );
            if let Err(e) = state.bot.send_message(chat_id, message).await {
                log::error!("❌ Could not notify chat {}: {}", form.chat_id, e);
            }

            Html("<h3>Payment successful! You can close this page.</h3>".to_string())
        }
        Ok(FinalizeOutcome::SlotTaken) => {
            log::warn!(
                "⚠️ Slot {} already taken when chat {} confirmed",
                form.slot_id,
                form.chat_id
            );
            if let Err(e) = state
                .bot
                .send_message(
                    chat_id,
                    "⚠️ That slot was just taken by another patient. \
                     Type /book to pick a different slot.",
                )
                .await
            {
                log::error!("❌ Could not notify chat {}: {}", form.chat_id, e);
            }

            Html(
                "<h3>Sorry, this slot is no longer available. \
                 Please return to the chat and pick another.</h3>"
                    .to_string(),
            )
        }
        Err(e) => {
            log::error!("❌ Error finalizing booking for chat {}: {}", form.chat_id, e);
            Html(
                "<h3>Something went wrong while confirming your payment. \
                 Please contact support.</h3>"
                    .to_string(),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    doctor_id: Option<i32>,
    slot_date: Option<NaiveDate>,
}

async fn dashboard(
    State(state): State<PaymentState>,
    Query(q): Query<DashboardQuery>,
) -> Html<String> {
    let Some(doctor_id) = q.doctor_id else {
        return Html(
            "<h2>Doctor Dashboard</h2>\
             <p>Pass ?doctor_id=&lt;id&gt; (and optionally &amp;slot_date=YYYY-MM-DD) \
             to list bookings.</p>"
                .to_string(),
        );
    };

    let rows = match state
        .store
        .list_bookings_for_doctor(doctor_id, q.slot_date)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("❌ Error loading dashboard for doctor {}: {}", doctor_id, e);
            return Html("<h3>Something went wrong. Please try again later.</h3>".to_string());
        }
    };

    let mut body = String::from(
        "<h2>Doctor Dashboard</h2>\
         <table border=\"1\" cellpadding=\"6\">\
         <tr><th>ID</th><th>Patient</th><th>Phone</th>\
         <th>Date</th><th>Time</th><th>Doctor</th></tr>",
    );
    for row in &rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.id,
            escape_html(&row.patient_name),
            escape_html(&row.phone_no),
            row.slot_date,
            row.slot_time.format("%H:%M"),
            escape_html(&row.doctor_name),
        ));
    }
    body.push_str("</table>");
    if rows.is_empty() {
        body.push_str("<p>No bookings found.</p>");
    }
    Html(body)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
