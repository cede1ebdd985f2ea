//! End-to-end conversation tests against an in-memory booking store and a
//! canned FAQ collaborator.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate, NaiveTime};
use teloxide::types::ChatId;

use clinic_booking_bot::bot_state::SessionMap;
use clinic_booking_bot::database::{BookingStore, StoreError};
use clinic_booking_bot::flow::{BookingEngine, FaqAnswers, STOP_ACK};
use clinic_booking_bot::models::{
    BookingRow, DashboardRow, Doctor, FlowState, NewBooking, OpenSlot, Specialty,
    STATUS_CONTACT_REQUEST, STATUS_PAID,
};
use clinic_booking_bot::payment::{finalize_booking, ConfirmForm, FinalizeOutcome};

struct SlotRec {
    id: i32,
    doctor_id: i32,
    slot_date: NaiveDate,
    slot_time: NaiveTime,
    is_booked: bool,
}

struct BookingRec {
    id: i32,
    user_id: i64,
    phone_no: String,
    payment_status: String,
}

#[derive(Default)]
struct InMemoryStore {
    specialties: Vec<Specialty>,
    doctors: Vec<(i32, Doctor)>,
    slots: Mutex<Vec<SlotRec>>,
    bookings: Mutex<Vec<BookingRec>>,
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError> {
        Ok(self.specialties.clone())
    }

    async fn list_doctors(&self, specialty_id: i32) -> Result<Vec<Doctor>, StoreError> {
        Ok(self
            .doctors
            .iter()
            .filter(|(sp, _)| *sp == specialty_id)
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn get_doctor(&self, doctor_id: i32) -> Result<Option<Doctor>, StoreError> {
        Ok(self
            .doctors
            .iter()
            .find(|(_, d)| d.id == doctor_id)
            .map(|(_, d)| d.clone()))
    }

    async fn list_open_slots(
        &self,
        doctor_id: i32,
        date: NaiveDate,
        not_before: Option<NaiveTime>,
    ) -> Result<Vec<OpenSlot>, StoreError> {
        let slots = self.slots.lock().unwrap();
        Ok(slots
            .iter()
            .filter(|s| {
                s.doctor_id == doctor_id
                    && s.slot_date == date
                    && !s.is_booked
                    && not_before.map_or(true, |t| s.slot_time > t)
            })
            .map(|s| OpenSlot {
                id: s.id,
                slot_time: s.slot_time,
            })
            .collect())
    }

    async fn find_bookings_by_phone(&self, phone: &str) -> Result<Vec<BookingRow>, StoreError> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .filter(|b| b.phone_no == phone)
            .map(|b| BookingRow {
                id: b.id,
                phone_no: b.phone_no.clone(),
                payment_status: b.payment_status.clone(),
            })
            .collect())
    }

    async fn set_payment_status(&self, phone: &str, status: &str) -> Result<(), StoreError> {
        let mut bookings = self.bookings.lock().unwrap();
        for booking in bookings.iter_mut().filter(|b| b.phone_no == phone) {
            booking.payment_status = status.to_string();
        }
        Ok(())
    }

    async fn phones_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let bookings = self.bookings.lock().unwrap();
        let mut phones: Vec<String> = bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.phone_no.clone())
            .collect();
        phones.sort();
        phones.dedup();
        Ok(phones)
    }

    async fn has_paid_booking(&self, user_id: i64) -> Result<bool, StoreError> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .any(|b| b.user_id == user_id && b.payment_status == STATUS_PAID))
    }

    async fn is_phone_blocked(&self, phone: &str) -> Result<bool, StoreError> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .any(|b| b.phone_no == phone && b.payment_status == STATUS_CONTACT_REQUEST))
    }

    async fn slot_details(
        &self,
        slot_id: i32,
    ) -> Result<Option<(NaiveDate, NaiveTime)>, StoreError> {
        let slots = self.slots.lock().unwrap();
        Ok(slots
            .iter()
            .find(|s| s.id == slot_id)
            .map(|s| (s.slot_date, s.slot_time)))
    }

    async fn try_book_slot(&self, slot_id: i32) -> Result<bool, StoreError> {
        let mut slots = self.slots.lock().unwrap();
        match slots.iter_mut().find(|s| s.id == slot_id && !s.is_booked) {
            Some(slot) => {
                slot.is_booked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.lock().unwrap();
        let id = bookings.len() as i32 + 1;
        bookings.push(BookingRec {
            id,
            user_id: booking.user_id,
            phone_no: booking.phone_no.clone(),
            payment_status: booking.payment_status.clone(),
        });
        Ok(())
    }

    async fn list_bookings_for_doctor(
        &self,
        _doctor_id: i32,
        _date: Option<NaiveDate>,
    ) -> Result<Vec<DashboardRow>, StoreError> {
        Ok(Vec::new())
    }
}

struct StubFaq;

#[async_trait]
impl FaqAnswers for StubFaq {
    async fn answer_question(&self, _chat_id: ChatId, text: &str) -> String {
        format!("faq: {}", text)
    }
}

fn tomorrow() -> NaiveDate {
    Local::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap()
}

/// Specialty 1 (Cardiology) with doctor 4, specialty 2 (Dermatology) with
/// none. Doctor 4 has open slots 31 and 32 tomorrow and a long-gone
/// midnight slot today.
fn seeded_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore {
        specialties: vec![
            Specialty {
                id: 1,
                name: "Cardiology".to_string(),
            },
            Specialty {
                id: 2,
                name: "Dermatology".to_string(),
            },
        ],
        doctors: vec![(
            1,
            Doctor {
                id: 4,
                name: "Dr. Mehta".to_string(),
                fee: 500.0,
            },
        )],
        slots: Mutex::new(vec![
            SlotRec {
                id: 31,
                doctor_id: 4,
                slot_date: tomorrow(),
                slot_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                is_booked: false,
            },
            SlotRec {
                id: 32,
                doctor_id: 4,
                slot_date: tomorrow(),
                slot_time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
                is_booked: false,
            },
            SlotRec {
                id: 33,
                doctor_id: 4,
                slot_date: Local::now().date_naive(),
                slot_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                is_booked: false,
            },
        ]),
        bookings: Mutex::new(Vec::new()),
    })
}

fn engine_with(store: Arc<InMemoryStore>) -> (BookingEngine, SessionMap) {
    let sessions = SessionMap::new();
    let engine = BookingEngine::new(
        store,
        Arc::new(StubFaq),
        sessions.clone(),
        "http://pay.test".to_string(),
    );
    (engine, sessions)
}

async fn drive(engine: &BookingEngine, chat: ChatId, inputs: &[&str]) -> Vec<String> {
    let mut last = Vec::new();
    for input in inputs {
        last = engine.handle_message(chat, input).await;
    }
    last
}

#[tokio::test]
async fn happy_path_emits_exactly_one_payment_link() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(7);
    let date = tomorrow().to_string();

    let replies = engine.start_booking(chat).await;
    assert!(replies[0].contains("Cardiology"));

    let replies = engine.handle_message(chat, "1").await;
    assert!(replies[0].contains("Dr. Mehta"));

    // trailing period is stripped before option matching
    let replies = engine.handle_message(chat, "4.").await;
    assert!(replies[0].contains("YYYY-MM-DD"));

    let replies = engine.handle_message(chat, &date).await;
    assert!(replies[0].contains("31") && replies[0].contains("10:00"));

    let replies = engine.handle_message(chat, "31").await;
    assert!(replies[0].contains("full name"));

    let replies = engine.handle_message(chat, "Asha Rao").await;
    assert!(replies[0].contains("10 digit"));

    let replies = engine.handle_message(chat, "9876543210").await;
    let links: Vec<&String> = replies.iter().filter(|r| r.contains("/pay/")).collect();
    assert_eq!(links.len(), 1);
    assert!(links[0].contains("/pay/7/4/31?"));
    assert!(links[0].contains("name=Asha Rao"));
    assert!(links[0].contains("phone=9876543210"));

    let session = sessions.get(chat).await;
    assert!(session.state.is_none());
    assert!(session.scratch.is_empty());
    assert!(session.valid_options.is_empty());
    assert!(session.booking_initiated);
}

#[tokio::test]
async fn stop_clears_session_from_every_state() {
    let date = tomorrow().to_string();
    let steps = ["/book", "1", "4", date.as_str(), "31", "Asha Rao"];

    // one extra message at each prefix length walks the flow one state
    // further before "stop" lands
    for depth in 1..=steps.len() {
        let (engine, sessions) = engine_with(seeded_store());
        let chat = ChatId(100 + depth as i64);
        drive(&engine, chat, &steps[..depth]).await;
        assert!(
            sessions.get(chat).await.state.is_some(),
            "expected an active state after {} steps",
            depth
        );

        let replies = engine.handle_message(chat, "STOP").await;
        assert_eq!(replies, vec![STOP_ACK.to_string()]);

        let session = sessions.get(chat).await;
        assert!(session.state.is_none());
        assert!(session.scratch.is_empty());
        assert!(session.valid_options.is_empty());
    }
}

#[tokio::test]
async fn faq_interruption_is_state_transparent() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(8);

    drive(&engine, chat, &["/book", "1"]).await;
    let before = sessions.get(chat).await;
    assert_eq!(before.state, Some(FlowState::ChoosingDoctor));

    let replies = engine
        .handle_message(chat, "what are your opening hours?")
        .await;
    assert!(replies[0].contains("faq: what are your opening hours?"));

    let after = sessions.get(chat).await;
    assert_eq!(
        serde_json::to_value(&before).unwrap(),
        serde_json::to_value(&after).unwrap()
    );
}

#[tokio::test]
async fn back_from_choosing_doctor_relists_specialties() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(9);

    drive(&engine, chat, &["/book", "1"]).await;
    assert_eq!(
        sessions.get(chat).await.state,
        Some(FlowState::ChoosingDoctor)
    );

    let replies = engine.handle_message(chat, "back").await;
    assert!(replies[0].contains("Cardiology"));

    let session = sessions.get(chat).await;
    assert_eq!(session.state, Some(FlowState::ChoosingSpeciality));
    assert!(session.scratch.speciality_id.is_none());
    assert!(session.scratch.doctor_id.is_none());
    assert!(session.scratch.doctor_name.is_none());
    assert!(session.scratch.fee.is_none());
    assert_eq!(session.valid_options, vec!["1", "2"]);
}

#[tokio::test]
async fn blocked_phone_aborts_flow_without_payment_link() {
    let store = seeded_store();
    store.bookings.lock().unwrap().push(BookingRec {
        id: 1,
        user_id: 999,
        phone_no: "9999999999".to_string(),
        payment_status: STATUS_CONTACT_REQUEST.to_string(),
    });
    let (engine, sessions) = engine_with(store);
    let chat = ChatId(10);
    let date = tomorrow().to_string();

    drive(&engine, chat, &["/book", "1", "4", &date, "31", "Asha Rao"]).await;
    assert_eq!(
        sessions.get(chat).await.state,
        Some(FlowState::EnteringPhone)
    );

    let replies = engine.handle_message(chat, "9999999999").await;
    assert!(replies.iter().all(|r| !r.contains("/pay/")));
    assert!(replies[0].contains("cancelled"));

    let session = sessions.get(chat).await;
    assert!(session.state.is_none());
    assert!(session.scratch.is_empty());
    assert!(!session.booking_initiated);
}

#[tokio::test]
async fn structurally_invalid_date_is_rejected_in_place() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(11);

    drive(&engine, chat, &["/book", "1", "4"]).await;

    let replies = engine.handle_message(chat, "2025-02-30").await;
    assert!(replies[0].contains("YYYY-MM-DD"));
    assert!(!replies[0].contains("faq:"));
    assert_eq!(sessions.get(chat).await.state, Some(FlowState::ChoosingDate));

    // past dates get their own message, distinct from the format error
    let replies = engine.handle_message(chat, "2020-01-01").await;
    assert!(replies[0].contains("past"));
    assert_eq!(sessions.get(chat).await.state, Some(FlowState::ChoosingDate));

    // free text gets the FAQ-assisted variant instead
    let replies = engine.handle_message(chat, "sometime next week please").await;
    assert!(replies[0].contains("faq:"));
    assert_eq!(sessions.get(chat).await.state, Some(FlowState::ChoosingDate));
}

#[tokio::test]
async fn todays_expired_slots_are_not_offered() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(12);
    let today = Local::now().date_naive().to_string();

    drive(&engine, chat, &["/book", "1", "4"]).await;

    // the only slot today is at midnight, which has always passed
    let replies = engine.handle_message(chat, &today).await;
    assert!(replies[0].contains("No available slots"));
    assert_eq!(sessions.get(chat).await.state, Some(FlowState::ChoosingDate));
}

#[tokio::test]
async fn zero_doctors_reports_and_keeps_state() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(13);

    drive(&engine, chat, &["/book"]).await;
    let replies = engine.handle_message(chat, "2").await;
    assert!(replies[0].contains("No doctors found"));

    let session = sessions.get(chat).await;
    assert_eq!(session.state, Some(FlowState::ChoosingSpeciality));
    assert!(session.scratch.speciality_id.is_none());
    assert_eq!(session.valid_options, vec!["1", "2"]);
}

#[tokio::test]
async fn saved_phone_skips_phone_entry() {
    let store = seeded_store();
    store.bookings.lock().unwrap().push(BookingRec {
        id: 1,
        user_id: 42,
        phone_no: "9876543210".to_string(),
        payment_status: STATUS_PAID.to_string(),
    });
    let (engine, sessions) = engine_with(store);
    let chat = ChatId(42);
    let date = tomorrow().to_string();

    let replies = engine.start_booking(chat).await;
    assert!(replies[0].contains("9876543210"));
    assert_eq!(
        sessions.get(chat).await.state,
        Some(FlowState::ChoosingPhone)
    );

    drive(&engine, chat, &["9876543210", "1", "4", &date, "31"]).await;
    assert_eq!(
        sessions.get(chat).await.state,
        Some(FlowState::EnteringName)
    );

    // name is the last thing to collect; the link comes straight after
    let replies = engine.handle_message(chat, "Asha Rao").await;
    let links: Vec<&String> = replies.iter().filter(|r| r.contains("/pay/")).collect();
    assert_eq!(links.len(), 1);
    assert!(links[0].contains("phone=9876543210"));
}

#[tokio::test]
async fn contact_request_side_flow_leaves_booking_state_alone() {
    let store = seeded_store();
    store.bookings.lock().unwrap().push(BookingRec {
        id: 1,
        user_id: 42,
        phone_no: "9876543210".to_string(),
        payment_status: STATUS_PAID.to_string(),
    });
    let store_probe = store.clone();
    let (engine, sessions) = engine_with(store);
    let chat = ChatId(42);

    drive(&engine, chat, &["/book"]).await;
    let before = sessions.get(chat).await;
    assert_eq!(before.state, Some(FlowState::ChoosingPhone));

    let replies = engine
        .handle_message(chat, "I need to cancel my appointment")
        .await;
    assert!(replies[0].contains("registered phone number"));

    // malformed phone keeps the side flow alive
    let replies = engine.handle_message(chat, "12345").await;
    assert!(replies[0].contains("valid 10-digit"));

    let replies = engine.handle_message(chat, "9876543210").await;
    assert!(replies[0].contains("call you soon"));
    assert!(store_probe
        .bookings
        .lock()
        .unwrap()
        .iter()
        .all(|b| b.payment_status == STATUS_CONTACT_REQUEST));

    // the interrupted booking flow is exactly where it was
    let after = sessions.get(chat).await;
    assert_eq!(after.state, before.state);
    assert_eq!(after.valid_options, before.valid_options);
}

#[tokio::test]
async fn cancellation_keyword_without_paid_booking_goes_to_faq() {
    let (engine, _sessions) = engine_with(seeded_store());
    let chat = ChatId(14);

    let replies = engine.handle_message(chat, "can I cancel a booking?").await;
    assert!(replies[0].contains("faq:"));
}

#[tokio::test]
async fn faq_nudge_stops_after_first_confirmed_booking() {
    let (engine, sessions) = engine_with(seeded_store());
    let chat = ChatId(15);

    let replies = engine.handle_message(chat, "where is the clinic?").await;
    assert_eq!(replies.len(), 2);
    assert!(replies[1].contains("/book"));

    sessions.mark_booking_done(chat).await;
    let replies = engine.handle_message(chat, "where is the clinic?").await;
    assert_eq!(replies.len(), 1);
}

#[tokio::test]
async fn sessions_do_not_interfere() {
    let (engine, sessions) = engine_with(seeded_store());
    let alice = ChatId(20);
    let bob = ChatId(21);

    drive(&engine, alice, &["/book", "1"]).await;
    drive(&engine, bob, &["/book"]).await;
    engine.handle_message(bob, "stop").await;

    assert_eq!(
        sessions.get(alice).await.state,
        Some(FlowState::ChoosingDoctor)
    );
    assert!(sessions.get(bob).await.state.is_none());
}

#[tokio::test]
async fn finalizer_rejects_second_confirmation_for_same_slot() {
    let store = seeded_store();
    let form = ConfirmForm {
        chat_id: 7,
        doctor_id: 4,
        slot_id: 31,
        name: "Asha Rao".to_string(),
        phone: "9876543210".to_string(),
        fee: 500.0,
    };

    let first = finalize_booking(store.as_ref(), &form).await.unwrap();
    assert!(matches!(first, FinalizeOutcome::Confirmed { .. }));

    // the slot is gone from the open list the instant the first
    // confirmation wins it
    let open = store.list_open_slots(4, tomorrow(), None).await.unwrap();
    assert!(open.iter().all(|s| s.id != 31));

    let second = finalize_booking(store.as_ref(), &form).await.unwrap();
    assert!(matches!(second, FinalizeOutcome::SlotTaken));

    // only one booking row was written
    assert_eq!(store.bookings.lock().unwrap().len(), 1);
}
