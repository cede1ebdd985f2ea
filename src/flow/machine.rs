//! Per-state transition handlers of the booking flow. Each handler owns a
//! session snapshot, decides the next state and prompt, and writes the
//! snapshot back only when something actually changed.

use chrono::Local;
use teloxide::types::ChatId;

use crate::database::StoreError;
use crate::models::{FlowState, Session};

use super::classify;
use super::options;
use super::{
    BookingEngine, APOLOGY, ASK_DATE, ASK_NAME, ASK_PHONE, DATE_FORMAT_HINT, DATE_PAST,
    NO_DOCTORS, NO_SLOTS, NO_SPECIALTIES, PHONE_BLOCKED,
};

impl BookingEngine {
    pub(crate) async fn advance(
        &self,
        chat_id: ChatId,
        session: Session,
        state: FlowState,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        match state {
            FlowState::ChoosingPhone => self.on_phone_choice(chat_id, session, input).await,
            FlowState::ChoosingSpeciality => self.on_speciality(chat_id, session, input).await,
            FlowState::ChoosingDoctor => self.on_doctor(chat_id, session, input).await,
            FlowState::ChoosingDate => self.on_date(chat_id, session, input).await,
            FlowState::ChoosingSlot => self.on_slot(chat_id, session, input).await,
            FlowState::EnteringName => self.on_name(chat_id, session, input).await,
            FlowState::EnteringPhone => self.on_phone_entry(chat_id, session, input).await,
        }
    }

    /// Moves the session into the speciality list, or resets it when the
    /// catalogue is empty. The caller writes the session back.
    pub(crate) async fn enter_speciality(
        &self,
        session: &mut Session,
    ) -> Result<Vec<String>, StoreError> {
        match options::specialties(&self.store).await? {
            Some(rendered) => {
                session.state = Some(FlowState::ChoosingSpeciality);
                session.valid_options = rendered.options;
                Ok(vec![rendered.prompt])
            }
            None => {
                session.reset_flow();
                Ok(vec![NO_SPECIALTIES.to_string()])
            }
        }
    }

    async fn on_phone_choice(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        let accepted = session.valid_options.iter().any(|o| o == input)
            || classify::is_ten_digit_phone(input);
        if !accepted {
            return Ok(self
                .invalid_option_reply(
                    chat_id,
                    input,
                    "Please pick a listed number or enter a new 10 digit number.",
                )
                .await);
        }

        if self.store.is_phone_blocked(input).await? {
            session.reset_flow();
            self.sessions.put(chat_id, session).await;
            return Ok(vec![PHONE_BLOCKED.to_string()]);
        }

        session.scratch.phone_no = Some(input.to_string());
        let replies = self.enter_speciality(&mut session).await?;
        self.sessions.put(chat_id, session).await;
        Ok(replies)
    }

    async fn on_speciality(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if !session.valid_options.iter().any(|o| o == input) {
            return Ok(self
                .invalid_option_reply(chat_id, input, "Please enter a valid speciality ID.")
                .await);
        }
        let Ok(specialty_id) = input.parse::<i32>() else {
            return Ok(vec!["Please enter a valid speciality ID.".to_string()]);
        };

        match options::doctors(&self.store, specialty_id).await? {
            Some(rendered) => {
                session.scratch.speciality_id = Some(specialty_id);
                session.state = Some(FlowState::ChoosingDoctor);
                session.valid_options = rendered.options;
                self.sessions.put(chat_id, session).await;
                Ok(vec![rendered.prompt])
            }
            // State does not advance; the speciality list stays valid.
            None => Ok(vec![NO_DOCTORS.to_string()]),
        }
    }

    async fn on_doctor(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if !session.valid_options.iter().any(|o| o == input) {
            return Ok(self
                .invalid_option_reply(chat_id, input, "Please enter a valid Doctor ID.")
                .await);
        }
        let Ok(doctor_id) = input.parse::<i32>() else {
            return Ok(vec!["Please enter a valid Doctor ID.".to_string()]);
        };
        let Some(doctor) = self.store.get_doctor(doctor_id).await? else {
            return Ok(vec![
                "That doctor is no longer available. Please choose another ID.".to_string(),
            ]);
        };

        session.scratch.doctor_id = Some(doctor.id);
        session.scratch.doctor_name = Some(doctor.name);
        session.scratch.fee = Some(doctor.fee);
        session.state = Some(FlowState::ChoosingDate);
        session.valid_options.clear();
        self.sessions.put(chat_id, session).await;
        Ok(vec![ASK_DATE.to_string()])
    }

    async fn on_date(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        let Some(date) = classify::parse_date(input) else {
            // "2025-02-30" gets a format error; a free-text question gets
            // a FAQ-assisted answer plus the format hint.
            if classify::looks_like_date(input) {
                return Ok(vec![format!(
                    "That doesn't look like a real date. {}",
                    DATE_FORMAT_HINT
                )]);
            }
            let answer = self.faq.answer_question(chat_id, input).await;
            return Ok(vec![format!("💡 {}\n{}", answer, DATE_FORMAT_HINT)]);
        };

        let today = Local::now().date_naive();
        if date < today {
            return Ok(vec![DATE_PAST.to_string()]);
        }

        let Some(doctor_id) = session.scratch.doctor_id else {
            log::error!("choosing_date without doctor_id for chat {}", chat_id);
            self.sessions.reset_flow(chat_id).await;
            return Ok(vec![APOLOGY.to_string()]);
        };

        // For today, only offer slots that have not passed yet.
        let not_before = (date == today).then(|| Local::now().time());
        match options::slots(&self.store, doctor_id, date, not_before).await? {
            Some(rendered) => {
                session.scratch.slot_date = Some(date);
                session.state = Some(FlowState::ChoosingSlot);
                session.valid_options = rendered.options;
                self.sessions.put(chat_id, session).await;
                Ok(vec![rendered.prompt])
            }
            None => Ok(vec![NO_SLOTS.to_string()]),
        }
    }

    async fn on_slot(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if !session.valid_options.iter().any(|o| o == input) {
            return Ok(self
                .invalid_option_reply(chat_id, input, "Please enter a valid Slot ID.")
                .await);
        }
        let Ok(slot_id) = input.parse::<i32>() else {
            return Ok(vec!["Please enter a valid Slot ID.".to_string()]);
        };

        session.scratch.slot_id = Some(slot_id);
        session.state = Some(FlowState::EnteringName);
        session.valid_options.clear();
        self.sessions.put(chat_id, session).await;
        Ok(vec![ASK_NAME.to_string()])
    }

    async fn on_name(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if input.is_empty() {
            return Ok(vec![ASK_NAME.to_string()]);
        }

        session.scratch.patient_name = Some(input.to_string());
        if session.scratch.phone_no.is_some() {
            // Phone already picked at the start of the flow, nothing left
            // to collect.
            return self.finish_booking(chat_id, session).await;
        }

        session.state = Some(FlowState::EnteringPhone);
        self.sessions.put(chat_id, session).await;
        Ok(vec![ASK_PHONE.to_string()])
    }

    async fn on_phone_entry(
        &self,
        chat_id: ChatId,
        mut session: Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if !classify::is_ten_digit_phone(input) {
            return Ok(self
                .invalid_option_reply(chat_id, input, "Please enter a valid 10 digit number.")
                .await);
        }

        // A blocked number cannot become valid within this conversation,
        // so the whole attempt is aborted rather than reprompted.
        if self.store.is_phone_blocked(input).await? {
            session.reset_flow();
            self.sessions.put(chat_id, session).await;
            return Ok(vec![PHONE_BLOCKED.to_string()]);
        }

        session.scratch.phone_no = Some(input.to_string());
        self.finish_booking(chat_id, session).await
    }

    /// Terminal action: emit the payment link and clear the flow, leaving
    /// the initiated marker. The booking only becomes `paid` when the
    /// payment surface calls the finalizer.
    async fn finish_booking(
        &self,
        chat_id: ChatId,
        mut session: Session,
    ) -> Result<Vec<String>, StoreError> {
        let scratch = session.scratch.clone();
        let (Some(doctor_id), Some(slot_id), Some(name), Some(phone), Some(fee)) = (
            scratch.doctor_id,
            scratch.slot_id,
            scratch.patient_name,
            scratch.phone_no,
            scratch.fee,
        ) else {
            log::error!("incomplete scratch at payment hand-off for chat {}", chat_id);
            session.reset_flow();
            self.sessions.put(chat_id, session).await;
            return Ok(vec![APOLOGY.to_string()]);
        };

        let url = format!(
            "{}/pay/{}/{}/{}?name={}&phone={}&fee={:.2}",
            self.payment_base, chat_id.0, doctor_id, slot_id, name, phone, fee
        );

        session.reset_flow();
        session.booking_initiated = true;
        self.sessions.put(chat_id, session).await;

        log::info!(
            "💳 Payment link issued for chat {} (doctor {}, slot {})",
            chat_id,
            doctor_id,
            slot_id
        );
        Ok(vec![format!("💳 Please complete your payment here: {}", url)])
    }
}
