pub mod classify;
pub mod machine;
pub mod navigation;
pub mod options;

use async_trait::async_trait;
use std::sync::Arc;
use teloxide::types::ChatId;

use crate::bot_state::SessionMap;
use crate::database::{BookingStore, StoreError};
use crate::models::catalog::STATUS_CONTACT_REQUEST;
use crate::models::FlowState;

use classify::Control;

pub const APOLOGY: &str = "⚠️ Sorry, something went wrong. Please try again later.";
pub const STOP_ACK: &str =
    "🛑 Okay, I have cancelled the booking process. Type /book whenever you want to start again.";
pub(crate) const BOOK_NUDGE: &str = "You can type /book to start with Appointment Booking Process";
pub(crate) const HELPLINE: &str = "+91 7259356897";
pub(crate) const CONTACT_PROMPT: &str = "📞 Please enter your registered phone number:";
pub(crate) const CONTACT_RETRY: &str = "❌ Please enter a valid 10-digit number:";
pub(crate) const CONTACT_CONFIRMED: &str = "✅ Our team will call you soon.";
pub(crate) const PHONE_BLOCKED: &str = "🚫 This phone number has an open support request and \
cannot be used for new bookings until our team has called you back. \
The booking attempt has been cancelled.";
pub(crate) const NO_SPECIALTIES: &str =
    "Sorry, no specialities are available right now. Please try again later.";
pub(crate) const NO_DOCTORS: &str = "No doctors found for this speciality.";
pub(crate) const NO_SLOTS: &str = "No available slots on this date.";
pub(crate) const ASK_DATE: &str = "Please enter the date you want to book (YYYY-MM-DD):";
pub(crate) const ASK_NAME: &str = "Please enter your full name:";
pub(crate) const ASK_PHONE: &str = "Please enter your 10 digit phone number:";
pub(crate) const DATE_FORMAT_HINT: &str = "Please use YYYY-MM-DD format.";
pub(crate) const DATE_PAST: &str =
    "That date is already in the past. Please enter an upcoming date (YYYY-MM-DD).";

/// The FAQ collaborator. Answers free-text questions and must never fail:
/// implementations collapse internal errors into a fixed apology string.
#[async_trait]
pub trait FaqAnswers: Send + Sync {
    async fn answer_question(&self, chat_id: ChatId, text: &str) -> String;
}

/// The conversational core: classifies every inbound message, drives the
/// booking flow state machine and hands completed bookings off to the
/// payment surface via a link. One instance is shared by all chats.
pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    faq: Arc<dyn FaqAnswers>,
    sessions: SessionMap,
    payment_base: String,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        faq: Arc<dyn FaqAnswers>,
        sessions: SessionMap,
        payment_base: String,
    ) -> Self {
        Self {
            store,
            faq,
            sessions,
            payment_base,
        }
    }

    /// Entry point for ordinary messages. Collaborator failures never
    /// escape: they are logged and surfaced as the apology message, with
    /// the session left untouched so the user can retry the same step.
    pub async fn handle_message(&self, chat_id: ChatId, text: &str) -> Vec<String> {
        match self.dispatch(chat_id, text).await {
            Ok(replies) => replies,
            Err(e) => {
                log::error!("❌ Error handling message for chat {}: {}", chat_id, e);
                vec![APOLOGY.to_string()]
            }
        }
    }

    /// Entry point for the /book command.
    pub async fn start_booking(&self, chat_id: ChatId) -> Vec<String> {
        match self.begin_flow(chat_id).await {
            Ok(replies) => replies,
            Err(e) => {
                log::error!("❌ Error starting booking for chat {}: {}", chat_id, e);
                vec![APOLOGY.to_string()]
            }
        }
    }

    /// Classification order: control token → pending contact-phone reply →
    /// cancellation keyword → /book → current flow state → FAQ.
    async fn dispatch(&self, chat_id: ChatId, raw: &str) -> Result<Vec<String>, StoreError> {
        let text = raw.trim();
        let mut session = self.sessions.get(chat_id).await;

        match classify::control_token(text) {
            Some(Control::Stop) => {
                session.awaiting_contact_phone = false;
                session.reset_flow();
                self.sessions.put(chat_id, session).await;
                return Ok(vec![STOP_ACK.to_string()]);
            }
            Some(Control::Back) => {
                if session.awaiting_contact_phone {
                    session.awaiting_contact_phone = false;
                    let resumed = session.state.is_some();
                    self.sessions.put(chat_id, session).await;
                    return Ok(vec![if resumed {
                        "↩️ Okay, continuing your booking where you left off.".to_string()
                    } else {
                        "↩️ Okay.".to_string()
                    }]);
                }
                if session.state.is_some() {
                    return self.go_back(chat_id, session).await;
                }
                // nothing to back out of, treated as free text below
            }
            None => {}
        }

        let input = classify::normalize(text);

        if session.awaiting_contact_phone {
            return self.contact_phone_reply(chat_id, session, input).await;
        }

        if classify::contains_cancellation_keyword(text)
            && self.store.has_paid_booking(chat_id.0).await?
        {
            session.awaiting_contact_phone = true;
            self.sessions.put(chat_id, session).await;
            return Ok(vec![CONTACT_PROMPT.to_string()]);
        }

        if input.eq_ignore_ascii_case("/book") {
            return self.begin_flow(chat_id).await;
        }

        match session.state {
            None => {
                // Off-flow question: answered by the FAQ collaborator,
                // session deliberately not written back.
                let mut replies = vec![self.faq.answer_question(chat_id, text).await];
                if !session.booking_done {
                    replies.push(BOOK_NUDGE.to_string());
                }
                Ok(replies)
            }
            Some(state) => self.advance(chat_id, session, state, input).await,
        }
    }

    /// Restarts the booking flow from scratch. Users with booking history
    /// first pick (or re-enter) a phone number; everyone else goes straight
    /// to the speciality list.
    pub(crate) async fn begin_flow(&self, chat_id: ChatId) -> Result<Vec<String>, StoreError> {
        let mut session = self.sessions.get(chat_id).await;
        session.awaiting_contact_phone = false;
        session.reset_flow();

        let phones = self.store.phones_for_user(chat_id.0).await?;
        let replies = if phones.is_empty() {
            self.enter_speciality(&mut session).await?
        } else {
            let rendered = options::saved_phones(&phones);
            session.state = Some(FlowState::ChoosingPhone);
            session.valid_options = rendered.options;
            vec![rendered.prompt]
        };
        self.sessions.put(chat_id, session).await;
        Ok(replies)
    }

    /// Second half of the contact-request side flow: the user was asked
    /// for their registered phone number on the previous turn.
    async fn contact_phone_reply(
        &self,
        chat_id: ChatId,
        mut session: crate::models::Session,
        input: &str,
    ) -> Result<Vec<String>, StoreError> {
        if !classify::is_ten_digit_phone(input) {
            // stay in the side flow, main flow untouched
            return Ok(vec![CONTACT_RETRY.to_string()]);
        }

        session.awaiting_contact_phone = false;
        self.sessions.put(chat_id, session).await;

        let bookings = self.store.find_bookings_by_phone(input).await?;
        if bookings.is_empty() {
            return Ok(vec![format!(
                "❌ No bookings found. Call {} for help.",
                HELPLINE
            )]);
        }

        self.store
            .set_payment_status(input, STATUS_CONTACT_REQUEST)
            .await?;
        log::info!("📞 Contact request filed for phone ending {}", &input[6..]);
        Ok(vec![CONTACT_CONFIRMED.to_string()])
    }

    /// Reply for an input that is not a valid option: a terse reprompt if
    /// it reads like an attempted id, a FAQ-assisted answer otherwise.
    pub(crate) async fn invalid_option_reply(
        &self,
        chat_id: ChatId,
        input: &str,
        hint: &str,
    ) -> Vec<String> {
        if classify::looks_like_attempted_id(input) {
            vec![hint.to_string()]
        } else {
            let answer = self.faq.answer_question(chat_id, input).await;
            vec![format!("💡 {}\n{}", answer, hint)]
        }
    }
}
