//! "back" handling: returns the session to the immediately preceding step,
//! re-querying that step's option set from the still-known upstream scratch
//! fields and discarding everything collected at or after the step left.

use chrono::Local;
use teloxide::types::ChatId;

use crate::database::StoreError;
use crate::models::{FlowState, Session};

use super::options;
use super::{BookingEngine, ASK_DATE, ASK_NAME, NO_SLOTS};

impl BookingEngine {
    pub(crate) async fn go_back(
        &self,
        chat_id: ChatId,
        mut session: Session,
    ) -> Result<Vec<String>, StoreError> {
        let Some(state) = session.state else {
            return self.begin_flow(chat_id).await;
        };

        match state {
            // Already at the first step: fall through to /book semantics.
            FlowState::ChoosingPhone => self.begin_flow(chat_id).await,

            FlowState::ChoosingSpeciality => {
                if session.scratch.phone_no.is_none() {
                    // First step for users without booking history.
                    return self.begin_flow(chat_id).await;
                }
                session.scratch.truncate_for(FlowState::ChoosingPhone);
                let phones = self.store.phones_for_user(chat_id.0).await?;
                if phones.is_empty() {
                    return self.begin_flow(chat_id).await;
                }
                let rendered = options::saved_phones(&phones);
                session.state = Some(FlowState::ChoosingPhone);
                session.valid_options = rendered.options;
                self.sessions.put(chat_id, session).await;
                Ok(vec![rendered.prompt])
            }

            FlowState::ChoosingDoctor => {
                session.scratch.truncate_for(FlowState::ChoosingSpeciality);
                let replies = self.enter_speciality(&mut session).await?;
                self.sessions.put(chat_id, session).await;
                Ok(replies)
            }

            FlowState::ChoosingDate => {
                let Some(specialty_id) = session.scratch.speciality_id else {
                    return self.begin_flow(chat_id).await;
                };
                session.scratch.truncate_for(FlowState::ChoosingDoctor);
                match options::doctors(&self.store, specialty_id).await? {
                    Some(rendered) => {
                        session.state = Some(FlowState::ChoosingDoctor);
                        session.valid_options = rendered.options;
                        self.sessions.put(chat_id, session).await;
                        Ok(vec![rendered.prompt])
                    }
                    None => {
                        // Catalogue changed underneath us: step back once
                        // more, to the speciality list.
                        session.scratch.truncate_for(FlowState::ChoosingSpeciality);
                        let replies = self.enter_speciality(&mut session).await?;
                        self.sessions.put(chat_id, session).await;
                        Ok(replies)
                    }
                }
            }

            FlowState::ChoosingSlot => {
                session.scratch.truncate_for(FlowState::ChoosingDate);
                session.state = Some(FlowState::ChoosingDate);
                session.valid_options.clear();
                self.sessions.put(chat_id, session).await;
                Ok(vec![ASK_DATE.to_string()])
            }

            FlowState::EnteringName => {
                let (Some(doctor_id), Some(date)) =
                    (session.scratch.doctor_id, session.scratch.slot_date)
                else {
                    return self.begin_flow(chat_id).await;
                };
                session.scratch.truncate_for(FlowState::ChoosingSlot);
                let today = Local::now().date_naive();
                let not_before = (date == today).then(|| Local::now().time());
                match options::slots(&self.store, doctor_id, date, not_before).await? {
                    Some(rendered) => {
                        session.state = Some(FlowState::ChoosingSlot);
                        session.valid_options = rendered.options;
                        self.sessions.put(chat_id, session).await;
                        Ok(vec![rendered.prompt])
                    }
                    None => {
                        // The slots we listed earlier were taken meanwhile.
                        session.scratch.truncate_for(FlowState::ChoosingDate);
                        session.state = Some(FlowState::ChoosingDate);
                        session.valid_options.clear();
                        self.sessions.put(chat_id, session).await;
                        Ok(vec![format!("{} {}", NO_SLOTS, ASK_DATE)])
                    }
                }
            }

            FlowState::EnteringPhone => {
                session.scratch.truncate_for(FlowState::EnteringName);
                session.state = Some(FlowState::EnteringName);
                self.sessions.put(chat_id, session).await;
                Ok(vec![ASK_NAME.to_string()])
            }
        }
    }
}
