use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// The booking step a chat currently occupies. Absence of a state
/// (`Session::state == None`) means no booking is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    ChoosingPhone,
    ChoosingSpeciality,
    ChoosingDoctor,
    ChoosingDate,
    ChoosingSlot,
    EnteringName,
    EnteringPhone,
}

/// Partially collected booking fields. Fields are only ever filled in
/// forward lockstep with the flow state: `doctor_id` is never set before
/// `speciality_id`, and so on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratch {
    pub speciality_id: Option<i32>,
    pub doctor_id: Option<i32>,
    pub doctor_name: Option<String>,
    pub fee: Option<f64>,
    pub slot_date: Option<NaiveDate>,
    pub slot_id: Option<i32>,
    pub patient_name: Option<String>,
    pub phone_no: Option<String>,
}

impl Scratch {
    pub fn is_empty(&self) -> bool {
        self.speciality_id.is_none()
            && self.doctor_id.is_none()
            && self.doctor_name.is_none()
            && self.fee.is_none()
            && self.slot_date.is_none()
            && self.slot_id.is_none()
            && self.patient_name.is_none()
            && self.phone_no.is_none()
    }

    /// Drops every field the given state (and any later state) collects,
    /// keeping only what was gathered strictly upstream. Used when "back"
    /// re-enters an earlier step.
    pub fn truncate_for(&mut self, state: FlowState) {
        match state {
            FlowState::ChoosingPhone => *self = Scratch::default(),
            FlowState::ChoosingSpeciality => {
                self.speciality_id = None;
                self.doctor_id = None;
                self.doctor_name = None;
                self.fee = None;
                self.slot_date = None;
                self.slot_id = None;
                self.patient_name = None;
            }
            FlowState::ChoosingDoctor => {
                self.doctor_id = None;
                self.doctor_name = None;
                self.fee = None;
                self.slot_date = None;
                self.slot_id = None;
                self.patient_name = None;
            }
            FlowState::ChoosingDate => {
                self.slot_date = None;
                self.slot_id = None;
                self.patient_name = None;
            }
            FlowState::ChoosingSlot => {
                self.slot_id = None;
                self.patient_name = None;
            }
            FlowState::EnteringName => {
                self.patient_name = None;
            }
            FlowState::EnteringPhone => {
                self.phone_no = None;
            }
        }
    }
}

/// Everything the bot keeps in memory for one chat. Holding state, scratch
/// and valid options in a single record keeps them from drifting apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub state: Option<FlowState>,
    pub scratch: Scratch,
    /// Literal inputs accepted at the current step, refreshed on every
    /// transition into a selection state. Empty for free-text steps.
    pub valid_options: Vec<String>,
    /// The cancel/reschedule side flow is waiting for a phone number.
    /// Kept separate from `state` so it never disturbs an in-progress
    /// booking.
    pub awaiting_contact_phone: bool,
    /// A payment link was emitted for this chat (booking handed to the
    /// payment surface, not yet necessarily paid).
    pub booking_initiated: bool,
    /// At least one payment was confirmed for this chat.
    pub booking_done: bool,
}

impl Session {
    /// Clears the booking flow: state, scratch and options together.
    /// The `booking_done` marker survives.
    pub fn reset_flow(&mut self) {
        self.state = None;
        self.scratch = Scratch::default();
        self.valid_options.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_for_speciality_keeps_phone() {
        let mut scratch = Scratch {
            speciality_id: Some(1),
            doctor_id: Some(4),
            doctor_name: Some("Dr. Rao".to_string()),
            fee: Some(500.0),
            phone_no: Some("9876543210".to_string()),
            ..Scratch::default()
        };
        scratch.truncate_for(FlowState::ChoosingSpeciality);
        assert!(scratch.speciality_id.is_none());
        assert!(scratch.doctor_id.is_none());
        assert_eq!(scratch.phone_no.as_deref(), Some("9876543210"));
    }

    #[test]
    fn reset_flow_clears_everything_but_markers() {
        let mut session = Session {
            state: Some(FlowState::ChoosingSlot),
            valid_options: vec!["1".into(), "2".into()],
            booking_done: true,
            ..Session::default()
        };
        session.scratch.speciality_id = Some(2);
        session.reset_flow();
        assert!(session.state.is_none());
        assert!(session.scratch.is_empty());
        assert!(session.valid_options.is_empty());
        assert!(session.booking_done);
    }
}
