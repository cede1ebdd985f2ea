pub mod catalog;
pub mod session;

pub use catalog::{
    BookingRow, DashboardRow, Doctor, NewBooking, OpenSlot, Specialty, STATUS_CONTACT_REQUEST,
    STATUS_PAID,
};
pub use session::{FlowState, Scratch, Session};
