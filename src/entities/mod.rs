pub mod baby;
pub mod patient;
pub mod patient_entry;

pub use baby::Entity as Baby;
pub use patient::Entity as Patient;
pub use patient_entry::Entity as PatientEntry;

pub mod prelude;
