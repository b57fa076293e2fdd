pub use super::baby::Entity as Baby;
pub use super::patient::Entity as Patient;
pub use super::patient_entry::Entity as PatientEntry;
