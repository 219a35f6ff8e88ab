pub mod address;
pub mod booking;
pub mod clinic;
pub mod contact;
pub mod doctor;
pub mod enums;
pub mod schedule;
pub mod speciality;
pub mod text_content;
pub mod user;
