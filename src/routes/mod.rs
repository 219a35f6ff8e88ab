pub mod account;
pub mod address;
pub mod auth;
pub mod bookings;
pub mod clinics;
pub mod contacts;
pub mod doctors;
pub mod enums;
pub mod payments;
pub mod specialities;
pub mod uploads;
pub mod users;
