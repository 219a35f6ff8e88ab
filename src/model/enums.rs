use serde::{Deserialize, Serialize};

use crate::i18n::Lang;

/// Key/value pair returned by the enum listing endpoints.
#[derive(Debug, Serialize)]
pub struct EnumEntry {
    pub key: i16,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum Gender {
    Female = 0,
    Male = 1,
    None = 2,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Female, Gender::Male, Gender::None];

    pub fn description(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Gender::Female, Lang::En) => "Female",
            (Gender::Female, Lang::Vi) => "Nữ",
            (Gender::Male, Lang::En) => "Male",
            (Gender::Male, Lang::Vi) => "Nam",
            (Gender::None, Lang::En) => "None",
            (Gender::None, Lang::Vi) => "Khác",
        }
    }

    pub fn listing(lang: Lang) -> Vec<EnumEntry> {
        Self::ALL
            .iter()
            .map(|g| EnumEntry {
                key: *g as i16,
                value: g.description(lang).to_string(),
            })
            .collect()
    }
}

impl From<Gender> for i16 {
    fn from(value: Gender) -> Self {
        value as i16
    }
}

impl TryFrom<i16> for Gender {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Gender::Female),
            1 => Ok(Gender::Male),
            2 => Ok(Gender::None),
            other => Err(format!("invalid gender value: {other}")),
        }
    }
}

/// Booking lifecycle: New -> Confirmed -> Done -> Completed, with Cancel
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum BookingStatus {
    New = 0,
    Confirmed = 1,
    Done = 2,
    Completed = 3,
    Cancel = 4,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::New,
        BookingStatus::Confirmed,
        BookingStatus::Done,
        BookingStatus::Completed,
        BookingStatus::Cancel,
    ];

    pub fn description(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (BookingStatus::New, Lang::En) => "New",
            (BookingStatus::New, Lang::Vi) => "Mới tạo",
            (BookingStatus::Confirmed, Lang::En) => "Confirmed",
            (BookingStatus::Confirmed, Lang::Vi) => "Xác nhận",
            (BookingStatus::Done, Lang::En) => "Done",
            (BookingStatus::Done, Lang::Vi) => "Đã khám",
            (BookingStatus::Completed, Lang::En) => "Completed",
            (BookingStatus::Completed, Lang::Vi) => "Đã thanh toán",
            (BookingStatus::Cancel, Lang::En) => "Cancel",
            (BookingStatus::Cancel, Lang::Vi) => "Đã hủy",
        }
    }

    pub fn listing(lang: Lang) -> Vec<EnumEntry> {
        Self::ALL
            .iter()
            .map(|s| EnumEntry {
                key: *s as i16,
                value: s.description(lang).to_string(),
            })
            .collect()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancel)
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        match (self, next) {
            (BookingStatus::New, BookingStatus::Confirmed)
            | (BookingStatus::Confirmed, BookingStatus::Done)
            | (BookingStatus::Done, BookingStatus::Completed) => true,
            (from, BookingStatus::Cancel) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl From<BookingStatus> for i16 {
    fn from(value: BookingStatus) -> Self {
        value as i16
    }
}

impl TryFrom<i16> for BookingStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BookingStatus::New),
            1 => Ok(BookingStatus::Confirmed),
            2 => Ok(BookingStatus::Done),
            3 => Ok(BookingStatus::Completed),
            4 => Ok(BookingStatus::Cancel),
            other => Err(format!("invalid booking status value: {other}")),
        }
    }
}

/// Bookable hour-long slots, T1..T8 (1..8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum TimeSlot {
    T1 = 1,
    T2 = 2,
    T3 = 3,
    T4 = 4,
    T5 = 5,
    T6 = 6,
    T7 = 7,
    T8 = 8,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::T1,
        TimeSlot::T2,
        TimeSlot::T3,
        TimeSlot::T4,
        TimeSlot::T5,
        TimeSlot::T6,
        TimeSlot::T7,
        TimeSlot::T8,
    ];

    pub fn description(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (TimeSlot::T1, Lang::En) => "8:00 AM - 9:00 AM",
            (TimeSlot::T1, Lang::Vi) => "8:00 giờ - 9:00 giờ",
            (TimeSlot::T2, Lang::En) => "9:00 AM - 10:00 AM",
            (TimeSlot::T2, Lang::Vi) => "9:00 giờ - 10:00 giờ",
            (TimeSlot::T3, Lang::En) => "10:00 AM - 11:00 AM",
            (TimeSlot::T3, Lang::Vi) => "10:00 giờ - 11:00 giờ",
            (TimeSlot::T4, Lang::En) => "11:00 AM - 12:00 AM",
            (TimeSlot::T4, Lang::Vi) => "11:00 giờ - 12:00 giờ",
            (TimeSlot::T5, Lang::En) => "13:00 PM - 14:00 PM",
            (TimeSlot::T5, Lang::Vi) => "13:00 giờ - 14:00 giờ",
            (TimeSlot::T6, Lang::En) => "14:00 PM - 15:00 PM",
            (TimeSlot::T6, Lang::Vi) => "14:00 giờ - 15:00 giờ",
            (TimeSlot::T7, Lang::En) => "15:00 PM - 16:00 PM",
            (TimeSlot::T7, Lang::Vi) => "15:00 giờ - 16:00 giờ",
            (TimeSlot::T8, Lang::En) => "16:00 PM - 17:00 PM",
            (TimeSlot::T8, Lang::Vi) => "16:00 giờ - 17:00 giờ",
        }
    }

    pub fn listing(lang: Lang) -> Vec<EnumEntry> {
        Self::ALL
            .iter()
            .map(|t| EnumEntry {
                key: *t as i16,
                value: t.description(lang).to_string(),
            })
            .collect()
    }
}

impl From<TimeSlot> for i16 {
    fn from(value: TimeSlot) -> Self {
        value as i16
    }
}

impl TryFrom<i16> for TimeSlot {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TimeSlot::T1),
            2 => Ok(TimeSlot::T2),
            3 => Ok(TimeSlot::T3),
            4 => Ok(TimeSlot::T4),
            5 => Ok(TimeSlot::T5),
            6 => Ok(TimeSlot::T6),
            7 => Ok(TimeSlot::T7),
            8 => Ok(TimeSlot::T8),
            other => Err(format!("invalid time slot value: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;

    #[test]
    fn enum_round_trips() {
        for slot in TimeSlot::ALL {
            assert_eq!(TimeSlot::try_from(slot as i16).unwrap(), slot);
        }
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::try_from(status as i16).unwrap(), status);
        }
        assert!(TimeSlot::try_from(0).is_err());
        assert!(TimeSlot::try_from(9).is_err());
        assert!(BookingStatus::try_from(5).is_err());
        assert!(Gender::try_from(3).is_err());
    }

    #[test]
    fn serde_uses_integers() {
        assert_eq!(serde_json::to_string(&TimeSlot::T3).unwrap(), "3");
        let slot: TimeSlot = serde_json::from_str("8").unwrap();
        assert_eq!(slot, TimeSlot::T8);
        assert!(serde_json::from_str::<TimeSlot>("12").is_err());
    }

    #[test]
    fn status_transitions() {
        use BookingStatus::*;

        assert!(New.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Done));
        assert!(Done.can_transition_to(Completed));
        assert!(New.can_transition_to(Cancel));
        assert!(Confirmed.can_transition_to(Cancel));

        assert!(!New.can_transition_to(Done));
        assert!(!Completed.can_transition_to(Cancel));
        assert!(!Cancel.can_transition_to(Confirmed));
        assert!(!Done.can_transition_to(New));
    }

    #[test]
    fn localized_descriptions() {
        assert_eq!(BookingStatus::Completed.description(Lang::Vi), "Đã thanh toán");
        assert_eq!(TimeSlot::T1.description(Lang::En), "8:00 AM - 9:00 AM");
    }
}
