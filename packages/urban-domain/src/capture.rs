use time::{Month, OffsetDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeOfDay {
	Night,
	Morning,
	Afternoon,
	Evening,
}
impl TimeOfDay {
	pub fn from_hour(hour: u8) -> Self {
		match hour {
			0..6 | 22.. => Self::Night,
			6..12 => Self::Morning,
			12..18 => Self::Afternoon,
			_ => Self::Evening,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Night => "night",
			Self::Morning => "morning",
			Self::Afternoon => "afternoon",
			Self::Evening => "evening",
		}
	}
}

/// Lighting and seasonal hints describing when an observation was captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureContext {
	pub month: Month,
	pub time_of_day: TimeOfDay,
}
impl CaptureContext {
	pub fn from_timestamp(ts: OffsetDateTime) -> Self {
		Self { month: ts.month(), time_of_day: TimeOfDay::from_hour(ts.hour()) }
	}
}
