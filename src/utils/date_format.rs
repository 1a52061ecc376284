use time::{Date, macros::format_description};

/// Serialization module for `time::Date` in the `[year]-[month]-[day]` form
/// the accounting API expects.
pub mod iso_date {
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::{Date, format_description};

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = format_description!("[year]-[month]-[day]");
        let formatted = date.format(&format).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let format = format_description!("[year]-[month]-[day]");
        Date::parse(&s, &format).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    use super::Date;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::iso_date")]
        date: Date,
    }

    #[test]
    fn round_trips_iso_dates() {
        let json = serde_json::to_string(&Wrapper {
            date: date!(2026 - 08 - 01),
        })
        .unwrap();
        assert_eq!(json, r#"{"date":"2026-08-01"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, date!(2026 - 08 - 01));
    }
}
