use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Local,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

const MILLIS_PER_DAY: i64 =
  24 * 60 * 60 * 1000;

/// Relative labels are used up to this
/// many days away in either direction.
pub const RELATIVE_DAY_WINDOW: i64 = 3;

const SHORT_DATE_FORMAT: &str =
  "%b %-d, %I:%M %p";

const INPUT_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%d %H:%M:%S"
];

/// Timezone used to read date inputs
/// and to print absolute dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayZone {
  Local,
  Named(Tz)
}

impl DisplayZone {
  pub fn resolve(
    name: Option<&str>
  ) -> anyhow::Result<Self> {
    let Some(raw) = name
      .map(str::trim)
      .filter(|raw| !raw.is_empty())
    else {
      return Ok(Self::Local);
    };

    let tz = raw
      .parse::<Tz>()
      .map_err(|err| {
        anyhow!(
          "invalid timezone {raw}: \
           {err}"
        )
      })?;
    tracing::debug!(timezone = %tz, "resolved display timezone");
    Ok(Self::Named(tz))
  }

  #[must_use]
  pub fn to_local(
    &self,
    dt: DateTime<Utc>
  ) -> NaiveDateTime {
    match self {
      | Self::Local => {
        dt.with_timezone(&Local)
          .naive_local()
      }
      | Self::Named(tz) => {
        dt.with_timezone(tz)
          .naive_local()
      }
    }
  }

  /// `None` when the wall-clock time
  /// does not exist in this zone.
  #[must_use]
  pub fn from_local(
    &self,
    naive: NaiveDateTime
  ) -> Option<DateTime<Utc>> {
    match self {
      | Self::Local => Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| {
          dt.with_timezone(&Utc)
        }),
      | Self::Named(tz) => tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| {
          dt.with_timezone(&Utc)
        })
    }
  }
}

/// Reads a local date/time input the
/// way a `datetime-local` field yields
/// it and converts it to an absolute
/// timestamp.
pub fn parse_local_input(
  raw: &str,
  zone: &DisplayZone
) -> anyhow::Result<DateTime<Utc>> {
  let trimmed = raw.trim();

  let naive = INPUT_FORMATS
    .iter()
    .find_map(|fmt| {
      NaiveDateTime::parse_from_str(
        trimmed, fmt
      )
      .ok()
    })
    .or_else(|| {
      NaiveDate::parse_from_str(
        trimmed, "%Y-%m-%d"
      )
      .ok()
      .and_then(|date| {
        date.and_hms_opt(0, 0, 0)
      })
    })
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date/time: \
         {trimmed} (expected \
         YYYY-MM-DDTHH:MM)"
      )
    })?;

  zone
    .from_local(naive)
    .with_context(|| {
      format!(
        "{trimmed} does not exist in \
         the display timezone"
      )
    })
}

#[must_use]
pub fn format_iso_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")
    .to_string()
}

#[must_use]
pub fn format_short_date(
  dt: DateTime<Utc>,
  zone: &DisplayZone
) -> String {
  zone
    .to_local(dt)
    .format(SHORT_DATE_FORMAT)
    .to_string()
}

/// Whole days between `now` and
/// `date`, rounded up.
#[must_use]
pub fn day_offset(
  date: DateTime<Utc>,
  now: DateTime<Utc>
) -> i64 {
  let diff = (date - now)
    .num_milliseconds();
  let days =
    diff.div_euclid(MILLIS_PER_DAY);
  if diff.rem_euclid(MILLIS_PER_DAY)
    == 0
  {
    days
  } else {
    days + 1
  }
}

#[must_use]
pub fn format_relative_date(
  date: DateTime<Utc>,
  now: DateTime<Utc>,
  zone: &DisplayZone
) -> String {
  match day_offset(date, now) {
    | 0 => "Today".to_string(),
    | 1 => "Tomorrow".to_string(),
    | -1 => "Yesterday".to_string(),
    | days
      if (2..=RELATIVE_DAY_WINDOW)
        .contains(&days) =>
    {
      format!("In {days} days")
    }
    | days
      if (-RELATIVE_DAY_WINDOW..=-2)
        .contains(&days) =>
    {
      format!("{} days ago", -days)
    }
    | _ => {
      format_short_date(date, zone)
    }
  }
}


pub mod iso_date_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_iso_timestamp(*dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    DateTime::parse_from_rfc3339(&raw)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::{
      DateTime,
      Utc
    };
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      dt: &Option<DateTime<Utc>>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<DateTime<Utc>>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      match opt {
        | Some(raw) => {
          DateTime::parse_from_rfc3339(
            &raw
          )
          .map(|dt| {
            Some(dt.with_timezone(&Utc))
          })
          .map_err(
            serde::de::Error::custom
          )
        }
        | None => Ok(None)
      }
    }
  }

  pub mod patch {
    use chrono::{
      DateTime,
      Utc
    };
    use serde::Serializer;

    pub fn serialize<S>(
      dt: &Option<
        Option<DateTime<Utc>>
      >,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(inner) => {
          super::option::serialize(
            inner, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }
  }
}
