//! Lenient (de)serialisers for schema flags, orders and keys.

use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub(crate) mod flag {
    use super::RawScalar;
    use crate::validation::is_truthy;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(*value)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RawScalar>::deserialize(deserializer)? {
            None => false,
            Some(RawScalar::Bool(b)) => b,
            Some(RawScalar::Int(i)) => i != 0,
            Some(RawScalar::Float(f)) => f != 0.0,
            Some(RawScalar::Text(s)) => is_truthy(&s),
        })
    }
}

pub(crate) mod order {
    use super::RawScalar;
    use serde::{Deserialize, Deserializer};

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match deserialize_opt(deserializer)? {
            Some(order) => Ok(order),
            None => Ok(super::super::DEFAULT_ORDER),
        }
    }

    pub(crate) fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawScalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawScalar::Int(i)) => Ok(Some(i)),
            Some(RawScalar::Float(f)) => Ok(Some(f.trunc() as i64)),
            Some(RawScalar::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(RawScalar::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid order '{s}'"))),
            Some(RawScalar::Bool(_)) => Err(serde::de::Error::custom("order must be a number")),
        }
    }
}

/// Keys and section ids are normalised on the way in, so documents written by older
/// exporters load even when they carry characters outside the slug alphabet.
pub(crate) mod slug {
    use intake_types::Slug;
    use serde::{Deserialize, Deserializer};

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Slug, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Slug::normalise(&raw)
            .map_err(|_| serde::de::Error::custom(format!("'{raw}' has no usable key characters")))
    }
}

#[cfg(test)]
mod tests {
    use intake_types::Slug;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, with = "super::flag")]
        on: bool,
        #[serde(default, deserialize_with = "super::order::deserialize_opt")]
        order: Option<i64>,
    }

    #[derive(Deserialize)]
    struct Keyed {
        #[serde(deserialize_with = "super::slug::deserialize")]
        key: Slug,
    }

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn flags_accept_mixed_encodings() {
        assert!(row(r#"{"on":true}"#).on);
        assert!(row(r#"{"on":1}"#).on);
        assert!(row(r#"{"on":"1"}"#).on);
        assert!(!row(r#"{"on":"0"}"#).on);
        assert!(!row(r#"{"on":null}"#).on);
        assert!(!row(r#"{}"#).on);
    }

    #[test]
    fn orders_accept_numeric_strings() {
        assert_eq!(row(r#"{"order":"20"}"#).order, Some(20));
        assert_eq!(row(r#"{"order":30}"#).order, Some(30));
        assert_eq!(row(r#"{"order":""}"#).order, None);
        assert!(serde_json::from_str::<Row>(r#"{"order":"soon"}"#).is_err());
    }

    #[test]
    fn keys_are_normalised_not_rejected() {
        let keyed: Keyed = serde_json::from_str(r#"{"key":"how-%e2%80%99d-you-hear"}"#).unwrap();
        assert_eq!(keyed.key, "how-e28099d-you-hear");

        let keyed: Keyed = serde_json::from_str(r#"{"key":"Full_Name"}"#).unwrap();
        assert_eq!(keyed.key, "full_name");

        assert!(serde_json::from_str::<Keyed>(r#"{"key":"%%"}"#).is_err());
    }
}
