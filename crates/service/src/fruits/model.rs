use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A fruit record. Every field is optional on input and defaults to `""`.
///
/// Field names are matched case-insensitively on input (`"Color"` and
/// `"COLOR"` both fill `color`), `null` leaves a field empty and unknown
/// fields are ignored. Output always uses the lowercase names.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Fruit {
    pub id: String,
    pub fruit: String,
    pub color: String,
}

impl Fruit {
    pub fn new(id: impl Into<String>, fruit: impl Into<String>, color: impl Into<String>) -> Self {
        Self { id: id.into(), fruit: fruit.into(), color: color.into() }
    }

    /// True when no search criterion is set.
    pub fn is_blank(&self) -> bool {
        self.id.is_empty() && self.fruit.is_empty() && self.color.is_empty()
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        if eq_ignore_case(key, "id") {
            Some(&mut self.id)
        } else if eq_ignore_case(key, "fruit") {
            Some(&mut self.fruit)
        } else if eq_ignore_case(key, "color") {
            Some(&mut self.color)
        } else {
            None
        }
    }
}

impl<'de> Deserialize<'de> for Fruit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // any 而非 map：顶层 null 也要能解出空记录
        deserializer.deserialize_any(FruitVisitor)
    }
}

struct FruitVisitor;

impl<'de> Visitor<'de> for FruitVisitor {
    type Value = Fruit;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a fruit object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Fruit, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fruit = Fruit::default();
        while let Some(key) = map.next_key::<String>()? {
            match fruit.field_mut(&key) {
                // 后出现的同名字段覆盖先前的值；null 保持原值
                Some(slot) => {
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *slot = value;
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(fruit)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Fruit, E> {
        Ok(Fruit::default())
    }
}

/// Unicode case-insensitive equality (per-char lowercase mapping).
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let f: Fruit = serde_json::from_str(r#"{"color":"green"}"#).unwrap();
        assert_eq!(f, Fruit::new("", "", "green"));
        assert!(!f.is_blank());
        assert!(serde_json::from_str::<Fruit>("{}").unwrap().is_blank());
    }

    #[test]
    fn field_names_match_regardless_of_case() {
        let f: Fruit = serde_json::from_str(r#"{"Id":"X1","Fruit":"Fig","Color":"Purple"}"#).unwrap();
        assert_eq!(f, Fruit::new("X1", "Fig", "Purple"));

        let f: Fruit = serde_json::from_str(r#"{"COLOR":"green"}"#).unwrap();
        assert_eq!(f, Fruit::new("", "", "green"));
    }

    #[test]
    fn null_fields_stay_empty() {
        let f: Fruit = serde_json::from_str(r#"{"id":null,"fruit":"fig","color":null}"#).unwrap();
        assert_eq!(f, Fruit::new("", "fig", ""));
        assert!(serde_json::from_str::<Fruit>("null").unwrap().is_blank());
    }

    #[test]
    fn unknown_fields_are_ignored_but_wrong_types_are_not() {
        let f: Fruit = serde_json::from_str(r#"{"fruit":"kiwi","weight":[1,2]}"#).unwrap();
        assert_eq!(f, Fruit::new("", "kiwi", ""));
        assert!(serde_json::from_str::<Fruit>(r#"{"id":42}"#).is_err());
        assert!(serde_json::from_str::<Fruit>("[]").is_err());
    }

    #[test]
    fn serializes_with_lowercase_names() {
        let json = serde_json::to_string(&Fruit::new("a", "b", "c")).unwrap();
        assert_eq!(json, r#"{"id":"a","fruit":"b","color":"c"}"#);
    }

    #[test]
    fn case_insensitive_comparison() {
        assert!(eq_ignore_case("Green", "green"));
        assert!(eq_ignore_case("ÄPFEL", "äpfel"));
        assert!(!eq_ignore_case("green", "greens"));
        assert!(eq_ignore_case("", ""));
    }
}
