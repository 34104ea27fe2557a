use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::MovieId;

/// Lowest accepted rating value
pub const MIN_RATING: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Rate,
    View,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Rate => "rate",
            InteractionKind::View => "view",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rate" => Ok(InteractionKind::Rate),
            "view" => Ok(InteractionKind::View),
            other => Err(AppError::Computation(format!(
                "unknown interaction kind '{}'",
                other
            ))),
        }
    }
}

/// An append-only user interaction event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: String,
    pub movie_id: MovieId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Present only for `rate`
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    /// Stamps a validated submission with an id and the current time
    pub fn from_new(user_id: impl Into<String>, new: NewInteraction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            movie_id: new.movie_id,
            kind: new.kind,
            value: new.value,
            timestamp: Utc::now(),
        }
    }

    /// Weight of this interaction when building a content profile
    ///
    /// Ratings are normalized into `[0, 1]` against `max_rating`. Views, and
    /// ratings that somehow lack a value, get the fixed `view_weight`.
    pub fn profile_weight(&self, max_rating: f64, view_weight: f64) -> f64 {
        match (self.kind, self.value) {
            (InteractionKind::Rate, Some(value)) if max_rating > 0.0 => {
                (value / max_rating).clamp(0.0, 1.0)
            }
            _ => view_weight,
        }
    }
}

/// Interaction as submitted by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInteraction {
    pub movie_id: MovieId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub value: Option<f64>,
}

impl NewInteraction {
    pub fn rate(movie_id: impl Into<MovieId>, value: f64) -> Self {
        Self {
            movie_id: movie_id.into(),
            kind: InteractionKind::Rate,
            value: Some(value),
        }
    }

    pub fn view(movie_id: impl Into<MovieId>) -> Self {
        Self {
            movie_id: movie_id.into(),
            kind: InteractionKind::View,
            value: None,
        }
    }

    pub fn validate(&self, max_rating: f64) -> AppResult<()> {
        if self.movie_id.trim().is_empty() {
            return Err(AppError::InvalidInput("movie_id must not be empty".to_string()));
        }

        match (self.kind, self.value) {
            (InteractionKind::Rate, None) => Err(AppError::InvalidInput(
                "rate interactions require a value".to_string(),
            )),
            (InteractionKind::Rate, Some(value))
                if !value.is_finite() || !(MIN_RATING..=max_rating).contains(&value) =>
            {
                Err(AppError::InvalidInput(format!(
                    "rating must be between {} and {}, got {}",
                    MIN_RATING, max_rating, value
                )))
            }
            (InteractionKind::View, Some(_)) => Err(AppError::InvalidInput(
                "view interactions do not carry a value".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization() {
        assert_eq!(serde_json::to_string(&InteractionKind::Rate).unwrap(), "\"rate\"");
        assert_eq!(serde_json::to_string(&InteractionKind::View).unwrap(), "\"view\"");
    }

    #[test]
    fn test_kind_from_str_rejects_unknown() {
        assert_eq!("view".parse::<InteractionKind>().unwrap(), InteractionKind::View);
        assert!("like".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn test_new_interaction_uses_type_field() {
        let parsed: NewInteraction =
            serde_json::from_str(r#"{"movie_id": "m1", "type": "rate", "value": 4.5}"#).unwrap();
        assert_eq!(parsed, NewInteraction::rate("m1", 4.5));

        let parsed: NewInteraction =
            serde_json::from_str(r#"{"movie_id": "m1", "type": "view"}"#).unwrap();
        assert_eq!(parsed, NewInteraction::view("m1"));
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert!(NewInteraction::rate("m1", 1.0).validate(5.0).is_ok());
        assert!(NewInteraction::rate("m1", 5.0).validate(5.0).is_ok());
        assert!(NewInteraction::rate("m1", 0.5).validate(5.0).is_err());
        assert!(NewInteraction::rate("m1", 5.5).validate(5.0).is_err());
        assert!(NewInteraction::rate("m1", f64::NAN).validate(5.0).is_err());
    }

    #[test]
    fn test_validate_value_presence() {
        let rate_without_value = NewInteraction {
            movie_id: "m1".to_string(),
            kind: InteractionKind::Rate,
            value: None,
        };
        assert!(rate_without_value.validate(5.0).is_err());

        let view_with_value = NewInteraction {
            movie_id: "m1".to_string(),
            kind: InteractionKind::View,
            value: Some(3.0),
        };
        assert!(view_with_value.validate(5.0).is_err());

        assert!(NewInteraction::view("m1").validate(5.0).is_ok());
        assert!(NewInteraction::view(" ").validate(5.0).is_err());
    }

    #[test]
    fn test_profile_weight() {
        let rated = Interaction::from_new("u1", NewInteraction::rate("m1", 3.0));
        assert!((rated.profile_weight(5.0, 0.6) - 0.6).abs() < 1e-12);

        let top = Interaction::from_new("u1", NewInteraction::rate("m1", 5.0));
        assert_eq!(top.profile_weight(5.0, 0.6), 1.0);

        let viewed = Interaction::from_new("u1", NewInteraction::view("m1"));
        assert_eq!(viewed.profile_weight(5.0, 0.6), 0.6);
    }
}
