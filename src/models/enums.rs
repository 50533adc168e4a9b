use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr + Display pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(EntityKind {
    Patient => "Patient",
    Therapist => "Therapist",
    Appointment => "Appointment",
    IntakeForm => "IntakeForm",
    SoapNote => "SoapNote",
    SelfAssessment => "SelfAssessment",
});

str_enum!(AuditAction {
    Create => "CREATE",
    Update => "UPDATE",
    Delete => "DELETE",
});

/// Which side of an appointment an overlap scan is keyed on.
str_enum!(ParticipantKind {
    Therapist => "therapist",
    Patient => "patient",
});

str_enum!(TherapistRole {
    Admin => "admin",
    Therapist => "therapist",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn entity_kind_round_trips() {
        for kind in [
            EntityKind::Patient,
            EntityKind::Therapist,
            EntityKind::Appointment,
            EntityKind::IntakeForm,
            EntityKind::SoapNote,
            EntityKind::SelfAssessment,
        ] {
            assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn audit_action_uses_uppercase_strings() {
        assert_eq!(AuditAction::Create.as_str(), "CREATE");
        assert_eq!(AuditAction::Update.as_str(), "UPDATE");
        assert_eq!(AuditAction::Delete.as_str(), "DELETE");
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = TherapistRole::from_str("owner").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }
}
