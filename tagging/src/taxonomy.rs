//! The fixed set of taggable actions, their categories, and the result rule.
//!
//! Every [`Action`] serializes to its Spanish label, which is also what the
//! generative service and imported backups use. Parsing a label that is not
//! in the set fails; callers drop such records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! actions {
    ($( $variant:ident => $label:literal, $category:ident; )+) => {
        /// A taggable in-game action.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Action {
            $(
                #[doc = $label]
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Action {
            /// Every action, in display order.
            pub const ALL: &'static [Action] = &[$(Action::$variant),+];

            /// The wire and display label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Action::$variant => $label,)+
                }
            }

            /// The category this action is grouped under.
            #[must_use]
            pub const fn category(self) -> ActionCategory {
                match self {
                    $(Action::$variant => ActionCategory::$category,)+
                }
            }
        }

        impl FromStr for Action {
            type Err = UnknownAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Action::$variant),)+
                    other => Err(UnknownAction(other.to_string())),
                }
            }
        }
    };
}

actions! {
    ShortPassDefensiveAchieved => "Pase Corto Defensivo Logrado", ShortPass;
    ShortPassDefensiveFailed => "Pase Corto Defensivo No Logrado", ShortPass;
    ShortPassOffensiveAchieved => "Pase Corto Ofensivo Logrado", ShortPass;
    ShortPassOffensiveFailed => "Pase Corto Ofensivo No Logrado", ShortPass;
    LongPassDefensiveAchieved => "Pase Largo Defensivo Logrado", LongPass;
    LongPassDefensiveFailed => "Pase Largo Defensivo No Logrado", LongPass;
    LongPassOffensiveAchieved => "Pase Largo Ofensivo Logrado", LongPass;
    LongPassOffensiveFailed => "Pase Largo Ofensivo No Logrado", LongPass;
    DuelDefensiveAchieved => "1 a 1 Defensivo Logrado", Duel;
    DuelDefensiveFailed => "1 a 1 Defensivo No Logrado", Duel;
    DuelOffensiveAchieved => "1 a 1 Ofensivo Logrado", Duel;
    DuelOffensiveFailed => "1 a 1 Ofensivo No Logrado", Duel;
    AerialOffensiveWon => "Aereo Ofensivo Ganado", Aerial;
    AerialOffensiveLost => "Aereo Ofensivo Perdido", Aerial;
    AerialDefensiveWon => "Aereo Defensivo Ganado", Aerial;
    AerialDefensiveLost => "Aereo Defensivo Perdido", Aerial;
    ShotOnTarget => "Tiro a Porteria Realizado", Shooting;
    GoalScored => "Gol a Favor", Shooting;
    SaveMade => "Atajada Realizada", Goalkeeping;
    ShotReceived => "Tiro a Porteria Recibido", Goalkeeping;
    GoalConceded => "Gol Recibido", Goalkeeping;
    CornerKick => "Tiro de esquina", SetPiece;
    BallRecovery => "Recuperación de balón", Possession;
    BallLoss => "Pérdida de balón", Possession;
    OffensiveTransitionAchieved => "Transición ofensiva lograda", Transition;
    OffensiveTransitionFailed => "Transición ofensiva no lograda", Transition;
}

/// A label that is not part of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action label: {0:?}")]
pub struct UnknownAction(pub String);

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Groups used by filters and dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionCategory {
    /// Pase Corto
    #[serde(rename = "Pase Corto")]
    ShortPass,
    /// Pase Largo
    #[serde(rename = "Pase Largo")]
    LongPass,
    /// 1 a 1
    #[serde(rename = "1 a 1")]
    Duel,
    /// Aereo
    #[serde(rename = "Aereo")]
    Aerial,
    /// Tiro a Porteria
    #[serde(rename = "Tiro a Porteria")]
    Shooting,
    /// Atajadas
    #[serde(rename = "Atajadas")]
    Goalkeeping,
    /// Tiro de esquina
    #[serde(rename = "Tiro de esquina")]
    SetPiece,
    /// Recuperación
    #[serde(rename = "Recuperación")]
    Possession,
    /// Transición
    #[serde(rename = "Transición")]
    Transition,
}

impl ActionCategory {
    /// Every category, in display order.
    pub const ALL: &'static [ActionCategory] = &[
        ActionCategory::ShortPass,
        ActionCategory::LongPass,
        ActionCategory::Duel,
        ActionCategory::Aerial,
        ActionCategory::Shooting,
        ActionCategory::Goalkeeping,
        ActionCategory::SetPiece,
        ActionCategory::Possession,
        ActionCategory::Transition,
    ];

    /// Actions belonging to this category.
    pub fn actions(self) -> impl Iterator<Item = Action> {
        Action::ALL
            .iter()
            .copied()
            .filter(move |action| action.category() == self)
    }
}

/// Outcome derived from an action. Never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResultLabel {
    /// Logrado
    #[serde(rename = "Logrado")]
    Achieved,
    /// No Logrado
    #[serde(rename = "No Logrado")]
    NotAchieved,
    /// Gol
    #[serde(rename = "Gol")]
    Goal,
    /// Atajada
    #[serde(rename = "Atajada")]
    Save,
    /// Ganado
    #[serde(rename = "Ganado")]
    Won,
}

impl ResultLabel {
    /// Labels counted as successful in effectiveness rates.
    pub const SUCCESSFUL: &'static [ResultLabel] = &[
        ResultLabel::Achieved,
        ResultLabel::Goal,
        ResultLabel::Save,
        ResultLabel::Won,
    ];

    /// Whether this label counts towards effectiveness.
    #[must_use]
    pub fn is_success(self) -> bool {
        Self::SUCCESSFUL.contains(&self)
    }

    /// The wire and display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ResultLabel::Achieved => "Logrado",
            ResultLabel::NotAchieved => "No Logrado",
            ResultLabel::Goal => "Gol",
            ResultLabel::Save => "Atajada",
            ResultLabel::Won => "Ganado",
        }
    }
}

impl fmt::Display for ResultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const FAILURE_MARKERS: &[&str] = &["no logrado", "no lograda", "perdido", "pérdida"];
const WON_MARKER: &str = "ganado";

/// Derive the result label of an action.
///
/// First match wins: a failure marker or a conceded goal, then a goal scored,
/// then a save, then a contest won, otherwise achieved.
#[must_use]
pub fn classify(action: Action) -> ResultLabel {
    let text = action.label().to_lowercase();

    if action == Action::GoalConceded || FAILURE_MARKERS.iter().any(|m| text.contains(m)) {
        ResultLabel::NotAchieved
    } else if action == Action::GoalScored {
        ResultLabel::Goal
    } else if action == Action::SaveMade {
        ResultLabel::Save
    } else if text.contains(WON_MARKER) {
        ResultLabel::Won
    } else {
        ResultLabel::Achieved
    }
}

/// Which side of play a contested action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    /// Ofensivo
    Offensive,
    /// Defensivo
    Defensive,
}

/// Contest families that dashboards split by phase and outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Contest {
    /// Short passes
    ShortPass,
    /// Long passes
    LongPass,
    /// One-on-one duels
    Duel,
    /// Aerial contests
    Aerial,
}

impl Action {
    /// Contest family and phase, for the four contested categories.
    #[must_use]
    pub fn contest(self) -> Option<(Contest, Phase)> {
        let contest = match self.category() {
            ActionCategory::ShortPass => Contest::ShortPass,
            ActionCategory::LongPass => Contest::LongPass,
            ActionCategory::Duel => Contest::Duel,
            ActionCategory::Aerial => Contest::Aerial,
            _ => return None,
        };
        let phase = if self.label().contains("Ofensivo") {
            Phase::Offensive
        } else {
            Phase::Defensive
        };
        Some((contest, phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classification_rules() {
        assert_eq!(classify(Action::GoalConceded), ResultLabel::NotAchieved);
        assert_eq!(classify(Action::ShortPassOffensiveFailed), ResultLabel::NotAchieved);
        assert_eq!(classify(Action::AerialDefensiveLost), ResultLabel::NotAchieved);
        assert_eq!(classify(Action::BallLoss), ResultLabel::NotAchieved);
        assert_eq!(classify(Action::OffensiveTransitionFailed), ResultLabel::NotAchieved);
        assert_eq!(classify(Action::GoalScored), ResultLabel::Goal);
        assert_eq!(classify(Action::SaveMade), ResultLabel::Save);
        assert_eq!(classify(Action::AerialOffensiveWon), ResultLabel::Won);
        assert_eq!(classify(Action::ShotReceived), ResultLabel::Achieved);
        assert_eq!(classify(Action::OffensiveTransitionAchieved), ResultLabel::Achieved);
        assert_eq!(classify(Action::CornerKick), ResultLabel::Achieved);
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for action in Action::ALL {
            assert_eq!(action.label().parse::<Action>(), Ok(*action));
        }
        assert!("Chilena".parse::<Action>().is_err());
    }

    #[test]
    fn serde_uses_spanish_labels() {
        let json = serde_json::to_string(&Action::DuelOffensiveAchieved).unwrap_or_default();
        assert_eq!(json, r#""1 a 1 Ofensivo Logrado""#);
        let json = serde_json::to_string(&ResultLabel::NotAchieved).unwrap_or_default();
        assert_eq!(json, r#""No Logrado""#);
    }

    #[test]
    fn every_category_is_populated() {
        for category in ActionCategory::ALL {
            assert!(category.actions().next().is_some(), "{category:?} is empty");
        }
        assert_eq!(ActionCategory::Goalkeeping.actions().count(), 3);
    }

    #[test]
    fn contests_split_by_phase() {
        assert_eq!(
            Action::LongPassOffensiveFailed.contest(),
            Some((Contest::LongPass, Phase::Offensive))
        );
        assert_eq!(
            Action::AerialDefensiveWon.contest(),
            Some((Contest::Aerial, Phase::Defensive))
        );
        assert_eq!(Action::GoalScored.contest(), None);
    }

    proptest! {
        #[test]
        fn classify_is_pure(index in 0..Action::ALL.len()) {
            let action = Action::ALL[index];
            prop_assert_eq!(classify(action), classify(action));
        }
    }
}
