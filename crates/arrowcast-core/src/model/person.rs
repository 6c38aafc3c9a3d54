// ── Person ──
//
// Identity and profile of someone known to the server: players, judges,
// casters and the signed-in user.

use serde::{Deserialize, Serialize};

/// Privilege tiers. Checks are monotonic thresholds: a producer is also a
/// commentator, judge and player.
pub struct Userlevel;

impl Userlevel {
    pub const NONE: i64 = 0;
    pub const PLAYER: i64 = 10;
    pub const JUDGE: i64 = 30;
    pub const COMMENTATOR: i64 = 50;
    pub const PRODUCER: i64 = 100;
}

/// Fallback when a person has no color preference.
pub const DEFAULT_COLOR: &str = "white";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub nick: String,
    /// Ordered preference; the first entry is the primary color.
    pub color_preference: Vec<String>,
    pub archer_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub userlevel: i64,
    pub disabled: bool,
    pub authenticated: bool,
}

impl Person {
    /// The anonymous user described by session cookies alone.
    ///
    /// An unparsable userlevel counts as no privileges.
    pub fn from_session(session: Option<&str>, userlevel: Option<&str>) -> Self {
        Self {
            authenticated: session.is_some_and(|s| !s.is_empty()),
            userlevel: userlevel
                .and_then(|l| l.trim().parse().ok())
                .unwrap_or(Userlevel::NONE),
            ..Self::default()
        }
    }

    /// This person with privileges dropped, as after logging out.
    pub fn logged_out(&self) -> Self {
        Self {
            userlevel: Userlevel::NONE,
            authenticated: false,
            ..self.clone()
        }
    }

    pub fn avatar(&self) -> String {
        match &self.avatar_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => facebook_avatar(self.facebook_id.as_deref().unwrap_or_default()),
        }
    }

    pub fn color(&self) -> &str {
        self.color_preference
            .first()
            .map_or(DEFAULT_COLOR, String::as_str)
    }

    pub fn display_name(&self) -> &str {
        &self.nick
    }

    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or_default()
    }

    pub fn is_player(&self) -> bool {
        self.userlevel >= Userlevel::PLAYER
    }

    pub fn is_judge(&self) -> bool {
        self.userlevel >= Userlevel::JUDGE
    }

    pub fn is_commentator(&self) -> bool {
        self.userlevel >= Userlevel::COMMENTATOR
    }

    pub fn is_producer(&self) -> bool {
        self.userlevel >= Userlevel::PRODUCER
    }
}

pub(crate) fn facebook_avatar(facebook_id: &str) -> String {
    format!("https://graph.facebook.com/{facebook_id}/picture?width=9999")
}
