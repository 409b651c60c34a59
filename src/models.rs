//! Domain records: account, tasks, categories and folders.
//!
//! Field names follow the camelCase JSON used by existing stores and export
//! files. Timestamps are written as epoch milliseconds; older exports carry
//! ISO-8601 strings, which are accepted on read.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Generate a fresh entity id.
pub fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Current time at the millisecond precision documents store.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Experience points per level step in the level curve.
pub const XP_PER_LEVEL_STEP: u64 = 100;

/// Default experience reward for new tasks.
pub const DEFAULT_EXPERIENCE_REWARD: u32 = 10;

/// Level for a given experience total: `floor(sqrt(experience / 100)) + 1`.
pub fn level_for_experience(experience: u64) -> u32 {
    let steps = experience / XP_PER_LEVEL_STEP;
    // Integer square root; f64 is exact well past any reachable XP total,
    // the loops only correct rounding at perfect squares.
    let mut root = (steps as f64).sqrt() as u64;
    while root * root > steps {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= steps {
        root += 1;
    }
    u32::try_from(root).unwrap_or(u32::MAX - 1) + 1
}

/// Epoch-millisecond timestamps that also read RFC 3339 strings.
pub mod millis {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("epoch milliseconds or an RFC 3339 timestamp")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Utc.timestamp_millis_opt(v)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {v}")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            let v = i64::try_from(v).map_err(|_| E::custom("timestamp out of range"))?;
            self.visit_i64(v)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            self.visit_i64(v as i64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if let Ok(ms) = v.trim().parse::<i64>() {
                return self.visit_i64(ms);
            }
            DateTime::parse_from_rfc3339(v.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| E::custom(format!("invalid timestamp '{v}': {err}")))
        }
    }
}

/// Tri-state field update: leave untouched, clear, or set.
///
/// Distinguishes "not provided" from an explicit clear, which a plain
/// `Option` cannot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    /// Apply the patch to an optional field.
    pub fn apply(self, field: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *field = None,
            Patch::Set(value) => *field = Some(value),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// The value being set, if any
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `Some` sets, `None` clears.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Progression rank derived from level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Novice,
    Apprentice,
    Adept,
    Expert,
    Master,
    Legend,
}

impl Rank {
    pub fn for_level(level: u32) -> Self {
        match level {
            0..=10 => Rank::Novice,
            11..=25 => Rank::Apprentice,
            26..=50 => Rank::Adept,
            51..=75 => Rank::Expert,
            76..=100 => Rank::Master,
            _ => Rank::Legend,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Novice => "Novice",
            Rank::Apprentice => "Apprentice",
            Rank::Adept => "Adept",
            Rank::Expert => "Expert",
            Rank::Master => "Master",
            Rank::Legend => "Legend",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_type: Option<String>,
    pub level: u32,
    pub experience: u64,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(input: NewAccount) -> Result<Self> {
        let nickname = required_text("nickname", &input.nickname)?;
        let now = now_millis();
        Ok(Self {
            id: new_id(),
            nickname,
            name: input.name,
            avatar: input.avatar,
            character_type: input.character_type,
            level: 1,
            experience: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Add experience and recompute the level. Returns the new level.
    pub fn gain_experience(&mut self, amount: u64) -> u32 {
        self.experience = self.experience.saturating_add(amount);
        self.level = level_for_experience(self.experience);
        self.updated_at = now_millis();
        self.level
    }

    /// Re-derive the level from experience (used after imports).
    pub fn normalize_level(&mut self) {
        self.level = level_for_experience(self.experience);
    }

    pub fn rank(&self) -> Rank {
        Rank::for_level(self.level)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub nickname: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub character_type: Option<String>,
}

/// Profile fields a caller may change. Level and experience are not here:
/// they only move through task completion.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub nickname: Option<String>,
    pub name: Patch<String>,
    pub avatar: Patch<String>,
    pub character_type: Patch<String>,
}

// =============================================================================
// Tasks
// =============================================================================

/// How often a repeated task recurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Daily {
        #[serde(rename = "daysOfWeek", default, skip_serializing_if = "BTreeSet::is_empty")]
        days_of_week: BTreeSet<u8>,
    },
    Weekly {
        #[serde(rename = "daysOfWeek", default)]
        days_of_week: BTreeSet<u8>,
    },
    Monthly {
        #[serde(rename = "daysOfMonth", default)]
        days_of_month: BTreeSet<u8>,
    },
    Custom {
        #[serde(rename = "customDays")]
        custom_days: u32,
    },
}

impl Frequency {
    pub fn validate(&self) -> Result<()> {
        match self {
            Frequency::Once => Ok(()),
            Frequency::Daily { days_of_week } | Frequency::Weekly { days_of_week } => {
                match days_of_week.iter().find(|day| **day > 6) {
                    Some(day) => Err(Error::InvalidArgument(format!(
                        "day of week {day} out of range 0..=6"
                    ))),
                    None => Ok(()),
                }
            }
            Frequency::Monthly { days_of_month } => {
                match days_of_month.iter().find(|day| **day == 0 || **day > 31) {
                    Some(day) => Err(Error::InvalidArgument(format!(
                        "day of month {day} out of range 1..=31"
                    ))),
                    None => Ok(()),
                }
            }
            Frequency::Custom { custom_days } => {
                if *custom_days == 0 {
                    Err(Error::InvalidArgument(
                        "custom frequency needs a positive day count".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Short tag name (`once`, `daily`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily { .. } => "daily",
            Frequency::Weekly { .. } => "weekly",
            Frequency::Monthly { .. } => "monthly",
            Frequency::Custom { .. } => "custom",
        }
    }
}

fn default_experience_reward() -> u32 {
    DEFAULT_EXPERIENCE_REWARD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_repeated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default = "default_experience_reward")]
    pub experience_reward: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_minutes: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(input: NewTask) -> Result<Self> {
        let task_name = required_text("taskName", &input.task_name)?;
        if let Some(frequency) = &input.frequency {
            frequency.validate()?;
        }
        if let Some(minutes) = &input.notification_minutes {
            validate_notification_minutes(minutes)?;
        }
        if let Some(color) = &input.color {
            validate_color(color)?;
        }

        let now = now_millis();
        Ok(Self {
            id: new_id(),
            task_name,
            description: input.description,
            category_id: input.category_id,
            folder_id: input.folder_id,
            color: input.color,
            is_completed: false,
            is_repeated: input.is_repeated,
            frequency: input.frequency,
            experience_reward: input.experience_reward.unwrap_or(DEFAULT_EXPERIENCE_REWARD),
            deadline: input.deadline,
            notification_minutes: input.notification_minutes,
            order: input.order,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge a patch into the task. Omitted fields stay untouched.
    pub fn apply(&mut self, patch: TaskPatch) -> Result<()> {
        let task_name = patch
            .task_name
            .as_deref()
            .map(|name| required_text("taskName", name))
            .transpose()?;
        if let Some(frequency) = patch.frequency.as_set() {
            frequency.validate()?;
        }
        if let Some(minutes) = patch.notification_minutes.as_set() {
            validate_notification_minutes(minutes)?;
        }
        if let Some(color) = patch.color.as_set() {
            validate_color(color)?;
        }

        if let Some(task_name) = task_name {
            self.task_name = task_name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        patch.category_id.apply(&mut self.category_id);
        patch.folder_id.apply(&mut self.folder_id);
        patch.color.apply(&mut self.color);
        if let Some(is_repeated) = patch.is_repeated {
            self.is_repeated = is_repeated;
        }
        patch.frequency.apply(&mut self.frequency);
        if let Some(reward) = patch.experience_reward {
            self.experience_reward = reward;
        }
        patch.deadline.apply(&mut self.deadline);
        patch.notification_minutes.apply(&mut self.notification_minutes);
        patch.order.apply(&mut self.order);
        self.updated_at = now_millis();
        Ok(())
    }

    /// Whether reminders should exist for this task
    pub fn wants_reminders(&self) -> bool {
        !self.is_completed
            && self.deadline.is_some()
            && self
                .notification_minutes
                .as_ref()
                .map(|m| !m.is_empty())
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub task_name: String,
    pub description: String,
    pub category_id: Option<String>,
    pub folder_id: Option<String>,
    pub color: Option<String>,
    pub is_repeated: bool,
    pub frequency: Option<Frequency>,
    /// Defaults to [`DEFAULT_EXPERIENCE_REWARD`]
    pub experience_reward: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
    pub notification_minutes: Option<BTreeSet<u32>>,
    pub order: Option<f64>,
}

impl NewTask {
    pub fn named(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            ..Self::default()
        }
    }
}

/// Field-level task update. Completion is not patchable; it only moves
/// through `Repository::complete_task`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub category_id: Patch<String>,
    pub folder_id: Patch<String>,
    pub color: Patch<String>,
    pub is_repeated: Option<bool>,
    pub frequency: Patch<Frequency>,
    pub experience_reward: Option<u32>,
    pub deadline: Patch<DateTime<Utc>>,
    pub notification_minutes: Patch<BTreeSet<u32>>,
    pub order: Patch<f64>,
}

impl TaskPatch {
    /// Whether the patch touches deadline or reminder offsets
    pub fn touches_reminders(&self) -> bool {
        !self.deadline.is_keep() || !self.notification_minutes.is_keep()
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(input: NewCategory) -> Result<Self> {
        let name = required_text("name", &input.name)?;
        let icon = required_text("icon", &input.icon)?;
        validate_color(&input.color)?;
        let now = now_millis();
        Ok(Self {
            id: new_id(),
            name,
            icon,
            color: input.color,
            is_default: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: CategoryPatch) -> Result<()> {
        let name = patch
            .name
            .as_deref()
            .map(|name| required_text("name", name))
            .transpose()?;
        let icon = patch
            .icon
            .as_deref()
            .map(|icon| required_text("icon", icon))
            .transpose()?;
        if let Some(color) = &patch.color {
            validate_color(color)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(icon) = icon {
            self.icon = icon;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.updated_at = now_millis();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// `isDefault` is fixed at creation and never patchable.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Categories seeded on first run: (name, icon, color)
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 8] = [
    ("Work", "briefcase", "#3b82f6"),
    ("Personal", "person", "#8b5cf6"),
    ("Health", "fitness", "#10b981"),
    ("Learning", "book", "#f59e0b"),
    ("Home", "home", "#06b6d4"),
    ("Shopping", "cart", "#ec4899"),
    ("Finance", "cash", "#14b8a6"),
    ("Social", "people", "#f97316"),
];

/// Icons offered for user-created categories and folders
pub const AVAILABLE_ICONS: [&str; 26] = [
    "star",
    "heart",
    "trophy",
    "rocket",
    "bulb",
    "musical-notes",
    "game-controller",
    "restaurant",
    "cafe",
    "bicycle",
    "car",
    "airplane",
    "camera",
    "code",
    "construct",
    "flask",
    "basketball",
    "football",
    "barbell",
    "water",
    "leaf",
    "pizza",
    "gift",
    "umbrella",
    "sunny",
    "moon",
];

/// Palette offered by the color picker
pub const AVAILABLE_COLORS: [&str; 14] = [
    "#ef4444", "#f97316", "#f59e0b", "#eab308", "#84cc16", "#10b981", "#14b8a6", "#06b6d4",
    "#3b82f6", "#6366f1", "#8b5cf6", "#a855f7", "#ec4899", "#f43f5e",
];

/// Build the default category records with fresh ids.
pub fn default_categories() -> Vec<Category> {
    let now = now_millis();
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, icon, color)| Category {
            id: new_id(),
            name: (*name).to_string(),
            icon: (*icon).to_string(),
            color: (*color).to_string(),
            is_default: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

// =============================================================================
// Folders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewFolder {
    pub name: String,
    pub icon: String,
    pub color: String,
    pub parent_folder_id: Option<String>,
    /// Appended after the last folder when omitted
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_folder_id: Patch<String>,
    pub order: Option<i64>,
}

// =============================================================================
// Activity log
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Error,
    Warning,
    Analytics,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogKind::Error => "error",
            LogKind::Warning => "warning",
            LogKind::Analytics => "analytics",
        };
        f.write_str(text)
    }
}

/// One persisted activity-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(with = "millis")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: &str, data: Option<serde_json::Value>) -> Result<Self> {
        Ok(Self {
            id: new_id(),
            kind,
            message: required_text("message", message)?,
            data,
            timestamp: now_millis(),
        })
    }
}

// =============================================================================
// Validation helpers
// =============================================================================

pub(crate) fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Accepts `#rgb` and `#rrggbb` hex colors.
pub fn is_valid_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn validate_color(color: &str) -> Result<()> {
    if is_valid_color(color) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid color '{color}'")))
    }
}

fn validate_notification_minutes(minutes: &BTreeSet<u32>) -> Result<()> {
    if minutes.contains(&0) {
        return Err(Error::InvalidArgument(
            "notification offsets must be positive minutes".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_curve_matches_formula() {
        let cases = [
            (0, 1),
            (99, 1),
            (100, 2),
            (399, 2),
            (400, 3),
            (899, 3),
            (900, 4),
            (10_000, 11),
        ];
        for (xp, level) in cases {
            assert_eq!(level_for_experience(xp), level, "xp {xp}");
        }
    }

    #[test]
    fn gain_experience_keeps_level_derived() {
        let mut account = Account::new(NewAccount {
            nickname: "hero".to_string(),
            ..NewAccount::default()
        })
        .unwrap();
        assert_eq!(account.level, 1);

        account.gain_experience(150);
        assert_eq!(account.level, level_for_experience(150));
        account.gain_experience(250);
        assert_eq!(account.experience, 400);
        assert_eq!(account.level, 3);
    }

    #[test]
    fn ranks_follow_level_bands() {
        assert_eq!(Rank::for_level(1), Rank::Novice);
        assert_eq!(Rank::for_level(11), Rank::Apprentice);
        assert_eq!(Rank::for_level(50), Rank::Adept);
        assert_eq!(Rank::for_level(75), Rank::Expert);
        assert_eq!(Rank::for_level(100), Rank::Master);
        assert_eq!(Rank::for_level(101), Rank::Legend);
    }

    #[test]
    fn empty_nickname_is_rejected() {
        let err = Account::new(NewAccount {
            nickname: "   ".to_string(),
            ..NewAccount::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn task_json_uses_camel_case_and_millis() {
        let task = Task::new(NewTask {
            experience_reward: Some(10),
            ..NewTask::named("Buy milk")
        })
        .unwrap();
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["taskName"], "Buy milk");
        assert_eq!(value["experienceReward"], 10);
        assert_eq!(value["isCompleted"], false);
        assert!(value["createdAt"].is_i64());
        assert!(value.get("categoryId").is_none());
    }

    #[test]
    fn iso_timestamps_from_old_exports_are_accepted() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "taskName": "Read",
            "description": "",
            "isCompleted": true,
            "isRepeated": false,
            "experienceReward": 20,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": 1714557600000i64
        }))
        .unwrap();

        assert_eq!(task.created_at.timestamp_millis(), 1_714_557_600_000);
        assert_eq!(task.updated_at, task.created_at);
    }

    #[test]
    fn frequency_is_tagged_by_type() {
        let weekly = Frequency::Weekly {
            days_of_week: [1, 3, 5].into_iter().collect(),
        };
        let value = serde_json::to_value(&weekly).unwrap();
        assert_eq!(value, json!({"type": "weekly", "daysOfWeek": [1, 3, 5]}));

        let once: Frequency = serde_json::from_value(json!({"type": "once"})).unwrap();
        assert_eq!(once, Frequency::Once);

        let custom: Frequency =
            serde_json::from_value(json!({"type": "custom", "customDays": 3})).unwrap();
        assert_eq!(custom, Frequency::Custom { custom_days: 3 });
    }

    #[test]
    fn frequency_ranges_are_validated() {
        assert!(Frequency::Weekly {
            days_of_week: [7].into_iter().collect()
        }
        .validate()
        .is_err());
        assert!(Frequency::Monthly {
            days_of_month: [0].into_iter().collect()
        }
        .validate()
        .is_err());
        assert!(Frequency::Custom { custom_days: 0 }.validate().is_err());
        assert!(Frequency::Monthly {
            days_of_month: [1, 31].into_iter().collect()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn patch_distinguishes_keep_from_clear() {
        let mut task = Task::new(NewTask {
            folder_id: Some("f1".to_string()),
            category_id: Some("c1".to_string()),
            ..NewTask::named("Stretch")
        })
        .unwrap();

        task.apply(TaskPatch {
            description: Some("10 minutes".to_string()),
            ..TaskPatch::default()
        })
        .unwrap();
        assert_eq!(task.folder_id.as_deref(), Some("f1"));
        assert_eq!(task.description, "10 minutes");

        task.apply(TaskPatch {
            folder_id: Patch::Clear,
            ..TaskPatch::default()
        })
        .unwrap();
        assert!(task.folder_id.is_none());
        assert_eq!(task.category_id.as_deref(), Some("c1"));
    }

    #[test]
    fn invalid_patch_leaves_task_untouched() {
        let mut task = Task::new(NewTask::named("Stretch")).unwrap();
        let before = task.clone();

        let err = task
            .apply(TaskPatch {
                description: Some("changed".to_string()),
                color: Patch::Set("blue".to_string()),
                ..TaskPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(task, before);
    }

    #[test]
    fn default_categories_are_marked_default() {
        let categories = default_categories();
        assert_eq!(categories.len(), 8);
        assert!(categories.iter().all(|c| c.is_default));
        assert!(categories.iter().all(|c| is_valid_color(&c.color)));
        assert_eq!(categories[0].name, "Work");
    }

    #[test]
    fn palette_colors_are_valid() {
        assert!(AVAILABLE_COLORS.iter().all(|c| is_valid_color(c)));
        assert!(is_valid_color("#abc"));
        assert!(!is_valid_color("3b82f6"));
        assert!(!is_valid_color("#zzzzzz"));
    }
}
