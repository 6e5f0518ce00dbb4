use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::errors::{RelayError, RelayResult};

const SEPARATOR: char = '@';

/// 关联ID
///
/// 格式为 `{token}@{创建时间毫秒时间戳}`。创建时间直接编码在ID中，
/// 分发端无需查表即可判断请求是否过期。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    token: String,
    created_at: DateTime<Utc>,
}

impl CorrelationId {
    /// 生成新的关联ID，创建时间为当前时间
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// 以指定创建时间生成关联ID
    pub fn generate_at(created_at: DateTime<Utc>) -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
            created_at: truncate_to_millis(created_at),
        }
    }

    /// 使用已有token构造关联ID
    pub fn new(token: impl Into<String>, created_at: DateTime<Utc>) -> RelayResult<Self> {
        let token = token.into();
        validate_token(&token)?;
        Ok(Self {
            token,
            created_at: truncate_to_millis(created_at),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 从创建到 `now` 经过的时间，时钟回拨时视为零
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }
}

fn validate_token(token: &str) -> RelayResult<()> {
    if token.is_empty() {
        return Err(RelayError::InvalidCorrelationId(
            "token cannot be empty".to_string(),
        ));
    }
    if token.contains(SEPARATOR) {
        return Err(RelayError::InvalidCorrelationId(format!(
            "token must not contain '{SEPARATOR}': {token}"
        )));
    }
    Ok(())
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.token,
            SEPARATOR,
            self.created_at.timestamp_millis()
        )
    }
}

impl FromStr for CorrelationId {
    type Err = RelayError;

    fn from_str(s: &str) -> RelayResult<Self> {
        let (token, millis) = s.rsplit_once(SEPARATOR).ok_or_else(|| {
            RelayError::InvalidCorrelationId(format!("missing '{SEPARATOR}' separator: {s}"))
        })?;
        validate_token(token)?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RelayError::InvalidCorrelationId(format!(
                "timestamp must be unsigned milliseconds: {s}"
            )));
        }
        let millis: i64 = millis.parse().map_err(|_| {
            RelayError::InvalidCorrelationId(format!("timestamp out of range: {s}"))
        })?;
        let created_at = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            RelayError::InvalidCorrelationId(format!("timestamp out of range: {s}"))
        })?;

        Ok(Self {
            token: token.to_string(),
            created_at,
        })
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_display_and_parse() {
        let id: CorrelationId = "c1@1700000000123".parse().unwrap();
        assert_eq!(id.token(), "c1");
        assert_eq!(id.created_at().timestamp_millis(), 1_700_000_000_123);
        assert_eq!(id.to_string(), "c1@1700000000123");
    }

    #[test]
    fn test_parse_uses_last_separator() {
        let err = "a@b@123".parse::<CorrelationId>().unwrap_err();
        assert!(matches!(err, RelayError::InvalidCorrelationId(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in ["", "no-separator", "@123", "c1@", "c1@-5", "c1@12x", "c1@99999999999999999999"] {
            assert!(
                raw.parse::<CorrelationId>().is_err(),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_generate_truncates_to_millis() {
        let now = Utc::now();
        let id = CorrelationId::generate_at(now);
        let reparsed: CorrelationId = id.to_string().parse().unwrap();
        assert_eq!(reparsed, id);
    }

    #[test]
    fn test_elapsed_at() {
        let t0 = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let id = CorrelationId::new("c1", t0).unwrap();
        assert_eq!(
            id.elapsed_at(t0 + Duration::seconds(2)),
            std::time::Duration::from_secs(2)
        );
        assert_eq!(id.elapsed_at(t0 - Duration::seconds(2)), std::time::Duration::ZERO);
    }

    #[test]
    fn test_serde_as_string() {
        let id: CorrelationId = "c1@1000".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"c1@1000\"");
        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CorrelationId>("\"broken\"").is_err());
    }
}
